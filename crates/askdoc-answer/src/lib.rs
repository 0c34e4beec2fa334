//! Askdoc Answer — phrasing a final answer from retrieved evidence.

pub mod answerer;

pub use answerer::{Answer, Answerer, NO_INFORMATION_RESPONSE};
