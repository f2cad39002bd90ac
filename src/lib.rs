//! pagegist - captures page content and turns it into generated summaries,
//! translations, or custom transformations via the Gemini API.
//!
//! The pipeline resolves a content source from the active page (selection,
//! captions, article text, or a screenshot), splits oversized text to fit
//! the model's character budget, and drives a sequential per-chunk
//! generation loop with session-scoped response caching.

pub mod ai;
pub mod app;
pub mod cache;
pub mod chunk;
pub mod error;
pub mod limits;
pub mod models;
pub mod output;
pub mod prompts;
pub mod session;
pub mod source;

pub use error::{Error, Result};
