//! Suggestion generation and caching

pub mod cache;
pub mod engine;

pub use cache::{SuggestionCache, SUGGESTIONS_CACHE_KEY, SUGGESTIONS_LAST_FETCH_KEY};
pub use engine::{rank, MAX_SUGGESTIONS};
