//! Transcript search: text cleanup, the HTTP search client, and result merging.
//!
//! The language model hands over up to three semantic phrases; this crate
//! turns them into one deduplicated list of `{id, text}` hits.

mod aggregate;
mod client;
mod sanitize;

pub use aggregate::merge;
pub use client::{HttpSearchClient, SearchOptions, TermSource, search, search_batch};
pub use sanitize::{MAX_TEXT_CHARS, sanitize};
