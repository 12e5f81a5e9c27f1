//! The story model produced by the workflow and the text helpers the
//! stages share.
//!
//! * [`StructuredDocument`] / [`Section`] — the structuring stage's output,
//!   with tolerant parsing and a never-lose-the-text fallback.
//! * [`extract_hashtags`] / [`dedupe_capped`] — tag extraction rules.
//! * [`removed_fillers`] / [`strip_fillers`] — filler-word bookkeeping.

pub mod document;
pub mod fillers;
pub mod tags;

pub use document::{fallback_document, parse_document, Section, StructuredDocument};
pub use fillers::{removed_fillers, strip_fillers, FILLER_WORDS};
pub use tags::{dedupe_capped, extract_hashtags, MAX_TAGS};
