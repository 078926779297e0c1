//! Plain data records shared by the engine and the store.
//!
//! Relationships are explicit foreign-key fields: a [`TranscriptStat`] names
//! its sample and transcript by id and never embeds them.

pub mod sample;
pub mod stat;
pub mod thresholds;
pub mod transcript;

pub use sample::Sample;
pub use stat::{ExonIds, TranscriptStat, EXON_SEPARATOR};
pub use thresholds::{Thresholds, DEFAULT_PRIMARY_THRESHOLD, DEFAULT_THRESHOLDS};
pub use transcript::Transcript;
