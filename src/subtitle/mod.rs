//! Subtitle ingestion
//!
//! - Line normalization of SRT and ASS/SSA samples
//! - SRT markup to override-tag translation and header synthesis
//! - Ordered-chapter duplicate resolution for ASS/SSA samples
//! - Script and SRT file parsing for companion files

pub mod ledger;
pub mod normalizer;
pub mod script;
pub mod srt_file;
pub mod srt_tags;

pub use ledger::{DuplicateLedger, Resolution, COLLISION_STRIDE};
pub use normalizer::{normalize_srt, srt_header, NormalizedLine, TrackKind};
