//! Cross-module tests
//!
//! Drive the filter through whole playback sessions:
//! - SRT and ASS/SSA ingestion
//! - Ordered-chapter replays and collisions
//! - Frame requests and resolution overrides
//! - Companion file loading

pub mod fixtures;
