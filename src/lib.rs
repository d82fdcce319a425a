//! Subtitle rendering filter
//!
//! Ingests SRT and ASS/SSA subtitle samples into a markup document,
//! suppressing lines replayed by ordered chapters, and renders frames for
//! a subtitle consumer. Companion subtitle files next to the playing media
//! can be used instead of an input stream.

pub mod catalog;
pub mod config;
pub mod config_file;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod filter;
pub mod host;
pub mod language;
pub mod render;
pub mod scanner;
pub mod subtitle;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use catalog::{ExternalCatalog, ExternalSubtitleEntry};
pub use config::{CustomResolution, FilterSettings};
pub use consumer::{FieldAccess, SubtitleConsumer};
pub use engine::{EngineFrame, MemoryEngine, RenderEngine, SubtitleDocument};
pub use error::{FilterError, Result};
pub use filter::{AssFilter, ConsumerInfo, ReceiveOutcome, TrackInfo};
pub use host::{AttachedFont, GraphHost, AUTOLOAD_NAME};
pub use render::SubFrame;
pub use types::{MediaFormat, MediaSubtype, Rect, Size, SubtitleChunk};
