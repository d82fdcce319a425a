//! Markup engine boundary
//!
//! The filter never rasterizes anything itself. It feeds documents to a
//! [`RenderEngine`] and asks it for the frame at a timestamp. Documents are
//! owned values; dropping one releases whatever the engine allocated for it.

pub mod memory;

use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::types::Size;

pub use memory::{EngineStats, MemoryDocument, MemoryEngine};

/// One subtitle document held by the engine
pub trait SubtitleDocument: Send {
    /// Parse script header data (styles, script info)
    fn load_header(&mut self, header: &[u8]);

    /// Add one muxed-layout chunk
    fn append_chunk(&mut self, data: &[u8], start_ms: i64, duration_ms: i64);

    /// Drop all events, keeping the header
    fn flush(&mut self);

    /// Number of events held
    fn event_count(&self) -> usize;
}

/// The subtitle markup engine
pub trait RenderEngine: Send {
    type Document: SubtitleDocument;

    /// Create an empty document
    fn new_document(&mut self) -> Result<Self::Document>;

    /// Parse a complete script file
    fn load_file(&mut self, path: &Path, encoding: &str) -> Result<Self::Document>;

    /// Register a font from memory
    fn add_font(&mut self, name: &str, data: &[u8]);

    /// Directory searched for fonts referenced by scripts
    fn set_fonts_dir(&mut self, dir: &Path);

    fn set_font_ligatures_disabled(&mut self, disabled: bool);

    /// Size of the frames rendered next
    fn set_output_size(&mut self, size: Size);

    /// Render `document` at `timestamp_ms`
    fn render_frame(&mut self, document: &Self::Document, timestamp_ms: i64) -> EngineFrame;
}

/// One event visible in a rendered frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEvent {
    pub read_order: i64,
    pub layer: i32,
    pub style: String,
    pub text: String,
}

/// Engine output for one timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineFrame {
    pub size: Size,
    pub timestamp_ms: i64,
    /// Visible events, bottom layer first
    pub events: Vec<RenderedEvent>,
    /// Whether the visible set differs from the previous render
    pub changed: bool,
}

impl EngineFrame {
    /// A frame with nothing on it
    pub fn empty(size: Size, timestamp_ms: i64) -> Self {
        Self {
            size,
            timestamp_ms,
            events: Vec::new(),
            changed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
