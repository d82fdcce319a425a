//! In-process markup engine
//!
//! Keeps documents as plain event tables and "renders" the events visible at
//! a timestamp. Like the native engine, a chunk whose ReadOrder is already
//! present in a document is ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{FilterError, Result};
use crate::subtitle::script::split_script;
use crate::types::Size;

use super::{EngineFrame, RenderEngine, RenderedEvent, SubtitleDocument};

/// Counters shared between an engine and its documents
#[derive(Debug, Default)]
pub struct EngineStats {
    documents_created: AtomicUsize,
    documents_live: AtomicUsize,
    files_loaded: AtomicUsize,
    frames_rendered: AtomicUsize,
}

impl EngineStats {
    pub fn documents_created(&self) -> usize {
        self.documents_created.load(Ordering::Relaxed)
    }

    /// Documents created and not yet dropped
    pub fn documents_live(&self) -> usize {
        self.documents_live.load(Ordering::Relaxed)
    }

    pub fn files_loaded(&self) -> usize {
        self.files_loaded.load(Ordering::Relaxed)
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Event {
    layer: i32,
    style: String,
    text: String,
    start_ms: i64,
    duration_ms: i64,
}

/// Document of the in-process engine
#[derive(Debug)]
pub struct MemoryDocument {
    header: String,
    header_loads: usize,
    events: BTreeMap<i64, Event>,
    stats: Arc<EngineStats>,
}

impl MemoryDocument {
    fn new(stats: Arc<EngineStats>) -> Self {
        stats.documents_created.fetch_add(1, Ordering::Relaxed);
        stats.documents_live.fetch_add(1, Ordering::Relaxed);
        Self {
            header: String::new(),
            header_loads: 0,
            events: BTreeMap::new(),
            stats,
        }
    }

    /// Accumulated header text
    pub fn header(&self) -> &str {
        &self.header
    }

    /// How many times header data was loaded
    pub fn header_loads(&self) -> usize {
        self.header_loads
    }

    /// ReadOrders held, ascending
    pub fn read_orders(&self) -> Vec<i64> {
        self.events.keys().copied().collect()
    }

    /// Text of the event stored under `read_order`
    pub fn text(&self, read_order: i64) -> Option<&str> {
        self.events.get(&read_order).map(|e| e.text.as_str())
    }

    fn visible_at(&self, timestamp_ms: i64) -> Vec<RenderedEvent> {
        let mut visible: Vec<RenderedEvent> = self
            .events
            .iter()
            .filter(|(_, e)| e.start_ms <= timestamp_ms && timestamp_ms < e.start_ms + e.duration_ms)
            .map(|(&read_order, e)| RenderedEvent {
                read_order,
                layer: e.layer,
                style: e.style.clone(),
                text: e.text.clone(),
            })
            .collect();
        visible.sort_by_key(|e| (e.layer, e.read_order));
        visible
    }
}

impl Drop for MemoryDocument {
    fn drop(&mut self) {
        self.stats.documents_live.fetch_sub(1, Ordering::Relaxed);
    }
}

impl SubtitleDocument for MemoryDocument {
    fn load_header(&mut self, header: &[u8]) {
        self.header.push_str(&String::from_utf8_lossy(header));
        self.header_loads += 1;
    }

    fn append_chunk(&mut self, data: &[u8], start_ms: i64, duration_ms: i64) {
        let line = String::from_utf8_lossy(data);
        let fields: Vec<&str> = line.splitn(9, ',').collect();
        if fields.len() != 9 {
            tracing::debug!("Ignoring chunk with {} fields", fields.len());
            return;
        }
        let Ok(read_order) = fields[0].trim().parse::<i64>() else {
            tracing::debug!("Ignoring chunk with bad ReadOrder {:?}", fields[0]);
            return;
        };
        if self.events.contains_key(&read_order) {
            return;
        }
        self.events.insert(
            read_order,
            Event {
                layer: fields[1].trim().parse().unwrap_or(0),
                style: fields[2].to_string(),
                text: fields[8].to_string(),
                start_ms,
                duration_ms,
            },
        );
    }

    fn flush(&mut self) {
        self.events.clear();
    }

    fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// In-process engine
#[derive(Debug, Default)]
pub struct MemoryEngine {
    stats: Arc<EngineStats>,
    fonts: Vec<String>,
    fonts_dir: Option<PathBuf>,
    ligatures_disabled: bool,
    output_size: Size,
    last_visible: Vec<i64>,
    /// Live documents allowed at once, unlimited when `None`
    document_limit: Option<usize>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create a document while `limit` are alive
    pub fn with_document_limit(mut self, limit: usize) -> Self {
        self.document_limit = Some(limit);
        self
    }

    fn check_document_limit(&self) -> Result<()> {
        match self.document_limit {
            Some(limit) if self.stats.documents_live() >= limit => Err(FilterError::Engine(
                format!("document limit of {} reached", limit),
            )),
            _ => Ok(()),
        }
    }

    /// Shared counters; stays valid after the engine moves into a filter
    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Names of fonts added from memory
    pub fn fonts(&self) -> &[String] {
        &self.fonts
    }

    pub fn fonts_dir(&self) -> Option<&Path> {
        self.fonts_dir.as_deref()
    }

    pub fn ligatures_disabled(&self) -> bool {
        self.ligatures_disabled
    }

    pub fn output_size(&self) -> Size {
        self.output_size
    }
}

impl RenderEngine for MemoryEngine {
    type Document = MemoryDocument;

    fn new_document(&mut self) -> Result<MemoryDocument> {
        self.check_document_limit()?;
        Ok(MemoryDocument::new(self.stats()))
    }

    fn load_file(&mut self, path: &Path, encoding: &str) -> Result<MemoryDocument> {
        self.check_document_limit()?;
        let bytes = std::fs::read(path)?;
        let text = match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
            Some(enc) => enc.decode(&bytes).0.into_owned(),
            None => String::from_utf8_lossy(&bytes).into_owned(),
        };
        let script = split_script(&text);
        if !script.header.to_ascii_lowercase().contains("[script info]") {
            return Err(FilterError::Engine(format!(
                "{:?} is not a subtitle script",
                path
            )));
        }

        let mut document = MemoryDocument::new(self.stats());
        document.load_header(script.header.as_bytes());
        for chunk in &script.chunks {
            document.append_chunk(&chunk.data, chunk.start_ms(), chunk.duration_ms());
        }
        self.stats.files_loaded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Loaded script {:?}: {} events",
            path,
            document.event_count()
        );
        Ok(document)
    }

    fn add_font(&mut self, name: &str, data: &[u8]) {
        tracing::trace!("Adding font {:?} ({} bytes)", name, data.len());
        self.fonts.push(name.to_string());
    }

    fn set_fonts_dir(&mut self, dir: &Path) {
        self.fonts_dir = Some(dir.to_path_buf());
    }

    fn set_font_ligatures_disabled(&mut self, disabled: bool) {
        self.ligatures_disabled = disabled;
    }

    fn set_output_size(&mut self, size: Size) {
        self.output_size = size;
    }

    fn render_frame(&mut self, document: &MemoryDocument, timestamp_ms: i64) -> EngineFrame {
        let events = document.visible_at(timestamp_ms);
        let visible: Vec<i64> = events.iter().map(|e| e.read_order).collect();
        let changed = visible != self.last_visible;
        self.last_visible = visible;
        self.stats.frames_rendered.fetch_add(1, Ordering::Relaxed);

        EngineFrame {
            size: self.output_size,
            timestamp_ms,
            events,
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_duplicate_read_order_is_ignored() {
        let mut engine = MemoryEngine::new();
        let mut doc = engine.new_document().unwrap();
        doc.append_chunk(b"5,0,Default,,0,0,0,,A", 0, 1000);
        doc.append_chunk(b"5,0,Default,,0,0,0,,B", 0, 1000);
        assert_eq!(doc.event_count(), 1);
        assert_eq!(doc.text(5), Some("A"));
    }

    #[test]
    fn test_document_limit() {
        let mut engine = MemoryEngine::new().with_document_limit(1);
        let first = engine.new_document().unwrap();
        assert!(matches!(engine.new_document(), Err(FilterError::Engine(_))));
        drop(first);
        assert!(engine.new_document().is_ok());
    }

    #[test]
    fn test_render_visible_events() {
        let mut engine = MemoryEngine::new();
        engine.set_output_size(Size::new(1280, 720));
        let mut doc = engine.new_document().unwrap();
        doc.append_chunk(b"1,1,Sign,,0,0,0,,top", 0, 2000);
        doc.append_chunk(b"2,0,Default,,0,0,0,,bottom", 500, 1000);
        doc.append_chunk(b"3,0,Default,,0,0,0,,later", 5000, 1000);

        let frame = engine.render_frame(&doc, 1000);
        assert_eq!(frame.size, Size::new(1280, 720));
        let texts: Vec<&str> = frame.events.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["bottom", "top"]);
        assert!(frame.changed);

        let again = engine.render_frame(&doc, 1001);
        assert!(!again.changed);

        // end time is exclusive
        let after = engine.render_frame(&doc, 2000);
        assert!(after.is_empty());
    }

    #[test]
    fn test_flush_keeps_header() {
        let mut engine = MemoryEngine::new();
        let mut doc = engine.new_document().unwrap();
        doc.load_header(b"[Script Info]\n");
        doc.append_chunk(b"1,0,Default,,0,0,0,,x", 0, 10);
        doc.flush();
        assert_eq!(doc.event_count(), 0);
        assert_eq!(doc.header(), "[Script Info]\n");
    }

    #[test]
    fn test_documents_are_released_on_drop() {
        let mut engine = MemoryEngine::new();
        let stats = engine.stats();
        let a = engine.new_document().unwrap();
        let b = engine.new_document().unwrap();
        assert_eq!(stats.documents_live(), 2);
        drop(a);
        assert_eq!(stats.documents_live(), 1);
        drop(b);
        assert_eq!(stats.documents_live(), 0);
        assert_eq!(stats.documents_created(), 2);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[Script Info]\nTitle: t\n\n[Events]\n\
             Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
             Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,one\n\
             Dialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,two\n"
        )
        .unwrap();

        let mut engine = MemoryEngine::new();
        let doc = engine.load_file(file.path(), "UTF-8").unwrap();
        assert_eq!(doc.event_count(), 2);
        assert_eq!(doc.text(1), Some("two"));
        assert!(doc.header().contains("Title: t"));
        assert_eq!(engine.stats().files_loaded(), 1);
    }

    #[test]
    fn test_load_file_rejects_non_script() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1\n00:00:01,000 --> 00:00:02,000\nnot a script\n").unwrap();

        let mut engine = MemoryEngine::new();
        let err = engine.load_file(file.path(), "UTF-8").unwrap_err();
        assert!(matches!(err, FilterError::Engine(_)));
        assert_eq!(engine.stats().files_loaded(), 0);
        assert_eq!(engine.stats().documents_live(), 0);
    }
}
