//! Test fixtures: a recording consumer and a scripted graph host

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::FilterSettings;
use crate::consumer::{fields, FieldAccess, SubtitleConsumer};
use crate::engine::{EngineStats, MemoryEngine};
use crate::error::{FilterError, Result};
use crate::filter::AssFilter;
use crate::host::{AttachedFont, GraphHost};
use crate::render::SubFrame;
use crate::types::{MediaFormat, MediaSubtype, Rect, Size, SubtitleChunk, TICKS_PER_MS};

/// Everything a [`MockConsumer`] saw
#[derive(Debug, Default)]
pub struct ConsumerLog {
    pub connects: usize,
    pub disconnects: usize,
    pub clears: usize,
    pub frames: Vec<SubFrame>,
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub output_rect: Rect,
    pub original_size: Option<Size>,
    pub refuse_connect: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            output_rect: Rect::new(0, 0, 1280, 720),
            original_size: Some(Size::new(720, 480)),
            refuse_connect: false,
        }
    }
}

pub struct MockConsumer {
    config: ConsumerConfig,
    log: Arc<Mutex<ConsumerLog>>,
}

impl SubtitleConsumer for MockConsumer {
    fn connect(&mut self) -> Result<()> {
        if self.config.refuse_connect {
            return Err(FilterError::InvalidState("already connected".into()));
        }
        self.log.lock().connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.log.lock().disconnects += 1;
        Ok(())
    }

    fn get_string(&self, field: &str) -> FieldAccess<String> {
        match field {
            fields::NAME => FieldAccess::Value("MockRenderer".to_string()),
            fields::VERSION => FieldAccess::Value("1.2.3".to_string()),
            _ => FieldAccess::NotSupported,
        }
    }

    fn get_size(&self, field: &str) -> FieldAccess<Size> {
        match field {
            fields::ORIGINAL_VIDEO_SIZE => self.config.original_size.into(),
            _ => FieldAccess::NotSupported,
        }
    }

    fn get_rect(&self, field: &str) -> FieldAccess<Rect> {
        match field {
            fields::VIDEO_OUTPUT_RECT => FieldAccess::Value(self.config.output_rect),
            _ => FieldAccess::NotSupported,
        }
    }

    fn deliver_frame(&mut self, _start: i64, _stop: i64, frame: SubFrame) -> Result<()> {
        self.log.lock().frames.push(frame);
        Ok(())
    }

    fn clear(&mut self) {
        self.log.lock().clears += 1;
    }
}

/// Graph host handing out [`MockConsumer`]s sharing one log
#[derive(Default)]
pub struct MockHost {
    pub source: Option<PathBuf>,
    pub fonts: Vec<AttachedFont>,
    pub consumer: ConsumerConfig,
    pub log: Arc<Mutex<ConsumerLog>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn frames(&self) -> usize {
        self.log.lock().frames.len()
    }

    pub fn last_frame(&self) -> Option<SubFrame> {
        self.log.lock().frames.last().cloned()
    }

    pub fn clears(&self) -> usize {
        self.log.lock().clears
    }
}

impl GraphHost for MockHost {
    fn source_path(&self) -> Option<PathBuf> {
        self.source.clone()
    }

    fn attachments(&self) -> Vec<AttachedFont> {
        self.fonts.clone()
    }

    fn find_consumer(&self) -> Option<Box<dyn SubtitleConsumer>> {
        Some(Box::new(MockConsumer {
            config: self.consumer.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

/// Filter over a fresh in-process engine, plus the engine's counters
pub fn new_filter(settings: FilterSettings) -> (AssFilter<MemoryEngine>, Arc<EngineStats>) {
    let engine = MemoryEngine::new();
    let stats = engine.stats();
    (AssFilter::new(engine, settings).unwrap(), stats)
}

/// Filter joined to the graph with a negotiated track and a connected consumer
pub fn streaming_filter(format: &MediaFormat, host: &MockHost) -> AssFilter<MemoryEngine> {
    let (filter, _) = new_filter(FilterSettings::default());
    filter.join_graph("AssFilterMod");
    filter.set_media_type(format, host).unwrap();
    filter.pause(host);
    filter
}

pub const ASS_HEADER: &str = "[Script Info]\nScriptType: v4.00+\nYCbCr Matrix: TV.601\n\n\
    [V4+ Styles]\nFormat: Name, Fontname, Fontsize\nStyle: Default,Arial,20\n\n\
    [Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

pub fn ass_format() -> MediaFormat {
    MediaFormat::new(MediaSubtype::Ass)
        .with_language("eng")
        .with_track_name("Signs & Songs")
        .with_codec_private(ASS_HEADER)
}

pub fn srt_format() -> MediaFormat {
    MediaFormat::new(MediaSubtype::Utf8)
        .with_language("fre")
        .with_track_name("French")
}

/// Muxed ASS sample: `start_ms..stop_ms` with the given ReadOrder and text
pub fn ass_sample(read_order: i64, start_ms: i64, stop_ms: i64, text: &str) -> SubtitleChunk {
    SubtitleChunk::new(
        start_ms * TICKS_PER_MS,
        stop_ms * TICKS_PER_MS,
        format!("{},0,Default,,0,0,0,,{}", read_order, text),
    )
}

pub fn srt_sample(start_ms: i64, stop_ms: i64, text: &str) -> SubtitleChunk {
    SubtitleChunk::new(start_ms * TICKS_PER_MS, stop_ms * TICKS_PER_MS, text.to_string())
}
