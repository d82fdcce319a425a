//! The subtitle filter
//!
//! Owns the track document, the duplicate ledger, the external catalog and
//! the consumer connection. All of it sits behind one lock; every public
//! method holds that lock for its whole duration.

use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;

use crate::catalog::{ExternalCatalog, ExternalSubtitleEntry};
use crate::config::FilterSettings;
use crate::config_file::save_settings;
use crate::consumer::{fields, FieldAccess, SubtitleConsumer};
use crate::engine::{EngineFrame, RenderEngine, SubtitleDocument};
use crate::error::{FilterError, Result};
use crate::host::{GraphHost, AUTOLOAD_NAME};
use crate::language::display_language;
use crate::render::{frame_size, resolve_video_rect, FrameSequence, SubFrame};
use crate::scanner::{fonts_dir, list_fonts};
use crate::subtitle::{normalize_srt, srt_header, DuplicateLedger, Resolution, TrackKind};
use crate::types::{ColorMatrix, MediaFormat, MediaSubtype, Rect, Size, SubtitleChunk, TICKS_PER_MS};

pub const FILTER_NAME: &str = "AssFilterMod";
pub const FILTER_VERSION: &str = "0.4.0.0";
pub const OUTPUT_LEVELS: &str = "PC";

/// Track name shown for image based subtitles
pub const NOT_SUPPORTED_NAME: &str = "Not supported!";

/// Option names of the field accessor protocol
pub mod options {
    pub const COMBINE_BITMAPS: &str = "combineBitmaps";
    pub const IS_MOVABLE: &str = "isMovable";
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const YUV_MATRIX: &str = "yuvMatrix";
    pub const OUTPUT_LEVELS: &str = "outputLevels";
}

/// The document built from the input pin
enum TrackState<D> {
    Uninitialized,
    Srt { document: D, header_sent: bool },
    Ass { document: D, ledger: DuplicateLedger },
    Unsupported { subtype: MediaSubtype },
}

impl<D: SubtitleDocument> TrackState<D> {
    fn document(&self) -> Option<&D> {
        match self {
            TrackState::Srt { document, .. } | TrackState::Ass { document, .. } => Some(document),
            TrackState::Uninitialized | TrackState::Unsupported { .. } => None,
        }
    }

    fn flush(&mut self) {
        match self {
            TrackState::Srt { document, .. } => document.flush(),
            TrackState::Ass { document, ledger } => {
                document.flush();
                ledger.clear();
            }
            TrackState::Uninitialized | TrackState::Unsupported { .. } => {}
        }
    }
}

/// Companion file discovery in autoload mode
enum ExternalState {
    /// Not looked for yet
    Pending,
    Loaded(ExternalCatalog),
    /// Nothing usable found; stays this way for the session
    Unavailable,
}

/// Where subtitles come from
enum InputMode {
    /// Samples arrive on the input pin
    Stream,
    /// Companion files next to the playing media
    External(ExternalState),
}

/// Membership in the playback graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphState {
    Detached,
    /// Joined, first pause not seen yet
    Joined,
    Running,
}

/// Outcome of [`AssFilter::receive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Appended to the document under `read_order`
    Appended { read_order: i64 },
    /// Identical to a line already held
    Duplicate,
    /// The filter takes no samples in its current mode
    Ignored,
}

/// Name, language and type of the active track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    pub name: String,
    pub language: String,
    pub subtype: String,
}

/// Name and version reported by the connected consumer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct ProviderOptions {
    combine_bitmaps: bool,
    is_movable: bool,
    yuv_matrix: ColorMatrix,
}

struct FilterState<E: RenderEngine> {
    engine: E,
    settings: FilterSettings,
    graph: GraphState,
    mode: InputMode,
    track: TrackState<E::Document>,
    /// Parsed companion files, indexed by `ExternalSubtitleEntry::document_index`
    external_documents: Vec<E::Document>,
    consumer: Option<Box<dyn SubtitleConsumer>>,
    consumer_info: ConsumerInfo,
    frames: FrameSequence,
    track_info: TrackInfo,
    options: ProviderOptions,
}

impl<E: RenderEngine> FilterState<E> {
    fn catalog(&self) -> Option<&ExternalCatalog> {
        match &self.mode {
            InputMode::External(ExternalState::Loaded(catalog)) => Some(catalog),
            _ => None,
        }
    }

    fn clear_consumer(&mut self) {
        if let Some(consumer) = self.consumer.as_mut() {
            consumer.clear();
        }
    }

    fn load_attached_fonts(&mut self, host: &dyn GraphHost) {
        for font in host.attachments().into_iter().filter(|f| f.is_font()) {
            tracing::debug!("Loading attached font {:?}", font.name);
            self.engine.add_font(&font.name, &font.data);
        }
    }

    fn connect_consumer(&mut self, host: &dyn GraphHost) {
        let Some(mut consumer) = host.find_consumer() else {
            tracing::warn!("No subtitle consumer found in the graph");
            return;
        };
        if let Err(e) = consumer.connect() {
            tracing::debug!("Consumer refused the connection (already connected?): {}", e);
            return;
        }
        self.consumer_info = ConsumerInfo {
            name: consumer.get_string(fields::NAME).value().unwrap_or_default(),
            version: consumer.get_string(fields::VERSION).value().unwrap_or_default(),
        };
        self.frames.reset();
        tracing::info!(
            "Connected to consumer {} v{}",
            self.consumer_info.name,
            self.consumer_info.version
        );
        self.consumer = Some(consumer);
    }

    fn disconnect_consumer(&mut self) {
        if let Some(mut consumer) = self.consumer.take() {
            if let Err(e) = consumer.disconnect() {
                tracing::warn!("Failed to disconnect consumer: {}", e);
            }
        }
    }

    /// Discover companion files, hand the fonts to the engine and select
    /// the current entry
    fn load_external(&mut self, host: &dyn GraphHost) -> Result<ExternalCatalog> {
        let media_path = host.source_path().ok_or(FilterError::NoSourcePath)?;
        let mut catalog = ExternalCatalog::discover(&media_path, &self.settings.general.extra_subs_dir)?;

        let media_dir = media_path.parent().unwrap_or_else(|| Path::new("."));
        let fonts = fonts_dir(&self.settings.general.extra_fonts_dir, media_dir);
        for font in list_fonts(&fonts) {
            match std::fs::read(&font) {
                Ok(data) => {
                    let name = font.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    self.engine.add_font(&name, &data);
                }
                Err(e) => tracing::warn!("Cannot read font {:?}: {}", font, e),
            }
        }
        self.engine.set_fonts_dir(&fonts);

        // the current entry first, then the others in order
        let count = catalog.len();
        let first = catalog.current();
        let mut failure = None;
        for index in (first..count).chain(0..first) {
            match self.select_external(&mut catalog, index) {
                Ok(()) => return Ok(catalog),
                Err(e) => {
                    tracing::warn!("Cannot load {:?}: {}", catalog.entries()[index].path, e);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        Err(failure.unwrap_or_else(|| {
            FilterError::NoExternalSubtitles(media_path.display().to_string())
        }))
    }

    fn select_external(&mut self, catalog: &mut ExternalCatalog, index: usize) -> Result<()> {
        let entry = catalog.select(index, &mut self.engine, &mut self.external_documents, &self.settings)?;
        self.options.yuv_matrix = entry.color_matrix;
        self.options.is_movable = entry.format.is_movable();
        self.track_info = TrackInfo {
            name: entry.track_name(),
            language: entry.language.clone(),
            subtype: entry.format.label().to_string(),
        };
        self.clear_consumer();
        Ok(())
    }
}

/// The document frames are rendered from. `None` for image based tracks,
/// which have nothing to draw.
fn active_document<'a, D: SubtitleDocument>(
    mode: &'a InputMode,
    track: &'a TrackState<D>,
    external_documents: &'a [D],
) -> Result<Option<&'a D>> {
    match mode {
        InputMode::External(ExternalState::Loaded(catalog)) => {
            let index = catalog
                .current_document()
                .ok_or_else(|| FilterError::InvalidState("external subtitle not loaded".into()))?;
            Ok(external_documents.get(index))
        }
        InputMode::External(_) => Err(FilterError::InvalidState(
            "no external subtitles available".into(),
        )),
        InputMode::Stream => match track {
            TrackState::Uninitialized => Err(FilterError::InvalidState(
                "no media type negotiated".into(),
            )),
            track => Ok(track.document()),
        },
    }
}

/// Subtitle rendering filter
pub struct AssFilter<E: RenderEngine> {
    state: Mutex<FilterState<E>>,
}

impl<E: RenderEngine> AssFilter<E> {
    /// Create a filter rendering through `engine`
    pub fn new(mut engine: E, settings: FilterSettings) -> Result<Self> {
        let mut external_documents = Vec::new();
        external_documents
            .try_reserve(1)
            .map_err(|_| FilterError::OutOfMemory)?;

        engine.set_font_ligatures_disabled(settings.render.disable_font_ligatures);

        Ok(Self {
            state: Mutex::new(FilterState {
                engine,
                settings,
                graph: GraphState::Detached,
                mode: InputMode::Stream,
                track: TrackState::Uninitialized,
                external_documents,
                consumer: None,
                consumer_info: ConsumerInfo::default(),
                frames: FrameSequence::new(),
                track_info: TrackInfo::default(),
                options: ProviderOptions::default(),
            }),
        })
    }

    // ---- graph lifecycle ----

    /// Join the playback graph under `name`.
    ///
    /// Joining as `AssFilterMod(AutoLoad)` switches to companion-file mode.
    pub fn join_graph(&self, name: &str) {
        let mut state = self.state.lock();
        tracing::debug!("{} joined the graph", name);
        state.graph = GraphState::Joined;
        if name == AUTOLOAD_NAME {
            state.mode = InputMode::External(ExternalState::Pending);
        }
    }

    /// Leave the graph, dropping the consumer connection
    pub fn leave_graph(&self) {
        let mut state = self.state.lock();
        tracing::debug!("Left the graph");
        state.disconnect_consumer();
        state.graph = GraphState::Detached;
    }

    /// Input pins exposed; companion-file mode has none
    pub fn pin_count(&self) -> usize {
        match self.state.lock().mode {
            InputMode::External(_) => 0,
            InputMode::Stream => 1,
        }
    }

    /// Pause transition. The first one after joining loads companion files
    /// (in autoload mode) and connects to the consumer.
    pub fn pause(&self, host: &dyn GraphHost) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.graph != GraphState::Joined {
            return;
        }
        state.graph = GraphState::Running;

        if let InputMode::External(ExternalState::Pending) = state.mode {
            state.mode = match state.load_external(host) {
                Ok(catalog) => {
                    tracing::info!("Found {} external subtitle file(s)", catalog.len());
                    InputMode::External(ExternalState::Loaded(catalog))
                }
                Err(e) => {
                    tracing::info!("External subtitles disabled: {}", e);
                    InputMode::External(ExternalState::Unavailable)
                }
            };
        }

        if !matches!(state.mode, InputMode::External(ExternalState::Unavailable)) {
            state.connect_consumer(host);
        }
    }

    /// The consumer dropped its connection
    pub fn disconnect(&self) {
        tracing::debug!("Consumer disconnected");
        self.state.lock().consumer = None;
    }

    // ---- input pin ----

    /// Negotiate the input media type, replacing any previous track
    pub fn set_media_type(&self, format: &MediaFormat, host: &dyn GraphHost) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        tracing::debug!("Media type {:?}, language {:?}", format.subtype, format.iso_lang);

        let mut options = state.options;
        let mut track_info = TrackInfo {
            name: format.track_name.clone(),
            language: display_language(&format.iso_lang),
            subtype: format.subtype.label().to_string(),
        };
        // build the new track before touching any state, so a failed
        // negotiation leaves the previous one in place
        let track = match TrackKind::classify(format.subtype) {
            TrackKind::Srt => {
                options.is_movable = true;
                options.yuv_matrix = ColorMatrix::None;
                TrackState::Srt {
                    document: state.engine.new_document()?,
                    header_sent: false,
                }
            }
            TrackKind::Ass => {
                options.is_movable = false;
                options.yuv_matrix = ColorMatrix::detect(&format.codec_private);
                let mut document = state.engine.new_document()?;
                document.load_header(&format.codec_private);
                TrackState::Ass {
                    document,
                    ledger: DuplicateLedger::new(),
                }
            }
            TrackKind::Unsupported => {
                tracing::warn!("{} subtitles are not supported", format.subtype.label());
                track_info.name = NOT_SUPPORTED_NAME.to_string();
                options.yuv_matrix = ColorMatrix::None;
                TrackState::Unsupported {
                    subtype: format.subtype,
                }
            }
        };

        state.mode = InputMode::Stream;
        // fonts are only loaded for the first track; a later negotiation
        // drops the previous document and its ledger
        match state.track {
            TrackState::Uninitialized => state.load_attached_fonts(host),
            _ => state.clear_consumer(),
        }
        state.track = track;
        state.track_info = track_info;
        state.options = options;
        Ok(())
    }

    /// Take one sample. `segment_start` is added to both timestamps.
    pub fn receive(&self, sample: &SubtitleChunk, segment_start: i64) -> Result<ReceiveOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let InputMode::External(_) = state.mode {
            return Ok(ReceiveOutcome::Ignored);
        }

        let chunk = sample.shifted(segment_start);
        tracing::trace!("Sample start: {}, stop: {}", chunk.start, chunk.stop);

        match &mut state.track {
            TrackState::Uninitialized => Err(FilterError::InvalidState(
                "sample received before media type negotiation".into(),
            )),
            TrackState::Unsupported { .. } => Ok(ReceiveOutcome::Ignored),
            TrackState::Srt {
                document,
                header_sent,
            } => {
                if !*header_sent {
                    document.load_header(srt_header(&state.settings).as_bytes());
                    *header_sent = true;
                }
                let line = normalize_srt(&chunk, &state.settings.srt);
                document.append_chunk(line.text.as_bytes(), line.start_ms, line.duration_ms);
                Ok(ReceiveOutcome::Appended {
                    read_order: line.read_order,
                })
            }
            TrackState::Ass { document, ledger } => match ledger.resolve(&chunk) {
                Resolution::Drop => Ok(ReceiveOutcome::Duplicate),
                Resolution::Ingest {
                    original_read_order,
                    read_order,
                    data,
                } => {
                    tracing::trace!("ReadOrder {} ingested as {}", original_read_order, read_order);
                    document.append_chunk(&data, chunk.start_ms(), chunk.duration_ms());
                    Ok(ReceiveOutcome::Appended { read_order })
                }
            },
        }
    }

    /// Discontinuity: drop all received lines and forget the ledger
    pub fn flush(&self) {
        tracing::debug!("Flushing track");
        self.state.lock().track.flush();
    }

    // ---- frame provider ----

    /// Render the frame for `[start, stop)` and deliver it to the consumer
    pub fn request_frame(&self, start: i64, stop: i64) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        tracing::trace!("Frame request start: {}, stop: {}", start, stop);

        let consumer = state.consumer.as_mut().ok_or(FilterError::NotConnected)?;
        let output_rect = consumer
            .get_rect(fields::VIDEO_OUTPUT_RECT)
            .unwrap_or(Rect::default());
        let original_size = consumer.get_size(fields::ORIGINAL_VIDEO_SIZE).value();

        let rect = resolve_video_rect(&state.settings.general, output_rect, original_size);
        let size = frame_size(&rect);
        tracing::trace!("Output rect {:?}, video rect {:?}", output_rect, rect);
        state.engine.set_output_size(size);

        let timestamp_ms = start / TICKS_PER_MS;
        let frame = {
            let FilterState {
                engine,
                mode,
                track,
                external_documents,
                ..
            } = &mut *state;
            match active_document(mode, track, external_documents)? {
                Some(document) => engine.render_frame(document, timestamp_ms),
                None => EngineFrame::empty(size, timestamp_ms),
            }
        };

        let id = state.frames.next_id();
        let consumer = state.consumer.as_mut().ok_or(FilterError::NotConnected)?;
        consumer.deliver_frame(start, stop, SubFrame::new(rect, id, frame))
    }

    // ---- option accessors ----

    pub fn get_bool(&self, field: &str) -> FieldAccess<bool> {
        let opts = self.state.lock().options;
        match field {
            options::COMBINE_BITMAPS => FieldAccess::Value(opts.combine_bitmaps),
            options::IS_MOVABLE => FieldAccess::Value(opts.is_movable),
            _ => FieldAccess::NotSupported,
        }
    }

    pub fn get_int(&self, _field: &str) -> FieldAccess<i32> {
        FieldAccess::NotSupported
    }

    pub fn get_size(&self, _field: &str) -> FieldAccess<Size> {
        FieldAccess::NotSupported
    }

    pub fn get_rect(&self, _field: &str) -> FieldAccess<Rect> {
        FieldAccess::NotSupported
    }

    pub fn get_ulonglong(&self, _field: &str) -> FieldAccess<u64> {
        FieldAccess::NotSupported
    }

    pub fn get_double(&self, _field: &str) -> FieldAccess<f64> {
        FieldAccess::NotSupported
    }

    pub fn get_string(&self, field: &str) -> FieldAccess<String> {
        let value = match field {
            options::NAME => FILTER_NAME,
            options::VERSION => FILTER_VERSION,
            options::YUV_MATRIX => self.state.lock().options.yuv_matrix.as_str(),
            options::OUTPUT_LEVELS => OUTPUT_LEVELS,
            _ => return FieldAccess::NotSupported,
        };
        FieldAccess::Value(value.to_string())
    }

    pub fn get_bin(&self, _field: &str) -> FieldAccess<Vec<u8>> {
        FieldAccess::NotSupported
    }

    /// Only `combineBitmaps` can be changed by the consumer
    pub fn set_bool(&self, field: &str, value: bool) -> FieldAccess<()> {
        match field {
            options::COMBINE_BITMAPS => {
                self.state.lock().options.combine_bitmaps = value;
                FieldAccess::Value(())
            }
            _ => FieldAccess::NotSupported,
        }
    }

    pub fn set_int(&self, _field: &str, _value: i32) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    pub fn set_size(&self, _field: &str, _value: Size) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    pub fn set_rect(&self, _field: &str, _value: Rect) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    pub fn set_ulonglong(&self, _field: &str, _value: u64) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    pub fn set_double(&self, _field: &str, _value: f64) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    pub fn set_string(&self, _field: &str, _value: &str) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    pub fn set_bin(&self, _field: &str, _value: &[u8]) -> FieldAccess<()> {
        FieldAccess::NotSupported
    }

    // ---- status ----

    pub fn track_info(&self) -> TrackInfo {
        self.state.lock().track_info.clone()
    }

    pub fn consumer_info(&self) -> ConsumerInfo {
        self.state.lock().consumer_info.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().consumer.is_some()
    }

    /// Number of companion subtitle files found
    pub fn external_count(&self) -> usize {
        self.state.lock().catalog().map(|c| c.len()).unwrap_or(0)
    }

    pub fn current_external(&self) -> usize {
        self.state.lock().catalog().map(|c| c.current()).unwrap_or(0)
    }

    pub fn external_entries(&self) -> Vec<ExternalSubtitleEntry> {
        self.state
            .lock()
            .catalog()
            .map(|c| c.entries().to_vec())
            .unwrap_or_default()
    }

    /// Switch to companion file `index`, parsing it on first use
    pub fn set_current_external(&self, index: usize) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let InputMode::External(ExternalState::Loaded(catalog)) = &mut state.mode else {
            return Err(FilterError::InvalidIndex { index, count: 0 });
        };
        // detached while selecting so the state can be borrowed mutably
        let mut catalog = std::mem::take(catalog);
        let result = state.select_external(&mut catalog, index);
        state.mode = InputMode::External(ExternalState::Loaded(catalog));
        result
    }

    // ---- settings ----

    pub fn settings(&self) -> FilterSettings {
        self.state.lock().settings.clone()
    }

    /// Replace the settings. SRT styling applies to documents created afterwards.
    pub fn update_settings(&self, settings: FilterSettings) {
        let mut state = self.state.lock();
        state
            .engine
            .set_font_ligatures_disabled(settings.render.disable_font_ligatures);
        state.settings = settings;
    }

    pub fn save_settings(&self, path: &Path) -> Result<()> {
        save_settings(path, &self.state.lock().settings)
    }

    // ---- inspection ----

    /// Run `f` on the document frames are rendered from
    pub fn with_active_document<R>(&self, f: impl FnOnce(&E::Document) -> R) -> Result<Option<R>> {
        let state = self.state.lock();
        Ok(active_document(&state.mode, &state.track, &state.external_documents)?.map(f))
    }

    /// Run `f` on the rendering engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.state.lock().engine)
    }

    /// Ledger records held under `read_order` (ASS/SSA tracks only)
    pub fn ledger_count(&self, read_order: i64) -> usize {
        match &self.state.lock().track {
            TrackState::Ass { ledger, .. } => ledger.count(read_order),
            _ => 0,
        }
    }

    /// Subtype of an unsupported negotiated track
    pub fn unsupported_subtype(&self) -> Option<MediaSubtype> {
        match self.state.lock().track {
            TrackState::Unsupported { subtype } => Some(subtype),
            _ => None,
        }
    }
}

impl<E: RenderEngine> Drop for AssFilter<E> {
    fn drop(&mut self) {
        self.state.get_mut().disconnect_consumer();
    }
}
