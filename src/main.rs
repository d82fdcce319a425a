//! Subtitle filter probe
//!
//! Replays a subtitle file through the filter as a timed sample stream (or,
//! with `--media`, loads the companion subtitles of a media file) and
//! prints the frame rendered at a timestamp.

use clap::Parser;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assfilter::catalog::DEFAULT_CODE_PAGE;
use assfilter::config_file::SettingsFile;
use assfilter::consumer::fields;
use assfilter::filter::FILTER_NAME;
use assfilter::subtitle::script::split_script;
use assfilter::subtitle::srt_file::{decode, is_utf8, parse_srt, UTF8_CODE_PAGE};
use assfilter::types::{SubtitleFormat, TICKS_PER_MS};
use assfilter::{
    AssFilter, AttachedFont, ExternalSubtitleEntry, FieldAccess, FilterError, FilterSettings,
    GraphHost, MediaFormat, MediaSubtype, MemoryEngine, ReceiveOutcome, Rect, Result, Size,
    SubFrame, SubtitleChunk, SubtitleConsumer, TrackInfo, AUTOLOAD_NAME,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "assfilter-probe";

const PROBE_SIZE: Size = Size::new(1920, 1080);

/// Frame duration used for the frame request
const FRAME_TICKS: i64 = 40 * TICKS_PER_MS;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Subtitle file (.ass or .srt) replayed as a sample stream
    #[arg(required_unless_present = "media", conflicts_with = "media")]
    input: Option<PathBuf>,

    /// Media file whose companion subtitle files are loaded
    #[arg(long)]
    media: Option<PathBuf>,

    /// Settings file, created with the defaults when missing
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timestamp of the rendered frame, in milliseconds
    #[arg(long = "at", default_value_t = 0)]
    at_ms: i64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Consumer that keeps the last delivered frame
struct ProbeConsumer {
    delivered: Arc<Mutex<Option<SubFrame>>>,
}

impl SubtitleConsumer for ProbeConsumer {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_string(&self, field: &str) -> FieldAccess<String> {
        match field {
            fields::NAME => FieldAccess::Value(APP_NAME.to_string()),
            fields::VERSION => FieldAccess::Value(VERSION.to_string()),
            _ => FieldAccess::NotSupported,
        }
    }

    fn get_size(&self, field: &str) -> FieldAccess<Size> {
        match field {
            fields::ORIGINAL_VIDEO_SIZE => FieldAccess::Value(PROBE_SIZE),
            _ => FieldAccess::NotSupported,
        }
    }

    fn get_rect(&self, field: &str) -> FieldAccess<Rect> {
        match field {
            fields::VIDEO_OUTPUT_RECT => FieldAccess::Value(Rect::from_size(PROBE_SIZE)),
            _ => FieldAccess::NotSupported,
        }
    }

    fn deliver_frame(&mut self, _start: i64, _stop: i64, frame: SubFrame) -> Result<()> {
        *self.delivered.lock() = Some(frame);
        Ok(())
    }

    fn clear(&mut self) {
        *self.delivered.lock() = None;
    }
}

struct ProbeHost {
    source: Option<PathBuf>,
    delivered: Arc<Mutex<Option<SubFrame>>>,
}

impl GraphHost for ProbeHost {
    fn source_path(&self) -> Option<PathBuf> {
        self.source.clone()
    }

    fn attachments(&self) -> Vec<AttachedFont> {
        Vec::new()
    }

    fn find_consumer(&self) -> Option<Box<dyn SubtitleConsumer>> {
        Some(Box::new(ProbeConsumer {
            delivered: Arc::clone(&self.delivered),
        }))
    }
}

#[derive(Debug, Default, Serialize)]
struct ProbeReport {
    track: TrackInfo,
    external: Vec<ExternalSubtitleEntry>,
    received: usize,
    duplicates: usize,
    frame: Option<SubFrame>,
}

/// Media type and samples for a subtitle file
fn load_stream(path: &Path) -> Result<(MediaFormat, Vec<SubtitleChunk>)> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match SubtitleFormat::from_extension(ext) {
        Some(SubtitleFormat::Ass) => {
            let script = split_script(&decode(&bytes, UTF8_CODE_PAGE));
            let format = MediaFormat::new(MediaSubtype::Ass)
                .with_track_name(name)
                .with_language("und")
                .with_codec_private(script.header.into_bytes());
            Ok((format, script.chunks))
        }
        Some(SubtitleFormat::Srt) => {
            let code_page = if is_utf8(&bytes) { UTF8_CODE_PAGE } else { DEFAULT_CODE_PAGE };
            let chunks = parse_srt(&decode(&bytes, code_page));
            let format = MediaFormat::new(MediaSubtype::Utf8)
                .with_track_name(name)
                .with_language("und");
            Ok((format, chunks))
        }
        None => Err(FilterError::UnsupportedSubtype(ext.to_string())),
    }
}

fn run(args: &Args, settings: FilterSettings) -> Result<ProbeReport> {
    let delivered = Arc::new(Mutex::new(None));
    let host = ProbeHost {
        source: args.media.clone(),
        delivered: Arc::clone(&delivered),
    };
    let filter = AssFilter::new(MemoryEngine::new(), settings)?;
    let mut report = ProbeReport::default();

    if args.media.is_some() {
        filter.join_graph(AUTOLOAD_NAME);
        filter.pause(&host);
        report.external = filter.external_entries();
    } else if let Some(input) = &args.input {
        let (format, chunks) = load_stream(input)?;
        filter.join_graph(FILTER_NAME);
        filter.set_media_type(&format, &host)?;
        filter.pause(&host);
        for chunk in &chunks {
            match filter.receive(chunk, 0)? {
                ReceiveOutcome::Appended { .. } => report.received += 1,
                ReceiveOutcome::Duplicate => report.duplicates += 1,
                ReceiveOutcome::Ignored => {}
            }
        }
    }

    report.track = filter.track_info();
    let start = args.at_ms * TICKS_PER_MS;
    filter.request_frame(start, start + FRAME_TICKS)?;
    report.frame = delivered.lock().take();
    Ok(report)
}

fn print_report(report: &ProbeReport) {
    println!(
        "Track: {} [{}] {}",
        report.track.name, report.track.subtype, report.track.language
    );
    for (i, entry) in report.external.iter().enumerate() {
        println!(
            "  #{} {} {} {}",
            i,
            entry.format.label(),
            entry.language,
            entry.path.display()
        );
    }
    if report.external.is_empty() {
        println!("Samples: {} appended, {} duplicate", report.received, report.duplicates);
    }
    match &report.frame {
        Some(frame) if !frame.is_empty() => {
            println!("Frame #{} at {} ms:", frame.id, frame.frame.timestamp_ms);
            for event in &frame.frame.events {
                println!("  [{}] {}: {}", event.layer, event.style, event.text);
            }
        }
        Some(frame) => println!("Frame #{} at {} ms: empty", frame.id, frame.frame.timestamp_ms),
        None => println!("No frame delivered"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings_file = match &args.config {
        Some(path) if path.exists() => Some(SettingsFile::from_file(path)?),
        _ => None,
    };

    // Initialize logging
    init_logging(settings_file.as_ref());
    tracing::debug!("{} v{} starting", APP_NAME, VERSION);

    let settings = match (settings_file, &args.config) {
        (Some(file), _) => file.apply_to(FilterSettings::default()),
        // creates the file with the defaults
        (None, Some(path)) => assfilter::config_file::load_settings(path)?,
        (None, None) => FilterSettings::default(),
    };

    let report = run(&args, settings)?;
    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| FilterError::Config(e.to_string()))?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(settings: Option<&SettingsFile>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        settings
            .and_then(|s| s.log_level())
            .map(|level| format!("assfilter={}", level))
            .unwrap_or_else(|| "assfilter=info".to_string())
            .into()
    });
    let json = settings
        .and_then(|s| s.logging.as_ref())
        .and_then(|l| l.format.as_deref())
        == Some("json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_args() {
        let args =
            Args::try_parse_from(["assfilter-probe", "a.srt", "--at", "2500", "--json"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("a.srt")));
        assert_eq!(args.at_ms, 2500);
        assert!(args.json);

        let args = Args::try_parse_from(["assfilter-probe", "--media", "m.mkv"]).unwrap();
        assert_eq!(args.media, Some(PathBuf::from("m.mkv")));
        assert_eq!(args.at_ms, 0);
    }

    #[test]
    fn test_args_need_exactly_one_source() {
        assert!(Args::try_parse_from(["assfilter-probe"]).is_err());
        assert!(Args::try_parse_from(["assfilter-probe", "a.srt", "--media", "m.mkv"]).is_err());
    }

    #[test]
    fn test_load_stream_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        std::fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi\n").unwrap();

        let (format, chunks) = load_stream(&path).unwrap();
        assert_eq!(format.subtype, MediaSubtype::Utf8);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_load_stream_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.sub");
        std::fs::write(&path, "x").unwrap();
        assert!(load_stream(&path).is_err());
    }

    #[test]
    fn test_run_replays_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        std::fs::write(
            &path,
            "1\n00:00:01,000 --> 00:00:03,000\nFirst\n\n2\n00:00:02,000 --> 00:00:04,000\nSecond\n",
        )
        .unwrap();

        let args = Args {
            input: Some(path),
            at_ms: 2500,
            ..Default::default()
        };
        let report = run(&args, FilterSettings::default()).unwrap();
        assert_eq!(report.received, 2);
        assert_eq!(report.track.subtype, "SRT");
        let frame = report.frame.unwrap();
        assert_eq!(frame.id, 0);
        assert_eq!(frame.frame.events.len(), 2);
    }
}
