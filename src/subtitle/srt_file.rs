//! SRT files
//!
//! Companion `.srt` files are decoded from their code page, split into cues,
//! and pushed through the same normalization as streamed SRT samples.

use encoding_rs::Encoding;
use std::path::Path;

use crate::config::FilterSettings;
use crate::engine::{RenderEngine, SubtitleDocument};
use crate::error::Result;
use crate::types::{clock_to_ticks, SubtitleChunk};

use super::normalizer::{normalize_srt, srt_header};

/// Code page 0 means the file is UTF-8
pub const UTF8_CODE_PAGE: u32 = 0;

/// Encoding for a Windows code page; unknown pages decode as Windows-1252
pub fn encoding_for_code_page(code_page: u32) -> &'static Encoding {
    match code_page {
        UTF8_CODE_PAGE | 65001 => encoding_rs::UTF_8,
        874 => encoding_rs::WINDOWS_874,
        932 => encoding_rs::SHIFT_JIS,
        936 => encoding_rs::GBK,
        949 => encoding_rs::EUC_KR,
        950 => encoding_rs::BIG5,
        1250 => encoding_rs::WINDOWS_1250,
        1251 => encoding_rs::WINDOWS_1251,
        1253 => encoding_rs::WINDOWS_1253,
        1254 => encoding_rs::WINDOWS_1254,
        1255 => encoding_rs::WINDOWS_1255,
        1256 => encoding_rs::WINDOWS_1256,
        1257 => encoding_rs::WINDOWS_1257,
        1258 => encoding_rs::WINDOWS_1258,
        _ => encoding_rs::WINDOWS_1252,
    }
}

/// Whether `bytes` is UTF-8 (with or without BOM)
pub fn is_utf8(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes).is_ok()
}

/// Decode file contents using `code_page`
pub fn decode(bytes: &[u8], code_page: u32) -> String {
    // decode() sniffs and strips a BOM, overriding the code page
    let (text, _, had_errors) = encoding_for_code_page(code_page).decode(bytes);
    if had_errors {
        tracing::warn!("Subtitle text is not valid in code page {}", code_page);
    }
    text.into_owned()
}

/// Split SRT text into timed cues
pub fn parse_srt(text: &str) -> Vec<SubtitleChunk> {
    let text = text.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in text.split("\n\n") {
        let mut lines = block.lines().skip_while(|l| l.trim().is_empty());
        let Some(mut timing) = lines.next() else {
            continue;
        };
        // counter line is optional
        if !timing.contains("-->") {
            match lines.next() {
                Some(next) => timing = next,
                None => continue,
            }
        }
        let Some((start, stop)) = parse_timing(timing) else {
            tracing::debug!("Skipping SRT block with bad timing: {:?}", timing);
            continue;
        };
        let body: Vec<&str> = lines.collect();
        let body = body.join("\n");
        if body.trim().is_empty() {
            continue;
        }
        cues.push(SubtitleChunk::new(start, stop, body));
    }

    cues
}

/// `00:00:01,000 --> 00:00:02,500` to ticks
fn parse_timing(line: &str) -> Option<(i64, i64)> {
    let (start, stop) = line.split_once("-->")?;
    // position hints may follow the stop time
    let stop = stop.split_whitespace().next()?;
    Some((parse_srt_time(start)?, parse_srt_time(stop)?))
}

fn parse_srt_time(value: &str) -> Option<i64> {
    let value = value.trim().replace('.', ",");
    let (clock, millis) = value.split_once(',').unwrap_or((value.as_str(), "0"));
    let mut parts = clock.split(':');
    let hours: i64 = parts.next()?.trim().parse().ok()?;
    let minutes: i64 = parts.next()?.trim().parse().ok()?;
    let seconds: i64 = parts.next()?.trim().parse().ok()?;
    let millis: i64 = millis.trim().parse().ok()?;
    clock_to_ticks(hours, minutes, seconds, millis)
}

/// Build a document from an SRT file
pub fn load_srt_file<E: RenderEngine>(
    engine: &mut E,
    path: &Path,
    settings: &FilterSettings,
    code_page: u32,
) -> Result<E::Document> {
    let bytes = std::fs::read(path)?;
    let text = decode(&bytes, code_page);

    let mut document = engine.new_document()?;
    document.load_header(srt_header(settings).as_bytes());
    for cue in parse_srt(&text) {
        let line = normalize_srt(&cue, &settings.srt);
        document.append_chunk(line.text.as_bytes(), line.start_ms, line.duration_ms);
    }
    tracing::debug!(
        "Loaded SRT {:?} (code page {}): {} events",
        path,
        code_page,
        document.event_count()
    );
    Ok(document)
}
