//! Full ASS/SSA scripts
//!
//! Splits a script file into the header (what a container stores as codec
//! private data) and per-event chunks in the muxed layout, so files and
//! streams feed the engine the same way.

use crate::types::{clock_to_ticks, SubtitleChunk};

/// A script split into header and event chunks
#[derive(Debug, Clone, Default)]
pub struct SplitScript {
    /// Everything up to and including the `[Events]` format line
    pub header: String,
    /// One chunk per `Dialogue:` line, ReadOrder = position in the file
    pub chunks: Vec<SubtitleChunk>,
}

/// Split a script into header and muxed-layout chunks
pub fn split_script(source: &str) -> SplitScript {
    let source = source.trim_start_matches('\u{feff}');
    let mut header = String::new();
    let mut chunks = Vec::new();
    let mut section = String::new();
    let mut read_order: i64 = 0;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            section = trimmed.to_ascii_lowercase();
            if section != "[fonts]" && section != "[graphics]" {
                header.push_str(trimmed);
                header.push('\n');
            }
            continue;
        }

        match section.as_str() {
            "[events]" => {
                if let Some(body) = strip_key(trimmed, "Dialogue:") {
                    match dialogue_chunk(body, read_order) {
                        Some(chunk) => {
                            chunks.push(chunk);
                            read_order += 1;
                        }
                        None => tracing::debug!("Skipping malformed dialogue line: {}", trimmed),
                    }
                } else if strip_key(trimmed, "Format:").is_some() {
                    header.push_str(trimmed);
                    header.push('\n');
                }
            }
            "[fonts]" | "[graphics]" => {}
            _ => {
                header.push_str(line.trim_end());
                header.push('\n');
            }
        }
    }

    SplitScript { header, chunks }
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    match line.get(..key.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(key) => Some(line[key.len()..].trim_start()),
        _ => None,
    }
}

/// `Layer,Start,End,Style,Name,MarginL,MarginR,MarginV,Effect,Text` to
/// `ReadOrder,Layer,Style,Name,MarginL,MarginR,MarginV,Effect,Text`
fn dialogue_chunk(body: &str, read_order: i64) -> Option<SubtitleChunk> {
    let fields: Vec<&str> = body.splitn(10, ',').collect();
    if fields.len() != 10 {
        return None;
    }
    let start = parse_timestamp(fields[1])?;
    let end = parse_timestamp(fields[2])?;
    let data = format!(
        "{},{},{}",
        read_order,
        fields[0].trim(),
        fields[3..].join(",")
    );
    Some(SubtitleChunk::new(start, end.max(start), data))
}

/// `H:MM:SS.CC` to ticks
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let mut parts = value.trim().split(':');
    let hours: i64 = parts.next()?.trim().parse().ok()?;
    let minutes: i64 = parts.next()?.trim().parse().ok()?;
    let seconds = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    let (secs, frac) = seconds.split_once('.').unwrap_or((seconds, "0"));
    let secs: i64 = secs.parse().ok()?;
    let centis: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.get(..2)?.parse().ok()?,
    };
    clock_to_ticks(hours, minutes, secs, centis * 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TICKS_PER_MS;

    const SCRIPT: &str = "\u{feff}[Script Info]\n\
        Title: Test\n\
        ScriptType: v4.00+\n\
        YCbCr Matrix: TV.601\n\
        \n\
        [V4+ Styles]\n\
        Format: Name, Fontname, Fontsize\n\
        Style: Default,Arial,20\n\
        \n\
        [Events]\n\
        Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
        Dialogue: 0,0:00:01.00,0:00:03.50,Default,,0,0,0,,Hello, world\n\
        Comment: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,note\n\
        Dialogue: 1,0:01:00.25,0:01:02.00,Sign,Bob,10,10,10,,{\\an8}Top\n\
        \n\
        [Fonts]\n\
        fontname: a.ttf\n\
        M3\n";

    #[test]
    fn test_split_header() {
        let split = split_script(SCRIPT);
        assert!(split.header.starts_with("[Script Info]\n"));
        assert!(split.header.contains("YCbCr Matrix: TV.601\n"));
        assert!(split.header.contains("Style: Default,Arial,20\n"));
        assert!(split.header.ends_with(
            "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
        ));
        assert!(!split.header.contains("Dialogue"));
        assert!(!split.header.contains("fontname"));
    }

    #[test]
    fn test_split_chunks() {
        let split = split_script(SCRIPT);
        assert_eq!(split.chunks.len(), 2);

        let first = &split.chunks[0];
        assert_eq!(first.start, 10_000_000);
        assert_eq!(first.stop, 35_000_000);
        assert_eq!(&first.data[..], b"0,0,Default,,0,0,0,,Hello, world");

        let second = &split.chunks[1];
        assert_eq!(second.start_ms(), 60_250);
        assert_eq!(&second.data[..], b"1,1,Sign,Bob,10,10,10,,{\\an8}Top");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("0:00:00.00"), Some(0));
        assert_eq!(parse_timestamp("1:02:03.45"), Some(3_723_450 * TICKS_PER_MS));
        assert_eq!(parse_timestamp("0:00:01.5"), Some(1_500 * TICKS_PER_MS));
        assert_eq!(parse_timestamp("0:00:01"), Some(1_000 * TICKS_PER_MS));
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_oversized_timestamp_is_rejected() {
        assert_eq!(parse_timestamp("99999999999999999:00:00.00"), None);
        let script = split_script(
            "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
             Dialogue: 0,99999999999999999:00:00.00,0:00:01.00,Default,,0,0,0,,huge\n\
             Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,fine\n",
        );
        assert_eq!(script.chunks.len(), 1);
        assert_eq!(script.chunks[0].start_ms(), 1000);
    }
}
