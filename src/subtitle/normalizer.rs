//! Line normalizer
//!
//! Turns received samples into the chunk layout the markup engine expects
//! for Matroska-muxed scripts:
//! `ReadOrder, Layer, Style, Name, MarginL, MarginR, MarginV, Effect, Text`.
//! SRT documents additionally get a script header synthesized from the
//! user's styling.

use crate::config::{FilterSettings, SrtStyle};
use crate::types::{MediaSubtype, SubtitleChunk, TICKS_PER_MS};

use super::srt_tags::srt_to_markup;

/// Reference design resolution of the synthesized style (the SSA default)
const BASE_RES_X: f64 = 384.0;
const BASE_RES_Y: f64 = 288.0;

/// Which ingestion path a negotiated subtype takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Plain text, header synthesized, ReadOrder derived from time
    Srt,
    /// Native script, header from codec private data, ledger applies
    Ass,
    /// Image based, never ingested
    Unsupported,
}

impl TrackKind {
    pub fn classify(subtype: MediaSubtype) -> Self {
        match subtype {
            MediaSubtype::Utf8 => TrackKind::Srt,
            MediaSubtype::Ass | MediaSubtype::Ssa => TrackKind::Ass,
            MediaSubtype::VobSub | MediaSubtype::Pgs => TrackKind::Unsupported,
        }
    }
}

/// A chunk ready for the markup engine
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLine {
    pub read_order: i64,
    pub text: String,
    pub start_ms: i64,
    pub duration_ms: i64,
}

/// Script header for SRT documents, scaled to the design resolution
pub fn srt_header(settings: &FilterSettings) -> String {
    let s = &settings.srt;
    let resx = f64::from(s.res_x) / BASE_RES_X;
    let resy = f64::from(s.res_y) / BASE_RES_Y;
    let scaled = |v: u32, ratio: f64| (f64::from(v) * ratio).round() as i64;
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    format!(
        "[Script Info]\n\
         ; Script generated by ParseSRT\n\
         Title: ParseSRT generated file\n\
         ScriptType: v4.00+\n\
         WrapStyle: 0\n\
         ScaledBorderAndShadow: {}\n\
         Kerning: {}\n\
         YCbCr Matrix: TV.709\n\
         PlayResX: {}\n\
         PlayResY: {}\n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
         BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
         BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,{},{},&H{:X},&H{:X},&H{:X},&H{:X},0,0,0,0,{},{},{},0,1,{},{},{},{},{},{},1\
         \n\n[Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\n",
        yes_no(settings.render.scaled_border_and_shadow),
        yes_no(settings.render.kerning),
        s.res_x,
        s.res_y,
        s.font_name,
        scaled(s.font_size, resy),
        s.color_primary,
        s.color_secondary,
        s.color_outline,
        s.color_shadow,
        s.font_scale_x,
        s.font_scale_y,
        s.font_spacing,
        s.font_outline,
        s.font_shadow,
        s.line_alignment,
        scaled(s.margin_left, resx),
        scaled(s.margin_right, resx),
        scaled(s.margin_vertical, resy),
    )
}

/// Sample payload as text, up to the first NUL
pub fn payload_text(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Normalize one SRT sample.
///
/// The ReadOrder is the start time truncated to milliseconds: SRT has no
/// ReadOrder of its own and replays reproduce the same value.
pub fn normalize_srt(chunk: &SubtitleChunk, style: &SrtStyle) -> NormalizedLine {
    let read_order = chunk.start / TICKS_PER_MS;
    let body = srt_to_markup(&payload_text(&chunk.data));
    let text = format!(
        "{},0,Default,Main,0,0,0,,{{\\blur{}}}{}{}",
        read_order, style.font_blur, style.custom_tags, body
    );

    NormalizedLine {
        read_order,
        text,
        start_ms: chunk.start_ms(),
        duration_ms: chunk.duration_ms(),
    }
}
