use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Reference-clock ticks (100ns) per engine millisecond
pub const TICKS_PER_MS: i64 = 10_000;

/// Clock fields to ticks, `None` when the result does not fit
pub fn clock_to_ticks(hours: i64, minutes: i64, seconds: i64, millis: i64) -> Option<i64> {
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?
        .checked_mul(TICKS_PER_MS)
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Pixel rectangle, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }
}

/// One received subtitle sample
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleChunk {
    /// Start time in ticks
    pub start: i64,
    /// Stop time in ticks
    pub stop: i64,
    /// Raw sample payload
    pub data: Bytes,
}

impl SubtitleChunk {
    pub fn new(start: i64, stop: i64, data: impl Into<Bytes>) -> Self {
        Self {
            start,
            stop,
            data: data.into(),
        }
    }

    /// Start time in engine milliseconds
    pub fn start_ms(&self) -> i64 {
        self.start / TICKS_PER_MS
    }

    /// Duration in engine milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.stop - self.start) / TICKS_PER_MS
    }

    /// The same chunk moved by `offset` ticks
    pub fn shifted(&self, offset: i64) -> Self {
        Self {
            start: self.start.saturating_add(offset),
            stop: self.stop.saturating_add(offset),
            data: self.data.clone(),
        }
    }
}

/// Media subtypes the input pin can be offered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSubtype {
    /// UTF-8 plain text (SRT)
    Utf8,
    Ass,
    Ssa,
    VobSub,
    /// Blu-ray PGS
    Pgs,
}

impl MediaSubtype {
    /// Image based subtypes carry nothing the markup engine can consume
    pub fn is_bitmap(self) -> bool {
        matches!(self, MediaSubtype::VobSub | MediaSubtype::Pgs)
    }

    /// Label shown in the status page
    pub fn label(self) -> &'static str {
        match self {
            MediaSubtype::Utf8 => "SRT",
            MediaSubtype::Ass | MediaSubtype::Ssa => "ASS",
            MediaSubtype::VobSub => "VOBSUB",
            MediaSubtype::Pgs => "PGS",
        }
    }
}

/// The negotiated media type of the subtitle input
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFormat {
    pub subtype: MediaSubtype,
    /// ISO 639 language code from the container
    pub iso_lang: String,
    pub track_name: String,
    /// Out-of-band codec data (the script header for ASS/SSA)
    pub codec_private: Bytes,
}

impl MediaFormat {
    pub fn new(subtype: MediaSubtype) -> Self {
        Self {
            subtype,
            iso_lang: String::new(),
            track_name: String::new(),
            codec_private: Bytes::new(),
        }
    }

    pub fn with_language(mut self, iso_lang: impl Into<String>) -> Self {
        self.iso_lang = iso_lang.into();
        self
    }

    pub fn with_track_name(mut self, name: impl Into<String>) -> Self {
        self.track_name = name.into();
        self
    }

    pub fn with_codec_private(mut self, data: impl Into<Bytes>) -> Self {
        self.codec_private = data.into();
        self
    }
}

/// Text subtitle formats a document can be authored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleFormat {
    Ass,
    Srt,
}

impl SubtitleFormat {
    pub fn label(self) -> &'static str {
        match self {
            SubtitleFormat::Ass => "ASS",
            SubtitleFormat::Srt => "SRT",
        }
    }

    /// SRT documents carry absolute timing only and may be moved by the consumer
    pub fn is_movable(self) -> bool {
        self == SubtitleFormat::Srt
    }

    /// Format by file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ass" | "ssa" => Some(SubtitleFormat::Ass),
            "srt" => Some(SubtitleFormat::Srt),
            _ => None,
        }
    }
}

/// YCbCr matrix a script was authored for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMatrix {
    #[default]
    None,
    Tv601,
    Tv709,
}

impl ColorMatrix {
    /// Search a script header for a `YCbCr Matrix:` marker
    pub fn detect(header: &[u8]) -> Self {
        let contains = |needle: &[u8]| header.windows(needle.len()).any(|w| w == needle);
        if contains(b"YCbCr Matrix: TV.601") {
            ColorMatrix::Tv601
        } else if contains(b"YCbCr Matrix: TV.709") {
            ColorMatrix::Tv709
        } else {
            ColorMatrix::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorMatrix::None => "None",
            ColorMatrix::Tv601 => "TV.601",
            ColorMatrix::Tv709 => "TV.709",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_timing() {
        let chunk = SubtitleChunk::new(12_345_678, 32_345_678, "x");
        assert_eq!(chunk.start_ms(), 1234);
        assert_eq!(chunk.duration_ms(), 2000);

        let moved = chunk.shifted(10_000);
        assert_eq!(moved.start, 12_355_678);
        assert_eq!(moved.stop, 32_355_678);
    }

    #[test]
    fn test_shift_saturates() {
        let chunk = SubtitleChunk::new(0, i64::MAX - 5, "x");
        let moved = chunk.shifted(100);
        assert_eq!(moved.start, 100);
        assert_eq!(moved.stop, i64::MAX);
    }

    #[test]
    fn test_clock_to_ticks() {
        assert_eq!(clock_to_ticks(1, 2, 3, 450), Some(3_723_450 * TICKS_PER_MS));
        assert_eq!(clock_to_ticks(99_999_999_999_999_999, 0, 0, 0), None);
        assert_eq!(clock_to_ticks(i64::MAX, 0, 0, 0), None);
    }

    #[test]
    fn test_color_matrix_detect() {
        assert_eq!(
            ColorMatrix::detect(b"[Script Info]\nYCbCr Matrix: TV.601\n"),
            ColorMatrix::Tv601
        );
        assert_eq!(
            ColorMatrix::detect(b"[Script Info]\nYCbCr Matrix: TV.709\n"),
            ColorMatrix::Tv709
        );
        assert_eq!(
            ColorMatrix::detect(b"[Script Info]\nYCbCr Matrix: PC.709\n"),
            ColorMatrix::None
        );
        assert_eq!(ColorMatrix::detect(b""), ColorMatrix::None);
    }

    #[test]
    fn test_subtype_labels() {
        assert_eq!(MediaSubtype::Utf8.label(), "SRT");
        assert_eq!(MediaSubtype::Ssa.label(), "ASS");
        assert!(MediaSubtype::Pgs.is_bitmap());
        assert!(!MediaSubtype::Ass.is_bitmap());
    }

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::new(0, 0, 1280, 720);
        assert_eq!(rect.width(), 1280);
        assert_eq!(rect.height(), 720);
        assert_eq!(Rect::from_size(Size::new(640, 480)), Rect::new(0, 0, 640, 480));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SubtitleFormat::from_extension("SRT"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("ass"), Some(SubtitleFormat::Ass));
        assert_eq!(SubtitleFormat::from_extension("sub"), None);
    }
}
