//! The playback graph the filter lives in

use bytes::Bytes;
use std::path::PathBuf;

use crate::consumer::SubtitleConsumer;

pub const MIME_TRUETYPE: &str = "application/x-truetype-font";
pub const MIME_OPENTYPE: &str = "application/vnd.ms-opentype";

/// Name under which the filter is added for companion-file playback
pub const AUTOLOAD_NAME: &str = "AssFilterMod(AutoLoad)";

/// A resource attached to the media container
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedFont {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

impl AttachedFont {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Whether the markup engine can use this attachment
    pub fn is_font(&self) -> bool {
        self.mime == MIME_TRUETYPE || self.mime == MIME_OPENTYPE
    }
}

/// Services the hosting graph provides to the filter
pub trait GraphHost {
    /// Path of the file being played, if a file source is present
    fn source_path(&self) -> Option<PathBuf>;

    /// Attachments of the container feeding the subtitle input
    fn attachments(&self) -> Vec<AttachedFont>;

    /// Find a consumer able to take subtitle frames
    fn find_consumer(&self) -> Option<Box<dyn SubtitleConsumer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_mimes() {
        assert!(AttachedFont::new("a.ttf", MIME_TRUETYPE, &b"x"[..]).is_font());
        assert!(AttachedFont::new("b.otf", MIME_OPENTYPE, &b"x"[..]).is_font());
        assert!(!AttachedFont::new("c.png", "image/png", &b"x"[..]).is_font());
    }
}
