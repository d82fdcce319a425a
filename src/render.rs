//! Frame rendering
//!
//! Decides the rectangle subtitles are rendered on and packages engine
//! output into frames tagged with a per-connection sequence id.

use serde::Serialize;

use crate::config::GeneralSettings;
use crate::engine::EngineFrame;
use crate::types::{Rect, Size};

/// Rectangle to render on.
///
/// With `native_size` off the consumer's output rectangle is used as is.
/// Otherwise the frame is sized to the original video or to the fixed
/// resolution picked by `custom_res`. When the consumer can't report the
/// original size, the output rectangle's size stands in.
pub fn resolve_video_rect(
    general: &GeneralSettings,
    output_rect: Rect,
    original_size: Option<Size>,
) -> Rect {
    if !general.native_size {
        return output_rect;
    }
    let original = original_size.unwrap_or(Size::new(output_rect.width(), output_rect.height()));
    let size = general.custom_resolution().resolve(original);
    Rect::from_size(size)
}

/// Engine frame size for a video rectangle; the frame spans from the origin
/// to the rectangle's bottom-right corner.
pub fn frame_size(rect: &Rect) -> Size {
    Size::new(rect.right.max(0) as u32, rect.bottom.max(0) as u32)
}

/// A rendered frame as handed to the consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubFrame {
    pub rect: Rect,
    /// Sequence id, restarts at 0 for every consumer connection
    pub id: u64,
    pub frame: EngineFrame,
}

impl SubFrame {
    pub fn new(rect: Rect, id: u64, frame: EngineFrame) -> Self {
        Self { rect, id, frame }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}

/// Frame id counter
#[derive(Debug, Default)]
pub struct FrameSequence {
    next: u64,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// The id the next frame will get
    pub fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general(native_size: bool, custom_res: u32) -> GeneralSettings {
        GeneralSettings {
            native_size,
            custom_res,
            ..Default::default()
        }
    }

    #[test]
    fn test_output_rect_used_verbatim() {
        let output = Rect::new(0, 140, 1920, 940);
        let rect = resolve_video_rect(&general(false, 3), output, Some(Size::new(720, 480)));
        assert_eq!(rect, output);
        assert_eq!(frame_size(&rect), Size::new(1920, 940));
    }

    #[test]
    fn test_fixed_resolution_ignores_output_rect() {
        let output = Rect::new(0, 0, 1366, 768);
        let rect = resolve_video_rect(&general(true, 3), output, Some(Size::new(720, 480)));
        assert_eq!(rect, Rect::new(0, 0, 1920, 1080));
        assert_eq!(frame_size(&rect), Size::new(1920, 1080));
    }

    #[test]
    fn test_native_size_uses_original() {
        let output = Rect::new(0, 0, 1366, 768);
        let original = Size::new(720, 480);
        assert_eq!(
            resolve_video_rect(&general(true, 0), output, Some(original)),
            Rect::new(0, 0, 720, 480)
        );
        // out of range selector
        assert_eq!(
            resolve_video_rect(&general(true, 12), output, Some(original)),
            Rect::new(0, 0, 720, 480)
        );
        // consumer without an original size
        assert_eq!(
            resolve_video_rect(&general(true, 0), output, None),
            Rect::new(0, 0, 1366, 768)
        );
    }

    #[test]
    fn test_frame_sequence() {
        let mut seq = FrameSequence::new();
        assert_eq!(seq.next_id(), 0);
        assert_eq!(seq.next_id(), 1);
        assert_eq!(seq.peek(), 2);
        seq.reset();
        assert_eq!(seq.next_id(), 0);
    }
}
