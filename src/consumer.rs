//! Frame delivery sink
//!
//! The consumer is the component that composites subtitle frames onto the
//! video. Besides taking frames it answers typed queries keyed by field
//! name; a field it does not know yields [`FieldAccess::NotSupported`]
//! rather than an error.

use crate::error::Result;
use crate::render::SubFrame;
use crate::types::{Rect, Size};

/// Result of a keyed field query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess<T> {
    Value(T),
    NotSupported,
}

impl<T> FieldAccess<T> {
    pub fn value(self) -> Option<T> {
        match self {
            FieldAccess::Value(v) => Some(v),
            FieldAccess::NotSupported => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, FieldAccess::Value(_))
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.value().unwrap_or(default)
    }
}

impl<T> From<Option<T>> for FieldAccess<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldAccess::Value(v),
            None => FieldAccess::NotSupported,
        }
    }
}

/// Field names queried on the consumer
pub mod fields {
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const VIDEO_OUTPUT_RECT: &str = "videoOutputRect";
    pub const ORIGINAL_VIDEO_SIZE: &str = "originalVideoSize";
}

/// A connected subtitle consumer
pub trait SubtitleConsumer: Send {
    /// Register this filter as the consumer's provider.
    ///
    /// Fails when the consumer already has a provider.
    fn connect(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    fn get_string(&self, field: &str) -> FieldAccess<String>;

    fn get_size(&self, field: &str) -> FieldAccess<Size>;

    fn get_rect(&self, field: &str) -> FieldAccess<Rect>;

    /// Hand over the frame for `[start, stop)`
    fn deliver_frame(&mut self, start: i64, stop: i64, frame: SubFrame) -> Result<()>;

    /// Drop cached frames; the next request starts from scratch
    fn clear(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_access() {
        let v: FieldAccess<u32> = Some(3).into();
        assert!(v.is_supported());
        assert_eq!(v.value(), Some(3));

        let n: FieldAccess<u32> = None.into();
        assert_eq!(n, FieldAccess::NotSupported);
        assert_eq!(n.unwrap_or(7), 7);
    }
}
