//! Filter settings

use serde::{Deserialize, Serialize};

use crate::types::Size;

/// Playback-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Show the tray icon while the filter is in a graph
    pub tray_icon: bool,

    /// Render at a fixed resolution instead of the consumer's output rect
    pub native_size: bool,

    /// Index into the fixed resolution list, see [`CustomResolution`]
    pub custom_res: u32,

    /// Do not auto-load companion subtitle files
    pub disable_auto_load: bool,

    /// Directory with extra fonts; `{FILE_DIR}` expands to the media directory
    pub extra_fonts_dir: String,

    /// Semicolon separated folders, relative to the media directory, searched for subtitles
    pub extra_subs_dir: String,
}

impl GeneralSettings {
    /// The resolution selected by `custom_res`
    pub fn custom_resolution(&self) -> CustomResolution {
        CustomResolution::from_index(self.custom_res)
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            tray_icon: false,
            native_size: false,
            custom_res: 0,
            disable_auto_load: false,
            extra_fonts_dir: "{FILE_DIR}".to_string(),
            extra_subs_dir: "Subs".to_string(),
        }
    }
}

/// Markup engine switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub scaled_border_and_shadow: bool,
    pub disable_font_ligatures: bool,
    pub kerning: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            scaled_border_and_shadow: true,
            disable_font_ligatures: false,
            kerning: false,
        }
    }
}

/// Styling applied to SRT (plain text) subtitles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrtStyle {
    pub font_name: String,
    pub font_size: u32,
    pub font_scale_x: u32,
    pub font_scale_y: u32,
    pub font_spacing: u32,
    pub font_blur: u32,
    pub font_outline: u32,
    pub font_shadow: u32,

    /// Numpad-style alignment code (1..=9)
    pub line_alignment: u32,

    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_vertical: u32,

    /// Colors as ABGR words, the way the markup language writes `&H..`
    pub color_primary: u32,
    pub color_secondary: u32,
    pub color_outline: u32,
    pub color_shadow: u32,

    /// Design resolution the margins and font size are authored against
    pub res_x: u32,
    pub res_y: u32,

    /// Override tags prepended to every SRT line
    pub custom_tags: String,
}

impl Default for SrtStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 18,
            font_scale_x: 100,
            font_scale_y: 100,
            font_spacing: 0,
            font_blur: 0,
            font_outline: 2,
            font_shadow: 3,
            line_alignment: 2,
            margin_left: 20,
            margin_right: 20,
            margin_vertical: 10,
            color_primary: 0x00FF_FFFF,
            color_secondary: 0x0000_FFFF,
            color_outline: 0,
            color_shadow: 0x7F00_0000,
            res_x: 1920,
            res_y: 1080,
            custom_tags: String::new(),
        }
    }
}

/// All persisted filter settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub general: GeneralSettings,
    pub render: RenderSettings,
    pub srt: SrtStyle,
}

/// Fixed rendering resolutions selectable when `native_size` is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomResolution {
    /// The original video's dimensions
    Original,
    Fixed(Size),
}

/// Index 1.. of the selector, index 0 is the original size
const FIXED_RESOLUTIONS: [(u32, u32); 8] = [
    (3840, 2160),
    (2560, 1440),
    (1920, 1080),
    (1440, 900),
    (1280, 720),
    (1024, 768),
    (800, 600),
    (640, 480),
];

impl CustomResolution {
    /// Map a selector index; unknown indices fall back to the original size
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => CustomResolution::Original,
            i => FIXED_RESOLUTIONS
                .get(i as usize - 1)
                .map(|&(w, h)| CustomResolution::Fixed(Size::new(w, h)))
                .unwrap_or(CustomResolution::Original),
        }
    }

    /// Resolve against the original video size
    pub fn resolve(self, original: Size) -> Size {
        match self {
            CustomResolution::Original => original,
            CustomResolution::Fixed(size) => size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FilterSettings::default();
        assert_eq!(settings.srt.font_name, "Arial");
        assert_eq!(settings.srt.font_size, 18);
        assert_eq!(settings.srt.res_x, 1920);
        assert_eq!(settings.srt.color_shadow, 0x7F00_0000);
        assert!(settings.render.scaled_border_and_shadow);
        assert_eq!(settings.general.extra_subs_dir, "Subs");
    }

    #[test]
    fn test_custom_resolution_table() {
        assert_eq!(CustomResolution::from_index(0), CustomResolution::Original);
        assert_eq!(
            CustomResolution::from_index(1),
            CustomResolution::Fixed(Size::new(3840, 2160))
        );
        assert_eq!(
            CustomResolution::from_index(3),
            CustomResolution::Fixed(Size::new(1920, 1080))
        );
        assert_eq!(
            CustomResolution::from_index(8),
            CustomResolution::Fixed(Size::new(640, 480))
        );
    }

    #[test]
    fn test_custom_resolution_out_of_range() {
        let original = Size::new(720, 576);
        assert_eq!(CustomResolution::from_index(9).resolve(original), original);
        assert_eq!(CustomResolution::from_index(42).resolve(original), original);
    }
}
