//! Settings file support
//!
//! Loads filter settings from TOML files. Every key is optional: a key that
//! is missing from the file keeps its default value.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{FilterSettings, GeneralSettings, RenderSettings, SrtStyle};
use crate::error::Result;

/// Settings file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    /// General settings
    pub general: Option<GeneralSection>,
    /// Markup engine switches
    pub render: Option<RenderSection>,
    /// SRT styling
    pub srt: Option<SrtSection>,
    /// Logging settings
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralSection {
    pub tray_icon: Option<bool>,
    pub native_size: Option<bool>,
    pub custom_res: Option<u32>,
    pub disable_auto_load: Option<bool>,
    pub extra_fonts_dir: Option<String>,
    pub extra_subs_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderSection {
    pub scaled_border_and_shadow: Option<bool>,
    pub disable_font_ligatures: Option<bool>,
    pub kerning: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SrtSection {
    pub font_name: Option<String>,
    pub font_size: Option<u32>,
    pub font_scale_x: Option<u32>,
    pub font_scale_y: Option<u32>,
    pub font_spacing: Option<u32>,
    pub font_blur: Option<u32>,
    pub font_outline: Option<u32>,
    pub font_shadow: Option<u32>,
    pub line_alignment: Option<u32>,
    pub margin_left: Option<u32>,
    pub margin_right: Option<u32>,
    pub margin_vertical: Option<u32>,
    pub color_primary: Option<u32>,
    pub color_secondary: Option<u32>,
    pub color_outline: Option<u32>,
    pub color_shadow: Option<u32>,
    pub res_x: Option<u32>,
    pub res_y: Option<u32>,
    pub custom_tags: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

macro_rules! apply {
    ($section:expr, $target:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(v) = $section.$field {
                $target.$field = v;
            }
        )*
    };
}

impl SettingsFile {
    /// Load a settings file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let file: SettingsFile = toml::from_str(&content)?;
        Ok(file)
    }

    /// Save the settings file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Fully populated file for the given settings
    pub fn from_settings(settings: &FilterSettings) -> Self {
        let GeneralSettings {
            tray_icon,
            native_size,
            custom_res,
            disable_auto_load,
            extra_fonts_dir,
            extra_subs_dir,
        } = settings.general.clone();
        let RenderSettings {
            scaled_border_and_shadow,
            disable_font_ligatures,
            kerning,
        } = settings.render.clone();
        let s: SrtStyle = settings.srt.clone();

        Self {
            general: Some(GeneralSection {
                tray_icon: Some(tray_icon),
                native_size: Some(native_size),
                custom_res: Some(custom_res),
                disable_auto_load: Some(disable_auto_load),
                extra_fonts_dir: Some(extra_fonts_dir),
                extra_subs_dir: Some(extra_subs_dir),
            }),
            render: Some(RenderSection {
                scaled_border_and_shadow: Some(scaled_border_and_shadow),
                disable_font_ligatures: Some(disable_font_ligatures),
                kerning: Some(kerning),
            }),
            srt: Some(SrtSection {
                font_name: Some(s.font_name),
                font_size: Some(s.font_size),
                font_scale_x: Some(s.font_scale_x),
                font_scale_y: Some(s.font_scale_y),
                font_spacing: Some(s.font_spacing),
                font_blur: Some(s.font_blur),
                font_outline: Some(s.font_outline),
                font_shadow: Some(s.font_shadow),
                line_alignment: Some(s.line_alignment),
                margin_left: Some(s.margin_left),
                margin_right: Some(s.margin_right),
                margin_vertical: Some(s.margin_vertical),
                color_primary: Some(s.color_primary),
                color_secondary: Some(s.color_secondary),
                color_outline: Some(s.color_outline),
                color_shadow: Some(s.color_shadow),
                res_x: Some(s.res_x),
                res_y: Some(s.res_y),
                custom_tags: Some(s.custom_tags),
            }),
            logging: None,
        }
    }

    /// Overlay the keys present in this file onto `base`
    pub fn apply_to(self, mut base: FilterSettings) -> FilterSettings {
        if let Some(g) = self.general {
            apply!(g, base.general, [
                tray_icon,
                native_size,
                custom_res,
                disable_auto_load,
                extra_fonts_dir,
                extra_subs_dir,
            ]);
        }
        if let Some(r) = self.render {
            apply!(r, base.render, [scaled_border_and_shadow, disable_font_ligatures, kerning]);
        }
        if let Some(s) = self.srt {
            apply!(s, base.srt, [
                font_name,
                font_size,
                font_scale_x,
                font_scale_y,
                font_spacing,
                font_blur,
                font_outline,
                font_shadow,
                line_alignment,
                margin_left,
                margin_right,
                margin_vertical,
                color_primary,
                color_secondary,
                color_outline,
                color_shadow,
                res_x,
                res_y,
                custom_tags,
            ]);
        }
        base
    }

    /// Configured log level, if any
    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

/// Load settings from `path` on top of the defaults.
///
/// A missing file is created with the default settings.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<FilterSettings> {
    let path = path.as_ref();
    if !path.exists() {
        let defaults = FilterSettings::default();
        save_settings(path, &defaults)?;
        tracing::info!("Created default settings file {:?}", path);
        return Ok(defaults);
    }
    let file = SettingsFile::from_file(path)?;
    Ok(file.apply_to(FilterSettings::default()))
}

/// Write all settings to `path`
pub fn save_settings<P: AsRef<Path>>(path: P, settings: &FilterSettings) -> Result<()> {
    SettingsFile::from_settings(settings).to_file(path)
}
