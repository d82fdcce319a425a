//! SRT markup to override-tag translation
//!
//! SRT carries a small HTML-like tag set. The markup engine only understands
//! `{\...}` override blocks, so every tag is rewritten or dropped.

use regex::{Captures, Regex};
use std::sync::OnceLock;

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static ATTR_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<(/?)([A-Za-z]+)(\s[^>]*)?/?>").expect("valid tag regex"))
}

fn attr_re() -> &'static Regex {
    ATTR_RE.get_or_init(|| {
        Regex::new(r#"(?i)(color|face|size)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
            .expect("valid attribute regex")
    })
}

/// Translate one SRT text payload into markup-engine text
pub fn srt_to_markup(text: &str) -> String {
    let text = text.trim_end_matches(['\r', '\n']);
    let text = text.replace("\r\n", "\n").replace('\n', "\\N");

    tag_re()
        .replace_all(&text, |caps: &Captures| {
            let closing = !caps[1].is_empty();
            let name = caps[2].to_ascii_lowercase();
            match name.as_str() {
                "b" | "i" | "u" | "s" => {
                    format!("{{\\{}{}}}", name, if closing { 0 } else { 1 })
                }
                "font" if closing => "{\\r}".to_string(),
                "font" => font_overrides(caps.get(3).map_or("", |m| m.as_str())),
                _ => String::new(),
            }
        })
        .into_owned()
}

/// Override block for the attributes of an opening `<font>` tag
fn font_overrides(attrs: &str) -> String {
    let mut tags = String::new();
    for caps in attr_re().captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        match caps[1].to_ascii_lowercase().as_str() {
            "color" => {
                if let Some(bgr) = parse_color(value) {
                    tags.push_str(&format!("\\c&H{:06X}&", bgr));
                }
            }
            "face" if !value.is_empty() => tags.push_str(&format!("\\fn{}", value)),
            "size" => {
                if let Ok(size) = value.parse::<u32>() {
                    tags.push_str(&format!("\\fs{}", size));
                }
            }
            _ => {}
        }
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", tags)
    }
}

/// Parse an HTML color into the engine's BGR order
fn parse_color(value: &str) -> Option<u32> {
    let hex = match value.to_ascii_lowercase().as_str() {
        "white" => "ffffff".to_string(),
        "black" => "000000".to_string(),
        "red" => "ff0000".to_string(),
        "lime" | "green" => "00ff00".to_string(),
        "blue" => "0000ff".to_string(),
        "yellow" => "ffff00".to_string(),
        "cyan" | "aqua" => "00ffff".to_string(),
        "magenta" | "fuchsia" => "ff00ff".to_string(),
        "gray" | "grey" => "808080".to_string(),
        other => other.trim_start_matches('#').to_string(),
    };
    if hex.len() != 6 {
        return None;
    }
    let rgb = u32::from_str_radix(&hex, 16).ok()?;
    let (r, g, b) = ((rgb >> 16) & 0xFF, (rgb >> 8) & 0xFF, rgb & 0xFF);
    Some((b << 16) | (g << 8) | r)
}
