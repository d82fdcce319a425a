//! Companion file scanning

use std::path::{Path, PathBuf};

/// Placeholder in the fonts directory pattern for the media file's folder
pub const FILE_DIR_TOKEN: &str = "{FILE_DIR}";

const SUBTITLE_EXTENSIONS: [&str; 2] = ["ass", "srt"];
const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Regular files in `dir` passing `keep`, sorted by name.
/// An unreadable directory yields nothing.
fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot read {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && keep(path.as_path()))
        .collect();
    files.sort();
    files
}

/// `.ass`/`.srt` files in `dir` whose name starts with `prefix`
/// (case-insensitive). An empty prefix matches every subtitle file.
pub fn find_matching_subs(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let prefix = prefix.to_lowercase();
    list_files(dir, |path| {
        has_extension(path, &SUBTITLE_EXTENSIONS)
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_lowercase().starts_with(&prefix))
                .unwrap_or(false)
    })
}

/// Split the `;` separated extra folder list.
///
/// Names are trimmed, compared case-insensitively, de-duplicated and
/// sorted. Empty names and `.` (the media folder itself) are skipped.
pub fn split_extra_folders(list: &str) -> Vec<String> {
    let mut folders: Vec<String> = list
        .split(';')
        .map(str::trim)
        .filter(|f| !f.is_empty() && *f != ".")
        .map(str::to_string)
        .collect();
    folders.sort_by_key(|f| f.to_lowercase());
    folders.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    folders
}

/// Expand the fonts directory pattern for a media file in `media_dir`.
/// Relative results are taken relative to `media_dir`.
pub fn fonts_dir(pattern: &str, media_dir: &Path) -> PathBuf {
    let expanded = pattern.replace(FILE_DIR_TOKEN, &media_dir.to_string_lossy());
    let path = PathBuf::from(expanded);
    if path.is_relative() {
        media_dir.join(path)
    } else {
        path
    }
}

/// Font files in `dir`
pub fn list_fonts(dir: &Path) -> Vec<PathBuf> {
    list_files(dir, |path| has_extension(path, &FONT_EXTENSIONS))
}
