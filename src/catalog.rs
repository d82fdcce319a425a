//! External subtitle catalog
//!
//! Companion files found next to the playing media (or in the configured
//! extra folders) become selectable tracks. A track's file is parsed the
//! first time it is selected; the parsed document is appended to a
//! collection owned by the filter and the entry remembers its index, so no
//! file is ever parsed twice.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::FilterSettings;
use crate::engine::RenderEngine;
use crate::error::{FilterError, Result};
use crate::language::{match_language, LANGUAGES};
use crate::scanner::{find_matching_subs, split_extra_folders};
use crate::subtitle::srt_file::{is_utf8, load_srt_file, UTF8_CODE_PAGE};
use crate::types::{ColorMatrix, SubtitleFormat};

/// Code page assumed for SRT files of unknown language
pub const DEFAULT_CODE_PAGE: u32 = 1252;

const UNDETERMINED_CODE: &str = "und";

/// One selectable companion subtitle file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalSubtitleEntry {
    pub path: PathBuf,
    /// Display language name
    pub language: String,
    /// Name shown when the language is unknown, e.g. `forced` for `Movie.forced.srt`
    pub alt_name: String,
    pub format: SubtitleFormat,
    /// Code page the file is decoded with (SRT only)
    pub code_page: u32,
    pub color_matrix: ColorMatrix,
    /// Index into the filter's loaded documents, set on first selection
    pub document_index: Option<usize>,
}

impl ExternalSubtitleEntry {
    fn new(path: PathBuf, format: SubtitleFormat, language: &str, code_page: u32) -> Self {
        Self {
            path,
            language: language.to_string(),
            alt_name: String::new(),
            format,
            code_page: if format == SubtitleFormat::Srt { code_page } else { UTF8_CODE_PAGE },
            color_matrix: ColorMatrix::None,
            document_index: None,
        }
    }

    fn with_alt_name(mut self, alt_name: impl Into<String>) -> Self {
        self.alt_name = alt_name.into();
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.document_index.is_some()
    }

    /// Display name of the track
    pub fn track_name(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn format_of(path: &Path) -> Option<SubtitleFormat> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(SubtitleFormat::from_extension)
}

/// Classify a file found next to the media file.
///
/// `prefix` is the media file name without extension, with the trailing dot.
fn media_dir_entry(path: PathBuf, prefix: &str) -> Option<ExternalSubtitleEntry> {
    let format = format_of(&path)?;
    let name = file_name(&path);
    let lc_name = name.to_lowercase();
    let lc_prefix = prefix.to_lowercase();
    let ext = if format == SubtitleFormat::Ass { "ass" } else { "srt" };

    for lang in LANGUAGES {
        if lc_name == format!("{}{}.{}", lc_prefix, lang.code2, ext) {
            return Some(ExternalSubtitleEntry::new(path, format, lang.name, lang.code_page));
        }
    }

    let undetermined = match_language(UNDETERMINED_CODE);
    if lc_name == format!("{}{}", lc_prefix, ext) {
        return Some(ExternalSubtitleEntry::new(path, format, undetermined, DEFAULT_CODE_PAGE));
    }

    // anything between the prefix and the extension
    let alt_name = name
        .get(prefix.len()..name.len().saturating_sub(ext.len() + 1))
        .unwrap_or_default()
        .to_string();
    Some(ExternalSubtitleEntry::new(path, format, undetermined, DEFAULT_CODE_PAGE).with_alt_name(alt_name))
}

fn extra_dir_entry(path: PathBuf) -> Option<ExternalSubtitleEntry> {
    let format = format_of(&path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Some(
        ExternalSubtitleEntry::new(path, format, match_language(UNDETERMINED_CODE), DEFAULT_CODE_PAGE)
            .with_alt_name(stem),
    )
}

/// Selectable external tracks and the current selection
#[derive(Debug, Clone, Default)]
pub struct ExternalCatalog {
    entries: Vec<ExternalSubtitleEntry>,
    current: usize,
}

impl ExternalCatalog {
    pub fn new(entries: Vec<ExternalSubtitleEntry>) -> Self {
        Self {
            entries,
            current: 0,
        }
    }

    /// Find the companion subtitles of `media_path`.
    ///
    /// Files next to the media come first, then those in each extra folder
    /// (relative to the media's folder). Fails when nothing is found.
    pub fn discover(media_path: &Path, extra_subs_dir: &str) -> Result<Self> {
        let media_dir = media_path.parent().unwrap_or_else(|| Path::new("."));
        let prefix = match media_path.file_stem() {
            Some(stem) => format!("{}.", stem.to_string_lossy()),
            None => return Err(FilterError::NoSourcePath),
        };

        let mut entries: Vec<ExternalSubtitleEntry> = find_matching_subs(media_dir, &prefix)
            .into_iter()
            .filter_map(|path| media_dir_entry(path, &prefix))
            .collect();

        for folder in split_extra_folders(extra_subs_dir) {
            let found = find_matching_subs(&media_dir.join(&folder), "");
            tracing::debug!("Extra folder {:?}: {} subtitle file(s)", folder, found.len());
            entries.extend(found.into_iter().filter_map(extra_dir_entry));
        }

        if entries.is_empty() {
            return Err(FilterError::NoExternalSubtitles(
                media_path.to_string_lossy().into_owned(),
            ));
        }

        for entry in &entries {
            tracing::debug!(
                "External subtitle {:?}: {} {} (code page {})",
                entry.path,
                entry.format.label(),
                entry.language,
                entry.code_page
            );
        }
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[ExternalSubtitleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the selected entry
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_entry(&self) -> Option<&ExternalSubtitleEntry> {
        self.entries.get(self.current)
    }

    /// Document index of the selected entry, if it has been loaded
    pub fn current_document(&self) -> Option<usize> {
        self.current_entry().and_then(|e| e.document_index)
    }

    /// Select entry `index`, parsing its file on first selection.
    ///
    /// A rejected index leaves the selection unchanged.
    pub fn select<E: RenderEngine>(
        &mut self,
        index: usize,
        engine: &mut E,
        documents: &mut Vec<E::Document>,
        settings: &FilterSettings,
    ) -> Result<&ExternalSubtitleEntry> {
        let count = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(FilterError::InvalidIndex { index, count })?;

        if !entry.is_loaded() {
            let document = match entry.format {
                SubtitleFormat::Ass => {
                    let document = engine.load_file(&entry.path, "UTF-8")?;
                    entry.color_matrix = ColorMatrix::detect(&std::fs::read(&entry.path)?);
                    document
                }
                SubtitleFormat::Srt => {
                    if entry.code_page != UTF8_CODE_PAGE && is_utf8(&std::fs::read(&entry.path)?) {
                        tracing::debug!("{:?} is UTF-8, ignoring code page {}", entry.path, entry.code_page);
                        entry.code_page = UTF8_CODE_PAGE;
                    }
                    load_srt_file(engine, &entry.path, settings, entry.code_page)?
                }
            };
            documents.push(document);
            entry.document_index = Some(documents.len() - 1);
            tracing::info!("Loaded external subtitle {:?}", entry.path);
        }

        self.current = index;
        tracing::debug!("Selected external subtitle {} of {}", index, count);
        Ok(&self.entries[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, SubtitleDocument};

    const ASS: &str = "[Script Info]\nYCbCr Matrix: TV.709\n\n[Events]\n\
        Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
        Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,hi\n";

    fn media_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Movie.mkv", "Movie.en.srt", "Movie.ass", "Movie.Director Cut.srt", "Movie.ru.srt"] {
            std::fs::write(dir.path().join(name), "00:00:01,000 --> 00:00:02,000\nline\n").unwrap();
        }
        std::fs::write(dir.path().join("Movie.ass"), ASS).unwrap();
        std::fs::create_dir(dir.path().join("Subs")).unwrap();
        std::fs::write(dir.path().join("Subs").join("Signs.ass"), ASS).unwrap();
        dir
    }

    fn entry<'a>(catalog: &'a ExternalCatalog, name: &str) -> &'a ExternalSubtitleEntry {
        catalog
            .entries()
            .iter()
            .find(|e| file_name(&e.path) == name)
            .unwrap()
    }

    #[test]
    fn test_discover_classifies_files() {
        let dir = media_dir();
        let catalog = ExternalCatalog::discover(&dir.path().join("Movie.mkv"), "Subs").unwrap();
        assert_eq!(catalog.len(), 5);

        let en = entry(&catalog, "Movie.en.srt");
        assert_eq!(en.language, "English");
        assert_eq!(en.code_page, 1252);
        assert_eq!(en.alt_name, "");

        let ru = entry(&catalog, "Movie.ru.srt");
        assert_eq!(ru.language, "Russian");
        assert_eq!(ru.code_page, 1251);

        let plain = entry(&catalog, "Movie.ass");
        assert_eq!(plain.language, "Undetermined");
        assert_eq!(plain.format, SubtitleFormat::Ass);

        let cut = entry(&catalog, "Movie.Director Cut.srt");
        assert_eq!(cut.alt_name, "Director Cut");
        assert_eq!(cut.code_page, DEFAULT_CODE_PAGE);

        let signs = entry(&catalog, "Signs.ass");
        assert_eq!(signs.alt_name, "Signs");
        assert_eq!(signs.language, "Undetermined");
        // extra folder files come last
        assert_eq!(file_name(&catalog.entries()[4].path), "Signs.ass");
    }

    #[test]
    fn test_discover_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Movie.mkv"), b"").unwrap();
        let err = ExternalCatalog::discover(&dir.path().join("Movie.mkv"), "Subs").unwrap_err();
        assert!(matches!(err, FilterError::NoExternalSubtitles(_)));
    }

    #[test]
    fn test_select_loads_once() {
        let dir = media_dir();
        let mut catalog = ExternalCatalog::discover(&dir.path().join("Movie.mkv"), "").unwrap();
        let mut engine = MemoryEngine::new();
        let stats = engine.stats();
        let mut documents = Vec::new();
        let settings = FilterSettings::default();

        let index = catalog
            .entries()
            .iter()
            .position(|e| file_name(&e.path) == "Movie.ass")
            .unwrap();

        let selected = catalog.select(index, &mut engine, &mut documents, &settings).unwrap();
        assert_eq!(selected.document_index, Some(0));
        assert_eq!(selected.color_matrix, ColorMatrix::Tv709);
        assert_eq!(stats.files_loaded(), 1);

        catalog.select(index, &mut engine, &mut documents, &settings).unwrap();
        assert_eq!(stats.files_loaded(), 1);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].event_count(), 1);
        assert_eq!(catalog.current(), index);
        assert_eq!(catalog.current_document(), Some(0));
    }

    #[test]
    fn test_select_utf8_srt_switches_code_page() {
        let dir = media_dir();
        let mut catalog = ExternalCatalog::discover(&dir.path().join("Movie.mkv"), "").unwrap();
        let mut engine = MemoryEngine::new();
        let mut documents = Vec::new();
        let settings = FilterSettings::default();

        let index = catalog
            .entries()
            .iter()
            .position(|e| file_name(&e.path) == "Movie.ru.srt")
            .unwrap();
        let selected = catalog.select(index, &mut engine, &mut documents, &settings).unwrap();
        assert_eq!(selected.code_page, UTF8_CODE_PAGE);
        assert!(selected.format.is_movable());
    }

    #[test]
    fn test_select_invalid_index() {
        let dir = media_dir();
        let mut catalog = ExternalCatalog::discover(&dir.path().join("Movie.mkv"), "").unwrap();
        let mut engine = MemoryEngine::new();
        let mut documents = Vec::new();
        let count = catalog.len();

        let err = catalog
            .select(count, &mut engine, &mut documents, &FilterSettings::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidIndex { index, count: c } if index == count && c == count));
        assert_eq!(catalog.current(), 0);
        assert!(documents.is_empty());
    }
}
