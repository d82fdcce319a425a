//! ISO 639 language matching

/// Display name for unknown codes
pub const UNDETERMINED: &str = "Undetermined";

/// A known language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code2: &'static str,
    pub code3: &'static str,
    pub name: &'static str,
    /// Windows code page SRT files in this language are usually written in
    pub code_page: u32,
}

const fn lang(code2: &'static str, code3: &'static str, name: &'static str, code_page: u32) -> Language {
    Language {
        code2,
        code3,
        name,
        code_page,
    }
}

pub const LANGUAGES: &[Language] = &[
    lang("ar", "ara", "Arabic", 1256),
    lang("bg", "bul", "Bulgarian", 1251),
    lang("ca", "cat", "Catalan", 1252),
    lang("cs", "cze", "Czech", 1250),
    lang("da", "dan", "Danish", 1252),
    lang("de", "ger", "German", 1252),
    lang("el", "gre", "Greek", 1253),
    lang("en", "eng", "English", 1252),
    lang("es", "spa", "Spanish", 1252),
    lang("et", "est", "Estonian", 1257),
    lang("fa", "per", "Persian", 1256),
    lang("fi", "fin", "Finnish", 1252),
    lang("fr", "fre", "French", 1252),
    lang("he", "heb", "Hebrew", 1255),
    lang("hi", "hin", "Hindi", 0),
    lang("hr", "hrv", "Croatian", 1250),
    lang("hu", "hun", "Hungarian", 1250),
    lang("id", "ind", "Indonesian", 1252),
    lang("is", "ice", "Icelandic", 1252),
    lang("it", "ita", "Italian", 1252),
    lang("ja", "jpn", "Japanese", 932),
    lang("ko", "kor", "Korean", 949),
    lang("lt", "lit", "Lithuanian", 1257),
    lang("lv", "lav", "Latvian", 1257),
    lang("mk", "mac", "Macedonian", 1251),
    lang("ms", "may", "Malay", 1252),
    lang("nl", "dut", "Dutch", 1252),
    lang("no", "nor", "Norwegian", 1252),
    lang("pl", "pol", "Polish", 1250),
    lang("pt", "por", "Portuguese", 1252),
    lang("ro", "rum", "Romanian", 1250),
    lang("ru", "rus", "Russian", 1251),
    lang("sk", "slo", "Slovak", 1250),
    lang("sl", "slv", "Slovenian", 1250),
    lang("sq", "alb", "Albanian", 1250),
    lang("sr", "srp", "Serbian", 1251),
    lang("sv", "swe", "Swedish", 1252),
    lang("th", "tha", "Thai", 874),
    lang("tr", "tur", "Turkish", 1254),
    lang("uk", "ukr", "Ukrainian", 1251),
    lang("vi", "vie", "Vietnamese", 1258),
    lang("zh", "chi", "Chinese", 936),
];

/// Bibliographic/terminologic code pairs that differ
const ALIASES: &[(&str, &str)] = &[
    ("ces", "cze"),
    ("deu", "ger"),
    ("ell", "gre"),
    ("fas", "per"),
    ("fra", "fre"),
    ("isl", "ice"),
    ("mkd", "mac"),
    ("msa", "may"),
    ("nld", "dut"),
    ("ron", "rum"),
    ("slk", "slo"),
    ("sqi", "alb"),
    ("zho", "chi"),
];

/// Look up a 2- or 3-letter code, case-insensitive
pub fn find_language(code: &str) -> Option<&'static Language> {
    let code = code.trim().to_ascii_lowercase();
    let code = ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(code);
    match code.len() {
        2 => LANGUAGES.iter().find(|l| l.code2 == code),
        3 => LANGUAGES.iter().find(|l| l.code3 == code),
        _ => None,
    }
}

/// Display name for a code; unknown codes are "Undetermined"
pub fn match_language(code: &str) -> &'static str {
    find_language(code).map(|l| l.name).unwrap_or(UNDETERMINED)
}

/// Status-page label: `"English (eng)"`
pub fn display_language(code: &str) -> String {
    format!("{} ({})", match_language(code), code)
}
