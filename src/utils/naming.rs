//! Name cleanup for everything that ends up inside generated MATLAB text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());
static UNSAFE_IDENT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());
static THICKNESS_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*th=.*$").unwrap());

/// NFKD-decompose, drop everything outside ASCII, collapse whitespace runs.
pub fn normalize_identifier(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    WHITESPACE_RUN.replace_all(&ascii, " ").trim().to_string()
}

/// Safe file stem on every OS.
pub fn sanitize_file_stem(name: &str) -> String {
    UNSAFE_FILE_CHARS
        .replace_all(name, "_")
        .trim_matches('_')
        .to_string()
}

pub fn sanitize_identifier(name: &str) -> String {
    UNSAFE_IDENT_CHARS.replace_all(name, "_").into_owned()
}

/// Display name for a contrast: drops a trailing `th=...` annotation and
/// escapes underscores so MATLAB legends do not render them as subscripts.
pub fn contrast_display_name(sample_name: &str) -> String {
    let label = THICKNESS_ANNOTATION.replace(sample_name, "");
    normalize_identifier(label.trim()).replace('_', r"\_")
}

/// Contents of a single-quoted MATLAB char array.
pub fn matlab_quote(text: &str) -> String {
    text.replace('\'', "''")
}

/// Returns `base`, or `base<sep>2`, `base<sep>3`, … when taken, and
/// records the result in `used`.
pub fn make_unique(base: &str, used: &mut HashSet<String>, separator: &str) -> String {
    let mut name = base.to_string();
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{}{}{}", base, separator, n);
        n += 1;
    }
    used.insert(name.clone());
    name
}
