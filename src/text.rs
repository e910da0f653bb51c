//! Text folding used to compare place names.
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Returns `text` without diacritics (e.g. `"Zürich"` -> `"Zurich"`)
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Returns `text` without diacritics, lowercased, with every run of non-word
/// characters collapsed into a single space (e.g. `"São  Paulo/Guarulhos"` -> `"sao paulo guarulhos"`).
pub fn normalize(text: &str) -> String {
    strip_diacritics(text)
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
