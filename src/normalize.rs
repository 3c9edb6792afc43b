//! Name normalization shared by the scorer and the batch reconciler.
//!
//! Turns free-text subject titles, usernames and teacher names into
//! underscore-separated ASCII keys so that accents, casing and separators
//! no longer matter when comparing spreadsheet exports against the database.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Separator used inside a normalized key.
pub const SEPARATOR: char = '_';

/// Catalan/Spanish function words that carry no signal for coverage scoring.
pub const DEFAULT_STOP_WORDS: [&str; 10] = ["de", "del", "la", "les", "el", "els", "en", "i", "a", "per"];

/// Tokens shorter than this are ignored for coverage scoring.
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 3;

/// Course-part suffixes recognised at the end of a key ("Taller II", "projectes_iv").
static TRAILING_ROMAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)_(i{1,3}|iv|vi?)$").unwrap());

/// Runs of separators left behind after punctuation is dropped.
static MULTI_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

// ============================================================================
// CHARACTER FOLDING
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII by applying NFKD decomposition and removing combining marks.
/// e.g., "Gràfica" → "grafica", "Disseny Ñ" → "disseny n", "Comunicació" → "comunicacio"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Anything still outside ASCII (Cyrillic, Greek, CJK) gets transliterated
    any_ascii(&stripped).to_lowercase()
}

// ============================================================================
// NORMALIZED KEYS
// ============================================================================

/// Normalize a display name into a comparison key.
///
/// Output contains only `[a-z0-9_]`, uses a single `_` between words and never
/// starts or ends with `_`. Whitespace, hyphens, underscores, slashes and
/// backslashes separate words; every other punctuation mark is dropped, so
/// "l'Art" and "lart" compare equal.
///
/// e.g., "Expressió Gràfica I" → "expressio_grafica_i",
///       "Projectes / Taller-II" → "projectes_taller_ii"
pub fn normalize_key(name: &str) -> String {
    let folded = fold_to_ascii(name);

    let mut key = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || matches!(c, '-' | '_' | '/' | '\\') {
            key.push(SEPARATOR);
        }
    }

    let collapsed = MULTI_SEPARATOR.replace_all(&key, "_");
    collapsed.trim_matches(SEPARATOR).to_string()
}

/// Split a normalized key into the tokens used for coverage scoring.
///
/// Drops stop words and tokens shorter than `min_len` characters, keeping the
/// original order: "historia_de_l_art_i" → ["historia", "art"].
pub fn key_tokens<'a>(key: &'a str, stop_words: &FxHashSet<String>, min_len: usize) -> Vec<&'a str> {
    key.split(SEPARATOR)
        .filter(|t| !t.is_empty())
        .filter(|t| t.chars().count() >= min_len)
        .filter(|t| !stop_words.contains(*t))
        .collect()
}

/// Default stop-word set as owned strings, ready for configuration.
pub fn default_stop_words() -> FxHashSet<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

/// Trailing Roman numeral of a key, lowercased, if the key ends in one.
///
/// Only I–VI count, and the numeral must follow at least one other word:
/// "taller_ii" → Some("ii"), "taller" → None, "v" → None.
pub fn trailing_roman_numeral(key: &str) -> Option<String> {
    TRAILING_ROMAN
        .captures(key)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Gràfica"), "grafica");
        assert_eq!(fold_to_ascii("Espanya"), "espanya");
        assert_eq!(fold_to_ascii("Ñandú"), "nandu");
        assert_eq!(fold_to_ascii("Façana"), "facana");
        assert_eq!(fold_to_ascii("Müller"), "muller");
    }

    #[test]
    fn test_normalize_key_basic() {
        assert_eq!(normalize_key("Expressió Gràfica I"), "expressio_grafica_i");
        assert_eq!(normalize_key("expressio_grafica_i"), "expressio_grafica_i");
        assert_eq!(normalize_key("  Taller   de  Projectes  "), "taller_de_projectes");
    }

    #[test]
    fn test_normalize_key_separators_and_punctuation() {
        assert_eq!(normalize_key("Projectes / Taller-II"), "projectes_taller_ii");
        assert_eq!(normalize_key(r"Art\Disseny"), "art_disseny");
        assert_eq!(normalize_key("Història de l'Art (Modern)"), "historia_de_lart_modern");
        assert_eq!(normalize_key("Cultura: visual, i crítica."), "cultura_visual_i_critica");
        assert_eq!(normalize_key("Col·lecció"), "colleccio");
        assert_eq!(normalize_key("--__--"), "");
    }

    #[test]
    fn test_normalize_key_empty() {
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn test_normalize_key_accent_insensitive() {
        assert_eq!(normalize_key("Disseny Gràfic"), normalize_key("Disseny Grafic"));
        assert_eq!(normalize_key("COMUNICACIÓ"), normalize_key("comunicacio"));
    }

    #[test]
    fn test_key_tokens_drops_stop_words_and_short_tokens() {
        let stop = default_stop_words();
        assert_eq!(
            key_tokens("historia_de_l_art_i", &stop, DEFAULT_MIN_TOKEN_LENGTH),
            vec!["historia", "art"]
        );
        assert_eq!(
            key_tokens("taller_per_projectes_ii", &stop, DEFAULT_MIN_TOKEN_LENGTH),
            vec!["taller", "projectes"]
        );
        assert!(key_tokens("", &stop, DEFAULT_MIN_TOKEN_LENGTH).is_empty());
    }

    #[test]
    fn test_key_tokens_respects_min_length() {
        let stop = FxHashSet::default();
        assert_eq!(key_tokens("ux_ui_web", &stop, 2), vec!["ux", "ui", "web"]);
        assert_eq!(key_tokens("ux_ui_web", &stop, 3), vec!["web"]);
    }

    #[test]
    fn test_trailing_roman_numeral() {
        assert_eq!(trailing_roman_numeral("taller_ii"), Some("ii".to_string()));
        assert_eq!(trailing_roman_numeral("projectes_iv"), Some("iv".to_string()));
        assert_eq!(trailing_roman_numeral("tipografia_vi"), Some("vi".to_string()));
        assert_eq!(trailing_roman_numeral("TALLER_III"), Some("iii".to_string()));
        assert_eq!(trailing_roman_numeral("taller"), None);
        assert_eq!(trailing_roman_numeral("taller_vii"), None);
        assert_eq!(trailing_roman_numeral("taller_xi"), None);
        assert_eq!(trailing_roman_numeral("v"), None);
        // Numeral must be the whole trailing word
        assert_eq!(trailing_roman_numeral("disseny_civi"), None);
    }

    proptest! {
        #[test]
        fn prop_normalize_key_idempotent(s in "\\PC{0,40}") {
            let once = normalize_key(&s);
            prop_assert_eq!(normalize_key(&once), once.clone());
        }

        #[test]
        fn prop_normalize_key_alphabet(s in "\\PC{0,40}") {
            let key = normalize_key(&s);
            prop_assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            prop_assert!(!key.starts_with('_') && !key.ends_with('_'));
            prop_assert!(!key.contains("__"));
        }
    }
}
