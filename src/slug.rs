//! URL-safe identifiers for country display names.
//!
//! `"Saudi Arabia"` becomes `"saudi-arabia"`, `"Côte d'Ivoire"` becomes
//! `"cote-d-ivoire"`. The slug is only used to build the per-country file
//! path and is recomputed on demand.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static NON_SLUG_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("static slug pattern"));

/// Combining Diacritical Marks block.
pub(crate) fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Map a display name to its slug. Total over any input.
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let folded = folded.replace('&', "and");
    NON_SLUG_RUN
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}
