//! Title/artist normalization shared by every step of the matching cascade.
//! Mirrors the suffix-stripping and transliteration approach found in the
//! lyrics-extraction normalizer: a list of version-suffix regexes, NFKD
//! decomposition, and an ASCII-only fallback pass for transliterated titles.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Version/edition suffixes stripped before comparing two titles. Order
/// matters only in that each one is applied independently; a title may
/// match several.
static SUFFIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\boriginal mix\b",
        r"(?i)\bradio edit\b",
        r"(?i)\bradio mix\b",
        r"(?i)\bextended mix\b",
        r"(?i)\bextended version\b",
        r"(?i)\bclub mix\b",
        r"(?i)\bdub mix\b",
        r"(?i)\bvip mix\b",
        r"(?i)\bbootleg\b",
        r"(?i)\bremaster(?:ed)?\b",
        r"(?i)\b(19|20)\d{2}\s+remaster(?:ed)?\b",
        r"(?i)\bdeluxe(?:\s+edition)?\b",
        r"(?i)\bbonus track\b",
        r"(?i)\balbum version\b",
        r"(?i)\bsingle version\b",
        r"(?i)\blive(?:\s+version)?\b",
        r"(?i)\bacoustic(?:\s+version)?\b",
        r"(?i)\binstrumental\b",
        r"(?i)\b(?:feat\.?|ft\.?|featuring)\b.*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static suffix pattern"))
    .collect()
});

static REMIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bremix\b").expect("static remix pattern"));

static PARENS_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[][^\)\]]*[\)\]]").expect("static parens pattern"));

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static space pattern"));

static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i),|&| x | vs\.? ").expect("static artist separator pattern")
});

/// Whether a title contains the whole word "remix", case-insensitive.
pub fn is_remix(title: &str) -> bool {
    REMIX_PATTERN.is_match(title)
}

/// Both titles agree on remix-ness: either both contain "remix" or neither
/// does. Prevents matching a remix to its non-remix counterpart.
pub fn remix_parity(a: &str, b: &str) -> bool {
    is_remix(a) == is_remix(b)
}

/// Lower-cases, strips parenthesized/bracketed segments and version
/// suffixes, truncates at " - ", NFKD-normalizes, and retains letters (any
/// script), digits and spaces. If `ascii_only` is set, non-ASCII letters are
/// dropped as well (to catch transliterated titles).
pub fn normalize_title(title: &str, ascii_only: bool) -> String {
    let lower = title.to_lowercase();
    let no_parens = PARENS_BRACKETS.replace_all(&lower, " ");
    let mut stripped = no_parens.into_owned();
    for pattern in SUFFIX_PATTERNS.iter() {
        stripped = pattern.replace_all(&stripped, " ").into_owned();
    }
    let truncated = stripped.split(" - ").next().unwrap_or(&stripped);

    let filtered: String = truncated
        .nfkd()
        .filter(|c| {
            if ascii_only {
                c.is_ascii_alphanumeric() || c.is_ascii_whitespace()
            } else {
                c.is_alphanumeric() || c.is_whitespace()
            }
        })
        .collect();

    MULTI_SPACE.replace_all(filtered.trim(), " ").into_owned()
}

/// Splits an artist-list string on common multi-artist separators
/// (`,`, `&`, ` x `, ` vs `/` vs. `), trims, and drops empties.
pub fn split_artists(raw: &str) -> Vec<String> {
    ARTIST_SEPARATOR
        .split(raw)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalizes a set of artist names into both a full (any-script) and an
/// ASCII-only set, the way `artist_match` builds both forms before checking
/// overlap.
pub fn normalize_artist_names(names: &[String]) -> (Vec<String>, Vec<String>) {
    let mut full = Vec::new();
    let mut ascii = Vec::new();
    for raw in names {
        for part in split_artists(raw) {
            full.push(normalize_title(&part, false));
            ascii.push(normalize_title(&part, true));
        }
    }
    (full, ascii)
}

/// At least one normalized artist name from `a` appears, as a whole entry or
/// a substring (length > 3 guard), in `b` — checked at both the full and
/// ASCII-only normalization levels.
pub fn artist_overlap(a: &[String], b: &[String]) -> bool {
    let (a_full, a_ascii) = normalize_artist_names(a);
    let (b_full, b_ascii) = normalize_artist_names(b);

    for (sa, sb) in [(&a_full, &b_full), (&a_ascii, &b_ascii)] {
        for name_a in sa {
            if name_a.is_empty() {
                continue;
            }
            if sb.iter().any(|name_b| name_b == name_a) {
                return true;
            }
        }
    }

    for (sa, sb) in [(&a_full, &b_full), (&a_ascii, &b_ascii)] {
        for name_a in sa {
            if name_a.len() <= 3 {
                continue;
            }
            if sb.iter().any(|name_b| {
                name_b.len() > 3 && (name_b.contains(name_a.as_str()) || name_a.contains(name_b.as_str()))
            }) {
                return true;
            }
        }
    }

    false
}

/// First "significant" word of a title: the first word with more than two
/// characters, or the first word if none qualifies.
pub fn first_significant_word(title: &str) -> String {
    let normalized = normalize_title(title, false);
    normalized
        .split_whitespace()
        .find(|w| w.len() > 2)
        .or_else(|| normalized.split_whitespace().next())
        .unwrap_or("")
        .to_string()
}

/// Builds the ordered 4-tier search-query list: full-normalized title+artist,
/// ASCII-only title+artist, first-significant-word+artist, artist alone.
/// When a normalization pass collapses a non-empty title to nothing (CJK and
/// other non-Latin titles under the ASCII-only pass), falls back to the
/// original lowercased string rather than emitting an empty query.
pub fn build_search_queries(title: &str, artist: &str) -> Vec<String> {
    let full_title = normalize_title(title, false);
    let ascii_title = {
        let candidate = normalize_title(title, true);
        if candidate.is_empty() && !title.trim().is_empty() {
            title.trim().to_lowercase()
        } else {
            candidate
        }
    };
    let first_word = first_significant_word(title);
    let artist_norm = normalize_title(artist, false);

    let mut queries = vec![
        format!("{full_title} {artist_norm}").trim().to_string(),
        format!("{ascii_title} {artist_norm}").trim().to_string(),
        format!("{first_word} {artist_norm}").trim().to_string(),
        artist_norm.clone(),
    ];
    queries.retain(|q| !q.is_empty());
    queries.dedup();
    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remix_parity_requires_agreement() {
        assert!(remix_parity("Blinding Lights", "Blinding Lights"));
        assert!(remix_parity("Blinding Lights (Chromatics Remix)", "Song Remix"));
        assert!(!remix_parity("Blinding Lights (Chromatics Remix)", "Blinding Lights"));
    }

    #[test]
    fn normalize_strips_version_suffixes_and_parens() {
        let normalized = normalize_title("Levitating (feat. DaBaby) - Radio Edit", false);
        assert_eq!(normalized, "levitating");
    }

    #[test]
    fn normalize_handles_multiscript_and_ascii_fallback() {
        let full = normalize_title("æøå test", false);
        assert!(!full.is_empty());
        let ascii = normalize_title("日本語タイトル", true);
        // A pure-CJK title normalizes to empty under the ASCII-only pass;
        // callers fall back to the original string for query building.
        assert!(ascii.is_empty());
    }

    #[test]
    fn build_search_queries_falls_back_for_cjk_titles() {
        let queries = build_search_queries("日本語タイトル", "アーティスト");
        assert!(queries.iter().any(|q| q.contains("日本語タイトル")));
    }

    #[test]
    fn artist_overlap_checks_substring_with_length_guard() {
        let a = vec!["Dua Lipa".to_string()];
        let b = vec!["Dua Lipa & DaBaby".to_string()];
        assert!(artist_overlap(&a, &b));

        let short_a = vec!["Cat".to_string()];
        let short_b = vec!["Category 5".to_string()];
        assert!(!artist_overlap(&short_a, &short_b));
    }

    #[test]
    fn split_artists_handles_common_separators() {
        assert_eq!(
            split_artists("Dua Lipa & DaBaby"),
            vec!["Dua Lipa".to_string(), "DaBaby".to_string()]
        );
        assert_eq!(
            split_artists("Artist A x Artist B"),
            vec!["Artist A".to_string(), "Artist B".to_string()]
        );
    }
}
