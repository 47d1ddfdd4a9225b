//! Locates a downloaded audio file on disk for a given track report, using
//! the same normalize-then-walk heuristic as the source system: prefer an
//! artist directory, fall back to a full recursive walk.

use std::path::{Path, PathBuf};

const AUDIO_EXTENSIONS: &[&str] = &["flac", "m4a", "mp3", "ogg", "opus", "wav"];

/// Lower-cases and strips spaces, `-`, `_`, `(`, `)`.
pub fn normalize_for_filesystem(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '(' | ')'))
        .collect()
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn normalized_stem_matches(path: &Path, normalized_title: &str) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let normalized_stem = normalize_for_filesystem(stem);
    !normalized_stem.is_empty()
        && !normalized_title.is_empty()
        && (normalized_stem.contains(normalized_title) || normalized_title.contains(&normalized_stem))
}

fn artist_appears_in_ancestors(path: &Path, normalized_artist: &str) -> bool {
    if normalized_artist.is_empty() {
        return true;
    }
    path.ancestors().take(3).any(|ancestor| {
        ancestor
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| normalize_for_filesystem(n).contains(normalized_artist))
            .unwrap_or(false)
    })
}

fn walk(root: &Path, normalized_title: &str, normalized_artist: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if has_audio_extension(&path)
            && normalized_stem_matches(&path, normalized_title)
            && artist_appears_in_ancestors(&path, normalized_artist)
        {
            return Some(path);
        }
    }
    for subdir in subdirs {
        if let Some(found) = walk(&subdir, normalized_title, normalized_artist) {
            return Some(found);
        }
    }
    None
}

/// Finds a matching file under `download_root`. Prefers an artist directory
/// whose normalized name contains the normalized artist, then falls back to
/// a full recursive walk from the root with the same predicate.
pub fn locate_file(download_root: &Path, title: &str, primary_artist: &str) -> Option<PathBuf> {
    let normalized_title = normalize_for_filesystem(title);
    let normalized_artist = normalize_for_filesystem(primary_artist);

    if let Ok(entries) = std::fs::read_dir(download_root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let matches_artist = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| normalize_for_filesystem(n).contains(&normalized_artist))
                    .unwrap_or(false);
                if matches_artist && !normalized_artist.is_empty() {
                    if let Some(found) = walk(&path, &normalized_title, &normalized_artist) {
                        return Some(found);
                    }
                }
            }
        }
    }

    walk(download_root, &normalized_title, &normalized_artist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_spaces_dashes_underscores_and_parens() {
        assert_eq!(normalize_for_filesystem("Dua Lipa - Levitating (Live)"), "dualipalevitatinglive");
    }

    #[test]
    fn locate_file_finds_matching_file_in_artist_directory() {
        let dir = tempfile::tempdir().unwrap();
        let artist_dir = dir.path().join("Dua Lipa");
        std::fs::create_dir(&artist_dir).unwrap();
        let file_path = artist_dir.join("Levitating.flac");
        std::fs::write(&file_path, b"fake audio").unwrap();

        let found = locate_file(dir.path(), "Levitating", "Dua Lipa");
        assert_eq!(found, Some(file_path));
    }

    #[test]
    fn locate_file_returns_none_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate_file(dir.path(), "Nonexistent", "Nobody"), None);
    }
}
