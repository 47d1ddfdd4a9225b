//! The matching cascade: existing-playlist metadata match, universal-link
//! lookup, and target-catalog search with multi-query fallback. Each step
//! returns a tagged hit/miss/transient-error so the cascade composes without
//! `try`/`except`-style control flow at every step.

use std::sync::Arc;

use crate::catalog::{TargetCatalogClient, UniversalLinkClient};
use crate::models::{PlaylistItem, ResolutionSource, SourceTrack, TargetTrack};

use super::normalize::{artist_overlap, build_search_queries, normalize_title, remix_parity};

/// Duration tolerance applied everywhere a duration comparison happens:
/// metadata match, and search-result matching whether or not ISRC-checked.
pub const DURATION_TOLERANCE_SECS: f64 = 2.0;

/// Result of a single cascade step.
pub enum CascadeOutcome {
    Hit {
        track: TargetTrack,
        source: ResolutionSource,
    },
    Miss,
}

fn duration_matches(target_seconds: f64, source_ms: u64) -> bool {
    (target_seconds - (source_ms as f64 / 1000.0)).abs() <= DURATION_TOLERANCE_SECS
}

/// The three metadata-match predicates, applied together: duration, remix
/// parity, and a substring-either-way title match under either the full or
/// ASCII-only normalization, plus artist overlap.
pub fn metadata_match(source: &SourceTrack, candidate: &TargetTrack) -> bool {
    if !duration_matches(candidate.duration_seconds, source.duration_ms) {
        return false;
    }
    if !remix_parity(&source.title, &candidate.title) {
        return false;
    }

    let title_matches = [false, true].iter().any(|&ascii_only| {
        let source_norm = normalize_title(&source.title, ascii_only);
        let candidate_norm = normalize_title(&candidate.title, ascii_only);
        !source_norm.is_empty()
            && !candidate_norm.is_empty()
            && (source_norm.contains(&candidate_norm) || candidate_norm.contains(&source_norm))
    });
    if !title_matches {
        return false;
    }

    artist_overlap(&source.artists, &candidate.artists)
}

/// Step 1: metadata match against a snapshot of an existing playlist's
/// items. Returns immediately on the first passing candidate.
pub fn match_against_snapshot(source: &SourceTrack, snapshot: &[PlaylistItem]) -> CascadeOutcome {
    for item in snapshot {
        if metadata_match(source, &item.track) {
            return CascadeOutcome::Hit {
                track: item.track.clone(),
                source: ResolutionSource::MetadataMatch,
            };
        }
    }
    CascadeOutcome::Miss
}

/// Step 2: universal-link lookup. A transient error from the underlying
/// client downgrades to a miss so the cascade can proceed to search; it is
/// not surfaced to the caller as a hard failure.
pub async fn match_via_universal_link(
    source: &SourceTrack,
    source_track_url: &str,
    target_platform: &str,
    client: &dyn UniversalLinkClient,
    target_catalog: &dyn TargetCatalogClient,
) -> CascadeOutcome {
    let resolved_id = match client.resolve(source_track_url, target_platform).await {
        Ok(Some(id)) => id,
        Ok(None) => return CascadeOutcome::Miss,
        Err(err) => {
            tracing::debug!(error = %err, source_id = %source.source_id, "universal-link lookup failed, downgrading to miss");
            return CascadeOutcome::Miss;
        }
    };

    // The universal-link service only returns an id; look up full metadata
    // via search so the snapshot gets a complete TargetTrack.
    match target_catalog.search_tracks(&resolved_id).await {
        Ok(results) => {
            if let Some(track) = results.into_iter().find(|t| t.target_id == resolved_id) {
                return CascadeOutcome::Hit {
                    track,
                    source: ResolutionSource::UniversalLink,
                };
            }
            // Service returned an id we couldn't independently verify by
            // metadata; still usable for the add call.
            CascadeOutcome::Hit {
                track: TargetTrack {
                    target_id: resolved_id,
                    title: source.title.clone(),
                    artists: source.artists.clone(),
                    album: source.album.clone(),
                    duration_seconds: source.duration_seconds(),
                    isrc: source.isrc.clone(),
                },
                source: ResolutionSource::UniversalLink,
            }
        }
        Err(err) => {
            tracing::debug!(error = %err, "post-universal-link lookup failed, using bare id");
            CascadeOutcome::Hit {
                track: TargetTrack {
                    target_id: resolved_id,
                    title: source.title.clone(),
                    artists: source.artists.clone(),
                    album: source.album.clone(),
                    duration_seconds: source.duration_seconds(),
                    isrc: source.isrc.clone(),
                },
                source: ResolutionSource::UniversalLink,
            }
        }
    }
}

/// Step 3 (and the post-add rescue's retry): target-catalog search across
/// the 4-tier query fallback. ISRC equality is an immediate accept;
/// otherwise the metadata-match predicates decide among the top 10 results.
pub async fn match_via_search(
    source: &SourceTrack,
    target_catalog: &dyn TargetCatalogClient,
    resolution_tag: ResolutionSource,
) -> CascadeOutcome {
    let queries = build_search_queries(&source.title, &source.artists_joined());

    for query in queries {
        let results = match target_catalog.search_tracks(&query).await {
            Ok(results) => results,
            Err(err) => {
                tracing::debug!(error = %err, query = %query, "target search failed, downgrading to miss");
                continue;
            }
        };

        for candidate in results.into_iter().take(10) {
            if let (Some(source_isrc), Some(candidate_isrc)) = (&source.isrc, &candidate.isrc) {
                if source_isrc == candidate_isrc {
                    return CascadeOutcome::Hit {
                        track: candidate,
                        source: resolution_tag,
                    };
                }
            }
            if metadata_match(source, &candidate) {
                return CascadeOutcome::Hit {
                    track: candidate,
                    source: resolution_tag,
                };
            }
        }
    }

    CascadeOutcome::Miss
}

/// Runs the full cascade (steps 1-3) for one source track, given a snapshot
/// of the playlist so far. Any external-call error from a lower step is
/// already downgraded to a miss by that step; only after every step misses
/// does this return `Miss`.
pub async fn resolve(
    source: &SourceTrack,
    snapshot: &[PlaylistItem],
    source_track_url: &str,
    target_platform: &str,
    universal_link: &dyn UniversalLinkClient,
    target_catalog: Arc<dyn TargetCatalogClient>,
) -> CascadeOutcome {
    if let CascadeOutcome::Hit { track, source: tag } = match_against_snapshot(source, snapshot) {
        return CascadeOutcome::Hit { track, source: tag };
    }

    if let CascadeOutcome::Hit { track, source: tag } = match_via_universal_link(
        source,
        source_track_url,
        target_platform,
        universal_link,
        target_catalog.as_ref(),
    )
    .await
    {
        return CascadeOutcome::Hit { track, source: tag };
    }

    match_via_search(source, target_catalog.as_ref(), ResolutionSource::TargetSearch).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_track(title: &str, artists: &[&str], duration_ms: u64) -> SourceTrack {
        SourceTrack {
            source_id: "S1".into(),
            title: title.into(),
            artists: artists.iter().map(|s| s.to_string()).collect(),
            album: "Album".into(),
            duration_ms,
            track_number: Some(1),
            isrc: None,
        }
    }

    fn target_track(id: &str, title: &str, artists: &[&str], duration_seconds: f64) -> TargetTrack {
        TargetTrack {
            target_id: id.into(),
            title: title.into(),
            artists: artists.iter().map(|s| s.to_string()).collect(),
            album: "Album".into(),
            duration_seconds,
            isrc: None,
        }
    }

    #[test]
    fn metadata_match_hits_on_duration_title_and_artist() {
        let source = source_track("Levitating", &["Dua Lipa"], 203_000);
        let candidate = target_track("200", "Levitating", &["Dua Lipa"], 203.0);
        assert!(metadata_match(&source, &candidate));
    }

    #[test]
    fn metadata_match_rejects_remix_mismatch() {
        let source = source_track("Blinding Lights (Chromatics Remix)", &["The Weeknd"], 240_000);
        let candidate = target_track("1", "Blinding Lights", &["The Weeknd"], 240.0);
        assert!(!metadata_match(&source, &candidate));
    }

    #[test]
    fn metadata_match_rejects_duration_outside_tolerance() {
        let source = source_track("Levitating", &["Dua Lipa"], 203_000);
        let candidate = target_track("200", "Levitating", &["Dua Lipa"], 210.0);
        assert!(!metadata_match(&source, &candidate));
    }

    #[test]
    fn match_against_snapshot_returns_metadata_match_tag() {
        let source = source_track("Levitating", &["Dua Lipa"], 203_000);
        let snapshot = vec![PlaylistItem {
            index: 0,
            track: target_track("200", "Levitating", &["Dua Lipa"], 203.0),
        }];
        match match_against_snapshot(&source, &snapshot) {
            CascadeOutcome::Hit { source, .. } => assert_eq!(source, ResolutionSource::MetadataMatch),
            CascadeOutcome::Miss => panic!("expected a hit"),
        }
    }
}
