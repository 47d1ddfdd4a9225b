use super::track::TargetTrack;

/// One entry of a target playlist snapshot: the subset of `TargetTrack`
/// needed for metadata matching plus its position.
#[derive(Debug, Clone)]
pub struct PlaylistItem {
    pub index: usize,
    pub track: TargetTrack,
}

/// Mutable named collection in the target catalog, as seen by the core.
///
/// `entity_tag` is the opaque version token the target service issues with
/// every representation and expects echoed back on mutation
/// (`If-None-Match`) to detect conflicting concurrent writes. It is not a
/// lock: a mismatch is expected under concurrency and triggers the per-item
/// fallback rather than an abort.
#[derive(Debug, Clone)]
pub struct TargetPlaylist {
    pub uuid: String,
    pub title: String,
    pub description: String,
    pub entity_tag: String,
    pub items: Vec<PlaylistItem>,
}

impl TargetPlaylist {
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    pub fn contains_target_id(&self, target_id: &str) -> bool {
        self.items.iter().any(|item| item.track.target_id == target_id)
    }

    /// Records a successfully added track in the in-memory snapshot so that
    /// later lookups within the same migration pass see it immediately.
    pub fn push_added(&mut self, track: TargetTrack) {
        let index = self.items.len();
        self.items.push(PlaylistItem { index, track });
    }

    /// Returns, in ascending index order duplicated, the zero-based indices
    /// of every occurrence after the first for each distinct target id.
    /// Caller must delete them in descending order so earlier indices stay
    /// valid as later ones are removed.
    pub fn duplicate_indices(&self) -> Vec<usize> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for item in &self.items {
            if !seen.insert(item.track.target_id.clone()) {
                duplicates.push(item.index);
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> TargetTrack {
        TargetTrack {
            target_id: id.to_string(),
            title: "t".into(),
            artists: vec!["a".into()],
            album: "alb".into(),
            duration_seconds: 200.0,
            isrc: None,
        }
    }

    #[test]
    fn duplicate_indices_keep_first_occurrence() {
        let playlist = TargetPlaylist {
            uuid: "u".into(),
            title: "p".into(),
            description: String::new(),
            entity_tag: "e".into(),
            items: vec!["100", "200", "100", "300", "200"]
                .into_iter()
                .enumerate()
                .map(|(index, id)| PlaylistItem {
                    index,
                    track: track(id),
                })
                .collect(),
        };
        assert_eq!(playlist.duplicate_indices(), vec![2, 4]);
    }
}
