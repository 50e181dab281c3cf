use serde::{Deserialize, Serialize};

use super::Entity;

/// Maximum number of content slots in a playlist. Fixed by the kiosk
/// firmware's rotation buffer.
pub const MAX_PLAYLIST_SLOTS: usize = 8;

/// One content slot in a playlist: a media asset shown for a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSlot {
    #[serde(rename = "mediaId")]
    pub media_id: String,
    #[serde(rename = "durationSecs")]
    pub duration_secs: u32,
}

/// An ordered set of up to [`MAX_PLAYLIST_SLOTS`] content slots.
///
/// Slot positions are meaningful (they define rotation order on the kiosk),
/// so empty positions are kept as `None` rather than compacted away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub slots: Vec<Option<PlaylistSlot>>,
}

impl Playlist {
    /// Number of occupied slots.
    pub fn filled_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Total rotation time across occupied slots, in seconds.
    pub fn total_duration_secs(&self) -> u64 {
        self.slots
            .iter()
            .flatten()
            .map(|s| u64::from(s.duration_secs))
            .sum()
    }

    /// Whether another slot can still be occupied.
    pub fn has_free_slot(&self) -> bool {
        self.filled_slots() < MAX_PLAYLIST_SLOTS
    }
}

impl Entity for Playlist {
    fn id(&self) -> &str {
        &self.id
    }
}
