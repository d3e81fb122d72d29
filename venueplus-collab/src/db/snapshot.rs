use std::{collections::BTreeMap, io, path::PathBuf};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Rights, UserData};

/// A record tagged with the club it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubScoped<T> {
    pub club_id: String,
    #[serde(flatten)]
    pub value: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotClub {
    #[serde(default)]
    pub creator: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub join_password_hash: Option<String>,
}

/// The full state of the ephemeral backend, as kept on disk.
/// Maps keyed by `club|name` use the first `|` as separator.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub vip_entries: Vec<ClubScoped<crate::VipEntry>>,
    pub dj_entries: Vec<ClubScoped<crate::DjEntry>>,
    pub shift_entries: Vec<ClubScoped<crate::ShiftEntry>>,
    pub staff_users: Vec<UserData>,
    pub job_rights: BTreeMap<String, Rights>,
    pub club_user_jobs: BTreeMap<String, String>,
    pub club_user_roles: BTreeMap<String, String>,
    pub club_user_joined_at: BTreeMap<String, DateTime<Utc>>,
    pub clubs: BTreeMap<String, SnapshotClub>,
    pub club_access_keys_by_club: BTreeMap<String, String>,
    pub club_logos: BTreeMap<String, String>,
}

pub fn scoped_key(club_id: &str, name: &str) -> String {
    format!("{}|{}", club_id, name)
}

pub fn split_scoped_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('|')
}

/// The snapshot document on disk. Writes are serialized through a single gate.
pub struct SnapshotFile {
    path: PathBuf,
    gate: Mutex<()>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gate: Mutex::new(()),
        }
    }

    /// Reads the snapshot. A missing or unreadable document is empty state.
    pub async fn load(&self) -> Snapshot {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", self.path.display());
                return Snapshot::default();
            }
            Err(e) => {
                warn!("Could not read {}: {}", self.path.display(), e);
                return Snapshot::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("Snapshot {} is corrupt, starting empty: {}", self.path.display(), e);
            Snapshot::default()
        })
    }

    /// Captures and writes state while holding the gate, so concurrent writers never interleave.
    pub async fn write_with<F>(&self, capture: F) -> io::Result<()>
    where
        F: FnOnce() -> Snapshot,
    {
        let _guard = self.gate.lock().await;
        let snapshot = capture();

        self.write(&snapshot).await.map_err(|e| {
            error!("Failed to write snapshot {}: {}", self.path.display(), e);
            e
        })
    }

    async fn write(&self, snapshot: &Snapshot) -> io::Result<()> {
        let json = serde_json::to_string(snapshot).map_err(io::Error::other)?;
        let temp = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scoped_key() {
        let key = scoped_key("nightclub", "Alice@Balmung");

        assert_eq!(key, "nightclub|Alice@Balmung");
        assert_eq!(split_scoped_key(&key), Some(("nightclub", "Alice@Balmung")));
    }

    #[test]
    fn test_scoped_entries_are_flat() {
        let scoped = ClubScoped {
            club_id: "nightclub".to_string(),
            value: crate::DjEntry {
                dj_name: "Spin".to_string(),
                twitch_link: "https://twitch.tv/spin".to_string(),
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_value(&scoped).unwrap();
        assert_eq!(json["clubId"], "nightclub");
        assert_eq!(json["djName"], "Spin");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_empty() {
        let path = std::env::temp_dir().join(format!("venueplus-corrupt-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let snapshot = SnapshotFile::new(&path).load().await;
        assert!(snapshot.staff_users.is_empty());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
