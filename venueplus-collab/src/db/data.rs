use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The tenant every connection is affiliated with until it switches.
pub const DEFAULT_CLUB: &str = "default";
/// Job name reserved for the strongest profile of a club.
pub const OWNER_JOB: &str = "Owner";
/// Job name given to members without an explicit assignment.
pub const UNASSIGNED_JOB: &str = "Unassigned";
/// Role tag given to new memberships.
pub const DEFAULT_ROLE: &str = "power";
/// The shared account seeded into the default club.
pub const DEFAULT_STAFF_USER: &str = "staff";
/// The job profiles every new club starts out with.
pub const DEFAULT_JOBS: [&str; 6] = [
    UNASSIGNED_JOB,
    "Greeter",
    "Barkeeper",
    "Dancer",
    "Escort",
    OWNER_JOB,
];

/// A VIP on a club's roster, identified by character name and home world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VipEntry {
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub home_world: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Informational only, expiry is carried by `expires_at`
    #[serde(default)]
    pub duration: i32,
}

impl VipEntry {
    pub fn key(&self) -> String {
        format!("{}@{}", self.character_name, self.home_world)
    }
}

/// A DJ on a club's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DjEntry {
    #[serde(default)]
    pub dj_name: String,
    #[serde(default)]
    pub twitch_link: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A slot in a club's shift plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEntry {
    pub id: Uuid,
    pub title: String,
    pub assigned_uid: Option<String>,
    pub job: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// A shift as submitted by a client, before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShiftDraft {
    pub id: Option<Uuid>,
    pub title: String,
    pub assigned_uid: Option<String>,
    pub job: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl ShiftDraft {
    const DEFAULT_LENGTH_IN_HOURS: i64 = 2;

    /// Fills in the id and time defaults, returning None if the shift ends before it starts.
    pub fn into_entry(self) -> Option<ShiftEntry> {
        let start_at = self.start_at.unwrap_or_else(Utc::now);
        let end_at = self
            .end_at
            .unwrap_or(start_at + Duration::hours(Self::DEFAULT_LENGTH_IN_HOURS));

        if end_at < start_at {
            return None;
        }

        Some(ShiftEntry {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            title: self.title.trim().to_string(),
            assigned_uid: self.assigned_uid.filter(|u| !u.trim().is_empty()),
            job: self.job.filter(|j| !j.trim().is_empty()),
            start_at,
            end_at,
        })
    }
}

/// The permission profile attached to a job name within a club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rights {
    pub add_vip: bool,
    pub remove_vip: bool,
    pub manage_users: bool,
    pub manage_jobs: bool,
    pub edit_vip_duration: bool,
    pub add_dj: bool,
    pub remove_dj: bool,
    pub edit_shift_plan: bool,
    pub rank: i32,
    pub color_hex: String,
    pub icon_key: String,
}

impl Rights {
    pub const DEFAULT_COLOR: &'static str = "#FFFFFF";
    pub const DEFAULT_ICON: &'static str = "User";
}

impl Default for Rights {
    fn default() -> Self {
        Self {
            add_vip: false,
            remove_vip: false,
            manage_users: false,
            manage_jobs: false,
            edit_vip_duration: false,
            add_dj: false,
            remove_dj: false,
            edit_shift_plan: false,
            rank: 1,
            color_hex: Self::DEFAULT_COLOR.to_string(),
            icon_key: Self::DEFAULT_ICON.to_string(),
        }
    }
}

/// A global account, shared across clubs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub uid: String,
    pub username: String,
    pub password_hash: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A member of a club, as shown to staff consoles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUser {
    pub username: String,
    pub job: String,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
    pub uid: String,
}

/// A club, also called tenant
#[derive(Debug, Clone, PartialEq)]
pub struct ClubData {
    pub club_id: String,
    /// The username of the account that registered the club
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub access_key: Option<String>,
    pub join_password_hash: Option<String>,
    pub logo: Option<String>,
}

impl ClubData {
    pub fn is_creator(&self, username: &str) -> bool {
        !self.creator.is_empty() && self.creator == username
    }
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug)]
pub struct NewMembership {
    pub club_id: String,
    pub username: String,
    pub job: String,
    pub role: String,
}

#[derive(Debug)]
pub struct NewClub {
    pub club_id: String,
    pub creator: String,
}
