use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

mod snapshot;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult<T> {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;

    /// Turns a NotFound error into None
    fn optional(self) -> Result<Option<T>>;
}

impl<T> DatabaseResult<T> for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// The tenant store. Every club-scoped call takes the club id first.
///
/// Job profiles pass through [crate::normalize_rights] on every read and write,
/// so implementations never hand out an Owner or Unassigned profile that breaks its invariants.
#[async_trait]
pub trait Database: Send + Sync {
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn user_by_uid(&self, uid: &str) -> Result<UserData>;
    /// Creates an account with a fresh uid, failing with a conflict if the name is taken
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user_password(&self, username: &str, password_hash: &str) -> Result<()>;

    /// All members of a club, ordered by username
    async fn load_members(&self, club_id: &str) -> Result<Vec<StaffUser>>;
    async fn member(&self, club_id: &str, username: &str) -> Result<StaffUser>;
    async fn add_membership(&self, new_membership: NewMembership) -> Result<StaffUser>;
    /// Sets job and/or role of an existing membership
    async fn update_membership(
        &self,
        club_id: &str,
        username: &str,
        job: Option<&str>,
        role: Option<&str>,
    ) -> Result<StaffUser>;
    async fn remove_membership(&self, club_id: &str, username: &str) -> Result<()>;
    /// Ids of every club the user is a member of, ordered
    async fn clubs_of_user(&self, username: &str) -> Result<Vec<String>>;

    async fn load_job_rights(&self, club_id: &str) -> Result<BTreeMap<String, Rights>>;
    /// Replaces a profile, returning it as stored
    async fn set_job_rights(&self, club_id: &str, name: &str, rights: Rights) -> Result<Rights>;
    /// Adds a default profile, keeping an existing one untouched
    async fn add_job(&self, club_id: &str, name: &str) -> Result<()>;
    async fn delete_job(&self, club_id: &str, name: &str) -> Result<()>;

    async fn load_vips(&self, club_id: &str) -> Result<Vec<VipEntry>>;
    async fn vip_exists(&self, club_id: &str, character_name: &str, home_world: &str)
        -> Result<bool>;
    async fn upsert_vip(&self, club_id: &str, entry: VipEntry) -> Result<()>;
    async fn remove_vip(&self, club_id: &str, character_name: &str, home_world: &str)
        -> Result<()>;

    async fn load_djs(&self, club_id: &str) -> Result<Vec<DjEntry>>;
    async fn upsert_dj(&self, club_id: &str, entry: DjEntry) -> Result<()>;
    async fn remove_dj(&self, club_id: &str, dj_name: &str) -> Result<()>;

    async fn load_shifts(&self, club_id: &str) -> Result<Vec<ShiftEntry>>;
    async fn upsert_shift(&self, club_id: &str, entry: ShiftEntry) -> Result<()>;
    async fn remove_shift(&self, club_id: &str, id: Uuid) -> Result<()>;

    async fn club(&self, club_id: &str) -> Result<ClubData>;
    /// Creates a club with an access key, failing with a conflict if it exists
    async fn create_club(&self, new_club: NewClub) -> Result<ClubData>;
    /// Deletes a club and everything scoped to it
    async fn delete_club(&self, club_id: &str) -> Result<()>;
    async fn clubs_created_by(&self, username: &str) -> Result<Vec<String>>;
    /// Returns the access key of a club, generating one if it has none
    async fn access_key(&self, club_id: &str) -> Result<String>;
    async fn rotate_access_key(&self, club_id: &str) -> Result<String>;
    /// Returns the id of the club owning the access key
    async fn club_by_access_key(&self, access_key: &str) -> Result<String>;
    async fn set_logo(&self, club_id: &str, logo: Option<String>) -> Result<()>;
    async fn set_join_password_hash(&self, club_id: &str, hash: Option<String>) -> Result<()>;

    /// Checks whether the durable store is reachable. Always false for the ephemeral one
    async fn ping(&self) -> Result<bool>;

    async fn create_or_load_club(&self, new_club: NewClub) -> Result<ClubData> {
        match self.club(&new_club.club_id).await {
            Ok(club) => Ok(club),
            Err(DatabaseError::NotFound { .. }) => self.create_club(new_club).await,
            Err(e) => Err(e),
        }
    }

    async fn add_or_update_membership(&self, new_membership: NewMembership) -> Result<StaffUser> {
        let existing = self
            .member(&new_membership.club_id, &new_membership.username)
            .await
            .optional()?;

        match existing {
            Some(_) => {
                self.update_membership(
                    &new_membership.club_id,
                    &new_membership.username,
                    Some(&new_membership.job),
                    Some(&new_membership.role),
                )
                .await
            }
            None => self.add_membership(new_membership).await,
        }
    }

    /// Job names of a club, ordered
    async fn job_names(&self, club_id: &str) -> Result<Vec<String>> {
        Ok(self.load_job_rights(club_id).await?.into_keys().collect())
    }

    /// Makes sure every default job profile exists for the club
    async fn ensure_default_jobs(&self, club_id: &str) -> Result<()> {
        for job in DEFAULT_JOBS {
            self.add_job(club_id, job).await?;
        }

        Ok(())
    }
}

pub type SharedDatabase = std::sync::Arc<dyn Database>;
