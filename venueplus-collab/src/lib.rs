mod auth;
mod config;
mod crypto;
mod db;
mod dispatcher;
mod hub;
mod logo;
mod password;
mod protocol;
mod rate_limit;
mod rights;
mod sessions;
mod util;

use std::sync::Arc;

use log::info;
use tokio::sync::mpsc::UnboundedReceiver;

pub use auth::*;
pub use config::*;
pub use crypto::*;
pub use db::*;
pub use dispatcher::*;
pub use hub::*;
pub use logo::*;
pub use password::*;
pub use protocol::*;
pub use rate_limit::*;
pub use rights::*;
pub use sessions::*;
pub use util::*;

/// The venueplus collab system, keeping staff consoles of every club in sync.
pub struct Collab {
    context: CollabContext,
}

/// A type passed to various components of the collab system, to access state and reach connections.
#[derive(Clone)]
pub struct CollabContext {
    pub database: SharedDatabase,
    pub hub: Arc<ConnectionHub>,
    pub auth: Arc<Auth>,
}

impl Collab {
    pub fn new(database: SharedDatabase, hashing: HashingConfig) -> Self {
        let auth = Auth::new(&database, hashing);

        let context = CollabContext {
            database,
            hub: ConnectionHub::new(),
            auth: Arc::new(auth),
        };

        Self { context }
    }

    pub fn context(&self) -> &CollabContext {
        &self.context
    }

    pub fn database(&self) -> &SharedDatabase {
        &self.context.database
    }

    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.context.hub
    }

    /// Opens a connection affiliated with the club, pushing its state
    pub async fn connect(&self, club_id: &str) -> (Dispatcher, UnboundedReceiver<Outbound>) {
        Dispatcher::open(&self.context, club_id).await
    }

    /// Seeds the default club, and a shared staff account when a password is given
    pub async fn ensure_defaults(
        &self,
        default_staff_password: Option<&str>,
    ) -> std::result::Result<(), AuthError> {
        let database = &self.context.database;

        database
            .create_or_load_club(NewClub {
                club_id: DEFAULT_CLUB.to_string(),
                creator: String::new(),
            })
            .await
            .map_err(AuthError::Db)?;

        database
            .ensure_default_jobs(DEFAULT_CLUB)
            .await
            .map_err(AuthError::Db)?;

        let Some(password) = default_staff_password.filter(|p| !p.trim().is_empty()) else {
            return Ok(());
        };

        let members = database
            .load_members(DEFAULT_CLUB)
            .await
            .map_err(AuthError::Db)?;

        if !members.is_empty() {
            return Ok(());
        }

        let existing = database
            .user_by_username(DEFAULT_STAFF_USER)
            .await
            .optional()
            .map_err(AuthError::Db)?;

        if existing.is_none() {
            self.context
                .auth
                .create_account(Credentials::new(DEFAULT_STAFF_USER, password))
                .await?;
        }

        database
            .add_membership(NewMembership {
                club_id: DEFAULT_CLUB.to_string(),
                username: DEFAULT_STAFF_USER.to_string(),
                job: UNASSIGNED_JOB.to_string(),
                role: DEFAULT_ROLE.to_string(),
            })
            .await
            .map_err(AuthError::Db)?;

        info!("Seeded {} account in the {} club", DEFAULT_STAFF_USER, DEFAULT_CLUB);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::password::light_config;

    #[tokio::test]
    async fn test_ensure_defaults_seeds_staff_once() {
        let collab = Collab::new(Arc::new(MemoryDatabase::new()), light_config());

        collab.ensure_defaults(Some("secret")).await.unwrap();
        collab.ensure_defaults(Some("secret")).await.unwrap();

        let database = collab.database();
        let members = database.load_members(DEFAULT_CLUB).await.unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, DEFAULT_STAFF_USER);
        assert_eq!(members[0].job, UNASSIGNED_JOB);
        assert_eq!(database.job_names(DEFAULT_CLUB).await.unwrap().len(), DEFAULT_JOBS.len());
    }

    #[tokio::test]
    async fn test_ensure_defaults_without_password() {
        let collab = Collab::new(Arc::new(MemoryDatabase::new()), light_config());
        collab.ensure_defaults(None).await.unwrap();

        let club = collab.database().club(DEFAULT_CLUB).await.unwrap();
        assert_eq!(club.creator, "");
        assert!(collab.database().load_members(DEFAULT_CLUB).await.unwrap().is_empty());
    }
}
