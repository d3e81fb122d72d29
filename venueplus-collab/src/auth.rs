use log::debug;
use thiserror::Error;

use crate::{
    DatabaseError, HashingConfig, NewUser, PasswordHasher, RateLimiter, SessionRegistry,
    SharedDatabase, UserData,
};

/// Authentication of actors: credentials, sessions and attempt limiting
pub struct Auth {
    database: SharedDatabase,
    sessions: SessionRegistry,
    limiter: RateLimiter,
    hasher: PasswordHasher,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Too many attempts for the same key
    #[error("Too many attempts")]
    RateLimited,
    #[error("Missing username or password")]
    MissingFields,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl Auth {
    pub fn new(database: &SharedDatabase, hashing: HashingConfig) -> Self {
        Self {
            database: database.clone(),
            sessions: SessionRegistry::new(),
            limiter: RateLimiter::default(),
            hasher: PasswordHasher::new(hashing),
        }
    }

    /// Logs in an actor, returning a new session token
    pub async fn login(&self, credentials: Credentials) -> Result<String, AuthError> {
        let Credentials { username, password } = credentials;

        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }

        self.sessions.clear_expired();

        if !self.limiter.allow(&username) {
            debug!("Login for {} was rate limited", username);
            return Err(AuthError::RateLimited);
        }

        let user = self
            .database
            .user_by_username(&username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        if !self.hasher.verify(&password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.sessions.issue(&user.username))
    }

    /// Registers a new actor, limited per candidate name
    pub async fn register(&self, credentials: Credentials) -> Result<UserData, AuthError> {
        if credentials.username.trim().is_empty() || credentials.password.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }

        if !self
            .limiter
            .allow(&format!("reg|{}", credentials.username))
        {
            return Err(AuthError::RateLimited);
        }

        self.create_account(credentials).await
    }

    /// Creates an actor without consulting the rate limiter
    pub async fn create_account(&self, credentials: Credentials) -> Result<UserData, AuthError> {
        let password_hash = self.hasher.hash(&credentials.password)?;

        self.database
            .create_user(NewUser {
                username: credentials.username,
                password_hash,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Revokes the session, if it exists
    pub fn logout(&self, token: &str) {
        self.sessions.revoke(token)
    }

    /// Returns the actor behind a token, counting the call as activity
    pub fn session(&self, token: &str) -> Option<String> {
        self.sessions.validate(token)
    }

    pub async fn change_password(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if password.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }

        let password_hash = self.hasher.hash(password)?;

        self.database
            .update_user_password(username, &password_hash)
            .await
            .map_err(AuthError::Db)
    }

    /// Hashes a secret that is not an account password, like a club join password
    pub fn hash_secret(&self, secret: &str) -> Result<String, AuthError> {
        self.hasher.hash(secret)
    }

    pub fn verify_secret(&self, secret: &str, digest: &str) -> bool {
        self.hasher.verify(secret, digest)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{password::light_config, MemoryDatabase};

    fn auth() -> Auth {
        let database: SharedDatabase = Arc::new(MemoryDatabase::new());
        Auth::new(&database, light_config())
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = auth();

        auth.register(Credentials::new("Amy", "pw1")).await.unwrap();
        let token = auth.login(Credentials::new("Amy", "pw1")).await.unwrap();

        assert_eq!(auth.session(&token).as_deref(), Some("Amy"));

        auth.logout(&token);
        assert_eq!(auth.session(&token), None);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let auth = auth();
        auth.register(Credentials::new("Amy", "pw1")).await.unwrap();

        assert!(matches!(
            auth.login(Credentials::new("Amy", "nope")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(Credentials::new("Bob", "pw1")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let auth = auth();
        auth.register(Credentials::new("Amy", "pw1")).await.unwrap();

        let result = auth.register(Credentials::new("Amy", "pw2")).await;
        assert!(matches!(result, Err(AuthError::Db(e)) if e.is_conflict()));
    }

    #[tokio::test]
    async fn test_rate_limit_precedes_credential_check() {
        let auth = auth();
        auth.register(Credentials::new("Amy", "pw1")).await.unwrap();

        for _ in 0..5 {
            let _ = auth.login(Credentials::new("Amy", "wrong")).await;
        }

        assert!(matches!(
            auth.login(Credentials::new("Amy", "pw1")).await,
            Err(AuthError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let auth = auth();
        auth.register(Credentials::new("Amy", "pw1")).await.unwrap();
        auth.change_password("Amy", "pw2").await.unwrap();

        assert!(auth.login(Credentials::new("Amy", "pw2")).await.is_ok());
    }
}
