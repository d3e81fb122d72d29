use std::collections::BTreeMap;

use log::{debug, info};

use super::{non_blank, Dispatcher, HandlerError, HandlerResult};
use crate::{
    AuthError, Credentials, DatabaseResult, Failure, Grant, Login, NewPassword, Register,
    ServerMessage, SwitchClub, TokenOnly, UserExists, DEFAULT_CLUB, UNASSIGNED_JOB,
};

impl Dispatcher {
    pub(super) async fn switch_club(&self, request: SwitchClub) -> HandlerResult {
        let club_id = request
            .club_id
            .as_deref()
            .and_then(non_blank)
            .unwrap_or(DEFAULT_CLUB)
            .to_string();

        let current = self.club();

        if current == club_id {
            return Ok(());
        }

        debug!("Connection {} switched from {} to {}", self.id(), current, club_id);

        self.context.hub.set_club(self.id(), &club_id);
        self.push_snapshot(&club_id).await;

        Ok(())
    }

    pub(super) async fn login(&self, request: Login) -> HandlerResult {
        let token = self
            .context
            .auth
            .login(Credentials::new(&request.username, request.password))
            .await
            .map_err(|e| match e {
                AuthError::Db(e) => HandlerError::Database(e),
                e => self.reject("login.request", &e.to_string(), Failure::default()),
            })?;

        info!("{} logged in", request.username);

        self.reply(ServerMessage::LoginOk { token });

        let database = &self.context.database;
        let clubs = database.clubs_of_user(&request.username).await?;
        let created = database.clubs_created_by(&request.username).await?;

        self.reply(ServerMessage::UserClubs { clubs });
        self.reply(ServerMessage::UserClubsCreated { clubs: created });

        Ok(())
    }

    pub(super) async fn register(&self, request: Register) -> HandlerResult {
        const REQUEST: &str = "register.request";

        let username = if request.character_name.trim().is_empty()
            || request.home_world.trim().is_empty()
        {
            String::new()
        } else {
            format!("{}@{}", request.character_name, request.home_world)
        };

        let result = self
            .context
            .auth
            .register(Credentials::new(&username, request.password))
            .await;

        match result {
            Ok(user) => {
                info!("Registered {}", user.username);
                self.reply(ServerMessage::RegisterOk);
                Ok(())
            }
            Err(AuthError::MissingFields) => {
                Err(self.reject(REQUEST, "missing fields", Failure::code(400)))
            }
            Err(AuthError::RateLimited) => {
                Err(self.reject(REQUEST, "rate limited", Failure::code(429)))
            }
            Err(AuthError::Db(e)) if e.is_conflict() => {
                Err(self.reject(REQUEST, "name taken", Failure::code(409)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn logout(&self, request: TokenOnly) -> HandlerResult {
        if non_blank(&request.token).is_none() {
            return Err(self.reject("session.logout", "missing token", Failure::code(400)));
        }

        self.context.auth.logout(&request.token);
        self.reply(ServerMessage::LogoutOk);

        Ok(())
    }

    pub(super) async fn user_clubs(&self, request: TokenOnly) -> HandlerResult {
        let clubs = match self.actor(&request.token) {
            Some(actor) => self.context.database.clubs_of_user(&actor).await?,
            None => vec![],
        };

        self.reply(ServerMessage::UserClubs { clubs });
        Ok(())
    }

    pub(super) async fn user_clubs_created(&self, request: TokenOnly) -> HandlerResult {
        let clubs = match self.actor(&request.token) {
            Some(actor) => self.context.database.clubs_created_by(&actor).await?,
            None => vec![],
        };

        self.reply(ServerMessage::UserClubsCreated { clubs });
        Ok(())
    }

    pub(super) async fn self_rights(&self, request: TokenOnly) -> HandlerResult {
        let Some(actor) = self.actor(&request.token) else {
            self.reply(ServerMessage::SelfRights {
                job: UNASSIGNED_JOB.to_string(),
                rights: BTreeMap::new(),
            });
            return Ok(());
        };

        let grant = Grant::resolve(self.context.database.as_ref(), &self.club(), &actor).await?;

        self.reply(ServerMessage::SelfRights {
            rights: grant.rights.capability_map(),
            job: grant.job,
        });

        Ok(())
    }

    pub(super) async fn self_profile(&self, request: TokenOnly) -> HandlerResult {
        let user = match self.actor(&request.token) {
            Some(actor) => self
                .context
                .database
                .user_by_username(&actor)
                .await
                .optional()?,
            None => None,
        };

        let (username, uid) = user.map(|u| (u.username, u.uid)).unwrap_or_default();

        self.reply(ServerMessage::SelfProfile { username, uid });
        Ok(())
    }

    pub(super) async fn set_self_password(&self, request: NewPassword) -> HandlerResult {
        const REQUEST: &str = "user.self.password.set";

        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        if non_blank(&request.new_password).is_none() {
            return Err(self.reject(REQUEST, "missing password", Failure::code(400)));
        }

        match self
            .context
            .auth
            .change_password(&actor, &request.new_password)
            .await
        {
            Ok(()) => {
                self.reply(ServerMessage::SelfPasswordOk);
                Ok(())
            }
            Err(AuthError::Db(e)) if e.is_not_found() => {
                Err(self.reject(REQUEST, "unknown actor", Failure::code(401)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) async fn user_exists(&self, request: UserExists) -> HandlerResult {
        let exists = match non_blank(&request.username) {
            Some(username) => self
                .context
                .database
                .user_by_username(username)
                .await
                .optional()?
                .is_some(),
            None => false,
        };

        self.reply(ServerMessage::UserExists { exists });
        Ok(())
    }
}
