use log::{debug, info};

use super::{non_blank, Dispatcher, HandlerError, HandlerResult};
use crate::{
    process_logo, Capability, ClubInvite, ClubJoin, ClubRegister, ClubTarget, Credentials,
    DatabaseResult, Failure, LogoUpdate, NewClub, NewMembership, NewPassword, ServerMessage,
    TokenOnly, DEFAULT_CLUB, DEFAULT_ROLE, OWNER_JOB, UNASSIGNED_JOB,
};

impl Dispatcher {
    /// Replies with a club's logo, or an empty one unless the actor is a member
    pub(super) async fn club_logo(&self, token: &str, club_id: Option<&str>) -> HandlerResult {
        let club_id = match club_id {
            Some(club_id) => non_blank(club_id).unwrap_or(DEFAULT_CLUB).to_string(),
            None => self.club(),
        };

        let database = &self.context.database;

        let is_member = match self.actor(token) {
            Some(actor) => database.member(&club_id, &actor).await.optional()?.is_some(),
            None => false,
        };

        let logo = if is_member {
            database
                .club(&club_id)
                .await
                .optional()?
                .and_then(|c| c.logo)
                .unwrap_or_default()
        } else {
            String::new()
        };

        self.reply(ServerMessage::ClubLogo {
            club_id,
            logo_base64: logo,
        });

        Ok(())
    }

    pub(super) async fn update_logo(&self, request: LogoUpdate) -> HandlerResult {
        const REQUEST: &str = "club.logo.update";

        let club_id = self.club();
        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require_creator(REQUEST, &club_id, &actor, Failure::default())
            .await?;

        let logo = process_logo(&request.logo_base64)
            .map_err(|e| self.reject(REQUEST, &e.to_string(), Failure::default()))?;

        self.context
            .database
            .set_logo(&club_id, Some(logo.clone()))
            .await?;

        self.broadcast(
            &club_id,
            ServerMessage::ClubLogo {
                club_id: club_id.clone(),
                logo_base64: logo,
            },
        );
        self.reply(ServerMessage::LogoUpdateOk);

        Ok(())
    }

    pub(super) async fn delete_logo(&self, request: TokenOnly) -> HandlerResult {
        const REQUEST: &str = "club.logo.delete";

        let club_id = self.club();
        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        self.require_creator(REQUEST, &club_id, &actor, Failure::code(403))
            .await?;

        self.context.database.set_logo(&club_id, None).await?;

        self.broadcast(
            &club_id,
            ServerMessage::ClubLogo {
                club_id: club_id.clone(),
                logo_base64: String::new(),
            },
        );
        self.reply(ServerMessage::LogoDeleteOk);

        Ok(())
    }

    pub(super) async fn access_key(&self, request: TokenOnly) -> HandlerResult {
        const REQUEST: &str = "club.accesskey.request";

        let club_id = self.club();
        self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        let access_key = self
            .context
            .database
            .access_key(&club_id)
            .await
            .optional()?
            .ok_or_else(|| self.reject(REQUEST, "unknown club", Failure::code(404)))?;

        self.reply(ServerMessage::AccessKey { access_key });
        Ok(())
    }

    pub(super) async fn regenerate_access_key(&self, request: TokenOnly) -> HandlerResult {
        const REQUEST: &str = "club.accesskey.regenerate";

        let club_id = self.club();
        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        self.require_creator(REQUEST, &club_id, &actor, Failure::code(403))
            .await?;

        let access_key = self
            .context
            .database
            .rotate_access_key(&club_id)
            .await
            .optional()?
            .ok_or_else(|| self.reject(REQUEST, "unknown club", Failure::code(404)))?;

        info!("Access key of {} was regenerated by {}", club_id, actor);

        self.reply(ServerMessage::AccessKeyRegenerateOk { access_key });
        Ok(())
    }

    pub(super) async fn register_club(&self, request: ClubRegister) -> HandlerResult {
        const REQUEST: &str = "club.register";

        let Some(club_id) = non_blank(&request.club_id).map(str::trim) else {
            return Err(self.reject(REQUEST, "missing club id", Failure::code(400)));
        };

        // `|` separates club and name in composite keys
        if club_id.contains('|') {
            return Err(self.reject(REQUEST, "invalid club id", Failure::code(400)));
        }

        let creator = request
            .token
            .as_deref()
            .and_then(|token| self.actor(token))
            .or_else(|| {
                request
                    .creator_username
                    .as_deref()
                    .and_then(non_blank)
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let database = &self.context.database;

        if database.club(club_id).await.optional()?.is_some() {
            return Err(self.reject(REQUEST, "club exists", Failure::code(409)));
        }

        if !creator.is_empty() {
            self.ensure_creator_account(&creator, request.default_staff_password.as_deref())
                .await?;
        }

        database
            .create_club(NewClub {
                club_id: club_id.to_string(),
                creator: creator.clone(),
            })
            .await
            .map_err(|e| match e {
                e if e.is_conflict() => self.reject(REQUEST, "club exists", Failure::code(409)),
                e => e.into(),
            })?;

        database.ensure_default_jobs(club_id).await?;

        if !creator.is_empty() {
            database
                .add_or_update_membership(NewMembership {
                    club_id: club_id.to_string(),
                    username: creator.clone(),
                    job: OWNER_JOB.to_string(),
                    role: DEFAULT_ROLE.to_string(),
                })
                .await?;

            self.broadcast(
                club_id,
                ServerMessage::UserUpdate {
                    username: creator.clone(),
                    job: Some(OWNER_JOB.to_string()),
                },
            );

            let users = database.load_members(club_id).await?;
            self.broadcast(club_id, ServerMessage::UsersDetails { users });
        }

        // Every connection refreshes the job list of the club it is viewing
        for viewed in self.context.hub.clubs() {
            let jobs = database.job_names(&viewed).await?;
            self.broadcast(&viewed, ServerMessage::JobsList { jobs });
        }

        info!("Club {} was registered by {:?}", club_id, creator);

        self.reply(ServerMessage::ClubRegisterOk);
        Ok(())
    }

    /// Makes sure a club creator has an account, creating one from the staff password if given
    async fn ensure_creator_account(&self, creator: &str, password: Option<&str>) -> HandlerResult {
        let database = &self.context.database;

        if database.user_by_username(creator).await.optional()?.is_some() {
            return Ok(());
        }

        let Some(password) = password.and_then(non_blank) else {
            return Err(self.reject("club.register", "creator has no account", Failure::code(400)));
        };

        self.context
            .auth
            .create_account(Credentials::new(creator, password))
            .await?;

        Ok(())
    }

    pub(super) async fn delete_club(&self, request: ClubTarget) -> HandlerResult {
        const REQUEST: &str = "club.delete";

        let club_id = non_blank(&request.club_id).unwrap_or(DEFAULT_CLUB);
        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        if club_id == DEFAULT_CLUB {
            return Err(self.reject(REQUEST, "default club", Failure::code(403)));
        }

        self.require_creator(REQUEST, club_id, &actor, Failure::code(401))
            .await?;

        self.context.database.delete_club(club_id).await?;

        self.broadcast(club_id, ServerMessage::ClubDeleted);
        self.broadcast_all(ServerMessage::MembershipRemoved {
            username: String::new(),
            club_id: club_id.to_string(),
        });
        self.reply(ServerMessage::ClubDeleteOk);

        info!("Club {} was deleted by {}", club_id, actor);
        Ok(())
    }

    pub(super) async fn join_club(&self, request: ClubJoin) -> HandlerResult {
        const REQUEST: &str = "club.join";

        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        let Some(club_id) = non_blank(&request.club_id) else {
            return Err(self.reject(REQUEST, "missing club id", Failure::code(400)));
        };

        let database = &self.context.database;

        let Some(club) = database.club(club_id).await.optional()? else {
            return Err(self.reject(REQUEST, "unknown club", Failure::code(404)));
        };

        let Some(digest) = club.join_password_hash.as_deref().and_then(non_blank) else {
            return Err(self.reject(REQUEST, "no join password set", Failure::code(403)));
        };

        if non_blank(&request.password).is_none() {
            return Err(self.reject(REQUEST, "missing password", Failure::code(403)));
        }

        if !self.context.auth.verify_secret(&request.password, digest) {
            return Err(self.reject(REQUEST, "wrong password", Failure::code(401)));
        }

        database
            .add_membership(NewMembership {
                club_id: club_id.to_string(),
                username: actor.clone(),
                job: UNASSIGNED_JOB.to_string(),
                role: DEFAULT_ROLE.to_string(),
            })
            .await
            .map_err(|e| match e {
                e if e.is_conflict() => self.reject(REQUEST, "already a member", Failure::code(409)),
                e => e.into(),
            })?;

        self.broadcast_members(club_id).await?;
        self.broadcast_all(ServerMessage::MembershipAdded {
            username: actor.clone(),
            club_id: club_id.to_string(),
        });
        self.reply(ServerMessage::ClubJoinOk);

        debug!("{} joined {}", actor, club_id);
        Ok(())
    }

    pub(super) async fn set_join_password(&self, request: NewPassword) -> HandlerResult {
        const REQUEST: &str = "club.join.password.set";

        let club_id = self.club();
        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        self.require_creator(REQUEST, &club_id, &actor, Failure::code(403))
            .await?;

        let digest = match non_blank(&request.new_password) {
            Some(password) => Some(self.context.auth.hash_secret(password)?),
            None => None,
        };

        self.context
            .database
            .set_join_password_hash(&club_id, digest)
            .await?;

        self.reply(ServerMessage::JoinPasswordOk);
        Ok(())
    }

    pub(super) async fn invite(&self, request: ClubInvite) -> HandlerResult {
        const REQUEST: &str = "club.invite";

        let club_id = self.club();
        let actor = self.authenticate(REQUEST, &request.token, Failure::code(401))?;

        self.require(REQUEST, &club_id, &actor, Capability::ManageUsers, Failure::code(403))
            .await?;

        let database = &self.context.database;

        let target = if let Some(uid) = non_blank(&request.target_uid) {
            database
                .user_by_uid(uid)
                .await
                .optional()?
                .ok_or_else(|| {
                    self.reject(REQUEST, "unknown uid", Failure::code(404).with_message("Unknown UID"))
                })?
        } else if let Some(username) = non_blank(&request.target_username) {
            database
                .user_by_username(username)
                .await
                .optional()?
                .ok_or_else(|| {
                    self.reject(REQUEST, "unknown user", Failure::code(404).with_message("Unknown user"))
                })?
        } else {
            return Err(self.reject(REQUEST, "missing target", Failure::code(400)));
        };

        let job = request
            .job
            .as_deref()
            .and_then(non_blank)
            .unwrap_or(UNASSIGNED_JOB)
            .to_string();

        let existing = database.member(&club_id, &target.username).await.optional()?;

        match existing {
            Some(_) => {
                database
                    .update_membership(&club_id, &target.username, Some(&job), None)
                    .await?;
            }
            None => {
                database
                    .add_membership(NewMembership {
                        club_id: club_id.clone(),
                        username: target.username.clone(),
                        job: job.clone(),
                        role: DEFAULT_ROLE.to_string(),
                    })
                    .await
                    .map_err(|e| match e {
                        e if e.is_conflict() => self.reject(
                            REQUEST,
                            "already a member",
                            Failure::code(409).with_message("Already member"),
                        ),
                        e => HandlerError::from(e),
                    })?;
            }
        }

        self.broadcast_members(&club_id).await?;
        self.broadcast(
            &club_id,
            ServerMessage::UserUpdate {
                username: target.username.clone(),
                job: Some(job.clone()),
            },
        );
        self.broadcast_all(ServerMessage::MembershipAdded {
            username: target.username.clone(),
            club_id: club_id.clone(),
        });
        self.reply(ServerMessage::ClubInviteOk);

        debug!("{} invited {} to {} as {}", actor, target.username, club_id, job);
        Ok(())
    }
}

