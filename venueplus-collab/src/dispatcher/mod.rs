//! The per-connection request loop.
//!
//! A [Dispatcher] owns one registered connection. Requests are handled one at a time
//! in receipt order, every `*.ok` or `*.fail` goes back to the sending connection only,
//! and accepted mutations are broadcast through the [ConnectionHub].

mod club;
mod roster;
mod session;
mod staff;

use log::{debug, error, info};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    AuthError, Capability, ClientMessage, ClubData, CollabContext, ConnectionHandle,
    ConnectionId, DatabaseError, DatabaseResult, Failure, Grant, LogoError, Outbound,
    ServerMessage, DEFAULT_CLUB,
};

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request was turned down, answer with this failure
    #[error("Request rejected")]
    Rejected(Failure),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Logo(#[from] LogoError),
}

pub type HandlerResult = Result<(), HandlerError>;

pub struct Dispatcher {
    context: CollabContext,
    connection: ConnectionHandle,
}

impl Dispatcher {
    /// Registers a connection affiliated with the club and pushes the club's state to it
    pub async fn open(
        context: &CollabContext,
        club_id: &str,
    ) -> (Self, UnboundedReceiver<Outbound>) {
        let club_id = non_blank(club_id).unwrap_or(DEFAULT_CLUB);
        let (connection, receiver) = context.hub.connect(club_id);

        let dispatcher = Self {
            context: context.clone(),
            connection,
        };

        dispatcher.push_snapshot(club_id).await;

        (dispatcher, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Handles a single text frame. Never fails, problems turn into replies and logs
    pub async fn handle_text(&self, text: &str) {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Connection {} sent a malformed frame: {}", self.id(), e);

                if let Some(kind) = e.kind {
                    self.fail(&kind, Failure::default());
                }

                return;
            }
        };

        let kind = message.kind();

        if let Err(e) = self.handle(message).await {
            let failure = match e {
                HandlerError::Rejected(failure) => failure,
                e => {
                    error!("Handling {} on {} failed: {}", kind, self.club(), e);
                    Failure::default()
                }
            };

            self.fail(kind, failure);
        }
    }

    async fn handle(&self, message: ClientMessage) -> HandlerResult {
        match message {
            ClientMessage::SwitchClub(request) => self.switch_club(request).await,
            ClientMessage::Login(request) => self.login(request).await,
            ClientMessage::Register(request) => self.register(request).await,
            ClientMessage::Logout(request) => self.logout(request),

            ClientMessage::UsersList => self.users_list().await,
            ClientMessage::UsersDetails => self.users_details().await,
            ClientMessage::JobsList => self.jobs_list().await,
            ClientMessage::JobsRights(request) => self.jobs_rights(request).await,
            ClientMessage::JobsRightsUpdate(request) => self.update_jobs_rights(request).await,
            ClientMessage::JobAdd(request) => self.add_job(request).await,
            ClientMessage::JobDelete(request) => self.delete_job(request).await,

            ClientMessage::UserUpdate(request) => self.update_user(request).await,
            ClientMessage::UserDelete(request) => self.delete_user(request).await,

            ClientMessage::VipAdd(request) => self.add_vip(request).await,
            ClientMessage::VipRemove(request) => self.remove_vip(request).await,
            ClientMessage::DjAdd(request) => self.add_dj(request).await,
            ClientMessage::DjRemove(request) => self.remove_dj(request).await,
            ClientMessage::ShiftList => self.shift_list().await,
            ClientMessage::ShiftAdd(request) => self.add_shift(request).await,
            ClientMessage::ShiftRemove(request) => self.remove_shift(request).await,

            ClientMessage::ClubLogo(request) => self.club_logo(&request.token, None).await,
            ClientMessage::ClubLogoFor(request) => {
                self.club_logo(&request.token, Some(&request.club_id)).await
            }
            ClientMessage::ClubLogoUpdate(request) => self.update_logo(request).await,
            ClientMessage::ClubLogoDelete(request) => self.delete_logo(request).await,
            ClientMessage::AccessKey(request) => self.access_key(request).await,
            ClientMessage::AccessKeyRegenerate(request) => {
                self.regenerate_access_key(request).await
            }

            ClientMessage::UserClubs(request) => self.user_clubs(request).await,
            ClientMessage::UserClubsCreated(request) => self.user_clubs_created(request).await,
            ClientMessage::SelfRights(request) => self.self_rights(request).await,
            ClientMessage::SelfProfile(request) => self.self_profile(request).await,
            ClientMessage::SelfPassword(request) => self.set_self_password(request).await,
            ClientMessage::UserExists(request) => self.user_exists(request).await,

            ClientMessage::ClubRegister(request) => self.register_club(request).await,
            ClientMessage::ClubDelete(request) => self.delete_club(request).await,
            ClientMessage::ClubJoin(request) => self.join_club(request).await,
            ClientMessage::JoinPassword(request) => self.set_join_password(request).await,
            ClientMessage::ClubInvite(request) => self.invite(request).await,

            ClientMessage::Unknown => Ok(()),
        }
    }

    /// The club this connection is viewing right now
    fn club(&self) -> String {
        self.context
            .hub
            .club_of(self.id())
            .unwrap_or_else(|| DEFAULT_CLUB.to_string())
    }

    fn reply(&self, message: ServerMessage) {
        self.context.hub.send_to(self.id(), &message)
    }

    fn broadcast(&self, club_id: &str, message: ServerMessage) {
        self.context.hub.broadcast_club(club_id, &message)
    }

    fn broadcast_all(&self, message: ServerMessage) {
        self.context.hub.broadcast_all(&message)
    }

    fn fail(&self, request: &str, failure: Failure) {
        if let Some(message) = ServerMessage::failure(request, failure) {
            self.reply(message)
        }
    }

    /// Logs a denial and turns it into a failure reply
    fn reject(&self, request: &str, reason: &str, failure: Failure) -> HandlerError {
        debug!("{} rejected on {}: {}", request, self.club(), reason);
        HandlerError::Rejected(failure)
    }

    /// Logs a denied action with its actor and turns it into a failure reply
    fn deny(
        &self,
        request: &str,
        club_id: &str,
        actor: &str,
        reason: &str,
        failure: Failure,
    ) -> HandlerError {
        info!("{} denied on {} for {}: {}", request, club_id, actor, reason);
        HandlerError::Rejected(failure)
    }

    /// Resolves the actor behind a token, if the session is valid
    fn actor(&self, token: &str) -> Option<String> {
        non_blank(token).and_then(|token| self.context.auth.session(token))
    }

    fn authenticate(
        &self,
        request: &str,
        token: &str,
        failure: Failure,
    ) -> Result<String, HandlerError> {
        self.actor(token)
            .ok_or_else(|| self.reject(request, "invalid session", failure))
    }

    /// Makes sure the actor holds the capability in the club, or owns it
    async fn require(
        &self,
        request: &str,
        club_id: &str,
        actor: &str,
        capability: Capability,
        failure: Failure,
    ) -> Result<Grant, HandlerError> {
        let grant = Grant::resolve(self.context.database.as_ref(), club_id, actor).await?;

        if !grant.can(capability) {
            let reason = format!("lacks {}", capability.name());
            return Err(self.deny(request, club_id, actor, &reason, failure));
        }

        Ok(grant)
    }

    /// Makes sure the actor registered the club
    async fn require_creator(
        &self,
        request: &str,
        club_id: &str,
        actor: &str,
        failure: Failure,
    ) -> Result<ClubData, HandlerError> {
        let club = self.context.database.club(club_id).await.optional()?;

        match club {
            Some(club) if club.is_creator(actor) => Ok(club),
            _ => Err(self.deny(request, club_id, actor, "not the creator", failure)),
        }
    }

    /// Sends the full state of a club to this connection
    async fn push_snapshot(&self, club_id: &str) {
        match self.snapshot(club_id).await {
            Ok(messages) => {
                for message in messages {
                    self.reply(message)
                }
            }
            Err(e) => error!("Failed to load state of {}: {}", club_id, e),
        }
    }

    async fn snapshot(&self, club_id: &str) -> Result<Vec<ServerMessage>, DatabaseError> {
        let database = &self.context.database;

        let vips = database.load_vips(club_id).await?;
        let djs = database.load_djs(club_id).await?;
        let members = database.load_members(club_id).await?;
        let rights = database.load_job_rights(club_id).await?;
        let logo = database
            .club(club_id)
            .await
            .optional()?
            .and_then(|c| c.logo)
            .unwrap_or_default();
        let shifts = database.load_shifts(club_id).await?;

        Ok(vec![
            ServerMessage::VipSnapshot { entries: vips },
            ServerMessage::DjSnapshot { entries: djs },
            ServerMessage::UsersList {
                users: members.iter().map(|m| m.username.clone()).collect(),
            },
            ServerMessage::UsersDetails { users: members },
            ServerMessage::JobsList {
                jobs: rights.keys().cloned().collect(),
            },
            ServerMessage::JobsRights { rights },
            ServerMessage::ClubLogo {
                club_id: club_id.to_string(),
                logo_base64: logo,
            },
            ServerMessage::ShiftSnapshot { entries: shifts },
        ])
    }

    /// Sends both member lists of a club to everyone viewing it
    async fn broadcast_members(&self, club_id: &str) -> HandlerResult {
        let members = self.context.database.load_members(club_id).await?;

        self.broadcast(
            club_id,
            ServerMessage::UsersList {
                users: members.iter().map(|m| m.username.clone()).collect(),
            },
        );
        self.broadcast(club_id, ServerMessage::UsersDetails { users: members });

        Ok(())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod test;
