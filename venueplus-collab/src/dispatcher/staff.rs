use log::debug;

use super::{non_blank, Dispatcher, HandlerError, HandlerResult};
use crate::{
    is_reserved_job, may_assign_job, Capability, DatabaseResult, Failure, JobName, RightsUpdate,
    ServerMessage, TokenOnly, UserTarget, UserUpdate, OWNER_JOB,
};

impl Dispatcher {
    pub(super) async fn users_list(&self) -> HandlerResult {
        let members = self.context.database.load_members(&self.club()).await?;

        self.reply(ServerMessage::UsersList {
            users: members.into_iter().map(|m| m.username).collect(),
        });

        Ok(())
    }

    pub(super) async fn users_details(&self) -> HandlerResult {
        let users = self.context.database.load_members(&self.club()).await?;

        self.reply(ServerMessage::UsersDetails { users });
        Ok(())
    }

    pub(super) async fn jobs_list(&self) -> HandlerResult {
        let jobs = self.context.database.job_names(&self.club()).await?;

        self.reply(ServerMessage::JobsList { jobs });
        Ok(())
    }

    pub(super) async fn jobs_rights(&self, request: TokenOnly) -> HandlerResult {
        const REQUEST: &str = "jobs.rights.request";

        let club_id = self.club();
        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require(REQUEST, &club_id, &actor, Capability::ManageJobs, Failure::default())
            .await?;

        let rights = self.context.database.load_job_rights(&club_id).await?;

        self.reply(ServerMessage::JobsRights { rights });
        Ok(())
    }

    pub(super) async fn update_jobs_rights(&self, request: RightsUpdate) -> HandlerResult {
        const REQUEST: &str = "jobs.rights.update";

        let club_id = self.club();

        let (Some(name), Some(rights)) = (non_blank(&request.name), request.rights) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require(REQUEST, &club_id, &actor, Capability::ManageJobs, Failure::default())
            .await?;

        let database = &self.context.database;
        database.set_job_rights(&club_id, name, rights).await?;

        let rights = database.load_job_rights(&club_id).await?;
        self.broadcast(&club_id, ServerMessage::JobsRights { rights });
        self.reply(ServerMessage::JobsRightsOk);

        debug!("{} updated rights of {} on {}", actor, name, club_id);
        Ok(())
    }

    pub(super) async fn add_job(&self, request: JobName) -> HandlerResult {
        const REQUEST: &str = "job.add";

        let club_id = self.club();
        let name = self.checked_job_name(REQUEST, &request, |name| name == OWNER_JOB)?;
        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require(REQUEST, &club_id, &actor, Capability::ManageJobs, Failure::default())
            .await?;

        self.context.database.add_job(&club_id, name).await?;
        self.broadcast_jobs(&club_id).await?;
        self.reply(ServerMessage::JobAddOk);

        Ok(())
    }

    pub(super) async fn delete_job(&self, request: JobName) -> HandlerResult {
        const REQUEST: &str = "job.delete";

        let club_id = self.club();
        let name = self.checked_job_name(REQUEST, &request, is_reserved_job)?;
        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require(REQUEST, &club_id, &actor, Capability::ManageJobs, Failure::default())
            .await?;

        self.context.database.delete_job(&club_id, name).await?;
        self.broadcast_jobs(&club_id).await?;
        self.reply(ServerMessage::JobDeleteOk);

        Ok(())
    }

    /// Checks that a job request carries a token and a usable name
    fn checked_job_name<'a, F>(
        &self,
        request_kind: &str,
        request: &'a JobName,
        reserved: F,
    ) -> Result<&'a str, HandlerError>
    where
        F: Fn(&str) -> bool,
    {
        let (Some(_), Some(name)) = (non_blank(&request.token), non_blank(&request.name)) else {
            return Err(self.reject(request_kind, "missing fields", Failure::default()));
        };

        if reserved(name) {
            return Err(self.reject(request_kind, "reserved job name", Failure::default()));
        }

        Ok(name)
    }

    async fn broadcast_jobs(&self, club_id: &str) -> HandlerResult {
        let jobs = self.context.database.job_names(club_id).await?;

        self.broadcast(club_id, ServerMessage::JobsList { jobs });
        Ok(())
    }

    pub(super) async fn update_user(&self, request: UserUpdate) -> HandlerResult {
        const REQUEST: &str = "user.update.request";

        let club_id = self.club();

        let (Some(_), Some(target)) = (non_blank(&request.token), non_blank(&request.username))
        else {
            return Err(self.reject(
                REQUEST,
                "missing fields",
                Failure::message("Missing token or username"),
            ));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::message("Invalid session"))?;

        let grant = self
            .require(
                REQUEST,
                &club_id,
                &actor,
                Capability::ManageUsers,
                Failure::message("No rights"),
            )
            .await?;

        let database = &self.context.database;

        if database.member(&club_id, target).await.optional()?.is_none() {
            return Err(self.reject(REQUEST, "target not a member", Failure::message("User not in club")));
        }

        let job = request.job.as_deref().and_then(non_blank);
        let role = request.role.as_deref().and_then(non_blank);
        let profiles = database.load_job_rights(&club_id).await?;

        if !may_assign_job(&grant, &actor, target, job, &profiles) {
            return Err(self.deny(
                REQUEST,
                &club_id,
                &actor,
                "self demotion",
                Failure::message("Cannot assign yourself a role that removes ManageJobs"),
            ));
        }

        database.update_membership(&club_id, target, job, role).await?;

        self.broadcast_members(&club_id).await?;
        self.broadcast(
            &club_id,
            ServerMessage::UserUpdate {
                username: target.to_string(),
                job: job.map(str::to_string),
            },
        );
        self.reply(ServerMessage::UserUpdateOk);

        debug!("{} updated {} on {}", actor, target, club_id);
        Ok(())
    }

    pub(super) async fn delete_user(&self, request: UserTarget) -> HandlerResult {
        const REQUEST: &str = "user.delete";

        let club_id = self.club();

        let (Some(_), Some(target)) = (non_blank(&request.token), non_blank(&request.username))
        else {
            return Err(self.reject(
                REQUEST,
                "missing fields",
                Failure::message("Missing token or username"),
            ));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::message("Invalid session"))?;

        if actor == target {
            return Err(self.reject(REQUEST, "self delete", Failure::message("Cannot delete yourself")));
        }

        self.require(
            REQUEST,
            &club_id,
            &actor,
            Capability::ManageUsers,
            Failure::message("No rights"),
        )
        .await?;

        self.context
            .database
            .remove_membership(&club_id, target)
            .await?;

        self.broadcast_members(&club_id).await?;
        self.broadcast_all(ServerMessage::MembershipRemoved {
            username: target.to_string(),
            club_id: club_id.clone(),
        });
        self.reply(ServerMessage::UserDeleteOk);

        debug!("{} removed {} from {}", actor, target, club_id);
        Ok(())
    }
}
