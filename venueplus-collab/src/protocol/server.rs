use std::collections::BTreeMap;

use serde::Serialize;

use crate::{DjEntry, Rights, ShiftEntry, StaffUser, VipEntry};

/// Whether a roster change added or removed an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Add,
    Remove,
}

/// Optional details attached to a `*.fail` reply
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Failure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Failure {
    pub fn code(code: u16) -> Self {
        Self {
            code: Some(code),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A message sent by the server, either as a reply or as a broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Every VIP of a club, ordered by character name
    #[serde(rename = "vip.snapshot")]
    VipSnapshot { entries: Vec<VipEntry> },
    #[serde(rename = "dj.snapshot")]
    DjSnapshot { entries: Vec<DjEntry> },
    /// Member names of a club, ordered
    #[serde(rename = "users.list")]
    UsersList { users: Vec<String> },
    #[serde(rename = "users.details")]
    UsersDetails { users: Vec<StaffUser> },
    #[serde(rename = "jobs.list")]
    JobsList { jobs: Vec<String> },
    #[serde(rename = "jobs.rights")]
    JobsRights { rights: BTreeMap<String, Rights> },
    /// The logo of a club, empty when it has none or the caller may not see it
    #[serde(rename = "club.logo")]
    ClubLogo { club_id: String, logo_base64: String },
    /// The shift plan of a club, ordered by start
    #[serde(rename = "shift.snapshot")]
    ShiftSnapshot { entries: Vec<ShiftEntry> },

    #[serde(rename = "vip.update")]
    VipUpdate { op: Op, entry: VipEntry },
    #[serde(rename = "dj.update")]
    DjUpdate { op: Op, entry: DjEntry },
    #[serde(rename = "shift.update")]
    ShiftUpdate { op: Op, entry: ShiftEntry },
    /// A member's job changed
    #[serde(rename = "user.update")]
    UserUpdate { username: String, job: Option<String> },
    /// An actor became a member of a club. Sent to every connection
    #[serde(rename = "membership.added")]
    MembershipAdded { username: String, club_id: String },
    /// An actor left a club, or the whole club went away when `username` is empty
    #[serde(rename = "membership.removed")]
    MembershipRemoved { username: String, club_id: String },
    /// The club the connection is viewing was deleted
    #[serde(rename = "club.deleted")]
    ClubDeleted,

    #[serde(rename = "login.ok")]
    LoginOk { token: String },
    #[serde(rename = "login.fail")]
    LoginFail(Failure),
    #[serde(rename = "register.ok")]
    RegisterOk,
    #[serde(rename = "register.fail")]
    RegisterFail(Failure),
    #[serde(rename = "session.logout.ok")]
    LogoutOk,
    #[serde(rename = "session.logout.fail")]
    LogoutFail(Failure),

    #[serde(rename = "user.clubs")]
    UserClubs { clubs: Vec<String> },
    #[serde(rename = "user.clubs.created")]
    UserClubsCreated { clubs: Vec<String> },
    #[serde(rename = "user.self.rights")]
    SelfRights {
        job: String,
        rights: BTreeMap<&'static str, bool>,
    },
    #[serde(rename = "user.self.profile")]
    SelfProfile { username: String, uid: String },
    #[serde(rename = "user.self.password.ok")]
    SelfPasswordOk,
    #[serde(rename = "user.self.password.fail")]
    SelfPasswordFail(Failure),
    #[serde(rename = "user.exists")]
    UserExists { exists: bool },

    #[serde(rename = "jobs.rights.ok")]
    JobsRightsOk,
    #[serde(rename = "jobs.rights.fail")]
    JobsRightsFail(Failure),
    #[serde(rename = "job.add.ok")]
    JobAddOk,
    #[serde(rename = "job.add.fail")]
    JobAddFail(Failure),
    #[serde(rename = "job.delete.ok")]
    JobDeleteOk,
    #[serde(rename = "job.delete.fail")]
    JobDeleteFail(Failure),

    #[serde(rename = "user.update.ok")]
    UserUpdateOk,
    #[serde(rename = "user.update.fail")]
    UserUpdateFail(Failure),
    #[serde(rename = "user.delete.ok")]
    UserDeleteOk,
    #[serde(rename = "user.delete.fail")]
    UserDeleteFail(Failure),

    #[serde(rename = "vip.update.ok")]
    VipUpdateOk,
    #[serde(rename = "vip.update.fail")]
    VipUpdateFail(Failure),
    #[serde(rename = "dj.update.ok")]
    DjUpdateOk,
    #[serde(rename = "dj.update.fail")]
    DjUpdateFail(Failure),
    #[serde(rename = "shift.update.ok")]
    ShiftUpdateOk,
    #[serde(rename = "shift.update.fail")]
    ShiftUpdateFail(Failure),

    #[serde(rename = "club.logo.update.ok")]
    LogoUpdateOk,
    #[serde(rename = "club.logo.update.fail")]
    LogoUpdateFail(Failure),
    #[serde(rename = "club.logo.delete.ok")]
    LogoDeleteOk,
    #[serde(rename = "club.logo.delete.fail")]
    LogoDeleteFail(Failure),
    #[serde(rename = "club.accesskey")]
    AccessKey { access_key: String },
    #[serde(rename = "club.accesskey.fail")]
    AccessKeyFail(Failure),
    #[serde(rename = "club.accesskey.regenerate.ok")]
    AccessKeyRegenerateOk { access_key: String },
    #[serde(rename = "club.accesskey.regenerate.fail")]
    AccessKeyRegenerateFail(Failure),

    #[serde(rename = "club.register.ok")]
    ClubRegisterOk,
    #[serde(rename = "club.register.fail")]
    ClubRegisterFail(Failure),
    #[serde(rename = "club.delete.ok")]
    ClubDeleteOk,
    #[serde(rename = "club.delete.fail")]
    ClubDeleteFail(Failure),
    #[serde(rename = "club.join.ok")]
    ClubJoinOk,
    #[serde(rename = "club.join.fail")]
    ClubJoinFail(Failure),
    #[serde(rename = "club.join.password.ok")]
    JoinPasswordOk,
    #[serde(rename = "club.join.password.fail")]
    JoinPasswordFail(Failure),
    #[serde(rename = "club.invite.ok")]
    ClubInviteOk,
    #[serde(rename = "club.invite.fail")]
    ClubInviteFail(Failure),
}

impl ServerMessage {
    /// The failure reply answering a request of the given type.
    /// Read-only requests have none and return None.
    pub fn failure(request: &str, failure: Failure) -> Option<Self> {
        let message = match request {
            "login.request" => Self::LoginFail(failure),
            "register.request" => Self::RegisterFail(failure),
            "session.logout" => Self::LogoutFail(failure),
            "jobs.rights.request" | "jobs.rights.update" => Self::JobsRightsFail(failure),
            "job.add" => Self::JobAddFail(failure),
            "job.delete" => Self::JobDeleteFail(failure),
            "user.update.request" => Self::UserUpdateFail(failure),
            "user.delete" => Self::UserDeleteFail(failure),
            "vip.add" | "vip.remove" => Self::VipUpdateFail(failure),
            "dj.add" | "dj.remove" => Self::DjUpdateFail(failure),
            "shift.add" | "shift.remove" => Self::ShiftUpdateFail(failure),
            "club.logo.update" => Self::LogoUpdateFail(failure),
            "club.logo.delete" => Self::LogoDeleteFail(failure),
            "club.accesskey.request" => Self::AccessKeyFail(failure),
            "club.accesskey.regenerate" => Self::AccessKeyRegenerateFail(failure),
            "club.register" => Self::ClubRegisterFail(failure),
            "club.delete" => Self::ClubDeleteFail(failure),
            "club.join" => Self::ClubJoinFail(failure),
            "club.join.password.set" => Self::JoinPasswordFail(failure),
            "user.self.password.set" => Self::SelfPasswordFail(failure),
            "club.invite" => Self::ClubInviteFail(failure),
            _ => return None,
        };

        Some(message)
    }
}
