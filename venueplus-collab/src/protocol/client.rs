use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{DjEntry, Rights, ShiftDraft, VipEntry};

/// A request sent by a staff console.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Changes the club the connection is viewing
    #[serde(rename = "switch.club")]
    SwitchClub(SwitchClub),
    #[serde(rename = "login.request")]
    Login(Login),
    #[serde(rename = "register.request")]
    Register(Register),
    #[serde(rename = "session.logout")]
    Logout(TokenOnly),

    #[serde(rename = "users.list.request")]
    UsersList,
    #[serde(rename = "users.details.request")]
    UsersDetails,
    #[serde(rename = "jobs.list.request")]
    JobsList,
    #[serde(rename = "jobs.rights.request")]
    JobsRights(TokenOnly),
    #[serde(rename = "jobs.rights.update")]
    JobsRightsUpdate(RightsUpdate),
    #[serde(rename = "job.add")]
    JobAdd(JobName),
    #[serde(rename = "job.delete")]
    JobDelete(JobName),

    #[serde(rename = "user.update.request")]
    UserUpdate(UserUpdate),
    #[serde(rename = "user.delete")]
    UserDelete(UserTarget),

    #[serde(rename = "vip.add")]
    VipAdd(VipChange),
    #[serde(rename = "vip.remove")]
    VipRemove(VipChange),
    #[serde(rename = "dj.add")]
    DjAdd(DjChange),
    #[serde(rename = "dj.remove")]
    DjRemove(DjChange),
    #[serde(rename = "shift.list.request")]
    ShiftList,
    #[serde(rename = "shift.add")]
    ShiftAdd(ShiftAdd),
    #[serde(rename = "shift.remove")]
    ShiftRemove(ShiftRemove),

    #[serde(rename = "club.logo.request")]
    ClubLogo(TokenOnly),
    #[serde(rename = "club.logo.for.request")]
    ClubLogoFor(ClubTarget),
    #[serde(rename = "club.logo.update")]
    ClubLogoUpdate(LogoUpdate),
    #[serde(rename = "club.logo.delete")]
    ClubLogoDelete(TokenOnly),
    #[serde(rename = "club.accesskey.request")]
    AccessKey(TokenOnly),
    #[serde(rename = "club.accesskey.regenerate")]
    AccessKeyRegenerate(TokenOnly),

    #[serde(rename = "user.clubs.request")]
    UserClubs(TokenOnly),
    #[serde(rename = "user.clubs.created.request")]
    UserClubsCreated(TokenOnly),
    #[serde(rename = "user.self.rights.request")]
    SelfRights(TokenOnly),
    #[serde(rename = "user.self.profile.request")]
    SelfProfile(TokenOnly),
    #[serde(rename = "user.self.password.set")]
    SelfPassword(NewPassword),
    #[serde(rename = "user.exists.request")]
    UserExists(UserExists),

    #[serde(rename = "club.register")]
    ClubRegister(ClubRegister),
    #[serde(rename = "club.delete")]
    ClubDelete(ClubTarget),
    #[serde(rename = "club.join")]
    ClubJoin(ClubJoin),
    #[serde(rename = "club.join.password.set")]
    JoinPassword(NewPassword),
    #[serde(rename = "club.invite")]
    ClubInvite(ClubInvite),

    /// Any type this server does not know about
    #[serde(other)]
    Unknown,
}

/// A frame that could not be decoded into a [ClientMessage]
#[derive(Debug, Error)]
#[error("Malformed message: {source}")]
pub struct MalformedMessage {
    /// The `type` of the frame, if it had a readable one
    pub kind: Option<String>,
    #[source]
    pub source: serde_json::Error,
}

impl ClientMessage {
    /// Decodes a text frame, reading the discriminator before the payload
    pub fn parse(text: &str) -> Result<Self, MalformedMessage> {
        let value: Value = serde_json::from_str(text)
            .map_err(|source| MalformedMessage { kind: None, source })?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self::deserialize(value).map_err(|source| MalformedMessage { kind, source })
    }

    /// The wire `type` of the request
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwitchClub(_) => "switch.club",
            Self::Login(_) => "login.request",
            Self::Register(_) => "register.request",
            Self::Logout(_) => "session.logout",
            Self::UsersList => "users.list.request",
            Self::UsersDetails => "users.details.request",
            Self::JobsList => "jobs.list.request",
            Self::JobsRights(_) => "jobs.rights.request",
            Self::JobsRightsUpdate(_) => "jobs.rights.update",
            Self::JobAdd(_) => "job.add",
            Self::JobDelete(_) => "job.delete",
            Self::UserUpdate(_) => "user.update.request",
            Self::UserDelete(_) => "user.delete",
            Self::VipAdd(_) => "vip.add",
            Self::VipRemove(_) => "vip.remove",
            Self::DjAdd(_) => "dj.add",
            Self::DjRemove(_) => "dj.remove",
            Self::ShiftList => "shift.list.request",
            Self::ShiftAdd(_) => "shift.add",
            Self::ShiftRemove(_) => "shift.remove",
            Self::ClubLogo(_) => "club.logo.request",
            Self::ClubLogoFor(_) => "club.logo.for.request",
            Self::ClubLogoUpdate(_) => "club.logo.update",
            Self::ClubLogoDelete(_) => "club.logo.delete",
            Self::AccessKey(_) => "club.accesskey.request",
            Self::AccessKeyRegenerate(_) => "club.accesskey.regenerate",
            Self::UserClubs(_) => "user.clubs.request",
            Self::UserClubsCreated(_) => "user.clubs.created.request",
            Self::SelfRights(_) => "user.self.rights.request",
            Self::SelfProfile(_) => "user.self.profile.request",
            Self::SelfPassword(_) => "user.self.password.set",
            Self::UserExists(_) => "user.exists.request",
            Self::ClubRegister(_) => "club.register",
            Self::ClubDelete(_) => "club.delete",
            Self::ClubJoin(_) => "club.join",
            Self::JoinPassword(_) => "club.join.password.set",
            Self::ClubInvite(_) => "club.invite",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenOnly {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitchClub {
    pub club_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Register {
    pub character_name: String,
    pub home_world: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobName {
    pub token: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RightsUpdate {
    pub token: String,
    pub name: String,
    pub rights: Option<Rights>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdate {
    pub token: String,
    pub username: String,
    pub job: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserTarget {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VipChange {
    pub token: String,
    pub entry: Option<VipEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DjChange {
    pub token: String,
    pub entry: Option<DjEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShiftAdd {
    pub token: String,
    pub entry: Option<ShiftDraft>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShiftRemove {
    pub token: String,
    pub id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClubTarget {
    pub token: String,
    pub club_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoUpdate {
    pub token: String,
    pub logo_base64: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserExists {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClubRegister {
    pub club_id: String,
    pub token: Option<String>,
    pub creator_username: Option<String>,
    pub default_staff_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClubJoin {
    pub token: String,
    pub club_id: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPassword {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClubInvite {
    pub token: String,
    pub target_uid: String,
    pub target_username: String,
    pub job: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_known_messages() {
        let message =
            ClientMessage::parse(r#"{"type":"vip.add","token":"t","entry":{"characterName":"Alice","homeWorld":"Balmung"}}"#)
                .unwrap();

        match message {
            ClientMessage::VipAdd(change) => {
                assert_eq!(change.token, "t");
                assert_eq!(change.entry.unwrap().key(), "Alice@Balmung");
            }
            other => panic!("unexpected message {:?}", other),
        }

        let message = ClientMessage::parse(r#"{"type":"users.list.request","token":"x"}"#).unwrap();
        assert!(matches!(message, ClientMessage::UsersList));
    }

    #[test]
    fn test_missing_fields_default() {
        let message = ClientMessage::parse(r#"{"type":"switch.club"}"#).unwrap();
        assert!(matches!(message, ClientMessage::SwitchClub(SwitchClub { club_id: None })));

        let message = ClientMessage::parse(r#"{"type":"club.join"}"#).unwrap();
        assert_eq!(message.kind(), "club.join");
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let message = ClientMessage::parse(r#"{"type":"future.feature","x":1}"#).unwrap();
        assert!(matches!(message, ClientMessage::Unknown));
    }

    #[test]
    fn test_malformed_payload_keeps_type() {
        let error = ClientMessage::parse(r#"{"type":"shift.remove","id":"not-a-uuid"}"#).unwrap_err();
        assert_eq!(error.kind.as_deref(), Some("shift.remove"));

        let error = ClientMessage::parse("not json").unwrap_err();
        assert_eq!(error.kind, None);
    }
}
