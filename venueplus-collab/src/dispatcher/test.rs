use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use super::*;
use crate::{
    password::light_config, Collab, Credentials, MemoryDatabase, NewMembership, Rights, OWNER_JOB,
};

struct Client {
    dispatcher: Dispatcher,
    receiver: UnboundedReceiver<Outbound>,
}

impl Client {
    async fn open(collab: &Collab, club_id: &str) -> Self {
        let (dispatcher, receiver) = collab.connect(club_id).await;
        let mut client = Self {
            dispatcher,
            receiver,
        };

        client.drain();
        client
    }

    async fn send(&self, message: Value) {
        self.dispatcher.handle_text(&message.to_string()).await
    }

    fn drain(&mut self) -> Vec<Value> {
        let mut frames = vec![];

        while let Ok(outbound) = self.receiver.try_recv() {
            if let Outbound::Text(text) = outbound {
                frames.push(serde_json::from_str(&text).unwrap());
            }
        }

        frames
    }

    fn types(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .map(|f| f["type"].as_str().unwrap().to_string())
            .collect()
    }

    /// The first frame of the given type among the pending ones
    fn find(&mut self, kind: &str) -> Value {
        self.drain()
            .into_iter()
            .find(|f| f["type"] == kind)
            .unwrap_or_else(|| panic!("no {} frame", kind))
    }
}

/// Keeps every log line emitted by the crate under test
struct Recorder(Mutex<Vec<(Level, String)>>);

impl Log for Recorder {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut lines) = self.0.lock() {
            lines.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static RECORDER: Recorder = Recorder(Mutex::new(Vec::new()));

fn recorded(level: Level) -> Vec<String> {
    let _ = log::set_logger(&RECORDER);
    log::set_max_level(LevelFilter::Trace);

    RECORDER
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, _)| *l <= level)
        .map(|(_, line)| line.clone())
        .collect()
}

async fn collab() -> Collab {
    let collab = Collab::new(Arc::new(MemoryDatabase::new()), light_config());
    collab.ensure_defaults(None).await.unwrap();
    collab
}

async fn account(collab: &Collab, username: &str) -> String {
    let auth = &collab.context().auth;

    auth.create_account(Credentials::new(username, "pw1"))
        .await
        .unwrap();
    auth.login(Credentials::new(username, "pw1")).await.unwrap()
}

/// Registers a club owned by `owner` and returns the owner's token
async fn club_with_owner(collab: &Collab, club_id: &str, owner: &str) -> String {
    let token = account(collab, owner).await;
    let client = Client::open(collab, DEFAULT_CLUB).await;

    client
        .send(json!({ "type": "club.register", "clubId": club_id, "token": token }))
        .await;

    token
}

#[tokio::test]
async fn test_open_pushes_snapshot_in_order() {
    let collab = collab().await;
    let (_dispatcher, mut receiver) = collab.connect("").await;

    let mut types = vec![];
    while let Ok(Outbound::Text(text)) = receiver.try_recv() {
        let frame: Value = serde_json::from_str(&text).unwrap();
        types.push(frame["type"].as_str().unwrap().to_string());
    }

    assert_eq!(
        types,
        vec![
            "vip.snapshot",
            "dj.snapshot",
            "users.list",
            "users.details",
            "jobs.list",
            "jobs.rights",
            "club.logo",
            "shift.snapshot"
        ]
    );
}

#[tokio::test]
async fn test_switch_to_current_club_is_idempotent() {
    let collab = collab().await;
    let mut client = Client::open(&collab, DEFAULT_CLUB).await;

    client.send(json!({ "type": "switch.club", "clubId": "default" })).await;
    assert!(client.drain().is_empty());

    client.send(json!({ "type": "switch.club" })).await;
    assert!(client.drain().is_empty());

    client.send(json!({ "type": "switch.club", "clubId": "nightclub" })).await;
    assert_eq!(client.drain().len(), 8);

    client.send(json!({ "type": "switch.club", "clubId": "nightclub" })).await;
    assert!(client.drain().is_empty());
}

#[tokio::test]
async fn test_login_flow() {
    let collab = collab().await;
    let mut client = Client::open(&collab, DEFAULT_CLUB).await;

    collab
        .context()
        .auth
        .create_account(Credentials::new("Amy", "pw1"))
        .await
        .unwrap();

    client
        .send(json!({ "type": "login.request", "username": "Amy", "password": "nope" }))
        .await;
    assert_eq!(client.drain(), vec![json!({ "type": "login.fail" })]);

    client
        .send(json!({ "type": "login.request", "username": "Amy", "password": "pw1" }))
        .await;
    assert_eq!(client.types(), vec!["login.ok", "user.clubs", "user.clubs.created"]);
}

#[tokio::test]
async fn test_register_codes() {
    let collab = collab().await;
    let mut client = Client::open(&collab, DEFAULT_CLUB).await;

    let request = json!({
        "type": "register.request",
        "characterName": "Amy",
        "homeWorld": "Balmung",
        "password": "pw1"
    });

    client.send(request.clone()).await;
    assert_eq!(client.types(), vec!["register.ok"]);

    client.send(request).await;
    assert_eq!(client.find("register.fail")["code"], 409);

    client
        .send(json!({ "type": "register.request", "characterName": "Amy", "password": "pw1" }))
        .await;
    assert_eq!(client.find("register.fail")["code"], 400);

    let user = collab.database().user_by_username("Amy@Balmung").await.unwrap();
    assert_eq!(user.uid.len(), crate::UID_LENGTH);
}

#[tokio::test]
async fn test_unassigned_actor_cannot_add_vip() {
    let collab = collab().await;
    let mut client = Client::open(&collab, DEFAULT_CLUB).await;
    let token = account(&collab, "Amy").await;

    client
        .send(json!({
            "type": "vip.add",
            "token": token,
            "entry": { "characterName": "Alice", "homeWorld": "Balmung" }
        }))
        .await;

    assert_eq!(client.drain(), vec![json!({ "type": "vip.update.fail" })]);
    assert!(collab.database().load_vips(DEFAULT_CLUB).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_denied_vip_add_is_logged_with_actor() {
    recorded(Level::Info);

    let collab = collab().await;
    let client = Client::open(&collab, DEFAULT_CLUB).await;
    let token = account(&collab, "Quentin").await;

    client
        .send(json!({
            "type": "vip.add",
            "token": token,
            "entry": { "characterName": "Alice", "homeWorld": "Balmung" }
        }))
        .await;

    let denied = recorded(Level::Info)
        .into_iter()
        .any(|line| line.starts_with("vip.add denied") && line.contains("Quentin"));
    assert!(denied);
}

#[tokio::test]
async fn test_owner_vip_add_is_broadcast_to_club_only() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;

    let member = collab.database().member("nightclub", "Amy").await.unwrap();
    assert_eq!(member.job, OWNER_JOB);

    let mut owner = Client::open(&collab, "nightclub").await;
    let mut watcher = Client::open(&collab, "nightclub").await;
    let mut outsider = Client::open(&collab, DEFAULT_CLUB).await;

    let vip = json!({
        "type": "vip.add",
        "token": token,
        "entry": { "characterName": "Alice", "homeWorld": "Balmung", "duration": 30 }
    });

    owner.send(vip.clone()).await;
    assert_eq!(owner.types(), vec!["vip.update", "vip.update.ok"]);

    let update = watcher.find("vip.update");
    assert_eq!(update["op"], "add");
    assert_eq!(update["entry"]["characterName"], "Alice");
    assert!(outsider.drain().is_empty());

    // Re-adding the same key updates instead of duplicating
    owner.send(vip).await;
    assert_eq!(collab.database().load_vips("nightclub").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_broadcast_follows_current_affiliation() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;

    let owner = Client::open(&collab, "nightclub").await;
    let mut roaming = Client::open(&collab, "nightclub").await;

    roaming.send(json!({ "type": "switch.club", "clubId": "default" })).await;
    roaming.drain();

    owner
        .send(json!({
            "type": "dj.add",
            "token": token,
            "entry": { "djName": "Spin", "twitchLink": "www.twitch.tv/Spin/" }
        }))
        .await;

    assert!(roaming.drain().is_empty());

    let djs = collab.database().load_djs("nightclub").await.unwrap();
    assert_eq!(djs[0].twitch_link, "https://twitch.tv/Spin");
}

#[tokio::test]
async fn test_club_delete_rules() {
    let collab = collab().await;
    let _owner = club_with_owner(&collab, "nightclub", "Amy").await;
    let bob = account(&collab, "Bob").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client
        .send(json!({ "type": "club.delete", "token": bob, "clubId": "nightclub" }))
        .await;
    assert_eq!(
        client.drain(),
        vec![json!({ "type": "club.delete.fail", "code": 401 })]
    );
    assert!(collab.database().club("nightclub").await.is_ok());

    client
        .send(json!({ "type": "club.delete", "token": bob, "clubId": "default" }))
        .await;
    assert_eq!(client.find("club.delete.fail")["code"], 403);
}

#[tokio::test]
async fn test_club_delete_by_creator() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let mut viewer = Client::open(&collab, "nightclub").await;
    let mut elsewhere = Client::open(&collab, DEFAULT_CLUB).await;

    viewer
        .send(json!({ "type": "club.delete", "token": token, "clubId": "nightclub" }))
        .await;

    assert_eq!(
        viewer.types(),
        vec!["club.deleted", "membership.removed", "club.delete.ok"]
    );
    assert_eq!(
        elsewhere.drain(),
        vec![json!({ "type": "membership.removed", "username": "", "clubId": "nightclub" })]
    );
    assert!(collab.database().club("nightclub").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_jobs_rights_roundtrip_and_owner_forcing() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client
        .send(json!({
            "type": "jobs.rights.update",
            "token": token,
            "name": "Greeter",
            "rights": { "addVip": true, "rank": 3, "colorHex": "#FF0000", "iconKey": "Star" }
        }))
        .await;
    assert_eq!(client.types(), vec!["jobs.rights", "jobs.rights.ok"]);

    client
        .send(json!({
            "type": "jobs.rights.update",
            "token": token,
            "name": "Owner",
            "rights": { "addVip": false, "rank": 2 }
        }))
        .await;
    client.drain();

    client.send(json!({ "type": "jobs.rights.request", "token": token })).await;
    let rights = client.find("jobs.rights")["rights"].clone();

    let greeter: Rights = serde_json::from_value(rights["Greeter"].clone()).unwrap();
    assert!(greeter.add_vip);
    assert!(!greeter.remove_vip);
    assert_eq!(greeter.color_hex, "#FF0000");
    assert_eq!(greeter.icon_key, "Star");

    let owner: Rights = serde_json::from_value(rights["Owner"].clone()).unwrap();
    assert!(owner.capability_map().values().all(|allowed| *allowed));
    assert_eq!(owner.rank, 9);
}

#[tokio::test]
async fn test_job_names_are_guarded() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client.send(json!({ "type": "job.add", "token": token, "name": "Owner" })).await;
    assert_eq!(client.types(), vec!["job.add.fail"]);

    client
        .send(json!({ "type": "job.delete", "token": token, "name": "Unassigned" }))
        .await;
    assert_eq!(client.types(), vec!["job.delete.fail"]);

    client.send(json!({ "type": "job.add", "token": token, "name": "Bouncer" })).await;
    assert_eq!(client.types(), vec!["jobs.list", "job.add.ok"]);

    let jobs = collab.database().job_names("nightclub").await.unwrap();
    assert!(jobs.contains(&"Bouncer".to_string()));
}

#[tokio::test]
async fn test_user_update_failures() {
    let collab = collab().await;
    let _owner = club_with_owner(&collab, "nightclub", "Amy").await;
    let bob = account(&collab, "Bob").await;
    let database = collab.database();

    let manager = Rights {
        manage_users: true,
        manage_jobs: true,
        ..Default::default()
    };
    database.set_job_rights("nightclub", "Manager", manager).await.unwrap();
    database
        .add_membership(NewMembership {
            club_id: "nightclub".to_string(),
            username: "Bob".to_string(),
            job: "Manager".to_string(),
            role: "power".to_string(),
        })
        .await
        .unwrap();

    let mut client = Client::open(&collab, "nightclub").await;

    client.send(json!({ "type": "user.update.request", "token": bob })).await;
    assert_eq!(client.find("user.update.fail")["message"], "Missing token or username");

    client
        .send(json!({ "type": "user.update.request", "token": "bogus", "username": "Amy" }))
        .await;
    assert_eq!(client.find("user.update.fail")["message"], "Invalid session");

    client
        .send(json!({ "type": "user.update.request", "token": bob, "username": "Zed" }))
        .await;
    assert_eq!(client.find("user.update.fail")["message"], "User not in club");

    client
        .send(json!({ "type": "user.update.request", "token": bob, "username": "Bob", "job": "Greeter" }))
        .await;
    assert_eq!(
        client.find("user.update.fail")["message"],
        "Cannot assign yourself a role that removes ManageJobs"
    );
    assert_eq!(database.member("nightclub", "Bob").await.unwrap().job, "Manager");

    client
        .send(json!({ "type": "user.update.request", "token": bob, "username": "Bob", "role": "night" }))
        .await;
    let frames = client.drain();
    assert_eq!(frames.last().unwrap()["type"], "user.update.ok");
    assert!(frames
        .iter()
        .any(|f| f["type"] == "user.update" && f["job"].is_null()));
}

#[tokio::test]
async fn test_user_delete() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client
        .send(json!({ "type": "user.delete", "token": token, "username": "Amy" }))
        .await;
    assert_eq!(client.find("user.delete.fail")["message"], "Cannot delete yourself");

    let _bob = account(&collab, "Bob").await;
    client
        .send(json!({ "type": "club.invite", "token": token, "targetUsername": "Bob" }))
        .await;
    client.drain();

    client
        .send(json!({ "type": "user.delete", "token": token, "username": "Bob" }))
        .await;
    assert_eq!(
        client.types(),
        vec!["users.list", "users.details", "membership.removed", "user.delete.ok"]
    );
    assert!(collab.database().member("nightclub", "Bob").await.is_err());
}

#[tokio::test]
async fn test_club_join() {
    let collab = collab().await;
    let owner = club_with_owner(&collab, "nightclub", "Amy").await;
    let bob = account(&collab, "Bob").await;
    let mut client = Client::open(&collab, "nightclub").await;

    let join = json!({ "type": "club.join", "token": bob, "clubId": "nightclub", "password": "door" });

    client.send(join.clone()).await;
    assert_eq!(client.find("club.join.fail")["code"], 403);

    client
        .send(json!({ "type": "club.join.password.set", "token": bob, "newPassword": "door" }))
        .await;
    assert_eq!(client.find("club.join.password.fail")["code"], 403);

    client
        .send(json!({ "type": "club.join.password.set", "token": owner, "newPassword": "door" }))
        .await;
    assert_eq!(client.types(), vec!["club.join.password.ok"]);

    client
        .send(json!({ "type": "club.join", "token": bob, "clubId": "nightclub", "password": "wrong" }))
        .await;
    assert_eq!(client.find("club.join.fail")["code"], 401);

    client
        .send(json!({ "type": "club.join", "token": bob, "clubId": "elsewhere", "password": "door" }))
        .await;
    assert_eq!(client.find("club.join.fail")["code"], 404);

    client.send(join.clone()).await;
    let frames = client.drain();
    assert!(frames
        .iter()
        .any(|f| *f == json!({ "type": "membership.added", "username": "Bob", "clubId": "nightclub" })));
    assert_eq!(frames.last().unwrap()["type"], "club.join.ok");

    let member = collab.database().member("nightclub", "Bob").await.unwrap();
    assert_eq!(member.job, "Unassigned");

    client.send(join).await;
    assert_eq!(client.find("club.join.fail")["code"], 409);
}

#[tokio::test]
async fn test_club_invite() {
    let collab = collab().await;
    let owner = club_with_owner(&collab, "nightclub", "Amy").await;
    let bob = account(&collab, "Bob").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client
        .send(json!({ "type": "club.invite", "token": bob, "targetUsername": "Amy" }))
        .await;
    assert_eq!(client.find("club.invite.fail")["code"], 403);

    client
        .send(json!({ "type": "club.invite", "token": owner, "targetUid": "NOPE" }))
        .await;
    assert_eq!(
        client.drain(),
        vec![json!({ "type": "club.invite.fail", "code": 404, "message": "Unknown UID" })]
    );

    client.send(json!({ "type": "club.invite", "token": owner })).await;
    assert_eq!(client.find("club.invite.fail")["code"], 400);

    let uid = collab.database().user_by_username("Bob").await.unwrap().uid;
    client
        .send(json!({ "type": "club.invite", "token": owner, "targetUid": uid, "job": "Greeter" }))
        .await;
    assert_eq!(client.drain().last().unwrap()["type"], "club.invite.ok");
    assert_eq!(collab.database().member("nightclub", "Bob").await.unwrap().job, "Greeter");

    // Existing members only get their job updated
    client
        .send(json!({ "type": "club.invite", "token": owner, "targetUsername": "Bob", "job": "Dancer" }))
        .await;
    assert_eq!(client.drain().last().unwrap()["type"], "club.invite.ok");
    assert_eq!(collab.database().member("nightclub", "Bob").await.unwrap().job, "Dancer");
}

#[tokio::test]
async fn test_club_register_failures() {
    let collab = collab().await;
    let mut client = Client::open(&collab, DEFAULT_CLUB).await;

    client.send(json!({ "type": "club.register", "clubId": " " })).await;
    assert_eq!(client.find("club.register.fail")["code"], 400);

    client.send(json!({ "type": "club.register", "clubId": "a|b" })).await;
    assert_eq!(client.find("club.register.fail")["code"], 400);

    client.send(json!({ "type": "club.register", "clubId": "default" })).await;
    assert_eq!(client.find("club.register.fail")["code"], 409);

    client
        .send(json!({ "type": "club.register", "clubId": "bar", "creatorUsername": "Ghost" }))
        .await;
    assert_eq!(client.find("club.register.fail")["code"], 400);

    client
        .send(json!({
            "type": "club.register",
            "clubId": "bar",
            "creatorUsername": "Ghost",
            "defaultStaffPassword": "boo"
        }))
        .await;
    let frames = client.drain();
    assert!(frames.iter().any(|f| f["type"] == "jobs.list"));
    assert_eq!(frames.last().unwrap()["type"], "club.register.ok");

    let club = collab.database().club("bar").await.unwrap();
    assert_eq!(club.creator, "Ghost");
    assert!(club.access_key.is_some());
}

#[tokio::test]
async fn test_shift_plan() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client
        .send(json!({
            "type": "shift.add",
            "token": token,
            "entry": {
                "title": "Bar",
                "startAt": "2024-05-01T22:00:00Z",
                "endAt": "2024-05-01T20:00:00Z"
            }
        }))
        .await;
    assert_eq!(client.types(), vec!["shift.update.fail"]);

    client
        .send(json!({
            "type": "shift.add",
            "token": token,
            "entry": { "title": "Bar", "startAt": "2024-05-01T20:00:00Z" }
        }))
        .await;
    let update = client.find("shift.update");
    assert_eq!(update["entry"]["endAt"], "2024-05-01T22:00:00Z");

    let id = update["entry"]["id"].clone();
    client
        .send(json!({ "type": "shift.remove", "token": token, "id": id }))
        .await;
    assert_eq!(client.types(), vec!["shift.update", "shift.update.ok"]);
    assert!(collab.database().load_shifts("nightclub").await.unwrap().is_empty());

    client
        .send(json!({ "type": "shift.remove", "token": token, "id": "not-a-uuid" }))
        .await;
    assert_eq!(client.types(), vec!["shift.update.fail"]);
}

#[tokio::test]
async fn test_self_queries() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client.send(json!({ "type": "user.self.rights.request", "token": token })).await;
    let rights = client.find("user.self.rights");
    assert_eq!(rights["job"], "Owner");
    assert_eq!(rights["rights"]["editShiftPlan"], true);

    client.send(json!({ "type": "user.self.rights.request" })).await;
    assert_eq!(
        client.drain(),
        vec![json!({ "type": "user.self.rights", "job": "Unassigned", "rights": {} })]
    );

    client.send(json!({ "type": "user.self.profile.request", "token": token })).await;
    let profile = client.find("user.self.profile");
    assert_eq!(profile["username"], "Amy");
    assert_eq!(profile["uid"].as_str().unwrap().len(), crate::UID_LENGTH);

    client.send(json!({ "type": "user.exists.request", "username": "Amy" })).await;
    assert_eq!(client.find("user.exists")["exists"], true);

    client.send(json!({ "type": "user.clubs.created.request", "token": token })).await;
    assert_eq!(client.find("user.clubs.created")["clubs"], json!(["nightclub"]));

    client.send(json!({ "type": "session.logout" })).await;
    assert_eq!(client.find("session.logout.fail")["code"], 400);

    client.send(json!({ "type": "session.logout", "token": token })).await;
    assert_eq!(client.types(), vec!["session.logout.ok"]);

    client.send(json!({ "type": "user.clubs.request", "token": token })).await;
    assert_eq!(client.find("user.clubs")["clubs"], json!([]));
}

#[tokio::test]
async fn test_access_keys_and_logo() {
    let collab = collab().await;
    let token = club_with_owner(&collab, "nightclub", "Amy").await;
    let bob = account(&collab, "Bob").await;
    let mut client = Client::open(&collab, "nightclub").await;

    client.send(json!({ "type": "club.accesskey.request", "token": token })).await;
    let key = client.find("club.accesskey")["accessKey"].clone();
    assert_eq!(key.as_str().unwrap().len(), crate::ACCESS_KEY_LENGTH);

    client
        .send(json!({ "type": "club.accesskey.regenerate", "token": bob }))
        .await;
    assert_eq!(client.find("club.accesskey.regenerate.fail")["code"], 403);

    client
        .send(json!({ "type": "club.accesskey.regenerate", "token": token }))
        .await;
    let rotated = client.find("club.accesskey.regenerate.ok")["accessKey"].clone();
    assert_ne!(rotated, key);

    client
        .send(json!({ "type": "club.logo.update", "token": token, "logoBase64": "%%%" }))
        .await;
    assert_eq!(client.types(), vec!["club.logo.update.fail"]);

    client.send(json!({ "type": "club.logo.delete", "token": bob })).await;
    assert_eq!(client.find("club.logo.delete.fail")["code"], 403);

    client.send(json!({ "type": "club.logo.delete", "token": token })).await;
    assert_eq!(client.types(), vec!["club.logo", "club.logo.delete.ok"]);

    client.send(json!({ "type": "club.logo.for.request", "token": bob, "clubId": "nightclub" })).await;
    assert_eq!(client.find("club.logo")["logoBase64"], "");
}

#[tokio::test]
async fn test_unknown_and_malformed_frames() {
    let collab = collab().await;
    let mut client = Client::open(&collab, DEFAULT_CLUB).await;

    client.send(json!({ "type": "future.feature" })).await;
    client.dispatcher.handle_text("not json").await;
    assert!(client.drain().is_empty());

    client.send(json!({ "type": "vip.add", "entry": "nope" })).await;
    assert_eq!(client.types(), vec!["vip.update.fail"]);
}
