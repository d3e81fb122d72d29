use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde_json::{json, Value};
use venueplus_collab::{Collab, DatabaseResult, DjEntry, StaffUser, VipEntry};

use crate::{context::ServerContext, errors::ServerResult};

/// A staff member as listed on the public read surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStaff {
    pub username: String,
    pub job: String,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<StaffUser> for PublicStaff {
    fn from(value: StaffUser) -> Self {
        Self {
            username: value.username,
            job: value.job,
            role: value.role,
            created_at: value.created_at,
        }
    }
}

async fn index() -> Json<Value> {
    Json(json!({ "ok": true, "time": Utc::now() }))
}

async fn health(State(context): State<ServerContext>) -> Json<Value> {
    let db_ok = match context.collab.database().ping().await {
        Ok(reachable) => reachable,
        Err(err) => {
            warn!("Health check could not reach the store: {}", err);
            false
        }
    };

    Json(json!({ "ok": true, "dbOk": db_ok, "time": Utc::now() }))
}

/// Resolves an access key, None when no club uses it
async fn club_of_key(collab: &Collab, access_key: &str) -> ServerResult<Option<String>> {
    Ok(collab
        .database()
        .club_by_access_key(access_key)
        .await
        .optional()?)
}

async fn vip_list(
    State(context): State<ServerContext>,
    Path(access_key): Path<String>,
) -> ServerResult<Json<Vec<VipEntry>>> {
    let Some(club_id) = club_of_key(&context.collab, &access_key).await? else {
        return Ok(Json(vec![]));
    };

    let mut entries = context.collab.database().load_vips(&club_id).await?;
    entries.sort_by(|a, b| a.character_name.cmp(&b.character_name));

    Ok(Json(entries))
}

async fn staff_list(
    State(context): State<ServerContext>,
    Path(access_key): Path<String>,
) -> ServerResult<Json<Vec<PublicStaff>>> {
    let Some(club_id) = club_of_key(&context.collab, &access_key).await? else {
        return Ok(Json(vec![]));
    };

    let mut members = context.collab.database().load_members(&club_id).await?;
    members.sort_by(|a, b| a.username.cmp(&b.username));

    Ok(Json(members.into_iter().map(PublicStaff::from).collect()))
}

async fn dj_list(
    State(context): State<ServerContext>,
    Path(access_key): Path<String>,
) -> ServerResult<Json<Vec<DjEntry>>> {
    let Some(club_id) = club_of_key(&context.collab, &access_key).await? else {
        return Ok(Json(vec![]));
    };

    let mut entries = context.collab.database().load_djs(&club_id).await?;
    entries.sort_by(|a, b| a.dj_name.cmp(&b.dj_name));

    Ok(Json(entries))
}

pub fn router() -> Router<ServerContext> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/:access_key/viplist.json", get(vip_list))
        .route("/:access_key/stafflist.json", get(staff_list))
        .route("/:access_key/djlist.json", get(dj_list))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use venueplus_collab::{HashingConfig, MemoryDatabase, NewClub, NewMembership};

    use super::*;

    async fn context() -> (ServerContext, String) {
        let collab = Collab::new(Arc::new(MemoryDatabase::new()), HashingConfig::default());
        let database = collab.database();

        let club = database
            .create_club(NewClub {
                club_id: "nightclub".to_string(),
                creator: String::new(),
            })
            .await
            .unwrap();

        for username in ["Zed", "Amy"] {
            database
                .add_membership(NewMembership {
                    club_id: "nightclub".to_string(),
                    username: username.to_string(),
                    job: "Greeter".to_string(),
                    role: "power".to_string(),
                })
                .await
                .unwrap();
        }

        let context = ServerContext {
            collab: Arc::new(collab),
        };

        (context, club.access_key.unwrap())
    }

    #[tokio::test]
    async fn test_staff_list_sorted() {
        let (context, key) = context().await;

        let Json(staff) = staff_list(State(context), Path(key)).await.unwrap();
        let names: Vec<_> = staff.iter().map(|s| s.username.as_str()).collect();

        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[tokio::test]
    async fn test_unknown_key_is_empty() {
        let (context, _) = context().await;

        let Json(entries) = vip_list(State(context), Path("nope".to_string()))
            .await
            .unwrap();

        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_health_on_ephemeral_store() {
        let (context, _) = context().await;

        let response = health(State(context)).await;

        assert_eq!(response.0["ok"], true);
        assert_eq!(response.0["dbOk"], false);
        assert_eq!(response.into_response().status(), StatusCode::OK);
    }
}
