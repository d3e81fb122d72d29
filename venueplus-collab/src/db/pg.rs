use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, FromRow, PgPool,
};
use uuid::Uuid;

use crate::{
    crypto::{context, FieldCipher},
    normalize_rights,
    util::{new_uid, ACCESS_KEY_LENGTH, UID_LENGTH},
    ClubData, Database, DatabaseError, DatabaseResult, DjEntry, IntoDatabaseError, NewClub,
    NewMembership, NewUser, Result, Rights, ShiftEntry, StaffUser, UserData, VipEntry,
};

const SCHEMA: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS clubs (
        club_id TEXT PRIMARY KEY,
        creator TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        access_key TEXT UNIQUE,
        join_password_hash TEXT,
        logo TEXT
    )",
    "CREATE TABLE IF NOT EXISTS base_users (
        uid TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS staff_users (
        club_id TEXT NOT NULL,
        user_uid TEXT NOT NULL REFERENCES base_users (uid) ON DELETE CASCADE,
        job TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (club_id, user_uid)
    )",
    "CREATE TABLE IF NOT EXISTS job_rights (
        club_id TEXT NOT NULL,
        name TEXT NOT NULL,
        add_vip BOOLEAN NOT NULL,
        remove_vip BOOLEAN NOT NULL,
        manage_users BOOLEAN NOT NULL,
        manage_jobs BOOLEAN NOT NULL,
        edit_vip_duration BOOLEAN NOT NULL,
        add_dj BOOLEAN NOT NULL,
        remove_dj BOOLEAN NOT NULL,
        edit_shift_plan BOOLEAN NOT NULL,
        rank INTEGER NOT NULL,
        color_hex TEXT NOT NULL,
        icon_key TEXT NOT NULL,
        PRIMARY KEY (club_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS vip_entries (
        club_id TEXT NOT NULL,
        character_name TEXT NOT NULL,
        home_world TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ,
        duration INTEGER NOT NULL,
        PRIMARY KEY (club_id, character_name, home_world)
    )",
    "CREATE TABLE IF NOT EXISTS dj_entries (
        club_id TEXT NOT NULL,
        dj_name TEXT NOT NULL,
        twitch_link TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (club_id, dj_name)
    )",
    "CREATE TABLE IF NOT EXISTS shifts (
        id UUID PRIMARY KEY,
        club_id TEXT NOT NULL,
        title TEXT NOT NULL,
        assigned_uid TEXT,
        job TEXT,
        start_at TIMESTAMPTZ NOT NULL,
        end_at TIMESTAMPTZ NOT NULL
    )",
];

#[derive(Debug, FromRow)]
struct UserRow {
    uid: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct MemberRow {
    username: String,
    user_uid: String,
    job: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct JobRightsRow {
    name: String,
    add_vip: bool,
    remove_vip: bool,
    manage_users: bool,
    manage_jobs: bool,
    edit_vip_duration: bool,
    add_dj: bool,
    remove_dj: bool,
    edit_shift_plan: bool,
    rank: i32,
    color_hex: String,
    icon_key: String,
}

#[derive(Debug, FromRow)]
struct VipRow {
    character_name: String,
    home_world: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    duration: i32,
}

#[derive(Debug, FromRow)]
struct DjRow {
    dj_name: String,
    twitch_link: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ShiftRow {
    id: Uuid,
    title: String,
    assigned_uid: Option<String>,
    job: Option<String>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ClubRow {
    club_id: String,
    creator: String,
    created_at: DateTime<Utc>,
    access_key: Option<String>,
    join_password_hash: Option<String>,
    logo: Option<String>,
}

impl From<JobRightsRow> for (String, Rights) {
    fn from(row: JobRightsRow) -> Self {
        let rights = Rights {
            add_vip: row.add_vip,
            remove_vip: row.remove_vip,
            manage_users: row.manage_users,
            manage_jobs: row.manage_jobs,
            edit_vip_duration: row.edit_vip_duration,
            add_dj: row.add_dj,
            remove_dj: row.remove_dj,
            edit_shift_plan: row.edit_shift_plan,
            rank: row.rank,
            color_hex: row.color_hex,
            icon_key: row.icon_key,
        };

        let rights = normalize_rights(&row.name, rights);
        (row.name, rights)
    }
}

impl From<DjRow> for DjEntry {
    fn from(row: DjRow) -> Self {
        Self {
            dj_name: row.dj_name,
            twitch_link: row.twitch_link,
            created_at: row.created_at,
        }
    }
}

impl From<ShiftRow> for ShiftEntry {
    fn from(row: ShiftRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            assigned_uid: row.assigned_uid,
            job: row.job,
            start_at: row.start_at,
            end_at: row.end_at,
        }
    }
}

/// A postgres database implementation for venueplus.
///
/// Personal fields are stored encrypted. Since the cipher is deterministic per context,
/// lookups match on the ciphertext, and on the plaintext for rows written before encryption.
pub struct PgDatabase {
    pool: PgPool,
    cipher: FieldCipher,
}

impl PgDatabase {
    pub async fn new(url: &str, cipher: FieldCipher) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        Ok(Self { pool, cipher })
    }

    /// Creates every table that doesn't exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;
        }

        Ok(())
    }

    fn seal(&self, plaintext: &str, context: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        self.cipher
            .encrypt(plaintext, context)
            .map_err(|e| DatabaseError::Internal(Box::new(e)))
    }

    fn open(&self, value: &str) -> Result<String> {
        self.cipher
            .decrypt(value)
            .map_err(|e| DatabaseError::Internal(Box::new(e)))
    }

    fn user_from_row(&self, row: UserRow) -> Result<UserData> {
        Ok(UserData {
            uid: row.uid,
            username: self.open(&row.username)?,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }

    fn vip_from_row(&self, row: VipRow) -> Result<VipEntry> {
        Ok(VipEntry {
            character_name: self.open(&row.character_name)?,
            home_world: self.open(&row.home_world)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
            duration: row.duration,
        })
    }

    fn club_from_row(&self, row: ClubRow) -> Result<ClubData> {
        Ok(ClubData {
            club_id: row.club_id,
            creator: self.open(&row.creator)?,
            created_at: row.created_at,
            access_key: row.access_key,
            join_password_hash: row.join_password_hash,
            logo: row.logo,
        })
    }

    fn staff_from_row(&self, row: MemberRow) -> Result<StaffUser> {
        Ok(StaffUser {
            username: self.open(&row.username)?,
            job: row.job,
            role: row.role,
            created_at: Some(row.created_at),
            uid: row.user_uid,
        })
    }

    async fn unique_uid(&self) -> Result<String> {
        loop {
            let uid = new_uid(UID_LENGTH);

            let taken = query_scalar::<_, String>("SELECT uid FROM base_users WHERE uid = $1")
                .bind(&uid)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| e.any())?;

            if taken.is_none() {
                return Ok(uid);
            }
        }
    }

    async fn unique_access_key(&self) -> Result<String> {
        loop {
            let key = new_uid(ACCESS_KEY_LENGTH);

            let taken = query_scalar::<_, String>("SELECT club_id FROM clubs WHERE access_key = $1")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| e.any())?;

            if taken.is_none() {
                return Ok(key);
            }
        }
    }

    fn affected_or_not_found(
        &self,
        rows_affected: u64,
        resource: &'static str,
        identifier: &'static str,
    ) -> Result<()> {
        if rows_affected == 0 {
            return Err(DatabaseError::NotFound {
                resource,
                identifier,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        let sealed = self.seal(username, context::USERNAME)?;

        let row = query_as::<_, UserRow>(
            "SELECT uid, username, password_hash, created_at FROM base_users
             WHERE username = $1 OR username = $2
             LIMIT 1",
        )
        .bind(&sealed)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("user", "username"))?;

        self.user_from_row(row)
    }

    async fn user_by_uid(&self, uid: &str) -> Result<UserData> {
        let row = query_as::<_, UserRow>(
            "SELECT uid, username, password_hash, created_at FROM base_users WHERE uid = $1",
        )
        .bind(uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("user", "uid"))?;

        self.user_from_row(row)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        let uid = self.unique_uid().await?;
        let sealed = self.seal(&new_user.username, context::USERNAME)?;

        let row = query_as::<_, UserRow>(
            "INSERT INTO base_users (uid, username, password_hash, created_at)
             VALUES ($1, $2, $3, $4)
             RETURNING uid, username, password_hash, created_at",
        )
        .bind(&uid)
        .bind(&sealed)
        .bind(&new_user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_from_row(row)
    }

    async fn update_user_password(&self, username: &str, password_hash: &str) -> Result<()> {
        let user = self.user_by_username(username).await?;

        query("UPDATE base_users SET password_hash = $1 WHERE uid = $2")
            .bind(password_hash)
            .bind(&user.uid)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn load_members(&self, club_id: &str) -> Result<Vec<StaffUser>> {
        let rows = query_as::<_, MemberRow>(
            "SELECT base_users.username, staff_users.user_uid, staff_users.job,
                    staff_users.role, staff_users.created_at
             FROM staff_users
                INNER JOIN base_users ON staff_users.user_uid = base_users.uid
             WHERE staff_users.club_id = $1",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut members = rows
            .into_iter()
            .map(|r| self.staff_from_row(r))
            .collect::<Result<Vec<_>>>()?;

        members.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(members)
    }

    async fn member(&self, club_id: &str, username: &str) -> Result<StaffUser> {
        let user = self
            .user_by_username(username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => DatabaseError::NotFound {
                    resource: "membership",
                    identifier: "username",
                },
                e => e,
            })?;

        let row = query_as::<_, MemberRow>(
            "SELECT base_users.username, staff_users.user_uid, staff_users.job,
                    staff_users.role, staff_users.created_at
             FROM staff_users
                INNER JOIN base_users ON staff_users.user_uid = base_users.uid
             WHERE staff_users.club_id = $1 AND staff_users.user_uid = $2",
        )
        .bind(club_id)
        .bind(&user.uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("membership", "username"))?;

        self.staff_from_row(row)
    }

    async fn add_membership(&self, new_membership: NewMembership) -> Result<StaffUser> {
        let user = self.user_by_username(&new_membership.username).await?;

        self.member(&new_membership.club_id, &new_membership.username)
            .await
            .conflict_or_ok("membership", "username", &new_membership.username)?;

        query(
            "INSERT INTO staff_users (club_id, user_uid, job, role, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&new_membership.club_id)
        .bind(&user.uid)
        .bind(&new_membership.job)
        .bind(&new_membership.role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.member(&new_membership.club_id, &new_membership.username)
            .await
    }

    async fn update_membership(
        &self,
        club_id: &str,
        username: &str,
        job: Option<&str>,
        role: Option<&str>,
    ) -> Result<StaffUser> {
        let current = self.member(club_id, username).await?;

        let job = job.filter(|j| !j.trim().is_empty());
        let role = role.filter(|r| !r.trim().is_empty());

        query(
            "UPDATE staff_users SET job = COALESCE($3, job), role = COALESCE($4, role)
             WHERE club_id = $1 AND user_uid = $2",
        )
        .bind(club_id)
        .bind(&current.uid)
        .bind(job)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.member(club_id, username).await
    }

    async fn remove_membership(&self, club_id: &str, username: &str) -> Result<()> {
        let Some(user) = self.user_by_username(username).await.optional()? else {
            return Ok(());
        };

        query("DELETE FROM staff_users WHERE club_id = $1 AND user_uid = $2")
            .bind(club_id)
            .bind(&user.uid)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clubs_of_user(&self, username: &str) -> Result<Vec<String>> {
        let Some(user) = self.user_by_username(username).await.optional()? else {
            return Ok(vec![]);
        };

        query_scalar::<_, String>(
            "SELECT club_id FROM staff_users WHERE user_uid = $1 ORDER BY club_id",
        )
        .bind(&user.uid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn load_job_rights(&self, club_id: &str) -> Result<BTreeMap<String, Rights>> {
        let rows = query_as::<_, JobRightsRow>("SELECT * FROM job_rights WHERE club_id = $1")
            .bind(club_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_job_rights(&self, club_id: &str, name: &str, rights: Rights) -> Result<Rights> {
        let rights = normalize_rights(name, rights);

        query(
            "INSERT INTO job_rights (club_id, name, add_vip, remove_vip, manage_users, manage_jobs,
                edit_vip_duration, add_dj, remove_dj, edit_shift_plan, rank, color_hex, icon_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (club_id, name) DO UPDATE SET
                add_vip = EXCLUDED.add_vip,
                remove_vip = EXCLUDED.remove_vip,
                manage_users = EXCLUDED.manage_users,
                manage_jobs = EXCLUDED.manage_jobs,
                edit_vip_duration = EXCLUDED.edit_vip_duration,
                add_dj = EXCLUDED.add_dj,
                remove_dj = EXCLUDED.remove_dj,
                edit_shift_plan = EXCLUDED.edit_shift_plan,
                rank = EXCLUDED.rank,
                color_hex = EXCLUDED.color_hex,
                icon_key = EXCLUDED.icon_key",
        )
        .bind(club_id)
        .bind(name)
        .bind(rights.add_vip)
        .bind(rights.remove_vip)
        .bind(rights.manage_users)
        .bind(rights.manage_jobs)
        .bind(rights.edit_vip_duration)
        .bind(rights.add_dj)
        .bind(rights.remove_dj)
        .bind(rights.edit_shift_plan)
        .bind(rights.rank)
        .bind(&rights.color_hex)
        .bind(&rights.icon_key)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rights)
    }

    async fn add_job(&self, club_id: &str, name: &str) -> Result<()> {
        let rights = normalize_rights(name, Rights::default());

        query(
            "INSERT INTO job_rights (club_id, name, add_vip, remove_vip, manage_users, manage_jobs,
                edit_vip_duration, add_dj, remove_dj, edit_shift_plan, rank, color_hex, icon_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (club_id, name) DO NOTHING",
        )
        .bind(club_id)
        .bind(name)
        .bind(rights.add_vip)
        .bind(rights.remove_vip)
        .bind(rights.manage_users)
        .bind(rights.manage_jobs)
        .bind(rights.edit_vip_duration)
        .bind(rights.add_dj)
        .bind(rights.remove_dj)
        .bind(rights.edit_shift_plan)
        .bind(rights.rank)
        .bind(&rights.color_hex)
        .bind(&rights.icon_key)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn delete_job(&self, club_id: &str, name: &str) -> Result<()> {
        query("DELETE FROM job_rights WHERE club_id = $1 AND name = $2")
            .bind(club_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn load_vips(&self, club_id: &str) -> Result<Vec<VipEntry>> {
        let rows = query_as::<_, VipRow>(
            "SELECT character_name, home_world, created_at, expires_at, duration
             FROM vip_entries WHERE club_id = $1",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut vips = rows
            .into_iter()
            .map(|r| self.vip_from_row(r))
            .collect::<Result<Vec<_>>>()?;

        vips.sort_by(|a, b| a.character_name.cmp(&b.character_name));
        Ok(vips)
    }

    async fn vip_exists(
        &self,
        club_id: &str,
        character_name: &str,
        home_world: &str,
    ) -> Result<bool> {
        let found = query_scalar::<_, String>(
            "SELECT club_id FROM vip_entries
             WHERE club_id = $1
                AND (character_name = $2 OR character_name = $3)
                AND (home_world = $4 OR home_world = $5)
             LIMIT 1",
        )
        .bind(club_id)
        .bind(self.seal(character_name, context::VIP_CHARACTER)?)
        .bind(character_name)
        .bind(self.seal(home_world, context::VIP_WORLD)?)
        .bind(home_world)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(found.is_some())
    }

    async fn upsert_vip(&self, club_id: &str, entry: VipEntry) -> Result<()> {
        let character = self.seal(&entry.character_name, context::VIP_CHARACTER)?;
        let world = self.seal(&entry.home_world, context::VIP_WORLD)?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Replaces a row stored before encryption was enabled
        query(
            "DELETE FROM vip_entries
             WHERE club_id = $1 AND character_name = $2 AND home_world = $3",
        )
        .bind(club_id)
        .bind(&entry.character_name)
        .bind(&entry.home_world)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        query(
            "INSERT INTO vip_entries (club_id, character_name, home_world, created_at, expires_at, duration)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (club_id, character_name, home_world) DO UPDATE SET
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                duration = EXCLUDED.duration",
        )
        .bind(club_id)
        .bind(&character)
        .bind(&world)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .bind(entry.duration)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())
    }

    async fn remove_vip(
        &self,
        club_id: &str,
        character_name: &str,
        home_world: &str,
    ) -> Result<()> {
        query(
            "DELETE FROM vip_entries
             WHERE club_id = $1
                AND (character_name = $2 OR character_name = $3)
                AND (home_world = $4 OR home_world = $5)",
        )
        .bind(club_id)
        .bind(self.seal(character_name, context::VIP_CHARACTER)?)
        .bind(character_name)
        .bind(self.seal(home_world, context::VIP_WORLD)?)
        .bind(home_world)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn load_djs(&self, club_id: &str) -> Result<Vec<DjEntry>> {
        query_as::<_, DjRow>(
            "SELECT dj_name, twitch_link, created_at FROM dj_entries
             WHERE club_id = $1 ORDER BY dj_name",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn upsert_dj(&self, club_id: &str, entry: DjEntry) -> Result<()> {
        query(
            "INSERT INTO dj_entries (club_id, dj_name, twitch_link, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (club_id, dj_name) DO UPDATE SET
                twitch_link = EXCLUDED.twitch_link,
                created_at = EXCLUDED.created_at",
        )
        .bind(club_id)
        .bind(&entry.dj_name)
        .bind(&entry.twitch_link)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn remove_dj(&self, club_id: &str, dj_name: &str) -> Result<()> {
        query("DELETE FROM dj_entries WHERE club_id = $1 AND dj_name = $2")
            .bind(club_id)
            .bind(dj_name)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn load_shifts(&self, club_id: &str) -> Result<Vec<ShiftEntry>> {
        query_as::<_, ShiftRow>(
            "SELECT id, title, assigned_uid, job, start_at, end_at FROM shifts
             WHERE club_id = $1 ORDER BY start_at",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn upsert_shift(&self, club_id: &str, entry: ShiftEntry) -> Result<()> {
        query(
            "INSERT INTO shifts (id, club_id, title, assigned_uid, job, start_at, end_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                assigned_uid = EXCLUDED.assigned_uid,
                job = EXCLUDED.job,
                start_at = EXCLUDED.start_at,
                end_at = EXCLUDED.end_at
             WHERE shifts.club_id = EXCLUDED.club_id",
        )
        .bind(entry.id)
        .bind(club_id)
        .bind(&entry.title)
        .bind(&entry.assigned_uid)
        .bind(&entry.job)
        .bind(entry.start_at)
        .bind(entry.end_at)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn remove_shift(&self, club_id: &str, id: Uuid) -> Result<()> {
        query("DELETE FROM shifts WHERE club_id = $1 AND id = $2")
            .bind(club_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn club(&self, club_id: &str) -> Result<ClubData> {
        let row = query_as::<_, ClubRow>("SELECT * FROM clubs WHERE club_id = $1")
            .bind(club_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("club", "club_id"))?;

        self.club_from_row(row)
    }

    async fn create_club(&self, new_club: NewClub) -> Result<ClubData> {
        self.club(&new_club.club_id)
            .await
            .conflict_or_ok("club", "club_id", &new_club.club_id)?;

        let access_key = self.unique_access_key().await?;
        let creator = self.seal(&new_club.creator, context::CLUB_CREATOR)?;

        let row = query_as::<_, ClubRow>(
            "INSERT INTO clubs (club_id, creator, created_at, access_key)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&new_club.club_id)
        .bind(&creator)
        .bind(Utc::now())
        .bind(&access_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.club_from_row(row)
    }

    async fn delete_club(&self, club_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        for table in [
            "staff_users",
            "job_rights",
            "vip_entries",
            "dj_entries",
            "shifts",
            "clubs",
        ] {
            query(&format!("DELETE FROM {} WHERE club_id = $1", table))
                .bind(club_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| e.any())?;
        }

        tx.commit().await.map_err(|e| e.any())
    }

    async fn clubs_created_by(&self, username: &str) -> Result<Vec<String>> {
        if username.is_empty() {
            return Ok(vec![]);
        }

        query_scalar::<_, String>(
            "SELECT club_id FROM clubs WHERE creator = $1 OR creator = $2 ORDER BY club_id",
        )
        .bind(self.seal(username, context::CLUB_CREATOR)?)
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn access_key(&self, club_id: &str) -> Result<String> {
        match self.club(club_id).await?.access_key {
            Some(key) if !key.is_empty() => Ok(key),
            _ => self.rotate_access_key(club_id).await,
        }
    }

    async fn rotate_access_key(&self, club_id: &str) -> Result<String> {
        let key = self.unique_access_key().await?;

        let result = query("UPDATE clubs SET access_key = $1 WHERE club_id = $2")
            .bind(&key)
            .bind(club_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.affected_or_not_found(result.rows_affected(), "club", "club_id")?;

        Ok(key)
    }

    async fn club_by_access_key(&self, access_key: &str) -> Result<String> {
        query_scalar::<_, String>("SELECT club_id FROM clubs WHERE access_key = $1")
            .bind(access_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("club", "access_key"))
    }

    async fn set_logo(&self, club_id: &str, logo: Option<String>) -> Result<()> {
        let result = query("UPDATE clubs SET logo = $1 WHERE club_id = $2")
            .bind(logo)
            .bind(club_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.affected_or_not_found(result.rows_affected(), "club", "club_id")
    }

    async fn set_join_password_hash(&self, club_id: &str, hash: Option<String>) -> Result<()> {
        let result = query("UPDATE clubs SET join_password_hash = $1 WHERE club_id = $2")
            .bind(hash)
            .bind(club_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.affected_or_not_found(result.rows_affected(), "club", "club_id")
    }

    async fn ping(&self) -> Result<bool> {
        Ok(query("SELECT 1").execute(&self.pool).await.is_ok())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
