use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use log::info;
use uuid::Uuid;

use super::snapshot::{
    scoped_key, split_scoped_key, ClubScoped, Snapshot, SnapshotClub, SnapshotFile,
};
use crate::{
    normalize_rights,
    util::{new_uid, ACCESS_KEY_LENGTH, UID_LENGTH},
    ClubData, Database, DatabaseError, DjEntry, NewClub, NewMembership, NewUser, Result, Rights,
    ShiftEntry, StaffUser, UserData, VipEntry,
};

#[derive(Debug, Clone)]
struct MemberRow {
    club_id: String,
    username: String,
    job: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct JobRow {
    club_id: String,
    name: String,
    rights: Rights,
}

/// Club, character name and home world. Kept apart so no name can alias another
type VipKey = (String, String, String);

fn vip_key(club_id: &str, character_name: &str, home_world: &str) -> VipKey {
    (
        club_id.to_string(),
        character_name.to_string(),
        home_world.to_string(),
    )
}

/// The ephemeral backend. State lives in concurrent maps keyed by `club|name`,
/// and is optionally mirrored to a snapshot document after every mutation.
#[derive(Default)]
pub struct MemoryDatabase {
    users: DashMap<String, UserData>,
    members: DashMap<String, MemberRow>,
    jobs: DashMap<String, JobRow>,
    vips: DashMap<VipKey, ClubScoped<VipEntry>>,
    djs: DashMap<String, ClubScoped<DjEntry>>,
    shifts: DashMap<String, ClubScoped<ShiftEntry>>,
    clubs: DashMap<String, ClubData>,
    snapshot: Option<SnapshotFile>,
}

impl MemoryDatabase {
    /// A purely in-memory store, without a snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store seeded from, and mirrored to, the snapshot at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let file = SnapshotFile::new(path);
        let snapshot = file.load().await;

        let mut database = Self::from_snapshot(snapshot);
        database.snapshot = Some(file);

        info!(
            "Loaded {} clubs and {} accounts from snapshot",
            database.clubs.len(),
            database.users.len()
        );

        database
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        let database = Self::default();

        for user in snapshot.staff_users {
            database.users.insert(user.username.clone(), user);
        }

        for (key, job) in snapshot.club_user_jobs {
            let Some((club_id, username)) = split_scoped_key(&key) else {
                continue;
            };

            let role = snapshot
                .club_user_roles
                .get(&key)
                .cloned()
                .unwrap_or_else(|| crate::DEFAULT_ROLE.to_string());

            let created_at = snapshot
                .club_user_joined_at
                .get(&key)
                .copied()
                .unwrap_or_else(Utc::now);

            database.members.insert(
                key.clone(),
                MemberRow {
                    club_id: club_id.to_string(),
                    username: username.to_string(),
                    job,
                    role,
                    created_at,
                },
            );
        }

        for (key, rights) in snapshot.job_rights {
            let Some((club_id, name)) = split_scoped_key(&key) else {
                continue;
            };

            database.jobs.insert(
                key.clone(),
                JobRow {
                    club_id: club_id.to_string(),
                    name: name.to_string(),
                    rights: normalize_rights(name, rights),
                },
            );
        }

        for vip in snapshot.vip_entries {
            let key = vip_key(&vip.club_id, &vip.value.character_name, &vip.value.home_world);
            database.vips.insert(key, vip);
        }

        for dj in snapshot.dj_entries {
            database
                .djs
                .insert(scoped_key(&dj.club_id, &dj.value.dj_name), dj);
        }

        for shift in snapshot.shift_entries {
            database
                .shifts
                .insert(scoped_key(&shift.club_id, &shift.value.id.to_string()), shift);
        }

        for (club_id, club) in snapshot.clubs {
            database.clubs.insert(
                club_id.clone(),
                ClubData {
                    access_key: snapshot.club_access_keys_by_club.get(&club_id).cloned(),
                    logo: snapshot.club_logos.get(&club_id).cloned(),
                    club_id,
                    creator: club.creator,
                    created_at: club.created_at,
                    join_password_hash: club.join_password_hash,
                },
            );
        }

        database
    }

    fn capture(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            vip_entries: self.vips.iter().map(|v| v.value().clone()).collect(),
            dj_entries: self.djs.iter().map(|d| d.value().clone()).collect(),
            shift_entries: self.shifts.iter().map(|s| s.value().clone()).collect(),
            staff_users: self.users.iter().map(|u| u.value().clone()).collect(),
            ..Default::default()
        };

        for job in self.jobs.iter() {
            snapshot
                .job_rights
                .insert(job.key().clone(), job.rights.clone());
        }

        for member in self.members.iter() {
            let key = member.key().clone();

            snapshot
                .club_user_jobs
                .insert(key.clone(), member.job.clone());
            snapshot
                .club_user_roles
                .insert(key.clone(), member.role.clone());
            snapshot.club_user_joined_at.insert(key, member.created_at);
        }

        for club in self.clubs.iter() {
            snapshot.clubs.insert(
                club.club_id.clone(),
                SnapshotClub {
                    creator: club.creator.clone(),
                    created_at: club.created_at,
                    join_password_hash: club.join_password_hash.clone(),
                },
            );

            if let Some(key) = &club.access_key {
                snapshot
                    .club_access_keys_by_club
                    .insert(club.club_id.clone(), key.clone());
            }

            if let Some(logo) = &club.logo {
                snapshot
                    .club_logos
                    .insert(club.club_id.clone(), logo.clone());
            }
        }

        snapshot
    }

    async fn persist(&self) -> Result<()> {
        if let Some(file) = &self.snapshot {
            file.write_with(|| self.capture())
                .await
                .map_err(|e| DatabaseError::Internal(Box::new(e)))?;
        }

        Ok(())
    }

    fn staff_user(&self, row: &MemberRow) -> StaffUser {
        let uid = self
            .users
            .get(&row.username)
            .map(|u| u.uid.clone())
            .unwrap_or_default();

        StaffUser {
            username: row.username.clone(),
            job: row.job.clone(),
            role: row.role.clone(),
            created_at: Some(row.created_at),
            uid,
        }
    }

    fn unique_access_key(&self) -> String {
        loop {
            let key = new_uid(ACCESS_KEY_LENGTH);

            if !self
                .clubs
                .iter()
                .any(|c| c.access_key.as_deref() == Some(key.as_str()))
            {
                return key;
            }
        }
    }

    fn unique_uid(&self) -> String {
        loop {
            let uid = new_uid(UID_LENGTH);

            if !self.users.iter().any(|u| u.uid == uid) {
                return uid;
            }
        }
    }

    fn club_not_found() -> DatabaseError {
        DatabaseError::NotFound {
            resource: "club",
            identifier: "club_id",
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        self.users
            .get(username)
            .map(|u| u.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            })
    }

    async fn user_by_uid(&self, uid: &str) -> Result<UserData> {
        self.users
            .iter()
            .find(|u| u.uid == uid)
            .map(|u| u.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "uid",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let uid = self.unique_uid();

        let user = match self.users.entry(new_user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(DatabaseError::Conflict {
                    resource: "user",
                    field: "username",
                    value: new_user.username,
                })
            }
            Entry::Vacant(entry) => {
                let user = UserData {
                    uid,
                    username: new_user.username,
                    password_hash: new_user.password_hash,
                    created_at: Utc::now(),
                };

                entry.insert(user.clone());
                user
            }
        };

        self.persist().await?;
        Ok(user)
    }

    async fn update_user_password(&self, username: &str, password_hash: &str) -> Result<()> {
        {
            let mut user = self.users.get_mut(username).ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            })?;

            user.password_hash = password_hash.to_string();
        }

        self.persist().await?;
        Ok(())
    }

    async fn load_members(&self, club_id: &str) -> Result<Vec<StaffUser>> {
        let rows: Vec<_> = self
            .members
            .iter()
            .filter(|m| m.club_id == club_id)
            .map(|m| m.value().clone())
            .collect();

        let mut members: Vec<_> = rows.iter().map(|r| self.staff_user(r)).collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(members)
    }

    async fn member(&self, club_id: &str, username: &str) -> Result<StaffUser> {
        let row = self
            .members
            .get(&scoped_key(club_id, username))
            .map(|m| m.value().clone())
            .ok_or(DatabaseError::NotFound {
                resource: "membership",
                identifier: "username",
            })?;

        Ok(self.staff_user(&row))
    }

    async fn add_membership(&self, new_membership: NewMembership) -> Result<StaffUser> {
        let key = scoped_key(&new_membership.club_id, &new_membership.username);

        let row = match self.members.entry(key) {
            Entry::Occupied(_) => {
                return Err(DatabaseError::Conflict {
                    resource: "membership",
                    field: "username",
                    value: new_membership.username,
                })
            }
            Entry::Vacant(entry) => {
                let row = MemberRow {
                    club_id: new_membership.club_id,
                    username: new_membership.username,
                    job: new_membership.job,
                    role: new_membership.role,
                    created_at: Utc::now(),
                };

                entry.insert(row.clone());
                row
            }
        };

        self.persist().await?;
        Ok(self.staff_user(&row))
    }

    async fn update_membership(
        &self,
        club_id: &str,
        username: &str,
        job: Option<&str>,
        role: Option<&str>,
    ) -> Result<StaffUser> {
        let row = {
            let mut row = self
                .members
                .get_mut(&scoped_key(club_id, username))
                .ok_or(DatabaseError::NotFound {
                    resource: "membership",
                    identifier: "username",
                })?;

            if let Some(job) = job.filter(|j| !j.trim().is_empty()) {
                row.job = job.to_string();
            }

            if let Some(role) = role.filter(|r| !r.trim().is_empty()) {
                row.role = role.to_string();
            }

            row.clone()
        };

        self.persist().await?;
        Ok(self.staff_user(&row))
    }

    async fn remove_membership(&self, club_id: &str, username: &str) -> Result<()> {
        self.members.remove(&scoped_key(club_id, username));
        self.persist().await?;

        Ok(())
    }

    async fn clubs_of_user(&self, username: &str) -> Result<Vec<String>> {
        let mut clubs: Vec<_> = self
            .members
            .iter()
            .filter(|m| m.username == username)
            .map(|m| m.club_id.clone())
            .collect();

        clubs.sort();
        clubs.dedup();

        Ok(clubs)
    }

    async fn load_job_rights(&self, club_id: &str) -> Result<BTreeMap<String, Rights>> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| j.club_id == club_id)
            .map(|j| (j.name.clone(), normalize_rights(&j.name, j.rights.clone())))
            .collect())
    }

    async fn set_job_rights(&self, club_id: &str, name: &str, rights: Rights) -> Result<Rights> {
        let rights = normalize_rights(name, rights);

        self.jobs.insert(
            scoped_key(club_id, name),
            JobRow {
                club_id: club_id.to_string(),
                name: name.to_string(),
                rights: rights.clone(),
            },
        );

        self.persist().await?;
        Ok(rights)
    }

    async fn add_job(&self, club_id: &str, name: &str) -> Result<()> {
        let inserted = match self.jobs.entry(scoped_key(club_id, name)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(JobRow {
                    club_id: club_id.to_string(),
                    name: name.to_string(),
                    rights: normalize_rights(name, Rights::default()),
                });
                true
            }
        };

        if inserted {
            self.persist().await?;
        }

        Ok(())
    }

    async fn delete_job(&self, club_id: &str, name: &str) -> Result<()> {
        self.jobs.remove(&scoped_key(club_id, name));
        self.persist().await?;

        Ok(())
    }

    async fn load_vips(&self, club_id: &str) -> Result<Vec<VipEntry>> {
        let mut vips: Vec<_> = self
            .vips
            .iter()
            .filter(|v| v.club_id == club_id)
            .map(|v| v.value.clone())
            .collect();

        vips.sort_by(|a, b| a.character_name.cmp(&b.character_name));
        Ok(vips)
    }

    async fn vip_exists(
        &self,
        club_id: &str,
        character_name: &str,
        home_world: &str,
    ) -> Result<bool> {
        Ok(self
            .vips
            .contains_key(&vip_key(club_id, character_name, home_world)))
    }

    async fn upsert_vip(&self, club_id: &str, entry: VipEntry) -> Result<()> {
        self.vips.insert(
            vip_key(club_id, &entry.character_name, &entry.home_world),
            ClubScoped {
                club_id: club_id.to_string(),
                value: entry,
            },
        );

        self.persist().await?;
        Ok(())
    }

    async fn remove_vip(
        &self,
        club_id: &str,
        character_name: &str,
        home_world: &str,
    ) -> Result<()> {
        self.vips
            .remove(&vip_key(club_id, character_name, home_world));
        self.persist().await?;

        Ok(())
    }

    async fn load_djs(&self, club_id: &str) -> Result<Vec<DjEntry>> {
        let mut djs: Vec<_> = self
            .djs
            .iter()
            .filter(|d| d.club_id == club_id)
            .map(|d| d.value.clone())
            .collect();

        djs.sort_by(|a, b| a.dj_name.cmp(&b.dj_name));
        Ok(djs)
    }

    async fn upsert_dj(&self, club_id: &str, entry: DjEntry) -> Result<()> {
        self.djs.insert(
            scoped_key(club_id, &entry.dj_name),
            ClubScoped {
                club_id: club_id.to_string(),
                value: entry,
            },
        );

        self.persist().await?;
        Ok(())
    }

    async fn remove_dj(&self, club_id: &str, dj_name: &str) -> Result<()> {
        self.djs.remove(&scoped_key(club_id, dj_name));
        self.persist().await?;

        Ok(())
    }

    async fn load_shifts(&self, club_id: &str) -> Result<Vec<ShiftEntry>> {
        let mut shifts: Vec<_> = self
            .shifts
            .iter()
            .filter(|s| s.club_id == club_id)
            .map(|s| s.value.clone())
            .collect();

        shifts.sort_by(|a, b| a.start_at.cmp(&b.start_at));
        Ok(shifts)
    }

    async fn upsert_shift(&self, club_id: &str, entry: ShiftEntry) -> Result<()> {
        self.shifts.insert(
            scoped_key(club_id, &entry.id.to_string()),
            ClubScoped {
                club_id: club_id.to_string(),
                value: entry,
            },
        );

        self.persist().await?;
        Ok(())
    }

    async fn remove_shift(&self, club_id: &str, id: Uuid) -> Result<()> {
        self.shifts.remove(&scoped_key(club_id, &id.to_string()));
        self.persist().await?;

        Ok(())
    }

    async fn club(&self, club_id: &str) -> Result<ClubData> {
        self.clubs
            .get(club_id)
            .map(|c| c.clone())
            .ok_or_else(Self::club_not_found)
    }

    async fn create_club(&self, new_club: NewClub) -> Result<ClubData> {
        let access_key = self.unique_access_key();

        let club = match self.clubs.entry(new_club.club_id.clone()) {
            Entry::Occupied(_) => {
                return Err(DatabaseError::Conflict {
                    resource: "club",
                    field: "club_id",
                    value: new_club.club_id,
                })
            }
            Entry::Vacant(entry) => {
                let club = ClubData {
                    club_id: new_club.club_id,
                    creator: new_club.creator,
                    created_at: Utc::now(),
                    access_key: Some(access_key),
                    join_password_hash: None,
                    logo: None,
                };

                entry.insert(club.clone());
                club
            }
        };

        self.persist().await?;
        Ok(club)
    }

    async fn delete_club(&self, club_id: &str) -> Result<()> {
        self.clubs.remove(club_id);
        self.members.retain(|_, m| m.club_id != club_id);
        self.jobs.retain(|_, j| j.club_id != club_id);
        self.vips.retain(|_, v| v.club_id != club_id);
        self.djs.retain(|_, d| d.club_id != club_id);
        self.shifts.retain(|_, s| s.club_id != club_id);

        self.persist().await?;
        Ok(())
    }

    async fn clubs_created_by(&self, username: &str) -> Result<Vec<String>> {
        let mut clubs: Vec<_> = self
            .clubs
            .iter()
            .filter(|c| c.is_creator(username))
            .map(|c| c.club_id.clone())
            .collect();

        clubs.sort();
        Ok(clubs)
    }

    async fn access_key(&self, club_id: &str) -> Result<String> {
        let existing = self
            .clubs
            .get(club_id)
            .ok_or_else(Self::club_not_found)?
            .access_key
            .clone();

        match existing {
            Some(key) => Ok(key),
            None => self.rotate_access_key(club_id).await,
        }
    }

    async fn rotate_access_key(&self, club_id: &str) -> Result<String> {
        let key = self.unique_access_key();

        self.clubs
            .get_mut(club_id)
            .ok_or_else(Self::club_not_found)?
            .access_key = Some(key.clone());

        self.persist().await?;
        Ok(key)
    }

    async fn club_by_access_key(&self, access_key: &str) -> Result<String> {
        self.clubs
            .iter()
            .find(|c| !access_key.is_empty() && c.access_key.as_deref() == Some(access_key))
            .map(|c| c.club_id.clone())
            .ok_or_else(Self::club_not_found)
    }

    async fn set_logo(&self, club_id: &str, logo: Option<String>) -> Result<()> {
        self.clubs
            .get_mut(club_id)
            .ok_or_else(Self::club_not_found)?
            .logo = logo;

        self.persist().await?;
        Ok(())
    }

    async fn set_join_password_hash(&self, club_id: &str, hash: Option<String>) -> Result<()> {
        self.clubs
            .get_mut(club_id)
            .ok_or_else(Self::club_not_found)?
            .join_password_hash = hash;

        self.persist().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{OWNER_JOB, UNASSIGNED_JOB};

    fn vip(name: &str, world: &str, duration: i32) -> VipEntry {
        VipEntry {
            character_name: name.to_string(),
            home_world: world.to_string(),
            created_at: Utc::now(),
            expires_at: None,
            duration,
        }
    }

    async fn with_club(database: &MemoryDatabase, club_id: &str, creator: &str) {
        database
            .create_club(NewClub {
                club_id: club_id.to_string(),
                creator: creator.to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vip_upsert_is_idempotent() {
        let database = MemoryDatabase::new();

        database.upsert_vip("a", vip("Alice", "Balmung", 1)).await.unwrap();
        database.upsert_vip("a", vip("Alice", "Balmung", 7)).await.unwrap();
        database.upsert_vip("b", vip("Alice", "Balmung", 3)).await.unwrap();

        let vips = database.load_vips("a").await.unwrap();
        assert_eq!(vips.len(), 1);
        assert_eq!(vips[0].duration, 7);
        assert!(database.vip_exists("b", "Alice", "Balmung").await.unwrap());

        database.remove_vip("a", "Alice", "Balmung").await.unwrap();
        assert!(!database.vip_exists("a", "Alice", "Balmung").await.unwrap());
        assert!(database.vip_exists("b", "Alice", "Balmung").await.unwrap());
    }

    #[tokio::test]
    async fn test_vip_names_with_separator_stay_apart() {
        let database = MemoryDatabase::new();

        database.upsert_vip("a", vip("A@B", "C", 1)).await.unwrap();
        assert!(!database.vip_exists("a", "A", "B@C").await.unwrap());

        database.upsert_vip("a", vip("A", "B@C", 2)).await.unwrap();
        assert_eq!(database.load_vips("a").await.unwrap().len(), 2);

        database.remove_vip("a", "A", "B@C").await.unwrap();
        assert!(database.vip_exists("a", "A@B", "C").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_is_an_error() {
        let path = std::env::temp_dir()
            .join(format!("venueplus-missing-{}", Uuid::new_v4()))
            .join("nested")
            .join("data.json");

        let database = MemoryDatabase::open(&path).await;
        let result = database.upsert_vip("a", vip("Alice", "Balmung", 1)).await;

        assert!(matches!(result, Err(DatabaseError::Internal(_))));
    }

    #[tokio::test]
    async fn test_owner_profile_cannot_be_weakened() {
        let database = MemoryDatabase::new();
        database.ensure_default_jobs("a").await.unwrap();

        let stored = database
            .set_job_rights("a", OWNER_JOB, Rights::default())
            .await
            .unwrap();
        assert!(stored.manage_jobs);

        let profiles = database.load_job_rights("a").await.unwrap();
        assert_eq!(profiles[OWNER_JOB].rank, 9);
        assert!(profiles[OWNER_JOB].edit_shift_plan);
        assert_eq!(profiles[UNASSIGNED_JOB].rank, 0);
        assert_eq!(database.job_names("a").await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_membership_conflicts_and_updates() {
        let database = MemoryDatabase::new();
        let new_membership = || NewMembership {
            club_id: "a".to_string(),
            username: "Amy".to_string(),
            job: UNASSIGNED_JOB.to_string(),
            role: "power".to_string(),
        };

        database.add_membership(new_membership()).await.unwrap();
        let duplicate = database.add_membership(new_membership()).await;
        assert!(matches!(duplicate, Err(e) if e.is_conflict()));

        let updated = database
            .update_membership("a", "Amy", Some("Greeter"), None)
            .await
            .unwrap();
        assert_eq!(updated.job, "Greeter");
        assert_eq!(updated.role, "power");

        let missing = database.update_membership("a", "Bob", Some("Greeter"), None).await;
        assert!(matches!(missing, Err(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_club_delete_cascades() {
        let database = MemoryDatabase::new();
        with_club(&database, "a", "Amy").await;
        with_club(&database, "b", "Amy").await;

        database.ensure_default_jobs("a").await.unwrap();
        database.upsert_vip("a", vip("Alice", "Balmung", 1)).await.unwrap();
        database.upsert_vip("b", vip("Alice", "Balmung", 1)).await.unwrap();
        database
            .add_membership(NewMembership {
                club_id: "a".to_string(),
                username: "Amy".to_string(),
                job: OWNER_JOB.to_string(),
                role: "power".to_string(),
            })
            .await
            .unwrap();

        database.delete_club("a").await.unwrap();

        assert!(database.club("a").await.is_err());
        assert!(database.load_vips("a").await.unwrap().is_empty());
        assert!(database.load_job_rights("a").await.unwrap().is_empty());
        assert!(database.clubs_of_user("Amy").await.unwrap().is_empty());
        assert_eq!(database.load_vips("b").await.unwrap().len(), 1);
        assert_eq!(database.clubs_created_by("Amy").await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_access_key_rotation() {
        let database = MemoryDatabase::new();
        with_club(&database, "a", "Amy").await;

        let first = database.access_key("a").await.unwrap();
        assert_eq!(first.len(), 24);
        assert_eq!(database.club_by_access_key(&first).await.unwrap(), "a");

        let second = database.rotate_access_key("a").await.unwrap();
        assert_ne!(first, second);
        assert!(database.club_by_access_key(&first).await.is_err());
        assert!(database.access_key("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let path = std::env::temp_dir().join(format!("venueplus-{}.json", Uuid::new_v4()));

        {
            let database = MemoryDatabase::open(&path).await;
            with_club(&database, "a", "Amy").await;
            database
                .create_user(NewUser {
                    username: "Amy".to_string(),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap();
            database
                .add_membership(NewMembership {
                    club_id: "a".to_string(),
                    username: "Amy".to_string(),
                    job: OWNER_JOB.to_string(),
                    role: "power".to_string(),
                })
                .await
                .unwrap();
            database.upsert_vip("a", vip("Alice", "Balmung", 2)).await.unwrap();
            database.set_logo("a", Some("logo".to_string())).await.unwrap();
        }

        let reopened = MemoryDatabase::open(&path).await;

        let club = reopened.club("a").await.unwrap();
        assert_eq!(club.creator, "Amy");
        assert_eq!(club.logo.as_deref(), Some("logo"));
        assert_eq!(reopened.load_vips("a").await.unwrap()[0].duration, 2);

        let member = reopened.member("a", "Amy").await.unwrap();
        assert_eq!(member.job, OWNER_JOB);
        assert_eq!(member.uid.len(), 15);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
