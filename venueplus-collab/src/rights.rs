use std::collections::BTreeMap;

use crate::{Database, DatabaseResult, Result, Rights, OWNER_JOB, UNASSIGNED_JOB};

/// A single permission flag of a job profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    AddVip,
    RemoveVip,
    ManageUsers,
    ManageJobs,
    EditVipDuration,
    AddDj,
    RemoveDj,
    EditShiftPlan,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::AddVip,
        Capability::RemoveVip,
        Capability::ManageUsers,
        Capability::ManageJobs,
        Capability::EditVipDuration,
        Capability::AddDj,
        Capability::RemoveDj,
        Capability::EditShiftPlan,
    ];

    /// The camelCase name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Capability::AddVip => "addVip",
            Capability::RemoveVip => "removeVip",
            Capability::ManageUsers => "manageUsers",
            Capability::ManageJobs => "manageJobs",
            Capability::EditVipDuration => "editVipDuration",
            Capability::AddDj => "addDj",
            Capability::RemoveDj => "removeDj",
            Capability::EditShiftPlan => "editShiftPlan",
        }
    }
}

impl Rights {
    pub const MIN_RANK: i32 = 0;
    pub const MAX_RANK: i32 = 9;

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::AddVip => self.add_vip,
            Capability::RemoveVip => self.remove_vip,
            Capability::ManageUsers => self.manage_users,
            Capability::ManageJobs => self.manage_jobs,
            Capability::EditVipDuration => self.edit_vip_duration,
            Capability::AddDj => self.add_dj,
            Capability::RemoveDj => self.remove_dj,
            Capability::EditShiftPlan => self.edit_shift_plan,
        }
    }

    /// A camelCase map of every capability flag
    pub fn capability_map(&self) -> BTreeMap<&'static str, bool> {
        Capability::ALL
            .iter()
            .map(|c| (c.name(), self.allows(*c)))
            .collect()
    }

    fn grant_all(&mut self) {
        self.add_vip = true;
        self.remove_vip = true;
        self.manage_users = true;
        self.manage_jobs = true;
        self.edit_vip_duration = true;
        self.add_dj = true;
        self.remove_dj = true;
        self.edit_shift_plan = true;
    }
}

/// Forces the invariants of reserved job names onto a profile.
///
/// Owner gets every capability and the highest rank, Unassigned always ranks 0,
/// and any other job is clamped into 1..=9. Blank styling falls back to defaults.
pub fn normalize_rights(name: &str, mut rights: Rights) -> Rights {
    match name {
        OWNER_JOB => {
            rights.grant_all();
            rights.rank = Rights::MAX_RANK;
        }
        UNASSIGNED_JOB => rights.rank = Rights::MIN_RANK,
        _ => rights.rank = rights.rank.clamp(1, Rights::MAX_RANK),
    }

    if rights.color_hex.trim().is_empty() {
        rights.color_hex = Rights::DEFAULT_COLOR.to_string();
    }

    if rights.icon_key.trim().is_empty() {
        rights.icon_key = Rights::DEFAULT_ICON.to_string();
    }

    rights
}

/// Job names that can never be deleted.
pub fn is_reserved_job(name: &str) -> bool {
    name == OWNER_JOB || name == UNASSIGNED_JOB
}

/// What an actor is allowed to do within a club.
#[derive(Debug, Clone)]
pub struct Grant {
    /// The actor registered the club
    pub is_owner: bool,
    pub job: String,
    pub rights: Rights,
}

impl Grant {
    /// Resolves the grant of an actor from the store.
    /// Unknown clubs, missing memberships and missing profiles all resolve to no rights.
    pub async fn resolve(database: &dyn Database, club_id: &str, username: &str) -> Result<Self> {
        let is_owner = database
            .club(club_id)
            .await
            .optional()?
            .map(|c| c.is_creator(username))
            .unwrap_or(false);

        let job = database
            .member(club_id, username)
            .await
            .optional()?
            .map(|m| m.job)
            .unwrap_or_else(|| UNASSIGNED_JOB.to_string());

        let profiles = database.load_job_rights(club_id).await?;
        let rights = profile_of(&profiles, &job);

        Ok(Self {
            is_owner,
            job,
            rights,
        })
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.is_owner || self.rights.allows(capability)
    }
}

fn profile_of(profiles: &BTreeMap<String, Rights>, job: &str) -> Rights {
    profiles.get(job).cloned().unwrap_or_else(|| Rights {
        rank: 0,
        ..Default::default()
    })
}

/// Checks whether a job assignment would lock the actor out of job administration.
///
/// Only applies when a non-owner assigns a job to themselves.
pub fn may_assign_job(
    grant: &Grant,
    actor: &str,
    target: &str,
    new_job: Option<&str>,
    profiles: &BTreeMap<String, Rights>,
) -> bool {
    let Some(new_job) = new_job.filter(|j| !j.trim().is_empty()) else {
        return true;
    };

    if grant.is_owner || actor != target {
        return true;
    }

    profile_of(profiles, new_job).manage_jobs
}
