use super::{non_blank, Dispatcher, HandlerResult};
use crate::{
    normalize_twitch_link, Capability, DjChange, Failure, Grant, Op, ServerMessage, ShiftAdd,
    ShiftRemove, VipChange,
};

impl Dispatcher {
    pub(super) async fn add_vip(&self, request: VipChange) -> HandlerResult {
        const REQUEST: &str = "vip.add";

        let club_id = self.club();

        let Some(entry) = request.entry.filter(|_| non_blank(&request.token).is_some()) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        if non_blank(&entry.character_name).is_none() || non_blank(&entry.home_world).is_none() {
            return Err(self.reject(REQUEST, "incomplete entry", Failure::default()));
        }

        let database = &self.context.database;

        // Re-adding a known VIP only changes its duration
        let capability = if database
            .vip_exists(&club_id, &entry.character_name, &entry.home_world)
            .await?
        {
            Capability::EditVipDuration
        } else {
            Capability::AddVip
        };

        let grant = Grant::resolve(database.as_ref(), &club_id, &actor).await?;

        if !grant.can(capability) {
            let reason = format!("lacks {} for {}", capability.name(), entry.key());
            return Err(self.deny(REQUEST, &club_id, &actor, &reason, Failure::default()));
        }

        database.upsert_vip(&club_id, entry.clone()).await?;

        self.broadcast(&club_id, ServerMessage::VipUpdate { op: Op::Add, entry });
        self.reply(ServerMessage::VipUpdateOk);

        Ok(())
    }

    pub(super) async fn remove_vip(&self, request: VipChange) -> HandlerResult {
        const REQUEST: &str = "vip.remove";

        let club_id = self.club();

        let Some(entry) = request.entry.filter(|_| non_blank(&request.token).is_some()) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require(REQUEST, &club_id, &actor, Capability::RemoveVip, Failure::default())
            .await?;

        self.context
            .database
            .remove_vip(&club_id, &entry.character_name, &entry.home_world)
            .await?;

        self.broadcast(&club_id, ServerMessage::VipUpdate { op: Op::Remove, entry });
        self.reply(ServerMessage::VipUpdateOk);

        Ok(())
    }

    pub(super) async fn add_dj(&self, request: DjChange) -> HandlerResult {
        const REQUEST: &str = "dj.add";

        let club_id = self.club();

        let Some(mut entry) = request.entry.filter(|_| non_blank(&request.token).is_some()) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        if non_blank(&entry.dj_name).is_none() {
            return Err(self.reject(REQUEST, "missing dj name", Failure::default()));
        }

        self.require(REQUEST, &club_id, &actor, Capability::AddDj, Failure::default())
            .await?;

        entry.twitch_link = normalize_twitch_link(&entry.twitch_link);
        self.context.database.upsert_dj(&club_id, entry.clone()).await?;

        self.broadcast(&club_id, ServerMessage::DjUpdate { op: Op::Add, entry });
        self.reply(ServerMessage::DjUpdateOk);

        Ok(())
    }

    pub(super) async fn remove_dj(&self, request: DjChange) -> HandlerResult {
        const REQUEST: &str = "dj.remove";

        let club_id = self.club();

        let Some(entry) = request.entry.filter(|_| non_blank(&request.token).is_some()) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        if non_blank(&entry.dj_name).is_none() {
            return Err(self.reject(REQUEST, "missing dj name", Failure::default()));
        }

        self.require(REQUEST, &club_id, &actor, Capability::RemoveDj, Failure::default())
            .await?;

        self.context.database.remove_dj(&club_id, &entry.dj_name).await?;

        self.broadcast(&club_id, ServerMessage::DjUpdate { op: Op::Remove, entry });
        self.reply(ServerMessage::DjUpdateOk);

        Ok(())
    }

    pub(super) async fn shift_list(&self) -> HandlerResult {
        let entries = self.context.database.load_shifts(&self.club()).await?;

        self.reply(ServerMessage::ShiftSnapshot { entries });
        Ok(())
    }

    pub(super) async fn add_shift(&self, request: ShiftAdd) -> HandlerResult {
        const REQUEST: &str = "shift.add";

        let club_id = self.club();

        let Some(draft) = request.entry.filter(|_| non_blank(&request.token).is_some()) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        let Some(entry) = draft.into_entry() else {
            return Err(self.reject(REQUEST, "shift ends before it starts", Failure::default()));
        };

        self.require(REQUEST, &club_id, &actor, Capability::EditShiftPlan, Failure::default())
            .await?;

        self.context.database.upsert_shift(&club_id, entry.clone()).await?;

        self.broadcast(&club_id, ServerMessage::ShiftUpdate { op: Op::Add, entry });
        self.reply(ServerMessage::ShiftUpdateOk);

        Ok(())
    }

    pub(super) async fn remove_shift(&self, request: ShiftRemove) -> HandlerResult {
        const REQUEST: &str = "shift.remove";

        let club_id = self.club();

        let Some(id) = request.id.filter(|_| non_blank(&request.token).is_some()) else {
            return Err(self.reject(REQUEST, "missing fields", Failure::default()));
        };

        let actor = self.authenticate(REQUEST, &request.token, Failure::default())?;

        self.require(REQUEST, &club_id, &actor, Capability::EditShiftPlan, Failure::default())
            .await?;

        let database = &self.context.database;

        let Some(entry) = database
            .load_shifts(&club_id)
            .await?
            .into_iter()
            .find(|s| s.id == id)
        else {
            return Err(self.reject(REQUEST, "unknown shift", Failure::default()));
        };

        database.remove_shift(&club_id, id).await?;

        self.broadcast(&club_id, ServerMessage::ShiftUpdate { op: Op::Remove, entry });
        self.reply(ServerMessage::ShiftUpdateOk);

        Ok(())
    }
}
