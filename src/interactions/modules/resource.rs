use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::interactions::loot::RewardCollaborator;
use crate::interactions::module::{DataRequestVerdict, InteractionModule};
use crate::interactions::session::PlayerSession;
use crate::interactions::types::WorldObject;

/// Harvestable resource nodes.
///
/// A node is harvested once per level visit: the first successful interaction
/// rolls the loot table named after the object's definition id, and the node
/// stays gone until the player leaves the level.
pub struct ResourceModule {
    archetypes: HashSet<i32>,
    rewards: Arc<dyn RewardCollaborator>,
}

impl ResourceModule {
    pub fn new(
        archetypes: impl IntoIterator<Item = i32>,
        rewards: Arc<dyn RewardCollaborator>,
    ) -> Self {
        Self {
            archetypes: archetypes.into_iter().collect(),
            rewards,
        }
    }

    fn is_resource(&self, object: &WorldObject) -> bool {
        self.archetypes.contains(&object.kind())
    }
}

impl InteractionModule for ResourceModule {
    fn name(&self) -> &'static str {
        "resource"
    }

    fn initialize_world_object(
        &self,
        session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
    ) -> bool {
        if self.is_resource(object) && session.harvested.contains(id) {
            debug!("Not spawning harvested resource {}", id);
            return true;
        }
        false
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, object: &WorldObject) -> bool {
        self.is_resource(object)
    }

    fn should_destroy_resource(
        &self,
        session: &mut PlayerSession,
        id: &str,
        _object: &WorldObject,
        _state: i32,
        destroy_on_completion: bool,
    ) -> bool {
        if session.harvested.contains(id) {
            return destroy_on_completion;
        }
        true
    }

    fn handle_interaction_success(
        &self,
        session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
        _state: i32,
    ) -> bool {
        if session.harvested.contains(id) {
            debug!("{} tried to harvest {} twice", session.account_id, id);
            return false;
        }
        let table = object.primary_info.def_id.to_string();
        if let Err(e) =
            self.rewards
                .give_loot_reward(session, &table, object.kind(), object.primary_info.def_id)
        {
            warn!("Loot for resource {} failed: {}", id, e);
        }
        session.harvested.insert(id.to_string());
        true
    }

    fn is_data_request_valid(
        &self,
        session: &PlayerSession,
        id: &str,
        object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        if !self.is_resource(object) {
            DataRequestVerdict::NotApplicable
        } else if session.harvested.contains(id) {
            DataRequestVerdict::Deny
        } else {
            DataRequestVerdict::Accept
        }
    }
}
