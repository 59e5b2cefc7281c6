use log::debug;
use std::collections::HashSet;

use crate::interactions::module::{DataRequestVerdict, InteractionModule};
use crate::interactions::packets::Packet;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::WorldObject;

/// Collectible inspirations, keyed by definition id.
///
/// Collected inspirations stay with the player across levels, so a collected
/// one is never spawned again and cannot be requested.
pub struct InspirationCollectionModule {
    archetypes: HashSet<i32>,
}

impl InspirationCollectionModule {
    pub fn new(archetypes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            archetypes: archetypes.into_iter().collect(),
        }
    }

    fn is_inspiration(&self, object: &WorldObject) -> bool {
        self.archetypes.contains(&object.kind())
    }

    fn collected(session: &PlayerSession, object: &WorldObject) -> bool {
        session.inspirations.contains(&object.primary_info.def_id)
    }
}

impl InteractionModule for InspirationCollectionModule {
    fn name(&self) -> &'static str {
        "inspiration"
    }

    fn initialize_world_object(
        &self,
        session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
    ) -> bool {
        if self.is_inspiration(object) && Self::collected(session, object) {
            debug!("Not spawning collected inspiration {}", id);
            return true;
        }
        false
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, object: &WorldObject) -> bool {
        self.is_inspiration(object)
    }

    fn should_destroy_resource(
        &self,
        session: &mut PlayerSession,
        _id: &str,
        object: &WorldObject,
        _state: i32,
        destroy_on_completion: bool,
    ) -> bool {
        if Self::collected(session, object) {
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
        let def_id = object.primary_info.def_id;
        if !session.inspirations.insert(def_id) {
            debug!("{} already has inspiration {} ({})", session.account_id, def_id, id);
            return false;
        }
        session.send(Packet::InspirationUnlocked { def_id });
        true
    }

    fn is_data_request_valid(
        &self,
        session: &PlayerSession,
        _id: &str,
        object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        if !self.is_inspiration(object) {
            DataRequestVerdict::NotApplicable
        } else if Self::collected(session, object) {
            DataRequestVerdict::Deny
        } else {
            DataRequestVerdict::Accept
        }
    }
}
