use log::{debug, trace};
use std::sync::Arc;

use crate::interactions::module::{DataRequestVerdict, InteractionModule};
use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::WorldObject;

/// Quest objects: anything with an authored state table.
pub struct QuestModule {
    registry: Arc<WorldObjectRegistry>,
}

impl QuestModule {
    pub fn new(registry: Arc<WorldObjectRegistry>) -> Self {
        Self { registry }
    }
}

impl InteractionModule for QuestModule {
    fn name(&self) -> &'static str {
        "quest"
    }

    /// Start every stateful, non-counter object at its first authored state
    /// unless the player already has progress for it.
    fn prepare_world(&self, level_id: i32, ids: &[String], session: &mut PlayerSession) {
        let mut seeded = 0;
        for id in ids {
            if session.numeric_state.contains_key(id) {
                continue;
            }
            let Ok(object) = self.registry.resolve(id) else {
                continue;
            };
            if object.is_counter() {
                continue;
            }
            if let Some(first) = object.states.keys().next() {
                session.set_state(id, *first);
                seeded += 1;
            }
        }
        debug!(
            "Seeded quest progress for {} objects in level {}",
            seeded, level_id
        );
    }

    fn can_handle(&self, session: &PlayerSession, id: &str, object: &WorldObject) -> bool {
        !object.states.is_empty() && session.interactions.contains(id)
    }

    fn handle_interaction_success(
        &self,
        _session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
        state: i32,
    ) -> bool {
        trace!("Quest interaction {} state {}", id, state);
        object.has_state(state)
    }

    fn is_data_request_valid(
        &self,
        session: &PlayerSession,
        id: &str,
        object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        if !object.states.is_empty() && session.interactions.contains(id) {
            DataRequestVerdict::Accept
        } else {
            DataRequestVerdict::NotApplicable
        }
    }
}
