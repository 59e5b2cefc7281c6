use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::interactions::module::{DataRequestVerdict, InteractionModule};
use crate::interactions::packets::Packet;
use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::{StateCommand, WorldObject};

/// Command code that spends one lockpick: `[group_id]` (optional).
pub const USE_LOCKPICK_COMMAND: i32 = 86;

/// Lockpick items scattered through a level.
///
/// Picks are counted per group object, so the picks found around one set of
/// locks only open those locks. An ungrouped pick counts under its own id.
/// Counts and collected items are forgotten when the player leaves the level.
pub struct LockpickItemModule {
    registry: Arc<WorldObjectRegistry>,
    archetypes: HashSet<i32>,
}

impl LockpickItemModule {
    pub fn new(registry: Arc<WorldObjectRegistry>, archetypes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            registry,
            archetypes: archetypes.into_iter().collect(),
        }
    }

    fn is_lockpick(&self, object: &WorldObject) -> bool {
        self.archetypes.contains(&object.kind())
    }

    fn group_key(&self, object_id: &str) -> String {
        self.registry
            .group_of(object_id)
            .map(|group| group.id.clone())
            .unwrap_or_else(|| object_id.to_string())
    }
}

impl InteractionModule for LockpickItemModule {
    fn name(&self) -> &'static str {
        "lockpick"
    }

    fn initialize_world_object(
        &self,
        session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
    ) -> bool {
        if self.is_lockpick(object) && session.collected_lockpicks.contains(id) {
            debug!("Not spawning collected lockpick {}", id);
            return true;
        }
        false
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, object: &WorldObject) -> bool {
        self.is_lockpick(object)
    }

    fn should_destroy_resource(
        &self,
        session: &mut PlayerSession,
        id: &str,
        _object: &WorldObject,
        _state: i32,
        destroy_on_completion: bool,
    ) -> bool {
        if session.collected_lockpicks.contains(id) {
            return destroy_on_completion;
        }
        true
    }

    fn handle_interaction_success(
        &self,
        session: &mut PlayerSession,
        id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> bool {
        if !session.collected_lockpicks.insert(id.to_string()) {
            debug!("{} picked up lockpick {} twice", session.account_id, id);
            return false;
        }
        let group_id = self.group_key(id);
        let count = session.lockpicks.entry(group_id.clone()).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;
        session.send(Packet::LockpickCount { group_id, count });
        true
    }

    fn is_data_request_valid(
        &self,
        session: &PlayerSession,
        id: &str,
        object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        if !self.is_lockpick(object) {
            DataRequestVerdict::NotApplicable
        } else if session.collected_lockpicks.contains(id) {
            DataRequestVerdict::Deny
        } else {
            DataRequestVerdict::Accept
        }
    }

    fn handle_command(
        &self,
        session: &mut PlayerSession,
        target_id: &str,
        _object: &WorldObject,
        command: &StateCommand,
        _parent: Option<&StateCommand>,
    ) -> bool {
        if command.code != USE_LOCKPICK_COMMAND {
            return false;
        }
        let group_id = match command.params.first().map(|p| p.trim()) {
            Some(group) if !group.is_empty() => group.to_string(),
            _ => self.group_key(target_id),
        };
        match session.lockpicks.get_mut(&group_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                let count = *count;
                session.send(Packet::LockpickCount { group_id, count });
            }
            _ => debug!(
                "{} has no lockpick for {} ({})",
                session.account_id, group_id, target_id
            ),
        }
        true
    }
}
