use log::debug;
use std::sync::Arc;

use crate::interactions::module::{DataRequestVerdict, InteractionModule};
use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::WorldObject;

/// Keeps members of unselected group objects out of the player's world.
pub struct GroupObjectModule {
    registry: Arc<WorldObjectRegistry>,
}

impl GroupObjectModule {
    pub fn new(registry: Arc<WorldObjectRegistry>) -> Self {
        Self { registry }
    }

    /// Group id of `object_id` when that group is not visible to the player.
    fn hidden_group(&self, session: &PlayerSession, object_id: &str) -> Option<&str> {
        let group = self.registry.group_of(object_id)?;
        if session.is_group_visible(&group.id) {
            None
        } else {
            Some(group.id.as_str())
        }
    }
}

impl InteractionModule for GroupObjectModule {
    fn name(&self) -> &'static str {
        "group-object"
    }

    fn initialize_world_object(
        &self,
        session: &mut PlayerSession,
        id: &str,
        _object: &WorldObject,
    ) -> bool {
        match self.hidden_group(session, id) {
            Some(group) => {
                debug!("Not spawning {}: group {} not selected", id, group);
                true
            }
            None => false,
        }
    }

    fn is_data_request_valid(
        &self,
        session: &PlayerSession,
        id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        if self.hidden_group(session, id).is_some() {
            DataRequestVerdict::Deny
        } else {
            DataRequestVerdict::NotApplicable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::sink::RecordingSink;
    use crate::interactions::types::{GroupObject, GroupObjectDefinition};
    use crate::interactions::world_data::WorldData;

    fn module() -> GroupObjectModule {
        let data = WorldData::new()
            .with_collection("c", 1, vec![WorldObject::new("crate", 3, 10)])
            .with_group_object(1, GroupObjectDefinition::new("g1", 4).with_member("crate"));
        GroupObjectModule::new(Arc::new(WorldObjectRegistry::from_data(data)))
    }

    #[test]
    fn members_of_hidden_groups_are_claimed_and_denied() {
        let module = module();
        let object = WorldObject::new("crate", 3, 10);
        let mut session = PlayerSession::new("t", Box::new(RecordingSink::new()));

        assert!(module.initialize_world_object(&mut session, "crate", &object));
        assert_eq!(
            module.is_data_request_valid(&session, "crate", &object, 0),
            DataRequestVerdict::Deny
        );

        session.group_objects.push(GroupObject {
            id: "g1".into(),
            kind: 4,
        });
        assert!(!module.initialize_world_object(&mut session, "crate", &object));
        assert_eq!(
            module.is_data_request_valid(&session, "crate", &object, 0),
            DataRequestVerdict::NotApplicable
        );
    }

    #[test]
    fn ungrouped_objects_are_ignored() {
        let module = module();
        let object = WorldObject::new("lamp", 3, 11);
        let mut session = PlayerSession::new("t", Box::new(RecordingSink::new()));
        assert!(!module.initialize_world_object(&mut session, "lamp", &object));
    }
}
