//! Spawn behaviours decide which group objects a player sees in a level.

use log::{debug, warn};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::{GroupObject, GroupObjectDefinition};

/// Reserved identifier of the behaviour every module registry carries.
pub const FALLBACK_SPAWN_BEHAVIOUR: &str = "fallback";
pub const RANDOMIZED_SPAWN_BEHAVIOUR: &str = "random";

pub trait SpawnBehaviourProvider: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn provide_group_objects(
        &self,
        level_id: i32,
        session: &mut PlayerSession,
        registry: &WorldObjectRegistry,
    ) -> Vec<GroupObject>;
}

fn level_groups<'a>(
    level_id: i32,
    registry: &'a WorldObjectRegistry,
) -> &'a [GroupObjectDefinition] {
    match registry.group_objects_for_level(level_id) {
        Ok(groups) => groups,
        Err(e) => {
            warn!("Group objects for level {} unavailable: {}", level_id, e);
            &[]
        }
    }
}

/// Every group object authored for the level.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackSpawnBehaviour;

impl SpawnBehaviourProvider for FallbackSpawnBehaviour {
    fn identifier(&self) -> &'static str {
        FALLBACK_SPAWN_BEHAVIOUR
    }

    fn provide_group_objects(
        &self,
        level_id: i32,
        _session: &mut PlayerSession,
        registry: &WorldObjectRegistry,
    ) -> Vec<GroupObject> {
        level_groups(level_id, registry)
            .iter()
            .map(GroupObjectDefinition::to_group_object)
            .collect()
    }
}

/// One group object per archetype, chosen with the session RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomizedSpawnBehaviour;

impl SpawnBehaviourProvider for RandomizedSpawnBehaviour {
    fn identifier(&self) -> &'static str {
        RANDOMIZED_SPAWN_BEHAVIOUR
    }

    fn provide_group_objects(
        &self,
        level_id: i32,
        session: &mut PlayerSession,
        registry: &WorldObjectRegistry,
    ) -> Vec<GroupObject> {
        let mut by_kind: BTreeMap<i32, Vec<&GroupObjectDefinition>> = BTreeMap::new();
        for group in level_groups(level_id, registry) {
            by_kind.entry(group.kind).or_default().push(group);
        }

        let mut selected = Vec::with_capacity(by_kind.len());
        for (kind, candidates) in by_kind {
            if let Some(group) = candidates.choose(session.rng()) {
                debug!(
                    "Selected group {} (type {}) for {}",
                    group.id, kind, session.account_id
                );
                selected.push(group.to_group_object());
            }
        }
        selected
    }
}
