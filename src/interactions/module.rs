//! Interaction module chain.
//!
//! Modules are polled in registration order and the first one that claims a
//! hook wins. Every hook defaults to "not mine", so a module only overrides
//! what it cares about.

use log::{debug, warn};
use std::sync::Arc;

use crate::config::ModulesConfig;
use crate::interactions::loot::RewardCollaborator;
use crate::interactions::modules::{
    GroupObjectModule, InspirationCollectionModule, LockpickItemModule, QuestModule,
    ResourceModule, ShopkeeperModule,
};
use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::spawn::{
    FallbackSpawnBehaviour, RandomizedSpawnBehaviour, SpawnBehaviourProvider,
    FALLBACK_SPAWN_BEHAVIOUR,
};
use crate::interactions::types::{StateCommand, WorldObject};
use crate::metrics;

/// Answer of a single module to "may this player request data for this object?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRequestVerdict {
    /// Not this module's object; ask the next one.
    NotApplicable,
    /// Abort the request. Nothing is sent.
    Deny,
    /// Stop asking and proceed.
    Accept,
}

/// Combined result of walking the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Proceed,
    Denied,
}

pub trait InteractionModule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once per level entry, before any object is spawned.
    fn prepare_world(&self, _level_id: i32, _ids: &[String], _session: &mut PlayerSession) {}

    /// Return `true` when this module took care of spawning the object.
    fn initialize_world_object(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
    ) -> bool {
        false
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, _object: &WorldObject) -> bool {
        false
    }

    fn should_destroy_resource(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
        destroy_on_completion: bool,
    ) -> bool {
        destroy_on_completion
    }

    fn handle_interaction_success(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> bool {
        false
    }

    fn is_data_request_valid(
        &self,
        _session: &PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        DataRequestVerdict::NotApplicable
    }

    /// Handle a command code the interpreter does not know. Return `true` to claim it.
    fn handle_command(
        &self,
        _session: &mut PlayerSession,
        _target_id: &str,
        _object: &WorldObject,
        _command: &StateCommand,
        _parent: Option<&StateCommand>,
    ) -> bool {
        false
    }
}

/// Ordered interaction modules plus the registered spawn behaviours.
///
/// Built once at startup and shared behind an `Arc`; there is no removal API.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn InteractionModule>>,
    spawn_behaviours: Vec<Arc<dyn SpawnBehaviourProvider>>,
}

impl ModuleRegistry {
    /// Empty module chain with the fallback spawn behaviour already registered.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            spawn_behaviours: vec![Arc::new(FallbackSpawnBehaviour)],
        }
    }

    /// Built-in modules (group object, resource, inspiration, lockpick,
    /// shopkeeper, quest) and spawn behaviours (fallback, random). Modules
    /// that can deny a request go before the quest module, which accepts.
    pub fn with_defaults(
        registry: Arc<WorldObjectRegistry>,
        rewards: Arc<dyn RewardCollaborator>,
        config: &ModulesConfig,
    ) -> Self {
        let mut modules = Self::new();
        modules.register_module(Arc::new(GroupObjectModule::new(registry.clone())));
        modules.register_module(Arc::new(ResourceModule::new(
            config.resource_archetypes.iter().copied(),
            rewards,
        )));
        modules.register_module(Arc::new(InspirationCollectionModule::new(
            config.inspiration_archetypes.iter().copied(),
        )));
        modules.register_module(Arc::new(LockpickItemModule::new(
            registry.clone(),
            config.lockpick_archetypes.iter().copied(),
        )));
        modules.register_module(Arc::new(ShopkeeperModule::new(
            config.shopkeeper_archetypes.iter().copied(),
        )));
        modules.register_module(Arc::new(QuestModule::new(registry)));
        modules.register_spawn_behaviour(Arc::new(RandomizedSpawnBehaviour));
        modules
    }

    /// Append a module. Registering the same instance twice is a no-op.
    pub fn register_module(&mut self, module: Arc<dyn InteractionModule>) {
        if self.modules.iter().any(|m| Arc::ptr_eq(m, &module)) {
            debug!("Module {} already registered", module.name());
            return;
        }
        self.modules.push(module);
    }

    /// Append a spawn behaviour. Registering the same instance twice is a no-op.
    pub fn register_spawn_behaviour(&mut self, behaviour: Arc<dyn SpawnBehaviourProvider>) {
        if self
            .spawn_behaviours
            .iter()
            .any(|b| Arc::ptr_eq(b, &behaviour))
        {
            debug!(
                "Spawn behaviour {} already registered",
                behaviour.identifier()
            );
            return;
        }
        self.spawn_behaviours.push(behaviour);
    }

    pub fn modules(&self) -> &[Arc<dyn InteractionModule>] {
        &self.modules
    }

    pub fn spawn_behaviours(&self) -> &[Arc<dyn SpawnBehaviourProvider>] {
        &self.spawn_behaviours
    }

    /// Spawn behaviour matching `configured`, or the fallback one with a warning.
    pub fn active_spawn_behaviour(&self, configured: &str) -> Arc<dyn SpawnBehaviourProvider> {
        if let Some(found) = self
            .spawn_behaviours
            .iter()
            .find(|b| b.identifier() == configured)
        {
            return found.clone();
        }
        warn!(
            "Invalid spawn behaviour '{}', using '{}'",
            configured, FALLBACK_SPAWN_BEHAVIOUR
        );
        self.spawn_behaviours
            .iter()
            .find(|b| b.identifier() == FALLBACK_SPAWN_BEHAVIOUR)
            .cloned()
            .unwrap_or_else(|| Arc::new(FallbackSpawnBehaviour))
    }

    /// Walk the validity chain for a data request (or a branch evaluation).
    ///
    /// `label` only names the caller in logs.
    pub fn check_request_validity(
        &self,
        session: &PlayerSession,
        id: &str,
        object: &WorldObject,
        state: i32,
        debug_mode: bool,
        label: &str,
    ) -> GateOutcome {
        let mut checked = false;
        for module in &self.modules {
            match module.is_data_request_valid(session, id, object, state) {
                DataRequestVerdict::NotApplicable => continue,
                DataRequestVerdict::Deny => {
                    debug!("{} for {} denied by {}", label, id, module.name());
                    return GateOutcome::Denied;
                }
                DataRequestVerdict::Accept => {
                    checked = true;
                    break;
                }
            }
        }
        if !checked {
            metrics::inc_unchecked_requests();
            if debug_mode {
                warn!(
                    "{} for {} did not have its validity checked by any interaction module",
                    label, id
                );
            } else {
                debug!("{} for {} unchecked", label, id);
            }
        }
        GateOutcome::Proceed
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::sink::RecordingSink;

    struct Fixed(&'static str, DataRequestVerdict);

    impl InteractionModule for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn is_data_request_valid(
            &self,
            _session: &PlayerSession,
            _id: &str,
            _object: &WorldObject,
            _state: i32,
        ) -> DataRequestVerdict {
            self.1
        }
    }

    fn session() -> PlayerSession {
        PlayerSession::new("tester", Box::new(RecordingSink::new()))
    }

    #[test]
    fn registering_twice_keeps_one_entry() {
        let mut registry = ModuleRegistry::new();
        let module: Arc<dyn InteractionModule> =
            Arc::new(Fixed("a", DataRequestVerdict::NotApplicable));
        registry.register_module(module.clone());
        registry.register_module(module);
        assert_eq!(registry.modules().len(), 1);

        let fallback = registry.spawn_behaviours()[0].clone();
        registry.register_spawn_behaviour(fallback);
        assert_eq!(registry.spawn_behaviours().len(), 1);
    }

    #[test]
    fn unknown_spawn_behaviour_falls_back() {
        let registry = ModuleRegistry::new();
        let active = registry.active_spawn_behaviour("does-not-exist");
        assert_eq!(active.identifier(), FALLBACK_SPAWN_BEHAVIOUR);
    }

    #[test]
    fn first_decisive_module_wins() {
        let object = WorldObject::new("npc", 2, 1);
        let session = session();

        let mut registry = ModuleRegistry::new();
        registry.register_module(Arc::new(Fixed("skip", DataRequestVerdict::NotApplicable)));
        registry.register_module(Arc::new(Fixed("accept", DataRequestVerdict::Accept)));
        registry.register_module(Arc::new(Fixed("deny", DataRequestVerdict::Deny)));
        assert_eq!(
            registry.check_request_validity(&session, "npc", &object, 0, false, "request"),
            GateOutcome::Proceed
        );

        let mut registry = ModuleRegistry::new();
        registry.register_module(Arc::new(Fixed("deny", DataRequestVerdict::Deny)));
        registry.register_module(Arc::new(Fixed("accept", DataRequestVerdict::Accept)));
        assert_eq!(
            registry.check_request_validity(&session, "npc", &object, 0, true, "request"),
            GateOutcome::Denied
        );
    }

    #[test]
    fn unchecked_requests_proceed() {
        let registry = ModuleRegistry::new();
        let object = WorldObject::new("npc", 2, 1);
        assert_eq!(
            registry.check_request_validity(&session(), "npc", &object, 0, true, "request"),
            GateOutcome::Proceed
        );
    }
}
