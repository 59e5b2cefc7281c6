//! Interaction manager: the entry points a connection worker calls.
//!
//! - [`InteractionManager::init_interactions_for`] on level entry
//! - [`InteractionManager::handle_interaction`] when the player finishes interacting
//! - [`InteractionManager::handle_interaction_data_request`] when the client asks
//!   what an object does for a given state
//! - [`InteractionManager::handle_action_finished`] when a client-side action
//!   chain completes
//!
//! None of these return errors for content problems; they log and carry on so
//! that a broken object never drops a connection.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::interactions::errors::InteractionError;
use crate::interactions::interpreter::{Interpreter, InterpreterLimits};
use crate::interactions::loot::{LootTables, RewardCollaborator};
use crate::interactions::module::{GateOutcome, ModuleRegistry};
use crate::interactions::packets::{ObjectSummaryEntry, Packet, SpawnPacket};
use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::spawn::{SpawnBehaviourProvider, FALLBACK_SPAWN_BEHAVIOUR};
use crate::interactions::types::{StateCommand, StateTable, WorldObject};
use crate::metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    pub spawn_behaviour: String,
    pub debug_mode: bool,
    pub limits: InterpreterLimits,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            spawn_behaviour: FALLBACK_SPAWN_BEHAVIOUR.to_string(),
            debug_mode: false,
            limits: InterpreterLimits::default(),
        }
    }
}

impl ManagerSettings {
    pub fn with_spawn_behaviour(mut self, id: impl Into<String>) -> Self {
        self.spawn_behaviour = id.into();
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_limits(mut self, limits: InterpreterLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Result of one data request, mainly for tests and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A module denied the request; nothing was sent.
    Denied,
    /// No snapshot could be derived (no usable state on the object).
    NoSnapshot,
    /// No branch matched, even after the single reset-and-retry when allowed.
    NoMatch { retried: bool },
    /// Matching branches ran; `commands` is the total length of the lists run.
    Executed { commands: usize, retried: bool },
}

pub struct InteractionManager {
    registry: Arc<WorldObjectRegistry>,
    modules: Arc<ModuleRegistry>,
    rewards: Arc<dyn RewardCollaborator>,
    settings: ManagerSettings,
}

impl InteractionManager {
    pub fn new(
        registry: Arc<WorldObjectRegistry>,
        modules: Arc<ModuleRegistry>,
        rewards: Arc<dyn RewardCollaborator>,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            registry,
            modules,
            rewards,
            settings,
        }
    }

    /// Wire up registry, loot tables and the built-in modules from configuration.
    ///
    /// World data itself is loaded lazily on first use; a missing loot table
    /// file only disables loot.
    pub fn from_config(config: &Config) -> Result<Self, InteractionError> {
        let registry = Arc::new(WorldObjectRegistry::from_file(&config.world.world_data_file));

        let loot_path = Path::new(&config.world.loot_tables_file);
        let tables = if loot_path.exists() {
            let tables = LootTables::load(loot_path)?;
            info!(
                "Loaded {} loot tables from {}",
                tables.len(),
                loot_path.display()
            );
            tables
        } else {
            warn!(
                "Loot table file {} not found; loot commands will fail",
                loot_path.display()
            );
            LootTables::new()
        };
        let rewards: Arc<dyn RewardCollaborator> = Arc::new(tables);

        let modules = Arc::new(ModuleRegistry::with_defaults(
            registry.clone(),
            rewards.clone(),
            &config.modules,
        ));
        let settings = ManagerSettings {
            spawn_behaviour: config.server.spawn_behaviour.clone(),
            debug_mode: config.server.debug_mode,
            limits: config.interpreter.limits(),
        };
        Ok(Self::new(registry, modules, rewards, settings))
    }

    pub fn registry(&self) -> &WorldObjectRegistry {
        &self.registry
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn active_spawn_behaviour(&self) -> Arc<dyn SpawnBehaviourProvider> {
        self.modules
            .active_spawn_behaviour(&self.settings.spawn_behaviour)
    }

    fn interpreter<'s>(&'s self, session: &'s mut PlayerSession) -> Interpreter<'s> {
        Interpreter::new(&self.registry, &self.modules, &*self.rewards, session)
            .with_limits(self.settings.limits)
            .with_debug_mode(self.settings.debug_mode)
    }

    /// Set up every interactive object of `level_id` for the player.
    ///
    /// Fails only when the world data cannot be loaded.
    pub fn init_interactions_for(
        &self,
        session: &mut PlayerSession,
        level_id: i32,
    ) -> Result<(), InteractionError> {
        self.registry.ensure_loaded()?;
        let ids = self.registry.ids_for_level(level_id)?;

        for module in self.modules.modules() {
            module.prepare_world(level_id, &ids, session);
        }

        self.initialize_networked_objects(session, &ids, level_id);
        session.interactions.extend(ids.iter().cloned());
        Ok(())
    }

    /// Emit the spawn sequence for `ids`: object summary, group objects,
    /// initial substates, then per-object module initialization or fallback
    /// spawn.
    pub fn initialize_networked_objects(
        &self,
        session: &mut PlayerSession,
        ids: &[String],
        level_id: i32,
    ) {
        let mut seen = HashSet::new();
        let mut objects: Vec<(&str, Arc<WorldObject>)> = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                debug!("Duplicate object {} in level {}", id, level_id);
                continue;
            }
            match self.registry.resolve(id) {
                Ok(object) => objects.push((id.as_str(), object)),
                Err(e) => warn!("Skipping object in level {}: {}", level_id, e),
            }
        }

        session.send(Packet::ObjectSummary {
            objects: objects
                .iter()
                .map(|(id, object)| ObjectSummaryEntry {
                    id: id.to_string(),
                    kind: object.kind(),
                    def_id: object.primary_info.def_id,
                })
                .collect(),
        });

        let behaviour = self.active_spawn_behaviour();
        let groups = behaviour.provide_group_objects(level_id, session, &self.registry);
        session.group_objects.extend(groups.iter().cloned());
        if !groups.is_empty() {
            session.send(Packet::GroupObjectSummary { groups });
        }

        for (id, object) in &objects {
            if object.states.is_empty() {
                session.send(Packet::InitialSubstate {
                    object_id: id.to_string(),
                });
            }
        }

        let created_at = chrono::Utc::now().timestamp();
        for (id, object) in &objects {
            let claimed = self
                .modules
                .modules()
                .iter()
                .any(|m| m.initialize_world_object(session, id, object));
            if !claimed {
                session.send(Packet::Spawn(SpawnPacket::fallback(id, object, created_at)));
            }
        }

        metrics::record_level_entry(level_id, objects.len());
        debug!(
            "Initialized {} objects in level {} for {}",
            objects.len(),
            level_id,
            session.account_id
        );
    }

    /// The player finished interacting with an object. Returns the (possibly
    /// changed) destroy-on-completion flag.
    pub fn handle_interaction(
        &self,
        session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
        state: i32,
        destroy_on_completion: bool,
    ) -> bool {
        let mut destroy = destroy_on_completion;
        for module in self.modules.modules() {
            if !module.can_handle(session, id, object) {
                continue;
            }
            destroy = module.should_destroy_resource(session, id, object, state, destroy);
            if module.handle_interaction_success(session, id, object, state) {
                debug!(
                    "Interaction {} state {} handled by {}",
                    id,
                    state,
                    module.name()
                );
                return destroy;
            }
        }
        destroy
    }

    /// Validate a data request, derive the player's snapshot if needed and run
    /// every snapshot command that has a branch for `state`.
    ///
    /// A stale snapshot that matches nothing is reset and the request retried
    /// once; a freshly derived snapshot is never retried.
    pub fn handle_interaction_data_request(
        &self,
        session: &mut PlayerSession,
        id: &str,
        object: &WorldObject,
        state: i32,
    ) -> RequestOutcome {
        metrics::inc_data_requests();
        let mut retried = false;

        loop {
            let gate = self.modules.check_request_validity(
                session,
                id,
                object,
                state,
                self.settings.debug_mode,
                "Data request",
            );
            if gate == GateOutcome::Denied {
                metrics::inc_denied_requests();
                return RequestOutcome::Denied;
            }

            let mut fresh = false;
            if session.snapshot(id).is_none() {
                fresh = true;
                let last = session.state_of(id).unwrap_or(0);
                let key = if object.has_state(last) { last } else { 0 };
                if let Some(list) = object.state(key) {
                    session.arm_snapshot(id, list.clone());
                }
            }
            let Some(snapshot) = session.snapshot(id).cloned() else {
                debug!("No state to resolve for {} (state {})", id, state);
                return RequestOutcome::NoSnapshot;
            };

            let mut interpreter = self.interpreter(session);
            let mut commands = 0;
            for command in snapshot.iter() {
                if command.branches.contains_key(&state) {
                    interpreter.run_branches(&command.branches, state, id, object, Some(command));
                    commands += command.branches.get(&state).map_or(0, |list| list.len());
                }
            }

            if commands > 0 {
                return RequestOutcome::Executed { commands, retried };
            }
            if fresh || retried {
                return RequestOutcome::NoMatch { retried };
            }

            debug!("Stale snapshot for {}; resetting and retrying", id);
            metrics::inc_snapshot_retries();
            session.clear_snapshot(id);
            retried = true;
        }
    }

    /// A client-side action chain finished: run the object's commands for
    /// `state` on the chained path.
    pub fn handle_action_finished(&self, session: &mut PlayerSession, id: &str, state: i32) {
        let object = match self.registry.resolve(id) {
            Ok(object) => object,
            Err(e) => {
                debug!("Action finished for unknown object: {}", e);
                return;
            }
        };
        let Some(commands) = object.state(state).cloned() else {
            debug!("Action finished for {}: no state {}", id, state);
            return;
        };
        self.interpreter(session).run_states(&commands, id, &object);
    }

    /// Run one keyed branch list outside a data request.
    pub fn run_branches(
        &self,
        session: &mut PlayerSession,
        branches: &StateTable,
        key: i32,
        target: &str,
        object: &WorldObject,
        parent: Option<&StateCommand>,
    ) -> usize {
        self.interpreter(session)
            .run_branches(branches, key, target, object, parent)
    }

    /// Run a command list on the chained path.
    pub fn run_states(
        &self,
        session: &mut PlayerSession,
        commands: &[StateCommand],
        target: &str,
        object: &WorldObject,
    ) {
        self.interpreter(session)
            .run_states(commands, target, object)
    }
}
