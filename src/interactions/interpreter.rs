//! Branch/command interpreter.
//!
//! One [`Interpreter`] is built per entry-point call and borrows the player's
//! session for its lifetime. Two flavours of list execution share the command
//! table below:
//!
//! - [`Interpreter::run_branches`] - the request path. Runs one keyed branch
//!   list and makes it the player's active snapshot for the target.
//! - [`Interpreter::run_states`] - the chained path, used for action-finished
//!   notifications. Loot grants are refused here.
//!
//! ## Command table
//!
//! | code  | effect                                                           |
//! |-------|------------------------------------------------------------------|
//! | 1     | set actor state (must exist, or actor is a counter)              |
//! | 3, 35 | forward the raw parameters to the client                         |
//! | 12    | bump actor state, run branch `1` of its previous state commands  |
//! | 13    | decrement a counter; at zero run the actor's state `params[0]`   |
//! | 26    | re-run the validity gate, then the actor's state `params[0]`     |
//! | 29    | weighted pick among branch keys (each key is its own weight)     |
//! | 41    | roll loot table `params[0]` (request path only)                  |
//! | 52    | set actor state, then run every attached branch                  |
//! | other | offered to the module chain                                      |
//!
//! After a command succeeds, codes `<= 20` and `38`, `81`, `82` are echoed to
//! the client as a generic state-command packet, except code 3 (both paths)
//! and code 1 (request path only).
//!
//! A command that fails (unknown actor, malformed parameter) is logged and
//! skipped; mutations it already made stay, and the following commands run.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::interactions::errors::InteractionError;
use crate::interactions::loot::{RewardCollaborator, QUEST_LOOT_SOURCE};
use crate::interactions::module::{GateOutcome, ModuleRegistry};
use crate::interactions::packets::Packet;
use crate::interactions::registry::WorldObjectRegistry;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::{CommandKind, StateCommand, StateTable, WorldObject};
use crate::interactions::weighted::select_weighted;
use crate::logutil::format_params;
use crate::metrics;

/// Default maximum nesting of branch lists within one entry-point call.
pub const DEFAULT_MAX_BRANCH_DEPTH: usize = 32;

/// Default maximum number of commands executed within one entry-point call.
pub const DEFAULT_MAX_COMMANDS_PER_REQUEST: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// Data requests (`run_branches`).
    Request,
    /// Action-finished notifications (`run_states`).
    Chained,
}

impl ExecutionPath {
    /// Whether a successfully executed `code` is echoed as a state-command packet.
    pub fn emits_state_packet(self, code: i32) -> bool {
        let visible = code <= 20 || matches!(code, 38 | 81 | 82);
        let excluded = match self {
            ExecutionPath::Request => code == 1 || code == 3,
            ExecutionPath::Chained => code == 3,
        };
        visible && !excluded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterLimits {
    #[serde(default = "default_max_branch_depth")]
    pub max_branch_depth: usize,
    #[serde(default = "default_max_commands")]
    pub max_commands_per_request: usize,
}

fn default_max_branch_depth() -> usize {
    DEFAULT_MAX_BRANCH_DEPTH
}

fn default_max_commands() -> usize {
    DEFAULT_MAX_COMMANDS_PER_REQUEST
}

impl Default for InterpreterLimits {
    fn default() -> Self {
        Self {
            max_branch_depth: DEFAULT_MAX_BRANCH_DEPTH,
            max_commands_per_request: DEFAULT_MAX_COMMANDS_PER_REQUEST,
        }
    }
}

/// Recursion and work accounting for one entry-point call.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    limits: InterpreterLimits,
    /// Current branch nesting depth
    pub depth: usize,
    /// Commands executed so far
    pub command_count: usize,
    /// Set once a limit has been hit; further trips are not logged again
    pub tripped: bool,
}

impl ExecutionContext {
    pub fn new(limits: InterpreterLimits) -> Self {
        Self {
            limits,
            depth: 0,
            command_count: 0,
            tripped: false,
        }
    }

    pub fn can_nest_deeper(&self) -> bool {
        self.depth < self.limits.max_branch_depth
    }

    pub fn can_execute_command(&self) -> bool {
        self.command_count < self.limits.max_commands_per_request
    }

    pub fn increment_depth(&mut self) {
        self.depth += 1;
    }

    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn increment_command(&mut self) {
        self.command_count += 1;
    }
}

/// What the enclosing list does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Stop the current list without echoing the command.
    Abort,
}

pub struct Interpreter<'a> {
    registry: &'a WorldObjectRegistry,
    modules: &'a ModuleRegistry,
    rewards: &'a dyn RewardCollaborator,
    session: &'a mut PlayerSession,
    debug_mode: bool,
    context: ExecutionContext,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        registry: &'a WorldObjectRegistry,
        modules: &'a ModuleRegistry,
        rewards: &'a dyn RewardCollaborator,
        session: &'a mut PlayerSession,
    ) -> Self {
        Self {
            registry,
            modules,
            rewards,
            session,
            debug_mode: false,
            context: ExecutionContext::new(InterpreterLimits::default()),
        }
    }

    pub fn with_limits(mut self, limits: InterpreterLimits) -> Self {
        self.context = ExecutionContext::new(limits);
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Run the branch list stored under `key`, arming it as the player's
    /// snapshot for `target`. Returns the length of the list run (0 when the
    /// key is absent or the depth limit stopped it).
    pub fn run_branches(
        &mut self,
        branches: &StateTable,
        key: i32,
        target: &str,
        object: &WorldObject,
        parent: Option<&StateCommand>,
    ) -> usize {
        let Some(list) = branches.get(&key).cloned() else {
            debug!("No branch {} for {}", key, target);
            return 0;
        };
        if !self.context.can_nest_deeper() {
            self.trip("branch depth", target);
            return 0;
        }

        self.session.arm_snapshot(target, list.clone());
        self.context.increment_depth();
        self.run_list(&list, ExecutionPath::Request, target, object, parent);
        self.context.decrement_depth();
        list.len()
    }

    /// Run a state's command list on the chained path.
    pub fn run_states(&mut self, commands: &[StateCommand], target: &str, object: &WorldObject) {
        if !self.context.can_nest_deeper() {
            self.trip("branch depth", target);
            return;
        }
        self.context.increment_depth();
        self.run_list(commands, ExecutionPath::Chained, target, object, None);
        self.context.decrement_depth();
    }

    fn run_list(
        &mut self,
        commands: &[StateCommand],
        path: ExecutionPath,
        target: &str,
        object: &WorldObject,
        parent: Option<&StateCommand>,
    ) {
        for command in commands {
            if !self.context.can_execute_command() {
                self.trip("command budget", target);
                return;
            }
            self.context.increment_command();
            metrics::inc_commands_executed();
            debug!(
                "Object interaction command: {}, command: {}, args: {}",
                target,
                command.code,
                format_params(&command.params)
            );

            match self.execute(command, path, target, object, parent) {
                Ok(Flow::Continue) => {
                    if path.emits_state_packet(command.code) {
                        self.session.send(Packet::state_command(
                            command.actor_id.clone(),
                            command.code,
                            command.params.clone(),
                        ));
                    }
                }
                Ok(Flow::Abort) => return,
                Err(e) => {
                    metrics::inc_failed_commands();
                    warn!(
                        "Command {} for {} (actor {}) failed: {}",
                        command.code, target, command.actor_id, e
                    );
                }
            }
        }
    }

    fn trip(&mut self, limit: &str, target: &str) {
        if self.context.tripped {
            return;
        }
        self.context.tripped = true;
        metrics::inc_guard_trips();
        warn!(
            "Interaction {} for {} hit the {} limit (depth {}, commands {}); stopping",
            target, self.session.account_id, limit, self.context.depth, self.context.command_count
        );
    }

    fn execute(
        &mut self,
        command: &StateCommand,
        path: ExecutionPath,
        target: &str,
        object: &WorldObject,
        parent: Option<&StateCommand>,
    ) -> Result<Flow, InteractionError> {
        match command.kind() {
            CommandKind::SetState => self.set_state(command, target),
            CommandKind::DirectCommand => {
                self.session.send(Packet::DirectCommand {
                    code: command.code,
                    target_id: target.to_string(),
                    params: command.params.clone(),
                });
                Ok(Flow::Continue)
            }
            CommandKind::GrantLoot => match path {
                ExecutionPath::Request => self.grant_loot(command, object),
                ExecutionPath::Chained => {
                    debug!("Loot command for {} refused on the chained path", target);
                    Ok(Flow::Continue)
                }
            },
            CommandKind::Progress => self.progress(command, target),
            CommandKind::CounterBranch => self.counter_branch(command, target),
            CommandKind::RunStates => self.branch_evaluation(command, target),
            CommandKind::Randomize => self.randomize(command, target),
            CommandKind::SetStateAndRunBranches => {
                self.set_state_and_run_branches(command, target, object)
            }
            CommandKind::Other => {
                let parent = match path {
                    ExecutionPath::Request => parent,
                    ExecutionPath::Chained => None,
                };
                self.delegate(command, target, object, parent);
                Ok(Flow::Continue)
            }
        }
    }

    fn set_state(
        &mut self,
        command: &StateCommand,
        target: &str,
    ) -> Result<Flow, InteractionError> {
        let actor = command.resolve_actor(target).to_string();
        let value = command.int_param(0)?;
        let object = self.registry.resolve(&actor)?;
        debug!("Command 1 (set state): {} -> {}", actor, value);

        if object.has_state(value) {
            self.session.set_state(&actor, value);
            self.session.send(Packet::state_command(
                command.actor_id.clone(),
                1,
                command.params.clone(),
            ));
        } else if object.is_counter() {
            if value < 0 {
                return Err(InteractionError::NegativeCounter {
                    object_id: actor,
                    value,
                });
            }
            self.session.set_state(&actor, value);
            self.session.send(Packet::counter_command(
                command.actor_id.clone(),
                1,
                command.params.clone(),
            ));
        } else {
            debug!("{} has no state {}; ignoring", actor, value);
        }
        Ok(Flow::Continue)
    }

    fn grant_loot(
        &mut self,
        command: &StateCommand,
        object: &WorldObject,
    ) -> Result<Flow, InteractionError> {
        let table = command.param(0)?;
        debug!("Command 41 (give loot): table {}", table);
        self.rewards.give_loot_reward(
            &mut *self.session,
            table,
            QUEST_LOOT_SOURCE,
            object.primary_info.def_id,
        )?;
        Ok(Flow::Continue)
    }

    fn progress(&mut self, command: &StateCommand, target: &str) -> Result<Flow, InteractionError> {
        let actor = command.resolve_actor(target).to_string();
        let actor_object = self.registry.resolve(&actor)?;
        let previous = self.session.state_of(&actor).unwrap_or(1);
        let next = previous
            .checked_add(1)
            .ok_or_else(|| InteractionError::StateOverflow {
                object_id: actor.clone(),
                value: previous,
            })?;
        debug!("Command 12 (progress): {} {} -> {}", actor, previous, next);
        self.session.set_state(&actor, next);

        if let Some(list) = actor_object.state(previous).cloned() {
            for entry in list.iter().filter(|c| !c.branches.is_empty()) {
                self.run_branches(&entry.branches, 1, target, &actor_object, Some(command));
            }
        }

        self.session.send(Packet::state_command(
            command.actor_id.clone(),
            1,
            vec![next.to_string()],
        ));
        Ok(Flow::Continue)
    }

    fn counter_branch(
        &mut self,
        command: &StateCommand,
        target: &str,
    ) -> Result<Flow, InteractionError> {
        let actor = command.resolve_actor(target).to_string();
        let state = command.int_param(0)?;
        let actor_object = self.registry.resolve(&actor)?;

        if actor_object.is_counter() {
            let current = self.session.state_of(&actor).unwrap_or(0);
            if current > 0 {
                let remaining = current - 1;
                debug!("Command 13 (decrease counter): {} -> {}", actor, remaining);
                self.session.set_state(&actor, remaining);
                self.session.send(Packet::counter_command(
                    actor.clone(),
                    1,
                    vec![remaining.to_string()],
                ));
                if remaining > 0 {
                    return Ok(Flow::Continue);
                }
            }
        }

        debug!("Command 13 (run states): {} state {}", actor, state);
        self.run_branches(
            &actor_object.states,
            state,
            &actor,
            &actor_object,
            Some(command),
        );
        Ok(Flow::Continue)
    }

    fn branch_evaluation(
        &mut self,
        command: &StateCommand,
        target: &str,
    ) -> Result<Flow, InteractionError> {
        let actor = command.resolve_actor(target).to_string();
        let state = command.int_param(0)?;
        let actor_object = self.registry.resolve(&actor)?;
        debug!("Command 26 (branch evaluation): {} state {}", actor, state);

        let gate = self.modules.check_request_validity(
            &*self.session,
            &actor,
            &actor_object,
            state,
            self.debug_mode,
            "Branch evaluation",
        );
        if gate == GateOutcome::Denied {
            metrics::inc_denied_requests();
            return Ok(Flow::Abort);
        }

        self.run_branches(
            &actor_object.states,
            state,
            &actor,
            &actor_object,
            Some(command),
        );
        Ok(Flow::Continue)
    }

    fn randomize(&mut self, command: &StateCommand, target: &str) -> Result<Flow, InteractionError> {
        let actor = command.resolve_actor(target).to_string();
        let actor_object = self.registry.resolve(&actor)?;

        let weights: Vec<(i32, u32)> = command
            .branches
            .keys()
            .filter(|key| **key > 0)
            .map(|key| (*key, *key as u32))
            .collect();
        let Some(&key) = select_weighted(&weights, self.session.rng()) else {
            debug!("Command 29 for {}: no selectable branch", actor);
            return Ok(Flow::Continue);
        };

        debug!("Command 29 (randomize): {} picked branch {}", actor, key);
        self.run_branches(&command.branches, key, &actor, &actor_object, Some(command));
        Ok(Flow::Continue)
    }

    // Observed behaviour only: set the state, then run every attached branch in
    // key order. Needs revalidation against real client traffic.
    fn set_state_and_run_branches(
        &mut self,
        command: &StateCommand,
        target: &str,
        object: &WorldObject,
    ) -> Result<Flow, InteractionError> {
        let actor = command.resolve_actor(target).to_string();
        let value = command.int_param(0)?;
        if value < 0 && self.registry.resolve(&actor).is_ok_and(|o| o.is_counter()) {
            return Err(InteractionError::NegativeCounter {
                object_id: actor,
                value,
            });
        }
        debug!("Command 52 (set state and run branches): {} -> {}", actor, value);
        self.session.set_state(&actor, value);

        for key in command.branches.keys() {
            self.run_branches(&command.branches, *key, target, object, Some(command));
        }
        Ok(Flow::Continue)
    }

    fn delegate(
        &mut self,
        command: &StateCommand,
        target: &str,
        object: &WorldObject,
        parent: Option<&StateCommand>,
    ) {
        let modules = self.modules;
        let claimed = modules
            .modules()
            .iter()
            .any(|m| m.handle_command(&mut *self.session, target, object, command, parent));
        if !claimed {
            metrics::inc_unhandled_commands();
            debug!("Unhandled command: {} for {}", command.code, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_rule_per_path() {
        use ExecutionPath::*;
        assert!(!Request.emits_state_packet(1));
        assert!(Chained.emits_state_packet(1));
        assert!(!Request.emits_state_packet(3));
        assert!(!Chained.emits_state_packet(3));
        assert!(Request.emits_state_packet(13));
        assert!(Request.emits_state_packet(20));
        assert!(!Request.emits_state_packet(21));
        for code in [38, 81, 82] {
            assert!(Request.emits_state_packet(code));
            assert!(Chained.emits_state_packet(code));
        }
        assert!(!Chained.emits_state_packet(35));
        assert!(!Chained.emits_state_packet(41));
    }

    #[test]
    fn context_limits() {
        let mut ctx = ExecutionContext::new(InterpreterLimits {
            max_branch_depth: 2,
            max_commands_per_request: 3,
        });
        assert!(ctx.can_nest_deeper());
        ctx.increment_depth();
        ctx.increment_depth();
        assert!(!ctx.can_nest_deeper());
        ctx.decrement_depth();
        assert!(ctx.can_nest_deeper());

        for _ in 0..3 {
            assert!(ctx.can_execute_command());
            ctx.increment_command();
        }
        assert!(!ctx.can_execute_command());

        ctx.decrement_depth();
        ctx.decrement_depth();
        assert_eq!(ctx.depth, 0);
    }
}
