//! # World Interaction Core
//!
//! Per-player interpretation of authored world-object content.
//!
//! - [`registry`] and [`world_data`] load the static objects once per process
//! - [`module`] holds the ordered module chain and the spawn behaviours;
//!   [`modules`] ships the built-in ones
//! - [`manager`] exposes the entry points a connection worker calls
//! - [`interpreter`] runs branch and state command lists
//! - [`session`] is the mutable per-player state
//! - [`packets`] and [`sink`] describe what leaves the server, in order
//! - [`loot`] rolls reward tables

pub mod errors;
pub mod interpreter;
pub mod loot;
pub mod manager;
pub mod module;
pub mod modules;
pub mod packets;
pub mod registry;
pub mod session;
pub mod sink;
pub mod spawn;
pub mod types;
pub mod weighted;
pub mod world_data;

pub use errors::InteractionError;
pub use interpreter::{ExecutionContext, ExecutionPath, Interpreter, InterpreterLimits};
pub use loot::{LootEntry, LootTable, LootTables, RewardCollaborator, RewardGrant};
pub use manager::{InteractionManager, ManagerSettings, RequestOutcome};
pub use module::{DataRequestVerdict, GateOutcome, InteractionModule, ModuleRegistry};
pub use packets::Packet;
pub use registry::WorldObjectRegistry;
pub use session::PlayerSession;
pub use sink::{PacketSink, QueueSink, RecordingSink};
pub use spawn::{SpawnBehaviourProvider, FALLBACK_SPAWN_BEHAVIOUR, RANDOMIZED_SPAWN_BEHAVIOUR};
pub use types::{
    CommandKind, CommandList, GroupObject, GroupObjectDefinition, StateCommand, StateTable,
    WorldObject, ARCHETYPE_COUNTER,
};
pub use world_data::WorldData;
