use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::interactions::errors::InteractionError;

/// Archetype tag of counter variables. Their "state" is a non-negative counter.
pub const ARCHETYPE_COUNTER: i32 = 7;

/// Actor id that stands for the target of the current interaction.
pub const TARGET_ACTOR: &str = "0";

/// Immutable, shared list of commands. Cloning only bumps a reference count,
/// which keeps per-player branch snapshots cheap.
pub type CommandList = Arc<[StateCommand]>;

/// Ordered mapping from a numeric key (state key or branch key) to a command list.
pub type StateTable = BTreeMap<i32, CommandList>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryInfo {
    /// Archetype tag (behavioural family of the object).
    #[serde(rename = "type")]
    pub kind: i32,
    pub def_id: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quaternion,
}

/// How the interpreter treats a command code.
///
/// | code   | kind                     |
/// |--------|--------------------------|
/// | 1      | `SetState`               |
/// | 3, 35  | `DirectCommand`          |
/// | 12     | `Progress`               |
/// | 13     | `CounterBranch`          |
/// | 26     | `RunStates`              |
/// | 29     | `Randomize`              |
/// | 41     | `GrantLoot`              |
/// | 52     | `SetStateAndRunBranches` |
/// | other  | `Other` (module chain)   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetState,
    DirectCommand,
    Progress,
    CounterBranch,
    RunStates,
    Randomize,
    GrantLoot,
    SetStateAndRunBranches,
    Other,
}

impl CommandKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => CommandKind::SetState,
            3 | 35 => CommandKind::DirectCommand,
            12 => CommandKind::Progress,
            13 => CommandKind::CounterBranch,
            26 => CommandKind::RunStates,
            29 => CommandKind::Randomize,
            41 => CommandKind::GrantLoot,
            52 => CommandKind::SetStateAndRunBranches,
            _ => CommandKind::Other,
        }
    }
}

/// One authored command inside a state table or branch list.
#[derive(Debug, Clone, PartialEq)]
pub struct StateCommand {
    pub code: i32,
    /// Object the command acts on; [`TARGET_ACTOR`] means the interaction target.
    pub actor_id: String,
    pub params: Vec<String>,
    pub branches: StateTable,
}

impl StateCommand {
    pub fn new(code: i32, actor_id: impl Into<String>) -> Self {
        Self {
            code,
            actor_id: actor_id.into(),
            params: Vec::new(),
            branches: StateTable::new(),
        }
    }

    /// Command acting on the interaction target itself.
    pub fn on_target(code: i32) -> Self {
        Self::new(code, TARGET_ACTOR)
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn with_branch(mut self, key: i32, commands: Vec<StateCommand>) -> Self {
        self.branches.insert(key, commands.into());
        self
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::from_code(self.code)
    }

    /// Resolve the actor id against the current interaction target.
    pub fn resolve_actor<'a>(&'a self, target: &'a str) -> &'a str {
        if self.actor_id == TARGET_ACTOR {
            target
        } else {
            &self.actor_id
        }
    }

    pub fn param(&self, index: usize) -> Result<&str, InteractionError> {
        self.params
            .get(index)
            .map(String::as_str)
            .ok_or(InteractionError::MissingParameter {
                code: self.code,
                index,
            })
    }

    pub fn int_param(&self, index: usize) -> Result<i32, InteractionError> {
        let raw = self.param(index)?;
        raw.trim()
            .parse::<i32>()
            .map_err(|_| InteractionError::MalformedParameter {
                code: self.code,
                index,
                value: raw.to_string(),
            })
    }
}

/// Static definition of an interactive world object. Never mutated after load.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub id: String,
    pub primary_info: PrimaryInfo,
    pub location_info: LocationInfo,
    pub states: StateTable,
}

impl WorldObject {
    pub fn new(id: impl Into<String>, kind: i32, def_id: i32) -> Self {
        Self {
            id: id.into(),
            primary_info: PrimaryInfo { kind, def_id },
            location_info: LocationInfo::default(),
            states: StateTable::new(),
        }
    }

    pub fn with_location(mut self, position: Vec3, rotation: Quaternion) -> Self {
        self.location_info = LocationInfo { position, rotation };
        self
    }

    pub fn with_state(mut self, key: i32, commands: Vec<StateCommand>) -> Self {
        self.states.insert(key, commands.into());
        self
    }

    pub fn kind(&self) -> i32 {
        self.primary_info.kind
    }

    pub fn is_counter(&self) -> bool {
        self.primary_info.kind == ARCHETYPE_COUNTER
    }

    pub fn has_state(&self, key: i32) -> bool {
        self.states.contains_key(&key)
    }

    pub fn state(&self, key: i32) -> Option<&CommandList> {
        self.states.get(&key)
    }
}

/// A cluster of linked world objects that the spawn strategy selects as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: i32,
}

/// Group object as authored in world data, including the objects it links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupObjectDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(default)]
    pub members: Vec<String>,
}

impl GroupObjectDefinition {
    pub fn new(id: impl Into<String>, kind: i32) -> Self {
        Self {
            id: id.into(),
            kind,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, object_id: impl Into<String>) -> Self {
        self.members.push(object_id.into());
        self
    }

    pub fn to_group_object(&self) -> GroupObject {
        GroupObject {
            id: self.id.clone(),
            kind: self.kind,
        }
    }
}
