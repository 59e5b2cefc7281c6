//! World data loading for interactive objects.
//!
//! World data is authored as JSON with string-typed command codes, state keys
//! and branch keys. Everything is normalized to integers here, once, so the
//! interpreter never compares strings.
//!
//! ```json
//! {
//!   "collections": {
//!     "hub_npcs": {
//!       "objects": {
//!         "npc_1": {
//!           "primaryInfo": { "type": 2, "defId": 1204 },
//!           "locationInfo": { "position": { "x": 1.0, "y": 0.0, "z": 3.5 } },
//!           "states": { "0": [ { "command": "1", "actorId": "0", "params": ["1"] } ] }
//!         }
//!       }
//!     }
//!   },
//!   "levels": { "820": ["hub_npcs"] },
//!   "groupObjects": { "820": [ { "id": "grp_1", "type": 1, "members": ["npc_1"] } ] }
//! }
//! ```

use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::interactions::errors::InteractionError;
use crate::interactions::types::{
    GroupObjectDefinition, LocationInfo, PrimaryInfo, StateCommand, StateTable, WorldObject,
    TARGET_ACTOR,
};

/// JSON scalars that may be written either as strings or as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl TextOrNumber {
    fn into_string(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Integer(n) => n.to_string(),
            TextOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn target_actor() -> TextOrNumber {
    TextOrNumber::Text(TARGET_ACTOR.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldDataSeed {
    #[serde(default)]
    collections: BTreeMap<String, CollectionSeed>,
    #[serde(default)]
    levels: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    group_objects: BTreeMap<String, Vec<GroupObjectDefinition>>,
}

#[derive(Debug, Deserialize)]
struct CollectionSeed {
    #[serde(default)]
    objects: BTreeMap<String, ObjectSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectSeed {
    primary_info: PrimaryInfo,
    #[serde(default)]
    location_info: LocationInfo,
    #[serde(default)]
    states: BTreeMap<String, Vec<CommandSeed>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandSeed {
    command: TextOrNumber,
    #[serde(default = "target_actor")]
    actor_id: TextOrNumber,
    #[serde(default)]
    params: Vec<TextOrNumber>,
    #[serde(default)]
    branches: BTreeMap<String, Vec<CommandSeed>>,
}

/// Fully normalized world data: objects, the collections that own them,
/// level → collection links and group-object definitions per level.
#[derive(Debug, Clone, Default)]
pub struct WorldData {
    pub objects: HashMap<String, Arc<WorldObject>>,
    pub collections: BTreeMap<String, Vec<String>>,
    pub levels: HashMap<i32, Vec<String>>,
    pub group_objects: HashMap<i32, Vec<GroupObjectDefinition>>,
}

impl WorldData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection of objects and link it to `level_id`.
    pub fn with_collection(
        mut self,
        collection_id: &str,
        level_id: i32,
        objects: Vec<WorldObject>,
    ) -> Self {
        let ids = objects.iter().map(|o| o.id.clone()).collect();
        for object in objects {
            self.objects.insert(object.id.clone(), Arc::new(object));
        }
        self.collections.insert(collection_id.to_string(), ids);
        self.levels
            .entry(level_id)
            .or_default()
            .push(collection_id.to_string());
        self
    }

    pub fn with_group_object(mut self, level_id: i32, group: GroupObjectDefinition) -> Self {
        self.group_objects.entry(level_id).or_default().push(group);
        self
    }

    /// Parse world data from a JSON string.
    pub fn from_json_str(contents: &str) -> Result<Self, InteractionError> {
        let seed: WorldDataSeed = serde_json::from_str(contents)?;
        Self::from_seed(seed)
    }

    fn from_seed(seed: WorldDataSeed) -> Result<Self, InteractionError> {
        let mut data = WorldData::new();

        for (collection_id, collection) in seed.collections {
            let mut ids = Vec::with_capacity(collection.objects.len());
            for (object_id, object) in collection.objects {
                if data.objects.contains_key(&object_id) {
                    warn!(
                        "World data: object {} appears in more than one collection, keeping the first",
                        object_id
                    );
                    ids.push(object_id);
                    continue;
                }
                let states = convert_table(&object_id, object.states)?;
                let world_object = WorldObject {
                    id: object_id.clone(),
                    primary_info: object.primary_info,
                    location_info: object.location_info,
                    states,
                };
                data.objects.insert(object_id.clone(), Arc::new(world_object));
                ids.push(object_id);
            }
            data.collections.insert(collection_id, ids);
        }

        for (level, collections) in seed.levels {
            let level_id = parse_key("level", &level, &level)?;
            for collection in &collections {
                if !data.collections.contains_key(collection) {
                    warn!(
                        "World data: level {} references unknown collection {}",
                        level_id, collection
                    );
                }
            }
            data.levels.entry(level_id).or_default().extend(collections);
        }

        for (level, groups) in seed.group_objects {
            let level_id = parse_key("group level", &level, &level)?;
            data.group_objects.entry(level_id).or_default().extend(groups);
        }

        Ok(data)
    }
}

fn parse_key(what: &str, owner: &str, raw: &str) -> Result<i32, InteractionError> {
    raw.trim().parse::<i32>().map_err(|_| {
        InteractionError::WorldData(format!("{} key {:?} of {} is not an integer", what, raw, owner))
    })
}

fn convert_table(
    object_id: &str,
    table: BTreeMap<String, Vec<CommandSeed>>,
) -> Result<StateTable, InteractionError> {
    let mut out = StateTable::new();
    for (raw_key, commands) in table {
        let key = parse_key("state", object_id, &raw_key)?;
        let converted = commands
            .into_iter()
            .map(|c| convert_command(object_id, c))
            .collect::<Result<Vec<_>, _>>()?;
        if out.insert(key, converted.into()).is_some() {
            return Err(InteractionError::WorldData(format!(
                "duplicate key {} in object {}",
                key, object_id
            )));
        }
    }
    Ok(out)
}

fn convert_command(object_id: &str, seed: CommandSeed) -> Result<StateCommand, InteractionError> {
    let raw_code = seed.command.into_string();
    let code = raw_code.trim().parse::<i32>().map_err(|_| {
        InteractionError::WorldData(format!(
            "command code {:?} in object {} is not an integer",
            raw_code, object_id
        ))
    })?;
    Ok(StateCommand {
        code,
        actor_id: seed.actor_id.into_string(),
        params: seed.params.into_iter().map(TextOrNumber::into_string).collect(),
        branches: convert_table(object_id, seed.branches)?,
    })
}

/// Load world data from a JSON file.
pub fn load_world_data_from_json<P: AsRef<Path>>(path: P) -> Result<WorldData, InteractionError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    WorldData::from_json_str(&contents).map_err(|e| match e {
        InteractionError::Json(err) => InteractionError::WorldData(format!(
            "failed to parse {}: {}",
            path.display(),
            err
        )),
        other => other,
    })
}
