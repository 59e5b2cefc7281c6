use log::{debug, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::interactions::errors::InteractionError;
use crate::interactions::types::{GroupObjectDefinition, WorldObject};
use crate::interactions::world_data::{load_world_data_from_json, WorldData};

enum RegistrySource {
    File(PathBuf),
    InMemory,
}

struct LoadedWorld {
    data: WorldData,
    /// member object id -> (level id, index into that level's group definitions)
    group_members: HashMap<String, (i32, usize)>,
}

impl LoadedWorld {
    fn index(data: WorldData) -> Self {
        let mut group_members = HashMap::new();
        for (level, groups) in &data.group_objects {
            for (idx, group) in groups.iter().enumerate() {
                for member in &group.members {
                    group_members.entry(member.clone()).or_insert((*level, idx));
                }
            }
        }
        Self {
            data,
            group_members,
        }
    }
}

/// Read-through registry of static world objects.
///
/// Data is loaded on first access and read-only afterwards. Two sessions racing
/// the first load both parse the same file; the first result stored wins and the
/// other is dropped, so every caller observes identical data.
pub struct WorldObjectRegistry {
    source: RegistrySource,
    world: OnceLock<LoadedWorld>,
}

impl WorldObjectRegistry {
    /// Registry that lazily loads the JSON world data file at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: RegistrySource::File(path.into()),
            world: OnceLock::new(),
        }
    }

    /// Registry over already-built world data (tests, tools).
    pub fn from_data(data: WorldData) -> Self {
        let world = OnceLock::new();
        let _ = world.set(LoadedWorld::index(data));
        Self {
            source: RegistrySource::InMemory,
            world,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.world.get().is_some()
    }

    fn loaded(&self) -> Result<&LoadedWorld, InteractionError> {
        if let Some(world) = self.world.get() {
            return Ok(world);
        }
        let data = match &self.source {
            RegistrySource::File(path) => {
                info!("Loading world data from {}", path.display());
                load_world_data_from_json(path)?
            }
            RegistrySource::InMemory => WorldData::new(),
        };
        let world = self.world.get_or_init(|| LoadedWorld::index(data));
        info!(
            "World registry ready: {} objects, {} collections, {} levels",
            world.data.objects.len(),
            world.data.collections.len(),
            world.data.levels.len()
        );
        Ok(world)
    }

    /// Make sure the world data is loaded. Idempotent.
    pub fn ensure_loaded(&self) -> Result<&WorldData, InteractionError> {
        self.loaded().map(|w| &w.data)
    }

    /// Resolve an object id to its static definition.
    pub fn resolve(&self, id: &str) -> Result<Arc<WorldObject>, InteractionError> {
        self.loaded()?
            .data
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| InteractionError::NotFound(id.to_string()))
    }

    /// Every object id belonging to a collection linked to `level_id`, in
    /// collection order. Unknown collections contribute nothing.
    pub fn ids_for_level(&self, level_id: i32) -> Result<Vec<String>, InteractionError> {
        let data = &self.loaded()?.data;
        let mut ids = Vec::new();
        if let Some(collections) = data.levels.get(&level_id) {
            for collection in collections {
                match data.collections.get(collection) {
                    Some(members) => ids.extend(members.iter().cloned()),
                    None => debug!("Level {} links missing collection {}", level_id, collection),
                }
            }
        }
        Ok(ids)
    }

    pub fn group_objects_for_level(
        &self,
        level_id: i32,
    ) -> Result<&[GroupObjectDefinition], InteractionError> {
        Ok(self
            .loaded()?
            .data
            .group_objects
            .get(&level_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// The group definition an object belongs to, if any.
    pub fn group_of(&self, object_id: &str) -> Option<&GroupObjectDefinition> {
        let world = self.loaded().ok()?;
        let (level, idx) = world.group_members.get(object_id)?;
        world.data.group_objects.get(level)?.get(*idx)
    }

    pub fn object_count(&self) -> usize {
        self.world.get().map(|w| w.data.objects.len()).unwrap_or(0)
    }
}
