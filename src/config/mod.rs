//! # Configuration Management Module
//!
//! Server configuration for the interaction core, stored as TOML.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - spawn behaviour selection and debug mode
//! - [`InterpreterConfig`] - recursion and work limits for command execution
//! - [`WorldConfig`] - world data and loot table file locations
//! - [`ModulesConfig`] - settings for the built-in interaction modules
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use worldlink::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Write a starter file, then load it back
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!
//!     println!("Spawn behaviour: {}", config.server.spawn_behaviour);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! spawn_behaviour = "random"
//! debug_mode = false
//!
//! [interpreter]
//! max_branch_depth = 32
//! max_commands_per_request = 1024
//!
//! [world]
//! world_data_file = "data/world_objects.json"
//! loot_tables_file = "data/loot_tables.json"
//!
//! [modules]
//! resource_archetypes = [5]
//! inspiration_archetypes = [6]
//! shopkeeper_archetypes = [8]
//! lockpick_archetypes = [9]
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Unknown spawn behaviours are not rejected here: the module registry logs a
//! warning and uses the `fallback` behaviour instead.

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

use crate::interactions::interpreter::{
    InterpreterLimits, DEFAULT_MAX_BRANCH_DEPTH, DEFAULT_MAX_COMMANDS_PER_REQUEST,
};
use crate::interactions::spawn::FALLBACK_SPAWN_BEHAVIOUR;
use crate::interactions::types::ARCHETYPE_COUNTER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Identifier of the spawn behaviour that picks visible group objects.
    #[serde(default = "default_spawn_behaviour")]
    pub spawn_behaviour: String,
    /// Warn about data requests no module validated.
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_spawn_behaviour() -> String {
    FALLBACK_SPAWN_BEHAVIOUR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            spawn_behaviour: default_spawn_behaviour(),
            debug_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "default_max_branch_depth")]
    pub max_branch_depth: usize,
    #[serde(default = "default_max_commands_per_request")]
    pub max_commands_per_request: usize,
}

fn default_max_branch_depth() -> usize {
    DEFAULT_MAX_BRANCH_DEPTH
}

fn default_max_commands_per_request() -> usize {
    DEFAULT_MAX_COMMANDS_PER_REQUEST
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_branch_depth: DEFAULT_MAX_BRANCH_DEPTH,
            max_commands_per_request: DEFAULT_MAX_COMMANDS_PER_REQUEST,
        }
    }
}

impl InterpreterConfig {
    /// Effective limits. A zero limit would disable the interpreter entirely,
    /// so it is replaced by the default with a warning.
    pub fn limits(&self) -> InterpreterLimits {
        let max_branch_depth = if self.max_branch_depth == 0 {
            warn!(
                "interpreter.max_branch_depth is 0, using {}",
                DEFAULT_MAX_BRANCH_DEPTH
            );
            DEFAULT_MAX_BRANCH_DEPTH
        } else {
            self.max_branch_depth
        };
        let max_commands_per_request = if self.max_commands_per_request == 0 {
            warn!(
                "interpreter.max_commands_per_request is 0, using {}",
                DEFAULT_MAX_COMMANDS_PER_REQUEST
            );
            DEFAULT_MAX_COMMANDS_PER_REQUEST
        } else {
            self.max_commands_per_request
        };
        InterpreterLimits {
            max_branch_depth,
            max_commands_per_request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub world_data_file: String,
    pub loot_tables_file: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_data_file: "data/world_objects.json".to_string(),
            loot_tables_file: "data/loot_tables.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Archetype tags handled as harvestable resource nodes.
    #[serde(default = "default_resource_archetypes")]
    pub resource_archetypes: Vec<i32>,
    /// Archetype tags of collectible inspirations.
    #[serde(default = "default_inspiration_archetypes")]
    pub inspiration_archetypes: Vec<i32>,
    /// Archetype tags of shopkeepers.
    #[serde(default = "default_shopkeeper_archetypes")]
    pub shopkeeper_archetypes: Vec<i32>,
    /// Archetype tags of lockpick pickups belonging to a group object.
    #[serde(default = "default_lockpick_archetypes")]
    pub lockpick_archetypes: Vec<i32>,
}

fn default_resource_archetypes() -> Vec<i32> {
    vec![5]
}

fn default_inspiration_archetypes() -> Vec<i32> {
    vec![6]
}

fn default_shopkeeper_archetypes() -> Vec<i32> {
    vec![8]
}

fn default_lockpick_archetypes() -> Vec<i32> {
    vec![9]
}

impl ModulesConfig {
    /// Every `(module, archetype)` pair, in module order.
    fn claims(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        let lists: [(&'static str, &Vec<i32>); 4] = [
            ("resource", &self.resource_archetypes),
            ("inspiration", &self.inspiration_archetypes),
            ("shopkeeper", &self.shopkeeper_archetypes),
            ("lockpick", &self.lockpick_archetypes),
        ];
        lists
            .into_iter()
            .flat_map(|(name, tags)| tags.iter().map(move |tag| (name, *tag)))
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            resource_archetypes: default_resource_archetypes(),
            inspiration_archetypes: default_inspiration_archetypes(),
            shopkeeper_archetypes: default_shopkeeper_archetypes(),
            lockpick_archetypes: default_lockpick_archetypes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("worldlink.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that cannot work at all.
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.max_branch_depth == 0 {
            return Err(anyhow!("interpreter.max_branch_depth must be at least 1"));
        }
        if self.interpreter.max_commands_per_request == 0 {
            return Err(anyhow!(
                "interpreter.max_commands_per_request must be at least 1"
            ));
        }
        if self.world.world_data_file.trim().is_empty() {
            return Err(anyhow!("world.world_data_file must not be empty"));
        }
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(anyhow!("logging.level '{}' is not a log level", self.logging.level));
        }
        let mut owners: HashMap<i32, &str> = HashMap::new();
        for (module, tag) in self.modules.claims() {
            if tag == ARCHETYPE_COUNTER {
                return Err(anyhow!(
                    "modules: archetype {} is reserved for counters ({})",
                    tag,
                    module
                ));
            }
            if let Some(previous) = owners.insert(tag, module) {
                if previous != module {
                    return Err(anyhow!(
                        "modules: archetype {} is claimed by both {} and {}",
                        tag,
                        previous,
                        module
                    ));
                }
            }
        }
        Ok(())
    }
}
