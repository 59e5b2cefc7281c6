//! Loot tables and the reward collaborator used by loot-granting commands.
//!
//! Rewards are recorded on the player session; delivering them to the
//! account inventory belongs to the account layer.

use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::interactions::errors::InteractionError;
use crate::interactions::session::PlayerSession;
use crate::interactions::weighted::select_weighted;

/// Source kind reported for loot granted by quest commands.
pub const QUEST_LOOT_SOURCE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootEntry {
    pub item_def_id: i32,
    #[serde(default = "default_count")]
    pub count: u32,
    pub weight: u32,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LootTable {
    pub id: String,
    pub entries: Vec<LootEntry>,
}

/// One awarded loot roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardGrant {
    pub table_id: String,
    pub item_def_id: i32,
    pub count: u32,
    pub source_kind: i32,
    pub source_def_id: i32,
}

/// Resolves and awards loot for the interpreter and resource modules.
pub trait RewardCollaborator: Send + Sync {
    /// Roll `table_id` for the player. `Ok(None)` means the table rolled nothing.
    fn give_loot_reward(
        &self,
        session: &mut PlayerSession,
        table_id: &str,
        source_kind: i32,
        source_def_id: i32,
    ) -> Result<Option<RewardGrant>, InteractionError>;
}

#[derive(Debug, Clone, Default)]
pub struct LootTables {
    tables: HashMap<String, LootTable>,
}

impl LootTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: LootTable) -> Self {
        self.tables.insert(table.id.clone(), table);
        self
    }

    pub fn get(&self, id: &str) -> Option<&LootTable> {
        self.tables.get(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse a JSON array of loot tables.
    pub fn from_json_str(contents: &str) -> Result<Self, InteractionError> {
        let tables: Vec<LootTable> = serde_json::from_str(contents)?;
        Ok(tables
            .into_iter()
            .fold(Self::new(), |acc, table| acc.with_table(table)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InteractionError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }
}

impl RewardCollaborator for LootTables {
    fn give_loot_reward(
        &self,
        session: &mut PlayerSession,
        table_id: &str,
        source_kind: i32,
        source_def_id: i32,
    ) -> Result<Option<RewardGrant>, InteractionError> {
        let table = self
            .tables
            .get(table_id)
            .ok_or_else(|| InteractionError::UnknownLootTable(table_id.to_string()))?;

        let weighted: Vec<(&LootEntry, u32)> =
            table.entries.iter().map(|e| (e, e.weight)).collect();
        let Some(entry) = select_weighted(&weighted, session.rng()) else {
            debug!("Loot table {} rolled nothing", table_id);
            return Ok(None);
        };

        let grant = RewardGrant {
            table_id: table_id.to_string(),
            item_def_id: entry.item_def_id,
            count: entry.count,
            source_kind,
            source_def_id,
        };
        debug!(
            "Granting {}x item {} from table {} to {}",
            grant.count, grant.item_def_id, table_id, session.account_id
        );
        session.rewards.push(grant.clone());
        Ok(Some(grant))
    }
}
