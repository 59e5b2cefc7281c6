//! Test utilities & fixtures.
//! Builds in-memory worlds and managers wired to a recording sink.

use std::sync::Arc;

use worldlink::config::ModulesConfig;
use worldlink::interactions::{
    InteractionManager, LootEntry, LootTable, LootTables, ManagerSettings, ModuleRegistry,
    Packet, PlayerSession, RecordingSink, RewardCollaborator, WorldData, WorldObjectRegistry,
};

/// Loot tables used across tests: `quest_reward` always yields item 8001,
/// `500` (the sample ore node) yields two of item 6100.
#[allow(dead_code)]
pub fn loot_tables() -> LootTables {
    LootTables::new()
        .with_table(LootTable {
            id: "quest_reward".into(),
            entries: vec![LootEntry {
                item_def_id: 8001,
                count: 1,
                weight: 1,
            }],
        })
        .with_table(LootTable {
            id: "500".into(),
            entries: vec![LootEntry {
                item_def_id: 6100,
                count: 2,
                weight: 1,
            }],
        })
}

/// Manager with the built-in modules and their default archetypes: resource 5,
/// inspiration 6, shopkeeper 8, lockpick 9.
#[allow(dead_code)]
pub fn default_manager(data: WorldData, settings: ManagerSettings) -> InteractionManager {
    let registry = Arc::new(WorldObjectRegistry::from_data(data));
    let rewards: Arc<dyn RewardCollaborator> = Arc::new(loot_tables());
    let modules = Arc::new(ModuleRegistry::with_defaults(
        registry.clone(),
        rewards.clone(),
        &ModulesConfig::default(),
    ));
    InteractionManager::new(registry, modules, rewards, settings)
}

/// Manager with a caller-supplied module chain.
#[allow(dead_code)]
pub fn manager_with_modules(
    data: WorldData,
    modules: ModuleRegistry,
    settings: ManagerSettings,
) -> InteractionManager {
    let registry = Arc::new(WorldObjectRegistry::from_data(data));
    let rewards: Arc<dyn RewardCollaborator> = Arc::new(loot_tables());
    InteractionManager::new(registry, Arc::new(modules), rewards, settings)
}

/// Manager with no interaction modules at all.
#[allow(dead_code)]
pub fn bare_manager(data: WorldData) -> InteractionManager {
    manager_with_modules(data, ModuleRegistry::new(), ManagerSettings::default())
}

/// Seeded session plus a handle on everything it sends.
#[allow(dead_code)]
pub fn session() -> (PlayerSession, RecordingSink) {
    let sink = RecordingSink::new();
    let session = PlayerSession::new("tester", Box::new(sink.clone())).with_seed(7);
    (session, sink)
}

/// Parameters of every direct command packet, in send order.
#[allow(dead_code)]
pub fn direct_params(packets: &[Packet]) -> Vec<String> {
    packets
        .iter()
        .filter_map(|p| match p {
            Packet::DirectCommand { params, .. } => Some(params.join(",")),
            _ => None,
        })
        .collect()
}

/// Packet names in send order.
#[allow(dead_code)]
pub fn names(packets: &[Packet]) -> Vec<&'static str> {
    packets.iter().map(Packet::name).collect()
}
