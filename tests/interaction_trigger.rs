//! Interaction completion: module order, destroy flag and resource rewards.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use worldlink::interactions::{
    InteractionModule, ManagerSettings, ModuleRegistry, PlayerSession, StateCommand, WorldData,
    WorldObject,
};

fn level() -> WorldData {
    WorldData::new().with_collection(
        "c",
        1,
        vec![
            WorldObject::new("ore", 5, 500),
            WorldObject::new("npc", 2, 77)
                .with_state(0, vec![StateCommand::on_target(3)])
                .with_state(1, vec![]),
        ],
    )
}

#[test]
fn unclaimed_interaction_keeps_the_flag() {
    let manager = common::bare_manager(level());
    let object = manager.registry().resolve("ore").unwrap();
    let (mut session, sink) = common::session();

    assert!(manager.handle_interaction(&mut session, "ore", &object, 0, true));
    assert!(!manager.handle_interaction(&mut session, "ore", &object, 0, false));
    assert!(sink.is_empty());
}

#[test]
fn resource_harvest_destroys_node_and_grants_loot_once() {
    let manager = common::default_manager(level(), ManagerSettings::default());
    let object = manager.registry().resolve("ore").unwrap();
    let (mut session, _sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();

    assert!(manager.handle_interaction(&mut session, "ore", &object, 0, false));
    assert!(session.harvested.contains("ore"));
    assert_eq!(session.rewards.len(), 1);
    let grant = &session.rewards[0];
    assert_eq!(grant.table_id, "500");
    assert_eq!(grant.item_def_id, 6100);
    assert_eq!(grant.count, 2);
    assert_eq!(grant.source_kind, 5);
    assert_eq!(grant.source_def_id, 500);

    // A harvested node keeps the caller's flag and pays nothing.
    assert!(!manager.handle_interaction(&mut session, "ore", &object, 0, false));
    assert!(manager.handle_interaction(&mut session, "ore", &object, 0, true));
    assert_eq!(session.rewards.len(), 1);
}

#[test]
fn harvested_node_is_not_respawned_while_in_level() {
    let manager = common::default_manager(level(), ManagerSettings::default());
    let object = manager.registry().resolve("ore").unwrap();
    let (mut session, sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();
    manager.handle_interaction(&mut session, "ore", &object, 0, false);
    sink.take();

    manager.init_interactions_for(&mut session, 1).unwrap();
    let spawned_ore = sink.packets().iter().any(|p| {
        matches!(p, worldlink::interactions::Packet::Spawn(s) if s.object_id == "ore")
    });
    assert!(!spawned_ore);

    // Leaving the level forgets the harvest.
    session.leave_level();
    sink.take();
    manager.init_interactions_for(&mut session, 1).unwrap();
    assert!(sink.packets().iter().any(|p| {
        matches!(p, worldlink::interactions::Packet::Spawn(s) if s.object_id == "ore")
    }));
}

#[test]
fn quest_success_depends_on_authored_state() {
    let manager = common::default_manager(level(), ManagerSettings::default());
    let object = manager.registry().resolve("npc").unwrap();
    let (mut session, _sink) = common::session();

    // Not yet part of the player's level: the quest module ignores it.
    assert!(!manager.handle_interaction(&mut session, "npc", &object, 1, false));

    manager.init_interactions_for(&mut session, 1).unwrap();
    assert!(!manager.handle_interaction(&mut session, "npc", &object, 1, false));
    assert!(manager.handle_interaction(&mut session, "npc", &object, 9, true));
    assert!(session.rewards.is_empty());
}

/// Claims everything, flips the flag on, then reports failure.
struct Declines {
    calls: AtomicUsize,
}

impl InteractionModule for Declines {
    fn name(&self) -> &'static str {
        "declines"
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, _object: &WorldObject) -> bool {
        true
    }

    fn should_destroy_resource(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
        _destroy_on_completion: bool,
    ) -> bool {
        true
    }

    fn handle_interaction_success(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }
}

/// Claims everything and succeeds, leaving the flag as it found it.
struct Accepts {
    calls: AtomicUsize,
}

impl InteractionModule for Accepts {
    fn name(&self) -> &'static str {
        "accepts"
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, _object: &WorldObject) -> bool {
        true
    }

    fn handle_interaction_success(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[test]
fn failed_success_falls_through_to_next_module() {
    let declines = Arc::new(Declines {
        calls: AtomicUsize::new(0),
    });
    let accepts = Arc::new(Accepts {
        calls: AtomicUsize::new(0),
    });
    let mut modules = ModuleRegistry::new();
    modules.register_module(declines.clone());
    modules.register_module(accepts.clone());
    let manager = common::manager_with_modules(level(), modules, ManagerSettings::default());
    let object = manager.registry().resolve("npc").unwrap();
    let (mut session, _sink) = common::session();

    // The flag set by the first module is carried into the second.
    assert!(manager.handle_interaction(&mut session, "npc", &object, 0, false));
    assert_eq!(declines.calls.load(Ordering::SeqCst), 1);
    assert_eq!(accepts.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn first_successful_module_stops_the_chain() {
    let accepts = Arc::new(Accepts {
        calls: AtomicUsize::new(0),
    });
    let declines = Arc::new(Declines {
        calls: AtomicUsize::new(0),
    });
    let mut modules = ModuleRegistry::new();
    modules.register_module(accepts.clone());
    modules.register_module(declines.clone());
    let manager = common::manager_with_modules(level(), modules, ManagerSettings::default());
    let object = manager.registry().resolve("npc").unwrap();
    let (mut session, _sink) = common::session();

    assert!(!manager.handle_interaction(&mut session, "npc", &object, 0, false));
    assert_eq!(accepts.calls.load(Ordering::SeqCst), 1);
    assert_eq!(declines.calls.load(Ordering::SeqCst), 0);
}
