//! Shopkeepers, lockpicks and inspirations driven through the manager.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use worldlink::config::ModulesConfig;
use worldlink::interactions::modules::{OPEN_SHOP_COMMAND, USE_LOCKPICK_COMMAND};
use worldlink::interactions::{
    GroupObjectDefinition, InteractionModule, ManagerSettings, ModuleRegistry, Packet,
    PlayerSession, RequestOutcome, StateCommand, WorldData, WorldObject, WorldObjectRegistry,
};

fn talk(commands: Vec<StateCommand>) -> Vec<StateCommand> {
    vec![StateCommand::on_target(10).with_branch(0, commands)]
}

fn level() -> WorldData {
    WorldData::new()
        .with_collection(
            "c",
            1,
            vec![
                WorldObject::new("keeper", 8, 300).with_state(
                    0,
                    talk(vec![
                        StateCommand::on_target(3).with_param("welcome"),
                        StateCommand::on_target(OPEN_SHOP_COMMAND).with_param("12"),
                    ]),
                ),
                WorldObject::new("pick_1", 9, 50),
                WorldObject::new("pick_2", 9, 50),
                WorldObject::new("door", 4, 61).with_state(
                    0,
                    talk(vec![
                        StateCommand::on_target(USE_LOCKPICK_COMMAND),
                        StateCommand::on_target(1).with_param("1"),
                    ]),
                ),
                WorldObject::new("idea", 6, 4100),
            ],
        )
        .with_group_object(
            1,
            GroupObjectDefinition::new("cellar", 2)
                .with_member("pick_1")
                .with_member("pick_2")
                .with_member("door"),
        )
}

#[test]
fn shopkeeper_opens_shop_from_a_data_request() {
    let manager = common::default_manager(level(), ManagerSettings::default());
    let (mut session, sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();
    sink.take();
    let keeper = manager.registry().resolve("keeper").unwrap();

    let outcome = manager.handle_interaction_data_request(&mut session, "keeper", &keeper, 0);
    assert_eq!(
        outcome,
        RequestOutcome::Executed {
            commands: 2,
            retried: false
        }
    );
    assert_eq!(session.open_shop, Some(12));
    assert_eq!(common::names(&sink.take()), vec!["direct-command", "open-shop"]);
    assert!(!manager.handle_interaction(&mut session, "keeper", &keeper, 0, false));
}

#[test]
fn lockpicks_are_collected_then_spent_on_the_door() {
    let manager = common::default_manager(level(), ManagerSettings::default());
    let (mut session, sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();
    sink.take();

    for id in ["pick_1", "pick_2"] {
        let pick = manager.registry().resolve(id).unwrap();
        assert!(manager.handle_interaction(&mut session, id, &pick, 0, false));
    }
    assert_eq!(session.lockpicks["cellar"], 2);
    assert_eq!(
        sink.take().last(),
        Some(&Packet::LockpickCount {
            group_id: "cellar".into(),
            count: 2
        })
    );

    let door = manager.registry().resolve("door").unwrap();
    manager.handle_interaction_data_request(&mut session, "door", &door, 0);
    assert_eq!(session.lockpicks["cellar"], 1);
    assert_eq!(session.state_of("door"), Some(1));
    assert!(sink.packets().contains(&Packet::LockpickCount {
        group_id: "cellar".into(),
        count: 1
    }));

    // A collected pick is gone for the rest of the visit.
    let pick = manager.registry().resolve("pick_1").unwrap();
    assert_eq!(
        manager.handle_interaction_data_request(&mut session, "pick_1", &pick, 0),
        RequestOutcome::Denied
    );
    sink.take();
    manager.init_interactions_for(&mut session, 1).unwrap();
    assert!(!sink.packets().iter().any(|p| {
        matches!(p, Packet::Spawn(s) if s.object_id == "pick_1")
    }));

    session.leave_level();
    assert!(session.lockpicks.is_empty());
    assert!(session.collected_lockpicks.is_empty());
}

#[test]
fn inspiration_survives_level_changes() {
    let manager = common::default_manager(level(), ManagerSettings::default());
    let (mut session, sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();
    sink.take();
    let idea = manager.registry().resolve("idea").unwrap();

    assert!(manager.handle_interaction(&mut session, "idea", &idea, 0, false));
    assert_eq!(sink.take(), vec![Packet::InspirationUnlocked { def_id: 4100 }]);
    assert!(!manager.handle_interaction(&mut session, "idea", &idea, 0, false));
    assert!(sink.is_empty());

    session.leave_level();
    manager.init_interactions_for(&mut session, 1).unwrap();
    assert!(!sink.packets().iter().any(|p| {
        matches!(p, Packet::Spawn(s) if s.object_id == "idea")
    }));
    assert_eq!(
        manager.handle_interaction_data_request(&mut session, "idea", &idea, 0),
        RequestOutcome::Denied
    );
}

#[test]
fn archetypes_follow_configuration() {
    let config = ModulesConfig {
        shopkeeper_archetypes: vec![2],
        ..ModulesConfig::default()
    };
    let npc = WorldObject::new("npc", 2, 1).with_state(
        0,
        talk(vec![StateCommand::on_target(OPEN_SHOP_COMMAND).with_param("3")]),
    );
    let data = WorldData::new().with_collection("c", 1, vec![npc]);
    let registry = Arc::new(WorldObjectRegistry::from_data(data.clone()));
    let rewards: Arc<dyn worldlink::interactions::RewardCollaborator> =
        Arc::new(common::loot_tables());
    let modules = ModuleRegistry::with_defaults(registry, rewards, &config);
    let manager = common::manager_with_modules(data, modules, ManagerSettings::default());
    let (mut session, _sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();
    let npc = manager.registry().resolve("npc").unwrap();

    manager.handle_interaction_data_request(&mut session, "npc", &npc, 0);
    assert_eq!(session.open_shop, Some(3));
}

/// Counts the commands offered to it and claims code 90 only.
struct Claims90 {
    offered: AtomicUsize,
}

impl InteractionModule for Claims90 {
    fn name(&self) -> &'static str {
        "claims-90"
    }

    fn handle_command(
        &self,
        _session: &mut PlayerSession,
        _target_id: &str,
        _object: &WorldObject,
        command: &StateCommand,
        _parent: Option<&StateCommand>,
    ) -> bool {
        self.offered.fetch_add(1, Ordering::SeqCst);
        command.code == 90
    }
}

#[test]
fn command_claimed_by_earlier_module_is_not_offered_further() {
    let registry = Arc::new(WorldObjectRegistry::from_data(level()));
    let rewards: Arc<dyn worldlink::interactions::RewardCollaborator> =
        Arc::new(common::loot_tables());
    let mut modules =
        ModuleRegistry::with_defaults(registry, rewards, &ModulesConfig::default());
    let tail = Arc::new(Claims90 {
        offered: AtomicUsize::new(0),
    });
    modules.register_module(tail.clone());
    let manager = common::manager_with_modules(level(), modules, ManagerSettings::default());
    let (mut session, _sink) = common::session();
    manager.init_interactions_for(&mut session, 1).unwrap();
    let keeper = manager.registry().resolve("keeper").unwrap();

    manager.handle_interaction_data_request(&mut session, "keeper", &keeper, 0);
    assert_eq!(session.open_shop, Some(12));
    assert_eq!(tail.offered.load(Ordering::SeqCst), 0);

    let extra = vec![
        StateCommand::on_target(90),
        StateCommand::on_target(OPEN_SHOP_COMMAND).with_param("40"),
    ];
    manager.run_states(&mut session, &extra, "keeper", &keeper);
    assert_eq!(tail.offered.load(Ordering::SeqCst), 1);
    assert_eq!(session.open_shop, Some(40));
}
