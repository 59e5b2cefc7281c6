use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::interactions::loot::RewardGrant;
use crate::interactions::packets::Packet;
use crate::interactions::sink::PacketSink;
use crate::interactions::types::{CommandList, GroupObject};

/// # Player Interaction Session
///
/// Per-player mutable interaction state. Owned by exactly one connection
/// worker and passed by `&mut` into the manager; never shared between players.
///
/// - `numeric_state` - current state key or counter value per object
/// - `active_branches` - the armed branch list per object (absent until the
///   first data request touches the object)
/// - `interactions` - object ids of the level the player is in
/// - `group_objects` - group objects the spawn strategy made visible
/// - `harvested` - resource nodes already collected in this level
/// - `lockpicks` - lockpicks held per group object in this level
/// - `collected_lockpicks` - lockpick items already picked up in this level
/// - `inspirations` - inspiration definitions unlocked (kept across levels)
/// - `open_shop` - the shop last opened by a shopkeeper
/// - `rewards` - loot granted during this session
///
/// Nothing here is persisted; [`PlayerSession::leave_level`] discards the
/// level-scoped parts when the player moves on.
pub struct PlayerSession {
    pub session_id: String,
    pub account_id: String,
    pub numeric_state: HashMap<String, i32>,
    pub active_branches: HashMap<String, CommandList>,
    pub interactions: HashSet<String>,
    pub group_objects: Vec<GroupObject>,
    pub harvested: HashSet<String>,
    pub lockpicks: HashMap<String, u32>,
    pub collected_lockpicks: HashSet<String>,
    pub inspirations: HashSet<i32>,
    pub open_shop: Option<i32>,
    pub rewards: Vec<RewardGrant>,
    rng: StdRng,
    sink: Box<dyn PacketSink>,
}

impl PlayerSession {
    pub fn new(account_id: impl Into<String>, sink: Box<dyn PacketSink>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            numeric_state: HashMap::new(),
            active_branches: HashMap::new(),
            interactions: HashSet::new(),
            group_objects: Vec::new(),
            harvested: HashSet::new(),
            lockpicks: HashMap::new(),
            collected_lockpicks: HashSet::new(),
            inspirations: HashSet::new(),
            open_shop: None,
            rewards: Vec::new(),
            rng: StdRng::from_entropy(),
            sink,
        }
    }

    /// Replace the session RNG with a deterministic one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn send(&mut self, packet: Packet) {
        self.sink.send(packet);
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn state_of(&self, object_id: &str) -> Option<i32> {
        self.numeric_state.get(object_id).copied()
    }

    pub fn set_state(&mut self, object_id: &str, value: i32) {
        self.numeric_state.insert(object_id.to_string(), value);
    }

    pub fn snapshot(&self, object_id: &str) -> Option<&CommandList> {
        self.active_branches.get(object_id)
    }

    pub fn arm_snapshot(&mut self, object_id: &str, commands: CommandList) {
        self.active_branches.insert(object_id.to_string(), commands);
    }

    pub fn clear_snapshot(&mut self, object_id: &str) {
        self.active_branches.remove(object_id);
    }

    pub fn is_group_visible(&self, group_id: &str) -> bool {
        self.group_objects.iter().any(|g| g.id == group_id)
    }

    /// Drop everything scoped to the current level.
    pub fn leave_level(&mut self) {
        self.numeric_state.clear();
        self.active_branches.clear();
        self.interactions.clear();
        self.group_objects.clear();
        self.harvested.clear();
        self.lockpicks.clear();
        self.collected_lockpicks.clear();
        self.open_shop = None;
    }
}

impl fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerSession")
            .field("session_id", &self.session_id)
            .field("account_id", &self.account_id)
            .field("numeric_state", &self.numeric_state)
            .field("active_branches", &self.active_branches.len())
            .field("interactions", &self.interactions.len())
            .field("group_objects", &self.group_objects)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::sink::RecordingSink;
    use crate::interactions::types::StateCommand;

    #[test]
    fn sessions_get_distinct_ids() {
        let a = PlayerSession::new("alice", Box::new(RecordingSink::new()));
        let b = PlayerSession::new("alice", Box::new(RecordingSink::new()));
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn leave_level_discards_level_state() {
        let mut session = PlayerSession::new("alice", Box::new(RecordingSink::new()));
        session.set_state("npc", 3);
        session.arm_snapshot("npc", vec![StateCommand::on_target(1)].into());
        session.interactions.insert("npc".into());
        session.harvested.insert("rock".into());
        session.leave_level();
        assert!(session.state_of("npc").is_none());
        assert!(session.snapshot("npc").is_none());
        assert!(session.interactions.is_empty());
        assert!(session.harvested.is_empty());
    }

    #[test]
    fn inspirations_survive_leaving_a_level() {
        let mut session = PlayerSession::new("alice", Box::new(RecordingSink::new()));
        session.inspirations.insert(4100);
        session.lockpicks.insert("grp".into(), 2);
        session.open_shop = Some(12);
        session.leave_level();
        assert!(session.inspirations.contains(&4100));
        assert!(session.lockpicks.is_empty());
        assert!(session.open_shop.is_none());
    }

    #[test]
    fn packets_go_to_the_sink_in_order() {
        let sink = RecordingSink::new();
        let mut session = PlayerSession::new("alice", Box::new(sink.clone()));
        session.send(Packet::state_command("a", 1, vec![]));
        session.send(Packet::state_command("a", 2, vec![]));
        let codes: Vec<i32> = sink
            .packets()
            .into_iter()
            .filter_map(|p| match p {
                Packet::StateCommand { code, .. } => Some(code),
                _ => None,
            })
            .collect();
        assert_eq!(codes, vec![1, 2]);
    }
}
