//! Outbound packets produced by the interaction engine.
//!
//! The engine only builds typed [`Packet`] values and hands them to the
//! session's sink. [`Packet::encode`] renders the `%xt%` text framing the
//! game client speaks, which is what the CLI prints and what debug logs show.

use crate::interactions::types::{GroupObject, Quaternion, Vec3, WorldObject};

/// Trailing flags string sent with fallback spawn packets.
pub const FALLBACK_SPAWN_FLAGS: &str = "0%0%0%0.0%0%0%0";

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummaryEntry {
    pub id: String,
    pub kind: i32,
    pub def_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPacket {
    pub object_id: String,
    pub kind: i32,
    pub owner_id: String,
    /// Creation time, UTC seconds.
    pub created_at: i64,
    pub position: Vec3,
    pub rotation: Quaternion,
    pub flags: String,
}

impl SpawnPacket {
    /// Generic spawn used when no module claims an object.
    pub fn fallback(id: &str, object: &WorldObject, created_at: i64) -> Self {
        Self {
            object_id: id.to_string(),
            kind: object.primary_info.kind,
            owner_id: String::new(),
            created_at,
            position: object.location_info.position,
            rotation: object.location_info.rotation,
            flags: FALLBACK_SPAWN_FLAGS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Batched list of every object in the level with archetype and definition id.
    ObjectSummary { objects: Vec<ObjectSummaryEntry> },
    /// Batched list of the group objects visible to the player.
    GroupObjectSummary { groups: Vec<GroupObject> },
    /// Baseline substate for objects that have no authored states.
    InitialSubstate { object_id: String },
    Spawn(SpawnPacket),
    /// State change / quest command notification.
    StateCommand {
        actor_id: String,
        code: i32,
        params: Vec<String>,
    },
    /// Counter-variable flavour of [`Packet::StateCommand`].
    CounterCommand {
        actor_id: String,
        code: i32,
        params: Vec<String>,
    },
    /// Raw command forwarded to the client (codes 3 and 35).
    DirectCommand {
        code: i32,
        target_id: String,
        params: Vec<String>,
    },
    /// A shopkeeper opened its shop for the player.
    OpenShop { object_id: String, shop_id: i32 },
    /// An inspiration definition was unlocked.
    InspirationUnlocked { def_id: i32 },
    /// Lockpicks the player now holds for a group object.
    LockpickCount { group_id: String, count: u32 },
}

impl Packet {
    pub fn state_command(actor_id: impl Into<String>, code: i32, params: Vec<String>) -> Self {
        Packet::StateCommand {
            actor_id: actor_id.into(),
            code,
            params,
        }
    }

    pub fn counter_command(actor_id: impl Into<String>, code: i32, params: Vec<String>) -> Self {
        Packet::CounterCommand {
            actor_id: actor_id.into(),
            code,
            params,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::ObjectSummary { .. } => "object-summary",
            Packet::GroupObjectSummary { .. } => "group-object-summary",
            Packet::InitialSubstate { .. } => "initial-substate",
            Packet::Spawn(_) => "spawn",
            Packet::StateCommand { .. } => "state-command",
            Packet::CounterCommand { .. } => "counter-command",
            Packet::DirectCommand { .. } => "direct-command",
            Packet::OpenShop { .. } => "open-shop",
            Packet::InspirationUnlocked { .. } => "inspiration-unlocked",
            Packet::LockpickCount { .. } => "lockpick-count",
        }
    }

    /// Render the packet in `%xt%` text framing.
    pub fn encode(&self) -> String {
        match self {
            Packet::ObjectSummary { objects } => {
                let mut w = XtWriter::new("qs");
                w.write_str("-1").write_str("-1036").write_str("24");
                w.write_int(objects.len() as i64);
                for entry in objects {
                    w.write_str(&entry.id)
                        .write_int(entry.kind as i64)
                        .write_int(entry.def_id as i64);
                }
                w.finish()
            }
            Packet::GroupObjectSummary { groups } => {
                let mut w = XtWriter::new("qsgo");
                w.write_str("-1").write_int(groups.len() as i64);
                for group in groups {
                    w.write_str(&group.id).write_int(group.kind as i64);
                }
                w.finish()
            }
            Packet::InitialSubstate { object_id } => {
                let mut w = XtWriter::new("qcmd");
                w.write_str("-1")
                    .write_str("1")
                    .write_str(object_id)
                    .write_str("0")
                    .write_str("0")
                    .write_str("1");
                w.finish()
            }
            Packet::Spawn(spawn) => {
                let mut w = XtWriter::new("oi");
                w.write_int(-1)
                    .write_str(&spawn.object_id)
                    .write_int(spawn.kind as i64)
                    .write_str(&spawn.owner_id)
                    .write_int(0)
                    .write_int(spawn.created_at)
                    .write_float(spawn.position.x)
                    .write_float(spawn.position.y)
                    .write_float(spawn.position.z)
                    .write_float(spawn.rotation.x)
                    .write_float(spawn.rotation.y)
                    .write_float(spawn.rotation.z)
                    .write_float(spawn.rotation.w)
                    .write_raw(&spawn.flags);
                w.finish()
            }
            Packet::StateCommand {
                actor_id,
                code,
                params,
            } => command_frame("qcmd", *code, actor_id, params),
            Packet::CounterCommand {
                actor_id,
                code,
                params,
            } => command_frame("qcmdvt", *code, actor_id, params),
            Packet::DirectCommand {
                code,
                target_id,
                params,
            } => command_frame("qcmd", *code, target_id, params),
            Packet::OpenShop { object_id, shop_id } => {
                let mut w = XtWriter::new("sho");
                w.write_int(-1).write_str(object_id).write_int(*shop_id as i64);
                w.finish()
            }
            Packet::InspirationUnlocked { def_id } => {
                let mut w = XtWriter::new("iu");
                w.write_int(-1).write_int(*def_id as i64);
                w.finish()
            }
            Packet::LockpickCount { group_id, count } => {
                let mut w = XtWriter::new("lpc");
                w.write_int(-1).write_str(group_id).write_int(*count as i64);
                w.finish()
            }
        }
    }
}

fn command_frame(message: &str, code: i32, id: &str, params: &[String]) -> String {
    let mut w = XtWriter::new(message);
    w.write_int(-1)
        .write_int(code as i64)
        .write_int(0)
        .write_str(id)
        .write_int(0);
    for param in params {
        w.write_str(param);
    }
    w.finish()
}

/// Builder for `%`-separated xt frames.
#[derive(Debug, Clone)]
pub struct XtWriter {
    fields: Vec<String>,
}

impl XtWriter {
    pub fn new(message: &str) -> Self {
        Self {
            fields: vec!["xt".to_string(), message.to_string()],
        }
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn write_int(&mut self, value: i64) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    /// Floats always carry a decimal point (`1.0`, not `1`).
    pub fn write_float(&mut self, value: f64) -> &mut Self {
        self.fields.push(format!("{:?}", value));
        self
    }

    /// Append pre-framed text verbatim (may itself contain separators).
    pub fn write_raw(&mut self, value: &str) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    /// Close the frame with the empty data suffix.
    pub fn finish(&mut self) -> String {
        self.fields.push(String::new());
        format!("%{}%", self.fields.join("%"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_summary_frame() {
        let packet = Packet::ObjectSummary {
            objects: vec![
                ObjectSummaryEntry {
                    id: "x1".into(),
                    kind: 2,
                    def_id: 100,
                },
                ObjectSummaryEntry {
                    id: "x2".into(),
                    kind: 5,
                    def_id: 200,
                },
            ],
        };
        assert_eq!(packet.encode(), "%xt%qs%-1%-1036%24%2%x1%2%100%x2%5%200%%");
    }

    #[test]
    fn spawn_frame_keeps_float_points() {
        let object = WorldObject::new("rock", 4, 12)
            .with_location(Vec3::new(1.0, 2.5, -3.0), Quaternion::default());
        let packet = Packet::Spawn(SpawnPacket::fallback("rock", &object, 1_700_000_000));
        assert_eq!(
            packet.encode(),
            "%xt%oi%-1%rock%4%%0%1700000000%1.0%2.5%-3.0%0.0%0.0%0.0%1.0%0%0%0%0.0%0%0%0%%"
        );
    }

    #[test]
    fn state_command_frame() {
        let packet = Packet::state_command("npc", 1, vec!["2".into()]);
        assert_eq!(packet.encode(), "%xt%qcmd%-1%1%0%npc%0%2%%");
        assert_eq!(packet.name(), "state-command");
    }

    #[test]
    fn module_frames() {
        let shop = Packet::OpenShop {
            object_id: "keeper".into(),
            shop_id: 12,
        };
        assert_eq!(shop.encode(), "%xt%sho%-1%keeper%12%%");
        assert_eq!(
            Packet::InspirationUnlocked { def_id: 4100 }.encode(),
            "%xt%iu%-1%4100%%"
        );
        let picks = Packet::LockpickCount {
            group_id: "grp".into(),
            count: 2,
        };
        assert_eq!(picks.encode(), "%xt%lpc%-1%grp%2%%");
        assert_eq!(picks.name(), "lockpick-count");
    }
}
