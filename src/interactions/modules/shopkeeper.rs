use log::{debug, warn};
use std::collections::HashSet;

use crate::interactions::module::{DataRequestVerdict, InteractionModule};
use crate::interactions::packets::Packet;
use crate::interactions::session::PlayerSession;
use crate::interactions::types::{StateCommand, WorldObject};

/// Command code that opens a shop window: `[shop_id]`.
pub const OPEN_SHOP_COMMAND: i32 = 84;

/// Vendors. Talking to one always succeeds; their authored content opens the
/// shop with [`OPEN_SHOP_COMMAND`].
pub struct ShopkeeperModule {
    archetypes: HashSet<i32>,
}

impl ShopkeeperModule {
    pub fn new(archetypes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            archetypes: archetypes.into_iter().collect(),
        }
    }

    fn is_shopkeeper(&self, object: &WorldObject) -> bool {
        self.archetypes.contains(&object.kind())
    }
}

impl InteractionModule for ShopkeeperModule {
    fn name(&self) -> &'static str {
        "shopkeeper"
    }

    fn can_handle(&self, _session: &PlayerSession, _id: &str, object: &WorldObject) -> bool {
        self.is_shopkeeper(object)
    }

    fn handle_interaction_success(
        &self,
        _session: &mut PlayerSession,
        _id: &str,
        _object: &WorldObject,
        _state: i32,
    ) -> bool {
        true
    }

    fn is_data_request_valid(
        &self,
        _session: &PlayerSession,
        _id: &str,
        object: &WorldObject,
        _state: i32,
    ) -> DataRequestVerdict {
        if self.is_shopkeeper(object) {
            DataRequestVerdict::Accept
        } else {
            DataRequestVerdict::NotApplicable
        }
    }

    fn handle_command(
        &self,
        session: &mut PlayerSession,
        target_id: &str,
        object: &WorldObject,
        command: &StateCommand,
        _parent: Option<&StateCommand>,
    ) -> bool {
        if command.code != OPEN_SHOP_COMMAND || !self.is_shopkeeper(object) {
            return false;
        }
        let shop_id = match command.int_param(0) {
            Ok(id) => id,
            Err(e) => {
                warn!("Open shop on {}: {}", target_id, e);
                return true;
            }
        };
        debug!("{} opened shop {} at {}", session.account_id, shop_id, target_id);
        session.open_shop = Some(shop_id);
        session.send(Packet::OpenShop {
            object_id: target_id.to_string(),
            shop_id,
        });
        true
    }
}
