//! Built-in interaction modules.
//!
//! - [`group`] hides members of group objects the spawn behaviour did not pick
//! - [`resource`] handles harvestable resource nodes and their loot
//! - [`inspiration`] unlocks collectible inspirations once per player
//! - [`lockpick`] counts lockpicks per group and spends them on command
//! - [`shopkeeper`] opens vendor shops on command
//! - [`quest`] seeds quest progress and accepts requests for stateful objects

pub mod group;
pub mod inspiration;
pub mod lockpick;
pub mod quest;
pub mod resource;
pub mod shopkeeper;

pub use group::GroupObjectModule;
pub use inspiration::InspirationCollectionModule;
pub use lockpick::{LockpickItemModule, USE_LOCKPICK_COMMAND};
pub use quest::QuestModule;
pub use resource::ResourceModule;
pub use shopkeeper::{ShopkeeperModule, OPEN_SHOP_COMMAND};
