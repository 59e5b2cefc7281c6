//! # Worldlink - World Interaction Core for an Emulated Game Server
//!
//! Worldlink drives interactive world objects (quest givers, resource nodes,
//! shopkeepers, lockpicks, inspirations, group objects, counters) for
//! connected players. Authored content is a small
//! command language attached to every object; the crate evaluates it per
//! player and decides state transitions, reward grants and which packets the
//! client receives.
//!
//! ## Features
//!
//! - **World Registry**: JSON world data loaded once per process and shared read-only.
//! - **Module Chain**: Ordered interaction modules with first-claim-wins dispatch.
//! - **Command Interpreter**: Branch and state command lists with recursion and work limits.
//! - **Spawn Behaviours**: Pluggable selection of the group objects a player sees.
//! - **Loot Tables**: Weighted reward rolls with a per-session RNG.
//! - **Ordered Output**: Typed packets pushed to a per-connection sink in program order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worldlink::config::Config;
//! use worldlink::interactions::{InteractionManager, PlayerSession, QueueSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let manager = InteractionManager::from_config(&config)?;
//!
//!     let (sink, mut outbound) = QueueSink::channel();
//!     let mut session = PlayerSession::new("player-1", Box::new(sink));
//!     manager.init_interactions_for(&mut session, 820)?;
//!
//!     while let Ok(packet) = outbound.try_recv() {
//!         println!("{}", packet.encode());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`interactions`] - registry, module chain, interpreter and entry points
//! - [`config`] - configuration management and validation
//! - [`metrics`] - process-wide interaction counters
//! - [`logutil`] - single-line log formatting for authored content
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Connection worker   │ ← owns one PlayerSession
//! └──────────────────────┘
//!            │
//! ┌──────────────────────┐
//! │  InteractionManager  │ ← entry points, validity gate, snapshots
//! │  + Interpreter       │
//! └──────────────────────┘
//!            │
//! ┌──────────────────────┐
//! │  ModuleRegistry      │ ← module chain, spawn behaviours
//! │  WorldObjectRegistry │ ← static world data
//! └──────────────────────┘
//! ```

pub mod config;
pub mod interactions;
pub mod logutil;
pub mod metrics;
