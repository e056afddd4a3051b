//! # World Simulation Server
//!
//! Authoritative server for a persistent multiplayer world. It owns every
//! player's and monster's position, health, resources and combat state,
//! advances them on a fixed tick and resolves all actions itself. Clients
//! only send intents; whatever they believe is overridden by the next
//! snapshot.
//!
//! ## Tick order
//!
//! Each tick applies the intents buffered since the previous one, then
//! sweeps players (movement, casts, auto-attacks), mobs (AI and melee),
//! statuses and resources (DoT/HoT, regen, stance upkeep) and finally
//! world objects (node respawns, corpse expiry). The order is fixed, so
//! same-tick interactions resolve the same way every time.
//!
//! ## Modules
//!
//! - [`game`]: the [`game::GameState`] aggregate, intent dispatch and the tick
//! - [`world`], [`store`]: map geometry and id-keyed entity storage
//! - [`player`], [`mob`], [`ai`]: actors and the mob state machine
//! - [`combat`], [`status`], [`progression`]: abilities, effects, XP
//! - [`items`], [`economy`], [`gathering`], [`party`]: inventory, vendors,
//!   crafting, harvesting, corpses and groups
//! - [`client_manager`], [`snapshot`], [`persistence`], [`network`]: the
//!   transport-facing side
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::persistence::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("127.0.0.1:8080", 20);
//!     let mut server = Server::new(config, Arc::new(MemoryStore::new())).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod economy;
pub mod error;
pub mod game;
pub mod gathering;
pub mod items;
pub mod mob;
pub mod network;
pub mod party;
pub mod persistence;
pub mod player;
pub mod progression;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod utils;
pub mod world;
