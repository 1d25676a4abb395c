//! World substrate for the companion behavior core.
//!
//! The behavior controllers talk to their host only through the traits in
//! [`substrate`] and [`store`]. This crate defines those contracts and ships
//! an in-memory sandbox that implements them, so the core runs headless in
//! tests and in the simulation binary.
//!
//! # Modules
//!
//! - [`substrate`] -- Movement, perception, interaction and UI contracts
//! - [`store`] -- Replicated per-agent record with single-writer authority
//! - [`sandbox`] -- In-memory world implementing perception and interaction
//! - [`body`] -- Kinematic body implementing the movement driver
//! - [`terrain`] -- Ground heights, static obstacles, water
//! - [`entity`] -- Entity registry records and query filters
//! - [`fixture`] -- Production fixtures (smelters, kilns)
//! - [`inventory`] -- Slot- and weight-limited inventories
//! - [`error`] -- World, inventory and store errors

pub mod body;
pub mod entity;
pub mod error;
pub mod fixture;
pub mod inventory;
pub mod sandbox;
pub mod store;
pub mod substrate;
pub mod terrain;

pub use body::{Body, BodyParams};
pub use entity::{
    Container, Creature, Entity, EntityFilter, EntityKind, GroundItem, ResourceNode, Station,
};
pub use error::{InventoryError, StoreError, WorldError};
pub use fixture::{Conversion, Fixture, InsertRefusal};
pub use inventory::Inventory;
pub use sandbox::SandboxWorld;
pub use store::{MemoryStore, RecordChange, ReplicatedStore};
pub use substrate::{
    Hit, Interaction, MovementDriver, NoUi, Perception, StrikeOutcome, UiQuery, UiSessions, World,
};
pub use terrain::{Hill, JUMPABLE_HEIGHT, Obstacle, Pool, Terrain};
