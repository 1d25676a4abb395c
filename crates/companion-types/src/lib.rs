//! Shared type definitions for the companion behavior core.
//!
//! This crate is the vocabulary every other crate in the workspace speaks:
//! the world substrate, the behavior controllers, and the simulation driver.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers for agents, entities, and peers
//! - [`enums`] -- Modes, resource kinds, blacklist reasons, movement owners
//! - [`geometry`] -- [`Vec3`] and horizontal-plane helpers
//! - [`structs`] -- Item records, the replicated record, tracker samples

pub mod enums;
pub mod geometry;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AgentClass, BlacklistReason, HarvestPhase, ItemCategory, Mode, MovementOwner, NoticeKind,
    ResourceKind, SmeltPhase, StationKind, ToolClass,
};
pub use geometry::Vec3;
pub use ids::{AgentId, EntityId, PeerId};
pub use structs::{
    DEFAULT_MAX_STACK, Durability, ItemRecord, Notice, PositionSample, ReplicatedRecord,
    ToolProfile, WeaponProfile,
};
