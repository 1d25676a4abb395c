//! Error types for the `companion-world` crate.
//!
//! World interactions, inventory transfers and replicated-store writes each
//! have their own error enum. Behavior controllers map these onto their
//! failure taxonomy; none of them is ever fatal to a tick.

use companion_types::{AgentId, EntityId, PeerId};

/// Errors from inventory operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    /// Adding the item would exceed the weight limit.
    #[error("adding {item} ({weight} kg) would exceed capacity (current: {current} kg, capacity: {capacity} kg)")]
    Overweight {
        /// Item name.
        item: String,
        /// Weight of the stack being added.
        weight: f32,
        /// Current total weight.
        current: f32,
        /// Maximum weight.
        capacity: f32,
    },

    /// No slot is free for the item.
    #[error("no free slot for {item}")]
    NoFreeSlot {
        /// Item name.
        item: String,
    },

    /// Attempted to remove more than is held.
    #[error("insufficient {item}: wanted {requested} but only have {available}")]
    Insufficient {
        /// Item name.
        item: String,
        /// Quantity requested.
        requested: u32,
        /// Quantity available.
        available: u32,
    },
}

/// Errors from world interactions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// The entity does not exist (destroyed, despawned, never existed).
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity exists but is not the expected kind.
    #[error("entity {entity} is not a {expected}")]
    WrongKind {
        /// The entity.
        entity: EntityId,
        /// The expected kind.
        expected: &'static str,
    },

    /// The entity is not active.
    #[error("entity {0} is inactive")]
    Inactive(EntityId),

    /// The target requires a better tool.
    #[error("entity {entity} requires tier {required}, tool provides {provided}")]
    TierTooLow {
        /// The target.
        entity: EntityId,
        /// Tier required.
        required: u8,
        /// Tier provided.
        provided: u8,
    },

    /// Someone else has the container open.
    #[error("container {container} is in use by {holder}")]
    ContainerInUse {
        /// The container.
        container: EntityId,
        /// The agent holding it open.
        holder: AgentId,
    },

    /// The container must be opened by the caller first.
    #[error("container {container} is not open for {agent}")]
    ContainerNotOpen {
        /// The container.
        container: EntityId,
        /// The caller.
        agent: AgentId,
    },

    /// The fixture cannot take more of this item.
    #[error("fixture {0} is full")]
    FixtureFull(EntityId),

    /// The fixture does not accept this item.
    #[error("fixture {fixture} does not accept {item}")]
    NotAccepted {
        /// The fixture.
        fixture: EntityId,
        /// The rejected item.
        item: String,
    },

    /// The fixture has no finished output.
    #[error("fixture {0} has nothing to release")]
    NothingToRelease(EntityId),

    /// Another agent already claimed this drop.
    #[error("drop {drop} is claimed by {holder}")]
    DropClaimed {
        /// The drop.
        drop: EntityId,
        /// The claiming agent.
        holder: AgentId,
    },

    /// The vehicle already carries an attached agent.
    #[error("vehicle {0} is occupied")]
    VehicleOccupied(EntityId),

    /// An inventory transfer failed.
    #[error("inventory error: {source}")]
    Inventory {
        /// The underlying inventory error.
        #[from]
        source: InventoryError,
    },
}

/// Errors from the replicated store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The writing peer does not hold authority over the agent.
    #[error("peer {peer} is not authoritative for agent {agent}")]
    NotAuthoritative {
        /// The agent.
        agent: AgentId,
        /// The rejected peer.
        peer: PeerId,
    },

    /// The agent has no record.
    #[error("no replicated record for agent {0}")]
    UnknownAgent(AgentId),
}
