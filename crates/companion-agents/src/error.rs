//! Error types for the companion-agents crate.
//!
//! [`BehaviorError`] is the control-flow taxonomy every controller maps
//! world failures onto. None of its variants is fatal: each one names the
//! recovery a controller takes (abandon the sub-task, escalate, notify the
//! owner, or try another candidate). [`AgentError`] covers agent
//! bookkeeping outside the tick.

use companion_types::{AgentId, EntityId, NoticeKind};
use companion_world::{InventoryError, WorldError};

/// Failure classes seen by behavior controllers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BehaviorError {
    /// The target no longer resolves to a live, in-bounds entity.
    #[error("target {target} is no longer valid")]
    TargetInvalid {
        /// The stale target.
        target: EntityId,
    },

    /// Navigation made no progress toward the target.
    #[error("target {target} is unreachable")]
    Unreachable {
        /// The unreachable target.
        target: EntityId,
    },

    /// The agent lacks something it needs (space, tool, material).
    #[error("resource exhausted: {kind:?}")]
    ResourceExhausted {
        /// The notice raised for the owner.
        kind: NoticeKind,
    },

    /// The target is momentarily busy; another candidate should be tried.
    #[error("target {target} is busy")]
    TransientBusy {
        /// The busy target.
        target: EntityId,
    },
}

impl BehaviorError {
    /// Classify a world interaction failure against `target`.
    pub fn from_world(target: EntityId, error: &WorldError) -> Self {
        match error {
            WorldError::EntityNotFound(_)
            | WorldError::WrongKind { .. }
            | WorldError::Inactive(_)
            | WorldError::NothingToRelease(_)
            | WorldError::NotAccepted { .. } => Self::TargetInvalid { target },
            WorldError::TierTooLow { .. } => Self::ResourceExhausted {
                kind: NoticeKind::ToolTierTooLow,
            },
            WorldError::ContainerInUse { .. }
            | WorldError::ContainerNotOpen { .. }
            | WorldError::FixtureFull(_)
            | WorldError::DropClaimed { .. }
            | WorldError::VehicleOccupied(_) => Self::TransientBusy { target },
            WorldError::Inventory { .. } => Self::ResourceExhausted {
                kind: NoticeKind::InventoryFull,
            },
        }
    }
}

/// Errors from agent management.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// Agent with the given ID was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Agent name already exists in the manager.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    /// No item with this name can be equipped.
    #[error("nothing equippable named {name}")]
    NotEquippable {
        /// The requested item.
        name: String,
    },

    /// An inventory operation failed.
    #[error("inventory error: {source}")]
    Inventory {
        /// The underlying inventory error.
        #[from]
        source: InventoryError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_container_is_transient() {
        let target = EntityId::new();
        let err = WorldError::ContainerInUse {
            container: target,
            holder: AgentId::new(),
        };
        assert_eq!(
            BehaviorError::from_world(target, &err),
            BehaviorError::TransientBusy { target }
        );
    }

    #[test]
    fn missing_entity_is_invalid_target() {
        let target = EntityId::new();
        let err = WorldError::EntityNotFound(target);
        assert!(matches!(
            BehaviorError::from_world(target, &err),
            BehaviorError::TargetInvalid { .. }
        ));
    }
}
