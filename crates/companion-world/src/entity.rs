//! World entities an agent can perceive and target.
//!
//! Every entity has a stable [`EntityId`], a ground position, a bounding
//! radius and an `active` flag that mirrors whether its backing record is
//! still live. The payload in [`EntityKind`] carries kind-specific state.

use companion_types::{AgentId, EntityId, ItemRecord, ResourceKind, StationKind, Vec3};
use serde::{Deserialize, Serialize};

use crate::fixture::Fixture;
use crate::inventory::Inventory;

/// A harvestable resource node (tree, rock, ore deposit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// What it yields.
    pub kind: ResourceKind,
    /// Minimum tool tier that damages it.
    pub tier: u8,
    /// Remaining health.
    pub health: f32,
    /// Health when spawned.
    pub max_health: f32,
    /// Items dropped on destruction.
    pub yields: Vec<ItemRecord>,
}

/// A storage container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Contents.
    pub inventory: Inventory,
    /// The agent currently holding it open.
    pub opened_by: Option<AgentId>,
}

/// An item lying on the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundItem {
    /// The stack.
    pub item: ItemRecord,
    /// The agent that reserved it for pickup.
    pub claimed_by: Option<AgentId>,
}

/// A creature that can be fought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    /// Remaining health.
    pub health: f32,
    /// Health when spawned.
    pub max_health: f32,
    /// Whether it attacks companions and players.
    pub hostile: bool,
}

/// A static station (workbench, bed, fire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Purpose.
    pub kind: StationKind,
    /// Highest item tier it can repair.
    pub tier: u8,
}

/// Kind-specific entity payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Harvestable node.
    Resource(ResourceNode),
    /// Production fixture.
    Fixture(Fixture),
    /// Storage container.
    Container(Container),
    /// Ground item.
    Drop(GroundItem),
    /// Door; `true` when open.
    Door(bool),
    /// Creature.
    Creature(Creature),
    /// Station.
    Station(Station),
    /// Cart or boat an agent can attach to.
    Vehicle(Option<AgentId>),
}

/// A perceivable world entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable key.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Ground position of the base.
    pub position: Vec3,
    /// Horizontal bounding radius.
    pub radius: f32,
    /// Vertical extent above `position`.
    pub height: f32,
    /// Whether the backing record is live.
    pub active: bool,
    /// Kind-specific payload.
    pub kind: EntityKind,
}

impl Entity {
    /// Geometric center, used for line-of-sight and facing.
    pub fn center(&self) -> Vec3 {
        self.position + Vec3::new(0.0, self.height * 0.5, 0.0)
    }

    /// Whether this entity physically blocks walking.
    pub const fn is_solid(&self) -> bool {
        match &self.kind {
            EntityKind::Resource(_)
            | EntityKind::Fixture(_)
            | EntityKind::Container(_)
            | EntityKind::Station(_) => true,
            EntityKind::Door(open) => !*open,
            EntityKind::Drop(_) | EntityKind::Creature(_) | EntityKind::Vehicle(_) => false,
        }
    }

    /// Whether the entity is active and, for destructibles, still alive.
    pub fn is_live(&self) -> bool {
        if !self.active {
            return false;
        }
        match &self.kind {
            EntityKind::Resource(node) => node.health > 0.0,
            EntityKind::Creature(creature) => creature.health > 0.0,
            _ => true,
        }
    }

    /// Resource payload, if this is a resource node.
    pub const fn as_resource(&self) -> Option<&ResourceNode> {
        match &self.kind {
            EntityKind::Resource(node) => Some(node),
            _ => None,
        }
    }

    /// Fixture payload, if this is a fixture.
    pub const fn as_fixture(&self) -> Option<&Fixture> {
        match &self.kind {
            EntityKind::Fixture(fixture) => Some(fixture),
            _ => None,
        }
    }

    /// Container payload, if this is a container.
    pub const fn as_container(&self) -> Option<&Container> {
        match &self.kind {
            EntityKind::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Ground item payload, if this is a drop.
    pub const fn as_drop(&self) -> Option<&GroundItem> {
        match &self.kind {
            EntityKind::Drop(drop) => Some(drop),
            _ => None,
        }
    }

    /// Creature payload, if this is a creature.
    pub const fn as_creature(&self) -> Option<&Creature> {
        match &self.kind {
            EntityKind::Creature(creature) => Some(creature),
            _ => None,
        }
    }

    /// Station payload, if this is a station.
    pub const fn as_station(&self) -> Option<Station> {
        match &self.kind {
            EntityKind::Station(station) => Some(*station),
            _ => None,
        }
    }
}

/// Selects which entities an overlap query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFilter {
    /// Everything.
    Any,
    /// Resource nodes of one kind.
    Resource(ResourceKind),
    /// Production fixtures.
    Fixture,
    /// Containers.
    Container,
    /// Ground items.
    Drop,
    /// Doors.
    Door,
    /// Hostile creatures.
    Hostile,
    /// Stations that repair.
    RepairStation,
    /// Stations to rest at.
    RestSpot,
    /// Attachable vehicles.
    Vehicle,
}

impl EntityFilter {
    /// Whether `entity` passes this filter.
    pub const fn matches(self, entity: &Entity) -> bool {
        match (self, &entity.kind) {
            (Self::Any, _)
            | (Self::Fixture, EntityKind::Fixture(_))
            | (Self::Container, EntityKind::Container(_))
            | (Self::Drop, EntityKind::Drop(_))
            | (Self::Door, EntityKind::Door(_))
            | (Self::Vehicle, EntityKind::Vehicle(_)) => true,
            (Self::Resource(kind), EntityKind::Resource(node)) => {
                kind as u8 == node.kind as u8
            }
            (Self::Hostile, EntityKind::Creature(creature)) => creature.hostile,
            (Self::RepairStation, EntityKind::Station(station)) => station.kind.repairs(),
            (Self::RestSpot, EntityKind::Station(station)) => station.kind.rests(),
            _ => false,
        }
    }
}
