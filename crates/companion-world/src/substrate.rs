//! The contracts between the behavior core and its host.
//!
//! Controllers never reach into path-finding, physics or replication
//! internals. They see only:
//!
//! - [`MovementDriver`] -- path-following primitives for one agent body.
//! - [`Perception`] -- a pure query oracle over the world.
//! - [`Interaction`] -- typed world mutations (strike, containers, fixtures).
//! - [`UiQuery`] -- whether a player is currently interacting with an agent.
//!
//! [`World`] bundles perception and interaction so controllers can take a
//! single `&mut dyn World`.

use std::collections::BTreeSet;

use companion_types::{AgentClass, AgentId, EntityId, ItemRecord, PeerId, ToolClass, Vec3};

use crate::entity::{Entity, EntityFilter};
use crate::error::WorldError;

/// Path-following primitives for one agent body.
pub trait MovementDriver {
    /// Current position.
    fn position(&self) -> Vec3;

    /// Current horizontal facing as a unit vector.
    fn forward(&self) -> Vec3;

    /// Steer toward `point`, stopping within `stop_distance`.
    ///
    /// Returns `true` when the point is already reached or the body made
    /// progress on its last step, `false` when it is blocked.
    fn move_toward(&mut self, point: Vec3, stop_distance: f32, run: bool) -> bool;

    /// Cancel any movement command.
    fn stop(&mut self);

    /// Turn to face `point`.
    fn look_at(&mut self, point: Vec3);

    /// Whether the body faces `point` within `angle_tolerance` degrees.
    /// With `invert`, whether it faces directly away.
    fn is_facing(&self, point: Vec3, angle_tolerance: f32, invert: bool) -> bool;

    /// Request a jump on the next step.
    fn jump(&mut self);
}

/// A pure query oracle over the world.
pub trait Perception {
    /// Active entities within `radius` of `center` that pass `filter`,
    /// in stable key order.
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: EntityFilter) -> Vec<EntityId>;

    /// Whether a navigable path connects the two points for a body class.
    fn has_path(&self, from: Vec3, to: Vec3, class: AgentClass) -> bool;

    /// Ground height under `point`, `None` where there is no ground.
    fn ground_height(&self, point: Vec3) -> Option<f32>;

    /// Whether nothing solid blocks the straight segment.
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool;

    /// Look up an entity by key.
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    /// Position of a connected peer's avatar.
    fn peer_position(&self, peer: &PeerId) -> Option<Vec3>;
}

/// One strike against a resource node or creature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Damage dealt.
    pub damage: f32,
    /// Tool damage class, `None` for weapons.
    pub tool: Option<ToolClass>,
    /// Tool tier.
    pub tier: u8,
}

/// Result of a successful strike.
#[derive(Debug, Clone, PartialEq)]
pub enum StrikeOutcome {
    /// The target survived with this much health.
    Damaged {
        /// Remaining health.
        remaining: f32,
    },
    /// The target was destroyed; its drops were spawned.
    Destroyed {
        /// Keys of spawned ground items.
        drops: Vec<EntityId>,
    },
}

/// Typed world mutations.
pub trait Interaction {
    /// Strike a resource node or creature.
    fn strike(&mut self, target: EntityId, hit: Hit) -> Result<StrikeOutcome, WorldError>;

    /// Reserve a ground item for pickup.
    fn claim_drop(&mut self, drop: EntityId, agent: AgentId) -> Result<(), WorldError>;

    /// Release a reservation held by `agent`. Unknown drops are ignored.
    fn release_drop(&mut self, drop: EntityId, agent: AgentId);

    /// Remove a ground item from the world and hand it over.
    fn pick_up(&mut self, drop: EntityId, agent: AgentId) -> Result<ItemRecord, WorldError>;

    /// Put an item on the ground at `position`, unclaimed.
    fn drop_item(&mut self, position: Vec3, item: ItemRecord) -> EntityId;

    /// Open a container for exclusive use.
    fn open_container(&mut self, container: EntityId, agent: AgentId) -> Result<(), WorldError>;

    /// Close a container held by `agent`. Idempotent.
    fn close_container(&mut self, container: EntityId, agent: AgentId);

    /// Take up to `max` units of `name` from an open container.
    fn take_from_container(
        &mut self,
        container: EntityId,
        agent: AgentId,
        name: &str,
        max: u32,
    ) -> Result<Option<ItemRecord>, WorldError>;

    /// Put an item into an open container.
    fn deposit(&mut self, container: EntityId, agent: AgentId, item: ItemRecord) -> Result<(), WorldError>;

    /// Feed one unit into a fixture.
    fn insert_into_fixture(&mut self, fixture: EntityId, name: &str, is_fuel: bool) -> Result<(), WorldError>;

    /// Release finished output at the fixture's output point.
    fn release_output(&mut self, fixture: EntityId) -> Result<Vec<EntityId>, WorldError>;

    /// Toggle a door. Returns whether it is now open.
    fn use_door(&mut self, door: EntityId) -> Result<bool, WorldError>;

    /// Attach an agent to a vehicle.
    fn attach(&mut self, vehicle: EntityId, agent: AgentId) -> Result<(), WorldError>;

    /// Restore an item's durability at a repair station.
    fn repair(&mut self, station: EntityId, item: &mut ItemRecord) -> Result<(), WorldError>;
}

/// Perception and interaction together.
pub trait World: Perception + Interaction {}

impl<T: Perception + Interaction> World for T {}

/// Whether a player currently holds an agent's interaction UI open.
pub trait UiQuery {
    /// `true` while some peer is interacting with `agent`.
    fn is_interacting(&self, agent: AgentId) -> bool;
}

/// A [`UiQuery`] where nobody ever interacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUi;

impl UiQuery for NoUi {
    fn is_interacting(&self, _agent: AgentId) -> bool {
        false
    }
}

/// A [`UiQuery`] backed by the set of agents with an open session.
#[derive(Debug, Clone, Default)]
pub struct UiSessions {
    open: BTreeSet<AgentId>,
}

impl UiSessions {
    /// No open sessions.
    pub const fn new() -> Self {
        Self {
            open: BTreeSet::new(),
        }
    }

    /// Mark an agent's UI as open.
    pub fn open(&mut self, agent: AgentId) {
        self.open.insert(agent);
    }

    /// Mark an agent's UI as closed.
    pub fn close(&mut self, agent: AgentId) {
        self.open.remove(&agent);
    }
}

impl UiQuery for UiSessions {
    fn is_interacting(&self, agent: AgentId) -> bool {
        self.open.contains(&agent)
    }
}
