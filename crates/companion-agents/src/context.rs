//! Per-tick context handed to every controller.
//!
//! A [`TickContext`] bundles the simulation time, the agent, its shared
//! memory (tracker, blacklist, notice latch) and the host capabilities.
//! The movement driver is private: controllers reach it only through
//! [`TickContext::drive`], which goes through the [`MoveGate`]. The first
//! owner to claim the gate in a tick holds it for the rest of that tick.

use std::collections::BTreeSet;

use companion_types::{
    EntityId, MovementOwner, Notice, NoticeKind, PeerId, ReplicatedRecord, Vec3,
};
use companion_world::{
    Entity, EntityFilter, MovementDriver, RecordChange, ReplicatedStore, StoreError, UiQuery, World,
};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::blacklist::Blacklist;
use crate::config::BehaviorConfig;
use crate::stuck::StallWatch;
use crate::tracker::PositionTracker;

/// Travel beyond this distance is done running.
const RUN_DISTANCE: f32 = 10.0;

/// One tick of stall-watched travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    /// Within the arrival distance; movement stopped.
    Arrived,
    /// Still travelling.
    EnRoute,
    /// No net progress for the stall timeout.
    Stalled,
    /// Another owner holds movement this tick.
    Refused,
}

/// Admits exactly one movement owner per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveGate {
    owner: MovementOwner,
}

impl MoveGate {
    /// An unclaimed gate.
    pub const fn new() -> Self {
        Self {
            owner: MovementOwner::None,
        }
    }

    /// Claim movement for `who`. Succeeds if the gate is free or already
    /// held by `who`.
    pub fn claim(&mut self, who: MovementOwner) -> bool {
        if who == MovementOwner::None {
            return false;
        }
        if self.owner == MovementOwner::None {
            self.owner = who;
        }
        self.owner == who
    }

    /// The owner for this tick.
    pub const fn owner(self) -> MovementOwner {
        self.owner
    }
}

impl Default for MoveGate {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot notice suppression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeLatch {
    raised: BTreeSet<NoticeKind>,
}

impl NoticeLatch {
    /// Mark `kind` raised. Returns false if it already was.
    pub fn raise(&mut self, kind: NoticeKind) -> bool {
        self.raised.insert(kind)
    }

    /// The condition behind `kind` has cleared.
    pub fn clear(&mut self, kind: NoticeKind) {
        self.raised.remove(&kind);
    }

    /// Forget every raised notice.
    pub fn clear_all(&mut self) {
        self.raised.clear();
    }
}

/// Per-agent state shared by every controller.
#[derive(Debug, Clone)]
pub struct AgentMemory {
    /// Position history.
    pub tracker: PositionTracker,
    /// Excluded targets.
    pub blacklist: Blacklist,
    /// Notices already shown.
    pub latch: NoticeLatch,
}

impl AgentMemory {
    /// Fresh memory from configuration.
    pub fn new(config: &BehaviorConfig) -> Self {
        Self {
            tracker: PositionTracker::new(config.tracker.sample_interval),
            blacklist: Blacklist::new(config.blacklist.clone()),
            latch: NoticeLatch::default(),
        }
    }
}

/// Everything a controller sees during one tick.
pub struct TickContext<'a> {
    /// Simulation time in seconds.
    pub now: f64,
    /// Tick length in seconds.
    pub dt: f32,
    /// The local peer running this tick.
    pub peer: &'a PeerId,
    /// The agent.
    pub agent: &'a mut Agent,
    /// Perception and interaction.
    pub world: &'a mut dyn World,
    /// Replicated records.
    pub store: &'a mut dyn ReplicatedStore,
    /// UI takeover query.
    pub ui: &'a dyn UiQuery,
    /// Tunables.
    pub config: &'a BehaviorConfig,
    /// Tracker, blacklist and notice latch.
    pub memory: &'a mut AgentMemory,
    /// Notices raised this tick.
    pub notices: Vec<Notice>,
    body: &'a mut dyn MovementDriver,
    gate: MoveGate,
}

impl<'a> TickContext<'a> {
    /// Assemble a context for one agent's tick.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        now: f64,
        dt: f32,
        peer: &'a PeerId,
        agent: &'a mut Agent,
        body: &'a mut dyn MovementDriver,
        world: &'a mut dyn World,
        store: &'a mut dyn ReplicatedStore,
        ui: &'a dyn UiQuery,
        config: &'a BehaviorConfig,
        memory: &'a mut AgentMemory,
    ) -> Self {
        Self {
            now,
            dt,
            peer,
            agent,
            world,
            store,
            ui,
            config,
            memory,
            notices: Vec::new(),
            body,
            gate: MoveGate::new(),
        }
    }

    // -------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------

    /// Current position.
    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    /// Current facing direction.
    pub fn forward(&self) -> Vec3 {
        self.body.forward()
    }

    /// Whether the agent faces `point` within `tolerance` degrees.
    pub fn is_facing(&self, point: Vec3, tolerance: f32) -> bool {
        self.body.is_facing(point, tolerance, false)
    }

    /// The movement driver, if `who` holds (or can take) the gate.
    pub fn drive(&mut self, who: MovementOwner) -> Option<&mut dyn MovementDriver> {
        if self.gate.claim(who) {
            Some(&mut *self.body)
        } else {
            debug!(agent = %self.agent.id, refused = ?who, holder = ?self.gate.owner(), "Movement refused");
            None
        }
    }

    /// Move toward `point` as `who`. Returns `None` when refused, else the
    /// driver's reached-or-progressed signal.
    pub fn move_to(&mut self, who: MovementOwner, point: Vec3, stop: f32, run: bool) -> Option<bool> {
        self.drive(who).map(|driver| driver.move_toward(point, stop, run))
    }

    /// Stop and face `point` as `who`.
    pub fn hold_facing(&mut self, who: MovementOwner, point: Vec3) {
        if let Some(driver) = self.drive(who) {
            driver.stop();
            driver.look_at(point);
        }
    }

    /// Stop as `who`.
    pub fn halt(&mut self, who: MovementOwner) {
        if let Some(driver) = self.drive(who) {
            driver.stop();
        }
    }

    /// Walk toward `point` as `who` until within `arrive`, feeding `watch`
    /// on every travelling tick.
    pub fn approach(
        &mut self,
        who: MovementOwner,
        point: Vec3,
        arrive: f32,
        watch: &mut StallWatch,
        min_displacement: f32,
        timeout: f64,
    ) -> Approach {
        let position = self.position();
        let distance = position.horizontal_distance(point);
        if distance <= arrive {
            watch.reset();
            self.halt(who);
            return Approach::Arrived;
        }
        if self.move_to(who, point, arrive * 0.5, distance > RUN_DISTANCE).is_none() {
            return Approach::Refused;
        }
        if watch.check(position, self.now, min_displacement, timeout) {
            watch.reset();
            return Approach::Stalled;
        }
        Approach::EnRoute
    }

    /// Who holds movement this tick.
    pub const fn movement_owner(&self) -> MovementOwner {
        self.gate.owner()
    }

    // -------------------------------------------------------------------
    // Perception helpers
    // -------------------------------------------------------------------

    /// Revalidate a target: it must exist, be active, and be alive.
    pub fn live(&self, id: EntityId) -> Option<&Entity> {
        self.world.entity(id).filter(|e| e.is_live())
    }

    /// Whether a hostile is within `radius`.
    pub fn hostile_near(&self, radius: f32) -> bool {
        self.world
            .overlap_sphere(self.position(), radius, EntityFilter::Hostile)
            .into_iter()
            .any(|id| self.live(id).is_some())
    }

    /// Whether `id` is excluded right now.
    pub fn is_blacklisted(&mut self, id: EntityId) -> bool {
        self.memory.blacklist.is_blacklisted(id, self.now)
    }

    // -------------------------------------------------------------------
    // Replicated state
    // -------------------------------------------------------------------

    /// This agent's replicated record, if synchronized.
    pub fn record(&self) -> Option<&ReplicatedRecord> {
        self.store.record(self.agent.id)
    }

    /// Write a field of this agent's record as the local peer.
    pub fn write(&mut self, change: RecordChange) -> Result<(), StoreError> {
        self.store.apply(self.peer, self.agent.id, change)
    }

    /// The owner's avatar position, if known.
    pub fn owner_position(&self) -> Option<Vec3> {
        let owner = self.record()?.owner.as_ref()?;
        self.world.peer_position(owner)
    }

    // -------------------------------------------------------------------
    // Notices
    // -------------------------------------------------------------------

    /// Raise a one-shot notice. Returns whether it was emitted.
    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) -> bool {
        if !self.memory.latch.raise(kind) {
            return false;
        }
        let message = message.into();
        info!(agent = %self.agent.id, kind = ?kind, %message, "Notice");
        self.notices.push(Notice {
            agent: self.agent.id,
            kind,
            message,
        });
        true
    }

    /// The condition behind `kind` has cleared.
    pub fn clear_notice(&mut self, kind: NoticeKind) {
        self.memory.latch.clear(kind);
    }

    /// Consume the context, returning the movement owner and notices.
    pub fn finish(self) -> (MovementOwner, Vec<Notice>) {
        (self.gate.owner(), self.notices)
    }
}
