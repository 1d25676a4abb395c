//! Tick cycle: the fixed-step loop that drives every local companion.
//!
//! Each tick runs through these phases:
//!
//! 1. **Clock** -- advance the tick counter and derive `now` and `dt`.
//!
//! 2. **Behavior** -- for each agent the local peer is authoritative for,
//!    assemble a [`TickContext`] and run its [`Coordinator`]. Agents owned
//!    by another peer are skipped; their state arrives through replication.
//!
//! 3. **Integration** -- step each ticked body with the movement commands
//!    its controllers issued.
//!
//! 4. **World** -- advance fixture processing.
//!
//! 5. **Cleanup** -- reset the controllers of agents that died this tick,
//!    which closes their containers and releases their claims, then
//!    remove them, drop their replicated records and free their names.
//!
//! The tick cycle is deterministic given the same initial state.

use std::collections::BTreeMap;

use companion_agents::{
    Agent, AgentManager, AgentMemory, BehaviorConfig, Coordinator, DirectedRequest, TickContext,
};
use companion_types::{AgentId, MovementOwner, Notice, PeerId, ReplicatedRecord, Vec3};
use companion_world::{Body, MemoryStore, ReplicatedStore, SandboxWorld, UiSessions};
use tracing::{debug, info};

use crate::clock::SimClock;

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: crate::clock::ClockError,
    },

    /// A request named an agent the simulation does not hold.
    #[error("unknown agent: {agent}")]
    UnknownAgent {
        /// The agent that was not found.
        agent: AgentId,
    },
}

/// Everything the simulation holds for one companion.
#[derive(Debug)]
pub struct AgentSlot {
    /// Identity, health, inventory and equipment.
    pub agent: Agent,
    /// Movement substrate.
    pub body: Body,
    /// Tracker, blacklist and notice latch.
    pub memory: AgentMemory,
    /// Behavior controllers.
    pub coordinator: Coordinator,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Simulation time at the tick, in seconds.
    pub time: f64,
    /// Agents present at the end of the tick.
    pub agents_alive: u32,
    /// Agents the local peer ran behavior for.
    pub agents_ticked: u32,
    /// Units finished by fixtures this tick.
    pub products: u32,
    /// Which controller drove each ticked agent.
    pub owners: BTreeMap<AgentId, MovementOwner>,
    /// Notices raised by every ticked agent.
    pub notices: Vec<Notice>,
    /// Agents removed after dying this tick.
    pub removed: Vec<AgentId>,
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    /// The simulation clock.
    pub clock: SimClock,
    /// Entities, terrain and peer positions.
    pub world: SandboxWorld,
    /// Replicated agent records.
    pub store: MemoryStore,
    /// Open UI sessions.
    pub ui: UiSessions,
    /// The peer this process runs as.
    pub local_peer: PeerId,
    /// Behavior tunables shared by every agent.
    pub behavior: BehaviorConfig,
    /// Every companion, keyed by id.
    pub agents: BTreeMap<AgentId, AgentSlot>,
    /// Display names in use.
    pub names: AgentManager,
}

impl SimulationState {
    /// Create an empty simulation.
    pub const fn new(
        clock: SimClock,
        world: SandboxWorld,
        local_peer: PeerId,
        behavior: BehaviorConfig,
    ) -> Self {
        Self {
            clock,
            world,
            store: MemoryStore::new(),
            ui: UiSessions::new(),
            local_peer,
            behavior,
            agents: BTreeMap::new(),
            names: AgentManager::new(),
        }
    }

    /// Add a companion at `position`, registering its record with
    /// `authority` as the writing peer.
    pub fn add_agent(
        &mut self,
        agent: Agent,
        position: Vec3,
        authority: PeerId,
        record: ReplicatedRecord,
    ) -> AgentId {
        let id = agent.id;
        let body = Body::new(position, agent.class);
        self.store.register(id, authority, record);
        self.agents.insert(
            id,
            AgentSlot {
                agent,
                body,
                memory: AgentMemory::new(&self.behavior),
                coordinator: Coordinator::new(),
            },
        );
        debug!(agent = %id, ?position, "Agent added");
        id
    }

    /// Queue a directed request for an agent.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::UnknownAgent`] if the agent is not present.
    pub fn submit(&mut self, agent: AgentId, request: DirectedRequest) -> Result<(), TickError> {
        let slot = self
            .agents
            .get_mut(&agent)
            .ok_or(TickError::UnknownAgent { agent })?;
        slot.coordinator.submit(request);
        Ok(())
    }

    /// Number of agents present.
    pub fn agent_count(&self) -> u32 {
        u32::try_from(self.agents.len()).unwrap_or(u32::MAX)
    }
}

/// Execute one complete tick of the simulation.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter overflows.
pub fn run_tick(state: &mut SimulationState) -> Result<TickSummary, TickError> {
    // --- Phase 1: Clock ---
    let tick = state.clock.advance()?;
    let now = state.clock.now();
    let dt = state.clock.dt();
    debug!(tick, now, "Tick started");

    // --- Phase 2 + 3: Behavior and integration ---
    let mut owners = BTreeMap::new();
    let mut notices = Vec::new();
    let mut agents_ticked: u32 = 0;

    for (id, slot) in &mut state.agents {
        if !state.store.is_authoritative(&state.local_peer, *id) {
            continue;
        }
        let ctx = TickContext::new(
            now,
            dt,
            &state.local_peer,
            &mut slot.agent,
            &mut slot.body,
            &mut state.world,
            &mut state.store,
            &state.ui,
            &state.behavior,
            &mut slot.memory,
        );
        let report = slot.coordinator.tick(ctx);
        slot.body.integrate(dt, &state.world);

        if let Some(cause) = report.reset {
            debug!(tick, agent = %id, ?cause, "Controllers reset");
        }
        owners.insert(*id, report.owner);
        notices.extend(report.notices);
        agents_ticked = agents_ticked.saturating_add(1);
    }

    // --- Phase 4: World ---
    let products = state.world.advance(dt);

    // --- Phase 5: Cleanup ---
    let removed: Vec<AgentId> = state
        .agents
        .iter()
        .filter(|(_, slot)| !slot.agent.is_alive())
        .map(|(id, _)| *id)
        .collect();
    for id in &removed {
        let Some(mut slot) = state.agents.remove(id) else {
            continue;
        };
        let mut ctx = TickContext::new(
            now,
            dt,
            &state.local_peer,
            &mut slot.agent,
            &mut slot.body,
            &mut state.world,
            &mut state.store,
            &state.ui,
            &state.behavior,
            &mut slot.memory,
        );
        slot.coordinator.reset_all(&mut ctx);
        state.store.remove(*id);
        state.names.release(&slot.agent.name);
        info!(tick, agent = %id, name = %slot.agent.name, "Agent died and was removed");
    }

    Ok(TickSummary {
        tick,
        time: now,
        agents_alive: state.agent_count(),
        agents_ticked,
        products,
        owners,
        notices,
        removed,
    })
}
