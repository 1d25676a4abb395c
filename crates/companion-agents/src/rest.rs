//! Stamina recovery.
//!
//! Stamina lives in the replicated record. When it falls below a threshold
//! and nothing hostile is near, the agent walks to the nearest rest spot
//! and regenerates until the resume threshold. A hostile interrupts.

use companion_types::{BlacklistReason, EntityId, MovementOwner, NoticeKind};
use companion_world::{EntityFilter, RecordChange};
use tracing::{debug, info, warn};

use crate::context::{Approach, TickContext};
use crate::stuck::StallWatch;

const OWNER: MovementOwner = MovementOwner::Rest;

/// Distance past the spot's footprint counted as arrived.
const SPOT_REACH: f32 = 0.8;

/// Rest controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestPhase {
    /// Not resting.
    Idle,
    /// Walking to a rest spot.
    Moving,
    /// Regenerating at the spot.
    Resting,
}

/// The rest controller.
#[derive(Debug, Clone, PartialEq)]
pub struct RestController {
    phase: RestPhase,
    spot: Option<EntityId>,
    stall: StallWatch,
}

impl Default for RestController {
    fn default() -> Self {
        Self::new()
    }
}

impl RestController {
    /// An idle controller.
    pub const fn new() -> Self {
        Self {
            phase: RestPhase::Idle,
            spot: None,
            stall: StallWatch::new(),
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> RestPhase {
        self.phase
    }

    /// The chosen spot.
    pub const fn spot(&self) -> Option<EntityId> {
        self.spot
    }

    /// Whether the controller owns movement.
    pub fn is_active(&self) -> bool {
        self.phase != RestPhase::Idle
    }

    /// Drop transient state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Start if stamina is low and a rest spot is in range. A record whose
    /// stamina has not synchronized yet never starts a rest.
    pub fn try_start(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let config = ctx.config;
        let cfg = &config.rest;
        if self.is_active() {
            return false;
        }
        let Some(stamina) = ctx.record().and_then(|r| r.stamina) else {
            return false;
        };
        if stamina >= cfg.enter_below || ctx.hostile_near(cfg.hostile_radius) {
            return false;
        }
        let position = ctx.position();
        let mut best: Option<(EntityId, f32)> = None;
        for id in ctx
            .world
            .overlap_sphere(position, cfg.search_radius, EntityFilter::RestSpot)
        {
            if ctx.is_blacklisted(id) {
                continue;
            }
            let Some(spot) = ctx.live(id).map(|e| e.position) else {
                continue;
            };
            let distance = position.horizontal_distance(spot);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        let Some((spot, _)) = best else {
            return false;
        };
        info!(agent = %ctx.agent.id, spot = %spot, stamina, "Going to rest");
        self.spot = Some(spot);
        self.stall.reset();
        self.phase = RestPhase::Moving;
        true
    }

    /// Run one tick. Returns the phase afterwards.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> RestPhase {
        let config = ctx.config;
        let cfg = &config.rest;
        if ctx.hostile_near(cfg.hostile_radius) {
            info!(agent = %ctx.agent.id, "Rest interrupted by hostile");
            self.reset();
            return self.phase;
        }
        let Some(spot) = self.spot else {
            self.reset();
            return self.phase;
        };
        let Some((position, radius)) = ctx.live(spot).map(|e| (e.position, e.radius)) else {
            debug!(agent = %ctx.agent.id, spot = %spot, "Rest spot gone");
            self.reset();
            return self.phase;
        };

        match self.phase {
            RestPhase::Idle => {}
            RestPhase::Moving => match ctx.approach(
                OWNER,
                position,
                radius + SPOT_REACH,
                &mut self.stall,
                cfg.stall_displacement,
                cfg.stall_secs,
            ) {
                Approach::Arrived => {
                    if let Err(e) = ctx.write(RecordChange::LastRecovery(spot.to_string())) {
                        warn!(agent = %ctx.agent.id, error = %e, "Could not record rest spot");
                    }
                    self.phase = RestPhase::Resting;
                }
                Approach::Stalled => {
                    info!(agent = %ctx.agent.id, spot = %spot, "Rest spot unreachable");
                    ctx.memory.blacklist.add(spot, BlacklistReason::Unreachable, ctx.now);
                    ctx.notify(NoticeKind::Unreachable, "Cannot reach a place to rest");
                    self.reset();
                }
                Approach::EnRoute | Approach::Refused => {}
            },
            RestPhase::Resting => {
                ctx.halt(OWNER);
                let current = ctx.record().and_then(|r| r.stamina).unwrap_or(0.0);
                let next = cfg.regen_per_sec.mul_add(ctx.dt, current).min(cfg.max_stamina);
                if let Err(e) = ctx.write(RecordChange::Stamina(next)) {
                    warn!(agent = %ctx.agent.id, error = %e, "Stamina write rejected");
                    self.reset();
                    return self.phase;
                }
                if next >= cfg.resume_at {
                    info!(agent = %ctx.agent.id, stamina = next, "Rested");
                    self.reset();
                }
            }
        }
        self.phase
    }
}
