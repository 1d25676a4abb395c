//! Per-agent tick dispatcher.
//!
//! Each tick the coordinator resolves one movement owner, in order:
//!
//! 1. Reset everything on a mode change, a UI takeover, or a teleport.
//! 2. A pending directed request preempts everything else.
//! 3. An active task controller (Rest, Repair, Harvest, Smelt) keeps
//!    movement; when none is active, Rest, then Repair, then the mode's
//!    own controller get a chance to start.
//! 4. Otherwise combat targeting and movement.
//! 5. Otherwise formation follow or home patrol.
//!
//! Later stages never run once an earlier one has claimed movement, so a
//! follow stop radius can never fight a task controller.

use companion_types::{
    BlacklistReason, HarvestPhase, Mode, MovementOwner, Notice, ReplicatedRecord, SmeltPhase, Vec3,
};
use tracing::{debug, info};

use crate::combat::CombatController;
use crate::context::TickContext;
use crate::directed::{DirectedController, DirectedRequest};
use crate::follow::FollowController;
use crate::harvest::HarvestController;
use crate::repair::RepairController;
use crate::rest::RestController;
use crate::smelt::SmeltController;

/// Why every controller was reset this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    /// The persisted mode changed.
    ModeChange {
        /// Previous mode.
        from: Mode,
        /// New mode.
        to: Mode,
    },
    /// A peer started interacting with the agent through the UI.
    UiTakeover,
    /// The agent's position jumped.
    Teleport,
}

/// What happened during one coordinator tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Who drove movement.
    pub owner: MovementOwner,
    /// The mode in effect.
    pub mode: Mode,
    /// Harvest phase after the tick.
    pub harvest: HarvestPhase,
    /// Smelt phase after the tick.
    pub smelt: SmeltPhase,
    /// Reset performed at the start of the tick.
    pub reset: Option<ResetCause>,
    /// Notices raised.
    pub notices: Vec<Notice>,
}

/// Every controller for one agent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coordinator {
    directed: DirectedController,
    harvest: HarvestController,
    smelt: SmeltController,
    repair: RepairController,
    rest: RestController,
    combat: CombatController,
    follow: FollowController,
    last_mode: Option<Mode>,
    ui_engaged: bool,
    last_position: Option<Vec3>,
}

impl Coordinator {
    /// Fresh controllers, all idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a directed request, replacing any pending one.
    pub fn submit(&mut self, request: DirectedRequest) {
        self.directed.submit(request);
    }

    /// The harvest controller.
    pub const fn harvest(&self) -> &HarvestController {
        &self.harvest
    }

    /// The production controller.
    pub const fn smelt(&self) -> &SmeltController {
        &self.smelt
    }

    /// The combat controller.
    pub const fn combat(&self) -> &CombatController {
        &self.combat
    }

    /// The directed-request controller.
    pub const fn directed(&self) -> &DirectedController {
        &self.directed
    }

    /// The repair controller.
    pub const fn repair(&self) -> &RepairController {
        &self.repair
    }

    /// The rest controller.
    pub const fn rest(&self) -> &RestController {
        &self.rest
    }

    /// Whether any task controller currently owns movement.
    pub fn task_active(&self) -> bool {
        self.rest.is_active() || self.repair.is_active() || self.harvest.is_active() || self.smelt.is_active()
    }

    /// Reset every controller: close containers, release claims, forget
    /// timers and carried tasks.
    pub fn reset_all(&mut self, ctx: &mut TickContext<'_>) {
        debug!(agent = %ctx.agent.id, "Resetting controllers");
        self.directed.reset();
        self.harvest.reset(ctx);
        self.smelt.reset(ctx);
        self.repair.reset();
        self.rest.reset();
        self.combat.reset();
        self.follow.reset();
    }

    /// Run one tick for the agent behind `ctx`.
    pub fn tick(&mut self, mut ctx: TickContext<'_>) -> TickReport {
        let mode = ctx
            .record()
            .and_then(ReplicatedRecord::mode)
            .or(self.last_mode)
            .unwrap_or(Mode::Follow);
        let reset = self.detect_reset(&mut ctx, mode);

        if ctx.agent.is_alive() && !self.ui_engaged {
            let position = ctx.position();
            ctx.memory.tracker.observe(position, ctx.now);
            self.dispatch(&mut ctx, mode);
        }

        let harvest = self.harvest.phase();
        let smelt = self.smelt.phase();
        let (owner, notices) = ctx.finish();
        TickReport {
            owner,
            mode,
            harvest,
            smelt,
            reset,
            notices,
        }
    }

    fn detect_reset(&mut self, ctx: &mut TickContext<'_>, mode: Mode) -> Option<ResetCause> {
        let mut cause = None;

        if let Some(previous) = self.last_mode
            && previous != mode
        {
            info!(agent = %ctx.agent.id, from = ?previous, to = ?mode, "Mode changed");
            self.reset_all(ctx);
            ctx.memory.blacklist.clear_reason(BlacklistReason::ToolTierTooLow);
            ctx.memory.blacklist.forget_stale(ctx.now);
            ctx.memory.latch.clear_all();
            cause = Some(ResetCause::ModeChange { from: previous, to: mode });
        }
        self.last_mode = Some(mode);

        let engaged = ctx.ui.is_interacting(ctx.agent.id);
        if engaged && !self.ui_engaged {
            info!(agent = %ctx.agent.id, "UI takeover");
            self.reset_all(ctx);
            cause = Some(ResetCause::UiTakeover);
        }
        self.ui_engaged = engaged;

        let position = ctx.position();
        if let Some(last) = self.last_position
            && last.distance(position) > ctx.config.coordinator.teleport_distance
        {
            info!(agent = %ctx.agent.id, distance = last.distance(position), "Teleport detected");
            self.reset_all(ctx);
            ctx.memory.tracker.reset();
            cause = Some(ResetCause::Teleport);
        }
        self.last_position = Some(position);

        cause
    }

    fn dispatch(&mut self, ctx: &mut TickContext<'_>, mode: Mode) {
        if self.directed.is_active() {
            self.directed.tick(ctx);
            return;
        }

        if self.task_active() {
            if self.rest.is_active() {
                self.rest.tick(ctx);
            } else if self.repair.is_active() {
                self.repair.tick(ctx);
            } else {
                self.run_mode_controller(ctx, mode);
            }
            if self.task_active() || ctx.movement_owner() != MovementOwner::None {
                return;
            }
        } else {
            if self.rest.try_start(ctx) {
                self.rest.tick(ctx);
                return;
            }
            if self.repair.try_start(ctx) {
                self.repair.tick(ctx);
                return;
            }
            self.run_mode_controller(ctx, mode);
            if self.task_active() {
                return;
            }
        }

        if self.combat.acquire(ctx).is_some() && self.combat.engage(ctx) {
            return;
        }
        self.follow.tick(ctx, mode);
    }

    fn run_mode_controller(&mut self, ctx: &mut TickContext<'_>, mode: Mode) {
        if let Some(kind) = mode.resource_kind() {
            self.harvest.tick(ctx, kind);
        } else if mode == Mode::Stay {
            self.smelt.tick(ctx);
        }
    }
}
