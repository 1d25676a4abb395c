//! One-shot directed requests.
//!
//! A request (walk to a point, board a vehicle, unload into a container)
//! preempts every other behavior while pending. At most one is pending per
//! agent; submitting another replaces it. Every request carries a timeout
//! and the single-timeout stall check.

use companion_types::{EntityId, ItemCategory, MovementOwner, NoticeKind, Vec3};
use companion_world::WorldError;
use tracing::{debug, info};

use crate::context::{Approach, TickContext};
use crate::error::BehaviorError;
use crate::stuck::StallWatch;

const OWNER: MovementOwner = MovementOwner::Directed;

/// A directed one-shot request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirectedRequest {
    /// Walk to a point.
    MoveTo(Vec3),
    /// Walk to a vehicle and board it.
    Attach(EntityId),
    /// Walk to a container and unload into it.
    DepositAt(EntityId),
}

/// Outcome of one directed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectedStatus {
    /// Nothing pending.
    Idle,
    /// Still working.
    InProgress,
    /// Finished this tick.
    Completed,
    /// Abandoned this tick.
    Failed,
}

/// The directed-request controller.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedController {
    pending: Option<DirectedRequest>,
    started: Option<f64>,
    stall: StallWatch,
}

impl Default for DirectedController {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectedController {
    /// A controller with nothing pending.
    pub const fn new() -> Self {
        Self {
            pending: None,
            started: None,
            stall: StallWatch::new(),
        }
    }

    /// Queue `request`, replacing any pending one.
    pub fn submit(&mut self, request: DirectedRequest) {
        if let Some(previous) = self.pending.replace(request) {
            debug!(?previous, ?request, "Directed request replaced");
        }
        self.started = None;
        self.stall.reset();
    }

    /// The pending request.
    pub const fn pending(&self) -> Option<DirectedRequest> {
        self.pending
    }

    /// Whether a request is pending.
    pub const fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    /// Cancel any pending request.
    pub const fn reset(&mut self) {
        *self = Self::new();
    }

    /// Run one tick of the pending request.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> DirectedStatus {
        let Some(request) = self.pending else {
            return DirectedStatus::Idle;
        };
        let config = ctx.config;
        let cfg = &config.directed;
        let started = *self.started.get_or_insert(ctx.now);
        if ctx.now - started >= cfg.timeout {
            return self.fail(ctx, request, "timed out");
        }

        let (point, arrive, target) = match request {
            DirectedRequest::MoveTo(point) => (point, cfg.stop_distance, None),
            DirectedRequest::Attach(id) | DirectedRequest::DepositAt(id) => {
                let Some((position, radius)) = ctx.live(id).map(|e| (e.position, e.radius)) else {
                    return self.fail(ctx, request, "target is gone");
                };
                (position, radius + cfg.reach, Some(id))
            }
        };

        match ctx.approach(OWNER, point, arrive, &mut self.stall, cfg.stall_displacement, cfg.stall_secs) {
            Approach::EnRoute | Approach::Refused => DirectedStatus::InProgress,
            Approach::Stalled => self.fail(ctx, request, "no progress"),
            Approach::Arrived => {
                let result = match (request, target) {
                    (DirectedRequest::Attach(_), Some(vehicle)) => ctx.world.attach(vehicle, ctx.agent.id),
                    (DirectedRequest::DepositAt(_), Some(container)) => Self::unload(ctx, container),
                    _ => Ok(()),
                };
                match result {
                    Ok(()) => {
                        info!(agent = %ctx.agent.id, ?request, "Directed request completed");
                        ctx.clear_notice(NoticeKind::RequestFailed);
                        self.reset();
                        DirectedStatus::Completed
                    }
                    Err(e) => {
                        let class = target.map(|id| BehaviorError::from_world(id, &e));
                        debug!(agent = %ctx.agent.id, error = %e, ?class, "Directed interaction refused");
                        self.fail(ctx, request, &e.to_string())
                    }
                }
            }
        }
    }

    /// Move every non-equipped, non-tool item that fits into `container`.
    fn unload(ctx: &mut TickContext<'_>, container: EntityId) -> Result<(), WorldError> {
        let me = ctx.agent.id;
        ctx.world.open_container(container, me)?;
        let keep = |category: ItemCategory| matches!(category, ItemCategory::Tool | ItemCategory::Weapon);
        let cargo = ctx.agent.inventory.drain_matching(|item| !keep(item.category));
        let mut moved: u32 = 0;
        for item in cargo {
            let quantity = item.quantity;
            if let Err(e) = ctx.world.deposit(container, me, item.clone()) {
                debug!(agent = %me, container = %container, error = %e, "Item did not fit");
                if let Err(back) = ctx.agent.inventory.add(item) {
                    debug!(agent = %me, error = %back, "Could not keep refused item");
                }
            } else {
                moved = moved.saturating_add(quantity);
            }
        }
        ctx.world.close_container(container, me);
        info!(agent = %me, container = %container, moved, "Unloaded");
        Ok(())
    }

    fn fail(&mut self, ctx: &mut TickContext<'_>, request: DirectedRequest, reason: &str) -> DirectedStatus {
        info!(agent = %ctx.agent.id, ?request, %reason, "Directed request failed");
        ctx.halt(OWNER);
        ctx.notify(NoticeKind::RequestFailed, format!("Could not complete request: {reason}"));
        self.reset();
        DirectedStatus::Failed
    }
}
