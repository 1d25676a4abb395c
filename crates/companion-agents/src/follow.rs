//! Default movement when no task or target holds the agent.
//!
//! Outside Stay mode the agent keeps a formation slot around its owner,
//! collapsing to plain follow once close. In Stay mode with a home set it
//! patrols four points around home, pausing at each.

use core::f32::consts::TAU;

use companion_types::{Mode, MovementOwner, ReplicatedRecord, Vec3};

use crate::context::TickContext;

/// Patrol corners around home, in visiting order.
const PATROL_POINTS: usize = 4;

/// Follow and patrol movement.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowController {
    patrol_index: usize,
    pause_until: Option<f64>,
}

impl Default for FollowController {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowController {
    /// Start at the first patrol point.
    pub const fn new() -> Self {
        Self {
            patrol_index: 0,
            pause_until: None,
        }
    }

    /// The patrol point being walked to.
    pub const fn patrol_index(&self) -> usize {
        self.patrol_index
    }

    /// Forget patrol progress.
    pub const fn reset(&mut self) {
        *self = Self::new();
    }

    /// Drive one tick. Returns the owner that moved, `None` when idle.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, mode: Mode) -> MovementOwner {
        if mode == Mode::Stay {
            let home = ctx.record().and_then(ReplicatedRecord::home_point);
            return home.map_or(MovementOwner::None, |home| self.patrol(ctx, home));
        }
        Self::follow(ctx)
    }

    /// Point `index` of the patrol square around `home`.
    pub fn patrol_point(home: Vec3, radius: f32, index: usize) -> Vec3 {
        let quarter = TAU / PATROL_POINTS as f32;
        home + Vec3::from_yaw(quarter * index as f32) * radius
    }

    fn patrol(&mut self, ctx: &mut TickContext<'_>, home: Vec3) -> MovementOwner {
        let config = ctx.config;
        let cfg = &config.follow;
        let owner = MovementOwner::Patrol;
        if let Some(until) = self.pause_until {
            if ctx.now < until {
                ctx.halt(owner);
                return owner;
            }
            self.pause_until = None;
            self.patrol_index = self
                .patrol_index
                .saturating_add(1)
                .checked_rem(PATROL_POINTS)
                .unwrap_or(0);
        }
        let point = Self::patrol_point(home, cfg.patrol_radius, self.patrol_index);
        if ctx.position().horizontal_distance(point) <= cfg.arrive_distance {
            self.pause_until = Some(ctx.now + cfg.patrol_pause);
            ctx.halt(owner);
        } else {
            ctx.move_to(owner, point, cfg.arrive_distance * 0.5, false);
        }
        owner
    }

    /// Offset of formation `slot` around the owner.
    pub fn slot_offset(slot: i32, slot_count: u32, distance: f32) -> Vec3 {
        let count = i32::try_from(slot_count.max(1)).unwrap_or(i32::MAX);
        let index = slot.rem_euclid(count);
        let angle = TAU * index as f32 / count as f32;
        // Slot 0 sits directly behind (-Z) the owner.
        Vec3::from_yaw(angle + TAU / 2.0) * distance
    }

    fn follow(ctx: &mut TickContext<'_>) -> MovementOwner {
        let config = ctx.config;
        let cfg = &config.follow;
        let who = MovementOwner::Follow;
        let Some(owner) = ctx.owner_position() else {
            return MovementOwner::None;
        };
        let distance = ctx.position().horizontal_distance(owner);
        let run = distance > cfg.run_distance;
        if distance > cfg.collapse_distance {
            let slot = ctx.record().and_then(|r| r.formation_slot).unwrap_or(0);
            let point = owner + Self::slot_offset(slot, cfg.slot_count, cfg.slot_distance);
            ctx.move_to(who, point, cfg.arrive_distance, run);
        } else if distance > cfg.follow_stop {
            ctx.move_to(who, owner, cfg.follow_stop, run);
        } else {
            ctx.hold_facing(who, owner);
        }
        who
    }
}
