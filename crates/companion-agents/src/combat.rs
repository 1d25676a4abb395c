//! Target acquisition and combat movement.
//!
//! Targeting is sticky: a live, sensed target is never swapped for a
//! closer one. Two timers give up on a target: one when it has been out of
//! sight too long, one when it has taken no damage for too long. Movement
//! closes to a stop distance inside weapon range with hysteresis, so an
//! agent standing at the boundary does not flip between walking and
//! stopping every tick.

use companion_types::{BlacklistReason, EntityId, MovementOwner, Vec3, WeaponProfile};
use companion_world::{Entity, EntityFilter, Hit, StrikeOutcome};
use tracing::{debug, info};

use crate::context::TickContext;
use crate::error::BehaviorError;
use crate::stand_point::EYE_HEIGHT;

const OWNER: MovementOwner = MovementOwner::Combat;

/// Margin walked past the stop distance so arrival lands inside it.
const STOP_SLACK: f32 = 0.1;

/// Combat targeting and movement.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatController {
    target: Option<EntityId>,
    last_sensed: f64,
    last_progress: f64,
    target_health: f32,
    stopped: bool,
    next_attack: f64,
    retry_until: f64,
}

impl Default for CombatController {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatController {
    /// A controller with no target.
    pub const fn new() -> Self {
        Self {
            target: None,
            last_sensed: 0.0,
            last_progress: 0.0,
            target_health: 0.0,
            stopped: false,
            next_attack: 0.0,
            retry_until: 0.0,
        }
    }

    /// The current target.
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether a target is held.
    pub const fn is_engaged(&self) -> bool {
        self.target.is_some()
    }

    /// Whether the agent is holding position at the stop distance.
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Drop the target and every timer.
    pub const fn reset(&mut self) {
        *self = Self::new();
    }

    fn hostile_health(entity: &Entity) -> Option<f32> {
        entity
            .as_creature()
            .filter(|c| c.hostile)
            .map(|c| c.health)
    }

    fn sensed(ctx: &TickContext<'_>, entity: &Entity, radius: f32) -> bool {
        let eye = ctx.position() + Vec3::new(0.0, EYE_HEIGHT, 0.0);
        eye.distance(entity.center()) <= radius + entity.radius
            && ctx.world.line_of_sight(eye, entity.center())
    }

    /// Keep or pick a target. Returns the target for this tick.
    pub fn acquire(&mut self, ctx: &mut TickContext<'_>) -> Option<EntityId> {
        let config = ctx.config;
        let cfg = &config.combat;

        if let Some(current) = self.target {
            let tracked = ctx.live(current).and_then(|e| {
                Self::hostile_health(e).map(|health| (health, Self::sensed(ctx, e, cfg.sense_radius)))
            });
            let Some((health, sensed)) = tracked else {
                info!(agent = %ctx.agent.id, target = %current, "Combat target gone");
                self.reset();
                return self.pick(ctx);
            };
            if sensed {
                self.last_sensed = ctx.now;
            }
            if health < self.target_health {
                self.target_health = health;
                self.last_progress = ctx.now;
            }
            if ctx.now - self.last_sensed > cfg.give_up_unsensed {
                info!(agent = %ctx.agent.id, target = %current, "Lost sight of target");
                self.reset();
            } else if ctx.now - self.last_progress > cfg.stall_secs {
                let err = BehaviorError::Unreachable { target: current };
                info!(agent = %ctx.agent.id, error = %err, "Combat stalled");
                ctx.memory.blacklist.add(current, BlacklistReason::Unreachable, ctx.now);
                self.reset();
            } else {
                return Some(current);
            }
        }
        self.pick(ctx)
    }

    /// Nearest sensed hostile that is not excluded.
    fn pick(&mut self, ctx: &mut TickContext<'_>) -> Option<EntityId> {
        let config = ctx.config;
        let radius = config.combat.sense_radius;
        let position = ctx.position();
        let mut best: Option<(EntityId, f32, f32)> = None;
        for id in ctx.world.overlap_sphere(position, radius, EntityFilter::Hostile) {
            if ctx.is_blacklisted(id) {
                continue;
            }
            let Some((distance, health)) = ctx.live(id).and_then(|e| {
                let health = Self::hostile_health(e)?;
                Self::sensed(ctx, e, radius).then(|| (position.horizontal_distance(e.position), health))
            }) else {
                continue;
            };
            if best.is_none_or(|(_, d, _)| distance < d) {
                best = Some((id, distance, health));
            }
        }
        let (id, distance, health) = best?;
        info!(agent = %ctx.agent.id, target = %id, distance, "Engaging hostile");
        ctx.agent.equip_best_weapon();
        self.target = Some(id);
        self.last_sensed = ctx.now;
        self.last_progress = ctx.now;
        self.target_health = health;
        self.stopped = false;
        Some(id)
    }

    /// Close in on and attack the current target. Returns whether combat
    /// drove movement this tick.
    pub fn engage(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let config = ctx.config;
        let cfg = &config.combat;
        let Some(id) = self.target else {
            return false;
        };
        let Some(entity) = ctx.live(id).cloned() else {
            self.reset();
            return false;
        };
        let weapon = ctx.agent.weapon().unwrap_or(WeaponProfile {
            damage: cfg.unarmed_damage,
            range: cfg.unarmed_range,
            melee: true,
        });

        let position = ctx.position();
        let distance = (position.horizontal_distance(entity.position) - entity.radius).max(0.0);
        let stop = weapon.range * cfg.stop_fraction;
        let threshold = if self.stopped {
            stop + cfg.stop_hysteresis
        } else {
            stop
        };

        if distance > threshold {
            self.stopped = false;
            let goal = self
                .flank_point(ctx, &entity, weapon, distance)
                .unwrap_or(entity.position);
            let run = distance > config.follow.run_distance;
            return ctx
                .move_to(OWNER, goal, (stop + entity.radius - STOP_SLACK).max(0.0), run)
                .is_some();
        }

        self.stopped = true;
        let center = entity.center();
        ctx.hold_facing(OWNER, center);
        if ctx.movement_owner() != OWNER {
            return false;
        }
        let ready = ctx.now >= self.next_attack && ctx.now >= self.retry_until;
        if ready && distance <= weapon.range && ctx.is_facing(center, cfg.attack_angle) {
            self.attack(ctx, id, weapon);
        }
        true
    }

    /// A point beside a far melee target, offset across the owner's line
    /// of approach.
    fn flank_point(&self, ctx: &TickContext<'_>, target: &Entity, weapon: WeaponProfile, distance: f32) -> Option<Vec3> {
        let cfg = &ctx.config.combat;
        if !weapon.melee || distance <= cfg.flank_trigger {
            return None;
        }
        let owner = ctx.owner_position()?;
        let side = target.position.direction_to(owner).perpendicular();
        let reach = cfg.flank_distance + target.radius;
        let left = target.position + side * reach;
        let right = target.position - side * reach;
        let position = ctx.position();
        let goal = if position.horizontal_distance(left) <= position.horizontal_distance(right) {
            left
        } else {
            right
        };
        debug!(agent = %ctx.agent.id, target = %target.id, stopped = self.stopped, "Flanking");
        Some(goal)
    }

    fn attack(&mut self, ctx: &mut TickContext<'_>, id: EntityId, weapon: WeaponProfile) {
        let config = ctx.config;
        self.next_attack = ctx.now + config.combat.attack_interval;
        let hit = Hit {
            damage: weapon.damage,
            tool: None,
            tier: 0,
        };
        match ctx.world.strike(id, hit) {
            Ok(StrikeOutcome::Damaged { remaining }) => {
                debug!(agent = %ctx.agent.id, target = %id, remaining, "Hit");
                ctx.agent.wear_main_hand(config.harvest.swing_wear);
            }
            Ok(StrikeOutcome::Destroyed { .. }) => {
                info!(agent = %ctx.agent.id, target = %id, "Hostile defeated");
                self.reset();
            }
            Err(e) => {
                debug!(agent = %ctx.agent.id, target = %id, error = %e, "Attack failed");
                self.retry_until = ctx.now + config.combat.retry_cooldown;
            }
        }
    }
}
