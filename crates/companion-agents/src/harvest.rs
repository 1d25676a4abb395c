//! Resource gathering state machine.
//!
//! Idle → Moving → Attacking → CollectingDrops → Idle, with an orthogonal
//! pause: a hostile nearby parks the current target and drops the
//! controller to Idle so combat can take movement. The parked target is
//! resumed on a later idle scan if it is still valid and a suitable tool is
//! still carried.

use companion_types::{
    BlacklistReason, EntityId, HarvestPhase, MovementOwner, NoticeKind, ResourceKind, Vec3,
};
use companion_world::{Entity, EntityFilter, EntityKind, Hit, StrikeOutcome};
use tracing::{debug, info, warn};

use crate::context::TickContext;
use crate::error::BehaviorError;
use crate::stand_point::{self, EYE_HEIGHT};
use crate::stuck::{StuckAction, StuckLadder};

const OWNER: MovementOwner = MovementOwner::Harvest;

/// Stop distance when walking to a stand point.
const STAND_STOP: f32 = 0.2;

/// The harvest controller.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestController {
    phase: HarvestPhase,
    target: Option<EntityId>,
    paused_target: Option<EntityId>,
    stuck_offset: Option<Vec3>,
    ladder: StuckLadder,
    next_scan: f64,
    next_swing: f64,
    swing_failures: u32,
    last_site: Option<Vec3>,
    drop_target: Option<EntityId>,
    drops_since: f64,
    empty_scans: u32,
}

impl Default for HarvestController {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestController {
    /// An idle controller.
    pub const fn new() -> Self {
        Self {
            phase: HarvestPhase::Idle,
            target: None,
            paused_target: None,
            stuck_offset: None,
            ladder: StuckLadder::new(),
            next_scan: 0.0,
            next_swing: 0.0,
            swing_failures: 0,
            last_site: None,
            drop_target: None,
            drops_since: 0.0,
            empty_scans: 0,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> HarvestPhase {
        self.phase
    }

    /// The resource being worked, if any.
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether a target is parked waiting for a hostile to clear.
    pub const fn is_paused(&self) -> bool {
        self.paused_target.is_some()
    }

    /// Whether the controller owns movement.
    pub fn is_active(&self) -> bool {
        self.phase != HarvestPhase::Idle
    }

    /// Drop all transient state, releasing any claimed drop.
    pub fn reset(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(drop) = self.drop_target.take() {
            ctx.world.release_drop(drop, ctx.agent.id);
        }
        *self = Self::new();
    }

    /// Run one tick for resources of `kind`. Returns the phase afterwards.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, kind: ResourceKind) -> HarvestPhase {
        match self.phase {
            HarvestPhase::Idle => self.tick_idle(ctx, kind),
            HarvestPhase::Moving => self.tick_moving(ctx, kind),
            HarvestPhase::Attacking => self.tick_attacking(ctx, kind),
            HarvestPhase::CollectingDrops => self.tick_drops(ctx, kind),
        }
        self.phase
    }

    fn set_phase(&mut self, ctx: &TickContext<'_>, phase: HarvestPhase) {
        if self.phase != phase {
            debug!(agent = %ctx.agent.id, from = ?self.phase, to = ?phase, target = ?self.target, "Harvest phase");
            self.phase = phase;
        }
    }

    // -------------------------------------------------------------------
    // Idle
    // -------------------------------------------------------------------

    fn tick_idle(&mut self, ctx: &mut TickContext<'_>, kind: ResourceKind) {
        if ctx.now < self.next_scan {
            return;
        }
        self.next_scan = ctx.now + ctx.config.harvest.scan_interval;
        if ctx.hostile_near(ctx.config.harvest.hostile_radius) {
            return;
        }

        if let Some(parked) = self.paused_target.take() {
            let tier = ctx.live(parked).and_then(Entity::as_resource).map(|r| r.tier);
            if let Some(tier) = tier
                && ctx.agent.equip_best_tool(kind, tier)
            {
                info!(agent = %ctx.agent.id, target = %parked, "Resuming paused target");
                self.engage(ctx, parked);
                return;
            }
        }

        if self.last_site.is_some() && self.begin_drops(ctx) {
            return;
        }

        if ctx.agent.inventory.is_full() {
            ctx.notify(NoticeKind::InventoryFull, "Inventory is full");
            return;
        }
        ctx.clear_notice(NoticeKind::InventoryFull);

        let class = kind.tool_class();
        if !ctx.agent.carries_tool(class) {
            ctx.notify(NoticeKind::NoTool, format!("No {class:?} to gather {kind:?}"));
            return;
        }
        ctx.clear_notice(NoticeKind::NoTool);
        let Some(best_tier) = ctx.agent.best_tool_tier(class) else {
            ctx.notify(NoticeKind::ToolBroken, format!("Every {class:?} is broken"));
            return;
        };
        ctx.clear_notice(NoticeKind::ToolBroken);

        if let Some(target) = self.select(ctx, kind, best_tier) {
            self.engage(ctx, target);
        }
    }

    /// Layered scan: close radius first, then wide. Candidates with a
    /// confirmed path win over path-less ones; path-less ones are kept as
    /// a fallback.
    fn select(&self, ctx: &mut TickContext<'_>, kind: ResourceKind, best_tier: u8) -> Option<EntityId> {
        let config = ctx.config;
        let cfg = &config.harvest;
        let position = ctx.position();
        let owner = ctx.owner_position();
        for radius in [cfg.close_radius, cfg.wide_radius] {
            let mut pathed: Option<(EntityId, f32)> = None;
            let mut fallback: Option<(EntityId, f32)> = None;
            for id in ctx.world.overlap_sphere(position, radius, EntityFilter::Resource(kind)) {
                if Some(id) == self.target || ctx.is_blacklisted(id) {
                    continue;
                }
                let Some((tier, spot)) = ctx
                    .live(id)
                    .and_then(|e| e.as_resource().map(|r| (r.tier, e.position)))
                else {
                    continue;
                };
                if tier > best_tier {
                    ctx.memory.blacklist.add(id, BlacklistReason::ToolTierTooLow, ctx.now);
                    ctx.notify(NoticeKind::ToolTierTooLow, format!("{kind:?} needs a tier {tier} tool"));
                    continue;
                }
                let mut score = -position.horizontal_distance(spot)
                    - (spot.y - position.y).abs() * cfg.height_penalty;
                if let Some(owner) = owner {
                    score -= owner.horizontal_distance(spot) * cfg.owner_weight;
                }
                let slot = if ctx.world.has_path(position, spot, ctx.agent.class) {
                    &mut pathed
                } else {
                    &mut fallback
                };
                if slot.is_none_or(|(_, best)| score > best) {
                    *slot = Some((id, score));
                }
            }
            if let Some((id, _)) = pathed.or(fallback) {
                return Some(id);
            }
        }
        None
    }

    /// Start walking to `target` with the best tool for it in hand.
    fn engage(&mut self, ctx: &mut TickContext<'_>, target: EntityId) -> bool {
        let Some((kind, tier)) = ctx
            .live(target)
            .and_then(Entity::as_resource)
            .map(|r| (r.kind, r.tier))
        else {
            return false;
        };
        if !ctx.agent.equip_best_tool(kind, tier) {
            return false;
        }
        self.target = Some(target);
        self.paused_target = None;
        self.stuck_offset = None;
        self.ladder.reset();
        self.swing_failures = 0;
        info!(
            agent = %ctx.agent.id,
            target = %target,
            tool = ?ctx.agent.main_hand().map(|i| i.name.as_str()),
            "Harvest target acquired"
        );
        self.set_phase(ctx, HarvestPhase::Moving);
        true
    }

    /// After losing or finishing a target: chain to the next-best resource
    /// of the same kind, else collect drops, else idle.
    fn chain_or_idle(&mut self, ctx: &mut TickContext<'_>, kind: ResourceKind) {
        self.target = None;
        self.stuck_offset = None;
        self.ladder.reset();
        let best_tier = ctx.agent.best_tool_tier(kind.tool_class());
        if !ctx.agent.inventory.is_full()
            && let Some(tier) = best_tier
            && let Some(next) = self.select(ctx, kind, tier)
            && self.engage(ctx, next)
        {
            debug!(agent = %ctx.agent.id, target = %next, "Chained to next resource");
            return;
        }
        if self.last_site.is_some() && self.begin_drops(ctx) {
            return;
        }
        self.set_phase(ctx, HarvestPhase::Idle);
    }

    fn pause(&mut self, ctx: &mut TickContext<'_>) {
        info!(agent = %ctx.agent.id, target = ?self.target, "Hostile nearby, pausing harvest");
        self.paused_target = self.target.take();
        if let Some(drop) = self.drop_target.take() {
            ctx.world.release_drop(drop, ctx.agent.id);
        }
        self.stuck_offset = None;
        self.ladder.reset();
        self.next_scan = ctx.now + ctx.config.harvest.scan_interval;
        self.set_phase(ctx, HarvestPhase::Idle);
    }

    // -------------------------------------------------------------------
    // Moving
    // -------------------------------------------------------------------

    fn in_band(ctx: &TickContext<'_>, position: Vec3, target: &Entity) -> bool {
        let config = ctx.config;
        let cfg = &config.harvest;
        position.horizontal_distance(target.position) <= target.radius + cfg.reach
            && target.position.y - position.y <= cfg.max_below
    }

    fn tick_moving(&mut self, ctx: &mut TickContext<'_>, kind: ResourceKind) {
        let Some(id) = self.target else {
            self.set_phase(ctx, HarvestPhase::Idle);
            return;
        };
        let Some(target) = ctx.live(id).cloned() else {
            debug!(agent = %ctx.agent.id, target = %id, "Target lost while moving");
            self.chain_or_idle(ctx, kind);
            return;
        };
        if ctx.hostile_near(ctx.config.harvest.hostile_radius) {
            self.pause(ctx);
            return;
        }

        let position = ctx.position();
        if Self::in_band(ctx, position, &target) {
            self.ladder.reset();
            self.stuck_offset = None;
            ctx.hold_facing(OWNER, target.center());
            self.set_phase(ctx, HarvestPhase::Attacking);
            return;
        }

        let stand = self
            .stuck_offset
            .unwrap_or_else(|| stand_point::solve(&*ctx.world, position, &target, &ctx.config.harvest).point);
        let run = position.horizontal_distance(stand) > ctx.config.harvest.run_distance;
        ctx.move_to(OWNER, stand, STAND_STOP, run);

        let tracker_cfg = &ctx.config.tracker;
        if ctx
            .memory
            .tracker
            .is_oscillating(ctx.now, tracker_cfg.oscillation_radius, tracker_cfg.oscillation_window)
        {
            info!(agent = %ctx.agent.id, target = %id, "Oscillating near target, abandoning");
            ctx.memory.blacklist.add(id, BlacklistReason::Oscillating, ctx.now);
            self.chain_or_idle(ctx, kind);
            return;
        }

        let action = self
            .ladder
            .update(&ctx.memory.tracker, ctx.now, &ctx.config.tracker, &ctx.config.stuck);
        let Some(action) = action else {
            return;
        };
        debug!(agent = %ctx.agent.id, target = %id, action = ?action, "Stuck escalation");
        let offset = ctx.config.stuck.offset_distance;
        match action {
            StuckAction::TryDoor => Self::open_nearby_door(ctx, position),
            StuckAction::SideOffset => {
                self.stuck_offset = Some(stand_point::lateral_offset(stand, target.position, offset, false));
            }
            StuckAction::OppositeOffset => {
                self.stuck_offset = Some(stand_point::lateral_offset(stand, target.position, offset, true));
            }
            StuckAction::Jump => {
                if let Some(driver) = ctx.drive(OWNER) {
                    driver.jump();
                }
            }
            StuckAction::Abandon => {
                let err = BehaviorError::Unreachable { target: id };
                info!(agent = %ctx.agent.id, error = %err, "Abandoning harvest target");
                ctx.memory.blacklist.add(id, BlacklistReason::Unreachable, ctx.now);
                ctx.notify(NoticeKind::Unreachable, "Cannot reach the resource");
                self.chain_or_idle(ctx, kind);
            }
        }
    }

    fn open_nearby_door(ctx: &mut TickContext<'_>, position: Vec3) {
        let closed = ctx
            .world
            .overlap_sphere(position, ctx.config.stuck.door_radius, EntityFilter::Door)
            .into_iter()
            .find(|id| {
                ctx.world
                    .entity(*id)
                    .is_some_and(|e| matches!(e.kind, EntityKind::Door(false)))
            });
        if let Some(door) = closed
            && let Err(e) = ctx.world.use_door(door)
        {
            warn!(agent = %ctx.agent.id, door = %door, error = %e, "Door would not open");
        }
    }

    // -------------------------------------------------------------------
    // Attacking
    // -------------------------------------------------------------------

    fn tick_attacking(&mut self, ctx: &mut TickContext<'_>, kind: ResourceKind) {
        let Some(id) = self.target else {
            self.set_phase(ctx, HarvestPhase::Idle);
            return;
        };
        let Some(target) = ctx.live(id).cloned() else {
            let err = BehaviorError::TargetInvalid { target: id };
            debug!(agent = %ctx.agent.id, error = %err, "Attack target no longer valid");
            self.chain_or_idle(ctx, kind);
            return;
        };
        if ctx.hostile_near(ctx.config.harvest.hostile_radius) {
            self.pause(ctx);
            return;
        }
        let position = ctx.position();
        if !Self::in_band(ctx, position, &target) {
            self.set_phase(ctx, HarvestPhase::Moving);
            return;
        }
        let center = target.center();
        ctx.hold_facing(OWNER, center);

        let config = ctx.config;
        let cfg = &config.harvest;
        if ctx.now < self.next_swing || !ctx.is_facing(center, cfg.swing_angle) {
            return;
        }
        self.next_swing = ctx.now + cfg.swing_interval;

        let eye = position + Vec3::new(0.0, EYE_HEIGHT, 0.0);
        let rise = target.position.y - position.y;
        let valid = ctx.world.line_of_sight(eye, center) && rise <= cfg.max_below && -rise <= cfg.max_above;
        if !valid {
            self.swing_failures = self.swing_failures.saturating_add(1);
            debug!(agent = %ctx.agent.id, target = %id, failures = self.swing_failures, "Pre-swing validation failed");
            if self.swing_failures >= cfg.max_swing_failures {
                info!(agent = %ctx.agent.id, target = %id, "Cannot hit target, blacklisting");
                ctx.memory.blacklist.add(id, BlacklistReason::Unreachable, ctx.now);
                self.chain_or_idle(ctx, kind);
            }
            return;
        }
        self.swing_failures = 0;

        if ctx.agent.inventory.is_full() {
            ctx.notify(NoticeKind::InventoryFull, "Inventory is full");
            self.target = None;
            self.set_phase(ctx, HarvestPhase::Idle);
            return;
        }

        let tier = target.as_resource().map_or(0, |r| r.tier);
        if !ctx.agent.equip_best_tool(kind, tier) {
            ctx.notify(NoticeKind::ToolBroken, "Tool broke");
            self.target = None;
            self.set_phase(ctx, HarvestPhase::Idle);
            return;
        }
        let Some(tool) = ctx.agent.main_hand().and_then(|item| item.tool) else {
            self.set_phase(ctx, HarvestPhase::Idle);
            return;
        };
        let hit = Hit {
            damage: tool.damage,
            tool: Some(tool.class),
            tier: tool.tier,
        };
        ctx.agent.wear_main_hand(cfg.swing_wear);

        match ctx.world.strike(id, hit) {
            Ok(StrikeOutcome::Damaged { remaining }) => {
                debug!(agent = %ctx.agent.id, target = %id, remaining, "Swing landed");
            }
            Ok(StrikeOutcome::Destroyed { drops }) => {
                info!(agent = %ctx.agent.id, target = %id, drops = drops.len(), "Resource destroyed");
                self.last_site = Some(target.position);
                self.target = None;
                if drops.is_empty() || !self.begin_drops(ctx) {
                    self.chain_or_idle(ctx, kind);
                }
            }
            Err(e) => match BehaviorError::from_world(id, &e) {
                BehaviorError::ResourceExhausted {
                    kind: NoticeKind::ToolTierTooLow,
                } => {
                    ctx.memory.blacklist.add(id, BlacklistReason::ToolTierTooLow, ctx.now);
                    ctx.notify(NoticeKind::ToolTierTooLow, "Tool tier too low");
                    self.chain_or_idle(ctx, kind);
                }
                other => {
                    debug!(agent = %ctx.agent.id, error = %other, "Strike failed");
                    self.chain_or_idle(ctx, kind);
                }
            },
        }
    }

    // -------------------------------------------------------------------
    // Collecting drops
    // -------------------------------------------------------------------

    /// Enter drop collection if an eligible drop lies near the last site.
    fn begin_drops(&mut self, ctx: &mut TickContext<'_>) -> bool {
        if self.nearest_drop(ctx).is_none() {
            self.last_site = None;
            return false;
        }
        self.drops_since = ctx.now;
        self.empty_scans = 0;
        self.drop_target = None;
        self.set_phase(ctx, HarvestPhase::CollectingDrops);
        true
    }

    fn finish_drops(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(drop) = self.drop_target.take() {
            ctx.world.release_drop(drop, ctx.agent.id);
        }
        self.last_site = None;
        self.empty_scans = 0;
        self.set_phase(ctx, HarvestPhase::Idle);
    }

    /// Nearest drop that is unclaimed (or ours), fits, is visible and is
    /// not excluded.
    fn nearest_drop(&self, ctx: &mut TickContext<'_>) -> Option<EntityId> {
        let position = ctx.position();
        let center = self.last_site.unwrap_or(position);
        let eye = position + Vec3::new(0.0, EYE_HEIGHT, 0.0);
        let me = ctx.agent.id;
        let candidates = ctx
            .world
            .overlap_sphere(center, ctx.config.harvest.drop_radius, EntityFilter::Drop);
        let mut best: Option<(EntityId, f32)> = None;
        for id in candidates {
            if ctx.is_blacklisted(id) {
                continue;
            }
            let Some(entity) = ctx.live(id) else {
                continue;
            };
            let Some(ground) = entity.as_drop() else {
                continue;
            };
            let claimable = ground.claimed_by.is_none_or(|holder| holder == me);
            let fits = ctx.agent.inventory.can_add(&ground.item);
            let visible = ctx.world.line_of_sight(eye, entity.position + Vec3::new(0.0, 0.3, 0.0));
            if !(claimable && fits && visible) {
                continue;
            }
            let distance = position.horizontal_distance(entity.position);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    fn tick_drops(&mut self, ctx: &mut TickContext<'_>, _kind: ResourceKind) {
        let config = ctx.config;
        let cfg = &config.harvest;
        if ctx.now - self.drops_since >= cfg.drop_timeout {
            debug!(agent = %ctx.agent.id, "Drop collection timed out");
            self.finish_drops(ctx);
            return;
        }
        if ctx.hostile_near(cfg.hostile_radius) {
            self.finish_drops(ctx);
            return;
        }

        if let Some(drop) = self.drop_target {
            let Some(spot) = ctx.live(drop).map(|e| e.position) else {
                self.drop_target = None;
                return;
            };
            let position = ctx.position();
            if position.horizontal_distance(spot) > cfg.pickup_range {
                ctx.move_to(OWNER, spot, cfg.pickup_range * 0.5, false);
                return;
            }
            ctx.halt(OWNER);
            let fits = ctx
                .world
                .entity(drop)
                .and_then(Entity::as_drop)
                .is_some_and(|g| ctx.agent.inventory.can_add(&g.item));
            if !fits {
                ctx.notify(NoticeKind::InventoryFull, "Inventory is full");
                self.finish_drops(ctx);
                return;
            }
            self.drop_target = None;
            match ctx.world.pick_up(drop, ctx.agent.id) {
                Ok(item) => {
                    debug!(agent = %ctx.agent.id, item = %item.name, quantity = item.quantity, "Picked up");
                    if let Err(e) = ctx.agent.inventory.add(item.clone()) {
                        warn!(agent = %ctx.agent.id, error = %e, "Picked-up item did not fit");
                        let position = ctx.position();
                        ctx.world.drop_item(position, item);
                    }
                }
                Err(e) => debug!(agent = %ctx.agent.id, drop = %drop, error = %e, "Pick-up failed"),
            }
            return;
        }

        if ctx.now < self.next_scan {
            return;
        }
        self.next_scan = ctx.now + cfg.scan_interval;
        match self.nearest_drop(ctx) {
            Some(drop) => match ctx.world.claim_drop(drop, ctx.agent.id) {
                Ok(()) => {
                    self.drop_target = Some(drop);
                    self.empty_scans = 0;
                }
                Err(e) => debug!(agent = %ctx.agent.id, drop = %drop, error = %e, "Claim failed"),
            },
            None => {
                self.empty_scans = self.empty_scans.saturating_add(1);
                if self.empty_scans >= ctx.config.harvest.drop_empty_scans {
                    self.finish_drops(ctx);
                }
            }
        }
    }
}
