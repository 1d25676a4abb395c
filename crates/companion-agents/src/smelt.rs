//! Production/logistics state machine.
//!
//! The controller keeps nearby fixtures (smelters, kilns) supplied and
//! empties their output into containers:
//!
//! ```text
//! Idle → Scanning → MovingToChest → TakingFromChest → MovingToSmelter → InsertingItem ─┐
//!          ↑  └──→ Monitoring ──────────────────────────────────────────────────────────┤
//!          └──── CollectingOutput → MovingToOutputChest → StoringOutput ←───────────────┘
//! ```
//!
//! Refill decisions come from [`plan_refill`], a pure function over
//! snapshots so it can be tested without a world. Every travelling phase
//! shares one [`StallWatch`]; a stall aborts the whole task and excludes
//! the destination as unreachable.

use companion_types::{
    BlacklistReason, EntityId, ItemCategory, MovementOwner, NoticeKind, SmeltPhase, Vec3,
};
use companion_world::{Entity, EntityFilter, Fixture, Inventory, WorldError};
use tracing::{debug, info, warn};

use crate::context::{Approach, TickContext};
use crate::error::BehaviorError;
use crate::stuck::StallWatch;

const OWNER: MovementOwner = MovementOwner::Smelt;

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Where carried material comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A container in the world.
    Container(EntityId),
    /// The agent's own inventory.
    Inventory,
}

/// One planned delivery. Exists only while in transit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarryTask {
    /// Where the material is fetched.
    pub source: Source,
    /// The fixture receiving it.
    pub destination: EntityId,
    /// Item kind.
    pub item: String,
    /// Whether the item goes in as fuel.
    pub is_fuel: bool,
    /// Units still to deliver.
    pub quantity: u32,
}

/// What a fixture needs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Need {
    /// Input material.
    Ore,
    /// Fuel.
    Fuel,
}

/// Planner view of a fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSnapshot {
    /// Fixture key.
    pub id: EntityId,
    /// Accepted input names.
    pub inputs: Vec<String>,
    /// Fuel item, if the fixture burns fuel.
    pub fuel_item: Option<String>,
    /// Queued input units.
    pub ore: u32,
    /// Input capacity.
    pub max_ore: u32,
    /// Stored fuel units.
    pub fuel: u32,
    /// Fuel capacity.
    pub max_fuel: u32,
    /// Fuel burned per product.
    pub fuel_per_product: u32,
}

impl FixtureSnapshot {
    /// Snapshot a live fixture.
    pub fn of(id: EntityId, fixture: &Fixture) -> Self {
        Self {
            id,
            inputs: fixture.conversions.iter().map(|c| c.input.clone()).collect(),
            fuel_item: fixture.fuel_item.clone(),
            ore: fixture.ore_count(),
            max_ore: fixture.max_ore,
            fuel: fixture.fuel,
            max_fuel: fixture.max_fuel,
            fuel_per_product: fixture.fuel_per_product,
        }
    }
}

/// Planner view of a container: item name and unit count, per stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    /// Container key.
    pub id: EntityId,
    /// Held items.
    pub items: Vec<(String, u32)>,
}

impl ContainerSnapshot {
    /// Snapshot a container inventory.
    pub fn of(id: EntityId, inventory: &Inventory) -> Self {
        Self {
            id,
            items: inventory
                .all_items()
                .iter()
                .map(|item| (item.name.clone(), item.quantity))
                .collect(),
        }
    }

    fn count(&self, name: &str) -> u32 {
        self.items
            .iter()
            .filter(|(n, _)| n == name)
            .fold(0_u32, |acc, (_, q)| acc.saturating_add(*q))
    }
}

/// The per-fixture decision table.
///
/// Fixtures without fuel only ever need input. Fueled fixtures:
/// no input queued ⇒ input; input queued but fuel below one product's
/// cost ⇒ fuel; input not full and fuel adequate ⇒ top up input; input
/// full and fuel below half ⇒ top up fuel; otherwise nothing.
pub fn refill_need(fixture: &FixtureSnapshot) -> Option<Need> {
    let ore_full = fixture.ore >= fixture.max_ore;
    if fixture.fuel_item.is_none() {
        return (!ore_full).then_some(Need::Ore);
    }
    let fuel_low = fixture.fuel < fixture.fuel_per_product;
    let fuel_full = fixture.fuel >= fixture.max_fuel;
    if fixture.ore == 0 && !ore_full {
        Some(Need::Ore)
    } else if fixture.ore > 0 && fuel_low && !fuel_full {
        Some(Need::Fuel)
    } else if !ore_full && !fuel_low {
        Some(Need::Ore)
    } else if ore_full && fixture.fuel.saturating_mul(2) < fixture.max_fuel {
        Some(Need::Fuel)
    } else {
        None
    }
}

/// Choose the next delivery.
///
/// Fixtures are served in stable order, those needing no fuel first. For
/// the first fixture with a need that some source can satisfy, the agent's
/// own inventory is preferred over any container.
pub fn plan_refill(
    fixtures: &[FixtureSnapshot],
    containers: &[ContainerSnapshot],
    own: &Inventory,
) -> Option<CarryTask> {
    let mut ordered: Vec<&FixtureSnapshot> = fixtures.iter().collect();
    ordered.sort_by_key(|f| (f.fuel_item.is_some(), f.id));

    ordered.into_iter().find_map(|fixture| {
        let need = refill_need(fixture)?;
        let (names, room, is_fuel) = match need {
            Need::Ore => (
                fixture.inputs.clone(),
                fixture.max_ore.saturating_sub(fixture.ore),
                false,
            ),
            Need::Fuel => (
                fixture.fuel_item.iter().cloned().collect::<Vec<_>>(),
                fixture.max_fuel.saturating_sub(fixture.fuel),
                true,
            ),
        };
        if room == 0 {
            return None;
        }
        let task = |source, item: &str, available: u32| CarryTask {
            source,
            destination: fixture.id,
            item: item.to_owned(),
            is_fuel,
            quantity: available.min(room),
        };
        names
            .iter()
            .find_map(|name| {
                let held = own.count(name);
                (held > 0).then(|| task(Source::Inventory, name, held))
            })
            .or_else(|| {
                containers.iter().find_map(|chest| {
                    names.iter().find_map(|name| {
                        let stored = chest.count(name);
                        (stored > 0).then(|| task(Source::Container(chest.id), name, stored))
                    })
                })
            })
    })
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

enum Travel {
    Arrived,
    EnRoute,
    Aborted,
}

/// The production controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SmeltController {
    phase: SmeltPhase,
    task: Option<CarryTask>,
    open_container: Option<EntityId>,
    focus: Option<EntityId>,
    output_chest: Option<EntityId>,
    released: bool,
    wait_until: f64,
    next_scan: f64,
    stall: StallWatch,
}

impl Default for SmeltController {
    fn default() -> Self {
        Self::new()
    }
}

impl SmeltController {
    /// An idle controller.
    pub const fn new() -> Self {
        Self {
            phase: SmeltPhase::Idle,
            task: None,
            open_container: None,
            focus: None,
            output_chest: None,
            released: false,
            wait_until: 0.0,
            next_scan: 0.0,
            stall: StallWatch::new(),
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> SmeltPhase {
        self.phase
    }

    /// The delivery in progress.
    pub const fn task(&self) -> Option<&CarryTask> {
        self.task.as_ref()
    }

    /// The container currently held open.
    pub const fn open_container(&self) -> Option<EntityId> {
        self.open_container
    }

    /// Whether the controller owns movement.
    pub fn is_active(&self) -> bool {
        self.phase != SmeltPhase::Idle
    }

    /// Close any open container and drop all transient state.
    pub fn reset(&mut self, ctx: &mut TickContext<'_>) {
        self.close(ctx);
        *self = Self::new();
    }

    /// Run one tick. Returns the phase afterwards.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> SmeltPhase {
        let config = ctx.config;
        if self.phase == SmeltPhase::Idle {
            if ctx.now < self.next_scan || ctx.hostile_near(config.smelt.hostile_radius) {
                return self.phase;
            }
            self.next_scan = ctx.now + config.smelt.scan_interval;
            self.set_phase(ctx, SmeltPhase::Scanning);
        } else if ctx.hostile_near(config.smelt.hostile_radius) {
            info!(agent = %ctx.agent.id, phase = ?self.phase, "Hostile nearby, aborting production");
            self.abort(ctx);
            return self.phase;
        }

        match self.phase {
            SmeltPhase::Idle => {}
            SmeltPhase::Scanning => self.scan(ctx),
            SmeltPhase::MovingToChest => self.tick_to_chest(ctx),
            SmeltPhase::TakingFromChest => self.tick_take(ctx),
            SmeltPhase::MovingToSmelter => self.tick_to_fixture(ctx),
            SmeltPhase::InsertingItem => self.tick_insert(ctx),
            SmeltPhase::Monitoring => self.tick_monitor(ctx),
            SmeltPhase::CollectingOutput => self.tick_collect(ctx),
            SmeltPhase::MovingToOutputChest => self.tick_to_output_chest(ctx),
            SmeltPhase::StoringOutput => self.tick_store(ctx),
        }
        self.phase
    }

    fn set_phase(&mut self, ctx: &TickContext<'_>, phase: SmeltPhase) {
        if self.phase != phase {
            debug!(agent = %ctx.agent.id, from = ?self.phase, to = ?phase, "Smelt phase");
            self.phase = phase;
            self.stall.reset();
        }
    }

    fn close(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(container) = self.open_container.take() {
            ctx.world.close_container(container, ctx.agent.id);
        }
    }

    /// Abandon the whole task and go idle.
    fn abort(&mut self, ctx: &mut TickContext<'_>) {
        self.close(ctx);
        self.task = None;
        self.focus = None;
        self.output_chest = None;
        self.released = false;
        self.next_scan = ctx.now + ctx.config.smelt.scan_interval;
        self.set_phase(ctx, SmeltPhase::Idle);
    }

    /// Drop the current sub-task and rescan on the next tick.
    fn rescan(&mut self, ctx: &mut TickContext<'_>) {
        self.close(ctx);
        self.task = None;
        self.focus = None;
        self.output_chest = None;
        self.released = false;
        self.set_phase(ctx, SmeltPhase::Scanning);
    }

    fn travel(&mut self, ctx: &mut TickContext<'_>, point: Vec3, arrive: f32, destination: EntityId) -> Travel {
        let config = ctx.config;
        match ctx.approach(
            OWNER,
            point,
            arrive,
            &mut self.stall,
            config.smelt.stall_displacement,
            config.smelt.stall_secs,
        ) {
            Approach::Arrived => Travel::Arrived,
            Approach::EnRoute | Approach::Refused => Travel::EnRoute,
            Approach::Stalled => {
                let err = BehaviorError::Unreachable {
                    target: destination,
                };
                info!(agent = %ctx.agent.id, error = %err, phase = ?self.phase, "Production stalled");
                ctx.memory.blacklist.add(destination, BlacklistReason::Unreachable, ctx.now);
                ctx.notify(NoticeKind::Unreachable, "Cannot reach the workstation");
                self.abort(ctx);
                Travel::Aborted
            }
        }
    }

    /// Point in front of a fixture's control side, outside its footprint.
    fn control_point(ctx: &TickContext<'_>, entity: &Entity, fixture: &Fixture) -> Vec3 {
        Self::offset_point(ctx, entity, fixture.control_offset)
    }

    /// Point on a fixture's output side.
    fn output_point(ctx: &TickContext<'_>, entity: &Entity, fixture: &Fixture) -> Vec3 {
        Self::offset_point(ctx, entity, fixture.output_offset)
    }

    fn offset_point(ctx: &TickContext<'_>, entity: &Entity, offset: Vec3) -> Vec3 {
        let mut direction = offset.horizontal().normalize_or_zero();
        if direction == Vec3::ZERO {
            direction = entity.position.direction_to(ctx.position());
        }
        let point = entity.position + direction * (entity.radius + ctx.config.smelt.interact_offset);
        ctx.world.ground_height(point).map_or(point, |y| point.with_y(y))
    }

    fn is_output(category: ItemCategory) -> bool {
        category == ItemCategory::Refined
    }

    // -------------------------------------------------------------------
    // Scanning
    // -------------------------------------------------------------------

    fn scan(&mut self, ctx: &mut TickContext<'_>) {
        let config = ctx.config;
        let position = ctx.position();
        let radius = config.smelt.scan_radius;

        let mut fixtures: Vec<(EntityId, Fixture)> = Vec::new();
        for id in ctx.world.overlap_sphere(position, radius, EntityFilter::Fixture) {
            if ctx.is_blacklisted(id) {
                continue;
            }
            if let Some(fixture) = ctx.live(id).and_then(Entity::as_fixture) {
                fixtures.push((id, fixture.clone()));
            }
        }
        let mut containers: Vec<ContainerSnapshot> = Vec::new();
        for id in ctx.world.overlap_sphere(position, radius, EntityFilter::Container) {
            if ctx.is_blacklisted(id) {
                continue;
            }
            if let Some(container) = ctx.live(id).and_then(Entity::as_container) {
                containers.push(ContainerSnapshot::of(id, &container.inventory));
            }
        }

        let holding_output = ctx
            .agent
            .inventory
            .all_items()
            .iter()
            .any(|item| Self::is_output(item.category));
        if holding_output && self.begin_store(ctx) {
            return;
        }

        if let Some((id, _)) = fixtures.iter().find(|(_, f)| f.ready_count() > 0) {
            self.focus = Some(*id);
            self.released = false;
            self.wait_until = 0.0;
            self.set_phase(ctx, SmeltPhase::CollectingOutput);
            return;
        }

        let snapshots: Vec<FixtureSnapshot> = fixtures
            .iter()
            .map(|(id, f)| FixtureSnapshot::of(*id, f))
            .collect();
        if let Some(task) = plan_refill(&snapshots, &containers, &ctx.agent.inventory) {
            info!(
                agent = %ctx.agent.id,
                fixture = %task.destination,
                item = %task.item,
                quantity = task.quantity,
                fuel = task.is_fuel,
                "Planned delivery"
            );
            ctx.clear_notice(NoticeKind::NothingToProcess);
            let next = match task.source {
                Source::Container(_) => SmeltPhase::MovingToChest,
                Source::Inventory => SmeltPhase::MovingToSmelter,
            };
            self.task = Some(task);
            self.set_phase(ctx, next);
            return;
        }

        let busiest = fixtures
            .iter()
            .filter(|(_, f)| f.is_processing())
            .max_by_key(|(id, f)| (f.ore_count(), core::cmp::Reverse(*id)))
            .map(|(id, _)| *id);
        if let Some(id) = busiest {
            self.focus = Some(id);
            self.wait_until = ctx.now + config.smelt.monitor_interval;
            self.set_phase(ctx, SmeltPhase::Monitoring);
            return;
        }

        ctx.notify(NoticeKind::NothingToProcess, "Nothing left to process");
        self.next_scan = ctx.now + config.smelt.scan_interval;
        self.set_phase(ctx, SmeltPhase::Idle);
    }

    // -------------------------------------------------------------------
    // Refill
    // -------------------------------------------------------------------

    fn tick_to_chest(&mut self, ctx: &mut TickContext<'_>) {
        let Some(Source::Container(chest)) = self.task.as_ref().map(|t| t.source) else {
            self.rescan(ctx);
            return;
        };
        let Some((spot, radius)) = ctx.live(chest).map(|e| (e.position, e.radius)) else {
            self.rescan(ctx);
            return;
        };
        let arrive = radius + ctx.config.smelt.interact_offset;
        match self.travel(ctx, spot, arrive, chest) {
            Travel::Arrived => {
                if self.open(ctx, chest) {
                    self.set_phase(ctx, SmeltPhase::TakingFromChest);
                } else {
                    self.rescan(ctx);
                }
            }
            Travel::EnRoute | Travel::Aborted => {}
        }
    }

    /// Open `container`; a busy container is excluded briefly.
    fn open(&mut self, ctx: &mut TickContext<'_>, container: EntityId) -> bool {
        match ctx.world.open_container(container, ctx.agent.id) {
            Ok(()) => {
                self.open_container = Some(container);
                self.wait_until = ctx.now + ctx.config.smelt.open_settle;
                true
            }
            Err(e) => {
                let class = BehaviorError::from_world(container, &e);
                debug!(agent = %ctx.agent.id, error = %class, "Container unavailable");
                if matches!(class, BehaviorError::TransientBusy { .. }) {
                    ctx.memory.blacklist.add(container, BlacklistReason::Occupied, ctx.now);
                }
                false
            }
        }
    }

    fn tick_take(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.now < self.wait_until {
            return;
        }
        let wanted = self.task.as_ref().map(|t| (t.item.clone(), t.quantity));
        let (Some(chest), Some((item, quantity))) = (self.open_container, wanted) else {
            self.rescan(ctx);
            return;
        };
        let taken = match ctx.world.take_from_container(chest, ctx.agent.id, &item, quantity) {
            Ok(taken) => taken,
            Err(e) => {
                debug!(agent = %ctx.agent.id, container = %chest, error = %e, "Take failed");
                None
            }
        };
        let Some(stack) = taken else {
            debug!(agent = %ctx.agent.id, container = %chest, item = %item, "Container had nothing to take");
            self.rescan(ctx);
            return;
        };
        let got = stack.quantity;
        if let Err(e) = ctx.agent.inventory.add(stack.clone()) {
            warn!(agent = %ctx.agent.id, error = %e, "No room for taken items");
            if let Err(back) = ctx.world.deposit(chest, ctx.agent.id, stack) {
                warn!(agent = %ctx.agent.id, error = %back, "Could not return items");
            }
            ctx.notify(NoticeKind::InventoryFull, "Inventory is full");
            self.rescan(ctx);
            return;
        }
        self.close(ctx);
        if let Some(task) = self.task.as_mut() {
            task.quantity = got;
        }
        self.set_phase(ctx, SmeltPhase::MovingToSmelter);
    }

    fn tick_to_fixture(&mut self, ctx: &mut TickContext<'_>) {
        let Some(destination) = self.task.as_ref().map(|t| t.destination) else {
            self.rescan(ctx);
            return;
        };
        let Some(point) = ctx
            .live(destination)
            .and_then(|e| e.as_fixture().map(|f| Self::control_point(ctx, e, f)))
        else {
            let err = BehaviorError::TargetInvalid {
                target: destination,
            };
            debug!(agent = %ctx.agent.id, error = %err, "Fixture gone");
            self.rescan(ctx);
            return;
        };
        let arrive = ctx.config.smelt.arrive_distance;
        if let Travel::Arrived = self.travel(ctx, point, arrive, destination) {
            self.wait_until = ctx.now;
            self.set_phase(ctx, SmeltPhase::InsertingItem);
        }
    }

    fn tick_insert(&mut self, ctx: &mut TickContext<'_>) {
        let Some(task) = self.task.clone() else {
            self.rescan(ctx);
            return;
        };
        if let Some(center) = ctx.live(task.destination).map(Entity::center) {
            ctx.hold_facing(OWNER, center);
        }
        if ctx.now < self.wait_until {
            return;
        }
        self.wait_until = ctx.now + ctx.config.smelt.insert_interval;
        if task.quantity == 0 || ctx.agent.inventory.count(&task.item) == 0 {
            self.rescan(ctx);
            return;
        }
        match ctx.world.insert_into_fixture(task.destination, &task.item, task.is_fuel) {
            Ok(()) => {
                if let Err(e) = ctx.agent.inventory.remove(&task.item, 1) {
                    warn!(agent = %ctx.agent.id, error = %e, "Inserted item missing from inventory");
                }
                if let Some(current) = self.task.as_mut() {
                    current.quantity = current.quantity.saturating_sub(1);
                }
            }
            Err(WorldError::FixtureFull(_)) => {
                debug!(agent = %ctx.agent.id, fixture = %task.destination, "Fixture full");
                self.rescan(ctx);
            }
            Err(e) => {
                debug!(agent = %ctx.agent.id, fixture = %task.destination, error = %e, "Insert failed");
                self.rescan(ctx);
            }
        }
    }

    fn tick_monitor(&mut self, ctx: &mut TickContext<'_>) {
        let Some(id) = self.focus else {
            self.rescan(ctx);
            return;
        };
        let Some((point, ready)) = ctx.live(id).and_then(|e| {
            e.as_fixture()
                .map(|f| (Self::control_point(ctx, e, f), f.ready_count()))
        }) else {
            self.rescan(ctx);
            return;
        };
        if ready > 0 || ctx.now >= self.wait_until {
            self.rescan(ctx);
            return;
        }
        let arrive = ctx.config.smelt.arrive_distance;
        let _ = self.travel(ctx, point, arrive, id);
    }

    // -------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------

    fn tick_collect(&mut self, ctx: &mut TickContext<'_>) {
        let config = ctx.config;
        let Some(id) = self.focus else {
            self.rescan(ctx);
            return;
        };
        let Some(point) = ctx
            .live(id)
            .and_then(|e| e.as_fixture().map(|f| Self::output_point(ctx, e, f)))
        else {
            self.rescan(ctx);
            return;
        };
        if !self.released {
            if let Travel::Arrived = self.travel(ctx, point, config.smelt.arrive_distance, id) {
                match ctx.world.release_output(id) {
                    Ok(drops) => debug!(agent = %ctx.agent.id, fixture = %id, drops = drops.len(), "Output released"),
                    Err(e) => debug!(agent = %ctx.agent.id, fixture = %id, error = %e, "Nothing released"),
                }
                self.released = true;
                self.wait_until = ctx.now + config.smelt.release_settle;
            }
            return;
        }
        if ctx.now < self.wait_until {
            return;
        }
        self.sweep(ctx, point);
        if !self.begin_store(ctx) {
            self.rescan(ctx);
        }
    }

    /// Pick up output-classified ground items around `point`.
    fn sweep(&mut self, ctx: &mut TickContext<'_>, point: Vec3) {
        let me = ctx.agent.id;
        let nearby = ctx
            .world
            .overlap_sphere(point, ctx.config.smelt.sweep_radius, EntityFilter::Drop);
        for drop in nearby {
            let eligible = ctx.live(drop).and_then(Entity::as_drop).is_some_and(|g| {
                Self::is_output(g.item.category)
                    && g.claimed_by.is_none_or(|holder| holder == me)
                    && ctx.agent.inventory.can_add(&g.item)
            });
            if !eligible || ctx.world.claim_drop(drop, me).is_err() {
                continue;
            }
            match ctx.world.pick_up(drop, me) {
                Ok(item) => {
                    if let Err(e) = ctx.agent.inventory.add(item.clone()) {
                        warn!(agent = %me, error = %e, "Swept item did not fit");
                        let position = ctx.position();
                        ctx.world.drop_item(position, item);
                    }
                }
                Err(e) => debug!(agent = %me, drop = %drop, error = %e, "Sweep pick-up failed"),
            }
        }
    }

    /// Pick a container with room for held output and head there.
    fn begin_store(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let Some(sample) = ctx
            .agent
            .inventory
            .all_items()
            .iter()
            .find(|item| Self::is_output(item.category))
            .cloned()
        else {
            return false;
        };
        let position = ctx.position();
        let mut best: Option<(EntityId, f32)> = None;
        for id in ctx
            .world
            .overlap_sphere(position, ctx.config.smelt.scan_radius, EntityFilter::Container)
        {
            if ctx.is_blacklisted(id) {
                continue;
            }
            let Some((spot, room)) = ctx
                .live(id)
                .and_then(|e| e.as_container().map(|c| (e.position, c.inventory.can_add(&sample))))
            else {
                continue;
            };
            let distance = position.horizontal_distance(spot);
            if room && best.is_none_or(|(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        let Some((chest, _)) = best else {
            ctx.notify(NoticeKind::NoStorage, "No container has room for output");
            return false;
        };
        ctx.clear_notice(NoticeKind::NoStorage);
        self.output_chest = Some(chest);
        self.set_phase(ctx, SmeltPhase::MovingToOutputChest);
        true
    }

    fn tick_to_output_chest(&mut self, ctx: &mut TickContext<'_>) {
        let Some(chest) = self.output_chest else {
            self.rescan(ctx);
            return;
        };
        let Some((spot, radius)) = ctx.live(chest).map(|e| (e.position, e.radius)) else {
            self.rescan(ctx);
            return;
        };
        let arrive = radius + ctx.config.smelt.interact_offset;
        if let Travel::Arrived = self.travel(ctx, spot, arrive, chest) {
            if self.open(ctx, chest) {
                self.set_phase(ctx, SmeltPhase::StoringOutput);
            } else {
                self.rescan(ctx);
            }
        }
    }

    fn tick_store(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.now < self.wait_until {
            return;
        }
        let Some(chest) = self.open_container else {
            self.rescan(ctx);
            return;
        };
        let me = ctx.agent.id;
        let outputs = ctx
            .agent
            .inventory
            .drain_matching(|item| Self::is_output(item.category));
        let mut stored: u32 = 0;
        for item in outputs {
            let quantity = item.quantity;
            match ctx.world.deposit(chest, me, item.clone()) {
                Ok(()) => stored = stored.saturating_add(quantity),
                Err(e) => {
                    debug!(agent = %me, container = %chest, error = %e, "Deposit refused");
                    if let Err(back) = ctx.agent.inventory.add(item) {
                        warn!(agent = %me, error = %back, "Could not keep refused output");
                    }
                    ctx.notify(NoticeKind::NoStorage, "Container is full");
                }
            }
        }
        info!(agent = %me, container = %chest, stored, "Stored output");
        self.rescan(ctx);
    }
}

#[cfg(test)]
mod tests {
    use companion_types::ItemCategory;
    use companion_types::ItemRecord;

    use super::*;

    fn smelter(ore: u32, fuel: u32) -> FixtureSnapshot {
        FixtureSnapshot {
            id: EntityId::new(),
            inputs: vec![String::from("CopperOre")],
            fuel_item: Some(String::from("Coal")),
            ore,
            max_ore: 2,
            fuel,
            max_fuel: 4,
            fuel_per_product: 1,
        }
    }

    fn chest_with_both() -> ContainerSnapshot {
        ContainerSnapshot {
            id: EntityId::new(),
            items: vec![(String::from("CopperOre"), 10), (String::from("Coal"), 10)],
        }
    }

    #[test]
    fn empty_fueled_fixture_gets_ore_first() {
        let fixture = smelter(0, 0);
        let chest = chest_with_both();
        let task = plan_refill(&[fixture], &[chest.clone()], &Inventory::new(8, 100.0));
        let task = task.map(|t| (t.item, t.is_fuel, t.source, t.quantity));
        assert_eq!(
            task,
            Some((String::from("CopperOre"), false, Source::Container(chest.id), 2))
        );
    }

    #[test]
    fn queued_ore_without_fuel_gets_fuel() {
        let fixture = smelter(1, 0);
        let task = plan_refill(&[fixture], &[chest_with_both()], &Inventory::new(8, 100.0));
        let task = task.map(|t| (t.item, t.is_fuel, t.quantity));
        assert_eq!(task, Some((String::from("Coal"), true, 4)));
    }

    #[test]
    fn decision_table() {
        assert_eq!(refill_need(&smelter(2, 1)), Some(Need::Fuel));
        assert_eq!(refill_need(&smelter(2, 3)), None);
        assert_eq!(refill_need(&smelter(1, 2)), Some(Need::Ore));
    }

    #[test]
    fn no_fuel_fixtures_served_first() {
        let fueled = smelter(0, 0);
        let kiln = FixtureSnapshot {
            id: EntityId::new(),
            inputs: vec![String::from("Clay")],
            fuel_item: None,
            ore: 0,
            max_ore: 3,
            fuel: 0,
            max_fuel: 0,
            fuel_per_product: 0,
        };
        let chest = ContainerSnapshot {
            id: EntityId::new(),
            items: vec![(String::from("CopperOre"), 5), (String::from("Clay"), 5)],
        };
        let task = plan_refill(&[fueled, kiln.clone()], &[chest], &Inventory::new(8, 100.0));
        assert_eq!(task.map(|t| t.destination), Some(kiln.id));
    }

    #[test]
    fn own_inventory_skips_chest_trip() {
        let mut own = Inventory::new(8, 100.0);
        assert!(own.add(ItemRecord::stack("CopperOre", ItemCategory::Ore, 1, 1.0)).is_ok());
        let task = plan_refill(&[smelter(0, 0)], &[chest_with_both()], &own);
        assert_eq!(task.map(|t| (t.source, t.quantity)), Some((Source::Inventory, 1)));
    }

    #[test]
    fn unsatisfiable_need_moves_on() {
        let first = smelter(0, 0);
        let second = smelter(1, 0);
        let chest = ContainerSnapshot {
            id: EntityId::new(),
            items: vec![(String::from("Coal"), 3)],
        };
        let task = plan_refill(&[first, second.clone()], &[chest], &Inventory::new(8, 100.0));
        assert_eq!(task.map(|t| (t.destination, t.is_fuel)), Some((second.id, true)));
    }
}
