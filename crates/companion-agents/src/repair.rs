//! Gear maintenance.
//!
//! When any carried or equipped item has worn below a threshold and a
//! station able to service it is in range, the agent walks there, repairs
//! one item per interval, then idles on a cooldown.

use companion_types::{BlacklistReason, EntityId, ItemRecord, MovementOwner, NoticeKind};
use companion_world::{Entity, EntityFilter};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::context::{Approach, TickContext};
use crate::stuck::StallWatch;

const OWNER: MovementOwner = MovementOwner::Repair;

/// Distance past the station's footprint counted as arrived.
const STATION_REACH: f32 = 1.0;

/// Repair controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairPhase {
    /// Waiting for worn gear.
    Idle,
    /// Walking to a station.
    Moving,
    /// Repairing one item per interval.
    Repairing,
}

/// Where a worn item lives on the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GearSlot {
    MainHand,
    Inventory(usize),
}

fn is_worn(item: &ItemRecord, threshold: f32) -> bool {
    item.durability.is_some_and(|d| d.ratio() < threshold)
}

/// The first worn item a station of `tier` can service.
fn worn_slot(agent: &Agent, threshold: f32, tier: u8) -> Option<GearSlot> {
    if agent
        .main_hand()
        .is_some_and(|item| is_worn(item, threshold) && item.tier <= tier)
    {
        return Some(GearSlot::MainHand);
    }
    agent
        .inventory
        .all_items()
        .iter()
        .position(|item| is_worn(item, threshold) && item.tier <= tier)
        .map(GearSlot::Inventory)
}

/// The repair controller.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairController {
    phase: RepairPhase,
    station: Option<EntityId>,
    next_repair: f64,
    cooldown_until: f64,
    stall: StallWatch,
}

impl Default for RepairController {
    fn default() -> Self {
        Self::new()
    }
}

impl RepairController {
    /// An idle controller.
    pub const fn new() -> Self {
        Self {
            phase: RepairPhase::Idle,
            station: None,
            next_repair: 0.0,
            cooldown_until: 0.0,
            stall: StallWatch::new(),
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> RepairPhase {
        self.phase
    }

    /// Whether the controller owns movement.
    pub fn is_active(&self) -> bool {
        self.phase != RepairPhase::Idle
    }

    /// Drop transient state. The cooldown survives.
    pub fn reset(&mut self) {
        let cooldown_until = self.cooldown_until;
        *self = Self::new();
        self.cooldown_until = cooldown_until;
    }

    /// Start if gear is worn and a station covering it is in range.
    pub fn try_start(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let config = ctx.config;
        let cfg = &config.repair;
        if self.is_active() || ctx.now < self.cooldown_until {
            return false;
        }
        let needs_repair = ctx.agent.all_gear().any(|item| is_worn(item, cfg.threshold));
        if !needs_repair {
            return false;
        }

        let position = ctx.position();
        let mut best: Option<(EntityId, f32)> = None;
        for id in ctx
            .world
            .overlap_sphere(position, cfg.search_radius, EntityFilter::RepairStation)
        {
            if ctx.is_blacklisted(id) {
                continue;
            }
            let Some((spot, station)) = ctx
                .live(id)
                .and_then(|e| e.as_station().map(|s| (e.position, s)))
            else {
                continue;
            };
            if worn_slot(ctx.agent, cfg.threshold, station.tier).is_none() {
                continue;
            }
            let distance = position.horizontal_distance(spot);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        let Some((station, _)) = best else {
            return false;
        };
        info!(agent = %ctx.agent.id, station = %station, "Heading to repair");
        self.station = Some(station);
        self.stall.reset();
        self.phase = RepairPhase::Moving;
        true
    }

    /// Run one tick. Returns the phase afterwards.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> RepairPhase {
        let config = ctx.config;
        let cfg = &config.repair;
        let Some(station) = self.station else {
            self.finish(ctx);
            return self.phase;
        };
        let Some(entity) = ctx.live(station).cloned() else {
            debug!(agent = %ctx.agent.id, station = %station, "Repair station gone");
            self.finish(ctx);
            return self.phase;
        };

        match self.phase {
            RepairPhase::Idle => {}
            RepairPhase::Moving => {
                let arrive = entity.radius + STATION_REACH;
                match ctx.approach(
                    OWNER,
                    entity.position,
                    arrive,
                    &mut self.stall,
                    cfg.stall_displacement,
                    cfg.stall_secs,
                ) {
                    Approach::Arrived => {
                        self.next_repair = ctx.now + cfg.interval;
                        self.phase = RepairPhase::Repairing;
                    }
                    Approach::Stalled => {
                        info!(agent = %ctx.agent.id, station = %station, "Repair station unreachable");
                        ctx.memory.blacklist.add(station, BlacklistReason::Unreachable, ctx.now);
                        ctx.notify(NoticeKind::Unreachable, "Cannot reach the repair station");
                        self.finish(ctx);
                    }
                    Approach::EnRoute | Approach::Refused => {}
                }
            }
            RepairPhase::Repairing => self.tick_repairing(ctx, &entity),
        }
        self.phase
    }

    fn tick_repairing(&mut self, ctx: &mut TickContext<'_>, entity: &Entity) {
        ctx.hold_facing(OWNER, entity.center());
        if ctx.now < self.next_repair {
            return;
        }
        let config = ctx.config;
        self.next_repair = ctx.now + config.repair.interval;
        let Some(station) = entity.as_station() else {
            self.finish(ctx);
            return;
        };
        let Some(slot) = worn_slot(ctx.agent, config.repair.threshold, station.tier) else {
            self.finish(ctx);
            return;
        };
        let item = match slot {
            GearSlot::MainHand => ctx.agent.main_hand_mut(),
            GearSlot::Inventory(index) => ctx.agent.inventory.items_mut().get_mut(index),
        };
        let Some(item) = item else {
            self.finish(ctx);
            return;
        };
        let repaired = ctx.world.repair(entity.id, item).map(|()| item.name.clone());
        match repaired {
            Ok(name) => info!(agent = %ctx.agent.id, item = %name, station = %entity.id, "Repaired"),
            Err(e) => {
                debug!(agent = %ctx.agent.id, station = %entity.id, error = %e, "Repair refused");
                self.finish(ctx);
            }
        }
    }

    fn finish(&mut self, ctx: &TickContext<'_>) {
        self.station = None;
        self.stall.reset();
        self.phase = RepairPhase::Idle;
        self.cooldown_until = ctx.now + ctx.config.repair.cooldown;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use companion_types::{AgentClass, ItemCategory, ResourceKind, ToolClass};
    use companion_world::Inventory;

    use super::*;
    use crate::agent::AgentManager;

    fn worn_axe(tier: u8) -> ItemRecord {
        let mut axe = ItemRecord::tool("Axe", ToolClass::Axe, 10.0, tier, 100.0);
        if let Some(d) = axe.durability.as_mut() {
            d.current = 10.0;
        }
        axe
    }

    #[test]
    fn worn_slot_respects_station_tier() {
        let mut manager = AgentManager::new();
        let mut inventory = Inventory::new(8, 100.0);
        inventory.add(ItemRecord::stack("Log", ItemCategory::Material, 3, 1.0)).unwrap();
        inventory.add(worn_axe(2)).unwrap();
        let agent = manager.create("Ash".to_owned(), AgentClass::Humanoid, 100.0, inventory).unwrap();

        assert_eq!(worn_slot(&agent, 0.3, 1), None);
        assert_eq!(worn_slot(&agent, 0.3, 2), Some(GearSlot::Inventory(1)));
    }

    #[test]
    fn equipped_gear_is_checked_first() {
        let mut manager = AgentManager::new();
        let mut inventory = Inventory::new(8, 100.0);
        inventory.add(worn_axe(0)).unwrap();
        inventory.add(worn_axe(0)).unwrap();
        let mut agent = manager.create("Ash".to_owned(), AgentClass::Humanoid, 100.0, inventory).unwrap();
        assert!(agent.equip_best_tool(ResourceKind::Wood, 0));
        assert_eq!(worn_slot(&agent, 0.3, 0), Some(GearSlot::MainHand));
        assert_eq!(worn_slot(&agent, 0.05, 0), None);
    }
}
