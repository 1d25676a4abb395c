//! Demo scenario spawner.
//!
//! Builds a homestead around the owner: resource nodes scattered on a ring,
//! a production corner (smelter, kiln, chests), a workbench, a bed, a door
//! and a few hostile creatures at the edge. Companions are created for the
//! owner with starting gear and cycled through modes so every controller
//! has something to do. The layout is drawn from a seeded RNG, so the same
//! seed always produces the same world.

use companion_core::clock::SimClock;
use companion_core::config::SimulationConfig;
use companion_core::tick::SimulationState;
use companion_types::{
    AgentClass, ItemCategory, ItemRecord, Mode, PeerId, ReplicatedRecord, ResourceKind,
    StationKind, ToolClass, Vec3,
};
use companion_world::{Conversion, Fixture, Inventory, SandboxWorld, Terrain};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Layout constants
// -----------------------------------------------------------------------

/// Built-in pool of companion names.
const NAME_POOL: &[&str] = &[
    "Alder", "Birch", "Cedar", "Ember", "Fern", "Grove", "Kestrel", "Lark",
    "Moss", "Reed", "Sage", "Thorn", "Wren", "Yarrow", "Flint", "Gale",
];

/// Modes handed out to companions in spawn order.
const MODE_CYCLE: &[Mode] = &[
    Mode::GatherWood,
    Mode::Stay,
    Mode::GatherStone,
    Mode::GatherOre,
    Mode::Follow,
];

/// Home point of Stay-mode companions; the production corner sits here.
const HOME: Vec3 = Vec3::new(6.0, 0.0, 6.0);

/// Ring on which resource nodes are scattered.
const NODE_RING: (f32, f32) = (10.0, 30.0);

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// Build the demo simulation from configuration.
///
/// # Errors
///
/// Returns [`EngineError::Clock`] if the tick interval is invalid, or
/// [`EngineError::Spawner`] if a companion cannot be created.
pub fn spawn_demo(config: &SimulationConfig) -> Result<SimulationState, EngineError> {
    let mut rng = StdRng::seed_from_u64(config.world.seed);
    let owner = PeerId::new(config.peer.local_peer.clone());

    let mut world = SandboxWorld::new(Terrain::flat(config.world.half_extent));
    world.set_peer_position(owner.clone(), Vec3::ZERO);

    let scenario = &config.scenario;
    for i in 0..scenario.trees {
        let position = ring_point(&mut rng, NODE_RING);
        world.spawn_resource(
            &format!("Tree {i}"),
            ResourceKind::Wood,
            position,
            0,
            40.0,
            vec![ItemRecord::stack("Log", ItemCategory::Material, 3, 1.0)],
        );
    }
    for i in 0..scenario.rocks {
        let position = ring_point(&mut rng, NODE_RING);
        world.spawn_resource(
            &format!("Rock {i}"),
            ResourceKind::Stone,
            position,
            0,
            60.0,
            vec![ItemRecord::stack("Stone", ItemCategory::Material, 2, 2.0)],
        );
    }
    for i in 0..scenario.ore_deposits {
        let position = ring_point(&mut rng, NODE_RING);
        world.spawn_resource(
            &format!("Copper Deposit {i}"),
            ResourceKind::Ore,
            position,
            1,
            80.0,
            vec![ItemRecord::stack("CopperOre", ItemCategory::Ore, 2, 2.0)],
        );
    }
    let edge = config.world.half_extent * 0.8;
    for i in 0..scenario.hostiles {
        let position = ring_point(&mut rng, (edge * 0.8, edge));
        world.spawn_creature(&format!("Wolf {i}"), position, 30.0, true);
    }

    spawn_homestead(&mut world);

    let clock = SimClock::new(config.world.tick_interval_ms)?;
    let mut state = SimulationState::new(clock, world, owner.clone(), config.behavior.clone());

    let pool = NAME_POOL.iter().cycle();
    let modes = MODE_CYCLE.iter().cycle();
    for ((index, name), mode) in (0..scenario.companions).zip(pool).zip(modes) {
        let name = if index < u32::try_from(NAME_POOL.len()).unwrap_or(u32::MAX) {
            (*name).to_owned()
        } else {
            format!("{name} {index}")
        };
        let agent = state
            .names
            .create(name, AgentClass::Humanoid, 100.0, starting_gear(*mode))
            .map_err(|e| EngineError::Spawner {
                message: format!("failed to create companion: {e}"),
            })?;
        let position = ring_point(&mut rng, (2.0, 4.0));
        let record = ReplicatedRecord {
            mode: Some(mode.code()),
            owner: Some(owner.clone()),
            home: Some(HOME),
            home_set: Some(*mode == Mode::Stay),
            formation_slot: i32::try_from(index).ok(),
            stamina: Some(100.0),
            last_recovery_id: None,
        };
        let id = state.add_agent(agent, position, owner.clone(), record);
        info!(agent = %id, mode = ?mode, "Companion spawned");
    }

    info!(
        companions = state.agent_count(),
        trees = scenario.trees,
        rocks = scenario.rocks,
        ore_deposits = scenario.ore_deposits,
        hostiles = scenario.hostiles,
        "Demo scenario spawned"
    );
    Ok(state)
}

/// Place the production corner, storage and stations around [`HOME`].
fn spawn_homestead(world: &mut SandboxWorld) {
    world.spawn_fixture(
        "Smelter",
        HOME + Vec3::new(0.0, 0.0, 3.0),
        Fixture::new(
            vec![Conversion {
                input: "CopperOre".to_owned(),
                output: "CopperBar".to_owned(),
            }],
            Some("Coal".to_owned()),
            4,
            6,
            1,
            5.0,
        ),
    );
    world.spawn_fixture(
        "Kiln",
        HOME + Vec3::new(-3.0, 0.0, 3.0),
        Fixture::new(
            vec![Conversion {
                input: "Clay".to_owned(),
                output: "Brick".to_owned(),
            }],
            None,
            4,
            0,
            0,
            4.0,
        ),
    );

    let mut supplies = Inventory::new(16, 500.0);
    for item in [
        ItemRecord::stack("Coal", ItemCategory::Fuel, 8, 1.0),
        ItemRecord::stack("CopperOre", ItemCategory::Ore, 6, 2.0),
        ItemRecord::stack("Clay", ItemCategory::Ore, 4, 1.5),
    ] {
        if let Err(e) = supplies.add(item) {
            warn!(error = %e, "Supply chest stock dropped");
        }
    }
    world.spawn_container("Supply Chest", HOME + Vec3::new(3.0, 0.0, 3.0), supplies);
    world.spawn_container("Storage Chest", HOME + Vec3::new(3.0, 0.0, 0.0), Inventory::new(16, 500.0));

    world.spawn_station("Workbench", HOME + Vec3::new(-3.0, 0.0, -2.0), StationKind::Workbench, 1);
    world.spawn_station("Bed", HOME + Vec3::new(0.0, 0.0, -4.0), StationKind::Bed, 0);
    world.spawn_door(HOME + Vec3::new(-5.0, 0.0, 0.0), false);
}

/// Starting inventory for a companion spawned in `mode`.
fn starting_gear(mode: Mode) -> Inventory {
    let mut inventory = Inventory::new(12, 200.0);
    let mut items = vec![ItemRecord::weapon("Spear", 8.0, 2.2, true, 100.0)];
    match mode {
        Mode::GatherWood => items.push(ItemRecord::tool("Stone Axe", ToolClass::Axe, 6.0, 0, 60.0)),
        Mode::GatherStone | Mode::GatherOre => {
            items.push(ItemRecord::tool("Bronze Pickaxe", ToolClass::Pickaxe, 9.0, 1, 60.0));
        }
        Mode::Stay => items.push(ItemRecord::stack("Coal", ItemCategory::Fuel, 2, 1.0)),
        Mode::Follow => {}
    }
    for item in items {
        if let Err(e) = inventory.add(item) {
            warn!(error = %e, "Starting gear dropped");
        }
    }
    inventory
}

/// A point on the ground at a random angle and distance within `band`.
fn ring_point(rng: &mut impl Rng, band: (f32, f32)) -> Vec3 {
    let angle: f32 = rng.random_range(0.0..std::f32::consts::TAU);
    let distance: f32 = rng.random_range(band.0..band.1);
    Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use companion_world::{EntityKind, ReplicatedStore};

    use super::*;

    #[test]
    fn spawns_configured_population() {
        let config = SimulationConfig::default();
        let state = spawn_demo(&config).unwrap();
        assert_eq!(state.agent_count(), config.scenario.companions);

        let trees = state
            .world
            .entities()
            .filter(|e| matches!(&e.kind, EntityKind::Resource(n) if n.kind == ResourceKind::Wood))
            .count();
        assert_eq!(trees, config.scenario.trees as usize);
    }

    #[test]
    fn companions_belong_to_local_peer() {
        let state = spawn_demo(&SimulationConfig::default()).unwrap();
        for id in state.agents.keys() {
            assert!(state.store.is_authoritative(&state.local_peer, *id));
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let config = SimulationConfig::default();
        let a = spawn_demo(&config).unwrap();
        let b = spawn_demo(&config).unwrap();
        let positions = |s: &SimulationState| {
            s.world
                .entities()
                .map(|e| (e.name.clone(), e.position))
                .collect::<BTreeMap<_, _>>()
        };
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn stay_companion_has_home_set() {
        let state = spawn_demo(&SimulationConfig::default()).unwrap();
        let homes = state
            .agents
            .keys()
            .filter_map(|id| state.store.record(*id))
            .filter(|r| r.mode() == Some(Mode::Stay))
            .filter_map(ReplicatedRecord::home_point)
            .count();
        assert_eq!(homes, 1);
    }
}
