//! Production logistics: output storage, monitoring, busy containers and
//! stalled deliveries.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

mod common;

use common::{Harness, copper_smelter, inventory_of, raised, supplies};
use companion_types::{
    AgentId, BlacklistReason, ItemCategory, ItemRecord, Mode, NoticeKind, SmeltPhase, ToolClass,
    Vec3,
};
use companion_world::{Interaction, Inventory, Perception, Pool};

#[test]
fn finished_output_is_stored_and_other_items_are_kept() {
    let carried = inventory_of(vec![
        ItemRecord::tool("Stone Pickaxe", ToolClass::Pickaxe, 5.0, 0, 100.0),
        ItemRecord::stack("Log", ItemCategory::Material, 3, 1.0),
    ]);
    let mut h = Harness::new(Mode::Stay, carried);
    let mut smelter = copper_smelter();
    smelter.ready = vec!["CopperBar".to_owned(); 3];
    h.world.spawn_fixture("Smelter", Vec3::new(0.0, 0.0, -5.0), smelter);
    let store = h
        .world
        .spawn_container("Storage", Vec3::new(4.0, 0.0, -2.0), Inventory::new(8, 200.0));

    let mut phases: Vec<SmeltPhase> = Vec::new();
    h.run_until(300, |h, r| {
        if phases.last() != Some(&r.smelt) {
            phases.push(r.smelt);
        }
        h.chest_count(store, "CopperBar") == 3
    });

    let collect = phases.iter().position(|p| *p == SmeltPhase::CollectingOutput).unwrap();
    let carry = phases.iter().position(|p| *p == SmeltPhase::MovingToOutputChest).unwrap();
    let put = phases.iter().position(|p| *p == SmeltPhase::StoringOutput).unwrap();
    assert!(collect < carry && carry < put, "{phases:?}");

    assert_eq!(h.agent.inventory.count("CopperBar"), 0);
    assert_eq!(h.agent.inventory.count("Log"), 3);
    assert_eq!(h.agent.inventory.count("Stone Pickaxe"), 1);
    assert_eq!(h.chest_count(store, "Log"), 0);
    h.tick();
    assert_eq!(h.chest_holder(store), None);
}

#[test]
fn processing_fixture_is_monitored_until_output_is_ready() {
    let mut h = Harness::new(Mode::Stay, Inventory::new(8, 100.0));
    let mut smelter = copper_smelter();
    smelter.queued = vec!["CopperOre".to_owned()];
    smelter.fuel = 4;
    smelter.seconds_per_product = 3.0;
    let fixture = h
        .world
        .spawn_fixture("Smelter", Vec3::new(0.0, 0.0, -4.0), smelter);

    let ready = |h: &Harness| {
        h.world
            .entity(fixture)
            .and_then(|e| e.as_fixture())
            .map_or(0, |f| f.ready_count())
    };

    h.run_until(20, |_, r| r.smelt == SmeltPhase::Monitoring);
    assert_eq!(ready(&h), 0);
    h.run_until(60, |_, r| r.smelt == SmeltPhase::CollectingOutput);
    assert_eq!(ready(&h), 1);
    assert!(h.now >= 3.0);
}

#[test]
fn busy_container_is_skipped_for_another() {
    let mut h = Harness::new(Mode::Stay, Inventory::new(8, 100.0));
    h.world
        .spawn_fixture("Smelter", Vec3::new(0.0, 0.0, -5.0), copper_smelter());
    let a = h
        .world
        .spawn_container("Chest", Vec3::new(3.0, 0.0, 0.0), supplies(3, 3));
    let b = h
        .world
        .spawn_container("Chest", Vec3::new(0.0, 0.0, 3.0), supplies(3, 3));
    // Candidates are served in key order, so the busy one is tried first.
    let (busy, free) = if a < b { (a, b) } else { (b, a) };
    let other = AgentId::new();
    h.world.open_container(busy, other).unwrap();

    h.run_until(150, |h, _| h.coordinator.smelt().open_container() == Some(free));

    let entry = h.memory.blacklist.entry(busy).unwrap();
    assert_eq!(entry.reason, BlacklistReason::Occupied);
    assert_eq!(h.chest_holder(busy), Some(other));
    assert_eq!(h.chest_holder(free), Some(h.agent.id));
}

#[test]
fn stalled_delivery_aborts_and_excludes_fixture() {
    let carried = inventory_of(vec![ItemRecord::stack("CopperOre", ItemCategory::Ore, 2, 1.0)]);
    let mut h = Harness::new(Mode::Stay, carried);
    let island = Vec3::new(0.0, 0.0, -8.0);
    h.world.terrain_mut().pools.push(Pool {
        center: island,
        radius: 4.0,
    });
    let fixture = h.world.spawn_fixture("Smelter", island, copper_smelter());

    h.run_until(20, |_, r| r.smelt == SmeltPhase::MovingToSmelter);
    let mut reports = Vec::new();
    for _ in 0..200 {
        reports.push(h.tick());
        if h.memory.blacklist.entry(fixture).is_some() {
            break;
        }
    }

    let entry = h.memory.blacklist.entry(fixture).expect("delivery never stalled");
    assert_eq!(entry.reason, BlacklistReason::Unreachable);
    assert!(raised(&reports, NoticeKind::Unreachable));
    assert_eq!(h.coordinator.smelt().phase(), SmeltPhase::Idle);
    assert!(h.coordinator.smelt().task().is_none());
    assert_eq!(h.agent.inventory.count("CopperOre"), 2);
}
