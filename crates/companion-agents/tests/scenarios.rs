//! Scenario tests driving the coordinator against the sandbox world.
//!
//! Each test builds a small world around one agent, runs whole ticks
//! (coordinator, then body integration, then fixture processing) and
//! checks the observable result.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

mod common;

use common::{DT, Harness, axes, copper_smelter, logs, supplies};
use companion_agents::{DirectedRequest, ResetCause, TickContext};
use companion_types::{
    HarvestPhase, ItemCategory, ItemRecord, Mode, MovementOwner, PeerId, ReplicatedRecord,
    ResourceKind, SmeltPhase, Vec3,
};
use companion_world::{EntityKind, Inventory, MovementDriver, Perception, RecordChange};

// =============================================================================
// Harvest
// =============================================================================

#[test]
fn gather_wood_acquires_tree_with_best_axe() {
    let mut h = Harness::new(Mode::GatherWood, axes());
    let tree = h
        .world
        .spawn_resource("Pine", ResourceKind::Wood, Vec3::new(6.0, 0.0, 0.0), 0, 50.0, logs());

    let report = h.tick();

    assert_eq!(report.harvest, HarvestPhase::Moving);
    assert_eq!(h.coordinator.harvest().target(), Some(tree));
    assert_eq!(h.agent.main_hand().map(|i| i.name.as_str()), Some("Iron Axe"));
}

#[test]
fn target_dying_mid_attack_returns_to_idle() {
    let mut h = Harness::new(Mode::GatherWood, axes());
    let tree = h
        .world
        .spawn_resource("Pine", ResourceKind::Wood, Vec3::new(1.8, 0.0, 0.0), 0, 500.0, logs());

    h.run_until(20, |_, r| r.harvest == HarvestPhase::Attacking);

    if let Some(entity) = h.world.entity_mut(tree)
        && let EntityKind::Resource(node) = &mut entity.kind
    {
        node.health = 0.0;
    }
    assert!(h.world.entity(tree).is_some_and(|e| !e.is_live()));

    let report = h.tick();
    assert_eq!(report.harvest, HarvestPhase::Idle);
    assert_eq!(h.coordinator.harvest().target(), None);
}

#[test]
fn gather_without_tool_raises_one_notice() {
    let mut h = Harness::new(Mode::GatherWood, Inventory::new(8, 100.0));
    h.world
        .spawn_resource("Pine", ResourceKind::Wood, Vec3::new(6.0, 0.0, 0.0), 0, 50.0, logs());

    let first = h.tick();
    assert_eq!(first.notices.len(), 1);
    for _ in 0..20 {
        assert!(h.tick().notices.is_empty());
    }
    assert_eq!(h.coordinator.harvest().phase(), HarvestPhase::Idle);
}

// =============================================================================
// Production
// =============================================================================

#[test]
fn stay_mode_feeds_smelter_from_own_inventory() {
    let mut inventory = Inventory::new(8, 100.0);
    inventory
        .add(ItemRecord::stack("CopperOre", ItemCategory::Ore, 2, 1.0))
        .unwrap();
    let mut h = Harness::new(Mode::Stay, inventory);
    let smelter = h
        .world
        .spawn_fixture("Smelter", Vec3::new(0.0, 0.0, -4.0), copper_smelter());

    h.run_until(100, |h, _| {
        h.world
            .entity(smelter)
            .and_then(|e| e.as_fixture())
            .is_some_and(|f| f.ore_count() == 2)
    });
    assert_eq!(h.agent.inventory.count("CopperOre"), 0);
}

#[test]
fn mode_change_closes_container_and_clears_task() {
    let mut h = Harness::new(Mode::Stay, Inventory::new(8, 100.0));
    h.world
        .spawn_fixture("Smelter", Vec3::new(0.0, 0.0, -5.0), copper_smelter());
    let chest = h
        .world
        .spawn_container("Chest", Vec3::new(3.0, 0.0, 0.0), supplies(5, 5));

    h.run_until(100, |_, r| r.smelt == SmeltPhase::TakingFromChest);
    assert_eq!(h.coordinator.smelt().open_container(), Some(chest));
    assert_eq!(h.chest_holder(chest), Some(h.agent.id));

    h.set_mode(Mode::Follow);
    let report = h.tick();

    assert_eq!(
        report.reset,
        Some(ResetCause::ModeChange {
            from: Mode::Stay,
            to: Mode::Follow
        })
    );
    assert_eq!(report.smelt, SmeltPhase::Idle);
    assert!(h.coordinator.smelt().task().is_none());
    assert_eq!(h.chest_holder(chest), None);
}

// =============================================================================
// Coordinator
// =============================================================================

#[test]
fn directed_move_preempts_follow() {
    let mut h = Harness::new(Mode::Follow, Inventory::new(8, 100.0));
    let point = Vec3::new(0.0, 0.0, 5.0);
    h.coordinator.submit(DirectedRequest::MoveTo(point));

    let first = h.tick();
    assert_eq!(first.owner, MovementOwner::Directed);
    h.run_until(100, |h, _| !h.coordinator.directed().is_active());
    assert!(h.body.position().horizontal_distance(point) <= 1.0);
}

#[test]
fn ui_takeover_resets_and_holds_still() {
    let mut h = Harness::new(Mode::Follow, Inventory::new(8, 100.0));
    h.world.set_peer_position(h.peer.clone(), Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(h.tick().owner, MovementOwner::Follow);

    h.ui.open(h.agent.id);
    let report = h.tick();
    assert_eq!(report.reset, Some(ResetCause::UiTakeover));
    assert_eq!(report.owner, MovementOwner::None);
}

#[test]
fn teleport_resets_tracker() {
    let mut h = Harness::new(Mode::Follow, Inventory::new(8, 100.0));
    for _ in 0..10 {
        h.tick();
    }
    assert!(!h.memory.tracker.is_empty());

    h.body.teleport(Vec3::new(50.0, 0.0, 50.0));
    let report = h.tick();
    assert_eq!(report.reset, Some(ResetCause::Teleport));
    assert_eq!(h.memory.tracker.len(), 1);
}

#[test]
fn gate_refuses_second_owner_within_tick() {
    let mut h = Harness::new(Mode::Follow, Inventory::new(8, 100.0));
    let mut ctx = TickContext::new(
        0.0,
        DT,
        &h.peer,
        &mut h.agent,
        &mut h.body,
        &mut h.world,
        &mut h.store,
        &h.ui,
        &h.config,
        &mut h.memory,
    );
    let target = Vec3::new(5.0, 0.0, 0.0);
    assert!(ctx.move_to(MovementOwner::Harvest, target, 0.5, false).is_some());
    assert!(ctx.move_to(MovementOwner::Follow, target, 0.5, false).is_none());
    assert_eq!(ctx.movement_owner(), MovementOwner::Harvest);
}

#[test]
fn write_from_non_authoritative_peer_is_rejected() {
    let mut h = Harness::new(Mode::Follow, Inventory::new(8, 100.0));
    let guest = PeerId::new("guest");
    let mut ctx = TickContext::new(
        0.0,
        DT,
        &guest,
        &mut h.agent,
        &mut h.body,
        &mut h.world,
        &mut h.store,
        &h.ui,
        &h.config,
        &mut h.memory,
    );
    assert!(ctx.write(RecordChange::Mode(Mode::Stay)).is_err());
    assert_eq!(ctx.record().and_then(ReplicatedRecord::mode), Some(Mode::Follow));
}
