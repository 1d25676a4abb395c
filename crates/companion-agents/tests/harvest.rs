//! Harvest pausing, drop collection and abandonment.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

mod common;

use common::{Harness, axes, logs, raised};
use companion_types::{
    BlacklistReason, HarvestPhase, ItemCategory, ItemRecord, Mode, NoticeKind, ResourceKind, Vec3,
};
use companion_world::{EntityFilter, Obstacle, Perception, Pool};

#[test]
fn hostile_pauses_harvest_and_target_resumes_after() {
    let mut h = Harness::new(Mode::GatherWood, axes());
    let tree = h
        .world
        .spawn_resource("Pine", ResourceKind::Wood, Vec3::new(1.8, 0.0, 0.0), 0, 500.0, logs());
    h.run_until(20, |_, r| r.harvest == HarvestPhase::Attacking);

    let wolf = h.world.spawn_creature("Wolf", Vec3::new(0.0, 0.0, 6.0), 1000.0, true);
    let report = h.tick();
    assert_eq!(report.harvest, HarvestPhase::Idle);
    assert!(h.coordinator.harvest().is_paused());
    assert_eq!(h.coordinator.harvest().target(), None);

    for _ in 0..10 {
        assert_eq!(h.tick().harvest, HarvestPhase::Idle);
    }

    h.world.remove(wolf);
    h.run_until(20, |h, _| h.coordinator.harvest().target() == Some(tree));
    assert!(!h.coordinator.harvest().is_paused());
}

#[test]
fn destroyed_resource_drops_are_collected() {
    let mut h = Harness::new(Mode::GatherWood, axes());
    let yields = vec![
        ItemRecord::stack("Log", ItemCategory::Material, 2, 1.0),
        ItemRecord::stack("Resin", ItemCategory::Material, 1, 0.5),
    ];
    h.world
        .spawn_resource("Pine", ResourceKind::Wood, Vec3::new(1.8, 0.0, 0.0), 0, 10.0, yields);

    h.run_until(40, |_, r| r.harvest == HarvestPhase::CollectingDrops);
    let started = h.now;
    h.run_until(120, |_, r| r.harvest == HarvestPhase::Idle);

    assert_eq!(h.agent.inventory.count("Log"), 2);
    assert_eq!(h.agent.inventory.count("Resin"), 1);
    assert!(h.world.overlap_sphere(Vec3::ZERO, 10.0, EntityFilter::Drop).is_empty());
    // Left on empty scans, well before the timeout.
    assert!(h.now - started < h.config.harvest.drop_timeout);
}

#[test]
fn unreachable_drop_times_out_and_is_released() {
    let mut h = Harness::new(Mode::GatherWood, axes());
    h.world
        .spawn_resource("Pine", ResourceKind::Wood, Vec3::new(1.8, 0.0, 0.0), 0, 10.0, Vec::new());
    let far_side = Vec3::new(1.8, 0.0, 5.0);
    h.world.terrain_mut().pools.push(Pool {
        center: far_side,
        radius: 2.0,
    });
    let flint = h
        .world
        .spawn_drop(far_side, ItemRecord::stack("Flint", ItemCategory::Material, 1, 0.5));

    h.run_until(40, |_, r| r.harvest == HarvestPhase::CollectingDrops);
    let started = h.now;
    h.run_until(200, |_, r| r.harvest == HarvestPhase::Idle);

    let waited = h.now - started;
    assert!(waited >= h.config.harvest.drop_timeout - 0.15, "left after {waited}s");
    assert!(waited <= h.config.harvest.drop_timeout + 0.5, "left after {waited}s");
    let ground = h.world.entity(flint).and_then(|e| e.as_drop()).unwrap();
    assert_eq!(ground.claimed_by, None);
    assert_eq!(h.agent.inventory.count("Flint"), 0);
}

#[test]
fn walled_off_tree_is_abandoned_as_unreachable() {
    let mut h = Harness::new(Mode::GatherWood, axes());
    let spot = Vec3::new(8.0, 0.0, 0.0);
    h.world.terrain_mut().obstacles.push(Obstacle {
        center: spot,
        radius: 4.0,
        height: 5.0,
    });
    let tree = h
        .world
        .spawn_resource("Pine", ResourceKind::Wood, spot, 0, 50.0, logs());

    let mut reports = Vec::new();
    for _ in 0..300 {
        reports.push(h.tick());
        if h.memory.blacklist.entry(tree).is_some() {
            break;
        }
    }

    let entry = h.memory.blacklist.entry(tree).expect("tree was never abandoned");
    assert_eq!(entry.reason, BlacklistReason::Unreachable);
    assert!(raised(&reports, NoticeKind::Unreachable));
    assert_eq!(h.coordinator.harvest().target(), None);
    assert_eq!(h.coordinator.harvest().phase(), HarvestPhase::Idle);
}
