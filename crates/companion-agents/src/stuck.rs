//! Locomotion failure detection.
//!
//! Two detectors share the tracker's progress signal:
//!
//! - [`StuckLadder`] -- tiered escalation for harvesting. Each tier fires
//!   once, in increasing time order, and any real progress drops back to
//!   tier zero.
//! - [`StallWatch`] -- a single timeout on net displacement, used by the
//!   production, repair, rest and directed controllers.

use companion_types::Vec3;

use crate::config::{StuckConfig, TrackerConfig};
use crate::tracker::PositionTracker;

/// A recovery action requested by the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StuckAction {
    /// Open a nearby door.
    TryDoor,
    /// Shift the stand point sideways.
    SideOffset,
    /// Shift the stand point to the opposite side.
    OppositeOffset,
    /// Jump.
    Jump,
    /// Blacklist the target and give up.
    Abandon,
}

const LADDER: [StuckAction; 5] = [
    StuckAction::TryDoor,
    StuckAction::SideOffset,
    StuckAction::OppositeOffset,
    StuckAction::Jump,
    StuckAction::Abandon,
];

/// Tiered stuck escalation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StuckLadder {
    /// When the current no-progress streak began.
    since: Option<f64>,
    /// Tiers already fired in this streak.
    fired: usize,
}

impl StuckLadder {
    /// A ladder at tier zero.
    pub const fn new() -> Self {
        Self {
            since: None,
            fired: 0,
        }
    }

    /// Tiers fired in the current streak.
    pub const fn tier(&self) -> usize {
        self.fired
    }

    /// Back to tier zero.
    pub const fn reset(&mut self) {
        self.since = None;
        self.fired = 0;
    }

    /// Feed one tick. Returns at most one action per call.
    pub fn update(
        &mut self,
        tracker: &PositionTracker,
        now: f64,
        tracker_cfg: &TrackerConfig,
        cfg: &StuckConfig,
    ) -> Option<StuckAction> {
        let moved = tracker.distance_moved(now, tracker_cfg.progress_window);
        if moved > tracker_cfg.progress_threshold {
            self.reset();
            return None;
        }
        let since = *self.since.get_or_insert(now);
        let elapsed = now - since;
        let thresholds = [
            cfg.door_secs,
            cfg.offset_secs,
            cfg.opposite_secs,
            cfg.jump_secs,
            cfg.abandon_secs,
        ];
        let threshold = thresholds.get(self.fired)?;
        if elapsed + 1e-9 < *threshold {
            return None;
        }
        let action = LADDER.get(self.fired).copied();
        self.fired = self.fired.saturating_add(1);
        action
    }
}

/// Single-timeout stall check on net displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StallWatch {
    anchor: Option<(Vec3, f64)>,
}

impl StallWatch {
    /// A watch with no anchor.
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Forget the anchor (arrival, phase change).
    pub const fn reset(&mut self) {
        self.anchor = None;
    }

    /// Feed one tick while travelling. Returns true once the agent has
    /// stayed within `min_displacement` of the anchor for `timeout` seconds.
    pub fn check(&mut self, position: Vec3, now: f64, min_displacement: f32, timeout: f64) -> bool {
        match self.anchor {
            Some((anchor, _)) if anchor.horizontal_distance(position) >= min_displacement => {
                self.anchor = Some((position, now));
                false
            }
            Some((_, since)) => now - since >= timeout,
            None => {
                self.anchor = Some((position, now));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_agent_escalates_in_order() {
        let tracker_cfg = TrackerConfig::default();
        let cfg = StuckConfig::default();
        let mut tracker = PositionTracker::new(tracker_cfg.sample_interval);
        let mut ladder = StuckLadder::new();
        let mut fired = Vec::new();
        for step in 0..=90 {
            let now = f64::from(step) * 0.1;
            tracker.observe(Vec3::ZERO, now);
            if let Some(action) = ladder.update(&tracker, now, &tracker_cfg, &cfg) {
                fired.push((action, now));
            }
        }
        let actions: Vec<_> = fired.iter().map(|(a, _)| *a).collect();
        assert_eq!(actions, LADDER.to_vec());
        let times: Vec<_> = fired.iter().map(|(_, t)| *t).collect();
        let expected = [1.5, 3.5, 5.0, 6.0, 7.5];
        for (t, e) in times.iter().zip(expected) {
            assert!((t - e).abs() < 0.11, "fired at {t}, expected {e}");
        }
    }

    #[test]
    fn progress_resets_to_tier_zero() {
        let tracker_cfg = TrackerConfig::default();
        let cfg = StuckConfig::default();
        let mut tracker = PositionTracker::new(tracker_cfg.sample_interval);
        let mut ladder = StuckLadder::new();
        for step in 0..=40 {
            let now = f64::from(step) * 0.1;
            tracker.observe(Vec3::ZERO, now);
            let _ = ladder.update(&tracker, now, &tracker_cfg, &cfg);
        }
        assert_eq!(ladder.tier(), 2);
        tracker.record(Vec3::new(3.0, 0.0, 0.0), 4.1);
        assert_eq!(ladder.update(&tracker, 4.1, &tracker_cfg, &cfg), None);
        assert_eq!(ladder.tier(), 0);
    }

    #[test]
    fn stall_watch_times_out_without_displacement() {
        let mut watch = StallWatch::new();
        assert!(!watch.check(Vec3::ZERO, 0.0, 0.5, 8.0));
        assert!(!watch.check(Vec3::new(0.1, 0.0, 0.0), 7.9, 0.5, 8.0));
        assert!(watch.check(Vec3::new(0.2, 0.0, 0.0), 8.0, 0.5, 8.0));
    }

    #[test]
    fn stall_watch_moves_anchor_on_progress() {
        let mut watch = StallWatch::new();
        assert!(!watch.check(Vec3::ZERO, 0.0, 0.5, 8.0));
        assert!(!watch.check(Vec3::new(1.0, 0.0, 0.0), 7.0, 0.5, 8.0));
        assert!(!watch.check(Vec3::new(1.0, 0.0, 0.0), 14.0, 0.5, 8.0));
        assert!(watch.check(Vec3::new(1.0, 0.0, 0.0), 15.0, 0.5, 8.0));
    }
}
