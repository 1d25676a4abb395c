//! Fixed-window position history and the stuck/oscillation oracle.
//!
//! The tracker is deliberately ignorant of navigation: it sees only where
//! the agent was and when. Storage is a fixed array ring buffer, so
//! recording and querying never allocate.

use companion_types::{PositionSample, Vec3};

/// Number of samples kept (5 seconds at the default 0.25s interval).
pub const TRACKER_CAPACITY: usize = 20;

/// Minimum same-zone neighbours for a sample to anchor an oscillation.
const OSCILLATION_NEIGHBOURS: usize = 3;

/// Ring buffer of timestamped positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionTracker {
    samples: [PositionSample; TRACKER_CAPACITY],
    /// Slot the next sample is written to.
    head: usize,
    len: usize,
    sample_interval: f64,
    last_sample_at: Option<f64>,
}

impl PositionTracker {
    /// An empty tracker sampling every `sample_interval` seconds.
    pub fn new(sample_interval: f64) -> Self {
        Self {
            samples: [PositionSample::default(); TRACKER_CAPACITY],
            head: 0,
            len: 0,
            sample_interval,
            last_sample_at: None,
        }
    }

    /// Number of stored samples.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been recorded since the last reset.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a sample, evicting the oldest when full.
    pub fn record(&mut self, position: Vec3, timestamp: f64) {
        if let Some(slot) = self.samples.get_mut(self.head) {
            *slot = PositionSample { position, timestamp };
        }
        self.head = self.head.wrapping_add(1) % TRACKER_CAPACITY;
        self.len = self.len.saturating_add(1).min(TRACKER_CAPACITY);
        self.last_sample_at = Some(timestamp);
    }

    /// Record only when the sampling interval has elapsed. Returns whether
    /// a sample was taken.
    pub fn observe(&mut self, position: Vec3, timestamp: f64) -> bool {
        let due = self
            .last_sample_at
            .is_none_or(|last| timestamp - last >= self.sample_interval - 1e-9);
        if due {
            self.record(position, timestamp);
        }
        due
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<PositionSample> {
        self.chronological().last()
    }

    /// Samples oldest first.
    fn chronological(&self) -> impl Iterator<Item = PositionSample> + '_ {
        let start = self
            .head
            .wrapping_add(TRACKER_CAPACITY)
            .wrapping_sub(self.len)
            % TRACKER_CAPACITY;
        self.samples
            .iter()
            .cycle()
            .skip(start)
            .take(self.len)
            .copied()
    }

    /// Samples with `timestamp >= now - window`, oldest first.
    fn windowed(&self, now: f64, window: f64) -> impl Iterator<Item = PositionSample> + '_ {
        let since = now - window;
        self.chronological().filter(move |s| s.timestamp >= since)
    }

    /// Sum of consecutive displacements among samples inside the window.
    pub fn distance_moved(&self, now: f64, window: f64) -> f32 {
        let mut total = 0.0;
        let mut previous: Option<Vec3> = None;
        for sample in self.windowed(now, window) {
            if let Some(p) = previous {
                total += p.distance(sample.position);
            }
            previous = Some(sample.position);
        }
        total
    }

    /// Net displacement between the oldest and newest samples in the window.
    pub fn net_displacement(&self, now: f64, window: f64) -> f32 {
        let mut samples = self.windowed(now, window);
        let Some(first) = samples.next() else {
            return 0.0;
        };
        samples
            .last()
            .map_or(0.0, |last| first.position.horizontal_distance(last.position))
    }

    /// Whether the agent keeps revisiting a small area.
    ///
    /// True iff some sample in the window has at least three other window
    /// samples within `radius` horizontally, and the window shows the agent
    /// leaving that zone and coming back. An agent that never leaves the
    /// zone is stuck, not oscillating.
    pub fn is_oscillating(&self, now: f64, radius: f32, window: f64) -> bool {
        self.windowed(now, window).any(|anchor| {
            let neighbours = self
                .windowed(now, window)
                .filter(|s| s.timestamp.total_cmp(&anchor.timestamp).is_ne())
                .filter(|s| s.position.horizontal_distance(anchor.position) <= radius)
                .count();
            neighbours >= OSCILLATION_NEIGHBOURS && self.revisits(anchor.position, radius, now, window)
        })
    }

    /// Whether the window goes inside → outside → inside the zone.
    fn revisits(&self, center: Vec3, radius: f32, now: f64, window: f64) -> bool {
        let mut was_inside = false;
        let mut left = false;
        for sample in self.windowed(now, window) {
            let inside = sample.position.horizontal_distance(center) <= radius;
            if inside && left {
                return true;
            }
            if was_inside && !inside {
                left = true;
            }
            was_inside |= inside;
        }
        false
    }

    /// Forget every sample.
    pub const fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
        self.last_sample_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PositionTracker {
        PositionTracker::new(0.25)
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut t = tracker();
        for i in 0..30 {
            t.record(Vec3::new(i as f32, 0.0, 0.0), f64::from(i) * 0.25);
        }
        assert_eq!(t.len(), TRACKER_CAPACITY);
        let latest = t.latest().map(|s| s.position.x);
        assert_eq!(latest, Some(29.0));
        assert_eq!(t.chronological().next().map(|s| s.position.x), Some(10.0));
    }

    #[test]
    fn observe_respects_interval() {
        let mut t = tracker();
        assert!(t.observe(Vec3::ZERO, 0.0));
        assert!(!t.observe(Vec3::ZERO, 0.1));
        assert!(t.observe(Vec3::ZERO, 0.25));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn distance_moved_uses_window() {
        let mut t = tracker();
        for i in 0..12 {
            t.record(Vec3::new(i as f32, 0.0, 0.0), f64::from(i) * 0.25);
        }
        let now = 11.0 * 0.25;
        let moved = t.distance_moved(now, 1.0);
        assert!((moved - 4.0).abs() < 1e-4, "moved {moved}");
        assert!((t.net_displacement(now, 1.0) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn revisiting_zone_is_oscillation() {
        let mut t = tracker();
        let a = Vec3::ZERO;
        let b = Vec3::new(2.0, 0.0, 0.0);
        for i in 0..16 {
            let p = if i % 2 == 0 { a } else { b };
            t.record(p, f64::from(i) * 0.25);
        }
        assert!(t.is_oscillating(15.0 * 0.25, 0.5, 4.0));
    }

    #[test]
    fn steady_progress_is_not_oscillation() {
        let mut t = tracker();
        for i in 0..16 {
            t.record(Vec3::new(i as f32 * 0.6, 0.0, 0.0), f64::from(i) * 0.25);
        }
        assert!(!t.is_oscillating(15.0 * 0.25, 0.5, 4.0));
    }

    #[test]
    fn standing_still_is_not_oscillation() {
        let mut t = tracker();
        for i in 0..16 {
            t.record(Vec3::ZERO, f64::from(i) * 0.25);
        }
        assert!(!t.is_oscillating(15.0 * 0.25, 0.5, 4.0));
        assert!(t.distance_moved(15.0 * 0.25, 2.0) < f32::EPSILON);
    }

    #[test]
    fn reset_clears_history() {
        let mut t = tracker();
        t.record(Vec3::ZERO, 0.0);
        t.reset();
        assert!(t.is_empty());
        assert!(t.latest().is_none());
        assert!(t.observe(Vec3::ZERO, 0.01));
    }
}
