//! Time-decaying target exclusion.
//!
//! Targets that failed are excluded from selection for a window that
//! depends on the reason. Tool-tier exclusions never expire and are only
//! cleared explicitly (on a mode change). Failure counts are kept in a
//! separate strike ledger so they survive eviction of the entry itself:
//! once a target has failed `escalate_after` times for the same reason,
//! its next window is doubled. A strike is forgotten once its target has
//! no active exclusion and has not failed for `strike_memory_secs`.

use std::collections::BTreeMap;

use companion_types::{BlacklistReason, EntityId};
use tracing::debug;

use crate::config::BlacklistConfig;

/// One active exclusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlacklistEntry {
    /// Simulation time at which the exclusion lapses (infinite for tool tier).
    pub expiry: f64,
    /// Failures recorded for this target and reason.
    pub failure_count: u32,
    /// Why the target is excluded.
    pub reason: BlacklistReason,
}

/// Failure count and time of the most recent failure.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Strike {
    count: u32,
    last: f64,
}

/// Per-agent target blacklist.
#[derive(Debug, Clone)]
pub struct Blacklist {
    config: BlacklistConfig,
    entries: BTreeMap<EntityId, BlacklistEntry>,
    strikes: BTreeMap<(EntityId, BlacklistReason), Strike>,
}

impl Blacklist {
    /// An empty blacklist.
    pub const fn new(config: BlacklistConfig) -> Self {
        Self {
            config,
            entries: BTreeMap::new(),
            strikes: BTreeMap::new(),
        }
    }

    /// Exclude `key` for `reason`. Returns the new expiry.
    pub fn add(&mut self, key: EntityId, reason: BlacklistReason, now: f64) -> f64 {
        self.forget_stale(now);
        let strike = self
            .strikes
            .entry((key, reason))
            .or_insert(Strike { count: 0, last: now });
        strike.count = strike.count.saturating_add(1);
        strike.last = now;
        let failure_count = strike.count;

        let base = self.config.window(reason);
        let window = if failure_count >= self.config.escalate_after {
            base * 2.0
        } else {
            base
        };
        let expiry = now + window;

        let entry = BlacklistEntry {
            expiry,
            failure_count,
            reason,
        };
        match self.entries.get(&key) {
            Some(existing) if existing.expiry > expiry => {}
            _ => {
                self.entries.insert(key, entry);
            }
        }
        debug!(target = %key, reason = ?reason, failures = failure_count, window, "Blacklisted");
        self.entries.get(&key).map_or(expiry, |e| e.expiry)
    }

    /// Whether `key` is currently excluded. Lapsed entries are evicted.
    pub fn is_blacklisted(&mut self, key: EntityId, now: f64) -> bool {
        match self.entries.get(&key) {
            Some(entry) if now < entry.expiry => true,
            Some(_) => {
                self.entries.remove(&key);
                false
            }
            None => false,
        }
    }

    /// The active entry for `key`, without eviction.
    pub fn entry(&self, key: EntityId) -> Option<&BlacklistEntry> {
        self.entries.get(&key)
    }

    /// Failures recorded for `key` and `reason`, including evicted ones.
    pub fn failure_count(&self, key: EntityId, reason: BlacklistReason) -> u32 {
        self.strikes.get(&(key, reason)).map_or(0, |s| s.count)
    }

    /// Drop strikes whose target is no longer excluded and whose last
    /// failure is older than the strike memory.
    pub fn forget_stale(&mut self, now: f64) {
        let memory = self.config.strike_memory_secs;
        let entries = &self.entries;
        self.strikes.retain(|(key, _), strike| {
            entries.get(key).is_some_and(|e| now < e.expiry) || now - strike.last < memory
        });
    }

    /// Number of targets with a remembered failure.
    pub fn strike_count(&self) -> usize {
        self.strikes.len()
    }

    /// Drop every entry and strike with `reason`. Other reasons are untouched.
    pub fn clear_reason(&mut self, reason: BlacklistReason) {
        self.entries.retain(|_, entry| entry.reason != reason);
        self.strikes.retain(|(_, r), _| *r != reason);
    }

    /// Active entry count (may include lapsed, not yet read entries).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blacklist() -> Blacklist {
        Blacklist::new(BlacklistConfig::default())
    }

    #[test]
    fn excluded_exactly_until_expiry() {
        let mut bl = blacklist();
        let key = EntityId::new();
        let expiry = bl.add(key, BlacklistReason::Occupied, 10.0);
        assert!(bl.is_blacklisted(key, 10.0));
        assert!(bl.is_blacklisted(key, expiry - 0.01));
        assert!(!bl.is_blacklisted(key, expiry));
        assert!(bl.entry(key).is_none());
    }

    #[test]
    fn third_failure_doubles_window() {
        let mut bl = blacklist();
        let key = EntityId::new();
        let base = BlacklistConfig::default().unreachable_secs;
        let first = bl.add(key, BlacklistReason::Unreachable, 0.0);
        assert!((first - base).abs() < 1e-9);
        let _ = bl.is_blacklisted(key, 100.0);
        let second = bl.add(key, BlacklistReason::Unreachable, 100.0);
        assert!((second - 100.0 - base).abs() < 1e-9);
        let _ = bl.is_blacklisted(key, 200.0);
        let third = bl.add(key, BlacklistReason::Unreachable, 200.0);
        assert!((third - 200.0 - 2.0 * base).abs() < 1e-9);
        assert_eq!(bl.failure_count(key, BlacklistReason::Unreachable), 3);
    }

    #[test]
    fn tool_tier_never_expires() {
        let mut bl = blacklist();
        let key = EntityId::new();
        bl.add(key, BlacklistReason::ToolTierTooLow, 0.0);
        assert!(bl.is_blacklisted(key, 1.0e9));
    }

    #[test]
    fn clearing_is_reason_scoped() {
        let mut bl = blacklist();
        let tier = EntityId::new();
        let far = EntityId::new();
        bl.add(tier, BlacklistReason::ToolTierTooLow, 0.0);
        bl.add(far, BlacklistReason::Unreachable, 0.0);
        bl.clear_reason(BlacklistReason::ToolTierTooLow);
        assert!(!bl.is_blacklisted(tier, 1.0));
        assert!(bl.is_blacklisted(far, 1.0));
        assert_eq!(bl.failure_count(far, BlacklistReason::Unreachable), 1);
    }

    #[test]
    fn stale_strikes_are_forgotten() {
        let mut bl = blacklist();
        let old = EntityId::new();
        let recent = EntityId::new();
        let memory = BlacklistConfig::default().strike_memory_secs;
        bl.add(old, BlacklistReason::Occupied, 0.0);
        bl.add(recent, BlacklistReason::Occupied, memory);
        bl.forget_stale(memory + 1.0);
        assert_eq!(bl.failure_count(old, BlacklistReason::Occupied), 0);
        assert_eq!(bl.failure_count(recent, BlacklistReason::Occupied), 1);
        assert_eq!(bl.strike_count(), 1);
    }

    #[test]
    fn active_exclusion_keeps_its_strikes() {
        let mut bl = blacklist();
        let key = EntityId::new();
        bl.add(key, BlacklistReason::ToolTierTooLow, 0.0);
        bl.forget_stale(1.0e6);
        assert_eq!(bl.failure_count(key, BlacklistReason::ToolTierTooLow), 1);
    }

    #[test]
    fn longer_exclusion_wins() {
        let mut bl = blacklist();
        let key = EntityId::new();
        bl.add(key, BlacklistReason::ToolTierTooLow, 0.0);
        bl.add(key, BlacklistReason::Occupied, 0.0);
        assert_eq!(bl.entry(key).map(|e| e.reason), Some(BlacklistReason::ToolTierTooLow));
    }
}
