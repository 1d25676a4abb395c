//! Tunable parameters for every behavior controller.
//!
//! [`BehaviorConfig`] is the `behavior` section of `companion-config.yaml`.
//! Each controller reads its own sub-struct; every sub-struct has a
//! `Default` holding the stock timings, so a missing section or key falls
//! back to the stock value.

use serde::Deserialize;

use companion_types::BlacklistReason;

/// All behavior tunables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Position history sampling and oracles.
    pub tracker: TrackerConfig,
    /// Exclusion windows.
    pub blacklist: BlacklistConfig,
    /// Tiered stuck escalation (harvest).
    pub stuck: StuckConfig,
    /// Resource gathering.
    pub harvest: HarvestConfig,
    /// Production/logistics loop.
    pub smelt: SmeltConfig,
    /// Target acquisition and combat movement.
    pub combat: CombatConfig,
    /// Formation follow and home patrol.
    pub follow: FollowConfig,
    /// Gear repair.
    pub repair: RepairConfig,
    /// Stamina recovery.
    pub rest: RestConfig,
    /// Directed one-shot requests.
    pub directed: DirectedConfig,
    /// Coordinator-level settings.
    pub coordinator: CoordinatorConfig,
}

/// Position tracker settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seconds between recorded samples (default: 0.25).
    pub sample_interval: f64,
    /// Window for the progress signal, in seconds (default: 2.0).
    pub progress_window: f64,
    /// Meters moved within the window that count as progress (default: 0.5).
    pub progress_threshold: f32,
    /// Zone radius for oscillation detection (default: 0.5).
    pub oscillation_radius: f32,
    /// Window for oscillation detection, in seconds (default: 4.0).
    pub oscillation_window: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_interval: 0.25,
            progress_window: 2.0,
            progress_threshold: 0.5,
            oscillation_radius: 0.5,
            oscillation_window: 4.0,
        }
    }
}

/// Blacklist windows per reason, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// Window for unreachable targets (default: 30).
    pub unreachable_secs: f64,
    /// Window for oscillation (default: 20).
    pub oscillating_secs: f64,
    /// Window for line-of-sight failures (default: 20).
    pub line_of_sight_secs: f64,
    /// Window for busy containers and fixtures (default: 5).
    pub occupied_secs: f64,
    /// Failure count at which the window doubles (default: 3).
    pub escalate_after: u32,
    /// How long a target's failure count is remembered after its last
    /// failure once no exclusion is active (default: 300).
    pub strike_memory_secs: f64,
}

impl BlacklistConfig {
    /// Base window for a decaying reason. Tool-tier entries never expire.
    pub fn window(&self, reason: BlacklistReason) -> f64 {
        match reason {
            BlacklistReason::Unreachable => self.unreachable_secs,
            BlacklistReason::Oscillating => self.oscillating_secs,
            BlacklistReason::LineOfSight => self.line_of_sight_secs,
            BlacklistReason::Occupied => self.occupied_secs,
            BlacklistReason::ToolTierTooLow => f64::INFINITY,
        }
    }
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            unreachable_secs: 30.0,
            oscillating_secs: 20.0,
            line_of_sight_secs: 20.0,
            occupied_secs: 5.0,
            escalate_after: 3,
            strike_memory_secs: 300.0,
        }
    }
}

/// Stuck ladder thresholds (seconds without progress) and offsets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    /// Try a nearby door (default: 1.5).
    pub door_secs: f64,
    /// Sideways stand-point offset (default: 3.5).
    pub offset_secs: f64,
    /// Opposite-side offset (default: 5.0).
    pub opposite_secs: f64,
    /// Jump (default: 6.0).
    pub jump_secs: f64,
    /// Blacklist and abandon (default: 7.5).
    pub abandon_secs: f64,
    /// Radius searched for doors (default: 4.0).
    pub door_radius: f32,
    /// Lateral offset distance (default: 2.0).
    pub offset_distance: f32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            door_secs: 1.5,
            offset_secs: 3.5,
            opposite_secs: 5.0,
            jump_secs: 6.0,
            abandon_secs: 7.5,
            door_radius: 4.0,
            offset_distance: 2.0,
        }
    }
}

/// Harvest controller settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Seconds between idle scans (default: 0.5).
    pub scan_interval: f64,
    /// First scan radius (default: 15).
    pub close_radius: f32,
    /// Second scan radius (default: 40).
    pub wide_radius: f32,
    /// Score penalty per meter of height difference (default: 2.0).
    pub height_penalty: f32,
    /// Score penalty per meter from the owner (default: 0.25).
    pub owner_weight: f32,
    /// Stand point distance band, minimum (default: 1.2).
    pub stand_min: f32,
    /// Stand point distance band, maximum (default: 3.5).
    pub stand_max: f32,
    /// Added to the target radius for the stand distance (default: 0.7).
    pub stand_margin: f32,
    /// Extra reach beyond the target radius for attacking (default: 1.6).
    pub reach: f32,
    /// How far below the target the agent may stand (default: 1.5).
    pub max_below: f32,
    /// How far above the target the agent may stand (default: 2.5).
    pub max_above: f32,
    /// Seconds between swings (default: 1.0).
    pub swing_interval: f64,
    /// Consecutive pre-swing failures before blacklisting (default: 3).
    pub max_swing_failures: u32,
    /// Durability spent per swing (default: 1.0).
    pub swing_wear: f32,
    /// Facing tolerance for a swing, in degrees (default: 45).
    pub swing_angle: f32,
    /// Drop search radius around the last site (default: 8).
    pub drop_radius: f32,
    /// Drop collection timeout in seconds (default: 12).
    pub drop_timeout: f64,
    /// Consecutive empty drop scans before finishing (default: 3).
    pub drop_empty_scans: u32,
    /// Pick-up range (default: 1.2).
    pub pickup_range: f32,
    /// Radius in which a hostile pauses gathering (default: 10).
    pub hostile_radius: f32,
    /// Distance beyond which the agent runs (default: 10).
    pub run_distance: f32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            scan_interval: 0.5,
            close_radius: 15.0,
            wide_radius: 40.0,
            height_penalty: 2.0,
            owner_weight: 0.25,
            stand_min: 1.2,
            stand_max: 3.5,
            stand_margin: 0.7,
            reach: 1.6,
            max_below: 1.5,
            max_above: 2.5,
            swing_interval: 1.0,
            max_swing_failures: 3,
            swing_wear: 1.0,
            swing_angle: 45.0,
            drop_radius: 8.0,
            drop_timeout: 12.0,
            drop_empty_scans: 3,
            pickup_range: 1.2,
            hostile_radius: 10.0,
            run_distance: 10.0,
        }
    }
}

/// Smelt controller settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmeltConfig {
    /// Fixture and container search radius (default: 20).
    pub scan_radius: f32,
    /// Seconds between idle start attempts (default: 2.0).
    pub scan_interval: f64,
    /// Delay after opening a container (default: 0.5).
    pub open_settle: f64,
    /// Seconds between single-unit inserts (default: 0.3).
    pub insert_interval: f64,
    /// Monitoring re-scan interval (default: 5.0).
    pub monitor_interval: f64,
    /// Delay after releasing output (default: 1.0).
    pub release_settle: f64,
    /// Ground sweep radius around the output point (default: 3.0).
    pub sweep_radius: f32,
    /// Distance from the fixture's surface to its interaction point (default: 0.8).
    pub interact_offset: f32,
    /// Arrival tolerance (default: 0.6).
    pub arrive_distance: f32,
    /// Stall timeout in seconds (default: 8.0).
    pub stall_secs: f64,
    /// Minimum net displacement that resets the stall timer (default: 0.5).
    pub stall_displacement: f32,
    /// Radius in which a hostile aborts the task (default: 10).
    pub hostile_radius: f32,
}

impl Default for SmeltConfig {
    fn default() -> Self {
        Self {
            scan_radius: 20.0,
            scan_interval: 2.0,
            open_settle: 0.5,
            insert_interval: 0.3,
            monitor_interval: 5.0,
            release_settle: 1.0,
            sweep_radius: 3.0,
            interact_offset: 0.8,
            arrive_distance: 0.6,
            stall_secs: 8.0,
            stall_displacement: 0.5,
            hostile_radius: 10.0,
        }
    }
}

/// Combat settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Hostile sensing radius (default: 15).
    pub sense_radius: f32,
    /// Abandon a target unsensed this long (default: 5).
    pub give_up_unsensed: f64,
    /// Abandon a target not damaged for this long (default: 20).
    pub stall_secs: f64,
    /// Stop distance as a fraction of weapon range (default: 0.8).
    pub stop_fraction: f32,
    /// Extra stop distance once stopped (default: 0.5).
    pub stop_hysteresis: f32,
    /// Facing tolerance for an attack, in degrees (default: 30).
    pub attack_angle: f32,
    /// Seconds between attacks (default: 1.2).
    pub attack_interval: f64,
    /// Cooldown after a failed attack (default: 1.0).
    pub retry_cooldown: f64,
    /// Flank offset around the owner's line (default: 3.0).
    pub flank_distance: f32,
    /// Distance to a melee target beyond which flanking applies (default: 6.0).
    pub flank_trigger: f32,
    /// Damage without a weapon (default: 5).
    pub unarmed_damage: f32,
    /// Range without a weapon (default: 1.5).
    pub unarmed_range: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            sense_radius: 15.0,
            give_up_unsensed: 5.0,
            stall_secs: 20.0,
            stop_fraction: 0.8,
            stop_hysteresis: 0.5,
            attack_angle: 30.0,
            attack_interval: 1.2,
            retry_cooldown: 1.0,
            flank_distance: 3.0,
            flank_trigger: 6.0,
            unarmed_damage: 5.0,
            unarmed_range: 1.5,
        }
    }
}

/// Follow and patrol settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// Distance of formation slots from the owner (default: 3.0).
    pub slot_distance: f32,
    /// Number of formation slots (default: 4).
    pub slot_count: u32,
    /// Within this distance the formation collapses to direct follow (default: 4.5).
    pub collapse_distance: f32,
    /// Stop distance for direct follow (default: 2.5).
    pub follow_stop: f32,
    /// Distance beyond which the agent runs (default: 10).
    pub run_distance: f32,
    /// Patrol ring radius around home (default: 6).
    pub patrol_radius: f32,
    /// Pause at each patrol point (default: 3).
    pub patrol_pause: f64,
    /// Arrival tolerance (default: 0.8).
    pub arrive_distance: f32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            slot_distance: 3.0,
            slot_count: 4,
            collapse_distance: 4.5,
            follow_stop: 2.5,
            run_distance: 10.0,
            patrol_radius: 6.0,
            patrol_pause: 3.0,
            arrive_distance: 0.8,
        }
    }
}

/// Repair settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Durability fraction below which an item needs repair (default: 0.3).
    pub threshold: f32,
    /// Station search radius (default: 20).
    pub search_radius: f32,
    /// Seconds per repaired item (default: 2.0).
    pub interval: f64,
    /// Cooldown after a repair session (default: 30).
    pub cooldown: f64,
    /// Stall timeout in seconds (default: 8.0).
    pub stall_secs: f64,
    /// Minimum net displacement that resets the stall timer (default: 0.5).
    pub stall_displacement: f32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            search_radius: 20.0,
            interval: 2.0,
            cooldown: 30.0,
            stall_secs: 8.0,
            stall_displacement: 0.5,
        }
    }
}

/// Rest settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// Start resting below this stamina (default: 20).
    pub enter_below: f32,
    /// Resume work at this stamina (default: 90).
    pub resume_at: f32,
    /// Maximum stamina (default: 100).
    pub max_stamina: f32,
    /// Stamina regained per second (default: 10).
    pub regen_per_sec: f32,
    /// Rest spot search radius (default: 25).
    pub search_radius: f32,
    /// Radius in which a hostile interrupts rest (default: 12).
    pub hostile_radius: f32,
    /// Stall timeout in seconds (default: 8.0).
    pub stall_secs: f64,
    /// Minimum net displacement that resets the stall timer (default: 0.5).
    pub stall_displacement: f32,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            enter_below: 20.0,
            resume_at: 90.0,
            max_stamina: 100.0,
            regen_per_sec: 10.0,
            search_radius: 25.0,
            hostile_radius: 12.0,
            stall_secs: 8.0,
            stall_displacement: 0.5,
        }
    }
}

/// Directed request settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectedConfig {
    /// Seconds before a request fails (default: 30).
    pub timeout: f64,
    /// Stop distance for move-to (default: 0.8).
    pub stop_distance: f32,
    /// Reach beyond an entity's radius for attach and deposit (default: 1.2).
    pub reach: f32,
    /// Stall timeout in seconds (default: 6.0).
    pub stall_secs: f64,
    /// Minimum net displacement that resets the stall timer (default: 0.5).
    pub stall_displacement: f32,
}

impl Default for DirectedConfig {
    fn default() -> Self {
        Self {
            timeout: 30.0,
            stop_distance: 0.8,
            reach: 1.2,
            stall_secs: 6.0,
            stall_displacement: 0.5,
        }
    }
}

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// A jump between ticks larger than this counts as a teleport (default: 8).
    pub teleport_distance: f32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            teleport_distance: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_tiers_are_increasing() {
        let cfg = StuckConfig::default();
        assert!(cfg.door_secs < cfg.offset_secs);
        assert!(cfg.offset_secs < cfg.opposite_secs);
        assert!(cfg.opposite_secs < cfg.jump_secs);
        assert!(cfg.jump_secs < cfg.abandon_secs);
    }

    #[test]
    fn tool_tier_window_is_infinite() {
        let cfg = BlacklistConfig::default();
        assert!(cfg.window(BlacklistReason::ToolTierTooLow).is_infinite());
        assert!(cfg.window(BlacklistReason::Occupied).is_finite());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: BehaviorConfig =
            serde_json::from_str(r#"{"harvest": {"close_radius": 9.0}}"#).unwrap_or_default();
        assert!((cfg.harvest.close_radius - 9.0).abs() < f32::EPSILON);
        assert_eq!(cfg.stuck, StuckConfig::default());
    }
}
