//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks`
//! - **Pause/resume**: the operator can halt and continue the tick loop
//! - **Clean shutdown**: stop on operator request or when no companion is
//!   left
//!
//! The runner wraps the single-tick [`run_tick`] function and adds pacing
//! and the control plane around it.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;

use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_simulation(
    state: &mut SimulationState,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        agents = state.agent_count(),
        peer = %state.local_peer,
        "Simulation starting"
    );

    let mut pacing = (operator.tick_interval_ms() > 0).then(|| {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_millis(operator.tick_interval_ms()));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval
    });

    loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Simulation paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Simulation resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::OperatorStop,
                final_summary: last_summary,
                total_ticks,
            });
        }

        if let Some(interval) = pacing.as_mut() {
            interval.tick().await;
        }

        // --- Execute tick ---
        let summary = tick::run_tick(state)?;

        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(&summary, state);

        if summary.agents_alive == 0 {
            info!(tick = summary.tick, "No companions left");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::NoAgents,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        last_summary = Some(summary);
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_agents_alive = result.final_summary.as_ref().map(|s| s.agents_alive),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            time = summary.time,
            agents_alive = summary.agents_alive,
            products = summary.products,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use companion_agents::{AgentManager, BehaviorConfig};
    use companion_types::{AgentClass, Mode, PeerId, ReplicatedRecord, Vec3};
    use companion_world::{Inventory, SandboxWorld, Terrain};

    use super::*;
    use crate::clock::SimClock;
    use crate::config::SimulationBoundsConfig;

    fn make_state(agents: usize) -> SimulationState {
        let mut world = SandboxWorld::new(Terrain::flat(50.0));
        world.set_peer_position(PeerId::new("host"), Vec3::ZERO);
        let mut state = SimulationState::new(
            SimClock::new(100).unwrap(),
            world,
            PeerId::new("host"),
            BehaviorConfig::default(),
        );
        let mut manager = AgentManager::new();
        for i in 0..agents {
            let agent = manager
                .create(format!("Companion {i}"), AgentClass::Humanoid, 100.0, Inventory::new(8, 100.0))
                .unwrap();
            state.add_agent(
                agent,
                Vec3::new(5.0, 0.0, 0.0),
                PeerId::new("host"),
                ReplicatedRecord {
                    mode: Some(Mode::Follow.code()),
                    owner: Some(PeerId::new("host")),
                    ..ReplicatedRecord::default()
                },
            );
        }
        state
    }

    fn operator(max_ticks: u64) -> Arc<OperatorState> {
        Arc::new(OperatorState::new(
            0,
            &SimulationBoundsConfig {
                max_ticks,
                summary_interval: 10,
            },
        ))
    }

    struct Counter(u64);

    impl TickCallback for Counter {
        fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {
            self.0 = self.0.saturating_add(1);
        }
    }

    #[tokio::test]
    async fn stops_at_tick_limit() {
        let mut state = make_state(1);
        let mut counter = Counter(0);
        let result = run_simulation(&mut state, &operator(5), &mut counter)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(counter.0, 5);
        assert_eq!(result.final_summary.unwrap().tick, 5);
    }

    #[tokio::test]
    async fn empty_simulation_ends_after_one_tick() {
        let mut state = make_state(0);
        let result = run_simulation(&mut state, &operator(100), &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::NoAgents);
        assert_eq!(result.total_ticks, 1);
    }

    #[tokio::test]
    async fn operator_stop_before_first_tick() {
        let mut state = make_state(1);
        let operator = operator(0);
        operator.request_stop();
        let result = run_simulation(&mut state, &operator, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn paced_run_completes() {
        let mut state = make_state(1);
        let operator = Arc::new(OperatorState::new(
            1,
            &SimulationBoundsConfig {
                max_ticks: 3,
                summary_interval: 10,
            },
        ));
        let result = run_simulation(&mut state, &operator, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.total_ticks, 3);
    }
}
