//! Tick callback that reports simulation progress through `tracing`.
//!
//! Every notice a companion raises is logged as it happens. A one-line
//! summary of who is driving movement is logged every `interval` ticks.

use companion_core::runner::TickCallback;
use companion_core::tick::{SimulationState, TickSummary};
use companion_types::MovementOwner;
use tracing::{debug, info};

/// Callback that logs notices and periodic summaries.
#[derive(Debug)]
pub struct SummaryCallback {
    interval: u64,
    products_total: u64,
}

impl SummaryCallback {
    /// Create a callback that summarizes every `interval` ticks. An
    /// interval of 0 disables the periodic line.
    pub const fn new(interval: u64) -> Self {
        Self {
            interval,
            products_total: 0,
        }
    }

    /// Products finished by fixtures since the run began.
    pub const fn products_total(&self) -> u64 {
        self.products_total
    }
}

impl TickCallback for SummaryCallback {
    fn on_tick(&mut self, summary: &TickSummary, sim: &SimulationState) {
        self.products_total = self.products_total.saturating_add(u64::from(summary.products));

        for notice in &summary.notices {
            let name = sim
                .agents
                .get(&notice.agent)
                .map_or("?", |slot| slot.agent.name.as_str());
            info!(
                tick = summary.tick,
                agent = name,
                kind = ?notice.kind,
                "{}", notice.message
            );
        }

        let due = summary
            .tick
            .checked_rem(self.interval)
            .is_some_and(|r| r == 0);
        if !due {
            return;
        }

        let count = |owner: MovementOwner| summary.owners.values().filter(|o| **o == owner).count();
        let gathering = count(MovementOwner::Harvest);
        let producing = count(MovementOwner::Smelt);
        let fighting = count(MovementOwner::Combat);
        let following = count(MovementOwner::Follow).saturating_add(count(MovementOwner::Patrol));
        info!(
            tick = summary.tick,
            time = summary.time,
            agents_alive = summary.agents_alive,
            gathering,
            producing,
            fighting,
            following,
            products_total = self.products_total,
            "Simulation progress"
        );
        debug!(tick = summary.tick, ticked = summary.agents_ticked, "Owners resolved");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use companion_agents::BehaviorConfig;
    use companion_core::clock::SimClock;
    use companion_types::PeerId;
    use companion_world::{SandboxWorld, Terrain};

    use super::*;

    fn summary(tick: u64, products: u32) -> TickSummary {
        TickSummary {
            tick,
            time: 0.0,
            agents_alive: 0,
            agents_ticked: 0,
            products,
            owners: BTreeMap::new(),
            notices: Vec::new(),
            removed: Vec::new(),
        }
    }

    #[test]
    fn accumulates_products() {
        let state = SimulationState::new(
            SimClock::new(100).unwrap(),
            SandboxWorld::new(Terrain::flat(10.0)),
            PeerId::new("host"),
            BehaviorConfig::default(),
        );
        let mut callback = SummaryCallback::new(0);
        callback.on_tick(&summary(1, 2), &state);
        callback.on_tick(&summary(2, 3), &state);
        assert_eq!(callback.products_total(), 5);
    }
}
