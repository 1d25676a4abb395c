//! Simulation clock, tick cycle, and orchestration for companion agents.
//!
//! This crate owns the fixed-step tick cycle that drives every companion the
//! local peer is authoritative for: clock, behavior, body integration,
//! fixture processing and cleanup.
//!
//! # Modules
//!
//! - [`clock`] -- Fixed-step clock with a checked tick counter.
//! - [`config`] -- Configuration loading from `companion-config.yaml` into
//!   strongly-typed structs.
//! - [`operator`] -- Shared pause/stop controls.
//! - [`runner`] -- The paced async simulation loop.
//! - [`tick`] -- Single-tick execution over the simulation state.

pub mod clock;
pub mod config;
pub mod operator;
pub mod runner;
pub mod tick;

pub use clock::{ClockError, SimClock};
pub use config::{ConfigError, SimulationConfig};
pub use operator::{OperatorState, SimulationEndReason};
pub use runner::{NoOpCallback, RunnerError, SimulationResult, TickCallback, run_simulation};
pub use tick::{AgentSlot, SimulationState, TickError, TickSummary, run_tick};
