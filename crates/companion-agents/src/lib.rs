//! Companion behavior core.
//!
//! Every agent runs a set of cooperating state machines once per tick. The
//! [`Coordinator`] decides which of them holds movement; each controller
//! talks to the world only through the [`TickContext`] it is handed, so the
//! same logic runs against the in-memory sandbox in tests and against any
//! other substrate implementing the `companion-world` traits.
//!
//! # Modules
//!
//! - [`agent`] -- Agent state, equipment, and [`AgentManager`]
//! - [`blacklist`] -- Time-bounded target exclusion with escalation
//! - [`combat`] -- Sticky target acquisition and hysteretic combat movement
//! - [`config`] -- Behavior tunables ([`BehaviorConfig`])
//! - [`context`] -- Per-tick context, movement gate, notice latch
//! - [`coordinator`] -- Per-agent dispatcher ([`Coordinator`])
//! - [`directed`] -- One-shot directed requests
//! - [`error`] -- Behavior failure taxonomy and agent errors
//! - [`follow`] -- Formation follow and home patrol
//! - [`harvest`] -- Resource gathering state machine
//! - [`repair`] -- Gear maintenance at stations
//! - [`rest`] -- Stamina recovery
//! - [`smelt`] -- Production/logistics state machine and refill planner
//! - [`stand_point`] -- Terrain-aware stand point solver
//! - [`stuck`] -- Stuck escalation ladder and stall watch
//! - [`tracker`] -- Position history ring buffer

pub mod agent;
pub mod blacklist;
pub mod combat;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod directed;
pub mod error;
pub mod follow;
pub mod harvest;
pub mod repair;
pub mod rest;
pub mod smelt;
pub mod stand_point;
pub mod stuck;
pub mod tracker;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentManager};
pub use blacklist::{Blacklist, BlacklistEntry};
pub use combat::CombatController;
pub use config::BehaviorConfig;
pub use context::{AgentMemory, Approach, MoveGate, NoticeLatch, TickContext};
pub use coordinator::{Coordinator, ResetCause, TickReport};
pub use directed::{DirectedController, DirectedRequest, DirectedStatus};
pub use error::{AgentError, BehaviorError};
pub use follow::FollowController;
pub use harvest::HarvestController;
pub use repair::{RepairController, RepairPhase};
pub use rest::{RestController, RestPhase};
pub use smelt::{CarryTask, ContainerSnapshot, FixtureSnapshot, Need, SmeltController, Source, plan_refill};
pub use stuck::{StallWatch, StuckAction, StuckLadder};
pub use tracker::{PositionTracker, TRACKER_CAPACITY};
