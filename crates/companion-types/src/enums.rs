//! Enumeration types for the companion behavior core.
//!
//! The persisted [`Mode`] is the only enum that crosses the replication
//! boundary as an integer; everything else is transient, per-peer state.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// The persisted behavior mode of a companion.
///
/// Stored in the replicated record as an integer. The mode is the single
/// source of truth for which task controller should run; any change resets
/// every controller's transient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Stay close to the owner and fight threats.
    Follow,
    /// Chop trees.
    GatherWood,
    /// Break rocks.
    GatherStone,
    /// Mine ore deposits.
    GatherOre,
    /// Hold position at home: run the production loop when fixtures are
    /// nearby, otherwise patrol the home point.
    Stay,
}

impl Mode {
    /// Decode the replicated integer. Unknown values fall back to
    /// [`Mode::Follow`] so a peer running an older build never strands an
    /// agent in an undefined mode.
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::GatherWood,
            2 => Self::GatherStone,
            3 => Self::GatherOre,
            4 => Self::Stay,
            _ => Self::Follow,
        }
    }

    /// Encode for the replicated record.
    pub const fn code(self) -> i64 {
        match self {
            Self::Follow => 0,
            Self::GatherWood => 1,
            Self::GatherStone => 2,
            Self::GatherOre => 3,
            Self::Stay => 4,
        }
    }

    /// The resource kind gathered in this mode, if it is a gather mode.
    pub const fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            Self::GatherWood => Some(ResourceKind::Wood),
            Self::GatherStone => Some(ResourceKind::Stone),
            Self::GatherOre => Some(ResourceKind::Ore),
            Self::Follow | Self::Stay => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resources and items
// ---------------------------------------------------------------------------

/// The kind of harvestable resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Trees and logs.
    Wood,
    /// Rocks and boulders.
    Stone,
    /// Ore deposits.
    Ore,
}

impl ResourceKind {
    /// The tool class that damages this resource.
    pub const fn tool_class(self) -> ToolClass {
        match self {
            Self::Wood => ToolClass::Axe,
            Self::Stone | Self::Ore => ToolClass::Pickaxe,
        }
    }
}

/// The damage type a tool deals to resource nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolClass {
    /// Chop damage (trees).
    Axe,
    /// Pickaxe damage (rocks, ore).
    Pickaxe,
}

/// Broad classification of an item record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    /// Harvesting tool (axe, pickaxe).
    Tool,
    /// Combat weapon.
    Weapon,
    /// Raw input for a production fixture.
    Ore,
    /// Fuel for a production fixture.
    Fuel,
    /// Output of a production fixture.
    Refined,
    /// Gathered building material (wood, stone).
    Material,
    /// Food and potions.
    Consumable,
    /// Anything else.
    Misc,
}

/// The navigation class passed to the path oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentClass {
    /// Human-sized companion.
    Humanoid,
    /// Large body that needs wider clearance.
    Large,
}

/// The purpose of a static station in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StationKind {
    /// Repairs wood and stone tier gear.
    Workbench,
    /// Repairs metal tier gear.
    Forge,
    /// Rest spot with the best recovery.
    Bed,
    /// Rest spot by a fire.
    Campfire,
}

impl StationKind {
    /// Whether this station can repair items.
    pub const fn repairs(self) -> bool {
        matches!(self, Self::Workbench | Self::Forge)
    }

    /// Whether an agent can rest at this station.
    pub const fn rests(self) -> bool {
        matches!(self, Self::Bed | Self::Campfire)
    }
}

// ---------------------------------------------------------------------------
// Behavior bookkeeping
// ---------------------------------------------------------------------------

/// Why a target was excluded from selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlacklistReason {
    /// Stuck escalation or the path oracle gave up on the target.
    Unreachable,
    /// The agent kept revisiting the same small area near the target.
    Oscillating,
    /// Repeated pre-swing line-of-sight or height validation failures.
    LineOfSight,
    /// A container or fixture was in use by someone else.
    Occupied,
    /// No carried tool is good enough. Cleared only on mode change.
    ToolTierTooLow,
}

impl BlacklistReason {
    /// Whether entries with this reason expire with time.
    pub const fn decays(self) -> bool {
        !matches!(self, Self::ToolTierTooLow)
    }
}

/// Which behavior holds movement for the current tick.
///
/// Resolved once per tick by the coordinator; at most one value issues
/// movement commands in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovementOwner {
    /// Nobody moved the agent this tick.
    None,
    /// A directed one-shot request.
    Directed,
    /// The rest controller.
    Rest,
    /// The repair controller.
    Repair,
    /// The harvest controller.
    Harvest,
    /// The smelt/production controller.
    Smelt,
    /// Combat movement toward a target.
    Combat,
    /// Formation follow around the owner.
    Follow,
    /// Home patrol.
    Patrol,
}

impl MovementOwner {
    /// Whether this owner is one of the task controllers.
    pub const fn is_task(self) -> bool {
        matches!(self, Self::Rest | Self::Repair | Self::Harvest | Self::Smelt)
    }
}

/// Phase of the harvest state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HarvestPhase {
    /// Waiting for the next scan.
    Idle,
    /// Walking to the stand point of a target.
    Moving,
    /// Swinging at a target.
    Attacking,
    /// Picking up drops near the last site.
    CollectingDrops,
}

/// Phase of the smelt/production state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SmeltPhase {
    /// Not running.
    Idle,
    /// Deciding what to do next.
    Scanning,
    /// Walking to a source container.
    MovingToChest,
    /// Container open; taking the planned material.
    TakingFromChest,
    /// Walking to the fixture's interaction point.
    MovingToSmelter,
    /// Feeding one unit per cadence into the fixture.
    InsertingItem,
    /// Nothing to feed; waiting for processing to finish.
    Monitoring,
    /// Releasing finished output at the fixture.
    CollectingOutput,
    /// Walking output to a container with room.
    MovingToOutputChest,
    /// Container open; depositing output.
    StoringOutput,
}

/// One-shot feedback shown to the owning player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoticeKind {
    /// No tool for the current gather mode.
    NoTool,
    /// A target needs a better tool than any carried.
    ToolTierTooLow,
    /// Inventory cannot take more.
    InventoryFull,
    /// The equipped tool has no durability left.
    ToolBroken,
    /// A target or destination could not be reached.
    Unreachable,
    /// Production has nothing left to do.
    NothingToProcess,
    /// No container has room for output.
    NoStorage,
    /// A directed request could not be completed.
    RequestFailed,
}
