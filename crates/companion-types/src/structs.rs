//! Core record structs shared by the world substrate and the behavior core.

use serde::{Deserialize, Serialize};

use crate::enums::{ItemCategory, Mode, NoticeKind, ToolClass};
use crate::geometry::Vec3;
use crate::ids::{AgentId, PeerId};

/// Default stack size for stackable materials.
pub const DEFAULT_MAX_STACK: u32 = 50;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Current and maximum durability of a wearable item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Durability {
    /// Remaining durability points.
    pub current: f32,
    /// Durability when fully repaired.
    pub max: f32,
}

impl Durability {
    /// A fully repaired item with `max` points.
    pub const fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Remaining fraction in `0.0..=1.0`.
    pub fn ratio(self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }
}

/// Harvesting statistics of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolProfile {
    /// The damage type this tool deals.
    pub class: ToolClass,
    /// Damage per swing against matching resource nodes.
    pub damage: f32,
    /// Highest resource tier this tool can damage.
    pub tier: u8,
}

/// Combat statistics of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Damage per hit.
    pub damage: f32,
    /// Reach in meters.
    pub range: f32,
    /// Melee weapons close in; ranged weapons hold distance.
    pub melee: bool,
}

/// One stack of items in an inventory, a container, or on the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item kind key (e.g. `"CopperOre"`). Stacks merge by name.
    pub name: String,
    /// Broad classification.
    pub category: ItemCategory,
    /// Units in this stack.
    pub quantity: u32,
    /// Maximum units per stack.
    pub max_stack: u32,
    /// Weight of a single unit.
    pub unit_weight: f32,
    /// Crafting tier, used by repair stations.
    pub tier: u8,
    /// Durability for wearable gear.
    pub durability: Option<Durability>,
    /// Present on harvesting tools.
    pub tool: Option<ToolProfile>,
    /// Present on weapons.
    pub weapon: Option<WeaponProfile>,
}

impl ItemRecord {
    /// A stackable material.
    pub fn stack(name: impl Into<String>, category: ItemCategory, quantity: u32, unit_weight: f32) -> Self {
        Self {
            name: name.into(),
            category,
            quantity,
            max_stack: DEFAULT_MAX_STACK,
            unit_weight,
            tier: 0,
            durability: None,
            tool: None,
            weapon: None,
        }
    }

    /// A harvesting tool with full durability.
    pub fn tool(name: impl Into<String>, class: ToolClass, damage: f32, tier: u8, durability: f32) -> Self {
        Self {
            name: name.into(),
            category: ItemCategory::Tool,
            quantity: 1,
            max_stack: 1,
            unit_weight: 2.0,
            tier,
            durability: Some(Durability::full(durability)),
            tool: Some(ToolProfile { class, damage, tier }),
            weapon: None,
        }
    }

    /// A weapon with full durability.
    pub fn weapon(name: impl Into<String>, damage: f32, range: f32, melee: bool, durability: f32) -> Self {
        Self {
            name: name.into(),
            category: ItemCategory::Weapon,
            quantity: 1,
            max_stack: 1,
            unit_weight: 2.5,
            tier: 1,
            durability: Some(Durability::full(durability)),
            tool: None,
            weapon: Some(WeaponProfile { damage, range, melee }),
        }
    }

    /// Total weight of the stack.
    pub fn weight(&self) -> f32 {
        self.unit_weight * self.quantity as f32
    }

    /// A copy of this record with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Whether `other` can merge into this stack.
    pub fn stacks_with(&self, other: &Self) -> bool {
        self.max_stack > 1 && self.name == other.name && self.durability.is_none()
    }

    /// Whether this item has a durability pool that is fully spent.
    pub fn is_broken(&self) -> bool {
        self.durability.is_some_and(|d| d.current <= 0.0)
    }

    /// Tool damage against the given class, zero if not a matching tool.
    pub fn tool_damage(&self, class: ToolClass) -> f32 {
        self.tool
            .filter(|t| t.class == class)
            .map_or(0.0, |t| t.damage)
    }
}

// ---------------------------------------------------------------------------
// Replicated record
// ---------------------------------------------------------------------------

/// The durable, cross-peer-synchronized state of one agent.
///
/// Every field is optional: a freshly joined peer may observe the record
/// before all fields have been synchronized, and controllers must treat a
/// missing field as "not known yet", never as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedRecord {
    /// Persisted [`Mode`] as an integer code.
    pub mode: Option<i64>,
    /// Peer id of the owning player.
    pub owner: Option<PeerId>,
    /// Home position used by Stay mode.
    pub home: Option<Vec3>,
    /// Whether `home` has been set by the owner.
    pub home_set: Option<bool>,
    /// Formation slot index around the owner.
    pub formation_slot: Option<i32>,
    /// Current stamina.
    pub stamina: Option<f32>,
    /// Key of the last rest spot used for recovery.
    pub last_recovery_id: Option<String>,
}

impl ReplicatedRecord {
    /// Decoded mode, if synchronized.
    pub fn mode(&self) -> Option<Mode> {
        self.mode.map(Mode::from_code)
    }

    /// Home point, only when it has been explicitly set.
    pub fn home_point(&self) -> Option<Vec3> {
        if self.home_set == Some(true) {
            self.home
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker samples and notices
// ---------------------------------------------------------------------------

/// A timestamped position observation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSample {
    /// Where the agent was.
    pub position: Vec3,
    /// Simulation time in seconds.
    pub timestamp: f64,
}

/// One-shot feedback for the owning player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// The agent reporting.
    pub agent: AgentId,
    /// What happened.
    pub kind: NoticeKind,
    /// Human-readable detail.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durability_ratio_clamps() {
        let d = Durability { current: 30.0, max: 60.0 };
        assert!((d.ratio() - 0.5).abs() < 1.0e-6);
        let zero = Durability { current: 5.0, max: 0.0 };
        assert!(zero.ratio().abs() < 1.0e-6);
    }

    #[test]
    fn stacks_merge_by_name_only_without_durability() {
        let wood = ItemRecord::stack("Wood", ItemCategory::Material, 5, 2.0);
        let more = ItemRecord::stack("Wood", ItemCategory::Material, 3, 2.0);
        let axe = ItemRecord::tool("AxeBronze", ToolClass::Axe, 30.0, 2, 150.0);
        assert!(wood.stacks_with(&more));
        assert!(!axe.stacks_with(&axe));
    }

    #[test]
    fn tool_damage_matches_class() {
        let axe = ItemRecord::tool("AxeFlint", ToolClass::Axe, 20.0, 1, 100.0);
        assert!((axe.tool_damage(ToolClass::Axe) - 20.0).abs() < 1.0e-6);
        assert!(axe.tool_damage(ToolClass::Pickaxe).abs() < 1.0e-6);
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: ReplicatedRecord = serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(record.mode(), None);
        assert_eq!(record.home_point(), None);
    }

    #[test]
    fn home_requires_flag() {
        let record = ReplicatedRecord {
            home: Some(Vec3::new(1.0, 0.0, 1.0)),
            home_set: Some(false),
            ..ReplicatedRecord::default()
        };
        assert_eq!(record.home_point(), None);
    }

    #[test]
    fn unknown_mode_decodes_to_follow() {
        let record = ReplicatedRecord {
            mode: Some(99),
            ..ReplicatedRecord::default()
        };
        assert_eq!(record.mode(), Some(Mode::Follow));
    }
}
