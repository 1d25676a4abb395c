//! Agent records and creation.
//!
//! An [`Agent`] holds everything about one companion that is not
//! replicated: identity, health, inventory and the main-hand slot. Mode,
//! owner and home live in the replicated store instead. The
//! [`AgentManager`] creates agents and enforces unique display names.

use std::collections::BTreeSet;

use companion_types::{AgentClass, AgentId, ItemRecord, ResourceKind, ToolClass, WeaponProfile};
use companion_world::Inventory;
use tracing::debug;

use crate::error::AgentError;

/// One companion instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// Unique identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Navigation size class.
    pub class: AgentClass,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Carried items, excluding the main hand.
    pub inventory: Inventory,
    /// Item held in the main hand.
    main_hand: Option<ItemRecord>,
}

impl Agent {
    /// Whether the agent is alive.
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// The main-hand item.
    pub const fn main_hand(&self) -> Option<&ItemRecord> {
        self.main_hand.as_ref()
    }

    /// Mutable access to the main-hand item (wear, repair).
    pub const fn main_hand_mut(&mut self) -> Option<&mut ItemRecord> {
        self.main_hand.as_mut()
    }

    /// Every carried item including the main hand.
    pub fn all_gear(&self) -> impl Iterator<Item = &ItemRecord> {
        self.main_hand.iter().chain(self.inventory.all_items())
    }

    /// Move the inventory item at `index` into the main hand. The previous
    /// main-hand item goes back to the inventory.
    pub fn equip_index(&mut self, index: usize) -> Result<(), AgentError> {
        let Some(item) = self.inventory.remove_at(index) else {
            return Err(AgentError::NotEquippable {
                name: format!("#{index}"),
            });
        };
        if item.tool.is_none() && item.weapon.is_none() {
            let name = item.name.clone();
            self.inventory.add(item)?;
            return Err(AgentError::NotEquippable { name });
        }
        if let Some(previous) = self.main_hand.take()
            && let Err(source) = self.inventory.add(previous.clone())
        {
            self.main_hand = Some(previous);
            self.inventory.add(item)?;
            return Err(AgentError::Inventory { source });
        }
        debug!(agent = %self.id, item = %item.name, "Equipped");
        self.main_hand = Some(item);
        Ok(())
    }

    /// Put the main-hand item back into the inventory.
    pub fn unequip(&mut self) -> Result<(), AgentError> {
        if let Some(item) = self.main_hand.take() {
            if let Err(source) = self.inventory.add(item.clone()) {
                self.main_hand = Some(item);
                return Err(AgentError::Inventory { source });
            }
        }
        Ok(())
    }

    /// The best usable tool for `kind` whose tier reaches `min_tier`.
    /// Considers the main hand and the inventory.
    pub fn best_tool(&self, kind: ResourceKind, min_tier: u8) -> Option<&ItemRecord> {
        best_tool(self.all_gear(), kind.tool_class(), min_tier)
    }

    /// Highest tier among usable tools of `class`.
    pub fn best_tool_tier(&self, class: ToolClass) -> Option<u8> {
        self.all_gear()
            .filter(|item| !item.is_broken())
            .filter_map(|item| item.tool.filter(|t| t.class == class))
            .map(|t| t.tier)
            .max()
    }

    /// Whether any tool of `class` is carried, broken or not.
    pub fn carries_tool(&self, class: ToolClass) -> bool {
        self.all_gear()
            .any(|item| item.tool.is_some_and(|t| t.class == class))
    }

    /// Equip the best tool for `kind` reaching `min_tier`, if not already
    /// held. Returns whether a suitable tool is in hand afterwards.
    pub fn equip_best_tool(&mut self, kind: ResourceKind, min_tier: u8) -> bool {
        let class = kind.tool_class();
        let Some(best) = self.best_tool(kind, min_tier) else {
            return false;
        };
        let best_damage = best.tool_damage(class);
        let held_damage = self
            .main_hand
            .as_ref()
            .filter(|item| !item.is_broken() && item.tool.is_some_and(|t| t.tier >= min_tier))
            .map_or(0.0, |item| item.tool_damage(class));
        if held_damage > 0.0 && held_damage >= best_damage {
            return true;
        }
        let index = self.inventory.all_items().iter().position(|item| {
            !item.is_broken()
                && item.tool.is_some_and(|t| t.class == class && t.tier >= min_tier)
                && item.tool_damage(class) >= best_damage
        });
        index.is_some_and(|i| self.equip_index(i).is_ok())
    }

    /// Weapon profile of the main hand, if it is a usable weapon.
    pub fn weapon(&self) -> Option<WeaponProfile> {
        self.main_hand
            .as_ref()
            .filter(|item| !item.is_broken())
            .and_then(|item| item.weapon)
    }

    /// Equip the strongest usable weapon from the inventory if the main
    /// hand holds none.
    pub fn equip_best_weapon(&mut self) {
        if self.weapon().is_some() {
            return;
        }
        let best = self
            .inventory
            .all_items()
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_broken())
            .filter_map(|(i, item)| item.weapon.map(|w| (i, w.damage)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        if let Some(index) = best
            && let Err(e) = self.equip_index(index)
        {
            debug!(agent = %self.id, error = %e, "Could not equip weapon");
        }
    }

    /// Spend durability on the main-hand item.
    pub fn wear_main_hand(&mut self, amount: f32) {
        if let Some(durability) = self.main_hand.as_mut().and_then(|item| item.durability.as_mut()) {
            durability.current = (durability.current - amount).max(0.0);
        }
    }
}

/// Highest-damage usable tool of `class` with tier at least `min_tier`.
pub fn best_tool<'a>(
    items: impl Iterator<Item = &'a ItemRecord>,
    class: ToolClass,
    min_tier: u8,
) -> Option<&'a ItemRecord> {
    items
        .filter(|item| !item.is_broken())
        .filter(|item| item.tool.is_some_and(|t| t.class == class && t.tier >= min_tier))
        .max_by(|a, b| a.tool_damage(class).total_cmp(&b.tool_damage(class)))
}

/// Creates agents and keeps display names unique.
#[derive(Debug, Default)]
pub struct AgentManager {
    /// Names currently in use.
    names_in_use: BTreeSet<String>,
}

impl AgentManager {
    /// Create an empty manager.
    pub const fn new() -> Self {
        Self {
            names_in_use: BTreeSet::new(),
        }
    }

    /// Create an agent with full health and the given inventory.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateName`] if the name is already taken.
    pub fn create(
        &mut self,
        name: String,
        class: AgentClass,
        max_health: f32,
        inventory: Inventory,
    ) -> Result<Agent, AgentError> {
        if self.names_in_use.contains(&name) {
            return Err(AgentError::DuplicateName(name));
        }
        self.names_in_use.insert(name.clone());
        Ok(Agent {
            id: AgentId::new(),
            name,
            class,
            health: max_health,
            max_health,
            inventory,
            main_hand: None,
        })
    }

    /// Free a name after death or despawn.
    pub fn release(&mut self, name: &str) -> bool {
        self.names_in_use.remove(name)
    }

    /// Number of live names.
    pub fn count(&self) -> usize {
        self.names_in_use.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use companion_types::ItemCategory;

    use super::*;

    fn agent_with(items: Vec<ItemRecord>) -> Agent {
        let mut inventory = Inventory::new(12, 200.0);
        for item in items {
            inventory.add(item).unwrap();
        }
        AgentManager::new()
            .create(String::from("Brann"), AgentClass::Humanoid, 100.0, inventory)
            .unwrap()
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut manager = AgentManager::new();
        let inv = Inventory::new(4, 50.0);
        assert!(manager.create(String::from("A"), AgentClass::Humanoid, 10.0, inv.clone()).is_ok());
        assert!(matches!(
            manager.create(String::from("A"), AgentClass::Humanoid, 10.0, inv.clone()),
            Err(AgentError::DuplicateName(_))
        ));
        assert!(manager.release("A"));
        assert!(manager.create(String::from("A"), AgentClass::Humanoid, 10.0, inv).is_ok());
    }

    #[test]
    fn equips_highest_damage_tool() {
        let mut agent = agent_with(vec![
            ItemRecord::tool("AxeStone", ToolClass::Axe, 10.0, 1, 50.0),
            ItemRecord::tool("AxeBronze", ToolClass::Axe, 25.0, 2, 80.0),
            ItemRecord::tool("Pickaxe", ToolClass::Pickaxe, 40.0, 2, 80.0),
        ]);
        assert!(agent.equip_best_tool(ResourceKind::Wood, 0));
        assert_eq!(agent.main_hand().map(|i| i.name.as_str()), Some("AxeBronze"));
        assert_eq!(agent.inventory.all_items().len(), 2);
    }

    #[test]
    fn broken_tools_are_skipped() {
        let mut broken = ItemRecord::tool("AxeBronze", ToolClass::Axe, 25.0, 2, 80.0);
        broken.wear_to_zero();
        let agent = agent_with(vec![broken, ItemRecord::tool("AxeStone", ToolClass::Axe, 10.0, 1, 50.0)]);
        assert_eq!(agent.best_tool(ResourceKind::Wood, 0).map(|i| i.name.as_str()), Some("AxeStone"));
        assert_eq!(agent.best_tool(ResourceKind::Wood, 2), None);
        assert!(agent.carries_tool(ToolClass::Axe));
    }

    #[test]
    fn materials_cannot_be_equipped() {
        let mut agent = agent_with(vec![ItemRecord::stack("Wood", ItemCategory::Material, 3, 1.0)]);
        assert!(matches!(agent.equip_index(0), Err(AgentError::NotEquippable { .. })));
        assert_eq!(agent.inventory.count("Wood"), 3);
    }

    #[test]
    fn failed_weapon_swap_keeps_both_items() {
        let mut axe = ItemRecord::tool("AxeStone", ToolClass::Axe, 10.0, 1, 50.0);
        axe.unit_weight = 4.0;
        let mut agent = agent_with(vec![axe]);
        assert!(agent.equip_best_tool(ResourceKind::Wood, 0));

        let mut pack = Inventory::new(1, 3.0);
        pack.add(ItemRecord::weapon("Spear", 8.0, 2.2, true, 100.0)).unwrap();
        agent.inventory = pack;

        agent.equip_best_weapon();
        assert_eq!(agent.main_hand().map(|i| i.name.as_str()), Some("AxeStone"));
        assert_eq!(agent.inventory.count("Spear"), 1);
        assert!(agent.weapon().is_none());
    }

    #[test]
    fn wear_spends_durability() {
        let mut agent = agent_with(vec![ItemRecord::tool("AxeStone", ToolClass::Axe, 10.0, 1, 2.0)]);
        assert!(agent.equip_best_tool(ResourceKind::Wood, 0));
        agent.wear_main_hand(1.5);
        agent.wear_main_hand(1.5);
        assert!(agent.main_hand().unwrap().is_broken());
        assert!(!agent.equip_best_tool(ResourceKind::Wood, 0));
    }

    trait WearExt {
        fn wear_to_zero(&mut self);
    }

    impl WearExt for ItemRecord {
        fn wear_to_zero(&mut self) {
            if let Some(d) = self.durability.as_mut() {
                d.current = 0.0;
            }
        }
    }
}
