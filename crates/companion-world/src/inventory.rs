//! Slot- and weight-limited inventories.
//!
//! Agents and containers both hold an [`Inventory`]. Stackable items merge
//! into existing stacks by name before new slots are used. Limits are
//! checked up front: a failed [`Inventory::add`] leaves the inventory
//! unchanged, and callers are expected to consult [`Inventory::can_add`]
//! before starting any transfer.

use companion_types::ItemRecord;
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// A bag of item stacks with a slot count and a weight limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Stacks in slot order.
    items: Vec<ItemRecord>,
    /// Maximum number of stacks.
    max_slots: usize,
    /// Maximum total weight.
    max_weight: f32,
}

impl Inventory {
    /// Create an empty inventory.
    pub const fn new(max_slots: usize, max_weight: f32) -> Self {
        Self {
            items: Vec::new(),
            max_slots,
            max_weight,
        }
    }

    /// All stacks in slot order.
    pub fn all_items(&self) -> &[ItemRecord] {
        &self.items
    }

    /// Mutable access to stacks (durability bookkeeping).
    pub fn items_mut(&mut self) -> &mut [ItemRecord] {
        &mut self.items
    }

    /// Maximum total weight.
    pub const fn max_weight(&self) -> f32 {
        self.max_weight
    }

    /// Sum of all stack weights.
    pub fn total_weight(&self) -> f32 {
        self.items.iter().map(ItemRecord::weight).sum()
    }

    /// Number of unused slots.
    pub fn free_slots(&self) -> usize {
        self.max_slots.saturating_sub(self.items.len())
    }

    /// Whether no slot is free and the weight limit is reached.
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0 || self.total_weight() >= self.max_weight
    }

    /// Total units held of the named item.
    pub fn count(&self, name: &str) -> u32 {
        self.items
            .iter()
            .filter(|i| i.name == name)
            .fold(0_u32, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Whether at least one unit of the named item is held.
    pub fn contains_item(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    /// Whether `item` fits, by both weight and slots.
    pub fn can_add(&self, item: &ItemRecord) -> bool {
        if self.total_weight() + item.weight() > self.max_weight {
            return false;
        }
        self.slots_needed(item) <= self.free_slots()
    }

    /// Number of new slots `item` would occupy after topping up existing
    /// stacks of the same kind.
    fn slots_needed(&self, item: &ItemRecord) -> usize {
        let mut remaining = item.quantity;
        for stack in self.items.iter().filter(|s| s.stacks_with(item)) {
            let room = stack.max_stack.saturating_sub(stack.quantity);
            remaining = remaining.saturating_sub(room);
        }
        if remaining == 0 {
            return 0;
        }
        let per_slot = item.max_stack.max(1);
        let slots = remaining.div_ceil(per_slot);
        usize::try_from(slots).unwrap_or(usize::MAX)
    }

    /// Add an item, merging into existing stacks first.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Overweight`] or [`InventoryError::NoFreeSlot`]
    /// without modifying the inventory.
    pub fn add(&mut self, item: ItemRecord) -> Result<(), InventoryError> {
        let current = self.total_weight();
        if current + item.weight() > self.max_weight {
            return Err(InventoryError::Overweight {
                weight: item.weight(),
                item: item.name,
                current,
                capacity: self.max_weight,
            });
        }
        if self.slots_needed(&item) > self.free_slots() {
            return Err(InventoryError::NoFreeSlot { item: item.name });
        }

        let mut remaining = item.quantity;
        for stack in self.items.iter_mut().filter(|s| s.stacks_with(&item)) {
            if remaining == 0 {
                break;
            }
            let room = stack.max_stack.saturating_sub(stack.quantity);
            let moved = room.min(remaining);
            stack.quantity = stack.quantity.saturating_add(moved);
            remaining = remaining.saturating_sub(moved);
        }
        let per_slot = item.max_stack.max(1);
        while remaining > 0 {
            let chunk = remaining.min(per_slot);
            self.items.push(item.with_quantity(chunk));
            remaining = remaining.saturating_sub(chunk);
        }
        Ok(())
    }

    /// Remove exactly `count` units of the named item.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Insufficient`] without modifying the
    /// inventory when fewer than `count` units are held.
    pub fn remove(&mut self, name: &str, count: u32) -> Result<(), InventoryError> {
        let available = self.count(name);
        if available < count {
            return Err(InventoryError::Insufficient {
                item: name.to_owned(),
                requested: count,
                available,
            });
        }
        let _ = self.take_up_to(name, count);
        Ok(())
    }

    /// Remove up to `max` units of the named item, newest stacks first.
    ///
    /// Returns the removed units as one record, or `None` if nothing was held.
    pub fn take_up_to(&mut self, name: &str, max: u32) -> Option<ItemRecord> {
        let mut template: Option<ItemRecord> = None;
        let mut taken: u32 = 0;
        let mut index = self.items.len();
        while index > 0 && taken < max {
            index = index.saturating_sub(1);
            let Some(stack) = self.items.get_mut(index) else {
                break;
            };
            if stack.name != name {
                continue;
            }
            let moved = stack.quantity.min(max.saturating_sub(taken));
            stack.quantity = stack.quantity.saturating_sub(moved);
            taken = taken.saturating_add(moved);
            if template.is_none() {
                template = Some(stack.with_quantity(0));
            }
            if stack.quantity == 0 {
                self.items.remove(index);
            }
        }
        template
            .filter(|_| taken > 0)
            .map(|t| t.with_quantity(taken))
    }

    /// Remove and return the stack at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<ItemRecord> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Remove and return every stack matching `predicate`.
    pub fn drain_matching(&mut self, predicate: impl Fn(&ItemRecord) -> bool) -> Vec<ItemRecord> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            core::mem::take(&mut self.items).into_iter().partition(|i| predicate(i));
        self.items = kept;
        taken
    }
}

#[cfg(test)]
mod tests {
    use companion_types::{ItemCategory, ToolClass};

    use super::*;

    fn wood(quantity: u32) -> ItemRecord {
        ItemRecord::stack("Wood", ItemCategory::Material, quantity, 1.0)
    }

    #[test]
    fn add_merges_into_existing_stack() {
        let mut inv = Inventory::new(4, 500.0);
        assert!(inv.add(wood(10)).is_ok());
        assert!(inv.add(wood(5)).is_ok());
        assert_eq!(inv.all_items().len(), 1);
        assert_eq!(inv.count("Wood"), 15);
    }

    #[test]
    fn add_spills_into_new_slots() {
        let mut inv = Inventory::new(4, 500.0);
        assert!(inv.add(wood(120)).is_ok());
        assert_eq!(inv.all_items().len(), 3);
        assert_eq!(inv.count("Wood"), 120);
    }

    #[test]
    fn add_rejects_overweight_without_change() {
        let mut inv = Inventory::new(4, 10.0);
        assert!(inv.add(wood(8)).is_ok());
        let result = inv.add(wood(5));
        assert!(matches!(result, Err(InventoryError::Overweight { .. })));
        assert_eq!(inv.count("Wood"), 8);
    }

    #[test]
    fn add_rejects_when_no_slot() {
        let mut inv = Inventory::new(1, 500.0);
        assert!(inv.add(ItemRecord::tool("AxeFlint", ToolClass::Axe, 20.0, 1, 100.0)).is_ok());
        assert!(!inv.can_add(&wood(1)));
        assert!(matches!(inv.add(wood(1)), Err(InventoryError::NoFreeSlot { .. })));
    }

    #[test]
    fn can_add_counts_room_in_existing_stacks() {
        let mut inv = Inventory::new(1, 500.0);
        assert!(inv.add(wood(40)).is_ok());
        assert!(inv.can_add(&wood(10)));
        assert!(!inv.can_add(&wood(11)));
    }

    #[test]
    fn remove_exact_and_insufficient() {
        let mut inv = Inventory::new(4, 500.0);
        assert!(inv.add(wood(10)).is_ok());
        assert!(inv.remove("Wood", 4).is_ok());
        assert_eq!(inv.count("Wood"), 6);
        assert!(matches!(
            inv.remove("Wood", 7),
            Err(InventoryError::Insufficient { available: 6, .. })
        ));
        assert_eq!(inv.count("Wood"), 6);
    }

    #[test]
    fn take_up_to_returns_partial() {
        let mut inv = Inventory::new(4, 500.0);
        assert!(inv.add(wood(3)).is_ok());
        let taken = inv.take_up_to("Wood", 10);
        assert_eq!(taken.map(|t| t.quantity), Some(3));
        assert!(!inv.contains_item("Wood"));
        assert!(inv.take_up_to("Wood", 1).is_none());
    }

    #[test]
    fn drain_matching_partitions() {
        let mut inv = Inventory::new(4, 500.0);
        assert!(inv.add(wood(3)).is_ok());
        assert!(inv.add(ItemRecord::tool("AxeFlint", ToolClass::Axe, 20.0, 1, 100.0)).is_ok());
        let drained = inv.drain_matching(|i| i.tool.is_none());
        assert_eq!(drained.len(), 1);
        assert_eq!(inv.all_items().len(), 1);
    }
}
