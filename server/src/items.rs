//! Static item catalog, crafting recipes and the fixed-size inventory.

use crate::error::ActionError;
use shared::{ItemKind, ItemStack};

/// Flat stat bonuses granted while an item is equipped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatBonus {
    pub strength: f32,
    pub agility: f32,
    pub intellect: f32,
    pub stamina: f32,
    pub defense: f32,
    /// Added to basic-attack damage (weapons only).
    pub weapon_damage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemDef {
    pub name: &'static str,
    pub kind: ItemKind,
    pub stack_max: u32,
    /// Vendor sell price per unit.
    pub value: u64,
    pub bonus: StatBonus,
}

const NONE: StatBonus = StatBonus {
    strength: 0.0,
    agility: 0.0,
    intellect: 0.0,
    stamina: 0.0,
    defense: 0.0,
    weapon_damage: 0,
};

const fn material(name: &'static str, value: u64) -> ItemDef {
    ItemDef {
        name,
        kind: ItemKind::Material,
        stack_max: 50,
        value,
        bonus: NONE,
    }
}

const fn gear(name: &'static str, kind: ItemKind, value: u64, bonus: StatBonus) -> ItemDef {
    ItemDef {
        name,
        kind,
        stack_max: 1,
        value,
        bonus,
    }
}

static ITEMS: &[ItemDef] = &[
    material("wood", 1),
    material("ore", 2),
    material("herb", 1),
    material("leather", 2),
    ItemDef {
        name: "bandage",
        kind: ItemKind::Consumable,
        stack_max: 20,
        value: 2,
        bonus: NONE,
    },
    ItemDef {
        name: "health_potion",
        kind: ItemKind::Consumable,
        stack_max: 10,
        value: 8,
        bonus: NONE,
    },
    gear("iron_sword", ItemKind::Weapon, 25, StatBonus { strength: 3.0, weapon_damage: 3, ..NONE }),
    gear("oak_staff", ItemKind::Weapon, 20, StatBonus { intellect: 4.0, weapon_damage: 1, ..NONE }),
    gear("short_bow", ItemKind::Weapon, 22, StatBonus { agility: 3.0, weapon_damage: 2, ..NONE }),
    gear("wooden_shield", ItemKind::Offhand, 12, StatBonus { defense: 6.0, ..NONE }),
    gear("leather_cap", ItemKind::Head, 8, StatBonus { stamina: 1.0, defense: 2.0, ..NONE }),
    gear("leather_vest", ItemKind::Chest, 14, StatBonus { stamina: 2.0, defense: 4.0, ..NONE }),
    gear("leather_pants", ItemKind::Legs, 10, StatBonus { stamina: 1.0, defense: 3.0, ..NONE }),
    gear("leather_boots", ItemKind::Feet, 8, StatBonus { agility: 1.0, defense: 1.0, ..NONE }),
];

pub fn item_def(name: &str) -> Option<&'static ItemDef> {
    ITEMS.iter().find(|d| d.name == name)
}

pub fn stack_of(name: &str, count: u32) -> Option<ItemStack> {
    item_def(name).map(|d| ItemStack {
        kind: d.kind,
        name: d.name.to_string(),
        count,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub id: &'static str,
    pub inputs: &'static [(&'static str, u32)],
    pub output: (&'static str, u32),
}

static RECIPES: &[Recipe] = &[
    Recipe {
        id: "bandage",
        inputs: &[("herb", 2)],
        output: ("bandage", 1),
    },
    Recipe {
        id: "health_potion",
        inputs: &[("herb", 3), ("ore", 1)],
        output: ("health_potion", 1),
    },
    Recipe {
        id: "iron_sword",
        inputs: &[("ore", 3), ("wood", 1)],
        output: ("iron_sword", 1),
    },
    Recipe {
        id: "leather_cap",
        inputs: &[("leather", 2)],
        output: ("leather_cap", 1),
    },
];

pub fn recipe(id: &str) -> Option<&'static Recipe> {
    RECIPES.iter().find(|r| r.id == id)
}

/// Fixed number of slots; stack sizes are capped by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
}

impl Inventory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    /// Rebuilds from persisted slots, dropping unknown items and clamping
    /// stacks to their caps. Extra slots are discarded.
    pub fn from_slots(size: usize, saved: Vec<Option<ItemStack>>) -> Self {
        let mut inv = Self::new(size);
        for (i, stack) in saved.into_iter().take(size).enumerate() {
            inv.slots[i] = stack.and_then(|s| {
                let def = item_def(&s.name)?;
                let count = s.count.min(def.stack_max);
                (count > 0).then(|| ItemStack {
                    kind: def.kind,
                    name: def.name.to_string(),
                    count,
                })
            });
        }
        inv
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn count_of(&self, name: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.name == name)
            .map(|s| s.count)
            .sum()
    }

    /// How many more units of `name` fit.
    pub fn room_for(&self, name: &str) -> u32 {
        let Some(def) = item_def(name) else {
            return 0;
        };
        self.slots
            .iter()
            .map(|slot| match slot {
                None => def.stack_max,
                Some(s) if s.name == name => def.stack_max.saturating_sub(s.count),
                Some(_) => 0,
            })
            .sum()
    }

    /// Adds `count` units, topping up existing stacks first. All or nothing.
    pub fn add(&mut self, name: &str, count: u32) -> Result<(), ActionError> {
        let def = item_def(name).ok_or(ActionError::InvalidSlot)?;
        if self.room_for(name) < count {
            return Err(ActionError::InventoryFull);
        }
        let mut left = count;
        for stack in self.slots.iter_mut().flatten() {
            if left == 0 {
                break;
            }
            if stack.name == name && stack.count < def.stack_max {
                let moved = (def.stack_max - stack.count).min(left);
                stack.count += moved;
                left -= moved;
            }
        }
        for slot in self.slots.iter_mut() {
            if left == 0 {
                break;
            }
            if slot.is_none() {
                let moved = def.stack_max.min(left);
                *slot = stack_of(name, moved);
                left -= moved;
            }
        }
        Ok(())
    }

    /// Removes `count` units from wherever they are. All or nothing.
    pub fn remove(&mut self, name: &str, count: u32) -> Result<(), ActionError> {
        if self.count_of(name) < count {
            return Err(ActionError::MissingMaterials);
        }
        let mut left = count;
        for slot in self.slots.iter_mut().rev() {
            if left == 0 {
                break;
            }
            if let Some(stack) = slot.as_mut().filter(|s| s.name == name) {
                let taken = stack.count.min(left);
                stack.count -= taken;
                left -= taken;
                if stack.count == 0 {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    pub fn take_slot(&mut self, slot: usize) -> Option<ItemStack> {
        self.slots.get_mut(slot).and_then(|s| s.take())
    }

    /// Places a stack into an empty slot.
    pub fn put_slot(&mut self, slot: usize, stack: ItemStack) -> Result<(), ActionError> {
        match self.slots.get_mut(slot) {
            Some(s @ None) => {
                *s = Some(stack);
                Ok(())
            }
            Some(Some(_)) => Err(ActionError::InvalidSlot),
            None => Err(ActionError::InvalidSlot),
        }
    }

    /// Replaces a slot's contents, returning what was there.
    pub fn replace_slot(
        &mut self,
        slot: usize,
        stack: Option<ItemStack>,
    ) -> Result<Option<ItemStack>, ActionError> {
        let s = self.slots.get_mut(slot).ok_or(ActionError::InvalidSlot)?;
        Ok(std::mem::replace(s, stack))
    }

    /// Swaps two slots, or merges into `to` when both hold the same item
    /// (any overflow above the stack cap stays in `from`).
    pub fn swap(&mut self, from: usize, to: usize) -> Result<(), ActionError> {
        if from >= self.slots.len() || to >= self.slots.len() {
            return Err(ActionError::InvalidSlot);
        }
        if from == to {
            return Ok(());
        }
        let same_item = matches!(
            (&self.slots[from], &self.slots[to]),
            (Some(a), Some(b)) if a.name == b.name
        );
        if !same_item {
            self.slots.swap(from, to);
            return Ok(());
        }
        let cap = self.slots[to]
            .as_ref()
            .and_then(|s| item_def(&s.name))
            .map(|d| d.stack_max)
            .unwrap_or(1);
        let to_count = self.slots[to].as_ref().map(|s| s.count).unwrap_or(0);
        let from_count = self.slots[from].as_ref().map(|s| s.count).unwrap_or(0);
        let moved = cap.saturating_sub(to_count).min(from_count);
        if let Some(s) = self.slots[to].as_mut() {
            s.count += moved;
        }
        let remaining = from_count - moved;
        if remaining == 0 {
            self.slots[from] = None;
        } else if let Some(s) = self.slots[from].as_mut() {
            s.count = remaining;
        }
        Ok(())
    }

    /// Empties every slot, returning the stacks that were held.
    pub fn drain(&mut self) -> Vec<ItemStack> {
        self.slots.iter_mut().filter_map(|s| s.take()).collect()
    }

    /// Consumes recipe inputs and adds the outputs atomically.
    pub fn craft(&mut self, recipe: &Recipe, count: u32) -> Result<(), ActionError> {
        let mut scratch = self.clone();
        for (name, per) in recipe.inputs {
            scratch.remove(name, per.saturating_mul(count))?;
        }
        scratch.add(recipe.output.0, recipe.output.1.saturating_mul(count))?;
        *self = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let sword = item_def("iron_sword").unwrap();
        assert_eq!(sword.kind, ItemKind::Weapon);
        assert_eq!(sword.stack_max, 1);
        assert!(item_def("excalibur").is_none());
        for r in RECIPES {
            assert!(item_def(r.output.0).is_some(), "{}", r.id);
            for (input, _) in r.inputs {
                assert!(item_def(input).is_some(), "{}", input);
            }
        }
    }

    #[test]
    fn test_add_respects_stack_caps() {
        let mut inv = Inventory::new(3);
        inv.add("wood", 120).unwrap();
        assert_eq!(inv.get(0).unwrap().count, 50);
        assert_eq!(inv.get(1).unwrap().count, 50);
        assert_eq!(inv.get(2).unwrap().count, 20);
        assert_eq!(inv.add("wood", 31), Err(ActionError::InventoryFull));
        assert_eq!(inv.count_of("wood"), 120);
        inv.add("wood", 30).unwrap();
        assert_eq!(inv.room_for("ore"), 0);
    }

    #[test]
    fn test_remove_all_or_nothing() {
        let mut inv = Inventory::new(4);
        inv.add("herb", 3).unwrap();
        assert_eq!(inv.remove("herb", 4), Err(ActionError::MissingMaterials));
        assert_eq!(inv.count_of("herb"), 3);
        inv.remove("herb", 3).unwrap();
        assert!(inv.is_empty());
    }

    #[test]
    fn test_swap_and_merge() {
        let mut inv = Inventory::new(4);
        inv.put_slot(0, stack_of("herb", 40).unwrap()).unwrap();
        inv.put_slot(1, stack_of("herb", 30).unwrap()).unwrap();
        inv.swap(1, 0).unwrap();
        assert_eq!(inv.get(0).unwrap().count, 50);
        assert_eq!(inv.get(1).unwrap().count, 20);

        inv.put_slot(2, stack_of("ore", 1).unwrap()).unwrap();
        inv.swap(2, 3).unwrap();
        assert!(inv.get(2).is_none());
        assert_eq!(inv.get(3).unwrap().name, "ore");
        assert_eq!(inv.swap(0, 9), Err(ActionError::InvalidSlot));
    }

    #[test]
    fn test_craft_is_atomic() {
        let mut inv = Inventory::new(2);
        inv.add("ore", 3).unwrap();
        let sword = recipe("iron_sword").unwrap();
        assert_eq!(inv.craft(sword, 1), Err(ActionError::MissingMaterials));
        assert_eq!(inv.count_of("ore"), 3);
        inv.add("wood", 1).unwrap();
        inv.craft(sword, 1).unwrap();
        assert_eq!(inv.count_of("iron_sword"), 1);
        assert_eq!(inv.count_of("ore"), 0);
    }

    #[test]
    fn test_craft_needs_room_for_output() {
        let mut inv = Inventory::new(1);
        inv.add("herb", 4).unwrap();
        // consuming 4 herbs frees the only slot, so two bandages fit
        inv.craft(recipe("bandage").unwrap(), 2).unwrap();
        assert_eq!(inv.count_of("bandage"), 2);
    }

    #[test]
    fn test_from_slots_sanitizes() {
        let saved = vec![
            Some(ItemStack { kind: ItemKind::Material, name: "wood".into(), count: 999 }),
            Some(ItemStack { kind: ItemKind::Material, name: "unobtainium".into(), count: 1 }),
            None,
        ];
        let inv = Inventory::from_slots(2, saved);
        assert_eq!(inv.size(), 2);
        assert_eq!(inv.get(0).unwrap().count, 50);
        assert!(inv.get(1).is_none());
    }
}
