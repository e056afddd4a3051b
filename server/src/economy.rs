//! Vendors, crafting and inventory/equipment management.

use crate::error::ActionError;
use crate::game::GameState;
use crate::items::{item_def, recipe, stack_of};
use crate::player::Player;
use log::{debug, info};
use shared::{EquipSlot, PlayerId, SlotType, VendorId};

impl GameState {
    /// Living player standing within interact range of `vendor`.
    fn player_at_vendor(&mut self, player_id: PlayerId, vendor: VendorId) -> Result<&mut Player, ActionError> {
        let range = self.config.interact_range;
        let vendor = self.world.vendor(vendor).ok_or(ActionError::NoVendor)?;
        let vendor_pos = vendor.position;
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        if !player.alive {
            return Err(ActionError::Dead);
        }
        if player.position.distance_xz(&vendor_pos) > range {
            return Err(ActionError::NoVendor);
        }
        Ok(player)
    }

    /// Sells the whole stack in `slot` for its catalog value per unit.
    pub fn vendor_sell(&mut self, player_id: PlayerId, vendor: VendorId, slot: u8) -> Result<u64, ActionError> {
        let player = self.player_at_vendor(player_id, vendor)?;
        let index = usize::from(slot);
        let value = player
            .inventory
            .get(index)
            .and_then(|s| item_def(&s.name).map(|d| d.value.saturating_mul(s.count as u64)))
            .ok_or(ActionError::InvalidSlot)?;
        let sold = player.inventory.take_slot(index).ok_or(ActionError::InvalidSlot)?;
        player.currency = player.currency.saturating_add(value);
        player.dirty = true;
        debug!("Player {} sold {}x{} for {}", player_id, sold.count, sold.name, value);
        Ok(value)
    }

    /// Buys `count` units of an item from the vendor's catalog.
    pub fn vendor_buy(&mut self, player_id: PlayerId, vendor: VendorId, item: &str, count: u32) -> Result<u64, ActionError> {
        let price = self
            .world
            .vendor(vendor)
            .ok_or(ActionError::NoVendor)?
            .price_of(item)
            .ok_or(ActionError::NotSold)?;
        let player = self.player_at_vendor(player_id, vendor)?;
        let total = price.saturating_mul(count as u64);
        if player.currency < total {
            return Err(ActionError::NotEnoughCurrency);
        }
        if player.inventory.room_for(item) < count {
            return Err(ActionError::InventoryFull);
        }
        player.inventory.add(item, count)?;
        player.currency -= total;
        player.dirty = true;
        debug!("Player {} bought {}x{} for {}", player_id, count, item, total);
        Ok(total)
    }

    pub fn craft(&mut self, player_id: PlayerId, recipe_id: &str, count: u32) -> Result<(), ActionError> {
        let recipe = recipe(recipe_id).ok_or(ActionError::UnknownRecipe)?;
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        if !player.alive {
            return Err(ActionError::Dead);
        }
        player.inventory.craft(recipe, count)?;
        player.dirty = true;
        info!("Player {} crafted {}x{}", player_id, count, recipe.id);
        Ok(())
    }

    pub fn inventory_swap(&mut self, player_id: PlayerId, from: u8, to: u8) -> Result<(), ActionError> {
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        player.inventory.swap(usize::from(from), usize::from(to))?;
        player.dirty = true;
        Ok(())
    }

    /// Moves items between inventory and equipment. An equipment slot only
    /// takes items of its own kind; stats are recomputed afterwards.
    pub fn equip_swap(
        &mut self,
        player_id: PlayerId,
        from: (SlotType, u8),
        to: (SlotType, u8),
    ) -> Result<(), ActionError> {
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        match (from, to) {
            ((SlotType::Inventory, a), (SlotType::Inventory, b)) => {
                player.inventory.swap(usize::from(a), usize::from(b))?;
            }
            ((SlotType::Inventory, inv), (SlotType::Equipment, eq)) | ((SlotType::Equipment, eq), (SlotType::Inventory, inv)) => {
                exchange(player, usize::from(inv), usize::from(eq))?;
            }
            ((SlotType::Equipment, a), (SlotType::Equipment, b)) => {
                if a != b {
                    return Err(ActionError::InvalidSlot);
                }
            }
        }
        player.recompute_stats();
        player.dirty = true;
        Ok(())
    }
}

/// Swaps inventory slot `inv` with equipment slot `eq`. Whatever ends up in
/// the equipment slot must match its kind.
fn exchange(player: &mut Player, inv: usize, eq: usize) -> Result<(), ActionError> {
    let slot = EquipSlot::from_index(eq).ok_or(ActionError::InvalidSlot)?;
    if inv >= player.inventory.size() {
        return Err(ActionError::InvalidSlot);
    }
    let incoming = player.inventory.get(inv).cloned();
    if let Some(stack) = &incoming {
        let fits = item_def(&stack.name).map_or(false, |d| d.kind == slot.accepts());
        if !fits || stack.count != 1 {
            return Err(ActionError::InvalidSlot);
        }
    }
    let outgoing = match player.equipment[slot.index()].as_deref() {
        Some(name) => Some(stack_of(name, 1).ok_or(ActionError::InvalidSlot)?),
        None => None,
    };
    if incoming.is_none() && outgoing.is_none() {
        return Err(ActionError::InvalidSlot);
    }
    player.inventory.replace_slot(inv, outgoing)?;
    player.equipment[slot.index()] = incoming.map(|s| s.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use shared::{ClassId, MapDescriptor, Vec3};

    fn game_with_player() -> GameState {
        let mut map = MapDescriptor::default_map();
        map.mobs.clear();
        let mut g = GameState::new(&map, SimConfig::default(), 1);
        // vendor 1 stands at (100, 108)
        g.add_player(Player::new(1, ClassId::Fighter, Vec3::flat(100.0, 106.0)));
        g
    }

    #[test]
    fn test_sell_whole_stack() {
        let mut g = game_with_player();
        g.players.get_mut(1).unwrap().inventory.add("ore", 5).unwrap();
        assert_eq!(g.vendor_sell(1, 1, 0), Ok(10));
        let p = g.players.get(1).unwrap();
        assert_eq!(p.currency, 10);
        assert!(p.inventory.is_empty());
        assert_eq!(g.vendor_sell(1, 1, 0), Err(ActionError::InvalidSlot));
    }

    #[test]
    fn test_vendor_range_and_existence() {
        let mut g = game_with_player();
        assert_eq!(g.vendor_sell(1, 9, 0), Err(ActionError::NoVendor));
        g.players.get_mut(1).unwrap().position = Vec3::flat(100.0, 90.0);
        assert_eq!(g.vendor_buy(1, 1, "bandage", 1), Err(ActionError::NoVendor));
    }

    #[test]
    fn test_buy_checks_catalog_and_currency() {
        let mut g = game_with_player();
        assert_eq!(g.vendor_buy(1, 1, "oak_staff", 1), Err(ActionError::NotSold));
        assert_eq!(g.vendor_buy(1, 1, "bandage", 2), Err(ActionError::NotEnoughCurrency));
        g.players.get_mut(1).unwrap().currency = 12;
        assert_eq!(g.vendor_buy(1, 1, "bandage", 2), Ok(10));
        let p = g.players.get(1).unwrap();
        assert_eq!(p.currency, 2);
        assert_eq!(p.inventory.count_of("bandage"), 2);
    }

    #[test]
    fn test_equip_updates_stats() {
        let mut g = game_with_player();
        g.players.get_mut(1).unwrap().inventory.add("iron_sword", 1).unwrap();
        let before = g.players.get(1).unwrap().stats.strength;
        g.equip_swap(1, (SlotType::Inventory, 0), (SlotType::Equipment, 0)).unwrap();
        let p = g.players.get(1).unwrap();
        assert_eq!(p.equipment[0].as_deref(), Some("iron_sword"));
        assert_eq!(p.stats.strength, before + 3.0);
        assert_eq!(p.basic_damage(), 9);
        assert!(p.inventory.is_empty());

        g.equip_swap(1, (SlotType::Equipment, 0), (SlotType::Inventory, 4)).unwrap();
        let p = g.players.get(1).unwrap();
        assert!(p.equipment[0].is_none());
        assert_eq!(p.inventory.get(4).unwrap().name, "iron_sword");
    }

    #[test]
    fn test_equip_rejects_wrong_kind() {
        let mut g = game_with_player();
        g.players.get_mut(1).unwrap().inventory.add("leather_cap", 1).unwrap();
        assert_eq!(
            g.equip_swap(1, (SlotType::Inventory, 0), (SlotType::Equipment, 0)),
            Err(ActionError::InvalidSlot)
        );
        assert!(g
            .equip_swap(1, (SlotType::Inventory, 0), (SlotType::Equipment, 2))
            .is_ok());
    }

    #[test]
    fn test_craft_unknown_recipe() {
        let mut g = game_with_player();
        assert_eq!(g.craft(1, "dragon_armor", 1), Err(ActionError::UnknownRecipe));
        assert_eq!(g.craft(1, "bandage", 1), Err(ActionError::MissingMaterials));
    }
}
