//! Harvestable resource nodes and player corpses, both reached through the
//! interact intent.

use crate::error::ActionError;
use crate::game::GameState;
use crate::store::Keyed;
use log::{debug, info};
use shared::{CorpseId, CorpseView, ItemStack, NodeId, PlayerId, ResourceView, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub id: NodeId,
    pub position: Vec3,
    /// Material item granted on harvest.
    pub kind: String,
    pub available: bool,
    pub respawn_at: u64,
}

impl Keyed for ResourceNode {
    type Id = NodeId;

    fn key(&self) -> NodeId {
        self.id
    }
}

impl ResourceNode {
    pub fn new(id: NodeId, position: Vec3, kind: impl Into<String>) -> Self {
        Self {
            id,
            position,
            kind: kind.into(),
            available: true,
            respawn_at: 0,
        }
    }

    /// Becomes available again once `respawn_at` is reached.
    pub fn refresh(&mut self, now: u64) -> bool {
        if !self.available && now >= self.respawn_at {
            self.available = true;
            return true;
        }
        false
    }

    pub fn view(&self) -> ResourceView {
        ResourceView {
            id: self.id,
            position: self.position,
            kind: self.kind.clone(),
            available: self.available,
        }
    }
}

/// Items a player dropped on death. Only the owner may loot it.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpse {
    pub id: CorpseId,
    pub owner: PlayerId,
    pub position: Vec3,
    pub items: Vec<ItemStack>,
    pub expires_at: u64,
}

impl Keyed for Corpse {
    type Id = CorpseId;

    fn key(&self) -> CorpseId {
        self.id
    }
}

impl Corpse {
    pub fn view(&self) -> CorpseView {
        CorpseView {
            id: self.id,
            owner: self.owner,
            position: self.position,
        }
    }
}

/// What an interact did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Harvested { node: NodeId, item: String },
    Looted { corpse: CorpseId, items: u32 },
}

impl GameState {
    /// Harvests the nearest available node in range, otherwise loots the
    /// player's own corpse in range.
    pub fn interact(&mut self, player_id: PlayerId) -> Result<Interaction, ActionError> {
        let player = self.players.get(player_id).ok_or(ActionError::Dead)?;
        if !player.alive {
            return Err(ActionError::Dead);
        }
        let position = player.position;
        let range = self.config.interact_range;

        let node = self
            .nodes
            .iter()
            .filter(|n| n.available && n.position.distance_xz(&position) <= range)
            .min_by(|a, b| a.position.distance_xz(&position).total_cmp(&b.position.distance_xz(&position)))
            .map(|n| (n.id, n.kind.clone()));
        if let Some((node_id, kind)) = node {
            return self.harvest(player_id, node_id, kind);
        }

        let corpse = self
            .corpses
            .iter()
            .filter(|c| c.owner == player_id && c.position.distance_xz(&position) <= range)
            .min_by(|a, b| a.position.distance_xz(&position).total_cmp(&b.position.distance_xz(&position)))
            .map(|c| c.id);
        match corpse {
            Some(id) => self.loot_corpse(player_id, id),
            None => Err(ActionError::NothingToInteract),
        }
    }

    fn harvest(&mut self, player_id: PlayerId, node_id: NodeId, kind: String) -> Result<Interaction, ActionError> {
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        player.inventory.add(&kind, 1)?;
        player.dirty = true;
        let respawn_at = self.now.saturating_add(self.config.node_respawn_ms);
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.available = false;
            node.respawn_at = respawn_at;
        }
        debug!("Player {} harvested {} from node {}", player_id, kind, node_id);
        Ok(Interaction::Harvested { node: node_id, item: kind })
    }

    /// Moves as many stacks as fit; the corpse disappears once empty.
    fn loot_corpse(&mut self, player_id: PlayerId, corpse_id: CorpseId) -> Result<Interaction, ActionError> {
        let Some(corpse) = self.corpses.get_mut(corpse_id) else {
            return Err(ActionError::NothingToInteract);
        };
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        let mut moved = 0;
        let mut left = Vec::new();
        for stack in corpse.items.drain(..) {
            match player.inventory.add(&stack.name, stack.count) {
                Ok(()) => moved += 1,
                Err(_) => left.push(stack),
            }
        }
        corpse.items = left;
        if moved == 0 && !corpse.items.is_empty() {
            return Err(ActionError::InventoryFull);
        }
        player.dirty = true;
        if corpse.items.is_empty() {
            self.corpses.remove(corpse_id);
        }
        info!("Player {} recovered {} stacks from corpse {}", player_id, moved, corpse_id);
        Ok(Interaction::Looted {
            corpse: corpse_id,
            items: moved,
        })
    }

    pub(crate) fn spawn_corpse(&mut self, owner: PlayerId, position: Vec3, items: Vec<ItemStack>) -> CorpseId {
        let id = self.next_corpse_id;
        self.next_corpse_id = self.next_corpse_id.wrapping_add(1).max(1);
        let expires_at = self.now.saturating_add(self.config.corpse_lifetime_ms);
        self.corpses.insert(Corpse {
            id,
            owner,
            position,
            items,
            expires_at,
        });
        id
    }

    /// Node respawns and corpse expiry.
    pub(crate) fn sweep_world_objects(&mut self) {
        let now = self.now;
        for node in self.nodes.iter_mut() {
            if node.refresh(now) {
                debug!("Node {} ({}) respawned", node.id, node.kind);
            }
        }
        let expired: Vec<CorpseId> = self
            .corpses
            .iter()
            .filter(|c| now >= c.expires_at || c.items.is_empty())
            .map(|c| c.id)
            .collect();
        for id in expired {
            self.corpses.remove(id);
            debug!("Corpse {} expired", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::player::Player;
    use shared::{ClassId, MapDescriptor};

    fn game() -> GameState {
        let mut map = MapDescriptor::default_map();
        map.mobs.clear();
        GameState::new(&map, SimConfig::default(), 1)
    }

    #[test]
    fn test_harvest_and_respawn() {
        let mut g = game();
        // wood node sits at (120, 90)
        g.add_player(Player::new(1, ClassId::Ranger, Vec3::flat(121.0, 90.0)));
        let result = g.interact(1).unwrap();
        assert!(matches!(result, Interaction::Harvested { ref item, .. } if item == "wood"));
        assert_eq!(g.players.get(1).unwrap().inventory.count_of("wood"), 1);
        assert_eq!(g.interact(1), Err(ActionError::NothingToInteract));
    }

    #[test]
    fn test_nothing_in_range() {
        let mut g = game();
        g.add_player(Player::new(1, ClassId::Mage, Vec3::flat(180.0, 20.0)));
        assert_eq!(g.interact(1), Err(ActionError::NothingToInteract));
    }

    #[test]
    fn test_only_owner_loots_corpse() {
        let mut g = game();
        let pos = Vec3::flat(180.0, 20.0);
        g.add_player(Player::new(1, ClassId::Mage, pos));
        g.add_player(Player::new(2, ClassId::Mage, pos));
        let stack = crate::items::stack_of("ore", 4).unwrap();
        let id = g.spawn_corpse(1, pos, vec![stack]);
        assert_eq!(g.interact(2), Err(ActionError::NothingToInteract));
        assert_eq!(g.interact(1), Ok(Interaction::Looted { corpse: id, items: 1 }));
        assert_eq!(g.players.get(1).unwrap().inventory.count_of("ore"), 4);
        assert!(g.corpses.is_empty());
    }

    #[test]
    fn test_corpse_expires() {
        let mut g = game();
        let stack = crate::items::stack_of("herb", 1).unwrap();
        g.spawn_corpse(1, Vec3::flat(10.0, 10.0), vec![stack]);
        g.now = g.config.corpse_lifetime_ms - 1;
        g.sweep_world_objects();
        assert_eq!(g.corpses.len(), 1);
        g.now += 1;
        g.sweep_world_objects();
        assert!(g.corpses.is_empty());
    }
}
