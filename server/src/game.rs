use crate::config::SimConfig;
use crate::error::ActionError;
use crate::gathering::{Corpse, ResourceNode};
use crate::mob::{Mob, MobType};
use crate::party::PartyManager;
use crate::player::Player;
use crate::status::tick_periodic;
use crate::store::EntityStore;
use crate::utils::floor_u32;
use crate::world::World;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    ChatChannel, ClassId, CorpseId, Intent, MapDescriptor, MobId, MoveIntent, PlayerId, ResourceKind,
    TargetRef, Vec3, VisualEvent, PLAYER_RADIUS,
};

/// Longest chat message relayed, in characters.
pub const MAX_CHAT_LEN: usize = 200;

/// Side effects of a tick or intent that the network layer must deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ActionFailed {
        player: PlayerId,
        slot: Option<u8>,
        error: ActionError,
    },
    Visual(VisualEvent),
    Chat {
        from: PlayerId,
        channel: ChatChannel,
        text: String,
        recipients: Vec<PlayerId>,
    },
    LevelUp {
        player: PlayerId,
        level: u32,
    },
    PlayerDied {
        player: PlayerId,
        killer: Option<TargetRef>,
    },
    MobKilled {
        mob: MobId,
        killer: Option<PlayerId>,
        recipients: Vec<PlayerId>,
    },
}

/// The whole simulated world. Every mutation happens on the tick thread.
#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    /// Simulation clock in milliseconds.
    pub now: u64,
    pub world: World,
    pub players: EntityStore<Player>,
    pub mobs: EntityStore<Mob>,
    pub nodes: EntityStore<ResourceNode>,
    pub corpses: EntityStore<Corpse>,
    pub parties: PartyManager,
    pub config: SimConfig,
    pub(crate) rng: StdRng,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) next_corpse_id: CorpseId,
    next_mob_id: MobId,
    arrivals: u64,
}

impl GameState {
    pub fn new(map: &MapDescriptor, config: SimConfig, seed: u64) -> Self {
        let mut game = Self {
            tick: 0,
            now: 0,
            world: World::from_map(map),
            players: EntityStore::new(),
            mobs: EntityStore::new(),
            nodes: EntityStore::new(),
            corpses: EntityStore::new(),
            parties: PartyManager::new(config.max_party_size),
            config,
            rng: StdRng::seed_from_u64(seed),
            events: Vec::new(),
            next_corpse_id: 1,
            next_mob_id: 1,
            arrivals: 0,
        };

        for (i, r) in map.resources.iter().enumerate() {
            let id = i as u32 + 1;
            game.nodes.insert(ResourceNode::new(id, Vec3::flat(r.x, r.z), r.kind.clone()));
        }

        for placement in &map.mobs {
            let mob_type = match placement.mob_type.as_deref() {
                None => MobType::Slime,
                Some(name) => MobType::parse(name).unwrap_or_else(|| {
                    warn!("Unknown mob type '{}', spawning a slime", name);
                    MobType::Slime
                }),
            };
            let base = placement.level.unwrap_or(1) as i64;
            let variance = placement.variance.unwrap_or(0) as i64;
            let level = if variance > 0 {
                base + game.rng.gen_range(-variance..=variance)
            } else {
                base
            };
            let anchor = game.world.resolve(Vec3::flat(placement.x, placement.z), shared::MOB_RADIUS);
            let id = game.spawn_mob(mob_type, level.max(1) as u32, anchor);
            if let (Some(aggressive), Some(mob)) = (placement.aggressive, game.mobs.get_mut(id)) {
                mob.aggressive = aggressive;
            }
        }

        info!(
            "World ready: {} mobs, {} resource nodes, {} vendors",
            game.mobs.len(),
            game.nodes.len(),
            game.world.vendors.len()
        );
        game
    }

    pub fn spawn_mob(&mut self, mob_type: MobType, level: u32, anchor: Vec3) -> MobId {
        let id = self.next_mob_id;
        self.next_mob_id += 1;
        self.mobs.insert(Mob::new(id, mob_type, level, anchor, None));
        id
    }

    /// Spawn point for the next arrival.
    pub fn next_spawn_point(&mut self) -> Vec3 {
        let point = self.world.spawn_point(self.arrivals);
        self.arrivals += 1;
        point
    }

    /// Creates a fresh level 1 character at the next spawn point.
    pub fn create_player(&mut self, id: PlayerId, class: ClassId) -> Option<&Player> {
        let position = self.next_spawn_point();
        self.add_player(Player::new(id, class, position));
        self.players.get(id)
    }

    pub fn add_player(&mut self, mut player: Player) {
        player.position = self.world.resolve(player.position, PLAYER_RADIUS);
        info!(
            "Added player {} ({} L{}) at ({:.1}, {:.1})",
            player.id,
            player.class.name(),
            player.level,
            player.position.x,
            player.position.z
        );
        self.players.insert(player);
    }

    /// Removes a player and every reference to them in the live world.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.parties.forget(id);
        for mob in self.mobs.iter_mut() {
            if mob.target == Some(id) {
                mob.target = None;
            }
        }
        for other in self.players.iter_mut() {
            if other.target == Some(TargetRef::Player(id)) {
                other.target = None;
            }
        }
        info!("Removed player {}", id);
        Some(player)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn reject(&mut self, player: PlayerId, slot: Option<u8>, error: ActionError) {
        debug!("Player {} action rejected: {}", player, error.code());
        self.events.push(GameEvent::ActionFailed { player, slot, error });
    }

    /// Applies one decoded intent. Rejections become `ActionFailed` events
    /// for the acting player and never mutate state.
    pub fn apply_intent(&mut self, player_id: PlayerId, intent: Intent) {
        let slot = match &intent {
            Intent::Ability { slot, .. } => Some(*slot),
            _ => None,
        };
        if let Err(error) = self.dispatch(player_id, intent) {
            self.reject(player_id, slot, error);
        }
    }

    fn dispatch(&mut self, player_id: PlayerId, intent: Intent) -> Result<(), ActionError> {
        match intent {
            Intent::Input { keys } => self.set_movement(
                player_id,
                MoveIntent {
                    keys,
                    target: None,
                },
            ),
            Intent::MoveTarget { x, y, z } => self.set_movement(player_id, MoveIntent::toward(Vec3::new(x, y, z))),
            Intent::TargetSelect { target } => self.select_target(player_id, target),
            Intent::Interact => self.interact(player_id).map(|_| ()),
            Intent::Ability { slot, placement } => self.use_ability(player_id, slot, placement),
            Intent::ClassSelect { class } => self.class_select(player_id, class),
            Intent::InventorySwap { from, to } => self.inventory_swap(player_id, from, to),
            Intent::EquipSwap {
                from_type,
                from_slot,
                to_type,
                to_slot,
            } => self.equip_swap(player_id, (from_type, from_slot), (to_type, to_slot)),
            Intent::VendorSell { vendor, slot } => self.vendor_sell(player_id, vendor, slot).map(|_| ()),
            Intent::VendorBuy { vendor, item, count } => self.vendor_buy(player_id, vendor, &item, count).map(|_| ()),
            Intent::Chat { channel, text } => self.chat(player_id, channel, &text),
            Intent::PartyInvite { player } => {
                if !self.players.contains(player) {
                    return Err(ActionError::InvalidTarget);
                }
                self.parties.invite(player_id, player)
            }
            Intent::PartyAccept => self.parties.accept(player_id).map(|_| ()),
            Intent::PartyLeave => self.parties.leave(player_id),
            Intent::Craft { recipe, count } => self.craft(player_id, &recipe, count),
            Intent::Respawn => self.respawn(player_id),
        }
    }

    fn set_movement(&mut self, player_id: PlayerId, movement: MoveIntent) -> Result<(), ActionError> {
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        if !player.alive {
            return Err(ActionError::Dead);
        }
        player.movement = movement;
        Ok(())
    }

    fn select_target(&mut self, player_id: PlayerId, target: Option<TargetRef>) -> Result<(), ActionError> {
        let exists = match target {
            Some(TargetRef::Mob(id)) => self.mobs.contains(id),
            Some(TargetRef::Player(id)) => self.players.contains(id),
            None => true,
        };
        if !exists {
            return Err(ActionError::InvalidTarget);
        }
        let player = self.players.get_mut(player_id).ok_or(ActionError::Dead)?;
        player.target = target;
        Ok(())
    }

    pub fn class_select(&mut self, player_id: PlayerId, class: ClassId) -> Result<(), ActionError> {
        let player = self.players.get(player_id).ok_or(ActionError::Dead)?;
        if !player.alive {
            return Err(ActionError::Dead);
        }
        if !self.world.in_base(&player.position) {
            return Err(ActionError::NotInBase);
        }
        if let Some(p) = self.players.get_mut(player_id) {
            p.set_class(class);
            info!("Player {} is now a {}", player_id, class.name());
        }
        Ok(())
    }

    pub fn respawn(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        let player = self.players.get(player_id).ok_or(ActionError::Dead)?;
        if player.alive {
            return Err(ActionError::NotDead);
        }
        if self.now < player.respawn_at {
            return Err(ActionError::RespawnPending);
        }
        let position = self.next_spawn_point();
        if let Some(p) = self.players.get_mut(player_id) {
            p.revive(position);
            info!("Player {} respawned", player_id);
        }
        Ok(())
    }

    /// Relays trimmed text to everyone (`Say`) or to the sender's party.
    pub fn chat(&mut self, from: PlayerId, channel: ChatChannel, text: &str) -> Result<(), ActionError> {
        let text: String = text.trim().chars().take(MAX_CHAT_LEN).collect();
        if text.is_empty() {
            return Ok(());
        }
        let recipients = match channel {
            ChatChannel::Say => self.players.ids(),
            ChatChannel::Party => {
                if self.parties.party_of(from).is_none() {
                    return Err(ActionError::NotInParty);
                }
                self.parties.group_of(from)
            }
        };
        self.events.push(GameEvent::Chat {
            from,
            channel,
            text,
            recipients,
        });
        Ok(())
    }

    /// Moves the unequipped inventory into a corpse and starts the respawn
    /// timer.
    pub(crate) fn kill_player(&mut self, id: PlayerId, killer: Option<TargetRef>) {
        let now = self.now;
        let delay = self.config.player_respawn_ms;
        let Some(player) = self.players.get_mut(id) else {
            return;
        };
        player.kill(now, delay);
        let position = player.position;
        let items = player.inventory.drain();
        if !items.is_empty() {
            self.spawn_corpse(id, position, items);
        }
        for mob in self.mobs.iter_mut() {
            if mob.target == Some(id) {
                mob.target = None;
            }
        }
        info!("Player {} was killed by {:?}", id, killer);
        self.events.push(GameEvent::PlayerDied { player: id, killer });
    }

    /// Advances the simulation by `dt_ms`: players, then mobs, then
    /// statuses and resources, then world objects.
    pub fn tick(&mut self, dt_ms: u64) {
        self.tick += 1;
        self.now = self.now.saturating_add(dt_ms);

        self.update_players(dt_ms);
        self.update_mobs(dt_ms);
        self.update_statuses(dt_ms);
        self.sweep_world_objects();

        if self.tick % 60 == 0 {
            debug!(
                "Tick {} t={}ms: {} players, {} mobs alive, {} corpses",
                self.tick,
                self.now,
                self.players.len(),
                self.mobs.iter().filter(|m| !m.is_dead()).count(),
                self.corpses.len()
            );
        }
    }

    fn update_players(&mut self, dt_ms: u64) {
        let now = self.now;
        let dt = dt_ms as f32 / 1000.0;
        for i in 0..self.players.len() {
            let fallback = self.world.spawn_point(i as u64);
            let Some(player) = self.players.at_mut(i) else {
                continue;
            };
            let id = player.id;
            player.sanitize(fallback);
            if !player.alive {
                continue;
            }
            if !player.movement.is_idle() {
                let speed = player.speed(now);
                let step = self.world.step(player.position, &player.movement, dt, speed, PLAYER_RADIUS);
                if step.position != player.position {
                    player.dirty = true;
                }
                player.position = step.position;
                player.movement.target = step.target;
                if let Some(heading) = step.heading {
                    player.facing = heading;
                }
            }
            self.advance_cast(id);
            let wants_swing = self
                .players
                .get(id)
                .map_or(false, |p| p.alive && p.target.is_some() && p.casting.is_none());
            if wants_swing {
                // out of range or on cooldown just means no swing this tick
                let _ = self.basic_attack(id);
            }
        }
    }

    fn update_statuses(&mut self, dt_ms: u64) {
        let now = self.now;
        let dt = dt_ms as f32 / 1000.0;

        for i in 0..self.players.len() {
            let Some(id) = self.players.at(i).map(|p| p.id) else {
                continue;
            };
            let (dot, hot) = match self.players.get_mut(id) {
                Some(p) if p.alive => (
                    tick_periodic(&mut p.status.dot, now),
                    tick_periodic(&mut p.status.hot, now),
                ),
                _ => continue,
            };
            if let Some((amount, source)) = dot {
                self.damage_player(id, amount as f32, source, true);
            }
            if let Some((amount, _)) = hot {
                self.heal_player(id, amount as f32);
            }
            if let Some(p) = self.players.get_mut(id) {
                regenerate(p, &self.config, now, dt);
            }
        }

        for i in 0..self.mobs.len() {
            let Some(mob) = self.mobs.at_mut(i) else {
                continue;
            };
            if mob.is_dead() {
                continue;
            }
            let id = mob.id;
            let due = tick_periodic(&mut mob.status.dot, now);
            if let Some((amount, source)) = due {
                let attacker = match source {
                    Some(TargetRef::Player(p)) => Some(p),
                    _ => None,
                };
                self.damage_mob(id, amount as f32, attacker, true);
            }
        }
    }
}

/// Resource regen/decay, stance upkeep and out-of-combat hp regen.
fn regenerate(player: &mut Player, config: &SimConfig, now: u64, dt: f32) {
    if !player.alive {
        return;
    }
    let in_combat = player.in_combat(now);
    match player.resource_kind() {
        ResourceKind::Mana => player.gain_resource((1.0 + 0.15 * player.stats.intellect) * dt),
        ResourceKind::Energy => player.gain_resource(config.energy_regen_per_sec * dt),
        ResourceKind::Rage => {
            if !in_combat {
                player.gain_resource(-config.rage_decay_per_sec * dt);
            }
        }
    }

    if let Some(stance) = player.stance {
        let drained = (player.resource - stance.drain_per_sec * dt).max(0.0);
        player.resource = drained;
        if drained <= 0.0 || !stance.is_active(now) {
            player.stance = None;
            debug!("Player {} left their stance", player.id);
        }
    }

    if !in_combat && player.hp < player.stats.max_hp {
        player.regen_carry += player.stats.max_hp as f32 * config.out_of_combat_regen * dt;
        let whole = floor_u32(player.regen_carry);
        if whole > 0 {
            player.regen_carry -= whole as f32;
            player.hp = player.hp.saturating_add(whole).min(player.stats.max_hp);
            player.dirty = true;
        }
    } else {
        player.regen_carry = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Stance;
    use shared::KeyState;

    fn game() -> GameState {
        let mut map = MapDescriptor::default_map();
        map.mobs.clear();
        GameState::new(&map, SimConfig::default(), 11)
    }

    #[test]
    fn test_new_spawns_map_content() {
        let g = GameState::new(&MapDescriptor::default_map(), SimConfig::default(), 1);
        assert_eq!(g.mobs.len(), 6);
        assert_eq!(g.nodes.len(), 4);
        for mob in g.mobs.iter() {
            assert!(mob.level >= 1);
            assert_eq!(mob.hp, mob.max_hp);
        }
    }

    #[test]
    fn test_create_player_cycles_spawns() {
        let mut g = game();
        let a = g.create_player(1, ClassId::Mage).unwrap().position;
        let b = g.create_player(2, ClassId::Mage).unwrap().position;
        assert_ne!(a, b);
        assert!(g.world.in_base(&a));
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut g = game();
        g.tick(50);
        g.tick(50);
        assert_eq!(g.tick, 2);
        assert_eq!(g.now, 100);
    }

    #[test]
    fn test_movement_updates_facing() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        let keys = KeyState {
            left: true,
            ..KeyState::default()
        };
        g.apply_intent(1, Intent::Input { keys });
        let before = g.players.get(1).unwrap().position;
        g.tick(100);
        let p = g.players.get(1).unwrap();
        assert!(p.position.x < before.x);
        assert_eq!(p.facing, Vec3::flat(-1.0, 0.0));
    }

    #[test]
    fn test_rejection_emits_event() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        g.apply_intent(1, Intent::Ability { slot: 2, placement: None });
        let events = g.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::ActionFailed {
                player: 1,
                slot: Some(2),
                error: ActionError::InsufficientResource,
            }]
        );
    }

    #[test]
    fn test_class_select_only_in_base() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        assert!(g.class_select(1, ClassId::Priest).is_ok());
        assert_eq!(g.players.get(1).unwrap().class, ClassId::Priest);
        g.players.get_mut(1).unwrap().position = Vec3::flat(170.0, 170.0);
        assert_eq!(g.class_select(1, ClassId::Mage), Err(ActionError::NotInBase));
    }

    #[test]
    fn test_death_drops_corpse_and_respawn_timer() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        g.players.get_mut(1).unwrap().inventory.add("wood", 3).unwrap();
        g.kill_player(1, None);
        assert_eq!(g.corpses.len(), 1);
        assert!(g.players.get(1).unwrap().inventory.is_empty());
        assert_eq!(g.respawn(1), Err(ActionError::RespawnPending));
        g.now += g.config.player_respawn_ms;
        assert!(g.respawn(1).is_ok());
        let p = g.players.get(1).unwrap();
        assert!(p.alive);
        assert_eq!(p.hp, p.stats.max_hp);
        assert_eq!(g.respawn(1), Err(ActionError::NotDead));
    }

    #[test]
    fn test_chat_trims_and_caps() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        g.create_player(2, ClassId::Fighter);
        let long = format!("  {}  ", "x".repeat(500));
        g.chat(1, ChatChannel::Say, &long).unwrap();
        match g.drain_events().pop() {
            Some(GameEvent::Chat { text, recipients, .. }) => {
                assert_eq!(text.len(), MAX_CHAT_LEN);
                assert_eq!(recipients, vec![1, 2]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(g.chat(1, ChatChannel::Party, "hi"), Err(ActionError::NotInParty));
    }

    #[test]
    fn test_rage_decays_out_of_combat_only() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        g.players.get_mut(1).unwrap().resource = 50.0;
        g.tick(1_000);
        assert_eq!(g.players.get(1).unwrap().resource, 45.0);
        g.players.get_mut(1).unwrap().in_combat_until = g.now + 10_000;
        g.tick(1_000);
        assert_eq!(g.players.get(1).unwrap().resource, 45.0);
    }

    #[test]
    fn test_hp_regen_out_of_combat() {
        let mut g = game();
        g.create_player(1, ClassId::Fighter);
        g.players.get_mut(1).unwrap().hp = 10;
        // 2% of 136 per second is 2.72
        g.tick(1_000);
        assert_eq!(g.players.get(1).unwrap().hp, 12);
        g.tick(1_000);
        assert_eq!(g.players.get(1).unwrap().hp, 15);
    }

    #[test]
    fn test_stance_ends_when_rage_runs_out() {
        let mut g = game();
        g.create_player(1, ClassId::Guardian);
        {
            let p = g.players.get_mut(1).unwrap();
            p.resource = 6.0;
            p.in_combat_until = 100_000;
            p.stance = Some(Stance {
                damage_taken: 0.6,
                speed: 0.7,
                drain_per_sec: 4.0,
                expires_at: 10_000,
            });
        }
        g.tick(1_000);
        assert!(g.players.get(1).unwrap().stance.is_some());
        g.tick(1_000);
        let p = g.players.get(1).unwrap();
        assert!(p.stance.is_none());
        assert_eq!(p.resource, 0.0);
    }
}
