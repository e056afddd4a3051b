//! Mob behaviour: idle/wander/chase, leashing, taunt, melee attacks and
//! respawn after death.

use crate::game::{GameEvent, GameState};
use crate::mob::{AiState, Mob};
use crate::player::Player;
use crate::status::Combatant;
use crate::store::EntityStore;
use crate::world::World;
use log::debug;
use rand::Rng;
use shared::{EffectShape, MobId, PlayerId, TargetRef, Vec3, VisualEvent, MOB_RADIUS};

/// How long proximity aggro is ignored after a leash reset.
const AGGRO_SUPPRESS_MS: u64 = 3_000;
const RESPAWN_JITTER: f32 = 2.0;
const DWELL_MS: std::ops::Range<u64> = 1_500..4_000;

/// A melee swing decided during the mob sweep, resolved afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobAttack {
    pub mob: MobId,
    pub target: PlayerId,
    pub raw: f32,
}

impl GameState {
    pub(crate) fn update_mobs(&mut self, dt_ms: u64) {
        for i in 0..self.mobs.len() {
            let Some(id) = self.mobs.at(i).map(|m| m.id) else {
                continue;
            };
            if let Some(attack) = self.think(id, dt_ms) {
                self.resolve_mob_attack(attack);
            }
        }
    }

    fn think(&mut self, id: MobId, dt_ms: u64) -> Option<MobAttack> {
        let now = self.now;
        let dt = dt_ms as f32 / 1000.0;
        let GameState {
            mobs,
            players,
            world,
            rng,
            ..
        } = self;
        let mob = mobs.get_mut(id)?;

        if mob.is_dead() {
            if now >= mob.respawn_at {
                let jitter = Vec3::flat(
                    rng.gen_range(-RESPAWN_JITTER..=RESPAWN_JITTER),
                    rng.gen_range(-RESPAWN_JITTER..=RESPAWN_JITTER),
                );
                let position = world.resolve(mob.anchor.add(&jitter), MOB_RADIUS);
                mob.respawn(position, now);
                debug!("Mob {} ({}) respawned", mob.id, mob.mob_type.name());
            }
            return None;
        }
        mob.sanitize();
        if mob.status.is_stunned(now) {
            return None;
        }

        select_target(mob, players, world, now);

        match mob.state {
            AiState::Chase => chase(mob, players, world, now, dt),
            AiState::Idle => {
                if now >= mob.next_decision_at {
                    mob.state = AiState::Wander;
                    mob.heading = wander_heading(mob, &mut *rng);
                    mob.next_decision_at = now + rng.gen_range(DWELL_MS);
                }
                None
            }
            AiState::Wander => {
                let speed = mob.stats().wander_speed * mob.status.speed_multiplier(now);
                mob.position = world.sweep(mob.position, mob.heading, speed * dt, MOB_RADIUS);
                if now >= mob.next_decision_at {
                    mob.state = AiState::Idle;
                    mob.next_decision_at = now + rng.gen_range(DWELL_MS);
                }
                None
            }
            AiState::Dead => None,
        }
    }

    fn resolve_mob_attack(&mut self, attack: MobAttack) {
        let source = TargetRef::Mob(attack.mob);
        let outcome = self.damage_player(attack.target, attack.raw, Some(source), true);
        debug!(
            "Mob {} hit player {} for {} ({} absorbed)",
            attack.mob, attack.target, outcome.dealt, outcome.absorbed
        );
        self.events.push(GameEvent::Visual(VisualEvent {
            attacker: source,
            target: Some(TargetRef::Player(attack.target)),
            ability: "basic".to_string(),
            shape: EffectShape::Basic,
            at: None,
            duration_ms: 200,
        }));
    }
}

/// Applies taunt, drops invalid or leashed targets and picks up proximity
/// aggro.
fn select_target(mob: &mut Mob, players: &EntityStore<Player>, world: &World, now: u64) {
    let stats = mob.stats();
    let within_leash = |p: &Player| p.is_alive() && p.position.distance_xz(&mob.anchor) <= stats.leash_radius;

    if let Some(taunter) = mob.status.taunted_by(now) {
        if players.get(taunter).map_or(false, |p| within_leash(p)) {
            mob.target = Some(taunter);
            mob.state = AiState::Chase;
        }
    }

    if let Some(target) = mob.target {
        let valid = players.get(target).map_or(false, |p| within_leash(p));
        let strayed = mob.position.distance_xz(&mob.anchor) > stats.leash_radius;
        if !valid || strayed {
            leash_reset(mob, now);
        }
    }

    if mob.target.is_none() && mob.aggressive && now >= mob.aggro_suppressed_until {
        let nearest = players
            .iter()
            .filter(|p| p.is_alive() && !world.in_base(&p.position))
            .map(|p| (p.id, p.position.distance_xz(&mob.position)))
            .filter(|(_, d)| *d <= stats.aggro_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((player, _)) = nearest {
            debug!("Mob {} aggroed on player {}", mob.id, player);
            mob.target = Some(player);
            mob.state = AiState::Chase;
        }
    }

    if mob.target.is_none() && mob.state == AiState::Chase {
        mob.state = AiState::Idle;
    }
}

/// Drops the target and walks back toward the anchor.
fn leash_reset(mob: &mut Mob, now: u64) {
    let home = mob.anchor.sub(&mob.position);
    let speed = mob.stats().wander_speed.max(0.1);
    mob.target = None;
    mob.status.taunt = None;
    mob.state = AiState::Wander;
    mob.heading = home.normalize_xz();
    mob.next_decision_at = now + DWELL_MS.start + ((home.magnitude_xz() / speed) * 1000.0) as u64;
    mob.aggro_suppressed_until = now + AGGRO_SUPPRESS_MS;
    debug!("Mob {} leashed back to its anchor", mob.id);
}

fn chase(mob: &mut Mob, players: &EntityStore<Player>, world: &World, now: u64, dt: f32) -> Option<MobAttack> {
    let target = mob.target?;
    let position = players.get(target)?.position;
    let stats = mob.stats();
    let offset = position.sub(&mob.position);
    let distance = offset.magnitude_xz();

    if distance > stats.attack_range {
        let speed = stats.speed * mob.status.speed_multiplier(now);
        let travel = (speed * dt).min(distance - stats.attack_range * 0.9);
        if travel > 0.0 {
            mob.position = world.sweep(mob.position, offset, travel, MOB_RADIUS);
            mob.heading = offset.normalize_xz();
        }
        return None;
    }
    if now < mob.attack_ready_at {
        return None;
    }
    mob.attack_ready_at = now + stats.attack_cooldown_ms;
    Some(MobAttack {
        mob: mob.id,
        target,
        raw: mob.raw_attack(now),
    })
}

/// Random unit heading, biased home when the mob has drifted.
fn wander_heading(mob: &Mob, rng: &mut impl Rng) -> Vec3 {
    let home = mob.anchor.sub(&mob.position);
    if home.magnitude_xz() > mob.stats().leash_radius * 0.5 {
        return home.normalize_xz();
    }
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    Vec3::flat(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::mob::MobType;
    use shared::{ClassId, MapDescriptor};

    fn game() -> GameState {
        let mut map = MapDescriptor::default_map();
        map.mobs.clear();
        GameState::new(&map, SimConfig::default(), 3)
    }

    #[test]
    fn test_aggressive_mob_acquires_nearest() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Wolf, 1, Vec3::flat(170.0, 170.0));
        g.add_player(Player::new(1, ClassId::Fighter, Vec3::flat(175.0, 170.0)));
        g.add_player(Player::new(2, ClassId::Fighter, Vec3::flat(178.0, 170.0)));
        g.tick(50);
        let m = g.mobs.get(mob).unwrap();
        assert_eq!(m.state, AiState::Chase);
        assert_eq!(m.target, Some(1));
    }

    #[test]
    fn test_passive_mob_ignores_players() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Slime, 1, Vec3::flat(170.0, 170.0));
        g.add_player(Player::new(1, ClassId::Fighter, Vec3::flat(172.0, 170.0)));
        g.tick(50);
        assert_eq!(g.mobs.get(mob).unwrap().target, None);
    }

    #[test]
    fn test_stunned_mob_does_nothing() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Wolf, 1, Vec3::flat(170.0, 170.0));
        g.mobs.get_mut(mob).unwrap().status.try_stun(0, 1_000, 1_000);
        g.add_player(Player::new(1, ClassId::Fighter, Vec3::flat(171.0, 170.0)));
        g.tick(50);
        assert_eq!(g.mobs.get(mob).unwrap().target, None);
        assert_eq!(g.players.get(1).unwrap().hp, g.players.get(1).unwrap().stats.max_hp);
    }

    #[test]
    fn test_mob_attacks_in_range() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Wolf, 1, Vec3::flat(170.0, 170.0));
        g.add_player(Player::new(1, ClassId::Mage, Vec3::flat(171.5, 170.0)));
        g.tick(50);
        let p = g.players.get(1).unwrap();
        assert!(p.hp < p.stats.max_hp);
        assert!(p.in_combat(g.now));
        assert!(g.mobs.get(mob).unwrap().attack_ready_at > g.now);
    }

    #[test]
    fn test_leash_drops_target_and_suppresses_aggro() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Wolf, 1, Vec3::flat(150.0, 100.0));
        g.add_player(Player::new(1, ClassId::Fighter, Vec3::flat(180.0, 100.0)));
        {
            let m = g.mobs.get_mut(mob).unwrap();
            m.target = Some(1);
            m.state = AiState::Chase;
        }
        g.tick(50);
        let m = g.mobs.get(mob).unwrap();
        assert_eq!(m.target, None);
        assert_eq!(m.state, AiState::Wander);
        assert!(m.aggro_suppressed_until > g.now);
    }

    #[test]
    fn test_taunt_overrides_target() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Wolf, 1, Vec3::flat(170.0, 170.0));
        g.add_player(Player::new(1, ClassId::Mage, Vec3::flat(171.0, 170.0)));
        g.add_player(Player::new(2, ClassId::Guardian, Vec3::flat(175.0, 170.0)));
        {
            let m = g.mobs.get_mut(mob).unwrap();
            m.target = Some(1);
            m.state = AiState::Chase;
            m.status.taunt = Some((2, 4_000));
        }
        g.tick(50);
        assert_eq!(g.mobs.get(mob).unwrap().target, Some(2));
    }

    #[test]
    fn test_dead_mob_respawns_near_anchor() {
        let mut g = game();
        let mob = g.spawn_mob(MobType::Slime, 1, Vec3::flat(170.0, 170.0));
        g.mobs.get_mut(mob).unwrap().kill(0);
        let respawn_at = g.mobs.get(mob).unwrap().respawn_at;
        g.now = respawn_at - 50;
        g.tick(49);
        assert!(g.mobs.get(mob).unwrap().is_dead());
        g.tick(1);
        let m = g.mobs.get(mob).unwrap();
        assert!(!m.is_dead());
        assert_eq!(m.hp, m.max_hp);
        assert!(m.position.distance_xz(&m.anchor) <= 2.0 * std::f32::consts::SQRT_2 + 1e-3);
    }
}
