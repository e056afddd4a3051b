//! Mob records and the static per-type stat table.

use crate::status::{Combatant, StatusSet};
use crate::store::Keyed;
use crate::utils::floor_u32;
use log::warn;
use shared::{AiStateTag, MobId, MobView, PlayerId, Vec3};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MobType {
    Slime,
    Wolf,
    Bandit,
    Ogre,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobStats {
    pub base_hp: u32,
    pub hp_per_level: u32,
    pub base_damage: f32,
    pub damage_per_level: f32,
    pub defense: f32,
    pub evasion: f32,
    pub attack_range: f32,
    pub attack_cooldown_ms: u64,
    pub speed: f32,
    pub wander_speed: f32,
    pub aggro_radius: f32,
    /// Max distance from the anchor before a chase is abandoned.
    pub leash_radius: f32,
    pub xp_multiplier: f32,
    pub respawn_ms: u64,
    pub aggressive: bool,
    /// Material dropped to the top contributor, with its chance.
    pub loot: Option<(&'static str, f32)>,
    /// Currency granted per mob level.
    pub coin_per_level: u64,
}

static SLIME: MobStats = MobStats {
    base_hp: 20,
    hp_per_level: 8,
    base_damage: 3.0,
    damage_per_level: 1.0,
    defense: 0.0,
    evasion: 0.0,
    attack_range: 1.8,
    attack_cooldown_ms: 1_500,
    speed: 2.5,
    wander_speed: 1.2,
    aggro_radius: 6.0,
    leash_radius: 18.0,
    xp_multiplier: 1.0,
    respawn_ms: 10_000,
    aggressive: false,
    loot: None,
    coin_per_level: 1,
};

static WOLF: MobStats = MobStats {
    base_hp: 30,
    hp_per_level: 10,
    base_damage: 5.0,
    damage_per_level: 1.5,
    defense: 5.0,
    evasion: 5.0,
    attack_range: 2.0,
    attack_cooldown_ms: 1_200,
    speed: 5.0,
    wander_speed: 2.0,
    aggro_radius: 10.0,
    leash_radius: 25.0,
    xp_multiplier: 1.2,
    respawn_ms: 15_000,
    aggressive: true,
    loot: Some(("leather", 0.5)),
    coin_per_level: 2,
};

static BANDIT: MobStats = MobStats {
    base_hp: 45,
    hp_per_level: 12,
    base_damage: 7.0,
    damage_per_level: 2.0,
    defense: 15.0,
    evasion: 8.0,
    attack_range: 2.2,
    attack_cooldown_ms: 1_400,
    speed: 4.5,
    wander_speed: 1.5,
    aggro_radius: 9.0,
    leash_radius: 22.0,
    xp_multiplier: 1.4,
    respawn_ms: 20_000,
    aggressive: true,
    loot: Some(("ore", 0.3)),
    coin_per_level: 4,
};

static OGRE: MobStats = MobStats {
    base_hp: 120,
    hp_per_level: 25,
    base_damage: 14.0,
    damage_per_level: 3.0,
    defense: 30.0,
    evasion: 0.0,
    attack_range: 2.8,
    attack_cooldown_ms: 2_200,
    speed: 3.5,
    wander_speed: 1.0,
    aggro_radius: 8.0,
    leash_radius: 20.0,
    xp_multiplier: 2.0,
    respawn_ms: 45_000,
    aggressive: true,
    loot: None,
    coin_per_level: 8,
};

impl MobType {
    pub fn parse(name: &str) -> Option<MobType> {
        match name {
            "slime" => Some(MobType::Slime),
            "wolf" => Some(MobType::Wolf),
            "bandit" => Some(MobType::Bandit),
            "ogre" => Some(MobType::Ogre),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MobType::Slime => "slime",
            MobType::Wolf => "wolf",
            MobType::Bandit => "bandit",
            MobType::Ogre => "ogre",
        }
    }

    pub fn stats(&self) -> &'static MobStats {
        match self {
            MobType::Slime => &SLIME,
            MobType::Wolf => &WOLF,
            MobType::Bandit => &BANDIT,
            MobType::Ogre => &OGRE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Idle,
    Wander,
    Chase,
    Dead,
}

impl AiState {
    pub fn tag(&self) -> AiStateTag {
        match self {
            AiState::Idle => AiStateTag::Idle,
            AiState::Wander => AiStateTag::Wander,
            AiState::Chase => AiStateTag::Chase,
            AiState::Dead => AiStateTag::Dead,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mob {
    pub id: MobId,
    pub position: Vec3,
    pub anchor: Vec3,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub mob_type: MobType,
    pub state: AiState,
    pub target: Option<PlayerId>,
    pub heading: Vec3,
    pub next_decision_at: u64,
    pub attack_ready_at: u64,
    pub respawn_at: u64,
    pub status: StatusSet,
    /// Cumulative damage per player over this life.
    pub ledger: BTreeMap<PlayerId, u32>,
    pub aggressive: bool,
    /// After a leash reset the mob ignores proximity aggro until this time.
    pub aggro_suppressed_until: u64,
}

impl Keyed for Mob {
    type Id = MobId;

    fn key(&self) -> MobId {
        self.id
    }
}

pub fn max_hp_for(mob_type: MobType, level: u32) -> u32 {
    let s = mob_type.stats();
    s.base_hp.saturating_add(s.hp_per_level.saturating_mul(level))
}

impl Mob {
    pub fn new(id: MobId, mob_type: MobType, level: u32, anchor: Vec3, aggressive: Option<bool>) -> Self {
        let level = level.max(1);
        let max_hp = max_hp_for(mob_type, level);
        Self {
            id,
            position: anchor,
            anchor,
            level,
            hp: max_hp,
            max_hp,
            mob_type,
            state: AiState::Idle,
            target: None,
            heading: Vec3::ZERO,
            next_decision_at: 0,
            attack_ready_at: 0,
            respawn_at: 0,
            status: StatusSet::default(),
            ledger: BTreeMap::new(),
            aggressive: aggressive.unwrap_or(mob_type.stats().aggressive),
            aggro_suppressed_until: 0,
        }
    }

    pub fn stats(&self) -> &'static MobStats {
        self.mob_type.stats()
    }

    pub fn is_dead(&self) -> bool {
        self.state == AiState::Dead
    }

    /// Raw melee damage before the target's modifiers.
    pub fn raw_attack(&self, now: u64) -> f32 {
        let s = self.stats();
        (s.base_damage + s.damage_per_level * self.level as f32) * self.status.weaken_multiplier(now)
    }

    pub fn record_damage(&mut self, player: PlayerId, amount: u32) {
        if amount > 0 {
            let entry = self.ledger.entry(player).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Flags the mob dead; loot and XP are resolved by the caller.
    pub fn kill(&mut self, now: u64) {
        self.state = AiState::Dead;
        self.hp = 0;
        self.target = None;
        self.respawn_at = now.saturating_add(self.stats().respawn_ms);
        self.status.clear();
    }

    /// Back to full health at `position`, with every timer and the ledger reset.
    pub fn respawn(&mut self, position: Vec3, now: u64) {
        self.position = position;
        self.hp = self.max_hp;
        self.state = AiState::Idle;
        self.target = None;
        self.status.clear();
        self.ledger.clear();
        self.attack_ready_at = now;
        self.next_decision_at = now;
        self.aggro_suppressed_until = 0;
    }

    pub fn sanitize(&mut self) -> bool {
        let mut repaired = false;
        if !self.position.is_finite() {
            warn!("Mob {} had non-finite position, resetting to anchor", self.id);
            self.position = self.anchor;
            repaired = true;
        }
        if !self.heading.is_finite() {
            self.heading = Vec3::ZERO;
            repaired = true;
        }
        if self.hp > self.max_hp {
            warn!("Mob {} hp {} above max {}", self.id, self.hp, self.max_hp);
            self.hp = self.max_hp;
            repaired = true;
        }
        if !self.is_dead() && self.hp == 0 {
            warn!("Mob {} alive with zero hp", self.id);
            repaired = true;
        }
        repaired
    }

    pub fn view(&self) -> MobView {
        MobView {
            id: self.id,
            position: self.position,
            mob_type: self.mob_type.name().to_string(),
            level: self.level,
            hp: self.hp,
            max_hp: self.max_hp,
            state: self.state.tag(),
            target: self.target,
        }
    }

    /// Hp fraction, for logs.
    pub fn health_pct(&self) -> u32 {
        floor_u32(self.hp as f32 * 100.0 / self.max_hp.max(1) as f32)
    }
}

impl Combatant for Mob {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_alive(&self) -> bool {
        !self.is_dead() && self.hp > 0
    }

    fn hp(&self) -> u32 {
        self.hp
    }

    fn max_hp(&self) -> u32 {
        self.max_hp
    }

    fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.max_hp);
    }

    fn defense(&self) -> f32 {
        self.stats().defense
    }

    fn evasion(&self) -> f32 {
        self.stats().evasion
    }

    fn status(&self) -> &StatusSet {
        &self.status
    }

    fn status_mut(&mut self) -> &mut StatusSet {
        &mut self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_parse_types() {
        for t in [MobType::Slime, MobType::Wolf, MobType::Bandit, MobType::Ogre] {
            assert_eq!(MobType::parse(t.name()), Some(t));
        }
        assert_eq!(MobType::parse("dragon"), None);
    }

    #[test]
    fn test_hp_scales_with_level() {
        assert_eq!(max_hp_for(MobType::Slime, 1), 28);
        assert_eq!(max_hp_for(MobType::Ogre, 10), 370);
        let m = Mob::new(1, MobType::Wolf, 0, Vec3::ZERO, None);
        assert_eq!(m.level, 1);
        assert_eq!(m.hp, 40);
        assert!(m.aggressive);
    }

    #[test]
    fn test_aggressive_override() {
        let m = Mob::new(1, MobType::Wolf, 2, Vec3::ZERO, Some(false));
        assert!(!m.aggressive);
    }

    #[test]
    fn test_kill_and_respawn_reset() {
        let mut m = Mob::new(1, MobType::Bandit, 3, Vec3::flat(10.0, 10.0), None);
        m.record_damage(7, 12);
        m.status.apply_root(0, 10_000);
        m.kill(1_000);
        assert!(m.is_dead());
        assert_eq!(m.respawn_at, 21_000);
        assert!(!m.is_alive());
        m.respawn(Vec3::flat(11.0, 10.0), 21_000);
        assert_eq!(m.state, AiState::Idle);
        assert_eq!(m.hp, m.max_hp);
        assert!(m.ledger.is_empty());
        assert!(!m.status.is_rooted(21_000));
    }

    #[test]
    fn test_weaken_lowers_attack() {
        let mut m = Mob::new(1, MobType::Slime, 2, Vec3::ZERO, None);
        assert_approx_eq!(m.raw_attack(0), 5.0);
        m.status.apply_weaken(0, 0.2, 1_000);
        assert_approx_eq!(m.raw_attack(10), 4.0, 1e-5);
    }
}
