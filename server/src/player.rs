//! Live player records and per-class base data.

use crate::combat::PendingCast;
use crate::items::{item_def, Inventory, StatBonus};
use crate::status::{Combatant, StatusSet};
use crate::store::Keyed;
use crate::utils::floor_u32;
use log::warn;
use shared::{
    ClassId, DerivedStats, MoveIntent, PartyId, PlayerId, PlayerView, ResourceKind, TargetRef,
    Vec3, ABILITY_SLOTS, EQUIPMENT_SLOTS, INVENTORY_SLOTS, MAX_LEVEL,
};

/// The five primary attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes {
    pub strength: f32,
    pub agility: f32,
    pub intellect: f32,
    pub stamina: f32,
    pub defense: f32,
}

impl Attributes {
    const fn new(strength: f32, agility: f32, intellect: f32, stamina: f32, defense: f32) -> Self {
        Self {
            strength,
            agility,
            intellect,
            stamina,
            defense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicAttack {
    pub range: f32,
    pub damage: u32,
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProfile {
    pub resource: ResourceKind,
    pub base: Attributes,
    /// Added once per level above 1.
    pub growth: Attributes,
    pub basic: BasicAttack,
}

static FIGHTER: ClassProfile = ClassProfile {
    resource: ResourceKind::Rage,
    base: Attributes::new(12.0, 8.0, 4.0, 12.0, 10.0),
    growth: Attributes::new(2.0, 1.0, 0.5, 2.0, 1.0),
    basic: BasicAttack { range: 2.5, damage: 6, cooldown_ms: 1_000 },
};

static GUARDIAN: ClassProfile = ClassProfile {
    resource: ResourceKind::Rage,
    base: Attributes::new(10.0, 6.0, 4.0, 15.0, 16.0),
    growth: Attributes::new(1.5, 0.5, 0.5, 2.5, 2.0),
    basic: BasicAttack { range: 2.5, damage: 5, cooldown_ms: 1_100 },
};

static RANGER: ClassProfile = ClassProfile {
    resource: ResourceKind::Energy,
    base: Attributes::new(7.0, 14.0, 5.0, 10.0, 6.0),
    growth: Attributes::new(1.0, 2.0, 0.5, 1.5, 0.8),
    basic: BasicAttack { range: 14.0, damage: 5, cooldown_ms: 1_200 },
};

static MAGE: ClassProfile = ClassProfile {
    resource: ResourceKind::Mana,
    base: Attributes::new(4.0, 6.0, 15.0, 8.0, 4.0),
    growth: Attributes::new(0.5, 0.8, 2.5, 1.0, 0.5),
    basic: BasicAttack { range: 12.0, damage: 4, cooldown_ms: 1_400 },
};

static PRIEST: ClassProfile = ClassProfile {
    resource: ResourceKind::Mana,
    base: Attributes::new(5.0, 6.0, 13.0, 10.0, 5.0),
    growth: Attributes::new(0.5, 0.8, 2.0, 1.5, 0.6),
    basic: BasicAttack { range: 10.0, damage: 4, cooldown_ms: 1_400 },
};

pub fn class_profile(class: ClassId) -> &'static ClassProfile {
    match class {
        ClassId::Fighter => &FIGHTER,
        ClassId::Guardian => &GUARDIAN,
        ClassId::Ranger => &RANGER,
        ClassId::Mage => &MAGE,
        ClassId::Priest => &PRIEST,
    }
}

/// Class base + level growth + equipped item bonuses.
pub fn derive_stats(class: ClassId, level: u32, equipment: &[Option<String>]) -> DerivedStats {
    let profile = class_profile(class);
    let growth_levels = level.clamp(1, MAX_LEVEL).saturating_sub(1) as f32;
    let mut bonus = StatBonus::default();
    for def in equipment.iter().flatten().filter_map(|name| item_def(name)) {
        bonus.strength += def.bonus.strength;
        bonus.agility += def.bonus.agility;
        bonus.intellect += def.bonus.intellect;
        bonus.stamina += def.bonus.stamina;
        bonus.defense += def.bonus.defense;
    }
    let attr = |base: f32, growth: f32, extra: f32| base + growth * growth_levels + extra;
    let strength = attr(profile.base.strength, profile.growth.strength, bonus.strength);
    let agility = attr(profile.base.agility, profile.growth.agility, bonus.agility);
    let intellect = attr(profile.base.intellect, profile.growth.intellect, bonus.intellect);
    let stamina = attr(profile.base.stamina, profile.growth.stamina, bonus.stamina);
    let defense = attr(profile.base.defense, profile.growth.defense, bonus.defense);
    DerivedStats {
        strength,
        agility,
        intellect,
        stamina,
        defense,
        max_hp: floor_u32(40.0 + 8.0 * stamina).max(1),
        accuracy: 10.0 + agility,
        evasion: agility / 2.0,
        crit_chance: 0.05 + 0.002 * agility,
    }
}

pub fn resource_max_for(kind: ResourceKind, stats: &DerivedStats) -> f32 {
    match kind {
        ResourceKind::Rage | ResourceKind::Energy => 100.0,
        ResourceKind::Mana => (60.0 + 4.0 * stats.intellect).floor(),
    }
}

/// Resource-funded damage reduction that also slows the holder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stance {
    pub damage_taken: f32,
    pub speed: f32,
    pub drain_per_sec: f32,
    pub expires_at: u64,
}

impl Stance {
    pub fn is_active(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub position: Vec3,
    /// Unit ground-plane direction of last movement; cones and blink use it.
    pub facing: Vec3,
    pub alive: bool,
    pub respawn_at: u64,
    pub hp: u32,
    pub class: ClassId,
    pub level: u32,
    pub xp: u64,
    pub resource: f32,
    pub equipment: Vec<Option<String>>,
    pub inventory: Inventory,
    pub currency: u64,
    pub movement: MoveIntent,
    pub target: Option<TargetRef>,
    /// Ready-at timestamps for ability slots 1..=4.
    pub cooldowns: [u64; ABILITY_SLOTS],
    pub gcd_until: u64,
    pub basic_ready_at: u64,
    pub status: StatusSet,
    pub stance: Option<Stance>,
    pub casting: Option<PendingCast>,
    pub in_combat_until: u64,
    /// Fractional out-of-combat hp regen not yet applied.
    pub regen_carry: f32,
    pub dirty: bool,
    pub stats: DerivedStats,
}

impl Keyed for Player {
    type Id = PlayerId;

    fn key(&self) -> PlayerId {
        self.id
    }
}

impl Player {
    /// A fresh level 1 character.
    pub fn new(id: PlayerId, class: ClassId, position: Vec3) -> Self {
        let equipment = vec![None; EQUIPMENT_SLOTS];
        let stats = derive_stats(class, 1, &equipment);
        let mut player = Self {
            id,
            position,
            facing: Vec3::flat(1.0, 0.0),
            alive: true,
            respawn_at: 0,
            hp: stats.max_hp,
            class,
            level: 1,
            xp: 0,
            resource: 0.0,
            equipment,
            inventory: Inventory::new(INVENTORY_SLOTS),
            currency: 0,
            movement: MoveIntent::default(),
            target: None,
            cooldowns: [0; ABILITY_SLOTS],
            gcd_until: 0,
            basic_ready_at: 0,
            status: StatusSet::default(),
            stance: None,
            casting: None,
            in_combat_until: 0,
            regen_carry: 0.0,
            dirty: true,
            stats,
        };
        player.resource = player.starting_resource();
        player
    }

    pub fn profile(&self) -> &'static ClassProfile {
        class_profile(self.class)
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.profile().resource
    }

    pub fn resource_max(&self) -> f32 {
        resource_max_for(self.resource_kind(), &self.stats)
    }

    /// Rage starts empty; everything else starts full.
    pub fn starting_resource(&self) -> f32 {
        match self.resource_kind() {
            ResourceKind::Rage => 0.0,
            _ => self.resource_max(),
        }
    }

    /// Recomputes derived stats after a level, class or equipment change
    /// and re-clamps hp and resource.
    pub fn recompute_stats(&mut self) {
        self.stats = derive_stats(self.class, self.level, &self.equipment);
        self.hp = self.hp.min(self.stats.max_hp);
        self.resource = self.resource.clamp(0.0, self.resource_max());
    }

    pub fn gain_resource(&mut self, amount: f32) {
        if amount.is_finite() {
            self.resource = (self.resource + amount).clamp(0.0, self.resource_max());
        }
    }

    /// Spends `amount` if available; nothing changes otherwise.
    pub fn try_spend(&mut self, amount: f32) -> bool {
        if amount <= 0.0 {
            return true;
        }
        if self.resource + f32::EPSILON < amount {
            return false;
        }
        self.resource = (self.resource - amount).max(0.0);
        true
    }

    pub fn in_combat(&self, now: u64) -> bool {
        now < self.in_combat_until
    }

    pub fn mark_in_combat(&mut self, now: u64, window_ms: u64) {
        self.in_combat_until = self.in_combat_until.max(now.saturating_add(window_ms));
    }

    pub fn active_stance(&self, now: u64) -> Option<&Stance> {
        self.stance.as_ref().filter(|s| s.is_active(now))
    }

    pub fn speed(&self, now: u64) -> f32 {
        let stance = self.active_stance(now).map_or(1.0, |s| s.speed);
        shared::PLAYER_SPEED * self.status.speed_multiplier(now) * stance
    }

    /// Basic-attack damage including the equipped weapon.
    pub fn basic_damage(&self) -> u32 {
        let weapon = self.equipment[0]
            .as_deref()
            .and_then(item_def)
            .map_or(0, |d| d.bonus.weapon_damage);
        self.profile().basic.damage + weapon
    }

    /// Clears combat state and marks the player dead.
    pub fn kill(&mut self, now: u64, respawn_delay_ms: u64) {
        self.alive = false;
        self.hp = 0;
        self.respawn_at = now.saturating_add(respawn_delay_ms);
        self.casting = None;
        self.stance = None;
        self.movement = MoveIntent::default();
        self.target = None;
        self.status.clear();
        self.dirty = true;
    }

    pub fn revive(&mut self, position: Vec3) {
        self.alive = true;
        self.position = position;
        self.hp = self.stats.max_hp;
        self.resource = self.starting_resource();
        self.status.clear();
        self.in_combat_until = 0;
        self.dirty = true;
    }

    /// Switches class, resetting resource, cooldowns and stance.
    pub fn set_class(&mut self, class: ClassId) {
        self.class = class;
        self.cooldowns = [0; ABILITY_SLOTS];
        self.gcd_until = 0;
        self.basic_ready_at = 0;
        self.stance = None;
        self.casting = None;
        self.recompute_stats();
        self.resource = self.starting_resource();
        self.dirty = true;
    }

    /// Repairs a record whose numbers have gone bad. Returns true if
    /// anything had to be fixed.
    pub fn sanitize(&mut self, fallback: Vec3) -> bool {
        let mut repaired = false;
        if !self.position.is_finite() {
            warn!("Player {} had non-finite position, resetting", self.id);
            self.position = fallback;
            self.movement = MoveIntent::default();
            repaired = true;
        }
        if !self.facing.is_finite() || self.facing.magnitude_xz() < 1e-3 {
            self.facing = Vec3::flat(1.0, 0.0);
        }
        if self.hp > self.stats.max_hp {
            warn!("Player {} hp {} above max {}", self.id, self.hp, self.stats.max_hp);
            self.hp = self.stats.max_hp;
            repaired = true;
        }
        if self.alive && self.hp == 0 {
            warn!("Player {} alive with zero hp", self.id);
            repaired = true;
        }
        let max = self.resource_max();
        if !self.resource.is_finite() || self.resource < 0.0 || self.resource > max {
            warn!("Player {} resource {} out of range", self.id, self.resource);
            self.resource = if self.resource.is_finite() {
                self.resource.clamp(0.0, max)
            } else {
                0.0
            };
            repaired = true;
        }
        repaired
    }

    pub fn view(&self, party: Option<PartyId>) -> PlayerView {
        PlayerView {
            id: self.id,
            position: self.position,
            facing: self.facing,
            class: self.class,
            level: self.level,
            hp: self.hp,
            max_hp: self.stats.max_hp,
            alive: self.alive,
            resource: floor_u32(self.resource),
            resource_max: floor_u32(self.resource_max()),
            target: self.target,
            casting: self.casting.as_ref().map(|c| c.slot),
            party,
        }
    }
}

impl Combatant for Player {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_alive(&self) -> bool {
        self.alive && self.hp > 0
    }

    fn hp(&self) -> u32 {
        self.hp
    }

    fn max_hp(&self) -> u32 {
        self.stats.max_hp
    }

    fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.stats.max_hp);
        self.dirty = true;
    }

    fn defense(&self) -> f32 {
        self.stats.defense
    }

    fn evasion(&self) -> f32 {
        self.stats.evasion
    }

    fn status(&self) -> &StatusSet {
        &self.status
    }

    fn status_mut(&mut self) -> &mut StatusSet {
        &mut self.status
    }

    fn damage_taken_multiplier(&self, now: u64) -> f32 {
        let stance = self.active_stance(now).map_or(1.0, |s| s.damage_taken);
        self.status.damage_taken_multiplier(now) * stance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::apply_damage;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_level_one_stats() {
        let s = derive_stats(ClassId::Fighter, 1, &[]);
        assert_eq!(s.max_hp, 136);
        assert_approx_eq!(s.accuracy, 18.0);
        assert_approx_eq!(s.evasion, 4.0);
        assert_approx_eq!(s.crit_chance, 0.066, 1e-6);
    }

    #[test]
    fn test_growth_and_equipment() {
        let base = derive_stats(ClassId::Mage, 3, &[]);
        assert_approx_eq!(base.intellect, 20.0);
        let staff = vec![Some("oak_staff".to_string())];
        let geared = derive_stats(ClassId::Mage, 3, &staff);
        assert_approx_eq!(geared.intellect, 24.0);
        assert_approx_eq!(resource_max_for(ResourceKind::Mana, &geared), 156.0);
    }

    #[test]
    fn test_new_player_resources() {
        let fighter = Player::new(1, ClassId::Fighter, Vec3::ZERO);
        assert_eq!(fighter.resource, 0.0);
        assert_eq!(fighter.hp, fighter.stats.max_hp);
        let mage = Player::new(2, ClassId::Mage, Vec3::ZERO);
        assert_eq!(mage.resource, mage.resource_max());
    }

    #[test]
    fn test_spend_and_gain_clamp() {
        let mut p = Player::new(1, ClassId::Ranger, Vec3::ZERO);
        assert!(p.try_spend(30.0));
        assert_approx_eq!(p.resource, 70.0);
        assert!(!p.try_spend(80.0));
        assert_approx_eq!(p.resource, 70.0);
        p.gain_resource(500.0);
        assert_eq!(p.resource, 100.0);
        p.gain_resource(f32::NAN);
        assert_eq!(p.resource, 100.0);
    }

    #[test]
    fn test_stance_reduces_damage_until_expiry() {
        let mut p = Player::new(1, ClassId::Guardian, Vec3::ZERO);
        p.stance = Some(Stance {
            damage_taken: 0.5,
            speed: 0.7,
            drain_per_sec: 4.0,
            expires_at: 1_000,
        });
        let before = p.hp;
        let defense = p.stats.defense;
        apply_damage(&mut p, 100.0, 500);
        let expected = crate::status::mitigate(50.0, defense);
        assert_eq!(before - p.hp, expected);
        assert_approx_eq!(p.speed(500), shared::PLAYER_SPEED * 0.7);
        assert_approx_eq!(p.speed(1_000), shared::PLAYER_SPEED);
    }

    #[test]
    fn test_sanitize_repairs_bad_numbers() {
        let mut p = Player::new(1, ClassId::Fighter, Vec3::ZERO);
        p.position = Vec3::new(f32::NAN, 0.0, 1.0);
        p.resource = 1_000.0;
        p.hp = u32::MAX;
        assert!(p.sanitize(Vec3::flat(5.0, 5.0)));
        assert_eq!(p.position, Vec3::flat(5.0, 5.0));
        assert_eq!(p.resource, 100.0);
        assert_eq!(p.hp, p.stats.max_hp);
        assert!(!p.sanitize(Vec3::ZERO));
    }

    #[test]
    fn test_class_switch_resets_state() {
        let mut p = Player::new(1, ClassId::Fighter, Vec3::ZERO);
        p.resource = 50.0;
        p.cooldowns = [9_999; ABILITY_SLOTS];
        p.set_class(ClassId::Mage);
        assert_eq!(p.resource_kind(), ResourceKind::Mana);
        assert_eq!(p.resource, p.resource_max());
        assert_eq!(p.cooldowns, [0; ABILITY_SLOTS]);
        assert!(p.hp <= p.stats.max_hp);
    }
}
