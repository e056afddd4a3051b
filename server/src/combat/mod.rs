//! Combat resolution: basic attacks, ability preconditions, channelled
//! casts, hit/crit rolls and damage routing to players and mobs.
//!
//! Ability effects live in one handler module per class; this module owns
//! everything that is common to all of them.

pub mod abilities;
mod classes;

use crate::error::ActionError;
use crate::game::{GameEvent, GameState};
use crate::player::Player;
use crate::status::{apply_damage, apply_heal, apply_unmitigated, Combatant, DamageOutcome};
use crate::utils::floor_u32;
use abilities::{ability, ability_for, Ability, AbilityId, Scaling, Targeting};
use log::debug;
use rand::Rng;
use shared::{
    angle_between_xz, DerivedStats, EffectShape, MobId, PlayerId, ResourceKind, TargetRef, Vec3,
    VisualEvent, MOB_RADIUS, PLAYER_RADIUS,
};

/// How far a caster may drift during a channel before it is interrupted.
const CAST_MOVE_TOLERANCE: f32 = 0.01;

/// A channelled ability waiting for its cast time to elapse. Nothing is
/// spent until it completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCast {
    pub ability: AbilityId,
    pub slot: u8,
    pub target: Option<TargetRef>,
    pub placement: Option<Vec3>,
    pub origin: Vec3,
    pub completes_at: u64,
}

/// Everything a handler needs about the cast, captured when it resolves.
#[derive(Debug, Clone, Copy)]
pub struct CastContext {
    pub caster: PlayerId,
    pub ability: &'static Ability,
    pub origin: Vec3,
    pub facing: Vec3,
    pub stats: DerivedStats,
    /// Caster's outgoing damage multiplier.
    pub weaken: f32,
    pub target: Option<TargetRef>,
    pub placement: Option<Vec3>,
    pub now: u64,
}

impl CastContext {
    fn new(caster: &Player, ability: &'static Ability, target: Option<TargetRef>, placement: Option<Vec3>, now: u64) -> Self {
        Self {
            caster: caster.id,
            ability,
            origin: caster.position,
            facing: caster.facing,
            stats: caster.stats,
            weaken: caster.status.weaken_multiplier(now),
            target,
            placement,
            now,
        }
    }

    /// `floor(base + stat * coefficient)`.
    pub fn magnitude(&self) -> f32 {
        let stat = match self.ability.scaling {
            Scaling::Strength => self.stats.strength,
            Scaling::Agility => self.stats.agility,
            Scaling::Intellect => self.stats.intellect,
        };
        (self.ability.base + stat * self.ability.coefficient).max(0.0).floor()
    }
}

/// Aggregate result of one handler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CastOutcome {
    pub hits: u32,
    pub kills: u32,
}

impl CastOutcome {
    pub fn record(&mut self, strike: Option<DamageOutcome>) {
        if let Some(out) = strike {
            self.hits += 1;
            if out.killed {
                self.kills += 1;
            }
        }
    }
}

impl GameState {
    /// Validates and resolves the ability in `slot`. Rejections leave the
    /// game untouched.
    pub fn use_ability(
        &mut self,
        player_id: PlayerId,
        slot: u8,
        placement: Option<(f32, f32)>,
    ) -> Result<(), ActionError> {
        let now = self.now;
        let player = self.players.get(player_id).ok_or(ActionError::Dead)?;
        if !player.is_alive() {
            return Err(ActionError::Dead);
        }
        let ability = ability_for(player.class, slot).ok_or(ActionError::UnknownAbility)?;
        if player.status.is_stunned(now) {
            return Err(ActionError::Stunned);
        }
        if player.status.is_silenced(now) {
            return Err(ActionError::Silenced);
        }
        if player.casting.is_some() {
            return Err(ActionError::Casting);
        }
        let index = usize::from(slot.saturating_sub(1));
        if player.cooldowns.get(index).map_or(true, |ready| now < *ready) {
            return Err(ActionError::Cooldown);
        }
        if !ability.gcd_exempt && now < player.gcd_until {
            return Err(ActionError::GlobalCooldown);
        }
        if player.resource + f32::EPSILON < ability.cost {
            return Err(ActionError::InsufficientResource);
        }
        let placement = match ability.targeting {
            Targeting::Ground => {
                let (x, z) = placement.ok_or(ActionError::NoPlacement)?;
                let point = Vec3::new(x, player.position.y, z);
                if player.position.distance_xz(&point) > ability.range {
                    return Err(ActionError::OutOfRange);
                }
                Some(point)
            }
            _ => None,
        };
        let target = self.resolve_target(player, ability)?;

        if ability.cast_ms > 0 {
            let origin = player.position;
            if let Some(p) = self.players.get_mut(player_id) {
                p.casting = Some(PendingCast {
                    ability: ability.id,
                    slot,
                    target,
                    placement,
                    origin,
                    completes_at: now.saturating_add(ability.cast_ms),
                });
            }
            debug!("Player {} started casting {}", player_id, ability.name);
            return Ok(());
        }

        let ctx = CastContext::new(player, ability, target, placement, now);
        self.commit(ctx)
    }

    /// Progresses a channel: interrupts it on movement, stun or silence,
    /// completes it once the cast time has elapsed.
    pub(crate) fn advance_cast(&mut self, player_id: PlayerId) {
        let now = self.now;
        let Some(player) = self.players.get(player_id) else {
            return;
        };
        let Some(cast) = player.casting else {
            return;
        };
        let moved = player.position.distance_xz(&cast.origin) > CAST_MOVE_TOLERANCE;
        let interrupted = !player.is_alive()
            || moved
            || player.status.is_stunned(now)
            || player.status.is_silenced(now);
        if interrupted {
            if let Some(p) = self.players.get_mut(player_id) {
                p.casting = None;
            }
            self.reject(player_id, Some(cast.slot), ActionError::Interrupted);
            return;
        }
        if now < cast.completes_at {
            return;
        }

        let ability = ability(cast.ability);
        let checked = match cast.target {
            Some(target) => {
                let mob_only = ability.targeting == Targeting::EnemyMob;
                self.validate_enemy(player, target, ability.range, mob_only).map(Some)
            }
            None => Ok(None),
        };
        let ctx = checked.map(|target| CastContext::new(player, ability, target, cast.placement, now));
        if let Some(p) = self.players.get_mut(player_id) {
            p.casting = None;
        }
        if let Err(e) = ctx.and_then(|ctx| self.commit(ctx)) {
            self.reject(player_id, Some(cast.slot), e);
        }
    }

    /// Spends the cost, starts cooldowns and runs the handler.
    fn commit(&mut self, ctx: CastContext) -> Result<(), ActionError> {
        let ability = ctx.ability;
        let gcd = self.config.global_cooldown_ms;
        let player = self.players.get_mut(ctx.caster).ok_or(ActionError::Dead)?;
        if !player.try_spend(ability.cost) {
            return Err(ActionError::InsufficientResource);
        }
        let index = usize::from(ability.slot.saturating_sub(1));
        if let Some(cd) = player.cooldowns.get_mut(index) {
            *cd = ctx.now.saturating_add(ability.cooldown_ms);
        }
        if !ability.gcd_exempt {
            player.gcd_until = ctx.now.saturating_add(gcd);
        }
        player.dirty = true;

        let outcome = classes::execute(self, &ctx);

        if outcome.kills > 0 && ability.refund_on_kill > 0.0 {
            if let Some(p) = self.players.get_mut(ctx.caster) {
                p.gain_resource(ability.cost * ability.refund_on_kill);
            }
        }
        self.events.push(GameEvent::Visual(VisualEvent {
            attacker: TargetRef::Player(ctx.caster),
            target: ctx.target,
            ability: ability.name.to_string(),
            shape: ability.shape.effect_shape(),
            at: ctx.placement,
            duration_ms: ability.duration_ms,
        }));
        debug!(
            "Player {} used {} ({} hits, {} kills)",
            ctx.caster, ability.name, outcome.hits, outcome.kills
        );
        Ok(())
    }

    fn resolve_target(&self, caster: &Player, ability: &Ability) -> Result<Option<TargetRef>, ActionError> {
        match ability.targeting {
            Targeting::Caster | Targeting::AroundCaster | Targeting::Ground => Ok(None),
            Targeting::Enemy | Targeting::EnemyMob => {
                let target = caster.target.ok_or(ActionError::NoTarget)?;
                let mob_only = ability.targeting == Targeting::EnemyMob;
                self.validate_enemy(caster, target, ability.range, mob_only).map(Some)
            }
            Targeting::Ally => {
                let ally = match caster.target {
                    Some(TargetRef::Player(id)) if id != caster.id && self.parties.same_party(caster.id, id) => {
                        self.players.get(id).filter(|p| p.is_alive())
                    }
                    _ => None,
                };
                match ally {
                    Some(p) if caster.position.distance_xz(&p.position) > ability.range => {
                        Err(ActionError::OutOfRange)
                    }
                    Some(p) => Ok(Some(TargetRef::Player(p.id))),
                    None => Ok(Some(TargetRef::Player(caster.id))),
                }
            }
        }
    }

    /// Checks that `target` exists, is alive, may be attacked by `caster`
    /// and is within `range`.
    pub(crate) fn validate_enemy(
        &self,
        caster: &Player,
        target: TargetRef,
        range: f32,
        mob_only: bool,
    ) -> Result<TargetRef, ActionError> {
        let position = match target {
            TargetRef::Mob(id) => {
                let mob = self.mobs.get(id).ok_or(ActionError::NoTarget)?;
                if !mob.is_alive() {
                    return Err(ActionError::InvalidTarget);
                }
                mob.position
            }
            TargetRef::Player(id) => {
                if mob_only {
                    return Err(ActionError::InvalidTarget);
                }
                let victim = self.players.get(id).ok_or(ActionError::NoTarget)?;
                if !self.can_harm(caster, victim) {
                    return Err(ActionError::InvalidTarget);
                }
                victim.position
            }
        };
        if caster.position.distance_xz(&position) > range {
            return Err(ActionError::OutOfRange);
        }
        Ok(target)
    }

    /// PvP is allowed between non-party players, both outside the base.
    pub(crate) fn can_harm(&self, attacker: &Player, victim: &Player) -> bool {
        attacker.id != victim.id
            && victim.is_alive()
            && !self.parties.same_party(attacker.id, victim.id)
            && !self.world.in_base(&attacker.position)
            && !self.world.in_base(&victim.position)
    }

    /// Auto-attack against the current target with the class weapon.
    pub fn basic_attack(&mut self, player_id: PlayerId) -> Result<DamageOutcome, ActionError> {
        let now = self.now;
        let player = self.players.get(player_id).ok_or(ActionError::Dead)?;
        if !player.is_alive() {
            return Err(ActionError::Dead);
        }
        if player.status.is_stunned(now) {
            return Err(ActionError::Stunned);
        }
        if player.casting.is_some() {
            return Err(ActionError::Casting);
        }
        if now < player.basic_ready_at {
            return Err(ActionError::Cooldown);
        }
        let target = player.target.ok_or(ActionError::NoTarget)?;
        let basic = player.profile().basic;
        self.validate_enemy(player, target, basic.range, false)?;
        let damage = player.basic_damage();
        let is_rage = player.resource_kind() == ResourceKind::Rage;

        let window = self.config.combat_window_ms;
        let rage_gain = self.config.rage_on_basic_hit;
        if let Some(p) = self.players.get_mut(player_id) {
            p.basic_ready_at = now.saturating_add(basic.cooldown_ms);
            p.mark_in_combat(now, window);
            if is_rage {
                p.gain_resource(rage_gain);
            }
        }
        let outcome = match target {
            TargetRef::Mob(id) => self.damage_mob(id, damage as f32, Some(player_id), false),
            TargetRef::Player(id) => {
                let scaled = damage as f32 * self.config.pvp_multiplier;
                self.damage_player(id, scaled, Some(TargetRef::Player(player_id)), false)
            }
        };
        self.events.push(GameEvent::Visual(VisualEvent {
            attacker: TargetRef::Player(player_id),
            target: Some(target),
            ability: "basic".to_string(),
            shape: EffectShape::Basic,
            at: None,
            duration_ms: 200,
        }));
        Ok(outcome)
    }

    /// Rolls hit and crit, then deals `raw` damage. `None` is a miss.
    pub(crate) fn strike(&mut self, ctx: &CastContext, target: TargetRef, raw: f32) -> Option<DamageOutcome> {
        let evasion = self.combatant(target)?.evasion();
        let hit_chance = (0.9 + (ctx.stats.accuracy - evasion) / 100.0).clamp(0.5, 1.0);
        if self.rng.gen::<f32>() >= hit_chance {
            debug!("Player {} missed {:?}", ctx.caster, target);
            return None;
        }
        let mut amount = raw * ctx.weaken;
        if self.rng.gen::<f32>() < ctx.stats.crit_chance {
            amount *= self.config.crit_multiplier;
        }
        let window = self.config.combat_window_ms;
        if let Some(p) = self.players.get_mut(ctx.caster) {
            p.mark_in_combat(ctx.now, window);
        }
        let outcome = match target {
            TargetRef::Mob(id) => self.damage_mob(id, amount, Some(ctx.caster), true),
            TargetRef::Player(id) => {
                let scaled = amount * self.config.pvp_multiplier;
                self.damage_player(id, scaled, Some(TargetRef::Player(ctx.caster)), true)
            }
        };
        Some(outcome)
    }

    /// Damages a mob, credits the attacker's ledger, pulls aggro and
    /// resolves the kill.
    pub(crate) fn damage_mob(
        &mut self,
        id: MobId,
        raw: f32,
        attacker: Option<PlayerId>,
        mitigated: bool,
    ) -> DamageOutcome {
        let now = self.now;
        let Some(mob) = self.mobs.get_mut(id) else {
            return DamageOutcome::default();
        };
        let outcome = if mitigated {
            apply_damage(mob, raw, now)
        } else {
            apply_unmitigated(mob, floor_u32(raw), now)
        };
        if let Some(player) = attacker {
            mob.record_damage(player, outcome.dealt);
            if !outcome.killed && mob.status.taunted_by(now).is_none() && mob.target.is_none() {
                mob.target = Some(player);
                mob.state = crate::mob::AiState::Chase;
            }
        }
        if outcome.killed {
            self.resolve_mob_death(id, attacker);
        }
        outcome
    }

    /// Damages a player, tags combat, generates rage and handles death.
    pub(crate) fn damage_player(
        &mut self,
        id: PlayerId,
        raw: f32,
        source: Option<TargetRef>,
        mitigated: bool,
    ) -> DamageOutcome {
        let now = self.now;
        let window = self.config.combat_window_ms;
        let rage_gain = self.config.rage_on_hit_taken;
        let Some(player) = self.players.get_mut(id) else {
            return DamageOutcome::default();
        };
        let outcome = if mitigated {
            apply_damage(player, raw, now)
        } else {
            apply_unmitigated(player, floor_u32(raw), now)
        };
        if outcome.dealt + outcome.absorbed > 0 {
            player.mark_in_combat(now, window);
            if player.resource_kind() == ResourceKind::Rage {
                player.gain_resource(rage_gain);
            }
        }
        if outcome.killed {
            self.kill_player(id, source);
        }
        outcome
    }

    pub(crate) fn heal_player(&mut self, id: PlayerId, amount: f32) -> u32 {
        match self.players.get_mut(id) {
            Some(p) => apply_heal(p, floor_u32(amount)),
            None => 0,
        }
    }

    pub(crate) fn combatant(&self, target: TargetRef) -> Option<&dyn Combatant> {
        match target {
            TargetRef::Mob(id) => self.mobs.get(id).map(|m| m as &dyn Combatant),
            TargetRef::Player(id) => self.players.get(id).map(|p| p as &dyn Combatant),
        }
    }

    pub(crate) fn combatant_mut(&mut self, target: TargetRef) -> Option<&mut dyn Combatant> {
        match target {
            TargetRef::Mob(id) => self.mobs.get_mut(id).map(|m| m as &mut dyn Combatant),
            TargetRef::Player(id) => self.players.get_mut(id).map(|p| p as &mut dyn Combatant),
        }
    }

    /// Applies a stun subject to the target's immunity window.
    pub(crate) fn try_stun(&mut self, target: TargetRef, duration_ms: u64, immunity_ms: u64) -> bool {
        let now = self.now;
        let landed = self
            .combatant_mut(target)
            .filter(|c| c.is_alive())
            .map_or(false, |c| c.status_mut().try_stun(now, duration_ms, immunity_ms));
        if !landed {
            debug!("Stun on {:?} suppressed by immunity", target);
        }
        landed
    }

    /// Pushes `target` directly away from `from`, stopping at obstacles.
    pub(crate) fn knockback(&mut self, target: TargetRef, from: Vec3, distance: f32) {
        let Some(position) = self.combatant(target).filter(|c| c.is_alive()).map(|c| c.position()) else {
            return;
        };
        let direction = position.sub(&from);
        let radius = match target {
            TargetRef::Mob(_) => MOB_RADIUS,
            TargetRef::Player(_) => PLAYER_RADIUS,
        };
        let landed = self.world.sweep(position, direction, distance, radius);
        match target {
            TargetRef::Mob(id) => {
                if let Some(m) = self.mobs.get_mut(id) {
                    m.position = landed;
                }
            }
            TargetRef::Player(id) => {
                if let Some(p) = self.players.get_mut(id) {
                    p.position = landed;
                    p.movement.target = None;
                }
            }
        }
    }

    /// Moves the caster along `direction`, collision-aware.
    pub(crate) fn dash(&mut self, caster: PlayerId, direction: Vec3, distance: f32) {
        let Some(position) = self.players.get(caster).map(|p| p.position) else {
            return;
        };
        let landed = self.world.sweep(position, direction, distance, PLAYER_RADIUS);
        if let Some(p) = self.players.get_mut(caster) {
            p.position = landed;
            p.movement.target = None;
            if direction.magnitude_xz() > 0.0 {
                p.facing = direction.normalize_xz();
            }
        }
    }

    pub(crate) fn target_position(&self, target: TargetRef) -> Option<Vec3> {
        self.combatant(target).map(|c| c.position())
    }

    /// Living enemies of `caster` within `radius` of `center`.
    pub(crate) fn enemies_in_radius(&self, caster: PlayerId, center: Vec3, radius: f32) -> Vec<TargetRef> {
        self.enemies_where(caster, |p| p.distance_xz(&center) <= radius)
    }

    /// Living enemies within `range` of `origin` whose bearing is within
    /// half of `angle_deg` of `facing`.
    pub(crate) fn enemies_in_cone(
        &self,
        caster: PlayerId,
        origin: Vec3,
        facing: Vec3,
        range: f32,
        angle_deg: f32,
    ) -> Vec<TargetRef> {
        let half = (angle_deg * 0.5).to_radians();
        self.enemies_where(caster, |p| {
            let offset = p.sub(&origin);
            offset.magnitude_xz() <= range && angle_between_xz(&facing, &offset) <= half + 1e-4
        })
    }

    fn enemies_where(&self, caster: PlayerId, inside: impl Fn(&Vec3) -> bool) -> Vec<TargetRef> {
        let mut found: Vec<TargetRef> = self
            .mobs
            .iter()
            .filter(|m| m.is_alive() && inside(&m.position))
            .map(|m| TargetRef::Mob(m.id))
            .collect();
        if let Some(attacker) = self.players.get(caster) {
            found.extend(
                self.players
                    .iter()
                    .filter(|p| inside(&p.position) && self.can_harm(attacker, p))
                    .map(|p| TargetRef::Player(p.id)),
            );
        }
        found
    }

    /// The caster and living party members within `radius` of `center`.
    pub(crate) fn allies_in_radius(&self, caster: PlayerId, center: Vec3, radius: f32) -> Vec<PlayerId> {
        self.parties
            .group_of(caster)
            .into_iter()
            .filter(|id| {
                self.players
                    .get(*id)
                    .map_or(false, |p| p.is_alive() && p.position.distance_xz(&center) <= radius)
            })
            .collect()
    }
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
        GameState::new(&map, SimConfig::default(), 7)
    }

    /// A player standing in open ground outside the base.
    fn fighter(game: &mut GameState, id: PlayerId, x: f32, z: f32) {
        let mut p = Player::new(id, ClassId::Fighter, Vec3::flat(x, z));
        p.resource = 100.0;
        game.add_player(p);
    }

    #[test]
    fn test_unknown_slot_rejected() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        assert_eq!(g.use_ability(1, 9, None), Err(ActionError::UnknownAbility));
    }

    #[test]
    fn test_no_target_rejected_without_mutation() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        assert_eq!(g.use_ability(1, 2, None), Err(ActionError::NoTarget));
        let p = g.players.get(1).unwrap();
        assert_eq!(p.resource, 100.0);
        assert_eq!(p.cooldowns[1], 0);
        assert_eq!(p.gcd_until, 0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        let mob = g.spawn_mob(MobType::Slime, 1, Vec3::flat(180.0, 170.0));
        g.players.get_mut(1).unwrap().target = Some(TargetRef::Mob(mob));
        assert_eq!(g.use_ability(1, 2, None), Err(ActionError::OutOfRange));
    }

    #[test]
    fn test_cooldown_and_gcd() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        let mob = g.spawn_mob(MobType::Ogre, 10, Vec3::flat(172.0, 170.0));
        g.players.get_mut(1).unwrap().target = Some(TargetRef::Mob(mob));
        g.use_ability(1, 2, None).unwrap();
        assert_eq!(g.use_ability(1, 2, None), Err(ActionError::Cooldown));
        assert_eq!(g.use_ability(1, 4, None), Err(ActionError::GlobalCooldown));
        // charge ignores the global cooldown
        assert!(g.use_ability(1, 3, None).is_ok());
    }

    #[test]
    fn test_insufficient_resource() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        g.players.get_mut(1).unwrap().resource = 5.0;
        assert_eq!(g.use_ability(1, 4, None), Err(ActionError::InsufficientResource));
    }

    #[test]
    fn test_placement_required_and_ranged() {
        let mut g = game();
        let mut p = Player::new(1, ClassId::Ranger, Vec3::flat(170.0, 170.0));
        p.resource = 100.0;
        g.add_player(p);
        assert_eq!(g.use_ability(1, 3, None), Err(ActionError::NoPlacement));
        assert_eq!(g.use_ability(1, 3, Some((170.0, 190.0))), Err(ActionError::OutOfRange));
        assert!(g.use_ability(1, 3, Some((170.0, 180.0))).is_ok());
    }

    #[test]
    fn test_basic_attack_fixed_damage_and_rage() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        g.players.get_mut(1).unwrap().resource = 0.0;
        let mob = g.spawn_mob(MobType::Bandit, 3, Vec3::flat(172.0, 170.0));
        g.players.get_mut(1).unwrap().target = Some(TargetRef::Mob(mob));
        let out = g.basic_attack(1).unwrap();
        assert_eq!(out.dealt, 6);
        assert_eq!(g.players.get(1).unwrap().resource, 5.0);
        assert_eq!(g.basic_attack(1), Err(ActionError::Cooldown));
        assert_eq!(g.mobs.get(mob).unwrap().ledger.get(&1), Some(&6));
    }

    #[test]
    fn test_no_pvp_inside_base() {
        let mut g = game();
        fighter(&mut g, 1, 100.0, 100.0);
        fighter(&mut g, 2, 101.0, 100.0);
        g.players.get_mut(1).unwrap().target = Some(TargetRef::Player(2));
        assert_eq!(g.basic_attack(1), Err(ActionError::InvalidTarget));
    }

    #[test]
    fn test_pvp_outside_base_scaled() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        fighter(&mut g, 2, 171.0, 170.0);
        g.players.get_mut(1).unwrap().target = Some(TargetRef::Player(2));
        let before = g.players.get(2).unwrap().hp;
        g.basic_attack(1).unwrap();
        // 6 * 0.6 floors to 3
        assert_eq!(before - g.players.get(2).unwrap().hp, 3);
    }

    #[test]
    fn test_party_members_are_not_enemies() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        fighter(&mut g, 2, 171.0, 170.0);
        g.parties.invite(1, 2).unwrap();
        g.parties.accept(2).unwrap();
        g.players.get_mut(1).unwrap().target = Some(TargetRef::Player(2));
        assert_eq!(g.basic_attack(1), Err(ActionError::InvalidTarget));
        assert!(g.enemies_in_radius(1, Vec3::flat(170.0, 170.0), 5.0).is_empty());
    }

    #[test]
    fn test_refund_on_kill() {
        let mut g = game();
        fighter(&mut g, 1, 170.0, 170.0);
        g.players.get_mut(1).unwrap().resource = 30.0;
        let mob = g.spawn_mob(MobType::Slime, 1, Vec3::flat(172.0, 170.0));
        g.mobs.get_mut(mob).unwrap().hp = 1;
        g.use_ability(1, 4, None).unwrap();
        assert!(g.mobs.get(mob).unwrap().is_dead());
        assert_eq!(g.players.get(1).unwrap().resource, 15.0);
    }
}
