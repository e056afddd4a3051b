//! Timed status effects, periodic damage/healing and damage mitigation.
//!
//! Every timed effect is an explicit `(value, expires_at)` pair that is
//! compared against the current simulation time at each read site. Nothing
//! sweeps expired effects; an expired effect simply reads as absent.

use crate::utils::floor_u32;
use shared::{PlayerId, TargetRef, Vec3};

/// A magnitude that applies until `expires_at` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timed {
    pub value: f32,
    pub expires_at: u64,
}

impl Timed {
    pub fn new(value: f32, now: u64, duration_ms: u64) -> Self {
        Self {
            value,
            expires_at: now.saturating_add(duration_ms),
        }
    }

    pub fn is_active(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

fn active(effect: &Option<Timed>, now: u64) -> Option<f32> {
    effect.filter(|t| t.is_active(now)).map(|t| t.value)
}

/// Damage or healing applied every `interval_ms` for `remaining_ticks`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Periodic {
    pub amount: u32,
    pub remaining_ticks: u32,
    pub interval_ms: u64,
    pub next_tick_at: u64,
    pub source: Option<TargetRef>,
}

impl Periodic {
    pub fn new(amount: u32, ticks: u32, interval_ms: u64, now: u64, source: Option<TargetRef>) -> Self {
        Self {
            amount,
            remaining_ticks: ticks,
            interval_ms,
            next_tick_at: now.saturating_add(interval_ms),
            source,
        }
    }
}

/// Applies at most one due tick of a periodic effect and returns its amount
/// and source. The effect, source included, is cleared once no ticks remain.
pub fn tick_periodic(effect: &mut Option<Periodic>, now: u64) -> Option<(u32, Option<TargetRef>)> {
    let p = effect.as_mut()?;
    if p.remaining_ticks == 0 {
        *effect = None;
        return None;
    }
    if p.next_tick_at > now {
        return None;
    }
    let result = (p.amount, p.source);
    p.remaining_ticks -= 1;
    p.next_tick_at = p.next_tick_at.saturating_add(p.interval_ms);
    if p.remaining_ticks == 0 {
        *effect = None;
    }
    Some(result)
}

/// The full set of statuses an actor can carry. Shared by players and mobs;
/// mobs ignore silence and players ignore taunt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSet {
    pub stun_until: u64,
    /// Set by each successful stun; blocks new stuns from any source.
    pub stun_immune_until: u64,
    pub root_until: u64,
    pub silence_until: u64,
    /// Fractional movement slow, e.g. 0.3 for -30%.
    pub slow: Option<Timed>,
    /// Fractional reduction of outgoing damage.
    pub weaken: Option<Timed>,
    /// Fractional increase of incoming damage (marks).
    pub vulnerability: Option<Timed>,
    /// Remaining absorb points.
    pub absorb: Option<Timed>,
    pub dot: Option<Periodic>,
    pub hot: Option<Periodic>,
    pub taunt: Option<(PlayerId, u64)>,
}

impl StatusSet {
    pub fn is_stunned(&self, now: u64) -> bool {
        now < self.stun_until
    }

    pub fn is_rooted(&self, now: u64) -> bool {
        now < self.root_until
    }

    pub fn is_silenced(&self, now: u64) -> bool {
        now < self.silence_until
    }

    pub fn speed_multiplier(&self, now: u64) -> f32 {
        if self.is_rooted(now) || self.is_stunned(now) {
            return 0.0;
        }
        1.0 - active(&self.slow, now).unwrap_or(0.0).clamp(0.0, 1.0)
    }

    pub fn weaken_multiplier(&self, now: u64) -> f32 {
        1.0 - active(&self.weaken, now).unwrap_or(0.0).clamp(0.0, 1.0)
    }

    pub fn damage_taken_multiplier(&self, now: u64) -> f32 {
        1.0 + active(&self.vulnerability, now).unwrap_or(0.0).max(0.0)
    }

    /// Applies a stun unless the previous stun's immunity window is still
    /// running. Returns whether the stun landed; a rejected stun does not
    /// touch the existing stun end time.
    pub fn try_stun(&mut self, now: u64, duration_ms: u64, immunity_ms: u64) -> bool {
        if now < self.stun_immune_until {
            return false;
        }
        self.stun_until = now.saturating_add(duration_ms);
        self.stun_immune_until = now.saturating_add(immunity_ms.max(duration_ms));
        true
    }

    pub fn apply_root(&mut self, now: u64, duration_ms: u64) {
        self.root_until = self.root_until.max(now.saturating_add(duration_ms));
    }

    pub fn apply_silence(&mut self, now: u64, duration_ms: u64) {
        self.silence_until = self.silence_until.max(now.saturating_add(duration_ms));
    }

    pub fn apply_slow(&mut self, now: u64, fraction: f32, duration_ms: u64) {
        self.slow = Some(Timed::new(fraction, now, duration_ms));
    }

    pub fn apply_weaken(&mut self, now: u64, fraction: f32, duration_ms: u64) {
        self.weaken = Some(Timed::new(fraction, now, duration_ms));
    }

    pub fn apply_vulnerability(&mut self, now: u64, fraction: f32, duration_ms: u64) {
        self.vulnerability = Some(Timed::new(fraction, now, duration_ms));
    }

    pub fn apply_absorb(&mut self, now: u64, amount: f32, duration_ms: u64) {
        self.absorb = Some(Timed::new(amount, now, duration_ms));
    }

    /// Lets an active shield soak up to `damage` points; returns what is
    /// left over for hp.
    pub fn consume_absorb(&mut self, now: u64, damage: u32) -> u32 {
        let Some(shield) = self.absorb.as_mut().filter(|s| s.is_active(now)) else {
            self.absorb = None;
            return damage;
        };
        let soaked = (shield.value.max(0.0).floor() as u32).min(damage);
        shield.value -= soaked as f32;
        if shield.value < 1.0 {
            self.absorb = None;
        }
        damage - soaked
    }

    pub fn taunted_by(&self, now: u64) -> Option<PlayerId> {
        self.taunt.filter(|(_, until)| now < *until).map(|(p, _)| p)
    }

    pub fn clear(&mut self) {
        *self = StatusSet::default();
    }
}

/// Physical mitigation: `floor(raw * 100 / (100 + defense))`.
pub fn mitigate(raw: f32, defense: f32) -> u32 {
    let defense = defense.max(0.0);
    floor_u32(raw * 100.0 / (100.0 + defense))
}

/// Anything that can be hit, healed or disabled.
pub trait Combatant {
    fn position(&self) -> Vec3;
    fn is_alive(&self) -> bool;
    fn hp(&self) -> u32;
    fn max_hp(&self) -> u32;
    fn set_hp(&mut self, hp: u32);
    fn defense(&self) -> f32;
    fn evasion(&self) -> f32;
    fn status(&self) -> &StatusSet;
    fn status_mut(&mut self) -> &mut StatusSet;

    fn damage_taken_multiplier(&self, now: u64) -> f32 {
        self.status().damage_taken_multiplier(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Hp actually removed.
    pub dealt: u32,
    pub absorbed: u32,
    pub killed: bool,
}

/// Runs `raw` through the target's damage-taken multiplier, mitigation and
/// absorb shield, then removes hp. Hp never goes below zero.
pub fn apply_damage<C: Combatant + ?Sized>(target: &mut C, raw: f32, now: u64) -> DamageOutcome {
    if !target.is_alive() || !(raw > 0.0) {
        return DamageOutcome::default();
    }
    let scaled = raw * target.damage_taken_multiplier(now);
    let mitigated = mitigate(scaled, target.defense());
    apply_unmitigated(target, mitigated, now)
}

/// Like [`apply_damage`] but for amounts already final (fixed-damage hits).
pub fn apply_unmitigated<C: Combatant + ?Sized>(target: &mut C, amount: u32, now: u64) -> DamageOutcome {
    if !target.is_alive() || amount == 0 {
        return DamageOutcome::default();
    }
    let remaining = target.status_mut().consume_absorb(now, amount);
    let before = target.hp();
    let after = before.saturating_sub(remaining);
    target.set_hp(after);
    DamageOutcome {
        dealt: before - after,
        absorbed: amount - remaining,
        killed: before > 0 && after == 0,
    }
}

/// Restores hp up to max; returns the amount actually restored.
pub fn apply_heal<C: Combatant + ?Sized>(target: &mut C, amount: u32) -> u32 {
    if !target.is_alive() {
        return 0;
    }
    let before = target.hp();
    let after = before.saturating_add(amount).min(target.max_hp());
    target.set_hp(after);
    after.saturating_sub(before)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        hp: u32,
        max_hp: u32,
        defense: f32,
        status: StatusSet,
    }

    impl Dummy {
        fn new(hp: u32, defense: f32) -> Self {
            Self {
                hp,
                max_hp: hp,
                defense,
                status: StatusSet::default(),
            }
        }
    }

    impl Combatant for Dummy {
        fn position(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn is_alive(&self) -> bool {
            self.hp > 0
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
            self.defense
        }
        fn evasion(&self) -> f32 {
            0.0
        }
        fn status(&self) -> &StatusSet {
            &self.status
        }
        fn status_mut(&mut self) -> &mut StatusSet {
            &mut self.status
        }
    }

    #[test]
    fn test_mitigation_formula() {
        assert_eq!(mitigate(10.0, 0.0), 10);
        assert_eq!(mitigate(10.0, 100.0), 5);
        assert_eq!(mitigate(7.0, 25.0), 5);
        assert_eq!(mitigate(-3.0, 0.0), 0);
    }

    #[test]
    fn test_expired_effects_read_as_absent() {
        let mut s = StatusSet::default();
        s.apply_slow(1_000, 0.5, 2_000);
        assert_eq!(s.speed_multiplier(1_500), 0.5);
        assert_eq!(s.speed_multiplier(3_000), 1.0);
        s.apply_weaken(0, 0.25, 100);
        assert_eq!(s.weaken_multiplier(50), 0.75);
        assert_eq!(s.weaken_multiplier(100), 1.0);
    }

    #[test]
    fn test_stun_immunity_blocks_second_stun() {
        let mut s = StatusSet::default();
        assert!(s.try_stun(1_000, 2_000, 6_000));
        assert_eq!(s.stun_until, 3_000);
        assert!(!s.try_stun(2_000, 2_000, 6_000));
        assert_eq!(s.stun_until, 3_000);
        assert!(s.try_stun(7_000, 1_000, 5_000));
        assert_eq!(s.stun_until, 8_000);
    }

    #[test]
    fn test_root_and_stun_zero_speed() {
        let mut s = StatusSet::default();
        s.apply_root(0, 500);
        assert_eq!(s.speed_multiplier(100), 0.0);
        assert_eq!(s.speed_multiplier(500), 1.0);
    }

    #[test]
    fn test_absorb_consumes_before_hp() {
        let mut d = Dummy::new(50, 0.0);
        d.status.apply_absorb(0, 8.0, 10_000);
        let out = apply_damage(&mut d, 5.0, 10);
        assert_eq!(out.dealt, 0);
        assert_eq!(out.absorbed, 5);
        assert_eq!(d.hp, 50);
        let out = apply_damage(&mut d, 10.0, 20);
        assert_eq!(out.absorbed, 3);
        assert_eq!(out.dealt, 7);
        assert_eq!(d.hp, 43);
        assert!(d.status.absorb.is_none());
    }

    #[test]
    fn test_expired_absorb_does_nothing() {
        let mut d = Dummy::new(50, 0.0);
        d.status.apply_absorb(0, 100.0, 1_000);
        let out = apply_damage(&mut d, 10.0, 1_000);
        assert_eq!(out.dealt, 10);
    }

    #[test]
    fn test_damage_never_underflows() {
        let mut d = Dummy::new(5, 0.0);
        let out = apply_damage(&mut d, 500.0, 0);
        assert_eq!(d.hp, 0);
        assert!(out.killed);
        assert_eq!(out.dealt, 5);
        // already dead: no further effect
        assert_eq!(apply_damage(&mut d, 10.0, 0), DamageOutcome::default());
    }

    #[test]
    fn test_vulnerability_increases_damage() {
        let mut d = Dummy::new(100, 0.0);
        d.status.apply_vulnerability(0, 0.5, 1_000);
        apply_damage(&mut d, 10.0, 0);
        assert_eq!(d.hp, 85);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut d = Dummy::new(100, 0.0);
        d.hp = 95;
        assert_eq!(apply_heal(&mut d, 20), 5);
        assert_eq!(d.hp, 100);
    }

    #[test]
    fn test_periodic_ticks_then_clears_source() {
        let src = Some(TargetRef::Player(7));
        let mut dot = Some(Periodic::new(4, 2, 1_000, 0, src));
        assert_eq!(tick_periodic(&mut dot, 500), None);
        assert_eq!(tick_periodic(&mut dot, 1_000), Some((4, src)));
        assert_eq!(dot.unwrap().remaining_ticks, 1);
        // one tick per call even when several are overdue
        assert_eq!(tick_periodic(&mut dot, 5_000), Some((4, src)));
        assert!(dot.is_none());
        assert_eq!(tick_periodic(&mut dot, 6_000), None);
    }

    #[test]
    fn test_taunt_expires() {
        let mut s = StatusSet::default();
        s.taunt = Some((3, 4_000));
        assert_eq!(s.taunted_by(3_999), Some(3));
        assert_eq!(s.taunted_by(4_000), None);
    }
}
