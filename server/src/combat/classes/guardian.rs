use crate::combat::abilities::{AbilityId, Shape};
use crate::combat::{CastContext, CastOutcome};
use crate::game::GameState;
use crate::mob::AiState;
use crate::player::Stance;
use crate::status::Combatant;
use shared::TargetRef;

const SLAM_STUN_MS: u64 = 2_000;
const SLAM_STUN_IMMUNITY_MS: u64 = 6_000;
const SLAM_KNOCKBACK: f32 = 2.0;

const STANCE_DAMAGE_TAKEN: f32 = 0.6;
const STANCE_SPEED: f32 = 0.7;
const STANCE_DRAIN_PER_SEC: f32 = 4.0;

const THUNDERCLAP_WEAKEN: f32 = 0.25;
const THUNDERCLAP_WEAKEN_MS: u64 = 6_000;
const THUNDERCLAP_SLOW: f32 = 0.3;
const THUNDERCLAP_SLOW_MS: u64 = 4_000;

pub(super) fn execute(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    match ctx.ability.id {
        AbilityId::ShieldSlam => shield_slam(game, ctx),
        AbilityId::Taunt => {
            if let Some(TargetRef::Mob(id)) = ctx.target {
                if let Some(mob) = game.mobs.get_mut(id) {
                    mob.status.taunt = Some((ctx.caster, ctx.now.saturating_add(ctx.ability.duration_ms)));
                    mob.target = Some(ctx.caster);
                    mob.state = AiState::Chase;
                }
            }
            CastOutcome::default()
        }
        AbilityId::DefensiveStance => {
            if let Some(p) = game.players.get_mut(ctx.caster) {
                p.stance = Some(Stance {
                    damage_taken: STANCE_DAMAGE_TAKEN,
                    speed: STANCE_SPEED,
                    drain_per_sec: STANCE_DRAIN_PER_SEC,
                    expires_at: ctx.now.saturating_add(ctx.ability.duration_ms),
                });
            }
            CastOutcome::default()
        }
        AbilityId::Thunderclap => thunderclap(game, ctx),
        _ => CastOutcome::default(),
    }
}

/// Damage and knockback always land on a hit; only the stun is subject to
/// immunity.
fn shield_slam(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    let Some(target) = ctx.target else {
        return CastOutcome::default();
    };
    let mut outcome = CastOutcome::default();
    let hit = game.strike(ctx, target, ctx.magnitude());
    if hit.map_or(false, |h| !h.killed) {
        game.try_stun(target, SLAM_STUN_MS, SLAM_STUN_IMMUNITY_MS);
        game.knockback(target, ctx.origin, SLAM_KNOCKBACK);
    }
    outcome.record(hit);
    outcome
}

fn thunderclap(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    let Shape::Nova { radius } = ctx.ability.shape else {
        return CastOutcome::default();
    };
    let targets = game.enemies_in_radius(ctx.caster, ctx.origin, radius);
    let raw = ctx.magnitude();
    let mut outcome = CastOutcome::default();
    for target in targets {
        let hit = game.strike(ctx, target, raw);
        if hit.is_some() {
            let now = ctx.now;
            if let Some(c) = game.combatant_mut(target).filter(|c| c.is_alive()) {
                let status = c.status_mut();
                status.apply_weaken(now, THUNDERCLAP_WEAKEN, THUNDERCLAP_WEAKEN_MS);
                status.apply_slow(now, THUNDERCLAP_SLOW, THUNDERCLAP_SLOW_MS);
            }
        }
        outcome.record(hit);
    }
    outcome
}
