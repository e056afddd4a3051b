use super::strike_all;
use crate::combat::abilities::{AbilityId, Shape};
use crate::combat::{CastContext, CastOutcome};
use crate::game::GameState;
use crate::status::Combatant;

const PUMMEL_SILENCE_MS: u64 = 3_000;
const CHARGE_STOP_SHORT: f32 = 1.5;
const CHARGE_STUN_MS: u64 = 1_000;
const CHARGE_STUN_IMMUNITY_MS: u64 = 5_000;
const CHARGE_RAGE: f32 = 15.0;

pub(super) fn execute(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    match ctx.ability.id {
        AbilityId::Cleave => {
            let Shape::Cone { angle_deg } = ctx.ability.shape else {
                return CastOutcome::default();
            };
            let targets = game.enemies_in_cone(ctx.caster, ctx.origin, ctx.facing, ctx.ability.range, angle_deg);
            strike_all(game, ctx, targets)
        }
        AbilityId::Pummel => pummel(game, ctx),
        AbilityId::Charge => charge(game, ctx),
        AbilityId::Whirlwind => {
            let Shape::Nova { radius } = ctx.ability.shape else {
                return CastOutcome::default();
            };
            let targets = game.enemies_in_radius(ctx.caster, ctx.origin, radius);
            strike_all(game, ctx, targets)
        }
        _ => CastOutcome::default(),
    }
}

/// Hits and silences; a silenced caster loses any channel in progress.
fn pummel(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    let Some(target) = ctx.target else {
        return CastOutcome::default();
    };
    let mut outcome = CastOutcome::default();
    let hit = game.strike(ctx, target, ctx.magnitude());
    if hit.is_some() {
        let now = ctx.now;
        if let Some(c) = game.combatant_mut(target).filter(|c| c.is_alive()) {
            c.status_mut().apply_silence(now, PUMMEL_SILENCE_MS);
        }
    }
    outcome.record(hit);
    outcome
}

/// Dashes to the target, then hits and briefly stuns it.
fn charge(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    let Some(target) = ctx.target else {
        return CastOutcome::default();
    };
    let Some(to) = game.target_position(target) else {
        return CastOutcome::default();
    };
    let offset = to.sub(&ctx.origin);
    let distance = (offset.magnitude_xz() - CHARGE_STOP_SHORT).max(0.0);
    game.dash(ctx.caster, offset, distance);
    if let Some(p) = game.players.get_mut(ctx.caster) {
        p.gain_resource(CHARGE_RAGE);
    }

    let mut outcome = CastOutcome::default();
    let hit = game.strike(ctx, target, ctx.magnitude());
    if hit.is_some() {
        game.try_stun(target, CHARGE_STUN_MS, CHARGE_STUN_IMMUNITY_MS);
    }
    outcome.record(hit);
    outcome
}
