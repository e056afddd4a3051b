use super::strike_all;
use crate::combat::abilities::{AbilityId, Shape};
use crate::combat::{CastContext, CastOutcome};
use crate::game::GameState;
use crate::status::{Combatant, Periodic};
use shared::TargetRef;

const BURN_DAMAGE: u32 = 4;
const BURN_TICKS: u32 = 3;
const BURN_INTERVAL_MS: u64 = 1_000;

pub(super) fn execute(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    match ctx.ability.id {
        AbilityId::Fireball => fireball(game, ctx),
        AbilityId::FrostNova => frost_nova(game, ctx),
        AbilityId::Blink => {
            game.dash(ctx.caster, ctx.facing, ctx.ability.range);
            CastOutcome::default()
        }
        AbilityId::ArcaneBarrier => {
            let amount = ctx.magnitude();
            if let Some(p) = game.players.get_mut(ctx.caster) {
                p.status.apply_absorb(ctx.now, amount, ctx.ability.duration_ms);
            }
            CastOutcome::default()
        }
        _ => CastOutcome::default(),
    }
}

/// Direct hit plus a short burn credited to the caster.
fn fireball(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    let Some(target) = ctx.target else {
        return CastOutcome::default();
    };
    let mut outcome = CastOutcome::default();
    let hit = game.strike(ctx, target, ctx.magnitude());
    if hit.is_some() {
        let burn = Periodic::new(
            BURN_DAMAGE,
            BURN_TICKS,
            BURN_INTERVAL_MS,
            ctx.now,
            Some(TargetRef::Player(ctx.caster)),
        );
        if let Some(c) = game.combatant_mut(target).filter(|c| c.is_alive()) {
            c.status_mut().dot = Some(burn);
        }
    }
    outcome.record(hit);
    outcome
}

fn frost_nova(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    let Shape::Nova { radius } = ctx.ability.shape else {
        return CastOutcome::default();
    };
    let targets = game.enemies_in_radius(ctx.caster, ctx.origin, radius);
    let outcome = strike_all(game, ctx, targets.clone());
    let (now, duration) = (ctx.now, ctx.ability.duration_ms);
    for target in targets {
        if let Some(c) = game.combatant_mut(target).filter(|c| c.is_alive()) {
            c.status_mut().apply_root(now, duration);
        }
    }
    outcome
}
