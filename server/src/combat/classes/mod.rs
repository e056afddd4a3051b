//! Per-class ability effects. Preconditions, cost and cooldowns have
//! already been handled by the time a handler runs.

mod fighter;
mod guardian;
mod mage;
mod priest;
mod ranger;

use super::{CastContext, CastOutcome};
use crate::game::GameState;
use shared::ClassId;

pub(super) fn execute(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    match ctx.ability.class {
        ClassId::Fighter => fighter::execute(game, ctx),
        ClassId::Guardian => guardian::execute(game, ctx),
        ClassId::Ranger => ranger::execute(game, ctx),
        ClassId::Mage => mage::execute(game, ctx),
        ClassId::Priest => priest::execute(game, ctx),
    }
}

/// Strikes every target with the ability's magnitude.
fn strike_all(game: &mut GameState, ctx: &CastContext, targets: Vec<shared::TargetRef>) -> CastOutcome {
    let raw = ctx.magnitude();
    let mut outcome = CastOutcome::default();
    for target in targets {
        outcome.record(game.strike(ctx, target, raw));
    }
    outcome
}
