use super::strike_all;
use crate::combat::abilities::{AbilityId, Shape};
use crate::combat::{CastContext, CastOutcome};
use crate::game::GameState;
use crate::status::Combatant;

const MARK_VULNERABILITY: f32 = 0.15;

pub(super) fn execute(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    match ctx.ability.id {
        AbilityId::QuickShot | AbilityId::AimedShot => {
            let targets = ctx.target.into_iter().collect();
            strike_all(game, ctx, targets)
        }
        AbilityId::Volley => {
            let (Some(at), Shape::Placement { radius }) = (ctx.placement, ctx.ability.shape) else {
                return CastOutcome::default();
            };
            let targets = game.enemies_in_radius(ctx.caster, at, radius);
            strike_all(game, ctx, targets)
        }
        AbilityId::HuntersMark => {
            if let Some(target) = ctx.target {
                let (now, duration) = (ctx.now, ctx.ability.duration_ms);
                if let Some(c) = game.combatant_mut(target).filter(|c| c.is_alive()) {
                    c.status_mut().apply_vulnerability(now, MARK_VULNERABILITY, duration);
                }
            }
            CastOutcome::default()
        }
        _ => CastOutcome::default(),
    }
}
