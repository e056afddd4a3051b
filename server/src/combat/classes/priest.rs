use super::strike_all;
use crate::combat::abilities::{AbilityId, Shape};
use crate::combat::{CastContext, CastOutcome};
use crate::game::GameState;
use crate::status::Periodic;
use crate::utils::floor_u32;
use log::debug;
use shared::TargetRef;

const RENEW_TICKS: u32 = 5;
const RENEW_INTERVAL_MS: u64 = 1_000;

pub(super) fn execute(game: &mut GameState, ctx: &CastContext) -> CastOutcome {
    match ctx.ability.id {
        AbilityId::Smite => {
            let targets = ctx.target.into_iter().collect();
            strike_all(game, ctx, targets)
        }
        AbilityId::Heal => {
            if let Some(TargetRef::Player(id)) = ctx.target {
                let healed = game.heal_player(id, ctx.magnitude());
                debug!("Player {} healed {} for {}", ctx.caster, id, healed);
            }
            CastOutcome::default()
        }
        AbilityId::Renew => {
            if let Some(TargetRef::Player(id)) = ctx.target {
                let hot = Periodic::new(
                    floor_u32(ctx.magnitude()),
                    RENEW_TICKS,
                    RENEW_INTERVAL_MS,
                    ctx.now,
                    Some(TargetRef::Player(ctx.caster)),
                );
                if let Some(p) = game.players.get_mut(id).filter(|p| p.alive) {
                    p.status.hot = Some(hot);
                }
            }
            CastOutcome::default()
        }
        AbilityId::Sanctuary => {
            let (Some(at), Shape::Placement { radius }) = (ctx.placement, ctx.ability.shape) else {
                return CastOutcome::default();
            };
            let amount = ctx.magnitude();
            for ally in game.allies_in_radius(ctx.caster, at, radius) {
                game.heal_player(ally, amount);
            }
            CastOutcome::default()
        }
        _ => CastOutcome::default(),
    }
}
