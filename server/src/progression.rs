//! XP curve, kill rewards and level-up.

use crate::game::{GameEvent, GameState};
use crate::player::Player;
use log::{debug, info};
use rand::Rng;
use shared::{MobId, PlayerId, MAX_LEVEL};
use std::collections::BTreeSet;

/// XP needed to go from `level` to `level + 1`. Zero at the cap.
pub fn xp_to_next(level: u32) -> u64 {
    if level >= MAX_LEVEL {
        return 0;
    }
    let l = level.max(1) as u64;
    50 * l * l + 50
}

pub fn base_xp(mob_level: u32) -> f32 {
    20.0 + 10.0 * mob_level as f32
}

/// Scales XP by how far the mob's level is from the killer's.
pub fn level_diff_multiplier(mob_level: u32, killer_level: u32) -> f32 {
    if (mob_level as i64) < killer_level as i64 - 10 {
        return 0.0;
    }
    let diff = mob_level as f32 - killer_level as f32;
    (1.0 + 0.1 * diff).clamp(0.25, 1.75)
}

/// XP one recipient earns for a kill.
pub fn kill_xp(mob_level: u32, type_multiplier: f32, recipient_level: u32) -> u64 {
    let raw = base_xp(mob_level) * type_multiplier * level_diff_multiplier(mob_level, recipient_level);
    if raw.is_finite() && raw > 0.0 {
        raw.floor() as u64
    } else {
        0
    }
}

/// Adds XP and applies every level-up it pays for. Returns levels gained.
///
/// At the cap XP is discarded, so a max-level player always holds zero.
pub fn add_xp(player: &mut Player, amount: u64) -> u32 {
    if player.level >= MAX_LEVEL {
        player.level = MAX_LEVEL;
        player.xp = 0;
        return 0;
    }
    player.xp = player.xp.saturating_add(amount);
    let mut gained = 0;
    while player.level < MAX_LEVEL {
        let need = xp_to_next(player.level);
        if player.xp < need {
            break;
        }
        player.xp -= need;
        player.level += 1;
        gained += 1;
    }
    if player.level >= MAX_LEVEL {
        player.xp = 0;
    }
    if gained > 0 {
        player.recompute_stats();
        player.hp = player.stats.max_hp;
        player.resource = player.resource_max();
    }
    if amount > 0 {
        player.dirty = true;
    }
    gained
}

impl GameState {
    /// Marks the mob dead and pays out XP, currency and loot.
    ///
    /// Every ledger contributor earns XP, as do living party members of a
    /// contributor within the share radius of the corpse. Each recipient's
    /// XP uses their own level. Currency and the loot roll go to the top
    /// contributor.
    pub(crate) fn resolve_mob_death(&mut self, mob_id: MobId, killer: Option<PlayerId>) {
        let now = self.now;
        let Some(mob) = self.mobs.get_mut(mob_id) else {
            return;
        };
        let ledger = std::mem::take(&mut mob.ledger);
        mob.kill(now);
        let (level, mob_type, position) = (mob.level, mob.mob_type, mob.position);
        let stats = mob_type.stats();

        let mut contributors: BTreeSet<PlayerId> = ledger.keys().copied().collect();
        contributors.extend(killer);
        let radius = self.config.party_share_radius;
        let mut recipients = BTreeSet::new();
        for contributor in &contributors {
            for member in self.parties.group_of(*contributor) {
                let eligible = self.players.get(member).map_or(false, |p| {
                    member == *contributor || (p.alive && p.position.distance_xz(&position) <= radius)
                });
                if eligible {
                    recipients.insert(member);
                }
            }
        }

        for id in &recipients {
            let Some(player) = self.players.get_mut(*id) else {
                continue;
            };
            let amount = kill_xp(level, stats.xp_multiplier, player.level);
            let gained = add_xp(player, amount);
            debug!("Player {} earned {} xp from {} L{}", id, amount, mob_type.name(), level);
            if gained > 0 {
                let new_level = player.level;
                info!("Player {} reached level {}", id, new_level);
                self.events.push(GameEvent::LevelUp {
                    player: *id,
                    level: new_level,
                });
            }
        }

        let top = ledger
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(id, _)| *id)
            .or(killer);
        if let Some(top) = top {
            let coins = stats.coin_per_level.saturating_mul(level as u64);
            let drop = stats
                .loot
                .filter(|(_, chance)| self.rng.gen::<f32>() < *chance)
                .map(|(item, _)| item);
            if let Some(p) = self.players.get_mut(top) {
                p.currency = p.currency.saturating_add(coins);
                p.dirty = true;
                if let Some(item) = drop {
                    if p.inventory.add(item, 1).is_err() {
                        debug!("Player {} had no room for {}", top, item);
                    }
                }
            }
        }

        self.events.push(GameEvent::MobKilled {
            mob: mob_id,
            killer,
            recipients: recipients.into_iter().collect(),
        });
    }
}
