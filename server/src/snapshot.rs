//! Public world snapshots (deltas with periodic full resyncs) and the
//! per-connection private state push.

use crate::game::GameState;
use crate::player::Player;
use crate::progression::xp_to_next;
use crate::utils::floor_u32;
use shared::{
    CooldownView, CorpseId, CorpseView, MobId, MobView, NodeId, PlayerId, PlayerView, PrivateState,
    ResourceView, WorldSnapshot,
};
use std::collections::HashMap;
use std::hash::Hash;

/// Remembers what was last broadcast so the next snapshot only carries
/// entities whose view changed.
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    players: HashMap<PlayerId, PlayerView>,
    mobs: HashMap<MobId, MobView>,
    resources: HashMap<NodeId, ResourceView>,
    corpses: HashMap<CorpseId, CorpseView>,
    sent: u64,
    full_every: u64,
}

impl SnapshotTracker {
    pub fn new(full_every: u64) -> Self {
        Self {
            full_every: full_every.max(1),
            ..Self::default()
        }
    }

    /// Builds the next broadcast snapshot. The first snapshot and every
    /// `full_every`-th after it is a full resync.
    pub fn next(&mut self, game: &GameState) -> WorldSnapshot {
        let full = self.sent % self.full_every == 0;
        self.sent += 1;

        let players: Vec<PlayerView> = game
            .players
            .iter()
            .map(|p| p.view(game.parties.party_of(p.id)))
            .collect();
        let mobs: Vec<MobView> = game.mobs.iter().map(|m| m.view()).collect();
        let resources: Vec<ResourceView> = game.nodes.iter().map(|n| n.view()).collect();
        let corpses: Vec<CorpseView> = game.corpses.iter().map(|c| c.view()).collect();

        let (players, removed_players) = diff(&mut self.players, players, |v| v.id, full);
        let (mobs, _) = diff(&mut self.mobs, mobs, |v| v.id, full);
        let (resources, _) = diff(&mut self.resources, resources, |v| v.id, full);
        let (corpses, removed_corpses) = diff(&mut self.corpses, corpses, |v| v.id, full);

        WorldSnapshot {
            tick: game.tick,
            time_ms: game.now,
            full,
            players,
            mobs,
            resources,
            corpses,
            removed_players,
            removed_corpses,
        }
    }

    pub fn snapshots_sent(&self) -> u64 {
        self.sent
    }
}

/// Full view of the world that leaves the tracker untouched, for a
/// connection that just joined.
pub fn full_snapshot(game: &GameState) -> WorldSnapshot {
    WorldSnapshot {
        tick: game.tick,
        time_ms: game.now,
        full: true,
        players: game
            .players
            .iter()
            .map(|p| p.view(game.parties.party_of(p.id)))
            .collect(),
        mobs: game.mobs.iter().map(|m| m.view()).collect(),
        resources: game.nodes.iter().map(|n| n.view()).collect(),
        corpses: game.corpses.iter().map(|c| c.view()).collect(),
        removed_players: Vec::new(),
        removed_corpses: Vec::new(),
    }
}

/// Replaces `cache` with `current` and returns the changed entries plus the
/// ids that disappeared. On a full resync every entry is returned.
fn diff<K, V>(cache: &mut HashMap<K, V>, current: Vec<V>, key: impl Fn(&V) -> K, full: bool) -> (Vec<V>, Vec<K>)
where
    K: Copy + Eq + Hash + Ord,
    V: Clone + PartialEq,
{
    let mut next = HashMap::with_capacity(current.len());
    let mut changed = Vec::new();
    for view in current {
        let id = key(&view);
        if full || cache.get(&id) != Some(&view) {
            changed.push(view.clone());
        }
        next.insert(id, view);
    }
    let mut removed: Vec<K> = cache.keys().filter(|k| !next.contains_key(*k)).copied().collect();
    removed.sort_unstable();
    *cache = next;
    (changed, removed)
}

/// State only the owning connection sees.
pub fn private_state(player: &Player, now: u64) -> PrivateState {
    let cooldowns = player
        .cooldowns
        .iter()
        .enumerate()
        .filter(|(_, ready_at)| **ready_at > now)
        .map(|(i, ready_at)| CooldownView {
            slot: i as u8 + 1,
            remaining_ms: ready_at - now,
        })
        .collect();
    PrivateState {
        level: player.level,
        xp: player.xp,
        xp_to_next: xp_to_next(player.level),
        currency: player.currency,
        resource_kind: player.resource_kind(),
        resource: floor_u32(player.resource),
        resource_max: floor_u32(player.resource_max()),
        inventory: player.inventory.slots().to_vec(),
        equipment: player.equipment.clone(),
        cooldowns,
        global_cooldown_ms: player.gcd_until.saturating_sub(now),
        stats: player.stats,
    }
}
