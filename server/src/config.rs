//! Server and simulation tunables.

use shared::MapDescriptor;
use std::time::Duration;

/// Gameplay constants that are not part of the static ability/mob tables.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Delay before a dead player may respawn.
    pub player_respawn_ms: u64,
    /// How long an actor counts as "in combat" after dealing or taking damage.
    pub combat_window_ms: u64,
    pub global_cooldown_ms: u64,
    pub rage_decay_per_sec: f32,
    pub rage_on_hit_taken: f32,
    pub rage_on_basic_hit: f32,
    pub energy_regen_per_sec: f32,
    /// Fraction of max hp regenerated per second while out of combat.
    pub out_of_combat_regen: f32,
    pub corpse_lifetime_ms: u64,
    pub node_respawn_ms: u64,
    pub interact_range: f32,
    pub pvp_multiplier: f32,
    /// Party members of a kill contributor within this distance share XP.
    pub party_share_radius: f32,
    pub max_party_size: usize,
    /// Every Nth public snapshot is a full resync.
    pub full_resync_every: u64,
    pub crit_multiplier: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            player_respawn_ms: 5_000,
            combat_window_ms: 6_000,
            global_cooldown_ms: 1_000,
            rage_decay_per_sec: 5.0,
            rage_on_hit_taken: 2.0,
            rage_on_basic_hit: 5.0,
            energy_regen_per_sec: 12.0,
            out_of_combat_regen: 0.02,
            corpse_lifetime_ms: 300_000,
            node_respawn_ms: 30_000,
            interact_range: 3.0,
            pvp_multiplier: 0.6,
            party_share_radius: 40.0,
            max_party_size: 5,
            full_resync_every: 50,
            crit_multiplier: 1.5,
        }
    }
}

/// Everything the network loop needs to run a world.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_duration: Duration,
    /// Public snapshots are broadcast every this many ticks.
    pub snapshot_every: u64,
    pub persist_interval: Duration,
    pub client_timeout: Duration,
    pub max_clients: usize,
    pub seed: u64,
    pub map: MapDescriptor,
    pub sim: SimConfig,
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<String>, tick_rate: u32) -> Self {
        let tick_rate = tick_rate.clamp(1, 240);
        Self {
            bind_addr: bind_addr.into(),
            tick_duration: Duration::from_secs_f64(1.0 / tick_rate as f64),
            snapshot_every: 3,
            persist_interval: Duration::from_secs(30),
            client_timeout: Duration::from_secs(10),
            max_clients: 64,
            seed: 0x5eed,
            map: MapDescriptor::default_map(),
            sim: SimConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_rate_is_clamped() {
        let cfg = ServerConfig::new("127.0.0.1:0", 0);
        assert_eq!(cfg.tick_duration, Duration::from_secs(1));
        let cfg = ServerConfig::new("127.0.0.1:0", 20);
        assert_eq!(cfg.tick_duration.as_millis(), 50);
    }

    #[test]
    fn test_defaults_are_sane() {
        let sim = SimConfig::default();
        assert!(sim.pvp_multiplier > 0.0 && sim.pvp_multiplier <= 1.0);
        assert!(sim.combat_window_ms > sim.global_cooldown_ms);
        assert!(sim.full_resync_every > 0);
    }
}
