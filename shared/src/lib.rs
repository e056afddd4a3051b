//! Types shared between the simulation server and its clients: geometry,
//! the pure movement step, the map descriptor and the wire protocol.

pub mod map;
pub mod math;
pub mod movement;
pub mod protocol;

pub use map::{MapDescriptor, MapError};
pub use math::{angle_between_xz, Vec3};
pub use movement::{resolve_collisions, step, KeyState, MoveIntent, Obstacle, Step, WorldBounds};
pub use protocol::*;

pub const PLAYER_RADIUS: f32 = 0.5;
pub const MOB_RADIUS: f32 = 0.6;
pub const PLAYER_SPEED: f32 = 6.0;
pub const INVENTORY_SLOTS: usize = 20;
pub const EQUIPMENT_SLOTS: usize = 6;
pub const ABILITY_SLOTS: usize = 4;
pub const MAX_LEVEL: u32 = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_slot_count_matches_enum() {
        assert_eq!(EquipSlot::ALL.len(), EQUIPMENT_SLOTS);
    }

    #[test]
    fn test_player_fits_between_default_obstacles() {
        let map = MapDescriptor::default_map();
        for spawn in &map.spawn_points {
            let p = Vec3::flat(spawn.x, spawn.z);
            assert!(map
                .obstacle_list()
                .iter()
                .all(|o| !o.overlaps(&p, PLAYER_RADIUS)));
        }
    }
}
