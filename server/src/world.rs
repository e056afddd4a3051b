//! Static world built once from a map descriptor.

use shared::map::{Circle, VendorItem};
use shared::{MapDescriptor, MoveIntent, Obstacle, Step, Vec3, VendorId, WorldBounds};

#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    pub id: VendorId,
    pub position: Vec3,
    /// Items this vendor sells. Empty means buy-only.
    pub catalog: Vec<VendorItem>,
}

impl Vendor {
    pub fn price_of(&self, item: &str) -> Option<u64> {
        self.catalog.iter().find(|c| c.item == item).map(|c| c.price)
    }
}

/// Read-only during simulation.
#[derive(Debug, Clone)]
pub struct World {
    pub bounds: WorldBounds,
    pub obstacles: Vec<Obstacle>,
    pub base: Circle,
    pub spawn_points: Vec<Vec3>,
    pub vendors: Vec<Vendor>,
}

impl World {
    pub fn from_map(map: &MapDescriptor) -> Self {
        let mut spawn_points: Vec<Vec3> = map
            .spawn_points
            .iter()
            .map(|p| Vec3::flat(p.x, p.z))
            .collect();
        if spawn_points.is_empty() {
            spawn_points.push(Vec3::flat(map.base.x, map.base.z));
        }
        Self {
            bounds: map.bounds(),
            obstacles: map.obstacle_list(),
            base: map.base,
            spawn_points,
            vendors: map
                .vendors
                .iter()
                .map(|v| Vendor {
                    id: v.id,
                    position: Vec3::flat(v.x, v.z),
                    catalog: v.catalog.clone().unwrap_or_default(),
                })
                .collect(),
        }
    }

    pub fn in_base(&self, position: &Vec3) -> bool {
        position.distance_xz(&Vec3::flat(self.base.x, self.base.z)) <= self.base.radius
    }

    /// Spawn point for the `n`th arrival, cycling through the list.
    pub fn spawn_point(&self, n: u64) -> Vec3 {
        let i = (n % self.spawn_points.len().max(1) as u64) as usize;
        self.spawn_points
            .get(i)
            .copied()
            .unwrap_or_else(|| Vec3::flat(self.base.x, self.base.z))
    }

    pub fn resolve(&self, position: Vec3, radius: f32) -> Vec3 {
        shared::resolve_collisions(position, radius, &self.bounds, &self.obstacles)
    }

    pub fn step(&self, position: Vec3, intent: &MoveIntent, dt: f32, speed: f32, radius: f32) -> Step {
        shared::step(position, intent, dt, speed, radius, &self.bounds, &self.obstacles)
    }

    pub fn vendor(&self, id: VendorId) -> Option<&Vendor> {
        self.vendors.iter().find(|v| v.id == id)
    }

    /// Moves `distance` along `direction` in sub-steps no longer than half
    /// the actor radius, resolving collisions after each, so a dash cannot
    /// tunnel through an obstacle.
    pub fn sweep(&self, from: Vec3, direction: Vec3, distance: f32, radius: f32) -> Vec3 {
        let dir = direction.normalize_xz();
        if dir == Vec3::ZERO || !(distance > 0.0) {
            return self.resolve(from, radius);
        }
        let max_step = (radius * 0.5).max(0.05);
        let substeps = (distance / max_step).ceil().max(1.0) as u32;
        let step_len = distance / substeps as f32;
        let mut position = from;
        for _ in 0..substeps {
            let next = self.resolve(position.add(&dir.scale(step_len)), radius);
            // blocked: the obstacle pushed us back to where we were
            if next.distance_xz(&position) < step_len * 0.1 {
                return next;
            }
            position = next;
        }
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn world() -> World {
        World::from_map(&MapDescriptor::default_map())
    }

    #[test]
    fn test_base_membership() {
        let w = world();
        assert!(w.in_base(&Vec3::flat(100.0, 100.0)));
        assert!(w.in_base(&Vec3::flat(115.0, 100.0)));
        assert!(!w.in_base(&Vec3::flat(116.0, 100.0)));
    }

    #[test]
    fn test_spawn_points_cycle() {
        let w = world();
        assert_eq!(w.spawn_point(0), w.spawn_point(3));
        assert_ne!(w.spawn_point(0), w.spawn_point(1));
    }

    #[test]
    fn test_vendor_catalog() {
        let w = world();
        let v = w.vendor(1).unwrap();
        assert_eq!(v.price_of("bandage"), Some(5));
        assert_eq!(v.price_of("ogre_tooth"), None);
        assert!(w.vendor(42).is_none());
    }

    #[test]
    fn test_sweep_open_ground() {
        let w = world();
        let end = w.sweep(Vec3::flat(100.0, 100.0), Vec3::flat(1.0, 0.0), 8.0, 0.5);
        assert_approx_eq!(end.x, 108.0, 1e-3);
        assert_approx_eq!(end.z, 100.0, 1e-3);
    }

    #[test]
    fn test_sweep_stops_at_obstacle() {
        let w = world();
        // obstacle at (60, 60) radius 6
        let end = w.sweep(Vec3::flat(45.0, 60.0), Vec3::flat(1.0, 0.0), 30.0, 0.5);
        assert!(end.x < 60.0);
        assert!(!w.obstacles[0].overlaps(&end, 0.5));
    }

    #[test]
    fn test_sweep_clamps_to_bounds() {
        let w = world();
        let end = w.sweep(Vec3::flat(195.0, 100.0), Vec3::flat(1.0, 0.0), 20.0, 0.5);
        assert_approx_eq!(end.x, 199.5, 1e-4);
    }
}
