//! Kinematic movement and static collision resolution.
//!
//! Everything in this module is pure: the server calls [`step`] once per
//! actor per tick and stores the result. There is no velocity state; an
//! actor either moves at full speed along its intent or stands still.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Remaining distance under which a point-target move snaps to the target.
pub const ARRIVE_EPSILON: f32 = 0.05;

/// Extra separation added when pushing out of an obstacle so that a
/// resolved position is stable under repeated resolution.
const COLLISION_SKIN: f32 = 1e-3;

/// Passes over the obstacle list; adjacent obstacles can push an actor
/// back into a neighbour on the first pass.
const RESOLVE_PASSES: usize = 4;

/// Directional movement keys as last reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyState {
    /// Unit ground-plane direction for the held keys, `None` when the keys
    /// cancel out or nothing is held.
    pub fn direction(&self) -> Option<Vec3> {
        let mut dir = Vec3::ZERO;
        if self.up {
            dir.z -= 1.0;
        }
        if self.down {
            dir.z += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        let dir = dir.normalize_xz();
        if dir == Vec3::ZERO {
            None
        } else {
            Some(dir)
        }
    }

    pub fn any(&self) -> bool {
        self.direction().is_some()
    }
}

/// What the actor wants to do with its feet this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MoveIntent {
    pub keys: KeyState,
    pub target: Option<Vec3>,
}

impl MoveIntent {
    pub fn toward(target: Vec3) -> Self {
        Self {
            keys: KeyState::default(),
            target: Some(target),
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.keys.any() && self.target.is_none()
    }
}

/// Axis-aligned playable area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl WorldBounds {
    pub fn square(size: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x: 0.0,
            max_x: size,
            min_z: 0.0,
            max_z: size,
            min_y,
            max_y,
        }
    }

    /// Clamps a position so a circle of `radius` stays inside the bounds.
    pub fn clamp(&self, position: Vec3, radius: f32) -> Vec3 {
        Vec3 {
            x: clamp_axis(position.x, self.min_x + radius, self.max_x - radius),
            y: clamp_axis(position.y, self.min_y, self.max_y),
            z: clamp_axis(position.z, self.min_z + radius, self.max_z - radius),
        }
    }

    pub fn contains(&self, position: &Vec3) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.z >= self.min_z
            && position.z <= self.max_z
    }
}

// `f32::clamp` panics when min > max, which a tiny map with a large actor
// radius could produce; collapse to the midpoint instead.
fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    if min > max {
        (min + max) / 2.0
    } else {
        value.clamp(min, max)
    }
}

/// Static circular obstacle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
}

impl Obstacle {
    pub fn center(&self) -> Vec3 {
        Vec3::flat(self.x, self.z)
    }

    /// True if a circle of `radius` at `position` overlaps this obstacle.
    pub fn overlaps(&self, position: &Vec3, radius: f32) -> bool {
        let dx = position.x - self.x;
        let dz = position.z - self.z;
        let min = self.radius + radius;
        dx * dx + dz * dz < min * min
    }
}

/// Result of integrating one tick of movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub position: Vec3,
    /// The point target still pending after this tick, if any.
    pub target: Option<Vec3>,
    /// Direction of travel this tick, for facing updates.
    pub heading: Option<Vec3>,
}

/// Moves `position` according to `intent` for `dt` seconds at `speed`.
///
/// Held keys win over a point target and cancel it. A point target that is
/// within [`ARRIVE_EPSILON`] or would be overshot this tick is landed on
/// exactly, height included, and cleared. Distances are measured on the
/// ground plane.
pub fn integrate(position: Vec3, intent: &MoveIntent, dt: f32, speed: f32) -> Step {
    if let Some(dir) = intent.keys.direction() {
        let travel = (speed * dt).max(0.0);
        return Step {
            position: position.add(&dir.scale(travel)),
            target: None,
            heading: Some(dir),
        };
    }

    let Some(target) = intent.target else {
        return Step {
            position,
            target: None,
            heading: None,
        };
    };

    let to_target = Vec3::new(target.x - position.x, 0.0, target.z - position.z);
    let remaining = to_target.magnitude_xz();
    let travel = (speed * dt).max(0.0);

    if remaining <= ARRIVE_EPSILON || travel >= remaining {
        let heading = if remaining > 0.0 {
            Some(to_target.normalize_xz())
        } else {
            None
        };
        // height comes along with the snap; collision resolution clamps it
        return Step {
            position: target,
            target: None,
            heading,
        };
    }

    let dir = to_target.normalize_xz();
    Step {
        position: position.add(&dir.scale(travel)),
        target: Some(target),
        heading: Some(dir),
    }
}

/// Clamps to bounds, pushes out of overlapping obstacles along the
/// obstacle-to-actor normal, then clamps again.
///
/// An actor sitting exactly on an obstacle centre is pushed out along +X.
pub fn resolve_collisions(
    position: Vec3,
    radius: f32,
    bounds: &WorldBounds,
    obstacles: &[Obstacle],
) -> Vec3 {
    let mut resolved = bounds.clamp(position, radius);

    for _ in 0..RESOLVE_PASSES {
        let mut moved = false;
        for obstacle in obstacles {
            if !obstacle.overlaps(&resolved, radius) {
                continue;
            }
            let min_distance = obstacle.radius + radius + COLLISION_SKIN;
            let offset = Vec3::new(resolved.x - obstacle.x, 0.0, resolved.z - obstacle.z);
            let normal = if offset.magnitude_xz() < 1e-6 {
                Vec3::flat(1.0, 0.0)
            } else {
                offset.normalize_xz()
            };
            resolved.x = obstacle.x + normal.x * min_distance;
            resolved.z = obstacle.z + normal.z * min_distance;
            moved = true;
        }
        if !moved {
            break;
        }
    }

    bounds.clamp(resolved, radius)
}

/// Full per-tick movement: integrate the intent then resolve collisions.
pub fn step(
    position: Vec3,
    intent: &MoveIntent,
    dt: f32,
    speed: f32,
    radius: f32,
    bounds: &WorldBounds,
    obstacles: &[Obstacle],
) -> Step {
    let mut moved = integrate(position, intent, dt, speed);
    moved.position = resolve_collisions(moved.position, radius, bounds, obstacles);
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn bounds() -> WorldBounds {
        WorldBounds::square(100.0, 0.0, 10.0)
    }

    #[test]
    fn test_keys_cancel_target() {
        let intent = MoveIntent {
            keys: KeyState {
                right: true,
                ..Default::default()
            },
            target: Some(Vec3::flat(0.0, 50.0)),
        };
        let step = integrate(Vec3::flat(10.0, 10.0), &intent, 1.0, 5.0);
        assert_approx_eq!(step.position.x, 15.0, 1e-5);
        assert_approx_eq!(step.position.z, 10.0, 1e-5);
        assert!(step.target.is_none());
    }

    #[test]
    fn test_diagonal_keys_are_normalized() {
        let keys = KeyState {
            up: true,
            right: true,
            ..Default::default()
        };
        let dir = keys.direction().unwrap();
        assert_approx_eq!(dir.magnitude_xz(), 1.0, 1e-6);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let keys = KeyState {
            left: true,
            right: true,
            ..Default::default()
        };
        assert!(keys.direction().is_none());
    }

    #[test]
    fn test_target_intermediate_step() {
        let intent = MoveIntent::toward(Vec3::flat(20.0, 10.0));
        let step = integrate(Vec3::flat(10.0, 10.0), &intent, 0.5, 4.0);
        assert_approx_eq!(step.position.x, 12.0, 1e-5);
        assert_eq!(step.target, Some(Vec3::flat(20.0, 10.0)));
    }

    #[test]
    fn test_target_overshoot_snaps_and_clears() {
        let target = Vec3::flat(11.0, 10.0);
        let intent = MoveIntent::toward(target);
        let step = integrate(Vec3::flat(10.0, 10.0), &intent, 1.0, 6.0);
        assert_eq!(step.position.x, 11.0);
        assert_eq!(step.position.z, 10.0);
        assert!(step.target.is_none());

        // re-stepping the now-cleared intent is a no-op
        let cleared = MoveIntent {
            keys: KeyState::default(),
            target: step.target,
        };
        let again = integrate(step.position, &cleared, 1.0, 6.0);
        assert_eq!(again.position, step.position);
    }

    #[test]
    fn test_snap_keeps_target_height() {
        let target = Vec3::new(11.0, 3.0, 10.0);
        let step = integrate(Vec3::flat(10.0, 10.0), &MoveIntent::toward(target), 1.0, 6.0);
        assert_eq!(step.position, target);

        let high = Vec3::new(11.0, 50.0, 10.0);
        let s = super::step(Vec3::flat(10.0, 10.0), &MoveIntent::toward(high), 1.0, 6.0, 0.5, &bounds(), &[]);
        assert_eq!(s.position, Vec3::new(11.0, 10.0, 10.0));
        assert!(s.target.is_none());
    }

    #[test]
    fn test_target_within_epsilon_snaps() {
        let intent = MoveIntent::toward(Vec3::flat(10.01, 10.0));
        let step = integrate(Vec3::flat(10.0, 10.0), &intent, 0.0, 6.0);
        assert_eq!(step.position.x, 10.01);
        assert!(step.target.is_none());
    }

    #[test]
    fn test_clamp_to_bounds_with_radius() {
        let p = resolve_collisions(Vec3::new(-5.0, 20.0, 105.0), 0.5, &bounds(), &[]);
        assert_eq!(p.x, 0.5);
        assert_eq!(p.z, 99.5);
        assert_eq!(p.y, 10.0);
    }

    #[test]
    fn test_push_out_of_obstacle() {
        let obstacles = [Obstacle {
            x: 50.0,
            z: 50.0,
            radius: 5.0,
        }];
        let p = resolve_collisions(Vec3::flat(52.0, 50.0), 0.5, &bounds(), &obstacles);
        assert!(p.distance_xz(&obstacles[0].center()) >= 5.5);
        assert_approx_eq!(p.z, 50.0, 1e-5);
        assert!(p.x > 50.0);
    }

    #[test]
    fn test_push_out_degenerate_center() {
        let obstacles = [Obstacle {
            x: 50.0,
            z: 50.0,
            radius: 5.0,
        }];
        let p = resolve_collisions(Vec3::flat(50.0, 50.0), 0.5, &bounds(), &obstacles);
        assert!(p.x > 55.0);
        assert_approx_eq!(p.z, 50.0, 1e-5);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let obstacles = [
            Obstacle {
                x: 50.0,
                z: 50.0,
                radius: 5.0,
            },
            Obstacle {
                x: 30.0,
                z: 30.0,
                radius: 3.0,
            },
        ];
        let once = resolve_collisions(Vec3::flat(51.0, 49.0), 0.5, &bounds(), &obstacles);
        let twice = resolve_collisions(once, 0.5, &bounds(), &obstacles);
        assert_eq!(once, twice);

        let outside = Vec3::flat(10.0, 80.0);
        assert_eq!(resolve_collisions(outside, 0.5, &bounds(), &obstacles), outside);
    }

    #[test]
    fn test_step_combines_integration_and_collision() {
        let obstacles = [Obstacle {
            x: 20.0,
            z: 10.0,
            radius: 2.0,
        }];
        let intent = MoveIntent::toward(Vec3::flat(20.0, 10.0));
        let s = step(Vec3::flat(10.0, 10.0), &intent, 10.0, 5.0, 0.5, &bounds(), &obstacles);
        assert!(!obstacles[0].overlaps(&s.position, 0.5));
        assert!(s.target.is_none());
    }
}
