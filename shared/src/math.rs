use serde::{Deserialize, Serialize};

/// A point or direction in world space.
///
/// The ground plane is X/Z; Y is height and only ever clamped, never
/// integrated, so most helpers here work in the X/Z plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane point at height zero.
    pub const fn flat(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    ///Returns the length of the vector projected onto the ground plane.
    pub fn magnitude_xz(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    ///Returns the ground-plane unit vector, or zero for a zero-length input.
    pub fn normalize_xz(&self) -> Vec3 {
        let mag = self.magnitude_xz();
        if mag == 0.0 {
            Vec3::ZERO
        } else {
            Vec3 {
                x: self.x / mag,
                y: 0.0,
                z: self.z / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    ///Returns `self - other`.
    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn dot_xz(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.z * other.z
    }

    /// Ground-plane distance between two points.
    pub fn distance_xz(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude_xz()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Angle in radians between two ground-plane directions, in `[0, PI]`.
///
/// Zero-length inputs are treated as aligned.
pub fn angle_between_xz(a: &Vec3, b: &Vec3) -> f32 {
    let a = a.normalize_xz();
    let b = b.normalize_xz();
    if a == Vec3::ZERO || b == Vec3::ZERO {
        return 0.0;
    }
    a.dot_xz(&b).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_ignores_height() {
        let v = Vec3::new(3.0, 10.0, 4.0).normalize_xz();
        assert_approx_eq!(v.x, 0.6, 1e-6);
        assert_approx_eq!(v.z, 0.8, 1e-6);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(Vec3::ZERO.normalize_xz(), Vec3::ZERO);
    }

    #[test]
    fn test_angle_between() {
        let fwd = Vec3::flat(1.0, 0.0);
        assert_approx_eq!(angle_between_xz(&fwd, &Vec3::flat(1.0, 1.0)), std::f32::consts::FRAC_PI_4, 1e-5);
        assert_approx_eq!(angle_between_xz(&fwd, &Vec3::flat(-1.0, 0.0)), std::f32::consts::PI, 1e-5);
    }

    #[test]
    fn test_distance_xz() {
        let a = Vec3::new(0.0, 5.0, 0.0);
        let b = Vec3::new(6.0, -2.0, 8.0);
        assert_approx_eq!(a.distance_xz(&b), 10.0, 1e-6);
    }
}
