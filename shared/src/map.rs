//! Read-only map descriptor consumed at world setup.

use crate::movement::{Obstacle, WorldBounds};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse map descriptor: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid map descriptor: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlacement {
    pub x: f32,
    pub z: f32,
    /// Material item granted on harvest, e.g. `"wood"`.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorItem {
    pub item: String,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPlacement {
    pub id: u32,
    pub x: f32,
    pub z: f32,
    #[serde(default)]
    pub catalog: Option<Vec<VendorItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobPlacement {
    pub x: f32,
    pub z: f32,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub variance: Option<u32>,
    #[serde(default)]
    pub mob_type: Option<String>,
    #[serde(default)]
    pub aggressive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescriptor {
    pub size: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub base: Circle,
    #[serde(default)]
    pub obstacles: Vec<Circle>,
    #[serde(default)]
    pub spawn_points: Vec<Point>,
    #[serde(default)]
    pub resources: Vec<ResourcePlacement>,
    #[serde(default)]
    pub vendors: Vec<VendorPlacement>,
    #[serde(default)]
    pub mobs: Vec<MobPlacement>,
}

impl MapDescriptor {
    pub fn from_json(text: &str) -> Result<Self, MapError> {
        let map: MapDescriptor = serde_json::from_str(text)?;
        map.validate()?;
        Ok(map)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(MapError::Invalid(format!("size must be positive, got {}", self.size)));
        }
        if !(self.min_y <= self.max_y) {
            return Err(MapError::Invalid("min_y must not exceed max_y".into()));
        }
        let inside = |x: f32, z: f32| (0.0..=self.size).contains(&x) && (0.0..=self.size).contains(&z);
        if !inside(self.base.x, self.base.z) {
            return Err(MapError::Invalid("base circle centre lies outside the map".into()));
        }
        for (i, o) in self.obstacles.iter().enumerate() {
            if !(o.radius > 0.0) || !inside(o.x, o.z) {
                return Err(MapError::Invalid(format!("obstacle {} is malformed", i)));
            }
        }
        if self.mobs.iter().any(|m| !inside(m.x, m.z)) {
            return Err(MapError::Invalid("mob placement outside the map".into()));
        }
        if self.resources.iter().any(|r| !inside(r.x, r.z)) {
            return Err(MapError::Invalid("resource placement outside the map".into()));
        }
        let mut vendor_ids: Vec<u32> = self.vendors.iter().map(|v| v.id).collect();
        vendor_ids.sort_unstable();
        vendor_ids.dedup();
        if vendor_ids.len() != self.vendors.len() {
            return Err(MapError::Invalid("duplicate vendor id".into()));
        }
        Ok(())
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::square(self.size, self.min_y, self.max_y)
    }

    pub fn obstacle_list(&self) -> Vec<Obstacle> {
        self.obstacles
            .iter()
            .map(|c| Obstacle {
                x: c.x,
                z: c.z,
                radius: c.radius,
            })
            .collect()
    }

    /// Small hand-made map used when no descriptor file is supplied.
    pub fn default_map() -> Self {
        let mob = |x: f32, z: f32, level: u32, mob_type: &str| MobPlacement {
            x,
            z,
            level: Some(level),
            variance: Some(1),
            mob_type: Some(mob_type.to_string()),
            aggressive: None,
        };
        Self {
            size: 200.0,
            min_y: 0.0,
            max_y: 20.0,
            base: Circle {
                x: 100.0,
                z: 100.0,
                radius: 15.0,
            },
            obstacles: vec![
                Circle { x: 60.0, z: 60.0, radius: 6.0 },
                Circle { x: 140.0, z: 70.0, radius: 4.0 },
                Circle { x: 80.0, z: 150.0, radius: 8.0 },
                Circle { x: 150.0, z: 150.0, radius: 5.0 },
            ],
            spawn_points: vec![
                Point { x: 100.0, z: 95.0 },
                Point { x: 95.0, z: 100.0 },
                Point { x: 105.0, z: 100.0 },
            ],
            resources: vec![
                ResourcePlacement { x: 120.0, z: 90.0, kind: "wood".into() },
                ResourcePlacement { x: 70.0, z: 110.0, kind: "herb".into() },
                ResourcePlacement { x: 130.0, z: 130.0, kind: "ore".into() },
                ResourcePlacement { x: 40.0, z: 160.0, kind: "ore".into() },
            ],
            vendors: vec![VendorPlacement {
                id: 1,
                x: 100.0,
                z: 108.0,
                catalog: Some(vec![
                    VendorItem { item: "bandage".into(), price: 5 },
                    VendorItem { item: "health_potion".into(), price: 20 },
                    VendorItem { item: "iron_sword".into(), price: 60 },
                ]),
            }],
            mobs: vec![
                mob(130.0, 100.0, 1, "slime"),
                mob(135.0, 110.0, 1, "slime"),
                mob(60.0, 130.0, 3, "wolf"),
                mob(65.0, 135.0, 3, "wolf"),
                mob(160.0, 40.0, 6, "bandit"),
                mob(40.0, 40.0, 10, "ogre"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_is_valid() {
        assert!(MapDescriptor::default_map().validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_json() {
        let json = r#"{
            "size": 50.0, "min_y": 0.0, "max_y": 5.0,
            "base": {"x": 25.0, "z": 25.0, "radius": 5.0},
            "mobs": [{"x": 10.0, "z": 10.0, "mob_type": "wolf", "aggressive": false}]
        }"#;
        let map = MapDescriptor::from_json(json).unwrap();
        assert_eq!(map.mobs.len(), 1);
        assert_eq!(map.mobs[0].aggressive, Some(false));
        assert!(map.vendors.is_empty());
        assert_eq!(map.bounds().max_x, 50.0);
    }

    #[test]
    fn test_rejects_bad_size() {
        let json = r#"{"size": -1.0, "min_y": 0.0, "max_y": 5.0,
            "base": {"x": 0.0, "z": 0.0, "radius": 5.0}}"#;
        assert!(matches!(MapDescriptor::from_json(json), Err(MapError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(MapDescriptor::from_json("{not json"), Err(MapError::Parse(_))));
    }

    #[test]
    fn test_rejects_duplicate_vendor_ids() {
        let mut map = MapDescriptor::default_map();
        let dup = map.vendors[0].clone();
        map.vendors.push(dup);
        assert!(map.validate().is_err());
    }
}
