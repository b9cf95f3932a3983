//! Map archetypes: named obstacle layouts the generator samples from

use crate::game::math::Vector2;

use super::{MAP_HEIGHT, MAP_WIDTH};

/// A named region that clusters obstacles
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSpec {
    pub label: String,
    pub center: Vector2,
    /// Obstacles land within this distance of `center`
    pub spread: f32,
    /// Obstacles requested for this zone
    pub count: usize,
}

impl ZoneSpec {
    pub fn new(label: &str, center: Vector2, spread: f32, count: usize) -> Self {
        Self {
            label: label.to_string(),
            center,
            spread,
            count,
        }
    }

    /// Size hint from the label: (min, max) half-extent
    pub fn size_range(&self) -> (f32, f32) {
        let label = self.label.to_ascii_lowercase();
        if label.contains("bunker") || label.contains("building") {
            (50.0, 85.0)
        } else if label.contains("rock") || label.contains("tree") || label.contains("cover") {
            (18.0, 36.0)
        } else {
            (28.0, 60.0)
        }
    }

    /// Shape preference from the label
    pub fn shape_hint(&self) -> ShapeHint {
        let label = self.label.to_ascii_lowercase();
        if label.contains("bunker") || label.contains("building") || label.contains("wall") {
            ShapeHint::Rect
        } else if label.contains("rock") || label.contains("tree") {
            ShapeHint::Circle
        } else {
            ShapeHint::Either
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeHint {
    Rect,
    Circle,
    Either,
}

/// Full generator configuration for one layout
#[derive(Debug, Clone, PartialEq)]
pub struct ArchetypeSpec {
    pub name: String,
    /// Ceiling on zone obstacles
    pub obstacle_target: usize,
    /// Minimum center distance between any two obstacles
    pub min_spacing: f32,
    pub zones: Vec<ZoneSpec>,
    /// Circles scattered in the central region after the zones
    pub scatter_count: usize,
}

/// Built-in archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    /// Four building blocks around an open plaza
    Compound,
    /// Rock clusters and scattered cover
    Canyon,
    /// Central bunker ring
    Fortress,
    /// Sparse cover, long sightlines
    Outskirts,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Compound,
        Archetype::Canyon,
        Archetype::Fortress,
        Archetype::Outskirts,
    ];

    /// Pick an archetype from a match seed
    pub fn from_seed(seed: u64) -> Self {
        Self::ALL[(seed % Self::ALL.len() as u64) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Archetype::Compound => "compound",
            Archetype::Canyon => "canyon",
            Archetype::Fortress => "fortress",
            Archetype::Outskirts => "outskirts",
        }
    }

    pub fn spec(self) -> ArchetypeSpec {
        let w = MAP_WIDTH;
        let h = MAP_HEIGHT;
        let at = |fx: f32, fy: f32| Vector2::new(w * fx, h * fy);

        let (obstacle_target, min_spacing, zones, scatter_count) = match self {
            Archetype::Compound => (
                22,
                170.0,
                vec![
                    ZoneSpec::new("building-nw", at(0.25, 0.25), 220.0, 4),
                    ZoneSpec::new("building-ne", at(0.75, 0.25), 220.0, 4),
                    ZoneSpec::new("building-sw", at(0.25, 0.75), 220.0, 4),
                    ZoneSpec::new("building-se", at(0.75, 0.75), 220.0, 4),
                    ZoneSpec::new("plaza-cover", at(0.5, 0.5), 260.0, 5),
                ],
                4,
            ),
            Archetype::Canyon => (
                26,
                150.0,
                vec![
                    ZoneSpec::new("rocks-north", at(0.5, 0.2), 380.0, 7),
                    ZoneSpec::new("rocks-south", at(0.5, 0.8), 380.0, 7),
                    ZoneSpec::new("ridge-west", at(0.2, 0.5), 240.0, 4),
                    ZoneSpec::new("ridge-east", at(0.8, 0.5), 240.0, 4),
                ],
                6,
            ),
            Archetype::Fortress => (
                20,
                180.0,
                vec![
                    ZoneSpec::new("bunker-core", at(0.5, 0.5), 320.0, 8),
                    ZoneSpec::new("trees-west", at(0.15, 0.5), 200.0, 4),
                    ZoneSpec::new("trees-east", at(0.85, 0.5), 200.0, 4),
                    ZoneSpec::new("outpost", at(0.5, 0.12), 160.0, 3),
                ],
                3,
            ),
            Archetype::Outskirts => (
                14,
                220.0,
                vec![
                    ZoneSpec::new("farm-building", at(0.3, 0.3), 200.0, 3),
                    ZoneSpec::new("trees", at(0.7, 0.65), 420.0, 6),
                    ZoneSpec::new("cover", at(0.4, 0.75), 260.0, 4),
                ],
                5,
            ),
        };

        ArchetypeSpec {
            name: self.name().to_string(),
            obstacle_target,
            min_spacing,
            zones,
            scatter_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bunker_zones_get_larger_obstacles() {
        let bunker = ZoneSpec::new("bunker-core", Vector2::ZERO, 10.0, 1);
        let generic = ZoneSpec::new("plaza", Vector2::ZERO, 10.0, 1);
        assert!(bunker.size_range().0 > generic.size_range().0);
        assert_eq!(bunker.shape_hint(), ShapeHint::Rect);
        assert_eq!(generic.shape_hint(), ShapeHint::Either);
    }

    #[test]
    fn seed_selects_archetype_deterministically() {
        assert_eq!(Archetype::from_seed(7), Archetype::from_seed(7));
        assert_eq!(Archetype::from_seed(0), Archetype::Compound);
        assert_eq!(Archetype::from_seed(5), Archetype::Canyon);
    }

    #[test]
    fn zone_centers_are_on_the_map() {
        for archetype in Archetype::ALL {
            for zone in archetype.spec().zones {
                assert!(zone.center.x > 0.0 && zone.center.x < MAP_WIDTH);
                assert!(zone.center.y > 0.0 && zone.center.y < MAP_HEIGHT);
            }
        }
    }
}
