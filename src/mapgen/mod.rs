//! Procedural arena generation
//!
//! Layouts are a pure function of `(archetype, seed)`: the host ships the
//! resulting walls in `Init`, and the client can rebuild the same list from
//! the seed alone.
//!
//! Placement is rejection sampling. Four boundary walls go down first; every
//! later obstacle must keep `min_spacing` center distance to everything placed
//! before it, and gets at most [`PLACEMENT_ATTEMPTS`] tries before it is
//! dropped.

pub mod archetype;

pub use archetype::{Archetype, ArchetypeSpec, ShapeHint};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::game::entity::{Wall, PLAYER_RADIUS};
use crate::game::math::Vector2;

pub const MAP_WIDTH: f32 = 2400.0;
pub const MAP_HEIGHT: f32 = 2400.0;
pub const BOUNDARY_THICKNESS: f32 = 40.0;
/// Gap between the map edge and the outer face of each boundary wall
pub const BOUNDARY_INSET: f32 = 20.0;
/// Tries per requested obstacle before it is omitted
pub const PLACEMENT_ATTEMPTS: usize = 40;
/// Scatter obstacles stay inside this fraction of the map, centered
pub const SCATTER_REGION: f32 = 0.5;

const SCATTER_RADIUS: (f32, f32) = (20.0, 40.0);

/// A generated arena
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    pub seed: u64,
    pub archetype: String,
    pub walls: Vec<Wall>,
}

impl MapLayout {
    /// The four boundary walls
    #[cfg(test)]
    pub fn boundaries(&self) -> &[Wall] {
        &self.walls[..4.min(self.walls.len())]
    }

    /// Spawn points for host and guest on opposite sides, clear of walls
    pub fn spawn_points(&self) -> (Vector2, Vector2) {
        let host = find_clear_spot(&self.walls, Vector2::new(MAP_WIDTH * 0.2, MAP_HEIGHT * 0.5));
        let guest = find_clear_spot(&self.walls, Vector2::new(MAP_WIDTH * 0.8, MAP_HEIGHT * 0.5));
        (host, guest)
    }
}

/// Generate the layout for a match seed
pub fn generate(seed: u64) -> MapLayout {
    generate_with(&Archetype::from_seed(seed).spec(), seed)
}

/// Generate from an explicit archetype
pub fn generate_with(spec: &ArchetypeSpec, seed: u64) -> MapLayout {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut walls = boundary_walls();
    let mut next_id = 0usize;
    let mut omitted = 0usize;

    let inner_min = BOUNDARY_INSET + BOUNDARY_THICKNESS;
    let inner_max_x = MAP_WIDTH - inner_min;
    let inner_max_y = MAP_HEIGHT - inner_min;

    'zones: for zone in &spec.zones {
        let (min_size, max_size) = zone.size_range();
        for _ in 0..zone.count {
            if next_id >= spec.obstacle_target {
                break 'zones;
            }

            let mut placed = false;
            for _ in 0..PLACEMENT_ATTEMPTS {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let dist = zone.spread.max(0.0) * rng.gen::<f32>().sqrt();
                let candidate = zone.center + Vector2::from_angle(angle) * dist;

                let inside = candidate.x > inner_min
                    && candidate.x < inner_max_x
                    && candidate.y > inner_min
                    && candidate.y < inner_max_y;
                if !inside || !is_spaced(&walls, candidate, spec.min_spacing) {
                    continue;
                }

                let circular = match zone.shape_hint() {
                    ShapeHint::Rect => false,
                    ShapeHint::Circle => true,
                    ShapeHint::Either => rng.gen_bool(0.5),
                };
                let id = format!("w{next_id}");
                let wall = if circular {
                    Wall::circle(id, candidate, rng.gen_range(min_size..=max_size))
                } else {
                    let half_w = rng.gen_range(min_size..=max_size);
                    let half_h = rng.gen_range(min_size..=max_size);
                    Wall::rect(id, candidate, half_w * 2.0, half_h * 2.0)
                };
                walls.push(wall);
                next_id += 1;
                placed = true;
                break;
            }

            if !placed {
                omitted += 1;
            }
        }
    }

    let region_w = MAP_WIDTH * SCATTER_REGION;
    let region_h = MAP_HEIGHT * SCATTER_REGION;
    let region_min = Vector2::new((MAP_WIDTH - region_w) / 2.0, (MAP_HEIGHT - region_h) / 2.0);
    for _ in 0..spec.scatter_count {
        let mut placed = false;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let candidate = Vector2::new(
                region_min.x + rng.gen_range(0.0..region_w),
                region_min.y + rng.gen_range(0.0..region_h),
            );
            if !is_spaced(&walls, candidate, spec.min_spacing) {
                continue;
            }
            let radius = rng.gen_range(SCATTER_RADIUS.0..=SCATTER_RADIUS.1);
            walls.push(Wall::circle(format!("w{next_id}"), candidate, radius));
            next_id += 1;
            placed = true;
            break;
        }
        if !placed {
            omitted += 1;
        }
    }

    debug!(
        archetype = %spec.name,
        seed,
        walls = walls.len(),
        omitted,
        "Generated arena"
    );

    MapLayout {
        seed,
        archetype: spec.name.clone(),
        walls,
    }
}

/// Top, bottom, left, right
fn boundary_walls() -> Vec<Wall> {
    let t = BOUNDARY_THICKNESS;
    let i = BOUNDARY_INSET;
    let span_x = MAP_WIDTH - 2.0 * i;
    let span_y = MAP_HEIGHT - 2.0 * i;
    vec![
        Wall::rect("boundary-top", Vector2::new(MAP_WIDTH / 2.0, i + t / 2.0), span_x, t),
        Wall::rect(
            "boundary-bottom",
            Vector2::new(MAP_WIDTH / 2.0, MAP_HEIGHT - i - t / 2.0),
            span_x,
            t,
        ),
        Wall::rect("boundary-left", Vector2::new(i + t / 2.0, MAP_HEIGHT / 2.0), t, span_y),
        Wall::rect(
            "boundary-right",
            Vector2::new(MAP_WIDTH - i - t / 2.0, MAP_HEIGHT / 2.0),
            t,
            span_y,
        ),
    ]
}

fn is_spaced(walls: &[Wall], candidate: Vector2, min_spacing: f32) -> bool {
    let min_sq = min_spacing * min_spacing;
    walls.iter().all(|w| w.center().distance_sq(candidate) >= min_sq)
}

/// Walk outward in rings from `preferred` until a player fits
fn find_clear_spot(walls: &[Wall], preferred: Vector2) -> Vector2 {
    let clearance = PLAYER_RADIUS * 1.5;
    let fits = |p: Vector2| !walls.iter().any(|w| w.intersects_circle(p, clearance));
    if fits(preferred) {
        return preferred;
    }
    for ring in 1..=40 {
        let dist = ring as f32 * PLAYER_RADIUS;
        for step in 0..16 {
            let angle = step as f32 * std::f32::consts::TAU / 16.0;
            let candidate = preferred + Vector2::from_angle(angle) * dist;
            if fits(candidate) {
                return candidate;
            }
        }
    }
    preferred
}
