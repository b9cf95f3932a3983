//! Player movement and collision resolution

use super::entity::{Player, Wall, SPRINT_BUDGET};
use super::input::TickInput;
use super::math::Vector2;

/// Base run speed in units per second
pub const BASE_SPEED: f32 = 260.0;
/// Speed factor while sprinting
pub const SPRINT_MULTIPLIER: f32 = 1.6;
/// Lockout after the sprint budget empties
pub const SPRINT_COOLDOWN: f32 = 4.0;
/// Budget recovered per second while not sprinting
pub const SPRINT_RECOVERY_RATE: f32 = 0.5;
/// Speed factor during a dash
pub const DASH_MULTIPLIER: f32 = 3.5;
pub const DASH_DURATION: f32 = 0.15;
pub const DASH_COOLDOWN: f32 = 2.0;
/// Speed factor while the speed boost is active
pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;

/// Axis-aligned play area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector2,
    pub max: Vector2,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            min: Vector2::ZERO,
            max: Vector2::new(width, height),
        }
    }

    /// Clamp a circle so it stays fully inside
    pub fn clamp_circle(&self, center: Vector2, radius: f32) -> Vector2 {
        Vector2::new(
            center.x.clamp(self.min.x + radius, (self.max.x - radius).max(self.min.x + radius)),
            center.y.clamp(self.min.y + radius, (self.max.y - radius).max(self.min.y + radius)),
        )
    }
}

/// Physics system for player movement and collisions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Multiplier from slow and speed-boost effects
    pub fn status_multiplier(player: &Player) -> f32 {
        let mut multiplier = 1.0;
        if player.slow_timer > 0.0 {
            multiplier *= (1.0 - player.slow_magnitude).clamp(0.0, 1.0);
        }
        if player.speed_boost_timer > 0.0 {
            multiplier *= SPEED_BOOST_MULTIPLIER;
        }
        multiplier
    }

    /// Apply one tick of input to a player's velocity and position.
    /// Facing comes straight from the input; it is not derived from motion.
    pub fn move_player(player: &mut Player, input: &TickInput, dt: f32) {
        player.angle = input.angle;

        // Ability timers
        if player.sprint_cooldown > 0.0 {
            player.sprint_cooldown -= dt;
            if player.sprint_cooldown <= 0.0 {
                player.sprint_cooldown = 0.0;
                player.sprint_time = SPRINT_BUDGET;
            }
        }
        player.dash_cooldown = (player.dash_cooldown - dt).max(0.0);
        player.dash_timer = (player.dash_timer - dt).max(0.0);

        let moving = input.movement.length_sq() > 0.0;

        let mut sprint_factor = 1.0;
        let can_sprint = player.sprint_cooldown <= 0.0 && player.sprint_time > 0.0;
        if input.sprint && moving && can_sprint {
            sprint_factor = SPRINT_MULTIPLIER;
            player.sprint_time -= dt;
            if player.sprint_time <= 0.0 {
                player.sprint_time = 0.0;
                player.sprint_cooldown = SPRINT_COOLDOWN;
            }
        } else if player.sprint_cooldown <= 0.0 {
            player.sprint_time = (player.sprint_time + SPRINT_RECOVERY_RATE * dt).min(SPRINT_BUDGET);
        }

        if input.dash && moving && player.dash_cooldown <= 0.0 && player.dash_timer <= 0.0 {
            player.dash_timer = DASH_DURATION;
            player.dash_cooldown = DASH_COOLDOWN;
            player.dash_direction = input.movement.normalized();
        }

        let status = Self::status_multiplier(player);
        player.speed_multiplier = status;

        player.velocity = if player.dash_timer > 0.0 {
            player.dash_direction * (BASE_SPEED * DASH_MULTIPLIER * status)
        } else {
            input.movement * (BASE_SPEED * sprint_factor * status)
        };

        player.body.position += player.velocity * dt;
    }

    /// Push a circle out of a wall. Returns the corrected center if they overlapped.
    pub fn resolve_wall(center: Vector2, radius: f32, wall: &Wall) -> Option<Vector2> {
        if wall.is_circular {
            return Self::resolve_circle(center, radius, wall.center(), wall.body.radius);
        }

        let closest = wall.closest_point(center);
        let offset = center - closest;
        let dist_sq = offset.length_sq();
        if dist_sq >= radius * radius {
            return None;
        }

        let dist = dist_sq.sqrt();
        if dist > 1e-4 {
            return Some(closest + offset * (radius / dist));
        }

        // Center is inside the rectangle: leave through the nearest side
        let c = wall.center();
        let hw = wall.width * 0.5;
        let hh = wall.height * 0.5;
        let left = center.x - (c.x - hw);
        let right = (c.x + hw) - center.x;
        let top = center.y - (c.y - hh);
        let bottom = (c.y + hh) - center.y;
        let min = left.min(right).min(top).min(bottom);

        let corrected = if min == left {
            Vector2::new(c.x - hw - radius, center.y)
        } else if min == right {
            Vector2::new(c.x + hw + radius, center.y)
        } else if min == top {
            Vector2::new(center.x, c.y - hh - radius)
        } else {
            Vector2::new(center.x, c.y + hh + radius)
        };
        Some(corrected)
    }

    /// Push a moving circle out of a static one
    pub fn resolve_circle(
        center: Vector2,
        radius: f32,
        obstacle: Vector2,
        obstacle_radius: f32,
    ) -> Option<Vector2> {
        let reach = radius + obstacle_radius;
        let offset = center - obstacle;
        let dist_sq = offset.length_sq();
        if dist_sq >= reach * reach {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist < 1e-4 {
            Vector2::new(1.0, 0.0)
        } else {
            offset * (1.0 / dist)
        };
        Some(obstacle + normal * reach)
    }

    /// Keep a player out of every wall and inside the bounds
    pub fn resolve_player_walls(player: &mut Player, walls: &[Wall], bounds: &Bounds) {
        let radius = player.body.radius;
        // Corners can need a second pass
        for _ in 0..3 {
            let mut moved = false;
            for wall in walls {
                if let Some(corrected) =
                    Self::resolve_wall(player.body.position, radius, wall)
                {
                    player.body.position = corrected;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
        player.body.position = bounds.clamp_circle(player.body.position, radius);
    }

    /// Check collision between two players
    pub fn check_player_collision(a: Vector2, ra: f32, b: Vector2, rb: f32) -> bool {
        let reach = ra + rb;
        a.distance_sq(b) < reach * reach
    }

    /// Resolve overlap between two players by pushing them apart equally
    pub fn resolve_player_collision(
        a: Vector2,
        ra: f32,
        b: Vector2,
        rb: f32,
    ) -> (Vector2, Vector2) {
        let offset = b - a;
        let dist = offset.length();

        if dist < 0.001 {
            // Same position, push apart arbitrarily
            return (a - Vector2::new(ra, 0.0), b + Vector2::new(rb, 0.0));
        }

        let overlap = ra + rb - dist;
        if overlap <= 0.0 {
            return (a, b);
        }

        let normal = offset * (1.0 / dist);
        let push = overlap / 2.0 + 0.1;
        (a - normal * push, b + normal * push)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_at(x: f32, y: f32) -> Player {
        Player::new("p", Vector2::new(x, y), false)
    }

    fn input(movement: Vector2) -> TickInput {
        TickInput {
            movement,
            ..Default::default()
        }
    }

    #[test]
    fn walking_moves_at_base_speed() {
        let mut p = player_at(500.0, 500.0);
        PhysicsSystem::move_player(&mut p, &input(Vector2::new(1.0, 0.0)), 0.5);
        assert!((p.position().x - (500.0 + BASE_SPEED * 0.5)).abs() < 1e-3);
        assert_eq!(p.speed_multiplier, 1.0);
    }

    #[test]
    fn angle_comes_from_input() {
        let mut p = player_at(0.0, 0.0);
        let tick = TickInput {
            movement: Vector2::new(1.0, 0.0),
            angle: 2.0,
            ..Default::default()
        };
        PhysicsSystem::move_player(&mut p, &tick, 0.1);
        assert_eq!(p.angle, 2.0);
    }

    #[test]
    fn sprint_depletes_then_cools_down_then_refills() {
        let mut p = player_at(0.0, 0.0);
        let tick = TickInput {
            movement: Vector2::new(1.0, 0.0),
            sprint: true,
            ..Default::default()
        };
        let dt = 0.1;
        let steps = (SPRINT_BUDGET / dt).ceil() as usize + 1;
        for _ in 0..steps {
            PhysicsSystem::move_player(&mut p, &tick, dt);
        }
        assert_eq!(p.sprint_time, 0.0);
        assert!(p.sprint_cooldown > 0.0);

        // No sprint speed during cooldown
        PhysicsSystem::move_player(&mut p, &tick, dt);
        assert!((p.velocity.length() - BASE_SPEED).abs() < 1e-3);

        let cooldown_steps = (SPRINT_COOLDOWN / dt).ceil() as usize + 1;
        for _ in 0..cooldown_steps {
            PhysicsSystem::move_player(&mut p, &input(Vector2::ZERO), dt);
        }
        assert_eq!(p.sprint_cooldown, 0.0);
        assert_eq!(p.sprint_time, SPRINT_BUDGET);
    }

    #[test]
    fn dash_bursts_and_starts_cooldown() {
        let mut p = player_at(0.0, 0.0);
        let tick = TickInput {
            movement: Vector2::new(0.0, 1.0),
            dash: true,
            ..Default::default()
        };
        PhysicsSystem::move_player(&mut p, &tick, 0.05);
        assert!((p.velocity.y - BASE_SPEED * DASH_MULTIPLIER).abs() < 1e-3);
        assert_eq!(p.dash_cooldown, DASH_COOLDOWN);

        // Dash expires, cooldown still running, no second dash
        for _ in 0..5 {
            PhysicsSystem::move_player(&mut p, &tick, 0.05);
        }
        assert!((p.velocity.y - BASE_SPEED).abs() < 1e-3);
    }

    #[test]
    fn slow_and_boost_stack() {
        let mut p = player_at(0.0, 0.0);
        p.slow_magnitude = 0.5;
        p.slow_timer = 2.0;
        p.speed_boost_timer = 2.0;
        PhysicsSystem::move_player(&mut p, &input(Vector2::new(1.0, 0.0)), 0.1);
        assert!((p.speed_multiplier - 0.75).abs() < 1e-5);
    }

    #[test]
    fn player_does_not_penetrate_rect() {
        let wall = Wall::rect("w", Vector2::new(100.0, 0.0), 40.0, 200.0);
        let bounds = Bounds::new(10_000.0, 10_000.0);
        let mut p = player_at(75.0, 50.0);
        PhysicsSystem::resolve_player_walls(&mut p, std::slice::from_ref(&wall), &bounds);
        // Left face at x=80, radius 20
        assert!((p.position().x - 60.0).abs() < 1e-3);
        assert!(!wall.intersects_circle(p.position(), p.body.radius - 0.01));
    }

    #[test]
    fn center_inside_rect_exits_nearest_side() {
        let wall = Wall::rect("w", Vector2::new(100.0, 100.0), 100.0, 100.0);
        let corrected =
            PhysicsSystem::resolve_wall(Vector2::new(140.0, 100.0), 10.0, &wall).unwrap();
        assert_eq!(corrected, Vector2::new(160.0, 100.0));
    }

    #[test]
    fn player_does_not_penetrate_circle() {
        let wall = Wall::circle("c", Vector2::new(0.0, 0.0), 50.0);
        let corrected =
            PhysicsSystem::resolve_wall(Vector2::new(60.0, 0.0), 20.0, &wall).unwrap();
        assert!((corrected.x - 70.0).abs() < 1e-4);
    }

    #[test]
    fn players_are_pushed_apart() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(30.0, 0.0);
        assert!(PhysicsSystem::check_player_collision(a, 20.0, b, 20.0));
        let (na, nb) = PhysicsSystem::resolve_player_collision(a, 20.0, b, 20.0);
        assert!(na.distance(nb) >= 40.0);
    }

    #[test]
    fn bounds_clamp_keeps_circle_inside() {
        let bounds = Bounds::new(100.0, 100.0);
        let c = bounds.clamp_circle(Vector2::new(-5.0, 120.0), 10.0);
        assert_eq!(c, Vector2::new(10.0, 90.0));
    }
}
