//! Per-participant input buffering between ticks

use std::collections::HashMap;

use crate::protocol::InputPackage;

use super::math::Vector2;

/// Movement magnitudes below this are treated as no input
pub const MOVE_DEADZONE: f32 = 0.15;

/// Input state consumed by one tick (sanitized from an `InputPackage`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    /// Movement intent, length in `[0, 1]`
    pub movement: Vector2,
    pub aim: Vector2,
    pub sprint: bool,
    pub fire: bool,
    pub dash: bool,
    /// Facing angle resolved by the sender
    pub angle: f32,
}

impl TickInput {
    /// Clamp an incoming package into range. Never rejects.
    pub fn from_package(pkg: &InputPackage) -> Self {
        let movement = pkg.movement.sanitized().clamp_length(1.0);
        let movement = if movement.length() < MOVE_DEADZONE {
            Vector2::ZERO
        } else {
            movement
        };
        let aim = pkg.aim.sanitized();
        let angle = if pkg.angle.is_finite() {
            pkg.angle
        } else if aim.length_sq() > 0.0 {
            aim.angle()
        } else {
            0.0
        };

        Self {
            movement,
            aim,
            sprint: pkg.sprint,
            fire: pkg.fire,
            dash: pkg.dash,
            angle,
        }
    }
}

/// Latest input per participant. Only the tick reads it.
#[derive(Debug, Default)]
pub struct InputBuffer {
    latest: HashMap<String, TickInput>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the newest input for `player_id`, replacing any previous value
    pub fn record(&mut self, player_id: &str, pkg: &InputPackage) {
        self.latest
            .insert(player_id.to_string(), TickInput::from_package(pkg));
    }

    #[cfg(test)]
    pub fn set(&mut self, player_id: &str, input: TickInput) {
        self.latest.insert(player_id.to_string(), input);
    }

    /// Input to use this tick; idle if nothing was ever received
    pub fn get(&self, player_id: &str) -> TickInput {
        self.latest.get(player_id).copied().unwrap_or_default()
    }

    pub fn clear(&mut self, player_id: &str) {
        self.latest.remove(player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(movement: Vector2) -> InputPackage {
        InputPackage {
            movement,
            aim: Vector2::new(1.0, 0.0),
            sprint: false,
            fire: true,
            dash: false,
            angle: 0.5,
        }
    }

    #[test]
    fn oversized_move_is_clamped() {
        let input = TickInput::from_package(&pkg(Vector2::new(10.0, 0.0)));
        assert!((input.movement.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn deadzone_zeroes_small_moves() {
        let input = TickInput::from_package(&pkg(Vector2::new(0.05, 0.05)));
        assert_eq!(input.movement, Vector2::ZERO);
    }

    #[test]
    fn non_finite_angle_falls_back_to_aim() {
        let mut p = pkg(Vector2::ZERO);
        p.angle = f32::NAN;
        p.aim = Vector2::new(0.0, 1.0);
        let input = TickInput::from_package(&p);
        assert!((input.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn last_input_wins() {
        let mut buffer = InputBuffer::new();
        buffer.record("guest", &pkg(Vector2::new(1.0, 0.0)));
        buffer.record("guest", &pkg(Vector2::new(0.0, -1.0)));
        assert_eq!(buffer.get("guest").movement, Vector2::new(0.0, -1.0));
        assert_eq!(buffer.get("nobody"), TickInput::default());
    }
}
