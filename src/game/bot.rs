//! Scripted opponent that produces the same `InputPackage` a remote client would

use crate::protocol::InputPackage;

use super::entity::Player;
use super::math::Vector2;

/// Preferred distance to the target
const ENGAGE_DISTANCE: f32 = 320.0;
/// Fire only when the target is this close
const FIRE_DISTANCE: f32 = 650.0;
/// Dash away when hp falls below this fraction
const PANIC_HP_FRACTION: f32 = 0.35;
/// Seconds between strafe direction flips
const STRAFE_PERIOD: f32 = 1.2;

/// Bot brain. One per bot participant.
#[derive(Debug, Default)]
pub struct BotController {
    strafe_timer: f32,
    strafe_left: bool,
}

impl BotController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide this tick's input for `me` against `target`
    pub fn think(&mut self, me: &Player, target: Option<&Player>, dt: f32) -> InputPackage {
        let Some(target) = target.filter(|t| t.is_alive()) else {
            return InputPackage {
                angle: me.angle,
                ..Default::default()
            };
        };
        if !me.is_alive() {
            return InputPackage::default();
        }

        self.strafe_timer -= dt;
        if self.strafe_timer <= 0.0 {
            self.strafe_timer = STRAFE_PERIOD;
            self.strafe_left = !self.strafe_left;
        }

        let to_target = target.position() - me.position();
        let distance = to_target.length();
        let aim = to_target.normalized();
        let strafe = if self.strafe_left {
            Vector2::new(-aim.y, aim.x)
        } else {
            Vector2::new(aim.y, -aim.x)
        };

        let hurt = me.hp < me.max_hp * PANIC_HP_FRACTION;
        let approach = if hurt {
            aim * -1.0
        } else if distance > ENGAGE_DISTANCE {
            aim
        } else {
            Vector2::ZERO
        };

        InputPackage {
            movement: (approach + strafe * 0.6).clamp_length(1.0),
            aim,
            sprint: distance > ENGAGE_DISTANCE * 2.0,
            fire: distance <= FIRE_DISTANCE,
            dash: hurt,
            angle: aim.angle(),
        }
    }
}
