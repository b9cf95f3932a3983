//! Shrinking safe zone

use super::math::Vector2;

/// One shrink step of the schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonePhase {
    /// Seconds to wait before this phase starts shrinking
    pub delay: f32,
    /// Radius at the end of this phase
    pub target_radius: f32,
    /// Seconds to shrink to the target
    pub shrink_duration: f32,
    /// Damage per second outside the zone during and after this phase
    pub damage_per_second: f32,
}

/// Zone configuration for the match
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneConfig {
    pub initial_radius: f32,
    /// Damage per second before the first phase begins
    pub initial_damage_per_second: f32,
    pub phases: Vec<ZonePhase>,
}

impl ZoneConfig {
    /// Default schedule scaled to a map whose half-diagonal is `half_extent`
    pub fn for_map(half_extent: f32) -> Self {
        let r = half_extent;
        Self {
            initial_radius: r,
            initial_damage_per_second: 2.0,
            phases: vec![
                ZonePhase {
                    delay: 30.0,
                    target_radius: r * 0.7,
                    shrink_duration: 20.0,
                    damage_per_second: 4.0,
                },
                ZonePhase {
                    delay: 25.0,
                    target_radius: r * 0.45,
                    shrink_duration: 20.0,
                    damage_per_second: 8.0,
                },
                ZonePhase {
                    delay: 20.0,
                    target_radius: r * 0.25,
                    shrink_duration: 15.0,
                    damage_per_second: 12.0,
                },
                ZonePhase {
                    delay: 15.0,
                    target_radius: r * 0.1,
                    shrink_duration: 15.0,
                    damage_per_second: 20.0,
                },
            ],
        }
    }
}

/// Zone (shrinking play area) state
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub center: Vector2,
    pub radius: f32,
    pub damage_per_second: f32,
    /// Index of the phase currently waiting or shrinking
    pub phase: usize,
    /// Seconds left in the current wait or shrink
    pub timer: f32,
    pub shrinking: bool,
    phase_start_radius: f32,
    config: ZoneConfig,
}

/// Reported when a shrink step begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneShrinkStarted {
    pub phase: usize,
    pub target_radius: f32,
}

impl Zone {
    pub fn new(center: Vector2, config: ZoneConfig) -> Self {
        let timer = config.phases.first().map(|p| p.delay).unwrap_or(0.0);
        Self {
            center,
            radius: config.initial_radius,
            damage_per_second: config.initial_damage_per_second,
            phase: 0,
            timer,
            shrinking: false,
            phase_start_radius: config.initial_radius,
            config,
        }
    }

    /// All phases finished
    #[cfg(test)]
    pub fn is_final(&self) -> bool {
        self.phase >= self.config.phases.len()
    }

    /// Advance the schedule by `dt`
    pub fn update(&mut self, dt: f32) -> Option<ZoneShrinkStarted> {
        let Some(phase) = self.config.phases.get(self.phase).copied() else {
            return None;
        };

        self.timer -= dt;
        let mut started = None;

        if self.shrinking {
            let duration = phase.shrink_duration.max(f32::EPSILON);
            let progress = 1.0 - (self.timer / duration).clamp(0.0, 1.0);
            self.radius =
                self.phase_start_radius + (phase.target_radius - self.phase_start_radius) * progress;

            if self.timer <= 0.0 {
                self.radius = phase.target_radius;
                self.shrinking = false;
                self.phase += 1;
                self.timer = self
                    .config
                    .phases
                    .get(self.phase)
                    .map(|p| p.delay)
                    .unwrap_or(0.0);
            }
        } else if self.timer <= 0.0 {
            self.shrinking = true;
            self.phase_start_radius = self.radius;
            self.timer = phase.shrink_duration;
            self.damage_per_second = phase.damage_per_second;
            started = Some(ZoneShrinkStarted {
                phase: self.phase,
                target_radius: phase.target_radius,
            });
        }

        started
    }

    pub fn contains(&self, point: Vector2) -> bool {
        point.distance_sq(self.center) <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> ZoneConfig {
        ZoneConfig {
            initial_radius: 100.0,
            initial_damage_per_second: 1.0,
            phases: vec![
                ZonePhase {
                    delay: 1.0,
                    target_radius: 50.0,
                    shrink_duration: 1.0,
                    damage_per_second: 5.0,
                },
                ZonePhase {
                    delay: 1.0,
                    target_radius: 10.0,
                    shrink_duration: 1.0,
                    damage_per_second: 9.0,
                },
            ],
        }
    }

    #[test]
    fn radius_holds_during_delay() {
        let mut zone = Zone::new(Vector2::ZERO, quick_config());
        zone.update(0.5);
        assert_eq!(zone.radius, 100.0);
        assert!(!zone.shrinking);
    }

    #[test]
    fn shrinks_through_all_phases() {
        let mut zone = Zone::new(Vector2::ZERO, quick_config());
        let mut starts = Vec::new();
        let mut last_radius = zone.radius;
        for _ in 0..100 {
            if let Some(s) = zone.update(0.1) {
                starts.push(s.phase);
            }
            assert!(zone.radius <= last_radius);
            last_radius = zone.radius;
        }
        assert_eq!(starts, vec![0, 1]);
        assert!(zone.is_final());
        assert_eq!(zone.radius, 10.0);
        assert_eq!(zone.damage_per_second, 9.0);
    }

    #[test]
    fn contains_checks_radius() {
        let zone = Zone::new(Vector2::new(50.0, 50.0), quick_config());
        assert!(zone.contains(Vector2::new(100.0, 50.0)));
        assert!(!zone.contains(Vector2::new(200.0, 50.0)));
    }
}
