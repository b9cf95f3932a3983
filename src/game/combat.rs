//! Combat system - weapons, damage, hit detection

use super::entity::{Body, Bullet, Player, WeaponType};
use super::math::Vector2;

/// Fraction of damage each armor point absorbs
pub const ARMOR_ABSORB_PER_POINT: f32 = 0.005;
/// Upper bound on armor absorption
pub const MAX_ARMOR_ABSORB: f32 = 0.5;
/// Damage multiplier while the damage boost is active
pub const DAMAGE_BOOST_MULTIPLIER: f32 = 1.5;
/// Bullet collision radius
pub const BULLET_RADIUS: f32 = 4.0;

/// Weapon stats per archetype
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Damage per bullet
    pub damage: f32,
    /// Bullet speed (units per second)
    pub projectile_speed: f32,
    /// Seconds between shots
    pub fire_interval: f32,
    /// Distance budget of each bullet
    pub range: f32,
    /// Maximum angular deviation either side (radians)
    pub spread: f32,
    /// Bullets per trigger pull
    pub pellets: u32,
    /// Rounds per clip
    pub clip_size: u32,
    /// Seconds to refill an empty clip
    pub reload_time: f32,
}

impl WeaponStats {
    pub fn for_type(weapon: WeaponType) -> Self {
        match weapon {
            WeaponType::Pistol => Self {
                damage: 14.0,
                projectile_speed: 900.0,
                fire_interval: 0.35,
                range: 700.0,
                spread: 0.03,
                pellets: 1,
                clip_size: 12,
                reload_time: 1.2,
            },
            WeaponType::Smg => Self {
                damage: 8.0,
                projectile_speed: 950.0,
                fire_interval: 0.08,
                range: 550.0,
                spread: 0.09,
                pellets: 1,
                clip_size: 30,
                reload_time: 1.6,
            },
            WeaponType::Rifle => Self {
                damage: 16.0,
                projectile_speed: 1100.0,
                fire_interval: 0.14,
                range: 900.0,
                spread: 0.04,
                pellets: 1,
                clip_size: 24,
                reload_time: 2.0,
            },
            WeaponType::Shotgun => Self {
                damage: 9.0,
                projectile_speed: 800.0,
                fire_interval: 0.8,
                range: 350.0,
                spread: 0.22,
                pellets: 6,
                clip_size: 6,
                reload_time: 2.2,
            },
            WeaponType::Sniper => Self {
                damage: 70.0,
                projectile_speed: 1600.0,
                fire_interval: 1.4,
                range: 1600.0,
                spread: 0.0,
                pellets: 1,
                clip_size: 4,
                reload_time: 2.6,
            },
        }
    }
}

impl Bullet {
    /// Create a bullet leaving `origin` along `direction`
    pub fn new(
        serial: u64,
        owner_id: &str,
        origin: Vector2,
        direction: f32,
        stats: &WeaponStats,
        damage_multiplier: f32,
    ) -> Self {
        Self {
            body: Body::new(format!("b{serial}"), origin, BULLET_RADIUS),
            serial,
            owner_id: owner_id.to_string(),
            velocity: Vector2::from_angle(direction) * stats.projectile_speed,
            damage: stats.damage * damage_multiplier,
            range_remaining: stats.range,
        }
    }

    /// Move one step, returns false once the range budget is spent
    pub fn advance(&mut self, dt: f32) -> bool {
        let step = self.velocity * dt;
        self.body.position += step;
        // A zero-velocity bullet still burns range so it cannot live forever
        let travelled = step.length().max(f32::EPSILON);
        self.range_remaining -= travelled;
        self.range_remaining > 0.0
    }

    /// Check collision with a target circle
    pub fn check_hit(&self, target: &Body) -> bool {
        self.body.overlaps(target)
    }
}

/// Result of applying damage to a player
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageOutcome {
    /// HP actually removed
    pub dealt: f32,
    /// Armor consumed
    pub absorbed: f32,
    pub killed: bool,
}

/// Combat system for managing weapons and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire this tick
    pub fn can_fire(player: &Player) -> bool {
        player.is_alive() && player.fire_cooldown <= 0.0 && player.ammo >= 1 && !player.is_reloading
    }

    /// Update a countdown timer, never going below zero
    pub fn update_cooldown(cooldown: f32, dt: f32) -> f32 {
        (cooldown - dt).max(0.0)
    }

    /// Split incoming damage into (hp damage, armor absorbed)
    pub fn mitigate(damage: f32, armor: f32) -> (f32, f32) {
        let damage = damage.max(0.0);
        let ratio = (armor.max(0.0) * ARMOR_ABSORB_PER_POINT).min(MAX_ARMOR_ABSORB);
        let absorbed = (damage * ratio).min(armor.max(0.0));
        (damage - absorbed, absorbed)
    }

    /// Apply damage through armor and invulnerability. `now` is match time.
    pub fn apply_damage(target: &mut Player, damage: f32, now: f32) -> DamageOutcome {
        if !target.is_alive() || damage <= 0.0 {
            return DamageOutcome::default();
        }
        if target.invulnerable_timer > 0.0 {
            return DamageOutcome::default();
        }

        let (hp_damage, absorbed) = Self::mitigate(damage, target.armor);
        let before = target.hp;
        target.set_armor(target.armor - absorbed);
        target.set_hp(target.hp - hp_damage);
        target.last_damage_at = now;
        target.regen_accumulator = 0.0;

        let dealt = before - target.hp;
        target.stats.damage_taken += dealt;

        DamageOutcome {
            dealt,
            absorbed,
            killed: !target.is_alive(),
        }
    }

    /// Calculate zone damage for one tick
    pub fn zone_damage(damage_per_second: f32, dt: f32) -> f32 {
        damage_per_second * dt
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone)]
pub struct HitResult {
    pub bullet_id: String,
    pub shooter_id: String,
    pub target_id: String,
    pub damage: f32,
}
