//! World entities: a shared identity/position/radius record composed into
//! each concrete kind

use serde::{Deserialize, Serialize};

use super::combat::WeaponStats;
use super::math::Vector2;

/// Collision radius shared by every player
pub const PLAYER_RADIUS: f32 = 20.0;
/// Starting and maximum health
pub const PLAYER_MAX_HP: f32 = 100.0;
/// Armor cap for shield pickups
pub const MAX_ARMOR: f32 = 100.0;
/// Full sprint budget in seconds
pub const SPRINT_BUDGET: f32 = 3.0;

/// Identity, position and collision envelope common to all entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: String,
    pub position: Vector2,
    pub radius: f32,
}

impl Body {
    pub fn new(id: impl Into<String>, position: Vector2, radius: f32) -> Self {
        Self {
            id: id.into(),
            position,
            radius,
        }
    }

    pub fn overlaps(&self, other: &Body) -> bool {
        let reach = self.radius + other.radius;
        self.position.distance_sq(other.position) <= reach * reach
    }
}

/// Weapon archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    /// Starting sidearm
    #[default]
    Pistol,
    /// Fast, low damage
    Smg,
    /// Balanced automatic
    Rifle,
    /// Spread of pellets, short range
    Shotgun,
    /// Slow, long range, heavy
    Sniper,
}

impl WeaponType {
    pub const ALL: [WeaponType; 5] = [
        WeaponType::Pistol,
        WeaponType::Smg,
        WeaponType::Rifle,
        WeaponType::Shotgun,
        WeaponType::Sniper,
    ];

    pub fn stats(self) -> WeaponStats {
        WeaponStats::for_type(self)
    }
}

/// Per-player match statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub kills: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub loot_collected: u32,
}

/// Authoritative player state
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub body: Body,

    // Health
    pub hp: f32,
    pub max_hp: f32,
    pub armor: f32,

    // Movement
    pub velocity: Vector2,
    pub angle: f32,
    pub speed_multiplier: f32,

    // Weapon
    pub weapon: WeaponType,
    pub ammo: u32,
    pub is_reloading: bool,
    pub reload_timer: f32,
    pub fire_cooldown: f32,

    // Abilities
    pub sprint_time: f32,
    pub sprint_cooldown: f32,
    pub dash_timer: f32,
    pub dash_cooldown: f32,
    pub dash_direction: Vector2,

    // Status effects (seconds remaining)
    pub invulnerable_timer: f32,
    pub slow_magnitude: f32,
    pub slow_timer: f32,
    pub speed_boost_timer: f32,
    pub damage_boost_timer: f32,

    // Regeneration
    pub last_damage_at: f32,
    pub regen_accumulator: f32,

    pub is_bot: bool,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: impl Into<String>, position: Vector2, is_bot: bool) -> Self {
        let weapon = WeaponType::default();
        Self {
            body: Body::new(id, position, PLAYER_RADIUS),
            hp: PLAYER_MAX_HP,
            max_hp: PLAYER_MAX_HP,
            armor: 0.0,
            velocity: Vector2::ZERO,
            angle: 0.0,
            speed_multiplier: 1.0,
            weapon,
            ammo: weapon.stats().clip_size,
            is_reloading: false,
            reload_timer: 0.0,
            fire_cooldown: 0.0,
            sprint_time: SPRINT_BUDGET,
            sprint_cooldown: 0.0,
            dash_timer: 0.0,
            dash_cooldown: 0.0,
            dash_direction: Vector2::ZERO,
            invulnerable_timer: 0.0,
            slow_magnitude: 0.0,
            slow_timer: 0.0,
            speed_boost_timer: 0.0,
            damage_boost_timer: 0.0,
            last_damage_at: f32::NEG_INFINITY,
            regen_accumulator: 0.0,
            is_bot,
            stats: PlayerStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.body.id
    }

    pub fn position(&self) -> Vector2 {
        self.body.position
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Set health, clamped to `[0, max_hp]`
    pub fn set_hp(&mut self, hp: f32) {
        self.hp = if hp.is_finite() {
            hp.clamp(0.0, self.max_hp)
        } else {
            0.0
        };
    }

    /// Set armor, clamped to `[0, MAX_ARMOR]`
    pub fn set_armor(&mut self, armor: f32) {
        self.armor = if armor.is_finite() {
            armor.clamp(0.0, MAX_ARMOR)
        } else {
            0.0
        };
    }

    /// Swap weapon and refill the clip for it
    pub fn equip(&mut self, weapon: WeaponType) {
        self.weapon = weapon;
        self.ammo = weapon.stats().clip_size;
        self.is_reloading = false;
        self.reload_timer = 0.0;
        self.fire_cooldown = 0.0;
    }
}

/// A projectile in flight
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub body: Body,
    /// Creation order, strictly increasing per match
    pub serial: u64,
    pub owner_id: String,
    pub velocity: Vector2,
    pub damage: f32,
    pub range_remaining: f32,
}

/// Loot kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootKind {
    Medkit,
    Shield,
    Ammo,
    Weapon,
    SlowTrap,
    SpeedBoost,
    DamageBoost,
    Invulnerability,
}

/// Slow trap parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    /// Fraction of speed removed (0.4 = 40% slower)
    pub magnitude: f32,
    /// Seconds
    pub duration: f32,
}

/// Pickup lying on the floor
#[derive(Debug, Clone, PartialEq)]
pub struct LootItem {
    pub body: Body,
    pub kind: LootKind,
    pub weapon: Option<WeaponType>,
    /// HP, armor, ammo or effect seconds depending on kind
    pub value: f32,
    pub slow: Option<SlowEffect>,
}

/// Static obstacle: axis-aligned rectangle or circle centered on `position`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wall {
    #[serde(flatten)]
    pub body: Body,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub is_circular: bool,
}

impl Wall {
    pub fn rect(id: impl Into<String>, center: Vector2, width: f32, height: f32) -> Self {
        let radius = 0.5 * (width * width + height * height).sqrt();
        Self {
            body: Body::new(id, center, radius),
            width,
            height,
            is_circular: false,
        }
    }

    pub fn circle(id: impl Into<String>, center: Vector2, radius: f32) -> Self {
        Self {
            body: Body::new(id, center, radius),
            width: radius * 2.0,
            height: radius * 2.0,
            is_circular: true,
        }
    }

    pub fn center(&self) -> Vector2 {
        self.body.position
    }

    /// Closest point on (or inside) the wall to `point`
    pub fn closest_point(&self, point: Vector2) -> Vector2 {
        let c = self.center();
        if self.is_circular {
            let offset = point - c;
            if offset.length() <= self.body.radius {
                point
            } else {
                c + offset.normalized() * self.body.radius
            }
        } else {
            let hw = self.width * 0.5;
            let hh = self.height * 0.5;
            Vector2::new(
                point.x.clamp(c.x - hw, c.x + hw),
                point.y.clamp(c.y - hh, c.y + hh),
            )
        }
    }

    /// Whether a circle at `center` with `radius` overlaps this wall
    pub fn intersects_circle(&self, center: Vector2, radius: f32) -> bool {
        if self.is_circular {
            let reach = self.body.radius + radius;
            self.center().distance_sq(center) < reach * reach
        } else {
            self.closest_point(center).distance_sq(center) < radius * radius
        }
    }
}
