//! Loot spawning and pickup effects

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::entity::{Body, LootItem, LootKind, Player, SlowEffect, Wall, WeaponType};
use super::math::Vector2;

pub const LOOT_RADIUS: f32 = 16.0;
/// Items on the floor at match start
pub const INITIAL_LOOT: usize = 10;
/// Never more than this many items on the floor
pub const MAX_LOOT: usize = 14;
/// Seconds between respawns
pub const LOOT_RESPAWN_INTERVAL: f32 = 12.0;
/// Ammo pickups can overfill the clip up to this many clips
pub const MAX_AMMO_CLIPS: u32 = 2;

const MEDKIT_HP: f32 = 40.0;
const SHIELD_ARMOR: f32 = 50.0;
const AMMO_ROUNDS: f32 = 15.0;
const SPEED_BOOST_SECS: f32 = 8.0;
const DAMAGE_BOOST_SECS: f32 = 8.0;
const INVULNERABILITY_SECS: f32 = 3.0;
const TRAP_SLOW: SlowEffect = SlowEffect {
    magnitude: 0.5,
    duration: 3.0,
};

/// Spawn weights, summed for the roll
const LOOT_TABLE: [(LootKind, u32); 8] = [
    (LootKind::Medkit, 22),
    (LootKind::Shield, 16),
    (LootKind::Ammo, 20),
    (LootKind::Weapon, 16),
    (LootKind::SlowTrap, 10),
    (LootKind::SpeedBoost, 6),
    (LootKind::DamageBoost, 6),
    (LootKind::Invulnerability, 4),
];

impl LootItem {
    /// Build an item of `kind` with its standard value
    pub fn new(id: impl Into<String>, position: Vector2, kind: LootKind, weapon: Option<WeaponType>) -> Self {
        let (value, slow) = match kind {
            LootKind::Medkit => (MEDKIT_HP, None),
            LootKind::Shield => (SHIELD_ARMOR, None),
            LootKind::Ammo => (AMMO_ROUNDS, None),
            LootKind::Weapon => (0.0, None),
            LootKind::SlowTrap => (0.0, Some(TRAP_SLOW)),
            LootKind::SpeedBoost => (SPEED_BOOST_SECS, None),
            LootKind::DamageBoost => (DAMAGE_BOOST_SECS, None),
            LootKind::Invulnerability => (INVULNERABILITY_SECS, None),
        };
        let weapon = if kind == LootKind::Weapon {
            Some(weapon.unwrap_or(WeaponType::Rifle))
        } else {
            None
        };
        Self {
            body: Body::new(id, position, LOOT_RADIUS),
            kind,
            weapon,
            value,
            slow,
        }
    }
}

/// Loot system for pickups
pub struct LootSystem;

impl LootSystem {
    /// Apply an item's effect to the player who walked over it
    pub fn apply(player: &mut Player, item: &LootItem) {
        match item.kind {
            LootKind::Medkit => player.set_hp(player.hp + item.value),
            LootKind::Shield => player.set_armor(player.armor + item.value),
            LootKind::Ammo => {
                let cap = player.weapon.stats().clip_size * MAX_AMMO_CLIPS;
                let added = item.value.max(0.0) as u32;
                player.ammo = player.ammo.saturating_add(added).min(cap);
                if player.is_reloading && player.ammo > 0 {
                    player.is_reloading = false;
                    player.reload_timer = 0.0;
                }
            }
            LootKind::Weapon => {
                if let Some(weapon) = item.weapon {
                    player.equip(weapon);
                }
            }
            LootKind::SlowTrap => {
                let slow = item.slow.unwrap_or(TRAP_SLOW);
                player.slow_magnitude = slow.magnitude.clamp(0.0, 1.0);
                player.slow_timer = slow.duration.max(0.0);
            }
            LootKind::SpeedBoost => player.speed_boost_timer = item.value.max(0.0),
            LootKind::DamageBoost => player.damage_boost_timer = item.value.max(0.0),
            LootKind::Invulnerability => player.invulnerable_timer = item.value.max(0.0),
        }
        player.stats.loot_collected += 1;
    }

    /// Roll a kind from the weighted table
    pub fn roll_kind(rng: &mut ChaCha8Rng) -> LootKind {
        let total: u32 = LOOT_TABLE.iter().map(|(_, w)| w).sum();
        let mut roll = rng.gen_range(0..total);
        for (kind, weight) in LOOT_TABLE {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        LootKind::Medkit
    }

    /// Roll an upgrade weapon (never the starting pistol)
    pub fn roll_weapon(rng: &mut ChaCha8Rng) -> WeaponType {
        let choices = &WeaponType::ALL[1..];
        choices[rng.gen_range(0..choices.len())]
    }

    /// Find a free floor position, or None after `attempts` misses
    pub fn find_spot(
        rng: &mut ChaCha8Rng,
        min: Vector2,
        max: Vector2,
        walls: &[Wall],
        occupied: &[Vector2],
        attempts: usize,
    ) -> Option<Vector2> {
        for _ in 0..attempts {
            let candidate = Vector2::new(rng.gen_range(min.x..max.x), rng.gen_range(min.y..max.y));
            let blocked = walls
                .iter()
                .any(|w| w.intersects_circle(candidate, LOOT_RADIUS * 2.0));
            let crowded = occupied
                .iter()
                .any(|p| p.distance_sq(candidate) < (LOOT_RADIUS * 4.0).powi(2));
            if !blocked && !crowded {
                return Some(candidate);
            }
        }
        None
    }
}
