//! Compact wire form of `State`
//!
//! Positions go out as integer world units, velocities with one decimal and
//! angles with two. Any field sitting at its semantic default is left out
//! and restored by the decoder, so an absent field always means "default",
//! never "unknown".

use serde::{Deserialize, Serialize};

use crate::game::entity::{
    Body, Bullet, LootItem, LootKind, Player, SlowEffect, WeaponType, PLAYER_MAX_HP,
    PLAYER_RADIUS, SPRINT_BUDGET,
};
use crate::game::combat::BULLET_RADIUS;
use crate::game::loot::LOOT_RADIUS;
use crate::game::math::{round_to, Vector2};

use super::messages::StatePackage;

/// Most recently created bullets kept on the wire
pub const MAX_WIRE_BULLETS: usize = 50;

/// Integer position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: i32,
    pub y: i32,
}

impl From<Vector2> for WirePoint {
    fn from(v: Vector2) -> Self {
        let v = v.sanitized();
        Self {
            x: v.x.round() as i32,
            y: v.y.round() as i32,
        }
    }
}

impl From<WirePoint> for Vector2 {
    fn from(p: WirePoint) -> Self {
        Vector2::new(p.x as f32, p.y as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlayer {
    pub id: String,
    pub position: WirePoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vector2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    pub hp: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponType>,
    pub ammo: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_reloading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_timer: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_cooldown: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_time: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_cooldown: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_timer: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_cooldown: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invulnerable_timer: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_magnitude: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_timer: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_boost_timer: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_boost_timer: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_multiplier: Option<f32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBullet {
    pub id: String,
    pub owner_id: String,
    pub position: WirePoint,
    pub velocity: Vector2,
    pub damage: f32,
    pub range_remaining: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLoot {
    pub id: String,
    pub position: WirePoint,
    pub kind: LootKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<SlowEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireState {
    pub players: Vec<WirePlayer>,
    #[serde(default)]
    pub bullets: Vec<WireBullet>,
    #[serde(default)]
    pub loot: Vec<WireLoot>,
    pub zone_radius: f32,
    pub time_remaining: f32,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Some(rounded) when the rounded value is strictly positive
fn positive(value: f32, decimals: i32) -> Option<f32> {
    let rounded = round_to(value, decimals);
    (rounded > 0.0).then_some(rounded)
}

/// Some(rounded) unless it rounds to `default`
fn unless_default(value: f32, default: f32, decimals: i32) -> Option<f32> {
    let rounded = round_to(value, decimals);
    (rounded != default).then_some(rounded)
}

fn quantize_velocity(v: Vector2) -> Vector2 {
    let v = v.sanitized();
    Vector2::new(round_to(v.x, 1), round_to(v.y, 1))
}

impl From<&Player> for WirePlayer {
    fn from(p: &Player) -> Self {
        let velocity = quantize_velocity(p.velocity);
        Self {
            id: p.body.id.clone(),
            position: p.body.position.into(),
            velocity: (velocity != Vector2::ZERO).then_some(velocity),
            angle: unless_default(p.angle, 0.0, 2),
            radius: unless_default(p.body.radius, PLAYER_RADIUS, 1),
            hp: round_to(p.hp, 1),
            max_hp: unless_default(p.max_hp, PLAYER_MAX_HP, 1),
            armor: positive(p.armor, 1),
            weapon: (p.weapon != WeaponType::default()).then_some(p.weapon),
            ammo: p.ammo,
            is_reloading: p.is_reloading,
            reload_timer: positive(p.reload_timer, 2),
            fire_cooldown: positive(p.fire_cooldown, 2),
            sprint_time: unless_default(p.sprint_time, SPRINT_BUDGET, 2),
            sprint_cooldown: positive(p.sprint_cooldown, 2),
            dash_timer: positive(p.dash_timer, 2),
            dash_cooldown: positive(p.dash_cooldown, 2),
            invulnerable_timer: positive(p.invulnerable_timer, 2),
            slow_magnitude: positive(p.slow_magnitude, 2),
            slow_timer: positive(p.slow_timer, 2),
            speed_boost_timer: positive(p.speed_boost_timer, 2),
            damage_boost_timer: positive(p.damage_boost_timer, 2),
            speed_multiplier: unless_default(p.speed_multiplier, 1.0, 2),
            is_bot: p.is_bot,
        }
    }
}

impl From<WirePlayer> for Player {
    fn from(w: WirePlayer) -> Self {
        let mut p = Player::new(w.id, w.position.into(), w.is_bot);
        p.body.radius = w.radius.unwrap_or(PLAYER_RADIUS);
        p.velocity = w.velocity.unwrap_or(Vector2::ZERO);
        p.angle = w.angle.unwrap_or(0.0);
        p.max_hp = w.max_hp.unwrap_or(PLAYER_MAX_HP);
        p.set_hp(w.hp);
        p.set_armor(w.armor.unwrap_or(0.0));
        p.weapon = w.weapon.unwrap_or_default();
        p.ammo = w.ammo;
        p.is_reloading = w.is_reloading;
        p.reload_timer = w.reload_timer.unwrap_or(0.0);
        p.fire_cooldown = w.fire_cooldown.unwrap_or(0.0);
        p.sprint_time = w.sprint_time.unwrap_or(SPRINT_BUDGET);
        p.sprint_cooldown = w.sprint_cooldown.unwrap_or(0.0);
        p.dash_timer = w.dash_timer.unwrap_or(0.0);
        p.dash_cooldown = w.dash_cooldown.unwrap_or(0.0);
        p.invulnerable_timer = w.invulnerable_timer.unwrap_or(0.0);
        p.slow_magnitude = w.slow_magnitude.unwrap_or(0.0);
        p.slow_timer = w.slow_timer.unwrap_or(0.0);
        p.speed_boost_timer = w.speed_boost_timer.unwrap_or(0.0);
        p.damage_boost_timer = w.damage_boost_timer.unwrap_or(0.0);
        p.speed_multiplier = w.speed_multiplier.unwrap_or(1.0);
        p
    }
}

impl From<&Bullet> for WireBullet {
    fn from(b: &Bullet) -> Self {
        Self {
            id: b.body.id.clone(),
            owner_id: b.owner_id.clone(),
            position: b.body.position.into(),
            velocity: quantize_velocity(b.velocity),
            damage: round_to(b.damage, 1),
            range_remaining: round_to(b.range_remaining.max(0.0), 0),
        }
    }
}

impl WireBullet {
    fn into_bullet(self, fallback_serial: u64) -> Bullet {
        let serial = self
            .id
            .strip_prefix('b')
            .and_then(|n| n.parse().ok())
            .unwrap_or(fallback_serial);
        Bullet {
            body: Body::new(self.id, self.position.into(), BULLET_RADIUS),
            serial,
            owner_id: self.owner_id,
            velocity: self.velocity,
            damage: self.damage,
            range_remaining: self.range_remaining,
        }
    }
}

impl From<&LootItem> for WireLoot {
    fn from(item: &LootItem) -> Self {
        Self {
            id: item.body.id.clone(),
            position: item.body.position.into(),
            kind: item.kind,
            weapon: item.weapon,
            value: positive(item.value, 1),
            slow: item.slow,
        }
    }
}

impl From<WireLoot> for LootItem {
    fn from(w: WireLoot) -> Self {
        Self {
            body: Body::new(w.id, w.position.into(), LOOT_RADIUS),
            kind: w.kind,
            weapon: w.weapon,
            value: w.value.unwrap_or(0.0),
            slow: w.slow,
        }
    }
}

/// Apply quantization, default omission and the bullet cap
pub fn compact_state(state: &StatePackage, bullet_cap: usize) -> WireState {
    let mut bullets: Vec<&Bullet> = state.bullets.iter().collect();
    bullets.sort_by_key(|b| b.serial);
    let skip = bullets.len().saturating_sub(bullet_cap);

    WireState {
        players: state.players.iter().map(WirePlayer::from).collect(),
        bullets: bullets[skip..].iter().map(|b| WireBullet::from(*b)).collect(),
        loot: state.loot.iter().map(WireLoot::from).collect(),
        zone_radius: round_to(state.zone_radius, 1),
        time_remaining: round_to(state.time_remaining.max(0.0), 1),
    }
}

/// Rebuild a full state, filling every absent field with its default
pub fn expand_state(wire: WireState) -> StatePackage {
    StatePackage {
        players: wire.players.into_iter().map(Player::from).collect(),
        bullets: wire
            .bullets
            .into_iter()
            .enumerate()
            .map(|(i, b)| b.into_bullet(i as u64))
            .collect(),
        loot: wire.loot.into_iter().map(LootItem::from).collect(),
        zone_radius: wire.zone_radius,
        time_remaining: wire.time_remaining,
    }
}
