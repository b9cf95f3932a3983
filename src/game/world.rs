//! Authoritative world state and the fixed tick
//!
//! One `World` per match, owned by the host's tick task. Every mutation goes
//! through [`World::tick`] (or [`World::forfeit`]), so nothing needs a lock.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::mapgen::{MapLayout, MAP_HEIGHT, MAP_WIDTH};
use crate::protocol::{GameOverPackage, GameOverReason, InitPackage, PlayerSummary, StatePackage};
use crate::util::time::tick_delta;

use super::combat::{CombatSystem, HitResult, BULLET_RADIUS, DAMAGE_BOOST_MULTIPLIER};
use super::entity::{Bullet, LootItem, LootKind, Player, Wall};
use super::input::{InputBuffer, TickInput};
use super::loot::{LootSystem, INITIAL_LOOT, LOOT_RESPAWN_INTERVAL, MAX_LOOT};
use super::math::Vector2;
use super::physics::{Bounds, PhysicsSystem};
use super::zone::{Zone, ZoneConfig};

pub const HOST_ID: &str = "host";
pub const GUEST_ID: &str = "guest";
pub const BOT_ID: &str = "bot";

/// Default match length in seconds
pub const DEFAULT_MATCH_SECS: f32 = 180.0;
/// Seconds without damage before regeneration starts
pub const REGEN_GRACE: f32 = 5.0;
/// HP regenerated per second once the grace period has passed
pub const REGEN_RATE: f32 = 5.0;

/// Keeps loot away from the boundary walls
const LOOT_MARGIN: f32 = 120.0;
const LOOT_SPOT_ATTEMPTS: usize = 30;
/// Offsets the loot RNG stream from the map generator's
const LOOT_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    InProgress,
    Ended,
}

/// Match setup
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub match_secs: f32,
    /// The second participant is driven by a local bot instead of a peer
    pub guest_is_bot: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            match_secs: DEFAULT_MATCH_SECS,
            guest_is_bot: false,
        }
    }
}

/// Authoritative world
pub struct World {
    pub seed: u64,
    pub phase: MatchPhase,
    pub tick: u64,
    /// Seconds of simulated match time
    pub clock: f32,
    pub match_secs: f32,
    /// Index 0 is always the host
    pub players: Vec<Player>,
    pub bullets: Vec<Bullet>,
    pub loot: Vec<LootItem>,
    pub walls: Vec<Wall>,
    pub bounds: Bounds,
    pub zone: Zone,
    spawns: (Vector2, Vector2),
    rng: ChaCha8Rng,
    next_bullet_serial: u64,
    next_loot_id: u64,
    loot_timer: f32,
}

impl World {
    pub fn new(layout: &MapLayout, config: WorldConfig) -> Self {
        let (host_spawn, guest_spawn) = layout.spawn_points();
        let guest_id = if config.guest_is_bot { BOT_ID } else { GUEST_ID };

        let center = Vector2::new(MAP_WIDTH / 2.0, MAP_HEIGHT / 2.0);
        let half_extent = center.length();

        let mut world = Self {
            seed: layout.seed,
            phase: MatchPhase::InProgress,
            tick: 0,
            clock: 0.0,
            match_secs: config.match_secs.max(tick_delta()),
            players: vec![
                Player::new(HOST_ID, host_spawn, false),
                Player::new(guest_id, guest_spawn, config.guest_is_bot),
            ],
            bullets: Vec::new(),
            loot: Vec::new(),
            walls: layout.walls.clone(),
            bounds: Bounds::new(MAP_WIDTH, MAP_HEIGHT),
            zone: Zone::new(center, ZoneConfig::for_map(half_extent)),
            spawns: (host_spawn, guest_spawn),
            rng: ChaCha8Rng::seed_from_u64(layout.seed ^ LOOT_STREAM),
            next_bullet_serial: 1,
            next_loot_id: 0,
            loot_timer: LOOT_RESPAWN_INTERVAL,
        };

        for _ in 0..INITIAL_LOOT {
            world.spawn_loot();
        }

        info!(
            seed = layout.seed,
            archetype = %layout.archetype,
            walls = world.walls.len(),
            loot = world.loot.len(),
            "World created"
        );

        world
    }

    /// Bootstrap payload for the peer
    pub fn init_package(&self) -> InitPackage {
        InitPackage {
            walls: self.walls.clone(),
            player_start: self.spawns.0,
            enemy_start: self.spawns.1,
            seed: self.seed,
        }
    }

    /// Full state for the codec
    pub fn snapshot(&self) -> StatePackage {
        StatePackage {
            players: self.players.clone(),
            bullets: self.bullets.clone(),
            loot: self.loot.clone(),
            zone_radius: self.zone.radius,
            time_remaining: self.time_remaining(),
        }
    }

    pub fn time_remaining(&self) -> f32 {
        (self.match_secs - self.clock).max(0.0)
    }

    pub fn is_over(&self) -> bool {
        self.phase == MatchPhase::Ended
    }

    pub fn host(&self) -> &Player {
        &self.players[0]
    }

    pub fn guest(&self) -> &Player {
        &self.players[1]
    }

    /// Advance the world by one fixed tick. Returns the outcome on the tick the
    /// match ends; after that the world no longer changes.
    pub fn tick(&mut self, inputs: &InputBuffer) -> Option<GameOverPackage> {
        if self.is_over() {
            return None;
        }

        let dt = tick_delta();
        self.tick += 1;
        self.clock += dt;

        let frame: Vec<TickInput> = self.players.iter().map(|p| inputs.get(p.id())).collect();

        self.update_movement(&frame, dt);
        self.resolve_collisions();
        self.update_combat(&frame, dt);
        self.update_loot(dt);
        self.update_regen(dt);
        self.update_zone(dt);
        self.check_termination()
    }

    /// End the match because `leaver_id` left
    pub fn forfeit(&mut self, leaver_id: &str) -> Option<GameOverPackage> {
        if self.is_over() {
            return None;
        }
        let winner = self
            .players
            .iter()
            .find(|p| p.id() != leaver_id)
            .map(|p| p.id().to_string());
        Some(self.finish(winner, Some(leaver_id.to_string()), GameOverReason::Forfeit))
    }

    fn update_movement(&mut self, frame: &[TickInput], dt: f32) {
        for (player, input) in self.players.iter_mut().zip(frame) {
            if !player.is_alive() {
                player.velocity = Vector2::ZERO;
                continue;
            }
            tick_status_effects(player, dt);
            PhysicsSystem::move_player(player, input, dt);
        }
    }

    fn resolve_collisions(&mut self) {
        for player in self.players.iter_mut().filter(|p| p.is_alive()) {
            PhysicsSystem::resolve_player_walls(player, &self.walls, &self.bounds);
        }

        if let [a, b] = self.players.as_mut_slice() {
            if a.is_alive()
                && b.is_alive()
                && PhysicsSystem::check_player_collision(
                    a.position(),
                    a.body.radius,
                    b.position(),
                    b.body.radius,
                )
            {
                let (pa, pb) = PhysicsSystem::resolve_player_collision(
                    a.position(),
                    a.body.radius,
                    b.position(),
                    b.body.radius,
                );
                a.body.position = pa;
                b.body.position = pb;
                PhysicsSystem::resolve_player_walls(a, &self.walls, &self.bounds);
                PhysicsSystem::resolve_player_walls(b, &self.walls, &self.bounds);
            }
        }
    }

    fn update_combat(&mut self, frame: &[TickInput], dt: f32) {
        // Fire and reload
        for (player, input) in self.players.iter_mut().zip(frame) {
            if !player.is_alive() {
                continue;
            }
            player.fire_cooldown = CombatSystem::update_cooldown(player.fire_cooldown, dt);

            if player.is_reloading {
                player.reload_timer -= dt;
                if player.reload_timer <= 0.0 {
                    player.is_reloading = false;
                    player.reload_timer = 0.0;
                    player.ammo = player.weapon.stats().clip_size;
                }
            }

            if input.fire && CombatSystem::can_fire(player) {
                let stats = player.weapon.stats();
                let multiplier = if player.damage_boost_timer > 0.0 {
                    DAMAGE_BOOST_MULTIPLIER
                } else {
                    1.0
                };
                let muzzle = player.position()
                    + Vector2::from_angle(player.angle) * (player.body.radius + BULLET_RADIUS + 1.0);

                for _ in 0..stats.pellets {
                    let deviation = if stats.spread > 0.0 {
                        self.rng.gen_range(-stats.spread..=stats.spread)
                    } else {
                        0.0
                    };
                    let bullet = Bullet::new(
                        self.next_bullet_serial,
                        player.id(),
                        muzzle,
                        player.angle + deviation,
                        &stats,
                        multiplier,
                    );
                    self.next_bullet_serial += 1;
                    self.bullets.push(bullet);
                }

                player.ammo = player.ammo.saturating_sub(1);
                player.fire_cooldown = stats.fire_interval;
                player.stats.shots_fired += 1;
            }

            if player.ammo == 0 && !player.is_reloading {
                player.is_reloading = true;
                player.reload_timer = player.weapon.stats().reload_time;
            }
        }

        // Advance bullets
        let walls = &self.walls;
        let players = &self.players;
        let bounds = self.bounds;
        let mut hits: Vec<HitResult> = Vec::new();

        self.bullets.retain_mut(|bullet| {
            if !bullet.advance(dt) {
                return false;
            }
            let pos = bullet.body.position;
            if pos.x < bounds.min.x || pos.y < bounds.min.y || pos.x > bounds.max.x || pos.y > bounds.max.y {
                return false;
            }
            if walls.iter().any(|w| w.intersects_circle(pos, bullet.body.radius)) {
                return false;
            }
            let target = players
                .iter()
                .find(|p| p.is_alive() && p.id() != bullet.owner_id && bullet.check_hit(&p.body));
            if let Some(target) = target {
                hits.push(HitResult {
                    bullet_id: bullet.body.id.clone(),
                    shooter_id: bullet.owner_id.clone(),
                    target_id: target.id().to_string(),
                    damage: bullet.damage,
                });
                return false;
            }
            true
        });

        // Apply damage from hits
        let now = self.clock;
        for hit in hits {
            let Some(target) = self.players.iter_mut().find(|p| p.id() == hit.target_id) else {
                continue;
            };
            let outcome = CombatSystem::apply_damage(target, hit.damage, now);

            // Hits on an already-dead or invulnerable target don't count
            let landed = outcome.dealt > 0.0 || outcome.absorbed > 0.0;
            if let Some(shooter) = self
                .players
                .iter_mut()
                .find(|p| landed && p.id() == hit.shooter_id)
            {
                shooter.stats.shots_hit += 1;
                shooter.stats.damage_dealt += outcome.dealt;
                if outcome.killed {
                    shooter.stats.kills += 1;
                }
            }

            debug!(
                bullet = %hit.bullet_id,
                shooter = %hit.shooter_id,
                target = %hit.target_id,
                dealt = outcome.dealt,
                absorbed = outcome.absorbed,
                killed = outcome.killed,
                "Bullet hit"
            );
        }
    }

    fn update_loot(&mut self, dt: f32) {
        let players = &mut self.players;
        self.loot.retain(|item| {
            let picker = players
                .iter_mut()
                .find(|p| p.is_alive() && p.body.overlaps(&item.body));
            match picker {
                Some(player) => {
                    LootSystem::apply(player, item);
                    debug!(player = %player.id(), item = %item.body.id, kind = ?item.kind, "Loot picked up");
                    false
                }
                None => true,
            }
        });

        self.loot_timer -= dt;
        if self.loot_timer <= 0.0 {
            self.loot_timer = LOOT_RESPAWN_INTERVAL;
            if self.loot.len() < MAX_LOOT {
                self.spawn_loot();
            }
        }
    }

    fn update_regen(&mut self, dt: f32) {
        let now = self.clock;
        for player in self.players.iter_mut().filter(|p| p.is_alive()) {
            if player.hp >= player.max_hp || now - player.last_damage_at < REGEN_GRACE {
                continue;
            }
            player.regen_accumulator += REGEN_RATE * dt;
            if player.regen_accumulator >= 1.0 {
                let whole = player.regen_accumulator.floor();
                player.set_hp(player.hp + whole);
                player.regen_accumulator -= whole;
            }
        }
    }

    fn update_zone(&mut self, dt: f32) {
        if let Some(started) = self.zone.update(dt) {
            info!(
                phase = started.phase,
                target_radius = started.target_radius,
                "Zone shrinking"
            );
        }

        let damage = CombatSystem::zone_damage(self.zone.damage_per_second, dt);
        let now = self.clock;
        for player in self.players.iter_mut().filter(|p| p.is_alive()) {
            if !self.zone.contains(player.position()) {
                CombatSystem::apply_damage(player, damage, now);
            }
        }
    }

    fn check_termination(&mut self) -> Option<GameOverPackage> {
        let alive: Vec<&Player> = self.players.iter().filter(|p| p.is_alive()).collect();

        if alive.len() <= 1 {
            let winner = alive.first().map(|p| p.id().to_string());
            let loser = self
                .players
                .iter()
                .find(|p| !p.is_alive() && Some(p.id()) != winner.as_deref())
                .map(|p| p.id().to_string());
            // Both down on the same tick is a draw
            let (winner, loser) = if winner.is_none() { (None, None) } else { (winner, loser) };
            return Some(self.finish(winner, loser, GameOverReason::Elimination));
        }

        if self.clock >= self.match_secs {
            let host = &self.players[0];
            let guest = &self.players[1];
            let (winner, loser) = if host.hp > guest.hp {
                (Some(host.id().to_string()), Some(guest.id().to_string()))
            } else if guest.hp > host.hp {
                (Some(guest.id().to_string()), Some(host.id().to_string()))
            } else {
                (None, None)
            };
            return Some(self.finish(winner, loser, GameOverReason::TimeUp));
        }

        None
    }

    fn finish(
        &mut self,
        winner_id: Option<String>,
        loser_id: Option<String>,
        reason: GameOverReason,
    ) -> GameOverPackage {
        self.phase = MatchPhase::Ended;

        let package = GameOverPackage {
            winner_id,
            loser_id,
            reason,
            duration_secs: self.clock,
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id().to_string(),
                    hp: p.hp,
                    stats: p.stats.clone(),
                })
                .collect(),
        };

        info!(
            winner = ?package.winner_id,
            reason = ?package.reason,
            ticks = self.tick,
            duration_secs = self.clock,
            "Match ended"
        );

        package
    }

    fn spawn_loot(&mut self) {
        let kind = LootSystem::roll_kind(&mut self.rng);
        let weapon = (kind == LootKind::Weapon).then(|| LootSystem::roll_weapon(&mut self.rng));

        let occupied: Vec<Vector2> = self
            .loot
            .iter()
            .map(|l| l.body.position)
            .chain(self.players.iter().map(|p| p.position()))
            .collect();
        let min = self.bounds.min + Vector2::new(LOOT_MARGIN, LOOT_MARGIN);
        let max = self.bounds.max - Vector2::new(LOOT_MARGIN, LOOT_MARGIN);

        let Some(spot) =
            LootSystem::find_spot(&mut self.rng, min, max, &self.walls, &occupied, LOOT_SPOT_ATTEMPTS)
        else {
            debug!(kind = ?kind, "No free spot for loot");
            return;
        };

        let id = format!("l{}", self.next_loot_id);
        self.next_loot_id += 1;
        self.loot.push(LootItem::new(id, spot, kind, weapon));
    }
}

/// Count down timed effects; expired slows lose their magnitude
fn tick_status_effects(player: &mut Player, dt: f32) {
    player.invulnerable_timer = CombatSystem::update_cooldown(player.invulnerable_timer, dt);
    player.speed_boost_timer = CombatSystem::update_cooldown(player.speed_boost_timer, dt);
    player.damage_boost_timer = CombatSystem::update_cooldown(player.damage_boost_timer, dt);
    player.slow_timer = CombatSystem::update_cooldown(player.slow_timer, dt);
    if player.slow_timer <= 0.0 {
        player.slow_magnitude = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bot::BotController;
    use crate::game::combat::WeaponStats;
    use crate::game::entity::{WeaponType, PLAYER_MAX_HP};
    use crate::mapgen;
    use crate::util::time::SIMULATION_TPS;
    use std::collections::HashSet;

    fn world(match_secs: f32) -> World {
        let layout = mapgen::generate(2024);
        World::new(
            &layout,
            WorldConfig {
                match_secs,
                guest_is_bot: false,
            },
        )
    }

    /// Boundaries only, no loot
    fn open_world(match_secs: f32) -> World {
        let mut w = world(match_secs);
        w.walls.truncate(4);
        w.loot.clear();
        w
    }

    fn aim_at(from: Vector2, to: Vector2) -> TickInput {
        let aim = (to - from).normalized();
        TickInput {
            aim,
            angle: aim.angle(),
            fire: true,
            ..Default::default()
        }
    }

    #[test]
    fn host_is_index_zero() {
        let w = world(60.0);
        assert_eq!(w.host().id(), HOST_ID);
        assert_eq!(w.guest().id(), GUEST_ID);
        assert_eq!(w.init_package().player_start, w.host().position());
        assert!(w.loot.len() <= INITIAL_LOOT);
    }

    #[test]
    fn overkill_eliminates_on_the_same_tick() {
        let mut w = world(60.0);
        w.loot.clear();
        let target = w.guest().position();
        let stats = WeaponStats::for_type(WeaponType::Sniper);
        let mut bullet = Bullet::new(900, HOST_ID, target, 0.0, &stats, 1.0);
        bullet.damage = 150.0;
        bullet.velocity = Vector2::new(30.0, 0.0);
        w.bullets.push(bullet);

        let over = w.tick(&InputBuffer::new()).expect("match should end");
        assert_eq!(w.guest().hp, 0.0);
        assert_eq!(over.reason, GameOverReason::Elimination);
        assert_eq!(over.winner_id.as_deref(), Some(HOST_ID));
        assert_eq!(over.loser_id.as_deref(), Some(GUEST_ID));
        assert_eq!(w.host().stats.kills, 1);
        assert!(w.is_over());

        // No further ticking once ended
        assert!(w.tick(&InputBuffer::new()).is_none());
        assert_eq!(w.tick, 1);
    }

    #[test]
    fn hits_on_a_dead_target_are_not_counted() {
        let mut w = world(60.0);
        w.loot.clear();
        let target = w.guest().position();
        let stats = WeaponStats::for_type(WeaponType::Sniper);
        for serial in [900, 901] {
            let mut bullet = Bullet::new(serial, HOST_ID, target, 0.0, &stats, 1.0);
            bullet.damage = 150.0;
            bullet.velocity = Vector2::new(30.0, 0.0);
            w.bullets.push(bullet);
        }

        w.tick(&InputBuffer::new()).expect("match should end");
        assert_eq!(w.host().stats.shots_hit, 1);
        assert_eq!(w.host().stats.kills, 1);
        assert_eq!(w.host().stats.damage_dealt, PLAYER_MAX_HP);
    }

    #[test]
    fn bullet_past_its_range_is_gone_after_one_tick() {
        let mut w = world(60.0);
        let origin = Vector2::new(MAP_WIDTH / 2.0, 200.0);
        let stats = WeaponStats::for_type(WeaponType::Pistol);
        let mut bullet = Bullet::new(500, HOST_ID, origin, 0.0, &stats, 1.0);
        bullet.range_remaining = 50.0;
        bullet.velocity = Vector2::new(60.0 * SIMULATION_TPS as f32, 0.0);
        w.bullets.push(bullet);

        w.tick(&InputBuffer::new());
        assert!(w.bullets.iter().all(|b| b.serial != 500));
    }

    #[test]
    fn firing_spawns_bullet_and_spends_ammo() {
        let mut w = open_world(60.0);
        let mut inputs = InputBuffer::new();
        inputs.set(HOST_ID, aim_at(w.host().position(), w.guest().position()));

        w.tick(&inputs);
        assert_eq!(w.bullets.len(), 1);
        assert_eq!(w.host().ammo, WeaponType::Pistol.stats().clip_size - 1);
        assert_eq!(w.host().stats.shots_fired, 1);
        assert_eq!(w.bullets[0].owner_id, HOST_ID);

        // Cooldown blocks the very next tick
        w.tick(&inputs);
        assert_eq!(w.host().stats.shots_fired, 1);
    }

    #[test]
    fn empty_clip_reloads_and_refills() {
        let mut w = open_world(60.0);
        w.players[0].ammo = 1;
        let mut inputs = InputBuffer::new();
        inputs.set(HOST_ID, aim_at(w.host().position(), w.guest().position()));

        w.tick(&inputs);
        assert_eq!(w.host().ammo, 0);
        assert!(w.host().is_reloading);

        let reload_ticks =
            (WeaponType::Pistol.stats().reload_time * SIMULATION_TPS as f32).ceil() as usize + 1;
        inputs.set(HOST_ID, TickInput::default());
        for _ in 0..reload_ticks {
            w.tick(&inputs);
        }
        assert!(!w.host().is_reloading);
        assert_eq!(w.host().ammo, WeaponType::Pistol.stats().clip_size);
    }

    #[test]
    fn regen_waits_for_grace_then_heals() {
        let mut w = open_world(60.0);
        w.players[1].set_hp(50.0);
        w.players[1].last_damage_at = 0.0;
        let inputs = InputBuffer::new();

        let grace_ticks = (REGEN_GRACE * SIMULATION_TPS as f32) as usize - 5;
        for _ in 0..grace_ticks {
            w.tick(&inputs);
        }
        assert_eq!(w.guest().hp, 50.0);

        for _ in 0..(2 * SIMULATION_TPS) {
            w.tick(&inputs);
        }
        assert!(w.guest().hp > 50.0);
        assert!(w.guest().hp <= w.guest().max_hp);
    }

    #[test]
    fn time_up_with_equal_hp_is_a_draw() {
        let mut w = world(1.0);
        let inputs = InputBuffer::new();
        let mut outcome = None;
        for _ in 0..(2 * SIMULATION_TPS) {
            if let Some(over) = w.tick(&inputs) {
                outcome = Some(over);
                break;
            }
        }
        let over = outcome.expect("timer should expire");
        assert_eq!(over.reason, GameOverReason::TimeUp);
        assert_eq!(over.winner_id, None);
        assert_eq!(w.time_remaining(), 0.0);
    }

    #[test]
    fn forfeit_awards_the_other_player() {
        let mut w = world(60.0);
        let over = w.forfeit(GUEST_ID).unwrap();
        assert_eq!(over.reason, GameOverReason::Forfeit);
        assert_eq!(over.winner_id.as_deref(), Some(HOST_ID));
        assert!(w.forfeit(GUEST_ID).is_none());
    }

    #[test]
    fn walking_into_loot_consumes_it() {
        let mut w = open_world(60.0);
        w.players[0].set_hp(40.0);
        w.players[0].last_damage_at = 0.0;
        let pos = w.host().position();
        w.loot.push(LootItem::new("l99", pos, LootKind::Medkit, None));

        w.tick(&InputBuffer::new());
        assert!(w.loot.iter().all(|l| l.body.id != "l99"));
        assert_eq!(w.host().hp, 80.0);
        assert_eq!(w.host().stats.loot_collected, 1);
    }

    #[test]
    fn state_stays_consistent_through_a_bot_match() {
        let layout = mapgen::generate(7);
        let mut w = World::new(
            &layout,
            WorldConfig {
                match_secs: 40.0,
                guest_is_bot: true,
            },
        );
        let mut host_bot = BotController::new();
        let mut guest_bot = BotController::new();
        let dt = tick_delta();
        let mut last_range: std::collections::HashMap<String, f32> = Default::default();

        for _ in 0..(45 * SIMULATION_TPS) {
            let mut inputs = InputBuffer::new();
            let host_input = host_bot.think(&w.players[0], Some(&w.players[1]), dt);
            let guest_input = guest_bot.think(&w.players[1], Some(&w.players[0]), dt);
            inputs.record(HOST_ID, &host_input);
            inputs.record(BOT_ID, &guest_input);

            let ended = w.tick(&inputs).is_some();

            for p in &w.players {
                assert!(p.hp >= 0.0 && p.hp <= p.max_hp, "hp out of range: {}", p.hp);
                assert!(p.armor >= 0.0);
            }

            let ids: HashSet<&str> = w.bullets.iter().map(|b| b.body.id.as_str()).collect();
            assert_eq!(ids.len(), w.bullets.len());
            for b in &w.bullets {
                assert!(b.range_remaining > 0.0);
                if let Some(prev) = last_range.get(&b.body.id) {
                    assert!(b.range_remaining < *prev);
                }
            }
            last_range = w
                .bullets
                .iter()
                .map(|b| (b.body.id.clone(), b.range_remaining))
                .collect();

            if ended {
                break;
            }
        }
        assert!(w.is_over());
    }
}
