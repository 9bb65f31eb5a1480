use std::env;

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tile_arena_sim::{
    Aabb, AttackType, BodyHandle, BodyKind, Combat, PickupEffect, Result, Scene, SimConfig, spawn,
};

const ROOM: Aabb = Aabb::new(0.0, 0.0, 640.0, 480.0);
const FRAMES: usize = 1800;
const FRAME_DT: f64 = 1.0 / 60.0;
const BULLET_SPEED: f64 = 240.0;
const ENEMY_COUNT: usize = 6;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match env::args().nth(1) {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut scene = Scene::new(config.clone())?;

    scene.add_tiles(border(config.tile_size), true)?;

    let player = scene.add_body(spawn::player(
        ROOM.center(),
        DVec2::splat(10.0),
        Combat::new(20.0, 5.0)
            .with_cooldown(0.3)
            .with_invulnerability(0.5)
            .with_speed(300.0)
            .with_attack_type(AttackType::Radial),
    )?);

    let inner = Aabb::new(
        ROOM.x + config.tile_size,
        ROOM.y + config.tile_size,
        ROOM.width - 2.0 * config.tile_size,
        ROOM.height - 2.0 * config.tile_size,
    );

    let mut enemies = Vec::new();
    for position in spawn::scatter(&mut rng, inner, ENEMY_COUNT, DVec2::splat(12.0)) {
        let combat = Combat::new(10.0, 2.0).with_cooldown(rng.gen_range(0.8..1.6));
        enemies.push(scene.add_body(spawn::enemy(position, DVec2::splat(12.0), combat)?));
    }

    for position in spawn::scatter(&mut rng, inner, 2, DVec2::splat(6.0)) {
        scene.add_body(spawn::pickup(position, DVec2::splat(6.0), PickupEffect::Heal(5.0))?);
    }

    info!(bodies = scene.len(), "room loaded");

    for frame in 0..FRAMES {
        enemies.retain(|enemy| scene.contains(*enemy));
        if enemies.is_empty() {
            info!(frame, "room cleared");
            break;
        }

        shoot(&mut scene, player, &enemies, &config);

        let report = scene.tick(config.clamp_dt(FRAME_DT));
        for removed in report.removed_of_kind(BodyKind::Enemy) {
            info!(frame, id = removed.id, "enemy down");
        }

        if report.was_removed(player) {
            warn!(frame, "player died");
            break;
        }
    }

    let health = scene
        .stats(player)
        .and_then(|stats| stats.combat)
        .map(|combat| combat.health);
    info!(?health, enemies = enemies.len(), bodies = scene.len(), "simulation finished");

    Ok(())
}

/// Everyone with a clear reload takes a shot: enemies at the player and the
/// player at the closest enemy.
fn shoot(scene: &mut Scene, player: BodyHandle, enemies: &[BodyHandle], config: &SimConfig) {
    let Some(target) = scene.body(player) else {
        return;
    };

    let mut shots = Vec::new();
    for enemy in enemies {
        let Some(direction) = scene.body(*enemy).map(|body| spawn::aim(&body, &target)) else {
            continue;
        };

        if let Some(Some(shot)) = scene.with_body_mut(*enemy, |body| {
            spawn::fire(body, direction, BULLET_SPEED, &config.bullet)
        }) {
            shots.push(shot);
        }
    }

    let closest = enemies
        .iter()
        .filter_map(|enemy| scene.body(*enemy))
        .min_by(|a, b| {
            let da = a.position().distance_squared(target.position());
            let db = b.position().distance_squared(target.position());
            da.total_cmp(&db)
        });

    if let Some(closest) = closest {
        let direction = spawn::aim(&target, &closest);
        if let Some(Some(shot)) = scene.with_body_mut(player, |body| {
            spawn::fire(body, direction, BULLET_SPEED, &config.bullet)
        }) {
            shots.push(shot);
        }
    }

    for shot in shots {
        scene.add_body(shot);
    }
}

/// Solid tiles along the room's edges.
fn border(tile_size: f64) -> Vec<Aabb> {
    let columns = (ROOM.width / tile_size).ceil() as usize;
    let rows = (ROOM.height / tile_size).ceil() as usize;

    let mut tiles = Vec::new();
    for column in 0..columns {
        let x = ROOM.x + column as f64 * tile_size;
        tiles.push(Aabb::new(x, ROOM.y, tile_size, tile_size));
        tiles.push(Aabb::new(x, ROOM.y + ROOM.height - tile_size, tile_size, tile_size));
    }

    for row in 1..rows.saturating_sub(1) {
        let y = ROOM.y + row as f64 * tile_size;
        tiles.push(Aabb::new(ROOM.x, y, tile_size, tile_size));
        tiles.push(Aabb::new(ROOM.x + ROOM.width - tile_size, y, tile_size, tile_size));
    }

    tiles
}
