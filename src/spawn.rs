//! Factories for the body kinds the game spawns.

use glam::DVec2;
use rand::Rng;
use tracing::{trace, warn};

use crate::components::{Body, BodyKind, Combat, Payload, PickupEffect, Progression};
use crate::config::BulletConfig;
use crate::error::Result;
use crate::math::{Aabb, unit};

pub fn player(position: DVec2, half_extents: DVec2, combat: Combat) -> Result<Body> {
    Ok(Body::new(BodyKind::Player, position, half_extents, 1.0)?
        .with_combat(combat)
        .with_progression(Progression::default()))
}

pub fn enemy(position: DVec2, half_extents: DVec2, combat: Combat) -> Result<Body> {
    Ok(Body::new(BodyKind::Enemy, position, half_extents, 1.0)?.with_combat(combat))
}

pub fn pickup(position: DVec2, half_extents: DVec2, effect: PickupEffect) -> Result<Body> {
    Ok(Body::new(BodyKind::Pickup, position, half_extents, f64::INFINITY)?.with_pickup(effect))
}

pub fn tile(rect: Aabb, solid: bool) -> Result<Body> {
    Body::tile(rect, solid)
}

/// A bullet leaving `shooter`'s centre along `direction`.
///
/// The bullet keeps part of the shooter's velocity on the axis across the
/// shot, so strafing while firing bends the stream. Returns `None` for a
/// shooter that cannot fight.
pub fn bullet(shooter: &Body, direction: DVec2, speed: f64, cfg: &BulletConfig) -> Option<Body> {
    let combat = shooter.combat()?;
    let dir = unit(direction);

    let kind = match shooter.kind() {
        BodyKind::Player => BodyKind::PlayerBullet,
        _ => BodyKind::EnemyBullet,
    };

    let carried = shooter.velocity();
    let velocity = dir * speed
        + DVec2::new(
            (1.0 - dir.x.abs()) * cfg.velocity_inherit * carried.x,
            (1.0 - dir.y.abs()) * cfg.velocity_inherit * carried.y,
        );

    let body = Body::new(
        kind,
        shooter.position(),
        DVec2::splat(cfg.half_extent),
        cfg.mass,
    )
    .inspect_err(|err| warn!(%err, "bullet config produced an invalid body"))
    .ok()?;

    Some(body.with_velocity(velocity).with_payload(Payload {
        attack: combat.attack,
        knockback: cfg.knockback,
    }))
}

/// Fires a bullet if the shooter has reloaded, restarting its reload timer.
pub fn fire(shooter: &mut Body, direction: DVec2, speed: f64, cfg: &BulletConfig) -> Option<Body> {
    let mut stats = shooter.stats();
    let combat = stats.combat.as_mut()?;

    if !combat.ready_to_fire() {
        trace!(reload = combat.reload, "still reloading");
        return None;
    }

    let shot = bullet(shooter, direction, speed, cfg)?;
    combat.reload = combat.cooldown;
    shooter.set_stats(stats);

    Some(shot)
}

/// Unit direction from one body's centre to another's.
pub fn aim(from: &Body, to: &Body) -> DVec2 {
    unit(to.position() - from.position())
}

/// Random centres inside `area` where a body of `half_extents` fits whole.
/// An axis too narrow for the body collapses to the area's centre.
pub fn scatter(
    rng: &mut impl Rng,
    area: Aabb,
    count: usize,
    half_extents: DVec2,
) -> Vec<DVec2> {
    let min = area.min() + half_extents;
    let max = area.max() - half_extents;
    let center = area.center();

    let mut axis = |lo: f64, hi: f64, mid: f64| {
        if lo < hi { rng.gen_range(lo..=hi) } else { mid }
    };

    (0..count)
        .map(|_| {
            let x = axis(min.x, max.x, center.x);
            let y = axis(min.y, max.y, center.y);
            DVec2::new(x, y)
        })
        .collect()
}
