//! Pair classification and the built-in collision behaviours.

use std::collections::{HashMap, HashSet};

use glam::DVec2;
use tracing::trace;

use crate::components::{Body, BodyKind, PickupEffect};
use crate::math::{Aabb, Axis, unit};
use crate::scene::BodyHandle;
use crate::spatial::{TileEntry, TileGrid};

/// Penetration below this is treated as resting contact.
pub const PENETRATION_SLOP: f64 = 1e-9;

/// Tile sweeps per body per tick. Each sweep after the first re-queries
/// the grid from the corrected position.
const MAX_TILE_PASSES: usize = 4;

/// What a handler did. `source` acted on `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    Damage { amount: f64, knockback: DVec2 },
    /// A hit the target's invulnerability window swallowed.
    Deflected,
    Blocked { axis: Axis, correction: f64 },
    /// The source was destroyed by the target without effect.
    Absorbed,
    PickedUp(PickupEffect),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub source: BodyHandle,
    pub target: BodyHandle,
    pub interaction: Interaction,
}

/// Called with `(source, target)` in the order the pair was registered.
pub type CollisionHandler = fn(&mut Body, &mut Body) -> Option<Interaction>;

/// Handler lookup keyed by `(source kind, target kind)`. Pairs are matched
/// in either order, so `(Enemy, PlayerBullet)` finds the handler registered
/// for `(PlayerBullet, Enemy)`. Unknown pairs are ignored.
#[derive(Clone, Debug)]
pub struct CollisionTable {
    handlers: HashMap<(BodyKind, BodyKind), CollisionHandler>,
    /// Used for `(TileCollider, kind)` when nothing more specific exists.
    tile_fallback: Option<CollisionHandler>,
}

impl Default for CollisionTable {
    fn default() -> Self {
        let mut table = Self::empty();

        table.register(BodyKind::PlayerBullet, BodyKind::Enemy, bullet_hits);
        table.register(BodyKind::EnemyBullet, BodyKind::Player, bullet_hits_guarded);
        table.register(BodyKind::Pickup, BodyKind::Player, pickup_collected);
        table.register(BodyKind::TileCollider, BodyKind::PlayerBullet, wall_absorbs);
        table.register(BodyKind::TileCollider, BodyKind::EnemyBullet, wall_absorbs);
        table.set_tile_fallback(push_out);

        table
    }
}

impl CollisionTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            tile_fallback: None,
        }
    }

    pub fn register(&mut self, source: BodyKind, target: BodyKind, handler: CollisionHandler) {
        self.handlers.insert((source, target), handler);
    }

    pub fn set_tile_fallback(&mut self, handler: CollisionHandler) {
        self.tile_fallback = Some(handler);
    }

    /// Runs the handler for `a` and `b`. The returned flag is `true` when the
    /// handler saw `b` as the source.
    pub fn dispatch(&self, a: &mut Body, b: &mut Body) -> Option<(Interaction, bool)> {
        let (ka, kb) = (a.kind(), b.kind());

        if let Some(handler) = self.handlers.get(&(ka, kb)) {
            return handler(a, b).map(|i| (i, false));
        }

        if let Some(handler) = self.handlers.get(&(kb, ka)) {
            return handler(b, a).map(|i| (i, true));
        }

        match (self.tile_fallback, ka.is_tile(), kb.is_tile()) {
            (Some(handler), true, false) => handler(a, b).map(|i| (i, false)),
            (Some(handler), false, true) => handler(b, a).map(|i| (i, true)),
            _ => None,
        }
    }
}

/// Bullet deals its payload and is consumed.
pub fn bullet_hits(bullet: &mut Body, victim: &mut Body) -> Option<Interaction> {
    let payload = bullet.stats().payload?;
    let mut stats = victim.stats();
    let combat = stats.combat.as_mut()?;

    combat.health -= payload.attack;
    victim.set_stats(stats);
    bullet.mark_for_removal();

    Some(Interaction::Damage {
        amount: payload.attack,
        knockback: unit(bullet.velocity()) * payload.knockback,
    })
}

/// Like [`bullet_hits`], but respects the victim's invulnerability window
/// and restarts it on a landed hit. The bullet is consumed either way.
pub fn bullet_hits_guarded(bullet: &mut Body, victim: &mut Body) -> Option<Interaction> {
    let payload = bullet.stats().payload?;
    let mut stats = victim.stats();
    let combat = stats.combat.as_mut()?;

    bullet.mark_for_removal();

    if combat.is_invulnerable() {
        return Some(Interaction::Deflected);
    }

    combat.health -= payload.attack;
    combat.invulnerability_timer = combat.invulnerability_duration;
    victim.set_stats(stats);

    Some(Interaction::Damage {
        amount: payload.attack,
        knockback: unit(bullet.velocity()) * payload.knockback,
    })
}

pub fn pickup_collected(pickup: &mut Body, collector: &mut Body) -> Option<Interaction> {
    let effect = pickup.stats().pickup?;
    let mut stats = collector.stats();

    if effect.apply(&mut stats) {
        collector.set_stats(stats);
    }
    pickup.mark_for_removal();

    Some(Interaction::PickedUp(effect))
}

pub fn wall_absorbs(tile: &mut Body, bullet: &mut Body) -> Option<Interaction> {
    if !tile.is_solid() {
        return None;
    }

    bullet.mark_for_removal();
    Some(Interaction::Absorbed)
}

/// Moves `body` out of a solid `tile` along the axis of least penetration
/// and stops it on that axis. Equal penetration resolves horizontally.
pub fn push_out(tile: &mut Body, body: &mut Body) -> Option<Interaction> {
    if !tile.is_solid() || body.is_static() {
        return None;
    }

    let separation = body.hitbox().separation(&tile.hitbox())?;
    let axis = if separation.x.abs() <= separation.y.abs() {
        Axis::X
    } else {
        Axis::Y
    };

    if separation.x.abs().min(separation.y.abs()) <= PENETRATION_SLOP {
        return None;
    }

    let correction = push_along(body, axis, separation);

    Some(Interaction::Blocked { axis, correction })
}

/// Translates `body` by `separation` on `axis` only and stops it there.
/// Returns the applied correction.
fn push_along(body: &mut Body, axis: Axis, separation: DVec2) -> f64 {
    let velocity = body.velocity();

    match axis {
        Axis::X => {
            body.translate(DVec2::new(separation.x, 0.0));
            body.set_velocity(DVec2::new(0.0, velocity.y));
            separation.x
        }
        Axis::Y => {
            body.translate(DVec2::new(0.0, separation.y));
            body.set_velocity(DVec2::new(velocity.x, 0.0));
            separation.y
        }
    }
}

/// A body copied out of the world for one resolution pass.
#[derive(Clone, Debug)]
pub struct Tracked {
    pub handle: BodyHandle,
    pub id: u64,
    pub body: Body,
    pub changed: bool,
}

/// Resolves every contact among `bodies` (movable, sorted by id) and between
/// them and the tiles in `tiles`. Movable pairs are handled first, then each
/// body against its tile candidates; both in id order.
pub fn resolve_contacts(
    bodies: &mut [Tracked],
    tiles: &TileGrid,
    table: &CollisionTable,
) -> Vec<CollisionEvent> {
    let mut events = Vec::new();

    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let (left, right) = bodies.split_at_mut(j);
            let (a, b) = (&mut left[i], &mut right[0]);

            if a.body.is_marked_for_removal() || b.body.is_marked_for_removal() {
                continue;
            }

            if !a.body.hitbox().overlaps(&b.body.hitbox()) {
                continue;
            }

            let Some((interaction, swapped)) = table.dispatch(&mut a.body, &mut b.body) else {
                continue;
            };

            a.changed = true;
            b.changed = true;

            let (source, target) = if swapped {
                (b.handle, a.handle)
            } else {
                (a.handle, b.handle)
            };
            trace!(?source, ?target, ?interaction, "contact");
            events.push(CollisionEvent {
                source,
                target,
                interaction,
            });
        }
    }

    for tracked in bodies.iter_mut() {
        let mut settled = HashSet::new();

        for _ in 0..MAX_TILE_PASSES {
            if !settle_against_tiles(tracked, tiles, table, &mut settled, &mut events) {
                break;
            }
        }
    }

    events
}

/// One sweep over the tiles under the body's current hitbox, in id order.
/// Returns `true` when a tile moved the body, so the caller queries again
/// from the new position.
fn settle_against_tiles(
    tracked: &mut Tracked,
    tiles: &TileGrid,
    table: &CollisionTable,
    settled: &mut HashSet<u64>,
    events: &mut Vec<CollisionEvent>,
) -> bool {
    let mut moved = false;

    for tile in tiles.query(&tracked.body.hitbox()) {
        if tracked.body.is_marked_for_removal() {
            break;
        }

        if tile.body.is_marked_for_removal() || settled.contains(&tile.id) {
            continue;
        }

        if !tracked.body.hitbox().overlaps(&tile.body.hitbox()) {
            continue;
        }

        let before = tracked.body.clone();
        // tiles are static; anything a handler writes to the tile copy is dropped
        let mut tile_body = tile.body.clone();
        let Some((mut interaction, swapped)) = table.dispatch(&mut tile_body, &mut tracked.body)
        else {
            continue;
        };

        match interaction {
            Interaction::Blocked { axis, .. } => {
                moved = true;
                if let Some(rerouted) = reroute(&before, &mut tracked.body, axis, tile, tiles) {
                    interaction = rerouted;
                }
            }
            _ => {
                settled.insert(tile.id);
            }
        }

        tracked.changed = true;

        let (source, target) = if swapped {
            (tracked.handle, tile.handle)
        } else {
            (tile.handle, tracked.handle)
        };
        trace!(?source, ?target, ?interaction, "tile contact");
        events.push(CollisionEvent {
            source,
            target,
            interaction,
        });
    }

    moved
}

/// A push that lands the body in a solid tile it was clear of before is
/// retried along the other axis. Returns the replacement interaction when
/// that exit is clear.
fn reroute(
    before: &Body,
    body: &mut Body,
    axis: Axis,
    tile: &TileEntry,
    tiles: &TileGrid,
) -> Option<Interaction> {
    let entered = |hitbox: Aabb| {
        tiles.query(&hitbox).into_iter().any(|other| {
            let rect = other.body.hitbox();

            other.id != tile.id
                && other.body.is_solid()
                && !other.body.is_marked_for_removal()
                && rect.overlaps(&hitbox)
                && !rect.overlaps(&before.hitbox())
        })
    };

    if !entered(body.hitbox()) {
        return None;
    }

    let separation = before.hitbox().separation(&tile.body.hitbox())?;
    let other_axis = match axis {
        Axis::X => Axis::Y,
        Axis::Y => Axis::X,
    };

    let mut candidate = before.clone();
    let correction = push_along(&mut candidate, other_axis, separation);
    if correction.abs() <= PENETRATION_SLOP || entered(candidate.hitbox()) {
        return None;
    }

    trace!(?axis, ?other_axis, "push-out rerouted away from a neighbouring tile");
    *body = candidate;

    Some(Interaction::Blocked {
        axis: other_axis,
        correction,
    })
}
