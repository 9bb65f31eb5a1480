use std::collections::HashMap;

use glam::DVec2;
use legion::{Entity, Query, system, world::SubWorld};
use tracing::trace;

use crate::collision::{CollisionEvent, CollisionTable, Interaction, Tracked, resolve_contacts};
use crate::components::{Body, Id};
use crate::forces::{BodyState, ForceKind, ForceRegistry, Lifetime};
use crate::scene::BodyHandle;
use crate::spatial::TileGrid;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaTime(pub f64);

/// Contacts resolved during the current tick.
#[derive(Debug, Default)]
pub struct ContactLog(pub Vec<CollisionEvent>);

#[system]
pub fn apply_forces(
    world: &mut SubWorld,
    query: &mut Query<(Entity, &mut Body)>,
    #[resource] forces: &mut ForceRegistry,
    #[resource] dt: &DeltaTime,
) {
    let states: HashMap<BodyHandle, BodyState> = query
        .iter_mut(world)
        .map(|(entity, body)| {
            (
                BodyHandle::from(*entity),
                BodyState {
                    position: body.position(),
                    velocity: body.velocity(),
                    mass: body.mass(),
                },
            )
        })
        .collect();

    let pruned = forces.prune(|handle| states.contains_key(&handle));
    if pruned > 0 {
        trace!(pruned, "dropped forces on removed bodies");
    }

    let totals: HashMap<BodyHandle, DVec2> =
        forces.accumulate(&states, dt.0).into_iter().collect();
    if totals.is_empty() {
        return;
    }

    query.for_each_mut(world, |(entity, body)| {
        if let Some(force) = totals.get(&BodyHandle::from(*entity)) {
            body.apply_force(*force);
        }
    });
}

#[system(for_each)]
pub fn integrate(body: &mut Body, #[resource] dt: &DeltaTime) {
    if body.kind().is_tile() {
        return;
    }

    body.integrate(dt.0);
    body.tick_timers(dt.0);
}

#[system]
pub fn resolve_collisions(
    world: &mut SubWorld,
    query: &mut Query<(Entity, &Id, &mut Body)>,
    #[resource] tiles: &TileGrid,
    #[resource] table: &CollisionTable,
    #[resource] forces: &mut ForceRegistry,
    #[resource] log: &mut ContactLog,
) {
    let mut bodies: Vec<Tracked> = query
        .iter_mut(world)
        .filter(|(_, _, body)| !body.kind().is_tile())
        .map(|(entity, id, body)| Tracked {
            handle: BodyHandle::from(*entity),
            id: id.0,
            body: body.clone(),
            changed: false,
        })
        .collect();
    bodies.sort_by_key(|tracked| tracked.id);

    let events = resolve_contacts(&mut bodies, tiles, table);

    for event in &events {
        if let Interaction::Damage { knockback, .. } = event.interaction {
            if knockback != DVec2::ZERO {
                forces.register(
                    ForceKind::Impulse(knockback),
                    event.target,
                    None,
                    Lifetime::OneShot,
                );
            }
        }
    }

    let updated: HashMap<BodyHandle, Body> = bodies
        .into_iter()
        .filter(|tracked| tracked.changed)
        .map(|tracked| (tracked.handle, tracked.body))
        .collect();

    if !updated.is_empty() {
        query.for_each_mut(world, |(entity, _, body)| {
            if let Some(new_body) = updated.get(&BodyHandle::from(*entity)) {
                *body = new_body.clone();
            }
        });
    }

    log.0.extend(events);
}
