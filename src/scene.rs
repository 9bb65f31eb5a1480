//! The live set of bodies for one room and the per-tick driver.

use legion::{Entity, EntityStore, IntoQuery, Resources, Schedule, World};
use tracing::{debug, info, warn};

use crate::collision::{CollisionEvent, CollisionTable};
use crate::components::{Body, BodyKind, Id, Stats};
use crate::config::SimConfig;
use crate::error::Result;
use crate::forces::{ForceHandle, ForceKind, ForceRegistry, Lifetime};
use crate::math::Aabb;
use crate::spatial::TileGrid;
use crate::systems::{self as sys, ContactLog, DeltaTime};

use glam::DVec2;

/// Names a body inside the scene that created it. A handle to a removed
/// body resolves to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(Entity);

impl From<Entity> for BodyHandle {
    fn from(entity: Entity) -> Self {
        Self(entity)
    }
}

impl BodyHandle {
    pub fn entity(self) -> Entity {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneBody {
    pub handle: BodyHandle,
    pub id: u64,
    pub body: Body,
}

/// A body destroyed by the end-of-tick sweep, with its final state.
pub type RemovedBody = SceneBody;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub dt: f64,
    pub contacts: Vec<CollisionEvent>,
    pub removed: Vec<RemovedBody>,
}

impl TickReport {
    pub fn was_removed(&self, handle: BodyHandle) -> bool {
        self.removed.iter().any(|removed| removed.handle == handle)
    }

    pub fn removed_of_kind(&self, kind: BodyKind) -> impl Iterator<Item = &RemovedBody> {
        self.removed.iter().filter(move |removed| removed.body.kind() == kind)
    }
}

pub struct Scene {
    world: World,
    resources: Resources,
    schedule: Schedule,
    forces: ForceRegistry,
    tiles: TileGrid,
    table: CollisionTable,
    config: SimConfig,
    next_id: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::build(SimConfig::default())
    }
}

impl Scene {
    /// Fails with [`SimError::Configuration`](crate::error::SimError) when
    /// `config` does not validate.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        // each flush is a phase barrier: forces -> integrate -> collide
        let schedule = Schedule::builder()
            .add_system(sys::apply_forces_system())
            .flush()
            .add_system(sys::integrate_system())
            .flush()
            .add_system(sys::resolve_collisions_system())
            .build();

        Self {
            world: World::default(),
            resources: Resources::default(),
            schedule,
            forces: ForceRegistry::default(),
            tiles: TileGrid::new(config.tile_size),
            table: CollisionTable::default(),
            config,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn collision_table_mut(&mut self) -> &mut CollisionTable {
        &mut self.table
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        let id = self.next_id;
        self.next_id += 1;

        let tile = body.kind().is_tile().then(|| body.clone());
        let handle = BodyHandle(self.world.push((Id(id), body)));

        if let Some(tile) = tile {
            self.tiles.insert(handle, id, tile);
        }

        handle
    }

    /// Registers the static colliders of a freshly loaded room.
    pub fn add_tiles(
        &mut self,
        rects: impl IntoIterator<Item = Aabb>,
        solid: bool,
    ) -> Result<Vec<BodyHandle>> {
        let handles = rects
            .into_iter()
            .map(|rect| Body::tile(rect, solid).map(|tile| self.add_body(tile)))
            .collect::<Result<Vec<_>>>()?;

        info!(count = handles.len(), total = self.tiles.len(), "registered tile colliders");
        Ok(handles)
    }

    /// Marks the body; it is destroyed by the next tick's sweep.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.with_body_mut(handle, Body::mark_for_removal).is_some()
    }

    /// Takes the body out of the scene right away. Only valid between ticks.
    pub fn take_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let (_, body) = self.release(handle)?;
        self.prune_forces();

        Some(body)
    }

    /// Moves a body into `destination` (e.g. on a room change). Forces that
    /// referenced it stay behind and are dropped.
    pub fn transfer(&mut self, handle: BodyHandle, destination: &mut Scene) -> Option<BodyHandle> {
        let body = self.take_body(handle)?;
        let kind = body.kind();
        let moved = destination.add_body(body);

        info!(?kind, ?handle, ?moved, "transferred body between scenes");
        Some(moved)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.world.entry_ref(handle.0).is_ok()
    }

    pub fn len(&self) -> usize {
        self.world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Copy of the body's current state.
    pub fn body(&self, handle: BodyHandle) -> Option<Body> {
        self.world
            .entry_ref(handle.0)
            .ok()?
            .get_component::<Body>()
            .ok()
            .cloned()
    }

    /// Ordered, read-only snapshot of every live body.
    pub fn bodies(&self) -> Vec<SceneBody> {
        let mut bodies: Vec<SceneBody> = <(Entity, &Id, &Body)>::query()
            .iter(&self.world)
            .map(|(entity, id, body)| SceneBody {
                handle: BodyHandle(*entity),
                id: id.0,
                body: body.clone(),
            })
            .collect();
        bodies.sort_by_key(|scene_body| scene_body.id);

        bodies
    }

    pub fn with_body_mut<R>(
        &mut self,
        handle: BodyHandle,
        f: impl FnOnce(&mut Body) -> R,
    ) -> Option<R> {
        let (result, reindex) = {
            let mut entry = self.world.entry(handle.0)?;
            let id = *entry.get_component::<Id>().ok()?;
            let body = entry.get_component_mut::<Body>().ok()?;
            let result = f(body);

            (result, body.kind().is_tile().then(|| (id, body.clone())))
        };

        // keep the grid copy in step with the world
        if let Some((id, tile)) = reindex {
            self.tiles.remove(handle);
            self.tiles.insert(handle, id.0, tile);
        }

        Some(result)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: DVec2) -> bool {
        self.with_body_mut(handle, |body| body.set_velocity(velocity))
            .is_some()
    }

    pub fn apply_force(&mut self, handle: BodyHandle, force: DVec2) -> bool {
        self.with_body_mut(handle, |body| body.apply_force(force))
            .is_some()
    }

    pub fn stats(&self, handle: BodyHandle) -> Option<Stats> {
        self.body(handle).map(|body| body.stats())
    }

    pub fn set_stats(&mut self, handle: BodyHandle, stats: Stats) -> bool {
        self.with_body_mut(handle, |body| body.set_stats(stats))
            .is_some()
    }

    pub fn add_force(
        &mut self,
        kind: ForceKind,
        target: BodyHandle,
        partner: Option<BodyHandle>,
        lifetime: Lifetime,
    ) -> ForceHandle {
        self.forces.register(kind, target, partner, lifetime)
    }

    pub fn remove_force(&mut self, handle: ForceHandle) -> bool {
        self.forces.unregister(handle).is_some()
    }

    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    /// Advances the scene by `dt` seconds: forces, integration, collisions,
    /// then the sweep of removed and dead bodies.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!(dt, "invalid frame delta, stepping with zero");
            0.0
        };

        let contacts = self.run_schedule(dt);
        let removed = self.sweep();

        debug!(
            dt,
            contacts = contacts.len(),
            removed = removed.len(),
            bodies = self.len(),
            forces = self.forces.len(),
            "tick"
        );

        TickReport {
            dt,
            contacts,
            removed,
        }
    }

    fn run_schedule(&mut self, dt: f64) -> Vec<CollisionEvent> {
        self.resources.insert(DeltaTime(dt));
        self.resources.insert(std::mem::take(&mut self.forces));
        self.resources.insert(std::mem::replace(
            &mut self.tiles,
            TileGrid::new(self.config.tile_size),
        ));
        self.resources
            .insert(std::mem::replace(&mut self.table, CollisionTable::empty()));
        self.resources.insert(ContactLog::default());

        self.schedule.execute(&mut self.world, &mut self.resources);

        if let Some(forces) = self.resources.remove::<ForceRegistry>() {
            self.forces = forces;
        }
        if let Some(tiles) = self.resources.remove::<TileGrid>() {
            self.tiles = tiles;
        }
        if let Some(table) = self.resources.remove::<CollisionTable>() {
            self.table = table;
        }

        self.resources
            .remove::<ContactLog>()
            .map(|log| log.0)
            .unwrap_or_default()
    }

    fn sweep(&mut self) -> Vec<RemovedBody> {
        let mut doomed: Vec<(Id, Entity)> = <(Entity, &Id, &Body)>::query()
            .iter(&self.world)
            .filter(|(_, _, body)| body.is_expired())
            .map(|(entity, id, _)| (*id, *entity))
            .collect();
        doomed.sort_by_key(|(id, _)| *id);

        let removed: Vec<RemovedBody> = doomed
            .into_iter()
            .filter_map(|(_, entity)| {
                let handle = BodyHandle(entity);
                self.release(handle).map(|(id, body)| SceneBody {
                    handle,
                    id: id.0,
                    body,
                })
            })
            .collect();

        if !removed.is_empty() {
            self.prune_forces();
        }

        removed
    }

    /// The only place a body leaves the world.
    fn release(&mut self, handle: BodyHandle) -> Option<(Id, Body)> {
        let (id, body) = {
            let entry = self.world.entry_ref(handle.0).ok()?;
            let id = *entry.get_component::<Id>().ok()?;
            let body = entry.get_component::<Body>().ok()?.clone();
            (id, body)
        };

        self.world.remove(handle.0);
        if body.kind().is_tile() {
            self.tiles.remove(handle);
        }

        Some((id, body))
    }

    fn prune_forces(&mut self) {
        let world = &self.world;
        let pruned = self.forces.prune(|handle| world.entry_ref(handle.0).is_ok());

        if pruned > 0 {
            debug!(pruned, "pruned forces on removed bodies");
        }
    }
}
