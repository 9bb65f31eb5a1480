use std::collections::HashMap;

use crate::components::Body;
use crate::math::Aabb;
use crate::scene::BodyHandle;

#[derive(Clone, Debug)]
pub struct TileEntry {
    pub handle: BodyHandle,
    pub id: u64,
    pub body: Body,
}

/// Buckets static tile colliders by the grid cells their hitbox covers.
///
/// Tiles never move, so each one is bucketed once when the room is loaded
/// and looked up by area afterwards.
#[derive(Debug)]
pub struct TileGrid {
    cell_size: f64,
    tiles: HashMap<BodyHandle, TileEntry>,
    cells: HashMap<(i32, i32), Vec<BodyHandle>>,
}

impl TileGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            tiles: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn insert(&mut self, handle: BodyHandle, id: u64, body: Body) {
        for cell in self.cells_covering(&body.hitbox()) {
            self.cells.entry(cell).or_default().push(handle);
        }

        self.tiles.insert(handle, TileEntry { handle, id, body });
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<TileEntry> {
        let entry = self.tiles.remove(&handle)?;

        for cell in self.cells_covering(&entry.body.hitbox()) {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|h| *h != handle);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }

        Some(entry)
    }

    /// Tiles whose cells intersect `area`, deduplicated and in id order.
    /// Candidates are not guaranteed to overlap `area` themselves.
    pub fn query(&self, area: &Aabb) -> Vec<&TileEntry> {
        let mut found: Vec<&TileEntry> = self
            .cells_covering(area)
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .filter_map(|handle| self.tiles.get(handle))
            .collect();

        found.sort_by_key(|entry| entry.id);
        found.dedup_by_key(|entry| entry.id);

        found
    }

    fn cell_of(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    fn cells_covering(&self, area: &Aabb) -> impl Iterator<Item = (i32, i32)> + use<> {
        let max = area.max();
        let (min_x, min_y) = self.cell_of(area.x, area.y);
        let (max_x, max_y) = self.cell_of(max.x, max.y);

        (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| (x, y)))
    }
}
