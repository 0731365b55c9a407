//! Candidate lookup for the collision pass.
//!
//! The pass rebuilds one [`NeighborQuery`] per tick from the world bounds of
//! every collidable entity, then asks it for the candidates overlapping each
//! scan box. Results come back in ascending id order so contact order is
//! stable between runs.

use kindle_core::ecs::EntityId;
use kindle_core::geom::Rect;
use std::collections::HashMap;

/// Spatial index over entity bounds.
pub trait NeighborQuery {
    /// Replace the indexed set.
    fn rebuild(&mut self, entries: &[(EntityId, Rect)]);

    /// Append every indexed entity whose bounds overlap `area` to `out`,
    /// sorted by id, without duplicates.
    fn query(&self, area: Rect, out: &mut Vec<EntityId>);

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Linear scan over every entry.
#[derive(Debug, Default)]
pub struct BruteForce {
    entries: Vec<(EntityId, Rect)>,
}

impl BruteForce {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NeighborQuery for BruteForce {
    fn rebuild(&mut self, entries: &[(EntityId, Rect)]) {
        self.entries.clear();
        self.entries.extend_from_slice(entries);
        self.entries.sort_by_key(|(id, _)| *id);
    }

    fn query(&self, area: Rect, out: &mut Vec<EntityId>) {
        out.extend(
            self.entries
                .iter()
                .filter(|(_, bounds)| bounds.intersects(area))
                .map(|(id, _)| *id),
        );
    }

    fn name(&self) -> &str {
        "BruteForce"
    }
}

/// Grid cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i32,
    y: i32,
}

/// Uniform grid; each entry is filed under every cell its bounds touch.
#[derive(Debug)]
pub struct SpatialHashGrid {
    cell_size: i32,
    entries: Vec<(EntityId, Rect)>,
    cells: HashMap<CellCoord, Vec<usize>>,
}

impl SpatialHashGrid {
    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size: cell_size.max(1),
            entries: Vec::new(),
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell_range(&self, area: Rect) -> (CellCoord, CellCoord) {
        let min = CellCoord {
            x: area.x.div_euclid(self.cell_size),
            y: area.y.div_euclid(self.cell_size),
        };
        let max = CellCoord {
            x: (area.right() - 1).div_euclid(self.cell_size),
            y: (area.bottom() - 1).div_euclid(self.cell_size),
        };
        (min, max)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.cells.clear();
    }
}

impl NeighborQuery for SpatialHashGrid {
    fn rebuild(&mut self, entries: &[(EntityId, Rect)]) {
        self.clear();
        for &(id, bounds) in entries {
            if bounds.is_empty() {
                continue;
            }
            let slot = self.entries.len();
            self.entries.push((id, bounds));
            let (min, max) = self.cell_range(bounds);
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.cells.entry(CellCoord { x, y }).or_default().push(slot);
                }
            }
        }
    }

    fn query(&self, area: Rect, out: &mut Vec<EntityId>) {
        if area.is_empty() {
            return;
        }
        let start = out.len();
        let (min, max) = self.cell_range(area);
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let Some(slots) = self.cells.get(&CellCoord { x, y }) else {
                    continue;
                };
                for &slot in slots {
                    let (id, bounds) = self.entries[slot];
                    if bounds.intersects(area) {
                        out.push(id);
                    }
                }
            }
        }
        out[start..].sort_unstable();
        let mut found = out.split_off(start);
        found.dedup();
        out.extend(found);
    }

    fn name(&self) -> &str {
        "SpatialHashGrid"
    }
}
