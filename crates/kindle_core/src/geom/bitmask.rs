use super::Rect;
use crate::bitset::BitSet;

/// Two-dimensional bit grid over `region`.
///
/// Cells are addressed locally, `(0, 0)` being the top-left of the region.
/// The region's `x`/`y` place the mask in a shared frame; `or`/`and`
/// against another mask line both up by that placement.
#[derive(Clone, PartialEq, Eq)]
pub struct BitMask {
    region: Rect,
    bits: BitSet,
}

impl BitMask {
    pub fn new(region: Rect) -> Self {
        debug_assert!(region.width >= 0 && region.height >= 0, "negative mask size");
        Self {
            region,
            bits: BitSet::with_capacity(cell_count(region)),
        }
    }

    /// Mask with every cell of `region` set.
    pub fn filled(region: Rect) -> Self {
        let mut mask = Self::new(region);
        mask.set_region(region.normalized(), true);
        mask
    }

    /// Build from rows of `'#'` (set) and anything else (clear).
    pub fn from_rows(x: i32, y: i32, rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut mask = Self::new(Rect::new(x, y, width, height));
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch == '#' {
                    mask.set_bit(col as i32, row as i32, true);
                }
            }
        }
        mask
    }

    #[inline]
    pub fn region(&self) -> Rect {
        self.region
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.region.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.region.height
    }

    /// Move the mask without touching its cells.
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.region.x = x;
        self.region.y = y;
    }

    /// Resize to `region` and clear every cell.
    pub fn reset(&mut self, region: Rect) {
        debug_assert!(region.width >= 0 && region.height >= 0, "negative mask size");
        self.region = region;
        self.bits.clear();
        self.bits.grow(cell_count(region));
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of set cells.
    pub fn cardinality(&self) -> usize {
        self.bits.cardinality()
    }

    /// Cell outside the region reads as clear.
    #[inline]
    pub fn get_bit(&self, x: i32, y: i32) -> bool {
        match self.offset(x, y) {
            Some(i) => self.bits.contains(i),
            None => false,
        }
    }

    /// Writes outside the region are ignored.
    #[inline]
    pub fn set_bit(&mut self, x: i32, y: i32, value: bool) {
        if let Some(i) = self.offset(x, y) {
            if value {
                self.bits.set(i);
            } else {
                self.bits.reset(i);
            }
        }
    }

    /// Set or clear every cell of `area` (local coordinates), clipped.
    pub fn set_region(&mut self, area: Rect, value: bool) {
        let clip = area.intersection(self.region.normalized());
        if clip.is_empty() {
            return;
        }
        for y in clip.y..clip.bottom() {
            for x in clip.x..clip.right() {
                self.set_bit(x, y, value);
            }
        }
    }

    /// Union `other` in, lined up by both regions' placement.
    pub fn or(&mut self, other: &BitMask) {
        let dx = other.region.x - self.region.x;
        let dy = other.region.y - self.region.y;
        self.or_offset(other, dx, dy);
    }

    /// Union `other` in with its local `(0, 0)` landing on `(dx, dy)`.
    pub fn or_offset(&mut self, other: &BitMask, dx: i32, dy: i32) {
        other.debug_check();
        let overlap = other
            .region
            .normalized()
            .translated(dx, dy)
            .intersection(self.region.normalized());
        if overlap.is_empty() {
            return;
        }
        for y in overlap.y..overlap.bottom() {
            for x in overlap.x..overlap.right() {
                if other.get_bit(x - dx, y - dy) {
                    self.set_bit(x, y, true);
                }
            }
        }
    }

    /// Keep only cells also set in `other`, lined up by placement.
    pub fn and(&mut self, other: &BitMask) {
        other.debug_check();
        let dx = other.region.x - self.region.x;
        let dy = other.region.y - self.region.y;
        for y in 0..self.region.height {
            for x in 0..self.region.width {
                if self.get_bit(x, y) && !other.get_bit(x - dx, y - dy) {
                    self.set_bit(x, y, false);
                }
            }
        }
    }

    /// Any set cell inside `area` (local coordinates).
    pub fn intersects_rect(&self, area: Rect) -> bool {
        let clip = area.intersection(self.region.normalized());
        if clip.is_empty() {
            return false;
        }
        (clip.y..clip.bottom()).any(|y| (clip.x..clip.right()).any(|x| self.get_bit(x, y)))
    }

    /// Any cell set in both masks, lined up by placement.
    pub fn intersects_mask(&self, other: &BitMask) -> bool {
        other.debug_check();
        let dx = other.region.x - self.region.x;
        let dy = other.region.y - self.region.y;
        let overlap = other
            .region
            .normalized()
            .translated(dx, dy)
            .intersection(self.region.normalized());
        if overlap.is_empty() {
            return false;
        }
        (overlap.y..overlap.bottom()).any(|y| {
            (overlap.x..overlap.right()).any(|x| self.get_bit(x, y) && other.get_bit(x - dx, y - dy))
        })
    }

    /// Cells of this mask that fall inside `area`, as a new mask placed at
    /// `area` (same frame as this mask's placement).
    pub fn clip(&self, area: Rect) -> BitMask {
        let mut out = BitMask::new(Rect::new(area.x, area.y, area.width.max(0), area.height.max(0)));
        out.or(self);
        out
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.region.width || y >= self.region.height {
            return None;
        }
        Some(y as usize * self.region.width as usize + x as usize)
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(
            self.region.width >= 0
                && self.region.height >= 0
                && self.bits.capacity() >= cell_count(self.region),
            "malformed bit mask: region {} does not match its buffer",
            self.region
        );
    }
}

impl std::fmt::Debug for BitMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BitMask {}", self.region)?;
        for y in 0..self.region.height {
            let row: String = (0..self.region.width)
                .map(|x| if self.get_bit(x, y) { '#' } else { '.' })
                .collect();
            writeln!(f, "  {row}")?;
        }
        Ok(())
    }
}

#[inline]
fn cell_count(region: Rect) -> usize {
    region.width.max(0) as usize * region.height.max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_and_bounds() {
        let mut mask = BitMask::new(Rect::new(0, 0, 4, 3));
        mask.set_bit(3, 2, true);
        mask.set_bit(4, 0, true);
        mask.set_bit(-1, 0, true);
        assert!(mask.get_bit(3, 2));
        assert!(!mask.get_bit(4, 0));
        assert_eq!(mask.cardinality(), 1);

        mask.set_bit(3, 2, false);
        assert!(mask.is_empty());
    }

    #[test]
    fn region_fill_is_clipped() {
        let mut mask = BitMask::new(Rect::new(0, 0, 10, 10));
        mask.set_region(Rect::new(8, 0, 5, 10), true);
        assert_eq!(mask.cardinality(), 20);
        assert!(mask.get_bit(9, 9));
        assert!(!mask.get_bit(7, 0));
    }

    #[test]
    fn or_lines_up_by_placement() {
        let mut target = BitMask::new(Rect::new(0, 0, 4, 4));
        let shape = BitMask::from_rows(2, 1, &["##", "#."]);
        target.or(&shape);

        assert!(target.get_bit(2, 1));
        assert!(target.get_bit(3, 1));
        assert!(target.get_bit(2, 2));
        assert!(!target.get_bit(3, 2));
        assert_eq!(target.cardinality(), 3);
    }

    #[test]
    fn or_is_commutative_on_cells() {
        let a = BitMask::from_rows(0, 0, &["#..", "..."]);
        let b = BitMask::from_rows(1, 1, &["##"]);

        let mut ab = BitMask::new(Rect::new(0, 0, 3, 2));
        ab.or(&a);
        ab.or(&b);
        let mut ba = BitMask::new(Rect::new(0, 0, 3, 2));
        ba.or(&b);
        ba.or(&a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn or_offset_clips() {
        let mut target = BitMask::new(Rect::new(0, 0, 3, 3));
        let full = BitMask::filled(Rect::new(0, 0, 3, 3));
        target.or_offset(&full, 2, 2);
        assert_eq!(target.cardinality(), 1);
        assert!(target.get_bit(2, 2));
    }

    #[test]
    fn and_and_intersections() {
        let mut a = BitMask::filled(Rect::new(0, 0, 3, 3));
        let b = BitMask::from_rows(1, 1, &["#.", ".#"]);
        assert!(a.intersects_mask(&b));
        a.and(&b);
        assert_eq!(a.cardinality(), 2);
        assert!(a.get_bit(1, 1));
        assert!(a.get_bit(2, 2));

        assert!(a.intersects_rect(Rect::new(2, 2, 5, 5)));
        assert!(!a.intersects_rect(Rect::new(0, 0, 1, 3)));

        let far = BitMask::filled(Rect::new(10, 10, 2, 2));
        assert!(!a.intersects_mask(&far));
    }

    #[test]
    fn clip_extracts_area() {
        let shape = BitMask::from_rows(0, 0, &["###", "#.#", "###"]);
        let clipped = shape.clip(Rect::new(1, 1, 2, 2));
        assert_eq!(clipped.region(), Rect::new(1, 1, 2, 2));
        assert!(!clipped.get_bit(0, 0));
        assert!(clipped.get_bit(1, 0));
        assert!(clipped.get_bit(0, 1));
        assert!(clipped.get_bit(1, 1));
    }

    #[test]
    fn reset_resizes_and_clears() {
        let mut mask = BitMask::filled(Rect::new(0, 0, 2, 2));
        mask.reset(Rect::new(0, 0, 10, 10));
        assert!(mask.is_empty());
        mask.set_bit(9, 9, true);
        assert!(mask.get_bit(9, 9));
    }
}
