use crate::bitset::BitSet;
use std::iter::Enumerate;
use std::slice;

/// Growable store mapping a dense integer index to an object.
///
/// Indices are stable: removing an object never shifts the others, and a
/// freed index is handed out again only by a later `insert`. Storage
/// doubles when an index lands past the current capacity.
///
/// The free list is a stack; `free_mask` marks which of its entries are
/// still free. Entries claimed by `set` stay in the stack and are skipped
/// when popped.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    free_mask: BitSet,
    free_len: usize,
    /// First index that has never been handed out.
    high: usize,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            free: Vec::new(),
            free_mask: BitSet::new(),
            free_len: 0,
            high: 0,
            len: 0,
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of addressable slots before the next growth.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index the next `insert` will use.
    pub fn next_index(&self) -> usize {
        self.free
            .iter()
            .rev()
            .find(|&&index| self.free_mask.contains(index))
            .copied()
            .unwrap_or(self.high)
    }

    /// Store `value` in a free slot and return its index.
    pub fn insert(&mut self, value: T) -> usize {
        self.insert_with(|_| value)
    }

    /// Like `insert`, but lets the object learn its own index.
    pub fn insert_with(&mut self, f: impl FnOnce(usize) -> T) -> usize {
        let index = match self.pop_free() {
            Some(index) => index,
            None => {
                let index = self.high;
                self.high += 1;
                index
            }
        };
        self.ensure_capacity(index);
        debug_assert!(self.slots[index].is_none(), "free list handed out a live slot");
        self.slots[index] = Some(f(index));
        self.len += 1;
        index
    }

    /// Put `value` at `index`, returning whatever was there before.
    pub fn set(&mut self, index: usize, value: T) -> Option<T> {
        self.ensure_capacity(index);
        if index >= self.high {
            // skipped indices become reusable holes, lowest handed out first
            for hole in (self.high..index).rev() {
                self.push_free(hole);
            }
            self.high = index + 1;
        } else if self.free_mask.contains(index) {
            self.free_mask.reset(index);
            self.free_len -= 1;
            self.compact_free();
        }

        let previous = self.slots[index].replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Clear the slot at `index`, returning its previous content.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let previous = self.slots.get_mut(index)?.take();
        if previous.is_some() {
            self.len -= 1;
            self.push_free(index);
        }
        previous
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Drop every object and forget all handed-out indices.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.free.clear();
        self.free_mask.clear();
        self.free_len = 0;
        self.high = 0;
        self.len = 0;
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.slots.iter().enumerate(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            inner: self.slots.iter_mut().enumerate(),
        }
    }

    /// Occupied indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().map(|(index, _)| index)
    }

    fn push_free(&mut self, index: usize) {
        self.free.push(index);
        self.free_mask.set(index);
        self.free_len += 1;
    }

    fn pop_free(&mut self) -> Option<usize> {
        while let Some(index) = self.free.pop() {
            if self.free_mask.contains(index) {
                self.free_mask.reset(index);
                self.free_len -= 1;
                return Some(index);
            }
        }
        None
    }

    /// Drop stale stack entries once they outnumber the live ones.
    fn compact_free(&mut self) {
        if self.free.len() > 2 * self.free_len + 16 {
            let mask = &self.free_mask;
            self.free.retain(|&index| mask.contains(index));
        }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index < self.slots.len() {
            return;
        }
        let mut new_len = self.slots.len().max(1);
        while new_len <= index {
            new_len *= 2;
        }
        self.slots.resize_with(new_len, || None);
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    inner: Enumerate<slice::Iter<'a, Option<T>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }
}

pub struct IterMut<'a, T> {
    inner: Enumerate<slice::IterMut<'a, Option<T>>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (usize, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find_map(|(index, slot)| slot.as_mut().map(|value| (index, value)))
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = (usize, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_reuse() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!((a, b), (0, 1));

        assert_eq!(arena.remove(a), Some("a"));
        assert_eq!(arena.get(a), None);
        assert!(!arena.contains(a));
        assert_eq!(arena.len(), 1);

        // freed slot comes back before a fresh one
        assert_eq!(arena.next_index(), a);
        assert_eq!(arena.insert("c"), a);
        assert_eq!(arena.insert("d"), 2);
    }

    #[test]
    fn remove_twice_is_empty() {
        let mut arena = Arena::new();
        let i = arena.insert(7);
        assert_eq!(arena.remove(i), Some(7));
        assert_eq!(arena.remove(i), None);
        assert_eq!(arena.get(i), None);
        // the index went onto the free list only once
        assert_eq!(arena.insert(8), i);
        assert_eq!(arena.insert(9), 1);
    }

    #[test]
    fn out_of_range_is_empty() {
        let arena: Arena<u32> = Arena::new();
        assert_eq!(arena.get(1_000), None);
        assert!(!arena.contains(usize::MAX));
    }

    #[test]
    fn growth_doubles() {
        let mut arena = Arena::with_capacity(4);
        for i in 0..5 {
            arena.insert(i);
        }
        assert_eq!(arena.capacity(), 8);
        arena.set(20, 20);
        assert_eq!(arena.capacity(), 32);
    }

    #[test]
    fn set_beyond_high_water_leaves_holes() {
        let mut arena = Arena::new();
        arena.insert('a');
        assert_eq!(arena.set(3, 'd'), None);
        assert_eq!(arena.len(), 2);

        // holes 1 and 2 are handed out lowest first, then 4
        assert_eq!(arena.insert('b'), 1);
        assert_eq!(arena.insert('c'), 2);
        assert_eq!(arena.insert('e'), 4);
    }

    #[test]
    fn set_on_free_slot_takes_it_off_the_free_list() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        arena.remove(a);
        arena.remove(b);

        arena.set(a, 10);
        assert_eq!(arena.insert(20), b);
        assert_eq!(arena.insert(30), 2);
    }

    #[test]
    fn claimed_holes_are_skipped() {
        let mut arena = Arena::new();
        arena.set(100, 'z');
        for hole in 0..100 {
            arena.set(hole, 'h');
        }
        assert_eq!(arena.len(), 101);
        assert_eq!(arena.next_index(), 101);
        assert_eq!(arena.insert('n'), 101);

        arena.remove(40);
        arena.remove(7);
        assert_eq!(arena.next_index(), 7);
        arena.set(7, 'x');
        assert_eq!(arena.insert('y'), 40);
        assert_eq!(arena.insert('w'), 102);
    }

    #[test]
    fn set_overwrites() {
        let mut arena = Arena::new();
        let i = arena.insert(1);
        assert_eq!(arena.set(i, 2), Some(1));
        assert_eq!(arena.get(i), Some(&2));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn iteration_skips_holes() {
        let mut arena = Arena::new();
        for i in 0..5 {
            arena.insert(i * 10);
        }
        arena.remove(1);
        arena.remove(3);

        let seen: Vec<_> = arena.iter().map(|(i, v)| (i, *v)).collect();
        assert_eq!(seen, vec![(0, 0), (2, 20), (4, 40)]);

        for (_, v) in arena.iter_mut() {
            *v += 1;
        }
        assert_eq!(arena.indices().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(arena.get(4), Some(&41));
    }

    #[test]
    fn insert_with_sees_index() {
        let mut arena = Arena::new();
        arena.insert_with(|i| i * 2);
        let i = arena.insert_with(|i| i * 2);
        assert_eq!(arena.get(i), Some(&2));
    }
}
