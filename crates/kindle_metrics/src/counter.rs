//! Named counters that roll over once per frame

use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    current: u64,
    last_frame: u64,
    total: u64,
}

/// Counters keyed by static names.
///
/// `add` accumulates into the running frame; `end_frame` publishes the
/// running value as `last_frame` and starts a fresh one.
#[derive(Debug, Default)]
pub struct FrameCounters {
    slots: HashMap<&'static str, Slot>,
}

impl FrameCounters {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: &'static str, value: u64) {
        let slot = self.slots.entry(name).or_default();
        slot.current += value;
        slot.total += value;
    }

    pub fn current(&self, name: &'static str) -> u64 {
        self.slots.get(name).map_or(0, |s| s.current)
    }

    pub fn last_frame(&self, name: &'static str) -> u64 {
        self.slots.get(name).map_or(0, |s| s.last_frame)
    }

    pub fn total(&self, name: &'static str) -> u64 {
        self.slots.get(name).map_or(0, |s| s.total)
    }

    pub fn end_frame(&mut self) {
        for slot in self.slots.values_mut() {
            slot.last_frame = slot.current;
            slot.current = 0;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.slots.iter().map(|(name, slot)| (*name, slot.last_frame))
    }
}
