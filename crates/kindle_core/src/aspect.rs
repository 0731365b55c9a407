//! Aspects: which kinds of one type space are present.

use crate::bitset::BitSet;
use crate::types::{SpaceId, TypeKey};

/// A bit vector scoped to a single type space.
///
/// Keys from a different space are a programming error and trip a debug
/// assertion.
#[derive(Clone, PartialEq, Eq)]
pub struct Aspect {
    space: SpaceId,
    bits: BitSet,
}

impl Aspect {
    pub fn new(space: SpaceId) -> Self {
        Self {
            space,
            bits: BitSet::new(),
        }
    }

    pub fn with_capacity(space: SpaceId, kinds: usize) -> Self {
        Self {
            space,
            bits: BitSet::with_capacity(kinds),
        }
    }

    /// Aspect with exactly the given keys set.
    pub fn of(space: SpaceId, keys: impl IntoIterator<Item = TypeKey>) -> Self {
        let mut aspect = Self::new(space);
        for key in keys {
            aspect.set(key);
        }
        aspect
    }

    #[inline]
    pub fn space(&self) -> SpaceId {
        self.space
    }

    #[inline]
    pub fn bits(&self) -> &BitSet {
        &self.bits
    }

    #[inline]
    pub fn contains(&self, key: TypeKey) -> bool {
        self.check(key);
        self.bits.contains(key.index())
    }

    #[inline]
    pub fn contains_index(&self, index: usize) -> bool {
        self.bits.contains(index)
    }

    #[inline]
    pub fn set(&mut self, key: TypeKey) {
        self.check(key);
        self.bits.set(key.index());
    }

    #[inline]
    pub fn set_index(&mut self, index: usize) {
        self.bits.set(index);
    }

    #[inline]
    pub fn reset(&mut self, key: TypeKey) {
        self.check(key);
        self.bits.reset(key.index());
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Resize in place for a grown type space.
    pub fn grow(&mut self, kinds: usize) {
        self.bits.grow(kinds);
    }

    pub fn intersects(&self, other: &Aspect) -> bool {
        self.check_space(other);
        self.bits.intersects(&other.bits)
    }

    /// `(self & required) == required`
    pub fn includes(&self, required: &Aspect) -> bool {
        self.check_space(required);
        self.bits.includes(&required.bits)
    }

    /// `(self & forbidden) == 0`
    pub fn excludes(&self, forbidden: &Aspect) -> bool {
        self.check_space(forbidden);
        self.bits.excludes(&forbidden.bits)
    }

    pub fn union_with(&mut self, other: &Aspect) {
        self.check_space(other);
        self.bits.union_with(&other.bits);
    }

    /// Indices of the kinds present, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.ones()
    }

    #[inline]
    fn check(&self, key: TypeKey) {
        debug_assert_eq!(key.space(), self.space, "type key from another space");
    }

    #[inline]
    fn check_space(&self, other: &Aspect) {
        debug_assert_eq!(other.space, self.space, "aspects from different spaces");
    }
}

impl std::fmt::Debug for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aspect({}){:?}", self.space.raw(), self.bits)
    }
}

/// Matching rule for listeners and systems: all of `required`, none of
/// `excluded`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AspectFilter {
    required: Aspect,
    excluded: Aspect,
}

impl AspectFilter {
    pub fn new(required: Aspect, excluded: Aspect) -> Self {
        debug_assert_eq!(required.space(), excluded.space());
        Self { required, excluded }
    }

    /// Filter requiring `required` and excluding nothing.
    pub fn requiring(required: Aspect) -> Self {
        let excluded = Aspect::new(required.space());
        Self { required, excluded }
    }

    /// Filter matching every aspect of `space`.
    pub fn any(space: SpaceId) -> Self {
        Self::requiring(Aspect::new(space))
    }

    pub fn excluding(mut self, key: TypeKey) -> Self {
        self.excluded.set(key);
        self
    }

    pub fn required(&self) -> &Aspect {
        &self.required
    }

    pub fn excluded(&self) -> &Aspect {
        &self.excluded
    }

    #[inline]
    pub fn matches(&self, aspect: &Aspect) -> bool {
        aspect.includes(&self.required) && aspect.excludes(&self.excluded)
    }
}
