//! Growable bit vector backing aspects and the active-entity set.

const WORD_BITS: usize = u64::BITS as usize;

/// Bit vector that grows on `set` and treats missing words as zero.
///
/// All comparisons work across different lengths, so a set sized for an
/// older, smaller type space still compares correctly against a newer one.
#[derive(Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Pre-size for `bits` bits without setting any.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; words_for(bits)],
        }
    }

    /// Number of bits addressable without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    /// Grow in place to hold at least `bits` bits; set bits are kept.
    pub fn grow(&mut self, bits: usize) {
        let needed = words_for(bits);
        if needed > self.words.len() {
            self.words.resize(needed, 0);
        }
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        self.words
            .get(bit / WORD_BITS)
            .map_or(false, |w| w & mask(bit) != 0)
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        self.grow(bit + 1);
        self.words[bit / WORD_BITS] |= mask(bit);
    }

    #[inline]
    pub fn reset(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(bit / WORD_BITS) {
            *word &= !mask(bit);
        }
    }

    /// Clear all bits, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// At least one bit is set in both.
    pub fn intersects(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(a, b)| a & b != 0)
    }

    /// Every bit of `other` is also set here.
    pub fn includes(&self, other: &BitSet) -> bool {
        other.words.iter().enumerate().all(|(i, &b)| {
            let a = self.words.get(i).copied().unwrap_or(0);
            a & b == b
        })
    }

    /// No bit of `other` is set here.
    pub fn excludes(&self, other: &BitSet) -> bool {
        !self.intersects(other)
    }

    pub fn union_with(&mut self, other: &BitSet) {
        self.grow(other.capacity());
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    pub fn difference_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !b;
        }
    }

    /// Set bits in ascending order.
    pub fn ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        let (short, long) = if self.words.len() <= other.words.len() {
            (&self.words, &other.words)
        } else {
            (&other.words, &self.words)
        };
        short.iter().zip(long.iter()).all(|(a, b)| a == b)
            && long[short.len()..].iter().all(|&w| w == 0)
    }
}

impl Eq for BitSet {}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = BitSet::new();
        for bit in iter {
            set.set(bit);
        }
        set
    }
}

pub struct Ones<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.index * WORD_BITS + bit);
            }
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
    }
}

#[inline]
fn words_for(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

#[inline]
fn mask(bit: usize) -> u64 {
    1u64 << (bit % WORD_BITS)
}
