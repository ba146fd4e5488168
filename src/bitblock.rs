/// Fixed-size bitmap of `64 * WORDS` slots. Bit `i` set means slot `i` is occupied.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitBlock<const WORDS: usize> {
    words: [u64; WORDS],
}

impl<const WORDS: usize> BitBlock<WORDS> {
    const BITS: usize = 64 * WORDS;

    pub const fn new() -> BitBlock<WORDS> {
        BitBlock { words: [0; WORDS] }
    }

    /// Number of slots.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        Self::BITS
    }

    #[inline(always)]
    fn locate(index: usize) -> (usize, u64) {
        assert!(
            index < Self::BITS,
            "bit index {} out of range for {} bits",
            index,
            Self::BITS
        );
        (index / 64, 1u64 << (index % 64))
    }

    #[inline(always)]
    pub fn set(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        self.words[word] |= mask;
    }

    #[inline(always)]
    pub fn clear(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        self.words[word] &= !mask;
    }

    #[inline(always)]
    pub fn test(&self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Index of the lowest clear bit, or `None` when every slot is taken.
    pub fn peek_first_unset(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(i, word)| i * 64 + (!*word).trailing_zeros() as usize)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_full(&self) -> bool {
        self.words.iter().all(|w| *w == u64::MAX)
    }

    /// True if no bit is set.
    pub fn none(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn clear_all(&mut self) {
        self.words = [0; WORDS];
    }
}

impl<const WORDS: usize> Default for BitBlock<WORDS> {
    fn default() -> Self {
        BitBlock::new()
    }
}

impl<const WORDS: usize> std::fmt::Debug for BitBlock<WORDS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for w in self.words.iter() {
            list.entry(&format_args!("{:#018x}", w));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        let bits = BitBlock::<2>::new();
        assert_eq!(128, bits.len());
        assert!(bits.none());
        assert!(!bits.is_full());
        assert_eq!(Some(0), bits.peek_first_unset());
        assert_eq!(0, bits.count_ones());
    }

    #[test]
    fn set_test_clear() {
        let mut bits = BitBlock::<2>::new();
        bits.set(0);
        bits.set(63);
        bits.set(64);
        bits.set(127);
        assert!(bits.test(0));
        assert!(bits.test(63));
        assert!(bits.test(64));
        assert!(bits.test(127));
        assert!(!bits.test(1));
        assert_eq!(4, bits.count_ones());
        bits.clear(63);
        assert!(!bits.test(63));
        assert_eq!(3, bits.count_ones());
    }

    #[test]
    fn first_unset_crosses_words() {
        let mut bits = BitBlock::<2>::new();
        for i in 0..64 {
            bits.set(i);
        }
        assert_eq!(Some(64), bits.peek_first_unset());
        bits.clear(10);
        assert_eq!(Some(10), bits.peek_first_unset());
    }

    #[test]
    fn full_block_has_no_free_slot() {
        let mut bits = BitBlock::<1>::new();
        for i in 0..64 {
            bits.set(i);
        }
        assert!(bits.is_full());
        assert_eq!(None, bits.peek_first_unset());
        bits.clear_all();
        assert!(bits.none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_panics() {
        let mut bits = BitBlock::<1>::new();
        bits.set(64);
    }
}
