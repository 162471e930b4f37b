//! Fixed-width bit-packed integer array.
//!
//! Values are stored most-significant-bit first across a stream of u64
//! words, so a run of consecutive values read as one integer compares the
//! same way the values compare lexicographically.

/// Array of `len` values of `bits` bits each (1..=8)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPackedArray {
    bits: u32,
    len: u64,
    words: Vec<u64>,
}

impl BitPackedArray {
    pub fn new(bits: u32, len: u64) -> Self {
        debug_assert!((1..=8).contains(&bits));
        let words = (len * bits as u64).div_ceil(64) as usize;
        Self {
            bits,
            len,
            words: vec![0; words],
        }
    }

    pub fn from_values(bits: u32, values: &[u8]) -> Self {
        let mut array = Self::new(bits, values.len() as u64);
        for (i, &v) in values.iter().enumerate() {
            array.set(i as u64, v as u64);
        }
        array
    }

    /// Rebuild from stored words; `None` when the word count does not fit
    pub fn from_words(bits: u32, len: u64, words: Vec<u64>) -> Option<Self> {
        let expected = (len * bits as u64).div_ceil(64) as usize;
        ((1..=8).contains(&bits) && words.len() == expected).then_some(Self { bits, len, words })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.words.len() as u64 * 8
    }

    #[inline]
    pub fn set(&mut self, i: u64, value: u64) {
        let offset = i * self.bits as u64;
        let word = (offset / 64) as usize;
        let shift = (offset % 64) as u32;
        let mask = (1u64 << self.bits) - 1;
        let value = value & mask;

        let end = shift + self.bits;
        if end <= 64 {
            let s = 64 - end;
            self.words[word] = (self.words[word] & !(mask << s)) | (value << s);
        } else {
            let spill = end - 64;
            let high_bits = self.bits - spill;
            self.words[word] = (self.words[word] & !((1u64 << high_bits) - 1)) | (value >> spill);
            let s = 64 - spill;
            let low_mask = (1u64 << spill) - 1;
            self.words[word + 1] = (self.words[word + 1] & !(low_mask << s)) | ((value & low_mask) << s);
        }
    }

    #[inline]
    pub fn get(&self, i: u64) -> u64 {
        self.extract(i, 1) >> (64 - self.bits)
    }

    /// `count` consecutive values starting at `i`, left-aligned in a u64.
    ///
    /// `count * bits` must not exceed 64; unused low bits are zero.
    #[inline]
    pub fn extract(&self, i: u64, count: u32) -> u64 {
        let width = count * self.bits;
        debug_assert!(width <= 64 && i + count as u64 <= self.len);
        if width == 0 {
            return 0;
        }
        let offset = i * self.bits as u64;
        let word = (offset / 64) as usize;
        let shift = (offset % 64) as u32;

        let high = self.words[word] as u128;
        let low = self.words.get(word + 1).copied().unwrap_or(0) as u128;
        let window = ((high << 64) | low) << shift;
        let top = (window >> 64) as u64;
        top & (u64::MAX << (64 - width))
    }
}

/// Bit vector with fast "first set bit in range" queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector(BitPackedArray);

impl BitVector {
    pub fn new(len: u64) -> Self {
        Self(BitPackedArray::new(1, len))
    }

    pub fn from_array(array: BitPackedArray) -> Option<Self> {
        (array.bits() == 1).then_some(Self(array))
    }

    pub fn as_array(&self) -> &BitPackedArray {
        &self.0
    }

    #[inline]
    pub fn set(&mut self, i: u64) {
        self.0.set(i, 1);
    }

    #[inline]
    pub fn get(&self, i: u64) -> bool {
        self.0.get(i) == 1
    }

    /// First set position in `[from, to)`, at most 64 positions apart
    #[inline]
    pub fn first_set(&self, from: u64, to: u64) -> Option<u64> {
        let count = (to - from) as u32;
        let bits = self.0.extract(from, count);
        (bits != 0).then(|| from + bits.leading_zeros() as u64)
    }
}
