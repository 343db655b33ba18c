// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use core::fmt::Debug;

use bytemuck::Pod;

// Symbols and positions are converted to usizes for indexing. A target where a usize is narrower
// than 32 bits would silently truncate those conversions, so refuse to build for one.
#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("Target pointer width must be at least 32 bits");

/// An unsigned integer type usable as a text symbol.
///
/// Implemented for `u8`, `u16`, `u32` and `u64`. Texts are sequences of symbols whose last element
/// is the sentinel `0`.
pub trait Symbol: Pod + Ord + Debug + Default + Send + Sync {
    /// The largest value this type can hold.
    const MAX: u64;

    /// Returns the symbol as an index into per-symbol tables.
    fn rank(self) -> usize;

    /// Builds a symbol from a per-symbol table index.
    ///
    /// # Panics
    ///
    /// Panics if `rank` does not fit into `Self`.
    fn from_rank(rank: usize) -> Self;

    /// Returns the symbol widened to 64 bits.
    fn to_u64(self) -> u64;

    /// Narrows a 64-bit value to a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit into `Self`.
    fn from_u64(value: u64) -> Self;

    /// Returns `true` if this symbol is the sentinel.
    fn is_sentinel(self) -> bool {
        self == Self::default()
    }
}

macro_rules! impl_symbol {
    ($($ty:ty),*) => {
        $(
            impl Symbol for $ty {
                const MAX: u64 = <$ty>::MAX as u64;

                #[inline]
                fn rank(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_rank(rank: usize) -> Self {
                    <$ty>::try_from(rank).expect("symbol rank exceeds the symbol width")
                }

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_u64(value: u64) -> Self {
                    <$ty>::try_from(value).expect("value exceeds the symbol width")
                }
            }
        )*
    };
}

impl_symbol!(u8, u16, u32, u64);

/// The width of the integers used to store symbols and indices.
///
/// The narrowest width covering a bound is picked with [`IndexWidth::for_bound()`], so that reduced
/// problems and on-disk index records never use more bytes than their values need.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum IndexWidth {
    /// One byte
    Byte,
    /// Two bytes
    Short,
    /// Four bytes
    Word,
    /// Eight bytes
    Long,
}

impl IndexWidth {
    /// Returns the narrowest width able to hold every value in `0..=bound`.
    pub const fn for_bound(bound: u64) -> Self {
        if bound <= u8::MAX as u64 {
            Self::Byte
        } else if bound <= u16::MAX as u64 {
            Self::Short
        } else if bound <= u32::MAX as u64 {
            Self::Word
        } else {
            Self::Long
        }
    }

    /// Returns the number of bytes a value of this width occupies.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Short => 2,
            Self::Word => 4,
            Self::Long => 8,
        }
    }
}

/// Returns the position preceding `j` in a cyclic text of length `n`.
///
/// Position 0 wraps to `n - 1`, the sentinel. Every stage goes through this helper, so rotations
/// and suffixes agree on what precedes the first symbol.
#[inline]
pub(crate) fn predecessor(j: usize, n: usize) -> usize {
    if j == 0 { n - 1 } else { j - 1 }
}

/// Builds the cumulative symbol-count table of `text`.
///
/// The returned table has `max_symbol + 2` entries, and `table[c]` is the number of symbols in
/// `text` smaller than `c`. Symbol `c` therefore owns the slots `table[c]..table[c + 1]` of any
/// array sorted by first symbol.
pub(crate) fn char_sums<S: Symbol>(text: &[S], max_symbol: usize) -> Vec<usize> {
    let mut sums = vec![0; max_symbol + 2];
    for &symbol in text {
        sums[symbol.rank() + 1] += 1;
    }
    for c in 1..sums.len() {
        sums[c] += sums[c - 1];
    }

    sums
}

// Bucket tables are sized by symbol value up to this bound, or up to the text length if larger
const DENSE_ALPHABET: u64 = 1 << 16;

/// The distinct symbols of a text whose largest symbol is too large to size bucket tables by.
///
/// Replacing every symbol by its rank among the distinct symbols preserves their order, so the
/// transform of the ranked text maps back symbol by symbol. The sentinel keeps rank 0.
pub(crate) struct SparseAlphabet<S> {
    // Sorted and deduplicated
    symbols: Vec<S>,
}

impl<S: Symbol> SparseAlphabet<S> {
    /// Returns the alphabet of `text` if its largest symbol exceeds both the text length and a
    /// fixed dense bound, or `None` if bucket tables can be indexed by the symbols directly.
    pub(crate) fn of(text: &[S]) -> Option<Self> {
        let max = text.iter().map(|&symbol| symbol.to_u64()).max().unwrap_or(0);
        if max < DENSE_ALPHABET.max(text.len() as u64) {
            return None;
        }

        let mut symbols = text.to_vec();
        symbols.sort_unstable();
        symbols.dedup();

        Some(Self { symbols })
    }

    /// Returns the largest rank, which bounds the alphabet of the ranked text.
    pub(crate) fn max_rank(&self) -> usize {
        self.symbols.len() - 1
    }

    /// Replaces every symbol of `text` by its rank.
    ///
    /// A rank never exceeds the symbol it replaces, so it fits the same type.
    pub(crate) fn rank_text(&self, text: &[S]) -> Vec<S> {
        text.iter()
            .map(|&symbol| S::from_rank(self.symbols.partition_point(|&s| s < symbol)))
            .collect()
    }

    /// Returns the symbol of the given rank.
    pub(crate) fn symbol_of(&self, rank: S) -> S {
        self.symbols[rank.rank()]
    }
}
