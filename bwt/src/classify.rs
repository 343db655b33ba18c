// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use crate::symbol::Symbol;

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CharType {
    L,
    S,
}

/// The LMS positions of a text.
///
/// Position 0 is never an LMS position, and position `n - 1` (the sentinel) always is.
pub(crate) struct Classification {
    borders: BorderSet,
    lms: Vec<usize>,
}

impl Classification {
    /// Classifies every position of `text` with one right-to-left scan.
    ///
    /// # Panics
    ///
    /// Panics if `text` is shorter than two symbols.
    pub(crate) fn new<S: Symbol>(text: &[S]) -> Self {
        let borders = BorderSet::new(text);
        let lms = borders.iter().collect();

        Self { borders, lms }
    }

    /// Returns the LMS positions in ascending text order.
    pub(crate) fn lms(&self) -> &[usize] {
        &self.lms
    }

    pub(crate) fn borders(&self) -> &BorderSet {
        &self.borders
    }

    /// Returns the LMS positions grouped into one bucket per first symbol.
    ///
    /// Every bucket lists its positions in ascending text order. Concatenating the buckets yields
    /// the LMS positions sorted by first symbol, which is the seed of the first induced sort.
    pub(crate) fn lms_by_first_symbol<S: Symbol>(
        &self,
        text: &[S],
        max_symbol: usize,
    ) -> Vec<Vec<usize>> {
        let mut buckets = vec![Vec::new(); max_symbol + 1];
        // Walk right to left and reverse each bucket afterwards, mirroring discovery order
        for &position in self.lms.iter().rev() {
            buckets[text[position].rank()].push(position);
        }
        for bucket in &mut buckets {
            bucket.reverse();
        }

        buckets
    }
}

/// Calls `visit(i, type(i), type(i + 1))` for every `i` from `n - 2` down to 0.
///
/// Position `n - 1` is S-type. A tie between `text[i]` and `text[i + 1]` takes the type of `i + 1`.
pub(crate) fn scan_types<S, F>(text: &[S], mut visit: F)
where
    S: Symbol,
    F: FnMut(usize, CharType, CharType),
{
    let mut successor = CharType::S;
    for i in (0..text.len() - 1).rev() {
        let current = if text[i] < text[i + 1]
            || (text[i] == text[i + 1] && successor == CharType::S)
        {
            CharType::S
        } else {
            CharType::L
        };
        visit(i, current, successor);
        successor = current;
    }
}

/// Per-symbol counts of L-type, S-type and LMS positions.
///
/// The streaming induced sorter sizes its buckets from these counts instead of materializing them.
pub(crate) struct SymbolCounts {
    pub(crate) l_type: Vec<usize>,
    pub(crate) s_type: Vec<usize>,
    pub(crate) lms: Vec<usize>,
}

impl SymbolCounts {
    pub(crate) fn new<S: Symbol>(text: &[S], max_symbol: usize) -> Self {
        let mut counts = Self {
            l_type: vec![0; max_symbol + 1],
            s_type: vec![0; max_symbol + 1],
            lms: vec![0; max_symbol + 1],
        };

        let last = text.len() - 1;
        counts.s_type[text[last].rank()] += 1;
        scan_types(text, |i, current, successor| {
            let symbol = text[i].rank();
            match current {
                CharType::L => counts.l_type[symbol] += 1,
                CharType::S => counts.s_type[symbol] += 1,
            }
            if current == CharType::L && successor == CharType::S {
                counts.lms[text[i + 1].rank()] += 1;
            }
        });

        counts
    }
}

/// The LMS positions of a text as a bitset, with constant-time rank queries.
///
/// This is the form the in-file pipeline keeps resident: one bit per position instead of one word
/// per LMS position.
pub(crate) struct BorderSet {
    words: Vec<u64>,
    // Number of set bits in all words before each word
    ranks: Vec<usize>,
    len: usize,
}

impl BorderSet {
    /// Finds the LMS positions of `text` with one right-to-left scan.
    ///
    /// # Panics
    ///
    /// Panics if `text` is shorter than two symbols.
    pub(crate) fn new<S: Symbol>(text: &[S]) -> Self {
        assert!(text.len() >= 2, "a classified text needs a sentinel and one other symbol");

        let mut words = vec![0u64; text.len().div_ceil(WORD_BITS)];
        scan_types(text, |i, current, successor| {
            if current == CharType::L && successor == CharType::S {
                words[(i + 1) / WORD_BITS] |= 1 << ((i + 1) % WORD_BITS);
            }
        });

        let mut total = 0;
        let ranks = words
            .iter()
            .map(|word| {
                let before = total;
                total += word.count_ones() as usize;
                before
            })
            .collect();

        Self {
            words,
            ranks,
            len: text.len(),
        }
    }

    /// Returns `true` if an LMS substring starts at `position`.
    #[inline]
    pub(crate) fn contains(&self, position: usize) -> bool {
        self.words[position / WORD_BITS] & (1 << (position % WORD_BITS)) != 0
    }

    /// Returns the number of borders strictly before `position`.
    pub(crate) fn rank(&self, position: usize) -> usize {
        let word = position / WORD_BITS;
        let mask = (1u64 << (position % WORD_BITS)) - 1;
        self.ranks[word] + (self.words[word] & mask).count_ones() as usize
    }

    /// Returns the number of borders.
    pub(crate) fn count(&self) -> usize {
        self.ranks.last().copied().unwrap_or(0)
            + self.words.last().map_or(0, |word| word.count_ones() as usize)
    }

    /// Iterates over the borders in ascending order, scanning forward from the start of the text.
    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&position| self.contains(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &[u8] = b"amammmasasmasassaara\0";

    #[test]
    fn lms_of_example() {
        let classification = Classification::new(EXAMPLE);

        assert_eq!(classification.lms(), &[2, 6, 8, 11, 13, 16, 20]);
    }

    #[test]
    fn lms_grouped_by_first_symbol() {
        let classification = Classification::new(EXAMPLE);
        let buckets = classification.lms_by_first_symbol(EXAMPLE, 255);
        let seed: Vec<usize> = buckets.into_iter().flatten().collect();

        assert_eq!(seed, [20, 2, 6, 8, 11, 13, 16]);
    }

    #[test]
    fn sentinel_only_lms() {
        let classification = Classification::new(b"cba\0");

        assert_eq!(classification.lms(), &[3]);
    }

    #[test]
    fn border_rank() {
        let text: Vec<u8> = b"ab".repeat(100).into_iter().chain([0]).collect();
        let classification = Classification::new(&text);
        let borders = classification.borders();

        assert_eq!(borders.count(), 100);
        assert_eq!(borders.rank(2), 0);
        assert_eq!(borders.rank(3), 1);
        assert_eq!(borders.rank(200), 99);
        assert!(borders.contains(130));
        assert!(!borders.contains(131));
        assert_eq!(
            borders.iter().collect::<Vec<_>>(),
            classification.lms().to_vec(),
        );
    }

    #[test]
    fn counts_match_classification() {
        let counts = SymbolCounts::new(EXAMPLE, 255);

        assert_eq!(counts.lms[b'a' as usize], 6);
        assert_eq!(counts.lms[0], 1);
        assert_eq!(counts.s_type[0], 1);
        // Positions 3, 4, 5 and 10 hold an L-type 'm', position 1 too
        assert_eq!(counts.l_type[b'm' as usize], 5);
        assert_eq!(counts.s_type[b'm' as usize], 0);
        assert_eq!(
            counts.l_type.iter().sum::<usize>() + counts.s_type.iter().sum::<usize>(),
            EXAMPLE.len(),
        );
    }

    #[test]
    #[should_panic]
    fn rejects_single_symbol() {
        let _ = Classification::new(&[0u8]);
    }
}
