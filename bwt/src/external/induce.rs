// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use std::{io, path::Path};

use super::{priority_store::PriorityStore, stream::IndexWriter};
use crate::{
    classify::{BorderSet, SymbolCounts},
    symbol::{IndexWidth, Symbol, predecessor},
};

/// Destination of the symbols produced by a data-producing induced pass.
struct Sink<'a, S: Symbol> {
    bwt: &'a mut PriorityStore<S>,
    char_sums: &'a [usize],
}

/// Induced sorting over a text held in RAM, with every position list streamed through priority
/// stores and temporary files.
///
/// Each pass turns its processing order into dense priorities: the bucket of every symbol owns one
/// contiguous block of priorities, holding first the positions induced into it and then its seeds.
/// Retrieving priorities `0, 1, 2, ...` therefore replays exactly the order in which an in-memory
/// pass would visit positions, without keeping any bucket in memory.
pub(crate) struct StreamingSorter<'a, S> {
    text: &'a [S],
    counts: &'a SymbolCounts,
    store_budget: usize,
    temp_dir: Option<&'a Path>,
}

impl<'a, S: Symbol> StreamingSorter<'a, S> {
    /// Creates a sorter whose priority stores each use about `store_budget` bytes of RAM.
    pub(crate) fn new(
        text: &'a [S],
        counts: &'a SymbolCounts,
        store_budget: usize,
        temp_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            text,
            counts,
            store_budget,
            temp_dir,
        }
    }

    fn position_width(&self) -> IndexWidth {
        IndexWidth::for_bound(self.text.len() as u64 - 1)
    }

    /// Sorts the LMS positions in `borders` by the content of their LMS substrings.
    ///
    /// The returned store yields the positions in sorted order, equal substrings adjacent.
    pub(crate) fn sort_lms_substrings(
        &self,
        borders: &BorderSet,
    ) -> io::Result<PriorityStore<u64>> {
        let mut l_out = IndexWriter::new(self.temp_dir, self.position_width())?;
        let seeds = borders.iter().map(|position| Ok(position as u64));
        let l_counts = self.induce_l(seeds, &self.counts.lms, None, &mut l_out)?;

        let mut sorted =
            PriorityStore::new(borders.count() as u64, self.store_budget, self.temp_dir);
        self.induce_s(l_out.into_reader()?, &l_counts, None, Some(&mut sorted))?;

        Ok(sorted)
    }

    /// Produces the Burrows-Wheeler Transform of the text.
    ///
    /// `sorted_lms` must yield every LMS position in true suffix order. The returned store yields
    /// the transform symbol by symbol.
    pub(crate) fn assemble_bwt<I>(
        &self,
        sorted_lms: I,
        char_sums: &[usize],
    ) -> io::Result<PriorityStore<S>>
    where
        I: IntoIterator<Item = io::Result<u64>>,
    {
        let mut bwt = PriorityStore::new(self.text.len() as u64, self.store_budget, self.temp_dir);

        let mut l_out = IndexWriter::new(self.temp_dir, self.position_width())?;
        let sink = Sink {
            bwt: &mut bwt,
            char_sums,
        };
        let l_counts = self.induce_l(sorted_lms, &self.counts.lms, Some(sink), &mut l_out)?;

        let sink = Sink {
            bwt: &mut bwt,
            char_sums,
        };
        self.induce_s(l_out.into_reader()?, &l_counts, Some(sink), None)?;

        Ok(bwt)
    }

    /// Induces L-type positions from LMS seeds, in ascending bucket order.
    ///
    /// `seed_counts[c]` must be the number of seeds starting with symbol `c`. Visited positions
    /// whose predecessor is S-type are appended to `out`; their per-symbol counts are returned.
    fn induce_l<I>(
        &self,
        seeds: I,
        seed_counts: &[usize],
        mut sink: Option<Sink<'_, S>>,
        out: &mut IndexWriter,
    ) -> io::Result<Vec<usize>>
    where
        I: IntoIterator<Item = io::Result<u64>>,
    {
        let text = self.text;
        let n = text.len();
        let l_type = &self.counts.l_type;
        let (starts, total) = block_starts(l_type, seed_counts, false);

        let mut store = PriorityStore::<u64>::new(total as u64, self.store_budget, self.temp_dir);
        let mut placed = vec![0; seed_counts.len()];
        for seed in seeds {
            let j = seed? as usize;
            let c = text[j].rank();
            assert!(
                placed[c] < seed_counts[c],
                "more seeds start with symbol {c} than counted",
            );
            store.insert(j as u64, (starts[c] + l_type[c] + placed[c]) as u64)?;
            placed[c] += 1;
        }
        assert_eq!(placed, seed_counts, "fewer seeds than counted");

        let mut induced = vec![0; l_type.len()];
        let mut emitted = vec![0; l_type.len()];
        for priority in 0..total {
            let j = store.get()? as usize;
            let c = text[j].rank();
            let p = predecessor(j, n);

            // Induced entries come first in their block and are the only ones owning an L-type slot
            let rank = priority - starts[c];
            if let Some(sink) = sink.as_mut() {
                if rank < l_type[c] {
                    sink.bwt.insert(text[p], (sink.char_sums[c] + rank) as u64)?;
                }
            }

            if text[p] >= text[j] {
                let cp = text[p].rank();
                assert!(
                    induced[cp] < l_type[cp],
                    "more L-type positions induced for symbol {cp} than counted",
                );
                store.insert(p as u64, (starts[cp] + induced[cp]) as u64)?;
                induced[cp] += 1;
            } else {
                out.push(j as u64)?;
                emitted[c] += 1;
            }
        }

        Ok(emitted)
    }

    /// Induces S-type positions from L-type seeds, in descending bucket order.
    ///
    /// Seeds of a bucket are visited last seed first. Visited positions whose predecessor is L-type
    /// are the LMS positions; they are inserted into `lms_out` in ascending sorted order.
    fn induce_s<I>(
        &self,
        seeds: I,
        seed_counts: &[usize],
        mut sink: Option<Sink<'_, S>>,
        mut lms_out: Option<&mut PriorityStore<u64>>,
    ) -> io::Result<()>
    where
        I: IntoIterator<Item = io::Result<u64>>,
    {
        let text = self.text;
        let n = text.len();
        let s_type = &self.counts.s_type;
        let (starts, total) = block_starts(s_type, seed_counts, true);

        let mut store = PriorityStore::<u64>::new(total as u64, self.store_budget, self.temp_dir);
        let mut placed = vec![0; seed_counts.len()];
        for seed in seeds {
            let j = seed? as usize;
            let c = text[j].rank();
            assert!(
                placed[c] < seed_counts[c],
                "more seeds start with symbol {c} than counted",
            );
            let reversed = seed_counts[c] - 1 - placed[c];
            store.insert(j as u64, (starts[c] + s_type[c] + reversed) as u64)?;
            placed[c] += 1;
        }
        assert_eq!(placed, seed_counts, "fewer seeds than counted");

        let mut induced = vec![0; s_type.len()];
        let mut emitted = 0;
        for priority in 0..total {
            let j = store.get()? as usize;
            let c = text[j].rank();
            let p = predecessor(j, n);

            let rank = priority - starts[c];
            if let Some(sink) = sink.as_mut() {
                if rank < s_type[c] {
                    sink.bwt
                        .insert(text[p], (sink.char_sums[c + 1] - 1 - rank) as u64)?;
                }
            }

            if text[p] <= text[j] {
                let cp = text[p].rank();
                assert!(
                    induced[cp] < s_type[cp],
                    "more S-type positions induced for symbol {cp} than counted",
                );
                store.insert(p as u64, (starts[cp] + induced[cp]) as u64)?;
                induced[cp] += 1;
            } else if let Some(lms_out) = lms_out.as_mut() {
                // Found from the largest LMS suffix down
                let capacity = lms_out.capacity();
                assert!(emitted < capacity, "more LMS positions found than counted");
                lms_out.insert(j as u64, capacity - 1 - emitted)?;
                emitted += 1;
            }
        }

        Ok(())
    }
}

/// Lays out one block of priorities per symbol, sized `induced[c] + seeds[c]`, in ascending or
/// descending symbol order.
///
/// Returns the first priority of every block and the total number of priorities.
fn block_starts(induced: &[usize], seeds: &[usize], descending: bool) -> (Vec<usize>, usize) {
    let mut starts = vec![0; induced.len()];
    let mut total = 0;
    let mut symbols: Vec<usize> = (0..induced.len()).collect();
    if descending {
        symbols.reverse();
    }
    for c in symbols {
        starts[c] = total;
        total += induced[c] + seeds[c];
    }

    (starts, total)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{classify::Classification, induce, symbol::char_sums};

    const EXAMPLE: &[u8] = b"amammmasasmasassaara\0";

    fn drain<T: Symbol>(mut store: PriorityStore<T>) -> Vec<T> {
        (0..store.capacity()).map(|_| store.get().unwrap()).collect()
    }

    #[test]
    fn blocks_in_both_directions() {
        assert_eq!(block_starts(&[1, 2, 0], &[0, 1, 3], false), (vec![0, 1, 4], 7));
        assert_eq!(block_starts(&[1, 2, 0], &[0, 1, 3], true), (vec![6, 3, 0], 7));
    }

    #[test]
    fn l_pass_of_example() {
        let counts = SymbolCounts::new(EXAMPLE, 255);
        let borders = BorderSet::new(EXAMPLE);
        let sorter = StreamingSorter::new(EXAMPLE, &counts, 1 << 16, None);

        let mut out = IndexWriter::new(None, IndexWidth::Byte).unwrap();
        let seeds = borders.iter().map(|position| Ok(position as u64));
        let emitted = sorter.induce_l(seeds, &counts.lms, None, &mut out).unwrap();
        let out: Vec<u64> = out.into_reader().unwrap().map(Result::unwrap).collect();

        assert_eq!(out, [1, 3, 18, 7, 12, 9, 14]);
        assert_eq!(emitted[b'm' as usize], 2);
        assert_eq!(emitted[b's' as usize], 4);
    }

    #[test]
    fn substring_order_matches_in_memory_sort() {
        let mut rng = StdRng::seed_from_u64(11);
        for len in [2, 9, 60, 700] {
            for alphabet in [1u8, 3, 20] {
                let mut text: Vec<u8> = (1..len).map(|_| rng.gen_range(1..=alphabet)).collect();
                text.push(0);

                let classification = Classification::new(&text);
                let seeds = classification.lms_by_first_symbol(&text, alphabet.into());
                let expected = induce::sort_lms_substrings(&text, alphabet.into(), seeds);

                // A budget of one byte forces a single-slot window and maximal spilling
                for budget in [1, 1 << 16] {
                    let counts = SymbolCounts::new(&text, alphabet.into());
                    let sorter = StreamingSorter::new(&text, &counts, budget, None);
                    let sorted = sorter.sort_lms_substrings(classification.borders()).unwrap();
                    let sorted: Vec<usize> =
                        drain(sorted).into_iter().map(|p| p as usize).collect();

                    assert_eq!(sorted, expected, "text {text:?}");
                }
            }
        }
    }

    #[test]
    fn assembles_example() {
        let counts = SymbolCounts::new(EXAMPLE, 255);
        let sums = char_sums(EXAMPLE, 255);
        let sorted_lms = [20u64, 16, 2, 6, 11, 8, 13];

        for budget in [1, 1 << 16] {
            let sorter = StreamingSorter::new(EXAMPLE, &counts, budget, None);
            let bwt = sorter
                .assemble_bwt(sorted_lms.iter().map(|&p| Ok(p)), &sums)
                .unwrap();

            assert_eq!(drain(bwt), b"ars\0mammssamsmaasaaaa");
        }
    }
}
