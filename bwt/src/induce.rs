// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use core::mem;

use crate::symbol::{Symbol, predecessor};

/// Destination of the symbols produced by a data-producing induced pass.
///
/// Each induced position `j` of rank `rank` in bucket `c` emits `text[predecessor(j)]` into the
/// slot that `j` occupies in the sorted order of all rotations.
struct Emitter<'a, S> {
    bwt: &'a mut [S],
    char_sums: &'a [usize],
}

/// Sorts the LMS positions of `text` by the content of their LMS substrings.
///
/// `seeds` holds the LMS positions bucketed by first symbol, in any order within a bucket. Equal
/// LMS substrings end up adjacent in the result, in unspecified order.
pub(crate) fn sort_lms_substrings<S: Symbol>(
    text: &[S],
    max_symbol: usize,
    seeds: Vec<Vec<usize>>,
) -> Vec<usize> {
    let l_out = induce_l(text, max_symbol, seeds, None);
    let l_out = group_by_first_symbol(text, max_symbol, &l_out);
    induce_s(text, max_symbol, l_out, None)
}

/// Writes the Burrows-Wheeler Transform of `text` into `bwt`.
///
/// `sorted_lms` must list every LMS position of `text` in true suffix order, and `char_sums` must
/// be the cumulative symbol-count table of `text`.
pub(crate) fn assemble_bwt<S: Symbol>(
    text: &[S],
    max_symbol: usize,
    sorted_lms: &[usize],
    char_sums: &[usize],
    bwt: &mut [S],
) {
    let seeds = group_by_first_symbol(text, max_symbol, sorted_lms);
    let l_out = induce_l(
        text,
        max_symbol,
        seeds,
        Some(Emitter {
            bwt: &mut *bwt,
            char_sums,
        }),
    );
    let l_out = group_by_first_symbol(text, max_symbol, &l_out);
    induce_s(text, max_symbol, l_out, Some(Emitter { bwt, char_sums }));
}

/// Splits `positions` into one bucket per first symbol, keeping their relative order.
fn group_by_first_symbol<S: Symbol>(
    text: &[S],
    max_symbol: usize,
    positions: &[usize],
) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); max_symbol + 1];
    for &position in positions {
        buckets[text[position].rank()].push(position);
    }

    buckets
}

/// Induces L-type positions from LMS seeds, walking the buckets in ascending symbol order.
///
/// Within a bucket, induced positions are visited in the order they were appended (including ones
/// appended while the bucket is being walked) and the bucket's seeds after them. Returns the
/// visited L-type positions whose predecessor is S-type, in visiting order.
fn induce_l<S: Symbol>(
    text: &[S],
    max_symbol: usize,
    mut seeds: Vec<Vec<usize>>,
    mut emitter: Option<Emitter<'_, S>>,
) -> Vec<usize> {
    let n = text.len();
    let mut induced: Vec<Vec<usize>> = vec![Vec::new(); max_symbol + 1];
    let mut out = Vec::new();

    let mut visit = |j: usize, induced: &mut Vec<Vec<usize>>| {
        let p = predecessor(j, n);
        if text[p] >= text[j] {
            induced[text[p].rank()].push(p);
        } else {
            out.push(j);
        }
    };

    for c in 0..=max_symbol {
        // Entries appended to this bucket while it is walked are visited too
        let mut rank = 0;
        while rank < induced[c].len() {
            let j = induced[c][rank];
            if let Some(emitter) = emitter.as_mut() {
                let slot = emitter.char_sums[c] + rank;
                emitter.bwt[slot] = text[predecessor(j, n)];
            }
            visit(j, &mut induced);
            rank += 1;
        }
        induced[c] = Vec::new();

        for j in mem::take(&mut seeds[c]) {
            visit(j, &mut induced);
        }
    }

    out
}

/// Induces S-type positions from L-type seeds, walking the buckets in descending symbol order.
///
/// Within a bucket, induced positions are visited in the order they were appended and the bucket's
/// seeds after them, last seed first. Returns the visited S-type positions whose predecessor is
/// L-type, i.e. the LMS positions, in ascending sorted order.
fn induce_s<S: Symbol>(
    text: &[S],
    max_symbol: usize,
    mut seeds: Vec<Vec<usize>>,
    mut emitter: Option<Emitter<'_, S>>,
) -> Vec<usize> {
    let n = text.len();
    let mut induced: Vec<Vec<usize>> = vec![Vec::new(); max_symbol + 1];
    let mut out = Vec::new();

    let mut visit = |j: usize, induced: &mut Vec<Vec<usize>>| {
        let p = predecessor(j, n);
        if text[p] <= text[j] {
            induced[text[p].rank()].push(p);
        } else {
            out.push(j);
        }
    };

    for c in (0..=max_symbol).rev() {
        let mut rank = 0;
        while rank < induced[c].len() {
            let j = induced[c][rank];
            if let Some(emitter) = emitter.as_mut() {
                let slot = emitter.char_sums[c + 1] - rank - 1;
                emitter.bwt[slot] = text[predecessor(j, n)];
            }
            visit(j, &mut induced);
            rank += 1;
        }
        induced[c] = Vec::new();

        for j in mem::take(&mut seeds[c]).into_iter().rev() {
            visit(j, &mut induced);
        }
    }

    // Built from the largest LMS suffix down
    out.reverse();
    out
}

/// Compares the LMS substrings starting at `a` and `b`.
///
/// A substring runs up to and including the next LMS border. Returns `true` if both have the same
/// symbols and end at the same offset.
pub(crate) fn same_lms_substring<S, F>(text: &[S], is_border: F, a: usize, b: usize) -> bool
where
    S: Symbol,
    F: Fn(usize) -> bool,
{
    let last = text.len() - 1;
    // The sentinel substring is unique
    if a == last || b == last {
        return a == b;
    }

    let mut d = 0;
    loop {
        if text[a + d] != text[b + d] {
            return false;
        }
        if d > 0 {
            let (end_a, end_b) = (is_border(a + d), is_border(b + d));
            if end_a || end_b {
                return end_a && end_b;
            }
        }
        d += 1;
    }
}
