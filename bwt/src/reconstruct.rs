// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use crate::symbol::{Symbol, char_sums, predecessor};

/// Computes the BWT of a reduced text whose names are all distinct.
///
/// With unique names, a name is the rank of its rotation, so one placement pass sorts them.
pub(crate) fn direct_bwt<S: Symbol>(names: &[S], bwt: &mut [S]) {
    let m = names.len();
    let mut location = vec![usize::MAX; m];
    for (i, &name) in names.iter().enumerate() {
        let slot = &mut location[name.rank()];
        assert_eq!(*slot, usize::MAX, "name {name:?} is not unique");
        *slot = i;
    }

    for (symbol, &i) in bwt.iter_mut().zip(&location) {
        *symbol = names[predecessor(i, m)];
    }
}

/// Builds the inverse of the LF-mapping of `bwt`.
///
/// Entry `r` is the row of the rotation that starts one position after the rotation in row `r`.
pub(crate) fn inverse_lf<S: Symbol>(bwt: &[S], max_symbol: usize) -> Vec<usize> {
    let mut next = char_sums(bwt, max_symbol);
    let mut inverse = vec![0; bwt.len()];
    for (i, &symbol) in bwt.iter().enumerate() {
        let slot = &mut next[symbol.rank()];
        inverse[*slot] = i;
        *slot += 1;
    }

    inverse
}

/// Walks `inverse_lf` from the sentinel row, yielding the rank of every text position from position
/// 0 upwards.
pub(crate) fn ranks(inverse_lf: &[usize]) -> impl Iterator<Item = usize> + '_ {
    // Row 0 is the rotation starting at the sentinel, the last position
    (0..inverse_lf.len()).scan(0, |row, _| {
        *row = inverse_lf[*row];
        Some(*row)
    })
}

/// Recovers the sorted order of a text's LMS suffixes from the BWT of its reduced text.
///
/// `recovery[t]` is the text position of the LMS substring named by the `t`-th symbol of the
/// reduced text.
pub(crate) fn sorted_lms_suffixes<S: Symbol>(
    reduced_bwt: &[S],
    max_name: usize,
    recovery: &[usize],
) -> Vec<usize> {
    let inverse = inverse_lf(reduced_bwt, max_name);
    let mut sorted = vec![usize::MAX; recovery.len()];
    for (&position, rank) in recovery.iter().zip(ranks(&inverse)) {
        assert_eq!(sorted[rank], usize::MAX, "rank {rank} reached twice");
        sorted[rank] = position;
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_bwt_of_unique_names() {
        let names = [3u8, 5, 1, 4, 2, 6, 7, 0];
        let mut bwt = [0; 8];
        direct_bwt(&names, &mut bwt);

        // Rotations sorted: 7, 2, 4, 0, 3, 1, 5, 6
        assert_eq!(bwt, [7, 5, 4, 0, 1, 3, 2, 6]);
    }

    #[test]
    #[should_panic]
    fn direct_bwt_rejects_repeated_names() {
        let mut bwt = [0; 4];
        direct_bwt(&[2u8, 2, 1, 0], &mut bwt);
    }

    #[test]
    fn ranks_of_reduced_text() {
        // BWT of [2, 3, 4, 3, 5, 1, 0]
        let bwt = [1u8, 5, 0, 2, 4, 3, 3];
        let inverse = inverse_lf(&bwt, 5);

        assert_eq!(ranks(&inverse).collect::<Vec<_>>(), [2, 3, 5, 4, 6, 1, 0]);
    }

    #[test]
    fn sorted_lms_of_example() {
        // Reduced text of "amammmasasmasassaara\0" is [2, 3, 4, 3, 5, 1, 0]
        let bwt = [1u8, 5, 0, 2, 4, 3, 3];
        let recovery = [2, 6, 8, 11, 13, 16, 20];

        assert_eq!(
            sorted_lms_suffixes(&bwt, 5, &recovery),
            [20, 16, 2, 6, 11, 8, 13],
        );
    }
}
