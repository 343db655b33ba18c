// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use crate::{classify::Classification, induce::same_lms_substring, symbol::Symbol};

/// A text reduced to one name per LMS substring.
pub(crate) struct Reduced {
    /// The name of every LMS substring, in text order
    pub(crate) names: Vec<usize>,
    /// The text position at which each LMS substring of `names` starts
    pub(crate) recovery: Vec<usize>,
    /// The largest name handed out
    pub(crate) max_name: usize,
}

impl Reduced {
    /// Returns `true` if no two LMS substrings share a name.
    ///
    /// The suffix order of `names` then follows directly from the names themselves.
    pub(crate) fn is_unique(&self) -> bool {
        self.max_name + 1 == self.names.len()
    }
}

/// Names the LMS substrings of `text`, given its LMS positions sorted by substring content.
///
/// The sentinel substring sorts first and is named 0, so the reduced text again ends with a unique
/// sentinel. Every other distinct substring is named 1, 2, ... in sorted order.
pub(crate) fn reduce<S: Symbol>(
    text: &[S],
    classification: &Classification,
    sorted_lms: &[usize],
) -> Reduced {
    assert_eq!(
        sorted_lms.first(),
        Some(&(text.len() - 1)),
        "the sentinel must sort before every other LMS substring",
    );

    let borders = classification.borders();
    let is_border = |position| borders.contains(position);

    // LMS positions are at least two apart, so halving them keeps them distinct
    let mut sparse = vec![None; text.len() / 2 + 1];
    let mut name = 0;
    let mut previous = sorted_lms[0];
    sparse[previous / 2] = Some(0);
    for &position in &sorted_lms[1..] {
        if !same_lms_substring(text, is_border, previous, position) {
            name += 1;
        }
        assert!(
            sparse[position / 2].is_none(),
            "LMS position {position} named twice",
        );
        sparse[position / 2] = Some(name);
        previous = position;
    }

    let names: Vec<usize> = sparse.into_iter().flatten().collect();
    let recovery = classification.lms().to_vec();
    assert_eq!(
        names.len(),
        recovery.len(),
        "every LMS substring must receive exactly one name",
    );

    Reduced {
        names,
        recovery,
        max_name: name,
    }
}
