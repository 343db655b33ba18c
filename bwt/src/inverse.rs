// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use crate::{
    BwtError,
    symbol::{SparseAlphabet, Symbol, char_sums},
};

/// Inverts the Burrows-Wheeler Transform of a byte string.
///
/// `source` must be the output of [`bwt()`](crate::bwt()), and therefore contain exactly one `0`.
/// The original text, ending with its sentinel, is written to `dest`.
///
/// This operation is *O*(*n*).
///
/// # Errors
///
/// Returns an error if `source` is empty, does not contain exactly one `0`, or if `dest` has a
/// different length than `source`.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), bwt::BwtError> {
/// let mut text = [0; 10];
/// bwt::inverse_bwt(b"bbdcbaaa\0a", &mut text)?;
///
/// assert_eq!(&text, b"cabadabab\0");
/// # Ok(())
/// # }
/// ```
pub fn inverse_bwt(source: &[u8], dest: &mut [u8]) -> Result<(), BwtError> {
    inverse_bwt_with_bound(source, u8::MAX.into(), dest)
}

/// Inverts the Burrows-Wheeler Transform of a text over the alphabet `0..=max_symbol`.
///
/// # Errors
///
/// Returns an error if `source` is empty, does not contain exactly one `0`, holds a symbol larger
/// than `max_symbol`, or if `dest` has a different length than `source`.
pub fn inverse_bwt_with_bound<S: Symbol>(
    source: &[S],
    max_symbol: u64,
    dest: &mut [S],
) -> Result<(), BwtError> {
    if dest.len() != source.len() {
        return Err(BwtError::LengthMismatch {
            expected: source.len(),
            found: dest.len(),
        });
    }
    if source.is_empty() {
        return Err(BwtError::Empty);
    }

    let mut sentinel = None;
    for (position, &symbol) in source.iter().enumerate() {
        if symbol.to_u64() > max_symbol {
            return Err(BwtError::SymbolOutOfRange {
                position,
                symbol: symbol.to_u64(),
                bound: max_symbol,
            });
        }
        if symbol.is_sentinel() {
            if sentinel.is_some() {
                return Err(BwtError::DuplicateSentinel { position });
            }
            sentinel = Some(position);
        }
    }
    let sentinel = sentinel.ok_or(BwtError::MissingSentinel)?;

    if let Some(alphabet) = SparseAlphabet::of(source) {
        invert(&alphabet.rank_text(source), alphabet.max_rank(), sentinel, dest);
        for symbol in dest.iter_mut() {
            *symbol = alphabet.symbol_of(*symbol);
        }
    } else {
        let max_seen = source.iter().map(|&symbol| symbol.rank()).max().unwrap_or(0);
        invert(source, max_seen, sentinel, dest);
    }

    Ok(())
}

/// Rebuilds the text from its transform with one LF-mapping traversal, back to front.
///
/// `sentinel` is the row holding the sentinel, i.e. the row of the rotation starting at position 0.
fn invert<S: Symbol>(source: &[S], max_symbol: usize, sentinel: usize, dest: &mut [S]) {
    let mut next = char_sums(source, max_symbol);
    let lf_mapping: Vec<usize> = source
        .iter()
        .map(|&symbol| {
            let slot = &mut next[symbol.rank()];
            *slot += 1;
            *slot - 1
        })
        .collect();

    let mut row = sentinel;
    for slot in dest.iter_mut().rev() {
        *slot = source[row];
        row = lf_mapping[row];
    }
}
