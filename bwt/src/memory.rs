// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use log::debug;

use crate::{
    BwtError,
    classify::Classification,
    error::validate_text,
    induce::{assemble_bwt, sort_lms_substrings},
    reconstruct::{direct_bwt, sorted_lms_suffixes},
    reduce::{Reduced, reduce},
    symbol::{IndexWidth, SparseAlphabet, Symbol, char_sums},
};

/// Computes the Burrows-Wheeler Transform of a byte string.
///
/// `source` MUST end with a `0` that occurs nowhere else; append one to the data you actually wish
/// to transform. `dest` receives `source.len()` bytes, where `dest[i]` is the byte preceding the
/// `i`-th smallest suffix of `source`.
///
/// This operation is *O*(*n*).
///
/// # Errors
///
/// Returns an error if `source` is not a valid text (see [`validate_text()`]) or if `dest` has a
/// different length than `source`.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), bwt::BwtError> {
/// let mut transformed = [0; 10];
/// bwt::bwt(b"cabadabab\0", &mut transformed)?;
///
/// assert_eq!(&transformed, b"bbdcbaaa\0a");
/// # Ok(())
/// # }
/// ```
pub fn bwt(source: &[u8], dest: &mut [u8]) -> Result<(), BwtError> {
    bwt_with_bound(source, u8::MAX.into(), dest)
}

/// Computes the Burrows-Wheeler Transform of a text over the alphabet `0..=max_symbol`.
///
/// This is the generic form of [`bwt()`] for symbols wider than a byte. Memory usage grows with
/// `max_symbol`, so pass the tightest bound known.
///
/// # Errors
///
/// Returns an error if `source` is not a valid text (see [`validate_text()`]) or if `dest` has a
/// different length than `source`.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), bwt::BwtError> {
/// let text = [2u16, 3, 400, 3, 500, 1, 0];
/// let mut transformed = [0; 7];
/// bwt::bwt_with_bound(&text, 500, &mut transformed)?;
///
/// assert_eq!(transformed, [1, 500, 0, 2, 400, 3, 3]);
/// # Ok(())
/// # }
/// ```
pub fn bwt_with_bound<S: Symbol>(
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
    validate_text(source, max_symbol)?;

    if source.len() == 1 {
        dest[0] = source[0];
        return Ok(());
    }

    if let Some(alphabet) = SparseAlphabet::of(source) {
        debug!("ranking {} distinct symbols", alphabet.max_rank() + 1);
        let ranked = alphabet.rank_text(source);
        transform(&ranked, alphabet.max_rank(), dest, 0);
        for symbol in dest.iter_mut() {
            *symbol = alphabet.symbol_of(*symbol);
        }
    } else {
        // A valid text holds no symbol above the largest one present, so shrink the bucket tables
        // to it
        let max_present = source.iter().map(|&symbol| symbol.rank()).max().unwrap_or(0);
        transform(source, max_present, dest, 0);
    }

    Ok(())
}

/// Runs one level of the pipeline on a validated text of at least two symbols.
fn transform<S: Symbol>(text: &[S], max_symbol: usize, dest: &mut [S], depth: usize) {
    let classification = Classification::new(text);
    let seeds = classification.lms_by_first_symbol(text, max_symbol);
    let sorted_substrings = sort_lms_substrings(text, max_symbol, seeds);
    let reduced = reduce(text, &classification, &sorted_substrings);
    drop(sorted_substrings);

    debug!(
        "level {depth}: {} symbols, {} LMS substrings, {} distinct",
        text.len(),
        reduced.names.len(),
        reduced.max_name + 1,
    );

    let sorted_lms = solve(&reduced, depth);
    drop(reduced);

    let char_sums = char_sums(text, max_symbol);
    assemble_bwt(text, max_symbol, &sorted_lms, &char_sums, dest);
}

/// Returns the LMS suffixes in sorted order, recursing into the reduced text if its names repeat.
///
/// The reduced text is stored with the narrowest symbol type able to hold its largest name.
fn solve(reduced: &Reduced, depth: usize) -> Vec<usize> {
    match IndexWidth::for_bound(reduced.max_name as u64) {
        IndexWidth::Byte => solve_as::<u8>(reduced, depth),
        IndexWidth::Short => solve_as::<u16>(reduced, depth),
        IndexWidth::Word => solve_as::<u32>(reduced, depth),
        IndexWidth::Long => solve_as::<u64>(reduced, depth),
    }
}

fn solve_as<T: Symbol>(reduced: &Reduced, depth: usize) -> Vec<usize> {
    let names: Vec<T> = reduced.names.iter().map(|&name| T::from_rank(name)).collect();
    let mut reduced_bwt = vec![T::default(); names.len()];

    if reduced.is_unique() {
        direct_bwt(&names, &mut reduced_bwt);
    } else {
        debug!("level {depth}: names repeat, recursing");
        transform(&names, reduced.max_name, &mut reduced_bwt, depth + 1);
    }

    sorted_lms_suffixes(&reduced_bwt, reduced.max_name, &reduced.recovery)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::inverse_bwt_with_bound;

    fn transformed(text: &[u8]) -> Vec<u8> {
        let mut dest = vec![0; text.len()];
        bwt(text, &mut dest).unwrap();
        dest
    }

    // Sorts all rotations directly
    fn naive<S: Symbol>(text: &[S]) -> Vec<S> {
        let n = text.len();
        let mut rotations: Vec<usize> = (0..n).collect();
        rotations.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
        rotations
            .into_iter()
            .map(|i| text[(i + n - 1) % n])
            .collect()
    }

    #[test]
    fn paper_example() {
        assert_eq!(
            transformed(b"amammmasasmasassaara\0"),
            b"ars\0mammssamsmaasaaaa",
        );
    }

    #[test]
    fn short_examples() {
        assert_eq!(transformed(b"cabadabab\0"), b"bbdcbaaa\0a");
        assert_eq!(transformed(&[2, 3, 4, 3, 5, 1, 0]), [1, 5, 0, 2, 4, 3, 3]);
        assert_eq!(
            transformed(b"egargdfafddfhahdfdhf\0"),
            b"ffhgfghdf\0hdadderfada",
        );
    }

    #[test]
    fn only_sentinel() {
        assert_eq!(transformed(b"\0"), b"\0");
    }

    #[test]
    fn two_symbols() {
        assert_eq!(transformed(b"a\0"), b"a\0");
    }

    #[test]
    fn recursion_is_exercised() {
        // Every LMS substring of a periodic text is the same, so the reduced text repeats names
        let text: Vec<u8> = b"abcab".repeat(300).into_iter().chain([0]).collect();

        assert_eq!(transformed(&text), naive(&text));
    }

    #[test]
    fn wide_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut text: Vec<u32> = (0..2000).map(|_| rng.gen_range(1..=70_000)).collect();
        text.push(0);
        let mut dest = vec![0; text.len()];
        bwt_with_bound(&text, 70_000, &mut dest).unwrap();

        assert_eq!(dest, naive(&text));

        let mut restored = vec![0; text.len()];
        inverse_bwt_with_bound(&dest, 70_000, &mut restored).unwrap();
        assert_eq!(restored, text);
    }

    #[test]
    fn random_texts_match_naive() {
        let mut rng = StdRng::seed_from_u64(42);
        for len in [2, 3, 10, 50, 500] {
            for alphabet in [1u8, 2, 4, 255] {
                let mut text: Vec<u8> = (1..len).map(|_| rng.gen_range(1..=alphabet)).collect();
                text.push(0);

                assert_eq!(transformed(&text), naive(&text), "text {text:?}");
            }
        }
    }

    #[test]
    fn largest_u64_symbol() {
        let mut dest = [0; 2];
        bwt_with_bound(&[u64::MAX, 0], u64::MAX, &mut dest).unwrap();

        assert_eq!(dest, [u64::MAX, 0]);
    }

    #[test]
    fn sparse_wide_alphabet_matches_naive() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut text: Vec<u32> = (0..3000)
            .map(|_| u32::MAX - rng.gen_range(0..40))
            .collect();
        text.push(0);
        let mut dest = vec![0; text.len()];
        bwt_with_bound(&text, u32::MAX.into(), &mut dest).unwrap();

        assert_eq!(dest, naive(&text));
    }

    #[test]
    fn rejects_interior_sentinel() {
        let mut dest = [0; 4];

        assert!(matches!(
            bwt(b"a\0b\0", &mut dest),
            Err(BwtError::DuplicateSentinel { position: 1 }),
        ));
    }

    #[test]
    fn rejects_symbol_over_bound() {
        let mut dest = [0; 3];

        assert!(matches!(
            bwt_with_bound(&[9u8, 3, 0], 8, &mut dest),
            Err(BwtError::SymbolOutOfRange { position: 0, .. }),
        ));
    }
}
