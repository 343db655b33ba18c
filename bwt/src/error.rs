// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

/// An error indicating that a transform could not be performed.
///
/// Conditions that can only arise from a bug in the transform itself are not represented here;
/// they panic instead.
///
/// # Examples
///
/// ```
/// use bwt::BwtError;
///
/// let mut dest = [0; 5];
/// let result = bwt::bwt(b"hello", &mut dest);
///
/// assert!(matches!(result, Err(BwtError::MissingSentinel)));
/// ```
#[derive(Debug)]
pub enum BwtError {
    /// The text is empty
    Empty,
    /// The text does not end with the sentinel `0`, or a transformed text contains no `0`
    MissingSentinel,
    /// A `0` occurs somewhere other than the final position
    DuplicateSentinel {
        /// Position of the offending `0`
        position: usize,
    },
    /// A symbol is larger than the alphabet bound
    SymbolOutOfRange {
        /// Position of the offending symbol
        position: usize,
        /// The offending symbol
        symbol: u64,
        /// The alphabet bound
        bound: u64,
    },
    /// The destination length differs from the source length
    LengthMismatch {
        /// Required destination length
        expected: usize,
        /// Actual destination length
        found: usize,
    },
    /// An input file's length is not a multiple of its symbol width
    MisalignedInput {
        /// Length of the input in bytes
        len: u64,
        /// Width of one symbol in bytes
        width: usize,
    },
    /// An I/O error occurred
    Io(io::Error),
}

impl Display for BwtError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            BwtError::Empty => write!(f, "text is empty"),
            BwtError::MissingSentinel => write!(f, "text does not contain the sentinel 0"),
            BwtError::DuplicateSentinel { position } => {
                write!(f, "unexpected sentinel 0 at position {position}")
            }
            BwtError::SymbolOutOfRange {
                position,
                symbol,
                bound,
            } => write!(
                f,
                "symbol {symbol} at position {position} exceeds the alphabet bound {bound}",
            ),
            BwtError::LengthMismatch { expected, found } => write!(
                f,
                "destination holds {found} symbols, but {expected} are required",
            ),
            BwtError::MisalignedInput { len, width } => write!(
                f,
                "input length {len} is not a multiple of the symbol width {width}",
            ),
            BwtError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl Error for BwtError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BwtError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BwtError {
    fn from(value: io::Error) -> Self {
        BwtError::Io(value)
    }
}

/// Checks that `text` is a valid input for the forward transform.
///
/// A valid text is non-empty, ends with the sentinel `0`, contains no other `0`, and holds no
/// symbol larger than `max_symbol`.
///
/// # Errors
///
/// Returns the first violated condition, scanning from the start of `text`.
///
/// # Examples
///
/// ```
/// use bwt::BwtError;
///
/// assert!(bwt::validate_text(b"banana\0", 255).is_ok());
/// assert!(matches!(
///     bwt::validate_text(b"ban\0ana\0", 255),
///     Err(BwtError::DuplicateSentinel { position: 3 }),
/// ));
/// ```
pub fn validate_text<S: crate::Symbol>(text: &[S], max_symbol: u64) -> Result<(), BwtError> {
    let Some((last, body)) = text.split_last() else {
        return Err(BwtError::Empty);
    };

    for (position, &symbol) in body.iter().enumerate() {
        if symbol.is_sentinel() {
            return Err(BwtError::DuplicateSentinel { position });
        }
        if symbol.to_u64() > max_symbol {
            return Err(BwtError::SymbolOutOfRange {
                position,
                symbol: symbol.to_u64(),
                bound: max_symbol,
            });
        }
    }

    if last.is_sentinel() {
        Ok(())
    } else {
        Err(BwtError::MissingSentinel)
    }
}
