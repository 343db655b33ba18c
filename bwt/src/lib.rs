// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

//! Linear-time Burrows-Wheeler Transforms by induced sorting.
//!
//! This crate computes the Burrows-Wheeler Transform (BWT) of a text and inverts it. The transform
//! is built with the SA-IS induced-sorting method, without ever materializing a full suffix array:
//! only the LMS suffixes are sorted, recursively if needed, and the final induced passes write the
//! transform directly. Texts held in memory are transformed with [`bwt()`], and files of any size
//! are transformed with [`bwt_in_files()`], which keeps intermediate data within a memory budget
//! by spilling it to temporary files.
//!
//! Every text must end with the sentinel `0`, which may occur nowhere else.
//!
//! # Examples
//!
//! Transforming a byte string and restoring it:
//!
//! ```
//! # fn main() -> Result<(), bwt::BwtError> {
//! let mut text = b"banana".to_vec();
//! // Ensure the last byte is a 0
//! text.push(0);
//!
//! let mut transformed = vec![0; text.len()];
//! bwt::bwt(&text, &mut transformed)?;
//! assert_eq!(transformed, b"annb\0aa");
//!
//! let mut restored = vec![0; transformed.len()];
//! bwt::inverse_bwt(&transformed, &mut restored)?;
//! assert_eq!(restored, text);
//! # Ok(())
//! # }
//! ```
//!
//! Transforming a file with at most 16 MiB of intermediate data in RAM:
//!
//! ```no_run
//! # fn main() -> Result<(), bwt::BwtError> {
//! bwt::bwt_in_files("genome.txt", 255, 16 << 20, "genome.bwt")?;
//! # Ok(())
//! # }
//! ```

mod classify;
mod error;
pub mod external;
mod induce;
mod inverse;
mod memory;
mod reconstruct;
mod reduce;
mod symbol;

pub use error::{BwtError, validate_text};
pub use external::{
    ExternalConfig, bwt_in_files, bwt_in_files_with_config, inverse_bwt_in_files, read_text,
};
pub use inverse::{inverse_bwt, inverse_bwt_with_bound};
pub use memory::{bwt, bwt_with_bound};
pub use symbol::{IndexWidth, Symbol};
