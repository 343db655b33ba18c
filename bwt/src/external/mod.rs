// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

//! Burrows-Wheeler Transforms of files, with bounded memory for intermediate data.
//!
//! The text of every recursion level is held in RAM. Every list of text positions is streamed
//! through [`PriorityStore`]s and temporary files instead, so index data only exceeds the memory
//! budget by the inverse LF-mapping of a reduced text, which is at most half as long as its parent.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    slice,
};

use log::{debug, info};

use crate::{
    BwtError,
    classify::{BorderSet, SymbolCounts},
    error::validate_text,
    induce::same_lms_substring,
    inverse::inverse_bwt_with_bound,
    reconstruct::ranks,
    symbol::{IndexWidth, SparseAlphabet, Symbol, char_sums},
};

mod induce;
mod priority_store;
mod stream;

use induce::StreamingSorter;
pub use priority_store::{MAX_SPILL_PAGES, PriorityStore};
use stream::{IndexReader, IndexWriter, read_symbols, write_symbols};

// Stores live at once while the transform is assembled: the sorted LMS seeds, the pass queue and
// the output
const LIVE_STORES: usize = 3;

/// Configuration for transforms run in files.
///
/// The defaults suit most inputs, but you may wish to lower the memory budget in especially
/// resource-constrained environments or raise it to avoid spilling on large inputs.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> Result<(), bwt::BwtError> {
/// use bwt::ExternalConfig;
///
/// bwt::bwt_in_files_with_config(
///     "book.txt",
///     255,
///     "book.bwt",
///     ExternalConfig::new().memory_budget(1 << 20).temp_dir("/var/tmp"),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ExternalConfig {
    memory_budget: usize,
    temp_dir: Option<PathBuf>,
}

impl ExternalConfig {
    /// Creates a new configuration with the default memory budget and the system temporary
    /// directory.
    pub const fn new() -> Self {
        Self {
            memory_budget: Self::DEFAULT_MEMORY_BUDGET,
            temp_dir: None,
        }
    }

    /// Sets the number of bytes of RAM shared by the priority stores live at any one time.
    ///
    /// Each store receives an equal share. A store always keeps at least one item in RAM and never
    /// uses more than [`MAX_SPILL_PAGES`] spill files, so tiny budgets are exceeded as needed.
    pub fn memory_budget(&mut self, bytes: usize) -> &mut Self {
        self.memory_budget = bytes;
        self
    }

    /// Sets the directory in which spill and intermediate files are created.
    pub fn temp_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// The default memory budget
    ///
    /// 64 MiB keeps inputs of a few million symbols entirely in RAM.
    pub const DEFAULT_MEMORY_BUDGET: usize = 64 << 20;

    fn store_budget(&self) -> usize {
        self.memory_budget / LIVE_STORES
    }

    fn temp_dir_path(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the Burrows-Wheeler Transform of a file.
///
/// This is shorthand for [`bwt_in_files_with_config()`] with the given memory budget and the
/// system temporary directory.
///
/// # Errors
///
/// See [`bwt_in_files_with_config()`].
pub fn bwt_in_files(
    source: impl AsRef<Path>,
    alphabet_bound: u64,
    memory_budget: usize,
    dest: impl AsRef<Path>,
) -> Result<u64, BwtError> {
    bwt_in_files_with_config(
        source,
        alphabet_bound,
        dest,
        ExternalConfig::new().memory_budget(memory_budget),
    )
}

/// Computes the Burrows-Wheeler Transform of a file, writing it to another file.
///
/// The input is read as symbols of the narrowest width holding `alphabet_bound` (1, 2, 4 or 8
/// bytes, native byte order), and the transform is written with the same width. If the input does
/// not end with the sentinel `0`, one is appended before transforming, so the output is then one
/// symbol longer than the input. Returns the number of symbols written.
///
/// The output is identical to that of [`bwt_with_bound()`](crate::bwt_with_bound()) on the same
/// text.
///
/// # Errors
///
/// Returns an error if the input is not a valid text (see [`validate_text()`]), if its length is
/// not a multiple of the symbol width, or if an I/O error occurs on the input, the output or a
/// temporary file.
pub fn bwt_in_files_with_config(
    source: impl AsRef<Path>,
    alphabet_bound: u64,
    dest: impl AsRef<Path>,
    config: &ExternalConfig,
) -> Result<u64, BwtError> {
    let (source, dest) = (source.as_ref(), dest.as_ref());
    match IndexWidth::for_bound(alphabet_bound) {
        IndexWidth::Byte => transform_file::<u8>(source, alphabet_bound, dest, config),
        IndexWidth::Short => transform_file::<u16>(source, alphabet_bound, dest, config),
        IndexWidth::Word => transform_file::<u32>(source, alphabet_bound, dest, config),
        IndexWidth::Long => transform_file::<u64>(source, alphabet_bound, dest, config),
    }
}

/// Inverts the Burrows-Wheeler Transform stored in a file.
///
/// Symbols are read and written with the narrowest width holding `alphabet_bound`, as in
/// [`bwt_in_files_with_config()`]. The inversion runs in memory. Returns the number of symbols
/// written.
///
/// # Errors
///
/// Returns an error if the input is not a valid transform (see
/// [`inverse_bwt_with_bound()`](crate::inverse_bwt_with_bound())), if its length is not a multiple
/// of the symbol width, or if an I/O error occurs.
pub fn inverse_bwt_in_files(
    source: impl AsRef<Path>,
    alphabet_bound: u64,
    dest: impl AsRef<Path>,
) -> Result<u64, BwtError> {
    let (source, dest) = (source.as_ref(), dest.as_ref());
    match IndexWidth::for_bound(alphabet_bound) {
        IndexWidth::Byte => invert_file::<u8>(source, alphabet_bound, dest),
        IndexWidth::Short => invert_file::<u16>(source, alphabet_bound, dest),
        IndexWidth::Word => invert_file::<u32>(source, alphabet_bound, dest),
        IndexWidth::Long => invert_file::<u64>(source, alphabet_bound, dest),
    }
}

/// Reads a file of native-endian symbols as a text, appending the sentinel `0` if the file does not
/// end with one.
///
/// This is how [`bwt_in_files_with_config()`] reads its input. The text is not otherwise
/// validated.
///
/// # Errors
///
/// Returns [`BwtError::MisalignedInput`] if the file length is not a multiple of the width of `S`,
/// or [`BwtError::Io`] if reading fails.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> Result<(), bwt::BwtError> {
/// let text: Vec<u16> = bwt::read_text("tokens.u16")?;
///
/// assert_eq!(text.last(), Some(&0));
/// # Ok(())
/// # }
/// ```
pub fn read_text<S: Symbol>(path: impl AsRef<Path>) -> Result<Vec<S>, BwtError> {
    let mut text = read_symbols(path.as_ref())?;
    if !text.last().is_some_and(|&symbol: &S| symbol.is_sentinel()) {
        debug!("input does not end with a sentinel, appending one");
        text.push(S::default());
    }

    Ok(text)
}

fn transform_file<S: Symbol>(
    source: &Path,
    alphabet_bound: u64,
    dest: &Path,
    config: &ExternalConfig,
) -> Result<u64, BwtError> {
    info!(
        "transforming '{}' into '{}' with a memory budget of {} bytes",
        source.display(),
        dest.display(),
        config.memory_budget,
    );

    let text: Vec<S> = read_text(source)?;
    validate_text(&text, alphabet_bound)?;

    let mut writer = BufWriter::new(File::create(dest)?);
    if text.len() == 1 {
        write_symbols(&mut writer, &text)?;
    } else if let Some(alphabet) = SparseAlphabet::of(&text) {
        debug!("ranking {} distinct symbols", alphabet.max_rank() + 1);
        let ranked = alphabet.rank_text(&text);
        let mut bwt = transform(&ranked, alphabet.max_rank(), config, 0)?;
        for _ in 0..text.len() {
            let symbol = alphabet.symbol_of(bwt.get()?);
            write_symbols(&mut writer, slice::from_ref(&symbol))?;
        }
    } else {
        let max_symbol = text.iter().map(|&symbol| symbol.rank()).max().unwrap_or(0);
        let mut bwt = transform(&text, max_symbol, config, 0)?;
        for _ in 0..text.len() {
            write_symbols(&mut writer, slice::from_ref(&bwt.get()?))?;
        }
    }
    writer.flush()?;

    info!("wrote {} symbols to '{}'", text.len(), dest.display());

    Ok(text.len() as u64)
}

fn invert_file<S: Symbol>(
    source: &Path,
    alphabet_bound: u64,
    dest: &Path,
) -> Result<u64, BwtError> {
    info!("inverting '{}' into '{}'", source.display(), dest.display());

    let transformed: Vec<S> = read_symbols(source)?;
    let mut text = vec![S::default(); transformed.len()];
    inverse_bwt_with_bound(&transformed, alphabet_bound, &mut text)?;

    let mut writer = BufWriter::new(File::create(dest)?);
    write_symbols(&mut writer, &text)?;
    writer.flush()?;

    Ok(text.len() as u64)
}

/// Runs one level of the pipeline on a validated text of at least two symbols.
///
/// The returned store yields the transform symbol by symbol.
fn transform<S: Symbol>(
    text: &[S],
    max_symbol: usize,
    config: &ExternalConfig,
    depth: usize,
) -> Result<PriorityStore<S>, BwtError> {
    let counts = SymbolCounts::new(text, max_symbol);
    let borders = BorderSet::new(text);
    let sorter = StreamingSorter::new(
        text,
        &counts,
        config.store_budget(),
        config.temp_dir_path(),
    );

    let sorted_substrings = sorter.sort_lms_substrings(&borders)?;
    let reduced = name_substrings(text, &borders, sorted_substrings, config)?;

    debug!(
        "level {depth}: {} symbols, {} LMS substrings, {} distinct",
        text.len(),
        reduced.names.len(),
        reduced.max_name + 1,
    );

    let mut sorted_lms = solve(reduced, &borders, config, depth)?;
    let char_sums = char_sums(text, max_symbol);
    let lms_count = sorted_lms.capacity();
    let seeds = (0..lms_count).map(move |_| sorted_lms.get());

    Ok(sorter.assemble_bwt(seeds, &char_sums)?)
}

/// A reduced text written to a temporary file.
struct ReducedFile {
    names: IndexReader,
    max_name: u64,
}

/// Names the LMS substrings of `text` and writes the names out in text order.
///
/// `sorted` must yield the LMS positions sorted by substring content. Names are handed out as by
/// the in-memory reducer: 0 for the sentinel, then 1, 2, ... for every further distinct substring.
fn name_substrings<S: Symbol>(
    text: &[S],
    borders: &BorderSet,
    mut sorted: PriorityStore<u64>,
    config: &ExternalConfig,
) -> io::Result<ReducedFile> {
    let lms_count = sorted.capacity();
    let is_border = |position| borders.contains(position);

    // Keyed by the index of each LMS position in text order
    let mut names =
        PriorityStore::<u64>::new(lms_count, config.store_budget(), config.temp_dir_path());
    let mut previous = sorted.get()? as usize;
    assert_eq!(
        previous,
        text.len() - 1,
        "the sentinel must sort before every other LMS substring",
    );
    names.insert(0, borders.rank(previous) as u64)?;

    let mut name = 0;
    for _ in 1..lms_count {
        let position = sorted.get()? as usize;
        if !same_lms_substring(text, is_border, previous, position) {
            name += 1;
        }
        names.insert(name, borders.rank(position) as u64)?;
        previous = position;
    }
    drop(sorted);

    let mut writer = IndexWriter::new(config.temp_dir_path(), IndexWidth::for_bound(name))?;
    for _ in 0..lms_count {
        writer.push(names.get()?)?;
    }

    Ok(ReducedFile {
        names: writer.into_reader()?,
        max_name: name,
    })
}

/// Returns a store yielding the LMS positions in suffix order, recursing into the reduced text if
/// its names repeat.
fn solve(
    reduced: ReducedFile,
    borders: &BorderSet,
    config: &ExternalConfig,
    depth: usize,
) -> Result<PriorityStore<u64>, BwtError> {
    let ReducedFile { names, max_name } = reduced;

    let reduced_bwt = if max_name + 1 == names.len() {
        direct_bwt(names, max_name, config)?
    } else {
        debug!("level {depth}: names repeat, recursing");
        // The reduced text is held with the narrowest symbol type able to hold its largest name
        match IndexWidth::for_bound(max_name) {
            IndexWidth::Byte => solve_as::<u8>(names, max_name, config, depth)?,
            IndexWidth::Short => solve_as::<u16>(names, max_name, config, depth)?,
            IndexWidth::Word => solve_as::<u32>(names, max_name, config, depth)?,
            IndexWidth::Long => solve_as::<u64>(names, max_name, config, depth)?,
        }
    };

    Ok(sorted_lms_suffixes(reduced_bwt, max_name, borders, config)?)
}

/// Computes the transform of a reduced text with repeated names by running the whole pipeline on
/// it.
fn solve_as<T: Symbol>(
    names: IndexReader,
    max_name: u64,
    config: &ExternalConfig,
    depth: usize,
) -> Result<IndexReader, BwtError> {
    let reduced_text = names
        .map(|name| name.map(T::from_u64))
        .collect::<io::Result<Vec<T>>>()?;
    let mut bwt = transform(&reduced_text, max_name as usize, config, depth + 1)?;

    let mut writer = IndexWriter::new(config.temp_dir_path(), IndexWidth::for_bound(max_name))?;
    for _ in 0..reduced_text.len() {
        writer.push(bwt.get()?.to_u64())?;
    }

    Ok(writer.into_reader()?)
}

/// Computes the transform of a reduced text whose names are all distinct.
///
/// A unique name is the rank of its rotation, so every name is routed straight to its row, carrying
/// the name preceding it.
fn direct_bwt(
    names: IndexReader,
    max_name: u64,
    config: &ExternalConfig,
) -> io::Result<IndexReader> {
    let len = names.len();
    let mut rows = PriorityStore::<u64>::new(len, config.store_budget(), config.temp_dir_path());

    // Position 0 is preceded by the sentinel at the end of the text, named 0
    let mut previous = 0;
    for name in names {
        let name = name?;
        rows.insert(previous, name)?;
        previous = name;
    }

    let mut writer = IndexWriter::new(config.temp_dir_path(), IndexWidth::for_bound(max_name))?;
    for _ in 0..len {
        writer.push(rows.get()?)?;
    }

    writer.into_reader()
}

/// Recovers the sorted order of the LMS suffixes from the transform of the reduced text.
///
/// The inverse LF-mapping of the reduced transform is held in RAM. The LMS positions, read from
/// `borders` in text order, are routed to their ranks through a priority store.
fn sorted_lms_suffixes(
    mut reduced_bwt: IndexReader,
    max_name: u64,
    borders: &BorderSet,
    config: &ExternalConfig,
) -> io::Result<PriorityStore<u64>> {
    let len = reduced_bwt.len();

    let mut next = vec![0; max_name as usize + 2];
    for name in reduced_bwt.by_ref() {
        next[name? as usize + 1] += 1;
    }
    for c in 1..next.len() {
        next[c] += next[c - 1];
    }

    reduced_bwt.rewind()?;
    let mut inverse_lf = vec![0; len as usize];
    for (i, name) in reduced_bwt.enumerate() {
        let slot = &mut next[name? as usize];
        inverse_lf[*slot] = i;
        *slot += 1;
    }

    let mut sorted = PriorityStore::<u64>::new(len, config.store_budget(), config.temp_dir_path());
    for (position, rank) in borders.iter().zip(ranks(&inverse_lf)) {
        sorted.insert(position as u64, rank as u64)?;
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::{TempDir, tempdir};

    use super::*;

    fn transform_bytes(text: &[u8], memory_budget: usize) -> Vec<u8> {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        fs::write(&input, text).unwrap();

        let written = bwt_in_files(&input, 255, memory_budget, &output).unwrap();
        let transformed = fs::read(&output).unwrap();
        assert_eq!(written, transformed.len() as u64);

        transformed
    }

    // A directory holding an input file with the given contents
    fn input_dir(contents: &[u8]) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        fs::write(&input, contents).unwrap();

        (dir, input, output)
    }

    #[test]
    fn paper_example() {
        for budget in [1, 64, 1 << 20] {
            assert_eq!(
                transform_bytes(b"amammmasasmasassaara\0", budget),
                b"ars\0mammssamsmaasaaaa",
            );
        }
    }

    #[test]
    fn appends_missing_sentinel() {
        assert_eq!(transform_bytes(b"cabadabab", 1 << 10), b"bbdcbaaa\0a");
    }

    #[test]
    fn empty_file_becomes_sentinel() {
        assert_eq!(transform_bytes(b"", 1 << 10), b"\0");
    }

    #[test]
    fn recursion_matches_in_memory() {
        let text: Vec<u8> = b"abcab".repeat(300).into_iter().chain([0]).collect();
        let mut expected = vec![0; text.len()];
        crate::bwt(&text, &mut expected).unwrap();

        for budget in [1, 1 << 12, 1 << 20] {
            assert_eq!(transform_bytes(&text, budget), expected);
        }
    }

    #[test]
    fn reads_text_with_sentinel() {
        let (_dir, input, _) = input_dir(bytemuck::cast_slice::<u16, u8>(&[1, 2]));

        let text: Vec<u16> = read_text(&input).unwrap();
        assert_eq!(text, [1, 2, 0]);

        fs::write(&input, [5, 0]).unwrap();
        let text: Vec<u8> = read_text(&input).unwrap();
        assert_eq!(text, [5, 0]);
    }

    #[test]
    fn wide_symbols() {
        let text = [2u16, 3, 400, 3, 500, 1, 0];
        let (_dir, input, output) = input_dir(bytemuck::cast_slice::<u16, u8>(&text));

        bwt_in_files(&input, 500, 16, &output).unwrap();
        let bytes = fs::read(&output).unwrap();
        let transformed: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .collect();

        assert_eq!(transformed, [1, 500, 0, 2, 400, 3, 3]);
    }

    #[test]
    fn largest_u64_symbols() {
        let text = [u64::MAX, 1 << 40, u64::MAX, 0];
        let (_dir, input, output) = input_dir(bytemuck::cast_slice::<u64, u8>(&text));
        let mut expected = [0; 4];
        crate::bwt_with_bound(&text, u64::MAX, &mut expected).unwrap();

        bwt_in_files(&input, u64::MAX, 1, &output).unwrap();
        let transformed: Vec<u64> = read_symbols(&output).unwrap();

        assert_eq!(transformed, expected);
    }

    #[test]
    fn inverts_file() {
        let (_dir, input, output) = input_dir(b"bbdcbaaa\0a");

        let written = inverse_bwt_in_files(&input, 255, &output).unwrap();

        assert_eq!(written, 10);
        assert_eq!(fs::read(&output).unwrap(), b"cabadabab\0");
    }

    #[test]
    fn rejects_interior_sentinel() {
        let (_dir, input, output) = input_dir(b"ab\0ab\0");

        assert!(matches!(
            bwt_in_files(&input, 255, 1 << 10, &output),
            Err(BwtError::DuplicateSentinel { position: 2 }),
        ));
    }

    #[test]
    fn rejects_misaligned_input() {
        let (_dir, input, output) = input_dir(&[1, 2, 3]);

        assert!(matches!(
            bwt_in_files(&input, 1000, 1 << 10, &output),
            Err(BwtError::MisalignedInput { len: 3, width: 2 }),
        ));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempdir().unwrap();

        assert!(matches!(
            bwt_in_files(dir.path().join("missing"), 255, 1 << 10, dir.path().join("output")),
            Err(BwtError::Io(_)),
        ));
    }

    #[test]
    fn unusable_temp_dir_is_an_io_error() {
        let (dir, input, output) = input_dir(b"mississippi");
        let mut config = ExternalConfig::new();
        config.memory_budget(1).temp_dir(dir.path().join("missing"));

        let result = bwt_in_files_with_config(&input, 255, &output, &config);

        assert!(matches!(
            result,
            Err(BwtError::Io(ref e)) if e.kind() == io::ErrorKind::NotFound,
        ));
    }

    #[test]
    fn config_builder() {
        let mut config = ExternalConfig::new();
        config.memory_budget(300).temp_dir("/tmp");

        assert_eq!(config.store_budget(), 100);
        assert_eq!(config.temp_dir_path(), Some(Path::new("/tmp")));
        assert_eq!(
            ExternalConfig::default().memory_budget,
            ExternalConfig::DEFAULT_MEMORY_BUDGET,
        );
    }
}
