// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    mem,
    path::Path,
};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    BwtError,
    symbol::{IndexWidth, Symbol},
};

/// Creates an anonymous temporary file that is deleted once closed.
pub(crate) fn temp_file(temp_dir: Option<&Path>) -> io::Result<File> {
    match temp_dir {
        Some(dir) => tempfile::tempfile_in(dir),
        None => tempfile::tempfile(),
    }
}

/// Appends fixed-width integers to a temporary file.
pub(crate) struct IndexWriter {
    writer: BufWriter<File>,
    width: IndexWidth,
    len: u64,
}

impl IndexWriter {
    pub(crate) fn new(temp_dir: Option<&Path>, width: IndexWidth) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(temp_file(temp_dir)?),
            width,
            len: 0,
        })
    }

    pub(crate) fn push(&mut self, value: u64) -> io::Result<()> {
        self.writer
            .write_uint::<NativeEndian>(value, self.width.bytes())?;
        self.len += 1;

        Ok(())
    }

    /// Finishes writing and rewinds the file for reading.
    pub(crate) fn into_reader(self) -> io::Result<IndexReader> {
        let mut file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;

        Ok(IndexReader {
            reader: BufReader::new(file),
            width: self.width,
            len: self.len,
            remaining: self.len,
        })
    }
}

/// Reads back the integers of an [`IndexWriter`] in the order they were written.
pub(crate) struct IndexReader {
    reader: BufReader<File>,
    width: IndexWidth,
    len: u64,
    remaining: u64,
}

impl IndexReader {
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Starts reading from the first integer again.
    pub(crate) fn rewind(&mut self) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.remaining = self.len;

        Ok(())
    }
}

impl Iterator for IndexReader {
    type Item = io::Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        Some(self.reader.read_uint::<NativeEndian>(self.width.bytes()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

/// Reads a whole file of native-endian symbols.
///
/// # Errors
///
/// Returns [`BwtError::MisalignedInput`] if the file length is not a multiple of the symbol width.
pub(crate) fn read_symbols<S: Symbol>(path: &Path) -> Result<Vec<S>, BwtError> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let width = mem::size_of::<S>();
    if len % width as u64 != 0 {
        return Err(BwtError::MisalignedInput { len, width });
    }

    let count = usize::try_from(len / width as u64)
        .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "input too large for memory"))?;
    // Reserve a slot for a sentinel the caller may append
    let mut symbols = Vec::with_capacity(count + 1);
    symbols.resize(count, S::default());
    file.read_exact(bytemuck::cast_slice_mut(&mut symbols))?;

    Ok(symbols)
}

/// Writes symbols in native byte order.
pub(crate) fn write_symbols<S: Symbol, W: Write>(writer: &mut W, symbols: &[S]) -> io::Result<()> {
    writer.write_all(bytemuck::cast_slice(symbols))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_file_round_trip() {
        let mut writer = IndexWriter::new(None, IndexWidth::Short).unwrap();
        for value in [0, 1, 300, u16::MAX.into()] {
            writer.push(value).unwrap();
        }

        let mut reader = writer.into_reader().unwrap();
        assert_eq!(reader.len(), 4);
        let values: Vec<u64> = reader.by_ref().map(Result::unwrap).collect();
        assert_eq!(values, [0, 1, 300, 65535]);

        reader.rewind().unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), 0);
        assert_eq!(reader.size_hint(), (3, Some(3)));
    }

    #[test]
    fn symbol_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols");
        let mut file = File::create(&path).unwrap();
        write_symbols(&mut file, &[7u32, 70_000, 0]).unwrap();
        drop(file);

        let symbols: Vec<u32> = read_symbols(&path).unwrap();

        assert_eq!(symbols, [7, 70_000, 0]);
    }

    #[test]
    fn rejects_misaligned_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misaligned");
        std::fs::write(&path, [1, 2, 3]).unwrap();

        assert!(matches!(
            read_symbols::<u16>(&path),
            Err(BwtError::MisalignedInput { len: 3, width: 2 }),
        ));
    }
}
