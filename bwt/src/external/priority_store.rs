// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Seek, SeekFrom, Write},
    mem,
    path::{Path, PathBuf},
};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use super::stream::temp_file;
use crate::symbol::{IndexWidth, Symbol};

/// The largest number of spill files one store keeps.
pub const MAX_SPILL_PAGES: u64 = 128;

const SPILL_BUFFER_SIZE: usize = 4096;

/// A queue that hands items back in priority order, keeping only a window of them in RAM.
///
/// Every priority in `0..capacity` is inserted exactly once and retrieved exactly once, in
/// ascending order. Insertions may come in any order, but never for a priority that has already
/// been retrieved. Items whose priority lies inside the current RAM window go straight into their
/// slot; all others are appended to the spill file of their page and loaded back when the window
/// reaches that page.
///
/// # Panics
///
/// Misuse is a bug in the caller and panics: inserting below the next priority to be retrieved or
/// at or above `capacity`, inserting the same priority twice, retrieving a priority that was never
/// inserted, or retrieving more than `capacity` items.
///
/// # Examples
///
/// ```
/// # fn main() -> std::io::Result<()> {
/// use bwt::external::PriorityStore;
///
/// // A budget this small keeps a single slot in RAM and spills everything else
/// let mut store = PriorityStore::<u32>::new(4, 1, None);
/// for (item, priority) in [(30, 3), (10, 1), (0, 0), (20, 2)] {
///     store.insert(item, priority)?;
/// }
///
/// let drained = (0..4).map(|_| store.get()).collect::<std::io::Result<Vec<_>>>()?;
/// assert_eq!(drained, [0, 10, 20, 30]);
/// # Ok(())
/// # }
/// ```
pub struct PriorityStore<T: Symbol> {
    window: Vec<Option<T>>,
    // Priority of window[0]
    start: u64,
    next: u64,
    capacity: u64,
    pages: Vec<Option<SpillPage>>,
    offset_width: IndexWidth,
    item_width: IndexWidth,
    temp_dir: Option<PathBuf>,
}

impl<T: Symbol> PriorityStore<T> {
    /// Creates a store for priorities `0..capacity` using at most about `memory_budget` bytes of
    /// RAM for its window.
    ///
    /// The window always holds at least one slot, and is widened beyond the budget if the budget
    /// would need more than [`MAX_SPILL_PAGES`] spill files. Spill files are created in `temp_dir`,
    /// or in the system temporary directory if it is `None`.
    pub fn new(capacity: u64, memory_budget: usize, temp_dir: Option<&Path>) -> Self {
        let slot_size = mem::size_of::<Option<T>>().max(1);
        let budget_slots = (memory_budget / slot_size).max(1) as u64;
        let window_len = budget_slots
            .max(capacity.div_ceil(MAX_SPILL_PAGES))
            .min(capacity)
            .max(1);
        let page_count = capacity.div_ceil(window_len);

        if page_count > 1 {
            trace!(
                "priority store of {capacity} items uses {page_count} pages of {window_len} slots",
            );
        }

        Self {
            window: vec![None; window_len as usize],
            start: 0,
            next: 0,
            capacity,
            pages: (0..page_count).map(|_| None).collect(),
            offset_width: IndexWidth::for_bound(window_len - 1),
            item_width: IndexWidth::for_bound(T::MAX),
            temp_dir: temp_dir.map(Path::to_path_buf),
        }
    }

    /// Returns the number of items this store accepts.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Stores `item` under `priority`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item had to be spilled and writing the spill file failed.
    pub fn insert(&mut self, item: T, priority: u64) -> io::Result<()> {
        assert!(
            priority < self.capacity,
            "priority {priority} is outside of a store with capacity {}",
            self.capacity,
        );
        assert!(
            priority >= self.next,
            "priority {priority} inserted after priority {} was retrieved",
            self.next,
        );

        let window_len = self.window.len() as u64;
        if priority < self.start + window_len {
            let slot = &mut self.window[(priority - self.start) as usize];
            assert!(slot.is_none(), "priority {priority} inserted twice");
            *slot = Some(item);
            return Ok(());
        }

        let page = (priority / window_len) as usize;
        let spill = match &mut self.pages[page] {
            Some(spill) => spill,
            empty => {
                trace!("spilling page {page}");
                empty.insert(SpillPage::create(self.temp_dir.as_deref())?)
            }
        };
        spill.push(
            priority % window_len,
            self.offset_width,
            item.to_u64(),
            self.item_width,
        )
    }

    /// Retrieves the item with the next priority.
    ///
    /// # Errors
    ///
    /// Returns an error if loading a spilled page failed.
    pub fn get(&mut self) -> io::Result<T> {
        assert!(
            self.next < self.capacity,
            "all {} items have already been retrieved",
            self.capacity,
        );

        if self.next == self.start + self.window.len() as u64 {
            self.advance()?;
        }

        let priority = self.next;
        let item = self.window[(priority - self.start) as usize]
            .take()
            .unwrap_or_else(|| panic!("priority {priority} was never inserted"));
        self.next += 1;

        Ok(item)
    }

    /// Moves the window to the next page and loads whatever was spilled to it.
    fn advance(&mut self) -> io::Result<()> {
        let window_len = self.window.len() as u64;
        self.start += window_len;

        let page = (self.start / window_len) as usize;
        let Some(spill) = self.pages[page].take() else {
            return Ok(());
        };

        trace!("loading page {page} with {} spilled items", spill.records);
        let records = spill.records;
        let mut reader = spill.into_reader()?;
        for _ in 0..records {
            let offset = reader.read_uint::<NativeEndian>(self.offset_width.bytes())? as usize;
            let item = reader.read_uint::<NativeEndian>(self.item_width.bytes())?;

            let slot = &mut self.window[offset];
            assert!(
                slot.is_none(),
                "priority {} inserted twice",
                self.start + offset as u64,
            );
            *slot = Some(T::from_u64(item));
        }

        Ok(())
    }
}

/// The spill file of one page: a sequence of (offset within page, item) records.
struct SpillPage {
    writer: BufWriter<File>,
    records: u64,
}

impl SpillPage {
    fn create(temp_dir: Option<&Path>) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::with_capacity(SPILL_BUFFER_SIZE, temp_file(temp_dir)?),
            records: 0,
        })
    }

    fn push(
        &mut self,
        offset: u64,
        offset_width: IndexWidth,
        item: u64,
        item_width: IndexWidth,
    ) -> io::Result<()> {
        self.writer
            .write_uint::<NativeEndian>(offset, offset_width.bytes())?;
        self.writer.write_uint::<NativeEndian>(item, item_width.bytes())?;
        self.records += 1;

        Ok(())
    }

    fn into_reader(mut self) -> io::Result<BufReader<File>> {
        self.writer.flush()?;
        let mut file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;

        Ok(BufReader::with_capacity(SPILL_BUFFER_SIZE, file))
    }
}
