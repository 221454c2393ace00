//! The table reader: validates the footer, loads the index block, and resolves point lookups by
//! descending index block -> data block.

use std::path::Path;
use std::sync::Arc;

use crate::block::{Block, BlockCursor};
use crate::comparator::{BytewiseComparator, Comparator};
use crate::file_manager::{open_without_manager, FileHandle};
use crate::format::{read_block, Compressor, Footer, NoneCompressor, FOOTER_ENCODED_LENGTH};
use crate::{Cursor, Error, ReadOptions, CORRUPTION};

///////////////////////////////////////////////// Sst //////////////////////////////////////////////

/// An opened, immutable table.  Cheap to clone: the index block and file handle are both
/// reference-counted / shareable.  Once constructed, a [Sst] is safe to consult from multiple
/// threads provided the underlying file supports concurrent positional reads, which
/// [FileHandle] does.
#[derive(Clone)]
pub struct Sst {
    comparator: Arc<dyn Comparator>,
    compressor: Arc<dyn Compressor>,
    handle: FileHandle,
    index_block: Block,
    file_size: u64,
}

impl Sst {
    /// Open the table file at `path` using the default bytewise comparator.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::with_comparator(path, Arc::new(BytewiseComparator))
    }

    /// Open the table file at `path` using a caller-supplied comparator.  The comparator must be
    /// the same one used to build the file, or lookups will silently misbehave.
    pub fn with_comparator<P: AsRef<Path>>(
        path: P,
        comparator: Arc<dyn Comparator>,
    ) -> Result<Self, Error> {
        let handle = open_without_manager(path.as_ref().to_path_buf())?;
        Self::from_file_handle(handle, comparator)
    }

    /// Open an already-resolved [FileHandle].
    pub fn from_file_handle(handle: FileHandle, comparator: Arc<dyn Comparator>) -> Result<Self, Error> {
        let file_size = handle.size()?;
        if file_size < FOOTER_ENCODED_LENGTH as u64 {
            CORRUPTION.click();
            return Err(Error::corruption("file is smaller than the footer"));
        }
        let mut footer_bytes = vec![0u8; FOOTER_ENCODED_LENGTH];
        handle.read_exact_at(&mut footer_bytes, file_size - FOOTER_ENCODED_LENGTH as u64)?;
        let footer = Footer::decode(&footer_bytes)?;

        let read_options = ReadOptions {
            verify_checksums: true,
        };
        let compressor: Arc<dyn Compressor> = Arc::new(NoneCompressor);
        let index_contents = read_block(
            &handle,
            &read_options,
            &footer.index_handle,
            compressor.as_ref(),
        )?;
        let index_block = Block::new(Arc::clone(&comparator), index_contents.data)?;

        Ok(Self {
            comparator,
            compressor,
            handle,
            index_block,
            file_size,
        })
    }

    /// Size of the underlying file, in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// A fresh cursor positioned before the first entry.
    pub fn cursor(&self) -> SstCursor {
        SstCursor::new(self.clone())
    }

    /// Resolve a point lookup: seek the index block to the data block that could contain `key`,
    /// load it, seek within it, and invoke `handle_result(key, value)` for the first entry found
    /// at or after `key` -- callers must recheck equality, per the index's routing contract.
    pub fn internal_get<F>(&self, options: &ReadOptions, key: &[u8], mut handle_result: F) -> Result<(), Error>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let mut index_cursor = self.index_block.cursor();
        index_cursor.seek(key)?;
        if !index_cursor.valid() {
            return Ok(());
        }
        let handle_bytes = index_cursor
            .value()
            .ok_or_else(|| Error::corruption("index entry has no value"))?;
        let (handle, _) = crate::format::BlockHandle::decode(handle_bytes)?;
        let contents = read_block(&self.handle, options, &handle, self.compressor.as_ref())?;
        let data_block = Block::new(Arc::clone(&self.comparator), contents.data)?;
        let mut data_cursor = data_block.cursor();
        data_cursor.seek(key)?;
        if let (Some(k), Some(v)) = (data_cursor.key(), data_cursor.value()) {
            handle_result(k, v);
        }
        Ok(())
    }
}

//////////////////////////////////////////////// SstCursor //////////////////////////////////////////

/// A forward/backward cursor over an entire table, descending through the index block to data
/// blocks as needed.  Not thread-safe.
pub struct SstCursor {
    table: Sst,
    read_options: ReadOptions,
    index_cursor: BlockCursor,
    data_cursor: Option<BlockCursor>,
}

impl SstCursor {
    fn new(table: Sst) -> Self {
        let index_cursor = table.index_block.cursor();
        Self {
            table,
            read_options: ReadOptions {
                verify_checksums: true,
            },
            index_cursor,
            data_cursor: None,
        }
    }

    fn load_block_at_index_position(&self) -> Result<Option<Block>, Error> {
        let handle_bytes = match self.index_cursor.value() {
            Some(v) => v,
            None => return Ok(None),
        };
        let (handle, _) = crate::format::BlockHandle::decode(handle_bytes)?;
        let contents = read_block(
            &self.table.handle,
            &self.read_options,
            &handle,
            self.table.compressor.as_ref(),
        )?;
        let block = Block::new(Arc::clone(&self.table.comparator), contents.data)?;
        Ok(Some(block))
    }

    /// Advance to the next data block, and the next after that, until the data cursor lands on
    /// a valid entry or the index is exhausted. Does not call `next` on a freshly loaded block:
    /// its first entry is the answer.
    fn skip_empty_data_blocks_forward(&mut self) -> Result<(), Error> {
        while !self.data_cursor.as_ref().is_some_and(|c| c.valid()) {
            self.index_cursor.next()?;
            match self.load_block_at_index_position()? {
                Some(block) => {
                    let mut cursor = block.cursor();
                    cursor.seek_to_first()?;
                    self.data_cursor = Some(cursor);
                }
                None => {
                    self.data_cursor = None;
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

impl Cursor for SstCursor {
    fn seek_to_first(&mut self) -> Result<(), Error> {
        self.index_cursor.seek_to_first()?;
        self.data_cursor = match self.load_block_at_index_position()? {
            Some(block) => {
                let mut cursor = block.cursor();
                cursor.seek_to_first()?;
                Some(cursor)
            }
            None => None,
        };
        Ok(())
    }

    fn seek_to_last(&mut self) -> Result<(), Error> {
        self.index_cursor.seek_to_last()?;
        self.data_cursor = match self.load_block_at_index_position()? {
            Some(block) => {
                let mut cursor = block.cursor();
                cursor.seek_to_last()?;
                Some(cursor)
            }
            None => None,
        };
        Ok(())
    }

    fn seek(&mut self, key: &[u8]) -> Result<(), Error> {
        self.index_cursor.seek(key)?;
        self.data_cursor = match self.load_block_at_index_position()? {
            Some(block) => {
                let mut cursor = block.cursor();
                cursor.seek(key)?;
                Some(cursor)
            }
            None => None,
        };
        self.skip_empty_data_blocks_forward()
    }

    fn prev(&mut self) -> Result<(), Error> {
        if let Some(cursor) = self.data_cursor.as_mut() {
            cursor.prev()?;
        }
        while !self.data_cursor.as_ref().is_some_and(|c| c.valid()) {
            self.index_cursor.prev()?;
            match self.load_block_at_index_position()? {
                Some(block) => {
                    let mut cursor = block.cursor();
                    cursor.seek_to_last()?;
                    self.data_cursor = Some(cursor);
                }
                None => {
                    self.data_cursor = None;
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<(), Error> {
        if let Some(cursor) = self.data_cursor.as_mut() {
            cursor.next()?;
        }
        self.skip_empty_data_blocks_forward()
    }

    fn key(&self) -> Option<&[u8]> {
        self.data_cursor.as_ref().and_then(|c| c.key())
    }

    fn value(&self) -> Option<&[u8]> {
        self.data_cursor.as_ref().and_then(|c| c.value())
    }

    fn valid(&self) -> bool {
        self.data_cursor.as_ref().is_some_and(|c| c.valid())
    }

    fn status(&self) -> Result<(), Error> {
        self.index_cursor.status()?;
        if let Some(cursor) = &self.data_cursor {
            cursor.status()?;
        }
        Ok(())
    }
}

impl From<Sst> for SstCursor {
    fn from(table: Sst) -> Self {
        Self::new(table)
    }
}
