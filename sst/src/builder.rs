//! The table builder: the writer that accepts sorted key-value pairs, partitions them into
//! blocks, and terminates the file with an index block and a footer.

use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zerror::Z;
use zerror_core::ErrorCore;

use crate::block::{BlockBuilder, BlockBuilderOptions};
use crate::comparator::{BytewiseComparator, Comparator};
use crate::file_manager::FileHandle;
use crate::format::{write_raw_block, BlockHandle, CompressionType, Compressor, Footer, NoneCompressor};
use crate::{check_key_len, check_table_size, check_value_len, Error, LOGIC_ERROR};

//////////////////////////////////////////// TableBuilderOptions ///////////////////////////////////

/// Configuration for a [TableBuilder].
#[derive(Clone)]
pub struct TableBuilderOptions {
    pub block: BlockBuilderOptions,
    /// Flush the current data block once its estimated size reaches this many bytes.
    pub block_size: usize,
    compressor: Arc<dyn Compressor>,
}

impl std::fmt::Debug for TableBuilderOptions {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("TableBuilderOptions")
            .field("block", &self.block)
            .field("block_size", &self.block_size)
            .field("compressor", &self.compressor)
            .finish()
    }
}

impl TableBuilderOptions {
    pub fn block(mut self, block: BlockBuilderOptions) -> Self {
        self.block = block;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }
}

impl Default for TableBuilderOptions {
    fn default() -> Self {
        Self {
            block: BlockBuilderOptions::default(),
            block_size: 4096,
            compressor: Arc::new(NoneCompressor),
        }
    }
}

impl Eq for TableBuilderOptions {}

impl PartialEq for TableBuilderOptions {
    fn eq(&self, rhs: &Self) -> bool {
        self.block == rhs.block && self.block_size == rhs.block_size
    }
}

/////////////////////////////////////////////////// Options /////////////////////////////////////////

/// Command-line-friendly configuration for the `sst-*` binaries.  [TableBuilderOptions] carries a
/// `compressor` trait object that has no sensible command-line representation, so the binaries
/// configure this plain, flag-derivable struct instead and convert it with [Options::into].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "command_line", derive(arrrg_derive::CommandLine))]
pub struct Options {
    #[cfg_attr(feature = "command_line", arrrg(nested))]
    pub block: BlockBuilderOptions,
    #[cfg_attr(
        feature = "command_line",
        arrrg(
            optional,
            "Flush the current data block once it reaches this many bytes.",
            "BYTES"
        )
    )]
    pub block_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            block: BlockBuilderOptions::default(),
            block_size: 4096,
        }
    }
}

impl From<Options> for TableBuilderOptions {
    fn from(opts: Options) -> Self {
        TableBuilderOptions::default()
            .block(opts.block)
            .block_size(opts.block_size)
    }
}

/////////////////////////////////////////////// TableBuilder ///////////////////////////////////////

/// Accepts sorted key-value pairs and writes out a complete table file: zero or more data blocks,
/// an index block, and a footer.
///
/// Keys passed to [TableBuilder::add] must strictly increase per the comparator.  After
/// [TableBuilder::finish], no further `add` is accepted.
pub struct TableBuilder {
    comparator: Arc<dyn Comparator>,
    options: TableBuilderOptions,
    file: FileHandle,
    offset: u64,

    data_block: BlockBuilder,
    index_block: BlockBuilder,

    last_key: Vec<u8>,
    pending_handle: Option<BlockHandle>,
    has_entries: bool,
    finished: bool,
}

impl TableBuilder {
    /// Create a table builder that writes to a freshly created file at `path`.
    pub fn new<P: AsRef<Path>>(path: P, options: TableBuilderOptions) -> Result<Self, Error> {
        Self::with_comparator(path, Arc::new(BytewiseComparator), options)
    }

    /// Create a table builder using a non-default comparator.
    pub fn with_comparator<P: AsRef<Path>>(
        path: P,
        comparator: Arc<dyn Comparator>,
        options: TableBuilderOptions,
    ) -> Result<Self, Error> {
        let output: File = OpenOptions::new()
            .create_new(true)
            .write(true)
            .read(true)
            .open(path.as_ref())
            .as_z()
            .with_info("path", path.as_ref().to_string_lossy())?;
        let file = FileHandle::from_file(output, path.as_ref().to_path_buf());
        Self::from_file_handle(file, comparator, options)
    }

    fn from_file_handle(
        file: FileHandle,
        comparator: Arc<dyn Comparator>,
        options: TableBuilderOptions,
    ) -> Result<Self, Error> {
        Ok(Self {
            data_block: BlockBuilder::new(Arc::clone(&comparator), options.block.clone()),
            index_block: BlockBuilder::new(
                Arc::clone(&comparator),
                BlockBuilderOptions::default().block_restart_interval(1),
            ),
            comparator,
            options,
            file,
            offset: 0,
            last_key: Vec::new(),
            pending_handle: None,
            has_entries: false,
            finished: false,
        })
    }

    /// An estimate of the file size if [TableBuilder::finish] were called right now.
    pub fn approximate_size(&self) -> usize {
        self.offset as usize
            + self.data_block.current_size_estimate()
            + self.index_block.current_size_estimate()
            + 5
            + crate::format::FOOTER_ENCODED_LENGTH
    }

    /// Append `(key, value)`.  `key` must compare strictly greater than the most recently added
    /// key.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        if self.finished {
            return Err(Error::LogicError {
                core: ErrorCore::default(),
                context: "add() called after finish()".to_string(),
            });
        }
        check_key_len(key)?;
        check_value_len(value)?;
        check_table_size(self.approximate_size())?;
        if self.has_entries && self.comparator.compare(&self.last_key, key) != Ordering::Less {
            return Err(Error::SortOrder {
                core: ErrorCore::default(),
                last_key: self.last_key.clone(),
                new_key: key.to_vec(),
            });
        }

        if let Some(pending_handle) = self.pending_handle.take() {
            let mut separator = self.last_key.clone();
            self.comparator.find_shortest_separator(&mut separator, key);
            let mut encoded_handle = Vec::new();
            pending_handle.encode(&mut encoded_handle);
            self.index_block.add(&separator, &encoded_handle)?;
        }

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.has_entries = true;
        self.data_block.add(key, value)?;

        if self.data_block.current_size_estimate() >= self.options.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush the current data block, if non-empty.
    pub fn flush(&mut self) -> Result<(), Error> {
        if self.data_block.is_empty() {
            return Ok(());
        }
        let handle = self.write_block(BuilderBlock::Data)?;
        self.pending_handle = Some(handle);
        self.file.flush()?;
        Ok(())
    }

    fn write_block(&mut self, which: BuilderBlock) -> Result<BlockHandle, Error> {
        let raw = match which {
            BuilderBlock::Data => self.data_block.finish().to_vec(),
            BuilderBlock::Index => self.index_block.finish().to_vec(),
        };
        let compressed = self.options.compressor.compress(&raw);
        let (contents, compression_type): (&[u8], CompressionType) = match &compressed {
            Some(c) if c.len() < raw.len() - raw.len() / 8 => {
                (c.as_slice(), self.options.compressor.compression_type())
            }
            _ => (raw.as_slice(), CompressionType::None),
        };
        let (handle, written) =
            write_raw_block(&mut self.file, self.offset, contents, compression_type)?;
        self.offset += written;
        match which {
            BuilderBlock::Data => self.data_block.reset(),
            BuilderBlock::Index => {}
        }
        Ok(handle)
    }

    /// Flush any pending data block, write the index block, append the footer, and return the
    /// completed [Sst][crate::reader::Sst].  After `finish`, no further `add` is accepted.
    pub fn finish(mut self) -> Result<crate::reader::Sst, Error> {
        self.flush()?;
        if let Some(pending_handle) = self.pending_handle.take() {
            let mut successor = self.last_key.clone();
            self.comparator.find_short_successor(&mut successor);
            let mut encoded_handle = Vec::new();
            pending_handle.encode(&mut encoded_handle);
            self.index_block.add(&successor, &encoded_handle)?;
        }
        let index_handle = self.write_block(BuilderBlock::Index)?;
        let footer = Footer::new(index_handle);
        use std::io::Write;
        self.file.write_all(&footer.encode())?;
        self.offset += crate::format::FOOTER_ENCODED_LENGTH as u64;
        self.finished = true;
        self.file.sync_all()?;
        crate::reader::Sst::with_comparator(self.file.path_buf(), Arc::clone(&self.comparator))
    }

    /// Request OS-level durability for everything written so far.
    pub fn sync(&mut self) -> Result<(), Error> {
        self.file.sync_all()
    }
}

#[derive(Clone, Copy)]
enum BuilderBlock {
    Data,
    Index,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Sst;

    fn tempfile(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "sst-builder-test-{}-{}-{}",
            std::process::id(),
            name,
            guacamole_nonce()
        ));
        path
    }

    fn guacamole_nonce() -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering as AOrdering};
        static NONCE: AtomicU64 = AtomicU64::new(0);
        NONCE.fetch_add(1, AOrdering::Relaxed)
    }

    #[test]
    fn round_trip_small_table() {
        let path = tempfile("round-trip");
        let mut builder =
            TableBuilder::new(&path, TableBuilderOptions::default().block_size(64)).unwrap();
        for i in 0..50 {
            let key = format!("key{i:04}");
            let value = format!("value{i}");
            builder.add(key.as_bytes(), value.as_bytes()).unwrap();
        }
        let sst = builder.finish().unwrap();
        let mut cursor = sst.cursor();
        cursor.seek_to_first().unwrap();
        let mut count = 0;
        while cursor.valid() {
            count += 1;
            cursor.next().unwrap();
        }
        assert_eq!(50, count);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn sort_order_violation_is_rejected() {
        let path = tempfile("sort-order");
        let mut builder = TableBuilder::new(&path, TableBuilderOptions::default()).unwrap();
        builder.add(b"b", b"1").unwrap();
        assert!(builder.add(b"a", b"2").is_err());
        drop(builder);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_table_opens_and_has_no_entries() {
        let path = tempfile("empty");
        let builder = TableBuilder::new(&path, TableBuilderOptions::default()).unwrap();
        let sst = builder.finish().unwrap();
        let mut cursor = sst.cursor();
        cursor.seek_to_first().unwrap();
        assert!(!cursor.valid());
        let _ = std::fs::remove_file(&path);
    }
}
