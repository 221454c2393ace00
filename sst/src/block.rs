//! Blocks are the base unit of an SST: a length-bounded, prefix-compressed, restart-indexed run
//! of sorted key-value pairs.  This module provides the builder that accumulates one block and
//! the cursor that reads one back.

use std::cmp::Ordering;
use std::sync::Arc;

use zerror_core::ErrorCore;

use crate::coding::{get_fixed32, get_varint32, put_fixed32, put_varint32, varint_length};
use crate::comparator::Comparator;
use crate::{Error, CORRUPTION};

/////////////////////////////////////// BlockBuilderOptions //////////////////////////////////////

/// Options controlling how densely a block builder places restart points.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "command_line", derive(arrrg_derive::CommandLine))]
pub struct BlockBuilderOptions {
    /// Store a complete key (a restart point) every this many key-value pairs.
    #[cfg_attr(
        feature = "command_line",
        arrrg(optional, "Store a complete key every this many keys.", "KEYS")
    )]
    pub block_restart_interval: usize,
}

impl BlockBuilderOptions {
    /// Set the restart interval.  Must be positive; zero is silently treated as one.
    pub fn block_restart_interval(mut self, block_restart_interval: usize) -> Self {
        self.block_restart_interval = block_restart_interval.max(1);
        self
    }
}

impl Default for BlockBuilderOptions {
    fn default() -> Self {
        Self {
            block_restart_interval: 16,
        }
    }
}

////////////////////////////////////////////// BlockBuilder //////////////////////////////////////

/// Accumulates sorted key-value pairs into one prefix-compressed block.
///
/// Lifecycle: empty -> accumulating (via [BlockBuilder::add]) -> finished (via
/// [BlockBuilder::finish]).  [BlockBuilder::reset] returns a finished builder to empty.
pub struct BlockBuilder {
    comparator: Arc<dyn Comparator>,
    options: BlockBuilderOptions,
    buffer: Vec<u8>,
    restarts: Vec<u32>,
    counter: usize,
    last_key: Vec<u8>,
    finished: bool,
}

impl BlockBuilder {
    /// Create a new, empty block builder.
    pub fn new(comparator: Arc<dyn Comparator>, options: BlockBuilderOptions) -> Self {
        Self {
            comparator,
            options,
            buffer: Vec::new(),
            restarts: vec![0],
            counter: 0,
            last_key: Vec::new(),
            finished: false,
        }
    }

    /// Whether any entry has been added since construction or the last [BlockBuilder::reset].
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// An estimate of the size the block would have if finished right now.
    pub fn current_size_estimate(&self) -> usize {
        self.buffer.len() + (self.restarts.len() + 1) * 4
    }

    /// Append `(key, value)`.  `key` must compare strictly greater than the most recently added
    /// key, by the builder's comparator.  Fails with [Error::LogicError] if the builder has
    /// already been [finish](BlockBuilder::finish)ed, or with [Error::SortOrder] if the sort
    /// order is violated.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        if self.finished {
            return Err(Error::LogicError {
                core: ErrorCore::default(),
                context: "add() called on a finished BlockBuilder".to_string(),
            });
        }
        if !self.buffer.is_empty() && self.comparator.compare(&self.last_key, key) != Ordering::Less
        {
            return Err(Error::SortOrder {
                core: ErrorCore::default(),
                last_key: self.last_key.clone(),
                new_key: key.to_vec(),
            });
        }

        let shared = if self.counter < self.options.block_restart_interval {
            let max_shared = std::cmp::min(self.last_key.len(), key.len());
            let mut shared = 0;
            while shared < max_shared && self.last_key[shared] == key[shared] {
                shared += 1;
            }
            shared
        } else {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
            0
        };

        let non_shared = key.len() - shared;
        put_varint32(&mut self.buffer, shared as u32);
        put_varint32(&mut self.buffer, non_shared as u32);
        put_varint32(&mut self.buffer, value.len() as u32);
        self.buffer.extend_from_slice(&key[shared..]);
        self.buffer.extend_from_slice(value);

        self.last_key.truncate(shared);
        self.last_key.extend_from_slice(&key[shared..]);
        self.counter += 1;
        Ok(())
    }

    /// Finalize the block: append the restart table and the restart count, and return the
    /// resulting bytes.  Idempotent -- calling `finish` again without an intervening `reset`
    /// returns the same bytes.
    pub fn finish(&mut self) -> &[u8] {
        if !self.finished {
            for restart in &self.restarts {
                put_fixed32(&mut self.buffer, *restart);
            }
            put_fixed32(&mut self.buffer, self.restarts.len() as u32);
            self.finished = true;
        }
        &self.buffer
    }

    /// Return the builder to the empty state, ready to accumulate a new block.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.restarts.clear();
        self.restarts.push(0);
        self.counter = 0;
        self.last_key.clear();
        self.finished = false;
    }
}

///////////////////////////////////////////////// Block //////////////////////////////////////////

/// An immutable, already-decoded block payload (trailer excluded).  Cheap to clone: the backing
/// bytes are reference-counted.
#[derive(Clone)]
pub struct Block {
    comparator: Arc<dyn Comparator>,
    bytes: Arc<Vec<u8>>,
    restarts_offset: usize,
    num_restarts: usize,
}

impl Block {
    /// Parse `bytes` as a block payload.  Fails with [Error::BlockTooSmall] if there are not even
    /// four bytes to hold the restart count, or [Error::Corruption] if the stated restart count
    /// does not fit in the remaining bytes.
    pub fn new(comparator: Arc<dyn Comparator>, bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.len() < 4 {
            return Err(Error::BlockTooSmall {
                core: ErrorCore::default(),
                length: bytes.len(),
                required: 4,
            });
        }
        let num_restarts = get_fixed32(&bytes[bytes.len() - 4..])? as usize;
        let restart_table_size = num_restarts
            .checked_mul(4)
            .ok_or_else(|| Error::corruption("restart count overflows"))?;
        if restart_table_size > bytes.len() - 4 {
            CORRUPTION.click();
            return Err(Error::Corruption {
                core: ErrorCore::default(),
                context: "restart count does not fit in block".to_string(),
            });
        }
        let restarts_offset = bytes.len() - 4 - restart_table_size;
        Ok(Self {
            comparator,
            bytes: Arc::new(bytes),
            restarts_offset,
            num_restarts,
        })
    }

    /// Size of the backing buffer, in bytes.
    pub fn approximate_size(&self) -> usize {
        self.bytes.len()
    }

    /// The raw block payload, trailer excluded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A fresh cursor positioned before the first entry.
    pub fn cursor(&self) -> BlockCursor {
        BlockCursor::new(self.clone())
    }

    fn restart_point(&self, restart_idx: usize) -> usize {
        let offset = self.restarts_offset + restart_idx * 4;
        get_fixed32(&self.bytes[offset..offset + 4]).unwrap_or(0) as usize
    }
}

////////////////////////////////////////////// BlockCursor ////////////////////////////////////////

/// A cursor over one [Block].  Not thread-safe; must not be shared across threads or reused
/// across the block it was constructed from.
pub struct BlockCursor {
    block: Block,
    current: usize,
    restart_index: usize,
    key: Vec<u8>,
    value_start: usize,
    value_len: usize,
    status: Result<(), Error>,
}

impl BlockCursor {
    fn new(block: Block) -> Self {
        let restarts_offset = block.restarts_offset;
        let num_restarts = block.num_restarts;
        Self {
            block,
            current: restarts_offset,
            restart_index: num_restarts,
            key: Vec::new(),
            value_start: 0,
            value_len: 0,
            status: Ok(()),
        }
    }

    /// Whether the cursor currently designates an entry.
    pub fn valid(&self) -> bool {
        self.status.is_ok() && self.current < self.block.restarts_offset
    }

    /// The first error encountered by this cursor, if any.  Once set, it is sticky.
    pub fn status(&self) -> Result<(), Error> {
        self.status.clone()
    }

    /// The current entry's key.  Only meaningful when [BlockCursor::valid] is true.
    pub fn key(&self) -> Option<&[u8]> {
        if self.valid() {
            Some(&self.key)
        } else {
            None
        }
    }

    /// The current entry's value.  Only meaningful when [BlockCursor::valid] is true.
    pub fn value(&self) -> Option<&[u8]> {
        if self.valid() {
            Some(&self.block.bytes[self.value_start..self.value_start + self.value_len])
        } else {
            None
        }
    }

    fn invalidate(&mut self) {
        self.current = self.block.restarts_offset;
        self.restart_index = self.block.num_restarts;
    }

    fn corrupt(&mut self, context: &'static str) {
        CORRUPTION.click();
        self.status = Err(Error::Corruption {
            core: ErrorCore::default(),
            context: context.to_string(),
        });
        self.invalidate();
    }

    /// Decode the entry beginning at `self.current`, updating `key`/`value_start`/`value_len`
    /// and advancing `self.current` past it.  Returns `false` (and invalidates the cursor, unless
    /// this is simply end-of-block) on failure.
    fn parse_next_key(&mut self) -> bool {
        if self.status.is_err() {
            return false;
        }
        if self.current >= self.block.restarts_offset {
            self.invalidate();
            return false;
        }
        let bytes = &self.block.bytes[..self.block.restarts_offset];
        let (shared, rest) = match get_varint32(&bytes[self.current..]) {
            Ok(v) => v,
            Err(_) => {
                self.corrupt("malformed entry header (shared)");
                return false;
            }
        };
        let (non_shared, rest) = match get_varint32(rest) {
            Ok(v) => v,
            Err(_) => {
                self.corrupt("malformed entry header (non_shared)");
                return false;
            }
        };
        let (value_len, rest) = match get_varint32(rest) {
            Ok(v) => v,
            Err(_) => {
                self.corrupt("malformed entry header (value_len)");
                return false;
            }
        };
        let shared = shared as usize;
        let non_shared = non_shared as usize;
        let value_len = value_len as usize;
        if shared > self.key.len() {
            self.corrupt("shared prefix longer than previous key");
            return false;
        }
        if non_shared > rest.len() || value_len > rest.len() - non_shared {
            self.corrupt("entry runs past end of block");
            return false;
        }
        let header_len = bytes[self.current..].len() - rest.len();
        let key_delta_start = self.current + header_len;
        self.key.truncate(shared);
        self.key
            .extend_from_slice(&bytes[key_delta_start..key_delta_start + non_shared]);
        self.value_start = key_delta_start + non_shared;
        self.value_len = value_len;
        let next = self.value_start + value_len;

        while self.restart_index + 1 < self.block.num_restarts
            && self.block.restart_point(self.restart_index + 1) < next
        {
            self.restart_index += 1;
        }
        self.current = next;
        true
    }

    fn seek_to_restart_point(&mut self, restart_index: usize) {
        self.key.clear();
        self.value_start = 0;
        self.value_len = 0;
        self.restart_index = restart_index;
        self.current = if restart_index < self.block.num_restarts {
            self.block.restart_point(restart_index)
        } else {
            self.block.restarts_offset
        };
    }

    /// Position the cursor before the first entry, then advance to it.
    pub fn seek_to_first(&mut self) -> Result<(), Error> {
        if self.status.is_err() {
            return self.status.clone();
        }
        self.seek_to_restart_point(0);
        self.parse_next_key();
        self.status.clone()
    }

    /// Position the cursor at the last entry.
    pub fn seek_to_last(&mut self) -> Result<(), Error> {
        if self.status.is_err() {
            return self.status.clone();
        }
        if self.block.num_restarts == 0 {
            self.invalidate();
            return Ok(());
        }
        self.seek_to_restart_point(self.block.num_restarts - 1);
        while self.parse_next_key() && self.current < self.block.restarts_offset {
            // keep advancing until the next parse would run past the entry region
        }
        self.status.clone()
    }

    /// Binary search the restart table for the restart point before `target`, then linearly scan
    /// forward to the first key `>= target`.
    pub fn seek(&mut self, target: &[u8]) -> Result<(), Error> {
        if self.status.is_err() {
            return self.status.clone();
        }
        if self.block.num_restarts == 0 {
            self.invalidate();
            return Ok(());
        }
        let mut left = 0usize;
        let mut right = self.block.num_restarts - 1;
        while left < right {
            let mid = left + (right - left + 1) / 2;
            let offset = self.block.restart_point(mid);
            let bytes = &self.block.bytes[..self.block.restarts_offset];
            let (shared, rest) = match get_varint32(&bytes[offset..]) {
                Ok(v) => v,
                Err(_) => {
                    self.corrupt("malformed restart entry during seek");
                    return self.status.clone();
                }
            };
            if shared != 0 {
                self.corrupt("non-zero shared prefix at restart point");
                return self.status.clone();
            }
            let (non_shared, rest) = match get_varint32(rest) {
                Ok(v) => v,
                Err(_) => {
                    self.corrupt("malformed restart entry during seek");
                    return self.status.clone();
                }
            };
            let (_value_len, rest) = match get_varint32(rest) {
                Ok(v) => v,
                Err(_) => {
                    self.corrupt("malformed restart entry during seek");
                    return self.status.clone();
                }
            };
            let non_shared = non_shared as usize;
            let header_len = bytes[offset..].len() - rest.len();
            if non_shared > rest.len() {
                self.corrupt("restart entry key runs past end of block");
                return self.status.clone();
            }
            let key = &bytes[offset + header_len..offset + header_len + non_shared];
            match self.block.comparator.compare(key, target) {
                Ordering::Less => left = mid,
                _ => right = mid - 1,
            }
        }
        self.seek_to_restart_point(left);
        loop {
            if !self.parse_next_key() {
                return self.status.clone();
            }
            if self.block.comparator.compare(&self.key, target) != Ordering::Less {
                return Ok(());
            }
        }
    }

    /// Advance to the next entry.  Requires [BlockCursor::valid].
    pub fn next(&mut self) -> Result<(), Error> {
        if !self.valid() {
            return self.status.clone();
        }
        self.parse_next_key();
        self.status.clone()
    }

    /// Move to the previous entry.  If the cursor is currently invalid (e.g. past the last
    /// entry), moves to the last entry.
    pub fn prev(&mut self) -> Result<(), Error> {
        if self.status.is_err() {
            return self.status.clone();
        }
        let original = self.current;
        while self.block.restart_point(self.restart_index) >= original {
            if self.restart_index == 0 {
                self.invalidate();
                return Ok(());
            }
            self.restart_index -= 1;
        }
        self.seek_to_restart_point(self.restart_index);
        while self.parse_next_key() && self.current < original {
            // advance until the *next* entry's end offset would reach `original`
        }
        self.status.clone()
    }
}
