//! An on-disk sorted-string-table format: an immutable file of sorted key-value pairs, organized
//! as prefix-compressed data blocks indexed by a single index block, closed with a fixed-size
//! footer.
//!
//! Start with [builder::TableBuilder] to write a table and [reader::Sst] to read one back.

#[macro_use]
extern crate arrrg_derive;

extern crate prototk;
#[macro_use]
extern crate prototk_derive;

use std::fmt::{Debug, Display, Formatter};

use biometrics::Counter;
use tatl::{HeyListen, Stationary};
use zerror::{iotoz, Z};
use zerror_core::ErrorCore;

pub mod block;
pub mod builder;
pub mod coding;
pub mod comparator;
pub mod crc;
pub mod file_manager;
pub mod format;
pub mod reader;
pub mod reference;

pub use block::{Block, BlockBuilder, BlockBuilderOptions, BlockCursor};
pub use builder::{Options, TableBuilder, TableBuilderOptions};
pub use comparator::{BytewiseComparator, Comparator};
pub use format::{BlockHandle, CompressionType, Compressor, Footer, NoneCompressor};
pub use reader::{Sst, SstCursor};

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static LOGIC_ERROR: Counter = Counter::new("sst.logic_error");
static LOGIC_ERROR_MONITOR: Stationary = Stationary::new("sst.logic_error", &LOGIC_ERROR);

static CORRUPTION: Counter = Counter::new("sst.corruption");
static CORRUPTION_MONITOR: Stationary = Stationary::new("sst.corruption", &CORRUPTION);

static KEY_TOO_LARGE: Counter = Counter::new("sst.error.key_too_large");
static KEY_TOO_LARGE_MONITOR: Stationary =
    Stationary::new("sst.error.key_too_large", &KEY_TOO_LARGE);

static VALUE_TOO_LARGE: Counter = Counter::new("sst.error.value_too_large");
static VALUE_TOO_LARGE_MONITOR: Stationary =
    Stationary::new("sst.error.value_too_large", &VALUE_TOO_LARGE);

static TABLE_FULL: Counter = Counter::new("sst.error.table_full");
static TABLE_FULL_MONITOR: Stationary = Stationary::new("sst.error.table_full", &TABLE_FULL);

/// Register every [tatl] monitor this crate (and its submodules) defines.
pub fn register_monitors(hey_listen: &mut HeyListen) {
    hey_listen.register_stationary(&LOGIC_ERROR_MONITOR);
    hey_listen.register_stationary(&CORRUPTION_MONITOR);
    hey_listen.register_stationary(&KEY_TOO_LARGE_MONITOR);
    hey_listen.register_stationary(&VALUE_TOO_LARGE_MONITOR);
    hey_listen.register_stationary(&TABLE_FULL_MONITOR);

    file_manager::register_monitors(hey_listen);
}

/// Register every [biometrics] counter this crate (and its submodules) defines.
pub fn register_biometrics(collector: &biometrics::Collector) {
    collector.register_counter(&LOGIC_ERROR);
    collector.register_counter(&CORRUPTION);
    collector.register_counter(&KEY_TOO_LARGE);
    collector.register_counter(&VALUE_TOO_LARGE);
    collector.register_counter(&TABLE_FULL);

    file_manager::register_biometrics(collector);
}

///////////////////////////////////////////// Constants ////////////////////////////////////////////

/// Keys longer than this are rejected by [check_key_len].
pub const MAX_KEY_LEN: usize = 1usize << 14; /* 16KiB */
/// Values longer than this are rejected by [check_value_len].
pub const MAX_VALUE_LEN: usize = 1usize << 15; /* 32KiB */

// NOTE(rescrv): This is an approximate size. This constant isn't intended to be a maximum size,
// but rather a size that, once exceeded, will cause the table to return a TableFull error. The
// general pattern is that the block will exceed this size by up to one key-value pair, so subtract
// some slop. 1GiB is overkill, but will last for awhile.
pub const TABLE_FULL_SIZE: usize = (1usize << 30) - (1usize << 26); /* 1GiB - 64MiB */

fn check_key_len(key: &[u8]) -> Result<(), Error> {
    if key.len() > MAX_KEY_LEN {
        KEY_TOO_LARGE.click();
        Err(Error::KeyTooLarge {
            core: ErrorCore::default(),
            length: key.len(),
            limit: MAX_KEY_LEN,
        })
    } else {
        Ok(())
    }
}

fn check_value_len(value: &[u8]) -> Result<(), Error> {
    if value.len() > MAX_VALUE_LEN {
        VALUE_TOO_LARGE.click();
        Err(Error::ValueTooLarge {
            core: ErrorCore::default(),
            length: value.len(),
            limit: MAX_VALUE_LEN,
        })
    } else {
        Ok(())
    }
}

fn check_table_size(size: usize) -> Result<(), Error> {
    if size >= TABLE_FULL_SIZE {
        TABLE_FULL.click();
        Err(Error::TableFull {
            core: ErrorCore::default(),
            size,
            limit: TABLE_FULL_SIZE,
        })
    } else {
        Ok(())
    }
}

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// Every way an operation in this crate can fail.
#[derive(Clone, Debug, Message)]
pub enum Error {
    #[prototk(442368, message)]
    Success {
        #[prototk(1, message)]
        core: ErrorCore,
    },
    #[prototk(442369, message)]
    KeyTooLarge {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, uint64)]
        length: usize,
        #[prototk(3, uint64)]
        limit: usize,
    },
    #[prototk(442370, message)]
    ValueTooLarge {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, uint64)]
        length: usize,
        #[prototk(3, uint64)]
        limit: usize,
    },
    #[prototk(442371, message)]
    SortOrder {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, bytes)]
        last_key: Vec<u8>,
        #[prototk(3, bytes)]
        new_key: Vec<u8>,
    },
    #[prototk(442372, message)]
    TableFull {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, uint64)]
        size: usize,
        #[prototk(3, uint64)]
        limit: usize,
    },
    #[prototk(442373, message)]
    BlockTooSmall {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, uint64)]
        length: usize,
        #[prototk(3, uint64)]
        required: usize,
    },
    #[prototk(442374, message)]
    Corruption {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, string)]
        context: String,
    },
    #[prototk(442375, message)]
    LogicError {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, string)]
        context: String,
    },
    #[prototk(442376, message)]
    SystemError {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, string)]
        what: String,
    },
    #[prototk(442377, message)]
    TooManyOpenFiles {
        #[prototk(1, message)]
        core: ErrorCore,
        #[prototk(2, uint64)]
        limit: usize,
        #[prototk(3, uint64)]
        open: usize,
    },
}

impl Error {
    /// Construct a [Error::Corruption], clicking the corruption counter.
    pub fn corruption(context: impl Into<String>) -> Self {
        CORRUPTION.click();
        Error::Corruption {
            core: ErrorCore::default(),
            context: context.into(),
        }
    }

    fn core(&self) -> &ErrorCore {
        match self {
            Error::Success { core } => core,
            Error::KeyTooLarge { core, .. } => core,
            Error::ValueTooLarge { core, .. } => core,
            Error::SortOrder { core, .. } => core,
            Error::TableFull { core, .. } => core,
            Error::BlockTooSmall { core, .. } => core,
            Error::Corruption { core, .. } => core,
            Error::LogicError { core, .. } => core,
            Error::SystemError { core, .. } => core,
            Error::TooManyOpenFiles { core, .. } => core,
        }
    }

    fn core_mut(&mut self) -> &mut ErrorCore {
        match self {
            Error::Success { core } => core,
            Error::KeyTooLarge { core, .. } => core,
            Error::ValueTooLarge { core, .. } => core,
            Error::SortOrder { core, .. } => core,
            Error::TableFull { core, .. } => core,
            Error::BlockTooSmall { core, .. } => core,
            Error::Corruption { core, .. } => core,
            Error::LogicError { core, .. } => core,
            Error::SystemError { core, .. } => core,
            Error::TooManyOpenFiles { core, .. } => core,
        }
    }
}

impl Default for Error {
    fn default() -> Self {
        Error::Success {
            core: ErrorCore::default(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Error::Success { core: _ } => fmt.debug_struct("Success").finish(),
            Error::KeyTooLarge {
                core: _,
                length,
                limit,
            } => fmt
                .debug_struct("KeyTooLarge")
                .field("length", length)
                .field("limit", limit)
                .finish(),
            Error::ValueTooLarge {
                core: _,
                length,
                limit,
            } => fmt
                .debug_struct("ValueTooLarge")
                .field("length", length)
                .field("limit", limit)
                .finish(),
            Error::SortOrder {
                core: _,
                last_key,
                new_key,
            } => fmt
                .debug_struct("SortOrder")
                .field("last_key", last_key)
                .field("new_key", new_key)
                .finish(),
            Error::TableFull {
                core: _,
                size,
                limit,
            } => fmt
                .debug_struct("TableFull")
                .field("size", size)
                .field("limit", limit)
                .finish(),
            Error::BlockTooSmall {
                core: _,
                length,
                required,
            } => fmt
                .debug_struct("BlockTooSmall")
                .field("length", length)
                .field("required", required)
                .finish(),
            Error::Corruption { core: _, context } => fmt
                .debug_struct("Corruption")
                .field("context", context)
                .finish(),
            Error::LogicError { core: _, context } => fmt
                .debug_struct("LogicError")
                .field("context", context)
                .finish(),
            Error::SystemError { core: _, what } => {
                fmt.debug_struct("SystemError").field("what", what).finish()
            }
            Error::TooManyOpenFiles {
                core: _,
                limit,
                open,
            } => fmt
                .debug_struct("TooManyOpenFiles")
                .field("limit", limit)
                .field("open", open)
                .finish(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(what: std::io::Error) -> Error {
        Error::SystemError {
            core: ErrorCore::default(),
            what: format!("{what:?}"),
        }
    }
}

impl Z for Error {
    type Error = Self;

    fn long_form(&self) -> String {
        format!("{}", self) + "\n" + &self.core().long_form()
    }

    #[allow(deprecated)]
    fn with_token(mut self, identifier: &str, value: &str) -> Self::Error {
        let core = std::mem::take(self.core_mut());
        *self.core_mut() = core.with_token(identifier, value);
        self
    }

    #[allow(deprecated)]
    fn with_url(mut self, identifier: &str, url: &str) -> Self::Error {
        let core = std::mem::take(self.core_mut());
        *self.core_mut() = core.with_url(identifier, url);
        self
    }

    #[allow(deprecated)]
    fn with_variable<X: Debug>(mut self, variable: &str, x: X) -> Self::Error {
        let core = std::mem::take(self.core_mut());
        *self.core_mut() = core.with_variable(variable, x);
        self
    }

    fn with_info<X: Debug>(mut self, name: &str, value: X) -> Self::Error {
        let core = std::mem::take(self.core_mut());
        *self.core_mut() = core.with_info(name, value);
        self
    }

    fn with_lazy_info<F: FnOnce() -> String>(mut self, name: &str, value: F) -> Self::Error {
        let core = std::mem::take(self.core_mut());
        *self.core_mut() = core.with_lazy_info(name, value);
        self
    }
}

iotoz! {Error}

//////////////////////////////////////////// ReadOptions ///////////////////////////////////////////

/// Options controlling how a table is read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadOptions {
    /// Verify the masked CRC32C of every block read from disk before returning it.  Disabling
    /// this trades safety for speed; [crate::format::read_block] still detects a malformed
    /// compression-type byte and a short read either way.
    pub verify_checksums: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

////////////////////////////////////////// file_manager helpers ////////////////////////////////////

fn io_result<T>(result: std::io::Result<T>) -> Result<T, Error> {
    result.map_err(Error::from)
}

fn error_with_path(err: Error, path: impl Into<String>) -> Error {
    err.with_info("path", path.into())
}

fn system_error_with_context(err: std::io::Error, context: impl Into<String>) -> Error {
    Error::from(err).with_info("context", context.into())
}

fn system_error_with_path_and_context(
    err: std::io::Error,
    path: impl Into<String>,
    context: impl Into<String>,
) -> Error {
    Error::from(err)
        .with_info("path", path.into())
        .with_info("context", context.into())
}

fn logic_error_file_descriptor_negative(fd: std::ffi::c_int) -> Error {
    Error::LogicError {
        core: ErrorCore::default(),
        context: format!("file descriptor is negative: {fd}"),
    }
}

fn logic_error_file_manager_broken_pointer(fd: usize) -> Error {
    Error::LogicError {
        core: ErrorCore::default(),
        context: format!("file manager bookkeeping is inconsistent for fd {fd}"),
    }
}

fn too_many_open_files(limit: usize, open: usize) -> Error {
    Error::TooManyOpenFiles {
        core: ErrorCore::default(),
        limit,
        open,
    }
}

///////////////////////////////////////////////// Cursor ///////////////////////////////////////////

/// A bidirectional cursor over sorted `(key, value)` pairs.
///
/// A cursor starts in an unpositioned state: callers must call one of
/// [Cursor::seek_to_first]/[Cursor::seek_to_last]/[Cursor::seek] before [Cursor::key]/
/// [Cursor::value] return anything. [Cursor::status] surfaces the first error the cursor
/// encountered; once an error occurs the cursor is permanently invalid.
pub trait Cursor {
    /// Position before the first entry, then advance to it.
    fn seek_to_first(&mut self) -> Result<(), Error>;
    /// Position at the last entry.
    fn seek_to_last(&mut self) -> Result<(), Error>;
    /// Position at the first entry with a key `>= key`.
    fn seek(&mut self, key: &[u8]) -> Result<(), Error>;
    /// Move to the previous entry. Becomes invalid if there is no previous entry.
    fn prev(&mut self) -> Result<(), Error>;
    /// Move to the next entry. Becomes invalid if there is no next entry.
    fn next(&mut self) -> Result<(), Error>;
    /// The current entry's key, if [Cursor::valid].
    fn key(&self) -> Option<&[u8]>;
    /// The current entry's value, if [Cursor::valid].
    fn value(&self) -> Option<&[u8]>;
    /// Whether the cursor currently designates an entry.
    fn valid(&self) -> bool;
    /// The first error this cursor encountered, if any.
    fn status(&self) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_key_len_rejects_oversize_keys() {
        let key = vec![0u8; MAX_KEY_LEN + 1];
        assert!(check_key_len(&key).is_err());
        assert!(check_key_len(&key[..MAX_KEY_LEN]).is_ok());
    }

    #[test]
    fn check_value_len_rejects_oversize_values() {
        let value = vec![0u8; MAX_VALUE_LEN + 1];
        assert!(check_value_len(&value).is_err());
        assert!(check_value_len(&value[..MAX_VALUE_LEN]).is_ok());
    }

    #[test]
    fn check_table_size_rejects_at_the_limit() {
        assert!(check_table_size(TABLE_FULL_SIZE).is_err());
        assert!(check_table_size(TABLE_FULL_SIZE - 1).is_ok());
    }

    #[test]
    fn corruption_constructor_produces_corruption_variant() {
        let err = Error::corruption("bad things");
        assert!(matches!(err, Error::Corruption { .. }));
    }

    #[test]
    fn with_info_is_visible_in_long_form() {
        let err = Error::corruption("bad things").with_info("key", "deadbeef");
        assert!(err.long_form().contains("deadbeef"));
    }
}
