//! On-disk framing shared by every block in a table: the [BlockHandle] that locates a block's
//! payload, the per-block trailer (compression type + masked CRC32C) that follows it, and the
//! fixed-size [Footer] that anchors the whole file.

use crate::coding::{get_varint64, put_varint64, varint_length};
use crate::crc;
use crate::file_manager::FileHandle;
use crate::{Error, ReadOptions, CORRUPTION};

/// Magic number closing every table, little-endian.  Chosen to be recognizably non-zero and
/// non-ASCII so a truncated or foreign file is caught immediately.
pub const MAGIC: u64 = 0xdb4775248b80fb57;

/// Upper bound on the encoded size of a [BlockHandle]: two maximally-sized varint64s.
const BLOCK_HANDLE_ENCODED_LENGTH: usize = 20;

/// Reserved footer space for the block handle: two handle-widths, matching the original
/// leveldb footer layout (metaindex handle + index handle) even though only one handle is
/// stored today.
pub const BLOCK_HANDLE_MAX_ENCODED_LENGTH: usize = 2 * BLOCK_HANDLE_ENCODED_LENGTH;

/// Total on-disk size of a [Footer]: the padded block handle region plus the 8-byte magic.
pub const FOOTER_ENCODED_LENGTH: usize = BLOCK_HANDLE_MAX_ENCODED_LENGTH + 8;

//////////////////////////////////////////// BlockHandle ///////////////////////////////////////////

/// Locates a block's payload within the table file: a byte offset and a size, both excluding the
/// block's 5-byte trailer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Append the varint64-encoded offset and size to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        put_varint64(buf, self.offset);
        put_varint64(buf, self.size);
    }

    /// Decode a handle from the front of `buf`, returning it and the unconsumed remainder.
    /// Fails with [Error::Corruption] if either varint is malformed.
    pub fn decode(buf: &[u8]) -> Result<(Self, &[u8]), Error> {
        let (offset, rest) = get_varint64(buf).map_err(|_| {
            CORRUPTION.click();
            Error::corruption("malformed block handle (offset)")
        })?;
        let (size, rest) = get_varint64(rest).map_err(|_| {
            CORRUPTION.click();
            Error::corruption("malformed block handle (size)")
        })?;
        Ok((Self { offset, size }, rest))
    }

    fn encoded_length(&self) -> usize {
        varint_length(self.offset) + varint_length(self.size)
    }
}

//////////////////////////////////////////////// Footer ////////////////////////////////////////////

/// The fixed 48-byte trailer of a table file: the index block's handle, padded to a fixed width,
/// followed by the magic number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Footer {
    pub index_handle: BlockHandle,
}

impl Footer {
    pub fn new(index_handle: BlockHandle) -> Self {
        Self { index_handle }
    }

    /// Encode to exactly [FOOTER_ENCODED_LENGTH] bytes.
    pub fn encode(&self) -> [u8; FOOTER_ENCODED_LENGTH] {
        let mut out = [0u8; FOOTER_ENCODED_LENGTH];
        let mut handle_bytes = Vec::with_capacity(BLOCK_HANDLE_MAX_ENCODED_LENGTH);
        self.index_handle.encode(&mut handle_bytes);
        out[..handle_bytes.len()].copy_from_slice(&handle_bytes);
        out[BLOCK_HANDLE_MAX_ENCODED_LENGTH..].copy_from_slice(&MAGIC.to_le_bytes());
        out
    }

    /// Decode a footer from exactly [FOOTER_ENCODED_LENGTH] bytes.  Fails with
    /// [Error::Corruption] if the magic does not match or the handle is malformed.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() != FOOTER_ENCODED_LENGTH {
            return Err(Error::corruption("footer has the wrong length"));
        }
        let mut magic_bytes = [0u8; 8];
        magic_bytes.copy_from_slice(&buf[BLOCK_HANDLE_MAX_ENCODED_LENGTH..]);
        let magic = u64::from_le_bytes(magic_bytes);
        if magic != MAGIC {
            CORRUPTION.click();
            return Err(Error::corruption("not an sstable (magic number mismatch)"));
        }
        let (index_handle, _) = BlockHandle::decode(&buf[..BLOCK_HANDLE_MAX_ENCODED_LENGTH])?;
        Ok(Self { index_handle })
    }
}

///////////////////////////////////////// CompressionType //////////////////////////////////////////

/// The one-byte compression tag stored in every block trailer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionType {
    None = 0,
    Snappy = 1,
}

impl CompressionType {
    fn from_byte(b: u8) -> Result<Self, Error> {
        match b {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Snappy),
            _ => {
                CORRUPTION.click();
                Err(Error::corruption("bad block type"))
            }
        }
    }
}

/////////////////////////////////////////////// Compressor /////////////////////////////////////////

/// The compression codec is an external collaborator: this crate fixes the wire contract (a
/// one-byte [CompressionType] tag per block) but delegates the actual transform to a pluggable
/// capability, the same way the comparator and the file are pluggable.
pub trait Compressor: std::fmt::Debug + Send + Sync {
    /// The [CompressionType] this compressor produces and consumes.
    fn compression_type(&self) -> CompressionType;

    /// Compress `raw`, returning `None` if compression did not help (caller falls back to
    /// storing the block uncompressed).
    fn compress(&self, raw: &[u8]) -> Option<Vec<u8>>;

    /// Decompress a payload this compressor produced.
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, Error>;
}

/// The always-available no-op compressor.  Used as the default, and as the fallback whenever a
/// real compressor declines to shrink a block.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn compression_type(&self) -> CompressionType {
        CompressionType::None
    }

    fn compress(&self, _raw: &[u8]) -> Option<Vec<u8>> {
        None
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(compressed.to_vec())
    }
}

////////////////////////////////////////////// BlockContents ////////////////////////////////////////

/// The result of a successful [read_block]: the decoded block payload (trailer stripped,
/// decompressed if necessary) plus whether it is fresh enough to be worth caching.
#[derive(Clone, Debug)]
pub struct BlockContents {
    pub data: Vec<u8>,
    /// Set when `data` is a fresh allocation distinct from any caller-visible buffer, and so
    /// suitable for insertion into an external block cache.
    pub cacheable: bool,
}

/// Read the block (and its 5-byte trailer) located by `handle`, verify its checksum (if
/// `options.verify_checksums`), and decompress it per the trailer's compression type.
pub fn read_block(
    file: &FileHandle,
    options: &ReadOptions,
    handle: &BlockHandle,
    compressor: &dyn Compressor,
) -> Result<BlockContents, Error> {
    let n = handle.size as usize;
    let mut buf = vec![0u8; n + 5];
    file.read_exact_at(&mut buf, handle.offset).map_err(|_| {
        Error::corruption("truncated block read")
    })?;

    let compression_byte = buf[n];
    let stored_crc = crc::unmask(u32::from_le_bytes([
        buf[n + 1],
        buf[n + 2],
        buf[n + 3],
        buf[n + 4],
    ]));
    if options.verify_checksums {
        let computed = crc::value(&buf[..n + 1]);
        if computed != stored_crc {
            CORRUPTION.click();
            return Err(Error::corruption("block checksum mismatch"));
        }
    }

    let compression_type = CompressionType::from_byte(compression_byte)?;
    match compression_type {
        CompressionType::None => {
            buf.truncate(n);
            Ok(BlockContents {
                data: buf,
                cacheable: true,
            })
        }
        CompressionType::Snappy => {
            if compressor.compression_type() != CompressionType::Snappy {
                CORRUPTION.click();
                return Err(Error::corruption(
                    "block is snappy-compressed but no snappy compressor is configured",
                ));
            }
            let data = compressor.decompress(&buf[..n])?;
            Ok(BlockContents {
                data,
                cacheable: true,
            })
        }
    }
}

/// Append `contents` to `file` (growing it by `contents.len() + 5` bytes), framed with a trailer
/// of `(compression_type, masked_crc32c(contents ++ compression_type))`.  Returns the
/// [BlockHandle] locating the freshly written block, and the number of bytes written including
/// the trailer.
pub fn write_raw_block(
    file: &mut FileHandle,
    offset: u64,
    contents: &[u8],
    compression_type: CompressionType,
) -> Result<(BlockHandle, u64), Error> {
    use std::io::Write;
    file.write_all(contents)?;
    let type_byte = compression_type as u8;
    let mut crc = crc::value(contents);
    crc = crc::extend(crc, &[type_byte]);
    let masked = crc::mask(crc);
    let mut trailer = [0u8; 5];
    trailer[0] = type_byte;
    trailer[1..5].copy_from_slice(&masked.to_le_bytes());
    file.write_all(&trailer)?;
    let handle = BlockHandle::new(offset, contents.len() as u64);
    Ok((handle, contents.len() as u64 + 5))
}
