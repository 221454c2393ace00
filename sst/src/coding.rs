//! Little-endian fixed-width and unsigned base-128 varint integer coding.
//!
//! This is a thin layer over [buffertk]'s [Packable]/[Unpackable] machinery: fixed32/fixed64 ride
//! on buffertk's blanket `u32`/`u64` impls (plain little-endian, no tag), and varint32/varint64
//! ride on buffertk's [v64].

use buffertk::{stack_pack, v64, Packable, Unpacker};

use crate::Error;

/// Append `x` to `buf` as a 4-byte little-endian fixed-width integer.
pub fn put_fixed32(buf: &mut Vec<u8>, x: u32) {
    stack_pack(x).append_to_vec(buf);
}

/// Read a 4-byte little-endian fixed-width integer from the front of `buf`.
pub fn get_fixed32(buf: &[u8]) -> Result<u32, Error> {
    if buf.len() < 4 {
        return Err(Error::corruption("truncated fixed32"));
    }
    let mut out = [0u8; 4];
    out.copy_from_slice(&buf[..4]);
    Ok(u32::from_le_bytes(out))
}

/// Append `x` to `buf` as an unsigned varint32 (at most 5 bytes).
pub fn put_varint32(buf: &mut Vec<u8>, x: u32) {
    stack_pack(v64::from(x)).append_to_vec(buf);
}

/// Append `x` to `buf` as an unsigned varint64 (at most 10 bytes).
pub fn put_varint64(buf: &mut Vec<u8>, x: u64) {
    stack_pack(v64::from(x)).append_to_vec(buf);
}

/// Decode an unsigned varint32 from the front of `buf`, returning the value and the unconsumed
/// remainder. Fails with [Error::Corruption] if the buffer ends mid-varint or the varint
/// overflows a `u32`.
pub fn get_varint32(buf: &[u8]) -> Result<(u32, &[u8]), Error> {
    let mut up = Unpacker::new(buf);
    let v: v64 = up
        .unpack()
        .map_err(|_: buffertk::Error| Error::corruption("malformed varint32"))?;
    let x: u64 = v.into();
    if x > u32::MAX as u64 {
        return Err(Error::corruption("varint32 overflow"));
    }
    Ok((x as u32, up.remain()))
}

/// Decode an unsigned varint64 from the front of `buf`, returning the value and the unconsumed
/// remainder.
pub fn get_varint64(buf: &[u8]) -> Result<(u64, &[u8]), Error> {
    let mut up = Unpacker::new(buf);
    let v: v64 = up
        .unpack()
        .map_err(|_: buffertk::Error| Error::corruption("malformed varint64"))?;
    Ok((v.into(), up.remain()))
}

/// Number of bytes `put_varint32`/`put_varint64` would emit for `x`.
pub fn varint_length(x: u64) -> usize {
    stack_pack(v64::from(x)).pack_sz()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_300_is_two_bytes() {
        let mut buf = Vec::new();
        put_varint32(&mut buf, 300);
        assert_eq!(vec![0xac, 0x02], buf);
        let (x, rem) = get_varint32(&buf).unwrap();
        assert_eq!(300, x);
        assert!(rem.is_empty());
    }

    #[test]
    fn varint_zero_is_one_byte() {
        let mut buf = Vec::new();
        put_varint32(&mut buf, 0);
        assert_eq!(vec![0x00], buf);
    }

    #[test]
    fn varint_u32_max_is_five_bytes() {
        let mut buf = Vec::new();
        put_varint32(&mut buf, u32::MAX);
        assert_eq!(5, buf.len());
        let (x, _) = get_varint32(&buf).unwrap();
        assert_eq!(u32::MAX, x);
    }

    #[test]
    fn fixed32_round_trips() {
        let mut buf = Vec::new();
        put_fixed32(&mut buf, 0xc0ffeeda);
        assert_eq!(vec![0xda, 0xee, 0xff, 0xc0], buf);
        assert_eq!(0xc0ffeeda, get_fixed32(&buf).unwrap());
    }

    #[test]
    fn truncated_varint_is_corruption() {
        let buf = [0x80u8];
        assert!(get_varint32(&buf).is_err());
    }

    #[test]
    fn truncated_fixed32_is_corruption() {
        let buf = [0u8; 3];
        assert!(get_fixed32(&buf).is_err());
    }
}
