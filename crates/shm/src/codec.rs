// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Little-endian primitive codec over a byte buffer.
//!
//! Every function takes an offset and returns the advanced offset, so callers
//! thread a cursor through a sequence of writes the way the fixed V1 metadata
//! blocks are laid out. All accesses are bounds-checked; an out-of-range
//! write is a caller bug surfaced as [`CodecError`] rather than a panic.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("write of {len} bytes at offset {offset} exceeds buffer of {capacity}")]
pub struct CodecError {
    pub offset: usize,
    pub len: usize,
    pub capacity: usize,
}

fn check(buf: &[u8], offset: usize, len: usize) -> Result<(), CodecError> {
    if offset.checked_add(len).is_none_or(|end| end > buf.len()) {
        return Err(CodecError { offset, len, capacity: buf.len() });
    }
    Ok(())
}

pub fn write_byte(buf: &mut [u8], offset: usize, byte: u8) -> Result<usize, CodecError> {
    check(buf, offset, 1)?;
    buf[offset] = byte;
    Ok(offset + 1)
}

pub fn write_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<usize, CodecError> {
    check(buf, offset, bytes.len())?;
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    Ok(offset + bytes.len())
}

pub fn fill_bytes(
    buf: &mut [u8],
    offset: usize,
    byte: u8,
    count: usize,
) -> Result<usize, CodecError> {
    check(buf, offset, count)?;
    buf[offset..offset + count].fill(byte);
    Ok(offset + count)
}

pub fn write_u32(buf: &mut [u8], offset: usize, val: u32) -> Result<usize, CodecError> {
    write_bytes(buf, offset, &val.to_le_bytes())
}

pub fn write_i64(buf: &mut [u8], offset: usize, val: i64) -> Result<usize, CodecError> {
    write_bytes(buf, offset, &val.to_le_bytes())
}

/// Writes the bytes of `s` followed by exactly one NUL terminator.
pub fn write_cstr(buf: &mut [u8], offset: usize, s: &str) -> Result<usize, CodecError> {
    let offset = write_bytes(buf, offset, s.as_bytes())?;
    write_byte(buf, offset, 0)
}

pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> Result<(&[u8], usize), CodecError> {
    check(buf, offset, len)?;
    Ok((&buf[offset..offset + len], offset + len))
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<(u32, usize), CodecError> {
    let (bytes, next) = read_bytes(buf, offset, 4)?;
    let mut arr = [0u8; 4];
    arr.copy_from_slice(bytes);
    Ok((u32::from_le_bytes(arr), next))
}

pub fn read_i64(buf: &[u8], offset: usize) -> Result<(i64, usize), CodecError> {
    let (bytes, next) = read_bytes(buf, offset, 8)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    Ok((i64::from_le_bytes(arr), next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_is_lsb_first() {
        let mut buf = [0u8; 8];
        let next = write_u32(&mut buf, 1, 0x0403_0201).unwrap();
        assert_eq!(next, 5);
        assert_eq!(&buf[..6], &[0, 1, 2, 3, 4, 0]);
        assert_eq!(read_u32(&buf, 1).unwrap().0, 0x0403_0201);
    }

    #[test]
    fn test_i64_roundtrip_negative() {
        let mut buf = [0u8; 8];
        write_i64(&mut buf, 0, -2).unwrap();
        assert_eq!(read_i64(&buf, 0).unwrap().0, -2);
    }

    #[test]
    fn test_cstr_writes_single_nul() {
        let mut buf = [0xffu8; 6];
        let next = write_cstr(&mut buf, 0, "abc").unwrap();
        assert_eq!(next, 4);
        assert_eq!(&buf[..5], b"abc\0\xff");
    }

    #[test]
    fn test_out_of_bounds_is_an_error() {
        let mut buf = [0u8; 3];
        assert!(write_u32(&mut buf, 0, 1).is_err());
        assert!(write_bytes(&mut buf, 2, &[1, 2]).is_err());
        assert!(fill_bytes(&mut buf, usize::MAX, 0, 2).is_err());
        assert!(read_u32(&buf, 0).is_err());
    }
}
