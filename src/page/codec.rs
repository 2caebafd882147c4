//! Little-endian primitive accessors over a fixed-size page buffer.
//!
//! Grounded on `examples/original_source/lib/disk/page.go`'s `Page` type:
//! every field in a page is accessed by explicit byte offset rather than
//! through a cursor, because node records are read in a scatter pattern
//! (fixed header, then per-entry fixed fields, then a separate pass over
//! variable-length tails).

use crate::utils::num::i32_to_usize;

#[must_use]
pub fn get_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap())
}

pub fn put_u16(buf: &mut [u8], offset: usize, val: u16) {
    buf[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
}

#[must_use]
pub fn get_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

pub fn put_u64(buf: &mut [u8], offset: usize, val: u64) {
    buf[offset..offset + 8].copy_from_slice(&val.to_le_bytes());
}

#[must_use]
pub fn get_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

pub fn put_i32(buf: &mut [u8], offset: usize, val: i32) {
    buf[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
}

#[must_use]
pub fn get_f64(buf: &[u8], offset: usize) -> f64 {
    f64::from_bits(get_u64(buf, offset))
}

pub fn put_f64(buf: &mut [u8], offset: usize, val: f64) {
    put_u64(buf, offset, val.to_bits());
}

#[must_use]
pub fn get_bool(buf: &[u8], offset: usize) -> bool {
    buf[offset] == 1
}

pub fn put_bool(buf: &mut [u8], offset: usize, val: bool) {
    buf[offset] = u8::from(val);
}

/// Reads a length-prefixed (`i32`) byte slice starting at `offset`. A
/// negative stored length (impossible for bytes this crate wrote itself,
/// but not for an arbitrary corrupt page) reads as empty rather than
/// wrapping to a huge `usize`.
#[must_use]
pub fn get_bytes(buf: &[u8], offset: usize) -> Vec<u8> {
    let len = i32_to_usize(get_i32(buf, offset)).unwrap_or(0);
    buf[offset + 4..offset + 4 + len].to_vec()
}

/// Writes `bytes` as a length-prefixed (`i32`) slice at `offset`. Returns
/// the number of bytes written, including the 4-byte length prefix.
pub fn put_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> usize {
    put_i32(buf, offset, bytes.len() as i32);
    buf[offset + 4..offset + 4 + bytes.len()].copy_from_slice(bytes);
    4 + bytes.len()
}
