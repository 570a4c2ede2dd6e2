// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Little-endian bit-field access to the process data image.
//!
//! Fields are up to 32 bits wide and may start at any bit. Accesses that
//! fall outside the buffer read as zero and are not written.

use crate::types::Offset;

fn span(offset: Offset, bits: u8) -> Option<(usize, usize)> {
    if bits == 0 || bits > 32 || offset.bit > 7 {
        return None;
    }
    let len = (offset.bit as usize + bits as usize + 7) / 8;
    Some((offset.byte, offset.byte + len))
}

fn mask(bits: u8) -> u64 {
    (1u64 << bits) - 1
}

/// Reads a field, sign-extending it when `signed` is set.
pub fn read_field(pd: &[u8], offset: Offset, bits: u8, signed: bool) -> i64 {
    let bytes = match span(offset, bits).and_then(|(start, end)| pd.get(start..end)) {
        Some(bytes) => bytes,
        None => return 0,
    };
    let word = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    let raw = (word >> offset.bit) & mask(bits);
    if signed {
        let shift = 64 - u32::from(bits);
        ((raw << shift) as i64) >> shift
    } else {
        raw as i64
    }
}

/// Writes the low `bits` bits of `value`, leaving neighbouring bits alone.
pub fn write_field(pd: &mut [u8], offset: Offset, bits: u8, value: i64) {
    let (start, end) = match span(offset, bits) {
        Some(span) => span,
        None => return,
    };
    let bytes = match pd.get_mut(start..end) {
        Some(bytes) => bytes,
        None => return,
    };
    let mut word = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    let m = mask(bits) << offset.bit;
    word = (word & !m) | (((value as u64) << offset.bit) & m);
    for b in bytes.iter_mut() {
        *b = word as u8;
        word >>= 8;
    }
}

pub fn read_bit(pd: &[u8], offset: Offset) -> bool {
    read_field(pd, offset, 1, false) != 0
}

pub fn write_bit(pd: &mut [u8], offset: Offset, value: bool) {
    write_field(pd, offset, 1, value as i64)
}

/// Offset of bit `n` of the field starting at `offset`.
pub fn bit_of(offset: Offset, n: u32) -> Offset {
    let abs = offset.byte * 8 + offset.bit as usize + n as usize;
    Offset {
        byte: abs / 8,
        bit: (abs % 8) as u32,
    }
}

/// Little-endian encoding of the low `bits` bits of `value`, for SDO payloads.
pub fn to_le_bytes(value: i64, bits: u8) -> Vec<u8> {
    let len = (usize::from(bits) + 7) / 8;
    value.to_le_bytes()[..len.min(8)].to_vec()
}
