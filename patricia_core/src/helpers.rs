//! Helper functions for Patricia tree operations
//!
//! Two bit views live here. `bit_at` / `first_differing_bit` read a key as a
//! plain MSB-first bit string padded with zeros forever. The trie itself
//! branches on the *framed* view (`key_bit` / `crit_bit`), where every byte
//! is preceded by a virtual "byte present" bit so that keys differing only
//! in trailing `0x00` bytes still have a critical bit.

use crate::constants::FRAME_BITS;

/// Bit `pos` of `buf`, numbered MSB-first across consecutive bytes.
/// Positions at or past `8 * buf.len()` read as 0.
#[inline]
pub fn bit_at(buf: &[u8], pos: usize) -> u8 {
    match buf.get(pos / 8) {
        Some(&byte) => (byte >> (7 - pos % 8)) & 1,
        None => 0,
    }
}

/// Lowest bit position at which `a` and `b` differ under zero padding.
///
/// The inputs must differ somewhere in their padded bit strings; equal
/// inputs (or inputs that differ only by trailing zero bytes) have no
/// answer. Debug builds assert on that, release builds return the first
/// position past both inputs.
pub fn first_differing_bit(a: &[u8], b: &[u8]) -> usize {
    let len = a.len().max(b.len());
    let found = (0..len).find_map(|i| {
        let diff = a.get(i).copied().unwrap_or(0) ^ b.get(i).copied().unwrap_or(0);
        (diff != 0).then(|| i * 8 + diff.leading_zeros() as usize)
    });
    debug_assert!(found.is_some(), "first_differing_bit: inputs have no differing bit");
    found.unwrap_or(len * 8)
}

/// Bit `pos` of the framed view of `key`. Negative positions (the sentinel
/// split) read as 0, so every descent leaves the root through its left slot.
#[inline]
pub fn key_bit(key: &[u8], pos: isize) -> u8 {
    if pos < 0 {
        return 0;
    }
    let pos = pos as usize;
    let (byte, offset) = (pos / FRAME_BITS, pos % FRAME_BITS);
    if offset == 0 {
        (byte < key.len()) as u8
    } else {
        bit_at(key, byte * 8 + offset - 1)
    }
}

/// Critical bit of two distinct keys in the framed view.
pub fn crit_bit(a: &[u8], b: &[u8]) -> isize {
    debug_assert!(a != b, "crit_bit: identical keys");
    let common = a.len().min(b.len());
    let (head_a, head_b) = (&a[..common], &b[..common]);
    let pos = if head_a != head_b {
        let raw = first_differing_bit(head_a, head_b);
        (raw / 8) * FRAME_BITS + 1 + raw % 8
    } else {
        // one key is a proper prefix of the other
        common * FRAME_BITS
    };
    pos as isize
}
