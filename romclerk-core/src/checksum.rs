//! Checksum primitives shared by the codecs and the matching engine.
//!
//! Covers the whole-image digest quartet (CRC-32, MD5, SHA-1, SHA-256), the
//! 16-bit modular byte sum Nintendo used for production verification, and
//! the nonstandard FDS block CRC-16.

use serde::{Deserialize, Serialize};
use sha1::Digest;

use crate::error::RomError;
use crate::util::hex_upper;

/// CRC-32, MD5, SHA-1, and SHA-256 of one byte buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSet {
    pub crc32: u32,
    pub md5: [u8; 16],
    pub sha1: [u8; 20],
    pub sha256: [u8; 32],
}

impl DigestSet {
    /// Compute all four digests of `data` in one pass over the buffer.
    pub fn of(data: &[u8]) -> Self {
        let mut md5_ctx = md5::Context::new();
        md5_ctx.consume(data);

        let mut sha1_ctx = sha1::Sha1::new();
        sha1_ctx.update(data);

        let mut sha256_ctx = sha2::Sha256::new();
        sha256_ctx.update(data);

        Self {
            crc32: crc32fast::hash(data),
            md5: md5_ctx.compute().0,
            sha1: sha1_ctx.finalize().into(),
            sha256: sha256_ctx.finalize().into(),
        }
    }

    pub fn crc32_hex(&self) -> String {
        hex_upper(&self.crc32.to_be_bytes())
    }

    pub fn md5_hex(&self) -> String {
        hex_upper(&self.md5)
    }

    pub fn sha1_hex(&self) -> String {
        hex_upper(&self.sha1)
    }

    pub fn sha256_hex(&self) -> String {
        hex_upper(&self.sha256)
    }
}

/// Digest quartet plus sum-16 for one ROM segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDigests {
    pub sum16: u16,
    pub crc32: u32,
    pub md5: [u8; 16],
    pub sha1: [u8; 20],
    pub sha256: [u8; 32],
}

impl SegmentDigests {
    pub fn of(data: &[u8]) -> Self {
        let whole = DigestSet::of(data);
        Self {
            sum16: sum16(data),
            crc32: whole.crc32,
            md5: whole.md5,
            sha1: whole.sha1,
            sha256: whole.sha256,
        }
    }

    pub fn crc32_hex(&self) -> String {
        hex_upper(&self.crc32.to_be_bytes())
    }

    pub fn sum16_hex(&self) -> String {
        hex_upper(&self.sum16.to_be_bytes())
    }

    pub fn md5_hex(&self) -> String {
        hex_upper(&self.md5)
    }

    pub fn sha1_hex(&self) -> String {
        hex_upper(&self.sha1)
    }

    pub fn sha256_hex(&self) -> String {
        hex_upper(&self.sha256)
    }
}

/// The least significant 16 bits of the unsigned byte sum of `data`.
pub fn sum16(data: &[u8]) -> u16 {
    let mut sum: u64 = 0;
    for &byte in data {
        sum = sum.wrapping_add(u64::from(byte));
    }
    sum as u16
}

/// Compute the CRC-16 of one FDS block.
///
/// The register starts at 0x8000 and runs LSB-first against polynomial
/// 0x8408. The last two bytes of `block` are CRC placeholders; they are
/// processed as zeros regardless of their current content, so a block can
/// be checked in place.
pub fn fds_block_crc(block: &[u8]) -> Result<u16, RomError> {
    let size = block.len();
    if size < 3 {
        return Err(RomError::CrcDataTooSmall);
    }

    let mut crc: u16 = 0x8000;

    for index in 0..size {
        let byte = if index < size - 2 { block[index] } else { 0 };

        for bit in 0..8 {
            let incoming = u16::from((byte >> bit) & 1);
            let carry = crc & 1;
            crc = (crc >> 1) | (incoming << 15);
            if carry == 1 {
                crc ^= 0x8408;
            }
        }
    }

    Ok(crc)
}

#[cfg(test)]
#[path = "tests/checksum_tests.rs"]
mod tests;
