//! Binary helpers: cb58 and hex text encodings, buffer utilities, and a
//! bounds-checked big-endian reader used by every decoder in the crate.
//!
//! cb58 is base-58 over `payload || checksum4`, where `checksum4` is the
//! last four bytes of SHA-256(payload).

use crate::constants::CHECKSUM_LENGTH;
use crate::error::{Result, UtxoError};
use crate::types::*;
use ripemd::Ripemd160;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::str::FromStr;

/// Checksum4: 𝔹* → 𝔹⁴, the trailing four bytes of SHA-256
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let digest = Sha256::digest(payload);
    let mut out = [0u8; CHECKSUM_LENGTH];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LENGTH..]);
    out
}

/// Append the checksum to `payload` and base-58 encode the result
pub fn encode_checked(payload: &[u8]) -> String {
    let framed = concat(&[payload, &checksum(payload)[..]]);
    bs58::encode(framed).into_string()
}

/// Base-58 decode `encoded`, verify and strip the trailing checksum
pub fn decode_checked(encoded: &str) -> Result<ByteString> {
    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| UtxoError::Decoding(format!("invalid base-58: {}", e)))?;

    if raw.len() < CHECKSUM_LENGTH {
        return Err(UtxoError::Decoding(format!(
            "cb58 string too short: {} bytes",
            raw.len()
        )));
    }

    let (payload, found) = raw.split_at(raw.len() - CHECKSUM_LENGTH);
    let expected = checksum(payload);
    if expected != found {
        log::warn!("rejecting cb58 string with bad checksum");
        return Err(UtxoError::Checksum {
            expected: hex::encode(expected),
            found: hex::encode(found),
        });
    }

    Ok(payload.to_vec())
}

/// Lowercase hex without prefix
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode hex, with or without a leading `0x`
pub fn decode_hex(encoded: &str) -> Result<ByteString> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    hex::decode(digits).map_err(|e| UtxoError::Decoding(format!("invalid hex: {}", e)))
}

pub fn concat(parts: &[&[u8]]) -> ByteString {
    let mut out = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

pub fn buffers_equal(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Length first, then lexicographic (the ordering used for owner address sets)
pub fn compare_buffers(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Text rendering used for byte fields of serialized documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Hex,
    /// cb58, the human-shareable form
    Display,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Hex => "hex",
            Encoding::Display => "display",
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Hex => encode_hex(bytes),
            Encoding::Display => encode_checked(bytes),
        }
    }

    pub fn decode(&self, encoded: &str) -> Result<ByteString> {
        match self {
            Encoding::Hex => decode_hex(encoded),
            Encoding::Display => decode_checked(encoded),
        }
    }

    /// Decode into a fixed-width field, failing on any length mismatch
    pub fn decode_array<const N: usize>(&self, encoded: &str, field: &str) -> Result<[u8; N]> {
        let bytes = self.decode(encoded)?;
        <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
            UtxoError::Decoding(format!("{} must be {} bytes, got {}", field, N, bytes.len()))
        })
    }
}

impl FromStr for Encoding {
    type Err = UtxoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hex" => Ok(Encoding::Hex),
            "display" | "cb58" => Ok(Encoding::Display),
            other => Err(UtxoError::Decoding(format!("unknown encoding: {}", other))),
        }
    }
}

/// Current Unix time in seconds
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp().max(0) as Timestamp
}

/// Derive the owner address of a secp256k1 public key.
///
/// Address = RIPEMD-160(SHA-256(compressed key)); uncompressed keys are
/// accepted and normalized first.
pub fn address_from_public_key(public_key: &[u8]) -> Result<Address> {
    let key = PublicKey::from_slice(public_key)
        .map_err(|e| UtxoError::Decoding(format!("invalid public key: {}", e)))?;
    let sha = Sha256::digest(key.serialize());
    let hash = Ripemd160::digest(sha);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash);
    Ok(address)
}

/// Cursor over a byte slice; every read is bounds-checked and reports the
/// field it was reading when the buffer runs out.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(UtxoError::Decoding(format!(
                "buffer too short for {} at offset {}: need {} bytes, have {}",
                field,
                self.offset,
                len,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.offset..self.offset + len];
        log::trace!("read {} ({} bytes) at offset {}", field, len, self.offset);
        self.offset += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let slice = self.read_bytes(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u16(&mut self, field: &str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_u32(&mut self, field: &str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_u64(&mut self, field: &str) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array(field)?))
    }
}
