//! Core identifier types for ledger outputs

use crate::constants::{ADDRESS_LENGTH, ASSET_ID_LENGTH, TX_ID_LENGTH};

/// Transaction identifier: 32 raw bytes
pub type TxId = [u8; TX_ID_LENGTH];

/// Asset identifier: 32 raw bytes
pub type AssetId = [u8; ASSET_ID_LENGTH];

/// Owner address: 20-byte short id (RIPEMD-160 of SHA-256 of a public key)
pub type Address = [u8; ADDRESS_LENGTH];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Unix timestamp in seconds
pub type Timestamp = u64;
