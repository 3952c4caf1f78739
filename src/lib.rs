//! # Ledger-UTXO
//!
//! Client-side encoding and bookkeeping for unspent outputs of a UTXO ledger.
//!
//! This crate provides the bit-exact binary format of ledger outputs, their
//! content-addressed identifiers, and an in-memory UTXO set with balance
//! queries and rule-based merging. It performs no I/O: callers hand it bytes
//! or cb58 strings obtained from a node and get typed values back.
//!
//! ## Layers
//!
//! - `bintools`: cb58/hex encodings and a bounds-checked byte reader
//! - `output`: the owner predicate and output variants, dispatched by type ID
//! - `utxo`: a single output record and its UTXOID
//! - `utxo_set`: keyed collection, queries and merge rules
//!
//! ## Usage
//!
//! ```rust
//! use ledger_utxo::UtxoCodec;
//! use ledger_utxo::output::{Output, OutputOwners};
//!
//! let codec = UtxoCodec::new();
//! let owners = OutputOwners::new(vec![[1u8; 20]], 0, 1);
//! let utxo = codec.build_utxo([7u8; 32], 0, [9u8; 32], Output::transfer(500u64, owners));
//!
//! let encoded = utxo.to_cb58().unwrap();
//! assert_eq!(codec.parse_utxo(&encoded).unwrap(), utxo);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod config;
pub mod bintools;
pub mod output;
pub mod utxo;
pub mod utxo_set;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{Result, UtxoError};
pub use config::CodecConfig;
pub use bintools::Encoding;
pub use output::{Output, OutputOwners};
pub use utxo::Utxo;
pub use utxo_set::{AddOutcome, AssetRef, MergeRule, UtxoLike, UtxoRef, UtxoSet};

/// Stateless entry point bundling a [`CodecConfig`]
///
/// # Examples
///
/// ```
/// use ledger_utxo::{CodecConfig, UtxoCodec};
///
/// let codec = UtxoCodec::with_config(CodecConfig { codec_id: 1, ..CodecConfig::default() });
/// assert_eq!(codec.config().codec_id, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UtxoCodec {
    config: CodecConfig,
}

impl UtxoCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// base-58 encode `payload` with a trailing 4-byte checksum
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_utxo::UtxoCodec;
    ///
    /// let codec = UtxoCodec::new();
    /// let encoded = codec.encode_checked(b"ledger");
    /// assert_eq!(codec.decode_checked(&encoded).unwrap(), b"ledger".to_vec());
    /// ```
    pub fn encode_checked(&self, payload: &[u8]) -> String {
        bintools::encode_checked(payload)
    }

    pub fn decode_checked(&self, encoded: &str) -> Result<ByteString> {
        bintools::decode_checked(encoded)
    }

    /// Build a complete UTXO stamped with the configured codec version
    pub fn build_utxo(&self, tx_id: TxId, output_index: u32, asset_id: AssetId, output: Output) -> Utxo {
        Utxo::new(self.config.codec_id, tx_id, output_index, asset_id, output)
    }

    /// Decode a cb58 UTXO string under this codec's limits
    pub fn parse_utxo(&self, encoded: &str) -> Result<Utxo> {
        Utxo::from_cb58_with(encoded, &self.config)
    }

    /// Decode raw UTXO bytes under this codec's limits
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_utxo::{UtxoCodec, UtxoError};
    ///
    /// let codec = UtxoCodec::new();
    /// let result = codec.parse_utxo_bytes(&[0u8; 10]);
    /// assert!(matches!(result, Err(UtxoError::Decoding(_))));
    /// ```
    pub fn parse_utxo_bytes(&self, bytes: &[u8]) -> Result<Utxo> {
        Utxo::from_bytes_with(bytes, &self.config)
    }

    /// Empty set decoding with this codec's limits
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_utxo::UtxoCodec;
    /// use ledger_utxo::output::{Output, OutputOwners};
    ///
    /// let codec = UtxoCodec::new();
    /// let mut set = codec.new_set();
    /// let owners = OutputOwners::new(vec![[1u8; 20]], 0, 1);
    /// let utxo = codec.build_utxo([7u8; 32], 0, [9u8; 32], Output::transfer(500u64, owners));
    ///
    /// assert!(set.add(utxo.clone(), false).unwrap().added().is_some());
    /// assert!(set.add(utxo, false).unwrap().is_skipped());
    /// ```
    pub fn new_set(&self) -> UtxoSet {
        UtxoSet::with_config(self.config.clone())
    }

    /// Owner address of a secp256k1 public key
    pub fn address_from_public_key(&self, public_key: &[u8]) -> Result<Address> {
        bintools::address_from_public_key(public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_utxo_uses_config_codec() {
        let codec = UtxoCodec::with_config(CodecConfig { codec_id: 3, ..CodecConfig::default() });
        let owners = OutputOwners::new(vec![[1u8; 20]], 0, 1);
        let utxo = codec.build_utxo([1u8; 32], 0, [2u8; 32], Output::transfer(1u64, owners));
        assert_eq!(utxo.codec_id(), 3);
        assert_eq!(&utxo.to_bytes().unwrap()[0..2], &[0, 3]);
    }

    #[test]
    fn test_parse_utxo_respects_limits() {
        let addresses: Vec<Address> = (0u8..3).map(|i| [i; 20]).collect();
        let owners = OutputOwners::new(addresses, 0, 1);
        let utxo = UtxoCodec::new().build_utxo([1u8; 32], 0, [2u8; 32], Output::transfer(1u64, owners));
        let encoded = utxo.to_cb58().unwrap();

        let strict = UtxoCodec::with_config(CodecConfig { max_addresses: 2, ..CodecConfig::default() });
        assert!(strict.parse_utxo(&encoded).is_err());
        assert!(strict.new_set().add(encoded.as_str(), false).is_err());
        assert_eq!(UtxoCodec::new().parse_utxo(&encoded).unwrap(), utxo);
    }
}
