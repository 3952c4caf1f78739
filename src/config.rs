//! Codec configuration

use crate::constants::*;
use crate::error::{Result, UtxoError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decode limits and the codec version used for newly built UTXOs.
///
/// Every field has a default, so a partial JSON document such as
/// `{"max_addresses": 16}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub codec_id: u16,
    pub max_addresses: u32,
    pub max_payload_len: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            codec_id: DEFAULT_CODEC_ID,
            max_addresses: DEFAULT_MAX_ADDRESSES,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl CodecConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CodecConfig = serde_json::from_str(json)
            .map_err(|e| UtxoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading codec config {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("parsing codec config {}", path.display()))?;
        log::debug!("loaded codec config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_addresses == 0 {
            return Err(UtxoError::Config("max_addresses must be non-zero".to_string()));
        }
        if self.max_payload_len == 0 {
            return Err(UtxoError::Config("max_payload_len must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Reject an owner list longer than `max_addresses`
    pub fn check_address_count(&self, count: usize) -> Result<()> {
        if count > self.max_addresses as usize {
            return Err(UtxoError::Decoding(format!(
                "address count {} exceeds limit {}",
                count, self.max_addresses
            )));
        }
        Ok(())
    }

    /// Reject an NFT payload longer than `max_payload_len`
    pub fn check_payload_len(&self, len: usize) -> Result<()> {
        if len > self.max_payload_len as usize {
            return Err(UtxoError::Decoding(format!(
                "payload length {} exceeds limit {}",
                len, self.max_payload_len
            )));
        }
        Ok(())
    }
}
