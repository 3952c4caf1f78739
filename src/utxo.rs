//! The UTXO entity: wire encoding and identity
//!
//! Wire layout, all integers big-endian:
//!
//! ```text
//! offset  size  field
//! 0       2     codecID
//! 2       32    txID
//! 34      4     outputIndex
//! 38      32    assetID
//! 70      N     output (4-byte type id, then variant payload)
//! ```

use crate::bintools::{concat, decode_checked, encode_checked, ByteReader, Encoding};
use crate::config::CodecConfig;
use crate::constants::*;
use crate::error::{Result, UtxoError};
use crate::output::{Output, OutputFields};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// UTXOID = cb58(txID || outputIndex as 4 big-endian bytes)
pub fn utxo_id_for(tx_id: &TxId, output_index: u32) -> String {
    encode_checked(&concat(&[&tx_id[..], &output_index.to_be_bytes()[..]]))
}

/// A single unspent output.
///
/// `Utxo::default()` is the empty record: it has no txID, assetID or
/// output and refuses to serialize until those are set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utxo {
    codec_id: u16,
    tx_id: Option<TxId>,
    output_index: u32,
    asset_id: Option<AssetId>,
    output: Option<Output>,
}

impl Utxo {
    pub fn new(codec_id: u16, tx_id: TxId, output_index: u32, asset_id: AssetId, output: Output) -> Self {
        Self {
            codec_id,
            tx_id: Some(tx_id),
            output_index,
            asset_id: Some(asset_id),
            output: Some(output),
        }
    }

    pub fn codec_id(&self) -> u16 {
        self.codec_id
    }

    pub fn tx_id(&self) -> Option<&TxId> {
        self.tx_id.as_ref()
    }

    pub fn output_index(&self) -> u32 {
        self.output_index
    }

    pub fn asset_id(&self) -> Option<&AssetId> {
        self.asset_id.as_ref()
    }

    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.tx_id.is_some() && self.asset_id.is_some() && self.output.is_some()
    }

    pub fn utxo_id(&self) -> Result<String> {
        let tx_id = self
            .tx_id
            .as_ref()
            .ok_or_else(|| UtxoError::Encoding("UTXO has no txID".to_string()))?;
        Ok(utxo_id_for(tx_id, self.output_index))
    }

    pub fn to_bytes(&self) -> Result<ByteString> {
        let (tx_id, asset_id, output) = match (&self.tx_id, &self.asset_id, &self.output) {
            (Some(t), Some(a), Some(o)) => (t, a, o),
            _ => {
                return Err(UtxoError::Encoding(
                    "UTXO is missing txID, assetID or output".to_string(),
                ))
            }
        };
        let output_bytes = output.to_bytes()?;
        let mut out = Vec::with_capacity(UTXO_HEADER_LENGTH + output_bytes.len());
        out.extend_from_slice(&self.codec_id.to_be_bytes());
        out.extend_from_slice(tx_id);
        out.extend_from_slice(&self.output_index.to_be_bytes());
        out.extend_from_slice(asset_id);
        out.extend_from_slice(&output_bytes);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with(bytes, &CodecConfig::default())
    }

    /// Parse codecID → txID → outputIndex → assetID → output. The buffer
    /// must hold exactly one UTXO.
    pub fn from_bytes_with(bytes: &[u8], config: &CodecConfig) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let codec_id = reader.read_u16("codecID")?;
        let tx_id = reader.read_array::<TX_ID_LENGTH>("txID")?;
        let output_index = reader.read_u32("outputIndex")?;
        let asset_id = reader.read_array::<ASSET_ID_LENGTH>("assetID")?;
        let output = Output::from_reader(&mut reader, config)?;
        if !reader.is_empty() {
            return Err(UtxoError::Decoding(format!(
                "{} trailing bytes after UTXO",
                reader.remaining()
            )));
        }
        Ok(Self::new(codec_id, tx_id, output_index, asset_id, output))
    }

    pub fn to_cb58(&self) -> Result<String> {
        Ok(encode_checked(&self.to_bytes()?))
    }

    pub fn from_cb58(encoded: &str) -> Result<Self> {
        Self::from_cb58_with(encoded, &CodecConfig::default())
    }

    pub fn from_cb58_with(encoded: &str, config: &CodecConfig) -> Result<Self> {
        Self::from_bytes_with(&decode_checked(encoded)?, config)
    }

    pub fn to_fields(&self, encoding: Encoding) -> Result<UtxoFields> {
        let (tx_id, asset_id, output) = match (&self.tx_id, &self.asset_id, &self.output) {
            (Some(t), Some(a), Some(o)) => (t, a, o),
            _ => return Err(UtxoError::Encoding("cannot render an incomplete UTXO".to_string())),
        };
        Ok(UtxoFields {
            utxo_id: utxo_id_for(tx_id, self.output_index),
            codec_id: self.codec_id,
            tx_id: encoding.encode(tx_id),
            output_index: self.output_index,
            asset_id: encoding.encode(asset_id),
            output: output.to_fields(encoding),
        })
    }

    pub fn from_fields(fields: &UtxoFields, encoding: Encoding, config: &CodecConfig) -> Result<Self> {
        let tx_id = encoding.decode_array::<TX_ID_LENGTH>(&fields.tx_id, "txID")?;
        let asset_id = encoding.decode_array::<ASSET_ID_LENGTH>(&fields.asset_id, "assetID")?;
        let output = Output::from_fields(&fields.output, encoding, config)?;
        let utxo = Self::new(fields.codec_id, tx_id, fields.output_index, asset_id, output);
        let derived = utxo_id_for(&tx_id, fields.output_index);
        if derived != fields.utxo_id {
            return Err(UtxoError::Decoding(format!(
                "utxo_id {} does not match txID/outputIndex ({})",
                fields.utxo_id, derived
            )));
        }
        Ok(utxo)
    }
}

impl FromStr for Utxo {
    type Err = UtxoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_cb58(s)
    }
}

/// Display-neutral rendering of a [`Utxo`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoFields {
    pub utxo_id: String,
    pub codec_id: u16,
    pub tx_id: String,
    pub output_index: u32,
    pub asset_id: String,
    pub output: OutputFields,
}
