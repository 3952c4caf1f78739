//! Output payloads carried by a UTXO
//!
//! Every serialized output starts with a 4-byte type ID; decoding reads
//! that discriminant and dispatches to the matching variant parser. All
//! variants share an [`OutputOwners`] predicate that decides who may spend
//! the output and from when.

use crate::bintools::{compare_buffers, ByteReader, Encoding};
use crate::config::CodecConfig;
use crate::constants::*;
use crate::error::{Result, UtxoError};
use crate::types::*;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// OutputOwners: locktime × threshold × 𝔸*
///
/// Wire: `locktime(8) | threshold(4) | count(4) | count × address(20)`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputOwners {
    pub locktime: Timestamp,
    pub threshold: u32,
    pub addresses: Vec<Address>,
}

impl OutputOwners {
    /// Addresses are kept as an ordered set: sorted and de-duplicated
    pub fn new(addresses: Vec<Address>, locktime: Timestamp, threshold: u32) -> Self {
        let mut addresses = addresses;
        addresses.sort_by(|a, b| compare_buffers(a, b));
        addresses.dedup();
        Self { locktime, threshold, addresses }
    }

    pub fn write_to(&self, out: &mut ByteString) -> Result<()> {
        let count = u32::try_from(self.addresses.len()).map_err(|_| {
            UtxoError::Encoding(format!("too many addresses: {}", self.addresses.len()))
        })?;
        out.extend_from_slice(&self.locktime.to_be_bytes());
        out.extend_from_slice(&self.threshold.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        for address in &self.addresses {
            out.extend_from_slice(address);
        }
        Ok(())
    }

    pub fn from_reader(reader: &mut ByteReader<'_>, config: &CodecConfig) -> Result<Self> {
        let locktime = reader.read_u64("locktime")?;
        let threshold = reader.read_u32("threshold")?;
        let count = reader.read_u32("address count")? as usize;
        config.check_address_count(count)?;
        let available = reader.remaining() / ADDRESS_LENGTH;
        if count > available {
            return Err(UtxoError::Decoding(format!(
                "address count {} at offset {} but only {} addresses remain",
                count,
                reader.offset(),
                available
            )));
        }
        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            addresses.push(reader.read_array::<ADDRESS_LENGTH>("address")?);
        }
        Ok(Self { locktime, threshold, addresses })
    }

    pub fn is_owned_by_any(&self, addresses: &[Address]) -> bool {
        self.addresses.iter().any(|owner| addresses.contains(owner))
    }

    /// Owners among `addresses` able to sign at `as_of`, at most `threshold`
    /// of them. Empty while the output is still locked.
    pub fn get_spenders(&self, addresses: &[Address], as_of: Timestamp) -> Vec<Address> {
        let mut spenders = Vec::new();
        if self.locktime > as_of {
            return spenders;
        }
        for address in addresses {
            if spenders.len() >= self.threshold as usize {
                break;
            }
            if self.addresses.contains(address) && !spenders.contains(address) {
                spenders.push(*address);
            }
        }
        spenders
    }

    pub fn meets_threshold(&self, addresses: &[Address], as_of: Timestamp) -> bool {
        self.locktime <= as_of
            && self.get_spenders(addresses, as_of).len() >= self.threshold as usize
    }
}

/// Amount output: a transferable quantity of a fungible asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutput {
    pub amount: BigUint,
    pub owners: OutputOwners,
}

/// Mint authority over a fungible asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutput {
    pub owners: OutputOwners,
}

/// Mint authority over one NFT group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftMintOutput {
    pub group_id: u32,
    pub owners: OutputOwners,
}

/// Transferable NFT with an opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftTransferOutput {
    pub group_id: u32,
    pub payload: ByteString,
    pub owners: OutputOwners,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Transfer(TransferOutput),
    Mint(MintOutput),
    NftMint(NftMintOutput),
    NftTransfer(NftTransferOutput),
}

impl Output {
    pub fn transfer(amount: impl Into<BigUint>, owners: OutputOwners) -> Self {
        Output::Transfer(TransferOutput { amount: amount.into(), owners })
    }

    pub fn type_id(&self) -> u32 {
        match self {
            Output::Transfer(_) => TRANSFER_OUTPUT_ID,
            Output::Mint(_) => MINT_OUTPUT_ID,
            Output::NftMint(_) => NFT_MINT_OUTPUT_ID,
            Output::NftTransfer(_) => NFT_TRANSFER_OUTPUT_ID,
        }
    }

    pub fn owners(&self) -> &OutputOwners {
        match self {
            Output::Transfer(o) => &o.owners,
            Output::Mint(o) => &o.owners,
            Output::NftMint(o) => &o.owners,
            Output::NftTransfer(o) => &o.owners,
        }
    }

    pub fn addresses(&self) -> &[Address] {
        &self.owners().addresses
    }

    pub fn locktime(&self) -> Timestamp {
        self.owners().locktime
    }

    /// Only the amount variant carries a value
    pub fn amount(&self) -> Option<&BigUint> {
        match self {
            Output::Transfer(o) => Some(&o.amount),
            _ => None,
        }
    }

    /// Serialize as `type_id(4) | payload`
    pub fn to_bytes(&self) -> Result<ByteString> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.type_id().to_be_bytes());
        match self {
            Output::Transfer(o) => {
                let amount = u64::try_from(&o.amount).map_err(|_| {
                    UtxoError::Encoding(format!("amount {} does not fit in 64 bits", o.amount))
                })?;
                out.extend_from_slice(&amount.to_be_bytes());
            }
            Output::Mint(_) => {}
            Output::NftMint(o) => {
                out.extend_from_slice(&o.group_id.to_be_bytes());
            }
            Output::NftTransfer(o) => {
                let len = u32::try_from(o.payload.len()).map_err(|_| {
                    UtxoError::Encoding(format!("payload too large: {} bytes", o.payload.len()))
                })?;
                out.extend_from_slice(&o.group_id.to_be_bytes());
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(&o.payload);
            }
        }
        self.owners().write_to(&mut out)?;
        Ok(out)
    }

    /// Read the type ID and dispatch to the variant parser
    pub fn from_reader(reader: &mut ByteReader<'_>, config: &CodecConfig) -> Result<Self> {
        let type_id = reader.read_u32("output type id")?;
        match type_id {
            TRANSFER_OUTPUT_ID => {
                let amount = reader.read_u64("amount")?;
                let owners = OutputOwners::from_reader(reader, config)?;
                Ok(Output::Transfer(TransferOutput { amount: BigUint::from(amount), owners }))
            }
            MINT_OUTPUT_ID => {
                let owners = OutputOwners::from_reader(reader, config)?;
                Ok(Output::Mint(MintOutput { owners }))
            }
            NFT_MINT_OUTPUT_ID => {
                let group_id = reader.read_u32("group id")?;
                let owners = OutputOwners::from_reader(reader, config)?;
                Ok(Output::NftMint(NftMintOutput { group_id, owners }))
            }
            NFT_TRANSFER_OUTPUT_ID => {
                let group_id = reader.read_u32("group id")?;
                let len = reader.read_u32("payload length")? as usize;
                config.check_payload_len(len)?;
                let payload = reader.read_bytes(len, "payload")?.to_vec();
                let owners = OutputOwners::from_reader(reader, config)?;
                Ok(Output::NftTransfer(NftTransferOutput { group_id, payload, owners }))
            }
            unknown => {
                log::warn!("unknown output type id {} at offset {}", unknown, reader.offset());
                Err(UtxoError::Decoding(format!("unknown output type id: {}", unknown)))
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let output = Self::from_reader(&mut reader, &CodecConfig::default())?;
        if !reader.is_empty() {
            return Err(UtxoError::Decoding(format!(
                "{} trailing bytes after output",
                reader.remaining()
            )));
        }
        Ok(output)
    }

    pub fn to_fields(&self, encoding: Encoding) -> OutputFields {
        let owners = self.owners();
        let (group_id, payload) = match self {
            Output::NftMint(o) => (Some(o.group_id), None),
            Output::NftTransfer(o) => (Some(o.group_id), Some(encoding.encode(&o.payload))),
            _ => (None, None),
        };
        OutputFields {
            type_id: self.type_id(),
            amount: self.amount().map(|a| a.to_string()),
            group_id,
            payload,
            locktime: owners.locktime,
            threshold: owners.threshold,
            addresses: owners.addresses.iter().map(|a| encoding.encode(a)).collect(),
        }
    }

    /// Rebuild an output from its rendered fields, applying the same decode
    /// limits as the wire path
    pub fn from_fields(fields: &OutputFields, encoding: Encoding, config: &CodecConfig) -> Result<Self> {
        config.check_address_count(fields.addresses.len())?;
        let addresses = fields
            .addresses
            .iter()
            .map(|a| encoding.decode_array::<ADDRESS_LENGTH>(a, "address"))
            .collect::<Result<Vec<_>>>()?;
        // Keep document order so the bytes round-trip exactly
        let owners = OutputOwners {
            locktime: fields.locktime,
            threshold: fields.threshold,
            addresses,
        };
        let group_id = || {
            fields
                .group_id
                .ok_or_else(|| UtxoError::Decoding("missing group_id".to_string()))
        };

        match fields.type_id {
            TRANSFER_OUTPUT_ID => {
                let raw = fields
                    .amount
                    .as_deref()
                    .ok_or_else(|| UtxoError::Decoding("missing amount".to_string()))?;
                let amount = raw
                    .parse::<BigUint>()
                    .map_err(|e| UtxoError::Decoding(format!("invalid amount {:?}: {}", raw, e)))?;
                Ok(Output::Transfer(TransferOutput { amount, owners }))
            }
            MINT_OUTPUT_ID => Ok(Output::Mint(MintOutput { owners })),
            NFT_MINT_OUTPUT_ID => Ok(Output::NftMint(NftMintOutput { group_id: group_id()?, owners })),
            NFT_TRANSFER_OUTPUT_ID => {
                let payload = match fields.payload.as_deref() {
                    Some(p) => encoding.decode(p)?,
                    None => Vec::new(),
                };
                config.check_payload_len(payload.len())?;
                Ok(Output::NftTransfer(NftTransferOutput { group_id: group_id()?, payload, owners }))
            }
            unknown => Err(UtxoError::Decoding(format!("unknown output type id: {}", unknown))),
        }
    }
}

/// Display-neutral rendering of an [`Output`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFields {
    pub type_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    pub locktime: Timestamp,
    pub threshold: u32,
    pub addresses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners() -> OutputOwners {
        OutputOwners::new(vec![[3u8; 20], [1u8; 20], [2u8; 20], [1u8; 20]], 0, 1)
    }

    #[test]
    fn test_owners_sorted_and_deduplicated() {
        let o = owners();
        assert_eq!(o.addresses, vec![[1u8; 20], [2u8; 20], [3u8; 20]]);
    }

    #[test]
    fn test_transfer_output_layout() {
        let output = Output::transfer(12345u64, OutputOwners::new(vec![[9u8; 20]], 54321, 1));
        let bytes = output.to_bytes().unwrap();
        // type(4) + amount(8) + locktime(8) + threshold(4) + count(4) + 1 address
        assert_eq!(bytes.len(), 4 + 8 + 8 + 4 + 4 + 20);
        assert_eq!(&bytes[0..4], &TRANSFER_OUTPUT_ID.to_be_bytes());
        assert_eq!(&bytes[4..12], &12345u64.to_be_bytes());
        assert_eq!(&bytes[12..20], &54321u64.to_be_bytes());
        assert_eq!(Output::from_bytes(&bytes).unwrap(), output);
    }

    #[test]
    fn test_amount_overflow_fails_encoding() {
        let huge = BigUint::from(u64::MAX) + BigUint::from(1u32);
        let output = Output::transfer(huge, owners());
        assert!(matches!(output.to_bytes(), Err(UtxoError::Encoding(_))));
    }

    #[test]
    fn test_unknown_type_id() {
        let mut bytes = 99u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(matches!(Output::from_bytes(&bytes), Err(UtxoError::Decoding(_))));
    }

    #[test]
    fn test_nft_transfer_decodes() {
        let output = Output::NftTransfer(NftTransferOutput {
            group_id: 4,
            payload: b"artwork".to_vec(),
            owners: owners(),
        });
        let bytes = output.to_bytes().unwrap();
        let decoded = Output::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, output);
        assert_eq!(decoded.amount(), None);
        assert_eq!(decoded.type_id(), NFT_TRANSFER_OUTPUT_ID);
    }

    #[test]
    fn test_payload_limit_enforced() {
        let output = Output::NftTransfer(NftTransferOutput {
            group_id: 0,
            payload: vec![0u8; 64],
            owners: owners(),
        });
        let bytes = output.to_bytes().unwrap();
        let config = CodecConfig { max_payload_len: 32, ..CodecConfig::default() };
        let mut reader = ByteReader::new(&bytes);
        assert!(Output::from_reader(&mut reader, &config).is_err());
    }

    #[test]
    fn test_address_limit_enforced() {
        let addresses: Vec<Address> = (0u8..5).map(|i| [i; 20]).collect();
        let output = Output::Mint(MintOutput { owners: OutputOwners::new(addresses, 0, 1) });
        let bytes = output.to_bytes().unwrap();
        let config = CodecConfig { max_addresses: 4, ..CodecConfig::default() };
        let mut reader = ByteReader::new(&bytes);
        assert!(Output::from_reader(&mut reader, &config).is_err());
    }

    #[test]
    fn test_truncated_owners() {
        let bytes = Output::transfer(1u64, owners()).to_bytes().unwrap();
        let err = Output::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, UtxoError::Decoding(_)));
    }

    #[test]
    fn test_spenders_respect_locktime_and_threshold() {
        let o = OutputOwners::new(vec![[1u8; 20], [2u8; 20], [3u8; 20]], 100, 2);
        let all = [[1u8; 20], [2u8; 20], [3u8; 20]];
        assert!(o.get_spenders(&all, 99).is_empty());
        assert_eq!(o.get_spenders(&all, 100).len(), 2);
        assert!(o.meets_threshold(&all, 100));
        assert!(!o.meets_threshold(&[[1u8; 20]], 100));
        assert!(!o.meets_threshold(&all, 50));
        assert!(o.is_owned_by_any(&[[7u8; 20], [3u8; 20]]));
        assert!(!o.is_owned_by_any(&[[7u8; 20]]));
    }

    #[test]
    fn test_fields_preserve_variant() {
        let output = Output::NftMint(NftMintOutput { group_id: 7, owners: owners() });
        for encoding in [Encoding::Hex, Encoding::Display] {
            let fields = output.to_fields(encoding);
            assert_eq!(fields.group_id, Some(7));
            let decoded = Output::from_fields(&fields, encoding, &CodecConfig::default()).unwrap();
            assert_eq!(decoded, output);
        }
    }

    #[test]
    fn test_fields_missing_amount() {
        let mut fields = Output::transfer(5u64, owners()).to_fields(Encoding::Hex);
        fields.amount = None;
        assert!(Output::from_fields(&fields, Encoding::Hex, &CodecConfig::default()).is_err());
    }

    #[test]
    fn test_oversized_address_count_is_decoding_error() {
        // Permissive limit; the count claims far more addresses than the buffer holds
        let config = CodecConfig { max_addresses: u32::MAX, ..CodecConfig::default() };
        let mut bytes = TRANSFER_OUTPUT_ID.to_be_bytes().to_vec();
        bytes.extend_from_slice(&1u64.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        bytes.extend_from_slice(&[0xab; 20]);
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            Output::from_reader(&mut reader, &config),
            Err(UtxoError::Decoding(_))
        ));
    }

    #[test]
    fn test_fields_respect_limits() {
        let addresses: Vec<Address> = (0u8..5).map(|i| [i; 20]).collect();
        let fields = Output::Mint(MintOutput { owners: OutputOwners::new(addresses, 0, 1) })
            .to_fields(Encoding::Hex);
        let strict = CodecConfig { max_addresses: 4, ..CodecConfig::default() };
        assert!(matches!(
            Output::from_fields(&fields, Encoding::Hex, &strict),
            Err(UtxoError::Decoding(_))
        ));

        let fields = Output::NftTransfer(NftTransferOutput {
            group_id: 1,
            payload: vec![7u8; 64],
            owners: owners(),
        })
        .to_fields(Encoding::Display);
        let strict = CodecConfig { max_payload_len: 32, ..CodecConfig::default() };
        assert!(matches!(
            Output::from_fields(&fields, Encoding::Display, &strict),
            Err(UtxoError::Decoding(_))
        ));
    }
}
