//! Wire-format constants

/// Default codec version stamped on newly built UTXOs
pub const DEFAULT_CODEC_ID: u16 = 0;

/// Width of the codec version field
pub const CODEC_ID_LENGTH: usize = 2;

/// Width of a transaction identifier
pub const TX_ID_LENGTH: usize = 32;

/// Width of the output index field
pub const OUTPUT_INDEX_LENGTH: usize = 4;

/// Width of an asset identifier
pub const ASSET_ID_LENGTH: usize = 32;

/// Width of an owner address
pub const ADDRESS_LENGTH: usize = 20;

/// Width of the output type discriminant
pub const OUTPUT_TYPE_ID_LENGTH: usize = 4;

/// Width of the trailing cb58 checksum
pub const CHECKSUM_LENGTH: usize = 4;

/// Fixed-width prefix of every serialized UTXO, before the output
pub const UTXO_HEADER_LENGTH: usize =
    CODEC_ID_LENGTH + TX_ID_LENGTH + OUTPUT_INDEX_LENGTH + ASSET_ID_LENGTH;

/// Output type: mint authority over a fungible asset
pub const MINT_OUTPUT_ID: u32 = 6;

/// Output type: transferable amount of a fungible asset
pub const TRANSFER_OUTPUT_ID: u32 = 7;

/// Output type: mint authority over an NFT group
pub const NFT_MINT_OUTPUT_ID: u32 = 10;

/// Output type: transferable NFT with an opaque payload
pub const NFT_TRANSFER_OUTPUT_ID: u32 = 11;

/// Default decode guard on owner address counts
pub const DEFAULT_MAX_ADDRESSES: u32 = 256;

/// Default decode guard on NFT payload length
pub const DEFAULT_MAX_PAYLOAD_LEN: u32 = 1024;
