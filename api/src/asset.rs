/*++

Licensed under the Apache-2.0 license.

File Name:

    asset.rs

Abstract:

    File contains the asset management command and result token layouts.

--*/

use crate::dma::DmaDescriptor;
use crate::opcode::{Opcode, Subcode};
use crate::policy::AssetPolicy;
use crate::token::{CommandToken, ResultToken, DMA_MAX_LENGTH};

const MASK_10_BITS: u32 = 0x3FF;

/// Largest asset the engine can hold, in bytes.
pub const ASSET_MAX_SIZE: u32 = MASK_10_BITS;

/// Engine-side handle of a stored asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u32);

/// Look up a statically provisioned asset by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSearch {
    pub number: u8,
}

impl AssetSearch {
    pub fn encode(&self) -> CommandToken {
        let mut token = CommandToken::new(Opcode::ASSET_MANAGEMENT, Subcode::ASSET_SEARCH);
        token.set_word(4, u32::from(self.number) << 16);
        token
    }

    pub fn decode(token: &CommandToken) -> Self {
        Self {
            number: (token.word(4) >> 16) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSearchResult {
    pub asset_id: AssetId,
    pub length: u32,
}

impl AssetSearchResult {
    pub fn encode(&self, result: &mut ResultToken) {
        result.set_word(1, self.asset_id.0);
        result.set_word(2, self.length & MASK_10_BITS);
    }

    pub fn decode(result: &ResultToken) -> Self {
        Self {
            asset_id: AssetId(result.word(1)),
            length: result.word(2) & MASK_10_BITS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetCreate {
    pub policy: AssetPolicy,
    pub size: u32,
}

impl AssetCreate {
    pub fn encode(&self) -> CommandToken {
        let mut token = CommandToken::new(Opcode::ASSET_MANAGEMENT, Subcode::ASSET_CREATE);
        token.set_word(2, self.policy.low_word());
        token.set_word(3, self.policy.high_word());
        token.set_word(4, self.size & MASK_10_BITS);
        token
    }

    pub fn decode(token: &CommandToken) -> Self {
        Self {
            policy: AssetPolicy::from_bits(
                u64::from(token.word(2)) | (u64::from(token.word(3)) << 32),
            ),
            size: token.word(4) & MASK_10_BITS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetCreateResult {
    pub asset_id: AssetId,
}

impl AssetCreateResult {
    pub fn encode(&self, result: &mut ResultToken) {
        result.set_word(1, self.asset_id.0);
    }

    pub fn decode(result: &ResultToken) -> Self {
        Self {
            asset_id: AssetId(result.word(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDelete {
    pub asset_id: AssetId,
}

impl AssetDelete {
    pub fn encode(&self) -> CommandToken {
        let mut token = CommandToken::new(Opcode::ASSET_MANAGEMENT, Subcode::ASSET_DELETE);
        token.set_word(2, self.asset_id.0);
        token
    }

    pub fn decode(token: &CommandToken) -> Self {
        Self {
            asset_id: AssetId(token.word(2)),
        }
    }
}

/// How the engine fills the asset named in an asset load token (word 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Derive,
    Random,
    Import,
    Plaintext,
    Unwrap,
}

impl LoadMode {
    const fn bit(self) -> u32 {
        match self {
            LoadMode::Derive => 1 << 24,
            LoadMode::Random => 1 << 25,
            LoadMode::Import => 1 << 26,
            LoadMode::Plaintext => 1 << 27,
            LoadMode::Unwrap => 1 << 28,
        }
    }

    fn from_word(word: u32) -> Option<Self> {
        [
            LoadMode::Derive,
            LoadMode::Random,
            LoadMode::Import,
            LoadMode::Plaintext,
            LoadMode::Unwrap,
        ]
        .into_iter()
        .find(|mode| word & mode.bit() != 0)
    }
}

/// Asset load. Associated data is packed into the token from word 10.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoad {
    pub asset_id: AssetId,
    pub mode: LoadMode,
    pub input: DmaDescriptor,
    pub output: DmaDescriptor,
    pub aad: Vec<u8>,
}

impl AssetLoad {
    const AAD_WORD: usize = 10;

    /// Most associated data that fits in one token.
    pub const MAX_AAD: usize = (crate::token::TOKEN_WORDS - Self::AAD_WORD) * 4;

    pub fn plaintext(asset_id: AssetId, input: DmaDescriptor) -> Self {
        Self {
            asset_id,
            mode: LoadMode::Plaintext,
            input,
            output: DmaDescriptor::NONE,
            aad: Vec::new(),
        }
    }

    pub fn encode(&self) -> CommandToken {
        debug_assert!(self.aad.len() <= Self::MAX_AAD);
        let mut token = CommandToken::new(Opcode::ASSET_MANAGEMENT, Subcode::ASSET_LOAD);
        token.set_word(2, self.asset_id.0);
        token.set_word(3, self.mode.bit());
        token.or_word(3, self.input.length & MASK_10_BITS);
        token.set_dma_address(4, self.input.address);
        token.set_dma_address(6, self.output.address);
        token.set_word(8, self.output.length & MASK_10_BITS);
        if !self.aad.is_empty() {
            token.or_word(3, (self.aad.len() as u32) << 16);
            token.write_byte_array(Self::AAD_WORD, &self.aad);
        }
        token
    }

    /// Returns `None` when no load mode bit is set.
    pub fn decode(token: &CommandToken) -> Option<Self> {
        let w3 = token.word(3);
        let aad_len = ((w3 >> 16) & 0xFF) as usize;
        let mut aad = vec![0; aad_len];
        token.read_byte_array(Self::AAD_WORD, aad_len, &mut aad);
        Some(Self {
            asset_id: AssetId(token.word(2)),
            mode: LoadMode::from_word(w3)?,
            input: DmaDescriptor {
                address: token.dma_address(4),
                length: w3 & MASK_10_BITS,
            },
            output: DmaDescriptor {
                address: token.dma_address(6),
                length: token.word(8) & MASK_10_BITS,
            },
            aad,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetLoadResult {
    pub output_size: u32,
}

impl AssetLoadResult {
    pub fn encode(&self, result: &mut ResultToken) {
        result.set_word(1, self.output_size & MASK_10_BITS);
    }

    pub fn decode(result: &ResultToken) -> Self {
        Self {
            output_size: result.word(1) & MASK_10_BITS,
        }
    }
}

/// Copies the content of a public data asset to `output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicDataRead {
    pub asset_id: AssetId,
    pub output: DmaDescriptor,
}

impl PublicDataRead {
    pub fn encode(&self) -> CommandToken {
        let mut token = CommandToken::new(Opcode::ASSET_MANAGEMENT, Subcode::PUBLIC_DATA);
        token.set_word(2, self.asset_id.0);
        token.set_word(3, self.output.length & DMA_MAX_LENGTH);
        token.set_dma_address(4, self.output.address);
        token
    }

    pub fn decode(token: &CommandToken) -> Self {
        Self {
            asset_id: AssetId(token.word(2)),
            output: DmaDescriptor {
                address: token.dma_address(4),
                length: token.word(3) & DMA_MAX_LENGTH,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicDataReadResult {
    pub length: u32,
}

impl PublicDataReadResult {
    pub fn encode(&self, result: &mut ResultToken) {
        result.set_word(1, self.length & MASK_10_BITS);
    }

    pub fn decode(result: &ResultToken) -> Self {
        Self {
            length: result.word(1) & MASK_10_BITS,
        }
    }
}
