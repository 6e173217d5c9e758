/*++

Licensed under the Apache-2.0 license.

File Name:

    pk.rs

Abstract:

    File contains the public key (with assets) command token layout.

--*/

use crate::asset::AssetId;
use crate::dma::DmaDescriptor;
use crate::opcode::{Opcode, Subcode};
use crate::token::CommandToken;

const MASK_12_BITS: u32 = 0xFFF;
const ADDITIONAL_WORD: usize = 12;
const SAVE_SHARED_SECRET: u32 = 1 << 31;

/// Operation performed by a public key token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PkMethod(pub u8);

impl PkMethod {
    pub const ECDH_ECDSA_KEY_CHECK: Self = Self(0x01);
    pub const DH_DSA_KEY_CHECK: Self = Self(0x02);
    pub const ECDSA_SIGN: Self = Self(0x06);
    pub const ECDSA_VERIFY: Self = Self(0x07);
    pub const RSA_PKCS_SIGN: Self = Self(0x08);
    pub const RSA_PKCS_VERIFY: Self = Self(0x09);
    pub const RSA_PSS_SIGN: Self = Self(0x0C);
    pub const RSA_PSS_VERIFY: Self = Self(0x0D);
    pub const DH_GEN_PUB_KEY: Self = Self(0x10);
    pub const DH_GEN_PRIV_PUB_KEY: Self = Self(0x11);
    pub const DH_GEN_SINGLE_SHARED_SECRET: Self = Self(0x12);
    pub const DH_GEN_DUAL_SHARED_SECRET: Self = Self(0x13);
    pub const ECDH_ECDSA_GEN_PUB_KEY: Self = Self(0x14);
    pub const ECDH_ECDSA_GEN_PRIV_PUB_KEY: Self = Self(0x15);
    pub const ECDH_GEN_SINGLE_SHARED_SECRET: Self = Self(0x16);
    pub const ECDH_GEN_DUAL_SHARED_SECRET: Self = Self(0x17);
    pub const RSA_OAEP_WRAP_STRING: Self = Self(0x18);
    pub const RSA_OAEP_WRAP_HASHED: Self = Self(0x19);
    pub const RSA_OAEP_UNWRAP_STRING: Self = Self(0x1A);
    pub const RSA_OAEP_UNWRAP_HASHED: Self = Self(0x1B);
    pub const RSA_PKCS1V15_UNWRAP: Self = Self(0x21);
    pub const RSA_PKCS1V15_WRAP: Self = Self(0x22);
    pub const CURVE25519_GEN_PUB_KEY: Self = Self(0x28);
    pub const CURVE25519_GEN_KEY_PAIR: Self = Self(0x29);
    pub const CURVE25519_GEN_SHARED_SECRET: Self = Self(0x2A);
    pub const EDDSA_GEN_PUB_KEY: Self = Self(0x2B);
    pub const EDDSA_GEN_KEY_PAIR: Self = Self(0x2C);
    pub const EDDSA_SIGN_INITIAL: Self = Self(0x2D);
    pub const EDDSA_SIGN_UPDATE: Self = Self(0x2E);
    pub const EDDSA_SIGN_FINAL: Self = Self(0x2F);
    pub const EDDSA_VERIFY_INITIAL: Self = Self(0x30);
    pub const EDDSA_VERIFY_FINAL: Self = Self(0x31);
    pub const SM2DSA_SIGN: Self = Self(0x32);
    pub const SM2DSA_VERIFY: Self = Self(0x33);
    pub const SM2ENC_WRAP: Self = Self(0x34);
    pub const SM2ENC_UNWRAP: Self = Self(0x35);
    pub const SM2KEX_GEN_SHARED_SECRET: Self = Self(0x36);
    pub const ECIES_WRAP: Self = Self(0x38);
    pub const ECIES_UNWRAP: Self = Self(0x39);
}

/// Public key operation on engine-resident assets.
///
/// `additional` is the raw additional-input area starting at word 12; each
/// item pushed into it starts on a word boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkAssetCommand {
    pub method: PkMethod,
    /// Size of the modulus or curve in words.
    pub n_words: u8,
    /// Size of the exponent or order in words.
    pub m_words: u8,
    pub other_len: u8,
    pub key_asset: AssetId,
    pub param_asset: AssetId,
    pub io_asset: AssetId,
    pub input: DmaDescriptor,
    pub output: DmaDescriptor,
    pub additional: Vec<u8>,
    pub save_shared_secret: bool,
}

impl PkAssetCommand {
    /// Room left in the token for additional input.
    pub const MAX_ADDITIONAL: usize = (crate::token::TOKEN_WORDS - ADDITIONAL_WORD) * 4;

    pub fn new(method: PkMethod) -> Self {
        Self {
            method,
            n_words: 0,
            m_words: 0,
            other_len: 0,
            key_asset: AssetId(0),
            param_asset: AssetId(0),
            io_asset: AssetId(0),
            input: DmaDescriptor::NONE,
            output: DmaDescriptor::NONE,
            additional: Vec::new(),
            save_shared_secret: false,
        }
    }

    fn align_additional(&mut self) {
        let aligned = self.additional.len().next_multiple_of(4);
        self.additional.resize(aligned, 0);
    }

    /// Appends a salt or label.
    pub fn push_additional_data(&mut self, data: &[u8]) {
        self.align_additional();
        self.additional.extend_from_slice(data);
        debug_assert!(self.additional.len() <= Self::MAX_ADDITIONAL);
    }

    /// Appends the id of an extra asset, e.g. the shared secret destination.
    pub fn push_additional_asset(&mut self, asset_id: AssetId) {
        self.align_additional();
        self.additional.extend_from_slice(&asset_id.0.to_le_bytes());
        debug_assert!(self.additional.len() <= Self::MAX_ADDITIONAL);
    }

    /// Reads word `index` of the additional area as an asset id.
    pub fn additional_asset(&self, index: usize) -> Option<AssetId> {
        let bytes = self.additional.get(index * 4..index * 4 + 4)?;
        let mut le = [0u8; 4];
        le.copy_from_slice(bytes);
        Some(AssetId(u32::from_le_bytes(le)))
    }

    pub fn encode(&self) -> CommandToken {
        let mut token = CommandToken::new(Opcode::PUBLIC_KEY, Subcode::PK_WITH_ASSETS);
        token.set_word(
            2,
            u32::from(self.method.0)
                | u32::from(self.n_words) << 16
                | u32::from(self.m_words) << 24,
        );
        let mut w3 = u32::from(self.other_len) << 8 | (self.additional.len() as u32 & 0xFF);
        if self.save_shared_secret {
            w3 |= SAVE_SHARED_SECRET;
        }
        token.set_word(3, w3);
        token.set_word(4, self.key_asset.0);
        token.set_word(5, self.param_asset.0);
        token.set_word(6, self.io_asset.0);
        token.set_word(
            7,
            (self.output.length & MASK_12_BITS) << 16 | (self.input.length & MASK_12_BITS),
        );
        token.set_dma_address(8, self.input.address);
        token.set_dma_address(10, self.output.address);
        token.write_byte_array(ADDITIONAL_WORD, &self.additional);
        token
    }

    pub fn decode(token: &CommandToken) -> Self {
        let w2 = token.word(2);
        let w3 = token.word(3);
        let w7 = token.word(7);
        let additional_len = (w3 & 0xFF) as usize;
        let mut additional = vec![0; additional_len];
        token.read_byte_array(ADDITIONAL_WORD, additional_len, &mut additional);
        Self {
            method: PkMethod(w2 as u8),
            n_words: (w2 >> 16) as u8,
            m_words: (w2 >> 24) as u8,
            other_len: (w3 >> 8) as u8,
            key_asset: AssetId(token.word(4)),
            param_asset: AssetId(token.word(5)),
            io_asset: AssetId(token.word(6)),
            input: DmaDescriptor {
                address: token.dma_address(8),
                length: w7 & MASK_12_BITS,
            },
            output: DmaDescriptor {
                address: token.dma_address(10),
                length: (w7 >> 16) & MASK_12_BITS,
            },
            additional,
            save_shared_secret: w3 & SAVE_SHARED_SECRET != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdh_layout() {
        let mut cmd = PkAssetCommand::new(PkMethod::ECDH_GEN_SINGLE_SHARED_SECRET);
        cmd.n_words = 8;
        cmd.m_words = 8;
        cmd.key_asset = AssetId(0x11);
        cmd.param_asset = AssetId(0x22);
        cmd.io_asset = AssetId(0x33);
        cmd.push_additional_asset(AssetId(0x44));
        cmd.save_shared_secret = true;
        let token = cmd.encode();
        assert_eq!(token.word(0), 0x1900_0000);
        assert_eq!(token.word(2), 0x0808_0016);
        assert_eq!(token.word(3), 0x8000_0004);
        assert_eq!(token.word(4), 0x11);
        assert_eq!(token.word(5), 0x22);
        assert_eq!(token.word(6), 0x33);
        assert_eq!(token.word(7), 0);
        assert_eq!(token.word(12), 0x44);
        let decoded = PkAssetCommand::decode(&token);
        assert_eq!(decoded.additional_asset(0), Some(AssetId(0x44)));
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_additional_items_are_word_aligned() {
        let mut cmd = PkAssetCommand::new(PkMethod::RSA_OAEP_WRAP_STRING);
        cmd.push_additional_data(&[1, 2, 3, 4, 5]);
        cmd.push_additional_asset(AssetId(0xA0B0_C0D0));
        assert_eq!(cmd.additional.len(), 12);
        let token = cmd.encode();
        assert_eq!(token.word(3) & 0xFF, 12);
        assert_eq!(token.word(12), 0x0403_0201);
        assert_eq!(token.word(13), 0x0000_0005);
        assert_eq!(token.word(14), 0xA0B0_C0D0);
        assert_eq!(PkAssetCommand::decode(&token).additional_asset(2), Some(AssetId(0xA0B0_C0D0)));
    }

    #[test]
    fn test_rsa_wrap_layout() {
        let mut cmd = PkAssetCommand::new(PkMethod::RSA_PKCS1V15_WRAP);
        cmd.n_words = 64;
        cmd.m_words = 64;
        cmd.output = DmaDescriptor {
            address: 0x0000_0010_0000_1000,
            length: 256,
        };
        let token = cmd.encode();
        assert_eq!(token.word(2), 0x4040_0022);
        assert_eq!(token.word(7), 256 << 16);
        assert_eq!(token.word(10), 0x1000);
        assert_eq!(token.word(11), 0x10);
        assert_eq!(PkAssetCommand::MAX_ADDITIONAL, 208);
    }
}
