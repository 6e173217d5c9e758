/*++

Licensed under the Apache-2.0 license.

File Name:

    policy.rs

Abstract:

    File contains the 64-bit asset policy mask and the builders that compose
    it from generic flags, a category, and category-specific subtype fields.

--*/

use bitflags::bitflags;

bitflags! {
    /// Generic policy flags held in the low 16 bits of the mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PolicyFlags: u64 {
        const NON_MODIFIABLE = 0x0001;
        const TEMPORARY = 0x0002;
        const EXPORTABLE = 0x0004;
        const TRUST_EXPORT = 0x0008;
        const SOURCE_NON_SECURE = 0x0100;
        const CROSS_DOMAIN = 0x0200;
        const NO_DOMAIN = 0x0400;
        const PRIVATE_DATA = 0x0800;
        const FIPS_APPROVED = 0x1000;
    }
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Generic = 0x0000,
    Symmetric = 0x2000,
    Asymmetric = 0x4000,
    CoprocessorIfc = 0x6000,
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymUsage {
    Hash = 0x0000_0000,
    MacHash = 0x0001_0000,
    MacCipher = 0x0002_0000,
    CipherBulk = 0x0003_0000,
    CipherAuth = 0x0004_0000,
    Wrap = 0x0005_0000,
    Derive = 0x0006_0000,
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    NotUsed = 0x0000_0000,
    EncryptGenerate = 0x0010_0000,
    DecryptVerify = 0x0020_0000,
    Both = 0x0030_0000,
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymHash {
    Sha1 = 0x0040_0000,
    Sm3 = 0x0080_0000,
    Poly1305 = 0x00C0_0000,
    Sha224 = 0x0100_0000,
    Sha256 = 0x0140_0000,
    Sha384 = 0x0180_0000,
    Sha512 = 0x01C0_0000,
    Sha3_224 = 0x0200_0000,
    Sha3_256 = 0x0240_0000,
    Sha3_384 = 0x0280_0000,
    Sha3_512 = 0x02C0_0000,
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymCipher {
    Aes = 0x0000_0000,
    Tdes = 0x0040_0000,
    ChaCha20 = 0x0080_0000,
    Sm4 = 0x00C0_0000,
    Aria = 0x0100_0000,
}

/// Symmetric mode field. Values are reused between the bulk, AEAD and MAC
/// usages, so this is a newtype rather than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymMode(u64);

impl SymMode {
    pub const ECB: Self = Self(0x0000_0000);
    pub const CBC: Self = Self(0x0800_0000);
    pub const CTR16: Self = Self(0x1000_0000);
    pub const CTR32: Self = Self(0x1800_0000);
    pub const CTR64: Self = Self(0x2000_0000);
    pub const CTR128: Self = Self(0x2800_0000);
    pub const XTS: Self = Self(0x3000_0000);
    pub const F8: Self = Self(0x3800_0000);
    pub const CCM: Self = Self(0x0000_0000);
    pub const GCM: Self = Self(0x0800_0000);
    pub const CMAC: Self = Self(0x0000_0000);
    pub const CBC_MAC: Self = Self(0x0800_0000);
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsymUsage {
    SignVerify = 0x0000_0000,
    KeyExchange = 0x0001_0000,
    DecryptEncrypt = 0x0002_0000,
    SecureDebug = 0x0003_0000,
    SecureDebugGpio = 0x000B_0000,
    Parameters = 0x000F_0000,
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsymAlgorithm {
    Dh = 0x0000_0000,
    Dsa = 0x0010_0000,
    Ecdh = 0x0020_0000,
    Ecdsa = 0x0030_0000,
    Curve25519 = 0x0040_0000,
    EdDsa = 0x0050_0000,
    Sm2 = 0x0060_0000,
    RsaPkcs1v15 = 0x0080_0000,
    RsaPss = 0x0090_0000,
    RsaOaep = 0x00A0_0000,
    RsaKem = 0x00B0_0000,
}

#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsymHash {
    NotUsed = 0x0000_0000,
    Sha1 = 0x0800_0000,
    Sm3 = 0x1000_0000,
    Sha224 = 0x2000_0000,
    Sha256 = 0x2800_0000,
    Sha384 = 0x3000_0000,
    Sha512 = 0x3800_0000,
    Sha3_224 = 0x4000_0000,
    Sha3_256 = 0x4800_0000,
    Sha3_384 = 0x5000_0000,
    Sha3_512 = 0x5800_0000,
}

/// Subtype of a generic-category asset.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericData {
    /// Plain data object (public, private, or monotonic counter).
    Data = 0x0000_0000,
    Coid = 0x0001_0000,
    SecureTimer = 0x0002_0000,
    Huk = 0x0005_0000,
    PowerDown = 0x000E_0000,
    SpecialFunction = 0x000F_0000,
}

const CATEGORY_MASK: u64 = 0x6000;
const USAGE_MASK: u64 = 0x000F_0000;
const SYM_DIRECTION_MASK: u64 = 0x0030_0000;
const SYM_ALGORITHM_MASK: u64 = 0x03C0_0000;
const SYM_MODE_MASK: u64 = 0x3800_0000;
const ASYM_ALGORITHM_MASK: u64 = 0x00F0_0000;
const ASYM_HASH_MASK: u64 = 0x7800_0000;

/// Asset policy mask.
///
/// Builders replace the targeted field, so applying the same setter twice is
/// the same as applying it once. Subtype fields only mean something relative
/// to the category bits; the builders do not check that they agree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AssetPolicy(u64);

impl core::fmt::Debug for AssetPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AssetPolicy({:#018x})", self.0)
    }
}

impl AssetPolicy {
    /// Symmetric crypto, DPA countermeasures disabled.
    pub const SYM_NO_DPA: u64 = 1 << 63;
    /// Asymmetric crypto, DPA countermeasures disabled.
    pub const ASYM_NO_DPA: u64 = 1 << 25;
    /// Asymmetric key may be stored in any form.
    pub const ASYM_STORE_ANY: u64 = 1 << 26;

    pub const SYM_BASE: Self = Self::base(Category::Symmetric)
        .with_flags(PolicyFlags::NON_MODIFIABLE.union(PolicyFlags::PRIVATE_DATA));
    pub const ASYM_BASE: Self =
        Self::base(Category::Asymmetric).with_flags(PolicyFlags::NON_MODIFIABLE);
    pub const ASYM_SIGN_VERIFY: Self = Self::ASYM_BASE.with_asym_usage(AsymUsage::SignVerify);
    pub const ASYM_KEY_EXCHANGE: Self = Self::ASYM_BASE.with_asym_usage(AsymUsage::KeyExchange);
    pub const ASYM_DECRYPT_ENCRYPT: Self =
        Self::ASYM_BASE.with_asym_usage(AsymUsage::DecryptEncrypt);
    pub const ASYM_KEY_PARAMS: Self = Self::ASYM_BASE
        .with_flags(PolicyFlags::NO_DOMAIN)
        .with_asym_usage(AsymUsage::Parameters);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn low_word(self) -> u32 {
        self.0 as u32
    }

    pub const fn high_word(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn base(category: Category) -> Self {
        Self(category as u64)
    }

    const fn with_field(self, mask: u64, value: u64) -> Self {
        Self((self.0 & !mask) | value)
    }

    pub const fn with_flags(self, flags: PolicyFlags) -> Self {
        Self(self.0 | flags.bits())
    }

    pub const fn without_flags(self, flags: PolicyFlags) -> Self {
        Self(self.0 & !flags.bits())
    }

    pub fn flags(self) -> PolicyFlags {
        PolicyFlags::from_bits_truncate(self.0)
    }

    pub fn contains(self, flags: PolicyFlags) -> bool {
        self.flags().contains(flags)
    }

    pub const fn category(self) -> Category {
        match self.0 & CATEGORY_MASK {
            0x2000 => Category::Symmetric,
            0x4000 => Category::Asymmetric,
            0x6000 => Category::CoprocessorIfc,
            _ => Category::Generic,
        }
    }

    /// Public data: generic category without the private-data flag.
    pub fn is_public_data(self) -> bool {
        self.category() == Category::Generic && !self.contains(PolicyFlags::PRIVATE_DATA)
    }

    pub const fn with_sym_usage(self, usage: SymUsage) -> Self {
        self.with_field(USAGE_MASK, usage as u64)
    }

    pub const fn with_direction(self, direction: Direction) -> Self {
        self.with_field(SYM_DIRECTION_MASK, direction as u64)
    }

    pub const fn with_sym_hash(self, hash: SymHash) -> Self {
        self.with_field(SYM_ALGORITHM_MASK, hash as u64)
    }

    pub const fn with_sym_cipher(self, cipher: SymCipher) -> Self {
        self.with_field(SYM_ALGORITHM_MASK, cipher as u64)
    }

    pub const fn with_sym_mode(self, mode: SymMode) -> Self {
        self.with_field(SYM_MODE_MASK, mode.0)
    }

    pub const fn with_asym_usage(self, usage: AsymUsage) -> Self {
        self.with_field(USAGE_MASK, usage as u64)
    }

    pub const fn with_algorithm(self, algorithm: AsymAlgorithm) -> Self {
        self.with_field(ASYM_ALGORITHM_MASK, algorithm as u64)
    }

    pub const fn with_hash(self, hash: AsymHash) -> Self {
        self.with_field(ASYM_HASH_MASK, hash as u64)
    }

    pub const fn with_generic_data(self, data: GenericData) -> Self {
        self.with_field(USAGE_MASK, data as u64)
    }

    pub const fn with_store_any(self) -> Self {
        Self(self.0 | Self::ASYM_STORE_ANY)
    }

    /// Sets the DPA-off bit matching the category.
    pub const fn with_dpa_disabled(self) -> Self {
        match self.category() {
            Category::Symmetric => Self(self.0 | Self::SYM_NO_DPA),
            Category::Asymmetric => Self(self.0 | Self::ASYM_NO_DPA),
            _ => self,
        }
    }

    /// Policy for the public half of an asymmetric key: drops the private
    /// data, DPA-off and store-any bits.
    pub const fn public_counterpart(self) -> Self {
        Self(
            self.0
                & !(PolicyFlags::PRIVATE_DATA.bits() | Self::ASYM_NO_DPA | Self::ASYM_STORE_ANY),
        )
    }

    pub fn asym_usage(self) -> Option<AsymUsage> {
        if self.category() != Category::Asymmetric {
            return None;
        }
        Some(match self.0 & USAGE_MASK {
            0x0000_0000 => AsymUsage::SignVerify,
            0x0001_0000 => AsymUsage::KeyExchange,
            0x0002_0000 => AsymUsage::DecryptEncrypt,
            0x0003_0000 => AsymUsage::SecureDebug,
            0x000B_0000 => AsymUsage::SecureDebugGpio,
            0x000F_0000 => AsymUsage::Parameters,
            _ => return None,
        })
    }

    pub fn asym_algorithm(self) -> Option<AsymAlgorithm> {
        if self.category() != Category::Asymmetric {
            return None;
        }
        Some(match self.0 & ASYM_ALGORITHM_MASK {
            0x0000_0000 => AsymAlgorithm::Dh,
            0x0010_0000 => AsymAlgorithm::Dsa,
            0x0020_0000 => AsymAlgorithm::Ecdh,
            0x0030_0000 => AsymAlgorithm::Ecdsa,
            0x0040_0000 => AsymAlgorithm::Curve25519,
            0x0050_0000 => AsymAlgorithm::EdDsa,
            0x0060_0000 => AsymAlgorithm::Sm2,
            0x0080_0000 => AsymAlgorithm::RsaPkcs1v15,
            0x0090_0000 => AsymAlgorithm::RsaPss,
            0x00A0_0000 => AsymAlgorithm::RsaOaep,
            0x00B0_0000 => AsymAlgorithm::RsaKem,
            _ => return None,
        })
    }
}

impl From<AssetPolicy> for u64 {
    fn from(policy: AssetPolicy) -> Self {
        policy.0
    }
}
