/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto_types.rs

Abstract:

    File contains the PSA key types, usage flags, algorithm identifiers and
    lifetimes, and the tables that map the supported algorithms onto engine
    methods and asset policy fields.

--*/

use bitflags::bitflags;
use eip130_api::pk::PkMethod;
use eip130_api::policy::{AsymAlgorithm, AsymHash};
use eip130_psa_error::{PsaError, PsaResult};

/// PSA key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyType(pub u16);

/// Curve family of an ECC key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EccFamily(pub u8);

impl EccFamily {
    pub const SECP_K1: Self = Self(0x17);
    pub const SECP_R1: Self = Self(0x12);
    pub const BRAINPOOL_P_R1: Self = Self(0x30);
    pub const MONTGOMERY: Self = Self(0x41);
    pub const TWISTED_EDWARDS: Self = Self(0x42);
}

const KEY_TYPE_ECC_PUBLIC_BASE: u16 = 0x4100;
const KEY_TYPE_ECC_PAIR_BASE: u16 = 0x7100;
const KEY_TYPE_ECC_MASK: u16 = 0xFF00;
const KEY_TYPE_PAIR_FLAG: u16 = 0x3000;

impl KeyType {
    pub const NONE: Self = Self(0x0000);
    pub const RAW_DATA: Self = Self(0x1001);
    pub const AES: Self = Self(0x2400);
    pub const RSA_PUBLIC_KEY: Self = Self(0x4001);
    pub const RSA_KEY_PAIR: Self = Self(0x7001);

    pub const fn ecc_public_key(family: EccFamily) -> Self {
        Self(KEY_TYPE_ECC_PUBLIC_BASE | family.0 as u16)
    }

    pub const fn ecc_key_pair(family: EccFamily) -> Self {
        Self(KEY_TYPE_ECC_PAIR_BASE | family.0 as u16)
    }

    pub const fn is_rsa(self) -> bool {
        self.0 == Self::RSA_PUBLIC_KEY.0 || self.0 == Self::RSA_KEY_PAIR.0
    }

    pub const fn is_ecc(self) -> bool {
        let base = self.0 & KEY_TYPE_ECC_MASK;
        base == KEY_TYPE_ECC_PUBLIC_BASE || base == KEY_TYPE_ECC_PAIR_BASE
    }

    pub const fn is_key_pair(self) -> bool {
        self.0 & KEY_TYPE_PAIR_FLAG == KEY_TYPE_PAIR_FLAG
    }

    pub const fn is_public_key(self) -> bool {
        (self.is_rsa() || self.is_ecc()) && !self.is_key_pair()
    }

    pub fn ecc_family(self) -> Option<EccFamily> {
        self.is_ecc().then_some(EccFamily(self.0 as u8))
    }

    /// Public key type matching a key pair type.
    pub const fn public_of_pair(self) -> Self {
        if self.is_rsa() || self.is_ecc() {
            Self(self.0 & !0x3000 | 0x4000)
        } else {
            self
        }
    }
}

bitflags! {
    /// Operations a key may be used for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyUsage: u32 {
        const EXPORT = 0x0000_0001;
        const COPY = 0x0000_0002;
        const CACHE = 0x0000_0004;
        const ENCRYPT = 0x0000_0100;
        const DECRYPT = 0x0000_0200;
        const SIGN_MESSAGE = 0x0000_0400;
        const VERIFY_MESSAGE = 0x0000_0800;
        const SIGN_HASH = 0x0000_1000;
        const VERIFY_HASH = 0x0000_2000;
        const DERIVE = 0x0000_4000;
        const VERIFY_DERIVATION = 0x0000_8000;
    }
}

/// PSA algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Algorithm(pub u32);

const ALG_CATEGORY_MASK: u32 = 0x7F00_0000;
const ALG_CATEGORY_HASH: u32 = 0x0200_0000;
const ALG_CATEGORY_ASYMMETRIC_ENCRYPTION: u32 = 0x0700_0000;
const ALG_CATEGORY_KEY_AGREEMENT: u32 = 0x0900_0000;
const ALG_HASH_MASK: u32 = 0x0000_00FF;
const ALG_RSA_OAEP_BASE: u32 = 0x0700_0300;

impl Algorithm {
    pub const NONE: Self = Self(0);
    pub const SHA_1: Self = Self(0x0200_0005);
    pub const SHA_224: Self = Self(0x0200_0008);
    pub const SHA_256: Self = Self(0x0200_0009);
    pub const SHA_384: Self = Self(0x0200_000A);
    pub const SHA_512: Self = Self(0x0200_000B);
    pub const SHA3_256: Self = Self(0x0200_0011);
    pub const RSA_PKCS1V15_CRYPT: Self = Self(0x0700_0200);
    pub const ECDH: Self = Self(0x0902_0000);
    pub const FFDH: Self = Self(0x0901_0000);

    /// RSA OAEP with MGF1 over `hash`.
    pub const fn rsa_oaep(hash: Algorithm) -> Self {
        Self(ALG_RSA_OAEP_BASE | (hash.0 & ALG_HASH_MASK))
    }

    pub const fn is_hash(self) -> bool {
        self.0 & ALG_CATEGORY_MASK == ALG_CATEGORY_HASH
    }

    pub const fn is_asymmetric_encryption(self) -> bool {
        self.0 & ALG_CATEGORY_MASK == ALG_CATEGORY_ASYMMETRIC_ENCRYPTION
    }

    pub const fn is_rsa_oaep(self) -> bool {
        self.0 & !ALG_HASH_MASK == ALG_RSA_OAEP_BASE
    }

    /// Key agreement without a key derivation step.
    pub const fn is_raw_key_agreement(self) -> bool {
        self.0 & ALG_CATEGORY_MASK == ALG_CATEGORY_KEY_AGREEMENT
            && (self.0 & 0xFE00_FFFF) | 0x0800_0000 == 0x0800_0000
    }

    /// Hash algorithm encoded in the low byte, if any.
    pub const fn hash(self) -> Option<Algorithm> {
        match self.0 & ALG_HASH_MASK {
            0 => None,
            h => Some(Self(ALG_CATEGORY_HASH | h)),
        }
    }
}

/// Hash algorithms the engine can use inside public key methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hash {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Hash {
    pub fn from_algorithm(alg: Algorithm) -> Option<Self> {
        Some(match alg {
            Algorithm::SHA_1 => Self::Sha1,
            Algorithm::SHA_224 => Self::Sha224,
            Algorithm::SHA_256 => Self::Sha256,
            Algorithm::SHA_384 => Self::Sha384,
            Algorithm::SHA_512 => Self::Sha512,
            _ => return None,
        })
    }

    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub const fn policy(self) -> AsymHash {
        match self {
            Self::Sha1 => AsymHash::Sha1,
            Self::Sha224 => AsymHash::Sha224,
            Self::Sha256 => AsymHash::Sha256,
            Self::Sha384 => AsymHash::Sha384,
            Self::Sha512 => AsymHash::Sha512,
        }
    }
}

/// Asymmetric encryption schemes the engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsymmetricCipher {
    RsaPkcs1v15,
    RsaOaep(Hash),
}

impl AsymmetricCipher {
    /// `INVALID_ARGUMENT` for anything that is not an asymmetric encryption
    /// algorithm, `NOT_SUPPORTED` for schemes the engine lacks.
    pub fn from_algorithm(alg: Algorithm) -> PsaResult<Self> {
        if !alg.is_asymmetric_encryption() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        if alg == Algorithm::RSA_PKCS1V15_CRYPT {
            return Ok(Self::RsaPkcs1v15);
        }
        if alg.is_rsa_oaep() {
            return alg
                .hash()
                .and_then(Hash::from_algorithm)
                .map(Self::RsaOaep)
                .ok_or(PsaError::NOT_SUPPORTED);
        }
        Err(PsaError::NOT_SUPPORTED)
    }

    pub const fn policy_algorithm(self) -> AsymAlgorithm {
        match self {
            Self::RsaPkcs1v15 => AsymAlgorithm::RsaPkcs1v15,
            Self::RsaOaep(_) => AsymAlgorithm::RsaOaep,
        }
    }

    pub const fn policy_hash(self) -> AsymHash {
        match self {
            Self::RsaPkcs1v15 => AsymHash::NotUsed,
            Self::RsaOaep(hash) => hash.policy(),
        }
    }

    pub const fn wrap_method(self) -> PkMethod {
        match self {
            Self::RsaPkcs1v15 => PkMethod::RSA_PKCS1V15_WRAP,
            Self::RsaOaep(_) => PkMethod::RSA_OAEP_WRAP_STRING,
        }
    }

    pub const fn unwrap_method(self) -> PkMethod {
        match self {
            Self::RsaPkcs1v15 => PkMethod::RSA_PKCS1V15_UNWRAP,
            Self::RsaOaep(_) => PkMethod::RSA_OAEP_UNWRAP_STRING,
        }
    }

    /// Longest message that fits a `modulus_len`-byte block.
    pub const fn max_message_len(self, modulus_len: usize) -> usize {
        let overhead = match self {
            Self::RsaPkcs1v15 => 11,
            Self::RsaOaep(hash) => 2 * hash.digest_len() + 2,
        };
        modulus_len.saturating_sub(overhead)
    }

    pub const fn takes_label(self) -> bool {
        matches!(self, Self::RsaOaep(_))
    }
}

/// Raw key agreement schemes the engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAgreement {
    Ecdh,
}

impl KeyAgreement {
    /// Call only with a raw key agreement algorithm; anything but ECDH is
    /// `NOT_SUPPORTED`.
    pub fn from_algorithm(alg: Algorithm) -> PsaResult<Self> {
        match alg {
            Algorithm::ECDH => Ok(Self::Ecdh),
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }

    pub const fn policy_algorithm(self) -> AsymAlgorithm {
        match self {
            Self::Ecdh => AsymAlgorithm::Ecdh,
        }
    }

    pub const fn method(self) -> PkMethod {
        match self {
            Self::Ecdh => PkMethod::ECDH_GEN_SINGLE_SHARED_SECRET,
        }
    }
}

/// Key lifetime: persistence level in the low byte, location above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Lifetime(pub u32);

impl Lifetime {
    pub const VOLATILE: Self = Self(0x0000_0000);
    pub const PERSISTENT: Self = Self(0x0000_0001);

    pub const LOCATION_LOCAL_STORAGE: u32 = 0;

    pub const fn persistence(self) -> u8 {
        self.0 as u8
    }

    pub const fn location(self) -> u32 {
        self.0 >> 8
    }

    pub const fn is_volatile(self) -> bool {
        self.persistence() == 0
    }
}
