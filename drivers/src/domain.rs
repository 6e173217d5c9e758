/*++

Licensed under the Apache-2.0 license.

File Name:

    domain.rs

Abstract:

    File contains the supported ECC curve domains and their conversion to
    the engine's big-integer vector format.

--*/

use eip130_api::policy::AssetPolicy;
use eip130_api::vector::{push_vector, vector_size, VectorHeader};
use eip130_api::Mailbox;
use eip130_psa_error::{PsaError, PsaResult};

use crate::asset::Asset;
use crate::hsm::Hsm;

const P256_P: [u8; 32] = hex_bytes("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff");
const P256_A: [u8; 32] = hex_bytes("ffffffff00000001000000000000000000000000fffffffffffffffffffffffc");
const P256_B: [u8; 32] = hex_bytes("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b");
const P256_N: [u8; 32] = hex_bytes("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551");
const P256_GX: [u8; 32] = hex_bytes("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296");
const P256_GY: [u8; 32] = hex_bytes("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5");

const P384_P: [u8; 48] = hex_bytes(
    "fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffeffffffff0000000000000000ffffffff",
);
const P384_A: [u8; 48] = hex_bytes(
    "fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffeffffffff0000000000000000fffffffc",
);
const P384_B: [u8; 48] = hex_bytes(
    "b3312fa7e23ee7e4988e056be3f82d19181d9c6efe8141120314088f5013875ac656398d8a2ed19d2a85c8edd3ec2aef",
);
const P384_N: [u8; 48] = hex_bytes(
    "ffffffffffffffffffffffffffffffffffffffffffffffffc7634d81f4372ddf581a0db248b0a77aecec196accc52973",
);
const P384_GX: [u8; 48] = hex_bytes(
    "aa87ca22be8b05378eb1c71ef320ad746e1d3b628ba79b9859f741e082542a385502f25dbf55296c3a545e3872760ab7",
);
const P384_GY: [u8; 48] = hex_bytes(
    "3617de4a96262c6f5d9e98bf9292dc29f8f41dbd289a147ce9da3113b5f0b8c00a60b1ce1d7e819d7a431d7c90ea0e5f",
);

const COFACTOR: [u8; 1] = [1];
const DOMAIN_ITEMS: u8 = 7;
const POINT_ITEMS: u8 = 2;

const fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit"),
    }
}

const fn hex_bytes<const N: usize>(s: &str) -> [u8; N] {
    let s = s.as_bytes();
    assert!(s.len() == 2 * N);
    let mut out = [0u8; N];
    let mut i = 0;
    while i < N {
        out[i] = hex_nibble(s[2 * i]) << 4 | hex_nibble(s[2 * i + 1]);
        i += 1;
    }
    out
}

/// Short Weierstrass curves the engine is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EccCurve {
    P256,
    P384,
}

impl EccCurve {
    /// Curve of the given size in the SECP R1 family.
    pub fn secp_r1(bits: u32) -> Option<Self> {
        match bits {
            256 => Some(Self::P256),
            384 => Some(Self::P384),
            _ => None,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            Self::P256 => 256,
            Self::P384 => 384,
        }
    }

    pub const fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Size of the engine asset holding a public point.
    pub const fn point_vector_size(self) -> usize {
        2 * vector_size(self.bits())
    }

    /// Size of the engine asset holding a private scalar.
    pub const fn scalar_vector_size(self) -> usize {
        vector_size(self.bits())
    }

    fn params(self) -> [&'static [u8]; 6] {
        match self {
            Self::P256 => [&P256_P, &P256_A, &P256_B, &P256_N, &P256_GX, &P256_GY],
            Self::P384 => [&P384_P, &P384_A, &P384_B, &P384_N, &P384_GX, &P384_GY],
        }
    }

    /// Domain parameters p, a, b, n, Gx, Gy, h as seven vector items.
    pub fn domain_vector(self) -> PsaResult<Vec<u8>> {
        let mut out = Vec::with_capacity(6 * vector_size(self.bits()) + vector_size(1));
        for (index, value) in self.params().into_iter().enumerate() {
            push_vector(
                &mut out,
                VectorHeader {
                    bits: self.bits() as u16,
                    index: index as u8,
                    items: DOMAIN_ITEMS,
                },
                value,
            )?;
        }
        push_vector(
            &mut out,
            VectorHeader {
                bits: 1,
                index: 6,
                items: DOMAIN_ITEMS,
            },
            &COFACTOR,
        )?;
        Ok(out)
    }

    /// Converts an uncompressed SEC1 point (`04 || X || Y`) to vector form.
    pub fn point_vector(self, point: &[u8]) -> PsaResult<Vec<u8>> {
        let len = self.bytes();
        if point.len() != 1 + 2 * len || point[0] != 0x04 {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let mut out = Vec::with_capacity(self.point_vector_size());
        for (index, coordinate) in [&point[1..1 + len], &point[1 + len..]].into_iter().enumerate() {
            push_vector(
                &mut out,
                VectorHeader {
                    bits: self.bits() as u16,
                    index: index as u8,
                    items: POINT_ITEMS,
                },
                coordinate,
            )?;
        }
        Ok(out)
    }

    /// Converts a big-endian private scalar to vector form.
    pub fn scalar_vector(self, scalar: &[u8]) -> PsaResult<Vec<u8>> {
        if scalar.len() != self.bytes() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let mut out = Vec::with_capacity(self.scalar_vector_size());
        push_vector(
            &mut out,
            VectorHeader {
                bits: self.bits() as u16,
                index: 0,
                items: 1,
            },
            scalar,
        )?;
        Ok(out)
    }
}

impl<M: Mailbox> Hsm<M> {
    /// Loads the domain parameters of `curve` into a new asset.
    pub fn install_curve(&self, curve: EccCurve) -> PsaResult<Asset<'_, M>> {
        let domain = curve.domain_vector()?;
        let policy = AssetPolicy::ASYM_KEY_PARAMS.with_flags(self.source_flags());
        let asset = self.allocate_asset(policy, domain.len())?;
        asset.load_plaintext(&domain)?;
        Ok(asset)
    }
}
