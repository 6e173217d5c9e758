// Licensed under the Apache-2.0 license
#![allow(dead_code)]

use eip130_hw_model::{InitParams, ModelHsm};
use eip130_psa::{
    Algorithm, EccFamily, KeyAttributes, KeyId, KeyType, KeyUsage, MemoryStorage, Psa, PsaConfig,
};

pub type TestPsa = Psa<ModelHsm, MemoryStorage>;

/// 1024-bit modulus; the model does not do RSA arithmetic.
pub const MODULUS: [u8; 128] = [0xC3; 128];
pub const PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];
pub const PRIVATE_EXPONENT: [u8; 128] = [0x5B; 128];

pub fn psa() -> TestPsa {
    psa_with(InitParams::default(), PsaConfig::default())
}

pub fn psa_with(params: InitParams, config: PsaConfig) -> TestPsa {
    Psa::new(ModelHsm::new(params), MemoryStorage::new(), config)
}

pub fn model<R>(psa: &TestPsa, f: impl FnOnce(&mut ModelHsm) -> R) -> R {
    psa.hsm().with_mailbox(f).unwrap()
}

/// Tokens the model has received so far.
pub fn tokens(psa: &TestPsa) -> usize {
    model(psa, |m| m.stats().tokens)
}

/// Every asset created has had its delete requested.
pub fn assert_no_leaks(psa: &TestPsa) {
    let stats = model(psa, |m| m.stats());
    assert_eq!(stats.delete_requests, stats.assets_created, "{stats:?}");
}

fn der_length(out: &mut Vec<u8>, len: usize) {
    match len {
        0..=0x7F => out.push(len as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        _ => {
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
}

fn der_sequence(integers: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for value in integers {
        let pad = value.first().map_or(true, |b| b & 0x80 != 0);
        body.push(0x02);
        der_length(&mut body, value.len() + usize::from(pad));
        if pad {
            body.push(0);
        }
        body.extend_from_slice(value);
    }
    let mut out = vec![0x30];
    der_length(&mut out, body.len());
    out.extend_from_slice(&body);
    out
}

pub fn rsa_public_der() -> Vec<u8> {
    der_sequence(&[&MODULUS, &PUBLIC_EXPONENT])
}

pub fn rsa_private_der() -> Vec<u8> {
    der_sequence(&[
        &[0],
        &MODULUS,
        &PUBLIC_EXPONENT,
        &PRIVATE_EXPONENT,
        &[0x61; 64],
        &[0x67; 64],
        &[0x6B; 64],
        &[0x6D; 64],
        &[0x71; 64],
    ])
}

pub fn rsa_attributes(key_type: KeyType, alg: Algorithm) -> KeyAttributes {
    KeyAttributes {
        key_type,
        usage: KeyUsage::ENCRYPT | KeyUsage::DECRYPT,
        alg,
        ..Default::default()
    }
}

pub fn import_rsa_pair(psa: &mut TestPsa, alg: Algorithm) -> KeyId {
    psa.import_key(&rsa_attributes(KeyType::RSA_KEY_PAIR, alg), &rsa_private_der())
        .unwrap()
}

pub fn import_rsa_public(psa: &mut TestPsa, alg: Algorithm) -> KeyId {
    psa.import_key(&rsa_attributes(KeyType::RSA_PUBLIC_KEY, alg), &rsa_public_der())
        .unwrap()
}

pub fn ecdh_attributes() -> KeyAttributes {
    KeyAttributes {
        key_type: KeyType::ecc_key_pair(EccFamily::SECP_R1),
        usage: KeyUsage::DERIVE,
        alg: Algorithm::ECDH,
        ..Default::default()
    }
}
