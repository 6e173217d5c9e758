// Licensed under the Apache-2.0 license
pub mod common;

use common::*;
use eip130_api::pk::PkMethod;
use eip130_api::HwError;
use eip130_hw_model::{FaultAction, Trigger};
use eip130_psa::{Algorithm, KeyType, KeyUsage, PsaError};

const LABEL: &[u8] = b"label";
const MESSAGE: &[u8] = b"attack at dawn";

fn oaep() -> Algorithm {
    Algorithm::rsa_oaep(Algorithm::SHA_256)
}

#[test]
fn test_oaep_round_trip() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());

    let mut ciphertext = [0u8; 130];
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, Some(LABEL), &mut ciphertext),
        Ok(128)
    );
    assert_eq!(&ciphertext[128..], &[0, 0]);

    let mut plaintext = [0xEEu8; 64];
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), &ciphertext[..128], Some(LABEL), &mut plaintext),
        Ok(MESSAGE.len())
    );
    assert_eq!(&plaintext[..MESSAGE.len()], MESSAGE);
    assert!(plaintext[MESSAGE.len()..].iter().all(|b| *b == 0));

    assert_eq!(model(&psa, |m| m.live_assets()), 0);
    assert_no_leaks(&psa);
}

#[test]
fn test_pkcs1_round_trip_with_public_key() {
    let mut psa = psa();
    let alg = Algorithm::RSA_PKCS1V15_CRYPT;
    let public = import_rsa_public(&mut psa, alg);
    let pair = import_rsa_pair(&mut psa, alg);

    let mut ciphertext = [0u8; 128];
    psa.asymmetric_encrypt(public, alg, MESSAGE, None, &mut ciphertext)
        .unwrap();
    let mut plaintext = [0u8; 128];
    assert_eq!(
        psa.asymmetric_decrypt(pair, alg, &ciphertext, None, &mut plaintext),
        Ok(MESSAGE.len())
    );
    assert_eq!(&plaintext[..MESSAGE.len()], MESSAGE);

    // decryption needs the private key
    assert_eq!(
        psa.asymmetric_decrypt(public, alg, &ciphertext, None, &mut plaintext),
        Err(PsaError::INVALID_ARGUMENT)
    );
}

#[test]
fn test_encrypt_token_sequence() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());
    let mut ciphertext = [0u8; 128];
    psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut ciphertext)
        .unwrap();

    let history = model(&psa, |m| m.history().to_vec());
    assert_eq!(history.len(), 7);
    let wrap = eip130_api::pk::PkAssetCommand::decode(&history[4]);
    assert_eq!(wrap.method, PkMethod::RSA_OAEP_WRAP_STRING);
    assert_eq!((wrap.n_words, wrap.m_words), (32, 32));
    assert_eq!(wrap.output.length, 128);
    assert!(wrap.additional.is_empty());

    // the key was loaded under the public policy
    let create = eip130_api::asset::AssetCreate::decode(&history[0]);
    assert!(!create
        .policy
        .contains(eip130_api::policy::PolicyFlags::PRIVATE_DATA));
}

#[test]
fn test_wrong_label() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());
    let mut ciphertext = [0u8; 128];
    psa.asymmetric_encrypt(key, oaep(), MESSAGE, Some(LABEL), &mut ciphertext)
        .unwrap();
    let mut plaintext = [0u8; 128];
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), &ciphertext, Some(&b"other"[..]), &mut plaintext),
        Err(PsaError::CORRUPTION_DETECTED)
    );
    assert_eq!(model(&psa, |m| m.live_assets()), 0);
}

#[test]
fn test_decrypt_into_short_buffer() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());
    let mut ciphertext = [0u8; 128];
    psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut ciphertext)
        .unwrap();
    let mut plaintext = [0u8; 8];
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), &ciphertext, None, &mut plaintext),
        Err(PsaError::BUFFER_TOO_SMALL)
    );
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), &ciphertext, None, &mut []),
        Err(PsaError::BUFFER_TOO_SMALL)
    );
    assert_eq!(model(&psa, |m| m.live_assets()), 0);
}

#[test]
fn test_encrypt_argument_errors() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());
    let before = tokens(&psa);
    let mut out = [0u8; 128];

    assert_eq!(
        psa.asymmetric_encrypt(0x7FFF_0005, oaep(), MESSAGE, None, &mut out),
        Err(PsaError::INVALID_HANDLE)
    );
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut out[..127]),
        Err(PsaError::BUFFER_TOO_SMALL)
    );
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), b"", None, &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, Some(&b""[..]), &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, Some(&[7; 209][..]), &mut out),
        Err(PsaError::NOT_SUPPORTED)
    );
    assert_eq!(
        psa.asymmetric_encrypt(key, Algorithm::ECDH, MESSAGE, None, &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
    assert_eq!(
        psa.asymmetric_encrypt(key, Algorithm::RSA_PKCS1V15_CRYPT, MESSAGE, None, &mut out),
        Err(PsaError::NOT_PERMITTED)
    );
    // OAEP-SHA256 leaves 62 bytes in a 1024-bit block
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), &[1; 63], None, &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
    assert_eq!(tokens(&psa), before);
}

#[test]
fn test_decrypt_checks_buffer_before_arguments() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());
    let before = tokens(&psa);
    let ciphertext = [0x3Cu8; 128];

    // an empty label and an empty input are both invalid, the buffer wins
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), &ciphertext, Some(&b""[..]), &mut []),
        Err(PsaError::BUFFER_TOO_SMALL)
    );
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), b"", None, &mut []),
        Err(PsaError::BUFFER_TOO_SMALL)
    );
    assert_eq!(
        psa.asymmetric_decrypt(key, Algorithm::ECDH, &ciphertext, None, &mut []),
        Err(PsaError::BUFFER_TOO_SMALL)
    );
    let mut out = [0u8; 16];
    assert_eq!(
        psa.asymmetric_decrypt(key, oaep(), &ciphertext, Some(&b""[..]), &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
    assert_eq!(tokens(&psa), before);
}

#[test]
fn test_usage_is_enforced() {
    let mut psa = psa();
    let attributes = eip130_psa::KeyAttributes {
        usage: KeyUsage::DECRYPT,
        ..rsa_attributes(KeyType::RSA_KEY_PAIR, oaep())
    };
    let key = psa.import_key(&attributes, &rsa_private_der()).unwrap();
    let mut out = [0u8; 128];
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut out),
        Err(PsaError::NOT_PERMITTED)
    );
}

#[test]
fn test_engine_failure_frees_assets() {
    let mut psa = psa();
    let key = import_rsa_pair(&mut psa, oaep());
    model(&psa, |m| {
        m.inject(
            Trigger::PkMethod(PkMethod::RSA_OAEP_WRAP_STRING),
            FaultAction::Status(HwError::PANIC),
        )
    });
    let mut out = [0u8; 128];
    assert_eq!(
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut out),
        Err(PsaError::CORRUPTION_DETECTED)
    );
    assert_eq!(model(&psa, |m| m.live_assets()), 0);
    assert_no_leaks(&psa);
}

#[test]
fn test_failure_at_every_token_frees_assets() {
    for index in 0..7 {
        let mut psa = psa();
        let key = import_rsa_pair(&mut psa, oaep());
        let mut ciphertext = [0u8; 128];
        psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut ciphertext)
            .unwrap();

        model(&psa, |m| m.fail_nth_token(index, FaultAction::Status(HwError::PANIC)));
        let mut out = [0u8; 128];
        let _ = psa.asymmetric_encrypt(key, oaep(), MESSAGE, None, &mut out);
        assert_no_leaks(&psa);

        model(&psa, |m| m.fail_nth_token(index, FaultAction::Status(HwError::PANIC)));
        let _ = psa.asymmetric_decrypt(key, oaep(), &ciphertext, None, &mut out);
        assert_no_leaks(&psa);
    }
}
