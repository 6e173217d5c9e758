// Licensed under the Apache-2.0 license
pub mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use eip130_api::pk::PkMethod;
use eip130_api::HwError;
use eip130_hw_model::{FaultAction, Trigger};
use eip130_psa::{
    Algorithm, EccFamily, KeyAttributes, KeyType, KeyUsage, MemoryStorage, Psa, PsaConfig,
    PsaError,
};
use p256::elliptic_curve::sec1::ToEncodedPoint;

struct Parties {
    ours: p256::SecretKey,
    peer: p256::SecretKey,
}

impl Parties {
    fn new() -> Self {
        Self {
            ours: p256::SecretKey::from_slice(&[0x11; 32]).unwrap(),
            peer: p256::SecretKey::from_slice(&[0x22; 32]).unwrap(),
        }
    }

    fn peer_point(&self) -> Vec<u8> {
        self.peer
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    fn expected(&self) -> Vec<u8> {
        p256::ecdh::diffie_hellman(self.peer.to_nonzero_scalar(), self.ours.public_key().as_affine())
            .raw_secret_bytes()
            .to_vec()
    }

    fn import(&self, psa: &mut TestPsa) -> u32 {
        psa.import_key(&ecdh_attributes(), &self.ours.to_bytes())
            .unwrap()
    }
}

#[test]
fn test_ecdh_p256() {
    let parties = Parties::new();
    let mut psa = psa();
    let key = parties.import(&mut psa);

    let mut out = [0u8; 40];
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out),
        Ok(32)
    );
    assert_eq!(&out[..32], &parties.expected()[..]);
    assert_eq!(&out[32..], &[0u8; 8]);
    assert_eq!(model(&psa, |m| m.live_assets()), 0);
    assert_no_leaks(&psa);
}

#[test]
fn test_ecdh_p384() {
    let ours = p384::SecretKey::from_slice(&[0x33; 48]).unwrap();
    let peer = p384::SecretKey::from_slice(&[0x44; 48]).unwrap();
    let mut psa = psa();
    let key = psa.import_key(&ecdh_attributes(), &ours.to_bytes()).unwrap();
    assert_eq!(psa.get_key_attributes(key).unwrap().bits, 384);

    let point = peer.public_key().to_encoded_point(false);
    let mut out = [0u8; 48];
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, point.as_bytes(), &mut out),
        Ok(48)
    );
    let expected = p384::ecdh::diffie_hellman(peer.to_nonzero_scalar(), ours.public_key().as_affine());
    assert_eq!(&out[..], expected.raw_secret_bytes().as_slice());
}

#[test]
fn test_ecdh_token() {
    let parties = Parties::new();
    let mut psa = psa();
    let key = parties.import(&mut psa);
    let mut out = [0u8; 32];
    psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out)
        .unwrap();

    let history = model(&psa, |m| m.history().to_vec());
    // peer, domain and private key loads, the secret, the operation, the
    // read back, four deletes
    assert_eq!(history.len(), 13);
    let cmd = eip130_api::pk::PkAssetCommand::decode(&history[7]);
    assert_eq!(cmd.method, PkMethod::ECDH_GEN_SINGLE_SHARED_SECRET);
    assert_eq!((cmd.n_words, cmd.m_words), (8, 8));
    assert!(cmd.save_shared_secret);
    assert!(cmd.additional_asset(0).is_some());
}

#[test]
fn test_argument_errors_fill_output() {
    let parties = Parties::new();
    let mut psa = psa();
    let key = parties.import(&mut psa);
    let peer = parties.peer_point();

    let cases: [(Algorithm, &[u8], usize, PsaError); 4] = [
        // ECDH followed by a KDF is not a raw agreement
        (Algorithm(0x0902_0109), &peer, 32, PsaError::INVALID_ARGUMENT),
        (Algorithm::ECDH, &[], 32, PsaError::INVALID_ARGUMENT),
        (Algorithm::ECDH, &peer, 31, PsaError::BUFFER_TOO_SMALL),
        (Algorithm::ECDH, &peer[..64], 32, PsaError::INVALID_ARGUMENT),
    ];
    for (alg, peer, len, expected) in cases {
        let before = tokens(&psa);
        let mut out = vec![0u8; len];
        assert_eq!(psa.raw_key_agreement(alg, key, peer, &mut out), Err(expected));
        assert!(out.iter().any(|b| *b != 0));
        // only the random fill reached the engine
        assert_eq!(tokens(&psa), before + 1);
    }
}

#[test]
fn test_key_checks() {
    let parties = Parties::new();
    let mut psa = psa();
    let peer = parties.peer_point();
    let mut out = [0u8; 32];

    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, 0x7FFF_0009, &peer, &mut out),
        Err(PsaError::INVALID_HANDLE)
    );

    let no_derive = KeyAttributes {
        usage: KeyUsage::EXPORT,
        ..ecdh_attributes()
    };
    let key = psa.import_key(&no_derive, &parties.ours.to_bytes()).unwrap();
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &peer, &mut out),
        Err(PsaError::NOT_PERMITTED)
    );

    let public = KeyAttributes {
        key_type: KeyType::ecc_public_key(EccFamily::SECP_R1),
        ..ecdh_attributes()
    };
    let key = psa.import_key(&public, &peer).unwrap();
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &peer, &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
}

#[test]
fn test_montgomery_not_supported() {
    let mut psa = psa();
    let x25519 = KeyAttributes {
        key_type: KeyType::ecc_key_pair(EccFamily::MONTGOMERY),
        ..ecdh_attributes()
    };
    assert_eq!(
        psa.import_key(&x25519, &[0x55; 32]),
        Err(PsaError::NOT_SUPPORTED)
    );
}

#[test]
fn test_point_off_curve() {
    let parties = Parties::new();
    let mut psa = psa();
    let key = parties.import(&mut psa);
    let mut peer = parties.peer_point();
    peer[64] ^= 1;
    let mut out = [0u8; 32];
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &peer, &mut out),
        Err(PsaError::CORRUPTION_DETECTED)
    );
    assert_eq!(model(&psa, |m| m.live_assets()), 0);
}

#[test]
fn test_engine_failure_fills_output() {
    let parties = Parties::new();
    let mut psa = psa();
    let key = parties.import(&mut psa);
    model(&psa, |m| {
        m.inject(
            Trigger::PkMethod(PkMethod::ECDH_GEN_SINGLE_SHARED_SECRET),
            FaultAction::Status(HwError::PANIC),
        )
    });
    let mut out = [0u8; 32];
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out),
        Err(PsaError::CORRUPTION_DETECTED)
    );
    assert_ne!(&out[..], &parties.expected()[..]);
    assert!(out.iter().any(|b| *b != 0));
    assert_eq!(model(&psa, |m| m.live_assets()), 0);
    assert_no_leaks(&psa);
}

#[test]
fn test_os_random_fallback() {
    let parties = Parties::new();
    let mut psa = psa();
    let key = parties.import(&mut psa);
    // token 7 is the agreement; after four deletes, token 12 is the fill
    model(&psa, |m| {
        m.fail_nth_token(7, FaultAction::Status(HwError::PANIC));
        m.fail_nth_token(12, FaultAction::Status(HwError::PANIC));
    });
    let mut out = [0u8; 32];
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out),
        Err(PsaError::CORRUPTION_DETECTED)
    );
    assert!(out.iter().any(|b| *b != 0));
    assert_eq!(tokens(&psa), 13);
}

#[test]
fn test_failure_at_every_token_frees_assets() {
    let parties = Parties::new();
    for index in 0..13 {
        let mut psa = psa();
        let key = parties.import(&mut psa);
        model(&psa, |m| m.fail_nth_token(index, FaultAction::Status(HwError::PANIC)));
        let mut out = [0u8; 32];
        let result = psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out);
        if index < 9 {
            assert!(result.is_err(), "token {index}");
        }
        assert_no_leaks(&psa);
    }
}

#[test]
fn test_lost_response_is_reported() {
    let parties = Parties::new();
    let mut psa = psa_with(
        Default::default(),
        PsaConfig {
            response_poll_limit: 5,
            ..Default::default()
        },
    );
    let key = parties.import(&mut psa);
    model(&psa, |m| m.fail_nth_token(7, FaultAction::DropResponse));
    let mut out = [0u8; 32];
    assert_eq!(
        psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out),
        Err(PsaError::RESPONSE_TIMEOUT)
    );
    assert_no_leaks(&psa);
}

#[test]
fn test_contexts_share_one_engine() {
    let parties = Arc::new(Parties::new());
    let first = psa();
    let hsm = first.hsm().clone();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let hsm = hsm.clone();
            let parties = parties.clone();
            thread::spawn(move || {
                let mut psa = Psa::with_hsm(hsm, MemoryStorage::new(), PsaConfig::default());
                let key = parties.import(&mut psa);
                for _ in 0..5 {
                    let mut out = [0u8; 32];
                    psa.raw_key_agreement(Algorithm::ECDH, key, &parties.peer_point(), &mut out)
                        .unwrap();
                    assert_eq!(&out[..], &parties.expected()[..]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(model(&first, |m| m.live_assets()), 0);
    assert_no_leaks(&first);
}
