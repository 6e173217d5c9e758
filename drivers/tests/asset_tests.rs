// Licensed under the Apache-2.0 license

use eip130_api::policy::{Category, PolicyFlags};
use eip130_api::{AssetPolicy, HwError};
use eip130_drivers::{EccCurve, Hsm, MailboxConfig};
use eip130_hw_model::{FaultAction, InitParams, ModelHsm};
use eip130_psa_error::PsaError;

fn hsm_with(params: InitParams, config: MailboxConfig) -> Hsm<ModelHsm> {
    Hsm::new(ModelHsm::new(params), config)
}

fn hsm() -> Hsm<ModelHsm> {
    hsm_with(InitParams::default(), MailboxConfig::default())
}

fn model<R>(hsm: &Hsm<ModelHsm>, f: impl FnOnce(&mut ModelHsm) -> R) -> R {
    hsm.with_mailbox(f).unwrap()
}

fn public_policy() -> AssetPolicy {
    AssetPolicy::base(Category::Generic).with_flags(PolicyFlags::EXPORTABLE)
}

#[test]
fn test_public_data_round_trip() {
    let hsm = hsm();
    let data: Vec<u8> = (0u8..16).collect();
    {
        let asset = hsm.allocate_asset(public_policy(), 16).unwrap();
        asset.load_plaintext(&data).unwrap();
        let mut out = [0xEEu8; 32];
        assert_eq!(asset.read_public(&mut out), Ok(16));
        assert_eq!(&out[..16], &data[..]);
        assert_eq!(&out[16..], &[0u8; 16]);
        assert_eq!(model(&hsm, |m| m.live_assets()), 1);
    }
    let stats = model(&hsm, |m| m.stats());
    assert_eq!(stats.assets_created, 1);
    assert_eq!(stats.assets_deleted, 1);
    assert_eq!(model(&hsm, |m| m.live_assets()), 0);
}

#[test]
fn test_private_data_is_not_readable() {
    let hsm = hsm();
    let asset = hsm
        .allocate_asset(public_policy().with_flags(PolicyFlags::PRIVATE_DATA), 16)
        .unwrap();
    asset.load_plaintext(&[0x5A; 16]).unwrap();
    let mut out = [0u8; 16];
    assert_eq!(asset.read_public(&mut out), Err(PsaError::NOT_PERMITTED));
}

#[test]
fn test_read_into_short_buffer() {
    let hsm = hsm();
    let asset = hsm.allocate_asset(public_policy(), 16).unwrap();
    asset.load_plaintext(&[1; 16]).unwrap();
    let mut out = [0u8; 8];
    assert_eq!(asset.read_public(&mut out), Err(PsaError::BUFFER_TOO_SMALL));
}

#[test]
fn test_size_checks_happen_before_any_token() {
    let hsm = hsm();
    assert_eq!(
        hsm.allocate_asset(public_policy(), 0).unwrap_err(),
        PsaError::INVALID_ARGUMENT
    );
    assert_eq!(
        hsm.allocate_asset(public_policy(), 1024).unwrap_err(),
        PsaError::INVALID_ARGUMENT
    );
    let asset = hsm.allocate_asset(public_policy(), 4).unwrap();
    assert_eq!(asset.load_plaintext(&[1; 5]), Err(PsaError::INVALID_ARGUMENT));
    assert_eq!(asset.load_plaintext(&[]), Err(PsaError::INVALID_ARGUMENT));
    assert_eq!(model(&hsm, |m| m.history().len()), 1);
}

#[test]
fn test_store_full() {
    let hsm = hsm_with(
        InitParams {
            max_assets: 2,
            ..Default::default()
        },
        MailboxConfig::default(),
    );
    let _a = hsm.allocate_asset(public_policy(), 8).unwrap();
    let _b = hsm.allocate_asset(public_policy(), 8).unwrap();
    assert_eq!(
        hsm.allocate_asset(public_policy(), 8).unwrap_err(),
        PsaError::INSUFFICIENT_RESOURCES
    );
}

#[test]
fn test_engine_errors_map_to_corruption() {
    let hsm = hsm();
    model(&hsm, |m| m.fail_nth_token(0, FaultAction::Status(HwError::PANIC)));
    assert_eq!(
        hsm.allocate_asset(public_policy(), 8).unwrap_err(),
        PsaError::CORRUPTION_DETECTED
    );

    let asset = hsm.allocate_asset(public_policy(), 8).unwrap();
    model(&hsm, |m| m.fail_nth_token(0, FaultAction::Status(HwError::INVALID_ASSET)));
    assert_eq!(asset.free(), Err(PsaError::CORRUPTION_DETECTED));
    // the handle was consumed; the engine still holds the asset
    assert_eq!(model(&hsm, |m| m.live_assets()), 1);
}

#[test]
fn test_load_length_error() {
    let hsm = hsm();
    let asset = hsm.allocate_asset(public_policy(), 8).unwrap();
    model(&hsm, |m| m.fail_nth_token(0, FaultAction::Status(HwError::INVALID_LENGTH)));
    assert_eq!(asset.load_plaintext(&[1; 8]), Err(PsaError::INVALID_ARGUMENT));
    model(&hsm, |m| m.fail_nth_token(0, FaultAction::Status(HwError::ACCESS_ERROR)));
    assert_eq!(asset.load_plaintext(&[1; 8]), Err(PsaError::CORRUPTION_DETECTED));
}

#[test]
fn test_lost_create_response_leaks() {
    let hsm = hsm_with(
        InitParams::default(),
        MailboxConfig {
            max_polls: 10,
            ..Default::default()
        },
    );
    model(&hsm, |m| m.fail_nth_token(0, FaultAction::DropResponse));
    assert_eq!(
        hsm.allocate_asset(public_policy(), 8).unwrap_err(),
        PsaError::RESPONSE_TIMEOUT
    );
    // the engine created the asset but the host never learned its id
    assert_eq!(model(&hsm, |m| m.live_assets()), 1);
}

#[test]
fn test_rejected_submit() {
    let hsm = hsm();
    model(&hsm, |m| m.fail_nth_token(0, FaultAction::RejectSubmit));
    assert_eq!(
        hsm.allocate_asset(public_policy(), 8).unwrap_err(),
        PsaError::RESOURCE_UNAVAILABLE
    );
}

#[test]
fn test_into_raw_keeps_the_asset() {
    let hsm = hsm();
    let id = hsm.allocate_asset(public_policy(), 8).unwrap().into_raw();
    assert!(model(&hsm, |m| m.asset(id).is_some()));
    hsm.free_asset(id).unwrap();
    assert!(model(&hsm, |m| m.asset(id).is_none()));
    assert_eq!(hsm.free_asset(id), Err(PsaError::CORRUPTION_DETECTED));
}

#[test]
fn test_search_static_asset() {
    let hsm = hsm();
    let id = model(&hsm, |m| {
        m.provision_asset(0x21, AssetPolicy::ASYM_KEY_PARAMS, &[0; 32])
    });
    assert_eq!(hsm.search_asset(0x21), Ok((id, 32)));
    assert_eq!(hsm.search_asset(0x22), Err(PsaError::DOES_NOT_EXIST));
}

#[test]
fn test_install_curve() {
    let hsm = hsm();
    let domain = hsm.install_curve(EccCurve::P384).unwrap();
    let expected = EccCurve::P384.domain_vector().unwrap();
    assert_eq!(domain.capacity(), expected.len());
    let held = model(&hsm, |m| m.asset(domain.id()).cloned()).unwrap();
    assert_eq!(held.policy, AssetPolicy::ASYM_KEY_PARAMS);
    assert_eq!(held.data, Some(expected));
}

#[test]
fn test_non_secure_source_flag() {
    let hsm = hsm_with(
        InitParams::default(),
        MailboxConfig {
            secure_access: false,
            ..Default::default()
        },
    );
    let domain = hsm.install_curve(EccCurve::P256).unwrap();
    let held = model(&hsm, |m| m.asset(domain.id()).cloned()).unwrap();
    assert!(held.policy.contains(PolicyFlags::SOURCE_NON_SECURE));
}

#[test]
fn test_tokens_carry_identity_and_fresh_ids() {
    let hsm = hsm_with(
        InitParams::default(),
        MailboxConfig {
            identity: 0x0BAD_F00D,
            ..Default::default()
        },
    );
    let asset = hsm.allocate_asset(public_policy(), 8).unwrap();
    drop(asset);
    let history = model(&hsm, |m| m.history().to_vec());
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|t| t.identity() == 0x0BAD_F00D));
    assert_ne!(history[0].token_id(), history[1].token_id());
}

#[test]
fn test_generate_random() {
    let hsm = hsm();
    let mut out = vec![0u8; 70_000];
    hsm.generate_random(&mut out).unwrap();
    assert_eq!(model(&hsm, |m| m.history().len()), 2);
    assert!(out[65_528..].iter().any(|b| *b != 0));

    model(&hsm, |m| m.fail_nth_token(0, FaultAction::Status(HwError::PANIC)));
    assert_eq!(
        hsm.generate_random(&mut out[..16]),
        Err(PsaError::INSUFFICIENT_ENTROPY)
    );
}
