/*++

Licensed under the Apache-2.0 license.

File Name:

    key_agreement.rs

Abstract:

    File contains raw ECDH key agreement on the SECP R1 curves. The shared
    secret is computed into an engine asset and read back as public data.

--*/

use eip130_api::pk::PkAssetCommand;
use eip130_api::vector::word_aligned_bytes;
use eip130_api::{DmaMap, Mailbox};
use eip130_drivers::{result_error, EccCurve, Hsm, Storage};
use eip130_psa_error::{PsaError, PsaResult};
use log::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto_types::{Algorithm, EccFamily, KeyAgreement, KeyUsage};
use crate::key_mgmt::{KeyHalf, KeyId};
use crate::{io_policy, Psa};

impl<M: Mailbox, S: Storage> Psa<M, S> {
    /// Computes the raw shared secret of `key` and the uncompressed SEC1
    /// point `peer`. Returns the secret length, the curve size in bytes.
    ///
    /// On failure `output` is overwritten with random bytes so that a caller
    /// ignoring the status never uses stale or partial key material.
    pub fn raw_key_agreement(
        &mut self,
        alg: Algorithm,
        key: KeyId,
        peer: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        match self.agree(alg, key, peer, output) {
            Ok(length) => Ok(length),
            Err(err) => {
                warn!("[psa] key agreement with key {key:#x} failed: {err}");
                self.fill_random(output);
                Err(err)
            }
        }
    }

    fn agree(
        &mut self,
        alg: Algorithm,
        key: KeyId,
        peer: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        if !alg.is_raw_key_agreement() || peer.is_empty() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let Self {
            hsm,
            storage,
            keys,
            config,
        } = self;
        let hsm: &Hsm<M> = hsm;
        let ctx = keys.lookup(&*storage, config.owner, key)?;
        ctx.check_usage(KeyUsage::DERIVE)?;
        ctx.check_algorithm(alg)?;

        let attributes = ctx.attributes;
        let secret_len = if attributes.key_type.is_ecc() {
            attributes.bits.div_ceil(8) as usize
        } else {
            0
        };
        if output.len() < secret_len {
            return Err(PsaError::BUFFER_TOO_SMALL);
        }
        let agreement = KeyAgreement::from_algorithm(alg)?;
        if !attributes.key_type.is_ecc() || !attributes.key_type.is_key_pair() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        if attributes.key_type.ecc_family() != Some(EccFamily::SECP_R1) {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let curve = EccCurve::secp_r1(attributes.bits).ok_or(PsaError::NOT_SUPPORTED)?;
        let peer_vector = curve.point_vector(peer)?;

        let peer_asset = hsm.allocate_asset(
            ctx.policy.public_counterpart().with_flags(hsm.source_flags()),
            peer_vector.len(),
        )?;
        peer_asset.load_plaintext(&peer_vector)?;
        let domain = hsm.install_curve(curve)?;
        let private = ctx.load(hsm, &*storage, config.owner, KeyHalf::Private)?;
        let secret_size = word_aligned_bytes(curve.bits());
        let secret = hsm.allocate_asset(io_policy(hsm, false), secret_size)?;

        let result = {
            let mut cmd = PkAssetCommand::new(agreement.method());
            let words = curve.bits().div_ceil(32) as u8;
            cmd.n_words = words;
            cmd.m_words = words;
            cmd.key_asset = peer_asset.id();
            cmd.param_asset = domain.id();
            cmd.io_asset = private.id();
            cmd.save_shared_secret = true;
            cmd.push_additional_asset(secret.id());
            hsm.exchange(cmd.encode(), &mut DmaMap::new())?
        };
        if result_error(&result).is_some() {
            return Err(PsaError::CORRUPTION_DETECTED);
        }

        let mut buf = Zeroizing::new(vec![0u8; secret_size]);
        let length = secret.read_public(&mut buf)?;
        if length < secret_len {
            return Err(PsaError::CORRUPTION_DETECTED);
        }
        output[..secret_len].copy_from_slice(&buf[..secret_len]);
        debug!("[psa] {}-bit shared secret from key {key:#x}", curve.bits());
        Ok(secret_len)
    }
}
