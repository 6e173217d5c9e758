/*++

Licensed under the Apache-2.0 license.

File Name:

    pk.rs

Abstract:

    File contains the public key token handlers of the model: key pair
    generation and ECDH shared secrets on P-256/P-384, and a reversible
    stand-in for the RSA wrap (asset to buffer) and unwrap (buffer to
    asset) methods.

--*/

use eip130_api::pk::{PkAssetCommand, PkMethod};
use eip130_api::policy::{AsymAlgorithm, AsymUsage, Category, PolicyFlags};
use eip130_api::vector::{parse_vectors, push_vector, VectorHeader, VectorItem};
use eip130_api::{AssetId, CommandToken, DmaMap, HwError};
use p256::elliptic_curve::sec1::ToEncodedPoint;

use crate::{ModelAsset, ModelHsm};

/// Header of a wrapped block: zero, method, big-endian length, label sum.
const WRAP_HEADER: usize = 5;
/// Minimum padding a wrapped block carries, as with PKCS#1.
const WRAP_OVERHEAD: usize = 11;
const WRAP_MASK: u8 = 0x5A;

impl ModelHsm {
    pub(crate) fn pk_with_assets(
        &mut self,
        token: &CommandToken,
        dma: &mut DmaMap<'_>,
    ) -> Result<(), HwError> {
        let cmd = PkAssetCommand::decode(token);
        match cmd.method {
            PkMethod::ECDH_ECDSA_GEN_PRIV_PUB_KEY => self.ecc_key_pair(&cmd, dma),
            PkMethod::ECDH_GEN_SINGLE_SHARED_SECRET => self.ecdh_shared_secret(&cmd),
            PkMethod::RSA_OAEP_WRAP_STRING | PkMethod::RSA_PKCS1V15_WRAP => {
                self.rsa_wrap(&cmd, dma)
            }
            PkMethod::RSA_OAEP_UNWRAP_STRING | PkMethod::RSA_PKCS1V15_UNWRAP => {
                self.rsa_unwrap(&cmd, dma)
            }
            method => {
                log::debug!("[model] unsupported pk method {:#04x}", method.0);
                Err(HwError::INVALID_PARAMETER)
            }
        }
    }

    fn loaded_asset(&self, id: AssetId) -> Result<&ModelAsset, HwError> {
        let asset = self.assets.get(&id.0).ok_or(HwError::INVALID_ASSET)?;
        if asset.data.is_none() {
            return Err(HwError::INVALID_STATE);
        }
        Ok(asset)
    }

    fn vectors(&self, id: AssetId) -> Result<Vec<VectorItem>, HwError> {
        let data = self.loaded_asset(id)?.data.as_deref().unwrap_or_default();
        match parse_vectors(data) {
            Some(items) if !items.is_empty() => Ok(items),
            _ => Err(HwError::INVALID_PARAMETER),
        }
    }

    fn check_key(
        &self,
        id: AssetId,
        usage: AsymUsage,
        algorithms: &[AsymAlgorithm],
    ) -> Result<(), HwError> {
        let policy = self.loaded_asset(id)?.policy;
        let algorithm_ok = policy
            .asym_algorithm()
            .is_some_and(|alg| algorithms.contains(&alg));
        if policy.asym_usage() != Some(usage) || !algorithm_ok {
            return Err(HwError::ACCESS_ERROR);
        }
        Ok(())
    }

    /// Stores `data` into a generic, empty, host-created asset.
    fn store_output(&mut self, id: AssetId, data: Vec<u8>) -> Result<(), HwError> {
        let asset = self.assets.get_mut(&id.0).ok_or(HwError::INVALID_ASSET)?;
        if asset.policy.category() != Category::Generic || asset.provisioned {
            return Err(HwError::ACCESS_ERROR);
        }
        if asset.data.is_some() {
            return Err(HwError::INVALID_STATE);
        }
        if data.len() > asset.capacity {
            return Err(HwError::INVALID_LENGTH);
        }
        asset.data = Some(data);
        Ok(())
    }

    /// Checks that `id` is an empty, host-created ECC key asset.
    fn check_empty_ecc_key(&self, id: AssetId, private: bool) -> Result<(), HwError> {
        let asset = self.assets.get(&id.0).ok_or(HwError::INVALID_ASSET)?;
        let policy = asset.policy;
        let usage_ok = matches!(
            policy.asym_usage(),
            Some(AsymUsage::KeyExchange | AsymUsage::SignVerify)
        );
        let algorithm_ok = matches!(
            policy.asym_algorithm(),
            Some(AsymAlgorithm::Ecdh | AsymAlgorithm::Ecdsa)
        );
        if asset.provisioned
            || !usage_ok
            || !algorithm_ok
            || policy.contains(PolicyFlags::PRIVATE_DATA) != private
        {
            return Err(HwError::ACCESS_ERROR);
        }
        if asset.data.is_some() {
            return Err(HwError::INVALID_STATE);
        }
        Ok(())
    }

    /// Generates a key pair into the private key asset and the public key
    /// asset. The private key vector is also written to the output buffer
    /// when one is given.
    fn ecc_key_pair(&mut self, cmd: &PkAssetCommand, dma: &mut DmaMap<'_>) -> Result<(), HwError> {
        self.check_empty_ecc_key(cmd.key_asset, true)?;
        self.check_empty_ecc_key(cmd.io_asset, false)?;
        if self.loaded_asset(cmd.param_asset)?.policy.asym_usage() != Some(AsymUsage::Parameters) {
            return Err(HwError::ACCESS_ERROR);
        }
        let bits = u32::from(self.vectors(cmd.param_asset)?[0].header.bits);
        if u32::from(cmd.n_words) * 32 != bits {
            return Err(HwError::INVALID_KEYSIZE);
        }

        let (scalar, point) = match bits {
            256 => {
                let sk = p256::SecretKey::random(&mut self.rng);
                let point = sk.public_key().to_encoded_point(false);
                (sk.to_bytes().to_vec(), point.as_bytes().to_vec())
            }
            384 => {
                let sk = p384::SecretKey::random(&mut self.rng);
                let point = sk.public_key().to_encoded_point(false);
                (sk.to_bytes().to_vec(), point.as_bytes().to_vec())
            }
            _ => return Err(HwError::INVALID_KEYSIZE),
        };
        let len = scalar.len();
        let private = key_vector(bits, &[&scalar])?;
        let public = key_vector(bits, &[&point[1..1 + len], &point[1 + len..]])?;

        for (id, data) in [(cmd.key_asset, &private), (cmd.io_asset, &public)] {
            if self.assets.get(&id.0).map_or(0, |a| a.capacity) < data.len() {
                return Err(HwError::INVALID_LENGTH);
            }
        }
        if cmd.output.length != 0 {
            if (cmd.output.length as usize) < private.len() {
                return Err(HwError::INVALID_LENGTH);
            }
            dma.write(cmd.output.address, &private)
                .map_err(|_| HwError::INVALID_ADDRESS)?;
        }
        for (id, data) in [(cmd.key_asset, private), (cmd.io_asset, public)] {
            if let Some(asset) = self.assets.get_mut(&id.0) {
                asset.data = Some(data);
            }
        }
        Ok(())
    }

    fn ecdh_shared_secret(&mut self, cmd: &PkAssetCommand) -> Result<(), HwError> {
        self.check_key(cmd.key_asset, AsymUsage::KeyExchange, &[AsymAlgorithm::Ecdh])?;
        self.check_key(cmd.io_asset, AsymUsage::KeyExchange, &[AsymAlgorithm::Ecdh])?;
        if self.loaded_asset(cmd.param_asset)?.policy.asym_usage() != Some(AsymUsage::Parameters) {
            return Err(HwError::ACCESS_ERROR);
        }
        let secret_asset = match (cmd.save_shared_secret, cmd.additional_asset(0)) {
            (true, Some(id)) => id,
            _ => return Err(HwError::INVALID_PARAMETER),
        };

        let bits = u32::from(self.vectors(cmd.param_asset)?[0].header.bits);
        if u32::from(cmd.n_words) * 32 != bits {
            return Err(HwError::INVALID_KEYSIZE);
        }
        let public = self.vectors(cmd.key_asset)?;
        let private = self.vectors(cmd.io_asset)?;
        if public.len() != 2 || private.len() != 1 {
            return Err(HwError::INVALID_PARAMETER);
        }
        let mut point = vec![0x04];
        point.extend_from_slice(&public[0].value);
        point.extend_from_slice(&public[1].value);
        let scalar = &private[0].value;

        let secret = match bits {
            256 => {
                let pk = p256::PublicKey::from_sec1_bytes(&point)
                    .map_err(|_| HwError::VERIFY_ERROR)?;
                let sk = p256::SecretKey::from_slice(scalar)
                    .map_err(|_| HwError::INVALID_PARAMETER)?;
                p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            384 => {
                let pk = p384::PublicKey::from_sec1_bytes(&point)
                    .map_err(|_| HwError::VERIFY_ERROR)?;
                let sk = p384::SecretKey::from_slice(scalar)
                    .map_err(|_| HwError::INVALID_PARAMETER)?;
                p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            _ => return Err(HwError::INVALID_KEYSIZE),
        };
        self.store_output(secret_asset, secret)
    }

    /// Modulus size in bytes of an RSA key asset.
    fn modulus_bytes(&self, cmd: &PkAssetCommand) -> Result<usize, HwError> {
        let bits = u32::from(self.vectors(cmd.key_asset)?[0].header.bits);
        if u32::from(cmd.n_words) * 32 != bits {
            return Err(HwError::INVALID_KEYSIZE);
        }
        Ok(bits.div_ceil(8) as usize)
    }

    fn rsa_algorithm(method: PkMethod) -> AsymAlgorithm {
        match method {
            PkMethod::RSA_OAEP_WRAP_STRING | PkMethod::RSA_OAEP_UNWRAP_STRING => {
                AsymAlgorithm::RsaOaep
            }
            _ => AsymAlgorithm::RsaPkcs1v15,
        }
    }

    fn rsa_wrap(&mut self, cmd: &PkAssetCommand, dma: &mut DmaMap<'_>) -> Result<(), HwError> {
        self.check_key(
            cmd.key_asset,
            AsymUsage::DecryptEncrypt,
            &[Self::rsa_algorithm(cmd.method)],
        )?;
        let k = self.modulus_bytes(cmd)?;
        let input = self
            .loaded_asset(cmd.io_asset)?
            .data
            .clone()
            .unwrap_or_default();
        let len = input.len();
        if (cmd.output.length as usize) < k || len + WRAP_OVERHEAD > k {
            return Err(HwError::INVALID_LENGTH);
        }

        let mut block = Vec::with_capacity(k);
        block.push(0);
        block.push(cmd.method.0);
        block.extend_from_slice(&(len as u16).to_be_bytes());
        block.push(label_sum(&cmd.additional));
        block.extend(input.iter().map(|b| b ^ WRAP_MASK));
        block.resize(k, 0xFF);
        dma.write(cmd.output.address, &block)
            .map_err(|_| HwError::INVALID_ADDRESS)
    }

    fn rsa_unwrap(&mut self, cmd: &PkAssetCommand, dma: &mut DmaMap<'_>) -> Result<(), HwError> {
        self.check_key(
            cmd.key_asset,
            AsymUsage::DecryptEncrypt,
            &[Self::rsa_algorithm(cmd.method)],
        )?;
        let k = self.modulus_bytes(cmd)?;
        if cmd.input.length as usize != k {
            return Err(HwError::UNWRAP_ERROR);
        }
        let block = dma
            .read(cmd.input.address, k)
            .map_err(|_| HwError::INVALID_ADDRESS)?;

        let wrap_method = match cmd.method {
            PkMethod::RSA_OAEP_UNWRAP_STRING => PkMethod::RSA_OAEP_WRAP_STRING,
            _ => PkMethod::RSA_PKCS1V15_WRAP,
        };
        let len = usize::from(u16::from_be_bytes([block[2], block[3]]));
        if block[0] != 0
            || block[1] != wrap_method.0
            || block[4] != label_sum(&cmd.additional)
            || len + WRAP_OVERHEAD > k
            || block[WRAP_HEADER + len..].iter().any(|b| *b != 0xFF)
        {
            return Err(HwError::UNWRAP_ERROR);
        }
        let plain = block[WRAP_HEADER..WRAP_HEADER + len]
            .iter()
            .map(|b| b ^ WRAP_MASK)
            .collect();
        self.store_output(cmd.io_asset, plain)
    }
}

fn key_vector(bits: u32, values: &[&[u8]]) -> Result<Vec<u8>, HwError> {
    let mut out = Vec::new();
    for (index, value) in values.iter().enumerate() {
        let header = VectorHeader {
            bits: bits as u16,
            index: index as u8,
            items: values.len() as u8,
        };
        push_vector(&mut out, header, value).map_err(|_| HwError::INVALID_PARAMETER)?;
    }
    Ok(out)
}

fn label_sum(label: &[u8]) -> u8 {
    label.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}
