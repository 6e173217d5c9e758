/*++

Licensed under the Apache-2.0 license.

File Name:

    asym_encryption.rs

Abstract:

    File contains RSA encryption and decryption (PKCS#1 v1.5 and OAEP)
    through the engine's asset based wrap and unwrap methods.

--*/

use eip130_api::pk::{PkAssetCommand, PkMethod};
use eip130_api::{DmaMap, HwError, Mailbox};
use eip130_drivers::{result_error, Hsm, Storage};
use eip130_psa_error::{PsaError, PsaResult};
use log::debug;

use crate::crypto_types::{Algorithm, AsymmetricCipher, KeyType, KeyUsage};
use crate::key_mgmt::{KeyHalf, KeyId};
use crate::{io_policy, Psa};

/// Checks the arguments every encryption call shares.
fn validate(alg: Algorithm, input: &[u8], salt: Option<&[u8]>) -> PsaResult<AsymmetricCipher> {
    if !alg.is_asymmetric_encryption() || input.is_empty() || salt.is_some_and(<[u8]>::is_empty)
    {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    if salt.is_some_and(|salt| salt.len() > PkAssetCommand::MAX_ADDITIONAL) {
        return Err(PsaError::NOT_SUPPORTED);
    }
    let cipher = AsymmetricCipher::from_algorithm(alg)?;
    if salt.is_some() && !cipher.takes_label() {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    Ok(cipher)
}

fn pk_command(method: PkMethod, bits: u32, salt: Option<&[u8]>) -> PkAssetCommand {
    let mut cmd = PkAssetCommand::new(method);
    let words = bits.div_ceil(32) as u8;
    cmd.n_words = words;
    cmd.m_words = words;
    if let Some(salt) = salt {
        cmd.push_additional_data(salt);
    }
    cmd
}

impl<M: Mailbox, S: Storage> Psa<M, S> {
    /// Encrypts `input` with an RSA public key, or the public half of a key
    /// pair. `salt` is the OAEP label. Returns the ciphertext length, which
    /// is the modulus size.
    pub fn asymmetric_encrypt(
        &mut self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        salt: Option<&[u8]>,
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let Self {
            hsm,
            storage,
            keys,
            config,
        } = self;
        let hsm: &Hsm<M> = hsm;
        let ctx = keys.lookup(&*storage, config.owner, key)?;
        ctx.check_usage(KeyUsage::ENCRYPT)?;

        let attributes = ctx.attributes;
        let modulus_len = if attributes.key_type.is_rsa() {
            attributes.bits.div_ceil(8) as usize
        } else {
            0
        };
        if output.len() < modulus_len {
            return Err(PsaError::BUFFER_TOO_SMALL);
        }
        let cipher = validate(alg, input, salt)?;
        ctx.check_algorithm(alg)?;
        if !attributes.key_type.is_rsa() || input.len() > cipher.max_message_len(modulus_len) {
            return Err(PsaError::INVALID_ARGUMENT);
        }

        let key_asset = ctx.load(hsm, &*storage, config.owner, KeyHalf::Public)?;
        let plain = hsm.allocate_asset(io_policy(hsm, true), input.len())?;
        plain.load_plaintext(input)?;

        let result = {
            let mut dma = DmaMap::new();
            let mut cmd = pk_command(cipher.wrap_method(), attributes.bits, salt);
            cmd.key_asset = key_asset.id();
            cmd.io_asset = plain.id();
            cmd.output = dma.map_output(&mut output[..modulus_len]);
            hsm.exchange(cmd.encode(), &mut dma)?
        };
        if result_error(&result).is_some() {
            return Err(PsaError::CORRUPTION_DETECTED);
        }
        debug!("[psa] encrypted {} bytes with key {key:#x}", input.len());
        Ok(modulus_len)
    }

    /// Decrypts `input` with an RSA key pair. `salt` is the OAEP label.
    /// Returns the plaintext length.
    pub fn asymmetric_decrypt(
        &mut self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        salt: Option<&[u8]>,
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let Self {
            hsm,
            storage,
            keys,
            config,
        } = self;
        let hsm: &Hsm<M> = hsm;
        let ctx = keys.lookup(&*storage, config.owner, key)?;
        ctx.check_usage(KeyUsage::DECRYPT)?;

        let attributes = ctx.attributes;
        let modulus_len = if attributes.key_type.is_rsa() {
            attributes.bits.div_ceil(8) as usize
        } else {
            0
        };
        if modulus_len != 0 && output.is_empty() {
            return Err(PsaError::BUFFER_TOO_SMALL);
        }
        let cipher = validate(alg, input, salt)?;
        ctx.check_algorithm(alg)?;
        if attributes.key_type != KeyType::RSA_KEY_PAIR || input.len() != modulus_len {
            return Err(PsaError::INVALID_ARGUMENT);
        }

        let key_asset = ctx.load(hsm, &*storage, config.owner, KeyHalf::Private)?;
        let plain_size = output.len().min(modulus_len);
        let plain = hsm.allocate_asset(io_policy(hsm, true), plain_size)?;

        let result = {
            let mut dma = DmaMap::new();
            let mut cmd = pk_command(cipher.unwrap_method(), attributes.bits, salt);
            cmd.key_asset = key_asset.id();
            cmd.io_asset = plain.id();
            cmd.input = dma.map_input(input);
            hsm.exchange(cmd.encode(), &mut dma)?
        };
        match result_error(&result) {
            // the plaintext is longer than the output buffer
            Some(HwError::INVALID_LENGTH) => return Err(PsaError::BUFFER_TOO_SMALL),
            Some(_) => return Err(PsaError::CORRUPTION_DETECTED),
            None => {}
        }
        let length = plain.read_public(output)?;
        debug!("[psa] decrypted {length} bytes with key {key:#x}");
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_types::Hash;

    #[test]
    fn test_validate() {
        let oaep = Algorithm::rsa_oaep(Algorithm::SHA_1);
        assert_eq!(
            validate(oaep, b"msg", Some(&b"label"[..])),
            Ok(AsymmetricCipher::RsaOaep(Hash::Sha1))
        );
        assert_eq!(validate(oaep, b"", None), Err(PsaError::INVALID_ARGUMENT));
        assert_eq!(validate(oaep, b"msg", Some(&b""[..])), Err(PsaError::INVALID_ARGUMENT));
        assert_eq!(
            validate(oaep, b"msg", Some(&[1; 209][..])),
            Err(PsaError::NOT_SUPPORTED)
        );
        assert!(validate(oaep, b"msg", Some(&[1; 208][..])).is_ok());
        assert_eq!(
            validate(Algorithm::ECDH, b"msg", None),
            Err(PsaError::INVALID_ARGUMENT)
        );
        assert_eq!(
            validate(Algorithm::RSA_PKCS1V15_CRYPT, b"msg", Some(&b"label"[..])),
            Err(PsaError::INVALID_ARGUMENT)
        );
        assert_eq!(
            validate(Algorithm::rsa_oaep(Algorithm::SHA3_256), b"msg", None),
            Err(PsaError::NOT_SUPPORTED)
        );
    }

    #[test]
    fn test_pk_command_words() {
        let cmd = pk_command(AsymmetricCipher::RsaPkcs1v15.wrap_method(), 2048, None);
        assert_eq!((cmd.n_words, cmd.m_words), (64, 64));
        assert!(cmd.additional.is_empty());
        let cmd = pk_command(
            AsymmetricCipher::RsaOaep(Hash::Sha256).unwrap_method(),
            1024,
            Some(&b"abc"[..]),
        );
        assert_eq!(cmd.n_words, 32);
        assert_eq!(cmd.additional, b"abc");
    }
}
