/*++

Licensed under the Apache-2.0 license.

File Name:

    key_mgmt.rs

Abstract:

    File contains the key slots of a PSA context, key import, generation,
    copy, destruction and export, the persistent key path through storage,
    and the loading of a key into an engine asset for the duration of one
    operation.

--*/

use eip130_api::asset::ASSET_MAX_SIZE;
use eip130_api::pk::{PkAssetCommand, PkMethod};
use eip130_api::policy::PolicyFlags;
use eip130_api::vector::{parse_vectors, push_vector, vector_size, VectorHeader};
use eip130_api::{AssetId, AssetPolicy, DmaMap, Mailbox};
use eip130_drivers::storage::{load_key, remove_key, save_key, storage_uid};
use eip130_drivers::{
    result_error, Asset, EccCurve, Hsm, KeyRecord, RecordAttributes, Storage,
};
use eip130_psa_error::{PsaError, PsaResult};
use log::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto_types::{
    Algorithm, AsymmetricCipher, EccFamily, KeyAgreement, KeyType, KeyUsage, Lifetime,
};
use crate::der;
use crate::Psa;

pub type KeyId = u32;

pub const KEY_ID_USER_MIN: KeyId = 0x0000_0001;
pub const KEY_ID_USER_MAX: KeyId = 0x3FFF_FFFF;
/// Volatile keys get `KEY_ID_VOLATILE_MIN + slot`.
pub const KEY_ID_VOLATILE_MIN: KeyId = 0x7FFF_0000;

fn is_user_id(id: KeyId) -> bool {
    (KEY_ID_USER_MIN..=KEY_ID_USER_MAX).contains(&id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyAttributes {
    /// Requested id of a persistent key; assigned for volatile keys.
    pub id: KeyId,
    pub lifetime: Lifetime,
    pub key_type: KeyType,
    /// Zero lets import derive the size from the key data.
    pub bits: u32,
    pub usage: KeyUsage,
    pub alg: Algorithm,
    pub alg2: Algorithm,
}

impl KeyAttributes {
    /// Whether the key policy allows `alg`.
    pub fn permits(&self, alg: Algorithm) -> bool {
        alg != Algorithm::NONE && (self.alg == alg || self.alg2 == alg)
    }

    fn to_record(self) -> PsaResult<RecordAttributes> {
        Ok(RecordAttributes {
            lifetime: self.lifetime.0,
            key_type: self.key_type.0,
            bits: u16::try_from(self.bits).map_err(|_| PsaError::INVALID_ARGUMENT)?,
            usage: self.usage.bits(),
            alg: self.alg.0,
            alg2: self.alg2.0,
        })
    }

    fn from_record(id: KeyId, record: &RecordAttributes) -> Self {
        Self {
            id,
            lifetime: Lifetime(record.lifetime),
            key_type: KeyType(record.key_type),
            bits: u32::from(record.bits),
            usage: KeyUsage::from_bits_retain(record.usage),
            alg: Algorithm(record.alg),
            alg2: Algorithm(record.alg2),
        }
    }
}

/// Which half of an asymmetric key an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyHalf {
    Private,
    Public,
}

/// A key known to the context.
pub(crate) struct KeyContext {
    pub(crate) attributes: KeyAttributes,
    pub(crate) policy: AssetPolicy,
    /// Stored form of the key. `None` for persistent keys, which are read
    /// from storage on every load, and for provisioned keys.
    data: Option<Zeroizing<Vec<u8>>>,
    key_size: usize,
    /// Engine asset of a provisioned key. Never freed by the host.
    resident: Option<AssetId>,
}

/// Engine asset holding a key for one operation.
pub(crate) enum LoadedKey<'h, M: Mailbox> {
    Resident(AssetId),
    Loaded(Asset<'h, M>),
}

impl<M: Mailbox> LoadedKey<'_, M> {
    pub(crate) fn id(&self) -> AssetId {
        match self {
            Self::Resident(id) => *id,
            Self::Loaded(asset) => asset.id(),
        }
    }
}

fn read_record(storage: &impl Storage, owner: u32, id: KeyId) -> PsaResult<KeyRecord> {
    load_key(storage, storage_uid(owner, id)).map_err(|err| match err {
        PsaError::DOES_NOT_EXIST => PsaError::INVALID_HANDLE,
        err => err,
    })
}

impl KeyContext {
    fn persistent(id: KeyId, record: &KeyRecord) -> Self {
        Self {
            attributes: KeyAttributes::from_record(id, &record.attributes),
            policy: record.policy,
            data: None,
            key_size: record.data.len(),
            resident: None,
        }
    }

    pub(crate) fn check_usage(&self, usage: KeyUsage) -> PsaResult<()> {
        if !self.attributes.usage.contains(usage) {
            return Err(PsaError::NOT_PERMITTED);
        }
        Ok(())
    }

    pub(crate) fn check_algorithm(&self, alg: Algorithm) -> PsaResult<()> {
        if !self.attributes.permits(alg) {
            return Err(PsaError::NOT_PERMITTED);
        }
        Ok(())
    }

    fn public_half(&self, half: KeyHalf) -> bool {
        half == KeyHalf::Public && self.attributes.key_type.is_key_pair()
    }

    /// The key as stored: in the slot, or in its persistent record.
    fn stored(&self, storage: &impl Storage, owner: u32) -> PsaResult<Zeroizing<Vec<u8>>> {
        if self.resident.is_some() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        if let Some(data) = &self.data {
            return Ok(data.clone());
        }
        let record = read_record(storage, owner, self.attributes.id)?;
        if record.data.len() != self.key_size {
            warn!(
                "[psa] key {:#x}: stored size {} does not match {}",
                self.attributes.id,
                record.data.len(),
                self.key_size
            );
            return Err(PsaError::CORRUPTION_DETECTED);
        }
        Ok(record.data)
    }

    /// Engine vector of the requested half. Both halves of an RSA key pair
    /// are cut from the one stored vector.
    fn material(
        &self,
        storage: &impl Storage,
        owner: u32,
        half: KeyHalf,
    ) -> PsaResult<Zeroizing<Vec<u8>>> {
        let stored = self.stored(storage, owner)?;
        if self.attributes.key_type == KeyType::RSA_KEY_PAIR {
            let integers = rsa_pair_integers(&stored)?;
            let exponent = match half {
                KeyHalf::Private => &integers[2],
                KeyHalf::Public => &integers[1],
            };
            return rsa_vector(
                self.attributes.bits,
                &[integers[0].as_slice(), exponent.as_slice()],
            );
        }
        if self.public_half(half) {
            return Err(PsaError::NOT_SUPPORTED);
        }
        Ok(stored)
    }

    /// Makes the key available to the engine. Keys the host loaded are
    /// deleted again when the returned handle is dropped.
    pub(crate) fn load<'h, M: Mailbox>(
        &self,
        hsm: &'h Hsm<M>,
        storage: &impl Storage,
        owner: u32,
        half: KeyHalf,
    ) -> PsaResult<LoadedKey<'h, M>> {
        if let Some(id) = self.resident {
            if self.public_half(half) {
                return Err(PsaError::NOT_SUPPORTED);
            }
            return Ok(LoadedKey::Resident(id));
        }
        let material = self.material(storage, owner, half)?;
        let policy = if self.public_half(half) {
            self.policy.public_counterpart()
        } else {
            self.policy
        };
        let asset = hsm.allocate_asset(policy.with_flags(hsm.source_flags()), material.len())?;
        asset.load_plaintext(&material)?;
        Ok(LoadedKey::Loaded(asset))
    }
}

/// Fixed set of key slots shared by volatile keys and cached persistent keys.
pub(crate) struct KeyStore {
    slots: Vec<Option<KeyContext>>,
}

impl KeyStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    fn position(&self, id: KeyId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|ctx| ctx.attributes.id == id))
    }

    fn free_slot(&self) -> PsaResult<usize> {
        self.slots
            .iter()
            .position(Option::is_none)
            .ok_or(PsaError::INSUFFICIENT_MEMORY)
    }

    fn insert_volatile(&mut self, mut ctx: KeyContext) -> PsaResult<KeyId> {
        let index = self.free_slot()?;
        let id = KEY_ID_VOLATILE_MIN + index as KeyId;
        ctx.attributes.id = id;
        self.slots[index] = Some(ctx);
        Ok(id)
    }

    fn remove(&mut self, id: KeyId) -> Option<KeyContext> {
        let index = self.position(id)?;
        self.slots[index].take()
    }

    /// Finds a key, reading a persistent key's attributes from storage on
    /// first use.
    pub(crate) fn lookup(
        &mut self,
        storage: &impl Storage,
        owner: u32,
        id: KeyId,
    ) -> PsaResult<&KeyContext> {
        let index = match self.position(id) {
            Some(index) => index,
            None => {
                if !is_user_id(id) {
                    return Err(PsaError::INVALID_HANDLE);
                }
                let record = read_record(storage, owner, id)?;
                let index = self.free_slot()?;
                self.slots[index] = Some(KeyContext::persistent(id, &record));
                debug!("[psa] cached persistent key {id:#x}");
                index
            }
        };
        self.slots[index].as_ref().ok_or(PsaError::INVALID_HANDLE)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Asset policy of a key, without the source flag.
fn key_policy(attributes: &KeyAttributes) -> PsaResult<AssetPolicy> {
    let key_type = attributes.key_type;
    let policy = if key_type.is_rsa() {
        let cipher =
            AsymmetricCipher::from_algorithm(attributes.alg).map_err(|_| PsaError::NOT_SUPPORTED)?;
        AssetPolicy::ASYM_DECRYPT_ENCRYPT
            .with_algorithm(cipher.policy_algorithm())
            .with_hash(cipher.policy_hash())
    } else if key_type.is_ecc() {
        if !attributes.alg.is_raw_key_agreement() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let agreement = KeyAgreement::from_algorithm(attributes.alg)?;
        AssetPolicy::ASYM_KEY_EXCHANGE.with_algorithm(agreement.policy_algorithm())
    } else {
        return Err(PsaError::NOT_SUPPORTED);
    };
    Ok(if key_type.is_key_pair() {
        policy.with_flags(PolicyFlags::PRIVATE_DATA).with_store_any()
    } else {
        policy
    })
}

/// Key in engine vector form.
struct Material {
    data: Zeroizing<Vec<u8>>,
    bits: u32,
}

/// n, e, d and the five CRT values.
const RSA_PAIR_ITEMS: usize = 8;

fn rsa_bits(modulus: &[u8], requested: u32) -> PsaResult<u32> {
    let bits = der::bit_length(modulus);
    if bits == 0 || (requested != 0 && requested != bits) {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    if bits % 32 != 0 || 2 * vector_size(bits) > ASSET_MAX_SIZE as usize {
        return Err(PsaError::NOT_SUPPORTED);
    }
    Ok(bits)
}

/// RSA integers as one vector, each item the size of the modulus.
fn rsa_vector(bits: u32, values: &[&[u8]]) -> PsaResult<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(Vec::with_capacity(values.len() * vector_size(bits)));
    for (index, value) in values.iter().enumerate() {
        let header = VectorHeader {
            bits: bits as u16,
            index: index as u8,
            items: values.len() as u8,
        };
        push_vector(&mut out, header, value)?;
    }
    Ok(out)
}

/// Big-endian integers of a stored RSA key pair, in DER order.
fn rsa_pair_integers(stored: &[u8]) -> PsaResult<Zeroizing<Vec<Vec<u8>>>> {
    let items = parse_vectors(stored)
        .filter(|items| items.len() == RSA_PAIR_ITEMS)
        .ok_or(PsaError::CORRUPTION_DETECTED)?;
    Ok(Zeroizing::new(
        items.into_iter().map(|item| item.value).collect(),
    ))
}

/// Single-item vector of an ECC private scalar.
fn ecc_scalar(stored: &[u8]) -> PsaResult<Zeroizing<Vec<u8>>> {
    let mut items = parse_vectors(stored)
        .filter(|items| items.len() == 1)
        .ok_or(PsaError::CORRUPTION_DETECTED)?;
    Ok(Zeroizing::new(core::mem::take(&mut items[0].value)))
}

fn import_material(attributes: &KeyAttributes, data: &[u8]) -> PsaResult<Material> {
    let key_type = attributes.key_type;
    if key_type == KeyType::RSA_PUBLIC_KEY {
        let key = der::parse_rsa_public_key(data)?;
        let bits = rsa_bits(key.modulus, attributes.bits)?;
        return Ok(Material {
            data: rsa_vector(bits, &[key.modulus, key.public_exponent])?,
            bits,
        });
    }
    if key_type == KeyType::RSA_KEY_PAIR {
        let key = der::parse_rsa_private_key(data)?;
        let bits = rsa_bits(key.modulus, attributes.bits)?;
        return Ok(Material {
            data: rsa_vector(bits, &key.integers())?,
            bits,
        });
    }
    let family = key_type.ecc_family().ok_or(PsaError::NOT_SUPPORTED)?;
    if family != EccFamily::SECP_R1 {
        return Err(PsaError::NOT_SUPPORTED);
    }
    let implied_bytes = if key_type.is_key_pair() {
        data.len()
    } else {
        data.len().saturating_sub(1) / 2
    };
    let implied = (implied_bytes * 8) as u32;
    let bits = if attributes.bits == 0 {
        implied
    } else {
        attributes.bits
    };
    let curve = EccCurve::secp_r1(bits).ok_or(PsaError::NOT_SUPPORTED)?;
    if bits != implied {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    let vector = if key_type.is_key_pair() {
        curve.scalar_vector(data)?
    } else {
        curve.point_vector(data)?
    };
    Ok(Material {
        data: Zeroizing::new(vector),
        bits,
    })
}

/// Rejects lifetimes and ids a new key cannot take.
fn check_destination(attributes: &KeyAttributes) -> PsaResult<()> {
    if attributes.lifetime.location() != Lifetime::LOCATION_LOCAL_STORAGE {
        return Err(PsaError::NOT_SUPPORTED);
    }
    if !attributes.lifetime.is_volatile() && !is_user_id(attributes.id) {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    Ok(())
}

/// Has the engine generate a key pair on `curve` and returns the private
/// scalar vector it hands back. All three assets are gone on return.
fn generate_ecc_pair<M: Mailbox>(
    hsm: &Hsm<M>,
    curve: EccCurve,
    policy: AssetPolicy,
) -> PsaResult<Zeroizing<Vec<u8>>> {
    let domain = hsm.install_curve(curve)?;
    let private = hsm.allocate_asset(
        policy.with_flags(hsm.source_flags()),
        curve.scalar_vector_size(),
    )?;
    let public = hsm.allocate_asset(
        policy.public_counterpart().with_flags(hsm.source_flags()),
        curve.point_vector_size(),
    )?;

    let mut scalar = Zeroizing::new(vec![0u8; curve.scalar_vector_size()]);
    let result = {
        let mut dma = DmaMap::new();
        let mut cmd = PkAssetCommand::new(PkMethod::ECDH_ECDSA_GEN_PRIV_PUB_KEY);
        let words = curve.bits().div_ceil(32) as u8;
        cmd.n_words = words;
        cmd.m_words = words;
        cmd.key_asset = private.id();
        cmd.param_asset = domain.id();
        cmd.io_asset = public.id();
        cmd.output = dma.map_output(&mut scalar[..]);
        hsm.exchange(cmd.encode(), &mut dma)?
    };
    if result_error(&result).is_some() {
        return Err(PsaError::CORRUPTION_DETECTED);
    }
    let header = VectorHeader {
        bits: curve.bits() as u16,
        index: 0,
        items: 1,
    };
    if scalar[..4] != header.to_word().to_le_bytes() {
        warn!("[psa] generated key does not have the {}-bit layout", curve.bits());
        return Err(PsaError::CORRUPTION_DETECTED);
    }
    Ok(scalar)
}

fn write_out(out: &mut [u8], encoded: &[u8]) -> PsaResult<usize> {
    let out = out
        .get_mut(..encoded.len())
        .ok_or(PsaError::BUFFER_TOO_SMALL)?;
    out.copy_from_slice(encoded);
    Ok(encoded.len())
}

impl<M: Mailbox, S: Storage> Psa<M, S> {
    /// Imports a key. RSA keys are PKCS#1 DER, ECC public keys uncompressed
    /// SEC1 points and ECC private keys big-endian scalars.
    ///
    /// Volatile keys get an id from the slot they occupy. Persistent keys
    /// are written to storage under `attributes.id` and loaded on first use.
    pub fn import_key(&mut self, attributes: &KeyAttributes, data: &[u8]) -> PsaResult<KeyId> {
        if data.is_empty() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        check_destination(attributes)?;
        let material = import_material(attributes, data)?;
        let policy = key_policy(attributes)?;
        let attributes = KeyAttributes {
            bits: material.bits,
            ..*attributes
        };
        let id = self.insert_key(attributes, policy, material.data)?;
        debug!("[psa] imported key {id:#x} ({} bits)", attributes.bits);
        Ok(id)
    }

    /// Generates an ECC key pair on P-256 or P-384. `attributes.bits`
    /// selects the curve; the engine computes the key and returns its
    /// private scalar, which is kept like an imported one.
    pub fn generate_key(&mut self, attributes: &KeyAttributes) -> PsaResult<KeyId> {
        check_destination(attributes)?;
        let key_type = attributes.key_type;
        if !key_type.is_ecc()
            || !key_type.is_key_pair()
            || key_type.ecc_family() != Some(EccFamily::SECP_R1)
        {
            return Err(PsaError::NOT_SUPPORTED);
        }
        if attributes.bits == 0 {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let curve = EccCurve::secp_r1(attributes.bits).ok_or(PsaError::NOT_SUPPORTED)?;
        let policy = key_policy(attributes)?;
        // no engine work for a key that has nowhere to go
        if attributes.lifetime.is_volatile() {
            self.keys.free_slot()?;
        } else if self.keys.position(attributes.id).is_some()
            || self
                .storage
                .get_info(storage_uid(self.config.owner, attributes.id))
                .is_ok()
        {
            return Err(PsaError::ALREADY_EXISTS);
        }

        let scalar = generate_ecc_pair(&*self.hsm, curve, policy)?;
        let id = self.insert_key(*attributes, policy, scalar)?;
        info!("[psa] generated {}-bit key {id:#x}", curve.bits());
        Ok(id)
    }

    /// Copies a key under new attributes. The source needs the `COPY`
    /// usage. The copy keeps the source type, size and algorithms and gets
    /// the usage both sides allow; other values in `attributes` must be
    /// zero or match.
    pub fn copy_key(&mut self, source: KeyId, attributes: &KeyAttributes) -> PsaResult<KeyId> {
        check_destination(attributes)?;
        let Self {
            storage,
            keys,
            config,
            ..
        } = self;
        let ctx = keys.lookup(&*storage, config.owner, source)?;
        ctx.check_usage(KeyUsage::COPY)?;
        let from = ctx.attributes;
        let conflicts = (attributes.key_type != KeyType::NONE
            && attributes.key_type != from.key_type)
            || (attributes.bits != 0 && attributes.bits != from.bits)
            || (attributes.alg != Algorithm::NONE && attributes.alg != from.alg)
            || (attributes.alg2 != Algorithm::NONE && attributes.alg2 != from.alg2);
        if conflicts {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let policy = ctx.policy;
        let data = ctx.stored(&*storage, config.owner)?;
        let attributes = KeyAttributes {
            key_type: from.key_type,
            bits: from.bits,
            usage: attributes.usage & from.usage,
            alg: from.alg,
            alg2: from.alg2,
            ..*attributes
        };
        let id = self.insert_key(attributes, policy, data)?;
        debug!("[psa] copied key {source:#x} to {id:#x}");
        Ok(id)
    }

    /// Puts a new key in a free slot, or in storage for persistent keys.
    fn insert_key(
        &mut self,
        attributes: KeyAttributes,
        policy: AssetPolicy,
        data: Zeroizing<Vec<u8>>,
    ) -> PsaResult<KeyId> {
        if attributes.lifetime.is_volatile() {
            return self.keys.insert_volatile(KeyContext {
                attributes,
                policy,
                key_size: data.len(),
                data: Some(data),
                resident: None,
            });
        }
        let id = attributes.id;
        if self.keys.position(id).is_some() {
            return Err(PsaError::ALREADY_EXISTS);
        }
        let record = KeyRecord {
            attributes: attributes.to_record()?,
            policy,
            data,
            data2: None,
        };
        save_key(&mut self.storage, storage_uid(self.config.owner, id), &record)?;
        info!("[psa] stored persistent key {id:#x}");
        Ok(id)
    }

    /// Makes a key the engine already holds usable through a key id. The
    /// asset is found by its static asset number and is never deleted.
    pub fn register_provisioned_key(
        &mut self,
        number: u8,
        attributes: &KeyAttributes,
    ) -> PsaResult<KeyId> {
        if attributes.bits == 0 {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let policy = key_policy(attributes)?;
        let (asset_id, size) = self.hsm.search_asset(number)?;
        let id = self.keys.insert_volatile(KeyContext {
            attributes: KeyAttributes {
                lifetime: Lifetime::VOLATILE,
                ..*attributes
            },
            policy,
            data: None,
            key_size: size,
            resident: Some(asset_id),
        })?;
        debug!("[psa] key {id:#x} bound to static asset {number:#04x}");
        Ok(id)
    }

    /// Forgets a key. Persistent keys are also removed from storage.
    pub fn destroy_key(&mut self, id: KeyId) -> PsaResult<()> {
        match self.keys.remove(id) {
            Some(ctx) if ctx.attributes.lifetime.is_volatile() => Ok(()),
            _ if is_user_id(id) => {
                remove_key(&mut self.storage, storage_uid(self.config.owner, id)).map_err(
                    |err| match err {
                        PsaError::DOES_NOT_EXIST => PsaError::INVALID_HANDLE,
                        err => err,
                    },
                )?;
                info!("[psa] removed persistent key {id:#x}");
                Ok(())
            }
            _ => Err(PsaError::INVALID_HANDLE),
        }
    }

    /// Drops the cached copy of a persistent key. Volatile keys stay.
    pub fn purge_key(&mut self, id: KeyId) -> PsaResult<()> {
        if self.keys.position(id).is_some() {
            if is_user_id(id) {
                self.keys.remove(id);
            }
            return Ok(());
        }
        if is_user_id(id)
            && self
                .storage
                .get_info(storage_uid(self.config.owner, id))
                .is_ok()
        {
            return Ok(());
        }
        Err(PsaError::INVALID_HANDLE)
    }

    pub fn get_key_attributes(&mut self, id: KeyId) -> PsaResult<KeyAttributes> {
        let Self {
            storage,
            keys,
            config,
            ..
        } = self;
        Ok(keys.lookup(&*storage, config.owner, id)?.attributes)
    }

    /// Writes the public key: an RSAPublicKey for RSA keys, an uncompressed
    /// point for ECC public keys. The public point of an ECC key pair is not
    /// kept, so those report `NOT_SUPPORTED`.
    pub fn export_public_key(&mut self, id: KeyId, out: &mut [u8]) -> PsaResult<usize> {
        let Self {
            storage,
            keys,
            config,
            ..
        } = self;
        let ctx = keys.lookup(&*storage, config.owner, id)?;
        let key_type = ctx.attributes.key_type;
        if !key_type.is_rsa() && !key_type.is_ecc() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        if key_type.is_ecc() && key_type.is_key_pair() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let vector = ctx.material(&*storage, config.owner, KeyHalf::Public)?;
        let items = parse_vectors(&vector)
            .filter(|items| items.len() == 2)
            .ok_or(PsaError::CORRUPTION_DETECTED)?;
        let encoded = if key_type.is_rsa() {
            der::encode_rsa_public_key(&items[0].value, &items[1].value)
        } else {
            let mut point = Vec::with_capacity(1 + 2 * items[0].value.len());
            point.push(0x04);
            point.extend_from_slice(&items[0].value);
            point.extend_from_slice(&items[1].value);
            point
        };
        write_out(out, &encoded)
    }

    /// Writes the key in the format [`Psa::import_key`] takes: an
    /// RSAPrivateKey for RSA key pairs, the big-endian scalar for ECC key
    /// pairs, and the public key for public keys. Needs the `EXPORT` usage.
    pub fn export_key(&mut self, id: KeyId, out: &mut [u8]) -> PsaResult<usize> {
        let Self {
            storage,
            keys,
            config,
            ..
        } = self;
        let ctx = keys.lookup(&*storage, config.owner, id)?;
        ctx.check_usage(KeyUsage::EXPORT)?;
        let key_type = ctx.attributes.key_type;
        if !key_type.is_key_pair() {
            return self.export_public_key(id, out);
        }
        let stored = ctx.stored(&*storage, config.owner)?;
        let encoded = if key_type == KeyType::RSA_KEY_PAIR {
            let integers = rsa_pair_integers(&stored)?;
            let key = der::RsaPrivateKey {
                modulus: integers[0].as_slice(),
                public_exponent: integers[1].as_slice(),
                private_exponent: integers[2].as_slice(),
                crt: [
                    integers[3].as_slice(),
                    integers[4].as_slice(),
                    integers[5].as_slice(),
                    integers[6].as_slice(),
                    integers[7].as_slice(),
                ],
            };
            der::encode_rsa_private_key(&key)
        } else if key_type.is_ecc() {
            ecc_scalar(&stored)?
        } else {
            return Err(PsaError::NOT_SUPPORTED);
        };
        write_out(out, &encoded)
    }

    /// Keys currently held in the context's slots.
    pub fn loaded_keys(&self) -> usize {
        self.keys.len()
    }
}
