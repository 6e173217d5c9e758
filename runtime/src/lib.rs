/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the PSA crypto layer over the EIP-130 engine
    and the context that ties the engine, key slots and storage together.

--*/

mod asym_encryption;
pub mod config;
pub mod crypto_types;
mod der;
mod key_agreement;
pub mod key_mgmt;

use std::sync::Arc;

use eip130_api::policy::{Category, PolicyFlags};
use eip130_api::{AssetPolicy, Mailbox};
use eip130_drivers::{Hsm, Storage};
use log::warn;
use rand::rngs::OsRng;
use rand::RngCore;

pub use config::PsaConfig;
pub use crypto_types::{
    Algorithm, AsymmetricCipher, EccFamily, Hash, KeyAgreement, KeyType, KeyUsage, Lifetime,
};
pub use eip130_drivers::MemoryStorage;
pub use eip130_psa_error::{PsaError, PsaResult};
pub use key_mgmt::{KeyAttributes, KeyId};

use key_mgmt::KeyStore;

/// PSA crypto context. Operations take `&mut self`; contexts that share one
/// engine are serialized by its mailbox.
pub struct Psa<M: Mailbox, S: Storage> {
    hsm: Arc<Hsm<M>>,
    storage: S,
    keys: KeyStore,
    config: PsaConfig,
}

impl<M: Mailbox, S: Storage> Psa<M, S> {
    pub fn new(mailbox: M, storage: S, config: PsaConfig) -> Self {
        let hsm = Arc::new(Hsm::new(mailbox, config.mailbox_config()));
        Self::with_hsm(hsm, storage, config)
    }

    /// Context on an engine another context already drives.
    pub fn with_hsm(hsm: Arc<Hsm<M>>, storage: S, config: PsaConfig) -> Self {
        Self {
            hsm,
            storage,
            keys: KeyStore::new(config.key_slots),
            config,
        }
    }

    pub fn hsm(&self) -> &Arc<Hsm<M>> {
        &self.hsm
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Direct access to the backend. Cached persistent keys are not
    /// refreshed; see [`Psa::purge_key`].
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn config(&self) -> &PsaConfig {
        &self.config
    }

    pub fn generate_random(&self, out: &mut [u8]) -> PsaResult<()> {
        self.hsm.generate_random(out)
    }

    /// Overwrites `out` with random bytes, falling back to the OS generator
    /// when the engine cannot deliver.
    fn fill_random(&self, out: &mut [u8]) {
        if let Err(err) = self.hsm.generate_random(out) {
            warn!("[psa] engine random failed ({err}), using OS random");
            OsRng.fill_bytes(out);
        }
    }
}

/// Policy of transient assets holding data the host writes or reads back.
fn io_policy<M: Mailbox>(hsm: &Hsm<M>, exportable: bool) -> AssetPolicy {
    let flags = PolicyFlags::NON_MODIFIABLE | PolicyFlags::NO_DOMAIN | hsm.source_flags();
    let policy = AssetPolicy::base(Category::Generic).with_flags(flags);
    if exportable {
        policy.with_flags(PolicyFlags::EXPORTABLE)
    } else {
        policy
    }
}
