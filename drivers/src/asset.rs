/*++

Licensed under the Apache-2.0 license.

File Name:

    asset.rs

Abstract:

    File contains the asset lifecycle operations (create, load, read, delete)
    and the owning asset handle that deletes its asset when dropped.

--*/

use core::mem::ManuallyDrop;

use eip130_api::asset::{
    AssetCreate, AssetCreateResult, AssetDelete, AssetLoad, AssetSearch, AssetSearchResult,
    PublicDataRead, PublicDataReadResult, ASSET_MAX_SIZE,
};
use eip130_api::{AssetId, AssetPolicy, DmaMap, HwError, Mailbox};
use eip130_psa_error::{PsaError, PsaResult};
use log::{debug, warn};

use crate::hsm::{result_error, Hsm};

/// Engine asset owned by the caller. Dropping it deletes the asset.
pub struct Asset<'h, M: Mailbox> {
    hsm: &'h Hsm<M>,
    id: AssetId,
    policy: AssetPolicy,
    capacity: usize,
}

impl<M: Mailbox> core::fmt::Debug for Asset<'_, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<'h, M: Mailbox> Asset<'h, M> {
    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn policy(&self) -> AssetPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Loads `data` as the asset content.
    pub fn load_plaintext(&self, data: &[u8]) -> PsaResult<()> {
        if data.len() > self.capacity {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        self.hsm.load_plaintext(self.id, data)
    }

    /// Copies the asset content into `out`; see [`Hsm::read_public`].
    pub fn read_public(&self, out: &mut [u8]) -> PsaResult<usize> {
        self.hsm.read_public(self.id, out)
    }

    /// Deletes the asset now and reports the outcome.
    pub fn free(self) -> PsaResult<()> {
        let this = ManuallyDrop::new(self);
        this.hsm.free_asset(this.id)
    }

    /// Gives up ownership without deleting the asset.
    pub fn into_raw(self) -> AssetId {
        ManuallyDrop::new(self).id
    }
}

impl<M: Mailbox> Drop for Asset<'_, M> {
    fn drop(&mut self) {
        if let Err(err) = self.hsm.free_asset(self.id) {
            warn!("[asset] delete of {:?} failed: {}", self.id, err);
        }
    }
}

impl<M: Mailbox> Hsm<M> {
    /// Creates an asset of `size` bytes under `policy`.
    pub fn allocate_asset(&self, policy: AssetPolicy, size: usize) -> PsaResult<Asset<'_, M>> {
        if size == 0 || size > ASSET_MAX_SIZE as usize {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let token = AssetCreate {
            policy,
            size: size as u32,
        }
        .encode();
        let result = self.exchange(token, &mut DmaMap::new())?;
        if let Some(err) = result_error(&result) {
            return Err(match err {
                HwError::FULL_ERROR => PsaError::INSUFFICIENT_RESOURCES,
                _ => PsaError::CORRUPTION_DETECTED,
            });
        }
        let id = AssetCreateResult::decode(&result).asset_id;
        debug!("[asset] created {:?} ({} bytes, {:?})", id, size, policy);
        Ok(Asset {
            hsm: self,
            id,
            policy,
            capacity: size,
        })
    }

    /// Deletes an asset by id. Prefer dropping the owning [`Asset`].
    pub fn free_asset(&self, id: AssetId) -> PsaResult<()> {
        let result = self.exchange(AssetDelete { asset_id: id }.encode(), &mut DmaMap::new())?;
        match result_error(&result) {
            Some(_) => Err(PsaError::CORRUPTION_DETECTED),
            None => {
                debug!("[asset] deleted {:?}", id);
                Ok(())
            }
        }
    }

    /// Loads `data` into an allocated asset.
    pub fn load_plaintext(&self, id: AssetId, data: &[u8]) -> PsaResult<()> {
        if data.is_empty() || data.len() > ASSET_MAX_SIZE as usize {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let result = {
            let mut dma = DmaMap::new();
            let input = dma.map_input(data);
            self.exchange(AssetLoad::plaintext(id, input).encode(), &mut dma)?
        };
        match result_error(&result) {
            Some(HwError::INVALID_LENGTH) => Err(PsaError::INVALID_ARGUMENT),
            Some(_) => Err(PsaError::CORRUPTION_DETECTED),
            None => Ok(()),
        }
    }

    /// Copies a public data asset into `out` and zero-fills the remainder.
    /// Returns the number of bytes the engine wrote.
    pub fn read_public(&self, id: AssetId, out: &mut [u8]) -> PsaResult<usize> {
        let result = {
            let mut dma = DmaMap::new();
            let output = dma.map_output(out);
            self.exchange(PublicDataRead { asset_id: id, output }.encode(), &mut dma)?
        };
        match result_error(&result) {
            Some(HwError::ACCESS_ERROR) => return Err(PsaError::NOT_PERMITTED),
            Some(HwError::INVALID_LENGTH) => return Err(PsaError::BUFFER_TOO_SMALL),
            Some(_) => return Err(PsaError::CORRUPTION_DETECTED),
            None => {}
        }
        let length = PublicDataReadResult::decode(&result).length as usize;
        if length > out.len() {
            return Err(PsaError::CORRUPTION_DETECTED);
        }
        out[length..].fill(0);
        Ok(length)
    }

    /// Looks up a statically provisioned asset. Returns its id and size.
    pub fn search_asset(&self, number: u8) -> PsaResult<(AssetId, usize)> {
        let result = self.exchange(AssetSearch { number }.encode(), &mut DmaMap::new())?;
        match result_error(&result) {
            Some(HwError::INVALID_ASSET) | Some(HwError::INVALID_LOCATION) => {
                Err(PsaError::DOES_NOT_EXIST)
            }
            Some(_) => Err(PsaError::CORRUPTION_DETECTED),
            None => {
                let found = AssetSearchResult::decode(&result);
                Ok((found.asset_id, found.length as usize))
            }
        }
    }
}
