// Licensed under the Apache-2.0 license

use eip130_api::asset::{
    AssetCreate, AssetCreateResult, AssetDelete, AssetLoad, AssetLoadResult, AssetSearch,
    AssetSearchResult, LoadMode, PublicDataRead, PublicDataReadResult,
};
use eip130_api::random::RandomNumber;
use eip130_api::{CommandToken, DmaMap, HwError, Opcode, ResultToken, Subcode};
use rand::RngCore;

use crate::{ModelAsset, ModelHsm};

impl ModelHsm {
    /// Runs one token against the model state.
    pub(crate) fn execute(
        &mut self,
        token: &CommandToken,
        dma: &mut DmaMap<'_>,
        result: &mut ResultToken,
    ) -> Result<(), HwError> {
        match (token.opcode(), token.subcode()) {
            (Opcode::ASSET_MANAGEMENT, Subcode::ASSET_SEARCH) => self.asset_search(token, result),
            (Opcode::ASSET_MANAGEMENT, Subcode::ASSET_CREATE) => self.asset_create(token, result),
            (Opcode::ASSET_MANAGEMENT, Subcode::ASSET_DELETE) => self.asset_delete(token),
            (Opcode::ASSET_MANAGEMENT, Subcode::ASSET_LOAD) => self.asset_load(token, dma, result),
            (Opcode::ASSET_MANAGEMENT, Subcode::PUBLIC_DATA) => {
                self.public_data(token, dma, result)
            }
            (Opcode::TRNG, Subcode::RANDOM_NUMBER) => self.random_number(token, dma),
            (Opcode::PUBLIC_KEY, Subcode::PK_WITH_ASSETS) => self.pk_with_assets(token, dma),
            (opcode, subcode) => {
                log::debug!("[model] unsupported token {}/{}", opcode.0, subcode.0);
                Err(HwError::INVALID_TOKEN)
            }
        }
    }

    fn asset_search(&mut self, token: &CommandToken, result: &mut ResultToken) -> Result<(), HwError> {
        let search = AssetSearch::decode(token);
        let id = *self
            .static_assets
            .get(&search.number)
            .ok_or(HwError::INVALID_ASSET)?;
        let length = self.assets.get(&id).map_or(0, |a| a.capacity) as u32;
        AssetSearchResult {
            asset_id: eip130_api::AssetId(id),
            length,
        }
        .encode(result);
        Ok(())
    }

    fn asset_create(&mut self, token: &CommandToken, result: &mut ResultToken) -> Result<(), HwError> {
        let create = AssetCreate::decode(token);
        if create.size == 0 {
            return Err(HwError::INVALID_LENGTH);
        }
        if self.assets.len() >= self.params.max_assets {
            return Err(HwError::FULL_ERROR);
        }
        let asset_id = self.insert_asset(ModelAsset {
            policy: create.policy,
            capacity: create.size as usize,
            data: None,
            provisioned: false,
        });
        self.stats.assets_created += 1;
        AssetCreateResult { asset_id }.encode(result);
        Ok(())
    }

    fn asset_delete(&mut self, token: &CommandToken) -> Result<(), HwError> {
        let id = AssetDelete::decode(token).asset_id;
        match self.assets.get(&id.0) {
            Some(asset) if !asset.provisioned => {
                self.assets.remove(&id.0);
                self.stats.assets_deleted += 1;
                Ok(())
            }
            _ => Err(HwError::INVALID_ASSET),
        }
    }

    fn asset_load(
        &mut self,
        token: &CommandToken,
        dma: &mut DmaMap<'_>,
        result: &mut ResultToken,
    ) -> Result<(), HwError> {
        let load = AssetLoad::decode(token).ok_or(HwError::INVALID_PARAMETER)?;
        if load.mode != LoadMode::Plaintext {
            return Err(HwError::INVALID_PARAMETER);
        }
        let asset = self
            .assets
            .get_mut(&load.asset_id.0)
            .ok_or(HwError::INVALID_ASSET)?;
        if asset.data.is_some() {
            return Err(HwError::INVALID_STATE);
        }
        let length = load.input.length as usize;
        if length == 0 || length > asset.capacity {
            return Err(HwError::INVALID_LENGTH);
        }
        let data = dma
            .read(load.input.address, length)
            .map_err(|_| HwError::INVALID_ADDRESS)?;
        asset.data = Some(data.to_vec());
        AssetLoadResult { output_size: 0 }.encode(result);
        Ok(())
    }

    fn public_data(
        &mut self,
        token: &CommandToken,
        dma: &mut DmaMap<'_>,
        result: &mut ResultToken,
    ) -> Result<(), HwError> {
        let read = PublicDataRead::decode(token);
        let asset = self
            .assets
            .get(&read.asset_id.0)
            .ok_or(HwError::INVALID_ASSET)?;
        if !asset.policy.is_public_data() {
            return Err(HwError::ACCESS_ERROR);
        }
        let data = asset.data.as_deref().ok_or(HwError::INVALID_STATE)?;
        if data.len() > read.output.length as usize {
            return Err(HwError::INVALID_LENGTH);
        }
        dma.write(read.output.address, data)
            .map_err(|_| HwError::INVALID_ADDRESS)?;
        PublicDataReadResult {
            length: data.len() as u32,
        }
        .encode(result);
        Ok(())
    }

    fn random_number(&mut self, token: &CommandToken, dma: &mut DmaMap<'_>) -> Result<(), HwError> {
        let request = RandomNumber::decode(token);
        let mut bytes = vec![0u8; request.output.length as usize];
        self.rng.fill_bytes(&mut bytes);
        dma.write(request.output.address, &bytes)
            .map_err(|_| HwError::INVALID_ADDRESS)
    }
}
