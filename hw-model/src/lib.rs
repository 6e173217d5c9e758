/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains a software model of the EIP-130 engine that services
    tokens through the Mailbox trait, for use in tests.

--*/

mod engine;
mod pk;

use std::collections::{BTreeMap, HashMap};

use eip130_api::pk::PkMethod;
use eip130_api::{
    AssetId, AssetPolicy, CommandToken, DmaMap, HwError, Mailbox, Opcode, ResultToken, Subcode,
    TransportError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct InitParams {
    /// Assets the store can hold before create fails with FULL_ERROR.
    pub max_assets: usize,
    /// Seed of the model DRBG.
    pub rng_seed: u64,
    /// Polls that report "busy" before each result becomes available.
    pub busy_polls: u32,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            max_assets: 64,
            rng_seed: 0x0130,
            busy_polls: 0,
        }
    }
}

/// Counters of what the model has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub tokens: usize,
    pub assets_created: usize,
    /// Delete tokens received, whether or not they succeeded.
    pub delete_requests: usize,
    pub assets_deleted: usize,
}

/// Which token a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Zero-based index over every token the model receives.
    TokenIndex(usize),
    /// Every public key token running this method.
    PkMethod(PkMethod),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Skip execution and report this error.
    Status(HwError),
    /// Execute the token but never deliver its result.
    DropResponse,
    /// Refuse the token at submission.
    RejectSubmit,
}

/// Asset as held by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAsset {
    pub policy: AssetPolicy,
    pub capacity: usize,
    pub data: Option<Vec<u8>>,
    /// Static assets cannot be deleted by the host.
    pub provisioned: bool,
}

pub struct ModelHsm {
    params: InitParams,
    assets: BTreeMap<u32, ModelAsset>,
    static_assets: HashMap<u8, u32>,
    next_id: u32,
    pending: Option<ResultToken>,
    busy: u32,
    faults: Vec<(Trigger, FaultAction)>,
    stats: Stats,
    history: Vec<CommandToken>,
    rng: StdRng,
}

impl Default for ModelHsm {
    fn default() -> Self {
        Self::new(InitParams::default())
    }
}

impl ModelHsm {
    pub fn new(params: InitParams) -> Self {
        let rng = StdRng::seed_from_u64(params.rng_seed);
        Self {
            params,
            assets: BTreeMap::new(),
            static_assets: HashMap::new(),
            next_id: 0x5001,
            pending: None,
            busy: 0,
            faults: Vec::new(),
            stats: Stats::default(),
            history: Vec::new(),
            rng,
        }
    }

    pub fn inject(&mut self, trigger: Trigger, action: FaultAction) {
        self.faults.push((trigger, action));
    }

    /// Applies `action` to the `n`-th token from now (0 = the next one).
    pub fn fail_nth_token(&mut self, n: usize, action: FaultAction) {
        self.inject(Trigger::TokenIndex(self.stats.tokens + n), action);
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Tokens received so far, oldest first.
    pub fn history(&self) -> &[CommandToken] {
        &self.history
    }

    /// Host-created assets currently held.
    pub fn live_assets(&self) -> usize {
        self.assets.values().filter(|a| !a.provisioned).count()
    }

    pub fn asset(&self, id: AssetId) -> Option<&ModelAsset> {
        self.assets.get(&id.0)
    }

    /// Adds a static asset that the host can find with an asset search.
    pub fn provision_asset(&mut self, number: u8, policy: AssetPolicy, data: &[u8]) -> AssetId {
        let id = self.insert_asset(ModelAsset {
            policy,
            capacity: data.len(),
            data: Some(data.to_vec()),
            provisioned: true,
        });
        self.static_assets.insert(number, id.0);
        id
    }

    fn insert_asset(&mut self, asset: ModelAsset) -> AssetId {
        let id = self.next_id;
        self.next_id += 1;
        self.assets.insert(id, asset);
        AssetId(id)
    }

    fn take_fault(&mut self, index: usize, token: &CommandToken) -> Option<FaultAction> {
        let pk_method = (token.opcode() == Opcode::PUBLIC_KEY
            && token.subcode() == Subcode::PK_WITH_ASSETS)
            .then(|| PkMethod(token.word(2) as u8));
        let pos = self.faults.iter().position(|(trigger, _)| match trigger {
            Trigger::TokenIndex(i) => *i == index,
            Trigger::PkMethod(method) => pk_method == Some(*method),
        })?;
        let (trigger, action) = self.faults[pos];
        if let Trigger::TokenIndex(_) = trigger {
            self.faults.remove(pos);
        }
        Some(action)
    }
}

impl Mailbox for ModelHsm {
    fn submit(&mut self, token: &CommandToken, dma: &mut DmaMap<'_>) -> Result<(), TransportError> {
        if self.pending.is_some() {
            return Err(TransportError::MailboxBusy);
        }
        let index = self.stats.tokens;
        self.stats.tokens += 1;
        self.history.push(token.clone());
        if token.opcode() == Opcode::ASSET_MANAGEMENT && token.subcode() == Subcode::ASSET_DELETE {
            self.stats.delete_requests += 1;
        }

        let fault = self.take_fault(index, token);
        let mut result = ResultToken::new(token.token_id());
        match fault {
            Some(FaultAction::RejectSubmit) => return Err(TransportError::MailboxBusy),
            Some(FaultAction::Status(err)) => result.set_error(err.0, true),
            Some(FaultAction::DropResponse) | None => {
                if let Err(err) = self.execute(token, dma, &mut result) {
                    log::debug!("[model] token {:#06x} -> {:?}", token.token_id(), err);
                    result = ResultToken::new(token.token_id());
                    result.set_error(err.0, true);
                }
            }
        }
        if fault != Some(FaultAction::DropResponse) {
            self.pending = Some(result);
            self.busy = self.params.busy_polls;
        }
        Ok(())
    }

    fn poll_result(&mut self, _dma: &mut DmaMap<'_>) -> Result<Option<ResultToken>, TransportError> {
        if self.pending.is_some() && self.busy > 0 {
            self.busy -= 1;
            return Ok(None);
        }
        Ok(self.pending.take())
    }
}
