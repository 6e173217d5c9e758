/*++

Licensed under the Apache-2.0 license.

File Name:

    hsm.rs

Abstract:

    File contains the mailbox context that serializes token exchanges with
    the EIP-130 engine.

--*/

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use eip130_api::policy::PolicyFlags;
use eip130_api::{CommandToken, DmaMap, HwError, Mailbox, ResultToken, TransportError};
use eip130_psa_error::{PsaError, PsaResult};
use log::{debug, error, warn};
use parking_lot::Mutex;

/// Settings of the mailbox context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Written to word 1 of every command token.
    pub identity: u32,
    /// When false, every asset the host creates is marked as coming from the
    /// non-secure world.
    pub secure_access: bool,
    /// How long to wait for another caller to release the mailbox.
    pub lock_timeout: Duration,
    /// Result polls before a submitted token is reported as lost.
    pub max_polls: u32,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            identity: 0x4F5A_3647,
            secure_access: true,
            lock_timeout: Duration::from_secs(1),
            max_polls: 100_000,
        }
    }
}

/// Shared handle on the engine. At most one token is in flight at a time.
pub struct Hsm<M: Mailbox> {
    mailbox: Mutex<M>,
    config: MailboxConfig,
    next_token_id: AtomicU16,
}

impl<M: Mailbox> Hsm<M> {
    pub fn new(mailbox: M, config: MailboxConfig) -> Self {
        Self {
            mailbox: Mutex::new(mailbox),
            config,
            next_token_id: AtomicU16::new(1),
        }
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    /// Flags every host-created asset carries.
    pub fn source_flags(&self) -> PolicyFlags {
        if self.config.secure_access {
            PolicyFlags::empty()
        } else {
            PolicyFlags::SOURCE_NON_SECURE
        }
    }

    /// Runs `f` with the transport locked. Intended for inspection of the
    /// transport state, not for issuing tokens.
    pub fn with_mailbox<R>(&self, f: impl FnOnce(&mut M) -> R) -> PsaResult<R> {
        let mut mailbox = self
            .mailbox
            .try_lock_for(self.config.lock_timeout)
            .ok_or(PsaError::RESOURCE_UNAVAILABLE)?;
        Ok(f(&mut mailbox))
    }

    /// Stamps identity and token id on `token`, submits it, and waits for the
    /// matching result.
    ///
    /// The returned result may still carry an engine error; callers decode
    /// the status themselves because the error mapping depends on the token.
    pub fn exchange(&self, mut token: CommandToken, dma: &mut DmaMap<'_>) -> PsaResult<ResultToken> {
        let token_id = self.next_token_id.fetch_add(1, Ordering::Relaxed);
        token.set_identity(self.config.identity);
        token.set_token_id(token_id, false);

        let mut mailbox = self
            .mailbox
            .try_lock_for(self.config.lock_timeout)
            .ok_or_else(|| {
                warn!("[hsm] mailbox lock timed out");
                PsaError::RESOURCE_UNAVAILABLE
            })?;
        debug!(
            "[hsm] token {:#06x} opcode {} subcode {}",
            token_id,
            token.opcode().0,
            token.subcode().0
        );
        let result = mailbox
            .exchange(&token, dma, self.config.max_polls)
            .map_err(|err| {
                warn!("[hsm] token {token_id:#06x} transport error {err:?}");
                transport_error(err)
            })?;
        if result.token_id() != token_id {
            error!(
                "[hsm] result token id {:#06x} does not match {:#06x}",
                result.token_id(),
                token_id
            );
            return Err(PsaError::CORRUPTION_DETECTED);
        }
        Ok(result)
    }
}

/// Engine error reported by `result`, if any. Warnings count as success.
pub fn result_error(result: &ResultToken) -> Option<HwError> {
    match result.error_code() {
        Some(code) => {
            warn!("[hsm] token {:#06x} failed: {}", result.token_id(), code);
            Some(HwError(code))
        }
        None => {
            if result.status() > 0 {
                debug!("[hsm] token {:#06x} warning {}", result.token_id(), result.status());
            }
            None
        }
    }
}

fn transport_error(err: TransportError) -> PsaError {
    match err {
        TransportError::MailboxBusy => PsaError::RESOURCE_UNAVAILABLE,
        TransportError::ResponseTimeout => PsaError::RESPONSE_TIMEOUT,
        TransportError::DmaFault { .. } | TransportError::Device(_) => {
            PsaError::COMMUNICATION_FAILURE
        }
    }
}
