// Licensed under the Apache-2.0 license

use std::time::Duration;

use eip130_drivers::MailboxConfig;
use serde::Deserialize;

/// Settings of a [`crate::Psa`] context, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsaConfig {
    /// Host identity stamped on every token.
    pub identity: u32,
    /// False when the host runs in the non-secure world.
    pub secure_access: bool,
    /// Owner part of the storage uid of persistent keys.
    pub owner: u32,
    /// Keys held in the context at once, volatile and cached persistent.
    pub key_slots: usize,
    pub lock_timeout_ms: u64,
    pub response_poll_limit: u32,
}

impl Default for PsaConfig {
    fn default() -> Self {
        let mailbox = MailboxConfig::default();
        Self {
            identity: mailbox.identity,
            secure_access: mailbox.secure_access,
            owner: 0,
            key_slots: 32,
            lock_timeout_ms: mailbox.lock_timeout.as_millis() as u64,
            response_poll_limit: mailbox.max_polls,
        }
    }
}

impl PsaConfig {
    pub fn mailbox_config(&self) -> MailboxConfig {
        MailboxConfig {
            identity: self.identity,
            secure_access: self.secure_access,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            max_polls: self.response_poll_limit,
        }
    }
}
