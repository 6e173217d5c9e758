// Licensed under the Apache-2.0 license

use crate::dma::DmaMap;
use crate::token::{CommandToken, ResultToken};
use crate::TransportError;

/// Transport that moves tokens between the host and the engine.
///
/// Implementations only move buffers; they never interpret token contents
/// beyond what is needed to service DMA.
pub trait Mailbox {
    /// Number of polls allowed when the caller does not configure one.
    const DEFAULT_MAX_POLLS: u32 = 100_000;

    /// Hands a command token to the engine. Buffers referenced by the token
    /// are resolved through `dma` while the token is in flight.
    fn submit(&mut self, token: &CommandToken, dma: &mut DmaMap<'_>)
        -> Result<(), TransportError>;

    /// Returns the result token once available, `None` while the engine is
    /// still busy.
    fn poll_result(&mut self, dma: &mut DmaMap<'_>) -> Result<Option<ResultToken>, TransportError>;

    /// Called between polls.
    fn delay(&mut self) {}

    /// Submits `token` and waits for its result.
    fn exchange(
        &mut self,
        token: &CommandToken,
        dma: &mut DmaMap<'_>,
        max_polls: u32,
    ) -> Result<ResultToken, TransportError> {
        self.submit(token, dma)?;
        let mut remaining = max_polls;
        loop {
            if let Some(result) = self.poll_result(dma)? {
                return Ok(result);
            }
            if remaining == 0 {
                return Err(TransportError::ResponseTimeout);
            }
            remaining -= 1;
            self.delay();
        }
    }
}
