/*++

Licensed under the Apache-2.0 license.

File Name:

    trng.rs

Abstract:

    File contains random number generation through the engine DRBG.

--*/

use eip130_api::random::{RandomNumber, RANDOM_MAX_LENGTH};
use eip130_api::{DmaMap, Mailbox};
use eip130_psa_error::{PsaError, PsaResult};
use log::{debug, warn};

use crate::hsm::Hsm;

impl<M: Mailbox> Hsm<M> {
    /// Fills `out` from the engine DRBG, one token per 65528 bytes.
    pub fn generate_random(&self, out: &mut [u8]) -> PsaResult<()> {
        for chunk in out.chunks_mut(RANDOM_MAX_LENGTH) {
            let result = {
                let mut dma = DmaMap::new();
                let output = dma.map_output(chunk);
                self.exchange(RandomNumber { output }.encode(), &mut dma)?
            };
            match RandomNumber::status(&result) {
                0 => {}
                status if status > 0 => debug!("[trng] DRBG warning {status}"),
                status => {
                    warn!("[trng] random number token failed: {status}");
                    return Err(PsaError::INSUFFICIENT_ENTROPY);
                }
            }
        }
        Ok(())
    }
}
