// Licensed under the Apache-2.0 license

use crate::dma::DmaDescriptor;
use crate::opcode::{Opcode, Subcode};
use crate::token::{CommandToken, ResultToken};

/// Largest request a single random number token can carry.
pub const RANDOM_MAX_LENGTH: usize = 65528;

const WARNING_MASK: u32 = (1 << 6) | (1 << 5);
const WARNING_PATTERN: u32 = 1 << 6;

/// Fill `output` with random bytes from the DRBG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomNumber {
    pub output: DmaDescriptor,
}

impl RandomNumber {
    pub fn encode(&self) -> CommandToken {
        debug_assert!(self.output.length as usize <= RANDOM_MAX_LENGTH);
        let mut token = CommandToken::new(Opcode::TRNG, Subcode::RANDOM_NUMBER);
        token.set_word(2, self.output.length & 0xFFFF);
        token.set_dma_address(3, self.output.address);
        token
    }

    pub fn decode(token: &CommandToken) -> Self {
        Self {
            output: DmaDescriptor {
                address: token.dma_address(3),
                length: token.word(2) & 0xFFFF,
            },
        }
    }

    /// Status of a random number result.
    ///
    /// The DRBG reports health-test warnings as status bytes with bit 6 set
    /// and bit 5 clear; those come back as small positive values (`& 0x1F`).
    /// Every other non-zero byte is an error and is returned negated.
    pub fn status(result: &ResultToken) -> i32 {
        let byte = result.word(0) >> 24;
        if byte == 0 {
            0
        } else if byte & 0x80 != 0 || byte & WARNING_MASK != WARNING_PATTERN {
            -(byte as i32)
        } else {
            (byte & 0x1F) as i32
        }
    }
}
