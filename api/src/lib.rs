// Licensed under the Apache-2.0 license

//! Wire-level interface to the EIP-130 security engine: token layouts,
//! asset policies, and the transport trait.

pub mod asset;
pub mod dma;
pub mod mailbox;
pub mod opcode;
pub mod pk;
pub mod policy;
pub mod random;
pub mod result;
pub mod token;
pub mod vector;

pub use eip130_psa_error as error;

pub use asset::AssetId;
pub use dma::{DmaDescriptor, DmaMap};
pub use mailbox::Mailbox;
pub use opcode::{Opcode, Subcode};
pub use policy::AssetPolicy;
pub use result::HwError;
pub use token::{decode_status, read_byte_array, write_byte_array, CommandToken, ResultToken};

/// Transport-level failure, distinct from the status decoded from a result token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportError {
    /// The engine did not accept the token.
    MailboxBusy,
    /// No result arrived within the poll budget.
    ResponseTimeout,
    /// The engine referenced an address outside the mapped buffers.
    DmaFault { address: u64 },
    /// Device-specific link failure.
    Device(u32),
}
