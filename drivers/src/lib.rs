/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the EIP-130 driver library.

--*/

mod asset;
mod domain;
mod hsm;
pub mod storage;
mod trng;

pub use asset::Asset;
pub use domain::EccCurve;
pub use hsm::{result_error, Hsm, MailboxConfig};
pub use storage::{KeyRecord, MemoryStorage, RecordAttributes, Storage};
