/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the PSA status type and the status codes shared by every
    layer of the EIP-130 stack.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::fmt;
use core::num::{NonZeroI32, TryFromIntError};

/// PSA status for a failed operation.
///
/// Success is `Ok(..)` of a [`PsaResult`], so the wrapped value is never zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PsaError(pub NonZeroI32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code, plus a name lookup.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: PsaError = PsaError::new_const($value);
        )*

        /// Symbolic name of the status, or `"UNKNOWN"` for values outside the table.
        pub fn name(self) -> &'static str {
            $(
                if self.0.get() == $value {
                    return stringify!($name);
                }
            )*
            "UNKNOWN"
        }

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, i32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl PsaError {
    /// Create a PSA error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a PsaError from an i32 is to
    /// use `PsaError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: i32) -> Self {
        match NonZeroI32::new(val) {
            Some(val) => Self(val),
            None => panic!("PsaError cannot be 0"),
        }
    }

    /// Raw PSA status value.
    pub fn code(self) -> i32 {
        self.0.get()
    }

    define_error_constants![
        (GENERIC_ERROR, -132, "Unspecified failure"),
        (
            NOT_PERMITTED,
            -133,
            "Operation not allowed by the key or asset policy"
        ),
        (
            NOT_SUPPORTED,
            -134,
            "Algorithm or parameter combination is not implemented"
        ),
        (INVALID_ARGUMENT, -135, "Malformed caller input"),
        (INVALID_HANDLE, -136, "Key identifier does not name a key"),
        (BAD_STATE, -137, "Operation called in the wrong state"),
        (BUFFER_TOO_SMALL, -138, "Output buffer is too small"),
        (ALREADY_EXISTS, -139, "Storage identifier already in use"),
        (DOES_NOT_EXIST, -140, "Storage identifier not found"),
        (INSUFFICIENT_MEMORY, -141, "Host allocation failed"),
        (INSUFFICIENT_STORAGE, -142, "Record exceeds storage capacity"),
        (INSUFFICIENT_DATA, -143, "Not enough data to complete the operation"),
        (SERVICE_FAILURE, -144, "Service failure"),
        (COMMUNICATION_FAILURE, -145, "Transport to the engine failed"),
        (STORAGE_FAILURE, -146, "Storage backend failure"),
        (HARDWARE_FAILURE, -147, "Hardware failure"),
        (INSUFFICIENT_ENTROPY, -148, "Random source exhausted"),
        (INVALID_SIGNATURE, -149, "Signature verification failed"),
        (INVALID_PADDING, -150, "Padding check failed"),
        (
            CORRUPTION_DETECTED,
            -151,
            "Engine reported an internal fault"
        ),
        (DATA_CORRUPT, -152, "Stored record is corrupt"),
        (DATA_INVALID, -153, "Stored record is malformed"),
        (
            INSUFFICIENT_RESOURCES,
            -248,
            "Engine asset store is full"
        ),
        (
            RESOURCE_UNAVAILABLE,
            -249,
            "Mailbox is held by another caller"
        ),
        (
            RESPONSE_TIMEOUT,
            -250,
            "Token submitted without a result; engine may still hold assets"
        ),
    ];
}

impl fmt::Display for PsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0.get())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PsaError {}

impl From<NonZeroI32> for PsaError {
    fn from(val: NonZeroI32) -> Self {
        PsaError(val)
    }
}

impl From<PsaError> for NonZeroI32 {
    fn from(val: PsaError) -> Self {
        val.0
    }
}

impl From<PsaError> for i32 {
    fn from(val: PsaError) -> Self {
        NonZeroI32::from(val).get()
    }
}

impl TryFrom<i32> for PsaError {
    type Error = TryFromIntError;
    fn try_from(val: i32) -> Result<Self, TryFromIntError> {
        NonZeroI32::try_from(val).map(PsaError)
    }
}

pub type PsaResult<T> = Result<T, PsaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_try_from() {
        assert!(PsaError::try_from(0).is_err());
        assert_eq!(Ok(PsaError::INVALID_ARGUMENT), PsaError::try_from(-135));
        assert_eq!(i32::from(PsaError::DATA_INVALID), -153);
    }

    #[test]
    fn test_name_and_display() {
        assert_eq!(PsaError::BUFFER_TOO_SMALL.name(), "BUFFER_TOO_SMALL");
        assert_eq!(
            PsaError::try_from(-1).map(PsaError::name),
            Ok("UNKNOWN")
        );
        assert_eq!(
            PsaError::CORRUPTION_DETECTED.to_string(),
            "CORRUPTION_DETECTED (-151)"
        );
    }

    #[test]
    fn test_error_constants_uniqueness() {
        let constants = PsaError::all_constants();
        let mut error_values = HashSet::new();
        let mut duplicates = Vec::new();

        for (name, value) in constants {
            assert!(value < 0, "{name} must be negative");
            if !error_values.insert(value) {
                duplicates.push((name, value));
            }
        }

        assert!(
            duplicates.is_empty(),
            "Found duplicate error codes: {:?}",
            duplicates
        );
    }
}
