// Licensed under the Apache-2.0 license

/// Error codes the engine reports in the result status byte (negated on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HwError(pub u8);

impl HwError {
    pub const INVALID_TOKEN: Self = Self(1);
    pub const INVALID_PARAMETER: Self = Self(2);
    pub const INVALID_KEYSIZE: Self = Self(3);
    pub const INVALID_LENGTH: Self = Self(4);
    pub const INVALID_LOCATION: Self = Self(5);
    pub const CLOCK_ERROR: Self = Self(6);
    pub const ACCESS_ERROR: Self = Self(7);
    pub const UNWRAP_ERROR: Self = Self(10);
    pub const DATA_OVERRUN: Self = Self(11);
    pub const ASSET_CHECKSUM: Self = Self(12);
    pub const INVALID_ASSET: Self = Self(13);
    pub const FULL_ERROR: Self = Self(14);
    pub const INVALID_ADDRESS: Self = Self(15);
    pub const INVALID_MODULUS: Self = Self(17);
    pub const VERIFY_ERROR: Self = Self(18);
    pub const INVALID_STATE: Self = Self(19);
    pub const OTP_WRITE: Self = Self(20);
    pub const PANIC: Self = Self(31);

    /// Status value [`crate::decode_status`] yields for this error when FASVC is set.
    pub const fn status(self) -> i32 {
        -(self.0 as i32)
    }
}
