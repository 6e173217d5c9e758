// Licensed under the Apache-2.0 license

/// Operation family selected in command word 0, bits 27:24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u8);

impl Opcode {
    pub const NOP: Self = Self(0);
    pub const ENCRYPTION: Self = Self(1);
    pub const HASH: Self = Self(2);
    pub const MAC: Self = Self(3);
    pub const TRNG: Self = Self(4);
    pub const SPECIAL_FUNCTIONS: Self = Self(5);
    pub const AES_WRAP: Self = Self(6);
    pub const ASSET_MANAGEMENT: Self = Self(7);
    pub const AUTH_UNLOCK: Self = Self(8);
    pub const PUBLIC_KEY: Self = Self(9);
    pub const SERVICE: Self = Self(14);
    pub const SYSTEM: Self = Self(15);
}

/// Operation within a family, command word 0, bits 31:28.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subcode(pub u8);

impl Subcode {
    // Opcode::ASSET_MANAGEMENT
    pub const ASSET_SEARCH: Self = Self(0);
    pub const ASSET_CREATE: Self = Self(1);
    pub const ASSET_LOAD: Self = Self(2);
    pub const ASSET_DELETE: Self = Self(3);
    pub const PUBLIC_DATA: Self = Self(4);
    pub const MONOTONIC_READ: Self = Self(5);
    pub const MONOTONIC_INCREMENT: Self = Self(6);
    pub const OTP_DATA_WRITE: Self = Self(7);
    pub const SECURE_TIMER: Self = Self(8);
    pub const PROVISION_RANDOM_HUK: Self = Self(9);
    pub const CPIF_EXPORT: Self = Self(10);
    pub const ASSET_STORE_RESET: Self = Self(15);

    // Opcode::PUBLIC_KEY
    pub const PK_NO_ASSETS: Self = Self(0);
    pub const PK_WITH_ASSETS: Self = Self(1);

    // Opcode::TRNG
    pub const RANDOM_NUMBER: Self = Self(0);

    pub const NONE: Self = Self(0);
}
