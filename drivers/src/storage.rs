/*++

Licensed under the Apache-2.0 license.

File Name:

    storage.rs

Abstract:

    File contains the persistent key record format and its store/load path
    over a key-value storage backend.

--*/

use std::collections::HashMap;

use eip130_api::AssetPolicy;
use eip130_psa_error::{PsaError, PsaResult};
use log::warn;
use zerocopy::byteorder::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
use zeroize::Zeroizing;

/// Magic tag at offset 0 of every record.
pub const KEY_RECORD_MAGIC: [u8; 8] = *b"PSA\0KEY\0";

/// Largest key blob a record may hold.
pub const MAX_KEY_DATA: usize = 8191;

/// Byte-addressable store keyed by a 64-bit id.
pub trait Storage {
    /// Size of the record, or `DOES_NOT_EXIST`.
    fn get_info(&self, uid: u64) -> PsaResult<usize>;

    /// Reads up to `out.len()` bytes starting at `offset`; returns the count.
    fn get(&self, uid: u64, offset: usize, out: &mut [u8]) -> PsaResult<usize>;

    fn set(&mut self, uid: u64, data: &[u8]) -> PsaResult<()>;

    fn remove(&mut self, uid: u64) -> PsaResult<()>;
}

/// Volatile storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    records: HashMap<u64, Zeroizing<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, uid: u64) -> bool {
        self.records.contains_key(&uid)
    }
}

impl Storage for MemoryStorage {
    fn get_info(&self, uid: u64) -> PsaResult<usize> {
        self.records
            .get(&uid)
            .map(|r| r.len())
            .ok_or(PsaError::DOES_NOT_EXIST)
    }

    fn get(&self, uid: u64, offset: usize, out: &mut [u8]) -> PsaResult<usize> {
        let record = self.records.get(&uid).ok_or(PsaError::DOES_NOT_EXIST)?;
        let src = record.get(offset..).ok_or(PsaError::INVALID_ARGUMENT)?;
        let n = src.len().min(out.len());
        out[..n].copy_from_slice(&src[..n]);
        Ok(n)
    }

    fn set(&mut self, uid: u64, data: &[u8]) -> PsaResult<()> {
        self.records.insert(uid, Zeroizing::new(data.to_vec()));
        Ok(())
    }

    fn remove(&mut self, uid: u64) -> PsaResult<()> {
        self.records
            .remove(&uid)
            .map(drop)
            .ok_or(PsaError::DOES_NOT_EXIST)
    }
}

/// Storage uid of `key_id` owned by `owner`.
pub const fn storage_uid(owner: u32, key_id: u32) -> u64 {
    (owner as u64) << 32 | key_id as u64
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy)]
struct RecordHeader {
    magic: [u8; 8],
    lifetime: U32,
    key_type: U16,
    bits: U16,
    usage: U32,
    alg: U32,
    alg2: U32,
    policy: U64,
    data_len: U32,
}

/// Length of the fixed record header.
pub const KEY_RECORD_HEADER_LEN: usize = core::mem::size_of::<RecordHeader>();

/// Key attributes as stored, without interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordAttributes {
    pub lifetime: u32,
    pub key_type: u16,
    pub bits: u16,
    pub usage: u32,
    pub alg: u32,
    pub alg2: u32,
}

/// Decoded persistent key record.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub attributes: RecordAttributes,
    pub policy: AssetPolicy,
    pub data: Zeroizing<Vec<u8>>,
    /// Second blob of the same length, used only for the other direction of
    /// a bidirectional symmetric key.
    pub data2: Option<Zeroizing<Vec<u8>>>,
}

impl core::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("attributes", &self.attributes)
            .field("policy", &self.policy)
            .field("data_len", &self.data.len())
            .field("paired", &self.data2.is_some())
            .finish()
    }
}

fn try_alloc(len: usize) -> PsaResult<Zeroizing<Vec<u8>>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PsaError::INSUFFICIENT_MEMORY)?;
    buf.resize(len, 0);
    Ok(Zeroizing::new(buf))
}

impl KeyRecord {
    pub fn has_second_blob(&self) -> bool {
        self.data2.is_some()
    }

    pub fn serialize(&self) -> PsaResult<Zeroizing<Vec<u8>>> {
        let data_len = self.data.len();
        if let Some(data2) = &self.data2 {
            if data2.len() != data_len {
                return Err(PsaError::INVALID_ARGUMENT);
            }
        }
        if data_len > MAX_KEY_DATA {
            return Err(PsaError::INSUFFICIENT_STORAGE);
        }
        let header = RecordHeader {
            magic: KEY_RECORD_MAGIC,
            lifetime: U32::new(self.attributes.lifetime),
            key_type: U16::new(self.attributes.key_type),
            bits: U16::new(self.attributes.bits),
            usage: U32::new(self.attributes.usage),
            alg: U32::new(self.attributes.alg),
            alg2: U32::new(self.attributes.alg2),
            policy: U64::new(self.policy.bits()),
            data_len: U32::new(data_len as u32),
        };
        let paired = self.data2.as_ref().map_or(0, |d| d.len());
        let mut out = try_alloc(KEY_RECORD_HEADER_LEN + data_len + paired)?;
        out[..KEY_RECORD_HEADER_LEN].copy_from_slice(header.as_bytes());
        out[KEY_RECORD_HEADER_LEN..KEY_RECORD_HEADER_LEN + data_len].copy_from_slice(&self.data);
        if let Some(data2) = &self.data2 {
            out[KEY_RECORD_HEADER_LEN + data_len..].copy_from_slice(data2);
        }
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> PsaResult<Self> {
        let (header, rest) =
            RecordHeader::read_from_prefix(bytes).map_err(|_| PsaError::DATA_INVALID)?;
        if header.magic != KEY_RECORD_MAGIC {
            return Err(PsaError::DATA_INVALID);
        }
        let data_len = header.data_len.get() as usize;
        if data_len > MAX_KEY_DATA {
            return Err(PsaError::DATA_CORRUPT);
        }
        let paired = if rest.len() == data_len {
            false
        } else if rest.len() == 2 * data_len {
            true
        } else {
            return Err(PsaError::DATA_INVALID);
        };

        let mut data = try_alloc(data_len)?;
        data.copy_from_slice(&rest[..data_len]);
        let data2 = if paired {
            let mut data2 = try_alloc(data_len)?;
            data2.copy_from_slice(&rest[data_len..]);
            Some(data2)
        } else {
            None
        };
        Ok(Self {
            attributes: RecordAttributes {
                lifetime: header.lifetime.get(),
                key_type: header.key_type.get(),
                bits: header.bits.get(),
                usage: header.usage.get(),
                alg: header.alg.get(),
                alg2: header.alg2.get(),
            },
            policy: AssetPolicy::from_bits(header.policy.get()),
            data,
            data2,
        })
    }
}

/// Writes a new record. Refuses to overwrite, and removes the record again
/// if it does not read back at the expected size.
pub fn store(storage: &mut impl Storage, uid: u64, bytes: &[u8]) -> PsaResult<()> {
    match storage.get_info(uid) {
        Ok(_) => return Err(PsaError::ALREADY_EXISTS),
        Err(PsaError::DOES_NOT_EXIST) => {}
        Err(err) => return Err(err),
    }
    storage.set(uid, bytes)?;
    let verified = match storage.get_info(uid) {
        Ok(size) if size == bytes.len() => Ok(()),
        Ok(_) => Err(PsaError::DATA_INVALID),
        Err(err) => Err(err),
    };
    if let Err(err) = verified {
        warn!("[storage] record {uid:#x} failed verification: {err}");
        // The verification error is what the caller needs to see.
        let _ = storage.remove(uid);
        return Err(err);
    }
    Ok(())
}

/// Reads a whole record.
pub fn load(storage: &impl Storage, uid: u64) -> PsaResult<Zeroizing<Vec<u8>>> {
    let size = storage.get_info(uid)?;
    let mut buf = try_alloc(size)?;
    let read = storage.get(uid, 0, &mut buf)?;
    if read != size {
        return Err(PsaError::DATA_INVALID);
    }
    Ok(buf)
}

/// Serializes and stores a key record.
pub fn save_key(storage: &mut impl Storage, uid: u64, record: &KeyRecord) -> PsaResult<()> {
    if record.data.is_empty() {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    if record.data.len() > MAX_KEY_DATA {
        return Err(PsaError::INSUFFICIENT_STORAGE);
    }
    let bytes = record.serialize()?;
    store(storage, uid, &bytes)
}

/// Loads and decodes a key record.
pub fn load_key(storage: &impl Storage, uid: u64) -> PsaResult<KeyRecord> {
    let bytes = load(storage, uid)?;
    let record = KeyRecord::deserialize(&bytes)?;
    if record.data.is_empty() {
        return Err(PsaError::STORAGE_FAILURE);
    }
    Ok(record)
}

pub fn remove_key(storage: &mut impl Storage, uid: u64) -> PsaResult<()> {
    storage.remove(uid)
}
