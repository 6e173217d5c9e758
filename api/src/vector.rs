/*++

Licensed under the Apache-2.0 license.

File Name:

    vector.rs

Abstract:

    File contains the big-integer vector format used for asymmetric key
    material and domain parameters loaded into assets.

--*/

use eip130_psa_error::{PsaError, PsaResult};

/// Bytes needed to hold `bits` rounded up to whole words.
pub const fn word_aligned_bytes(bits: u32) -> usize {
    (bits as usize).div_ceil(32) * 4
}

/// Size of one vector item including its header.
pub const fn vector_size(bits: u32) -> usize {
    4 + word_aligned_bytes(bits)
}

/// Header word in front of every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorHeader {
    pub bits: u16,
    pub index: u8,
    pub items: u8,
}

impl VectorHeader {
    pub const fn to_word(self) -> u32 {
        self.bits as u32 | (self.index as u32) << 16 | (self.items as u32) << 24
    }

    pub const fn from_word(word: u32) -> Self {
        Self {
            bits: word as u16,
            index: (word >> 16) as u8,
            items: (word >> 24) as u8,
        }
    }
}

/// Appends one item holding the big-endian `value`, stored little-endian and
/// zero-padded to a whole number of words.
pub fn push_vector(out: &mut Vec<u8>, header: VectorHeader, value: &[u8]) -> PsaResult<()> {
    let first = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    let value = &value[first..];
    let size = word_aligned_bytes(u32::from(header.bits));
    if value.len() > size {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    out.extend_from_slice(&header.to_word().to_le_bytes());
    out.extend(value.iter().rev());
    out.resize(out.len() + size - value.len(), 0);
    Ok(())
}

/// One decoded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorItem {
    pub header: VectorHeader,
    /// Big-endian value, `bits` rounded up to whole bytes.
    pub value: Vec<u8>,
}

/// Splits a buffer into its items. Returns `None` if the buffer is truncated.
pub fn parse_vectors(mut data: &[u8]) -> Option<Vec<VectorItem>> {
    let mut items = Vec::new();
    while !data.is_empty() {
        let word = u32::from_le_bytes(data.get(..4)?.try_into().ok()?);
        let header = VectorHeader::from_word(word);
        let size = word_aligned_bytes(u32::from(header.bits));
        let raw = data.get(4..4 + size)?;
        let len = usize::from(header.bits).div_ceil(8);
        let value = raw[..len].iter().rev().copied().collect();
        items.push(VectorItem { header, value });
        data = &data[4 + size..];
    }
    Some(items)
}
