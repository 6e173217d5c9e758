/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the DMA map that exposes caller buffers to the engine
    under bus addresses for the lifetime of one token exchange.

--*/

use crate::token::DMA_MAX_LENGTH;
use crate::TransportError;

/// Bus address and length written into a token's DMA fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmaDescriptor {
    pub address: u64,
    pub length: u32,
}

impl DmaDescriptor {
    pub const NONE: Self = Self {
        address: 0,
        length: 0,
    };
}

enum Region<'a> {
    Input { base: u64, data: &'a [u8] },
    Output { base: u64, data: &'a mut [u8] },
}

impl Region<'_> {
    fn span(&self) -> (u64, usize) {
        match self {
            Region::Input { base, data } => (*base, data.len()),
            Region::Output { base, data } => (*base, data.len()),
        }
    }
}

/// Buffers mapped for a single exchange.
///
/// Addresses are synthetic, page aligned, and start above 4 GiB so both DMA
/// address words are exercised.
pub struct DmaMap<'a> {
    regions: Vec<Region<'a>>,
    next: u64,
}

impl Default for DmaMap<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> DmaMap<'a> {
    pub const BASE_ADDRESS: u64 = 0x0000_0010_0000_0000;
    const PAGE: u64 = 0x1000;

    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            next: Self::BASE_ADDRESS,
        }
    }

    fn reserve(&mut self, len: usize) -> DmaDescriptor {
        debug_assert!(len as u64 <= u64::from(DMA_MAX_LENGTH));
        let address = self.next;
        self.next = (address + len as u64 + Self::PAGE) & !(Self::PAGE - 1);
        DmaDescriptor {
            address,
            length: len as u32,
        }
    }

    /// Exposes `data` for the engine to read.
    pub fn map_input(&mut self, data: &'a [u8]) -> DmaDescriptor {
        let desc = self.reserve(data.len());
        self.regions.push(Region::Input {
            base: desc.address,
            data,
        });
        desc
    }

    /// Exposes `data` for the engine to write.
    pub fn map_output(&mut self, data: &'a mut [u8]) -> DmaDescriptor {
        let desc = self.reserve(data.len());
        self.regions.push(Region::Output {
            base: desc.address,
            data,
        });
        desc
    }

    fn locate(&self, address: u64, len: usize) -> Option<(usize, usize)> {
        self.regions.iter().enumerate().find_map(|(i, region)| {
            let (base, size) = region.span();
            let offset = address.checked_sub(base)? as usize;
            (offset.checked_add(len)? <= size).then_some((i, offset))
        })
    }

    /// Engine-side read of `len` bytes at `address`, from either direction.
    pub fn read(&self, address: u64, len: usize) -> Result<&[u8], TransportError> {
        let (i, offset) = self
            .locate(address, len)
            .ok_or(TransportError::DmaFault { address })?;
        Ok(match &self.regions[i] {
            Region::Input { data, .. } => &data[offset..offset + len],
            Region::Output { data, .. } => &data[offset..offset + len],
        })
    }

    /// Engine-side write to an output region.
    pub fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), TransportError> {
        let (i, offset) = self
            .locate(address, bytes.len())
            .ok_or(TransportError::DmaFault { address })?;
        match &mut self.regions[i] {
            Region::Output { data, .. } => {
                data[offset..offset + bytes.len()].copy_from_slice(bytes);
                Ok(())
            }
            Region::Input { .. } => Err(TransportError::DmaFault { address }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_and_access() {
        let input = [1u8, 2, 3, 4];
        let mut output = [0u8; 8];
        {
            let mut dma = DmaMap::new();
            let in_desc = dma.map_input(&input);
            let out_desc = dma.map_output(&mut output);
            assert_eq!(in_desc.address, DmaMap::BASE_ADDRESS);
            assert_eq!(in_desc.length, 4);
            assert_eq!(out_desc.address, DmaMap::BASE_ADDRESS + 0x1000);
            assert_eq!(dma.read(in_desc.address + 1, 3).unwrap(), &[2, 3, 4]);
            dma.write(out_desc.address + 2, &[9, 9]).unwrap();
            assert_eq!(
                dma.write(in_desc.address, &[0]),
                Err(TransportError::DmaFault {
                    address: in_desc.address
                })
            );
            assert!(dma.read(in_desc.address, 5).is_err());
            assert!(dma.read(0x1234, 1).is_err());
        }
        assert_eq!(output, [0, 0, 9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_region_gets_its_own_address() {
        let mut dma = DmaMap::new();
        let a = dma.map_input(&[]);
        let b = dma.map_input(&[7]);
        assert_ne!(a.address, b.address);
        assert_eq!(dma.read(b.address, 1).unwrap(), &[7]);
    }
}
