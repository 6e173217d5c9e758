// Licensed under the Apache-2.0 license

//! Minimal DER reader and writer for the PKCS#1 RSA key structures.

use eip130_psa_error::{PsaError, PsaResult};
use zeroize::{Zeroize, Zeroizing};

const TAG_INTEGER: u8 = 0x02;
const TAG_SEQUENCE: u8 = 0x30;

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, n: usize) -> PsaResult<&'a [u8]> {
        if n > self.data.len() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let (head, rest) = self.data.split_at(n);
        self.data = rest;
        Ok(head)
    }

    fn read_length(&mut self) -> PsaResult<usize> {
        let first = self.take(1)?[0];
        match first {
            0x00..=0x7F => Ok(usize::from(first)),
            0x81 => {
                let len = usize::from(self.take(1)?[0]);
                if len < 0x80 {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                Ok(len)
            }
            0x82 => {
                let bytes = self.take(2)?;
                let len = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
                if len < 0x100 {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                Ok(len)
            }
            _ => Err(PsaError::INVALID_ARGUMENT),
        }
    }

    fn read_tlv(&mut self, tag: u8) -> PsaResult<&'a [u8]> {
        if self.take(1)?[0] != tag {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let len = self.read_length()?;
        self.take(len)
    }

    /// Non-negative INTEGER, returned without leading zero bytes.
    fn read_unsigned(&mut self) -> PsaResult<&'a [u8]> {
        let value = self.read_tlv(TAG_INTEGER)?;
        match value.first() {
            None => Err(PsaError::INVALID_ARGUMENT),
            Some(b) if b & 0x80 != 0 => Err(PsaError::INVALID_ARGUMENT),
            Some(_) => {
                let first = value.iter().position(|b| *b != 0).unwrap_or(value.len());
                Ok(&value[first..])
            }
        }
    }
}

/// Fields of an RSAPublicKey.
#[derive(Debug, PartialEq, Eq)]
pub struct RsaPublicKey<'a> {
    pub modulus: &'a [u8],
    pub public_exponent: &'a [u8],
}

/// Fields of a two-prime RSAPrivateKey, without leading zero bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct RsaPrivateKey<'a> {
    pub modulus: &'a [u8],
    pub public_exponent: &'a [u8],
    pub private_exponent: &'a [u8],
    /// p, q, d mod (p-1), d mod (q-1) and q^-1 mod p.
    pub crt: [&'a [u8]; 5],
}

impl<'a> RsaPrivateKey<'a> {
    /// The integers after the version, in DER order.
    pub fn integers(&self) -> [&'a [u8]; 8] {
        let [p, q, dp, dq, qinv] = self.crt;
        [
            self.modulus,
            self.public_exponent,
            self.private_exponent,
            p,
            q,
            dp,
            dq,
            qinv,
        ]
    }
}

fn sequence(der: &[u8]) -> PsaResult<Reader<'_>> {
    let mut outer = Reader::new(der);
    let body = outer.read_tlv(TAG_SEQUENCE)?;
    if !outer.is_empty() {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    Ok(Reader::new(body))
}

pub fn parse_rsa_public_key(der: &[u8]) -> PsaResult<RsaPublicKey<'_>> {
    let mut seq = sequence(der)?;
    let modulus = seq.read_unsigned()?;
    let public_exponent = seq.read_unsigned()?;
    if !seq.is_empty() || modulus.is_empty() || public_exponent.is_empty() {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    Ok(RsaPublicKey {
        modulus,
        public_exponent,
    })
}

pub fn parse_rsa_private_key(der: &[u8]) -> PsaResult<RsaPrivateKey<'_>> {
    let mut seq = sequence(der)?;
    if !seq.read_unsigned()?.is_empty() {
        // only two-prime keys (version 0)
        return Err(PsaError::NOT_SUPPORTED);
    }
    let modulus = seq.read_unsigned()?;
    let public_exponent = seq.read_unsigned()?;
    let private_exponent = seq.read_unsigned()?;
    let mut crt = [&[][..]; 5];
    for value in crt.iter_mut() {
        *value = seq.read_unsigned()?;
    }
    if !seq.is_empty() || modulus.is_empty() || private_exponent.is_empty() {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    Ok(RsaPrivateKey {
        modulus,
        public_exponent,
        private_exponent,
        crt,
    })
}

/// Bit length of a big-endian unsigned integer.
pub fn bit_length(value: &[u8]) -> u32 {
    match value.iter().position(|b| *b != 0) {
        Some(first) => {
            let top = value[first];
            (value.len() - first - 1) as u32 * 8 + (8 - top.leading_zeros())
        }
        None => 0,
    }
}

fn push_length(out: &mut Vec<u8>, len: usize) {
    match len {
        0..=0x7F => out.push(len as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        _ => {
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
}

fn push_unsigned(out: &mut Vec<u8>, value: &[u8]) {
    let first = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    let value = &value[first..];
    let pad = value.first().map_or(true, |b| b & 0x80 != 0);
    out.push(TAG_INTEGER);
    push_length(out, value.len() + usize::from(pad));
    if pad {
        out.push(0);
    }
    out.extend_from_slice(value);
}

fn encode_sequence(integers: &[&[u8]]) -> Vec<u8> {
    let capacity = integers.iter().map(|value| value.len() + 5).sum();
    let mut body = Vec::with_capacity(capacity);
    for value in integers {
        push_unsigned(&mut body, value);
    }
    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(TAG_SEQUENCE);
    push_length(&mut out, body.len());
    out.extend_from_slice(&body);
    body.zeroize();
    out
}

/// Encodes an RSAPublicKey from big-endian modulus and exponent.
pub fn encode_rsa_public_key(modulus: &[u8], public_exponent: &[u8]) -> Vec<u8> {
    encode_sequence(&[modulus, public_exponent])
}

/// Encodes a version 0 RSAPrivateKey.
pub fn encode_rsa_private_key(key: &RsaPrivateKey<'_>) -> Zeroizing<Vec<u8>> {
    let mut integers: Vec<&[u8]> = Vec::with_capacity(9);
    integers.push(&[0]);
    integers.extend_from_slice(&key.integers());
    Zeroizing::new(encode_sequence(&integers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key() {
        // 512-bit modulus, e = 65537
        let mut modulus = vec![0xC1u8; 64];
        modulus[63] = 0x0B;
        let der = encode_rsa_public_key(&modulus, &[0x01, 0x00, 0x01]);
        assert_eq!(&der[..4], &[0x30, 0x48, 0x02, 0x41]);
        assert_eq!(der[4], 0);
        let key = parse_rsa_public_key(&der).unwrap();
        assert_eq!(key.modulus, &modulus[..]);
        assert_eq!(key.public_exponent, &[1, 0, 1]);
        assert_eq!(bit_length(key.modulus), 512);
    }

    #[test]
    fn test_long_form_length() {
        let modulus = [0x9Du8; 256];
        let der = encode_rsa_public_key(&modulus, &[3]);
        assert_eq!(&der[..4], &[0x30, 0x82, 0x01, 0x08]);
        assert_eq!(parse_rsa_public_key(&der).unwrap().modulus.len(), 256);
    }

    #[test]
    fn test_malformed() {
        let der = encode_rsa_public_key(&[0xC1; 64], &[3]);
        assert!(parse_rsa_public_key(&der[..der.len() - 1]).is_err());
        let mut trailing = der.clone();
        trailing.push(0);
        assert!(parse_rsa_public_key(&trailing).is_err());
        let mut negative = der.clone();
        // drop the sign padding of the modulus
        negative.remove(4);
        negative[3] = 0x40;
        negative[1] = 0x45;
        assert_eq!(parse_rsa_public_key(&negative), Err(PsaError::INVALID_ARGUMENT));
        assert!(parse_rsa_public_key(&[0x31, 0x00]).is_err());
    }

    #[test]
    fn test_private_key() {
        let mut body = Vec::new();
        for value in [
            &[0u8][..],
            &[0xC1; 64],
            &[1, 0, 1],
            &[0x33; 64],
            &[0x44; 32],
            &[0x55; 32],
            &[0x66; 32],
            &[0x77; 32],
            &[0x08; 32],
        ] {
            push_unsigned(&mut body, value);
        }
        let mut der = vec![TAG_SEQUENCE];
        push_length(&mut der, body.len());
        der.extend_from_slice(&body);

        let key = parse_rsa_private_key(&der).unwrap();
        assert_eq!(key.modulus, &[0xC1; 64]);
        assert_eq!(key.public_exponent, &[1, 0, 1]);
        assert_eq!(key.private_exponent, &[0x33; 64]);
        assert_eq!(key.crt[0], &[0x44; 32]);
        assert_eq!(key.crt[4], &[0x08; 32]);
        assert_eq!(encode_rsa_private_key(&key).as_slice(), &der[..]);

        // a public key is not a private key
        assert!(parse_rsa_private_key(&encode_rsa_public_key(&[0xC1; 64], &[3])).is_err());
    }

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(&[]), 0);
        assert_eq!(bit_length(&[0, 0]), 0);
        assert_eq!(bit_length(&[0, 1]), 1);
        assert_eq!(bit_length(&[0x7F, 0]), 15);
    }
}
