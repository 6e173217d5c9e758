/*++

Licensed under the Apache-2.0 license.

File Name:

    token.rs

Abstract:

    File contains the fixed-size command and result token buffers exchanged
    with the EIP-130 engine, and the word-level codec shared by all token
    layouts.

--*/

use bitfield::bitfield;

use crate::opcode::{Opcode, Subcode};

/// Number of 32-bit words in a command or result token.
pub const TOKEN_WORDS: usize = 64;

/// Pattern written by [`CommandToken::clear`] so stale words are easy to spot.
pub const POISON_WORD: u32 = 0xAAAA_AAAA;

/// Largest length a DMA descriptor can carry (21 bits).
pub const DMA_MAX_LENGTH: u32 = 0x001F_FFFF;

/// Result word 0 flag that decides whether bit 16 survives in a negative status.
pub const RESULT_FASVC: u32 = 1 << 16;

const RESULT_ERROR_FLAG: u32 = 1 << 7;

bitfield! {
    /// Word 0 of a command token.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct TokenHeader(u32);
    impl Debug;
    pub u16, token_id, set_token_id: 15, 0;
    pub write_token_id, set_write_token_id: 18;
    pub u8, opcode_bits, set_opcode_bits: 27, 24;
    pub u8, subcode_bits, set_subcode_bits: 31, 28;
}

bitfield! {
    /// Word 0 of a result token.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct ResultHeader(u32);
    impl Debug;
    pub u16, token_id, set_token_id: 15, 0;
    pub fasvc, set_fasvc: 16;
    pub u8, status_byte, set_status_byte: 31, 24;
}

/// Packs `bytes` into `words` starting at `start_word`, four bytes per word,
/// least significant byte first. A trailing partial word is zero-filled.
pub fn write_byte_array(words: &mut [u32], start_word: usize, bytes: &[u8]) {
    debug_assert!(
        start_word + bytes.len().div_ceil(4) <= words.len(),
        "byte array overruns token"
    );
    for (i, chunk) in bytes.chunks(4).enumerate() {
        let mut le = [0u8; 4];
        le[..chunk.len()].copy_from_slice(chunk);
        words[start_word + i] = u32::from_le_bytes(le);
    }
}

/// Inverse of [`write_byte_array`]: copies `length` bytes starting at
/// `start_word` into `out`, and zero-fills whatever of `out` lies beyond.
pub fn read_byte_array(words: &[u32], start_word: usize, length: usize, out: &mut [u8]) {
    debug_assert!(out.len() >= length, "output shorter than requested length");
    debug_assert!(
        start_word + length.div_ceil(4) <= words.len(),
        "byte array overruns token"
    );
    for (i, chunk) in out[..length].chunks_mut(4).enumerate() {
        let le = words[start_word + i].to_le_bytes();
        chunk.copy_from_slice(&le[..chunk.len()]);
    }
    out[length..].fill(0);
}

/// Decodes the function status carried in result word 0.
///
/// Returns 0 on success, a positive warning code, or a negative error code.
/// An error is reported as exactly `-code` when FASVC is set; otherwise bit 16
/// of the two's-complement value is cleared as well.
pub fn decode_status(words: &[u32]) -> i32 {
    let result = words[0] >> 24;
    let fasvc = words[0] & RESULT_FASVC;
    if result & RESULT_ERROR_FLAG != 0 {
        let rv = -((result & 0x7F) as i32);
        if fasvc == 0 {
            (rv as u32 & !RESULT_FASVC) as i32
        } else {
            rv
        }
    } else {
        (result | fasvc) as i32
    }
}

/// Command token sent to the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandToken {
    words: [u32; TOKEN_WORDS],
}

impl Default for CommandToken {
    fn default() -> Self {
        Self {
            words: [0; TOKEN_WORDS],
        }
    }
}

impl core::fmt::Debug for CommandToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandToken")
            .field("header", &self.header())
            .field("identity", &self.words[1])
            .finish_non_exhaustive()
    }
}

impl CommandToken {
    /// Zeroed token with the given operation selected.
    pub fn new(opcode: Opcode, subcode: Subcode) -> Self {
        let mut token = Self::default();
        let mut header = TokenHeader(0);
        header.set_opcode_bits(opcode.0);
        header.set_subcode_bits(subcode.0);
        token.words[0] = header.0;
        token
    }

    pub fn from_words(words: [u32; TOKEN_WORDS]) -> Self {
        Self { words }
    }

    /// Fills every word with [`POISON_WORD`].
    pub fn clear(&mut self) {
        self.words.fill(POISON_WORD);
    }

    pub fn words(&self) -> &[u32; TOKEN_WORDS] {
        &self.words
    }

    pub fn word(&self, index: usize) -> u32 {
        self.words[index]
    }

    pub fn set_word(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }

    pub(crate) fn or_word(&mut self, index: usize, bits: u32) {
        self.words[index] |= bits;
    }

    pub fn header(&self) -> TokenHeader {
        TokenHeader(self.words[0])
    }

    pub fn opcode(&self) -> Opcode {
        Opcode(self.header().opcode_bits())
    }

    pub fn subcode(&self) -> Subcode {
        Subcode(self.header().subcode_bits())
    }

    pub fn set_identity(&mut self, identity: u32) {
        self.words[1] = identity;
    }

    pub fn identity(&self) -> u32 {
        self.words[1]
    }

    /// Writes the token id and the write-token-id flag, leaving the opcode
    /// fields untouched.
    pub fn set_token_id(&mut self, id: u16, write_token_id: bool) {
        let mut header = self.header();
        header.set_token_id(id);
        header.set_write_token_id(write_token_id);
        self.words[0] = header.0;
    }

    pub fn token_id(&self) -> u16 {
        self.header().token_id()
    }

    pub fn write_byte_array(&mut self, start_word: usize, bytes: &[u8]) {
        write_byte_array(&mut self.words, start_word, bytes);
    }

    pub fn read_byte_array(&self, start_word: usize, length: usize, out: &mut [u8]) {
        read_byte_array(&self.words, start_word, length, out);
    }

    /// Splits a 64-bit bus address across `low_word` and the word after it.
    pub fn set_dma_address(&mut self, low_word: usize, address: u64) {
        self.words[low_word] = address as u32;
        self.words[low_word + 1] = (address >> 32) as u32;
    }

    pub fn dma_address(&self, low_word: usize) -> u64 {
        u64::from(self.words[low_word]) | (u64::from(self.words[low_word + 1]) << 32)
    }
}

/// Result token returned by the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct ResultToken {
    words: [u32; TOKEN_WORDS],
}

impl Default for ResultToken {
    fn default() -> Self {
        Self {
            words: [0; TOKEN_WORDS],
        }
    }
}

impl core::fmt::Debug for ResultToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResultToken")
            .field("token_id", &self.token_id())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ResultToken {
    /// Successful result echoing `token_id`.
    pub fn new(token_id: u16) -> Self {
        let mut token = Self::default();
        let mut header = ResultHeader(0);
        header.set_token_id(token_id);
        token.words[0] = header.0;
        token
    }

    pub fn from_words(words: [u32; TOKEN_WORDS]) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u32; TOKEN_WORDS] {
        &self.words
    }

    pub fn word(&self, index: usize) -> u32 {
        self.words[index]
    }

    pub fn set_word(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }

    pub fn header(&self) -> ResultHeader {
        ResultHeader(self.words[0])
    }

    pub fn token_id(&self) -> u16 {
        self.header().token_id()
    }

    /// See [`decode_status`].
    pub fn status(&self) -> i32 {
        decode_status(&self.words)
    }

    pub fn is_error(&self) -> bool {
        self.header().status_byte() & RESULT_ERROR_FLAG as u8 != 0
    }

    /// Magnitude of the engine error code, if the result reports one.
    pub fn error_code(&self) -> Option<u8> {
        self.is_error()
            .then(|| self.header().status_byte() & 0x7F)
    }

    /// Marks the result as failed with engine error `code` (1..=127).
    pub fn set_error(&mut self, code: u8, fasvc: bool) {
        let mut header = self.header();
        header.set_status_byte(RESULT_ERROR_FLAG as u8 | (code & 0x7F));
        header.set_fasvc(fasvc);
        self.words[0] = header.0;
    }

    /// Stores a non-error status byte (0 = success, otherwise a warning).
    pub fn set_warning(&mut self, code: u8) {
        let mut header = self.header();
        header.set_status_byte(code);
        self.words[0] = header.0;
    }

    pub fn read_byte_array(&self, start_word: usize, length: usize, out: &mut [u8]) {
        read_byte_array(&self.words, start_word, length, out);
    }
}
