//! Cairo short strings: up to 31 ASCII bytes packed big-endian into one felt.

use thiserror::Error;

use super::felt::Felt;

pub const MAX_SHORT_STRING_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortStringError {
    #[error("Short string is {len} bytes long; the maximum is {MAX_SHORT_STRING_LEN}")]
    TooLong { len: usize },
    #[error("Short string contains non-ASCII character {ch:?}")]
    NonAscii { ch: char },
}

pub fn encode_short_string(text: &str) -> Result<Felt, ShortStringError> {
    if let Some(ch) = text.chars().find(|c| !c.is_ascii()) {
        return Err(ShortStringError::NonAscii { ch });
    }
    if text.len() > MAX_SHORT_STRING_LEN {
        return Err(ShortStringError::TooLong { len: text.len() });
    }
    Ok(Felt::from_be_bytes(text.as_bytes()))
}

/// Reads a felt back as text. Returns `None` for zero and for any felt whose
/// bytes are not all printable ASCII.
pub fn decode_short_string(felt: &Felt) -> Option<String> {
    let bytes = felt.to_be_bytes();
    if bytes.is_empty() || bytes.len() > MAX_SHORT_STRING_LEN {
        return None;
    }
    if !bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return None;
    }
    String::from_utf8(bytes).ok()
}
