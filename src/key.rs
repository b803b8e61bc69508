use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// A 32-byte anonymization key.
///
/// The first 16 bytes key the AES-128 cipher, the last 16 bytes are encrypted
/// under that cipher to derive the pad. Key bytes are wiped when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    bytes: [u8; Key::BYTES],
}

impl Key {
    /// The number of bytes required for a key.
    pub const BYTES: usize = 32;

    /// Creates a key from a byte slice.
    ///
    /// Fails with [`Error::InvalidKey`] unless `bytes` is exactly
    /// [`Key::BYTES`] long. Keys are never truncated or padded.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Self::BYTES] = bytes.try_into().map_err(|_| Error::InvalidKey {
            expected: Self::BYTES,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Creates a key from an array of the right length.
    pub fn from_bytes(bytes: [u8; Self::BYTES]) -> Self {
        Self { bytes }
    }

    /// Generates a new random key.
    #[cfg(feature = "random")]
    pub fn generate() -> Self {
        Self {
            bytes: rand::random(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.bytes
    }

    /// Half used as the AES-128 key.
    pub(crate) fn cipher_half(&self) -> [u8; 16] {
        let mut half = [0u8; 16];
        half.copy_from_slice(&self.bytes[..16]);
        half
    }

    /// Half encrypted to form the pad.
    pub(crate) fn pad_half(&self) -> [u8; 16] {
        let mut half = [0u8; 16];
        half.copy_from_slice(&self.bytes[16..]);
        half
    }
}

impl TryFrom<&[u8]> for Key {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::new(bytes)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(..)")
    }
}
