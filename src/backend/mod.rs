//! Interchangeable prefix-preserving anonymization engines.
//!
//! Every engine implements the same keyed construction: the first half of the
//! key drives AES-128, the second half is encrypted once to form a 128-bit pad.
//! For each bit position `pos` of the address, the AES input is the first `pos`
//! bits of the address followed by the remaining bits of the pad, and the most
//! significant bit of the ciphertext decides whether that address bit flips.
//!
//! The engines differ in how they get there:
//!
//! - [`BackendId::Masked`]: 128-bit integer arithmetic with precomputed pad masks
//! - [`BackendId::Streaming`]: streams address bits into a byte buffer seeded with the pad
//! - [`BackendId::HostOrder`]: 32-bit IPv4-only engine that keeps the first pad
//!   word in little-endian host order. Still prefix-preserving, but its
//!   results differ from the other two.

use std::fmt;
use std::str::FromStr;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};
use zeroize::Zeroize;

use crate::common::{ip_to_numeric, numeric_to_ip, parse_ip, Family};
use crate::error::{Error, Result};
use crate::key::Key;

#[cfg(feature = "backend-host-order")]
mod host_order;
#[cfg(feature = "backend-masked")]
mod masked;
#[cfg(feature = "backend-streaming")]
mod streaming;

/// The closed set of known backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendId {
    Masked,
    Streaming,
    HostOrder,
}

impl BackendId {
    pub const ALL: [BackendId; 3] = [BackendId::Masked, BackendId::Streaming, BackendId::HostOrder];

    pub const fn name(self) -> &'static str {
        match self {
            BackendId::Masked => "masked",
            BackendId::Streaming => "streaming",
            BackendId::HostOrder => "host-order",
        }
    }

    /// Cargo feature that compiles this backend in.
    pub const fn feature(self) -> &'static str {
        match self {
            BackendId::Masked => "backend-masked",
            BackendId::Streaming => "backend-streaming",
            BackendId::HostOrder => "backend-host-order",
        }
    }

    /// Builds a fresh handle for this backend bound to `key`.
    ///
    /// Fails with [`Error::BackendUnavailable`] if the backend was not
    /// compiled in. Each call returns an independent handle.
    pub fn initialize(self, key: &Key) -> Result<Box<dyn Backend + Send>> {
        match self {
            #[cfg(feature = "backend-masked")]
            BackendId::Masked => Ok(Box::new(masked::Masked::new(key))),
            #[cfg(feature = "backend-streaming")]
            BackendId::Streaming => Ok(Box::new(streaming::Streaming::new(key))),
            #[cfg(feature = "backend-host-order")]
            BackendId::HostOrder => Ok(Box::new(host_order::HostOrder::new(key))),
            #[allow(unreachable_patterns)]
            id => {
                let _ = key;
                Err(Error::BackendUnavailable {
                    backend: id,
                    reason: format!("compiled without the `{}` feature", id.feature()),
                })
            }
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BackendId::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| Error::UnsupportedBackend(s.to_owned()))
    }
}

/// The capability every backend provides.
///
/// Implementations are deterministic: for a fixed key, the same input always
/// maps to the same output.
pub trait Backend {
    fn id(&self) -> BackendId;

    /// Anonymizes the integer form of an address of the given family.
    fn anonymize_numeric(&self, value: u128, family: Family) -> Result<u128>;

    /// Inverts [`Backend::anonymize_numeric`] for the same key.
    fn deanonymize_numeric(&self, value: u128, family: Family) -> Result<u128>;

    /// Anonymizes an IPv4 or IPv6 literal.
    fn anonymize_text(&self, text: &str) -> Result<String> {
        let (value, family) = ip_to_numeric(parse_ip(text)?);
        let anonymized = self.anonymize_numeric(value, family)?;
        Ok(numeric_to_ip(anonymized, family)?.to_string())
    }

    /// Inverts [`Backend::anonymize_text`] for the same key.
    fn deanonymize_text(&self, text: &str) -> Result<String> {
        let (value, family) = ip_to_numeric(parse_ip(text)?);
        let original = self.deanonymize_numeric(value, family)?;
        Ok(numeric_to_ip(original, family)?.to_string())
    }
}

/// AES-128 keyed with the first key half, plus the encrypted second half.
pub(crate) struct PadCipher {
    cipher: Aes128,
    pad: [u8; 16],
}

impl PadCipher {
    pub(crate) fn new(key: &Key) -> Self {
        let mut cipher_key = key.cipher_half();
        let cipher = Aes128::new(&cipher_key.into());
        cipher_key.zeroize();

        let mut block = Block::from(key.pad_half());
        cipher.encrypt_block(&mut block);
        Self {
            cipher,
            pad: block.into(),
        }
    }

    pub(crate) fn pad(&self) -> &[u8; 16] {
        &self.pad
    }

    /// Encrypts `input` and returns the most significant bit of the ciphertext.
    pub(crate) fn flip_bit(&self, input: [u8; 16]) -> u8 {
        let mut block = Block::from(input);
        self.cipher.encrypt_block(&mut block);
        block[0] >> 7
    }
}

impl Drop for PadCipher {
    fn drop(&mut self) {
        self.pad.zeroize();
    }
}

/// Checks the AES implementation against the FIPS-197 appendix C.1 vector.
pub(crate) fn aes_self_test() -> bool {
    const KEY: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];
    const PLAINTEXT: [u8; 16] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ];
    const CIPHERTEXT: [u8; 16] = [
        0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4, 0xc5,
        0x5a,
    ];

    let cipher = Aes128::new(&KEY.into());
    let mut block = Block::from(PLAINTEXT);
    cipher.encrypt_block(&mut block);
    block.as_slice() == &CIPHERTEXT[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 32] = b"32-char-str-for-AES-key-and-pad.";

    #[test]
    fn test_backend_names() {
        for id in BackendId::ALL {
            assert_eq!(id.name().parse::<BackendId>().unwrap(), id);
            assert_eq!(id.to_string(), id.name());
        }
        assert_eq!(
            "cpp-cryptopan".parse::<BackendId>().unwrap_err(),
            Error::UnsupportedBackend("cpp-cryptopan".to_owned())
        );
    }

    #[test]
    fn test_aes_self_test() {
        assert!(aes_self_test());
    }

    #[test]
    fn test_pad_is_encrypted_second_half() {
        let key = Key::from_bytes(*KEY);
        let prf = PadCipher::new(&key);
        assert_ne!(prf.pad(), &key.pad_half());
        assert_eq!(prf.pad(), PadCipher::new(&key).pad());
    }

    #[test]
    #[cfg(feature = "backend-masked")]
    fn test_handles_are_independent() {
        let key = Key::from_bytes(*KEY);
        let first = BackendId::Masked.initialize(&key).unwrap();
        let second = BackendId::Masked.initialize(&key).unwrap();
        drop(first);
        assert_eq!(second.anonymize_text("192.0.2.1").unwrap(), "192.0.125.244");
        assert_eq!(second.id(), BackendId::Masked);
    }
}
