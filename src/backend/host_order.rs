use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::backend::{Backend, BackendId, PadCipher};
use crate::common::{check_range, Family};
use crate::error::{Error, Result};
use crate::key::Key;

/// 32-bit IPv4-only engine.
///
/// Addresses are handled in network order, but the first word of the pad is
/// loaded little-endian, the way a C library does when it copies the pad into
/// a native `uint32_t` on an x86 host. Each flip bit still depends only on the
/// address prefix, so prefixes are preserved; the outputs, textual and
/// numeric, disagree with [`BackendId::Masked`] and [`BackendId::Streaming`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HostOrder {
    #[zeroize(skip)]
    prf: PadCipher,
    /// First four bytes of the pad, in host order.
    pad_head: u32,
}

impl HostOrder {
    pub fn new(key: &Key) -> Self {
        let prf = PadCipher::new(key);
        let pad = prf.pad();
        let pad_head = u32::from_le_bytes([pad[0], pad[1], pad[2], pad[3]]);
        Self { prf, pad_head }
    }

    fn flip_bit(&self, prefix: u32, pos: u32) -> u32 {
        let tail = u32::MAX >> pos;
        let head = (prefix & !tail) | (self.pad_head & tail);
        let mut block = *self.prf.pad();
        block[..4].copy_from_slice(&head.to_be_bytes());
        u32::from(self.prf.flip_bit(block))
    }

    fn anonymize_u32(&self, addr: u32) -> u32 {
        let result = (0..32).fold(0u32, |result, pos| {
            result | (self.flip_bit(addr, pos) << (31 - pos))
        });
        result ^ addr
    }

    fn deanonymize_u32(&self, addr: u32) -> u32 {
        (0..32).fold(0u32, |original, pos| {
            let bit = ((addr >> (31 - pos)) & 1) ^ self.flip_bit(original, pos);
            original | (bit << (31 - pos))
        })
    }

    fn ipv4_only(&self, value: u128, family: Family) -> Result<u32> {
        if family != Family::V4 {
            return Err(Error::UnsupportedFamily {
                backend: BackendId::HostOrder,
                family,
            });
        }
        check_range(value, family)?;
        Ok(value as u32)
    }
}

impl Backend for HostOrder {
    fn id(&self) -> BackendId {
        BackendId::HostOrder
    }

    fn anonymize_numeric(&self, value: u128, family: Family) -> Result<u128> {
        let addr = self.ipv4_only(value, family)?;
        Ok(self.anonymize_u32(addr).into())
    }

    fn deanonymize_numeric(&self, value: u128, family: Family) -> Result<u128> {
        let addr = self.ipv4_only(value, family)?;
        Ok(self.deanonymize_u32(addr).into())
    }
}
