use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::backend::{Backend, BackendId, PadCipher};
use crate::common::{check_range, left_align, Family};
use crate::error::Result;
use crate::key::Key;

/// Integer engine with a precomputed pad tail for every prefix length.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Masked {
    #[zeroize(skip)]
    prf: PadCipher,
    /// `pad_tails[pos]` keeps the low `128 - pos` bits of the pad.
    pad_tails: [u128; 128],
}

impl Masked {
    pub fn new(key: &Key) -> Self {
        let prf = PadCipher::new(key);
        let pad = u128::from_be_bytes(*prf.pad());
        let mut pad_tails = [0u128; 128];
        for (pos, tail) in pad_tails.iter_mut().enumerate() {
            *tail = pad & Self::tail_mask(pos);
        }
        Self { prf, pad_tails }
    }

    /// Mask selecting every bit after the first `pos` bits.
    fn tail_mask(pos: usize) -> u128 {
        u128::MAX >> pos
    }

    fn flip_bit(&self, aligned_prefix: u128, pos: usize) -> u128 {
        let prefix = aligned_prefix & !Self::tail_mask(pos);
        let input = prefix | self.pad_tails[pos];
        u128::from(self.prf.flip_bit(input.to_be_bytes()))
    }
}

impl Backend for Masked {
    fn id(&self) -> BackendId {
        BackendId::Masked
    }

    fn anonymize_numeric(&self, value: u128, family: Family) -> Result<u128> {
        check_range(value, family)?;
        let aligned = left_align(value, family);
        let flips = (0..family.bits() as usize)
            .fold(0u128, |flips, pos| (flips << 1) | self.flip_bit(aligned, pos));
        Ok(value ^ flips)
    }

    fn deanonymize_numeric(&self, value: u128, family: Family) -> Result<u128> {
        check_range(value, family)?;
        let bits = family.bits() as usize;
        let anonymized = left_align(value, family);
        let mut original = 0u128;
        for pos in 0..bits {
            let shift = 127 - pos;
            let bit = ((anonymized >> shift) & 1) ^ self.flip_bit(original, pos);
            original |= bit << shift;
        }
        Ok(original >> (128 - bits))
    }
}
