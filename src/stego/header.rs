//! The 24-bit header: payload length then variance percentile.
use super::{HEADER_BITS, LENGTH_BITS, PERCENTILE_BITS};

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header
{
    /// Payload length in bytes.
    pub length: u16,
    /// Percentile the encoder derived the variance threshold from.
    pub percentile: u8,
}

impl Header
{
    /// Packs the fields MSB-first into the low [`HEADER_BITS`] bits.
    #[must_use]
    pub fn to_bits(self) -> u32
    {
        (u32::from(self.length) << PERCENTILE_BITS) | u32::from(self.percentile)
    }

    /// Unpacks the low [`HEADER_BITS`] bits of `bits`.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self
    {
        let bits = bits & ((1 << HEADER_BITS) - 1);
        let length_mask = (1 << LENGTH_BITS) - 1;
        Self {
            length: u16::try_from((bits >> PERCENTILE_BITS) & length_mask)
                .unwrap_or(u16::MAX),
            percentile: u8::try_from(bits & 0xFF).unwrap_or(u8::MAX),
        }
    }

    /// Header bit `index`, counted from the most significant.
    #[must_use]
    pub fn bit(self, index: usize) -> u8
    {
        let shift = HEADER_BITS - 1 - index;
        u8::from((self.to_bits() >> shift) & 1 == 1)
    }
}
