//! Adaptive embedding of a payload into the selected channels.
//!
//! # Format
//!
//! - First 24 slots, one LSB each: payload length (big-endian u16) then the
//!   variance percentile (u8)
//! - Remaining slots: payload bytes MSB-first, two bits per channel on
//!   high-variance pixels (earlier bit in bit 1), one bit otherwise
//! - A final lone bit landing on a 2-bit slot goes into bit 0 only
//!
//! # Errors
//!
//! Returns [`StegoError`] when embedding fails. Nothing is written unless the
//! whole payload fits.
use image::RgbImage;
use log::info;

use super::analysis::Analysis;
use super::cursor::Slot;
use super::header::Header;
use super::params::{StegoParams, validate_percentile};
use super::{HEADER_BITS, StegoError};

/// Embeds `payload` into a copy of `image`.
///
/// All analysis reads the unmodified cover; only the returned copy is
/// written to.
///
/// # Errors
///
/// Returns [`StegoError::PayloadTooLong`] when `payload` exceeds the 16-bit
/// length header, [`StegoError::InvalidParameters`] for a bad percentile or
/// clustering parameters, [`StegoError::NoCapacity`] when no coordinates are
/// selected and [`StegoError::CapacityExceeded`] when the selected channels
/// hold fewer bits than the header plus payload need.
pub fn embed_payload(
    image: &RgbImage,
    payload: &[u8],
    params: &StegoParams,
    percentile: u8,
) -> Result<RgbImage, StegoError>
{
    let length = u16::try_from(payload.len()).map_err(|_| {
        StegoError::PayloadTooLong {
            requested_bytes: payload.len(),
        }
    })?;
    validate_percentile(percentile)?;

    let analysis = Analysis::run(image, params)?;
    let cursor = analysis.cursor();
    let threshold = analysis.threshold(percentile);

    let required_bits = HEADER_BITS + payload.len() * 8;
    let available_bits = cursor.capacity_bits(threshold);
    if required_bits > available_bits
    {
        return Err(StegoError::CapacityExceeded {
            required_bits,
            available_bits,
        });
    }

    let mut stego = image.clone();
    let mut bits = PayloadBits::new(
        Header {
            length,
            percentile,
        },
        payload,
    );

    for slot in cursor.header_slots()
    {
        // capacity was checked above, the header cannot run dry
        let bit = bits.next().unwrap_or_default();
        write_slot(&mut stego, slot, bit, 1);
    }

    let mut written = HEADER_BITS;
    for slot in cursor.payload_slots(threshold)
    {
        let Some(first) = bits.next()
        else
        {
            break;
        };

        if slot.width == 2
            && let Some(second) = bits.next()
        {
            write_slot(&mut stego, slot, (first << 1) | second, 2);
            written += 2;
        }
        else
        {
            write_slot(&mut stego, slot, first, 1);
            written += 1;
        }
    }

    info!(
        "embedded {} payload bytes in {written} bits (threshold {threshold}, \
         p{percentile})",
        payload.len()
    );
    Ok(stego)
}

/// Overwrites the low `count` bits of the slot's channel with `value`.
fn write_slot(image: &mut RgbImage, slot: Slot, value: u8, count: u8)
{
    let channel =
        &mut image.get_pixel_mut(slot.at.x, slot.at.y).0[slot.channel];
    let mask = Slot::mask(count);
    *channel = (*channel & !mask) | (value & mask);
}

/// Iterator over the bits of the header followed by the payload
struct PayloadBits<'payload>
{
    /// The header to emit first
    header: Header,
    /// The index of the next header bit
    header_bit_index: usize,
    /// The payload to embed
    payload: &'payload [u8],
    /// The index of the next byte across the payload
    byte_index: usize,
    /// The index of the next bit in the current byte
    bit_index: u8,
}

impl<'payload> PayloadBits<'payload>
{
    fn new(header: Header, payload: &'payload [u8]) -> Self
    {
        Self {
            header,
            header_bit_index: 0,
            payload,
            byte_index: 0,
            bit_index: 0,
        }
    }

    fn next_bit(&mut self) -> Option<u8>
    {
        if self.header_bit_index < HEADER_BITS
        {
            let bit = self.header.bit(self.header_bit_index);
            self.header_bit_index += 1;
            return Some(bit);
        }

        let byte = *self.payload.get(self.byte_index)?;
        let bit = (byte >> (7 - self.bit_index)) & 1;

        self.bit_index += 1;
        if self.bit_index == 8
        {
            self.bit_index = 0;
            self.byte_index += 1;
        }

        Some(bit)
    }
}

impl Iterator for PayloadBits<'_>
{
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.next_bit()
    }
}
