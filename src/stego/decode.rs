//! Extraction of a payload written by [`embed_payload`].
//!
//! The decoder reruns the analysis stages on the stego image, reads the
//! header at one bit per slot, rebuilds the variance threshold from the
//! decoded percentile and walks the payload slots exactly like the encoder.
//!
//! [`embed_payload`]: super::embed_payload
use image::RgbImage;
use log::info;

use super::analysis::Analysis;
use super::cursor::{ChannelCursor, Slot};
use super::header::Header;
use super::params::{MAX_PERCENTILE, StegoParams};
use super::{HEADER_BITS, StegoError};

/// Reads only the 24-bit header from `image`.
///
/// # Errors
///
/// Returns the analysis errors of [`extract_payload`],
/// [`StegoError::InsufficientData`] when fewer than 24 slots are selected
/// and [`StegoError::InvalidHeader`] when the percentile is out of range.
pub fn read_header(
    image: &RgbImage,
    params: &StegoParams,
) -> Result<Header, StegoError>
{
    let analysis = Analysis::run(image, params)?;
    header_from_cursor(image, &analysis.cursor())
}

/// Extracts the payload embedded in `image` under `params`.
///
/// # Errors
///
/// Returns [`StegoError::InvalidInput`], [`StegoError::InvalidParameters`] or
/// [`StegoError::NoCapacity`] when the analysis stages fail,
/// [`StegoError::InsufficientData`] when the selected slots end before the
/// header or the declared payload is complete and
/// [`StegoError::InvalidHeader`] when the decoded percentile is out of range.
pub fn extract_payload(
    image: &RgbImage,
    params: &StegoParams,
) -> Result<Vec<u8>, StegoError>
{
    let analysis = Analysis::run(image, params)?;
    let cursor = analysis.cursor();
    let header = header_from_cursor(image, &cursor)?;
    let threshold = analysis.threshold(header.percentile);

    let required_bits = usize::from(header.length) * 8;
    let available_bits = cursor.payload_capacity_bits(threshold);
    if available_bits < required_bits
    {
        return Err(StegoError::InsufficientData {
            required_bits: HEADER_BITS + required_bits,
            available_bits: HEADER_BITS + available_bits,
        });
    }

    let mut collector = ByteCollector::with_capacity(header.length.into());
    for slot in cursor.payload_slots(threshold)
    {
        let outstanding = required_bits - collector.bits_collected();
        if outstanding == 0
        {
            break;
        }

        // a lone final bit sits in bit 0 even on a 2-bit slot
        let count = if outstanding == 1 { 1 } else { slot.width };
        let value = read_slot(image, slot) & Slot::mask(count);
        if count == 2
        {
            collector.push((value >> 1) & 1);
        }
        collector.push(value & 1);
    }

    info!(
        "extracted {} payload bytes (threshold {threshold}, p{})",
        header.length, header.percentile
    );
    Ok(collector.into_bytes())
}

/// Decodes the header from the first 24 slots of `cursor`.
fn header_from_cursor(
    image: &RgbImage,
    cursor: &ChannelCursor<'_>,
) -> Result<Header, StegoError>
{
    let available_bits = cursor.slot_count();
    if available_bits < HEADER_BITS
    {
        return Err(StegoError::InsufficientData {
            required_bits: HEADER_BITS,
            available_bits,
        });
    }

    let bits = cursor.header_slots().fold(0_u32, |acc, slot| {
        (acc << 1) | u32::from(read_slot(image, slot) & 1)
    });
    let header = Header::from_bits(bits);

    if header.percentile > MAX_PERCENTILE
    {
        return Err(StegoError::InvalidHeader {
            percentile: header.percentile,
        });
    }
    Ok(header)
}

fn read_slot(image: &RgbImage, slot: Slot) -> u8
{
    image.get_pixel(slot.at.x, slot.at.y).0[slot.channel]
}

/// Packs a MSB-first bit stream into bytes.
struct ByteCollector
{
    bytes: Vec<u8>,
    current: u8,
    bits_in_current: u8,
}

impl ByteCollector
{
    fn with_capacity(capacity: usize) -> Self
    {
        Self {
            bytes: Vec::with_capacity(capacity),
            current: 0,
            bits_in_current: 0,
        }
    }

    fn push(&mut self, bit: u8)
    {
        self.current = (self.current << 1) | (bit & 1);
        self.bits_in_current += 1;
        if self.bits_in_current == 8
        {
            self.bytes.push(self.current);
            self.current = 0;
            self.bits_in_current = 0;
        }
    }

    fn bits_collected(&self) -> usize
    {
        self.bytes.len() * 8 + usize::from(self.bits_in_current)
    }

    fn into_bytes(self) -> Vec<u8>
    {
        self.bytes
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn collector_packs_msb_first()
    {
        let mut collector = ByteCollector::with_capacity(2);
        for bit in [1, 0, 0, 0, 0, 0, 0, 1, 1, 1]
        {
            collector.push(bit);
        }
        assert_eq!(collector.bits_collected(), 10);
        // the trailing partial byte is dropped
        assert_eq!(collector.into_bytes(), vec![0x81]);
    }
}
