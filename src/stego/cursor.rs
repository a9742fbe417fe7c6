//! Channel cursor: the `(x, y, channel)` sequence bits are allocated over.
//!
//! The first [`HEADER_BITS`] slots always carry one bit. Every later slot
//! carries two bits when its pixel's neighborhood variance reaches the
//! threshold, one bit otherwise. All three channels of a pixel share the
//! decision.
use super::gray::GrayField;
use super::{Coordinate, HEADER_BITS};

/// Channels per pixel that carry bits
pub const CHANNELS: usize = 3;

/// One channel of one pixel together with the bits it may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot
{
    pub at: Coordinate,
    pub channel: usize,
    /// 1 or 2
    pub width: u8,
}

impl Slot
{
    /// Low-bit mask covering `bits` bits.
    #[must_use]
    pub fn mask(bits: u8) -> u8
    {
        (1 << bits) - 1
    }
}

/// Selected coordinates expanded three-wide, with the per-pixel variance
/// that decides each slot's width.
#[derive(Debug, Clone)]
pub struct ChannelCursor<'a>
{
    coordinates: &'a [Coordinate],
    variances: Vec<f64>,
}

impl<'a> ChannelCursor<'a>
{
    /// Evaluates the neighborhood variance of every coordinate on `gray`.
    #[must_use]
    pub fn new(gray: &GrayField, coordinates: &'a [Coordinate]) -> Self
    {
        let variances = coordinates
            .iter()
            .map(|&at| gray.neighborhood_variance(at))
            .collect();
        Self {
            coordinates,
            variances,
        }
    }

    /// Total number of channel slots.
    #[must_use]
    pub fn slot_count(&self) -> usize
    {
        self.coordinates.len() * CHANNELS
    }

    fn positions(&self) -> impl Iterator<Item = (Coordinate, usize, f64)> + '_
    {
        self.coordinates
            .iter()
            .zip(&self.variances)
            .flat_map(|(&at, &variance)| {
                (0..CHANNELS).map(move |channel| (at, channel, variance))
            })
    }

    /// The 1-bit header slots; fewer than [`HEADER_BITS`] on tiny subsets.
    pub fn header_slots(&self) -> impl Iterator<Item = Slot> + '_
    {
        self.positions()
            .take(HEADER_BITS)
            .map(|(at, channel, _)| Slot {
                at,
                channel,
                width: 1,
            })
    }

    /// Slots after the header, sized against `threshold`.
    pub fn payload_slots(
        &self,
        threshold: f64,
    ) -> impl Iterator<Item = Slot> + '_
    {
        self.positions()
            .skip(HEADER_BITS)
            .map(move |(at, channel, variance)| Slot {
                at,
                channel,
                width: if variance >= threshold { 2 } else { 1 },
            })
    }

    /// Bits the payload slots can hold at `threshold`.
    #[must_use]
    pub fn payload_capacity_bits(&self, threshold: f64) -> usize
    {
        self.payload_slots(threshold)
            .map(|slot| usize::from(slot.width))
            .sum()
    }

    /// Bits the whole cursor can hold at `threshold`, header included.
    #[must_use]
    pub fn capacity_bits(&self, threshold: f64) -> usize
    {
        self.slot_count().min(HEADER_BITS)
            + self.payload_capacity_bits(threshold)
    }
}

#[cfg(test)]
mod tests
{
    use image::{Rgb, RgbImage};

    use super::*;

    fn striped_gray() -> GrayField
    {
        // columns 0..4 flat, column 5 onwards next to a bright stripe
        let mut image = RgbImage::from_pixel(12, 12, Rgb([20, 20, 20]));
        for y in 0..12
        {
            image.put_pixel(6, y, Rgb([240, 240, 240]));
        }
        GrayField::from_rgb(&image)
    }

    #[test]
    fn header_slots_are_single_bit_even_on_textured_pixels()
    {
        let gray = striped_gray();
        let coords: Vec<_> = (0..12).map(|y| Coordinate::new(6, y)).collect();
        let cursor = ChannelCursor::new(&gray, &coords);

        let header: Vec<_> = cursor.header_slots().collect();
        assert_eq!(header.len(), HEADER_BITS);
        assert!(header.iter().all(|slot| slot.width == 1));
        assert_eq!(header[0].at, Coordinate::new(6, 0));
        assert_eq!(header[2].channel, 2);
        assert_eq!(header[3].at, Coordinate::new(6, 1));
    }

    #[test]
    fn payload_widths_follow_the_threshold()
    {
        let gray = striped_gray();
        // 8 header pixels on the flat side, then one flat and one textured
        let mut coords: Vec<_> =
            (0..8).map(|y| Coordinate::new(1, y)).collect();
        coords.push(Coordinate::new(2, 0));
        coords.push(Coordinate::new(6, 5));
        let cursor = ChannelCursor::new(&gray, &coords);

        let widths: Vec<_> =
            cursor.payload_slots(1.0).map(|slot| slot.width).collect();
        assert_eq!(widths, vec![1, 1, 1, 2, 2, 2]);
        assert_eq!(cursor.payload_capacity_bits(1.0), 9);
        assert_eq!(cursor.capacity_bits(1.0), HEADER_BITS + 9);
        // a zero threshold lets every payload slot carry two bits
        assert_eq!(cursor.payload_capacity_bits(0.0), 12);
    }

    #[test]
    fn short_cursor_cannot_fill_the_header()
    {
        let gray = striped_gray();
        let coords = [Coordinate::new(3, 3), Coordinate::new(4, 4)];
        let cursor = ChannelCursor::new(&gray, &coords);
        assert_eq!(cursor.slot_count(), 6);
        assert_eq!(cursor.header_slots().count(), 6);
        assert_eq!(cursor.payload_slots(0.0).count(), 0);
        assert_eq!(cursor.capacity_bits(0.0), 6);
    }

    #[test]
    fn mask_covers_requested_bits()
    {
        assert_eq!(Slot::mask(1), 0b01);
        assert_eq!(Slot::mask(2), 0b11);
    }
}
