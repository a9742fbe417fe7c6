//! Grayscale analysis view of an RGB raster.
//!
//! Every analysis stage reads pixels through this view. Channels are masked
//! with [`ANALYSIS_MASK`] before the luma reduction, so the two bit planes
//! the payload lives in never influence edges, clusters or variances. The
//! encoder's cover and the decoder's stego image therefore produce the same
//! field.
use image::RgbImage;

use super::Coordinate;

/// Bits of each channel visible to analysis
pub const ANALYSIS_MASK: u8 = 0xFC;

/// Reduces a masked RGB triple to 8-bit luma (ITU-R 601-2, fixed point).
#[must_use]
pub fn luma(rgb: [u8; 3]) -> u8
{
    let [r, g, b] = rgb.map(|channel| u32::from(channel & ANALYSIS_MASK));
    // weights sum to 1 << 16, so the result never exceeds 255
    let value = (r * 19_595 + g * 38_470 + b * 7_471 + 0x8000) >> 16;
    u8::try_from(value).unwrap_or(u8::MAX)
}

/// Row-major grayscale plane derived from an RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayField
{
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayField
{
    /// Builds the analysis view of `image`.
    #[must_use]
    pub fn from_rgb(image: &RgbImage) -> Self
    {
        let data = image.pixels().map(|pixel| luma(pixel.0)).collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32
    {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32
    {
        self.height
    }

    /// Intensity at `(x, y)`. Coordinates must lie inside the field.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8
    {
        self.data[self.index(x, y)]
    }

    /// Population variance of the 3x3 window centred on `at`.
    ///
    /// The window is clipped at the raster border, so edge pixels average
    /// over fewer than nine samples.
    #[must_use]
    pub fn neighborhood_variance(&self, at: Coordinate) -> f64
    {
        let x_range = at.x.saturating_sub(1)..=(at.x + 1).min(self.width - 1);
        let y_range = at.y.saturating_sub(1)..=(at.y + 1).min(self.height - 1);

        let mut samples = [0.0_f64; 9];
        let mut count = 0;
        for y in y_range
        {
            for x in x_range.clone()
            {
                samples[count] = f64::from(self.get(x, y));
                count += 1;
            }
        }

        let window = &samples[..count];
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        window
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / n
    }

    fn index(&self, x: u32, y: u32) -> usize
    {
        y as usize * self.width as usize + x as usize
    }
}
