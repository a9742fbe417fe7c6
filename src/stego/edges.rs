//! Sobel edge map over the analysis view.
//!
//! - Convolves the 3x3 Sobel pair at every interior pixel; border pixels have
//!   zero gradient and are never edges.
//! - Normalizes the magnitude field by its own maximum into `0..=255`.
//! - Thresholds the normalized field into a row-major coordinate list.
use image::{Rgb, RgbImage};
use log::debug;

use super::gray::GrayField;
use super::{Coordinate, StegoError};

type Kernel3 = [[i32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Smallest width and height that still has an interior pixel
pub const MIN_DIMENSION: u32 = 3;

/// Normalized gradient magnitude per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap
{
    width: u32,
    height: u32,
    magnitude: Vec<u8>,
}

impl EdgeMap
{
    /// Computes the normalized Sobel magnitude of `gray`.
    ///
    /// # Errors
    ///
    /// Returns [`StegoError::InvalidInput`] when either dimension is below
    /// [`MIN_DIMENSION`].
    pub fn compute(gray: &GrayField) -> Result<Self, StegoError>
    {
        let (w, h) = (gray.width(), gray.height());
        if w < MIN_DIMENSION || h < MIN_DIMENSION
        {
            return Err(StegoError::InvalidInput {
                width: w,
                height: h,
            });
        }

        let mut raw = vec![0.0_f64; w as usize * h as usize];
        let mut peak = 0.0_f64;
        for y in 1..h - 1
        {
            for x in 1..w - 1
            {
                let (gx, gy) = sobel_at(gray, x, y);
                let magnitude = f64::from(gx * gx + gy * gy).sqrt();
                raw[y as usize * w as usize + x as usize] = magnitude;
                peak = peak.max(magnitude);
            }
        }

        let magnitude = raw
            .into_iter()
            .map(|value| {
                if peak > 0.0
                {
                    // truncates towards zero; value / peak never exceeds 1
                    (value / peak * 255.0) as u8
                }
                else
                {
                    0
                }
            })
            .collect();

        Ok(Self {
            width: w,
            height: h,
            magnitude,
        })
    }

    /// Normalized magnitude at `(x, y)`.
    #[must_use]
    pub fn magnitude(&self, x: u32, y: u32) -> u8
    {
        self.magnitude[y as usize * self.width as usize + x as usize]
    }

    /// Row-major list of pixels whose magnitude is strictly above
    /// `threshold`.
    #[must_use]
    pub fn edges(&self, threshold: u8) -> Vec<Coordinate>
    {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Coordinate::new(x, y)))
            .filter(|at| self.magnitude(at.x, at.y) > threshold)
            .collect()
    }
}

/// Gradient components at an interior pixel.
fn sobel_at(gray: &GrayField, x: u32, y: u32) -> (i32, i32)
{
    let mut sum_x = 0;
    let mut sum_y = 0;
    for (ky, yy) in (y - 1..=y + 1).enumerate()
    {
        for (kx, xx) in (x - 1..=x + 1).enumerate()
        {
            let value = i32::from(gray.get(xx, yy));
            sum_x += value * SOBEL_KERNEL_X[ky][kx];
            sum_y += value * SOBEL_KERNEL_Y[ky][kx];
        }
    }
    (sum_x, sum_y)
}

/// Detects edge pixels of `image` in row-major order.
///
/// An empty list is not an error here; clustering rejects it.
///
/// # Errors
///
/// Returns [`StegoError::InvalidInput`] when the image is smaller than 3x3.
pub fn detect_edges(
    image: &RgbImage,
    threshold: u8,
) -> Result<Vec<Coordinate>, StegoError>
{
    let gray = GrayField::from_rgb(image);
    let edges = EdgeMap::compute(&gray)?.edges(threshold);
    debug!("edge map at threshold {threshold}: {} edge pixels", edges.len());
    Ok(edges)
}

/// Summary of an edge map at a given threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeStatistics
{
    pub total_pixels: usize,
    pub edge_pixels: usize,
    pub threshold: u8,
}

impl EdgeStatistics
{
    /// Share of the raster flagged as edges, in percent.
    #[must_use]
    pub fn edge_percentage(&self) -> f64
    {
        if self.total_pixels == 0
        {
            return 0.0;
        }
        self.edge_pixels as f64 / self.total_pixels as f64 * 100.0
    }
}

/// Counts edge pixels of `image` at `threshold`.
///
/// # Errors
///
/// Returns [`StegoError::InvalidInput`] when the image is smaller than 3x3.
pub fn edge_statistics(
    image: &RgbImage,
    threshold: u8,
) -> Result<EdgeStatistics, StegoError>
{
    let edges = detect_edges(image, threshold)?;
    Ok(EdgeStatistics {
        total_pixels: image.width() as usize * image.height() as usize,
        edge_pixels: edges.len(),
        threshold,
    })
}

/// Renders the thresholded edge mask, edges white on black.
///
/// # Errors
///
/// Returns [`StegoError::InvalidInput`] when the image is smaller than 3x3.
pub fn render_edge_mask(
    image: &RgbImage,
    threshold: u8,
) -> Result<RgbImage, StegoError>
{
    let mut canvas = RgbImage::new(image.width(), image.height());
    for at in detect_edges(image, threshold)?
    {
        canvas.put_pixel(at.x, at.y, Rgb([255, 255, 255]));
    }
    Ok(canvas)
}
