//! Capacity queries.
//!
//! [`estimate_capacity`] samples the variance over the coordinate prefix and
//! extrapolates the share of 2-bit pixels across the whole selection; it is
//! a quick guide and encode may still fail near the boundary.
//! [`max_payload_size`] walks the full allocation and is exact.
use image::RgbImage;
use log::debug;

use super::analysis::Analysis;
use super::cursor::CHANNELS;
use super::params::{StegoParams, validate_percentile};
use super::threshold::{percentile, sample_variances};
use super::{HEADER_BITS, MAX_PAYLOAD_LEN, StegoError};

/// Estimated payload capacity in bytes.
///
/// # Errors
///
/// Returns [`StegoError::InvalidParameters`] for a bad percentile,
/// [`StegoError::CapacityExceeded`] when the selected channels cannot hold
/// the header and the analysis errors of [`Analysis::run`].
pub fn estimate_capacity(
    image: &RgbImage,
    params: &StegoParams,
    percentile_rank: u8,
) -> Result<usize, StegoError>
{
    validate_percentile(percentile_rank)?;
    let analysis = Analysis::run(image, params)?;
    ensure_header_fits(analysis.selected().len() * CHANNELS)?;

    let sample = sample_variances(analysis.gray(), analysis.selected());
    let threshold = percentile(&sample, percentile_rank);
    let high = sample.iter().filter(|&&v| v >= threshold).count();
    let high_ratio = high as f64 / sample.len() as f64;

    let payload_slots = analysis.selected().len() * CHANNELS - HEADER_BITS;
    let bits = (payload_slots as f64 * (1.0 + high_ratio)).floor() as usize;
    debug!(
        "capacity estimate: {payload_slots} payload slots, {:.1}% high \
         variance, {bits} bits",
        high_ratio * 100.0
    );
    Ok((bits / 8).min(MAX_PAYLOAD_LEN))
}

/// Largest payload, in bytes, that [`embed_payload`] accepts for `image`.
///
/// [`embed_payload`]: super::embed_payload
///
/// # Errors
///
/// Returns [`StegoError::InvalidParameters`] for a bad percentile,
/// [`StegoError::CapacityExceeded`] when the selected channels cannot hold
/// the header and the analysis errors of [`Analysis::run`].
pub fn max_payload_size(
    image: &RgbImage,
    params: &StegoParams,
    percentile_rank: u8,
) -> Result<usize, StegoError>
{
    validate_percentile(percentile_rank)?;
    let analysis = Analysis::run(image, params)?;
    let cursor = analysis.cursor();
    ensure_header_fits(cursor.slot_count())?;

    let threshold = analysis.threshold(percentile_rank);
    Ok((cursor.payload_capacity_bits(threshold) / 8).min(MAX_PAYLOAD_LEN))
}

/// Rejects selections whose slots cannot hold even an empty payload.
fn ensure_header_fits(slot_count: usize) -> Result<(), StegoError>
{
    if slot_count < HEADER_BITS
    {
        return Err(StegoError::CapacityExceeded {
            required_bits: HEADER_BITS,
            available_bits: slot_count,
        });
    }
    Ok(())
}
