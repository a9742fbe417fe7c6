//! Percentile cutoff separating high-detail from low-detail pixels.
//!
//! Only the first [`VARIANCE_SAMPLE_LIMIT`] coordinates of the canonical
//! sequence are sampled, so the sample leans towards the low-x end of the
//! image. Encoder and decoder must sample the same prefix.
use log::debug;

use super::Coordinate;
use super::gray::GrayField;

/// Upper bound on the number of coordinates sampled for the threshold
pub const VARIANCE_SAMPLE_LIMIT: usize = 200;

/// Neighborhood variances of the sampled prefix of `coordinates`.
#[must_use]
pub fn sample_variances(
    gray: &GrayField,
    coordinates: &[Coordinate],
) -> Vec<f64>
{
    coordinates
        .iter()
        .take(VARIANCE_SAMPLE_LIMIT)
        .map(|&at| gray.neighborhood_variance(at))
        .collect()
}

/// `percentile`-th percentile of `values`, interpolating linearly between
/// the two nearest order statistics. Returns 0 for an empty slice.
#[must_use]
pub fn percentile(values: &[f64], percentile: u8) -> f64
{
    if values.is_empty()
    {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let rank =
        f64::from(percentile.min(100)) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Variance cutoff for `coordinates` at `percentile`.
///
/// Pixels whose neighborhood variance reaches the cutoff take two payload
/// bits per channel, the rest take one.
#[must_use]
pub fn variance_threshold(
    gray: &GrayField,
    coordinates: &[Coordinate],
    percentile_rank: u8,
) -> f64
{
    let sample = sample_variances(gray, coordinates);
    let threshold = percentile(&sample, percentile_rank);
    debug!(
        "variance threshold at p{percentile_rank} over {} samples: {threshold}",
        sample.len()
    );
    threshold
}
