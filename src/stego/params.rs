//! Analysis parameters shared by the encoder and the decoder.
//!
//! Everything here except the variance percentile is out-of-band
//! configuration: both sides must be given identical values, otherwise the
//! decoder walks a different coordinate sequence and reads garbage.
use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

/// Default normalized Sobel magnitude a pixel must exceed to be an edge
pub const DEFAULT_EDGE_THRESHOLD: u8 = 50;
/// Default neighborhood radius for density clustering
pub const DEFAULT_EPS: f64 = 3.0;
/// Default neighborhood population that makes a point a core point
pub const DEFAULT_MIN_POINTS: usize = 5;
/// Default percentile of the sampled variance used as the 2-bit cutoff
pub const DEFAULT_VARIANCE_PERCENTILE: u8 = 75;

/// Smallest accepted `min_points`
pub const MIN_POINTS_FLOOR: usize = 2;
/// Largest accepted variance percentile
pub const MAX_PERCENTILE: u8 = 100;

/// Which side of the clustering result carries the payload.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Subset
{
    /// Edge pixels that belong to some density cluster ("grouped" edges).
    #[default]
    Clustered,
    /// Edge pixels labeled as noise ("isolated" edges).
    Isolated,
}

impl fmt::Display for Subset
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self
        {
            Self::Clustered => f.write_str("clustered"),
            Self::Isolated => f.write_str("isolated"),
        }
    }
}

/// Feature space the clustering distance is measured in.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureSpace
{
    /// Raw pixel position `(x, y)`.
    #[default]
    Position,
    /// Position plus grayscale intensity, each feature standardized to zero
    /// mean and unit variance.
    PositionIntensity,
}

/// Rejected parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParameterError
{
    /// The clustering radius is not a positive finite number
    #[error("cluster radius eps must be a positive finite number, got {eps}")]
    Eps
    {
        eps: f64
    },

    /// The core point population is too small to mean anything
    #[error(
        "cluster min-points must be at least {MIN_POINTS_FLOOR}, got \
         {min_points}"
    )]
    MinPoints
    {
        min_points: usize
    },

    /// The variance percentile is outside `0..=100`
    #[error(
        "variance percentile must be within 0..={MAX_PERCENTILE}, got \
         {percentile}"
    )]
    Percentile
    {
        percentile: u8
    },
}

/// Parameters that select the embedding coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct StegoParams
{
    /// Normalized edge magnitude (0-255) a pixel must exceed.
    pub edge_threshold: u8,
    /// Clustering neighborhood radius in feature space.
    pub eps: f64,
    /// Neighborhood population, the point itself included, of a core point.
    pub min_points: usize,
    /// Coordinate group that carries the payload.
    pub subset: Subset,
    /// Feature space used by the clustering distance.
    pub features: FeatureSpace,
}

impl Default for StegoParams
{
    fn default() -> Self
    {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            eps: DEFAULT_EPS,
            min_points: DEFAULT_MIN_POINTS,
            subset: Subset::default(),
            features: FeatureSpace::default(),
        }
    }
}

impl StegoParams
{
    /// Checks the clustering parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::Eps`] when `eps` is not positive and finite,
    /// [`ParameterError::MinPoints`] when `min_points` is below
    /// [`MIN_POINTS_FLOOR`].
    pub fn validate(&self) -> Result<(), ParameterError>
    {
        validate_clustering(self.eps, self.min_points)
    }
}

/// Checks a clustering radius and core population.
pub(crate) fn validate_clustering(
    eps: f64,
    min_points: usize,
) -> Result<(), ParameterError>
{
    // NaN fails the comparison as well
    if !(eps.is_finite() && eps > 0.0)
    {
        return Err(ParameterError::Eps { eps });
    }
    if min_points < MIN_POINTS_FLOOR
    {
        return Err(ParameterError::MinPoints { min_points });
    }
    Ok(())
}

/// Checks a variance percentile.
///
/// # Errors
///
/// Returns [`ParameterError::Percentile`] when `percentile` exceeds
/// [`MAX_PERCENTILE`].
pub fn validate_percentile(percentile: u8) -> Result<(), ParameterError>
{
    if percentile > MAX_PERCENTILE
    {
        return Err(ParameterError::Percentile { percentile });
    }
    Ok(())
}
