//! Shared analysis and embedding flags.
//!
//! Every flag is optional so that values from a configuration file survive
//! unless the user overrides them explicitly.
use clap::Args;

use crate::stego::{FeatureSpace, MAX_PERCENTILE, StegoParams, Subset};

/// Parameters that must match between `encode` and `decode`.
#[derive(Args, Clone, Debug, Default)]
pub(super) struct AnalysisArgs
{
    /// Normalized edge magnitude (0-255) a pixel must exceed.
    #[arg(short = 't', long = "threshold", value_name = "0-255")]
    pub(super) edge_threshold: Option<u8>,
    /// Clustering neighborhood radius.
    #[arg(long = "eps", value_name = "RADIUS")]
    pub(super) eps: Option<f64>,
    /// Neighbors, the point included, that make a core point.
    #[arg(long = "min-points", value_name = "COUNT")]
    pub(super) min_points: Option<usize>,
    /// Carry the payload in clustered or isolated edge pixels.
    #[arg(long = "subset", value_enum)]
    pub(super) subset: Option<Subset>,
    /// Feature space of the clustering distance.
    #[arg(long = "features", value_enum)]
    pub(super) features: Option<FeatureSpace>,
}

impl AnalysisArgs
{
    /// Overrides the fields of `base` that were given on the command line.
    pub(super) fn apply(&self, base: StegoParams) -> StegoParams
    {
        StegoParams {
            edge_threshold: self.edge_threshold.unwrap_or(base.edge_threshold),
            eps: self.eps.unwrap_or(base.eps),
            min_points: self.min_points.unwrap_or(base.min_points),
            subset: self.subset.unwrap_or(base.subset),
            features: self.features.unwrap_or(base.features),
        }
    }
}

/// Variance percentile flag of `encode` and `cap`.
#[derive(Args, Clone, Debug, Default)]
pub(super) struct PercentileArgs
{
    /// Percentile (0-100) of the sampled variance that earns two bits per
    /// channel.
    #[arg(
        short = 'p',
        long = "percentile",
        value_name = "0-100",
        value_parser =
            clap::value_parser!(u8).range(0..=i64::from(MAX_PERCENTILE))
    )]
    pub(super) percentile: Option<u8>,
}
