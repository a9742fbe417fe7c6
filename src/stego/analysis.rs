//! The shared front half of encode, decode and capacity queries.
//!
//! Edge detection, clustering and coordinate selection run on the analysis
//! view only, so the cover and the stego image produce the same result.
use image::RgbImage;
use log::info;

use super::cluster::{Clustering, cluster_gray};
use super::cursor::ChannelCursor;
use super::gray::GrayField;
use super::params::StegoParams;
use super::select::select_coordinates;
use super::threshold::variance_threshold;
use super::{Coordinate, NoCapacityReason, StegoError};

/// Result of running the analysis stages on one raster.
#[derive(Debug, Clone)]
pub struct Analysis
{
    gray: GrayField,
    clustering: Clustering,
    selected: Vec<Coordinate>,
}

impl Analysis
{
    /// Runs edge detection, clustering and selection on `image`.
    ///
    /// # Errors
    ///
    /// Returns [`StegoError::InvalidInput`] for rasters smaller than 3x3,
    /// [`StegoError::InvalidParameters`] for bad clustering parameters and
    /// [`StegoError::NoCapacity`] when no edges or no coordinates of the
    /// requested subset exist.
    pub fn run(
        image: &RgbImage,
        params: &StegoParams,
    ) -> Result<Self, StegoError>
    {
        let gray = GrayField::from_rgb(image);
        let clustering = cluster_gray(&gray, params).map_err(|error| {
            match error
            {
                StegoError::EmptyInput => StegoError::NoCapacity {
                    reason: NoCapacityReason::NoEdges {
                        threshold: params.edge_threshold,
                    },
                },
                other => other,
            }
        })?;
        let selected = select_coordinates(&clustering, params.subset)?;
        info!(
            "{} edge pixels, {} clusters, {} {} coordinates selected",
            clustering.points().len(),
            clustering.cluster_count(),
            selected.len(),
            params.subset
        );

        Ok(Self {
            gray,
            clustering,
            selected,
        })
    }

    #[must_use]
    pub fn gray(&self) -> &GrayField
    {
        &self.gray
    }

    #[must_use]
    pub fn clustering(&self) -> &Clustering
    {
        &self.clustering
    }

    /// The canonical coordinate sequence.
    #[must_use]
    pub fn selected(&self) -> &[Coordinate]
    {
        &self.selected
    }

    #[must_use]
    pub fn cursor(&self) -> ChannelCursor<'_>
    {
        ChannelCursor::new(&self.gray, &self.selected)
    }

    /// Variance cutoff over the selected sequence at `percentile`.
    #[must_use]
    pub fn threshold(&self, percentile: u8) -> f64
    {
        variance_threshold(&self.gray, &self.selected, percentile)
    }
}
