//! Canonical ordering of the coordinates that carry the payload.
use log::debug;

use super::cluster::Clustering;
use super::params::Subset;
use super::{Coordinate, NoCapacityReason, StegoError};

/// Picks the clustered or the noise coordinates of `clustering`, sorted by
/// `(x, y)` ascending.
///
/// # Errors
///
/// Returns [`StegoError::NoCapacity`] when the chosen group is empty.
pub fn select_coordinates(
    clustering: &Clustering,
    subset: Subset,
) -> Result<Vec<Coordinate>, StegoError>
{
    let want_noise = subset == Subset::Isolated;
    let mut selected: Vec<Coordinate> = clustering
        .iter()
        .filter(|(_, label)| label.is_noise() == want_noise)
        .map(|(at, _)| at)
        .collect();

    if selected.is_empty()
    {
        return Err(StegoError::NoCapacity {
            reason: NoCapacityReason::EmptySubset { subset },
        });
    }

    // Coordinate orders lexicographically by (x, y)
    selected.sort_unstable();
    debug!("selected {} {subset} coordinates", selected.len());
    Ok(selected)
}
