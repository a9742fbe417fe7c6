//! Density clustering (DBSCAN) of edge coordinates.
//!
//! Points are visited in input order and cluster ids are handed out in the
//! order their first core point is found. Labels are a pure function of the
//! point list, the feature vectors, `eps` and `min_points`.
use std::collections::{HashMap, VecDeque};

use image::{Rgb, RgbImage};
use log::debug;

use super::edges::EdgeMap;
use super::gray::GrayField;
use super::params::{FeatureSpace, StegoParams, validate_clustering};
use super::{Coordinate, StegoError};

/// Cluster membership of one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterLabel
{
    /// Member of the cluster with this id.
    Cluster(usize),
    /// Not density-reachable from any core point.
    Noise,
}

impl ClusterLabel
{
    #[must_use]
    pub fn is_noise(self) -> bool
    {
        matches!(self, Self::Noise)
    }
}

/// Feature vector of one point. Position-only features leave the third
/// component at zero.
pub type Feature = [f64; 3];

/// Labeled edge coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering
{
    points: Vec<Coordinate>,
    labels: Vec<ClusterLabel>,
    cluster_count: usize,
}

impl Clustering
{
    #[must_use]
    pub fn points(&self) -> &[Coordinate]
    {
        &self.points
    }

    #[must_use]
    pub fn labels(&self) -> &[ClusterLabel]
    {
        &self.labels
    }

    /// Number of distinct clusters (noise excluded).
    #[must_use]
    pub fn cluster_count(&self) -> usize
    {
        self.cluster_count
    }

    /// Member count per cluster id.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize>
    {
        let mut sizes = vec![0; self.cluster_count];
        for label in &self.labels
        {
            if let ClusterLabel::Cluster(id) = label
            {
                sizes[*id] += 1;
            }
        }
        sizes
    }

    #[must_use]
    pub fn noise_count(&self) -> usize
    {
        self.labels.iter().filter(|label| label.is_noise()).count()
    }

    #[must_use]
    pub fn clustered_count(&self) -> usize
    {
        self.labels.len() - self.noise_count()
    }

    /// Points paired with their labels, in input order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, ClusterLabel)> + '_
    {
        self.points.iter().copied().zip(self.labels.iter().copied())
    }
}

/// Clusters `points` whose feature vectors are `features`.
///
/// # Errors
///
/// Returns [`StegoError::InvalidParameters`] for a bad `eps` or
/// `min_points` and [`StegoError::EmptyInput`] when `points` is empty.
///
/// # Panics
///
/// Panics if `points` and `features` differ in length.
pub fn cluster_points(
    points: Vec<Coordinate>,
    features: &[Feature],
    eps: f64,
    min_points: usize,
) -> Result<Clustering, StegoError>
{
    assert_eq!(points.len(), features.len(), "one feature per point");
    let labels = dbscan(features, eps, min_points)?;
    let cluster_count = labels
        .iter()
        .filter_map(|label| match label
        {
            ClusterLabel::Cluster(id) => Some(id + 1),
            ClusterLabel::Noise => None,
        })
        .max()
        .unwrap_or(0);

    Ok(Clustering {
        points,
        labels,
        cluster_count,
    })
}

/// Labels every feature vector as a cluster member or noise.
///
/// # Errors
///
/// Returns [`StegoError::InvalidParameters`] for a bad `eps` or
/// `min_points` and [`StegoError::EmptyInput`] when `features` is empty.
pub fn dbscan(
    features: &[Feature],
    eps: f64,
    min_points: usize,
) -> Result<Vec<ClusterLabel>, StegoError>
{
    validate_clustering(eps, min_points)?;
    if features.is_empty()
    {
        return Err(StegoError::EmptyInput);
    }

    let index = NeighborIndex::new(features, eps);
    let mut labels: Vec<Option<ClusterLabel>> = vec![None; features.len()];
    let mut next_cluster = 0;
    let mut queue = VecDeque::new();

    for point in 0..features.len()
    {
        if labels[point].is_some()
        {
            continue;
        }

        let neighbors = index.neighbors(point);
        if neighbors.len() < min_points
        {
            labels[point] = Some(ClusterLabel::Noise);
            continue;
        }

        let cluster = ClusterLabel::Cluster(next_cluster);
        next_cluster += 1;
        labels[point] = Some(cluster);
        queue.extend(neighbors);

        while let Some(candidate) = queue.pop_front()
        {
            match labels[candidate]
            {
                // previously rejected as a seed, it becomes a border point
                Some(ClusterLabel::Noise) => labels[candidate] = Some(cluster),
                Some(ClusterLabel::Cluster(_)) => {},
                None =>
                {
                    labels[candidate] = Some(cluster);
                    let expansion = index.neighbors(candidate);
                    if expansion.len() >= min_points
                    {
                        queue.extend(expansion);
                    }
                },
            }
        }
    }

    Ok(labels
        .into_iter()
        .map(|label| label.unwrap_or(ClusterLabel::Noise))
        .collect())
}

/// Uniform grid over the first two feature components with `eps`-sized
/// cells. Any point within `eps` lies in one of the nine surrounding cells.
/// Cell indices saturate at the `i64` limits when `eps` is tiny, which only
/// merges far cells and never splits near ones.
struct NeighborIndex<'a>
{
    features: &'a [Feature],
    eps: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl<'a> NeighborIndex<'a>
{
    fn new(features: &'a [Feature], eps: f64) -> Self
    {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (index, feature) in features.iter().enumerate()
        {
            cells
                .entry(cell_of(feature, eps))
                .or_default()
                .push(index);
        }
        Self {
            features,
            eps,
            cells,
        }
    }

    /// Indices within `eps` of `point`, the point itself included, ascending.
    fn neighbors(&self, point: usize) -> Vec<usize>
    {
        let origin = &self.features[point];
        let (cx, cy) = cell_of(origin, self.eps);
        let eps_sq = self.eps * self.eps;

        let mut found = Vec::new();
        for dy in -1..=1
        {
            for dx in -1..=1
            {
                let cell = (cx.saturating_add(dx), cy.saturating_add(dy));
                let Some(bucket) = self.cells.get(&cell)
                else
                {
                    continue;
                };
                found.extend(bucket.iter().copied().filter(|&other| {
                    distance_sq(origin, &self.features[other]) <= eps_sq
                }));
            }
        }
        // saturated cells at the i64 limits are visited more than once
        found.sort_unstable();
        found.dedup();
        found
    }
}

fn cell_of(feature: &Feature, eps: f64) -> (i64, i64)
{
    (
        (feature[0] / eps).floor() as i64,
        (feature[1] / eps).floor() as i64,
    )
}

fn distance_sq(a: &Feature, b: &Feature) -> f64
{
    a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// Builds the feature vectors of `points` in the requested space.
#[must_use]
pub fn feature_vectors(
    gray: &GrayField,
    points: &[Coordinate],
    space: FeatureSpace,
) -> Vec<Feature>
{
    match space
    {
        FeatureSpace::Position => points
            .iter()
            .map(|at| [f64::from(at.x), f64::from(at.y), 0.0])
            .collect(),
        FeatureSpace::PositionIntensity =>
        {
            let mut features: Vec<Feature> = points
                .iter()
                .map(|at| {
                    [
                        f64::from(at.x),
                        f64::from(at.y),
                        f64::from(gray.get(at.x, at.y)),
                    ]
                })
                .collect();
            standardize(&mut features);
            features
        },
    }
}

/// Shifts each feature column to zero mean and scales it to unit variance.
/// Constant columns are only centred.
fn standardize(features: &mut [Feature])
{
    if features.is_empty()
    {
        return;
    }
    let n = features.len() as f64;
    for column in 0..3
    {
        let mean = features.iter().map(|f| f[column]).sum::<f64>() / n;
        let variance = features
            .iter()
            .map(|f| (f[column] - mean) * (f[column] - mean))
            .sum::<f64>()
            / n;
        let scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        for feature in features.iter_mut()
        {
            feature[column] = (feature[column] - mean) / scale;
        }
    }
}

/// Runs edge detection and clustering on an analysis view.
///
/// # Errors
///
/// Propagates [`EdgeMap::compute`] and [`cluster_points`] failures; an edge
/// free image yields [`StegoError::EmptyInput`].
pub fn cluster_gray(
    gray: &GrayField,
    params: &StegoParams,
) -> Result<Clustering, StegoError>
{
    params.validate()?;
    let edges = EdgeMap::compute(gray)?.edges(params.edge_threshold);
    debug!(
        "edge map at threshold {}: {} edge pixels",
        params.edge_threshold,
        edges.len()
    );
    let features = feature_vectors(gray, &edges, params.features);
    let clustering =
        cluster_points(edges, &features, params.eps, params.min_points)?;
    debug!(
        "clustering eps={} min_points={}: {} clusters, {} clustered, {} noise",
        params.eps,
        params.min_points,
        clustering.cluster_count(),
        clustering.clustered_count(),
        clustering.noise_count()
    );
    Ok(clustering)
}

/// Detects and clusters the edge pixels of `image`.
///
/// # Errors
///
/// See [`cluster_gray`].
pub fn cluster_edges(
    image: &RgbImage,
    params: &StegoParams,
) -> Result<Clustering, StegoError>
{
    cluster_gray(&GrayField::from_rgb(image), params)
}

/// Noise color in [`render_clusters`]
const NOISE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Deterministic, bright-ish color for a cluster id.
fn cluster_color(id: usize) -> Rgb<u8>
{
    let spread = |prime: usize| {
        u8::try_from(50 + (id * prime) % 206).unwrap_or(u8::MAX)
    };
    Rgb([spread(97), spread(151), spread(199)])
}

/// Renders clustered edges in per-cluster colors and noise in red on black.
///
/// # Errors
///
/// See [`cluster_gray`].
pub fn render_clusters(
    image: &RgbImage,
    params: &StegoParams,
) -> Result<RgbImage, StegoError>
{
    let clustering = cluster_edges(image, params)?;
    let mut canvas = RgbImage::new(image.width(), image.height());
    for (at, label) in clustering.iter()
    {
        let color = match label
        {
            ClusterLabel::Cluster(id) => cluster_color(id),
            ClusterLabel::Noise => NOISE_COLOR,
        };
        canvas.put_pixel(at.x, at.y, color);
    }
    Ok(canvas)
}
