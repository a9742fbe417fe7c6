//! Adaptive LSB steganography over edge-clustered pixels.
//!
//! Pipeline: Sobel edge map, density clustering of the edge pixels,
//! selection of the clustered or isolated group in `(x, y)` order, a
//! percentile variance cutoff, then embedding at one or two bits per channel.
//! The decoder recomputes every stage from the stego image alone.
//!
//! # Encoding Format
//!
//! - First 24 slots, one LSB each: payload length as big-endian u16, then the
//!   variance percentile as u8
//! - Remaining slots: payload bytes, MSB-first, two bits per channel where
//!   the pixel's 3x3 variance reaches the threshold and one bit elsewhere
//! - Slots are the selected coordinates expanded over the R, G and B
//!   channels
//!
//! # Errors
//!
//! Returns [`StegoError`] when analysis, embedding or extraction fails.
use std::fmt;

use thiserror::Error;

mod analysis;
mod capacity;
mod cluster;
mod cursor;
mod decode;
mod edges;
mod encode;
mod gray;
mod header;
mod params;
mod select;
mod threshold;

pub use analysis::Analysis;
pub use capacity::{estimate_capacity, max_payload_size};
pub use cluster::{
    ClusterLabel, Clustering, Feature, cluster_edges, cluster_points, dbscan,
    feature_vectors, render_clusters,
};
pub use cursor::{CHANNELS, ChannelCursor, Slot};
pub use decode::{extract_payload, read_header};
pub use edges::{
    EdgeMap, EdgeStatistics, MIN_DIMENSION, detect_edges, edge_statistics,
    render_edge_mask,
};
pub use encode::embed_payload;
pub use gray::{ANALYSIS_MASK, GrayField, luma};
pub use header::Header;
pub use params::{
    DEFAULT_EDGE_THRESHOLD, DEFAULT_EPS, DEFAULT_MIN_POINTS,
    DEFAULT_VARIANCE_PERCENTILE, FeatureSpace, MAX_PERCENTILE,
    MIN_POINTS_FLOOR, ParameterError, StegoParams, Subset, validate_percentile,
};
pub use select::select_coordinates;
pub use threshold::{
    VARIANCE_SAMPLE_LIMIT, percentile, sample_variances, variance_threshold,
};

/// Bit length of the payload length field
pub const LENGTH_BITS: usize = 16;
/// Bit length of the percentile field
pub const PERCENTILE_BITS: usize = 8;
/// Bit length of the whole header
pub const HEADER_BITS: usize = LENGTH_BITS + PERCENTILE_BITS;
/// Maximum value representable by the payload length field
pub const MAX_PAYLOAD_LEN: usize = (1 << LENGTH_BITS) - 1;

/// A pixel position. Orders lexicographically by `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate
{
    pub x: u32,
    pub y: u32,
}

impl Coordinate
{
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self
    {
        Self { x, y }
    }
}

/// Why no coordinates were available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCapacityReason
{
    /// No pixel cleared the edge threshold
    NoEdges
    {
        threshold: u8
    },
    /// Clustering left the requested group empty
    EmptySubset
    {
        subset: Subset
    },
}

impl fmt::Display for NoCapacityReason
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self
        {
            Self::NoEdges { threshold } =>
            {
                write!(f, "no edge pixels above threshold {threshold}")
            },
            Self::EmptySubset { subset } =>
            {
                write!(f, "no {subset} edge pixels")
            },
        }
    }
}

/// Errors that can be emitted while analysing, embedding or extracting
#[derive(Debug, Error)]
pub enum StegoError
{
    /// The raster is too small to have interior pixels
    #[error(
        "raster of {width}x{height} pixels has no interior, at least \
         {MIN_DIMENSION}x{MIN_DIMENSION} is required"
    )]
    InvalidInput
    {
        width: u32, height: u32
    },

    /// A parameter is out of range
    #[error(transparent)]
    InvalidParameters(#[from] ParameterError),

    /// There are no points to cluster
    #[error("no points to cluster")]
    EmptyInput,

    /// No coordinates are left to embed into
    #[error("no embedding capacity: {reason}")]
    NoCapacity
    {
        reason: NoCapacityReason
    },

    /// The payload does not fit in the selected channels
    #[error(
        "payload needs {required_bits} bits but the selected channels hold \
         {available_bits} bits"
    )]
    CapacityExceeded
    {
        required_bits: usize,
        available_bits: usize,
    },

    /// The payload length does not fit in the header
    #[error(
        "payload length of {requested_bytes} bytes exceeds the \
         {MAX_PAYLOAD_LEN}-byte header limit"
    )]
    PayloadTooLong
    {
        requested_bytes: usize
    },

    /// The image ended before the header or the declared payload
    #[error(
        "image holds {available_bits} embedded bits but {required_bits} are \
         needed"
    )]
    InsufficientData
    {
        required_bits: usize,
        available_bits: usize,
    },

    /// The header carries an impossible percentile
    #[error("decoded percentile {percentile} is outside 0..={MAX_PERCENTILE}")]
    InvalidHeader
    {
        percentile: u8
    },
}

#[cfg(test)]
mod tests
{
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    /// 16x16 mid-gray raster with a dark 3x3 block at (6..9, 6..9)
    fn block_fixture() -> RgbImage
    {
        let mut image = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        for y in 6..9
        {
            for x in 6..9
            {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        image
    }

    fn block_params() -> StegoParams
    {
        StegoParams {
            edge_threshold: 50,
            eps: 2.0,
            min_points: 3,
            ..Default::default()
        }
    }

    /// Vertical stripes two pixels wide: every interior pixel is an edge
    /// with the same neighborhood variance
    fn stripes_fixture() -> RgbImage
    {
        RgbImage::from_fn(20, 12, |x, _| {
            if (x / 2) % 2 == 1
            {
                Rgb([255, 255, 255])
            }
            else
            {
                Rgb([0, 0, 0])
            }
        })
    }

    fn noise_fixture(width: u32, height: u32, seed: u64) -> RgbImage
    {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; width as usize * height as usize * 3];
        rng.fill(data.as_mut_slice());
        RgbImage::from_raw(width, height, data)
            .expect("buffer matches dimensions")
    }

    #[test]
    fn block_scenario_round_trips_one_byte()
    {
        let cover = block_fixture();
        let params = block_params();

        let clustering = cluster_edges(&cover, &params).expect("edges exist");
        assert_eq!(clustering.points().len(), 24);
        assert_eq!(clustering.cluster_count(), 1);
        assert_eq!(clustering.noise_count(), 0);

        let stego = embed_payload(&cover, b"Z", &params, 50)
            .expect("one byte fits");
        let decoded = extract_payload(&stego, &params).expect("decodes");
        assert_eq!(decoded, b"Z");
    }

    #[test]
    fn block_scenario_changes_only_low_bits_of_selected_channels()
    {
        let cover = block_fixture();
        let params = block_params();
        let stego = embed_payload(&cover, b"Z", &params, 50)
            .expect("one byte fits");

        let selected = Analysis::run(&cover, &params)
            .expect("edges exist")
            .selected()
            .to_vec();

        let mut changed = 0;
        for (x, y, pixel) in stego.enumerate_pixels()
        {
            let original = cover.get_pixel(x, y);
            for channel in 0..CHANNELS
            {
                let diff = pixel.0[channel] ^ original.0[channel];
                if diff != 0
                {
                    changed += 1;
                    assert_eq!(diff & ANALYSIS_MASK, 0, "only low bits change");
                    assert!(selected.contains(&Coordinate::new(x, y)));
                }
            }
        }
        // header plus eight payload bits at most
        assert!(changed <= HEADER_BITS + 8, "{changed} channels changed");
    }

    #[test]
    fn round_trip_with_random_pixels()
    {
        let cover = noise_fixture(48, 48, 0x5EED);
        let params = StegoParams::default();
        let message = b"Adaptive payload through clustered edges";

        let capacity =
            max_payload_size(&cover, &params, DEFAULT_VARIANCE_PERCENTILE)
                .expect("noise has edges");
        assert!(capacity >= message.len(), "capacity {capacity} too small");

        let stego = embed_payload(
            &cover,
            message,
            &params,
            DEFAULT_VARIANCE_PERCENTILE,
        )
        .expect("payload fits");
        let decoded = extract_payload(&stego, &params).expect("decodes");
        assert_eq!(decoded, message);
    }

    #[test]
    fn round_trip_isolated_subset_and_intensity_features()
    {
        let cover = noise_fixture(40, 40, 7);
        let message = b"variants";
        let variants = [
            // sparse neighborhoods leave most edge pixels isolated
            StegoParams {
                eps: 1.0,
                min_points: 5,
                subset: Subset::Isolated,
                ..Default::default()
            },
            // eps is measured in standard deviations here
            StegoParams {
                eps: 0.5,
                min_points: 5,
                features: FeatureSpace::PositionIntensity,
                ..Default::default()
            },
        ];

        for params in variants
        {
            let capacity = max_payload_size(&cover, &params, 90)
                .expect("noise leaves coordinates in both variants");
            assert!(capacity >= message.len(), "capacity {capacity} too small");

            let stego = embed_payload(&cover, message, &params, 90)
                .expect("payload fits");
            let decoded = extract_payload(&stego, &params).expect("decodes");
            assert_eq!(decoded, message, "params {params:?}");
        }
    }

    #[test]
    fn empty_payload()
    {
        let cover = block_fixture();
        let params = block_params();
        let stego = embed_payload(&cover, &[], &params, 0).expect("fits");
        let decoded = extract_payload(&stego, &params).expect("decodes");
        assert!(decoded.is_empty());
    }

    #[test]
    fn exact_capacity_fits_and_one_more_byte_does_not()
    {
        let cover = block_fixture();
        let params = block_params();
        let percentile = 60;

        let capacity =
            max_payload_size(&cover, &params, percentile).expect("edges exist");
        // 48 payload slots hold at least one bit each
        assert!(capacity >= 6);

        let message: Vec<u8> = (0..capacity).map(|i| (i * 37) as u8).collect();
        let stego = embed_payload(&cover, &message, &params, percentile)
            .expect("exact capacity must fit");
        let decoded = extract_payload(&stego, &params).expect("decodes");
        assert_eq!(decoded, message);

        let oversized = vec![0xA5; capacity + 1];
        let error = embed_payload(&cover, &oversized, &params, percentile)
            .expect_err("one byte over capacity must fail");
        match error
        {
            StegoError::CapacityExceeded {
                required_bits,
                available_bits,
            } =>
            {
                assert_eq!(required_bits, HEADER_BITS + (capacity + 1) * 8);
                assert!(available_bits < required_bits);
                assert!(available_bits >= HEADER_BITS + capacity * 8);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn encoding_is_deterministic()
    {
        let cover = noise_fixture(32, 32, 42);
        let params = StegoParams::default();
        let first = embed_payload(&cover, b"same input", &params, 75)
            .expect("payload fits");
        let second = embed_payload(&cover, b"same input", &params, 75)
            .expect("payload fits");
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn header_records_length_and_percentile()
    {
        let cover = noise_fixture(32, 32, 3);
        let params = StegoParams::default();
        let stego =
            embed_payload(&cover, b"hdr", &params, 33).expect("payload fits");
        let header = read_header(&stego, &params).expect("header readable");
        assert_eq!(
            header,
            Header {
                length: 3,
                percentile: 33
            }
        );
    }

    #[test]
    fn adjacent_textured_pixels_keep_their_decisions_after_embedding()
    {
        // the block ring is a chain of adjacent high-variance pixels; p0
        // makes every payload slot 2-bit, so neighbours are maximally
        // rewritten
        let cover = block_fixture();
        let params = block_params();
        let capacity = max_payload_size(&cover, &params, 0).expect("edges");
        let message = vec![0xFF; capacity];
        let stego =
            embed_payload(&cover, &message, &params, 0).expect("payload fits");

        let before = Analysis::run(&cover, &params).expect("edges exist");
        let after = Analysis::run(&stego, &params).expect("edges exist");
        assert_eq!(before.selected(), after.selected());
        assert_eq!(before.threshold(0), after.threshold(0));
        for &at in before.selected()
        {
            assert_eq!(
                before.gray().neighborhood_variance(at),
                after.gray().neighborhood_variance(at)
            );
        }
        assert_eq!(extract_payload(&stego, &params).expect("decodes"), message);
    }

    #[test]
    fn flat_image_has_no_capacity()
    {
        let cover = RgbImage::from_pixel(24, 24, Rgb([90, 90, 90]));
        let params = StegoParams::default();

        assert!(matches!(
            cluster_edges(&cover, &params),
            Err(StegoError::EmptyInput)
        ));
        let error = embed_payload(&cover, b"x", &params, 50)
            .expect_err("flat image cannot carry a payload");
        assert!(matches!(
            error,
            StegoError::NoCapacity {
                reason: NoCapacityReason::NoEdges { threshold: 50 }
            }
        ));
        assert!(matches!(
            extract_payload(&cover, &params),
            Err(StegoError::NoCapacity { .. })
        ));
    }

    /// 16x16 mid-gray raster with one dark pixel; at threshold 200 only the
    /// four pixels beside it are edges, one cluster of 12 channel slots
    fn lone_pixel_fixture() -> (RgbImage, StegoParams)
    {
        let mut image = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        image.put_pixel(8, 8, Rgb([0, 0, 0]));
        let params = StegoParams {
            edge_threshold: 200,
            eps: 1.5,
            min_points: 3,
            ..Default::default()
        };
        (image, params)
    }

    #[test]
    fn selection_smaller_than_header_has_no_capacity()
    {
        let (cover, params) = lone_pixel_fixture();
        let analysis = Analysis::run(&cover, &params).expect("edges exist");
        assert_eq!(analysis.selected().len(), 4);

        let header_does_not_fit = |result: Result<usize, StegoError>| {
            matches!(
                result,
                Err(StegoError::CapacityExceeded {
                    required_bits: HEADER_BITS,
                    available_bits: 12
                })
            )
        };
        assert!(header_does_not_fit(max_payload_size(&cover, &params, 50)));
        assert!(header_does_not_fit(estimate_capacity(&cover, &params, 50)));

        let error = embed_payload(&cover, &[], &params, 50)
            .expect_err("header alone does not fit");
        assert!(matches!(
            error,
            StegoError::CapacityExceeded {
                required_bits: HEADER_BITS,
                available_bits: 12
            }
        ));
    }

    #[test]
    fn selection_smaller_than_header_cannot_be_decoded()
    {
        let (cover, params) = lone_pixel_fixture();
        let error = extract_payload(&cover, &params)
            .expect_err("12 slots cannot hold a header");
        assert!(matches!(
            error,
            StegoError::InsufficientData {
                required_bits: HEADER_BITS,
                available_bits: 12
            }
        ));
        assert!(matches!(
            read_header(&cover, &params),
            Err(StegoError::InsufficientData { .. })
        ));
    }

    #[test]
    fn rejects_tiny_raster()
    {
        let cover = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let error = embed_payload(&cover, b"", &StegoParams::default(), 50)
            .expect_err("2x2 has no interior");
        assert!(matches!(
            error,
            StegoError::InvalidInput {
                width: 2,
                height: 2
            }
        ));
    }

    #[test]
    fn rejects_payload_beyond_header_limit()
    {
        let cover = block_fixture();
        let payload = vec![0; MAX_PAYLOAD_LEN + 1];
        let error = embed_payload(&cover, &payload, &block_params(), 50)
            .expect_err("length must fit in 16 bits");
        assert!(matches!(
            error,
            StegoError::PayloadTooLong {
                requested_bytes
            } if requested_bytes == MAX_PAYLOAD_LEN + 1
        ));
    }

    #[test]
    fn rejects_bad_parameters_before_embedding()
    {
        let cover = block_fixture();
        assert!(matches!(
            embed_payload(&cover, b"x", &block_params(), 101),
            Err(StegoError::InvalidParameters(ParameterError::Percentile {
                percentile: 101
            }))
        ));

        let params = StegoParams {
            eps: -1.0,
            ..block_params()
        };
        assert!(matches!(
            embed_payload(&cover, b"x", &params, 50),
            Err(StegoError::InvalidParameters(ParameterError::Eps { .. }))
        ));
    }

    #[test]
    fn decode_rejects_out_of_range_percentile()
    {
        // every LSB set: the header reads length 65535, percentile 255
        let mut image = block_fixture();
        for pixel in image.pixels_mut()
        {
            for channel in &mut pixel.0
            {
                *channel |= 1;
            }
        }
        let error = extract_payload(&image, &block_params())
            .expect_err("percentile 255 is invalid");
        assert!(matches!(error, StegoError::InvalidHeader { percentile: 255 }));
    }

    #[test]
    fn decode_rejects_length_beyond_available_bits()
    {
        let cover = block_fixture();
        let params = block_params();
        let mut stego =
            embed_payload(&cover, b"ok", &params, 50).expect("payload fits");

        let forged = Header {
            length: u16::MAX,
            percentile: 50,
        };
        let slots: Vec<Slot> = Analysis::run(&stego, &params)
            .expect("edges exist")
            .cursor()
            .header_slots()
            .collect();
        for (index, slot) in slots.into_iter().enumerate()
        {
            let channel =
                &mut stego.get_pixel_mut(slot.at.x, slot.at.y).0[slot.channel];
            *channel = (*channel & !1) | forged.bit(index);
        }

        let error = extract_payload(&stego, &params)
            .expect_err("declared length cannot fit");
        match error
        {
            StegoError::InsufficientData {
                required_bits,
                available_bits,
            } =>
            {
                assert_eq!(required_bits, HEADER_BITS + MAX_PAYLOAD_LEN * 8);
                assert!(available_bits < required_bits);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn capacity_never_grows_with_stricter_clustering()
    {
        let cover = stripes_fixture();
        let capacity_at = |eps: f64, min_points: usize| {
            let params = StegoParams {
                eps,
                min_points,
                ..Default::default()
            };
            match estimate_capacity(&cover, &params, 50)
            {
                Ok(bytes) => bytes,
                Err(
                    StegoError::NoCapacity { .. }
                    | StegoError::CapacityExceeded { .. },
                ) => 0,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        };

        let by_eps: Vec<_> = [3.0, 2.0, 1.5, 1.0, 0.5]
            .into_iter()
            .map(|eps| capacity_at(eps, 5))
            .collect();
        assert!(by_eps.windows(2).all(|pair| pair[0] >= pair[1]), "{by_eps:?}");
        assert_eq!(by_eps[4], 0);

        let by_min_points: Vec<_> =
            [2, 5, 9, 10].into_iter().map(|m| capacity_at(1.5, m)).collect();
        assert!(
            by_min_points.windows(2).all(|pair| pair[0] >= pair[1]),
            "{by_min_points:?}"
        );
    }

    #[test]
    fn estimate_matches_exact_capacity_on_uniform_texture()
    {
        let cover = stripes_fixture();
        let params = StegoParams::default();
        let estimate = estimate_capacity(&cover, &params, 50).expect("edges");
        let exact = max_payload_size(&cover, &params, 50).expect("edges");
        // 18x10 interior edge pixels, all two bits per channel
        assert_eq!(exact, (18 * 10 * 3 - HEADER_BITS) * 2 / 8);
        assert_eq!(estimate, exact);
    }
}
