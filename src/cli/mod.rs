//! Command line interface for the application.
//!
//! Provides an entry point for the application and handles the CLI arguments.
mod args;
mod image_io;
mod payload;

use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use clap::{ArgGroup, Args, Parser, Subcommand};
use const_format::formatcp;
use log::{info, warn};
use thiserror::Error;

use self::args::{AnalysisArgs, PercentileArgs};
use self::image_io::{
    LOSSLESS_EXTENSIONS, format_of, load_image, normalized_extension,
    write_image,
};
use self::payload::{deliver_payload, resolve_message};
use crate::config::{Config, ConfigError, load_config};
use crate::stego::{
    MAX_PAYLOAD_LEN, StegoError, cluster_edges, edge_statistics,
    embed_payload, estimate_capacity, extract_payload, max_payload_size,
    render_clusters, render_edge_mask,
};

/// Errors that can be emitted while handling the CLI
#[derive(Debug, Error)]
pub enum AppError
{
    /// A file could not be read
    #[error("failed to read {path}")]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written
    #[error("failed to write {path}")]
    Write
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image could not be decoded
    #[error("failed to open image {path}")]
    ImageOpen
    {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// An image could not be encoded
    #[error("failed to encode {path} as {target_format}")]
    ImageEncode
    {
        path: PathBuf,
        target_format: Box<str>,
        #[source]
        source: image::ImageError,
    },

    /// A steganography error occurred
    #[error(transparent)]
    Stego(#[from] StegoError),

    /// The configuration file is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The message is missing
    #[error("provide a message")]
    MissingMessage,

    /// The decoded payload is not text and no output file was given
    #[error("payload is not valid UTF-8, write it to a file with --output")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// The format would not keep the low bits intact
    #[error(
        "unsupported image format {extension}, use one of png, bmp, tiff, ppm"
    )]
    UnsupportedFormat
    {
        /// Extension detected on the output file
        extension: Box<str>,
    },

    /// Input and output formats are different
    #[error(
        "input and output formats are different, both must be \
         {input_extension}"
    )]
    DifferentFormats
    {
        /// Extension detected on the input file
        input_extension: Box<str>,
        /// Extension detected on the output file
        output_extension: Box<str>,
    },
}

/// The main CLI parser
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Hide data in the edge pixels of images with adaptive LSB \
             steganography",
    after_help = formatcp!(
        "Maximum supported payload size is {} bytes. Only lossless formats \
         (png, bmp, tiff, ppm) keep the payload intact. Analysis flags must \
         match between encode and decode.",
        MAX_PAYLOAD_LEN
    )
)]
struct Cli
{
    /// TOML file with analysis and embedding defaults.
    #[arg(long = "config", short = 'c', value_name = "PATH", global = true)]
    config: Option<Box<Path>>,
    #[command(subcommand)]
    command: Command,
}

/// The main command
#[derive(Debug, Subcommand)]
enum Command
{
    Encode(EncodingArgs),
    Decode(DecodingArgs),
    Cap(CapacityArgs),
    Edges(EdgesArgs),
    Clusters(ClustersArgs),
}

/// Embed a payload into an image.
#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("message")
        .required(true)
        .args(["text", "payload_file"])
))]
struct EncodingArgs
{
    /// Image that will receive the payload.
    input: Box<Path>,
    /// Output path for the embedded image.
    output: Box<Path>,
    /// Text to embed.
    #[arg(short = 'i', long = "input", value_name = "TEXT")]
    text: Option<String>,
    /// Path to a file whose bytes are embedded.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    payload_file: Option<Box<Path>>,
    #[command(flatten)]
    analysis: AnalysisArgs,
    #[command(flatten)]
    percentile: PercentileArgs,
}

/// Extract a payload from an image.
#[derive(Debug, Args)]
struct DecodingArgs
{
    /// Image that contains the payload.
    input: Box<Path>,
    /// Optional file to write the payload. Prints it as text when omitted.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    output: Option<Box<Path>>,
    #[command(flatten)]
    analysis: AnalysisArgs,
}

/// Calculate the payload capacity of an image.
#[derive(Debug, Args)]
struct CapacityArgs
{
    /// Image to calculate the payload capacity for.
    input: Box<Path>,
    #[command(flatten)]
    analysis: AnalysisArgs,
    #[command(flatten)]
    percentile: PercentileArgs,
}

/// Report the edge pixels of an image.
#[derive(Debug, Args)]
struct EdgesArgs
{
    /// Image to inspect.
    input: Box<Path>,
    /// Normalized edge magnitude (0-255) a pixel must exceed.
    #[arg(short = 't', long = "threshold", value_name = "0-255")]
    threshold: Option<u8>,
    /// Write the edge mask, edges white on black, to this path.
    #[arg(long = "render", value_name = "PATH")]
    render: Option<Box<Path>>,
}

/// Report the edge clusters of an image.
#[derive(Debug, Args)]
struct ClustersArgs
{
    /// Image to inspect.
    input: Box<Path>,
    #[command(flatten)]
    analysis: AnalysisArgs,
    /// Write the clusters, noise in red, to this path.
    #[arg(long = "render", value_name = "PATH")]
    render: Option<Box<Path>>,
}

/// Parses CLI arguments and executes the requested operation.
///
/// # Errors
///
/// Returns [`AppError`] when reading or writing files, decoding images, or
/// running steganography routines fails.
pub fn run() -> Result<(), AppError>
{
    let cli = Cli::parse();
    let config = match cli.config.as_deref()
    {
        Some(path) =>
        {
            let config = load_config(path)?;
            info!("loaded config {}", path.display());
            config
        },
        None => Config::default(),
    };

    match cli.command
    {
        Command::Encode(mut args) => handle_encode(&mut args, &config),
        Command::Decode(args) => handle_decode(&args, &config),
        Command::Cap(args) => handle_capacity(&args, &config),
        Command::Edges(args) => handle_edges(&args, &config),
        Command::Clusters(args) => handle_clusters(&args, &config),
    }
}

/// Ensures the input and output share one lossless format.
fn check_formats(input: &Path, output: &Path) -> Result<(), AppError>
{
    let input_ext = normalized_extension(input);
    let output_ext = normalized_extension(output);

    let same_format = input_ext.as_deref().map(format_of)
        == output_ext.as_deref().map(format_of);
    if !same_format
    {
        return Err(AppError::DifferentFormats {
            input_extension: input_ext
                .as_deref()
                .unwrap_or("<unknown>")
                .into(),
            output_extension: output_ext
                .as_deref()
                .unwrap_or("<unknown>")
                .into(),
        });
    }

    match output_ext
    {
        Some(ext) if LOSSLESS_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        other => Err(AppError::UnsupportedFormat {
            extension: other.as_deref().unwrap_or("<unknown>").into(),
        }),
    }
}

/// Handles the embedding of a payload into an image.
///
/// # Errors
///
/// Returns [`AppError`] when reading or writing files, or encoding the image.
fn handle_encode(
    args: &mut EncodingArgs,
    config: &Config,
) -> Result<(), AppError>
{
    check_formats(&args.input, &args.output)?;

    let params = args.analysis.apply(config.analysis);
    let percentile = args
        .percentile
        .percentile
        .unwrap_or(config.embedding.percentile);

    let image = load_image(&args.input)?;
    let payload = resolve_message(args)?;

    // Embedding the payload happens here
    let stego = embed_payload(&image, &payload, &params, percentile)?;

    write_image(&stego, &args.output)
}

/// Handles the extraction of a payload from an image.
///
/// # Errors
///
/// Returns [`AppError`] when reading or writing files, or decoding the image.
fn handle_decode(args: &DecodingArgs, config: &Config) -> Result<(), AppError>
{
    let params = args.analysis.apply(config.analysis);
    let image = load_image(&args.input)?;
    let payload = extract_payload(&image, &params)?;

    deliver_payload(payload, args.output.as_deref())
}

/// Handles the capacity calculation of a payload for an image.
///
/// # Errors
///
/// Returns [`AppError`] when reading the image or analysing it fails.
fn handle_capacity(
    args: &CapacityArgs,
    config: &Config,
) -> Result<(), AppError>
{
    let params = args.analysis.apply(config.analysis);
    let percentile = args
        .percentile
        .percentile
        .unwrap_or(config.embedding.percentile);

    let image = load_image(&args.input)?;
    let estimate = estimate_capacity(&image, &params, percentile)?;
    let exact = max_payload_size(&image, &params, percentile)?;
    if estimate > exact
    {
        warn!("sampled estimate of {estimate} bytes exceeds the exact {exact}");
    }
    println!("Estimated payload size: {estimate} bytes");
    println!(
        "Maximum possible payload size: {exact} bytes (percentile {percentile})"
    );
    if exact == MAX_PAYLOAD_LEN
    {
        println!(
            "Note: payload size is capped by the {MAX_PAYLOAD_LEN}-byte \
             length header"
        );
    }

    Ok(())
}

/// Handles the edge report.
///
/// # Errors
///
/// Returns [`AppError`] when reading the image or writing the mask fails.
fn handle_edges(args: &EdgesArgs, config: &Config) -> Result<(), AppError>
{
    let threshold = args.threshold.unwrap_or(config.analysis.edge_threshold);
    let image = load_image(&args.input)?;

    let stats = edge_statistics(&image, threshold)?;
    println!("Edge threshold: {}", stats.threshold);
    println!(
        "Edge pixels: {} of {} ({:.2}%)",
        stats.edge_pixels,
        stats.total_pixels,
        stats.edge_percentage()
    );

    if let Some(path) = args.render.as_deref()
    {
        write_image(&render_edge_mask(&image, threshold)?, path)?;
    }
    Ok(())
}

/// Handles the cluster report.
///
/// # Errors
///
/// Returns [`AppError`] when reading the image, clustering it or writing the
/// rendering fails.
fn handle_clusters(
    args: &ClustersArgs,
    config: &Config,
) -> Result<(), AppError>
{
    let params = args.analysis.apply(config.analysis);
    let image = load_image(&args.input)?;

    let clustering = cluster_edges(&image, &params)?;
    println!("Clusters: {}", clustering.cluster_count());
    println!("Clustered edge pixels: {}", clustering.clustered_count());
    println!("Noise edge pixels: {}", clustering.noise_count());
    let mut sizes = clustering.cluster_sizes();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    if !sizes.is_empty()
    {
        println!("Largest clusters: {:?}", &sizes[..sizes.len().min(10)]);
    }

    if let Some(path) = args.render.as_deref()
    {
        write_image(&render_clusters(&image, &params)?, path)?;
    }
    Ok(())
}
