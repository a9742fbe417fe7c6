//! CLI image helpers.
//!
//! Normalizes extensions, loads RGB rasters, and writes them back with a
//! lossless encoder. Lossy formats would destroy the embedded bits, so they
//! are rejected.
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::codecs::tiff::TiffEncoder;
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder, ImageResult, RgbImage,
};
use log::debug;

use super::AppError;

/// Extensions [`write_image`] can produce.
pub(super) const LOSSLESS_EXTENSIONS: [&str; 5] =
    ["png", "bmp", "tiff", "tif", "ppm"];

/// Normalizes the extension of a path to lowercase.
pub(super) fn normalized_extension(path: impl AsRef<Path>) -> Option<String>
{
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Maps extension aliases to one name per format.
pub(super) fn format_of(extension: &str) -> &str
{
    match extension
    {
        "tif" => "tiff",
        other => other,
    }
}

/// Loads an image from the specified path and converts it to an RGB raster.
///
/// # Errors
///
/// Returns
/// * [`AppError::Read`] when the path is a directory
/// * [`AppError::ImageOpen`] when the image cannot be loaded
pub(super) fn load_image(path: impl AsRef<Path>) -> Result<RgbImage, AppError>
{
    let path = path.as_ref();
    if path.is_dir()
    {
        let message = format!("{} is a directory", path.display());
        return Err(AppError::Read {
            path: path.into(),
            source: Error::new(ErrorKind::IsADirectory, message),
        });
    }

    let image = image::open(path)
        .map_err(|source| AppError::ImageOpen {
            path: path.into(),
            source,
        })
        .map(DynamicImage::into_rgb8)?;
    debug!(
        "loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Writes `image` with the lossless encoder matching `output`'s extension.
///
/// # Errors
///
/// Returns
/// * [`AppError::UnsupportedFormat`] when the extension is not lossless
/// * [`AppError::Write`] when the file cannot be created
/// * [`AppError::ImageEncode`] when the image cannot be encoded
pub(super) fn write_image(
    image: &RgbImage,
    output: impl AsRef<Path>,
) -> Result<(), AppError>
{
    let output = output.as_ref();
    let extension = normalized_extension(output)
        .filter(|ext| LOSSLESS_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| AppError::UnsupportedFormat {
            extension: normalized_extension(output)
                .unwrap_or_else(|| "<unknown>".into())
                .into(),
        })?;

    let file = File::create(output).map_err(|source| AppError::Write {
        path: output.into(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    encode(image, &extension, &mut writer).map_err(|source| {
        AppError::ImageEncode {
            path: output.into(),
            target_format: extension.as_str().into(),
            source,
        }
    })?;
    writer.flush().map_err(|source| AppError::Write {
        path: output.into(),
        source,
    })?;
    debug!("wrote {}", output.display());
    Ok(())
}

/// Runs the encoder for a supported `extension`.
fn encode(
    image: &RgbImage,
    extension: &str,
    writer: &mut BufWriter<File>,
) -> ImageResult<()>
{
    let (raw, width, height) = (image.as_raw(), image.width(), image.height());
    match extension
    {
        "png" => PngEncoder::new_with_quality(
            writer,
            CompressionType::Default,
            FilterType::Adaptive,
        )
        .write_image(raw, width, height, ExtendedColorType::Rgb8),
        "bmp" => BmpEncoder::new(writer).encode(
            raw,
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
        "ppm" => PnmEncoder::new(writer)
            .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
            .encode(raw.as_slice(), width, height, ExtendedColorType::Rgb8),
        // tiff and tif, filtered by the caller
        _ => TiffEncoder::new(writer).write_image(
            raw,
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
    }
}
