//! CLI payload plumbing.
//!
//! Resolves the bytes to embed from inline text or a file, and delivers the
//! extracted bytes to a file or stdout.
use std::fs;
use std::path::Path;

use super::{AppError, EncodingArgs};

/// Resolves the payload to embed from the command line arguments.
///
/// # Errors
///
/// Returns [`AppError::Read`] when the payload file cannot be read.
pub(super) fn resolve_message(
    args: &mut EncodingArgs,
) -> Result<Vec<u8>, AppError>
{
    match (args.text.take(), &args.payload_file)
    {
        // take the ownership of the text
        (Some(text), None) => Ok(text.into_bytes()),
        (None, Some(path)) =>
        {
            fs::read(path.as_ref()).map_err(|source| AppError::Read {
                path: path.as_ref().into(),
                source,
            })
        },
        // the argument group makes exactly one source required
        _ => Err(AppError::MissingMessage),
    }
}

/// Writes `payload` to `output`, or prints it as UTF-8 text when no path is
/// given.
///
/// # Errors
///
/// Returns [`AppError::Write`] when the file cannot be written and
/// [`AppError::InvalidUtf8`] when printing a payload that is not text.
pub(super) fn deliver_payload(
    payload: Vec<u8>,
    output: Option<&Path>,
) -> Result<(), AppError>
{
    if let Some(path) = output
    {
        return fs::write(path, &payload).map_err(|source| AppError::Write {
            path: path.into(),
            source,
        });
    }

    let text = String::from_utf8(payload)?;
    println!("{text}");
    Ok(())
}
