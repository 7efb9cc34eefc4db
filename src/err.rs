//! Error union types.

use std::io;
use thiserror::Error;

/// Reasons a download request is refused.
///
/// Descriptors never carry the probed path or any other filesystem
/// detail, so they can be surfaced to the caller as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    /// The sanitized name has no extension, or one outside the allowed
    /// set.
    #[error("illegal file extension")]
    IllegalExtension,
    /// The sanitized name appears on the configured denied-name list.
    #[error("illegal file name")]
    IllegalName,
    /// The resolved path does not name a readable file.
    #[error("file does not exist")]
    NotFound,
}

/// Error union for guard validation.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The request failed one of the ordered checks. Also recorded in the
    /// guard's error list.
    #[error("{0}")]
    Denied(Denial),
    /// The filesystem probe itself failed. An operational fault, never
    /// folded into [`Denial::NotFound`].
    #[error(transparent)]
    Probe(#[from] io::Error),
}

/// Error union for download staging.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The validated path stopped being a readable regular file between
    /// validation and staging.
    #[error("not a readable regular file")]
    Unservable,
    /// The sanitized filename cannot be represented in a header value.
    #[error("filename not representable in a header")]
    BadName(#[from] hyper::header::InvalidHeaderValue),
    /// I/O failure while opening or inspecting the file.
    #[error(transparent)]
    Io(#[from] io::Error),
}
