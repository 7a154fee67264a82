//! Error types for the checkout-plans library.
//!
//! The interactor itself never fails fatally: a broken preview or an absent
//! product list degrades the page rather than crashing the checkout flow.
//! [`CheckoutError`] therefore only appears at the collaborator boundary —
//! HTTP service calls, cover rasterisation, storage persistence, and config
//! validation. The interactor swallows the recoverable subset (preview
//! generation, file listing) after logging it; callers of the service
//! implementations see the full error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the collaborator implementations and configuration.
#[derive(Debug, Error)]
pub enum CheckoutError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// A backend API call failed (non-2xx status, connection error, or a
    /// malformed response body).
    #[error("API request to '{endpoint}' failed: {reason}")]
    Api { endpoint: String, reason: String },

    // ── Cover-generation errors ───────────────────────────────────────────
    /// The source PDF could not be downloaded.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The downloaded bytes are not a PDF document.
    #[error("Source at '{url}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { url: String, magic: [u8; 4] },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
         Install pdfium or set PDFIUM_DYNAMIC_LIB_PATH to an existing copy."
    )]
    PdfiumBindingFailed(String),

    /// pdfium loaded the document but rasterisation failed.
    #[error("Cover rasterisation failed: {detail}")]
    CoverRenderFailed { detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Could not create or write the durable key-value file.
    #[error("Failed to write storage file '{path}': {source}")]
    StorageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
