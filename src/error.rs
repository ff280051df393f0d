//! Error types for the ocr-extract library.
//!
//! Every pipeline stage returns `Result<_, ExtractError>`. Nothing below the
//! HTTP layer swallows a failure: the route handlers in [`crate::server`]
//! decide whether an error becomes a status code or a degraded body.
//!
//! [`ExtractError::kind`] groups the variants into the three classes the HTTP
//! layer cares about, so the status mapping lives in one match instead of
//! being spread over every handler.

use thiserror::Error;

/// All errors returned by the extraction pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The GET request could not be completed (DNS, TLS, connection reset…).
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The GET request exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// pdfium could not parse the downloaded bytes as a PDF.
    #[error("Document is not a readable PDF: {detail}")]
    CorruptPdf { detail: String },

    /// The PDF is encrypted; the service never has a password to offer.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// pdfium returned an error for a specific page (1-based).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The downloaded bytes are not an image format we can decode.
    #[error("Unsupported or corrupt image: {detail}")]
    UnsupportedImage { detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR executable could not be spawned.
    #[error("OCR engine '{cmd}' is not available: {detail}")]
    OcrUnavailable { cmd: String, detail: String },

    /// The OCR engine ran but exited unsuccessfully or produced garbage.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The hosted model call failed.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The model answered, but not with valid JSON.
    #[error("Model response is not valid JSON: {detail}")]
    InvalidModelJson { detail: String },

    // ── Setup errors ──────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, \
or install it where the system loader can find it."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A remote collaborator (object store, hosted model) misbehaved.
    Upstream,
    /// The fetched document could not be interpreted.
    InvalidDocument,
    /// Local failure: OCR engine, pdfium, configuration, bugs.
    Internal,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::DownloadFailed { .. }
            | ExtractError::DownloadTimeout { .. }
            | ExtractError::LlmApiError { .. }
            | ExtractError::InvalidModelJson { .. } => ErrorKind::Upstream,
            ExtractError::CorruptPdf { .. }
            | ExtractError::PasswordRequired
            | ExtractError::UnsupportedImage { .. } => ErrorKind::InvalidDocument,
            ExtractError::RasterisationFailed { .. }
            | ExtractError::OcrUnavailable { .. }
            | ExtractError::OcrFailed { .. }
            | ExtractError::ProviderNotConfigured { .. }
            | ExtractError::InvalidConfig(_)
            | ExtractError::PdfiumBindingFailed(_)
            | ExtractError::Internal(_) => ErrorKind::Internal,
        }
    }
}
