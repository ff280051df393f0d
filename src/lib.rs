//! # ocr-extract
//!
//! HTTP service that turns remote PDFs and images into text, and text into
//! structured JSON.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Fetch   GET the document into memory
//!  ├─ 2. Render  rasterise PDF pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR     tesseract, word confidences for PDF pages
//!  ├─ 4. Model   optional hosted-LLM call with fixed directives
//!  └─ 5. Output  JSON response
//! ```
//!
//! ## Routes
//!
//! | Route | Query | Result |
//! |-------|-------|--------|
//! | `/extract-text-from-image` | `image_url` | OCR text |
//! | `/extract-text-from-pdf` | `pdf_url` | `[{page, text, confidence}]` |
//! | `/extract-batch-number-from-image` | `image_url` | `{batch_number}` |
//! | `/extract-line-items-from-fusion-invoice` | `pdf_url` | line items, `[]` on failure |
//! | `/status` | none | `{status: "ok", count: 1}` |
//!
//! The invoice route takes the PDF path when the URL *path* ends in `.pdf`;
//! other URLs are OCR'd as a single image.
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use ocr_extract::{router, AppState, Extractor, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default();
//!     let app = router(AppState::new(Extractor::from_config(&config)?));
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{ErrorKind, ExtractError};
pub use extract::Extractor;
pub use output::{PageResult, WordData};
pub use server::{router, AppState};
