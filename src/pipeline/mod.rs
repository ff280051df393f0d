//! Pipeline stages for document text extraction.
//!
//! Each submodule implements one transformation step behind a trait, so the
//! service can be assembled from production backends or from test fakes.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ encode ──▶ ocr ──▶ llm
//! (reqwest)  (pdfium)   (PNG)   (tesseract) (hosted model)
//! ```
//!
//! 1. [`fetch`]: GET the document into memory
//! 2. [`render`]: rasterise PDF pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: decode downloaded images, PNG-encode pages for the engine
//! 4. [`ocr`]: word-level or full-text recognition
//! 5. [`llm`]: build the message sequence and strictly parse the JSON reply

pub mod encode;
pub mod fetch;
pub mod llm;
pub mod ocr;
pub mod render;
