//! The extraction service: wires fetcher, rasteriser, OCR engine and model
//! together into the four operations exposed over HTTP.
//!
//! ```text
//! URL ──▶ fetch ──▶ rasterize (PDF only) ──▶ OCR per page ──▶ [model] ──▶ JSON
//! ```
//!
//! [`Extractor`] owns its collaborators behind trait objects so tests can swap
//! any of them for a fake. Every operation returns `Result`; deciding which
//! failures degrade to an empty answer is left to the HTTP layer.

use crate::config::ServiceConfig;
use crate::error::ExtractError;
use crate::output::PageResult;
use crate::pipeline::encode::decode_image;
use crate::pipeline::fetch::{is_pdf_url, Fetcher, HttpFetcher};
use crate::pipeline::llm::{build_messages, extract_structured, ChatModel, ProviderModel};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer};
use crate::prompts::{BATCH_NUMBER_DIRECTIVES, INVOICE_DIRECTIVES};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Stateless extraction service shared by all requests.
pub struct Extractor {
    fetcher: Arc<dyn Fetcher>,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrEngine>,
    model: Arc<dyn ChatModel>,
    ocr_concurrency: usize,
}

impl Extractor {
    /// Build a service from explicit collaborators.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrEngine>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            fetcher,
            rasterizer,
            ocr,
            model,
            ocr_concurrency: 1,
        }
    }

    /// Number of pages OCR'd at the same time. Results keep page order.
    pub fn with_ocr_concurrency(mut self, n: usize) -> Self {
        self.ocr_concurrency = n.max(1);
        self
    }

    /// Production wiring: reqwest, pdfium, tesseract and an edgequake-llm
    /// provider resolved from `config` and the environment.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ExtractError> {
        let fetcher = HttpFetcher::new(config.download_timeout_secs)?;
        let rasterizer = PdfiumRasterizer::new(config);
        let ocr = TesseractOcr::new(config);
        let model = ProviderModel::from_config(config)?;

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(rasterizer),
            Arc::new(ocr),
            Arc::new(model),
        )
        .with_ocr_concurrency(config.ocr_concurrency))
    }

    /// Full-text OCR of a standalone image.
    pub async fn extract_text_from_image(&self, image_url: &str) -> Result<String, ExtractError> {
        let bytes = self.fetcher.fetch(image_url).await?;
        let image = decode_image(&bytes)?;
        debug!("Decoded image {}x{}", image.width(), image.height());
        self.ocr.recognize_text(&image).await
    }

    /// Word-level OCR of every page of a PDF, in page order.
    pub async fn extract_text_from_pdf(&self, pdf_url: &str) -> Result<Vec<PageResult>, ExtractError> {
        let start = Instant::now();
        let bytes = self.fetcher.fetch(pdf_url).await?;

        let pages = self.rasterizer.rasterize(bytes).await?;
        info!("Rasterised {} pages in {:?}", pages.len(), start.elapsed());

        let results = self.ocr_pages(pages).await?;
        info!(
            "OCR complete: {} pages in {:?}",
            results.len(),
            start.elapsed()
        );
        Ok(results)
    }

    /// Extract `{"batch_number": …}` from a photo of a vial label.
    pub async fn extract_batch_number(&self, image_url: &str) -> Result<Value, ExtractError> {
        let text = self.extract_text_from_image(image_url).await?;
        let messages = build_messages(&BATCH_NUMBER_DIRECTIVES, [text]);
        extract_structured(self.model.as_ref(), &messages).await
    }

    /// Extract invoice line items from a PDF (one user message per page) or
    /// from a single image.
    pub async fn extract_invoice_line_items(&self, url: &str) -> Result<Value, ExtractError> {
        let inputs: Vec<String> = if is_pdf_url(url) {
            let pages = self.extract_text_from_pdf(url).await?;
            info!("Invoice OCR results: {:?}", pages);
            pages.into_iter().map(|p| p.text).collect()
        } else {
            let text = self.extract_text_from_image(url).await?;
            info!("Invoice OCR result: {:?}", text);
            vec![text]
        };

        let messages = build_messages(&INVOICE_DIRECTIVES, inputs);
        let value = extract_structured(self.model.as_ref(), &messages).await?;
        info!("Invoice line items: {}", value);
        Ok(value)
    }

    /// OCR every page, at most `ocr_concurrency` at a time, keeping order.
    async fn ocr_pages(&self, pages: Vec<PageImage>) -> Result<Vec<PageResult>, ExtractError> {
        stream::iter(pages.into_iter().map(|page| {
            let ocr = Arc::clone(&self.ocr);
            async move {
                let words = ocr.recognize_words(&page.image).await?;
                let result = PageResult::from_words(page.index + 1, &words);
                debug!(
                    "Page {}: {} chars, confidence {:.2}",
                    result.page,
                    result.text.len(),
                    result.confidence
                );
                Ok::<_, ExtractError>(result)
            }
        }))
        .buffered(self.ocr_concurrency)
        .try_collect()
        .await
    }
}
