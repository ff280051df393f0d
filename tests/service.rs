//! Router-level tests with fake collaborators.
//!
//! No network, pdfium or tesseract is needed: every pipeline stage is replaced
//! by an in-process fake and requests go through `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::DynamicImage;
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

use ocr_extract::pipeline::encode::encode_png;
use ocr_extract::pipeline::fetch::Fetcher;
use ocr_extract::pipeline::llm::{ChatModel, ModelMessage, Role};
use ocr_extract::pipeline::ocr::OcrEngine;
use ocr_extract::pipeline::render::{PageImage, Rasterizer};
use ocr_extract::prompts::{BATCH_NUMBER_DIRECTIVES, INVOICE_DIRECTIVES};
use ocr_extract::{router, AppState, Extractor, ExtractError, WordData};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// What the fake object store answers with.
#[derive(Clone, Copy)]
enum Served {
    /// A tiny PNG for every URL.
    Png,
    /// An error page body, as a store returns with a non-2xx status.
    Html,
    /// Connection refused.
    Unreachable,
}

struct FakeFetcher {
    served: Served,
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError> {
        match self.served {
            Served::Png => encode_png(&DynamicImage::new_rgb8(2, 2)),
            Served::Html => Ok(b"<html>403 Forbidden</html>".to_vec()),
            Served::Unreachable => Err(ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
        }
    }
}

/// Produces `pages` images; page N is N pixels wide so the fake OCR can tell
/// them apart.
struct FakeRasterizer {
    pages: usize,
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, _pdf: Vec<u8>) -> Result<Vec<PageImage>, ExtractError> {
        Ok((0..self.pages)
            .map(|index| PageImage {
                index,
                image: DynamicImage::new_rgb8(index as u32 + 1, 1),
            })
            .collect())
    }
}

/// Rejects every document like pdfium does for a damaged file.
struct CorruptRasterizer;

#[async_trait]
impl Rasterizer for CorruptRasterizer {
    async fn rasterize(&self, _pdf: Vec<u8>) -> Result<Vec<PageImage>, ExtractError> {
        Err(ExtractError::CorruptPdf {
            detail: "FormatError".into(),
        })
    }
}

/// Recognises "page <width>" with one confident and one sentinel token.
/// Earlier pages take longer, so out-of-order completion would show up.
struct FakeOcr;

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize_words(&self, image: &DynamicImage) -> Result<WordData, ExtractError> {
        let width = image.width();
        tokio::time::sleep(Duration::from_millis(5 * (10 - width.min(10)) as u64)).await;
        let mut words = WordData::default();
        words.push("page", Some(90.0));
        words.push("", None);
        words.push(width.to_string(), Some(81.0));
        Ok(words)
    }

    async fn recognize_text(&self, _image: &DynamicImage) -> Result<String, ExtractError> {
        Ok("LOT: B-20931 EXP 2026-04".to_string())
    }
}

/// Answers every request with a canned reply and records what it was sent.
struct FakeModel {
    reply: String,
    seen: Mutex<Vec<Vec<ModelMessage>>>,
}

impl FakeModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Vec<ModelMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, messages: &[ModelMessage]) -> Result<String, ExtractError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn build(fetcher: FakeFetcher, rasterizer: Arc<dyn Rasterizer>, model: Arc<FakeModel>) -> Router {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let extractor = Extractor::new(Arc::new(fetcher), rasterizer, Arc::new(FakeOcr), model)
        .with_ocr_concurrency(4);
    router(AppState::new(extractor))
}

fn app_with(pages: usize, model: Arc<FakeModel>, fetch_fails: bool) -> Router {
    let served = if fetch_fails {
        Served::Unreachable
    } else {
        Served::Png
    };
    build(
        FakeFetcher { served },
        Arc::new(FakeRasterizer { pages }),
        model,
    )
}

fn app(pages: usize, model: Arc<FakeModel>) -> Router {
    app_with(pages, model, false)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ── Status ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_is_always_ok() {
    let (status, body) = get(app(0, FakeModel::new("")), "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "count": 1}));

    // Independent of a broken pipeline.
    let (status, body) = get(app_with(0, FakeModel::new(""), true), "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "count": 1}));
}

// ── Missing parameters ───────────────────────────────────────────────────────

#[tokio::test]
async fn missing_params_are_bad_request() {
    let cases = [
        ("/extract-batch-number-from-image", "image_url"),
        ("/extract-text-from-image", "image_url"),
        ("/extract-text-from-pdf", "pdf_url"),
        ("/extract-line-items-from-fusion-invoice", "pdf_url"),
    ];
    for (route, param) in cases {
        let (status, body) = get(app(1, FakeModel::new("{}")), route).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{route}");
        assert_eq!(body, json!({"error": format!("{param} is required")}), "{route}");
    }
}

#[tokio::test]
async fn wrong_param_name_is_still_missing() {
    let (status, body) = get(
        app(1, FakeModel::new("{}")),
        "/extract-text-from-pdf?image_url=https://x/a.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "pdf_url is required");
}

#[tokio::test]
async fn repeated_param_uses_first_value() {
    let (status, body) = get(
        app(0, FakeModel::new("{}")),
        "/extract-text-from-image?image_url=https://x/a.png&image_url=https://x/b.png",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": "LOT: B-20931 EXP 2026-04"}));

    let model = FakeModel::new("[]");
    let (status, body) = get(
        app(2, Arc::clone(&model)),
        "/extract-line-items-from-fusion-invoice?pdf_url=https://x/a.pdf&pdf_url=https://x/b.png",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
    // First value is the PDF: one user message per page.
    assert_eq!(model.requests()[0].len(), INVOICE_DIRECTIVES.len() + 2);
}

// ── PDF text ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_returns_one_result_per_page_in_order() {
    let (status, body) = get(
        app(5, FakeModel::new("{}")),
        "/extract-text-from-pdf?pdf_url=https://store.example.com/scan.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().expect("results array");
    assert_eq!(results.len(), 5);
    for (i, page) in results.iter().enumerate() {
        assert_eq!(page["page"], i + 1);
        assert_eq!(page["text"], format!("page {}", i + 1));
        assert_eq!(page["confidence"], 85.5);
    }
}

#[tokio::test]
async fn empty_pdf_returns_empty_results() {
    let (status, body) = get(
        app(0, FakeModel::new("{}")),
        "/extract-text-from-pdf?pdf_url=https://store.example.com/empty.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
}

#[tokio::test]
async fn pdf_fetch_failure_is_bad_gateway() {
    let (status, body) = get(
        app_with(2, FakeModel::new("{}"), true),
        "/extract-text-from-pdf?pdf_url=https://store.example.com/scan.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

// ── Image text ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_text_is_plain_string() {
    let (status, body) = get(
        app(0, FakeModel::new("{}")),
        "/extract-text-from-image?image_url=https://store.example.com/vial.jpg",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": "LOT: B-20931 EXP 2026-04"}));
}

// ── Batch number ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_number_is_parsed_from_model() {
    let model = FakeModel::new(r#"{"batch_number": "B-20931"}"#);
    let (status, body) = get(
        app(0, Arc::clone(&model)),
        "/extract-batch-number-from-image?image_url=https://store.example.com/vial.jpg",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": {"batch_number": "B-20931"}}));

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let msgs = &requests[0];
    assert_eq!(msgs.len(), BATCH_NUMBER_DIRECTIVES.len() + 1);
    assert_eq!(msgs[0], ModelMessage::system(BATCH_NUMBER_DIRECTIVES[0]));
    assert_eq!(msgs[2], ModelMessage::user("LOT: B-20931 EXP 2026-04"));
}

#[tokio::test]
async fn batch_number_surfaces_invalid_json_as_server_error() {
    let model = FakeModel::new("```json\n{\"batch_number\": \"B-20931\"}\n```");
    let (status, body) = get(
        app(0, model),
        "/extract-batch-number-from-image?image_url=https://store.example.com/vial.jpg",
    )
    .await;
    assert!(status.is_server_error(), "got {status}");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn batch_number_undecodable_image_is_server_error() {
    let model = FakeModel::new(r#"{"batch_number": "B-20931"}"#);
    let app = build(
        FakeFetcher {
            served: Served::Html,
        },
        Arc::new(FakeRasterizer { pages: 0 }),
        Arc::clone(&model),
    );
    let (status, body) = get(app, "/extract-batch-number-from-image?image_url=https://x/vial.jpg").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("image"));
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn batch_number_fetch_failure_is_bad_gateway() {
    let (status, _) = get(
        app_with(0, FakeModel::new("{}"), true),
        "/extract-batch-number-from-image?image_url=https://x/vial.jpg",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// ── Invoice line items ───────────────────────────────────────────────────────

#[tokio::test]
async fn invoice_sends_directives_then_one_message_per_page() {
    let reply = r#"[{"item": "Amoxicillin 500mg", "expiry_date": "2026-01-31", "lot_no": "A77", "quantity": 10}]"#;
    let model = FakeModel::new(reply);
    let (status, body) = get(
        app(3, Arc::clone(&model)),
        "/extract-line-items-from-fusion-invoice?pdf_url=https://store.example.com/F2226069%20Del_0001.PDF",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["lot_no"], "A77");
    assert_eq!(body["results"][0]["quantity"], 10);

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let msgs = &requests[0];
    assert_eq!(msgs.len(), INVOICE_DIRECTIVES.len() + 3);
    for (msg, directive) in msgs.iter().zip(INVOICE_DIRECTIVES) {
        assert_eq!(*msg, ModelMessage::system(directive));
    }
    let pages: Vec<&str> = msgs[3..]
        .iter()
        .inspect(|m| assert_eq!(m.role, Role::User))
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(pages, vec!["page 1", "page 2", "page 3"]);
}

#[tokio::test]
async fn invoice_from_image_sends_single_message() {
    let model = FakeModel::new("[]");
    let (status, body) = get(
        app(3, Arc::clone(&model)),
        "/extract-line-items-from-fusion-invoice?pdf_url=https://store.example.com/invoice.png",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));

    let requests = model.requests();
    let msgs = &requests[0];
    assert_eq!(msgs.len(), INVOICE_DIRECTIVES.len() + 1);
    assert_eq!(msgs[3], ModelMessage::user("LOT: B-20931 EXP 2026-04"));
}

#[tokio::test]
async fn invoice_degrades_to_empty_on_invalid_json() {
    let (status, body) = get(
        app(2, FakeModel::new("Here are the line items: none")),
        "/extract-line-items-from-fusion-invoice?pdf_url=https://store.example.com/inv.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
}

#[tokio::test]
async fn invoice_degrades_to_empty_on_fetch_failure() {
    let model = FakeModel::new("[]");
    let (status, body) = get(
        app_with(2, Arc::clone(&model), true),
        "/extract-line-items-from-fusion-invoice?pdf_url=https://store.example.com/inv.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
    assert!(model.requests().is_empty(), "model must not be called");
}

#[tokio::test]
async fn invoice_degrades_to_empty_on_corrupt_pdf() {
    let model = FakeModel::new("[]");
    let app = build(
        FakeFetcher {
            served: Served::Html,
        },
        Arc::new(CorruptRasterizer),
        Arc::clone(&model),
    );
    let (status, body) = get(
        app,
        "/extract-line-items-from-fusion-invoice?pdf_url=https://x/inv.pdf",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
    assert!(model.requests().is_empty(), "model must not be called");
}

#[tokio::test]
async fn pdf_text_corrupt_document_is_unprocessable() {
    let app = build(
        FakeFetcher {
            served: Served::Html,
        },
        Arc::new(CorruptRasterizer),
        FakeModel::new("{}"),
    );
    let (status, body) = get(app, "/extract-text-from-pdf?pdf_url=https://x/inv.pdf").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}
