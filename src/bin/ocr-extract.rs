//! HTTP server binary for ocr-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, checks the external engines, and serves the router.

use anyhow::{Context, Result};
use clap::Parser;
use ocr_extract::pipeline::ocr::TesseractOcr;
use ocr_extract::pipeline::render::PdfiumRasterizer;
use ocr_extract::{router, AppState, Extractor, ServiceConfig};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-extract",
    version,
    about = "Serve OCR and LLM-based extraction for remote PDFs and images",
    long_about = "Serve HTTP endpoints that download a PDF or image, OCR it with tesseract, \
and optionally ask a hosted LLM to turn the text into JSON (invoice line items, vial \
batch numbers). Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any \
OpenAI-compatible endpoint.",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "OCR_EXTRACT_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// LLM model ID.
    #[arg(long, env = "OCR_EXTRACT_MODEL", default_value = ocr_extract::config::DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "OCR_EXTRACT_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0). Provider default if unset.
    #[arg(long, env = "OCR_EXTRACT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens per model call. Provider default if unset.
    #[arg(long, env = "OCR_EXTRACT_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "OCR_EXTRACT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "OCR_EXTRACT_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract: String,

    /// Pages OCR'd concurrently within one request.
    #[arg(short, long, env = "OCR_EXTRACT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Download timeout in seconds (0 = none).
    #[arg(long, env = "OCR_EXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR_EXTRACT_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "ocr_extract=debug,tower_http=debug"
    } else {
        "ocr_extract=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    tracing::debug!("{:?}", config);

    // ── Check external engines before accepting traffic ──────────────────
    PdfiumRasterizer::new(&config)
        .check_binding()
        .context("PDFium engine unavailable")?;
    let version = TesseractOcr::new(&config)
        .check_available()
        .await
        .context("Tesseract unavailable")?;
    tracing::info!("OCR engine: {}", version);

    let extractor = Extractor::from_config(&config).context("Failed to build extractor")?;
    let app = router(AppState::new(extractor));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Map CLI args to `ServiceConfig`.
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .bind_addr(cli.bind)
        .model(&cli.model)
        .dpi(cli.dpi)
        .ocr_language(&cli.lang)
        .tesseract_cmd(&cli.tesseract)
        .ocr_concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
