//! Text recognition via the `tesseract` executable.
//!
//! The image is PNG-encoded in memory and piped to tesseract on stdin
//! (`tesseract stdin stdout …`), so no temp file is created. `kill_on_drop`
//! guarantees the child is reaped even if the request future is cancelled.
//!
//! Two modes:
//!
//! * **word mode**: TSV output, one row per layout element. Word rows
//!   (level 5) give the token and its confidence; `-1` is the engine's
//!   "no confidence" sentinel.
//! * **text mode**: plain text with `--oem 3 --psm 6`, used for photos of
//!   vial labels and other single-block images.

use crate::config::ServiceConfig;
use crate::error::ExtractError;
use crate::output::WordData;
use crate::pipeline::encode::encode_png;
use async_trait::async_trait;
use image::DynamicImage;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// TSV `level` value of a word row.
const WORD_LEVEL: &str = "5";

/// Runs OCR over a single raster image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Word-level recognition with per-token confidence.
    async fn recognize_words(&self, image: &DynamicImage) -> Result<WordData, ExtractError>;

    /// Full-text recognition, no confidence.
    async fn recognize_text(&self, image: &DynamicImage) -> Result<String, ExtractError>;
}

/// [`OcrEngine`] that shells out to tesseract.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    cmd: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            cmd: config.tesseract_cmd.clone(),
            language: config.ocr_language.clone(),
        }
    }

    /// Run `tesseract --version` so a missing binary is reported at startup.
    pub async fn check_available(&self) -> Result<String, ExtractError> {
        let output = Command::new(&self.cmd)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.unavailable(e))?;
        let version = String::from_utf8_lossy(&output.stdout);
        Ok(version.lines().next().unwrap_or_default().trim().to_string())
    }

    fn word_args(&self) -> Vec<String> {
        vec![
            "stdin".into(),
            "stdout".into(),
            "-l".into(),
            self.language.clone(),
            "tsv".into(),
        ]
    }

    fn text_args(&self) -> Vec<String> {
        vec![
            "stdin".into(),
            "stdout".into(),
            "--oem".into(),
            "3".into(),
            "--psm".into(),
            "6".into(),
            "-l".into(),
            self.language.clone(),
        ]
    }

    async fn run(&self, args: &[String], png: Vec<u8>) -> Result<String, ExtractError> {
        let mut child = Command::new(&self.cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractError::Internal("tesseract stdin not captured".into()))?;
        // Feed stdin concurrently with draining stdout so a large TSV cannot
        // deadlock against a full pipe.
        let writer = async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        };
        let (write_result, output) = tokio::join!(writer, child.wait_with_output());

        let output = output.map_err(|e| ExtractError::OcrFailed {
            detail: format!("waiting for tesseract: {e}"),
        })?;
        if !output.status.success() {
            return Err(ExtractError::OcrFailed {
                detail: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        write_result.map_err(|e| ExtractError::OcrFailed {
            detail: format!("writing image to tesseract: {e}"),
        })?;

        String::from_utf8(output.stdout).map_err(|e| ExtractError::OcrFailed {
            detail: format!("non UTF-8 output: {e}"),
        })
    }

    fn unavailable(&self, e: std::io::Error) -> ExtractError {
        ExtractError::OcrUnavailable {
            cmd: self.cmd.clone(),
            detail: e.to_string(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize_words(&self, image: &DynamicImage) -> Result<WordData, ExtractError> {
        let png = encode_png(image)?;
        let tsv = self.run(&self.word_args(), png).await?;
        let words = parse_tsv(&tsv)?;
        debug!("OCR recognised {} words", words.tokens.len());
        Ok(words)
    }

    async fn recognize_text(&self, image: &DynamicImage) -> Result<String, ExtractError> {
        let png = encode_png(image)?;
        let text = self.run(&self.text_args(), png).await?;
        debug!("OCR recognised {} chars", text.len());
        Ok(text)
    }
}

/// Parse tesseract TSV output into word tokens and confidences.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. Only word rows are kept; the text column may be
/// missing on rows with nothing recognised.
pub fn parse_tsv(tsv: &str) -> Result<WordData, ExtractError> {
    let mut words = WordData::default();
    let mut lines = tsv.lines();

    match lines.next() {
        Some(header) if header.starts_with("level") => {}
        Some(other) => {
            return Err(ExtractError::OcrFailed {
                detail: format!("unexpected TSV header: {other:?}"),
            })
        }
        None => return Ok(words),
    }

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.splitn(12, '\t').collect();
        if cols.len() < 11 {
            return Err(ExtractError::OcrFailed {
                detail: format!("malformed TSV row: {line:?}"),
            });
        }
        if cols[0] != WORD_LEVEL {
            continue;
        }
        let confidence = parse_confidence(cols[10]);
        let token = cols.get(11).copied().unwrap_or_default();
        words.push(token, confidence);
    }

    Ok(words)
}

/// `-1` (and anything unparseable or negative) is "no confidence".
fn parse_confidence(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|c| *c >= 0.0)
}
