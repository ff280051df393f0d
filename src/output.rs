//! Data produced by the pipeline: per-word OCR output and per-page results.

use serde::{Deserialize, Serialize};

/// Word-level OCR output for one image.
///
/// `tokens` and `confidences` are parallel: `confidences[i]` belongs to
/// `tokens[i]`. `None` is the engine's "no confidence available" sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordData {
    pub tokens: Vec<String>,
    pub confidences: Vec<Option<f64>>,
}

impl WordData {
    /// Append one recognised token.
    pub fn push(&mut self, token: impl Into<String>, confidence: Option<f64>) {
        self.tokens.push(token.into());
        self.confidences.push(confidence);
    }

    /// Non-empty tokens joined with single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Mean of all non-sentinel confidences, rounded to 2 decimals.
    ///
    /// Returns 0 when no token carries a confidence. Values are clamped into
    /// `[0, 100]` before averaging.
    pub fn mean_confidence(&self) -> f64 {
        let known: Vec<f64> = self
            .confidences
            .iter()
            .flatten()
            .map(|c| c.clamp(0.0, 100.0))
            .collect();
        if known.is_empty() {
            return 0.0;
        }
        let mean = known.iter().sum::<f64>() / known.len() as f64;
        round2(mean)
    }
}

/// OCR output for one PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page: usize,
    pub text: String,
    /// Mean word confidence in `[0, 100]`, 2 decimals.
    pub confidence: f64,
}

impl PageResult {
    pub fn from_words(page: usize, words: &WordData) -> Self {
        Self {
            page,
            text: words.text(),
            confidence: words.mean_confidence(),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
