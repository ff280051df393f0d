//! PDF rasterisation: render every page to an in-memory `DynamicImage`.
//!
//! pdfium wraps a C++ library with thread-local state and must not run on a
//! tokio worker. All calls go through `spawn_blocking`. The rendered pages are
//! returned by value and flow straight into OCR; nothing is written to disk.

use crate::config::ServiceConfig;
use crate::error::ExtractError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rasterised page. `index` is 0-based.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub index: usize,
    pub image: DynamicImage,
}

/// Converts PDF bytes into one image per page, in source order.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: Vec<u8>) -> Result<Vec<PageImage>, ExtractError>;
}

/// [`Rasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            lib_path: config.pdfium_lib_path.clone(),
        }
    }

    /// Bind once to fail fast at startup instead of on the first request.
    pub fn check_binding(&self) -> Result<(), ExtractError> {
        bind_pdfium(self.lib_path.as_deref()).map(|_| ())
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn rasterize(&self, pdf: Vec<u8>) -> Result<Vec<PageImage>, ExtractError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.rasterize_blocking(pdf))
            .await
            .map_err(|e| ExtractError::Internal(format!("Render task panicked: {e}")))?
    }
}

impl PdfiumRasterizer {
    fn rasterize_blocking(&self, pdf: Vec<u8>) -> Result<Vec<PageImage>, ExtractError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;

        let document = pdfium.load_pdf_from_byte_vec(pdf, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                ExtractError::PasswordRequired
            } else {
                ExtractError::CorruptPdf { detail: err_str }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let mut results = Vec::with_capacity(total_pages);

        for (idx, page) in pages.iter().enumerate() {
            let (width, height) = target_size(
                page.width().value,
                page.height().value,
                self.dpi,
                self.max_pixels,
            );
            let render_config = PdfRenderConfig::new()
                .set_target_width(width)
                .set_maximum_height(height);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push(PageImage { index: idx, image });
        }

        Ok(results)
    }
}

/// Pixel size for a page of `width_pt` × `height_pt` points at `dpi`, with the
/// longest edge capped at `max_pixels` and the aspect ratio kept.
fn target_size(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: u32) -> (i32, i32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let mut w = (width_pt * scale).max(1.0);
    let mut h = (height_pt * scale).max(1.0);

    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }
    (w.round().max(1.0) as i32, h.round().max(1.0) as i32)
}

/// Bind to pdfium.
///
/// An explicit directory is used alone; a library missing there is an error.
/// Without one, the directory holding the running executable is tried first,
/// then the system loader.
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, ExtractError> {
    if let Some(dir) = lib_dir {
        return bind_in(dir);
    }

    if let Some(dir) = executable_dir() {
        match bind_in(&dir) {
            Ok(pdfium) => {
                debug!("pdfium bound from {}", dir.display());
                return Ok(pdfium);
            }
            Err(e) => debug!("No pdfium next to executable: {}", e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))
}

fn bind_in(dir: &Path) -> Result<Pdfium, ExtractError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        .map(Pdfium::new)
        .map_err(|e| {
            ExtractError::PdfiumBindingFailed(format!("{}: {:?}", dir.display(), e))
        })
}

/// Directory of the running executable, if it can be determined.
fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()?
        .parent()
        .map(Path::to_path_buf)
}
