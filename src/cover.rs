//! PDF cover rendering: first page of a remote PDF → PNG blob.
//!
//! The source arrives as a short-lived download URL, not a local path, so
//! the renderer fetches it into a temp directory first (pdfium cannot
//! stream from a byte buffer) and validates the `%PDF` magic bytes before
//! handing it over — a meaningful error beats a pdfium crash. The
//! rasterisation itself runs inside `spawn_blocking`: pdfium keeps
//! thread-local state and must not run on Tokio worker threads.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pdfium_render::prelude::*;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::CheckoutError;
use crate::services::CoverRenderer;

/// pdfium-backed [`CoverRenderer`].
pub struct PdfiumCover {
    download_timeout_secs: u64,
}

impl PdfiumCover {
    pub fn new(download_timeout_secs: u64) -> Self {
        Self {
            download_timeout_secs,
        }
    }
}

impl Default for PdfiumCover {
    fn default() -> Self {
        Self::new(120)
    }
}

#[async_trait]
impl CoverRenderer for PdfiumCover {
    async fn render_cover(&self, source_url: &str, width: u32) -> Result<Vec<u8>, CheckoutError> {
        let temp_dir = TempDir::new().map_err(|e| CheckoutError::Internal(e.to_string()))?;
        let pdf_path = temp_dir.path().join("cover-source.pdf");

        download_pdf(source_url, &pdf_path, self.download_timeout_secs).await?;

        let path = pdf_path.clone();
        let png = tokio::task::spawn_blocking(move || render_first_page(&path, width))
            .await
            .map_err(|e| CheckoutError::Internal(format!("render task panicked: {e}")))??;

        debug!(bytes = png.len(), width, "rendered PDF cover");
        Ok(png)
    }
}

/// Download `url` to `dest`, validating PDF magic bytes.
async fn download_pdf(url: &str, dest: &Path, timeout_secs: u64) -> Result<(), CheckoutError> {
    info!("downloading preview source: {url}");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CheckoutError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CheckoutError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CheckoutError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CheckoutError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CheckoutError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(CheckoutError::NotAPdf {
            url: url.to_string(),
            magic,
        });
    }

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| CheckoutError::Internal(format!("temp write: {e}")))
}

/// Rasterise page 1 at `width` px and PNG-encode it. Blocking.
fn render_first_page(pdf_path: &Path, width: u32) -> Result<Vec<u8>, CheckoutError> {
    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| CheckoutError::PdfiumBindingFailed(format!("{e:?}")))?;
    let pdfium = Pdfium::new(bindings);

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| CheckoutError::CoverRenderFailed {
                detail: format!("load: {e:?}"),
            })?;

    let page = document
        .pages()
        .get(0)
        .map_err(|e| CheckoutError::CoverRenderFailed {
            detail: format!("document has no renderable first page: {e:?}"),
        })?;

    let render_config = PdfRenderConfig::new().set_target_width(width as i32);
    let bitmap =
        page.render_with_config(&render_config)
            .map_err(|e| CheckoutError::CoverRenderFailed {
                detail: format!("render: {e:?}"),
            })?;

    let image = bitmap.as_image();
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| CheckoutError::CoverRenderFailed {
            detail: format!("png encode: {e}"),
        })?;

    Ok(buf)
}

/// Wrap a PNG cover blob in a data URI for views that embed it inline.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
