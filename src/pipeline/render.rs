//! PDF rasterisation: render every page to a PNG [`PageImage`] via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state; calling it from a Tokio
//! worker would stall the executor for the whole render. The work runs on the
//! blocking pool instead.
//!
//! ## Why strictly sequential?
//!
//! Pages share one document handle and one render configuration. Each page
//! is rendered and PNG-encoded before the next is touched, so at most one
//! raster bitmap is alive at a time.

use crate::document::PageImage;
use crate::error::AuditError;
use crate::pipeline::{encode, engine};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Render all pages of an in-memory PDF at `scale`, in page order.
pub async fn render_pages(
    bytes: Vec<u8>,
    file_name: String,
    scale: f32,
) -> Result<Vec<PageImage>, AuditError> {
    tokio::task::spawn_blocking(move || render_pages_blocking(&bytes, &file_name, scale))
        .await
        .map_err(|e| AuditError::Unknown(format!("Render task panicked: {e}")))?
}

/// Count the pages of an in-memory PDF without rasterising.
pub async fn page_count(bytes: Vec<u8>, file_name: String) -> Result<usize, AuditError> {
    tokio::task::spawn_blocking(move || {
        let pdfium = engine::bind()?;
        let document = open(&pdfium, &bytes, &file_name)?;
        let count = document.pages().len() as usize;
        Ok(count)
    })
    .await
    .map_err(|e| AuditError::Unknown(format!("Page-count task panicked: {e}")))?
}

fn open<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    file_name: &str,
) -> Result<PdfDocument<'a>, AuditError> {
    pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| AuditError::CorruptDocument {
            file_name: file_name.to_string(),
            detail: format!("{e:?}"),
        })
}

fn render_pages_blocking(
    bytes: &[u8],
    file_name: &str,
    scale: f32,
) -> Result<Vec<PageImage>, AuditError> {
    let pdfium = engine::bind()?;
    let document = open(&pdfium, bytes, file_name)?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("{}: {} pages", file_name, total);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let mut images = Vec::with_capacity(total);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| AuditError::RasterisationFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        let encoded = encode::encode_page(&image).map_err(|e| AuditError::RasterisationFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {e}"),
        })?;
        images.push(encoded);
    }

    Ok(images)
}
