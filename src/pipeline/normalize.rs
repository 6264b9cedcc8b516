//! Document normalisation: upload → [`NormalizedDocument`].
//!
//! The kind decided by the upload gate selects the branch once:
//! presentations are base64-wrapped whole, PDFs are rasterised page by page.

use crate::config::AuditConfig;
use crate::document::{DocumentKind, NormalizedDocument, RequestContext, UploadedDocument};
use crate::error::AuditError;
use crate::pipeline::{encode, render};
use tracing::info;

/// Convert an upload into what the analysis service accepts.
///
/// # Errors
/// - [`AuditError::NoPagesDetected`] when a PDF yields zero pages
/// - [`AuditError::RenderingUnavailable`] when pdfium cannot be bound
/// - [`AuditError::CorruptDocument`] when pdfium cannot open the bytes
pub async fn normalize(
    doc: &UploadedDocument,
    ctx: &RequestContext,
    config: &AuditConfig,
) -> Result<NormalizedDocument, AuditError> {
    match doc.kind() {
        DocumentKind::SlideContainer => {
            let encoded = encode::encode_container(doc.bytes());
            info!(
                file = %ctx.file_name,
                "Encoded presentation whole ({} bytes base64)",
                encoded.data.len()
            );
            Ok(NormalizedDocument::Container(encoded))
        }
        DocumentKind::Pdf => {
            let pages = render::render_pages(
                doc.bytes().to_vec(),
                doc.file_name().to_string(),
                config.render_scale,
            )
            .await?;
            if pages.is_empty() {
                return Err(AuditError::NoPagesDetected {
                    file_name: doc.file_name().to_string(),
                });
            }
            info!(
                file = %ctx.file_name,
                elapsed_ms = ctx.elapsed_ms(),
                "Rendered {} page(s)",
                pages.len()
            );
            Ok(NormalizedDocument::Paged(pages))
        }
    }
}
