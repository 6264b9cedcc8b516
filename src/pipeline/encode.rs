//! Image encoding: `DynamicImage` → base64 PNG, and whole-file base64.
//!
//! PNG is lossless; the rubric hinges on thin dashed lines, small pentagon
//! pictograms and status colours, all of which JPEG artefacts blur.

use crate::document::{EncodedDocument, PageImage, PAGE_MEDIA_TYPE, PRESENTATION_MEDIA_TYPE};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG payload (no data-URI prefix).
pub fn encode_page(img: &DynamicImage) -> Result<PageImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded {}x{} page → {} bytes base64", img.width(), img.height(), data.len());

    Ok(PageImage {
        data,
        media_type: PAGE_MEDIA_TYPE.to_string(),
    })
}

/// Wrap an entire presentation file for the model to parse itself.
pub fn encode_container(bytes: &[u8]) -> EncodedDocument {
    EncodedDocument {
        data: STANDARD.encode(bytes),
        media_type: PRESENTATION_MEDIA_TYPE.to_string(),
    }
}
