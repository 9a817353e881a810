//! Source extraction: rasterise the two pages of a card PDF via pdfium.
//!
//! The orchestrating run only needs "path in, card pair out", expressed as
//! [`SourceExtractor`]. [`PdfiumExtractor`] is the default implementation;
//! [`crate::GenerationConfig`] accepts any other.
//!
//! ## Threading
//!
//! pdfium wraps a C++ library that uses thread-local state internally and
//! is not safe to call from async contexts. The orchestrator moves every
//! extraction onto Tokio's blocking pool so a slow page never stalls the
//! async executor.
//!
//! ## Scale
//!
//! PDF user space is 72 units per inch, so a page rendered at `dpi` uses the
//! single uniform factor `dpi / 72` on both axes. Output is always 24-bit RGB
//! with no alpha channel.

use crate::error::{CardSheetError, SourceError};
use crate::model::{CardPair, RasterImage};
use crate::pipeline::input;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scale factor used for preview renders.
const PREVIEW_SCALE: f32 = 0.5;

/// Bounding box a preview is shrunk into, in pixels.
const PREVIEW_MAX: (u32, u32) = (200, 150);

/// Turns a two-page source document into a card pair.
///
/// Implementations must be callable from any single worker thread.
pub trait SourceExtractor: Send + Sync {
    /// Rasterise page 1 (front) and page 2 (back) of `path` at `dpi`.
    ///
    /// # Errors
    /// * [`SourceError::InvalidSource`] when the document has fewer than 2 pages
    /// * [`SourceError::UnreadableSource`] when it cannot be opened or rendered
    fn extract(&self, path: &Path, dpi: u32) -> Result<CardPair, SourceError>;
}

// ── pdfium binding ───────────────────────────────────────────────────────

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Bind to the pdfium library once per process.
///
/// `PDFIUM_LIB_PATH` may name the library file itself or the directory that
/// contains it; otherwise the system loader's search path is used.
pub fn bind_pdfium() -> Result<&'static Pdfium, CardSheetError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
            Some(p) if !p.is_empty() => {
                let p = PathBuf::from(p);
                let lib = if p.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&p)
                } else {
                    p
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| CardSheetError::PdfiumBindingFailed(format!("{e:?}")))?;

        info!("pdfium bound");
        Ok(Pdfium::new(bindings))
    })
}

// ── pdfium extractor ─────────────────────────────────────────────────────

/// The default extractor, backed by pdfium.
pub struct PdfiumExtractor {
    pdfium: &'static Pdfium,
}

impl PdfiumExtractor {
    /// Bind pdfium (once per process) and build the extractor.
    pub fn new() -> Result<Self, CardSheetError> {
        Ok(Self {
            pdfium: bind_pdfium()?,
        })
    }
}

impl SourceExtractor for PdfiumExtractor {
    fn extract(&self, path: &Path, dpi: u32) -> Result<CardPair, SourceError> {
        input::validate_source(path)?;

        let unreadable = |detail: String| SourceError::UnreadableSource {
            path: path.to_path_buf(),
            detail,
        };

        // The document handle lives only for this call.
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| unreadable(format!("{e:?}")))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        if total < 2 {
            return Err(SourceError::InvalidSource {
                path: path.to_path_buf(),
                pages: total,
            });
        }

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let render = |index: u16| -> Result<RasterImage, SourceError> {
            let page = pages
                .get(index)
                .map_err(|e| unreadable(format!("page {}: {e:?}", index + 1)))?;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| unreadable(format!("page {}: {e:?}", index + 1)))?;
            Ok(to_raster(bitmap.as_image()))
        };

        let front = render(0)?;
        let back = render(1)?;

        debug!(
            "Extracted {} → front {}x{} px, back {}x{} px",
            path.display(),
            front.width(),
            front.height(),
            back.width(),
            back.height()
        );

        Ok(CardPair::new(path, front, back))
    }
}

fn to_raster(image: DynamicImage) -> RasterImage {
    RasterImage::from_rgb(image.to_rgb8())
}

// ── Preview ──────────────────────────────────────────────────────────────

/// Render a small thumbnail of the first page for display.
///
/// Advisory only: every failure (no pdfium, unreadable file, empty document)
/// yields `None` instead of an error.
pub fn preview(path: &Path) -> Option<RasterImage> {
    match render_preview(path) {
        Ok(img) => Some(img),
        Err(reason) => {
            debug!("No preview for {}: {}", path.display(), reason);
            None
        }
    }
}

fn render_preview(path: &Path) -> Result<RasterImage, String> {
    input::validate_source(path).map_err(|e| e.to_string())?;
    let pdfium = bind_pdfium().map_err(|e| e.to_string())?;

    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| format!("{e:?}"))?;
    let pages = document.pages();
    if pages.len() < 1 {
        return Err("document has no pages".into());
    }
    let page = pages.get(0).map_err(|e| format!("{e:?}"))?;
    let bitmap = page
        .render_with_config(&PdfRenderConfig::new().scale_page_by_factor(PREVIEW_SCALE))
        .map_err(|e| format!("{e:?}"))?;

    Ok(fit_within(bitmap.as_image(), PREVIEW_MAX))
}

/// Shrink `image` to fit inside `max` keeping its aspect ratio. Never enlarges.
fn fit_within(image: DynamicImage, max: (u32, u32)) -> RasterImage {
    let (w, h) = (image.width(), image.height());
    if w <= max.0 && h <= max.1 {
        return to_raster(image);
    }
    to_raster(image.thumbnail(max.0, max.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn dynamic(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
    }

    #[test]
    fn fit_within_shrinks_keeping_aspect() {
        let out = fit_within(dynamic(400, 300), PREVIEW_MAX);
        assert_eq!((out.width(), out.height()), (200, 150));

        let tall = fit_within(dynamic(100, 600), PREVIEW_MAX);
        assert_eq!(tall.height(), 150);
        assert_eq!(tall.width(), 25);
    }

    #[test]
    fn fit_within_never_enlarges() {
        let out = fit_within(dynamic(50, 40), PREVIEW_MAX);
        assert_eq!((out.width(), out.height()), (50, 40));
    }

    #[test]
    fn to_raster_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([10, 20, 30, 0]),
        ));
        let out = to_raster(rgba);
        assert_eq!(out.as_raw().len(), 2 * 2 * 3);
        assert_eq!(&out.as_raw()[..3], &[10, 20, 30]);
    }

    #[test]
    fn pdfium_extractor_can_be_shared_across_workers() {
        fn assert_shareable<T: Send + Sync + 'static>() {}
        assert_shareable::<PdfiumExtractor>();
        assert_shareable::<std::sync::Arc<dyn SourceExtractor>>();
    }

    #[test]
    fn preview_of_missing_file_is_none() {
        assert!(preview(Path::new("/no/such/card.pdf")).is_none());
    }
}
