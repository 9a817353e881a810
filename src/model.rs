//! Data types flowing through the pipeline.
//!
//! ```text
//! source paths ──▶ CardPair ──▶ PageDescription ──▶ DocumentWriter
//!                  (extract)    (paginate)           (emit)
//! ```
//!
//! Images are immutable and shared through `Arc`, so a [`Placement`] can
//! point at its card's image without copying pixels; rotation happens only
//! when a placement is handed to the writer.

use crate::config::{MarginSet, Rotation};
use crate::error::SourceError;
use image::RgbImage;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

// ── Raster images ────────────────────────────────────────────────────────

/// An immutable 24-bit RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// A single-colour image; mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_rgb(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height() == 0 {
            return 0.0;
        }
        f64::from(self.width()) / f64::from(self.height())
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    /// Raw `RGBRGB…` samples, row-major, top row first.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// A new image turned clockwise by `rotation`.
    pub fn rotated(&self, rotation: Rotation) -> RasterImage {
        let pixels = match rotation {
            Rotation::None => self.pixels.clone(),
            Rotation::Cw90 => image::imageops::rotate90(&self.pixels),
            Rotation::Cw180 => image::imageops::rotate180(&self.pixels),
            Rotation::Cw270 => image::imageops::rotate270(&self.pixels),
        };
        RasterImage { pixels }
    }
}

/// Front and back raster of one physical card.
#[derive(Debug, Clone)]
pub struct CardPair {
    /// The document the pair was extracted from.
    pub source: PathBuf,
    pub front: Arc<RasterImage>,
    pub back: Arc<RasterImage>,
}

impl CardPair {
    pub fn new(source: impl Into<PathBuf>, front: RasterImage, back: RasterImage) -> Self {
        Self {
            source: source.into(),
            front: Arc::new(front),
            back: Arc::new(back),
        }
    }
}

// ── Page descriptions ────────────────────────────────────────────────────

/// Which side of the sheet a page prints on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Front,
    Back,
}

/// One image assigned to one grid cell.
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    /// Position of the card in the (successfully extracted) input order.
    pub card_index: usize,
    /// Un-rotated source image.
    #[serde(skip)]
    pub image: Arc<RasterImage>,
    pub rotation: Rotation,
    pub row: usize,
    pub column: usize,
}

/// Everything the writer needs to produce one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageDescription {
    pub kind: PageKind,
    /// Zero-based index of the card group this page belongs to.
    pub group: usize,
    pub margins: MarginSet,
    pub rows: usize,
    pub columns: usize,
    pub column_width_cm: f64,
    /// Height every image on the page is scaled to.
    pub image_height_cm: f64,
    /// In placement order: row-major, following the side's column order.
    pub placements: Vec<Placement>,
}

impl PageDescription {
    /// The card occupying `(row, column)`, if any.
    pub fn card_at(&self, row: usize, column: usize) -> Option<usize> {
        self.placements
            .iter()
            .find(|p| p.row == row && p.column == column)
            .map(|p| p.card_index)
    }
}

// ── Run results ──────────────────────────────────────────────────────────

/// An input that was dropped from the batch.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedInput {
    /// Position in the caller-supplied input list.
    pub index: usize,
    pub path: PathBuf,
    pub error: SourceError,
}

/// Wall-clock timings of a run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunTimings {
    pub extract_ms: u64,
    pub emit_ms: u64,
    pub total_ms: u64,
}

/// Printer settings the output was laid out for.
///
/// Advisory only: nothing enforces them, but printing with anything else
/// misaligns fronts and backs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintAdvice {
    pub duplex: &'static str,
    pub scale_percent: u32,
    pub paper: String,
}

impl PrintAdvice {
    pub fn for_paper(paper: &crate::config::PaperSize) -> Self {
        Self {
            duplex: "long edge",
            scale_percent: 100,
            paper: paper.name(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// Where the document was written; `None` when the caller supplied its
    /// own writer and kept the bytes.
    pub output_path: Option<PathBuf>,
    pub cards_processed: usize,
    pub pages_emitted: usize,
    pub skipped: Vec<SkippedInput>,
    pub timings: RunTimings,
    pub print_advice: PrintAdvice,
}
