//! Emission: hand page descriptions to a document writer, in order.
//!
//! The writer contract mirrors a word-processor model: a page is a
//! *section* with four margins, holding one *grid* of fixed-width columns,
//! with images inserted into cells at a target height. The writer is
//! append-only; nothing is ever read back from it.

use crate::config::MarginSet;
use crate::error::CardSheetError;
use crate::model::{PageDescription, PageKind, RasterImage};
use crate::progress::{emission_percent, ProgressObserver};
use tracing::debug;

/// A document backend that materialises page descriptions.
///
/// Calls arrive in this order for every page:
/// `begin_section` → `insert_grid` → `insert_image` × placements.
/// `finish` is called once after the last page.
pub trait DocumentWriter: Send {
    /// Start a new page with the given margins.
    fn begin_section(&mut self, margins: &MarginSet) -> Result<(), CardSheetError>;

    /// Anchor a grid at the top-left of the current page's margin box.
    fn insert_grid(
        &mut self,
        rows: usize,
        columns: usize,
        column_width_cm: f64,
    ) -> Result<(), CardSheetError>;

    /// Place `image` in a grid cell, scaled to `height_cm` with its aspect
    /// ratio preserved.
    fn insert_image(
        &mut self,
        image: &RasterImage,
        height_cm: f64,
        row: usize,
        column: usize,
    ) -> Result<(), CardSheetError>;

    /// Close the document and return its serialised bytes.
    fn finish(&mut self) -> Result<Vec<u8>, CardSheetError>;
}

/// Drive `writer` through `pages`, applying each placement's rotation.
///
/// Reports `50 + groups_done / groups × 50` after each back page.
pub fn emit_pages(
    pages: &[PageDescription],
    writer: &mut dyn DocumentWriter,
    progress: Option<&dyn ProgressObserver>,
) -> Result<(), CardSheetError> {
    let groups = pages.iter().map(|p| p.group + 1).max().unwrap_or(0);

    for page in pages {
        writer.begin_section(&page.margins)?;
        writer.insert_grid(page.rows, page.columns, page.column_width_cm)?;

        for placement in &page.placements {
            let rotated = placement.image.rotated(placement.rotation);
            writer.insert_image(
                &rotated,
                page.image_height_cm,
                placement.row,
                placement.column,
            )?;
        }

        debug!(
            "Emitted {:?} page of group {} ({} cards)",
            page.kind,
            page.group + 1,
            page.placements.len()
        );

        if page.kind == PageKind::Back {
            if let Some(obs) = progress {
                obs.on_progress(
                    emission_percent(page.group + 1, groups),
                    &format!("Laid out sheet {}/{}", page.group + 1, groups),
                );
            }
        }
    }

    Ok(())
}
