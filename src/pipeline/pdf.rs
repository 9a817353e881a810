//! PDF backend for [`DocumentWriter`].
//!
//! Image XObjects are written as soon as they are inserted; page objects,
//! content streams and the page tree are written on [`finish`], once the
//! number of pages is known.
//!
//! Coordinates: the writer thinks top-down in centimetres (margin box
//! origin at the top-left, rows growing downward), PDF user space is
//! bottom-up in points. The conversion happens in one place,
//! [`PageState::place`].
//!
//! [`finish`]: DocumentWriter::finish

use crate::config::{MarginSet, PaperSize};
use crate::error::CardSheetError;
use crate::model::RasterImage;
use crate::pipeline::emit::DocumentWriter;
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use tracing::{debug, warn};

const PT_PER_CM: f64 = 72.0 / 2.54;
const ZLIB_LEVEL: u8 = 6;
const PRODUCER: &str = concat!("cardsheet ", env!("CARGO_PKG_VERSION"));

fn pt(cm: f64) -> f32 {
    (cm * PT_PER_CM) as f32
}

#[derive(Debug, Clone, Copy)]
struct Grid {
    rows: usize,
    columns: usize,
    column_width_cm: f64,
}

struct PageState {
    page_id: Ref,
    content_id: Ref,
    margins: MarginSet,
    grid: Option<Grid>,
    content: Content,
    images: Vec<(String, Ref)>,
}

impl PageState {
    /// Draw the XObject `name` with its top-left corner at `(x_cm, y_cm)`
    /// measured from the top-left of the sheet.
    fn place(&mut self, name: &str, x_cm: f64, y_cm: f64, w_cm: f64, h_cm: f64, page_h_cm: f64) {
        let bottom = page_h_cm - y_cm - h_cm;
        self.content.save_state();
        self.content
            .transform([pt(w_cm), 0.0, 0.0, pt(h_cm), pt(x_cm), pt(bottom)]);
        self.content.x_object(Name(name.as_bytes()));
        self.content.restore_state();
    }
}

/// Writes card sheets as a PDF with one page per section.
pub struct PdfSheetWriter {
    pdf: Option<Pdf>,
    next_id: i32,
    catalog_id: Ref,
    page_tree_id: Ref,
    paper: PaperSize,
    title: Option<String>,
    pages: Vec<PageState>,
    image_count: usize,
}

impl PdfSheetWriter {
    pub fn new(paper: PaperSize, title: Option<String>) -> Self {
        let mut writer = Self {
            pdf: Some(Pdf::new()),
            next_id: 1,
            catalog_id: Ref::new(1),
            page_tree_id: Ref::new(1),
            paper,
            title,
            pages: Vec::new(),
            image_count: 0,
        };
        writer.catalog_id = writer.alloc();
        writer.page_tree_id = writer.alloc();
        writer
    }

    /// Number of sections begun so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next_id);
        self.next_id += 1;
        r
    }

    fn current_page(&mut self) -> Result<&mut PageState, CardSheetError> {
        self.pages
            .last_mut()
            .ok_or_else(|| CardSheetError::Writer("no section has been started".into()))
    }

    fn pdf_mut(&mut self) -> Result<&mut Pdf, CardSheetError> {
        self.pdf
            .as_mut()
            .ok_or_else(|| CardSheetError::Writer("document already finished".into()))
    }

    fn embed(&mut self, image: &RasterImage) -> Result<(String, Ref), CardSheetError> {
        let id = self.alloc();
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let compressed = compress_to_vec_zlib(image.as_raw(), ZLIB_LEVEL);
        let pdf = self.pdf_mut()?;
        let mut xobj = pdf.image_xobject(id, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(image.width() as i32);
        xobj.height(image.height() as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        xobj.finish();

        Ok((name, id))
    }
}

impl DocumentWriter for PdfSheetWriter {
    fn begin_section(&mut self, margins: &MarginSet) -> Result<(), CardSheetError> {
        self.pdf_mut()?;
        let page_id = self.alloc();
        let content_id = self.alloc();
        self.pages.push(PageState {
            page_id,
            content_id,
            margins: *margins,
            grid: None,
            content: Content::new(),
            images: Vec::new(),
        });
        debug!("PDF page {} started ({margins})", self.pages.len());
        Ok(())
    }

    fn insert_grid(
        &mut self,
        rows: usize,
        columns: usize,
        column_width_cm: f64,
    ) -> Result<(), CardSheetError> {
        if columns == 0 {
            return Err(CardSheetError::Writer("grid needs at least one column".into()));
        }
        let (paper_w, _) = self.paper.dimensions_cm();
        let page = self.current_page()?;
        if page.grid.is_some() {
            return Err(CardSheetError::Writer(
                "section already holds a grid".into(),
            ));
        }

        let printable_w = paper_w - page.margins.left - page.margins.right;
        let grid_w = columns as f64 * column_width_cm;
        if grid_w > printable_w + 1e-9 {
            warn!(
                "Grid is {grid_w:.2} cm wide but only {printable_w:.2} cm fit between the margins; \
                 cards will run past the right margin"
            );
        }

        page.grid = Some(Grid {
            rows,
            columns,
            column_width_cm,
        });
        Ok(())
    }

    fn insert_image(
        &mut self,
        image: &RasterImage,
        height_cm: f64,
        row: usize,
        column: usize,
    ) -> Result<(), CardSheetError> {
        let (_, paper_h) = self.paper.dimensions_cm();
        let grid = self
            .current_page()?
            .grid
            .ok_or_else(|| CardSheetError::Writer("image inserted before grid".into()))?;
        if row >= grid.rows || column >= grid.columns {
            return Err(CardSheetError::Writer(format!(
                "cell ({row}, {column}) is outside the {}x{} grid",
                grid.rows, grid.columns
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(CardSheetError::Writer("cannot place an empty image".into()));
        }

        let (name, id) = self.embed(image)?;
        let width_cm = height_cm * image.aspect_ratio();

        let page = self.current_page()?;
        let x = page.margins.left + column as f64 * grid.column_width_cm;
        let y = page.margins.top + row as f64 * height_cm;
        if y + height_cm > paper_h - page.margins.bottom + 1e-9 {
            warn!("Row {} runs past the bottom margin", row + 1);
        }

        page.place(&name, x, y, width_cm, height_cm, paper_h);
        page.images.push((name, id));
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, CardSheetError> {
        if self.pages.is_empty() {
            return Err(CardSheetError::Writer("document has no pages".into()));
        }
        let info_id = self.alloc();
        let mut pdf = self
            .pdf
            .take()
            .ok_or_else(|| CardSheetError::Writer("document already finished".into()))?;

        let (paper_w, paper_h) = self.paper.dimensions_cm();
        let media_box = Rect::new(0.0, 0.0, pt(paper_w), pt(paper_h));
        let pages = std::mem::take(&mut self.pages);

        pdf.catalog(self.catalog_id).pages(self.page_tree_id);
        pdf.pages(self.page_tree_id)
            .kids(pages.iter().map(|p| p.page_id))
            .count(pages.len() as i32);

        for state in pages {
            let raw = state.content.finish();
            let compressed = compress_to_vec_zlib(&raw, ZLIB_LEVEL);
            pdf.stream(state.content_id, &compressed)
                .filter(Filter::FlateDecode);

            let mut page = pdf.page(state.page_id);
            page.media_box(media_box)
                .parent(self.page_tree_id)
                .contents(state.content_id);
            let mut resources = page.resources();
            let mut xobjects = resources.x_objects();
            for (name, id) in &state.images {
                xobjects.pair(Name(name.as_bytes()), *id);
            }
        }

        {
            let mut info = pdf.document_info(info_id);
            if let Some(title) = &self.title {
                info.title(TextStr(title));
            }
            info.creator(TextStr("cardsheet"));
            info.producer(TextStr(PRODUCER));
        }

        Ok(pdf.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|w| *w == needle)
            .count()
    }

    fn two_page_doc() -> Vec<u8> {
        let mut w = PdfSheetWriter::new(PaperSize::A4, Some("Badges".into()));
        let img = RasterImage::filled(40, 60, [200, 10, 10]);
        for margins in [MarginSet::default_front(), MarginSet::default_back()] {
            w.begin_section(&margins).unwrap();
            w.insert_grid(1, 2, 9.7).unwrap();
            w.insert_image(&img, 5.81, 0, 0).unwrap();
            w.insert_image(&img, 5.81, 0, 1).unwrap();
        }
        assert_eq!(w.page_count(), 2);
        DocumentWriter::finish(&mut w).unwrap()
    }

    #[test]
    fn produces_a_pdf_with_one_page_per_section() {
        let bytes = two_page_doc();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(occurrences(&bytes, b"/Count 2") == 1);
        assert_eq!(occurrences(&bytes, b"/Subtype /Image"), 4);
        assert_eq!(occurrences(&bytes, b"/FlateDecode") >= 4, true);
    }

    #[test]
    fn title_lands_in_metadata() {
        let bytes = two_page_doc();
        assert!(occurrences(&bytes, b"(Badges)") == 1);
    }

    #[test]
    fn image_before_grid_is_rejected() {
        let mut w = PdfSheetWriter::new(PaperSize::A4, None);
        w.begin_section(&MarginSet::uniform(1.0)).unwrap();
        let err = w
            .insert_image(&RasterImage::filled(2, 2, [0, 0, 0]), 5.0, 0, 0)
            .unwrap_err();
        assert!(err.to_string().contains("before grid"));
    }

    #[test]
    fn grid_before_section_is_rejected() {
        let mut w = PdfSheetWriter::new(PaperSize::A4, None);
        assert!(w.insert_grid(1, 1, 9.7).is_err());
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let mut w = PdfSheetWriter::new(PaperSize::Letter, None);
        w.begin_section(&MarginSet::uniform(1.0)).unwrap();
        w.insert_grid(1, 2, 9.7).unwrap();
        let img = RasterImage::filled(2, 2, [0, 0, 0]);
        assert!(w.insert_image(&img, 5.0, 1, 0).is_err());
        assert!(w.insert_image(&img, 5.0, 0, 2).is_err());
    }

    #[test]
    fn empty_document_cannot_finish() {
        let mut w = PdfSheetWriter::new(PaperSize::A4, None);
        assert!(matches!(DocumentWriter::finish(&mut w), Err(CardSheetError::Writer(_))));
    }

    #[test]
    fn finish_twice_is_an_error() {
        let mut w = PdfSheetWriter::new(PaperSize::A4, None);
        w.begin_section(&MarginSet::uniform(1.0)).unwrap();
        DocumentWriter::finish(&mut w).unwrap();
        assert!(DocumentWriter::finish(&mut w).is_err());
        assert!(w.begin_section(&MarginSet::uniform(1.0)).is_err());
    }

    #[test]
    fn cm_to_points() {
        assert!((pt(2.54) - 72.0).abs() < 1e-4);
        assert!((pt(21.0) - 595.2756).abs() < 1e-2);
    }
}
