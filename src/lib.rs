//! # cardsheet
//!
//! Impose two-page card PDFs (front on page 1, back on page 2) onto sheets
//! ready for duplex printing and cutting.
//!
//! ## Why this crate?
//!
//! Printing ID cards, badges or name tags double-sided looks trivial until
//! the first sheet comes out of the printer: the backs land behind the wrong
//! fronts, or upside down. A long-edge duplex flip mirrors the sheet, so the
//! back page must list every row's cards in reverse column order and turn
//! each image the opposite way to the front. This crate does that
//! bookkeeping once, in a pure and tested paginator, and renders the result
//! into a print-ready PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! card PDFs
//!  │
//!  ├─ 1. Input     check each path is a readable PDF
//!  ├─ 2. Extract   rasterise page 1 + page 2 via pdfium (spawn_blocking)
//!  ├─ 3. Paginate  group cards, assign cells, rotation and mirroring (pure)
//!  ├─ 4. Emit      drive a DocumentWriter page by page
//!  └─ 5. Output    PDF bytes, written atomically + a GenerationResult
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardsheet::{generate, GenerationConfig, LayoutConfig};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .layout(LayoutConfig::builder().card_size(5.5, 8.5).build()?)
//!         .title("Staff badges")
//!         .build()?;
//!     let inputs = vec![PathBuf::from("alice.pdf"), PathBuf::from("bob.pdf")];
//!     let result = generate(&inputs, "badges.pdf", &config).await?;
//!     for skipped in &result.skipped {
//!         eprintln!("skipped {}: {}", skipped.path.display(), skipped.error);
//!     }
//!     eprintln!(
//!         "print duplex ({}) at {}% on {}",
//!         result.print_advice.duplex, result.print_advice.scale_percent, result.print_advice.paper
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cardsheet` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cardsheet = { version = "0.3", default-features = false }
//! ```
//!
//! ## Runtime requirement
//!
//! Extraction binds to a pdfium shared library at run time. Set
//! `PDFIUM_LIB_PATH` to the library (or its directory) when it is not on the
//! system loader's search path. Pagination, emission and the PDF writer do
//! not need pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    builtin_profiles, render_file_name, GenerationConfig, GenerationConfigBuilder, LayoutConfig,
    LayoutConfigBuilder, MarginSet, PaperSize, Profile, Rotation, SidePolicy,
    DEFAULT_NAME_TEMPLATE, DEFAULT_PROFILE,
};
pub use error::{CardSheetError, SourceError};
pub use generate::{extract_all, generate, generate_sync, generate_with_writer, plan, Extraction};
pub use model::{
    CardPair, GenerationResult, PageDescription, PageKind, Placement, PrintAdvice, RasterImage,
    RunTimings, SkippedInput,
};
pub use pipeline::emit::DocumentWriter;
pub use pipeline::extract::{preview, PdfiumExtractor, SourceExtractor};
pub use pipeline::paginate::paginate;
pub use pipeline::pdf::PdfSheetWriter;
pub use progress::{ChannelObserver, NoopObserver, ProgressEvent, ProgressObserver};
pub use store::{ProfileStore, RunStats};
