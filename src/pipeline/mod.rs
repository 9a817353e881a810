//! Pipeline stages for card sheet generation.
//!
//! Each submodule implements exactly one transformation step, so the
//! alignment-critical pagination can be tested without pdfium or a PDF
//! backend, and either backend can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ paginate ──▶ emit ──▶ pdf
//! (path)    (pdfium)    (pure)       (adapter) (pdf-writer)
//! ```
//!
//! 1. [`input`]    : check the user-supplied path is a readable PDF
//! 2. [`extract`]  : rasterise page 1 and page 2 into a [`crate::model::CardPair`];
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`paginate`] : group pairs and assign every image a rotation and a
//!    grid cell; no I/O
//! 4. [`emit`]     : drive a [`emit::DocumentWriter`] through the page
//!    descriptions in order
//! 5. [`pdf`]      : the PDF implementation of the writer

pub mod emit;
pub mod extract;
pub mod input;
pub mod paginate;
pub mod pdf;
