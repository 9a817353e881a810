//! Error types for the cardsheet library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`CardSheetError`] (fatal): the run cannot produce an artifact at all
//!   (invalid layout, nothing extracted, writer failure). Returned as
//!   `Err(CardSheetError)` from the top-level `generate*` functions.
//!
//! * [`SourceError`] (non-fatal): a single source document could not be
//!   turned into a card pair, but every other input is fine. Collected into
//!   [`crate::model::SkippedInput`] so callers can report exactly which
//!   inputs were dropped and why while the batch carries on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cardsheet library.
///
/// Per-input failures use [`SourceError`] and are reported in
/// [`crate::model::GenerationResult::skipped`] rather than propagated here.
#[derive(Debug, Error)]
pub enum CardSheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No card pair could be produced: either no inputs were supplied, or
    /// every input failed extraction.
    #[error("No usable card sources ({failed}/{supplied} inputs failed){}", first_error_suffix(.first_error))]
    NoInput {
        supplied: usize,
        failed: usize,
        first_error: Option<String>,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A layout or generation setting violates its invariant.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// The document writer rejected a call or could not assemble the document.
    #[error("Document writer failed: {0}")]
    Writer(String),

    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Card sources are rasterised with pdfium. You can:\n\
  • Install libpdfium where the system loader can find it.\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Persistence errors ────────────────────────────────────────────────
    /// A profile or statistics file could not be read, parsed or written.
    #[error("State file '{path}': {detail}")]
    Store { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn first_error_suffix(first: &Option<String>) -> String {
    match first {
        Some(e) => format!("\nFirst error: {e}"),
        None => String::new(),
    }
}

/// A non-fatal error for a single source document.
///
/// The run logs it, records it alongside the input's position, and moves on
/// to the next source.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SourceError {
    /// The document opened fine but does not hold both a front and a back page.
    #[error("'{}' has {pages} page(s); a card source needs a front and a back page", .path.display())]
    InvalidSource { path: PathBuf, pages: usize },

    /// The document could not be opened, parsed or rasterised.
    #[error("'{}' could not be read: {detail}", .path.display())]
    UnreadableSource { path: PathBuf, detail: String },
}

impl SourceError {
    /// The source document this error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            SourceError::InvalidSource { path, .. } | SourceError::UnreadableSource { path, .. } => {
                path
            }
        }
    }

    /// Short, stable name of the failure kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::InvalidSource { .. } => "invalid_source",
            SourceError::UnreadableSource { .. } => "unreadable_source",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_input_display_with_first_error() {
        let e = CardSheetError::NoInput {
            supplied: 3,
            failed: 3,
            first_error: Some("'a.pdf' could not be read: bad xref".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("3/3"), "got: {msg}");
        assert!(msg.contains("bad xref"), "got: {msg}");
    }

    #[test]
    fn no_input_display_when_nothing_supplied() {
        let e = CardSheetError::NoInput {
            supplied: 0,
            failed: 0,
            first_error: None,
        };
        let msg = e.to_string();
        assert!(msg.contains("0/0"));
        assert!(!msg.contains("First error"));
    }

    #[test]
    fn invalid_source_display() {
        let e = SourceError::InvalidSource {
            path: PathBuf::from("single.pdf"),
            pages: 1,
        };
        assert!(e.to_string().contains("single.pdf"));
        assert!(e.to_string().contains("1 page"));
        assert_eq!(e.kind(), "invalid_source");
        assert_eq!(e.path(), std::path::Path::new("single.pdf"));
    }

    #[test]
    fn source_error_serialises() {
        let e = SourceError::UnreadableSource {
            path: PathBuf::from("broken.pdf"),
            detail: "not a PDF".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("UnreadableSource"));
        let back: SourceError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, e);
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = CardSheetError::OutputWriteFailed {
            path: PathBuf::from("/readonly/cards.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/readonly/cards.pdf"));
    }
}
