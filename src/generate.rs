//! Orchestrating run: extract every source, paginate, emit, persist.
//!
//! ```text
//! inputs ──▶ extract (blocking pool, one at a time, in order)
//!              │  failures → SkippedInput, run continues
//!              ▼
//!          paginate + emit (blocking pool) ──▶ bytes ──▶ tmp file ──▶ rename
//! ```
//!
//! Per-input failures never abort the batch. Anything else (bad config, no
//! usable input, a writer error, an unwritable output path) aborts the run
//! and leaves no file at the output path.

use crate::config::{GenerationConfig, LayoutConfig};
use crate::error::CardSheetError;
use crate::model::{CardPair, GenerationResult, PageDescription, PrintAdvice, RunTimings, SkippedInput};
use crate::pipeline::emit::{emit_pages, DocumentWriter};
use crate::pipeline::extract::{PdfiumExtractor, SourceExtractor};
use crate::pipeline::paginate::paginate;
use crate::pipeline::pdf::PdfSheetWriter;
use crate::progress::{extraction_percent, NoopObserver, ProgressObserver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cards that survived extraction, plus the inputs that did not.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub cards: Vec<CardPair>,
    pub skipped: Vec<SkippedInput>,
}

/// Impose the card sources in `inputs` onto duplex sheets and write the PDF
/// to `output`.
///
/// # Errors
/// * [`CardSheetError::InvalidConfig`] before any source is read
/// * [`CardSheetError::NoInput`] when `inputs` is empty or every input failed
/// * [`CardSheetError::Writer`] / [`CardSheetError::OutputWriteFailed`] when
///   the document cannot be assembled or persisted
///
/// Inputs that fail extraction are reported in
/// [`GenerationResult::skipped`], not as errors.
///
/// # Example
/// ```rust,no_run
/// use cardsheet::{generate, GenerationConfig};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let inputs = vec![PathBuf::from("alice.pdf"), PathBuf::from("bob.pdf")];
/// let result = generate(&inputs, "badges.pdf", &GenerationConfig::default()).await?;
/// println!("{} cards on {} pages", result.cards_processed, result.pages_emitted);
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    inputs: &[PathBuf],
    output: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationResult, CardSheetError> {
    let output = output.as_ref();
    let writer = Box::new(PdfSheetWriter::new(config.paper, config.title.clone()));
    let (mut result, bytes) = run(inputs, config, writer).await?;

    let write_start = Instant::now();
    write_atomic(output, &bytes).await?;
    result.timings.emit_ms += write_start.elapsed().as_millis() as u64;
    result.timings.total_ms += write_start.elapsed().as_millis() as u64;
    result.output_path = Some(output.to_path_buf());

    info!(
        output = %output.display(),
        bytes = bytes.len(),
        "Wrote {} cards on {} pages",
        result.cards_processed,
        result.pages_emitted
    );

    observer(config).on_run_complete(&result);
    Ok(result)
}

/// Like [`generate`], but drive a caller-supplied writer and return its
/// bytes instead of writing a file.
pub async fn generate_with_writer(
    inputs: &[PathBuf],
    config: &GenerationConfig,
    writer: Box<dyn DocumentWriter>,
) -> Result<(GenerationResult, Vec<u8>), CardSheetError> {
    let (result, bytes) = run(inputs, config, writer).await?;
    observer(config).on_run_complete(&result);
    Ok((result, bytes))
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    inputs: &[PathBuf],
    output: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationResult, CardSheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CardSheetError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(generate(inputs, output, config))
}

/// The page descriptions `cards` would produce under `layout`, without
/// emitting anything.
pub fn plan(cards: &[CardPair], layout: &LayoutConfig) -> Result<Vec<PageDescription>, CardSheetError> {
    layout.validate()?;
    Ok(paginate(cards, layout))
}

/// Extract every input in order, skipping the ones that fail.
///
/// Reports extraction progress (0 – 50 %) and skipped inputs to the
/// configured observer. Does not fail when every input is skipped; callers
/// decide what an empty extraction means.
pub async fn extract_all(
    inputs: &[PathBuf],
    config: &GenerationConfig,
) -> Result<Extraction, CardSheetError> {
    config.validate()?;
    let extractor = resolve_extractor(config)?;
    let observer = observer(config);
    let dpi = config.layout.dpi;
    let total = inputs.len();

    let mut extraction = Extraction::default();

    for (index, path) in inputs.iter().enumerate() {
        let job_path = path.clone();
        let job_extractor = Arc::clone(&extractor);
        let outcome = tokio::task::spawn_blocking(move || job_extractor.extract(&job_path, dpi))
            .await
            .map_err(|e| CardSheetError::Internal(format!("extraction task failed: {e}")))?;

        let name = display_name(path);
        let status = match outcome {
            Ok(pair) => {
                debug!("Extracted card {} from {}", extraction.cards.len() + 1, path.display());
                extraction.cards.push(pair);
                format!("Loaded {name} ({}/{total})", index + 1)
            }
            Err(error) => {
                warn!(input = %path.display(), kind = error.kind(), "Skipping input: {error}");
                let skipped = SkippedInput {
                    index,
                    path: path.clone(),
                    error,
                };
                observer.on_input_skipped(&skipped);
                extraction.skipped.push(skipped);
                format!("Skipped {name} ({}/{total})", index + 1)
            }
        };
        observer.on_progress(extraction_percent(index + 1, total), &status);
    }

    Ok(extraction)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    inputs: &[PathBuf],
    config: &GenerationConfig,
    mut writer: Box<dyn DocumentWriter>,
) -> Result<(GenerationResult, Vec<u8>), CardSheetError> {
    let total_start = Instant::now();
    config.validate()?;

    if inputs.is_empty() {
        return Err(CardSheetError::NoInput {
            supplied: 0,
            failed: 0,
            first_error: None,
        });
    }

    info!("Starting run over {} inputs", inputs.len());
    observer(config).on_run_start(inputs.len());

    // ── Step 1: Extract ──────────────────────────────────────────────────
    let extract_start = Instant::now();
    let Extraction { cards, skipped } = extract_all(inputs, config).await?;
    let extract_ms = extract_start.elapsed().as_millis() as u64;

    if cards.is_empty() {
        return Err(CardSheetError::NoInput {
            supplied: inputs.len(),
            failed: skipped.len(),
            first_error: skipped.first().map(|s| s.error.to_string()),
        });
    }
    info!(
        "Extracted {} of {} inputs in {}ms",
        cards.len(),
        inputs.len(),
        extract_ms
    );

    // ── Step 2: Paginate and emit ────────────────────────────────────────
    let emit_start = Instant::now();
    let layout = config.layout.clone();
    let progress = config.progress.clone();
    let cards_processed = cards.len();

    let (bytes, pages_emitted) = tokio::task::spawn_blocking(move || {
        let pages = paginate(&cards, &layout);
        emit_pages(&pages, writer.as_mut(), progress.as_deref())?;
        let bytes = writer.finish()?;
        Ok::<_, CardSheetError>((bytes, pages.len()))
    })
    .await
    .map_err(|e| CardSheetError::Internal(format!("emission task failed: {e}")))??;
    let emit_ms = emit_start.elapsed().as_millis() as u64;

    debug!("Emitted {} pages ({} bytes) in {}ms", pages_emitted, bytes.len(), emit_ms);

    let result = GenerationResult {
        output_path: None,
        cards_processed,
        pages_emitted,
        skipped,
        timings: RunTimings {
            extract_ms,
            emit_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        },
        print_advice: PrintAdvice::for_paper(&config.paper),
    };
    Ok((result, bytes))
}

fn resolve_extractor(config: &GenerationConfig) -> Result<Arc<dyn SourceExtractor>, CardSheetError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    Ok(Arc::new(PdfiumExtractor::new()?))
}

fn observer(config: &GenerationConfig) -> Arc<dyn ProgressObserver> {
    config
        .progress
        .clone()
        .unwrap_or_else(|| Arc::new(NoopObserver))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write `bytes` to `path` via a temporary sibling and a rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CardSheetError> {
    let write_err = |source: std::io::Error| CardSheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}
