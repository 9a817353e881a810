//! CLI binary for cardsheet.
//!
//! A thin shim over the library crate that maps CLI flags and the selected
//! profile to a `GenerationConfig`, runs the generation and prints results.

use anyhow::{bail, Context, Result};
use cardsheet::{
    extract_all, generate, plan, preview, render_file_name, GenerationConfig, GenerationResult,
    LayoutConfig, MarginSet, PaperSize, Profile, ProfileStore, ProgressObserver, RasterImage,
    RunStats, SkippedInput, DEFAULT_NAME_TEMPLATE, DEFAULT_PROFILE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────

/// Renders the run's 0–100 % progress as a bar and prints one line per
/// skipped input above it.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Cards");
        bar.set_message("Opening sources…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ProgressObserver for CliProgress {
    fn on_run_start(&self, total_inputs: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Imposing {total_inputs} card sources…"))
        ));
    }

    fn on_progress(&self, percent: f32, status: &str) {
        if percent >= 50.0 {
            self.bar.set_prefix("Sheets");
        }
        self.bar.set_position(percent.clamp(0.0, 100.0) as u64);
        self.bar.set_message(status.to_string());
    }

    fn on_input_skipped(&self, skipped: &SkippedInput) {
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            skipped.path.display(),
            red(&skipped.error.to_string()),
        ));
    }

    fn on_run_complete(&self, _result: &GenerationResult) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Impose every card in a folder onto A4 sheets
  cardsheet cards/*.pdf

  # Named output, staff badge profile
  cardsheet --profile staff -o staff_badges.pdf alice.pdf bob.pdf

  # Tweak the back-side left margin for a printer that shifts duplex pages
  cardsheet --back-margins 1.27,1.27,0.6,1.27 cards/*.pdf

  # Save the current settings as a profile
  cardsheet --card-height 5.4 --card-width 8.6 --save-profile club

  # Inspect the page plan without writing a PDF
  cardsheet --plan-only cards/*.pdf

PRINTING:
  Print the generated PDF double-sided, flipping on the LONG edge, at 100%
  scale (no "fit to page") on the paper size it was laid out for. Any other
  setting misaligns fronts and backs.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  CARDSHEET_*             Fallback for most flags (see --help)
  RUST_LOG                Override the log filter
"#;

/// Impose two-page card PDFs onto duplex-ready print sheets.
#[derive(clap::Parser, Debug)]
#[command(
    name = "cardsheet",
    version,
    about = "Impose two-page card PDFs onto duplex-ready print sheets",
    long_about = "Rasterise the front (page 1) and back (page 2) of each card PDF and lay them \
out in a grid, front sheet then back sheet, with the back columns mirrored and the images \
rotated so both sides line up after a long-edge duplex flip.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Card PDFs: page 1 is the front, page 2 the back.
    inputs: Vec<PathBuf>,

    /// Output PDF path. Overrides --output-dir and --name-template.
    #[arg(short, long, env = "CARDSHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for generated files.
    #[arg(long, env = "CARDSHEET_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Output file name; {date} and {time} are replaced.
    #[arg(long, env = "CARDSHEET_NAME_TEMPLATE", default_value = DEFAULT_NAME_TEMPLATE)]
    name_template: String,

    /// Card profile to start from.
    #[arg(long, env = "CARDSHEET_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Card height in cm.
    #[arg(long, env = "CARDSHEET_CARD_HEIGHT")]
    card_height: Option<f64>,

    /// Card width in cm.
    #[arg(long, env = "CARDSHEET_CARD_WIDTH")]
    card_width: Option<f64>,

    /// Rasterisation resolution.
    #[arg(long, env = "CARDSHEET_DPI",
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: Option<u32>,

    /// Cards per sheet side.
    #[arg(long, env = "CARDSHEET_CARDS_PER_PAGE")]
    cards_per_page: Option<usize>,

    /// Front margins in cm: top,bottom,left,right.
    #[arg(long, env = "CARDSHEET_FRONT_MARGINS", value_parser = parse_margins)]
    front_margins: Option<MarginSet>,

    /// Back margins in cm: top,bottom,left,right.
    #[arg(long, env = "CARDSHEET_BACK_MARGINS", value_parser = parse_margins)]
    back_margins: Option<MarginSet>,

    /// Paper size.
    #[arg(long, env = "CARDSHEET_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Title written into the PDF metadata.
    #[arg(long, env = "CARDSHEET_TITLE")]
    title: Option<String>,

    /// Profiles JSON file.
    #[arg(long, env = "CARDSHEET_PROFILES_FILE", default_value = "cardsheet-profiles.json")]
    profiles_file: PathBuf,

    /// Run statistics JSON file.
    #[arg(long, env = "CARDSHEET_STATS_FILE", default_value = "cardsheet-stats.json")]
    stats_file: PathBuf,

    /// Do not update the statistics file.
    #[arg(long, env = "CARDSHEET_NO_STATS")]
    no_stats: bool,

    /// Save the effective card settings under this profile name.
    #[arg(long)]
    save_profile: Option<String>,

    /// List available profiles and exit.
    #[arg(long)]
    list_profiles: bool,

    /// Print run statistics and exit.
    #[arg(long)]
    show_stats: bool,

    /// Write a PNG thumbnail of the first input's front and exit.
    #[arg(long)]
    preview_only: bool,

    /// Print the page plan as JSON without writing a PDF.
    #[arg(long)]
    plan_only: bool,

    /// Print the run result as JSON on stdout.
    #[arg(long, env = "CARDSHEET_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CARDSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CARDSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CARDSHEET_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A4,
    Letter,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::Letter => PaperSize::Letter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.plan_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Informational modes ──────────────────────────────────────────────
    let mut profiles = ProfileStore::load(&cli.profiles_file)
        .with_context(|| format!("Failed to load profiles from {}", cli.profiles_file.display()))?;

    if cli.list_profiles {
        return list_profiles(&profiles, cli.json);
    }
    if cli.show_stats {
        let stats = RunStats::load(&cli.stats_file).context("Failed to load statistics")?;
        return show_stats(&stats, cli.json);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let layout = build_layout(&cli, &profiles)?;

    if let Some(ref name) = cli.save_profile {
        profiles.upsert(name.clone(), Profile::from_layout(&layout));
        profiles.save().context("Failed to save profile")?;
        if !cli.quiet {
            eprintln!("{} Saved profile {}", green("✔"), bold(name));
        }
        if cli.inputs.is_empty() {
            return Ok(());
        }
    }

    if cli.preview_only {
        return write_preview(&cli);
    }

    let progress: Option<Arc<dyn ProgressObserver>> = if show_progress {
        Some(CliProgress::new() as Arc<dyn ProgressObserver>)
    } else {
        None
    };

    let mut builder = GenerationConfig::builder()
        .layout(layout)
        .paper(cli.paper.into());
    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(observer) = progress {
        builder = builder.progress(observer);
    }
    let config = builder.build().context("Invalid configuration")?;

    if cli.plan_only {
        return print_plan(&cli, &config).await;
    }

    // ── Run generation ───────────────────────────────────────────────────
    let output = resolve_output(&cli);
    let result = generate(&cli.inputs, &output, &config)
        .await
        .context("Card sheet generation failed")?;

    if !cli.no_stats {
        record_stats(&cli.stats_file, result.cards_processed);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&result, &output);
    }

    Ok(())
}

/// Start from the selected profile and apply explicit flags on top.
fn build_layout(cli: &Cli, profiles: &ProfileStore) -> Result<LayoutConfig> {
    let profile = match profiles.get(&cli.profile) {
        Some(p) => p.clone(),
        None => {
            let known: Vec<_> = profiles.names().collect();
            bail!(
                "Unknown profile '{}' (available: {})",
                cli.profile,
                known.join(", ")
            );
        }
    };

    let mut builder = profile.to_builder();
    if let Some(h) = cli.card_height {
        builder = builder.card_height_cm(h);
    }
    if let Some(w) = cli.card_width {
        builder = builder.card_width_cm(w);
    }
    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(n) = cli.cards_per_page {
        builder = builder.cards_per_page(n);
    }
    if let Some(m) = cli.front_margins {
        builder = builder.front_margins(m);
    }
    if let Some(m) = cli.back_margins {
        builder = builder.back_margins(m);
    }

    builder.build().context("Invalid card layout")
}

/// Parse `--front-margins` / `--back-margins` ("top,bottom,left,right").
fn parse_margins(s: &str) -> Result<MarginSet, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", v.trim()))
        })
        .collect::<Result<_, _>>()?;

    match values.as_slice() {
        [all] => Ok(MarginSet::uniform(*all)),
        [top, bottom, left, right] => Ok(MarginSet::new(*top, *bottom, *left, *right)),
        _ => Err(format!(
            "expected 1 or 4 comma-separated values (top,bottom,left,right), got {}",
            values.len()
        )),
    }
}

fn resolve_output(cli: &Cli) -> PathBuf {
    match cli.output {
        Some(ref path) => path.clone(),
        None => {
            let now = chrono::Local::now().naive_local();
            cli.output_dir.join(render_file_name(&cli.name_template, now))
        }
    }
}

/// Statistics are best-effort: a failure here never fails the run.
fn record_stats(path: &Path, cards: usize) {
    let outcome = RunStats::load(path).and_then(|mut stats| {
        stats.record(cards);
        stats.save(path)
    });
    if let Err(e) = outcome {
        warn!("Could not update statistics: {e}");
    }
}

fn write_preview(cli: &Cli) -> Result<()> {
    let Some(first) = cli.inputs.first() else {
        bail!("--preview-only needs at least one input");
    };
    let Some(thumb) = preview(first) else {
        bail!("Could not render a preview of {}", first.display());
    };

    let target = cli.output.clone().unwrap_or_else(|| {
        let stem = first
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "card".into());
        cli.output_dir.join(format!("{stem}_preview.png"))
    });
    save_png(&thumb, &target)?;

    if !cli.quiet {
        eprintln!(
            "{} Preview {}x{} → {}",
            green("✔"),
            thumb.width(),
            thumb.height(),
            bold(&target.display().to_string())
        );
    }
    Ok(())
}

async fn print_plan(cli: &Cli, config: &GenerationConfig) -> Result<()> {
    let extraction = extract_all(&cli.inputs, config)
        .await
        .context("Extraction failed")?;
    let pages = plan(&extraction.cards, &config.layout).context("Planning failed")?;

    let report = serde_json::json!({
        "cards": extraction.cards.len(),
        "skipped": extraction.skipped,
        "pages": pages,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialise plan")?
    );
    Ok(())
}

/// Write `image` as PNG, creating the parent directory when missing.
fn save_png(image: &RasterImage, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image
        .as_rgb()
        .save(target)
        .with_context(|| format!("Failed to write preview to {}", target.display()))
}

fn list_profiles(profiles: &ProfileStore, json: bool) -> Result<()> {
    if json {
        let map: std::collections::BTreeMap<_, _> = profiles.iter().collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&map).context("Failed to serialise profiles")?
        );
        return Ok(());
    }

    for (name, p) in profiles.iter() {
        println!(
            "{:<12} {} × {} cm  {} dpi  {} per page",
            bold(name),
            p.card_height_cm,
            p.card_width_cm,
            p.render_dpi,
            p.cards_per_page
        );
        println!("{:<12} front {}", "", dim(&p.front_margins.to_string()));
        println!("{:<12} back  {}", "", dim(&p.back_margins.to_string()));
    }
    Ok(())
}

fn show_stats(stats: &RunStats, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(stats).context("Failed to serialise statistics")?
        );
        return Ok(());
    }
    println!("Total cards:     {}", stats.total_cards);
    println!("Total sessions:  {}", stats.total_sessions);
    println!(
        "Last session:    {} ({} cards)",
        stats.last_session_date.as_deref().unwrap_or("never"),
        stats.last_session_cards
    );
    Ok(())
}

fn print_summary(result: &GenerationResult, output: &Path) {
    let supplied = result.cards_processed + result.skipped.len();
    eprintln!(
        "{}  {}/{} cards  {} pages  {}ms  →  {}",
        if result.skipped.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        result.cards_processed,
        supplied,
        result.pages_emitted,
        result.timings.total_ms,
        bold(&output.display().to_string()),
    );
    for skipped in &result.skipped {
        eprintln!(
            "   {} #{} {}: {}",
            red("skipped"),
            skipped.index + 1,
            skipped.path.display(),
            skipped.error
        );
    }
    let advice = &result.print_advice;
    eprintln!(
        "   {}",
        dim(&format!(
            "Print duplex ({}), {}% scale, {} paper",
            advice.duplex, advice.scale_percent, advice.paper
        ))
    );
}
