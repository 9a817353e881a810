//! Configuration types for card sheet generation.
//!
//! Two layers of configuration exist:
//!
//! * [`LayoutConfig`]: the physical geometry of one pagination run: card
//!   size, render resolution, cards per page, grid columns, the per-side
//!   margins and the per-side rotation/mirroring policy. It is immutable once
//!   built and contains no I/O handles, so it can be serialised, stored in a
//!   [`Profile`], and compared between runs.
//! * [`GenerationConfig`]: everything the orchestrating run needs on top of
//!   the layout: paper size, document title, and the optional collaborators
//!   (extractor, progress observer).
//!
//! Both are built through builders whose `build()` validates every invariant
//! up front, so a bad value is rejected before any source is rasterised.
//!
//! All physical lengths are centimetres.

use crate::error::CardSheetError;
use crate::pipeline::extract::SourceExtractor;
use crate::progress::ProgressObserver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Extra width added to every grid column on top of the card width, in cm.
///
/// Every column on every page gets the same width so cut lines stay at the
/// same position on fronts and backs.
pub const DEFAULT_COLUMN_GUTTER_CM: f64 = 0.5;

/// Grid column count used for both page kinds.
pub const DEFAULT_COLUMNS: usize = 2;

// ── Margins ──────────────────────────────────────────────────────────────

/// The four page margins of one page kind, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginSet {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl MarginSet {
    pub const fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// The same margin on all four sides.
    pub const fn uniform(cm: f64) -> Self {
        Self::new(cm, cm, cm, cm)
    }

    /// Default front-page margins: 1.27 cm all round.
    pub const fn default_front() -> Self {
        Self::uniform(1.27)
    }

    /// Default back-page margins: 1.27 cm except a 0.7 cm left margin, which
    /// compensates for the sheet shift most duplex printers introduce.
    pub const fn default_back() -> Self {
        Self::new(1.27, 1.27, 0.7, 1.27)
    }

    fn validate(&self, side: &str) -> Result<(), CardSheetError> {
        for (name, v) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(CardSheetError::InvalidConfig(format!(
                    "{side} {name} margin must be a non-negative length, got {v}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MarginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "top {} / bottom {} / left {} / right {} cm",
            self.top, self.bottom, self.left, self.right
        )
    }
}

// ── Per-side policy ──────────────────────────────────────────────────────

/// Clockwise rotation applied to a card image before placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Angle in degrees, clockwise.
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Parse a clockwise angle. Only right angles are accepted.
    pub fn from_degrees(deg: i32) -> Option<Self> {
        match deg.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }
}

/// How the images of one page kind are oriented and ordered.
///
/// The front/back pair must be chosen so that, after a long-edge duplex flip,
/// each back lands behind its own front. The defaults encode that pairing:
/// fronts turn 90° and fill rows left to right, backs turn 270° and fill rows
/// right to left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePolicy {
    pub rotation: Rotation,
    /// Fill each row from the rightmost column instead of the leftmost.
    pub mirror_columns: bool,
}

impl SidePolicy {
    pub const fn front() -> Self {
        Self {
            rotation: Rotation::Cw90,
            mirror_columns: false,
        }
    }

    pub const fn back() -> Self {
        Self {
            rotation: Rotation::Cw270,
            mirror_columns: true,
        }
    }
}

// ── Paper ────────────────────────────────────────────────────────────────

/// Physical sheet size of the output document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// 21.0 × 29.7 cm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
    /// Any portrait size, width × height in cm.
    Custom { width_cm: f64, height_cm: f64 },
}

impl PaperSize {
    /// `(width, height)` in centimetres, portrait orientation.
    pub fn dimensions_cm(&self) -> (f64, f64) {
        match *self {
            PaperSize::A4 => (21.0, 29.7),
            PaperSize::Letter => (21.59, 27.94),
            PaperSize::Custom {
                width_cm,
                height_cm,
            } => (width_cm, height_cm),
        }
    }

    /// Human-readable name for printer advice.
    pub fn name(&self) -> String {
        match *self {
            PaperSize::A4 => "A4".to_string(),
            PaperSize::Letter => "Letter".to_string(),
            PaperSize::Custom {
                width_cm,
                height_cm,
            } => format!("{width_cm} × {height_cm} cm"),
        }
    }

    fn validate(&self) -> Result<(), CardSheetError> {
        let (w, h) = self.dimensions_cm();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(CardSheetError::InvalidConfig(format!(
                "paper size must be positive, got {w} × {h} cm"
            )));
        }
        Ok(())
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Geometry of one pagination run.
///
/// Built via [`LayoutConfig::builder()`] or [`LayoutConfig::default()`].
///
/// # Example
/// ```rust
/// use cardsheet::{LayoutConfig, MarginSet};
///
/// let layout = LayoutConfig::builder()
///     .card_size(5.5, 8.5)
///     .dpi(300)
///     .cards_per_page(8)
///     .back_margins(MarginSet::new(1.0, 1.0, 0.8, 1.0))
///     .build()
///     .unwrap();
/// assert_eq!(layout.column_width_cm(), 9.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Height every placed image is scaled to, in cm. Default: 5.81.
    pub card_height_cm: f64,

    /// Physical card width in cm; drives the column width. Default: 9.2.
    pub card_width_cm: f64,

    /// Resolution used to rasterise source pages. Default: 300.
    ///
    /// Pages are scaled uniformly by `dpi / 72`, so 300 DPI renders a
    /// credit-card sized page at roughly 1 000 × 640 px.
    pub dpi: u32,

    /// Cards grouped onto one front/back sheet pair. Default: 8.
    pub cards_per_page: usize,

    /// Grid columns on every page. Default: 2.
    pub columns: usize,

    /// Width added to `card_width_cm` to get the column width. Default: 0.5.
    pub column_gutter_cm: f64,

    /// Margins of every front page.
    pub front_margins: MarginSet,

    /// Margins of every back page. Independent of the front margins.
    pub back_margins: MarginSet,

    /// Rotation and column order of front pages.
    pub front: SidePolicy,

    /// Rotation and column order of back pages.
    pub back: SidePolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            card_height_cm: 5.81,
            card_width_cm: 9.2,
            dpi: 300,
            cards_per_page: 8,
            columns: DEFAULT_COLUMNS,
            column_gutter_cm: DEFAULT_COLUMN_GUTTER_CM,
            front_margins: MarginSet::default_front(),
            back_margins: MarginSet::default_back(),
            front: SidePolicy::front(),
            back: SidePolicy::back(),
        }
    }
}

impl LayoutConfig {
    /// Create a new builder for `LayoutConfig`.
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder {
            config: Self::default(),
        }
    }

    /// Width of every grid column: card width plus the gutter.
    pub fn column_width_cm(&self) -> f64 {
        self.card_width_cm + self.column_gutter_cm
    }

    /// Grid rows needed for a group of `cards` cards.
    pub fn rows_for(&self, cards: usize) -> usize {
        cards.div_ceil(self.columns.max(1))
    }

    /// Check every invariant. Called by the builder and again by the run, so
    /// a hand-assembled config is held to the same rules.
    pub fn validate(&self) -> Result<(), CardSheetError> {
        if !self.card_height_cm.is_finite() || self.card_height_cm <= 0.0 {
            return Err(CardSheetError::InvalidConfig(format!(
                "card height must be positive, got {}",
                self.card_height_cm
            )));
        }
        if !self.card_width_cm.is_finite() || self.card_width_cm <= 0.0 {
            return Err(CardSheetError::InvalidConfig(format!(
                "card width must be positive, got {}",
                self.card_width_cm
            )));
        }
        if self.dpi == 0 {
            return Err(CardSheetError::InvalidConfig("DPI must be ≥ 1".into()));
        }
        if self.cards_per_page == 0 {
            return Err(CardSheetError::InvalidConfig(
                "cards per page must be ≥ 1".into(),
            ));
        }
        if self.columns == 0 {
            return Err(CardSheetError::InvalidConfig("columns must be ≥ 1".into()));
        }
        if !self.column_gutter_cm.is_finite() || self.column_gutter_cm < 0.0 {
            return Err(CardSheetError::InvalidConfig(format!(
                "column gutter must be non-negative, got {}",
                self.column_gutter_cm
            )));
        }
        self.front_margins.validate("front")?;
        self.back_margins.validate("back")?;
        Ok(())
    }
}

/// Builder for [`LayoutConfig`].
#[derive(Debug, Clone)]
pub struct LayoutConfigBuilder {
    config: LayoutConfig,
}

impl LayoutConfigBuilder {
    /// Card height and width in cm.
    pub fn card_size(mut self, height_cm: f64, width_cm: f64) -> Self {
        self.config.card_height_cm = height_cm;
        self.config.card_width_cm = width_cm;
        self
    }

    pub fn card_height_cm(mut self, cm: f64) -> Self {
        self.config.card_height_cm = cm;
        self
    }

    pub fn card_width_cm(mut self, cm: f64) -> Self {
        self.config.card_width_cm = cm;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn cards_per_page(mut self, n: usize) -> Self {
        self.config.cards_per_page = n;
        self
    }

    pub fn columns(mut self, n: usize) -> Self {
        self.config.columns = n;
        self
    }

    pub fn column_gutter_cm(mut self, cm: f64) -> Self {
        self.config.column_gutter_cm = cm;
        self
    }

    pub fn front_margins(mut self, margins: MarginSet) -> Self {
        self.config.front_margins = margins;
        self
    }

    pub fn back_margins(mut self, margins: MarginSet) -> Self {
        self.config.back_margins = margins;
        self
    }

    pub fn front_policy(mut self, policy: SidePolicy) -> Self {
        self.config.front = policy;
        self
    }

    pub fn back_policy(mut self, policy: SidePolicy) -> Self {
        self.config.back = policy;
        self
    }

    /// Build the layout, validating constraints.
    pub fn build(self) -> Result<LayoutConfig, CardSheetError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// Configuration for one orchestrated run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
#[derive(Clone, Default)]
pub struct GenerationConfig {
    /// Card geometry.
    pub layout: LayoutConfig,

    /// Output sheet size. Default: A4.
    pub paper: PaperSize,

    /// Title written into the output document's metadata.
    pub title: Option<String>,

    /// Pre-constructed extractor. If None, the pdfium extractor is bound on
    /// first use.
    pub extractor: Option<Arc<dyn SourceExtractor>>,

    /// Optional observer receiving percentage and status updates.
    pub progress: Option<Arc<dyn ProgressObserver>>,
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("layout", &self.layout)
            .field("paper", &self.paper)
            .field("title", &self.title)
            .field(
                "extractor",
                &self.extractor.as_ref().map(|_| "<dyn SourceExtractor>"),
            )
            .field(
                "progress",
                &self.progress.as_ref().map(|_| "<dyn ProgressObserver>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn validate(&self) -> Result<(), CardSheetError> {
        self.layout.validate()?;
        self.paper.validate()
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.config.paper = paper;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn SourceExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.config.progress = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, CardSheetError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Profiles ─────────────────────────────────────────────────────────────

/// A named, persistable set of card settings.
///
/// Profiles hold only the values a user tunes per card stock; rotation policy
/// and grid columns stay at their layout defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub card_height_cm: f64,
    pub card_width_cm: f64,
    pub front_margins: MarginSet,
    pub back_margins: MarginSet,
    pub render_dpi: u32,
    pub cards_per_page: usize,
}

impl Profile {
    /// A layout builder pre-filled from this profile.
    pub fn to_builder(&self) -> LayoutConfigBuilder {
        LayoutConfig::builder()
            .card_size(self.card_height_cm, self.card_width_cm)
            .front_margins(self.front_margins)
            .back_margins(self.back_margins)
            .dpi(self.render_dpi)
            .cards_per_page(self.cards_per_page)
    }

    /// Capture the user-tunable part of a layout.
    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self {
            card_height_cm: layout.card_height_cm,
            card_width_cm: layout.card_width_cm,
            front_margins: layout.front_margins,
            back_margins: layout.back_margins,
            render_dpi: layout.dpi,
            cards_per_page: layout.cards_per_page,
        }
    }
}

/// Name of the profile used when none is selected.
pub const DEFAULT_PROFILE: &str = "default";

/// Profiles shipped with the crate.
pub fn builtin_profiles() -> Vec<(&'static str, Profile)> {
    vec![
        (DEFAULT_PROFILE, Profile::from_layout(&LayoutConfig::default())),
        (
            "staff",
            Profile {
                card_height_cm: 5.5,
                card_width_cm: 8.5,
                front_margins: MarginSet::uniform(1.0),
                back_margins: MarginSet::new(1.0, 1.0, 0.8, 1.0),
                render_dpi: 300,
                cards_per_page: 8,
            },
        ),
        (
            "visitor",
            Profile {
                card_height_cm: 5.0,
                card_width_cm: 8.0,
                front_margins: MarginSet::uniform(1.5),
                back_margins: MarginSet::new(1.5, 1.5, 1.2, 1.5),
                render_dpi: 250,
                cards_per_page: 8,
            },
        ),
    ]
}

// ── Output naming ────────────────────────────────────────────────────────

/// Default output filename template.
pub const DEFAULT_NAME_TEMPLATE: &str = "cards_{date}_{time}";

/// Expand `{date}` (`YYYYMMDD`) and `{time}` (`HHMMSS`) in `template` and
/// append the `.pdf` extension.
pub fn render_file_name(template: &str, now: chrono::NaiveDateTime) -> String {
    let name = template
        .replace("{date}", &now.format("%Y%m%d").to_string())
        .replace("{time}", &now.format("%H%M%S").to_string());
    let name = name.trim();
    let name = if name.is_empty() { "cards" } else { name };
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}
