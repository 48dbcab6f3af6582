use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::markup::SegmentStyle;
use crate::measure::{FontFace, FontSpec};

/// The version of the layout produced with a given configuration. It must be bumped whenever a default
/// below changes, because every constant in this file changes the rendered pages pixel for pixel.
pub const LAYOUT_VERSION: u32 = 1;

/// An RGB color triple.
pub type Rgb = [u8; 3];

/// All the fixed constants which determine how the content is laid out and decorated. Every field
/// has a default, so a JSON configuration only needs to spell out what differs from the stock layout.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentConfiguration {
    pub layout_version: u32,
    pub page_geometry: PageGeometry,
    pub typography: Typography,
    pub palette: Palette,
    pub branding: Branding,
    pub markup_rules: MarkupRules,
}

impl Default for DocumentConfiguration {
    fn default() -> Self {
        DocumentConfiguration {
            layout_version: LAYOUT_VERSION,
            page_geometry: PageGeometry::default(),
            typography: Typography::default(),
            palette: Palette::default(),
            branding: Branding::default(),
            markup_rules: MarkupRules::default(),
        }
    }
}

impl DocumentConfiguration {
    /// Reads and validates a configuration from a JSON file.
    pub fn from_path(document_configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(document_configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    format!(
                        "Failed to read the configuration file {:?}",
                        document_configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: DocumentConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!(
                        "Failed to parse the configuration file {:?}",
                        document_configuration_file_path
                    ),
                    &error,
                )
            })?;
        configuration.validate()?;

        Ok(configuration)
    }

    /// Rejects the configurations for which no page could ever be laid out. A zero-sized page is
    /// deliberately accepted here: it is the renderer that refuses to create such a surface.
    pub fn validate(&self) -> Result<(), ContextError> {
        let geometry = &self.page_geometry;
        if !(geometry.line_height > 0.0) {
            return Err(ContextError::with_context(
                ErrorKind::Configuration,
                format!("The line height must be positive, found {}", geometry.line_height),
            ));
        }
        if geometry.margin < 0.0
            || geometry.header_reservation < 0.0
            || geometry.footer_reservation < 0.0
        {
            return Err(ContextError::with_context(
                ErrorKind::Configuration,
                "The margin and the header and footer reservations cannot be negative",
            ));
        }
        let typography = &self.typography;
        let sizes = [
            typography.body_size,
            typography.bold_size,
            typography.code_size,
            typography.title_size,
            typography.subtitle_size,
            typography.page_label_size,
            typography.footer_size,
            typography.caption_size,
            typography.watermark_size,
        ];
        if sizes.iter().any(|size| !(*size > 0.0)) {
            return Err(ContextError::with_context(
                ErrorKind::Configuration,
                "Every font size must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.palette.watermark_opacity) {
            return Err(ContextError::with_context(
                ErrorKind::Configuration,
                format!(
                    "The watermark opacity must lie in [0, 1], found {}",
                    self.palette.watermark_opacity
                ),
            ));
        }

        Ok(())
    }
}

/// Page dimensions and reservations, in pixels of the rendered surface.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageGeometry {
    pub page_width: u32,
    pub page_height: u32,
    /// Left and right margin of the body text.
    pub margin: f32,
    pub line_height: f32,
    /// Vertical space reserved above the first body line, which is also the baseline of that line.
    pub header_reservation: f32,
    pub footer_reservation: f32,
    pub title_baseline: f32,
    pub subtitle_baseline: f32,
    pub page_label_baseline: f32,
    /// Baselines of the two footer lines, measured upwards from the bottom edge.
    pub footer_baselines_from_bottom: [f32; 2],
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry {
            page_width: 1000,
            page_height: 1414,
            margin: 80.0,
            line_height: 34.0,
            header_reservation: 180.0,
            footer_reservation: 120.0,
            title_baseline: 80.0,
            subtitle_baseline: 115.0,
            page_label_baseline: 145.0,
            footer_baselines_from_bottom: [70.0, 50.0],
        }
    }
}

impl PageGeometry {
    /// The width available to the body text, may be negative for degenerate pages.
    pub fn content_width(&self) -> f32 {
        self.page_width as f32 - 2.0 * self.margin
    }

    /// The height available to the body text on each page.
    pub fn content_height(&self) -> f32 {
        self.page_height as f32 - self.header_reservation - self.footer_reservation
    }
}

/// Font sizes, in pixels per em, for every role a run of text can play on a page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Typography {
    pub body_size: f32,
    pub bold_size: f32,
    pub code_size: f32,
    pub title_size: f32,
    pub subtitle_size: f32,
    pub page_label_size: f32,
    pub footer_size: f32,
    pub caption_size: f32,
    pub watermark_size: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Typography {
            body_size: 20.0,
            bold_size: 21.0,
            code_size: 16.0,
            title_size: 42.0,
            subtitle_size: 20.0,
            page_label_size: 14.0,
            footer_size: 12.0,
            caption_size: 12.0,
            watermark_size: 160.0,
        }
    }
}

impl Typography {
    /// The font a body segment is both measured and drawn with.
    pub fn segment_font(&self, style: SegmentStyle) -> FontSpec {
        match style {
            SegmentStyle::Plain => FontSpec::new(FontFace::Regular, self.body_size),
            SegmentStyle::Bold => FontSpec::new(FontFace::Bold, self.bold_size),
            SegmentStyle::Code => FontSpec::new(FontFace::Monospace, self.code_size),
        }
    }
}

/// Colors of the page decoration and text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    pub background: Rgb,
    pub ink: Rgb,
    pub accent: Rgb,
    pub code: Rgb,
    pub muted: Rgb,
    pub rule: Rgb,
    pub watermark: Rgb,
    pub watermark_opacity: f32,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            background: [0xff, 0xff, 0xff],
            ink: [0x11, 0x18, 0x27],
            accent: [0x05, 0x96, 0x69],
            code: [0x06, 0x5f, 0x46],
            muted: [0x9c, 0xa3, 0xaf],
            rule: [0xe5, 0xe7, 0xeb],
            watermark: [0x05, 0x96, 0x69],
            watermark_opacity: 0.03,
        }
    }
}

/// The fixed texts printed on every page. `{year}`, `{page}` and `{total}` are substituted where noted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Branding {
    pub watermark_text: String,
    /// Template of the italic header line, `{page}` is 1-based.
    pub page_label_template: String,
    /// The two centered footer lines, `{year}` is replaced by the document year.
    pub footer_lines: [String; 2],
    pub separator_caption: String,
}

impl Default for Branding {
    fn default() -> Self {
        Branding {
            watermark_text: "MR. WISE LEGIT".into(),
            page_label_template: "Official Sheet • Page {page} of {total}".into(),
            footer_lines: [
                "THE LEGIT SOURCE FOR {year} EXAMS • PREPARED BY MR. WISE LEGIT SOURCE".into(),
                "OFFICIAL STUDY PACK".into(),
            ],
            separator_caption: "NEXT ITEM IN PACK".into(),
        }
    }
}

impl Branding {
    pub fn page_label(&self, page_index: usize, total_pages: usize) -> String {
        self.page_label_template
            .replace("{page}", &(page_index + 1).to_string())
            .replace("{total}", &total_pages.to_string())
    }

    pub fn footer_line(&self, line_index: usize, year: &str) -> String {
        self.footer_lines
            .get(line_index)
            .map(|line| line.replace("{year}", year))
            .unwrap_or_default()
    }
}

/// The markers recognized by the markup line processor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkupRules {
    /// A trimmed line starting with any of these opens a major section.
    pub divider_keywords: Vec<String>,
    /// A trimmed line equal to this marks the boundary between two packed items.
    pub item_separator: String,
    /// A line starting with this toggles a code block.
    pub code_fence: String,
}

impl Default for MarkupRules {
    fn default() -> Self {
        MarkupRules {
            divider_keywords: vec![
                "*QUESTIONS*".into(),
                "*SOLUTIONS*".into(),
                "*TUTOR GUIDE*".into(),
            ],
            item_separator: "-".repeat(40),
            code_fence: "```".into(),
        }
    }
}

impl MarkupRules {
    /// Whether the line opens a major section.
    pub fn is_divider_trigger(&self, line: &str) -> bool {
        let trimmed_line = line.trim();
        self.divider_keywords
            .iter()
            .any(|keyword| trimmed_line.starts_with(keyword.as_str()))
    }

    pub fn is_item_separator(&self, line: &str) -> bool {
        line.trim() == self.item_separator
    }

    pub fn is_code_fence(&self, line: &str) -> bool {
        !self.code_fence.is_empty() && line.starts_with(self.code_fence.as_str())
    }
}
