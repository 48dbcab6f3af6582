use serde::{Deserialize, Serialize};

use crate::document_configuration::MarkupRules;

/// The delimiter which opens and closes a bold run within a raw line.
pub const BOLD_DELIMITER: char = '*';

/// How a run of text is drawn.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SegmentStyle {
    Plain,
    Bold,
    Code,
}

/// A styled run of text within a text line.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: SegmentStyle,
}

impl Segment {
    pub fn new<S: Into<String>>(text: S, style: SegmentStyle) -> Self {
        Segment {
            text: text.into(),
            style,
        }
    }

    pub fn plain<S: Into<String>>(text: S) -> Self {
        Segment::new(text, SegmentStyle::Plain)
    }

    pub fn bold<S: Into<String>>(text: S) -> Self {
        Segment::new(text, SegmentStyle::Bold)
    }

    pub fn code<S: Into<String>>(text: S) -> Self {
        Segment::new(text, SegmentStyle::Code)
    }
}

/// One visual row of the laid out content.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Line {
    /// A row of text. A blank row has no segments but still occupies a line.
    Text { segments: Vec<Segment> },
    /// A thin rule placed before a major section header.
    Divider,
    /// A dashed rule with a caption placed between two items bundled into one pack.
    ItemSeparator,
}

impl Line {
    /// The placeholder emitted for a blank line.
    pub fn blank() -> Self {
        Line::Text {
            segments: Vec::new(),
        }
    }

    /// The visible text of the line, which is empty for the structural lines.
    pub fn text(&self) -> String {
        match self {
            Line::Text { segments } => segments
                .iter()
                .map(|segment| segment.text.as_str())
                .collect(),
            Line::Divider | Line::ItemSeparator => String::new(),
        }
    }

    /// Whether the line is a verbatim row of a code block.
    pub fn is_code(&self) -> bool {
        match self {
            Line::Text { segments } => segments
                .iter()
                .any(|segment| segment.style == SegmentStyle::Code),
            Line::Divider | Line::ItemSeparator => false,
        }
    }
}

/// Turns raw content into a flat sequence of typed lines. The only state carried from one raw line
/// to the next is whether a code block is open.
pub struct MarkupProcessor<'a> {
    rules: &'a MarkupRules,
}

impl<'a> MarkupProcessor<'a> {
    pub fn new(rules: &'a MarkupRules) -> Self {
        MarkupProcessor { rules }
    }

    /// Processes the whole content. The output lines are not yet wrapped to any width.
    pub fn process(&self, content: &str) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut in_code_block = false;

        for raw_line in content.split('\n') {
            let raw_line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

            if self.rules.is_code_fence(raw_line) {
                in_code_block = !in_code_block;
                continue;
            }

            if self.rules.is_item_separator(raw_line) {
                lines.push(Line::ItemSeparator);
                continue;
            }

            // The divider never precedes the very first line of the content
            if self.rules.is_divider_trigger(raw_line) && !lines.is_empty() {
                lines.push(Line::Divider);
            }

            if in_code_block {
                lines.push(Line::Text {
                    segments: vec![Segment::code(raw_line)],
                });
            } else {
                lines.push(Line::Text {
                    segments: split_bold_runs(raw_line),
                });
            }
        }

        log::debug!(
            "Processed {} raw lines into {} lines",
            content.split('\n').count(),
            lines.len()
        );

        lines
    }
}

/// Splits a raw line on the bold delimiter, even pieces are plain and odd pieces are bold.
/// Empty pieces are dropped since they have nothing to draw.
fn split_bold_runs(raw_line: &str) -> Vec<Segment> {
    raw_line
        .split(BOLD_DELIMITER)
        .enumerate()
        .filter(|(_, piece)| !piece.is_empty())
        .map(|(position, piece)| {
            if position % 2 == 1 {
                Segment::bold(piece)
            } else {
                Segment::plain(piece)
            }
        })
        .collect()
}
