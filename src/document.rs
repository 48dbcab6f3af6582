use serde::{Deserialize, Serialize};

use crate::document_configuration::DocumentConfiguration;
use crate::error::ContextError;
use crate::markup::{Line, MarkupProcessor};
use crate::measure::TextMeasurer;
use crate::paginate::{Page, Paginator};
use crate::wrap::WordWrapper;

/// The display strings printed in the header of every page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: String,
    pub board: String,
    pub year: String,
    pub subject: String,
}

impl DocumentMetadata {
    /// The colored line below the title, e.g. `WAEC 2024 • Mathematics`. Only the part of the
    /// subject before the first `" - "` is shown.
    pub fn subtitle(&self) -> String {
        let subject = self.subject.split(" - ").next().unwrap_or_default();
        format!("{} {} • {}", self.board.to_uppercase(), self.year, subject)
    }
}

/// Which named sub-sections were bundled into the pack. Only the export naming depends on it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackSections {
    pub trials: bool,
    pub solutions: bool,
    pub guide: bool,
}

impl PackSections {
    pub fn all() -> Self {
        PackSections {
            trials: true,
            solutions: true,
            guide: true,
        }
    }

    /// The label of every included section, always in the order trials, solutions, guide.
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.trials, "Trials"),
            (self.solutions, "Solutions"),
            (self.guide, "Guide"),
        ]
        .into_iter()
        .filter_map(|(included, label)| included.then_some(label))
        .collect()
    }
}

/// The content laid out into pages, before any of them is rasterized. A document is built
/// from scratch for every generation and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub lines_per_page: usize,
    pub pages: Vec<Page>,
}

impl Document {
    /// Runs the markup processor, the word wrapper and the paginator over the content.
    pub fn lay_out<M: TextMeasurer + ?Sized>(
        content: &str,
        metadata: DocumentMetadata,
        configuration: &DocumentConfiguration,
        measurer: &M,
    ) -> Result<Document, ContextError> {
        let lines = MarkupProcessor::new(&configuration.markup_rules).process(content);
        let wrapped_lines = WordWrapper::new(
            measurer,
            &configuration.typography,
            configuration.page_geometry.content_width(),
        )
        .wrap(&lines)?;
        let pagination = Paginator::new(&configuration.page_geometry).paginate(wrapped_lines);

        Ok(Document {
            metadata,
            lines_per_page: pagination.lines_per_page,
            pages: pagination.pages,
        })
    }

    /// Fixed once the content is laid out, every page header refers to it.
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// All the lines of the document in order, across the page boundaries.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.pages.iter().flat_map(|page| page.lines.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::FixedAdvanceMetrics;

    #[test]
    fn subtitle_combines_board_year_and_short_subject() {
        let metadata = DocumentMetadata {
            title: "Mr. Wise Legit Source".into(),
            board: "waec".into(),
            year: "2024".into(),
            subject: "Core Mathematics - Paper 2".into(),
        };

        assert_eq!(metadata.subtitle(), "WAEC 2024 • Core Mathematics");
    }

    #[test]
    fn section_labels_keep_a_stable_order() {
        let sections = PackSections {
            trials: false,
            solutions: true,
            guide: true,
        };

        assert_eq!(sections.labels(), vec!["Solutions", "Guide"]);
        assert_eq!(PackSections::all().labels(), vec!["Trials", "Solutions", "Guide"]);
        assert!(PackSections::default().labels().is_empty());
    }

    #[test]
    fn empty_content_is_laid_out_on_one_page() {
        let document = Document::lay_out(
            "",
            DocumentMetadata::default(),
            &DocumentConfiguration::default(),
            &FixedAdvanceMetrics::default(),
        )
        .unwrap();

        assert_eq!(document.total_pages(), 1);
        assert_eq!(document.lines_per_page, 32);
    }
}
