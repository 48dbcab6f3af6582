use serde::{Deserialize, Serialize};

use crate::document_configuration::PageGeometry;
use crate::markup::Line;

/// A fixed-capacity slice of the wrapped lines, rendered independently of the other pages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Page {
    /// The 0-based position of the page in the document.
    pub index: usize,
    pub lines: Vec<Line>,
}

/// The outcome of slicing the wrapped lines into pages. There is always at least one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub lines_per_page: usize,
    pub pages: Vec<Page>,
}

impl Pagination {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }
}

/// Slices wrapped lines into pages of a capacity derived from the page geometry. Lines are
/// assigned whole and in order; a page may end in the middle of a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    lines_per_page: usize,
}

impl Paginator {
    pub fn new(page_geometry: &PageGeometry) -> Self {
        let lines_per_page =
            (page_geometry.content_height() / page_geometry.line_height).floor();
        // A non-finite or non-positive capacity (degenerate geometry) still holds one line
        let lines_per_page = if lines_per_page.is_finite() && lines_per_page >= 1.0 {
            lines_per_page as usize
        } else {
            1
        };

        Paginator { lines_per_page }
    }

    pub fn lines_per_page(&self) -> usize {
        self.lines_per_page
    }

    /// The number of pages `line_count` lines fill, never less than one.
    pub fn total_pages(&self, line_count: usize) -> usize {
        line_count.div_ceil(self.lines_per_page).max(1)
    }

    pub fn paginate(&self, lines: Vec<Line>) -> Pagination {
        let total_pages = self.total_pages(lines.len());
        let mut pages = Vec::with_capacity(total_pages);
        let mut remaining_lines = lines.into_iter().peekable();

        for index in 0..total_pages {
            let page_lines: Vec<Line> = remaining_lines.by_ref().take(self.lines_per_page).collect();
            pages.push(Page {
                index,
                lines: page_lines,
            });
        }
        debug_assert!(remaining_lines.peek().is_none());

        log::debug!(
            "Paginated the content into {} pages of {} lines",
            total_pages,
            self.lines_per_page
        );

        Pagination {
            lines_per_page: self.lines_per_page,
            pages,
        }
    }
}
