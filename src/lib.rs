#![warn(clippy::unwrap_used)]

//! Studypack turns one block of lightly marked-up tutoring content into a fixed set of uniformly
//! laid-out, printable pages. The text goes through a markup processor, a word wrapper and a
//! paginator, then every page is rasterized on its own surface with a header, a footer and a
//! watermark. The rendered pages can be exported as a single PDF or as one PNG image per page.
//!
//! The entry point is the `DocumentAssembler`, which owns the generation token: every request
//! produces a whole new set of pages, and a set which is completed after a newer request arrived
//! is dropped rather than published. Text is measured and drawn through the `TextPainter` trait,
//! either by a `FontBook` loaded from real font files or by the deterministic `FixedAdvanceMetrics`.

/// The module where raw content is turned into styled lines.
///
/// # Markup
///
/// The content is processed line by line. Text between two `*` becomes bold, a line starting with
/// three backticks toggles a code block whose lines are kept verbatim, a line opening one of the major
/// sections (`*QUESTIONS*`, `*SOLUTIONS*`, `*TUTOR GUIDE*`) is preceded by a thin divider unless it is the
/// very first line, and a line made of exactly forty dashes separates two items bundled into one pack.
pub mod markup;

/// The measuring and drawing capabilities which the layout depends upon, see `TextMeasurer` and `TextPainter`.
pub mod measure;

/// Fonts loaded from TTF/OTF files. Advances are read with `owned_ttf_parser`, glyphs are rasterized with `rusttype`.
pub mod fonts;

/// Greedy word wrapping of the styled lines.
pub mod wrap;

/// Splits the wrapped lines into pages of a fixed capacity, derived from the page geometry.
pub mod paginate;

/// The module where the content, once laid out, is represented together with its metadata.
pub mod document;

/// The module where single pages are rasterized.
///
/// Each page is drawn on a freshly allocated surface in a fixed order: background, watermark, header,
/// lines and footer. No drawing state is carried over from one page to the next.
pub mod render;

/// The module where generations are run and published, see `DocumentAssembler`.
pub mod assembler;

/// Exports of the rendered pages, named after the included sections and the subject.
pub mod export;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The reason why this type has been implemented is to uniform the error reporting without delving too deep
/// into specific error codes. Each error carries an `ErrorKind` so that callers can still tell a failed
/// surface allocation apart from a missing font or a misused export.
///
/// The `ContextError` type implements `std::fmt::Display` and `Debug`, so it can be explicitly printed out.
pub mod error;

/// The layout constants: page geometry, font sizes, colors, branding texts and markup markers.
pub mod document_configuration;

/// The association between each font face and its font file, read from a JSON configuration.
pub mod fonts_configuration;

/// The module where the `PdfDocument` interface for writing PDF documents is presented.
///
/// # Introduction
///
/// Pages are added with `add_image_page`, each of them holding a single image `XObject` which covers it.
/// The document is then finalized with `write_all`, optionally compressed with `optimize` and serialized
/// with `save_to_bytes`. All the timestamps are pinned to the UNIX epoch and the objects are always
/// inserted in the same order, so that the same pages produce byte-identical documents, which keeps
/// the exports testable.
pub mod pdf;

pub use assembler::{
    DocumentAssembler, GenerationOutcome, GenerationRequest, RenderedDocument, RenderedPage,
};
pub use document::{Document, DocumentMetadata, PackSections};
pub use document_configuration::DocumentConfiguration;
pub use error::{ContextError, ErrorKind};
pub use fonts::FontBook;
pub use markup::{Line, Segment, SegmentStyle};
pub use measure::{FixedAdvanceMetrics, FontFace, FontSpec, TextMeasurer, TextPainter};
