use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::assembler::RenderedDocument;
use crate::document::PackSections;
use crate::error::{ContextError, ErrorKind};
use crate::pdf::PdfDocument;

/// Stands in for the subject in file names when it is blank.
pub const DEFAULT_SUBJECT: &str = "General-Studies";

/// A named file produced from the rendered pages, ready to be written or handed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The file name shared by all the artifacts of a pack, e.g. `Trials-Solutions-Further-Mathematics`.
/// The separating dash is kept even without any included section, e.g. `-Biology`.
pub fn export_base_name(sections: &PackSections, subject: &str) -> String {
    let subject_words: Vec<&str> = subject.split_whitespace().collect();
    let subject_part = if subject_words.is_empty() {
        DEFAULT_SUBJECT.to_string()
    } else {
        subject_words.join("-")
    };

    format!("{}-{}", sections.labels().join("-"), subject_part)
}

/// The name of the image artifact of the page at `page_index`, numbered from 1.
pub fn page_image_name(base_name: &str, page_index: usize) -> String {
    format!("{}-Page{}.png", base_name, page_index + 1)
}

fn ensure_pages(document: &RenderedDocument) -> Result<(), ContextError> {
    if document.pages.is_empty() {
        return Err(ContextError::with_context(
            ErrorKind::Export,
            "There are no rendered pages to export",
        ));
    }

    Ok(())
}

/// Places every page, in order, on a PDF page of the same size.
pub fn export_pdf(document: &RenderedDocument) -> Result<ExportArtifact, ContextError> {
    ensure_pages(document)?;
    let base_name = export_base_name(&document.sections, &document.metadata.subject);

    let mut pdf_document = PdfDocument::new(base_name.clone());
    for image in document.images() {
        pdf_document.add_image_page(image)?;
    }
    // Instance IDs are 32 characters long, derived from the generation to stay reproducible
    let instance_id = format!("{:032}", document.generation);
    pdf_document.write_all(instance_id, &document.metadata.title)?;
    pdf_document.optimize();
    let bytes = pdf_document.save_to_bytes()?;

    log::info!(
        "Exported {} pages into {}.pdf ({} bytes)",
        pdf_document.page_count(),
        base_name,
        bytes.len()
    );

    Ok(ExportArtifact {
        file_name: format!("{}.pdf", base_name),
        bytes,
    })
}

/// Encodes every page as a standalone PNG image.
pub fn export_images(document: &RenderedDocument) -> Result<Vec<ExportArtifact>, ContextError> {
    ensure_pages(document)?;
    let base_name = export_base_name(&document.sections, &document.metadata.subject);

    let artifacts = document
        .pages
        .iter()
        .map(|page| {
            Ok(ExportArtifact {
                file_name: page_image_name(&base_name, page.index),
                bytes: encode_png(&page.image)?,
            })
        })
        .collect::<Result<Vec<_>, ContextError>>()?;
    log::info!("Exported {} page images of {}", artifacts.len(), base_name);

    Ok(artifacts)
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ContextError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image.write_to(&mut cursor, ImageFormat::Png).map_err(|error| {
        ContextError::with_error(ErrorKind::Export, "Failed to encode a page as PNG", &error)
    })?;

    Ok(buffer)
}

/// Writes the artifact into the directory, which must already exist.
pub fn write_artifact(
    artifact: &ExportArtifact,
    directory: &Path,
) -> Result<PathBuf, ContextError> {
    let file_path = directory.join(&artifact.file_name);
    std::fs::write(&file_path, &artifact.bytes).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            format!("Failed to write {:?}", file_path),
            &error,
        )
    })?;
    log::debug!("Wrote {:?}", file_path);

    Ok(file_path)
}

pub fn write_pdf(document: &RenderedDocument, directory: &Path) -> Result<PathBuf, ContextError> {
    write_artifact(&export_pdf(document)?, directory)
}

pub fn write_images(
    document: &RenderedDocument,
    directory: &Path,
) -> Result<Vec<PathBuf>, ContextError> {
    export_images(document)?
        .iter()
        .map(|artifact| write_artifact(artifact, directory))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_joins_the_sections_and_the_subject() {
        let sections = PackSections {
            trials: true,
            solutions: false,
            guide: true,
        };

        assert_eq!(
            export_base_name(&sections, "Further  Mathematics"),
            "Trials-Guide-Further-Mathematics"
        );
        assert_eq!(
            export_base_name(&PackSections::all(), "  Biology "),
            "Trials-Solutions-Guide-Biology"
        );
    }

    #[test]
    fn a_blank_subject_falls_back_to_general_studies() {
        assert_eq!(
            export_base_name(&PackSections::all(), "   "),
            "Trials-Solutions-Guide-General-Studies"
        );
        assert_eq!(export_base_name(&PackSections::default(), ""), "-General-Studies");
    }

    #[test]
    fn the_dash_is_kept_without_any_section() {
        assert_eq!(export_base_name(&PackSections::default(), "Biology"), "-Biology");
    }

    #[test]
    fn page_images_are_numbered_from_one() {
        assert_eq!(page_image_name("Guide-Biology", 0), "Guide-Biology-Page1.png");
        assert_eq!(page_image_name("Guide-Biology", 9), "Guide-Biology-Page10.png");
    }
}
