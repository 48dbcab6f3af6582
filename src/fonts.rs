use image::{Rgba, RgbaImage};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use rusttype::{point, Scale};
use std::{collections::BTreeMap, path::Path, sync::Arc};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ErrorKind};
use crate::fonts_configuration::FontsConfiguration;
use crate::measure::{FontFace, FontSpec, TextMeasurer, TextPainter};
use crate::render::blend_coverage;

/// The (insofar) relevant vertical metrics of a font.
#[derive(Clone, Copy, Debug, Default)]
struct FontMetrics {
    ascent: i16,
    /// Negative below the baseline.
    descent: i16,
    units_per_em: u16,
}

/// A font face loaded from a TTF font, together with its measure of units per em.
#[derive(Clone, Debug)]
struct TtfFontFace {
    /// The underlying font face which is represented through the `ttf_parser` crate.
    inner: Arc<OwnedFace>,
    /// The number of units per em of the font face.
    units_per_em: u16,
}

impl TtfFontFace {
    /// Constructs a font face from the underlying raw data extracted from the TTF font file.
    fn from_bytes(data: &[u8]) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.to_vec(), 0).map_err(|error| {
            ContextError::with_error(ErrorKind::Font, "Failed to parse font", &error)
        })?;
        let units_per_em = face.as_face_ref().units_per_em();
        if units_per_em == 0 {
            return Err(ContextError::with_context(
                ErrorKind::Font,
                "The font declares zero units per em",
            ));
        }

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    /// Retrieve the font metrics from the associated font face.
    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    /// Retrieve the glyph ID of a specific codepoint, which in our case is just a `char`.
    fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    /// The horizontal advance of the glyph in font units.
    fn glyph_advance(&self, glyph_id: u16) -> Option<u16> {
        self.face()
            .glyph_hor_advance(owned_ttf_parser::GlyphId(glyph_id))
    }

    /// Retrieve the underlying font face as a reference.
    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }
}

/// A font parsed twice from the same bytes: once for measuring and once for rasterizing.
struct LoadedFont {
    ttf_face: TtfFontFace,
    raster_font: rusttype::Font<'static>,
}

impl LoadedFont {
    fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContextError> {
        let ttf_face = TtfFontFace::from_bytes(&bytes)?;
        let raster_font = rusttype::Font::try_from_vec(bytes).ok_or(ContextError::with_context(
            ErrorKind::Font,
            "Unable to load the font for rasterization",
        ))?;

        Ok(LoadedFont {
            ttf_face,
            raster_font,
        })
    }

    /// Advance in pixels of every character of the run, after NFC normalization. Characters
    /// missing from the font advance like the `.notdef` glyph, as that is what gets drawn.
    fn advances(&self, size: f32, text: &str) -> Result<Vec<(char, f32)>, ContextError> {
        let pixels_per_unit = size / self.ttf_face.units_per_em as f32;
        text.nfc()
            .map(|character| {
                let glyph_id = self.ttf_face.glyph_id(character).unwrap_or_else(|| {
                    log::warn!("Unable to find the character {:?} in the font", character);
                    0
                });
                let advance = self.ttf_face.glyph_advance(glyph_id).ok_or_else(|| {
                    ContextError::with_context(
                        ErrorKind::Measurement,
                        format!(
                            "The glyph {} for the character {:?} has no horizontal advance",
                            glyph_id, character
                        ),
                    )
                })?;
                Ok((character, advance as f32 * pixels_per_unit))
            })
            .collect()
    }

    /// `rusttype` scales fonts by the pixel height of ascent minus descent, while the sizes
    /// of the typography are given in pixels per em.
    fn raster_scale(&self, size: f32) -> Scale {
        let FontMetrics {
            ascent,
            descent,
            units_per_em,
        } = self.ttf_face.font_metrics();
        let extent = (ascent as f32 - descent as f32).max(1.0);
        Scale::uniform(size * extent / units_per_em as f32)
    }
}

/// The set of faces a document is typeset with, loaded from real font files.
#[derive(Default)]
pub struct FontBook {
    fonts: BTreeMap<FontFace, LoadedFont>,
}

impl FontBook {
    pub fn new() -> Self {
        FontBook::default()
    }

    /// Loads every face of the configuration, all four faces must be present.
    pub fn from_configuration(configuration: &FontsConfiguration) -> Result<Self, ContextError> {
        let mut font_book = FontBook::new();
        for font_face in [
            FontFace::Regular,
            FontFace::Bold,
            FontFace::Italic,
            FontFace::Monospace,
        ] {
            let font_path = configuration.get_font_path(font_face).ok_or(
                ContextError::with_context(
                    ErrorKind::Font,
                    format!("No font file is associated to the {:?} face", font_face),
                ),
            )?;
            font_book.add_font(font_face, &font_path)?;
        }
        log::debug!("Loaded {} font faces", font_book.fonts.len());

        Ok(font_book)
    }

    /// Add a font for the given face from the given path. This function expects the font to be TTF,
    /// or either way an OTF font which is just a wrapper around a TTF font.
    pub fn add_font(&mut self, font_face: FontFace, font_path: &Path) -> Result<(), ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Font,
                format!("Failed to read font {:?}, probably the path is wrong", font_path),
                &error,
            )
        })?;
        self.add_font_bytes(font_face, font_bytes)
    }

    /// Add a font for the given face from its raw bytes, replacing any previous font of that face.
    pub fn add_font_bytes(
        &mut self,
        font_face: FontFace,
        font_bytes: Vec<u8>,
    ) -> Result<(), ContextError> {
        let loaded_font = LoadedFont::from_bytes(font_bytes)?;
        self.fonts.insert(font_face, loaded_font);

        Ok(())
    }

    fn get_font(&self, font_face: FontFace) -> Result<&LoadedFont, ContextError> {
        self.fonts.get(&font_face).ok_or(ContextError::with_context(
            ErrorKind::Measurement,
            format!("No font is loaded for the {:?} face", font_face),
        ))
    }
}

impl TextMeasurer for FontBook {
    fn measure(&self, font: FontSpec, text: &str) -> Result<f32, ContextError> {
        let loaded_font = self.get_font(font.face)?;
        Ok(loaded_font
            .advances(font.size, text)?
            .iter()
            .map(|(_, advance)| advance)
            .sum())
    }
}

impl TextPainter for FontBook {
    fn paint_text(
        &self,
        canvas: &mut RgbaImage,
        font: FontSpec,
        text: &str,
        origin: [f32; 2],
        color: Rgba<u8>,
    ) -> Result<f32, ContextError> {
        let loaded_font = self.get_font(font.face)?;
        let scale = loaded_font.raster_scale(font.size);
        let [start_x, baseline] = origin;
        let mut width = 0.0;

        // Glyphs are placed with the same advances `measure` sums up, without kerning
        for (character, advance) in loaded_font.advances(font.size, text)? {
            let glyph = loaded_font
                .raster_font
                .glyph(character)
                .scaled(scale)
                .positioned(point(start_x + width, baseline));
            if let Some(bounding_box) = glyph.pixel_bounding_box() {
                // Draw the glyph into the image per-pixel by using the draw closure
                glyph.draw(|x, y, coverage| {
                    blend_coverage(
                        canvas,
                        bounding_box.min.x as i64 + x as i64,
                        bounding_box.min.y as i64 + y as i64,
                        color,
                        coverage,
                    )
                });
            }
            width += advance;
        }

        Ok(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_not_a_font() {
        let mut font_book = FontBook::new();
        let error = font_book
            .add_font_bytes(FontFace::Regular, b"definitely not a font".to_vec())
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Font);
    }

    #[test]
    fn missing_font_file_is_reported() {
        let mut font_book = FontBook::new();
        let error = font_book
            .add_font(FontFace::Bold, Path::new("/nonexistent/Bold.ttf"))
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Font);
        assert!(error.to_string().contains("Bold.ttf"));
    }

    #[test]
    fn measuring_an_unloaded_face_is_a_measurement_failure() {
        let font_book = FontBook::new();
        let error = font_book
            .measure(FontSpec::new(FontFace::Italic, 14.0), "Page 1 of 1")
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Measurement);
    }

    #[test]
    fn incomplete_configuration_is_rejected() {
        let configuration = FontsConfiguration {
            font_associations: Vec::new(),
        };
        let error = FontBook::from_configuration(&configuration).err().unwrap();

        assert_eq!(error.kind, ErrorKind::Font);
    }
}
