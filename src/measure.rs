use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::render::blend_coverage;

/// The faces a document is typeset with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    Monospace,
}

/// A face at a given size in pixels per em.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub face: FontFace,
    pub size: f32,
}

impl FontSpec {
    pub fn new(face: FontFace, size: f32) -> Self {
        FontSpec { face, size }
    }
}

/// Measures how wide a run of text is once drawn. The wrapper and the renderer only ever learn
/// about the glyphs through this trait, which keeps them independent of any real font.
pub trait TextMeasurer: Send + Sync {
    /// Returns the horizontal advance, in pixels, of the whole run drawn with the given font.
    fn measure(&self, font: FontSpec, text: &str) -> Result<f32, ContextError>;
}

/// A measurer which can also draw what it measures. Drawing a run must advance by exactly the
/// width `measure` reports for it, otherwise consecutive segments would overlap.
pub trait TextPainter: TextMeasurer {
    /// Draws the run with its baseline starting at `origin` and returns the advance.
    fn paint_text(
        &self,
        canvas: &mut RgbaImage,
        font: FontSpec,
        text: &str,
        origin: [f32; 2],
        color: Rgba<u8>,
    ) -> Result<f32, ContextError>;
}

/// Metrics where every character advances by the same fraction of the font size. Glyphs are drawn
/// as solid blocks, which makes the output independent of any font file and fully deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvanceMetrics {
    /// Advance of a single character, as a fraction of the font size.
    pub advance_ratio: f32,
}

impl Default for FixedAdvanceMetrics {
    fn default() -> Self {
        FixedAdvanceMetrics { advance_ratio: 0.5 }
    }
}

impl FixedAdvanceMetrics {
    pub fn new(advance_ratio: f32) -> Self {
        FixedAdvanceMetrics { advance_ratio }
    }

    fn advance(&self, font: FontSpec) -> f32 {
        font.size * self.advance_ratio
    }
}

impl TextMeasurer for FixedAdvanceMetrics {
    fn measure(&self, font: FontSpec, text: &str) -> Result<f32, ContextError> {
        Ok(text.chars().count() as f32 * self.advance(font))
    }
}

impl TextPainter for FixedAdvanceMetrics {
    fn paint_text(
        &self,
        canvas: &mut RgbaImage,
        font: FontSpec,
        text: &str,
        origin: [f32; 2],
        color: Rgba<u8>,
    ) -> Result<f32, ContextError> {
        let advance = self.advance(font);
        // Blocks cover the lower 70% of the em above the baseline, leaving a gap between glyphs
        let block_height = (font.size * 0.7).round().max(1.0) as i64;
        let block_width = (advance * 0.8).round().max(1.0) as i64;
        let [origin_x, baseline] = origin;

        for (index, character) in text.chars().enumerate() {
            if character.is_whitespace() {
                continue;
            }
            let left = (origin_x + index as f32 * advance).round() as i64;
            let top = baseline.round() as i64 - block_height;
            for y in top..top + block_height {
                for x in left..left + block_width {
                    blend_coverage(canvas, x, y, color, 1.0);
                }
            }
        }

        Ok(text.chars().count() as f32 * advance)
    }
}
