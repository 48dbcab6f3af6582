use image::{imageops, ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::rect::Rect;

use crate::document::DocumentMetadata;
use crate::document_configuration::{DocumentConfiguration, Rgb};
use crate::error::{ContextError, ErrorKind};
use crate::markup::{Line, Segment, SegmentStyle};
use crate::measure::{FontFace, FontSpec, TextPainter};
use crate::paginate::Page;

/// Rotation of the watermark, counter-clockwise on the page.
const WATERMARK_ANGLE: f32 = -std::f32::consts::FRAC_PI_4;
/// Rules are drawn this far above the baseline of the line they stand for.
const RULE_OFFSET: f32 = 10.0;
/// The separator caption sits this far below the baseline of its line.
const CAPTION_OFFSET: f32 = 15.0;
const DASH_LENGTH: u32 = 5;
const DASH_GAP: u32 = 5;
const DASH_THICKNESS: u32 = 2;

fn opaque(rgb: Rgb) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

/// Allocates a surface of the given size filled with a single color. Allocation failures are
/// reported instead of aborting, so that a failed page only fails its own generation.
pub fn create_surface(width: u32, height: u32, fill: Rgba<u8>) -> Result<RgbaImage, ContextError> {
    if width == 0 || height == 0 {
        return Err(ContextError::with_context(
            ErrorKind::SurfaceCreation,
            format!("Unable to create a surface of {}x{} pixels", width, height),
        ));
    }
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::SurfaceCreation,
                format!("The surface of {}x{} pixels is too large", width, height),
            )
        })?;
    let byte_count = pixel_count.checked_mul(4).ok_or_else(|| {
        ContextError::with_context(
            ErrorKind::SurfaceCreation,
            format!("The surface of {}x{} pixels is too large", width, height),
        )
    })?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(byte_count).map_err(|error| {
        ContextError::with_error(
            ErrorKind::SurfaceCreation,
            format!("Failed to allocate a surface of {}x{} pixels", width, height),
            &error,
        )
    })?;
    for _ in 0..pixel_count {
        buffer.extend_from_slice(&fill.0);
    }

    ImageBuffer::from_raw(width, height, buffer).ok_or_else(|| {
        ContextError::with_context(
            ErrorKind::SurfaceCreation,
            "The surface buffer does not match its dimensions",
        )
    })
}

/// Composites `color` with the given coverage over a single pixel, ignoring pixels outside of
/// the canvas. This is where glyph rasterization and text blocks end up.
pub(crate) fn blend_coverage(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    color: Rgba<u8>,
    coverage: f32,
) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let source_alpha = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if source_alpha <= 0.0 {
        return;
    }

    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    let destination_alpha = pixel[3] as f32 / 255.0;
    let output_alpha = source_alpha + destination_alpha * (1.0 - source_alpha);
    for channel in 0..3 {
        let blended = (color[channel] as f32 * source_alpha
            + pixel[channel] as f32 * destination_alpha * (1.0 - source_alpha))
            / output_alpha;
        pixel[channel] = blended.round().clamp(0.0, 255.0) as u8;
    }
    pixel[3] = (output_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Rasterizes single pages. The renderer holds no drawing state of its own: every call starts
/// from a freshly allocated surface, so pages can be rendered in any order with identical results.
pub struct PageRenderer<'a> {
    configuration: &'a DocumentConfiguration,
    painter: &'a dyn TextPainter,
}

impl<'a> PageRenderer<'a> {
    pub fn new(configuration: &'a DocumentConfiguration, painter: &'a dyn TextPainter) -> Self {
        PageRenderer {
            configuration,
            painter,
        }
    }

    /// Renders the page with its decoration. The background goes first, then the watermark,
    /// the header, the lines of the page and finally the footer.
    pub fn render(
        &self,
        page: &Page,
        total_pages: usize,
        metadata: &DocumentMetadata,
    ) -> Result<RgbaImage, ContextError> {
        let geometry = &self.configuration.page_geometry;
        let mut surface = create_surface(
            geometry.page_width,
            geometry.page_height,
            opaque(self.configuration.palette.background),
        )?;

        self.draw_watermark(&mut surface)?;
        self.draw_header(&mut surface, page.index, total_pages, metadata)?;
        for (position, line) in page.lines.iter().enumerate() {
            let baseline = geometry.header_reservation + position as f32 * geometry.line_height;
            match line {
                Line::Text { segments } => self.draw_segments(&mut surface, segments, baseline)?,
                Line::Divider => self.draw_divider(&mut surface, baseline),
                Line::ItemSeparator => self.draw_item_separator(&mut surface, baseline)?,
            }
        }
        self.draw_footer(&mut surface, metadata)?;

        log::debug!(
            "Rendered page {} of {} with {} lines",
            page.index + 1,
            total_pages,
            page.lines.len()
        );

        Ok(surface)
    }

    /// The watermark is drawn upright on a transparent layer of the page size, which is then
    /// rotated about its center and composited over the background.
    fn draw_watermark(&self, surface: &mut RgbaImage) -> Result<(), ContextError> {
        let branding = &self.configuration.branding;
        if branding.watermark_text.trim().is_empty() {
            return Ok(());
        }
        let palette = &self.configuration.palette;
        let alpha = (palette.watermark_opacity * 255.0).round().clamp(0.0, 255.0) as u8;
        if alpha == 0 {
            return Ok(());
        }
        let [red, green, blue] = palette.watermark;
        let font = FontSpec::new(FontFace::Bold, self.configuration.typography.watermark_size);

        let mut layer = create_surface(surface.width(), surface.height(), Rgba([0, 0, 0, 0]))?;
        // Roughly centers the capitals vertically around the middle of the page
        let baseline = surface.height() as f32 / 2.0 + font.size * 0.35;
        self.draw_centered(
            &mut layer,
            font,
            &branding.watermark_text,
            baseline,
            Rgba([red, green, blue, alpha]),
        )?;

        let rotated_layer = rotate_about_center(
            &layer,
            WATERMARK_ANGLE,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        );
        imageops::overlay(surface, &rotated_layer, 0, 0);

        Ok(())
    }

    fn draw_header(
        &self,
        surface: &mut RgbaImage,
        page_index: usize,
        total_pages: usize,
        metadata: &DocumentMetadata,
    ) -> Result<(), ContextError> {
        let geometry = &self.configuration.page_geometry;
        let typography = &self.configuration.typography;
        let palette = &self.configuration.palette;

        self.draw_centered(
            surface,
            FontSpec::new(FontFace::Bold, typography.title_size),
            &metadata.title,
            geometry.title_baseline,
            opaque(palette.ink),
        )?;
        self.draw_centered(
            surface,
            FontSpec::new(FontFace::Bold, typography.subtitle_size),
            &metadata.subtitle(),
            geometry.subtitle_baseline,
            opaque(palette.accent),
        )?;
        self.draw_centered(
            surface,
            FontSpec::new(FontFace::Italic, typography.page_label_size),
            &self
                .configuration
                .branding
                .page_label(page_index, total_pages),
            geometry.page_label_baseline,
            opaque(palette.muted),
        )?;

        Ok(())
    }

    fn draw_footer(
        &self,
        surface: &mut RgbaImage,
        metadata: &DocumentMetadata,
    ) -> Result<(), ContextError> {
        let geometry = &self.configuration.page_geometry;
        let font = FontSpec::new(FontFace::Bold, self.configuration.typography.footer_size);
        let color = opaque(self.configuration.palette.muted);

        for (line_index, distance_from_bottom) in
            geometry.footer_baselines_from_bottom.iter().enumerate()
        {
            let footer_line = self
                .configuration
                .branding
                .footer_line(line_index, &metadata.year);
            let baseline = geometry.page_height as f32 - distance_from_bottom;
            self.draw_centered(surface, font, &footer_line, baseline, color)?;
        }

        Ok(())
    }

    fn draw_segments(
        &self,
        surface: &mut RgbaImage,
        segments: &[Segment],
        baseline: f32,
    ) -> Result<(), ContextError> {
        let typography = &self.configuration.typography;
        let palette = &self.configuration.palette;
        let mut caret_x = self.configuration.page_geometry.margin;

        for segment in segments {
            let color = match segment.style {
                SegmentStyle::Plain | SegmentStyle::Bold => opaque(palette.ink),
                SegmentStyle::Code => opaque(palette.code),
            };
            caret_x += self.painter.paint_text(
                surface,
                typography.segment_font(segment.style),
                &segment.text,
                [caret_x, baseline],
                color,
            )?;
        }

        Ok(())
    }

    fn draw_divider(&self, surface: &mut RgbaImage, baseline: f32) {
        let geometry = &self.configuration.page_geometry;
        let width = geometry.content_width().round();
        if width < 1.0 {
            return;
        }
        let rule = Rect::at(
            geometry.margin.round() as i32,
            (baseline - RULE_OFFSET).round() as i32,
        )
        .of_size(width as u32, 1);
        draw_filled_rect_mut(surface, rule, opaque(self.configuration.palette.rule));
    }

    fn draw_item_separator(
        &self,
        surface: &mut RgbaImage,
        baseline: f32,
    ) -> Result<(), ContextError> {
        let geometry = &self.configuration.page_geometry;
        let accent = opaque(self.configuration.palette.accent);
        let left = geometry.margin.round() as i64;
        let right = (geometry.page_width as f32 - geometry.margin).round() as i64;
        // The 2 pixel stroke is centered on the rule line
        let top = (baseline - RULE_OFFSET).round() as i32 - (DASH_THICKNESS / 2) as i32;

        let mut dash_start = left;
        while dash_start < right {
            let dash_length = (right - dash_start).min(DASH_LENGTH as i64) as u32;
            let dash = Rect::at(dash_start as i32, top).of_size(dash_length, DASH_THICKNESS);
            draw_filled_rect_mut(surface, dash, accent);
            dash_start += (DASH_LENGTH + DASH_GAP) as i64;
        }

        self.draw_centered(
            surface,
            FontSpec::new(FontFace::Bold, self.configuration.typography.caption_size),
            &self.configuration.branding.separator_caption,
            baseline + CAPTION_OFFSET,
            accent,
        )
    }

    /// Draws a run horizontally centered on the surface.
    fn draw_centered(
        &self,
        surface: &mut RgbaImage,
        font: FontSpec,
        text: &str,
        baseline: f32,
        color: Rgba<u8>,
    ) -> Result<(), ContextError> {
        if text.is_empty() {
            return Ok(());
        }
        let width = self.painter.measure(font, text)?;
        let origin_x = (surface.width() as f32 - width) / 2.0;
        self.painter
            .paint_text(surface, font, text, [origin_x, baseline], color)?;

        Ok(())
    }
}
