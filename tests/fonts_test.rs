use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use studypack::{
    fonts::FontBook,
    measure::{FontFace, FontSpec, TextMeasurer, TextPainter},
};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([17, 24, 39, 255]);

fn font_book() -> FontBook {
    let font_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fonts/DejaVuSansMono.ttf");
    let mut font_book = FontBook::new();
    for font_face in [FontFace::Regular, FontFace::Monospace] {
        font_book.add_font(font_face, &font_path).unwrap();
    }

    font_book
}

#[test]
fn painting_advances_exactly_by_the_measured_width() {
    let font_book = font_book();
    let texts = [
        "Answer: 4",
        "*1.* What is 2+2?",
        "  leading spaces and café ∑ ✓",
        "let answer = \"forty two\";",
    ];

    for font in [
        FontSpec::new(FontFace::Regular, 20.0),
        FontSpec::new(FontFace::Monospace, 17.5),
    ] {
        for text in texts {
            let measured_width = font_book.measure(font, text).unwrap();
            let mut canvas = RgbaImage::from_pixel(800, 60, BACKGROUND);
            let painted_width = font_book
                .paint_text(&mut canvas, font, text, [80.0, 40.0], INK)
                .unwrap();

            assert_eq!(painted_width, measured_width, "{:?} at {:?}", text, font);
            assert!(measured_width > 0.0);
            assert!(canvas.pixels().any(|pixel| *pixel != BACKGROUND));
        }
    }
}

#[test]
fn decomposed_text_measures_like_its_composed_form() {
    let font_book = font_book();
    let font = FontSpec::new(FontFace::Regular, 20.0);

    assert_eq!(
        font_book.measure(font, "cafe\u{301}").unwrap(),
        font_book.measure(font, "caf\u{e9}").unwrap()
    );
}
