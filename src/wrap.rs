use std::mem;

use crate::document_configuration::Typography;
use crate::error::ContextError;
use crate::markup::{Line, Segment};
use crate::measure::TextMeasurer;

/// A run of non-space characters of one markup segment followed by the spaces after it. The spaces
/// opening the next segment still trail the word, so a word may span two styled pieces.
#[derive(Debug, Clone, PartialEq)]
struct Word {
    pieces: Vec<Segment>,
}

/// Greedy, word-level line breaking against a fixed maximum width.
pub struct WordWrapper<'a, M: TextMeasurer + ?Sized> {
    measurer: &'a M,
    typography: &'a Typography,
    maximum_width: f32,
}

impl<'a, M: TextMeasurer + ?Sized> WordWrapper<'a, M> {
    pub fn new(
        measurer: &'a M,
        typography: &'a Typography,
        maximum_width: f32,
    ) -> Self {
        WordWrapper {
            measurer,
            typography,
            maximum_width,
        }
    }

    /// Wraps every text line to the maximum width. Code rows, dividers and item separators
    /// are passed through unchanged.
    pub fn wrap(&self, lines: &[Line]) -> Result<Vec<Line>, ContextError> {
        let mut wrapped_lines = Vec::with_capacity(lines.len());

        for line in lines {
            match line {
                Line::Text { segments } if !line.is_code() => {
                    self.wrap_segments(segments, &mut wrapped_lines)?
                }
                Line::Text { .. } | Line::Divider | Line::ItemSeparator => {
                    wrapped_lines.push(line.clone())
                }
            }
        }

        log::debug!(
            "Wrapped {} lines into {} lines of at most {} pixels",
            lines.len(),
            wrapped_lines.len(),
            self.maximum_width
        );

        Ok(wrapped_lines)
    }

    fn wrap_segments(
        &self,
        segments: &[Segment],
        wrapped_lines: &mut Vec<Line>,
    ) -> Result<(), ContextError> {
        let words = split_words(segments);
        if words.is_empty() {
            wrapped_lines.push(Line::blank());
            return Ok(());
        }

        let mut current_line_pieces = Vec::new();
        let mut current_line_width = 0.0;

        for word in words {
            let word_width = self.measure_word(&word)?;
            // A word wider than the whole line still lands alone on its own line and overflows
            if current_line_width + word_width > self.maximum_width
                && !current_line_pieces.is_empty()
            {
                wrapped_lines.push(finish_line(mem::take(&mut current_line_pieces)));
                current_line_width = 0.0;
            }
            current_line_pieces.extend(word.pieces);
            current_line_width += word_width;
        }

        if !current_line_pieces.is_empty() {
            wrapped_lines.push(finish_line(current_line_pieces));
        }

        Ok(())
    }

    fn measure_word(&self, word: &Word) -> Result<f32, ContextError> {
        word.pieces.iter().try_fold(0.0, |width, piece| {
            let piece_width = self
                .measurer
                .measure(self.typography.segment_font(piece.style), &piece.text)?;
            Ok(width + piece_width)
        })
    }
}

/// Splits styled segments into words on the space character and on segment boundaries, keeping
/// every character.
fn split_words(segments: &[Segment]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current_pieces: Vec<Segment> = Vec::new();
    let mut in_trailing_spaces = false;

    for segment in segments {
        for (position, character) in segment.text.chars().enumerate() {
            if character == ' ' {
                match current_pieces.last_mut() {
                    Some(last_piece) => last_piece.text.push(character),
                    // Leading spaces of the line form a word of their own
                    None => current_pieces.push(Segment::new(character, segment.style)),
                }
                in_trailing_spaces = true;
                continue;
            }

            // A segment opening with a non-space character starts a new word, e.g. `*aaaa*bbbb`
            if in_trailing_spaces || (position == 0 && !current_pieces.is_empty()) {
                words.push(Word {
                    pieces: mem::take(&mut current_pieces),
                });
                in_trailing_spaces = false;
            }
            match current_pieces.last_mut() {
                Some(last_piece) if last_piece.style == segment.style => {
                    last_piece.text.push(character)
                }
                _ => current_pieces.push(Segment::new(character, segment.style)),
            }
        }
    }

    if !current_pieces.is_empty() {
        words.push(Word {
            pieces: current_pieces,
        });
    }

    words
}

/// Merges adjacent pieces of the same style into one segment.
fn finish_line(pieces: Vec<Segment>) -> Line {
    let mut segments: Vec<Segment> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match segments.last_mut() {
            Some(last_segment) if last_segment.style == piece.style => {
                last_segment.text.push_str(&piece.text)
            }
            _ => segments.push(piece),
        }
    }

    Line::Text { segments }
}
