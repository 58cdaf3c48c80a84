//! Measuring and word wrapping on top of [`TextIter`]
//!
//! Both walk the text with [`BitmapRequirement::Optional`], so they never
//! fail because the atlas is full.

use vellum_paint::{Bounds, Point};

use crate::atlas::{BitmapRequirement, FontAtlas};
use crate::iter::{CodepointClass, TextIter, TextStep, TextStyle};
use crate::Result;

/// One wrapped line. Byte offsets index the measured text; widths are
/// relative to the row's first glyph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextRow {
    pub start: usize,
    /// End of the last visible glyph (trailing spaces excluded)
    pub end: usize,
    /// Where the following row starts
    pub next: usize,
    pub width: f32,
    pub min_x: f32,
    pub max_x: f32,
}

/// Horizontal ink extent of a step; the advance box when it has no quad
fn ink(step: &TextStep) -> (f32, f32) {
    match step.quad {
        Some(q) => (q.x0, q.x1),
        None => (step.x, step.next_x),
    }
}

fn is_word_char(class: CodepointClass) -> bool {
    matches!(class, CodepointClass::Char | CodepointClass::Cjk)
}

/// Advance of `text` laid out from the origin, and the bounds of its glyphs.
///
/// Vertical bounds cover each line from ascender to descender. The advance is
/// the pen position at the end of the last line.
pub fn measure(atlas: &mut FontAtlas, style: &TextStyle, text: &str) -> Result<(f32, Bounds)> {
    let metrics = atlas.line_metrics(style.font, style.size)?;
    let mut iter = TextIter::new();
    iter.set_style(*style);
    iter.reset(0.0, 0.0, BitmapRequirement::Optional);

    let mut bounds = Bounds::EMPTY;
    let mut line_y = 0.0;
    bounds.include(Point::new(0.0, line_y - metrics.ascender));
    bounds.include(Point::new(0.0, line_y - metrics.descender));

    let bytes = text.as_bytes();
    while let Some(step) = iter.next_step(atlas, bytes)? {
        if step.class == CodepointClass::Newline {
            line_y = iter.position().1;
            bounds.include(Point::new(0.0, line_y - metrics.ascender));
            bounds.include(Point::new(0.0, line_y - metrics.descender));
            continue;
        }
        let (x0, x1) = ink(&step);
        bounds.include(Point::new(x0, line_y - metrics.ascender));
        bounds.include(Point::new(x1, line_y - metrics.descender));
    }

    Ok((iter.position().0, bounds))
}

struct RowBuilder {
    start: usize,
    end: usize,
    start_x: f32,
    width: f32,
    min_x: f32,
    max_x: f32,
}

/// Split `text` into rows no wider than `break_width`.
///
/// Rows break after the last space that fits or before any CJK character;
/// a word wider than a whole row is split between characters. Explicit
/// newlines always end a row. Leading spaces of a row are skipped.
pub fn break_lines(
    atlas: &mut FontAtlas,
    style: &TextStyle,
    text: &str,
    break_width: f32,
) -> Result<Vec<TextRow>> {
    let mut rows = Vec::new();
    let mut iter = TextIter::new();
    iter.set_style(*style);
    iter.reset(0.0, 0.0, BitmapRequirement::Optional);

    let mut row: Option<RowBuilder> = None;
    // Last word end that fits
    let (mut break_end, mut break_width_at, mut break_max_x) = (0usize, 0.0f32, 0.0f32);
    // Last word start
    let (mut word_start, mut word_start_x, mut word_min_x) = (0usize, 0.0f32, 0.0f32);
    let mut prev_class = CodepointClass::Space;

    let bytes = text.as_bytes();
    while let Some(step) = iter.next_step(atlas, bytes)? {
        let class = step.class;
        let (ink_x0, ink_x1) = ink(&step);

        if class == CodepointClass::Newline {
            rows.push(match row.take() {
                Some(r) => TextRow {
                    start: r.start,
                    end: r.end,
                    next: step.byte_end,
                    width: r.width,
                    min_x: r.min_x,
                    max_x: r.max_x,
                },
                None => TextRow {
                    start: step.byte_start,
                    end: step.byte_start,
                    next: step.byte_end,
                    ..Default::default()
                },
            });
        } else if let Some(r) = row.as_mut() {
            // Track the end of the last word before this codepoint
            if (is_word_char(prev_class) && class == CodepointClass::Space)
                || class == CodepointClass::Cjk
            {
                break_end = step.byte_start;
                break_width_at = r.width;
                break_max_x = r.max_x;
            }
            // Track the start of the last word
            if (prev_class == CodepointClass::Space && is_word_char(class))
                || class == CodepointClass::Cjk
            {
                word_start = step.byte_start;
                word_start_x = step.x;
                word_min_x = ink_x0;
            }

            if is_word_char(class) {
                let next_width = step.next_x - r.start_x;
                if next_width > break_width {
                    if break_end == r.start {
                        // Word longer than the row: split before this char
                        rows.push(TextRow {
                            start: r.start,
                            end: step.byte_start,
                            next: step.byte_start,
                            width: r.width,
                            min_x: r.min_x,
                            max_x: r.max_x,
                        });
                        r.start = step.byte_start;
                        r.start_x = step.x;
                        r.min_x = ink_x0 - r.start_x;
                        word_start = step.byte_start;
                        word_start_x = step.x;
                        word_min_x = ink_x0;
                    } else {
                        rows.push(TextRow {
                            start: r.start,
                            end: break_end,
                            next: word_start,
                            width: break_width_at,
                            min_x: r.min_x,
                            max_x: break_max_x,
                        });
                        r.start = word_start;
                        r.start_x = word_start_x;
                        r.min_x = word_min_x - r.start_x;
                    }
                    break_end = r.start;
                    break_width_at = 0.0;
                    break_max_x = 0.0;
                }
                r.end = step.byte_end;
                r.width = step.next_x - r.start_x;
                r.max_x = ink_x1 - r.start_x;
            }
        } else if is_word_char(class) {
            row = Some(RowBuilder {
                start: step.byte_start,
                end: step.byte_end,
                start_x: step.x,
                width: step.next_x - step.x,
                min_x: ink_x0 - step.x,
                max_x: ink_x1 - step.x,
            });
            word_start = step.byte_start;
            word_start_x = step.x;
            word_min_x = ink_x0;
            break_end = step.byte_start;
            break_width_at = 0.0;
            break_max_x = 0.0;
        }

        prev_class = class;
    }

    if let Some(r) = row {
        rows.push(TextRow {
            start: r.start,
            end: r.end,
            next: bytes.len(),
            width: r.width,
            min_x: r.min_x,
            max_x: r.max_x,
        });
    }

    Ok(rows)
}
