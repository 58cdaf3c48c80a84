//! Text cursor
//!
//! [`TextIter`] walks UTF-8 bytes one codepoint at a time, fetching glyphs from
//! a [`FontAtlas`] and producing pen positions and textured quads. The cursor
//! is owned by the caller and reused: call [`TextIter::reset`] before each
//! traversal.
//!
//! Coordinates are y-down with the pen on the baseline.

use vellum_paint::FontId;

use crate::atlas::{BitmapRequirement, FontAtlas, Glyph};
use crate::utf8;
use crate::Result;

/// Coarse class of a codepoint, used for wrapping and quad emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodepointClass {
    Space,
    Newline,
    Char,
    /// Ideographs, kana and hangul; a line may break before any of them
    Cjk,
}

pub fn classify(c: char) -> CodepointClass {
    match c as u32 {
        0x09 | 0x0B | 0x0C | 0x20 | 0xA0 => CodepointClass::Space,
        0x0A | 0x0D | 0x85 => CodepointClass::Newline,
        0x4E00..=0x9FFF
        | 0x3000..=0x30FF
        | 0xFF00..=0xFFEF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        | 0xAC00..=0xD7AF => CodepointClass::Cjk,
        _ => CodepointClass::Char,
    }
}

/// Font settings a traversal runs with. Sizes are in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontId,
    pub size: f32,
    /// Extra space between consecutive glyphs
    pub letter_spacing: f32,
    /// Multiplier on the font's line height
    pub line_height: f32,
    pub blur: f32,
    pub dilate: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: FontId(0),
            size: 16.0,
            letter_spacing: 0.0,
            line_height: 1.0,
            blur: 0.0,
            dilate: 0.0,
        }
    }
}

impl TextStyle {
    pub fn new(font: FontId, size: f32) -> Self {
        Self {
            font,
            size,
            ..Default::default()
        }
    }

    pub fn with_letter_spacing(mut self, spacing: f32) -> Self {
        self.letter_spacing = spacing;
        self
    }

    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn with_blur(mut self, blur: f32) -> Self {
        self.blur = blur;
        self
    }

    pub fn with_dilate(mut self, dilate: f32) -> Self {
        self.dilate = dilate;
        self
    }
}

/// Screen rectangle of a glyph and its normalized atlas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphQuad {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
}

/// One decoded codepoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStep {
    pub codepoint: char,
    pub class: CodepointClass,
    /// Byte range of the codepoint (a `\r\n` pair counts as one step)
    pub byte_start: usize,
    pub byte_end: usize,
    /// Pen position before this codepoint
    pub x: f32,
    pub y: f32,
    /// Pen x after it
    pub next_x: f32,
    pub quad: Option<GlyphQuad>,
}

#[derive(Debug, Clone)]
pub struct TextIter {
    style: TextStyle,
    requirement: BitmapRequirement,
    origin_x: f32,
    x: f32,
    y: f32,
    offset: usize,
    /// Previous glyph (font, index) for kerning
    prev: Option<(FontId, u16)>,
}

impl Default for TextIter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextIter {
    pub fn new() -> Self {
        Self {
            style: TextStyle::default(),
            requirement: BitmapRequirement::Required,
            origin_x: 0.0,
            x: 0.0,
            y: 0.0,
            offset: 0,
            prev: None,
        }
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
    }

    /// Start a new traversal with the pen at `(x, y)`
    pub fn reset(&mut self, x: f32, y: f32, requirement: BitmapRequirement) {
        self.requirement = requirement;
        self.origin_x = x;
        self.x = x;
        self.y = y;
        self.offset = 0;
        self.prev = None;
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Byte offset of the next codepoint
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decode and lay out the next codepoint of `text`.
    ///
    /// `text` must be the same slice for a whole traversal. On error the
    /// cursor is left where it was, so the same step can be retried (for
    /// instance after resetting a full atlas).
    pub fn next_step(&mut self, atlas: &mut FontAtlas, text: &[u8]) -> Result<Option<TextStep>> {
        let start = self.offset;
        let Some((codepoint, len)) = text.get(start..).and_then(utf8::decode) else {
            return Ok(None);
        };
        let mut end = start + len;
        let class = classify(codepoint);

        if class == CodepointClass::Newline {
            if codepoint == '\r' && text.get(end) == Some(&b'\n') {
                end += 1;
            }
            let metrics = atlas.line_metrics(self.style.font, self.style.size)?;
            let step = TextStep {
                codepoint,
                class,
                byte_start: start,
                byte_end: end,
                x: self.x,
                y: self.y,
                next_x: self.origin_x,
                quad: None,
            };
            self.x = self.origin_x;
            self.y += metrics.line_height * self.style.line_height;
            self.offset = end;
            self.prev = None;
            return Ok(Some(step));
        }

        let style = self.style;
        let glyph = atlas.get_glyph(
            style.font,
            codepoint,
            style.size,
            style.blur,
            style.dilate,
            self.requirement,
        )?;
        let scale = if glyph.size > 0.0 {
            style.size / glyph.size
        } else {
            0.0
        };

        let mut pen = self.x;
        if let Some((prev_font, prev_index)) = self.prev {
            if prev_font == glyph.font {
                pen += atlas.kern_advance(glyph.font, prev_index, glyph.index, glyph.size)? * scale;
            }
            pen += style.letter_spacing;
        }

        let quad = (class != CodepointClass::Space && glyph.has_bitmap())
            .then(|| glyph_quad(&glyph, pen, self.y, scale, atlas.texture().dimensions()));

        let step = TextStep {
            codepoint,
            class,
            byte_start: start,
            byte_end: end,
            x: self.x,
            y: self.y,
            next_x: pen + glyph.advance * scale,
            quad,
        };
        self.x = step.next_x;
        self.offset = end;
        self.prev = Some((glyph.font, glyph.index));
        Ok(Some(step))
    }

    /// Lazily yield the quads of `text`, skipping glyphs without a bitmap.
    /// Stops after the first error.
    pub fn quads<'a>(&'a mut self, atlas: &'a mut FontAtlas, text: &'a [u8]) -> Quads<'a> {
        Quads {
            iter: self,
            atlas,
            text,
            failed: false,
        }
    }
}

/// Quad for `glyph` with the pen at `(x, y)`. The atlas rectangle is inset by
/// one texel on each side so bilinear sampling never reads a neighbour.
fn glyph_quad(glyph: &Glyph, x: f32, y: f32, scale: f32, (tw, th): (u32, u32)) -> GlyphQuad {
    let (itw, ith) = (1.0 / tw as f32, 1.0 / th as f32);
    let (sx0, sy0) = (glyph.x0 as f32 + 1.0, glyph.y0 as f32 + 1.0);
    let (sx1, sy1) = (glyph.x1 as f32 - 1.0, glyph.y1 as f32 - 1.0);

    let x0 = x + (glyph.x_off as f32 + 1.0) * scale;
    let y0 = y + (glyph.y_off as f32 + 1.0) * scale;
    GlyphQuad {
        x0,
        y0,
        x1: x0 + (sx1 - sx0) * scale,
        y1: y0 + (sy1 - sy0) * scale,
        s0: sx0 * itw,
        t0: sy0 * ith,
        s1: sx1 * itw,
        t1: sy1 * ith,
    }
}

/// Iterator adapter returned by [`TextIter::quads`]
pub struct Quads<'a> {
    iter: &'a mut TextIter,
    atlas: &'a mut FontAtlas,
    text: &'a [u8],
    failed: bool,
}

impl Iterator for Quads<'_> {
    type Item = Result<GlyphQuad>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.iter.next_step(self.atlas, self.text) {
                Ok(Some(step)) => {
                    if let Some(quad) = step.quad {
                        return Some(Ok(quad));
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::tests::BoxFace;
    use crate::atlas::AtlasConfig;
    use crate::font::BakeMode;
    use crate::TextError;

    fn setup(width: u32, height: u32) -> (FontAtlas, TextIter) {
        let mut atlas = FontAtlas::new(AtlasConfig::default().with_size(width, height));
        let font = atlas.add_font("box", Box::new(BoxFace));
        let mut iter = TextIter::new();
        iter.set_style(TextStyle::new(font, 16.0));
        (atlas, iter)
    }

    fn steps(iter: &mut TextIter, atlas: &mut FontAtlas, text: &[u8]) -> Vec<TextStep> {
        let mut out = Vec::new();
        while let Some(step) = iter.next_step(atlas, text).unwrap() {
            out.push(step);
        }
        out
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(' '), CodepointClass::Space);
        assert_eq!(classify('\u{A0}'), CodepointClass::Space);
        assert_eq!(classify('\t'), CodepointClass::Space);
        assert_eq!(classify('\n'), CodepointClass::Newline);
        assert_eq!(classify('\r'), CodepointClass::Newline);
        assert_eq!(classify('\u{85}'), CodepointClass::Newline);
        assert_eq!(classify('漢'), CodepointClass::Cjk);
        assert_eq!(classify('カ'), CodepointClass::Cjk);
        assert_eq!(classify('한'), CodepointClass::Cjk);
        assert_eq!(classify('a'), CodepointClass::Char);
        assert_eq!(classify('€'), CodepointClass::Char);
    }

    #[test]
    fn test_pen_advance_and_quads() {
        let (mut atlas, mut iter) = setup(256, 256);
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let out = steps(&mut iter, &mut atlas, b"AB");
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].x, out[0].next_x), (0.0, 8.0));
        assert_eq!((out[1].x, out[1].next_x), (8.0, 16.0));

        // 8x12 bitmap, 2 texels padding, 1 texel inset
        let q = out[0].quad.unwrap();
        assert_eq!((q.x0, q.y0, q.x1, q.y1), (-1.0, -13.0, 9.0, 1.0));
        assert_eq!(q.s0, 1.0 / 256.0);
        assert_eq!(q.s1, 11.0 / 256.0);
        assert_eq!(iter.position(), (16.0, 0.0));
    }

    #[test]
    fn test_empty_string_and_reuse() {
        let (mut atlas, mut iter) = setup(256, 256);
        iter.reset(5.0, 5.0, BitmapRequirement::Required);
        assert_eq!(iter.next_step(&mut atlas, b"").unwrap(), None);

        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        assert_eq!(steps(&mut iter, &mut atlas, b"AB").len(), 2);
        // A second traversal after reset starts from scratch
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let again = steps(&mut iter, &mut atlas, b"AB");
        assert_eq!(again[0].x, 0.0);
        assert_eq!(atlas.bake_count(), 2);
    }

    #[test]
    fn test_newlines() {
        let (mut atlas, mut iter) = setup(256, 256);
        iter.reset(10.0, 0.0, BitmapRequirement::Required);
        let out = steps(&mut iter, &mut atlas, b"A\r\nB\nC");
        let classes: Vec<_> = out.iter().map(|s| s.class).collect();
        assert_eq!(
            classes,
            vec![
                CodepointClass::Char,
                CodepointClass::Newline,
                CodepointClass::Char,
                CodepointClass::Newline,
                CodepointClass::Char,
            ]
        );
        assert_eq!(out[1].byte_end, 3);
        assert!(out[1].quad.is_none());
        assert_eq!((out[2].x, out[2].y), (10.0, 16.0));
        assert_eq!((out[4].x, out[4].y), (10.0, 32.0));
    }

    #[test]
    fn test_spaces_have_no_quad() {
        let (mut atlas, mut iter) = setup(256, 256);
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let quads: Vec<_> = iter
            .quads(&mut atlas, b"A B")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[1].x0, 16.0 - 1.0);
    }

    #[test]
    fn test_letter_spacing_between_glyphs_only() {
        let (mut atlas, mut iter) = setup(256, 256);
        let style = iter.style().with_letter_spacing(2.0);
        iter.set_style(style);
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let out = steps(&mut iter, &mut atlas, b"AB");
        assert_eq!(out[0].next_x, 8.0);
        assert_eq!(out[1].next_x, 18.0);
    }

    #[test]
    fn test_fixed_bake_size_rescales() {
        let (mut atlas, mut iter) = setup(256, 256);
        atlas.set_bake_mode(FontId(0), BakeMode::Fixed(32.0)).unwrap();
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let out = steps(&mut iter, &mut atlas, b"A");
        assert_eq!(out[0].next_x, 8.0);
        let q = out[0].quad.unwrap();
        // 16x24 bitmap baked at 32px, padded to 20x28, drawn at half scale
        assert_eq!(q.x1 - q.x0, 9.0);
        assert_eq!(q.y1 - q.y0, 13.0);
    }

    #[test]
    fn test_error_does_not_advance() {
        let (mut atlas, mut iter) = setup(16, 16);
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let text = b"AB";
        assert!(iter.next_step(&mut atlas, text).unwrap().is_some());
        let err = iter.next_step(&mut atlas, text);
        assert_eq!(err, Err(TextError::AtlasFull));
        assert_eq!(iter.offset(), 1);
        assert_eq!(iter.position(), (8.0, 0.0));

        atlas.reset(16, 16);
        let b = iter.next_step(&mut atlas, text).unwrap().unwrap();
        assert_eq!(b.codepoint, 'B');
        assert_eq!(b.x, 8.0);
    }

    #[test]
    fn test_quads_fuse_after_error() {
        let (mut atlas, mut iter) = setup(16, 16);
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let mut quads = iter.quads(&mut atlas, b"ABC");
        assert!(quads.next().unwrap().is_ok());
        assert!(quads.next().unwrap().is_err());
        assert!(quads.next().is_none());
    }

    #[test]
    fn test_invalid_utf8_substitutes_replacement() {
        let (mut atlas, mut iter) = setup(256, 256);
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let out = steps(&mut iter, &mut atlas, &[b'A', 0xFF, b'B']);
        let chars: Vec<char> = out.iter().map(|s| s.codepoint).collect();
        assert_eq!(chars, vec!['A', utf8::REPLACEMENT, 'B']);
        // Missing glyph still advances the pen
        assert_eq!(out[2].x, 16.0);
    }
}
