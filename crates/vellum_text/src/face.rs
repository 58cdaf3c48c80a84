//! Rasterizer backend boundary
//!
//! The atlas only talks to fonts through [`FontFace`], so any font format or
//! rasterizer can back it. [`crate::SwashFace`] is the bundled implementation.

use crate::Result;

/// Vertical font metrics in em units (divide font units by units-per-em)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VerticalMetrics {
    /// Distance from baseline to the top of the tallest glyphs (positive)
    pub ascender: f32,
    /// Distance from baseline to the bottom of the deepest glyphs (negative)
    pub descender: f32,
    /// Extra spacing between lines
    pub line_gap: f32,
}

/// Where a rendered bitmap sits relative to the pen position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphPlacement {
    /// Horizontal offset from the pen to the left edge
    pub left: i32,
    /// Vertical offset from the baseline up to the top edge
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl GlyphPlacement {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub trait FontFace: Send {
    fn vertical_metrics(&self) -> VerticalMetrics;

    /// Glyph index for a codepoint, `None` when the font has no glyph for it
    fn glyph_index(&self, codepoint: char) -> Option<u16>;

    /// Horizontal advance in pixels at `size` pixels per em
    fn advance(&self, glyph: u16, size: f32) -> f32;

    /// Kerning adjustment in pixels between two glyph indices
    fn kern_advance(&mut self, left: u16, right: u16, size: f32) -> f32;

    /// Render an 8-bit coverage bitmap of `glyph` into `out` (cleared first,
    /// `width * height` bytes, rows tightly packed)
    fn render_glyph(&mut self, glyph: u16, size: f32, out: &mut Vec<u8>) -> Result<GlyphPlacement>;
}
