//! Registered fonts

use smallvec::SmallVec;
use vellum_paint::FontId;

use crate::face::FontFace;

/// Pixel size glyphs of a font are rasterized at
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BakeMode {
    /// Rasterize at each requested size (quantized to 0.1 px)
    #[default]
    PerSize,
    /// Always rasterize at this size; glyphs are rescaled to the requested size
    Fixed(f32),
}

impl BakeMode {
    /// Size a glyph requested at `size` gets rasterized at
    pub fn bake_size(&self, size: f32) -> f32 {
        match *self {
            BakeMode::PerSize => (size * 10.0).round() / 10.0,
            BakeMode::Fixed(baked) => baked,
        }
    }
}

/// Line metrics in pixels at a given font size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    pub ascender: f32,
    pub descender: f32,
    pub line_height: f32,
}

pub struct Font {
    pub id: FontId,
    pub name: String,
    /// Ascender in em units
    pub ascender: f32,
    /// Descender in em units (negative below the baseline)
    pub descender: f32,
    /// Baseline-to-baseline distance in em units
    pub line_height: f32,
    pub bake_mode: BakeMode,
    /// Fonts searched, in order, when this one has no glyph for a codepoint
    pub fallbacks: SmallVec<[FontId; 4]>,
    pub(crate) face: Box<dyn FontFace>,
}

impl Font {
    pub fn new(id: FontId, name: impl Into<String>, face: Box<dyn FontFace>) -> Self {
        let metrics = face.vertical_metrics();
        Self {
            id,
            name: name.into(),
            ascender: metrics.ascender,
            descender: metrics.descender,
            line_height: metrics.ascender - metrics.descender + metrics.line_gap,
            bake_mode: BakeMode::PerSize,
            fallbacks: SmallVec::new(),
            face,
        }
    }

    pub fn line_metrics(&self, size: f32) -> LineMetrics {
        LineMetrics {
            ascender: self.ascender * size,
            descender: self.descender * size,
            line_height: self.line_height * size,
        }
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ascender", &self.ascender)
            .field("descender", &self.descender)
            .field("line_height", &self.line_height)
            .field("bake_mode", &self.bake_mode)
            .field("fallbacks", &self.fallbacks)
            .finish_non_exhaustive()
    }
}
