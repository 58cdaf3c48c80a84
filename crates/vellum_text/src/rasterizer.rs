//! Glyph rasterization using swash
//!
//! [`SwashFace`] owns the font bytes. Metrics, cmap lookups and kerning come
//! from ttf-parser; coverage bitmaps are rendered by swash.

use rustc_hash::FxHashMap;
use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use ttf_parser::GlyphId;

use crate::face::{FontFace, GlyphPlacement, VerticalMetrics};
use crate::{Result, TextError};

/// A TTF/OTF face rendered with swash
pub struct SwashFace {
    data: Vec<u8>,
    index: u32,
    /// Offset of the face's table directory, as swash expects
    offset: u32,
    key: swash::CacheKey,
    units_per_em: f32,
    metrics: VerticalMetrics,
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
    /// Kerning in font units, looked up lazily per glyph pair
    kerning: FxHashMap<(u16, u16), i16>,
}

impl SwashFace {
    /// Parse face `index` of a font file or collection
    pub fn from_data(data: Vec<u8>, index: u32) -> Result<Self> {
        let (units_per_em, metrics) = {
            let face = ttf_parser::Face::parse(&data, index)
                .map_err(|e| TextError::FontParse(e.to_string()))?;
            let upem = face.units_per_em() as f32;
            (
                upem,
                VerticalMetrics {
                    ascender: face.ascender() as f32 / upem,
                    descender: face.descender() as f32 / upem,
                    line_gap: face.line_gap() as f32 / upem,
                },
            )
        };

        let (offset, key) = {
            let font = swash::FontRef::from_index(&data, index as usize).ok_or_else(|| {
                TextError::FontParse(format!("swash could not read face {}", index))
            })?;
            (font.offset, font.key)
        };

        Ok(Self {
            data,
            index,
            offset,
            key,
            units_per_em,
            metrics,
            scale_context: ScaleContext::new(),
            kerning: FxHashMap::default(),
        })
    }

    /// Read a font file from disk
    pub fn from_file(path: impl AsRef<std::path::Path>, index: u32) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| TextError::FontLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_data(data, index)
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }

    fn lookup_kerning(&self, left: u16, right: u16) -> i16 {
        let Some(face) = self.face() else {
            return 0;
        };
        let Some(kern) = face.tables().kern else {
            return 0;
        };
        kern.subtables
            .into_iter()
            .filter(|st| st.horizontal && !st.variable)
            .find_map(|st| st.glyphs_kerning(GlyphId(left), GlyphId(right)))
            .unwrap_or(0)
    }
}

impl FontFace for SwashFace {
    fn vertical_metrics(&self) -> VerticalMetrics {
        self.metrics
    }

    fn glyph_index(&self, codepoint: char) -> Option<u16> {
        self.face()?.glyph_index(codepoint).map(|g| g.0)
    }

    fn advance(&self, glyph: u16, size: f32) -> f32 {
        let advance = self
            .face()
            .and_then(|f| f.glyph_hor_advance(GlyphId(glyph)))
            .unwrap_or(0);
        advance as f32 * size / self.units_per_em
    }

    fn kern_advance(&mut self, left: u16, right: u16, size: f32) -> f32 {
        let units = match self.kerning.get(&(left, right)) {
            Some(units) => *units,
            None => {
                let units = self.lookup_kerning(left, right);
                self.kerning.insert((left, right), units);
                units
            }
        };
        units as f32 * size / self.units_per_em
    }

    fn render_glyph(&mut self, glyph: u16, size: f32, out: &mut Vec<u8>) -> Result<GlyphPlacement> {
        out.clear();

        let font = swash::FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        };

        // Create a scaler for this font at the requested size
        let mut scaler = self.scale_context.builder(font).size(size).hint(false).build();

        // Use alpha mask (grayscale) rendering of the outline
        let mut render = Render::new(&[Source::Outline]);
        render.format(Format::Alpha);
        let image = render.render(&mut scaler, glyph);

        match image {
            Some(img) => {
                let placement = GlyphPlacement {
                    left: img.placement.left,
                    top: img.placement.top,
                    width: img.placement.width,
                    height: img.placement.height,
                };
                let expected = (placement.width * placement.height) as usize;
                if img.data.len() != expected {
                    return Err(TextError::Rasterize(format!(
                        "glyph {} produced {} bytes, expected {}",
                        glyph,
                        img.data.len(),
                        expected
                    )));
                }
                out.extend_from_slice(&img.data);
                Ok(placement)
            }
            // Empty glyph (like space) - no bitmap but has advance
            None => Ok(GlyphPlacement::default()),
        }
    }
}
