//! Glyph atlas
//!
//! Rasterized glyphs are packed into one single-channel texture with a shelf
//! packer. Glyphs are cached by (font, codepoint, bake size, blur, dilate).
//! There is no per-glyph eviction: when the atlas fills up the owner resets
//! it and everything is baked again on demand.

use rustc_hash::FxHashMap;
use vellum_paint::{FontId, TextureId};

use crate::effects;
use crate::face::FontFace;
use crate::font::{BakeMode, Font, LineMetrics};
use crate::rasterizer::SwashFace;
use crate::{Result, TextError};

/// Atlas texture ids carry this bit so they never collide with image ids
pub const ATLAS_TEXTURE_FLAG: u32 = 1 << 31;

/// Largest blur or dilate radius a glyph can be baked with
const MAX_EFFECT_RADIUS: f32 = 20.0;

/// Whether a glyph lookup must produce an atlas bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitmapRequirement {
    /// Metrics are enough; a full atlas yields a glyph without a bitmap
    Optional,
    /// The glyph is going to be drawn; a full atlas is an error
    #[default]
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

impl AtlasConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ShelfPacker
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct Shelf {
    y: u32,
    height: u32,
    /// Next free x on this shelf
    x: u32,
}

/// Shelf (row) rectangle packer.
///
/// Rectangles go on the lowest shelf that is tall enough and has room left;
/// otherwise a new shelf of exactly their height is opened below the last one.
#[derive(Clone, Debug)]
pub struct ShelfPacker {
    width: u32,
    height: u32,
    shelves: Vec<Shelf>,
    /// Top of the unused area below the last shelf
    bottom: u32,
}

impl ShelfPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
            bottom: 0,
        }
    }

    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.shelves.clear();
        self.bottom = 0;
    }

    /// Top-left corner for a `w` x `h` rectangle, `None` when it does not fit
    pub fn allocate(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w > self.width || h > self.height {
            return None;
        }

        let mut best: Option<usize> = None;
        for (i, shelf) in self.shelves.iter().enumerate() {
            if shelf.height < h || shelf.x + w > self.width {
                continue;
            }
            if best.map_or(true, |b| shelf.height < self.shelves[b].height) {
                best = Some(i);
            }
        }

        if let Some(i) = best {
            let shelf = &mut self.shelves[i];
            let pos = (shelf.x, shelf.y);
            shelf.x += w;
            return Some(pos);
        }

        if self.bottom + h > self.height {
            return None;
        }
        let y = self.bottom;
        self.shelves.push(Shelf { y, height: h, x: w });
        self.bottom += h;
        Some((0, y))
    }

    /// Fraction of the texture height taken by shelves
    pub fn utilization(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.bottom as f32 / self.height as f32
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AtlasTexture
// ─────────────────────────────────────────────────────────────────────────────

/// CPU copy of the atlas texture plus the region changed since the last upload
#[derive(Clone, Debug)]
pub struct AtlasTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// (x0, y0, x1, y1), exclusive max
    dirty: Option<[u32; 4]>,
    id: TextureId,
}

impl AtlasTexture {
    fn new(width: u32, height: u32, id: TextureId) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
            dirty: None,
            id,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn texture_id(&self) -> TextureId {
        self.id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Region written since the last [`mark_clean`](Self::mark_clean)
    pub fn dirty_rect(&self) -> Option<[u32; 4]> {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = None;
    }

    /// Copy a tightly packed `w` x `h` bitmap to `(x, y)`
    fn blit(&mut self, x: u32, y: u32, w: u32, h: u32, src: &[u8]) {
        let stride = self.width as usize;
        for row in 0..h as usize {
            let dst = (y as usize + row) * stride + x as usize;
            let src_row = row * w as usize;
            self.pixels[dst..dst + w as usize].copy_from_slice(&src[src_row..src_row + w as usize]);
        }

        let rect = [x, y, x + w, y + h];
        self.dirty = Some(match self.dirty {
            Some(d) => [d[0].min(rect[0]), d[1].min(rect[1]), d[2].max(rect[2]), d[3].max(rect[3])],
            None => rect,
        });
    }

    fn clear(&mut self, width: u32, height: u32, id: TextureId) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize((width * height) as usize, 0);
        // The whole texture has to be uploaded again
        self.dirty = Some([0, 0, width, height]);
        self.id = id;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Glyphs
// ─────────────────────────────────────────────────────────────────────────────

/// Cache key; `size` is the bake size in tenths of a pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub font: FontId,
    pub codepoint: char,
    pub size: u32,
    pub blur: u8,
    pub dilate: u8,
}

/// A glyph as baked into the atlas.
///
/// `x0..x1`, `y0..y1` is the padded bitmap in atlas texels; offsets are from
/// the pen position (y down) to the padded bitmap's top-left corner. All
/// pixel quantities are at the bake size `size`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    pub codepoint: char,
    pub index: u16,
    /// Font the glyph was found in (differs from the request for fallbacks)
    pub font: FontId,
    pub size: f32,
    pub blur: u8,
    pub dilate: u8,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub x_off: i32,
    pub y_off: i32,
    pub advance: f32,
}

impl Glyph {
    pub fn has_bitmap(&self) -> bool {
        self.x1 > self.x0 && self.y1 > self.y0
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FontAtlas
// ─────────────────────────────────────────────────────────────────────────────

/// Fonts, the glyph cache and the atlas texture they are baked into
pub struct FontAtlas {
    config: AtlasConfig,
    fonts: Vec<Font>,
    glyphs: FxHashMap<GlyphKey, Glyph>,
    packer: ShelfPacker,
    texture: AtlasTexture,
    generation: u32,
    bake_count: u64,
    /// Raw coverage from the rasterizer
    scratch: Vec<u8>,
    /// Padded bitmap the effects run on
    padded: Vec<u8>,
    effect_scratch: Vec<u8>,
}

impl FontAtlas {
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            fonts: Vec::new(),
            glyphs: FxHashMap::default(),
            packer: ShelfPacker::new(config.width, config.height),
            texture: AtlasTexture::new(config.width, config.height, Self::texture_id_for(0)),
            generation: 0,
            bake_count: 0,
            scratch: Vec::new(),
            padded: Vec::new(),
            effect_scratch: Vec::new(),
        }
    }

    fn texture_id_for(generation: u32) -> TextureId {
        TextureId(ATLAS_TEXTURE_FLAG | (generation & !ATLAS_TEXTURE_FLAG))
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    // === Fonts ===

    pub fn add_font(&mut self, name: impl Into<String>, face: Box<dyn FontFace>) -> FontId {
        let id = FontId(self.fonts.len() as u32);
        let font = Font::new(id, name, face);
        tracing::debug!("Registered font {:?} as {:?}", font.name, id);
        self.fonts.push(font);
        id
    }

    /// Parse TTF/OTF bytes and register the first face
    pub fn add_font_data(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<FontId> {
        let face = SwashFace::from_data(data, 0)?;
        Ok(self.add_font(name, Box::new(face)))
    }

    pub fn find_font(&self, name: &str) -> Option<FontId> {
        self.fonts.iter().find(|f| f.name == name).map(|f| f.id)
    }

    pub fn font(&self, id: FontId) -> Result<&Font> {
        self.fonts
            .get(id.0 as usize)
            .ok_or(TextError::UnknownFont(id))
    }

    fn font_mut(&mut self, id: FontId) -> Result<&mut Font> {
        self.fonts
            .get_mut(id.0 as usize)
            .ok_or(TextError::UnknownFont(id))
    }

    pub fn set_bake_mode(&mut self, id: FontId, mode: BakeMode) -> Result<()> {
        self.font_mut(id)?.bake_mode = mode;
        Ok(())
    }

    /// Search `fallback` when `base` has no glyph for a codepoint
    pub fn add_fallback(&mut self, base: FontId, fallback: FontId) -> Result<()> {
        self.font(fallback)?;
        let font = self.font_mut(base)?;
        if !font.fallbacks.contains(&fallback) && fallback != base {
            font.fallbacks.push(fallback);
        }
        Ok(())
    }

    pub fn line_metrics(&self, id: FontId, size: f32) -> Result<LineMetrics> {
        Ok(self.font(id)?.line_metrics(size))
    }

    /// Kerning between two glyph indices of `font`, in pixels at `size`
    pub fn kern_advance(&mut self, font: FontId, left: u16, right: u16, size: f32) -> Result<f32> {
        Ok(self.font_mut(font)?.face.kern_advance(left, right, size))
    }

    // === Texture ===

    pub fn texture(&self) -> &AtlasTexture {
        &self.texture
    }

    pub fn texture_id(&self) -> TextureId {
        self.texture.id
    }

    /// Forget the dirty region once the renderer has uploaded it
    pub fn mark_clean(&mut self) {
        self.texture.mark_clean();
    }

    /// Glyphs rasterized since the atlas was created
    pub fn bake_count(&self) -> u64 {
        self.bake_count
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Clear everything baked so far and start over with a `width` x `height`
    /// texture. The texture gets a fresh id; previously returned glyph
    /// rectangles are invalid afterwards.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.generation = self.generation.wrapping_add(1);
        self.config.width = width;
        self.config.height = height;
        self.packer.reset(width, height);
        self.glyphs.clear();
        self.texture
            .clear(width, height, Self::texture_id_for(self.generation));
        tracing::debug!(
            generation = self.generation,
            "Font atlas reset to {}x{}",
            width,
            height
        );
    }

    // === Glyphs ===

    /// Font and glyph index that render `codepoint`: the requested font,
    /// then its fallbacks, then the requested font's missing glyph
    fn resolve(&self, font: FontId, codepoint: char) -> Result<(FontId, u16)> {
        let primary = self.font(font)?;
        if let Some(index) = primary.face.glyph_index(codepoint) {
            return Ok((font, index));
        }
        for &fallback in &primary.fallbacks {
            if let Some(index) = self
                .fonts
                .get(fallback.0 as usize)
                .and_then(|f| f.face.glyph_index(codepoint))
            {
                return Ok((fallback, index));
            }
        }
        Ok((font, 0))
    }

    /// Look up a glyph, baking it into the atlas on a cache miss.
    ///
    /// `size` is the requested pixel size; the glyph is baked at the size the
    /// font's [`BakeMode`] dictates and `Glyph::size` reports it.
    pub fn get_glyph(
        &mut self,
        font: FontId,
        codepoint: char,
        size: f32,
        blur: f32,
        dilate: f32,
        requirement: BitmapRequirement,
    ) -> Result<Glyph> {
        let bake_size = self.font(font)?.bake_mode.bake_size(size);
        let blur = blur.round().clamp(0.0, MAX_EFFECT_RADIUS) as u8;
        let dilate = dilate.round().clamp(0.0, MAX_EFFECT_RADIUS) as u8;

        let key = GlyphKey {
            font,
            codepoint,
            size: (bake_size * 10.0).round() as u32,
            blur,
            dilate,
        };
        if let Some(glyph) = self.glyphs.get(&key) {
            return Ok(*glyph);
        }

        let (render_font, index) = self.resolve(font, codepoint)?;
        let mut glyph = Glyph {
            codepoint,
            index,
            font: render_font,
            size: bake_size,
            blur,
            dilate,
            x0: 0,
            y0: 0,
            x1: 0,
            y1: 0,
            x_off: 0,
            y_off: 0,
            advance: 0.0,
        };
        if bake_size <= 0.0 {
            return Ok(glyph);
        }

        let face = &mut self.fonts[render_font.0 as usize].face;
        glyph.advance = face.advance(index, bake_size);
        let placement = face.render_glyph(index, bake_size, &mut self.scratch)?;
        self.bake_count += 1;

        if placement.is_empty() {
            // Nothing to pack, but the advance is worth caching
            self.glyphs.insert(key, glyph);
            return Ok(glyph);
        }

        let pad = blur as u32 + dilate as u32 + 2;
        let gw = placement.width + pad * 2;
        let gh = placement.height + pad * 2;

        if gw > self.config.width || gh > self.config.height {
            if requirement == BitmapRequirement::Optional {
                return Ok(glyph);
            }
            tracing::warn!(
                "Glyph {:?} at {}px needs {}x{} texels, atlas is {}x{}",
                codepoint,
                bake_size,
                gw,
                gh,
                self.config.width,
                self.config.height
            );
            return Err(TextError::GlyphTooLarge {
                width: gw,
                height: gh,
                atlas_width: self.config.width,
                atlas_height: self.config.height,
            });
        }

        let Some((gx, gy)) = self.packer.allocate(gw, gh) else {
            return match requirement {
                // Metrics-only glyph, not cached so a later required lookup bakes it
                BitmapRequirement::Optional => Ok(glyph),
                BitmapRequirement::Required => {
                    tracing::trace!("Atlas full while baking {:?}", codepoint);
                    Err(TextError::AtlasFull)
                }
            };
        };

        let (w, h, pad_us) = (gw as usize, gh as usize, pad as usize);
        self.padded.clear();
        self.padded.resize(w * h, 0);
        let src_w = placement.width as usize;
        for row in 0..placement.height as usize {
            let dst = (row + pad_us) * w + pad_us;
            self.padded[dst..dst + src_w]
                .copy_from_slice(&self.scratch[row * src_w..(row + 1) * src_w]);
        }
        effects::dilate(&mut self.padded, w, h, w, dilate as u32, &mut self.effect_scratch);
        effects::blur(&mut self.padded, w, h, w, blur as u32);
        self.texture.blit(gx, gy, gw, gh, &self.padded);

        glyph.x0 = gx;
        glyph.y0 = gy;
        glyph.x1 = gx + gw;
        glyph.y1 = gy + gh;
        glyph.x_off = placement.left - pad as i32;
        glyph.y_off = -placement.top - pad as i32;

        tracing::trace!(
            "Baked {:?} ({}px, blur {}, dilate {}) at ({}, {})",
            codepoint,
            bake_size,
            blur,
            dilate,
            gx,
            gy
        );
        self.glyphs.insert(key, glyph);
        Ok(glyph)
    }
}

impl std::fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAtlas")
            .field("config", &self.config)
            .field("fonts", &self.fonts)
            .field("glyphs", &self.glyphs.len())
            .field("generation", &self.generation)
            .field("bake_count", &self.bake_count)
            .finish_non_exhaustive()
    }
}
