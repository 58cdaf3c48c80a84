//! Glyph atlas and text iteration for Vellum
//!
//! This crate provides:
//! - A pluggable rasterizer boundary ([`FontFace`]) with a swash/ttf-parser backend
//! - A glyph atlas with shelf packing, blur/dilate effects and full-reset eviction
//! - A reusable text cursor that turns UTF-8 into positioned glyph quads
//! - Word wrapping over the same cursor

pub mod atlas;
pub mod effects;
pub mod face;
pub mod font;
pub mod iter;
pub mod layout;
pub mod rasterizer;
pub mod utf8;

pub use atlas::{
    AtlasConfig, AtlasTexture, BitmapRequirement, FontAtlas, Glyph, GlyphKey, ShelfPacker,
    ATLAS_TEXTURE_FLAG,
};
pub use face::{FontFace, GlyphPlacement, VerticalMetrics};
pub use font::{BakeMode, Font, LineMetrics};
pub use iter::{classify, CodepointClass, GlyphQuad, Quads, TextIter, TextStep, TextStyle};
pub use layout::{break_lines, measure, TextRow};
pub use rasterizer::SwashFace;
pub use vellum_paint::FontId;

use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    #[error("Failed to load font: {0}")]
    FontLoad(String),

    #[error("Failed to parse font: {0}")]
    FontParse(String),

    #[error("No font registered with id {0:?}")]
    UnknownFont(FontId),

    #[error("Atlas is full, cannot allocate glyph")]
    AtlasFull,

    #[error("Glyph bitmap {width}x{height} does not fit an empty {atlas_width}x{atlas_height} atlas")]
    GlyphTooLarge {
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    #[error("Glyph rasterization failed: {0}")]
    Rasterize(String),
}

pub type Result<T> = std::result::Result<T, TextError>;
