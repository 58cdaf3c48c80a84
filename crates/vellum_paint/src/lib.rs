//! Vellum paint state
//!
//! The value types every other vellum crate builds on.
//!
//! # Features
//!
//! - Points, bounds and rectangles
//! - 2x3 affine transforms
//! - Colors and paints (solid, linear/radial/box gradients, image patterns)
//! - Render state and the save/restore state stack
//! - The path command tape, with arc and rounded-shape helpers

pub mod color;
pub mod paint;
pub mod path;
pub mod primitives;
pub mod state;
pub mod transform;

pub use color::Color;
pub use paint::{Paint, PaintTexture, TextureFormat, TextureId};
pub use path::{CommandTape, PathCommand, Winding, KAPPA90};
pub use primitives::*;
pub use state::{
    FontId, GlyphOutline, LineCap, LineJoin, RenderState, Scissor, StateStack, TextAlign,
    TextAlignment, TextAnchor,
};
pub use transform::Transform2D;
