//! Vellum canvas
//!
//! Immediate-mode vector drawing that produces GPU-ready geometry. Paths are
//! recorded on a command tape, flattened into polylines, expanded into fill
//! and stroke triangles and batched into draw commands; text runs become
//! textured quads sampling the glyph atlas. No GPU API is touched here: a
//! frame ends as plain vertex, index and uniform arrays for a renderer to
//! upload.
//!
//! # Example
//!
//! ```ignore
//! use vellum_gpu::{Canvas, CanvasConfig};
//! use vellum_paint::Color;
//!
//! let mut canvas = Canvas::new(CanvasConfig::default().with_antialias(true));
//! canvas.begin_frame(800.0, 600.0, 2.0);
//! canvas.begin_path();
//! canvas.rounded_rect(10.0, 10.0, 200.0, 100.0, 8.0);
//! canvas.set_fill_color(Color::rgb(0.2, 0.4, 0.9));
//! canvas.fill()?;
//! let frame = canvas.end_frame()?;
//! renderer.draw(&frame);
//! ```

pub mod batch;
pub mod canvas;
pub mod config;
pub mod error;
pub mod expand;
pub mod flatten;
pub mod frame;
pub mod primitives;
pub mod uniform;

pub use batch::{Batcher, CallPath};
pub use canvas::{Canvas, TextMetrics};
pub use config::CanvasConfig;
pub use error::{CanvasError, Result};
pub use expand::{curve_divs, expand_fill, expand_stroke, StrokeParams};
pub use flatten::{Arena, FlatPath, PathCache, PathPoint, Reset, Tolerances};
pub use frame::{AtlasSnapshot, FrameOutput};
pub use primitives::{
    CallKind, CommandKind, DrawCall, DrawCommand, FragmentUniform, ShaderKind, Vertex,
};
pub use uniform::encode_paint;
