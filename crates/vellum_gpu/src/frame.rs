//! Published frame data handed to a renderer backend

use vellum_paint::TextureId;

use crate::primitives::{DrawCommand, FragmentUniform, Vertex};

/// Pixels of a glyph atlas generation that was reset mid-frame.
///
/// Commands recorded before the reset still sample `texture`, so the backend
/// has to keep this content alive until the frame is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct AtlasSnapshot {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    /// Single-channel coverage, row-major
    pub pixels: Vec<u8>,
}

/// Everything a backend needs to draw one frame, in submission order
#[derive(Clone, Copy, Debug)]
pub struct FrameOutput<'a> {
    pub commands: &'a [DrawCommand],
    pub vertices: &'a [Vertex],
    pub indices: &'a [u32],
    pub uniforms: &'a [FragmentUniform],
    pub retired_atlases: &'a [AtlasSnapshot],
    /// Logical viewport size
    pub view_size: (f32, f32),
    pub device_px_ratio: f32,
}

impl FrameOutput<'_> {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.indices)
    }

    pub fn uniform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.uniforms)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
