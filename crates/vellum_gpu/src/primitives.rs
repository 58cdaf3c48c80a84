//! GPU records
//!
//! Defines GPU-ready data structures that match the shader layouts. All
//! uploaded structures use `#[repr(C)]` and implement `bytemuck::Pod` for
//! safe buffer copies.

use vellum_paint::TextureId;

/// A vertex of fill, stroke or text geometry
///
/// Memory layout:
/// - position: `vec2<f32>` (8 bytes)
/// - uv: `vec2<f32>`       (8 bytes) - anti-aliasing coverage for paths,
///   atlas coordinates for text
///   Total: 16 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { x, y, u, v }
    }
}

/// Fragment shader variants (must match shader constants)
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShaderKind {
    /// Solid color or gradient
    #[default]
    FillGradient = 0,
    /// Image pattern
    FillImage = 1,
    /// Writes the stencil buffer only
    Stencil = 2,
    /// Textured triangles (glyph quads)
    Triangles = 3,
}

/// Per-draw fragment uniforms (matches shader `FragUniforms` struct)
///
/// Memory layout:
/// - scissor_mat: `mat3x4<f32>`  (48 bytes) - inverse scissor transform
/// - paint_mat: `mat3x4<f32>`    (48 bytes) - inverse paint transform
/// - inner_color: `vec4<f32>`    (16 bytes) - premultiplied
/// - outer_color: `vec4<f32>`    (16 bytes) - premultiplied
/// - scissor_extent: `vec2<f32>` (8 bytes)
/// - scissor_scale: `vec2<f32>`  (8 bytes)
/// - extent: `vec2<f32>`         (8 bytes)
/// - radius: `f32`               (4 bytes)
/// - feather: `f32`              (4 bytes)
/// - stroke_mult: `f32`          (4 bytes)
/// - stroke_thr: `f32`           (4 bytes)
/// - tex_type: `f32`             (4 bytes) - 0 premultiplied RGBA, 1 straight RGBA, 2 alpha
/// - kind: `f32`                 (4 bytes) - [`ShaderKind`]
/// - font_size: `f32`            (4 bytes)
/// - _pad: `vec3<f32>`           (12 bytes)
///   Total: 192 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragmentUniform {
    pub scissor_mat: [[f32; 4]; 3],
    pub paint_mat: [[f32; 4]; 3],
    pub inner_color: [f32; 4],
    pub outer_color: [f32; 4],
    pub scissor_extent: [f32; 2],
    pub scissor_scale: [f32; 2],
    pub extent: [f32; 2],
    pub radius: f32,
    pub feather: f32,
    pub stroke_mult: f32,
    pub stroke_thr: f32,
    pub tex_type: f32,
    pub kind: f32,
    pub font_size: f32,
    pub _pad: [f32; 3],
}

impl Default for FragmentUniform {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl FragmentUniform {
    /// Uniform for the stencil pass of a non-convex fill
    pub fn stencil() -> Self {
        Self {
            stroke_thr: -1.0,
            kind: ShaderKind::Stencil as u32 as f32,
            ..Default::default()
        }
    }

    pub fn shader_kind(&self) -> ShaderKind {
        match self.kind as u32 {
            1 => ShaderKind::FillImage,
            2 => ShaderKind::Stencil,
            3 => ShaderKind::Triangles,
            _ => ShaderKind::FillGradient,
        }
    }

    /// Bitwise equality, used to share uniform slots between draws
    pub fn same_bits(&self, other: &FragmentUniform) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

/// What a staged draw call renders
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Arbitrary (possibly self-intersecting, multi-path) fill: stencil then cover
    Fill,
    /// Single convex path filled directly
    ConvexFill,
    Stroke,
    /// Pre-built triangles, used for text
    Triangles,
}

/// A draw call as recorded during the frame.
///
/// Path geometry is referenced through `path_offset..path_offset + path_count`
/// in the batcher's [`CallPath`](crate::CallPath) list; the cover quad or text
/// triangles through `triangle_offset..triangle_offset + triangle_count` in
/// the vertex arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub kind: CallKind,
    /// Uniform slots; only `Fill` uses the second (stencil, then paint)
    pub uniforms: [u32; 2],
    pub texture: Option<TextureId>,
    pub path_offset: u32,
    pub path_count: u32,
    pub triangle_offset: u32,
    pub triangle_count: u32,
}

/// Render pass step of a published draw command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Increment/decrement stencil with the path fans, no color writes
    StencilFill,
    /// Anti-aliasing fringe strips, drawn where the stencil is zero
    Fringe,
    /// Quad over the fill bounds, drawn where the stencil is non-zero (then cleared)
    Cover,
    ConvexFill,
    Stroke,
    Triangles,
}

/// A published draw command: an indexed triangle-list draw plus the state it
/// runs with
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    pub kind: CommandKind,
    /// Call the command was generated from
    pub call: CallKind,
    /// Index into the frame's uniform array
    pub uniform: u32,
    pub texture: Option<TextureId>,
    pub index_offset: u32,
    pub index_count: u32,
    /// Span of vertices the indices refer to (informational)
    pub vertex_offset: u32,
    pub vertex_count: u32,
}
