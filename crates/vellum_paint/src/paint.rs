//! Paints: solid colors, gradients and image patterns
//!
//! Every paint is described the same way: a transform into paint space, a
//! rounded box (`extent`, `radius`) and a `feather` distance over which
//! `inner_color` fades into `outer_color`. A solid color is the degenerate
//! box with zero extent and equal colors.

use crate::color::Color;
use crate::transform::Transform2D;

/// Renderer-owned texture handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TextureId(pub u32);

/// Texel layout of a texture sampled by a paint (must match shader constants)
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureFormat {
    /// RGBA with premultiplied alpha
    #[default]
    Rgba = 0,
    /// RGBA with straight alpha
    RgbaStraight = 1,
    /// Single-channel coverage (the glyph atlas)
    Alpha = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaintTexture {
    pub id: TextureId,
    pub format: TextureFormat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub xform: Transform2D,
    pub extent: [f32; 2],
    pub radius: f32,
    pub feather: f32,
    pub inner_color: Color,
    pub outer_color: Color,
    pub texture: Option<PaintTexture>,
}

impl Paint {
    pub fn solid(color: Color) -> Self {
        Self {
            xform: Transform2D::identity(),
            extent: [0.0, 0.0],
            radius: 0.0,
            feather: 1.0,
            inner_color: color,
            outer_color: color,
            texture: None,
        }
    }

    /// Linear gradient from `(sx, sy)` in `inner` to `(ex, ey)` in `outer`
    pub fn linear_gradient(sx: f32, sy: f32, ex: f32, ey: f32, inner: Color, outer: Color) -> Self {
        const LARGE: f32 = 1e5;

        let mut dx = ex - sx;
        let mut dy = ey - sy;
        let d = (dx * dx + dy * dy).sqrt();
        if d > 0.0001 {
            dx /= d;
            dy /= d;
        } else {
            dx = 0.0;
            dy = 1.0;
        }

        Self {
            xform: Transform2D::new(dy, -dx, dx, dy, sx - dx * LARGE, sy - dy * LARGE),
            extent: [LARGE, LARGE + d * 0.5],
            radius: 0.0,
            feather: d.max(1.0),
            inner_color: inner,
            outer_color: outer,
            texture: None,
        }
    }

    /// Radial gradient centered on `(cx, cy)`, fading between the two radii
    pub fn radial_gradient(
        cx: f32,
        cy: f32,
        inner_radius: f32,
        outer_radius: f32,
        inner: Color,
        outer: Color,
    ) -> Self {
        let r = (inner_radius + outer_radius) * 0.5;
        let f = outer_radius - inner_radius;
        Self {
            xform: Transform2D::translate(cx, cy),
            extent: [r, r],
            radius: r,
            feather: f.max(1.0),
            inner_color: inner,
            outer_color: outer,
            texture: None,
        }
    }

    /// Feathered rounded rectangle, the building block for drop shadows
    #[allow(clippy::too_many_arguments)]
    pub fn box_gradient(
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radius: f32,
        feather: f32,
        inner: Color,
        outer: Color,
    ) -> Self {
        Self {
            xform: Transform2D::translate(x + w * 0.5, y + h * 0.5),
            extent: [w * 0.5, h * 0.5],
            radius,
            feather: feather.max(1.0),
            inner_color: inner,
            outer_color: outer,
            texture: None,
        }
    }

    /// Image pattern whose top-left corner is `(ox, oy)`, one image spanning
    /// `w` x `h` and rotated by `angle` around the corner
    #[allow(clippy::too_many_arguments)]
    pub fn image_pattern(
        ox: f32,
        oy: f32,
        w: f32,
        h: f32,
        angle: f32,
        texture: TextureId,
        format: TextureFormat,
        alpha: f32,
    ) -> Self {
        let mut xform = Transform2D::rotate(angle);
        xform.e = ox;
        xform.f = oy;
        let tint = Color::new(1.0, 1.0, 1.0, alpha);
        Self {
            xform,
            extent: [w, h],
            radius: 0.0,
            feather: 0.0,
            inner_color: tint,
            outer_color: tint,
            texture: Some(PaintTexture {
                id: texture,
                format,
            }),
        }
    }

    /// Multiply both colors' alpha
    pub fn fade(&self, alpha: f32) -> Paint {
        Paint {
            inner_color: self.inner_color.fade(alpha),
            outer_color: self.outer_color.fade(alpha),
            ..*self
        }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::solid(color)
    }
}
