//! Paint and scissor encoding

use vellum_paint::{Paint, Scissor, Transform2D};

use crate::primitives::{FragmentUniform, ShaderKind};

/// Encode a paint and scissor into the fragment uniform block.
///
/// `width` is the stroke width in device units (0 for fills), `fringe` the
/// anti-aliasing fringe width and `stroke_thr` the coverage below which
/// fragments are discarded (`-1` disables the test).
pub fn encode_paint(
    paint: &Paint,
    scissor: &Scissor,
    width: f32,
    fringe: f32,
    stroke_thr: f32,
) -> FragmentUniform {
    let mut uniform = FragmentUniform {
        inner_color: paint.inner_color.premultiplied(),
        outer_color: paint.outer_color.premultiplied(),
        ..Default::default()
    };

    if scissor.is_enabled() {
        let inverse = scissor.xform.inverse().unwrap_or_else(Transform2D::identity);
        let x = &scissor.xform;
        uniform.scissor_mat = inverse.to_mat3x4();
        uniform.scissor_extent = scissor.extent;
        uniform.scissor_scale = [
            (x.a * x.a + x.c * x.c).sqrt() / fringe,
            (x.b * x.b + x.d * x.d).sqrt() / fringe,
        ];
    } else {
        uniform.scissor_extent = [1.0, 1.0];
        uniform.scissor_scale = [1.0, 1.0];
    }

    uniform.extent = paint.extent;
    uniform.stroke_mult = (width * 0.5 + fringe * 0.5) / fringe;
    uniform.stroke_thr = stroke_thr;

    match paint.texture {
        Some(texture) => {
            uniform.kind = ShaderKind::FillImage as u32 as f32;
            uniform.tex_type = texture.format as u32 as f32;
        }
        None => {
            uniform.kind = ShaderKind::FillGradient as u32 as f32;
            uniform.radius = paint.radius;
            uniform.feather = paint.feather;
        }
    }

    let paint_inverse = paint.xform.inverse().unwrap_or_else(|| {
        tracing::trace!("singular paint transform, using identity");
        Transform2D::identity()
    });
    uniform.paint_mat = paint_inverse.to_mat3x4();
    uniform
}
