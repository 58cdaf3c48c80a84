//! Canvas - immediate-mode 2D drawing
//!
//! [`Canvas`] records paths, fills, strokes and text for one frame at a time
//! and publishes them as GPU-ready buffers.
//!
//! # Architecture
//!
//! ```text
//! path calls ──► CommandTape ──► PathCache (flatten)
//!                                    │
//!                          expand_fill / expand_stroke
//!                                    │
//! text ──► TextIter + FontAtlas ─────┤
//!                                    ▼
//!                               Batcher (calls)
//!                                    │ end_frame
//!                                    ▼
//!                               FrameOutput
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use vellum_paint::{
    Bounds, Color, CommandTape, CornerRadius, FontId, GlyphOutline, LineCap, LineJoin, Paint,
    PaintTexture, Point, Rect, RenderState, Scissor, StateStack, TextAlign, TextAlignment,
    TextAnchor, TextureFormat, Transform2D, Winding,
};
use vellum_text::{
    break_lines, measure, AtlasConfig, BitmapRequirement, FontAtlas, FontFace, TextError,
    TextIter, TextRow, TextStyle,
};

use crate::batch::Batcher;
use crate::config::CanvasConfig;
use crate::error::{reserve, CanvasError, Result};
use crate::expand::{expand_fill, expand_stroke, vertex_total, StrokeParams};
use crate::flatten::{PathCache, Tolerances};
use crate::frame::{AtlasSnapshot, FrameOutput};
use crate::primitives::{CallKind, DrawCall, FragmentUniform, ShaderKind, Vertex};
use crate::uniform::encode_paint;

/// Widest stroke accepted, in device pixels
const MAX_STROKE_WIDTH: f32 = 200.0;
/// Largest transform scale text is rasterized at
const MAX_FONT_SCALE: f32 = 4.0;

/// Vertical metrics of the current font at the current size, in user units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextMetrics {
    pub ascender: f32,
    pub descender: f32,
    pub line_height: f32,
}

/// One glyph pass of a text run
struct GlyphRun {
    style: TextStyle,
    paint: Paint,
    /// Device pixels per user unit of the run
    scale: f32,
    /// Pen origin in user units
    origin: Point,
}

fn quantize(value: f32, step: f32) -> f32 {
    (value / step + 0.5).floor() * step
}

fn lock(atlas: &Mutex<FontAtlas>) -> Result<MutexGuard<'_, FontAtlas>> {
    atlas.lock().map_err(|_| CanvasError::AtlasPoisoned)
}

// ─────────────────────────────────────────────────────────────────────────────
// Canvas
// ─────────────────────────────────────────────────────────────────────────────

pub struct Canvas {
    config: CanvasConfig,
    states: StateStack,
    tape: CommandTape,
    cache: PathCache,
    /// Whether `cache` holds the flattened `tape`
    cache_valid: bool,
    tolerances: Tolerances,
    device_px_ratio: f32,
    view_size: (f32, f32),
    vertices: Vec<Vertex>,
    batch: Batcher,
    atlas: Arc<Mutex<FontAtlas>>,
    text_iter: TextIter,
    retired_atlases: Vec<AtlasSnapshot>,
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        let atlas_config =
            AtlasConfig::default().with_size(config.atlas_width, config.atlas_height);
        let atlas = Arc::new(Mutex::new(FontAtlas::new(atlas_config)));
        Self::with_atlas(config, atlas)
    }

    /// Canvas drawing text from an existing (possibly shared) atlas
    pub fn with_atlas(config: CanvasConfig, atlas: Arc<Mutex<FontAtlas>>) -> Self {
        Self {
            states: StateStack::new(),
            tape: CommandTape::new(),
            cache: PathCache::new(),
            cache_valid: false,
            tolerances: Tolerances::default(),
            device_px_ratio: 1.0,
            view_size: (0.0, 0.0),
            vertices: Vec::with_capacity(config.initial_vertices),
            batch: Batcher::new(config.initial_commands),
            atlas,
            text_iter: TextIter::new(),
            retired_atlases: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Start recording a frame of `width` x `height` logical pixels
    pub fn begin_frame(&mut self, width: f32, height: f32, device_px_ratio: f32) {
        let device_px_ratio = if device_px_ratio.is_finite() && device_px_ratio > 0.0 {
            device_px_ratio
        } else {
            tracing::warn!("invalid device pixel ratio {}, using 1.0", device_px_ratio);
            1.0
        };
        self.states.clear();
        self.tape.clear();
        self.cache_valid = false;
        self.device_px_ratio = device_px_ratio;
        self.tolerances = Tolerances::for_ratio(device_px_ratio);
        self.view_size = (width, height);
        self.vertices.clear();
        self.batch.clear();
        self.retired_atlases.clear();
        tracing::trace!("begin frame {}x{} @{}", width, height, device_px_ratio);
    }

    /// Drop everything recorded since `begin_frame`
    pub fn cancel_frame(&mut self) {
        self.states.clear();
        self.tape.clear();
        self.cache_valid = false;
        self.vertices.clear();
        self.batch.clear();
        self.retired_atlases.clear();
        tracing::trace!("frame cancelled");
    }

    /// Publish the recorded frame
    pub fn end_frame(&mut self) -> Result<FrameOutput<'_>> {
        self.batch.publish()?;
        tracing::debug!(
            calls = self.batch.calls().len(),
            commands = self.batch.commands().len(),
            vertices = self.vertices.len(),
            indices = self.batch.indices().len(),
            uniforms = self.batch.uniforms().len(),
            "frame published"
        );
        Ok(FrameOutput {
            commands: self.batch.commands(),
            vertices: &self.vertices,
            indices: self.batch.indices(),
            uniforms: self.batch.uniforms(),
            retired_atlases: &self.retired_atlases,
            view_size: self.view_size,
            device_px_ratio: self.device_px_ratio,
        })
    }

    // =========================================================================
    // State
    // =========================================================================

    fn state(&self) -> &RenderState {
        self.states.current()
    }

    fn state_mut(&mut self) -> &mut RenderState {
        self.states.current_mut()
    }

    pub fn save(&mut self) {
        self.states.save();
    }

    /// # Panics
    ///
    /// Panics without a matching [`save`](Self::save).
    pub fn restore(&mut self) {
        self.states.restore();
    }

    /// Reset the current state to defaults
    pub fn reset(&mut self) {
        self.states.reset();
    }

    pub fn state_depth(&self) -> usize {
        self.states.depth()
    }

    // === Transform ===

    pub fn set_transform(&mut self, xform: Transform2D) {
        self.state_mut().xform = xform;
    }

    pub fn reset_transform(&mut self) {
        self.state_mut().xform = Transform2D::identity();
    }

    /// Apply `xform` before the current transform
    pub fn transform(&mut self, xform: Transform2D) {
        let state = self.state_mut();
        state.xform = xform.then(&state.xform);
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.transform(Transform2D::translate(x, y));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.transform(Transform2D::rotate(angle));
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        self.transform(Transform2D::scale(x, y));
    }

    pub fn skew_x(&mut self, angle: f32) {
        self.transform(Transform2D::skew_x(angle));
    }

    pub fn skew_y(&mut self, angle: f32) {
        self.transform(Transform2D::skew_y(angle));
    }

    pub fn current_transform(&self) -> Transform2D {
        self.state().xform
    }

    // === Scissor ===

    /// Clip to `rect` in the current transform, replacing any previous scissor
    pub fn scissor(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let state = self.state_mut();
        state.scissor = Scissor::new(Rect::new(x, y, w, h), &state.xform);
    }

    /// Clip to the intersection of the current scissor and `rect`
    pub fn intersect_scissor(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let state = self.state_mut();
        state.scissor = state.scissor.intersect(Rect::new(x, y, w, h), &state.xform);
    }

    pub fn reset_scissor(&mut self) {
        self.state_mut().scissor.reset();
    }

    // === Paint ===

    /// Paint coordinates are interpreted in the current transform
    pub fn set_fill_paint(&mut self, paint: Paint) {
        let state = self.state_mut();
        state.fill = Paint {
            xform: paint.xform.then(&state.xform),
            ..paint
        };
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state_mut().fill = Paint::solid(color);
    }

    pub fn set_stroke_paint(&mut self, paint: Paint) {
        let state = self.state_mut();
        state.stroke = Paint {
            xform: paint.xform.then(&state.xform),
            ..paint
        };
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.state_mut().stroke = Paint::solid(color);
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.state_mut().stroke_width = width;
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.state_mut().line_join = join;
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state_mut().line_cap = cap;
    }

    pub fn set_miter_limit(&mut self, limit: f32) {
        self.state_mut().miter_limit = limit;
    }

    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.state_mut().alpha = alpha;
    }

    pub fn set_shape_anti_alias(&mut self, enabled: bool) {
        self.state_mut().shape_anti_alias = enabled;
    }

    // === Text state ===

    pub fn set_font(&mut self, font: FontId) {
        self.state_mut().font_id = font;
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.state_mut().font_size = size;
    }

    pub fn set_text_align(&mut self, horizontal: TextAlignment, vertical: TextAnchor) {
        self.state_mut().text_align = TextAlign::new(horizontal, vertical);
    }

    pub fn set_text_char_spacing(&mut self, spacing: f32) {
        self.state_mut().letter_spacing = spacing;
    }

    /// Line height as a multiple of the font's line height
    pub fn set_text_line_height(&mut self, line_height: f32) {
        self.state_mut().line_height = line_height;
    }

    pub fn set_text_blur(&mut self, blur: f32) {
        self.state_mut().font_blur = blur;
    }

    pub fn set_text_dilate(&mut self, dilate: f32) {
        self.state_mut().font_dilate = dilate;
    }

    /// Paint for glyphs instead of the fill paint; `None` goes back to the fill
    pub fn set_glyph_fill(&mut self, paint: Option<Paint>) {
        let state = self.state_mut();
        state.glyph_fill = paint.map(|p| Paint {
            xform: p.xform.then(&state.xform),
            ..p
        });
    }

    /// Outline drawn underneath glyphs, `width` pixels wide
    pub fn set_glyph_outline(&mut self, outline: Option<(Paint, f32)>) {
        let state = self.state_mut();
        state.glyph_outline = outline.map(|(paint, width)| GlyphOutline {
            paint: Paint {
                xform: paint.xform.then(&state.xform),
                ..paint
            },
            width,
        });
    }

    // =========================================================================
    // Paths
    // =========================================================================

    pub fn begin_path(&mut self) {
        self.tape.clear();
        self.cache_valid = false;
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.tape.move_to(&self.states.current().xform, Point::new(x, y));
        self.cache_valid = false;
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.tape.line_to(&self.states.current().xform, Point::new(x, y));
        self.cache_valid = false;
    }

    pub fn bezier_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let xform = self.states.current().xform;
        self.tape.bezier_to(
            &xform,
            Point::new(c1x, c1y),
            Point::new(c2x, c2y),
            Point::new(x, y),
        );
        self.cache_valid = false;
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let xform = self.states.current().xform;
        self.tape.quad_to(&xform, Point::new(cx, cy), Point::new(x, y));
        self.cache_valid = false;
    }

    /// Arc of `radius` tangent to the lines from the last point through
    /// `(x1, y1)` and on to `(x2, y2)`
    pub fn arc_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) {
        let xform = self.states.current().xform;
        let dist_tol = self.tolerances.dist_tol;
        self.tape.arc_to(
            &xform,
            Point::new(x1, y1),
            Point::new(x2, y2),
            radius,
            dist_tol,
        );
        self.cache_valid = false;
    }

    pub fn arc(&mut self, cx: f32, cy: f32, radius: f32, a0: f32, a1: f32, dir: Winding) {
        let xform = self.states.current().xform;
        self.tape.arc(&xform, Point::new(cx, cy), radius, a0, a1, dir);
        self.cache_valid = false;
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let xform = self.states.current().xform;
        self.tape.rect(&xform, Rect::new(x, y, w, h));
        self.cache_valid = false;
    }

    pub fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) {
        let xform = self.states.current().xform;
        self.tape.rounded_rect(&xform, Rect::new(x, y, w, h), radius);
        self.cache_valid = false;
    }

    pub fn rounded_rect_varying(&mut self, x: f32, y: f32, w: f32, h: f32, radii: CornerRadius) {
        let xform = self.states.current().xform;
        self.tape.rounded_rect_varying(&xform, Rect::new(x, y, w, h), radii);
        self.cache_valid = false;
    }

    pub fn ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32) {
        let xform = self.states.current().xform;
        self.tape.ellipse(&xform, Point::new(cx, cy), rx, ry);
        self.cache_valid = false;
    }

    pub fn circle(&mut self, cx: f32, cy: f32, radius: f32) {
        let xform = self.states.current().xform;
        self.tape.circle(&xform, Point::new(cx, cy), radius);
        self.cache_valid = false;
    }

    pub fn close_path(&mut self) {
        self.tape.close();
        self.cache_valid = false;
    }

    /// Winding of the current subpath: solid (counter-clockwise) or hole
    pub fn path_winding(&mut self, dir: Winding) {
        self.tape.winding(dir);
        self.cache_valid = false;
    }

    fn flatten_path(&mut self) -> Result<()> {
        if !self.cache_valid {
            self.cache.flatten(self.tape.commands(), &self.tolerances)?;
            self.cache_valid = true;
        }
        Ok(())
    }

    fn antialias(&self) -> bool {
        self.config.antialias && self.state().shape_anti_alias
    }

    /// Fill the current path with the fill paint
    pub fn fill(&mut self) -> Result<()> {
        let state = self.states.current();
        if state.scissor.collapsed {
            tracing::trace!("fill skipped, scissor is empty");
            return Ok(());
        }
        let paint = state.fill.fade(state.alpha);
        let scissor = state.scissor;
        let fringe = self.tolerances.fringe_width;
        let aa_width = if self.antialias() { fringe } else { 0.0 };

        self.flatten_path()?;
        expand_fill(
            &mut self.cache,
            &mut self.vertices,
            aa_width,
            self.config.corner_threshold,
        )?;
        if vertex_total(self.cache.paths()) == 0 {
            tracing::trace!("fill of an empty path skipped");
            return Ok(());
        }

        let convex = self.cache.paths().len() == 1 && self.cache.paths()[0].convex;
        let (path_offset, path_count) = self.batch.push_paths(self.cache.paths())?;
        let paint_uniform = encode_paint(&paint, &scissor, fringe, fringe, -1.0);
        let texture = paint.texture.map(|t| t.id);

        let call = if convex {
            let uniform = self.batch.push_uniform(paint_uniform)?;
            DrawCall {
                kind: CallKind::ConvexFill,
                uniforms: [uniform, uniform],
                texture,
                path_offset,
                path_count,
                triangle_offset: 0,
                triangle_count: 0,
            }
        } else {
            let bounds = self.cache.bounds;
            let triangle_offset = self.vertices.len() as u32;
            reserve(&mut self.vertices, 4, "vertices")?;
            self.vertices.extend_from_slice(&[
                Vertex::new(bounds.max.x, bounds.max.y, 0.5, 1.0),
                Vertex::new(bounds.max.x, bounds.min.y, 0.5, 1.0),
                Vertex::new(bounds.min.x, bounds.max.y, 0.5, 1.0),
                Vertex::new(bounds.min.x, bounds.min.y, 0.5, 1.0),
            ]);
            let stencil = self.batch.push_uniform(FragmentUniform::stencil())?;
            let cover = self.batch.push_uniform(paint_uniform)?;
            DrawCall {
                kind: CallKind::Fill,
                uniforms: [stencil, cover],
                texture,
                path_offset,
                path_count,
                triangle_offset,
                triangle_count: 4,
            }
        };
        self.batch.push_call(call)
    }

    /// Stroke the current path with the stroke paint
    pub fn stroke(&mut self) -> Result<()> {
        let state = self.states.current();
        if state.scissor.collapsed {
            tracing::trace!("stroke skipped, scissor is empty");
            return Ok(());
        }
        let fringe = self.tolerances.fringe_width;
        let scale = state.xform.average_scale();
        let mut width = (state.stroke_width * scale).clamp(0.0, MAX_STROKE_WIDTH);
        let mut paint = state.stroke;

        if width < fringe {
            // Thinner than a pixel: draw one fringe wide and fade by coverage
            let alpha = (width / fringe).clamp(0.0, 1.0);
            paint = paint.fade(alpha * alpha);
            width = fringe;
        }
        let paint = paint.fade(state.alpha);

        let params = StrokeParams {
            half_width: width * 0.5,
            fringe: if self.antialias() { fringe } else { 0.0 },
            line_cap: state.line_cap,
            line_join: state.line_join,
            miter_limit: state.miter_limit,
        };
        let scissor = state.scissor;

        self.flatten_path()?;
        expand_stroke(
            &mut self.cache,
            &mut self.vertices,
            &params,
            self.tolerances.tess_tol,
            self.config.corner_threshold,
        )?;
        if vertex_total(self.cache.paths()) == 0 {
            tracing::trace!("stroke of an empty path skipped");
            return Ok(());
        }

        let (path_offset, path_count) = self.batch.push_paths(self.cache.paths())?;
        let uniform = self
            .batch
            .push_uniform(encode_paint(&paint, &scissor, width, fringe, -1.0))?;
        self.batch.push_call(DrawCall {
            kind: CallKind::Stroke,
            uniforms: [uniform, uniform],
            texture: paint.texture.map(|t| t.id),
            path_offset,
            path_count,
            triangle_offset: 0,
            triangle_count: 0,
        })
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Device pixels per user unit for text under the current transform
    fn font_scale(&self) -> f32 {
        let scale = quantize(self.state().xform.average_scale(), 0.01).min(MAX_FONT_SCALE);
        scale * self.device_px_ratio
    }

    fn text_style(&self, scale: f32) -> TextStyle {
        let state = self.state();
        TextStyle {
            font: state.font_id,
            size: state.font_size * scale,
            letter_spacing: state.letter_spacing * scale,
            line_height: state.line_height,
            blur: state.font_blur * scale,
            dilate: state.font_dilate * scale,
        }
    }

    /// Pen origin of `text` at `(x, y)` after alignment, in user units
    fn text_origin(
        &self,
        atlas: &mut FontAtlas,
        style: &TextStyle,
        scale: f32,
        (x, y): (f32, f32),
        text: &str,
    ) -> Result<Point> {
        let align = self.state().text_align;
        let metrics = atlas.line_metrics(style.font, style.size)?;

        let x = match align.horizontal {
            TextAlignment::Left => x,
            TextAlignment::Center | TextAlignment::Right => {
                let (advance, _) = measure(atlas, style, text)?;
                let width = advance / scale;
                if align.horizontal == TextAlignment::Center {
                    x - width * 0.5
                } else {
                    x - width
                }
            }
        };
        let dy = match align.vertical {
            TextAnchor::Top => metrics.ascender,
            TextAnchor::Middle => (metrics.ascender + metrics.descender) * 0.5,
            TextAnchor::Baseline => 0.0,
            TextAnchor::Bottom => metrics.descender,
        };
        Ok(Point::new(x, y + dy / scale))
    }

    /// Draw `text` with the pen at `(x, y)`, returning the pen x after it
    pub fn text(&mut self, x: f32, y: f32, text: &str) -> Result<f32> {
        let scale = self.font_scale();
        if scale <= 0.0 {
            tracing::trace!("text skipped, transform collapses it");
            return Ok(x);
        }
        let style = self.text_style(scale);
        let atlas = Arc::clone(&self.atlas);
        let mut atlas = lock(&atlas)?;
        let origin = self.text_origin(&mut atlas, &style, scale, (x, y), text)?;

        let state = self.states.current();
        if state.scissor.collapsed {
            let (advance, _) = measure(&mut atlas, &style, text)?;
            return Ok(origin.x + advance / scale);
        }
        let alpha = state.alpha;
        let fill = state.glyph_fill.unwrap_or(state.fill).fade(alpha);
        let outline = state.glyph_outline;

        if let Some(outline) = outline {
            let run = GlyphRun {
                style: style.with_dilate(style.dilate + outline.width * scale),
                paint: outline.paint.fade(alpha),
                scale,
                origin,
            };
            self.draw_glyph_run(&mut atlas, &run, text)?;
        }

        let run = GlyphRun {
            style,
            paint: fill,
            scale,
            origin,
        };
        self.draw_glyph_run(&mut atlas, &run, text)
    }

    fn draw_glyph_run(
        &mut self,
        atlas: &mut FontAtlas,
        run: &GlyphRun,
        text: &str,
    ) -> Result<f32> {
        let invscale = 1.0 / run.scale;
        let xform = self.state().xform;
        let bytes = text.as_bytes();

        self.text_iter.set_style(run.style);
        self.text_iter.reset(
            run.origin.x * run.scale,
            run.origin.y * run.scale,
            BitmapRequirement::Required,
        );

        let mut start = self.vertices.len();
        let mut resets = 0;
        loop {
            let step = match self.text_iter.next_step(atlas, bytes) {
                Ok(Some(step)) => step,
                Ok(None) => break,
                Err(TextError::AtlasFull) if resets < self.config.max_atlas_resets_per_text => {
                    resets += 1;
                    self.flush_glyphs(atlas, run, start)?;
                    self.retire_atlas(atlas);
                    start = self.vertices.len();
                    continue;
                }
                Err(TextError::AtlasFull) => {
                    tracing::warn!(
                        "glyph atlas still full after {} reset(s), dropping the rest of {:?}",
                        resets,
                        text.get(self.text_iter.offset()..).unwrap_or("")
                    );
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let Some(q) = step.quad else {
                continue;
            };
            let corner =
                |x: f32, y: f32| xform.transform_point(Point::new(x * invscale, y * invscale));
            let c0 = corner(q.x0, q.y0);
            let c1 = corner(q.x1, q.y0);
            let c2 = corner(q.x1, q.y1);
            let c3 = corner(q.x0, q.y1);

            reserve(&mut self.vertices, 6, "vertices")?;
            self.vertices.extend_from_slice(&[
                Vertex::new(c0.x, c0.y, q.s0, q.t0),
                Vertex::new(c2.x, c2.y, q.s1, q.t1),
                Vertex::new(c1.x, c1.y, q.s1, q.t0),
                Vertex::new(c0.x, c0.y, q.s0, q.t0),
                Vertex::new(c3.x, c3.y, q.s0, q.t1),
                Vertex::new(c2.x, c2.y, q.s1, q.t1),
            ]);
        }

        self.flush_glyphs(atlas, run, start)?;
        Ok(self.text_iter.position().0 * invscale)
    }

    /// Emit a triangles call for the glyph vertices recorded since `start`
    fn flush_glyphs(&mut self, atlas: &FontAtlas, run: &GlyphRun, start: usize) -> Result<()> {
        let count = self.vertices.len() - start;
        if count == 0 {
            return Ok(());
        }

        let texture = atlas.texture_id();
        let paint = Paint {
            texture: Some(PaintTexture {
                id: texture,
                format: TextureFormat::Alpha,
            }),
            ..run.paint
        };
        let state = self.states.current();
        let mut uniform = encode_paint(
            &paint,
            &state.scissor,
            1.0,
            self.tolerances.fringe_width,
            -1.0,
        );
        uniform.kind = ShaderKind::Triangles as u32 as f32;
        uniform.font_size = run.style.size;

        let uniform = self.batch.push_uniform(uniform)?;
        self.batch.push_call(DrawCall {
            kind: CallKind::Triangles,
            uniforms: [uniform, uniform],
            texture: Some(texture),
            path_offset: 0,
            path_count: 0,
            triangle_offset: start as u32,
            triangle_count: count as u32,
        })
    }

    /// Keep the full atlas' pixels for draws already recorded, then clear it
    fn retire_atlas(&mut self, atlas: &mut FontAtlas) {
        let (width, height) = atlas.texture().dimensions();
        self.retired_atlases.push(AtlasSnapshot {
            texture: atlas.texture_id(),
            width,
            height,
            pixels: atlas.texture().pixels().to_vec(),
        });
        tracing::warn!(
            "glyph atlas {:?} full mid-frame, resetting",
            atlas.texture_id()
        );
        atlas.reset(width, height);
    }

    /// Advance of `text` and its bounds, aligned like [`text`](Self::text)
    /// would draw it. Never bakes into a full atlas.
    pub fn text_bounds(&mut self, x: f32, y: f32, text: &str) -> Result<(f32, Bounds)> {
        let scale = self.font_scale();
        if scale <= 0.0 {
            return Ok((0.0, Bounds::EMPTY));
        }
        let style = self.text_style(scale);
        let atlas = Arc::clone(&self.atlas);
        let mut atlas = lock(&atlas)?;
        let origin = self.text_origin(&mut atlas, &style, scale, (x, y), text)?;
        let (advance, bounds) = measure(&mut atlas, &style, text)?;

        let invscale = 1.0 / scale;
        let bounds = Bounds::new(
            Point::new(
                origin.x + bounds.min.x * invscale,
                origin.y + bounds.min.y * invscale,
            ),
            Point::new(
                origin.x + bounds.max.x * invscale,
                origin.y + bounds.max.y * invscale,
            ),
        );
        Ok((advance * invscale, bounds))
    }

    /// Metrics of the current font, `None` if it is not registered
    pub fn text_metrics(&self) -> Option<TextMetrics> {
        let scale = self.font_scale();
        if scale <= 0.0 {
            return None;
        }
        let state = self.state();
        let atlas = self.atlas.lock().ok()?;
        let metrics = atlas
            .line_metrics(state.font_id, state.font_size * scale)
            .ok()?;
        let invscale = 1.0 / scale;
        Some(TextMetrics {
            ascender: metrics.ascender * invscale,
            descender: metrics.descender * invscale,
            line_height: metrics.line_height * invscale,
        })
    }

    /// Wrap `text` into rows at most `break_width` wide, in user units
    pub fn text_break_lines(&mut self, text: &str, break_width: f32) -> Result<Vec<TextRow>> {
        let scale = self.font_scale();
        if scale <= 0.0 {
            return Ok(Vec::new());
        }
        let style = self.text_style(scale);
        let mut atlas = lock(&self.atlas)?;
        let mut rows = break_lines(&mut atlas, &style, text, break_width * scale)?;

        let invscale = 1.0 / scale;
        for row in &mut rows {
            row.width *= invscale;
            row.min_x *= invscale;
            row.max_x *= invscale;
        }
        Ok(rows)
    }

    /// Draw `text` wrapped at `break_width`, each row aligned within the box
    /// according to the horizontal alignment
    pub fn text_box(&mut self, x: f32, mut y: f32, break_width: f32, text: &str) -> Result<()> {
        let Some(metrics) = self.text_metrics() else {
            tracing::trace!("text box skipped, no such font");
            return Ok(());
        };
        let rows = self.text_break_lines(text, break_width)?;
        let align = self.state().text_align;
        let line_height = metrics.line_height * self.state().line_height;

        self.state_mut().text_align = TextAlign::new(TextAlignment::Left, align.vertical);
        let result = rows.iter().try_for_each(|row| -> Result<()> {
            let row_x = match align.horizontal {
                TextAlignment::Left => x,
                TextAlignment::Center => x + break_width * 0.5 - row.width * 0.5,
                TextAlignment::Right => x + break_width - row.width,
            };
            self.text(row_x, y, text.get(row.start..row.end).unwrap_or(""))?;
            y += line_height;
            Ok(())
        });
        self.state_mut().text_align = align;
        result
    }

    // =========================================================================
    // Fonts
    // =========================================================================

    pub fn create_font(&mut self, name: &str, face: Box<dyn FontFace>) -> Result<FontId> {
        Ok(lock(&self.atlas)?.add_font(name, face))
    }

    /// Register TTF/OTF bytes
    pub fn create_font_data(&mut self, name: &str, data: Vec<u8>) -> Result<FontId> {
        Ok(lock(&self.atlas)?.add_font_data(name, data)?)
    }

    pub fn find_font(&self, name: &str) -> Option<FontId> {
        self.atlas.lock().ok()?.find_font(name)
    }

    pub fn add_fallback_font(&mut self, base: FontId, fallback: FontId) -> Result<()> {
        Ok(lock(&self.atlas)?.add_fallback(base, fallback)?)
    }

    /// Shared handle to the glyph atlas, for uploading its texture
    pub fn font_atlas(&self) -> Arc<Mutex<FontAtlas>> {
        Arc::clone(&self.atlas)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("config", &self.config)
            .field("view_size", &self.view_size)
            .field("device_px_ratio", &self.device_px_ratio)
            .field("vertices", &self.vertices.len())
            .field("calls", &self.batch.calls().len())
            .finish_non_exhaustive()
    }
}
