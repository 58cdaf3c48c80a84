//! Fill and stroke expansion
//!
//! Turns the flattened paths of a [`PathCache`] into vertices: fill fans with
//! optional anti-aliasing fringes, and stroke ribbons with joins and caps.
//! Vertex `u` carries edge coverage across the ribbon (0 and 1 at the outer
//! edges, 0.5 on the centre line) and `v` fades the butt-cap fringe.
//! The resulting ranges are written back onto each [`FlatPath`].

use std::f32::consts::PI;

use vellum_paint::{LineCap, LineJoin, Point};

use crate::error::{reserve, Result};
use crate::flatten::point_flags::{BEVEL, INNER_BEVEL, LEFT};
use crate::flatten::{calculate_joins, FlatPath, PathCache, PathPoint};
use crate::primitives::Vertex;

/// Miter limit for fill fringes
const FILL_MITER_LIMIT: f32 = 2.4;

/// Stroke geometry settings, in device units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeParams {
    pub half_width: f32,
    /// Anti-aliasing fringe width, 0 without anti-aliasing
    pub fringe: f32,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f32,
}

/// Segments needed per `arc` radians of a circle of radius `r`
pub fn curve_divs(r: f32, arc: f32, tol: f32) -> usize {
    let da = (r / (r + tol)).acos() * 2.0;
    ((arc / da).ceil() as usize).max(2)
}

#[inline]
fn push(verts: &mut Vec<Vertex>, p: Point, u: f32, v: f32) {
    verts.push(Vertex::new(p.x, p.y, u, v));
}

/// Left-hand normal of a direction
#[inline]
fn perp(d: Point) -> Point {
    Point::new(d.y, -d.x)
}

fn choose_bevel(inner_bevel: bool, p0: &PathPoint, p1: &PathPoint, w: f32) -> (Point, Point) {
    if inner_bevel {
        (p1.pos + perp(p0.d) * w, p1.pos + perp(p1.d) * w)
    } else {
        let p = p1.pos + p1.dm * w;
        (p, p)
    }
}

#[allow(clippy::too_many_arguments)]
fn bevel_join(
    verts: &mut Vec<Vertex>,
    p0: &PathPoint,
    p1: &PathPoint,
    lw: f32,
    rw: f32,
    lu: f32,
    ru: f32,
) {
    let dl0 = perp(p0.d);
    let dl1 = perp(p1.d);
    let c = p1.pos;

    if p1.has(LEFT) {
        let (l0, l1) = choose_bevel(p1.has(INNER_BEVEL), p0, p1, lw);
        push(verts, l0, lu, 1.0);
        push(verts, c - dl0 * rw, ru, 1.0);

        if p1.has(BEVEL) {
            push(verts, l0, lu, 1.0);
            push(verts, c - dl0 * rw, ru, 1.0);
            push(verts, l1, lu, 1.0);
            push(verts, c - dl1 * rw, ru, 1.0);
        } else {
            let r0 = c - p1.dm * rw;
            push(verts, c, 0.5, 1.0);
            push(verts, c - dl0 * rw, ru, 1.0);
            push(verts, r0, ru, 1.0);
            push(verts, r0, ru, 1.0);
            push(verts, c, 0.5, 1.0);
            push(verts, c - dl1 * rw, ru, 1.0);
        }

        push(verts, l1, lu, 1.0);
        push(verts, c - dl1 * rw, ru, 1.0);
    } else {
        let (r0, r1) = choose_bevel(p1.has(INNER_BEVEL), p0, p1, -rw);
        push(verts, c + dl0 * lw, lu, 1.0);
        push(verts, r0, ru, 1.0);

        if p1.has(BEVEL) {
            push(verts, c + dl0 * lw, lu, 1.0);
            push(verts, r0, ru, 1.0);
            push(verts, c + dl1 * lw, lu, 1.0);
            push(verts, r1, ru, 1.0);
        } else {
            let l0 = c + p1.dm * lw;
            push(verts, c + dl0 * lw, lu, 1.0);
            push(verts, c, 0.5, 1.0);
            push(verts, l0, lu, 1.0);
            push(verts, l0, lu, 1.0);
            push(verts, c + dl1 * lw, lu, 1.0);
            push(verts, c, 0.5, 1.0);
        }

        push(verts, c + dl1 * lw, lu, 1.0);
        push(verts, r1, ru, 1.0);
    }
}

#[allow(clippy::too_many_arguments)]
fn round_join(
    verts: &mut Vec<Vertex>,
    p0: &PathPoint,
    p1: &PathPoint,
    lw: f32,
    rw: f32,
    lu: f32,
    ru: f32,
    ncap: usize,
) {
    let dl0 = perp(p0.d);
    let dl1 = perp(p1.d);
    let c = p1.pos;

    if p1.has(LEFT) {
        let (l0, l1) = choose_bevel(p1.has(INNER_BEVEL), p0, p1, lw);
        let a0 = (-dl0.y).atan2(-dl0.x);
        let mut a1 = (-dl1.y).atan2(-dl1.x);
        if a1 > a0 {
            a1 -= PI * 2.0;
        }

        push(verts, l0, lu, 1.0);
        push(verts, c - dl0 * rw, ru, 1.0);

        let n = (((a0 - a1) / PI * ncap as f32).ceil() as usize).clamp(2, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let (sin, cos) = (a0 + u * (a1 - a0)).sin_cos();
            push(verts, c, 0.5, 1.0);
            push(verts, Point::new(c.x + cos * rw, c.y + sin * rw), ru, 1.0);
        }

        push(verts, l1, lu, 1.0);
        push(verts, c - dl1 * rw, ru, 1.0);
    } else {
        let (r0, r1) = choose_bevel(p1.has(INNER_BEVEL), p0, p1, -rw);
        let a0 = dl0.y.atan2(dl0.x);
        let mut a1 = dl1.y.atan2(dl1.x);
        if a1 < a0 {
            a1 += PI * 2.0;
        }

        push(verts, c + dl0 * rw, lu, 1.0);
        push(verts, r0, ru, 1.0);

        let n = (((a1 - a0) / PI * ncap as f32).ceil() as usize).clamp(2, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let (sin, cos) = (a0 + u * (a1 - a0)).sin_cos();
            push(verts, Point::new(c.x + cos * lw, c.y + sin * lw), lu, 1.0);
            push(verts, c, 0.5, 1.0);
        }

        push(verts, c + dl1 * rw, lu, 1.0);
        push(verts, r1, ru, 1.0);
    }
}

/// Butt or square cap; `offset` moves the cap line back along `-d`
#[allow(clippy::too_many_arguments)]
fn butt_cap_start(
    verts: &mut Vec<Vertex>,
    p: &PathPoint,
    d: Point,
    w: f32,
    offset: f32,
    aa: f32,
    u0: f32,
    u1: f32,
) {
    let c = p.pos - d * offset;
    let dl = perp(d);
    push(verts, c + dl * w - d * aa, u0, 0.0);
    push(verts, c - dl * w - d * aa, u1, 0.0);
    push(verts, c + dl * w, u0, 1.0);
    push(verts, c - dl * w, u1, 1.0);
}

#[allow(clippy::too_many_arguments)]
fn butt_cap_end(
    verts: &mut Vec<Vertex>,
    p: &PathPoint,
    d: Point,
    w: f32,
    offset: f32,
    aa: f32,
    u0: f32,
    u1: f32,
) {
    let c = p.pos + d * offset;
    let dl = perp(d);
    push(verts, c + dl * w, u0, 1.0);
    push(verts, c - dl * w, u1, 1.0);
    push(verts, c + dl * w + d * aa, u0, 0.0);
    push(verts, c - dl * w + d * aa, u1, 0.0);
}

fn round_cap_start(
    verts: &mut Vec<Vertex>,
    p: &PathPoint,
    d: Point,
    w: f32,
    ncap: usize,
    u0: f32,
    u1: f32,
) {
    let c = p.pos;
    let dl = perp(d);
    for i in 0..ncap {
        let a = i as f32 / (ncap - 1) as f32 * PI;
        let (sin, cos) = a.sin_cos();
        push(verts, c - dl * (cos * w) - d * (sin * w), u0, 1.0);
        push(verts, c, 0.5, 1.0);
    }
    push(verts, c + dl * w, u0, 1.0);
    push(verts, c - dl * w, u1, 1.0);
}

fn round_cap_end(
    verts: &mut Vec<Vertex>,
    p: &PathPoint,
    d: Point,
    w: f32,
    ncap: usize,
    u0: f32,
    u1: f32,
) {
    let c = p.pos;
    let dl = perp(d);
    push(verts, c + dl * w, u0, 1.0);
    push(verts, c - dl * w, u1, 1.0);
    for i in 0..ncap {
        let a = i as f32 / (ncap - 1) as f32 * PI;
        let (sin, cos) = a.sin_cos();
        push(verts, c, 0.5, 1.0);
        push(verts, c - dl * (cos * w) + d * (sin * w), u0, 1.0);
    }
}

fn range(start: usize, verts: &[Vertex]) -> (u32, u32) {
    (start as u32, (verts.len() - start) as u32)
}

/// Fill fans for every path, plus fringe strips of width `w` when `w > 0`.
///
/// The fan is inset by half the fringe. A single convex path only gets the
/// outer half of the fringe, so it can be drawn without stenciling.
pub fn expand_fill(
    cache: &mut PathCache,
    verts: &mut Vec<Vertex>,
    w: f32,
    corner_threshold: f32,
) -> Result<()> {
    let woff = 0.5 * w;
    let fringe = w > 0.0;

    let (paths, points) = cache.split_mut();
    calculate_joins(paths, points, w, LineJoin::Miter, FILL_MITER_LIMIT, corner_threshold);

    let mut estimate = 0;
    for path in paths.iter() {
        estimate += path.count + path.bevel_count + 1;
        if fringe {
            estimate += (path.count + path.bevel_count * 5 + 1) * 2;
        }
    }
    reserve(verts, estimate, "vertices")?;

    let convex = paths.len() == 1 && paths[0].convex;
    for path in paths.iter_mut() {
        let pts = &points[path.first..path.first + path.count];
        let n = pts.len();
        if n < 3 {
            tracing::trace!("fill of a path with {} points skipped", n);
            path.fill = range(verts.len(), verts);
            path.stroke = path.fill;
            continue;
        }

        let start = verts.len();
        for j in 0..n {
            let p0 = &pts[(j + n - 1) % n];
            let p1 = &pts[j];
            if !fringe {
                push(verts, p1.pos, 0.5, 1.0);
            } else if p1.has(BEVEL) {
                if p1.has(LEFT) {
                    push(verts, p1.pos + p1.dm * woff, 0.5, 1.0);
                } else {
                    push(verts, p1.pos + perp(p0.d) * woff, 0.5, 1.0);
                    push(verts, p1.pos + perp(p1.d) * woff, 0.5, 1.0);
                }
            } else {
                push(verts, p1.pos + p1.dm * woff, 0.5, 1.0);
            }
        }
        path.fill = range(start, verts);

        let start = verts.len();
        if fringe {
            let (lw, lu) = if convex { (woff, 0.5) } else { (w + woff, 0.0) };
            let (rw, ru) = (w - woff, 1.0);

            for j in 0..n {
                let p0 = &pts[(j + n - 1) % n];
                let p1 = &pts[j];
                if p1.has(BEVEL | INNER_BEVEL) {
                    bevel_join(verts, p0, p1, lw, rw, lu, ru);
                } else {
                    push(verts, p1.pos + p1.dm * lw, lu, 1.0);
                    push(verts, p1.pos - p1.dm * rw, ru, 1.0);
                }
            }
            close_strip(verts, start, lu, ru);
        }
        path.stroke = range(start, verts);
    }
    Ok(())
}

/// Repeat the first vertex pair of a strip to close the loop
fn close_strip(verts: &mut Vec<Vertex>, start: usize, u0: f32, u1: f32) {
    let (a, b) = (verts[start], verts[start + 1]);
    verts.push(Vertex::new(a.x, a.y, u0, 1.0));
    verts.push(Vertex::new(b.x, b.y, u1, 1.0));
}

/// Stroke ribbons for every path
pub fn expand_stroke(
    cache: &mut PathCache,
    verts: &mut Vec<Vertex>,
    params: &StrokeParams,
    tess_tol: f32,
    corner_threshold: f32,
) -> Result<()> {
    let aa = params.fringe;
    let ncap = curve_divs(params.half_width, PI, tess_tol);
    let w = params.half_width + aa * 0.5;
    // Without anti-aliasing the whole ribbon is fully covered
    let (u0, u1) = if aa == 0.0 { (0.5, 0.5) } else { (0.0, 1.0) };

    let (paths, points) = cache.split_mut();
    calculate_joins(
        paths,
        points,
        w,
        params.line_join,
        params.miter_limit,
        corner_threshold,
    );

    let mut estimate = 0;
    for path in paths.iter() {
        estimate += if params.line_join == LineJoin::Round {
            (path.count + path.bevel_count * (ncap + 2) + 1) * 2
        } else {
            (path.count + path.bevel_count * 5 + 1) * 2
        };
        if !path.closed {
            estimate += if params.line_cap == LineCap::Round {
                (ncap * 2 + 2) * 2
            } else {
                (3 + 3) * 2
            };
        }
    }
    reserve(verts, estimate, "vertices")?;

    for path in paths.iter_mut() {
        let pts = &points[path.first..path.first + path.count];
        let n = pts.len();
        path.fill = range(verts.len(), verts);
        if n < 2 {
            tracing::trace!("stroke of a path with {} points skipped", n);
            path.stroke = path.fill;
            continue;
        }

        let start = verts.len();
        let closed = path.closed;
        let (mut i0, mut i1, steps) = if closed { (n - 1, 0, n) } else { (0, 1, n - 2) };

        if !closed {
            let mut d = pts[i1].pos - pts[i0].pos;
            d.normalize();
            let p = &pts[i0];
            match params.line_cap {
                LineCap::Butt => butt_cap_start(verts, p, d, w, -aa * 0.5, aa, u0, u1),
                LineCap::Square => butt_cap_start(verts, p, d, w, w - aa, aa, u0, u1),
                LineCap::Round => round_cap_start(verts, p, d, w, ncap, u0, u1),
            }
        }

        for _ in 0..steps {
            let (p0, p1) = (&pts[i0], &pts[i1]);
            if p1.has(BEVEL | INNER_BEVEL) {
                if params.line_join == LineJoin::Round {
                    round_join(verts, p0, p1, w, w, u0, u1, ncap);
                } else {
                    bevel_join(verts, p0, p1, w, w, u0, u1);
                }
            } else {
                push(verts, p1.pos + p1.dm * w, u0, 1.0);
                push(verts, p1.pos - p1.dm * w, u1, 1.0);
            }
            i0 = i1;
            i1 += 1;
        }

        if closed {
            close_strip(verts, start, u0, u1);
        } else {
            let mut d = pts[i1].pos - pts[i0].pos;
            d.normalize();
            let p = &pts[i1];
            match params.line_cap {
                LineCap::Butt => butt_cap_end(verts, p, d, w, -aa * 0.5, aa, u0, u1),
                LineCap::Square => butt_cap_end(verts, p, d, w, w - aa, aa, u0, u1),
                LineCap::Round => round_cap_end(verts, p, d, w, ncap, u0, u1),
            }
        }

        path.stroke = range(start, verts);
    }
    Ok(())
}

/// Total vertices written for `paths`' fill and stroke ranges
pub fn vertex_total(paths: &[FlatPath]) -> u32 {
    paths.iter().map(|p| p.fill.1 + p.stroke.1).sum()
}
