//! Path cache and flattener
//!
//! The command tape is flattened into polylines: curves are subdivided until
//! flat within the tessellation tolerance, near-duplicate points are merged,
//! closed subpaths lose their repeated end point and every polygon is turned
//! to its requested winding. Each point then carries the unit direction and
//! length of its outgoing segment.
//!
//! Storage is pooled: paths and points live in [`Arena`]s whose slots are
//! reset and reused frame after frame.

use std::f32::consts::PI;

use vellum_paint::{Bounds, LineJoin, PathCommand, Point, Winding};

use crate::error::{reserve, Result};

/// Deepest curve subdivision
const MAX_TESSELLATION_DEPTH: u32 = 10;
/// Upper bound on the miter vector scale (1/|dm|^2) near 180° turns
const MAX_MITER_SCALE: f32 = 600.0;

/// Point flags
pub mod point_flags {
    /// Explicit vertex (segment or curve end point)
    pub const CORNER: u8 = 0x01;
    /// The path turns left here
    pub const LEFT: u8 = 0x02;
    /// Outer side of the join is bevelled
    pub const BEVEL: u8 = 0x04;
    /// Inner miter would overshoot a neighbouring segment
    pub const INNER_BEVEL: u8 = 0x08;
}

use point_flags::{BEVEL, CORNER, INNER_BEVEL, LEFT};

/// Values that are recycled instead of reallocated
pub trait Reset {
    fn reset(&mut self);
}

/// A flattened path vertex
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PathPoint {
    pub pos: Point,
    /// Unit direction towards the next point
    pub d: Point,
    /// Distance to the next point
    pub len: f32,
    /// Averaged segment normal scaled to miter length
    pub dm: Point,
    pub flags: u8,
}

impl PathPoint {
    pub fn has(&self, flags: u8) -> bool {
        self.flags & flags != 0
    }
}

impl Reset for PathPoint {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A flattened subpath: a run of points in the cache plus the vertex ranges
/// its fill and stroke geometry were written to
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatPath {
    pub first: usize,
    pub count: usize,
    pub closed: bool,
    pub convex: bool,
    pub winding: Winding,
    pub bevel_count: usize,
    pub bounds: Bounds,
    /// Fill fan (offset, count) in the frame vertex arena
    pub fill: (u32, u32),
    /// Stroke strip or fill fringe (offset, count) in the frame vertex arena
    pub stroke: (u32, u32),
}

impl Default for FlatPath {
    fn default() -> Self {
        Self {
            first: 0,
            count: 0,
            closed: false,
            convex: false,
            winding: Winding::CounterClockwise,
            bevel_count: 0,
            bounds: Bounds::EMPTY,
            fill: (0, 0),
            stroke: (0, 0),
        }
    }
}

impl Reset for FlatPath {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Growable pool whose slots survive [`clear`](Arena::clear) and are reset on
/// reuse
#[derive(Clone, Debug)]
pub struct Arena<T> {
    items: Vec<T>,
    len: usize,
    name: &'static str,
}

impl<T: Reset + Default> Arena<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            items: Vec::new(),
            len: 0,
            name,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots allocated so far, live or not
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Hand out a reset slot
    pub fn alloc(&mut self) -> Result<&mut T> {
        if self.len < self.items.len() {
            self.items[self.len].reset();
        } else {
            reserve(&mut self.items, 1, self.name)?;
            self.items.push(T::default());
        }
        self.len += 1;
        Ok(&mut self.items[self.len - 1])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items[..self.len]
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }
}

/// Tolerances derived from the device pixel ratio
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    /// Curve flatness
    pub tess_tol: f32,
    /// Points closer than this are merged
    pub dist_tol: f32,
    /// Width of the anti-aliasing fringe
    pub fringe_width: f32,
}

impl Tolerances {
    pub fn for_ratio(ratio: f32) -> Self {
        Self {
            tess_tol: 0.25 / ratio,
            dist_tol: 0.01 / ratio,
            fringe_width: 1.0 / ratio,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::for_ratio(1.0)
    }
}

/// Flattened paths of the current command tape
#[derive(Clone, Debug)]
pub struct PathCache {
    points: Arena<PathPoint>,
    paths: Arena<FlatPath>,
    /// Union of all path bounds
    pub bounds: Bounds,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            points: Arena::new("path points"),
            paths: Arena::new("paths"),
            bounds: Bounds::EMPTY,
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.paths.clear();
        self.bounds.reset();
    }

    pub fn paths(&self) -> &[FlatPath] {
        self.paths.as_slice()
    }

    pub fn points(&self) -> &[PathPoint] {
        self.points.as_slice()
    }

    pub fn path_points(&self, path: &FlatPath) -> &[PathPoint] {
        &self.points.as_slice()[path.first..path.first + path.count]
    }

    /// Paths and points together, for passes that update both
    pub(crate) fn split_mut(&mut self) -> (&mut [FlatPath], &mut [PathPoint]) {
        (self.paths.as_mut_slice(), self.points.as_mut_slice())
    }

    /// Replace the cache contents with the flattened `commands`
    pub fn flatten(&mut self, commands: &[PathCommand], tol: &Tolerances) -> Result<()> {
        self.clear();

        for command in commands {
            match *command {
                PathCommand::MoveTo(p) => {
                    self.add_path()?;
                    self.add_point(p, CORNER, tol.dist_tol)?;
                }
                PathCommand::LineTo(p) => {
                    self.add_point(p, CORNER, tol.dist_tol)?;
                }
                PathCommand::BezierTo { c1, c2, end } => match self.last_point() {
                    Some(last) => self.tessellate_bezier(last, c1, c2, end, 0, CORNER, tol)?,
                    None => tracing::trace!("bezier_to without a current point, skipped"),
                },
                PathCommand::Close => {
                    if let Some(path) = self.paths.last_mut() {
                        path.closed = true;
                    }
                }
                PathCommand::Winding(winding) => {
                    if let Some(path) = self.paths.last_mut() {
                        path.winding = winding;
                    }
                }
            }
        }

        let (paths, points) = self.split_mut();
        let mut bounds = Bounds::EMPTY;
        for path in paths.iter_mut() {
            finish_path(path, points, tol.dist_tol);
            if path.count > 0 {
                bounds.union(&path.bounds);
            }
        }
        self.bounds = bounds;
        Ok(())
    }

    fn add_path(&mut self) -> Result<()> {
        let first = self.points.len();
        let path = self.paths.alloc()?;
        path.first = first;
        Ok(())
    }

    fn last_point(&self) -> Option<Point> {
        let path = self.paths.as_slice().last()?;
        if path.count == 0 {
            return None;
        }
        Some(self.points.as_slice()[path.first + path.count - 1].pos)
    }

    fn add_point(&mut self, pos: Point, flags: u8, dist_tol: f32) -> Result<()> {
        let Some(path) = self.paths.as_slice().last().copied() else {
            tracing::trace!("point without a current path, skipped");
            return Ok(());
        };

        if path.count > 0 {
            let last = &mut self.points.as_mut_slice()[path.first + path.count - 1];
            if last.pos.approx_eq(pos, dist_tol) {
                last.flags |= flags;
                return Ok(());
            }
        }

        let point = self.points.alloc()?;
        point.pos = pos;
        point.flags = flags;
        if let Some(path) = self.paths.last_mut() {
            path.count += 1;
        }
        Ok(())
    }

    /// Subdivide a cubic until flat; only the final point gets `flags`
    #[allow(clippy::too_many_arguments)]
    fn tessellate_bezier(
        &mut self,
        p1: Point,
        p2: Point,
        p3: Point,
        p4: Point,
        level: u32,
        flags: u8,
        tol: &Tolerances,
    ) -> Result<()> {
        let dx = p4.x - p1.x;
        let dy = p4.y - p1.y;
        let d2 = ((p2.x - p4.x) * dy - (p2.y - p4.y) * dx).abs();
        let d3 = ((p3.x - p4.x) * dy - (p3.y - p4.y) * dx).abs();

        let flat = (d2 + d3) * (d2 + d3) < tol.tess_tol * tol.tess_tol * (dx * dx + dy * dy);
        if flat || level >= MAX_TESSELLATION_DEPTH {
            return self.add_point(p4, flags, tol.dist_tol);
        }

        let p12 = (p1 + p2) * 0.5;
        let p23 = (p2 + p3) * 0.5;
        let p34 = (p3 + p4) * 0.5;
        let p123 = (p12 + p23) * 0.5;
        let p234 = (p23 + p34) * 0.5;
        let p1234 = (p123 + p234) * 0.5;

        self.tessellate_bezier(p1, p12, p123, p1234, level + 1, 0, tol)?;
        self.tessellate_bezier(p1234, p234, p34, p4, level + 1, flags, tol)
    }
}

/// Twice the signed area of triangle (a, b, c)
fn tri_area2(a: Point, b: Point, c: Point) -> f32 {
    let ab = b - a;
    let ac = c - a;
    ac.x * ab.y - ab.x * ac.y
}

fn poly_area(points: &[PathPoint]) -> f32 {
    let mut area = 0.0;
    for i in 2..points.len() {
        area += tri_area2(points[0].pos, points[i - 1].pos, points[i].pos);
    }
    area * 0.5
}

/// Close, orient and measure one path once all its points are in
fn finish_path(path: &mut FlatPath, points: &mut [PathPoint], dist_tol: f32) {
    let pts = &mut points[path.first..path.first + path.count];

    // A repeated start point closes the path
    if pts.len() > 1 && pts[pts.len() - 1].pos.approx_eq(pts[0].pos, dist_tol) {
        path.count -= 1;
        path.closed = true;
    }
    let pts = &mut pts[..path.count];

    if pts.len() > 2 {
        let area = poly_area(pts);
        let reverse = match path.winding {
            Winding::CounterClockwise => area < 0.0,
            Winding::Clockwise => area > 0.0,
        };
        if reverse {
            pts.reverse();
        }
    }

    path.bounds.reset();
    let n = pts.len();
    for i in 0..n {
        let next = pts[(i + 1) % n].pos;
        let p = &mut pts[i];
        p.d = next - p.pos;
        p.len = p.d.normalize();
        path.bounds.include(p.pos);
    }
}

/// Per-point join data for strokes (and fill fringes) of half-width `w`.
///
/// Sets `dm`, the `LEFT`/`BEVEL`/`INNER_BEVEL` flags, each path's bevel count
/// and its convexity. Curve samples turning sharper than `corner_threshold`
/// are joined like explicit corners.
pub fn calculate_joins(
    paths: &mut [FlatPath],
    points: &mut [PathPoint],
    w: f32,
    line_join: LineJoin,
    miter_limit: f32,
    corner_threshold: f32,
) {
    let iw = if w > 0.0 { 1.0 / w } else { 0.0 };

    for path in paths.iter_mut() {
        let pts = &mut points[path.first..path.first + path.count];
        let n = pts.len();
        let mut nleft = 0;
        let mut turn = 0.0f32;
        path.bevel_count = 0;

        for i in 0..n {
            let p0 = pts[(i + n - 1) % n];
            let p1 = &mut pts[i];

            let dl0 = Point::new(p0.d.y, -p0.d.x);
            let dl1 = Point::new(p1.d.y, -p1.d.x);
            p1.dm = (dl0 + dl1) * 0.5;
            let dmr2 = p1.dm.length_squared();
            if dmr2 > 1e-6 {
                p1.dm = p1.dm * (1.0 / dmr2).min(MAX_MITER_SCALE);
            }

            let corner = p1.has(CORNER) || p0.d.dot(p1.d) < corner_threshold;
            p1.flags &= CORNER;

            let cross = p0.d.cross(p1.d);
            turn += cross.atan2(p0.d.dot(p1.d));
            if cross > 0.0 {
                nleft += 1;
                p1.flags |= LEFT;
            }

            let limit = (p0.len.min(p1.len) * iw).max(1.01);
            if dmr2 * limit * limit < 1.0 {
                p1.flags |= INNER_BEVEL;
            }

            if corner
                && (dmr2 * miter_limit * miter_limit < 1.0
                    || line_join == LineJoin::Bevel
                    || line_join == LineJoin::Round)
            {
                p1.flags |= BEVEL;
            }

            if p1.has(BEVEL | INNER_BEVEL) {
                path.bevel_count += 1;
            }
        }

        // A simple convex loop turns exactly once; stars wind around twice or more
        path.convex = n > 0 && nleft == n && turn.abs() < 3.0 * PI;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use vellum_paint::{CommandTape, Rect, Transform2D};

    fn flatten(tape: &CommandTape, tol: &Tolerances) -> PathCache {
        let mut cache = PathCache::new();
        cache.flatten(tape.commands(), tol).unwrap();
        cache
    }

    fn curve_tape() -> CommandTape {
        let id = Transform2D::identity();
        let mut tape = CommandTape::new();
        tape.move_to(&id, Point::new(0.0, 0.0));
        tape.bezier_to(
            &id,
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
        );
        tape
    }

    /// Distance from `p` to the cubic, approximated by dense sampling
    fn distance_to_curve(p: Point) -> f32 {
        let (p0, p1, p2, p3) = (
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
        );
        (0..=4000)
            .map(|i| {
                let t = i as f32 / 4000.0;
                let u = 1.0 - t;
                let q = p0 * (u * u * u)
                    + p1 * (3.0 * u * u * t)
                    + p2 * (3.0 * u * t * t)
                    + p3 * (t * t * t);
                (q - p).length()
            })
            .fold(f32::MAX, f32::min)
    }

    #[test]
    fn test_flatten_rect() {
        let mut tape = CommandTape::new();
        tape.rect(&Transform2D::identity(), Rect::new(10.0, 20.0, 30.0, 40.0));
        let cache = flatten(&tape, &Tolerances::default());

        assert_eq!(cache.paths().len(), 1);
        let path = cache.paths()[0];
        assert_eq!(path.count, 4);
        assert!(path.closed);
        assert_eq!(cache.bounds.min, Point::new(10.0, 20.0));
        assert_eq!(cache.bounds.max, Point::new(40.0, 60.0));
        for p in cache.path_points(&path) {
            assert!(p.has(CORNER));
            assert!((p.d.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_curve_points_within_tolerance() {
        let tol = Tolerances::default();
        let cache = flatten(&curve_tape(), &tol);
        let path = cache.paths()[0];
        assert!(path.count > 8);
        for p in cache.path_points(&path) {
            assert!(distance_to_curve(p.pos) < tol.tess_tol + 0.05);
        }
        // Interior curve samples are not explicit corners
        let corners = cache.path_points(&path).iter().filter(|p| p.has(CORNER)).count();
        assert_eq!(corners, 2);
    }

    #[test]
    fn test_coarser_tolerance_never_adds_points() {
        let tape = curve_tape();
        let mut last = usize::MAX;
        for ratio in [8.0, 4.0, 2.0, 1.0, 0.5, 0.25] {
            let cache = flatten(&tape, &Tolerances::for_ratio(ratio));
            let count = cache.paths()[0].count;
            assert!(count <= last, "ratio {} produced {} > {}", ratio, count, last);
            last = count;
        }
    }

    #[test]
    fn test_repeated_start_point_closes_path() {
        let id = Transform2D::identity();
        let mut tape = CommandTape::new();
        tape.move_to(&id, Point::new(0.0, 0.0));
        tape.line_to(&id, Point::new(10.0, 0.0));
        tape.line_to(&id, Point::new(10.0, 10.0));
        tape.line_to(&id, Point::new(0.0, 0.0));
        let cache = flatten(&tape, &Tolerances::default());
        let path = cache.paths()[0];
        assert!(path.closed);
        assert_eq!(path.count, 3);
    }

    #[test]
    fn test_near_duplicate_points_merge() {
        let id = Transform2D::identity();
        let mut tape = CommandTape::new();
        tape.move_to(&id, Point::new(0.0, 0.0));
        tape.line_to(&id, Point::new(10.0, 0.0));
        tape.line_to(&id, Point::new(10.001, 0.0));
        tape.line_to(&id, Point::new(10.0, 10.0));
        let cache = flatten(&tape, &Tolerances::default());
        assert_eq!(cache.paths()[0].count, 3);
    }

    #[test]
    fn test_winding_enforced() {
        let id = Transform2D::identity();
        let mut solid = CommandTape::new();
        solid.rect(&id, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut hole = CommandTape::new();
        hole.rect(&id, Rect::new(0.0, 0.0, 10.0, 10.0));
        hole.winding(Winding::Clockwise);

        let a = flatten(&solid, &Tolerances::default());
        let b = flatten(&hole, &Tolerances::default());
        assert!(poly_area(a.path_points(&a.paths()[0])) > 0.0);
        assert!(poly_area(b.path_points(&b.paths()[0])) < 0.0);
    }

    #[test]
    fn test_degenerate_input() {
        let id = Transform2D::identity();
        let mut tape = CommandTape::new();
        // No current path yet
        tape.line_to(&id, Point::new(5.0, 5.0));
        tape.move_to(&id, Point::new(1.0, 1.0));
        tape.close();
        let cache = flatten(&tape, &Tolerances::default());
        assert_eq!(cache.paths().len(), 1);
        assert_eq!(cache.paths()[0].count, 1);
    }

    #[test]
    fn test_convexity() {
        let id = Transform2D::identity();
        let tol = Tolerances::default();

        let mut rect = CommandTape::new();
        rect.rect(&id, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut cache = flatten(&rect, &tol);
        let (paths, points) = cache.split_mut();
        calculate_joins(paths, points, 1.0, LineJoin::Miter, 2.4, 0.5);
        assert!(cache.paths()[0].convex);

        // Arrow head: one reflex vertex
        let mut arrow = CommandTape::new();
        arrow.move_to(&id, Point::new(0.0, 0.0));
        arrow.line_to(&id, Point::new(5.0, 10.0));
        arrow.line_to(&id, Point::new(10.0, 0.0));
        arrow.line_to(&id, Point::new(5.0, 4.0));
        arrow.close();
        let mut cache = flatten(&arrow, &tol);
        let (paths, points) = cache.split_mut();
        calculate_joins(paths, points, 1.0, LineJoin::Miter, 2.4, 0.5);
        assert!(!cache.paths()[0].convex);

        // Pentagram: every turn goes the same way but the outline crosses itself
        let mut star = CommandTape::new();
        for (i, k) in [0, 2, 4, 1, 3].into_iter().enumerate() {
            let a = -FRAC_PI_2 + k as f32 * 2.0 * PI / 5.0;
            let p = Point::new(50.0 + 40.0 * a.cos(), 50.0 + 40.0 * a.sin());
            if i == 0 {
                star.move_to(&id, p);
            } else {
                star.line_to(&id, p);
            }
        }
        star.close();
        let mut cache = flatten(&star, &tol);
        let (paths, points) = cache.split_mut();
        calculate_joins(paths, points, 1.0, LineJoin::Miter, 2.4, 0.5);
        assert_eq!(cache.paths()[0].count, 5);
        assert!(!cache.paths()[0].convex);
    }

    #[test]
    fn test_miter_limit_boundary() {
        // Right-angle corner: miter length / stroke width = sqrt(2)
        let id = Transform2D::identity();
        let mut tape = CommandTape::new();
        tape.move_to(&id, Point::new(0.0, 0.0));
        tape.line_to(&id, Point::new(100.0, 0.0));
        tape.line_to(&id, Point::new(100.0, 100.0));
        let mut cache = flatten(&tape, &Tolerances::default());

        let corner_flags = |cache: &mut PathCache, limit: f32| {
            let (paths, points) = cache.split_mut();
            calculate_joins(paths, points, 5.0, LineJoin::Miter, limit, 0.5);
            cache.points()[1].flags
        };

        assert_eq!(corner_flags(&mut cache, 1.5) & BEVEL, 0);
        assert_ne!(corner_flags(&mut cache, 1.4) & BEVEL, 0);
        // |dm|^2 = 0.5 at a right angle: anything at or above sqrt(2) mitres
        assert_eq!(corner_flags(&mut cache, 2.0f32.sqrt() + 1e-4) & BEVEL, 0);
    }

    #[test]
    fn test_round_and_bevel_joins_always_bevel_corners() {
        let id = Transform2D::identity();
        let mut tape = CommandTape::new();
        tape.move_to(&id, Point::new(0.0, 0.0));
        tape.line_to(&id, Point::new(100.0, 0.0));
        tape.line_to(&id, Point::new(100.0, 100.0));
        let mut cache = flatten(&tape, &Tolerances::default());
        for join in [LineJoin::Round, LineJoin::Bevel] {
            let (paths, points) = cache.split_mut();
            calculate_joins(paths, points, 5.0, join, 10.0, 0.5);
            assert!(cache.points()[1].has(BEVEL));
        }
    }

    #[test]
    fn test_arena_reuses_slots() {
        let mut arena: Arena<PathPoint> = Arena::new("test");
        arena.alloc().unwrap().len = 3.0;
        arena.alloc().unwrap();
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 2);
        let slot = arena.alloc().unwrap();
        assert_eq!(slot.len, 0.0);
        assert_eq!(arena.capacity(), 2);
    }
}
