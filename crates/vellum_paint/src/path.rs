//! Path command tape
//!
//! Path calls are recorded as [`PathCommand`]s already multiplied by the
//! transform that was current when the call was made. The tape also keeps the
//! last issued point in user space, which relative helpers (`quad_to`,
//! `arc_to`) start from.

use std::f32::consts::PI;

use crate::primitives::{CornerRadius, Point, Rect};
use crate::transform::Transform2D;

/// Control-point distance for approximating a quarter circle with one cubic
pub const KAPPA90: f32 = 0.552_284_8;

/// Winding direction of a subpath.
///
/// Counter-clockwise subpaths are solid, clockwise subpaths are holes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Winding {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl Winding {
    pub const SOLID: Winding = Winding::CounterClockwise;
    pub const HOLE: Winding = Winding::Clockwise;
}

/// Path command, in device space
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    BezierTo { c1: Point, c2: Point, end: Point },
    Close,
    Winding(Winding),
}

#[derive(Clone, Debug, Default)]
pub struct CommandTape {
    commands: Vec<PathCommand>,
    last: Point,
}

impl CommandTape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Last point issued, in user space
    pub fn last_point(&self) -> Point {
        self.last
    }

    /// Drop all commands, keeping capacity
    pub fn clear(&mut self) {
        self.commands.clear();
        self.last = Point::ZERO;
    }

    pub fn move_to(&mut self, xform: &Transform2D, p: Point) {
        self.last = p;
        self.commands.push(PathCommand::MoveTo(xform.transform_point(p)));
    }

    pub fn line_to(&mut self, xform: &Transform2D, p: Point) {
        self.last = p;
        self.commands.push(PathCommand::LineTo(xform.transform_point(p)));
    }

    pub fn bezier_to(&mut self, xform: &Transform2D, c1: Point, c2: Point, end: Point) {
        self.last = end;
        self.commands.push(PathCommand::BezierTo {
            c1: xform.transform_point(c1),
            c2: xform.transform_point(c2),
            end: xform.transform_point(end),
        });
    }

    /// Quadratic segment, stored as the equivalent cubic
    pub fn quad_to(&mut self, xform: &Transform2D, control: Point, end: Point) {
        let start = self.last;
        let c1 = start + (control - start) * (2.0 / 3.0);
        let c2 = end + (control - end) * (2.0 / 3.0);
        self.bezier_to(xform, c1, c2, end);
    }

    /// Close the current subpath; repeated closes collapse into one
    pub fn close(&mut self) {
        if !matches!(self.commands.last(), Some(PathCommand::Close)) {
            self.commands.push(PathCommand::Close);
        }
    }

    pub fn winding(&mut self, dir: Winding) {
        self.commands.push(PathCommand::Winding(dir));
    }

    /// Circular arc around `center` from angle `a0` to `a1` (radians).
    ///
    /// Continues the current subpath with a line to the arc start, or starts a
    /// new one when the tape is empty. Each quarter turn becomes one cubic.
    pub fn arc(
        &mut self,
        xform: &Transform2D,
        center: Point,
        radius: f32,
        a0: f32,
        a1: f32,
        dir: Winding,
    ) {
        let connect = !self.commands.is_empty();

        let mut da = a1 - a0;
        match dir {
            Winding::Clockwise => {
                if da.abs() >= PI * 2.0 {
                    da = PI * 2.0;
                } else {
                    while da < 0.0 {
                        da += PI * 2.0;
                    }
                }
            }
            Winding::CounterClockwise => {
                if da.abs() >= PI * 2.0 {
                    da = -PI * 2.0;
                } else {
                    while da > 0.0 {
                        da -= PI * 2.0;
                    }
                }
            }
        }

        let ndivs = ((da.abs() / (PI * 0.5) + 0.5) as i32).clamp(1, 5);
        let hda = (da / ndivs as f32) / 2.0;
        let mut kappa = (4.0 / 3.0 * (1.0 - hda.cos()) / hda.sin()).abs();
        if dir == Winding::CounterClockwise {
            kappa = -kappa;
        }

        let mut prev = Point::ZERO;
        let mut prev_tan = Point::ZERO;
        for i in 0..=ndivs {
            let a = a0 + da * (i as f32 / ndivs as f32);
            let (dy, dx) = a.sin_cos();
            let p = Point::new(center.x + dx * radius, center.y + dy * radius);
            let tan = Point::new(-dy * radius * kappa, dx * radius * kappa);

            if i == 0 {
                if connect {
                    self.line_to(xform, p);
                } else {
                    self.move_to(xform, p);
                }
            } else {
                self.bezier_to(xform, prev + prev_tan, p - tan, p);
            }
            prev = p;
            prev_tan = tan;
        }
    }

    /// Arc of `radius` tangent to the lines `last -> p1` and `p1 -> p2`.
    ///
    /// Degenerate corners (coincident or collinear points, tiny radius)
    /// become a straight line to `p1`.
    pub fn arc_to(&mut self, xform: &Transform2D, p1: Point, p2: Point, radius: f32, dist_tol: f32) {
        if self.commands.is_empty() {
            return;
        }
        let p0 = self.last;

        if p0.approx_eq(p1, dist_tol)
            || p1.approx_eq(p2, dist_tol)
            || p1.distance_to_segment_squared(p0, p2) < dist_tol * dist_tol
            || radius < dist_tol
        {
            self.line_to(xform, p1);
            return;
        }

        let mut d0 = p0 - p1;
        let mut d1 = p2 - p1;
        d0.normalize();
        d1.normalize();
        let a = d0.dot(d1).clamp(-1.0, 1.0).acos();
        let d = radius / (a / 2.0).tan();

        if d > 10000.0 {
            tracing::trace!(d, "arc_to tangent too far away, using a line");
            self.line_to(xform, p1);
            return;
        }

        let (center, a0, a1, dir) = if d0.cross(d1) > 0.0 {
            (
                Point::new(p1.x + d0.x * d + d0.y * radius, p1.y + d0.y * d - d0.x * radius),
                d0.x.atan2(-d0.y),
                (-d1.x).atan2(d1.y),
                Winding::Clockwise,
            )
        } else {
            (
                Point::new(p1.x + d0.x * d - d0.y * radius, p1.y + d0.y * d + d0.x * radius),
                (-d0.x).atan2(d0.y),
                d1.x.atan2(-d1.y),
                Winding::CounterClockwise,
            )
        };

        self.arc(xform, center, radius, a0, a1, dir);
    }

    pub fn rect(&mut self, xform: &Transform2D, rect: Rect) {
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = rect;
        self.move_to(xform, Point::new(x, y));
        self.line_to(xform, Point::new(x, y + h));
        self.line_to(xform, Point::new(x + w, y + h));
        self.line_to(xform, Point::new(x + w, y));
        self.close();
    }

    pub fn rounded_rect(&mut self, xform: &Transform2D, rect: Rect, radius: f32) {
        self.rounded_rect_varying(xform, rect, CornerRadius::uniform(radius));
    }

    /// Rounded rect with a radius per corner; radii are clamped to half the
    /// rect size
    pub fn rounded_rect_varying(&mut self, xform: &Transform2D, rect: Rect, radii: CornerRadius) {
        if radii.is_sharp() {
            self.rect(xform, rect);
            return;
        }

        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = rect;
        let halfw = w.abs() * 0.5;
        let halfh = h.abs() * 0.5;
        let corner = |r: f32| (r.min(halfw) * w.signum(), r.min(halfh) * h.signum());
        let (rx_tl, ry_tl) = corner(radii.top_left);
        let (rx_tr, ry_tr) = corner(radii.top_right);
        let (rx_br, ry_br) = corner(radii.bottom_right);
        let (rx_bl, ry_bl) = corner(radii.bottom_left);
        let k = 1.0 - KAPPA90;

        self.move_to(xform, Point::new(x, y + ry_tl));
        self.line_to(xform, Point::new(x, y + h - ry_bl));
        self.bezier_to(
            xform,
            Point::new(x, y + h - ry_bl * k),
            Point::new(x + rx_bl * k, y + h),
            Point::new(x + rx_bl, y + h),
        );
        self.line_to(xform, Point::new(x + w - rx_br, y + h));
        self.bezier_to(
            xform,
            Point::new(x + w - rx_br * k, y + h),
            Point::new(x + w, y + h - ry_br * k),
            Point::new(x + w, y + h - ry_br),
        );
        self.line_to(xform, Point::new(x + w, y + ry_tr));
        self.bezier_to(
            xform,
            Point::new(x + w, y + ry_tr * k),
            Point::new(x + w - rx_tr * k, y),
            Point::new(x + w - rx_tr, y),
        );
        self.line_to(xform, Point::new(x + rx_tl, y));
        self.bezier_to(
            xform,
            Point::new(x + rx_tl * k, y),
            Point::new(x, y + ry_tl * k),
            Point::new(x, y + ry_tl),
        );
        self.close();
    }

    pub fn ellipse(&mut self, xform: &Transform2D, center: Point, rx: f32, ry: f32) {
        let Point { x: cx, y: cy } = center;
        let kx = rx * KAPPA90;
        let ky = ry * KAPPA90;
        self.move_to(xform, Point::new(cx - rx, cy));
        self.bezier_to(
            xform,
            Point::new(cx - rx, cy + ky),
            Point::new(cx - kx, cy + ry),
            Point::new(cx, cy + ry),
        );
        self.bezier_to(
            xform,
            Point::new(cx + kx, cy + ry),
            Point::new(cx + rx, cy + ky),
            Point::new(cx + rx, cy),
        );
        self.bezier_to(
            xform,
            Point::new(cx + rx, cy - ky),
            Point::new(cx + kx, cy - ry),
            Point::new(cx, cy - ry),
        );
        self.bezier_to(
            xform,
            Point::new(cx - kx, cy - ry),
            Point::new(cx - rx, cy - ky),
            Point::new(cx - rx, cy),
        );
        self.close();
    }

    pub fn circle(&mut self, xform: &Transform2D, center: Point, radius: f32) {
        self.ellipse(xform, center, radius, radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: Transform2D = Transform2D::identity();

    #[test]
    fn test_commands_are_transformed_at_call_time() {
        let mut tape = CommandTape::new();
        tape.move_to(&Transform2D::translate(10.0, 0.0), Point::new(1.0, 1.0));
        tape.line_to(&Transform2D::scale(2.0, 2.0), Point::new(3.0, 3.0));
        assert_eq!(
            tape.commands(),
            &[
                PathCommand::MoveTo(Point::new(11.0, 1.0)),
                PathCommand::LineTo(Point::new(6.0, 6.0)),
            ]
        );
        // Last point is remembered untransformed
        assert_eq!(tape.last_point(), Point::new(3.0, 3.0));
    }

    #[test]
    fn test_double_close_is_single_command() {
        let mut tape = CommandTape::new();
        tape.rect(&ID, Rect::new(0.0, 0.0, 10.0, 10.0));
        tape.close();
        let closes = tape
            .commands()
            .iter()
            .filter(|c| matches!(c, PathCommand::Close))
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn test_quad_to_elevates_to_cubic() {
        let mut tape = CommandTape::new();
        tape.move_to(&ID, Point::new(0.0, 0.0));
        tape.quad_to(&ID, Point::new(3.0, 3.0), Point::new(6.0, 0.0));
        match tape.commands()[1] {
            PathCommand::BezierTo { c1, c2, end } => {
                assert!((c1.x - 2.0).abs() < 1e-5 && (c1.y - 2.0).abs() < 1e-5);
                assert!((c2.x - 4.0).abs() < 1e-5 && (c2.y - 2.0).abs() < 1e-5);
                assert_eq!(end, Point::new(6.0, 0.0));
            }
            other => panic!("expected a cubic, got {:?}", other),
        }
    }

    #[test]
    fn test_arc_to_on_empty_tape_does_nothing() {
        let mut tape = CommandTape::new();
        tape.arc_to(&ID, Point::new(10.0, 0.0), Point::new(10.0, 10.0), 5.0, 0.01);
        assert!(tape.is_empty());
    }

    #[test]
    fn test_arc_to_collinear_falls_back_to_line() {
        let mut tape = CommandTape::new();
        tape.move_to(&ID, Point::new(0.0, 0.0));
        tape.arc_to(&ID, Point::new(10.0, 0.0), Point::new(20.0, 0.0), 5.0, 0.01);
        assert_eq!(tape.commands()[1], PathCommand::LineTo(Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_arc_to_corner_ends_on_second_leg() {
        let mut tape = CommandTape::new();
        tape.move_to(&ID, Point::new(0.0, 0.0));
        tape.arc_to(&ID, Point::new(10.0, 0.0), Point::new(10.0, 10.0), 5.0, 0.01);
        // Tangent points are (5, 0) and (10, 5)
        match tape.commands()[1] {
            PathCommand::LineTo(p) => assert!(p.approx_eq(Point::new(5.0, 0.0), 1e-3)),
            other => panic!("expected a line to the tangent point, got {:?}", other),
        }
        assert!(tape.last_point().approx_eq(Point::new(10.0, 5.0), 1e-3));
    }

    #[test]
    fn test_full_circle_arc_uses_four_segments() {
        let mut tape = CommandTape::new();
        tape.arc(&ID, Point::ZERO, 10.0, 0.0, PI * 2.0, Winding::Clockwise);
        let cubics = tape
            .commands()
            .iter()
            .filter(|c| matches!(c, PathCommand::BezierTo { .. }))
            .count();
        assert_eq!(cubics, 4);
        assert!(matches!(tape.commands()[0], PathCommand::MoveTo(_)));
    }

    #[test]
    fn test_sharp_rounded_rect_is_plain_rect() {
        let mut tape = CommandTape::new();
        tape.rounded_rect(&ID, Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        assert_eq!(tape.commands().len(), 5);
    }
}
