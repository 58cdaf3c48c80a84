//! Render state and the save/restore stack

use smallvec::SmallVec;

use crate::color::Color;
use crate::paint::Paint;
use crate::primitives::Rect;
use crate::transform::Transform2D;

/// Identifies a font registered with a font atlas
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Horizontal text alignment relative to the pen origin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchor of the pen origin within a line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAnchor {
    Top,
    Middle,
    #[default]
    Baseline,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextAlign {
    pub horizontal: TextAlignment,
    pub vertical: TextAnchor,
}

impl TextAlign {
    pub const fn new(horizontal: TextAlignment, vertical: TextAnchor) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Outline drawn underneath glyphs, `width` pixels wide
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphOutline {
    pub paint: Paint,
    pub width: f32,
}

/// Clip rectangle in its own transformed space.
///
/// A non-positive extent on either axis means clipping is disabled. A scissor
/// produced from an empty intersection is `collapsed` instead: it clips
/// everything away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scissor {
    pub xform: Transform2D,
    pub extent: [f32; 2],
    pub collapsed: bool,
}

impl Default for Scissor {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Scissor {
    pub const fn disabled() -> Self {
        Self {
            xform: Transform2D::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            extent: [-1.0, -1.0],
            collapsed: false,
        }
    }

    /// Scissor for `rect` in the space described by `xform`
    ///
    /// An empty `rect` disables clipping.
    pub fn new(rect: Rect, xform: &Transform2D) -> Self {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Self::disabled();
        }
        let (w, h) = (rect.width, rect.height);
        let local = Transform2D::translate(rect.x + w * 0.5, rect.y + h * 0.5);
        Self {
            xform: local.then(xform),
            extent: [w * 0.5, h * 0.5],
            collapsed: false,
        }
    }

    /// Scissor that clips everything away
    fn collapsed(xform: &Transform2D) -> Self {
        Self {
            xform: *xform,
            extent: [0.0, 0.0],
            collapsed: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.extent[0] > 0.0 && self.extent[1] > 0.0
    }

    pub fn reset(&mut self) {
        *self = Self::disabled();
    }

    /// Intersect with `rect` given in the space of `xform`.
    ///
    /// The current scissor is brought into that space and approximated by
    /// its axis-aligned bounding box there, so intersecting rotated rects is
    /// conservative.
    pub fn intersect(&self, rect: Rect, xform: &Transform2D) -> Scissor {
        if self.collapsed {
            return *self;
        }
        if !self.is_enabled() {
            return Scissor::new(rect, xform);
        }

        let inverse = xform.inverse().unwrap_or_else(|| {
            tracing::trace!("singular transform while intersecting scissor, using identity");
            Transform2D::identity()
        });
        let p = self.xform.then(&inverse);
        let [ex, ey] = self.extent;
        let tex = ex * p.a.abs() + ey * p.c.abs();
        let tey = ex * p.b.abs() + ey * p.d.abs();
        let current = Rect::new(p.e - tex, p.f - tey, tex * 2.0, tey * 2.0);

        let clipped = current.intersect(&rect);
        if clipped.width <= 0.0 || clipped.height <= 0.0 {
            return Scissor::collapsed(xform);
        }
        Scissor::new(clipped, xform)
    }
}

/// Everything that affects how the next path or text run is drawn
#[derive(Clone, Debug, PartialEq)]
pub struct RenderState {
    pub fill: Paint,
    pub stroke: Paint,
    pub stroke_width: f32,
    pub miter_limit: f32,
    pub line_join: LineJoin,
    pub line_cap: LineCap,
    pub alpha: f32,
    /// Per-state edge anti-aliasing; only takes effect when the canvas has it enabled
    pub shape_anti_alias: bool,
    pub xform: Transform2D,
    pub scissor: Scissor,
    pub font_size: f32,
    pub letter_spacing: f32,
    pub line_height: f32,
    pub text_align: TextAlign,
    pub font_id: FontId,
    pub font_blur: f32,
    pub font_dilate: f32,
    /// Replaces the fill paint for glyphs when set
    pub glyph_fill: Option<Paint>,
    pub glyph_outline: Option<GlyphOutline>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            fill: Paint::solid(Color::WHITE),
            stroke: Paint::solid(Color::BLACK),
            stroke_width: 1.0,
            miter_limit: 10.0,
            line_join: LineJoin::Miter,
            line_cap: LineCap::Butt,
            alpha: 1.0,
            shape_anti_alias: true,
            xform: Transform2D::identity(),
            scissor: Scissor::disabled(),
            font_size: 16.0,
            letter_spacing: 0.0,
            line_height: 1.0,
            text_align: TextAlign::default(),
            font_id: FontId(0),
            font_blur: 0.0,
            font_dilate: 0.0,
            glyph_fill: None,
            glyph_outline: None,
        }
    }
}

impl RenderState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Save/restore stack with exactly one current state.
///
/// Storage is kept across frames; `clear` only truncates.
#[derive(Clone, Debug)]
pub struct StateStack {
    states: SmallVec<[RenderState; 8]>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStack {
    pub fn new() -> Self {
        let mut states = SmallVec::new();
        states.push(RenderState::default());
        Self { states }
    }

    pub fn current(&self) -> &RenderState {
        // The base state is never popped
        &self.states[self.states.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut RenderState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// Number of saved states above the base state
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }

    pub fn save(&mut self) {
        let top = self.current().clone();
        self.states.push(top);
    }

    /// Pop back to the previously saved state.
    ///
    /// # Panics
    ///
    /// Panics when called on the base state; unbalanced save/restore is a
    /// programming error.
    pub fn restore(&mut self) {
        assert!(
            self.states.len() > 1,
            "StateStack::restore called without a matching save"
        );
        self.states.pop();
    }

    /// Reset the current state to defaults without popping
    pub fn reset(&mut self) {
        self.current_mut().reset();
    }

    /// Back to a single default state
    pub fn clear(&mut self) {
        self.states.truncate(1);
        self.states[0].reset();
    }
}
