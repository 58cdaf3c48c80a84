//! End-to-end glyph iteration against a fixed-metrics face

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vellum_text::{
    AtlasConfig, BitmapRequirement, FontAtlas, FontFace, GlyphPlacement, TextError, TextIter,
    TextStyle, VerticalMetrics,
};

/// Every glyph advances 10px at 16px; "AB" kerns by -1px
struct FixedFace {
    renders: Arc<AtomicUsize>,
}

impl FontFace for FixedFace {
    fn vertical_metrics(&self) -> VerticalMetrics {
        VerticalMetrics {
            ascender: 0.8,
            descender: -0.2,
            line_gap: 0.25,
        }
    }

    fn glyph_index(&self, codepoint: char) -> Option<u16> {
        codepoint.is_ascii().then_some(codepoint as u16)
    }

    fn advance(&self, _glyph: u16, size: f32) -> f32 {
        size * 10.0 / 16.0
    }

    fn kern_advance(&mut self, left: u16, right: u16, size: f32) -> f32 {
        if (left, right) == ('A' as u16, 'B' as u16) {
            -size / 16.0
        } else {
            0.0
        }
    }

    fn render_glyph(
        &mut self,
        glyph: u16,
        size: f32,
        out: &mut Vec<u8>,
    ) -> vellum_text::Result<GlyphPlacement> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        out.clear();
        if glyph == ' ' as u16 {
            return Ok(GlyphPlacement::default());
        }
        let side = (size * 0.5) as u32;
        out.resize((side * side) as usize, 200);
        Ok(GlyphPlacement {
            left: 1,
            top: side as i32,
            width: side,
            height: side,
        })
    }
}

fn atlas_with_face(width: u32, height: u32) -> (FontAtlas, Arc<AtomicUsize>, TextStyle) {
    let renders = Arc::new(AtomicUsize::new(0));
    let mut atlas = FontAtlas::new(AtlasConfig::default().with_size(width, height));
    let font = atlas.add_font(
        "fixed",
        Box::new(FixedFace {
            renders: renders.clone(),
        }),
    );
    (atlas, renders, TextStyle::new(font, 16.0))
}

#[test]
fn test_ab_pen_positions() {
    let (mut atlas, _, style) = atlas_with_face(256, 256);
    let mut iter = TextIter::new();
    iter.set_style(style);
    iter.reset(0.0, 0.0, BitmapRequirement::Required);

    let a = iter.next_step(&mut atlas, b"AB").unwrap().unwrap();
    let b = iter.next_step(&mut atlas, b"AB").unwrap().unwrap();
    assert!(iter.next_step(&mut atlas, b"AB").unwrap().is_none());

    assert_eq!((a.x, a.next_x), (0.0, 10.0));
    assert_eq!((b.x, b.next_x), (10.0, 19.0));
    // B's quad starts at the kerned pen position
    let quad = b.quad.unwrap();
    assert_eq!(quad.x0, 9.0 + (1.0 - 2.0 + 1.0));
}

/// 'A' advances 10px and 'B' 9px at 16px, with no kerning
struct ProportionalFace;

impl FontFace for ProportionalFace {
    fn vertical_metrics(&self) -> VerticalMetrics {
        VerticalMetrics {
            ascender: 0.8,
            descender: -0.2,
            line_gap: 0.0,
        }
    }

    fn glyph_index(&self, codepoint: char) -> Option<u16> {
        codepoint.is_ascii().then_some(codepoint as u16)
    }

    fn advance(&self, glyph: u16, size: f32) -> f32 {
        let units = if glyph == 'B' as u16 { 9.0 } else { 10.0 };
        size * units / 16.0
    }

    fn kern_advance(&mut self, _left: u16, _right: u16, _size: f32) -> f32 {
        0.0
    }

    fn render_glyph(
        &mut self,
        _glyph: u16,
        _size: f32,
        out: &mut Vec<u8>,
    ) -> vellum_text::Result<GlyphPlacement> {
        out.clear();
        out.resize(16, 255);
        Ok(GlyphPlacement {
            left: 0,
            top: 4,
            width: 4,
            height: 4,
        })
    }
}

#[test]
fn test_ab_pen_follows_glyph_advances() {
    let mut atlas = FontAtlas::new(AtlasConfig::default().with_size(128, 128));
    let font = atlas.add_font("proportional", Box::new(ProportionalFace));
    let mut iter = TextIter::new();
    iter.set_style(TextStyle::new(font, 16.0));
    iter.reset(0.0, 0.0, BitmapRequirement::Required);
    assert_eq!(iter.position(), (0.0, 0.0));

    let a = iter.next_step(&mut atlas, b"AB").unwrap().unwrap();
    assert_eq!((a.x, a.next_x), (0.0, 10.0));
    assert_eq!(iter.position().0, 10.0);

    let b = iter.next_step(&mut atlas, b"AB").unwrap().unwrap();
    assert_eq!((b.x, b.next_x), (10.0, 19.0));
    assert_eq!(iter.position().0, 19.0);
    assert!(iter.next_step(&mut atlas, b"AB").unwrap().is_none());
}

#[test]
fn test_second_pass_is_served_from_cache() {
    let (mut atlas, renders, style) = atlas_with_face(256, 256);
    let mut iter = TextIter::new();
    iter.set_style(style);

    for _ in 0..3 {
        iter.reset(0.0, 0.0, BitmapRequirement::Required);
        let quads = iter
            .quads(&mut atlas, b"HELLO")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(quads.len(), 5);
    }
    // H, E, L, O
    assert_eq!(renders.load(Ordering::SeqCst), 4);
    assert_eq!(atlas.bake_count(), 4);
}

#[test]
fn test_empty_string_after_reset() {
    let (mut atlas, renders, style) = atlas_with_face(256, 256);
    let mut iter = TextIter::new();
    iter.set_style(style);
    iter.reset(3.0, 4.0, BitmapRequirement::Required);
    assert!(iter.next_step(&mut atlas, b"").unwrap().is_none());
    assert_eq!(iter.position(), (3.0, 4.0));
    assert_eq!(renders.load(Ordering::SeqCst), 0);
}

#[test]
fn test_atlas_full_then_reset_and_retry() {
    // 8x8 bitmaps padded to 12x12: a 24x12 atlas holds two glyphs
    let (mut atlas, _, style) = atlas_with_face(24, 12);
    let mut iter = TextIter::new();
    iter.set_style(style);
    iter.reset(0.0, 0.0, BitmapRequirement::Required);

    let text = b"XYZ";
    iter.next_step(&mut atlas, text).unwrap();
    iter.next_step(&mut atlas, text).unwrap();
    let old_texture = atlas.texture_id();
    assert_eq!(iter.next_step(&mut atlas, text), Err(TextError::AtlasFull));

    atlas.reset(24, 12);
    let z = iter.next_step(&mut atlas, text).unwrap().unwrap();
    assert_eq!(z.codepoint, 'Z');
    assert_eq!(z.x, 20.0);
    assert_ne!(atlas.texture_id(), old_texture);
}

#[test]
fn test_optional_requirement_never_fails_on_full_atlas() {
    let (mut atlas, _, style) = atlas_with_face(12, 12);
    let mut iter = TextIter::new();
    iter.set_style(style);
    iter.reset(0.0, 0.0, BitmapRequirement::Optional);

    let mut steps = 0;
    while let Some(step) = iter.next_step(&mut atlas, b"ABCD").unwrap() {
        if steps > 0 {
            assert!(step.quad.is_none());
        }
        steps += 1;
    }
    assert_eq!(steps, 4);
    assert_eq!(iter.position().0, 39.0);
}

#[test]
fn test_line_height_multiplier() {
    let (mut atlas, _, style) = atlas_with_face(256, 256);
    let mut iter = TextIter::new();
    iter.set_style(style.with_line_height(2.0));
    iter.reset(0.0, 0.0, BitmapRequirement::Required);
    let mut last = None;
    while let Some(step) = iter.next_step(&mut atlas, b"A\nB").unwrap() {
        last = Some(step);
    }
    // (0.8 + 0.2 + 0.25) em * 16px * 2
    assert_eq!(last.unwrap().y, 40.0);
}

#[test]
fn test_shared_atlas_across_threads() {
    let (atlas, renders, style) = atlas_with_face(256, 256);
    let atlas = Arc::new(Mutex::new(atlas));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let atlas = atlas.clone();
            std::thread::spawn(move || {
                let mut iter = TextIter::new();
                iter.set_style(style);
                iter.reset(0.0, 0.0, BitmapRequirement::Required);
                let mut atlas = atlas.lock().unwrap();
                while iter.next_step(&mut atlas, b"SHARED").unwrap().is_some() {}
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    // S, H, A, R, E, D baked once each
    assert_eq!(renders.load(Ordering::SeqCst), 6);
}
