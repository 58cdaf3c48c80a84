//! Frame Dump Demo
//!
//! Records a small scene and prints what a renderer would receive: every
//! draw command with its vertex and index ranges, plus buffer sizes.
//!
//! Run with: cargo run -p vellum_gpu --example frame_dump [path/to/font.ttf]
//!
//! Set `RUST_LOG=vellum_gpu=trace` to watch batching decisions.

use std::f32::consts::PI;

use tracing_subscriber::EnvFilter;
use vellum_gpu::{Canvas, CanvasConfig};
use vellum_paint::{Color, LineCap, LineJoin, Paint, TextAlignment, TextAnchor, Winding};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut canvas = Canvas::new(CanvasConfig::default().with_antialias(true));

    let font = match std::env::args().nth(1) {
        Some(path) => Some(canvas.create_font_data("demo", std::fs::read(&path)?)?),
        None => {
            tracing::info!("no font path given, skipping text");
            None
        }
    };

    canvas.begin_frame(640.0, 480.0, 2.0);

    // Card with a gradient background
    canvas.begin_path();
    canvas.rounded_rect(20.0, 20.0, 300.0, 180.0, 10.0);
    canvas.set_fill_paint(Paint::linear_gradient(
        20.0,
        20.0,
        20.0,
        200.0,
        Color::from_hex(0x3b82f6),
        Color::from_hex(0x1e3a8a),
    ));
    canvas.fill()?;

    // Ring with a hole
    canvas.begin_path();
    canvas.circle(480.0, 110.0, 80.0);
    canvas.circle(480.0, 110.0, 40.0);
    canvas.path_winding(Winding::HOLE);
    canvas.set_fill_color(Color::from_hsla(0.1, 0.8, 0.55, 1.0));
    canvas.fill()?;

    // Open arc with round caps
    canvas.begin_path();
    canvas.arc(170.0, 340.0, 90.0, PI, PI * 2.0, Winding::Clockwise);
    canvas.set_stroke_color(Color::BLACK);
    canvas.set_stroke_width(6.0);
    canvas.set_line_cap(LineCap::Round);
    canvas.set_line_join(LineJoin::Round);
    canvas.stroke()?;

    // Clipped, rotated squares
    canvas.save();
    canvas.scissor(360.0, 240.0, 240.0, 200.0);
    canvas.translate(480.0, 340.0);
    for i in 0..6 {
        canvas.rotate(PI / 12.0);
        canvas.begin_path();
        canvas.rect(-60.0, -60.0, 120.0, 120.0);
        canvas.set_stroke_color(Color::RED.fade(1.0 - i as f32 / 8.0));
        canvas.set_stroke_width(1.5);
        canvas.stroke()?;
    }
    canvas.restore();

    if let Some(font) = font {
        canvas.set_font(font);
        canvas.set_font_size(24.0);
        canvas.set_fill_color(Color::WHITE);
        canvas.set_text_align(TextAlignment::Left, TextAnchor::Top);
        let advance = canvas.text(40.0, 40.0, "Vellum")?;
        tracing::info!(advance, "drew title");

        canvas.set_font_size(14.0);
        canvas.text_box(
            40.0,
            80.0,
            260.0,
            "Paths are flattened, expanded and batched before they reach the GPU.",
        )?;
    }

    let frame = canvas.end_frame()?;
    for (i, cmd) in frame.commands.iter().enumerate() {
        println!(
            "{i:3}: {:?} uniform={} texture={:?} vertices={}..{} indices={}..{}",
            cmd.kind,
            cmd.uniform,
            cmd.texture,
            cmd.vertex_offset,
            cmd.vertex_offset + cmd.vertex_count,
            cmd.index_offset,
            cmd.index_offset + cmd.index_count,
        );
    }
    println!(
        "{} commands, {} vertices ({} bytes), {} indices, {} uniforms, {} retired atlases",
        frame.commands.len(),
        frame.vertices.len(),
        frame.vertex_bytes().len(),
        frame.indices.len(),
        frame.uniforms.len(),
        frame.retired_atlases.len(),
    );
    Ok(())
}
