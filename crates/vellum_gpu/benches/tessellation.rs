//! Flattening and expansion throughput

use std::f32::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vellum_gpu::{
    expand_fill, expand_stroke, Canvas, CanvasConfig, PathCache, StrokeParams, Tolerances,
};
use vellum_paint::{Color, CommandTape, LineCap, LineJoin, Point, Rect, Transform2D, Winding};

fn circles(count: usize) -> CommandTape {
    let mut tape = CommandTape::new();
    let xform = Transform2D::identity();
    for i in 0..count {
        let c = Point::new((i % 20) as f32 * 40.0, (i / 20) as f32 * 40.0);
        tape.circle(&xform, c, 16.0);
    }
    tape
}

fn wave() -> CommandTape {
    let mut tape = CommandTape::new();
    let xform = Transform2D::identity();
    tape.move_to(&xform, Point::new(0.0, 100.0));
    for i in 0..64 {
        let x = i as f32 * 20.0;
        tape.bezier_to(
            &xform,
            Point::new(x + 5.0, 0.0),
            Point::new(x + 15.0, 200.0),
            Point::new(x + 20.0, 100.0),
        );
    }
    tape
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    let tol = Tolerances::for_ratio(2.0);
    for count in [1, 100, 1000] {
        let tape = circles(count);
        let mut cache = PathCache::new();
        group.bench_with_input(BenchmarkId::new("circles", count), &tape, |b, tape| {
            b.iter(|| cache.flatten(black_box(tape.commands()), &tol))
        });
    }

    let tape = wave();
    let mut cache = PathCache::new();
    group.bench_function("bezier_wave", |b| {
        b.iter(|| cache.flatten(black_box(tape.commands()), &tol))
    });
    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    let tol = Tolerances::for_ratio(2.0);

    let mut tape = CommandTape::new();
    tape.rounded_rect(&Transform2D::identity(), Rect::new(10.0, 10.0, 300.0, 200.0), 12.0);
    let mut cache = PathCache::new();
    let mut verts = Vec::new();
    group.bench_function("fill_rounded_rect_aa", |b| {
        b.iter(|| {
            verts.clear();
            cache.flatten(tape.commands(), &tol)?;
            expand_fill(&mut cache, &mut verts, tol.fringe_width, 0.5)
        })
    });

    let tape = wave();
    let params = StrokeParams {
        half_width: 3.0,
        fringe: tol.fringe_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        miter_limit: 10.0,
    };
    group.bench_function("stroke_wave_round", |b| {
        b.iter(|| {
            verts.clear();
            cache.flatten(tape.commands(), &tol)?;
            expand_stroke(&mut cache, &mut verts, &params, tol.tess_tol, 0.5)
        })
    });
    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut canvas = Canvas::new(CanvasConfig::default().with_antialias(true));
    c.bench_function("frame_200_shapes", |b| {
        b.iter(|| {
            canvas.begin_frame(1280.0, 720.0, 2.0);
            for i in 0..200 {
                let x = (i % 20) as f32 * 60.0;
                let y = (i / 20) as f32 * 60.0;
                canvas.begin_path();
                canvas.rounded_rect(x, y, 50.0, 50.0, 6.0);
                canvas.set_fill_color(Color::from_hsla(i as f32 / 200.0, 0.6, 0.5, 1.0));
                canvas.fill()?;

                canvas.begin_path();
                canvas.arc(x + 25.0, y + 25.0, 18.0, 0.0, PI * 1.5, Winding::Clockwise);
                canvas.set_stroke_color(Color::BLACK);
                canvas.set_stroke_width(2.0);
                canvas.stroke()?;
            }
            canvas.end_frame().map(|frame| frame.commands.len())
        })
    });
}

criterion_group!(benches, bench_flatten, bench_expand, bench_frame);
criterion_main!(benches);
