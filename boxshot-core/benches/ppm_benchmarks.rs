//! Benchmarks for P3 encoding of full-size frames

use boxshot_core::{ppm, RenderedFrame};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn gradient_frame(width: u32, height: u32) -> RenderedFrame {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255]);
        }
    }
    RenderedFrame::new(width, height, pixels).unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("ppm_encode");
    group.sample_size(20);

    for &(width, height) in &[(250, 250), (1000, 1000), (2000, 1000)] {
        let frame = gradient_frame(width, height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &frame,
            |b, frame| b.iter(|| ppm::encode_p3(black_box(frame))),
        );
    }

    group.finish();
}

fn bench_flip(c: &mut Criterion) {
    let (width, height) = (1000u32, 1000u32);
    let stride = 4096;
    let data = vec![128u8; stride * height as usize];
    c.bench_function("flip_1000x1000_padded", |b| {
        b.iter(|| RenderedFrame::from_bottom_up(width, height, black_box(&data), stride).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_flip);
criterion_main!(benches);
