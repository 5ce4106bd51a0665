use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use surfgfx::polygon::RasterContext;
use surfgfx::simd::{self, Backend, KernelFamily};
use surfgfx::{blur, filters, smooth_scale, PixelFormat, Rgba8, Surface};

struct Xorshift32(u32);

impl Iterator for Xorshift32 {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        Some(self.0)
    }
}

fn noise(size: u32) -> Surface {
    let mut s = Surface::new(size, size, PixelFormat::argb8888()).unwrap();
    let mut rng = Xorshift32(42);
    for y in 0..size as i32 {
        for x in 0..size as i32 {
            let v = rng.next().unwrap();
            s.set_at(x, y, v).unwrap();
        }
    }
    s
}

const SIZES: [u32; 3] = [64, 256, 1024];

fn color_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("color");
    for &size in &SIZES {
        let src = noise(size);
        let mut dst = Surface::new(size, size, PixelFormat::argb8888()).unwrap();
        group.throughput(Throughput::Elements(size as u64 * size as u64));
        for backend in [Backend::Generic, Backend::Sse2, Backend::Avx2, Backend::Neon] {
            if !simd::is_supported(KernelFamily::Color, backend) {
                continue;
            }
            simd::set_backend(KernelFamily::Color, backend.name()).unwrap();
            group.bench_function(BenchmarkId::new(format!("grayscale/{backend}"), size), |b| {
                b.iter(|| filters::grayscale_into(black_box(&src), &mut dst).unwrap());
            });
            group.bench_function(BenchmarkId::new(format!("invert/{backend}"), size), |b| {
                b.iter(|| filters::invert_into(black_box(&src), &mut dst).unwrap());
            });
        }
        simd::reset_backends();
    }
    group.finish();
}

fn smooth_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("smooth_scale");
    for &size in &SIZES {
        let src = noise(size);
        group.throughput(Throughput::Elements(size as u64 * size as u64));
        for backend in [Backend::Generic, Backend::Sse2, Backend::Neon] {
            if !simd::is_supported(KernelFamily::Scale, backend) {
                continue;
            }
            let (w, h) = (size as i32 * 2 / 3, size as i32 * 3 / 2);
            group.bench_function(BenchmarkId::new(format!("{backend}"), size), |b| {
                b.iter(|| smooth_scale::smooth_scale_using(backend, black_box(&src), w, h).unwrap());
            });
        }
    }
    group.finish();
}

fn box_blur(c: &mut Criterion) {
    let mut group = c.benchmark_group("box_blur");
    for &size in &SIZES[..2] {
        let src = noise(size);
        let mut dst = Surface::new(size, size, PixelFormat::argb8888()).unwrap();
        group.throughput(Throughput::Elements(size as u64 * size as u64));
        for radius in [1, 8] {
            group.bench_function(BenchmarkId::new(format!("r{radius}"), size), |b| {
                b.iter(|| blur::box_blur_into(black_box(&src), &mut dst, radius, true).unwrap());
            });
        }
    }
    group.finish();
}

fn polygon_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_polygon");
    for &size in &SIZES {
        let mut surf = Surface::new(size, size, PixelFormat::argb8888()).unwrap();
        let s = size as i32;
        let star: Vec<(i32, i32)> = (0..10)
            .map(|i| {
                let r = if i % 2 == 0 { s / 2 } else { s / 5 };
                let a = i as f64 * std::f64::consts::PI / 5.0;
                (s / 2 + (r as f64 * a.cos()) as i32, s / 2 + (r as f64 * a.sin()) as i32)
            })
            .collect();
        let mut ctx = RasterContext::new();
        let color = Rgba8::new(200, 30, 90, 255);
        group.bench_function(BenchmarkId::new("star", size), |b| {
            b.iter(|| ctx.fill_polygon(&mut surf, black_box(&star), color).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, color_filters, smooth_scaling, box_blur, polygon_fill);
criterion_main!(benches);
