use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rxqr::luminance::{frame_to_bitmap, rgb_to_bitmap};
use rxqr::models::{PixelFormat, PixelFrame};
use rxqr::utils::binarization::Binarizer;
use rxqr::utils::grayscale::rgb_to_luma;
use rxqr::utils::memory_pool::BufferPool;

fn bench_rgb_to_luma_medium(c: &mut Criterion) {
    let image = vec![128u8; 640 * 480 * 3];
    c.bench_function("rgb_to_luma_640x480", |b| {
        b.iter(|| rgb_to_luma(black_box(&image), black_box(640), black_box(480)))
    });
}

fn bench_rgb_to_luma_large(c: &mut Criterion) {
    let image = vec![128u8; 1920 * 1080 * 3];
    c.bench_function("rgb_to_luma_1920x1080", |b| {
        b.iter(|| rgb_to_luma(black_box(&image), black_box(1920), black_box(1080)))
    });
}

fn bench_nv21_frame_to_bitmap(c: &mut Criterion) {
    let (w, h) = (640usize, 480usize);
    let raw: Vec<u8> = (0..PixelFormat::Nv21.frame_len(w, h))
        .map(|i| if i < w * h { ((i % w) * 255 / w) as u8 } else { 128 })
        .collect();
    let frame = PixelFrame::copy_from(&raw, w, h, PixelFormat::Nv21).unwrap();
    c.bench_function("nv21_frame_to_bitmap_640x480", |b| {
        b.iter(|| frame_to_bitmap(black_box(&frame), Binarizer::Hybrid))
    });
}

fn bench_pooled_rgb_retries(c: &mut Criterion) {
    // One attempt per sample factor, sharing a pool as the file decoder does
    let sizes = [(512usize, 384usize), (256, 192), (128, 96), (64, 48)];
    let images: Vec<Vec<u8>> = sizes.iter().map(|&(w, h)| vec![200u8; w * h * 3]).collect();
    c.bench_function("pooled_rgb_to_bitmap_retry_ladder", |b| {
        b.iter(|| {
            let mut pool = BufferPool::new();
            for (image, &(w, h)) in images.iter().zip(&sizes) {
                let bitmap = rgb_to_bitmap(black_box(image), w, h, &mut pool, Binarizer::Otsu).unwrap();
                black_box(bitmap);
            }
        })
    });
}

criterion_group!(
    benches,
    bench_rgb_to_luma_medium,
    bench_rgb_to_luma_large,
    bench_nv21_frame_to_bitmap,
    bench_pooled_rgb_retries
);
criterion_main!(benches);
