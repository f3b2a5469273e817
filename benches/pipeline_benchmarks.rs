use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use jewel_studio::{
    apply_adjustments, find_content_bounds, strip_background, BrandMark, BrandingOverlay,
    CompositeLayout, Compositor, EditParameters, StudioConfig,
};

/// Square canvas with a dark centered product covering a quarter of it
fn product_photo(size: u32) -> RgbaImage {
    let lo = size / 4;
    let hi = size - lo;
    RgbaImage::from_fn(size, size, |x, y| {
        if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
            Rgba([90, 70, 30, 255])
        } else {
            Rgba([253, 253, 253, 255])
        }
    })
}

fn bench_strip_and_bounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("strip_and_bounds");
    for size in [512u32, 1024, 2048] {
        let photo = product_photo(size);
        group.bench_with_input(BenchmarkId::new("strip", size), &photo, |b, photo| {
            b.iter(|| strip_background(black_box(photo), 250));
        });

        let stripped = strip_background(&photo, 250);
        group.bench_with_input(BenchmarkId::new("bounds", size), &stripped, |b, stripped| {
            b.iter(|| find_content_bounds(black_box(stripped), 10));
        });
    }
    group.finish();
}

fn bench_catalog_composite(c: &mut Criterion) {
    let config = StudioConfig::default();
    let compositor = Compositor::from_config(&config).expect("default config is valid");
    let overlay = BrandingOverlay::new(config.branding.clone(), BrandMark::monogram());
    let stripped = strip_background(&product_photo(1024), 250);
    let bounds = find_content_bounds(&stripped, 10).rect;
    let reserved = overlay.reserved_height(config.catalog_size.1);

    c.bench_function("catalog_render", |b| {
        b.iter(|| {
            compositor.render(
                CompositeLayout::Catalog,
                black_box(&stripped),
                bounds,
                config.catalog_size,
                reserved,
            )
        });
    });

    let mut canvas = RgbaImage::from_pixel(1200, 1200, Rgba([255, 255, 255, 255]));
    c.bench_function("branding_apply", |b| {
        b.iter(|| overlay.apply(black_box(&mut canvas)));
    });
}

fn bench_adjustments(c: &mut Criterion) {
    let photo = product_photo(1200);
    let params = EditParameters {
        brightness: 115.0,
        contrast: 110.0,
        saturation: 130.0,
        warmth: 20.0,
        ..EditParameters::default()
    };

    c.bench_function("apply_adjustments_1200", |b| {
        b.iter(|| apply_adjustments(black_box(&photo), &params, 235));
    });
}

criterion_group!(
    benches,
    bench_strip_and_bounds,
    bench_catalog_composite,
    bench_adjustments
);
criterion_main!(benches);
