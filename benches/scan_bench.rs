use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rescue::matcher::{AsciiDetector, JpegDetector};
use rescue::recovery::{FragmentSink, WrittenFragment};
use rescue::{Fragment, ScanConfig, Scanner};

/// Discards everything so only detection is measured
struct NullSink;

impl FragmentSink for NullSink {
    fn accept(&mut self, _data: &[u8], fragment: &Fragment) -> rescue::Result<WrittenFragment> {
        Ok(WrittenFragment {
            id: 0,
            file_name: String::new(),
            path: Default::default(),
            kind: fragment.kind(),
            start: fragment.start() as u64,
            end: fragment.end() as u64,
        })
    }
}

fn mixed_image() -> Vec<u8> {
    // binary noise with no EOI markers, broken by a long text block
    let mut data: Vec<u8> = (0..1024 * 1024u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8 & 0xF7)
        .collect();
    data[300_000..310_000].fill(b'e');
    data
}

fn bench_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("detectors");
    let data = mixed_image();

    group.bench_function("jpeg_header_check", |b| {
        b.iter(|| {
            (0..data.len())
                .filter(|&pos| JpegDetector::is_header(black_box(&data), pos))
                .count()
        })
    });

    group.bench_function("ascii_sweep", |b| {
        b.iter(|| {
            let mut detector = AsciiDetector::default();
            (0..data.len())
                .filter_map(|pos| detector.detect(black_box(&data), pos))
                .count()
        })
    });

    group.finish();
}

fn bench_full_scan(c: &mut Criterion) {
    let data = mixed_image();
    let scanner = Scanner::new(ScanConfig::default()).unwrap();

    c.bench_function("full_scan_1mib", |b| {
        b.iter(|| scanner.scan(black_box(&data), &mut NullSink).stats.fragments_written())
    });
}

criterion_group!(benches, bench_detectors, bench_full_scan);
criterion_main!(benches);
