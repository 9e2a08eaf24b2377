use std::io::{Read, Write};

use criterion::{black_box, BatchSize, BenchmarkId, Criterion, Throughput};
use criterion::{criterion_group, criterion_main};
use tempfile::tempdir;

use segcodec::{create_segment, open_segment, CodecConfig, Compressor};

const SEGMENT_BYTES: usize = 4 * 1024 * 1024;

fn segment_payload() -> Vec<u8> {
    b"ts=1700000000 level=info seq=42 msg=\"segment append ok\"\n"
        .iter()
        .copied()
        .cycle()
        .take(SEGMENT_BYTES)
        .collect()
}

fn bench_write(c: &mut Criterion) {
    let payload = segment_payload();
    let mut group = c.benchmark_group("write_segment");
    group.throughput(Throughput::Bytes(SEGMENT_BYTES as u64));
    for compressor in Compressor::ALL {
        group.bench_with_input(
            BenchmarkId::from_parameter(compressor),
            &compressor,
            |b, &compressor| {
                b.iter_batched(
                    || tempdir().expect("tempdir"),
                    |dir| {
                        let bare = dir.path().join("000000000");
                        let mut segment =
                            create_segment(&bare, compressor, CodecConfig::default())
                                .expect("create");
                        for chunk in payload.chunks(64 * 1024) {
                            segment.write_all(black_box(chunk)).expect("write");
                        }
                        segment.close().expect("close");
                    },
                    BatchSize::PerIteration,
                );
            },
        );
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let payload = segment_payload();
    let mut group = c.benchmark_group("read_segment");
    group.throughput(Throughput::Bytes(SEGMENT_BYTES as u64));
    for compressor in Compressor::ALL {
        let dir = tempdir().expect("tempdir");
        let bare = dir.path().join("000000000");
        let mut segment =
            create_segment(&bare, compressor, CodecConfig::default()).expect("create");
        segment.write_all(&payload).expect("write");
        segment.close().expect("close");
        let stored = compressor.with_suffix_path(&bare);

        group.bench_with_input(BenchmarkId::from_parameter(compressor), &stored, |b, stored| {
            let mut buf = vec![0u8; 64 * 1024];
            b.iter(|| {
                let mut segment = open_segment(stored, CodecConfig::default()).expect("open");
                let mut total = 0usize;
                loop {
                    let n = segment.read(&mut buf).expect("read");
                    if n == 0 {
                        break;
                    }
                    total += n;
                }
                segment.close().expect("close");
                black_box(total)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
