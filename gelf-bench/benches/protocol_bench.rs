//! Record encoding and chunking benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gelf_protocol::{ChunkAssembler, Chunker, Compression, Decoder, Encoder, Level, RecordBuilder};

fn create_test_record(message_size: usize) -> gelf_protocol::LogRecord {
    RecordBuilder::new("bench-host")
        .caller("/srv/app/src/handler.rs", 120)
        .level(Level::Warning)
        .field("request_id", "req-8f14e45f")
        .field("latency_ms", 37)
        .build(format!("request failed\n{}", "x".repeat(message_size)).as_bytes())
}

fn bench_record_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_encode");

    for compression in [Compression::Zlib, Compression::Gzip, Compression::None] {
        for size in [100, 1000, 10000] {
            let record = create_test_record(size);
            let encoder = Encoder::new(compression);

            group.throughput(Throughput::Elements(1));
            group.bench_with_input(
                BenchmarkId::new(compression.to_string(), size),
                &record,
                |b, record| {
                    b.iter(|| black_box(encoder.encode(record).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_record_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_decode");

    for size in [100, 1000, 10000] {
        let payload = Encoder::default().encode(&create_test_record(size)).unwrap();

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(Decoder::decode(payload).unwrap()));
        });
    }

    group.finish();
}

fn bench_chunk_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_split");
    let chunker = Chunker::default();

    for size in [1000, 10000, 100000] {
        let payload = Bytes::from(vec![0x42u8; size]);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(chunker.split(payload.clone()).unwrap()));
        });
    }

    group.finish();
}

fn bench_chunk_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_assemble");
    let chunker = Chunker::default();

    for size in [10000, 100000] {
        let datagrams = chunker.split(Bytes::from(vec![0x42u8; size])).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &datagrams,
            |b, datagrams| {
                b.iter(|| {
                    let mut assembler = ChunkAssembler::new();
                    let mut out = None;
                    for datagram in datagrams {
                        out = assembler.accept(datagram).unwrap();
                    }
                    black_box(out)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_record_encode,
    bench_record_decode,
    bench_chunk_split,
    bench_chunk_assemble,
);

criterion_main!(benches);
