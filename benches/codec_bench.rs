//! Benchmarks for the pack cipher and envelope codec.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use airlink_core::{ParameterName, SessionKey};
use airlink_protocol::{EnvelopeCodec, PackCipher, Request, status_request};
use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

fn session_key() -> SessionKey {
    "Ab1Cd2Ef3Gh4Ij5K".parse().unwrap()
}

/// Benchmark encrypting status queries of increasing width.
fn bench_encrypt_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_status");
    let cipher = PackCipher::new(&session_key());

    for width in [1usize, 4, ParameterName::ALL.len()] {
        let request = Request::status("f4911e7aca7b", &ParameterName::ALL[..width]);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(width), &request, |b, request| {
            b.iter(|| black_box(cipher.encrypt(black_box(request)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decrypting a full status query.
fn bench_decrypt_status(c: &mut Criterion) {
    let cipher = PackCipher::new(&session_key());
    let pack = cipher
        .encrypt(&Request::status("f4911e7aca7b", &ParameterName::ALL))
        .unwrap();

    c.bench_function("decrypt_status", |b| {
        b.iter(|| {
            let request: Request = cipher.decrypt(black_box(&pack)).unwrap();
            black_box(request);
        });
    });
}

/// Benchmark encoding and decoding a session-keyed envelope.
fn bench_envelope_roundtrip(c: &mut Criterion) {
    let envelope = status_request("f4911e7aca7b", &session_key(), &ParameterName::ALL).unwrap();

    c.bench_function("envelope_roundtrip", |b| {
        b.iter(|| {
            let mut codec = EnvelopeCodec::new();
            let mut buffer = BytesMut::new();
            codec.encode(black_box(envelope.clone()), &mut buffer).unwrap();
            black_box(codec.decode(&mut buffer).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_encrypt_status,
    bench_decrypt_status,
    bench_envelope_roundtrip,
);

criterion_main!(benches);
