//! Criterion benchmarks for the DDC/CI frame codec.
//!
//! Frame building and reply validation run once per bus transaction, so they
//! must stay negligible next to the 10 ms reply delay a display needs.
//!
//! Run with:
//! ```bash
//! cargo bench --package ddc-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ddc_core::protocol::capabilities::{decode_capability_chunk, encode_capability_reply};
use ddc_core::protocol::profile::{encode_vcp_reply, VcpResult};
use ddc_core::{Capabilities, ProtocolProfile, VcpValue};

const CAPABILITY_STRING: &str = "(prot(monitor)type(lcd)model(U2415)cmds(01 02 03 07 0C E3 F3)\
vcp(02 04 05 08 10 12 14(05 08 0B 0C) 16 18 1A 52 60(01 0F 11) AA(01 02) AC AE B2 B6 C6 C8 C9 \
D6(01 04 05) DC(00 02 03 05) DF E0 E1 E2(00 01 02 04 0E 12 14) F0(0C) F1 F2 FD)mswhql(1)\
asset_eep(40)mccs_ver(2.1))";

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks command frame construction for both profiles.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_set_vcp");
    for profile in [ProtocolProfile::Legacy, ProtocolProfile::Message] {
        group.bench_with_input(
            BenchmarkId::new("profile", format!("{profile:?}")),
            &profile,
            |b, profile| {
                b.iter(|| {
                    profile
                        .encode_set_vcp(black_box(0x10), black_box(50))
                        .expect("encode must succeed")
                })
            },
        );
    }
    group.finish();
}

/// Benchmarks reply validation and decoding.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_reply");

    let vcp = encode_vcp_reply(
        0x10,
        VcpResult::Supported,
        VcpValue {
            current: 50,
            maximum: 100,
        },
    );
    group.bench_function("vcp_reply", |b| {
        b.iter(|| {
            ProtocolProfile::Message
                .decode_vcp_reply(black_box(0x10), black_box(&vcp))
                .expect("decode must succeed")
        })
    });

    let chunk = encode_capability_reply(0x40, &[b'a'; 32]);
    group.bench_function("capability_chunk", |b| {
        b.iter(|| decode_capability_chunk(black_box(&chunk), black_box(0x40)).expect("valid"))
    });

    group.finish();
}

/// Benchmarks parsing a realistic capability string.
fn bench_capabilities(c: &mut Criterion) {
    c.bench_function("capabilities_parse", |b| {
        b.iter(|| Capabilities::parse(black_box(CAPABILITY_STRING)).expect("parse must succeed"))
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_capabilities);
criterion_main!(benches);
