use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use storescope_gate::ScopeGate;
use storescope_scope::{Scope, TypeId, lowest};

fn bench_codec(c: &mut Criterion) {
    c.bench_function("type_id_pack_unpack", |b| {
        b.iter(|| {
            let id = TypeId::pack(black_box(Scope::Store), black_box(8_123));
            black_box(id.unpack())
        })
    });

    let ids = [
        Scope::Store.with_id(2),
        Scope::Website.with_id(1),
        Scope::Store.with_id(2),
        Scope::Default.with_id(0),
    ];
    c.bench_function("lowest_4", |b| b.iter(|| lowest(black_box(&ids))));
}

fn bench_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate");

    for keys in [16i64, 1024] {
        group.bench_with_input(BenchmarkId::new("start_done_reset", keys), &keys, |b, &keys| {
            let gate = ScopeGate::new();
            b.iter(|| {
                for id in 0..keys {
                    let key = Scope::Store.with_id(id);
                    if gate.should_start(&key) {
                        gate.done(&key).unwrap();
                    }
                }
                gate.reset();
            })
        });
    }

    let gate = ScopeGate::new();
    let key = Scope::Website.with_id(1);
    gate.should_start(&key);
    gate.done(&key).unwrap();
    group.bench_function("wait_on_done_key", |b| b.iter(|| gate.should_wait(black_box(&key))));

    group.finish();
}

criterion_group!(benches, bench_codec, bench_gate);
criterion_main!(benches);
