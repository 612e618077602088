use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use stockroom::{AdmissionGate, TokenBucket};

fn benchmark_token_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_bucket");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    // Bucket large enough that every call is allowed
    group.bench_function("allowed", |b| {
        let bucket = TokenBucket::new(u32::MAX, Duration::from_nanos(1)).unwrap();
        b.iter(|| black_box(bucket.allow()));
    });

    // Drained bucket with a long interval (worst case: every call denied)
    group.bench_function("denied", |b| {
        let bucket = TokenBucket::new(1, Duration::from_secs(3600)).unwrap();
        bucket.allow();
        b.iter(|| black_box(bucket.allow()));
    });

    // Caller-supplied timestamps skip the clock read
    group.bench_function("allow_at_fixed_instant", |b| {
        let now = Instant::now();
        let bucket = TokenBucket::new_at(1, Duration::from_secs(3600), now).unwrap();
        b.iter(|| black_box(bucket.allow_at(black_box(now))));
    });

    group.finish();
}

fn benchmark_contended_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_gate");
    group.measurement_time(Duration::from_secs(10));

    for threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * 1_000));
        group.bench_function(format!("contended_{threads}_threads"), |b| {
            let gate = Arc::new(AdmissionGate::new(
                TokenBucket::new(1_000, Duration::from_micros(10)).unwrap(),
            ));

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let gate = Arc::clone(&gate);
                        thread::spawn(move || {
                            for _ in 0..1_000 {
                                black_box(gate.check());
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_token_bucket, benchmark_contended_gate);
criterion_main!(benches);
