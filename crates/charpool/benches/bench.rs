use charpool::{
    AllocationService, AllocatorConfig, Alphabet, IdentityStore, MemoryStore, ThreadRandom,
};
use core::hint::black_box;
use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};

const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn codes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{i:05}")).collect()
}

fn new_service<S: IdentityStore>(store: S) -> AllocationService<S, ThreadRandom> {
    let alphabet: Alphabet = ALPHABET.parse().expect("valid alphabet");
    AllocationService::new(store, AllocatorConfig::new(alphabet), ThreadRandom)
}

/// Fills the whole pool, one participant at a time. The tail of each run is
/// dominated by collisions and the shuffled scan.
fn bench_fill_pool(c: &mut Criterion) {
    let n = ALPHABET.chars().count();
    let codes = codes(n);

    let mut group = c.benchmark_group("fill_pool");
    group.throughput(Throughput::Elements(n as u64));

    group.bench_function("memory", |b| {
        b.iter_batched(
            || {
                let service = new_service(MemoryStore::new());
                for code in &codes {
                    service.login(code).expect("login");
                }
                service
            },
            |service| {
                for code in &codes {
                    black_box(service.request_allocation(code).expect("allocation"));
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_login(c: &mut Criterion) {
    let service = new_service(MemoryStore::new());
    let codes = codes(1_000);

    let mut group = c.benchmark_group("login");
    group.throughput(Throughput::Elements(codes.len() as u64));
    group.bench_function("memory", |b| {
        b.iter(|| {
            for code in &codes {
                black_box(service.login(code).expect("login"));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_fill_pool, bench_login);
criterion_main!(benches);
