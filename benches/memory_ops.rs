use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memedit::system::SimulatedSystem;
use memedit::{Address, MemoryAccessor, ScalarType};
use std::sync::Arc;

const PID: u32 = 4242;

fn fixture() -> Arc<SimulatedSystem> {
    let system = Arc::new(SimulatedSystem::new());
    system.spawn(PID, "game.exe");
    system.map_zeroed(PID, Address::new(0x1000), 0x10_0000);
    for level in 0..8u64 {
        let slot = 0x1000 + level * 0x100;
        system.poke(PID, Address::from(slot), &(slot + 0x100).to_le_bytes());
    }
    system
}

fn benchmark_memory_ops(c: &mut Criterion) {
    let accessor = MemoryAccessor::open(fixture(), PID).unwrap();

    c.bench_function("read_scalar_u64", |b| {
        b.iter(|| accessor.read_scalar(black_box(Address::new(0x2000)), ScalarType::U64));
    });

    c.bench_function("write_scalar_f32", |b| {
        b.iter(|| {
            accessor.write_scalar(black_box(Address::new(0x2000)), ScalarType::F32, 1.5f32)
        });
    });

    c.bench_function("read_bytes_4k", |b| {
        b.iter(|| accessor.read_bytes(black_box(Address::new(0x1000)), 4096));
    });

    let offsets = vec![0x0i64; 8];
    c.bench_function("resolve_chain_8", |b| {
        b.iter(|| accessor.resolve(Address::new(0x1000), black_box(&offsets)));
    });
}

criterion_group!(benches, benchmark_memory_ops);
criterion_main!(benches);
