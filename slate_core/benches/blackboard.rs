// Micro-benchmarks for the blackboard hot paths: entry acquisition,
// direct publish, loan/commit, and the read copy.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slate_core::memory::ShmRegion;
use slate_core::Blackboard;

#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, bytemuck::NoUninit)]
enum Key {
    Scalar = 0,
    Block = 1,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Block {
    samples: [f64; 32],
}

fn bench_blackboard(c: &mut Criterion) {
    let name = format!("bb_bench_{}", std::process::id());
    let _ = ShmRegion::unlink(&name);

    let store = Blackboard::builder(&name, |a: &Key, b| a == b)
        .add(Key::Scalar, 0.0f64)
        .add(Key::Block, Block { samples: [0.0; 32] })
        .create()
        .unwrap();
    let writer = store.writer().unwrap();
    let reader = store.reader().unwrap();

    c.bench_function("update_with_copy/f64", |b| {
        let mut entry = writer.entry::<f64>(Key::Scalar).unwrap();
        let mut value = 0.0f64;
        b.iter(|| {
            value += 1.0;
            entry.update_with_copy(black_box(value));
        });
    });

    c.bench_function("get/f64", |b| {
        let entry = reader.entry::<f64>(Key::Scalar).unwrap();
        b.iter(|| black_box(entry.get()));
    });

    c.bench_function("entry_acquire/f64", |b| {
        b.iter(|| black_box(reader.entry::<f64>(Key::Scalar).unwrap()));
    });

    c.bench_function("loan_commit/256B", |b| {
        let block = Block { samples: [1.5; 32] };
        b.iter(|| {
            let entry = writer.entry::<Block>(Key::Block).unwrap();
            let mut loan = entry.loan_uninit();
            loan.write(black_box(block)).unwrap();
            let _ = loan.commit().unwrap();
        });
    });

    drop(writer);
    drop(reader);
    drop(store);
    let _ = ShmRegion::unlink(&name);
}

criterion_group!(benches, bench_blackboard);
criterion_main!(benches);
