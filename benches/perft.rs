use criterion::{criterion_group, criterion_main, Criterion};

use fianchetto::{perft, Board, MoveGenerator};

fn perft_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");
    group.sample_size(20);

    group.bench_function("startpos depth 4", |b| {
        let mut board = Board::standard_setup();
        let mut movegen = MoveGenerator::new();
        b.iter(|| perft(&mut board, &mut movegen, 4))
    });

    group.bench_function("kiwipete depth 3", |b| {
        let mut board =
            Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .unwrap();
        let mut movegen = MoveGenerator::new();
        b.iter(|| perft(&mut board, &mut movegen, 3))
    });

    group.finish();
}

criterion_group!(benches, perft_benchmarks);
criterion_main!(benches);
