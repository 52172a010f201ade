use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crash_round::{
    crash_point,
    round::{settle, Bet, PlayerId},
    Multiplier, ServerSeed,
};

const SEED: &str = "4a914640d8fccf507beb813f1f09b1d5bf887f0162909f1c6ac05bd8acc48e16";

/// Benchmark a single crash point derivation
fn bench_crash_point(c: &mut Criterion) {
    let seed = ServerSeed::new(SEED);

    c.bench_function("crash_point", |b| {
        b.iter(|| crash_point(black_box(&seed), black_box("abc"), black_box(1)));
    });
}

/// Benchmark seed generation plus commitment, as done at every round start
fn bench_seed_commit(c: &mut Criterion) {
    c.bench_function("seed_generate_commit", |b| {
        b.iter(|| ServerSeed::generate().commit());
    });
}

/// Benchmark settlement with a growing number of bets
fn bench_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle");

    for n_bets in [10, 100, 1000] {
        let bets: Vec<Bet> = (0..n_bets)
            .map(|i| {
                let mut bet = Bet::new(PlayerId::new(format!("p{}", i)), 10.0, "abc");
                if i % 2 == 0 {
                    bet.cash_out = Some(Multiplier::new(1.5));
                }
                bet
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(n_bets), &bets, |b, bets| {
            b.iter(|| settle(black_box(bets), Multiplier::new(2.0)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_crash_point, bench_seed_commit, bench_settlement);
criterion_main!(benches);
