use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use word_bracket::tournament::{
    BracketBuilder, LegScore, MatchPlayer, Participant, Seat, TournamentMatch,
    bracket::{Bracket, promotion_target},
    scoring::decide,
};

/// Helper to create N registered participants
fn participants(n: i64) -> Vec<Participant> {
    let now = Utc::now();
    (1..=n)
        .map(|id| Participant {
            user_id: id,
            display_name: format!("player{}", id),
            level: 1,
            registered_at: now,
        })
        .collect()
}

/// Benchmark building full brackets of increasing size
fn bench_build_full_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_full_bracket");
    let now = Utc::now();

    for size in [8u32, 64, 256, 1024] {
        let players = participants(i64::from(size));
        let builder = BracketBuilder::new(1, size).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &players, |b, players| {
            b.iter(|| builder.build(black_box(players), now).unwrap());
        });
    }

    group.finish();
}

/// Benchmark a half-empty bracket, where bye settlement cascades
fn bench_build_sparse_bracket(c: &mut Criterion) {
    let now = Utc::now();
    let players = participants(300);
    let builder = BracketBuilder::new(7, 1024).unwrap();

    c.bench_function("build_sparse_bracket_300_of_1024", |b| {
        b.iter(|| builder.build(black_box(&players), now).unwrap());
    });
}

/// Benchmark playing every match of a 256 bracket through to the final
fn bench_play_out_bracket(c: &mut Criterion) {
    let now = Utc::now();
    let players = participants(256);
    let built = BracketBuilder::new(3, 256)
        .unwrap()
        .build(&players, now)
        .unwrap();

    c.bench_function("play_out_bracket_256", |b| {
        b.iter(|| {
            let mut matches = built.clone().into_matches();
            let mut round = 256;
            while round >= 2 {
                let mut bracket = Bracket::from_matches(256, matches).unwrap();
                let winners: Vec<(u32, MatchPlayer)> = bracket
                    .round(round)
                    .iter()
                    .map(|m| (m.slot, play(m.clone(), now)))
                    .collect();
                for (slot, winner) in winners {
                    if let Some(target) = promotion_target(round, slot) {
                        bracket.promote(target, winner, now).unwrap();
                    }
                }
                matches = bracket.into_matches();
                round /= 2;
            }
            black_box(matches)
        });
    });
}

fn play(mut m: TournamentMatch, now: chrono::DateTime<Utc>) -> MatchPlayer {
    let legs = m.legs_required();
    for leg in 0..legs as i64 {
        m.record_leg(Seat::Player1, LegScore::new(10 + leg, 60_000), now)
            .unwrap();
        m.record_leg(Seat::Player2, LegScore::new(9 + leg, 55_000), now)
            .unwrap();
    }
    let decision = decide(&m).unwrap();
    m.player(decision.seat).cloned().unwrap()
}

criterion_group!(
    benches,
    bench_build_full_bracket,
    bench_build_sparse_bracket,
    bench_play_out_bracket
);
criterion_main!(benches);
