/// Property-based tests for bracket construction and scheduling
///
/// These tests check the structural invariants of brackets across random
/// bracket sizes, participant counts and match outcomes.
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;
use word_bracket::tournament::bracket::{self, Bracket, promotion_target};
use word_bracket::tournament::scheduler::{round_deadline, round_schedule};
use word_bracket::tournament::scoring::{Aggregate, DecidedBy, compare};
use word_bracket::tournament::{
    BracketBuilder, Difficulty, LegScore, MatchPlayer, Participant, QuizConfig, Resolution,
    Rewards, Seat, Tournament, TournamentStatus,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
}

fn participants(n: usize) -> Vec<Participant> {
    (1..=n as i64)
        .map(|id| Participant {
            user_id: id,
            display_name: format!("p{id}"),
            level: 1,
            registered_at: now(),
        })
        .collect()
}

// Strategy to generate a bracket size and a participant count that fits it
fn bracket_strategy() -> impl Strategy<Value = (u32, usize)> {
    (1u32..=7).prop_flat_map(|exp| {
        let size = 1u32 << exp;
        (Just(size), 0usize..=size as usize)
    })
}

fn tournament(max_participants: u32, minutes: u32) -> Tournament {
    Tournament {
        id: 1,
        title: "t".to_string(),
        grade: "1".to_string(),
        unit_id: "u".to_string(),
        status: TournamentStatus::Active,
        registration_opens_at: now(),
        registration_closes_at: now(),
        start_date: now(),
        round_duration_minutes: minutes,
        participants: Vec::new(),
        matches: Vec::new(),
        current_round: max_participants,
        champion_id: None,
        max_participants,
        min_level: 0,
        rewards: Rewards::default(),
        config: QuizConfig {
            difficulty: Difficulty::Easy,
            word_count: 5,
        },
        aborted: false,
        rewards_paid: false,
        version: 0,
        created_at: now(),
        updated_at: now(),
    }
}

/// Play each round with the given scores until the final is decided
fn play_out(mut bracket: Bracket, scores: &[i64]) -> Bracket {
    let size = bracket.size();
    let mut round = size;
    let mut next_score = scores.iter().cycle();
    while round >= 2 {
        let mut winners = Vec::new();
        for slot in 0..round / 2 {
            let Some(m) = bracket.get_mut(round, slot) else {
                continue;
            };
            if m.is_playable() {
                for _ in 0..m.legs_required() {
                    let a = *next_score.next().unwrap_or(&0);
                    let b = *next_score.next().unwrap_or(&0);
                    m.record_leg(Seat::Player1, LegScore::new(a, 1_000), now())
                        .unwrap();
                    m.record_leg(Seat::Player2, LegScore::new(b, 1_000), now())
                        .unwrap();
                }
            }
            if let Some(winner) = m.winner().cloned() {
                winners.push((slot, winner));
            }
        }
        for (slot, winner) in winners {
            if let Some(target) = promotion_target(round, slot) {
                bracket.promote(target, winner, now()).unwrap();
            }
        }
        // Newly promoted singletons become byes
        bracket.settle_byes(now()).unwrap();
        round /= 2;
    }
    bracket
}

proptest! {
    #[test]
    fn test_bracket_has_size_minus_one_matches((size, count) in bracket_strategy()) {
        let bracket = BracketBuilder::new(1, size)
            .unwrap()
            .build(&participants(count), now())
            .unwrap();

        prop_assert_eq!(bracket.matches().len(), size as usize - 1);
        for round in bracket::rounds(size) {
            prop_assert_eq!(bracket.round(round).len(), round as usize / 2);
        }
    }

    #[test]
    fn test_every_participant_seated_once((size, count) in bracket_strategy()) {
        let bracket = BracketBuilder::new(9, size)
            .unwrap()
            .build(&participants(count), now())
            .unwrap();

        let seated: Vec<_> = bracket
            .round(size)
            .iter()
            .flat_map(|m| m.player_ids().collect::<Vec<_>>())
            .collect();
        let unique: HashSet<_> = seated.iter().copied().collect();
        prop_assert_eq!(seated.len(), count);
        prop_assert_eq!(unique.len(), count);
    }

    #[test]
    fn test_byes_match_empty_seats((size, count) in bracket_strategy()) {
        let bracket = BracketBuilder::new(3, size)
            .unwrap()
            .build(&participants(count), now())
            .unwrap();

        let half = size as usize / 2;
        let byes = bracket
            .round(size)
            .iter()
            .filter(|m| m.resolution == Some(Resolution::Bye))
            .count();
        let voids = bracket
            .round(size)
            .iter()
            .filter(|m| m.resolution == Some(Resolution::Void))
            .count();

        prop_assert_eq!(byes, count.min(half) - count.saturating_sub(half));
        prop_assert_eq!(voids, half.saturating_sub(count));
    }

    #[test]
    fn test_same_tournament_same_pairing(id in 1i64..10_000, count in 2usize..=32) {
        let players = participants(count);
        let first = BracketBuilder::new(id, 32).unwrap().build(&players, now()).unwrap();
        let second = BracketBuilder::new(id, 32).unwrap().build(&players, now()).unwrap();

        let pairs = |b: &Bracket| -> Vec<Vec<i64>> {
            b.round(32).iter().map(|m| m.player_ids().collect()).collect()
        };
        prop_assert_eq!(pairs(&first), pairs(&second));
    }

    #[test]
    fn test_champion_won_every_match_on_its_path(
        (size, count) in bracket_strategy(),
        scores in prop::collection::vec(0i64..20, 1..64),
    ) {
        prop_assume!(count >= 2);
        let bracket = BracketBuilder::new(5, size)
            .unwrap()
            .build(&participants(count), now())
            .unwrap();
        let played = play_out(bracket, &scores);

        let final_match = played.get(2, 0).unwrap();
        prop_assert!(final_match.is_resolved());
        let champion = final_match.winner_id.unwrap();

        let path: Vec<_> = played
            .matches()
            .iter()
            .filter(|m| m.seat_of(champion).is_some())
            .collect();
        prop_assert!(!path.is_empty());
        for m in path {
            prop_assert_eq!(m.winner_id, Some(champion));
        }
        prop_assert!(played.matches().iter().all(|m| m.is_resolved()));
    }

    #[test]
    fn test_deadlines_increase_toward_final(exp in 1u32..=10, minutes in 1u32..=240) {
        let t = tournament(1 << exp, minutes);
        let schedule = round_schedule(&t);

        prop_assert_eq!(schedule.len(), exp as usize);
        prop_assert_eq!(
            schedule[0].deadline,
            t.start_date + Duration::minutes(i64::from(minutes))
        );
        for pair in schedule.windows(2) {
            prop_assert!(pair[0].round > pair[1].round);
            prop_assert!(pair[0].deadline < pair[1].deadline);
        }
        prop_assert_eq!(
            round_deadline(&t, 2),
            t.start_date + Duration::minutes(i64::from(minutes) * i64::from(exp))
        );
    }

    #[test]
    fn test_higher_score_always_wins(
        a in 0i64..1_000, b in 0i64..1_000,
        ta in 0i64..600_000, tb in 0i64..600_000,
    ) {
        let first = Aggregate::from_leg(&LegScore::new(a, ta));
        let second = Aggregate::from_leg(&LegScore::new(b, tb));
        let (seat, decided_by) = compare(&first, &second);

        if a != b {
            prop_assert_eq!(decided_by, DecidedBy::Score);
            prop_assert_eq!(seat == Seat::Player1, a > b);
        } else if ta != tb {
            prop_assert_eq!(decided_by, DecidedBy::ElapsedTime);
            prop_assert_eq!(seat == Seat::Player1, ta < tb);
        } else {
            prop_assert_eq!((seat, decided_by), (Seat::Player1, DecidedBy::SeedOrder));
        }
    }
}

#[test]
fn test_promotion_targets_cover_next_round_exactly_once() {
    let bracket = Bracket::skeleton(1, 64, now()).unwrap();
    for round in bracket::rounds(64).filter(|r| *r > 2) {
        let mut targets = HashSet::new();
        for m in bracket.round(round) {
            let target = promotion_target(m.round, m.slot).unwrap();
            assert!(targets.insert((target.slot, target.seat)));
            assert!(bracket.get(target.round, target.slot).is_some());
        }
        assert_eq!(targets.len(), round as usize / 2);
    }
}

#[test]
fn test_promoted_player_is_seated() {
    let mut bracket = Bracket::skeleton(1, 4, now()).unwrap();
    let player = MatchPlayer {
        user_id: 11,
        display_name: "eleven".to_string(),
    };
    let target = promotion_target(4, 1).unwrap();
    assert!(bracket.promote(target, player.clone(), now()).unwrap());
    assert!(!bracket.promote(target, player, now()).unwrap());
    assert_eq!(
        bracket.get(2, 0).and_then(|m| m.player2.as_ref()).map(|p| p.user_id),
        Some(11)
    );
}
