//! End-to-end scenarios: whole-bundle generation runs, evaluator checks
//! and the cross-cutting guarantees (determinism, hard-constraint
//! cleanliness, comparison consistency).

use backend::*;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn t(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn season(start: &str, end: &str, games_start: Option<&str>) -> Season {
    Season {
        id: "spring".into(),
        start_date: d(start),
        end_date: d(end),
        games_start_date: games_start.map(d),
        blackout_dates: vec![],
        status: Default::default(),
    }
}

fn division(id: &str, order: i32) -> Division {
    Division {
        id: id.into(),
        name: id.to_uppercase(),
        scheduling_order: order,
    }
}

fn team(id: &str, division_id: &str) -> Team {
    Team {
        id: id.into(),
        division_id: division_id.into(),
        name: id.to_uppercase(),
    }
}

fn field(id: &str) -> SeasonField {
    SeasonField {
        id: id.into(),
        name: id.to_uppercase(),
        division_compatibility: vec![],
    }
}

fn cage(id: &str) -> SeasonCage {
    SeasonCage {
        id: id.into(),
        name: id.to_uppercase(),
        division_compatibility: vec![],
    }
}

fn base_config(division_id: &str) -> DivisionConfig {
    DivisionConfig {
        division_id: division_id.into(),
        games_per_week: 0,
        practices_per_week: 0,
        cage_sessions_per_week: 0,
        game_duration_hours: 2.0,
        practice_duration_hours: 1.0,
        cage_session_duration_hours: 0.5,
        game_arrival_hours: 0.0,
        practice_arrival_minutes: 0,
        cage_arrival_minutes: 0,
        max_games_per_season: None,
        game_week_overrides: vec![],
        field_preferences: vec![],
        game_day_preferences: vec![],
        min_consecutive_day_gap: None,
        sunday_paired_practice: false,
    }
}

fn field_window(field_id: &str, day_of_week: u8, start: &str, end: &str) -> FieldAvailability {
    FieldAvailability {
        season_field_id: field_id.into(),
        day_of_week,
        start_time: t(start),
        end_time: t(end),
        single_event_only: false,
    }
}

fn cage_window(cage_id: &str, day_of_week: u8, start: &str, end: &str) -> CageAvailability {
    CageAvailability {
        season_cage_id: cage_id.into(),
        day_of_week,
        start_time: t(start),
        end_time: t(end),
        single_event_only: false,
    }
}

/// Scenario: two teams, one field, one Saturday window, one game.
#[test]
fn single_matchup_lands_inside_the_saturday_window() {
    let mut config = base_config("d");
    config.games_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-01", "2026-03-07", Some("2026-03-01")),
        divisions: vec![division("d", 1)],
        teams: vec![team("t1", "d"), team("t2", "d")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![field_window("field1", 6, "09:00", "13:00")],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(1), None);

    assert!(result.errors.is_empty());
    assert_eq!(result.status, GenerationStatus::Complete);
    assert_eq!(result.events.len(), 1, "warnings: {:?}", result.warnings);

    let game = &result.events[0];
    assert_eq!(game.date, d("2026-03-07"));
    assert_eq!(game.event_type(), EventType::Game);
    assert!(game.start_time >= t("09:00"));
    assert!(game.end_time <= t("13:00"));
    assert_eq!(
        backend::calendar::duration_hours(game.start_time, game.end_time),
        2.0
    );

    let EventKind::Game {
        home_team_id,
        away_team_id,
        field_id,
    } = &game.kind
    else {
        panic!("expected a game, got {:?}", game.kind);
    };
    assert_eq!(field_id.as_str(), "field1");
    let mut pair = [home_team_id.as_str(), away_team_id.as_str()];
    pair.sort_unstable();
    assert_eq!(pair, ["t1", "t2"]);
}

/// Scenario: two divisions fight over the same Saturday field; the
/// required-day budget guarantees both get games and the cell never
/// overflows.
#[test]
fn competition_group_shares_the_required_day() {
    let make_config = |id: &str| {
        let mut config = base_config(id);
        config.games_per_week = 2;
        config.field_preferences = vec!["field1".into()];
        config.game_day_preferences = vec![GameDayPreference {
            day_of_week: 6,
            priority: GameDayPriority::Required,
            max_games_per_day: None,
        }];
        config
    };

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-03-08", None),
        divisions: vec![division("a", 1), division("b", 2)],
        teams: vec![
            team("a1", "a"),
            team("a2", "a"),
            team("a3", "a"),
            team("a4", "a"),
            team("b1", "b"),
            team("b2", "b"),
            team("b3", "b"),
            team("b4", "b"),
        ],
        division_configs: vec![make_config("a"), make_config("b")],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![field_window("field1", 6, "09:00", "17:00")],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(7), None);
    assert!(result.errors.is_empty());

    let saturday = d("2026-03-07");
    let mut per_division: HashMap<&str, usize> = HashMap::new();
    for event in &result.events {
        assert_eq!(event.event_type(), EventType::Game);
        assert_eq!(event.date, saturday);
        *per_division.entry(event.division_id.as_str()).or_insert(0) += 1;
    }

    let a_games = per_division.get("a").copied().unwrap_or(0);
    let b_games = per_division.get("b").copied().unwrap_or(0);
    assert!(a_games >= 1, "division a was starved: {per_division:?}");
    assert!(b_games >= 1, "division b was starved: {per_division:?}");
    assert!(a_games + b_games <= 4, "cell overflowed: {per_division:?}");
}

/// Scenario: a dateless blackout override wipes the whole date.
#[test]
fn full_date_blackout_emits_nothing_that_day() {
    let mut config = base_config("d");
    config.games_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-04-01", "2026-04-11", Some("2026-04-01")),
        divisions: vec![division("d", 1)],
        teams: vec![team("t1", "d"), team("t2", "d")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![field_window("field1", 6, "09:00", "17:00")],
            field_overrides: vec![FieldDateOverride {
                season_field_id: "field1".into(),
                date: d("2026-04-04"),
                override_type: OverrideType::Blackout,
                start_time: None,
                end_time: None,
                single_event_only: None,
            }],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(5), None);
    assert!(result.errors.is_empty());
    assert!(result.events.iter().all(|e| e.date != d("2026-04-04")));
    // The other Saturday carries the game instead.
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].date, d("2026-04-11"));
}

/// Scenario: a practice the day before a game trips the min-gap rule as a
/// warning, not an error.
#[test]
fn min_gap_infraction_is_a_warning_not_an_error() {
    let mut config = base_config("d");
    config.games_per_week = 1;
    config.min_consecutive_day_gap = Some(2);

    let bundle = InputBundle {
        season: season("2026-03-01", "2026-03-31", Some("2026-03-01")),
        divisions: vec![division("d", 1)],
        teams: vec![team("t1", "d"), team("t2", "d")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle::default(),
        scoring_weights: None,
    };

    let events = vec![
        ScheduledEventDraft {
            division_id: "d".into(),
            date: d("2026-03-10"),
            start_time: t("16:00"),
            end_time: t("17:00"),
            kind: EventKind::Practice {
                field_id: "field1".into(),
                team_id: "t1".into(),
            },
            status: Default::default(),
            notes: None,
        },
        ScheduledEventDraft {
            division_id: "d".into(),
            date: d("2026-03-11"),
            start_time: t("09:00"),
            end_time: t("11:00"),
            kind: EventKind::Game {
                field_id: "field1".into(),
                home_team_id: "t1".into(),
                away_team_id: "t2".into(),
            },
            status: Default::default(),
            notes: None,
        },
    ];

    let report = evaluate(&bundle, &events);
    let violations = &report.metrics.constraint_violations;

    assert!(violations.passed, "min-gap must not be an error: {violations:?}");
    let min_gap = violations
        .details
        .iter()
        .find(|detail| detail.note.contains("min_day_gap"))
        .expect("expected a min_day_gap finding");
    assert_eq!(min_gap.severity, Some(Severity::Warning));
    assert_eq!(min_gap.value, 1.0);
    assert_eq!(min_gap.subject, "t1");
}

/// Scenario: a weekly Saturday cadence keeps every team's short-rest
/// count identical, and nobody plays the same opponent too often.
#[test]
fn short_rest_load_spreads_fairly() {
    let mut config = base_config("d");
    config.games_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-04-05", None),
        divisions: vec![division("d", 1)],
        teams: vec![
            team("t1", "d"),
            team("t2", "d"),
            team("t3", "d"),
            team("t4", "d"),
        ],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![field_window("field1", 6, "09:00", "17:00")],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(3), None);
    assert!(result.errors.is_empty());

    let games: Vec<_> = result
        .events
        .iter()
        .filter(|e| e.event_type() == EventType::Game)
        .collect();
    assert!(games.len() >= 8, "expected most of 10 games, got {}", games.len());

    let report = evaluate(&bundle, &result.events);
    assert!(
        report.metrics.game_spacing.passed,
        "{:?}",
        report.metrics.game_spacing
    );

    // Round-robin upper bound: two five-game cycles imply at most two
    // meetings per pair.
    let mut per_pair: HashMap<(String, String), u32> = HashMap::new();
    for game in &games {
        if let EventKind::Game {
            home_team_id,
            away_team_id,
            ..
        } = &game.kind
        {
            let key = if home_team_id < away_team_id {
                (home_team_id.clone(), away_team_id.clone())
            } else {
                (away_team_id.clone(), home_team_id.clone())
            };
            *per_pair.entry(key).or_insert(0) += 1;
        }
    }
    assert!(per_pair.values().all(|&count| count <= 2), "{per_pair:?}");
}

/// A full mixed run (games + practices + cages) stays clean under every
/// hard constraint, including window containment.
#[test]
fn generated_schedules_violate_no_hard_constraints() {
    let mut config = base_config("d");
    config.games_per_week = 1;
    config.practices_per_week = 1;
    config.cage_sessions_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-03-22", Some("2026-03-02")),
        divisions: vec![division("d", 1)],
        teams: vec![
            team("t1", "d"),
            team("t2", "d"),
            team("t3", "d"),
            team("t4", "d"),
        ],
        division_configs: vec![config],
        fields: vec![field("field1"), field("field2")],
        cages: vec![cage("cage1")],
        availability: AvailabilityBundle {
            field_availabilities: vec![
                field_window("field1", 6, "09:00", "17:00"),
                field_window("field2", 2, "16:00", "20:00"),
                field_window("field2", 4, "16:00", "20:00"),
            ],
            cage_availabilities: vec![
                cage_window("cage1", 1, "16:00", "20:00"),
                cage_window("cage1", 3, "16:00", "20:00"),
            ],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(11), None);
    assert!(result.errors.is_empty());
    assert!(!result.events.is_empty());

    let report = evaluate(&bundle, &result.events);
    assert!(
        report.metrics.constraint_violations.passed,
        "{:#?}",
        report.metrics.constraint_violations
    );

    // Spot-check the invariants directly as well.
    for (i, a) in result.events.iter().enumerate() {
        for b in result.events.iter().skip(i + 1) {
            if a.resource_id() == b.resource_id() && a.resource_kind() == b.resource_kind() {
                assert!(!a.overlaps(b), "resource double-booking: {a:?} / {b:?}");
            }
            for team_id in a.team_ids() {
                if b.involves_team(team_id) {
                    assert!(!a.overlaps(b), "team double-booking: {a:?} / {b:?}");
                }
            }
        }
    }
    for event in &result.events {
        assert_eq!(event.division_id, "d");
        if event.event_type() == EventType::Game {
            assert!(event.date >= d("2026-03-02"));
        }
    }
}

/// Determinism: equal bundles and equal seeds must reproduce the exact
/// event list; the evaluator must be a pure function of its inputs.
#[test]
fn fixed_seed_reproduces_the_schedule() {
    let mut config = base_config("d");
    config.games_per_week = 1;
    config.practices_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-03-15", None),
        divisions: vec![division("d", 1)],
        teams: vec![
            team("t1", "d"),
            team("t2", "d"),
            team("t3", "d"),
            team("t4", "d"),
        ],
        division_configs: vec![config],
        fields: vec![field("field1"), field("field2")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![
                field_window("field1", 6, "09:00", "17:00"),
                field_window("field2", 2, "16:00", "20:00"),
                field_window("field2", 4, "16:00", "20:00"),
            ],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let first = generate(&bundle, Some(42), None);
    let second = generate(&bundle, Some(42), None);
    assert_eq!(first.events, second.events);
    assert_eq!(first.stats, second.stats);

    let eval_a = evaluate(&bundle, &first.events);
    let eval_b = evaluate(&bundle, &first.events);
    assert_eq!(eval_a.metrics, eval_b.metrics);
    assert_eq!(eval_a.overall_score, eval_b.overall_score);
}

/// Comparing a schedule against itself reports every metric unchanged.
#[test]
fn self_comparison_is_all_unchanged() {
    let mut config = base_config("d");
    config.games_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-03-08", None),
        divisions: vec![division("d", 1)],
        teams: vec![team("t1", "d"), team("t2", "d")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![field_window("field1", 6, "09:00", "13:00")],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(9), None);
    let report = compare(&bundle, &result.events, &result.events);

    assert_eq!(report.metrics.len(), 10);
    assert_eq!(report.improved, 0);
    assert_eq!(report.regressed, 0);
    assert_eq!(report.unchanged, 10);
    assert_eq!(report.score_delta, 0);
    assert!(report
        .metrics
        .values()
        .all(|m| m.change == MetricChange::Unchanged));
}

/// Fatal preconditions return typed errors and an empty event list.
#[test]
fn missing_inputs_fail_fast_with_typed_errors() {
    let empty = InputBundle {
        season: season("2026-03-01", "2026-03-31", None),
        divisions: vec![division("d", 1)],
        teams: vec![],
        division_configs: vec![],
        fields: vec![],
        cages: vec![],
        availability: AvailabilityBundle::default(),
        scoring_weights: None,
    };
    let result = generate(&empty, None, None);
    assert!(result.events.is_empty());
    assert!(result.errors.contains(&GenerationError::NoTeams));
    assert!(result.errors.contains(&GenerationError::NoFields));

    let mut config = base_config("d");
    config.cage_sessions_per_week = 1;
    let no_cages = InputBundle {
        season: season("2026-03-01", "2026-03-31", None),
        divisions: vec![division("d", 1), division("orphan", 2)],
        teams: vec![team("t1", "d"), team("o1", "orphan")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle::default(),
        scoring_weights: None,
    };
    let result = generate(&no_cages, None, None);
    assert!(result.events.is_empty());
    assert!(result.errors.contains(&GenerationError::NoCages));
    assert!(result
        .errors
        .contains(&GenerationError::MissingDivisionConfig {
            division_id: "orphan".into()
        }));
}

/// Cancellation before the first phase yields an empty, tagged result.
#[test]
fn cancelled_runs_return_partial_results() {
    let mut config = base_config("d");
    config.games_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-03-08", None),
        divisions: vec![division("d", 1)],
        teams: vec![team("t1", "d"), team("t2", "d")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![],
        availability: AvailabilityBundle {
            field_availabilities: vec![field_window("field1", 6, "09:00", "13:00")],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = generate(&bundle, Some(1), Some(cancel));

    assert_eq!(result.status, GenerationStatus::Cancelled);
    assert!(result.events.is_empty());
    assert!(result.errors.is_empty());
}

/// Practices and cage sessions top every full week up to quota.
#[test]
fn practices_and_cages_fill_weekly_quotas() {
    let mut config = base_config("d");
    config.practices_per_week = 1;
    config.cage_sessions_per_week = 1;

    let bundle = InputBundle {
        season: season("2026-03-02", "2026-03-15", None),
        divisions: vec![division("d", 1)],
        teams: vec![team("t1", "d"), team("t2", "d")],
        division_configs: vec![config],
        fields: vec![field("field1")],
        cages: vec![cage("cage1")],
        availability: AvailabilityBundle {
            field_availabilities: vec![
                field_window("field1", 2, "16:00", "20:00"),
                field_window("field1", 4, "16:00", "20:00"),
            ],
            cage_availabilities: vec![
                cage_window("cage1", 1, "16:00", "20:00"),
                cage_window("cage1", 3, "16:00", "20:00"),
            ],
            ..Default::default()
        },
        scoring_weights: None,
    };

    let result = generate(&bundle, Some(13), None);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    // 2 teams × 2 weeks × (1 practice + 1 cage).
    assert_eq!(result.events.len(), 8);
    assert_eq!(result.stats.by_type[&EventType::Practice], 4);
    assert_eq!(result.stats.by_type[&EventType::Cage], 4);

    let report = evaluate(&bundle, &result.events);
    assert!(
        report.metrics.weekly_requirements.passed,
        "{:#?}",
        report.metrics.weekly_requirements
    );
}
