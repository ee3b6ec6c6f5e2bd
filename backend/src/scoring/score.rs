//! Pure candidate scoring. Every factor yields a raw value, gets
//! multiplied by its weight, and the weighted contributions sum into the
//! candidate's total. The engine picks the highest total among admissible
//! candidates.

use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::constraints::{Candidate, ADJACENT_GAP_MINUTES};
use crate::model::{DivisionConfig, EventType, ResourceKind};
use crate::scoring::{ScoringContext, ScoringWeights, TeamSchedulingState};
use crate::slots::SlotKey;

/// Prime window for youth games and practices.
const PRIME_START_MINUTES: f64 = 15.0 * 60.0;
const PRIME_END_MINUTES: f64 = 18.0 * 60.0;
/// Outside the prime window the quality decays to 0.4 over four hours.
const PRIME_DECAY_MINUTES: f64 = 4.0 * 60.0;

const ADJACENCY_RANGE_MINUTES: f64 = 180.0;

/// Weighted contribution of each factor; sums to the candidate total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub day_spread: f64,
    pub week_balance: f64,
    pub resource_utilization: f64,
    pub time_quality: f64,
    pub day_gap: f64,
    pub time_adjacency: f64,
    pub game_day_preference: f64,
    pub earliest_time: f64,
    pub field_preference: f64,
    pub home_away_balance: f64,
    pub matchup_home_away_balance: f64,
    pub short_rest_balance: f64,
    pub weekend_morning_practice: f64,
    pub same_day_event: f64,
    pub scarcity: f64,
    pub same_day_cage_field_gap: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoredCandidate {
    pub total: f64,
    pub breakdown: ScoreBreakdown,
}

/// Score one admissible candidate. `teams` lists the participants, home
/// team first for games. `slot_key` identifies the slot being consumed,
/// for the scarcity factor.
pub fn score_candidate(
    candidate: &Candidate<'_>,
    teams: &[&str],
    config: &DivisionConfig,
    context: &ScoringContext,
    weights: &ScoringWeights,
    slot_key: Option<&SlotKey>,
) -> ScoredCandidate {
    let day_of_week = calendar::day_of_week(candidate.date);
    let states: Vec<&TeamSchedulingState> = teams
        .iter()
        .filter_map(|id| context.team_state(id))
        .collect();

    let breakdown = ScoreBreakdown {
        day_spread: weights.day_spread * mean(&states, |s| day_spread_raw(s, day_of_week)),
        week_balance: weights.week_balance
            * mean(&states, |s| week_balance_raw(candidate, config, context, s)),
        resource_utilization: weights.resource_utilization
            * resource_utilization_raw(candidate, context),
        time_quality: weights.time_quality * time_quality_raw(candidate),
        day_gap: weights.day_gap * mean(&states, |s| day_gap_raw(s, candidate)),
        time_adjacency: weights.time_adjacency * time_adjacency_raw(candidate, context),
        game_day_preference: weights.game_day_preference
            * game_day_preference_raw(candidate, config, day_of_week),
        earliest_time: weights.earliest_time * earliest_time_raw(candidate),
        field_preference: weights.field_preference * field_preference_raw(candidate, config),
        home_away_balance: weights.home_away_balance * home_away_balance_raw(candidate, &states),
        matchup_home_away_balance: weights.matchup_home_away_balance
            * matchup_home_away_balance_raw(candidate, teams, context),
        short_rest_balance: weights.short_rest_balance
            * short_rest_balance_raw(candidate, teams, config, context),
        weekend_morning_practice: weights.weekend_morning_practice
            * weekend_morning_practice_raw(candidate, day_of_week),
        same_day_event: weights.same_day_event * same_day_event_raw(candidate, &states),
        scarcity: weights.scarcity * scarcity_raw(teams, context, slot_key),
        same_day_cage_field_gap: weights.same_day_cage_field_gap
            * same_day_cage_field_gap_raw(candidate, teams, context),
    };

    let total = breakdown.day_spread
        + breakdown.week_balance
        + breakdown.resource_utilization
        + breakdown.time_quality
        + breakdown.day_gap
        + breakdown.time_adjacency
        + breakdown.game_day_preference
        + breakdown.earliest_time
        + breakdown.field_preference
        + breakdown.home_away_balance
        + breakdown.matchup_home_away_balance
        + breakdown.short_rest_balance
        + breakdown.weekend_morning_practice
        + breakdown.same_day_event
        + breakdown.scarcity
        + breakdown.same_day_cage_field_gap;

    ScoredCandidate { total, breakdown }
}

fn mean(states: &[&TeamSchedulingState], f: impl Fn(&TeamSchedulingState) -> f64) -> f64 {
    if states.is_empty() {
        return 0.0;
    }
    states.iter().map(|s| f(s)).sum::<f64>() / states.len() as f64
}

fn day_spread_raw(state: &TeamSchedulingState, day_of_week: u8) -> f64 {
    if state.total_events() == 0 {
        return 1.0;
    }
    let usage = state.day_of_week_usage[day_of_week as usize] as f64;
    let max_usage = state.day_of_week_usage.iter().copied().max().unwrap_or(0) as f64;
    1.0 - usage / (max_usage + 1.0)
}

fn week_balance_raw(
    candidate: &Candidate<'_>,
    config: &DivisionConfig,
    context: &ScoringContext,
    state: &TeamSchedulingState,
) -> f64 {
    let Some(week) = context.week_of(candidate.date) else {
        return 0.5;
    };
    let requirement = match candidate.event_type {
        EventType::Game => calendar::game_week_index(candidate.date, context.games_start)
            .map(|game_week| config.games_per_week_for(game_week))
            .unwrap_or(0),
        EventType::Practice => config.practices_per_week,
        EventType::Cage => config.cage_sessions_per_week,
    };
    let current = state.week_tally(week).count_for(candidate.event_type);
    if current < requirement {
        1.0
    } else if current == requirement {
        0.5
    } else {
        0.2
    }
}

fn resource_utilization_raw(candidate: &Candidate<'_>, context: &ScoringContext) -> f64 {
    let booked = context.hours_booked(candidate.resource_id, candidate.date);
    let capacity = context.capacity_of(candidate.resource_id);
    (1.0 - booked / capacity).max(0.0)
}

fn time_quality_raw(candidate: &Candidate<'_>) -> f64 {
    let start = calendar::minutes(candidate.start_time) as f64;
    if (PRIME_START_MINUTES..=PRIME_END_MINUTES).contains(&start) {
        return 1.0;
    }
    let distance = if start < PRIME_START_MINUTES {
        PRIME_START_MINUTES - start
    } else {
        start - PRIME_END_MINUTES
    };
    1.0 - 0.6 * distance.min(PRIME_DECAY_MINUTES) / PRIME_DECAY_MINUTES
}

fn day_gap_raw(state: &TeamSchedulingState, candidate: &Candidate<'_>) -> f64 {
    match state.nearest_day_gap(candidate.date) {
        None => 1.0,
        Some(0) => 0.0,
        Some(1) => 0.5,
        Some(_) => 1.0,
    }
}

fn time_adjacency_raw(candidate: &Candidate<'_>, context: &ScoringContext) -> f64 {
    let gap = context
        .index
        .resource_events(candidate.resource_id, candidate.date)
        .iter()
        .filter(|&&position| context.events[position].resource_kind() == candidate.resource)
        .map(|&position| {
            let existing = &context.events[position];
            calendar::minutes_between(
                candidate.start_time,
                candidate.end_time,
                existing.start_time,
                existing.end_time,
            )
        })
        .min();

    match gap {
        None => 0.3,
        Some(minutes) => (1.0 - minutes as f64 / ADJACENCY_RANGE_MINUTES).max(0.0),
    }
}

fn game_day_preference_raw(
    candidate: &Candidate<'_>,
    config: &DivisionConfig,
    day_of_week: u8,
) -> f64 {
    if candidate.event_type != EventType::Game {
        return 0.5;
    }
    config
        .day_preference(day_of_week)
        .map(|p| p.priority.day_score())
        .unwrap_or(0.5)
}

fn earliest_time_raw(candidate: &Candidate<'_>) -> f64 {
    1.0 - calendar::minutes(candidate.start_time) as f64 / calendar::MINUTES_PER_DAY as f64
}

fn field_preference_raw(candidate: &Candidate<'_>, config: &DivisionConfig) -> f64 {
    if candidate.resource == ResourceKind::Cage {
        return 0.5;
    }
    let preferences = &config.field_preferences;
    let raw = if preferences.is_empty() {
        0.5
    } else {
        match preferences.iter().position(|f| f == candidate.resource_id) {
            Some(rank) => 1.0 - 0.5 * rank as f64 / preferences.len() as f64,
            None => 0.3,
        }
    };
    // Field identity matters far less for practices than for games.
    if candidate.event_type == EventType::Practice {
        raw * 0.3
    } else {
        raw
    }
}

fn home_away_balance_raw(candidate: &Candidate<'_>, states: &[&TeamSchedulingState]) -> f64 {
    if candidate.event_type != EventType::Game || states.len() != 2 {
        return 0.0;
    }
    let home_after = states[0].home_away_delta() + 1;
    let away_after = states[1].home_away_delta() - 1;
    let imbalance = home_after.abs() + away_after.abs();
    (1.0 - imbalance as f64 / 8.0).max(0.0)
}

fn matchup_home_away_balance_raw(
    candidate: &Candidate<'_>,
    teams: &[&str],
    context: &ScoringContext,
) -> f64 {
    if candidate.event_type != EventType::Game || teams.len() != 2 {
        return 0.0;
    }
    let pair_delta = context
        .team_state(teams[0])
        .and_then(|s| s.matchup_home_away.get(teams[1]).copied())
        .unwrap_or(0);
    let imbalance = pair_delta + 1;
    (1.0 - imbalance.abs() as f64 / 4.0).max(0.0)
}

fn short_rest_balance_raw(
    candidate: &Candidate<'_>,
    teams: &[&str],
    config: &DivisionConfig,
    context: &ScoringContext,
) -> f64 {
    if candidate.event_type != EventType::Game {
        return 0.0;
    }
    let division_average = context.division_short_rest_average(&config.division_id);

    teams
        .iter()
        .filter_map(|id| context.team_state(id))
        .filter(|state| {
            state.game_dates.iter().any(|date| {
                calendar::day_gap(*date, candidate.date) <= crate::scoring::SHORT_REST_DAYS
            })
        })
        .map(|state| {
            let excess = (state.short_rest_games as f64 - division_average).max(0.0);
            (0.3 + 0.35 * excess).min(1.0)
        })
        .fold(0.0, f64::max)
}

fn weekend_morning_practice_raw(candidate: &Candidate<'_>, day_of_week: u8) -> f64 {
    let weekend = day_of_week == 0 || day_of_week == 6;
    let morning = calendar::minutes(candidate.start_time) < 13 * 60;
    if candidate.event_type == EventType::Practice && weekend && morning {
        1.0
    } else {
        0.0
    }
}

fn same_day_event_raw(candidate: &Candidate<'_>, states: &[&TeamSchedulingState]) -> f64 {
    states
        .iter()
        .filter(|state| {
            let dates = match candidate.resource {
                ResourceKind::Field => &state.field_dates,
                ResourceKind::Cage => &state.cage_dates,
            };
            dates.contains(&candidate.date)
        })
        .count() as f64
}

fn scarcity_raw(teams: &[&str], context: &ScoringContext, slot_key: Option<&SlotKey>) -> f64 {
    let (Some(availability), Some(key)) = (context.team_slot_availability.as_ref(), slot_key)
    else {
        return 0.0;
    };

    availability
        .iter()
        .filter(|(team_id, remaining)| {
            !teams.contains(&team_id.as_str()) && remaining.contains(key)
        })
        .map(|(_, remaining)| 1.0 / remaining.len() as f64)
        .fold(0.0, f64::max)
}

fn same_day_cage_field_gap_raw(
    candidate: &Candidate<'_>,
    teams: &[&str],
    context: &ScoringContext,
) -> f64 {
    let opposite = match candidate.event_type {
        EventType::Practice => EventType::Cage,
        EventType::Cage => EventType::Practice,
        EventType::Game => return 0.0,
    };

    for team_id in teams {
        let gaps: Vec<u32> = context
            .index
            .team_events(team_id, candidate.date)
            .iter()
            .map(|&position| &context.events[position])
            .filter(|e| e.event_type() == opposite)
            .map(|e| {
                calendar::minutes_between(
                    candidate.start_time,
                    candidate.end_time,
                    e.start_time,
                    e.end_time,
                )
            })
            .collect();

        if let Some(min_gap) = gaps.iter().min() {
            if *min_gap > ADJACENT_GAP_MINUTES {
                return 1.0;
            }
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn candidate_at<'a>(start: &str, end: &str) -> Candidate<'a> {
        Candidate {
            event_type: EventType::Game,
            resource: ResourceKind::Field,
            resource_id: "field1",
            date: d("2026-03-07"),
            start_time: t(start),
            end_time: t(end),
        }
    }

    #[test]
    fn time_quality_decays_outside_prime_window() {
        assert!((time_quality_raw(&candidate_at("15:30", "17:30")) - 1.0).abs() < 1e-9);
        assert!((time_quality_raw(&candidate_at("11:00", "13:00")) - 0.4).abs() < 1e-9);
        assert!((time_quality_raw(&candidate_at("19:00", "21:00")) - 0.85).abs() < 1e-9);
        // Further than 4 hours out the decay bottoms at 0.4.
        assert!((time_quality_raw(&candidate_at("07:00", "09:00")) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn day_gap_plateaus_at_two_days() {
        let mut state = TeamSchedulingState::default();
        state.all_dates.insert(d("2026-03-05"));

        assert!((day_gap_raw(&state, &candidate_at("09:00", "11:00")) - 1.0).abs() < 1e-9);

        state.all_dates.insert(d("2026-03-06"));
        assert!((day_gap_raw(&state, &candidate_at("09:00", "11:00")) - 0.5).abs() < 1e-9);

        state.all_dates.insert(d("2026-03-07"));
        assert!(day_gap_raw(&state, &candidate_at("09:00", "11:00")).abs() < 1e-9);
    }

    #[test]
    fn earliest_time_prefers_morning() {
        let morning = earliest_time_raw(&candidate_at("09:00", "11:00"));
        let evening = earliest_time_raw(&candidate_at("18:00", "20:00"));
        assert!(morning > evening);
        assert!((morning - (1.0 - 540.0 / 1440.0)).abs() < 1e-9);
    }

    #[test]
    fn field_preference_ranks_and_scales() {
        let mut config = DivisionConfig {
            division_id: "aaa".into(),
            games_per_week: 1,
            practices_per_week: 1,
            cage_sessions_per_week: 0,
            game_duration_hours: 2.0,
            practice_duration_hours: 1.0,
            cage_session_duration_hours: 0.0,
            game_arrival_hours: 0.0,
            practice_arrival_minutes: 0,
            cage_arrival_minutes: 0,
            max_games_per_season: None,
            game_week_overrides: vec![],
            field_preferences: vec!["field1".into(), "field2".into()],
            game_day_preferences: vec![],
            min_consecutive_day_gap: None,
            sunday_paired_practice: false,
        };

        let game = candidate_at("15:00", "17:00");
        assert!((field_preference_raw(&game, &config) - 1.0).abs() < 1e-9);

        let mut second_choice = game;
        second_choice.resource_id = "field2";
        assert!((field_preference_raw(&second_choice, &config) - 0.75).abs() < 1e-9);

        let mut unlisted = game;
        unlisted.resource_id = "field9";
        assert!((field_preference_raw(&unlisted, &config) - 0.3).abs() < 1e-9);

        let mut practice = game;
        practice.event_type = EventType::Practice;
        assert!((field_preference_raw(&practice, &config) - 0.3).abs() < 1e-9);

        config.field_preferences.clear();
        assert!((field_preference_raw(&game, &config) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn home_away_balance_rewards_flattening() {
        let mut lopsided_home = TeamSchedulingState::default();
        lopsided_home.home_games = 3;
        let mut lopsided_away = TeamSchedulingState::default();
        lopsided_away.away_games = 3;

        let candidate = candidate_at("15:00", "17:00");

        // Giving the home-heavy team another home game digs both deltas
        // deeper: |3+1| + |-3-1| = 8 → raw 0.
        let worse = home_away_balance_raw(&candidate, &[&lopsided_home, &lopsided_away]);
        assert!(worse.abs() < 1e-9);

        // The away-heavy team hosting flattens both: |-3+1| + |3-1| = 4.
        let better = home_away_balance_raw(&candidate, &[&lopsided_away, &lopsided_home]);
        assert!((better - 0.5).abs() < 1e-9);
    }

    #[test]
    fn weekend_morning_only_penalizes_practices() {
        let mut practice = candidate_at("09:00", "10:00");
        practice.event_type = EventType::Practice;
        // 2026-03-07 is a Saturday.
        assert!((weekend_morning_practice_raw(&practice, 6) - 1.0).abs() < 1e-9);

        let mut afternoon = practice;
        afternoon.start_time = t("14:00");
        assert!(weekend_morning_practice_raw(&afternoon, 6).abs() < 1e-9);

        let game = candidate_at("09:00", "11:00");
        assert!(weekend_morning_practice_raw(&game, 6).abs() < 1e-9);
    }
}
