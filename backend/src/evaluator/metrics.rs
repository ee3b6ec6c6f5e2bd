//! The ten metric computations. Thresholds here are contracts; changing
//! one changes what "passing" means for every caller.

use itertools::{Itertools, MinMaxResult};
use std::collections::HashMap;

use crate::calendar;
use crate::constraints::ADJACENT_GAP_MINUTES;
use crate::model::{EventKind, EventType, GameDayPriority, ScheduledEventDraft};
use crate::slots::build_slots;

use super::{EvalData, MetricDetail, MetricReport};

const GAME_DAY_COMPLIANCE_THRESHOLD: f64 = 0.7;
const GAME_OVERLAP_THRESHOLD: f64 = 0.7;
const PRACTICE_SPACING_RANGE_LIMIT: f64 = 1.5;
const MATCHUP_BALANCE_TOLERANCE: f64 = 2.0;
const MATCHUP_SPACING_MIN_DAYS: i64 = 7;

fn std_deviation(mean: f64, values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let variance = values
        .iter()
        .map(|value| {
            let diff = mean - *value as f64;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// Every team meets its weekly game/practice/cage quotas on every
/// eligible week.
pub(crate) fn weekly_requirements(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    for (division_id, teams) in &data.teams_by_division {
        let Some(config) = data.bundle.config_for(division_id) else {
            continue;
        };
        let game_targets = config.weekly_game_targets(data.game_weeks);
        let games_start = data.bundle.season.games_start();

        for team in teams {
            let mut games_per_week: HashMap<u32, u32> = HashMap::new();
            for date in data.sorted_dates_of(&team.id, EventType::Game) {
                if let Some(week) = calendar::game_week_index(date, games_start) {
                    *games_per_week.entry(week).or_insert(0) += 1;
                }
            }
            for (week, expected) in game_targets.iter().enumerate().map(|(i, e)| (i as u32 + 1, *e))
            {
                let actual = games_per_week.get(&week).copied().unwrap_or(0);
                if actual < expected {
                    details.push(MetricDetail::new(
                        &team.id,
                        (expected - actual) as f64,
                        format!("game week {week}: {actual}/{expected} games"),
                    ));
                }
            }

            for week in &data.weeks {
                for (event_type, expected) in [
                    (EventType::Practice, config.practices_per_week),
                    (EventType::Cage, config.cage_sessions_per_week),
                ] {
                    if expected == 0 {
                        continue;
                    }
                    let actual = data
                        .events_of(&team.id, event_type)
                        .iter()
                        .filter(|e| week.contains(e.date))
                        .count() as u32;
                    if actual < expected {
                        details.push(MetricDetail::new(
                            &team.id,
                            (expected - actual) as f64,
                            format!(
                                "week {}: {actual}/{expected} {event_type} sessions",
                                week.week_number
                            ),
                        ));
                    }
                }
            }
        }
    }

    let fail = format!("{} weekly requirement shortfalls", details.len());
    MetricReport::from_details(details, "all teams meet their weekly requirements", fail)
}

/// Every team's home/away split stays within one game.
pub(crate) fn home_away_balance(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    for team in &data.bundle.teams {
        let mut home = 0i32;
        let mut away = 0i32;
        for event in data.events_of(&team.id, EventType::Game) {
            if let EventKind::Game { home_team_id, .. } = &event.kind {
                if home_team_id == &team.id {
                    home += 1;
                } else {
                    away += 1;
                }
            }
        }
        let delta = (home - away).abs();
        if delta > 1 {
            details.push(MetricDetail::new(
                &team.id,
                delta as f64,
                format!("{home} home / {away} away"),
            ));
        }
    }

    let fail = format!("{} teams have a home/away imbalance above 1", details.len());
    MetricReport::from_details(details, "home/away balance within 1 for every team", fail)
}

/// Hard conflicts are errors; min-gap infractions are warnings. The
/// metric passes when no error-severity finding exists.
pub(crate) fn constraint_violations(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();
    let season = &data.bundle.season;

    // Resource double-bookings.
    let mut by_resource: HashMap<(&str, chrono::NaiveDate), Vec<&ScheduledEventDraft>> =
        HashMap::new();
    for event in data.events {
        by_resource
            .entry((event.resource_id(), event.date))
            .or_default()
            .push(event);
    }
    for ((resource_id, date), events) in &by_resource {
        for (a, b) in events.iter().tuple_combinations() {
            if a.resource_kind() == b.resource_kind() && a.overlaps(b) {
                details.push(MetricDetail::error(
                    *resource_id,
                    0.0,
                    format!("resource double-booked on {date}"),
                ));
            }
        }
    }

    // Team overlaps and same-day combination rules.
    for team in &data.bundle.teams {
        let mut by_date: HashMap<chrono::NaiveDate, Vec<&ScheduledEventDraft>> = HashMap::new();
        for event in data
            .team_events
            .get(team.id.as_str())
            .into_iter()
            .flatten()
            .copied()
        {
            by_date.entry(event.date).or_default().push(event);
        }

        for (date, events) in &by_date {
            for (a, b) in events.iter().tuple_combinations() {
                if a.overlaps(b) {
                    details.push(MetricDetail::error(
                        &team.id,
                        0.0,
                        format!("overlapping events on {date}"),
                    ));
                }
            }

            let field_events = events.iter().filter(|e| e.is_field_event()).count();
            let games = events
                .iter()
                .filter(|e| e.event_type() == EventType::Game)
                .count();
            let cages: Vec<_> = events
                .iter()
                .filter(|e| e.event_type() == EventType::Cage)
                .collect();
            let practices: Vec<_> = events
                .iter()
                .filter(|e| e.event_type() == EventType::Practice)
                .collect();

            if field_events > 1 {
                details.push(MetricDetail::error(
                    &team.id,
                    field_events as f64,
                    format!("{field_events} field events on {date}"),
                ));
            }
            if cages.len() > 1 {
                details.push(MetricDetail::error(
                    &team.id,
                    cages.len() as f64,
                    format!("multiple cage sessions on {date}"),
                ));
            }
            if games > 0 && !cages.is_empty() {
                details.push(MetricDetail::error(
                    &team.id,
                    0.0,
                    format!("game and cage session on {date}"),
                ));
            }
            for practice in &practices {
                for cage in &cages {
                    let gap = calendar::minutes_between(
                        practice.start_time,
                        practice.end_time,
                        cage.start_time,
                        cage.end_time,
                    );
                    if gap > ADJACENT_GAP_MINUTES {
                        details.push(MetricDetail::error(
                            &team.id,
                            gap as f64,
                            format!("practice and cage {gap} minutes apart on {date}"),
                        ));
                    }
                }
            }
        }
    }

    // Season admissibility.
    for event in data.events {
        if event.event_type() == EventType::Game && event.date < season.games_start() {
            details.push(MetricDetail::error(
                event.resource_id(),
                0.0,
                format!("game on {} before games start", event.date),
            ));
        }
        if season.is_blackout(event.date) {
            details.push(MetricDetail::error(
                event.resource_id(),
                0.0,
                format!("event on blackout date {}", event.date),
            ));
        }
    }

    // Window containment, only when the caller supplied availability.
    if !data.bundle.availability.is_empty() {
        let slots = build_slots(
            season,
            &data.bundle.fields,
            &data.bundle.cages,
            &data.bundle.availability,
        );
        for event in data.events {
            let contained = slots.iter().any(|slot| {
                slot.resource == event.resource_kind()
                    && slot.resource_id == event.resource_id()
                    && slot.date == event.date
                    && slot.start_time <= event.start_time
                    && event.end_time <= slot.end_time
            });
            if !contained {
                details.push(MetricDetail::error(
                    event.resource_id(),
                    0.0,
                    format!(
                        "event on {} at {} lies outside availability",
                        event.date,
                        event.start_time.format("%H:%M")
                    ),
                ));
            }
        }
    }

    // Min-gap findings stay warnings.
    for (division_id, teams) in &data.teams_by_division {
        let Some(min_gap) = data
            .bundle
            .config_for(division_id)
            .and_then(|c| c.min_consecutive_day_gap)
        else {
            continue;
        };
        for team in teams {
            let mut dates: Vec<chrono::NaiveDate> = data
                .team_events
                .get(team.id.as_str())
                .into_iter()
                .flatten()
                .map(|e| e.date)
                .collect();
            dates.sort_unstable();
            dates.dedup();
            for pair in dates.windows(2) {
                let days_diff = calendar::day_gap(pair[1], pair[0]);
                if days_diff > 0 && days_diff < min_gap as i64 {
                    details.push(MetricDetail::warning(
                        &team.id,
                        days_diff as f64,
                        format!("min_day_gap: events {days_diff} day(s) apart"),
                    ));
                }
            }
        }
    }

    super::sort_details(&mut details);
    let errors = details
        .iter()
        .filter(|d| d.severity == Some(super::Severity::Error))
        .count();
    let warnings = details.len() - errors;
    MetricReport {
        passed: errors == 0,
        summary: format!("{errors} errors, {warnings} warnings"),
        details,
    }
}

/// Per division: ≥70 % of games off avoid-days, every required day used,
/// no avoid day used.
pub(crate) fn game_day_preferences(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    for (division_id, _) in &data.teams_by_division {
        let Some(config) = data.bundle.config_for(division_id) else {
            continue;
        };
        if config.game_day_preferences.is_empty() {
            continue;
        }
        let games = data.division_games(division_id);

        if !games.is_empty() {
            let compliant = games
                .iter()
                .filter(|g| {
                    config
                        .day_preference(calendar::day_of_week(g.date))
                        .map_or(true, |p| p.priority != GameDayPriority::Avoid)
                })
                .count();
            let rate = compliant as f64 / games.len() as f64;
            if rate < GAME_DAY_COMPLIANCE_THRESHOLD {
                details.push(MetricDetail::new(
                    *division_id,
                    rate,
                    format!("{compliant}/{} games on acceptable days", games.len()),
                ));
            }
        }

        for preference in &config.game_day_preferences {
            let on_day = games
                .iter()
                .filter(|g| calendar::day_of_week(g.date) == preference.day_of_week)
                .count();
            match preference.priority {
                GameDayPriority::Required if on_day == 0 => {
                    details.push(MetricDetail::new(
                        *division_id,
                        preference.day_of_week as f64,
                        format!("required day {} has zero games", preference.day_of_week),
                    ));
                }
                GameDayPriority::Avoid if on_day > 0 => {
                    details.push(MetricDetail::new(
                        *division_id,
                        on_day as f64,
                        format!(
                            "{on_day} game(s) on avoided day {}",
                            preference.day_of_week
                        ),
                    ));
                }
                _ => {}
            }
        }
    }

    let fail = format!("{} game-day preference findings", details.len());
    MetricReport::from_details(details, "game-day preferences honored", fail)
}

/// Short-rest load spread within each division stays within one game.
pub(crate) fn game_spacing(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    for (division_id, teams) in &data.teams_by_division {
        let counts: Vec<u32> = teams
            .iter()
            .map(|team| data.short_rest_count(&team.id))
            .collect();
        if let MinMaxResult::MinMax(min, max) = counts.iter().minmax() {
            if max - min > 1 {
                details.push(MetricDetail::new(
                    *division_id,
                    (max - min) as f64,
                    format!("short-rest counts range from {min} to {max}"),
                ));
            }
        }
    }

    let fail = format!("{} divisions with uneven short-rest load", details.len());
    MetricReport::from_details(details, "short-rest games spread fairly", fail)
}

/// Consistency of practice rhythm: the spread of per-team gap standard
/// deviations within a division stays under 1.5 days.
pub(crate) fn practice_spacing(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    for (division_id, teams) in &data.teams_by_division {
        let deviations: Vec<f64> = teams
            .iter()
            .filter_map(|team| {
                let dates = data.sorted_dates_of(&team.id, EventType::Practice);
                if dates.len() < 2 {
                    return None;
                }
                let gaps: Vec<i64> = dates
                    .windows(2)
                    .map(|pair| calendar::day_gap(pair[1], pair[0]))
                    .collect();
                let mean = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
                std_deviation(mean, &gaps)
            })
            .collect();

        if let MinMaxResult::MinMax(min, max) = deviations
            .iter()
            .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            let range = max - min;
            if range > PRACTICE_SPACING_RANGE_LIMIT {
                details.push(MetricDetail::new(
                    *division_id,
                    range,
                    format!("practice gap deviation range {range:.2} days"),
                ));
            }
        }
    }

    let fail = format!("{} divisions with inconsistent practice rhythm", details.len());
    MetricReport::from_details(details, "practice spacing is consistent", fail)
}

/// Every pairing plays close to the division's ideal head-to-head count.
pub(crate) fn matchup_balance(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    for (division_id, teams) in &data.teams_by_division {
        if teams.len() < 2 {
            continue;
        }
        let games = data.division_games(division_id);
        if games.is_empty() {
            continue;
        }

        let mut pair_counts: HashMap<(String, String), u32> = HashMap::new();
        for game in &games {
            if let EventKind::Game {
                home_team_id,
                away_team_id,
                ..
            } = &game.kind
            {
                *pair_counts.entry(pair_key(home_team_id, away_team_id)).or_insert(0) += 1;
            }
        }

        let games_per_team = 2.0 * games.len() as f64 / teams.len() as f64;
        let ideal = games_per_team / (teams.len() - 1) as f64;

        for (a, b) in teams.iter().tuple_combinations() {
            let played = pair_counts
                .get(&pair_key(&a.id, &b.id))
                .copied()
                .unwrap_or(0);
            let deviation = (played as f64 - ideal).abs();
            if deviation > MATCHUP_BALANCE_TOLERANCE {
                details.push(MetricDetail::new(
                    format!("{} vs {}", a.id, b.id),
                    deviation,
                    format!("played {played}, ideal {ideal:.1}"),
                ));
            }
        }
    }

    let fail = format!("{} matchups far from their ideal count", details.len());
    MetricReport::from_details(details, "matchup counts are balanced", fail)
}

/// Rematches of the same pair sit at least a week apart.
pub(crate) fn matchup_spacing(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();

    let mut pair_dates: HashMap<(String, String), Vec<chrono::NaiveDate>> = HashMap::new();
    for event in data.events {
        if let EventKind::Game {
            home_team_id,
            away_team_id,
            ..
        } = &event.kind
        {
            pair_dates
                .entry(pair_key(home_team_id, away_team_id))
                .or_default()
                .push(event.date);
        }
    }

    for ((a, b), mut dates) in pair_dates {
        dates.sort_unstable();
        for pair in dates.windows(2) {
            let gap = calendar::day_gap(pair[1], pair[0]);
            if gap < MATCHUP_SPACING_MIN_DAYS {
                details.push(MetricDetail::new(
                    format!("{a} vs {b}"),
                    gap as f64,
                    format!("rematch after {gap} day(s)"),
                ));
            }
        }
    }

    let fail = format!("{} rematches under a week apart", details.len());
    MetricReport::from_details(details, "matchups are spaced a week or more apart", fail)
}

/// Concurrency of game slots: most games should share their window with
/// another game somewhere in the league.
pub(crate) fn game_slot_efficiency(data: &EvalData<'_>) -> MetricReport {
    let games: Vec<&ScheduledEventDraft> = data
        .events
        .iter()
        .filter(|e| e.event_type() == EventType::Game)
        .collect();

    if games.len() < 2 {
        return MetricReport::pass("too few games to measure slot efficiency");
    }

    let overlapping = games
        .iter()
        .filter(|game| games.iter().any(|other| !std::ptr::eq(**game, *other) && game.overlaps(*other)))
        .count();
    let rate = overlapping as f64 / games.len() as f64;

    MetricReport {
        passed: rate >= GAME_OVERLAP_THRESHOLD,
        summary: format!(
            "{overlapping}/{} games share a window ({:.0}%)",
            games.len(),
            rate * 100.0
        ),
        details: Vec::new(),
    }
}

/// No team exceeds its weekly game quota by more than one.
pub(crate) fn weekly_games_distribution(data: &EvalData<'_>) -> MetricReport {
    let mut details = Vec::new();
    let games_start = data.bundle.season.games_start();

    for (division_id, teams) in &data.teams_by_division {
        let Some(config) = data.bundle.config_for(division_id) else {
            continue;
        };
        for team in teams {
            let mut per_week: HashMap<u32, u32> = HashMap::new();
            for date in data.sorted_dates_of(&team.id, EventType::Game) {
                if let Some(week) = calendar::game_week_index(date, games_start) {
                    *per_week.entry(week).or_insert(0) += 1;
                }
            }
            for (week, count) in per_week {
                let limit = config.games_per_week_for(week) + 1;
                if count > limit {
                    details.push(MetricDetail::new(
                        &team.id,
                        count as f64,
                        format!("{count} games in week {week} (limit {limit})"),
                    ));
                }
            }
        }
    }

    let fail = format!("{} week overloads", details.len());
    MetricReport::from_details(details, "no team overloads a game week", fail)
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
