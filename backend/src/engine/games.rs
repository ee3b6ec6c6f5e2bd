//! Game placement: per-division round-robin matchups, week quotas with
//! overrides and season caps, required-day budgets and seeded shuffling
//! so reruns with the same seed reproduce the same schedule.

use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

use crate::calendar;
use crate::constraints::Candidate;
use crate::errors::{ScheduleWarning, SkipReason};
use crate::model::{DivisionConfig, EventType, ResourceLike, Team};
use crate::slots::{ResourceSlot, SlotKey};

use super::{select_best, Engine, PlacementRequest};

pub(crate) fn schedule(engine: &mut Engine<'_>) -> bool {
    let bundle = engine.bundle;
    let season = &bundle.season;
    let game_weeks = season.game_week_count();

    // Remaining game-eligible slots per team, for the scarcity factor.
    let mut availability: HashMap<String, HashSet<SlotKey>> = HashMap::new();
    for team in &bundle.teams {
        let keys = engine
            .slots
            .iter()
            .filter(|slot| slot.game_eligible(season))
            .filter(|slot| {
                bundle
                    .field(&slot.resource_id)
                    .is_some_and(|f| f.allows_division(&team.division_id))
            })
            .map(ResourceSlot::key)
            .collect();
        availability.insert(team.id.clone(), keys);
    }
    engine.context.team_slot_availability = Some(availability);

    for division in bundle.divisions_by_priority() {
        if engine.cancelled() {
            return false;
        }
        let Some(config) = bundle.config_for(&division.id) else {
            continue;
        };
        let target = config.target_games_per_team(game_weeks);
        if target == 0 {
            continue;
        }

        let teams = bundle.teams_in(&division.id);
        if teams.len() < 2 {
            engine.warnings.push(ScheduleWarning {
                division_id: division.id.clone(),
                event_type: EventType::Game,
                message: format!(
                    "division {} needs at least two teams to schedule games",
                    division.name
                ),
                reasons: vec![],
                samples: vec![],
            });
            continue;
        }

        let matchups = build_matchups(&teams, target, &mut engine.rng);
        let weekly_targets = config.weekly_game_targets(game_weeks);
        log::info!(
            "division {}: {} matchups across {} game weeks",
            division.id,
            matchups.len(),
            game_weeks
        );

        for (home, away) in &matchups {
            if engine.cancelled() {
                return false;
            }
            place_game(engine, &division.id, config, home, away, &weekly_targets, target);
        }
    }

    engine.context.team_slot_availability = None;
    true
}

/// Full round-robin cycles, home/away swapped each cycle, shuffled within
/// a cycle, truncated to the division's season total.
fn build_matchups(teams: &[&Team], target: u32, rng: &mut SmallRng) -> Vec<(String, String)> {
    let n = teams.len();
    let rounds = (target as usize + n - 2) / (n - 1);
    let total_games = n * target as usize / 2;

    let mut matchups = Vec::with_capacity(rounds * n * (n - 1) / 2);
    for round in 0..rounds {
        let mut pairs: Vec<(String, String)> = teams
            .iter()
            .tuple_combinations()
            .map(|(a, b)| {
                if round % 2 == 0 {
                    (a.id.clone(), b.id.clone())
                } else {
                    (b.id.clone(), a.id.clone())
                }
            })
            .collect();
        pairs.shuffle(rng);
        matchups.extend(pairs);
    }
    matchups.truncate(total_games);
    matchups
}

fn place_game(
    engine: &mut Engine<'_>,
    division_id: &str,
    config: &DivisionConfig,
    home: &str,
    away: &str,
    weekly_targets: &[u32],
    target: u32,
) {
    let selection = {
        let bundle = engine.bundle;
        let season = &bundle.season;
        let context = &engine.context;
        let budget = &engine.budget;
        let games_start = context.games_start;

        let slot_filter = |slot: &ResourceSlot| slot.game_eligible(season);

        let candidate_check = |slot: &ResourceSlot, _: &Candidate<'_>| -> Option<SkipReason> {
            let Some(game_week) = calendar::game_week_index(slot.date, games_start) else {
                return Some(SkipReason::BeforeGamesStart);
            };
            let quota = weekly_targets
                .get(game_week as usize - 1)
                .copied()
                .unwrap_or(0);
            if quota == 0 {
                return Some(SkipReason::WeeklyQuotaReached);
            }
            let Some(season_week) = context.week_of(slot.date) else {
                return Some(SkipReason::OutsideWindow);
            };

            for team_id in [home, away] {
                let Some(state) = context.team_state(team_id) else {
                    continue;
                };
                if state.total_games() >= target
                    || state.week_tally(season_week).games >= quota
                {
                    return Some(SkipReason::WeeklyQuotaReached);
                }
            }

            // Competition-group gate on the division's primary field.
            if config.primary_field() == Some(slot.resource_id.as_str())
                && !budget.can_use(division_id, slot.day_of_week, game_week)
            {
                return Some(SkipReason::RequiredDayBudgetExhausted);
            }

            if let Some(max_per_day) = config
                .day_preference(slot.day_of_week)
                .and_then(|p| p.max_games_per_day)
            {
                let todays = context
                    .events
                    .iter()
                    .filter(|e| {
                        e.date == slot.date
                            && e.division_id == division_id
                            && e.event_type() == EventType::Game
                    })
                    .count() as u32;
                if todays >= max_per_day {
                    return Some(SkipReason::MaxGamesPerDayReached);
                }
            }

            None
        };

        let request = PlacementRequest {
            division_id,
            event_type: EventType::Game,
            teams: vec![home, away],
            duration_minutes: (config.game_duration_hours * 60.0).round() as u32,
            min_day_gap: config.min_consecutive_day_gap,
            slot_filter: &slot_filter,
            candidate_check: &candidate_check,
        };
        select_best(&engine.slots, bundle, context, &engine.weights, &request)
    };

    match selection {
        Ok(selection) => {
            let slot = &engine.slots[selection.slot_index];
            let (slot_date, slot_dow) = (slot.date, slot.day_of_week);
            engine.commit(division_id, EventType::Game, &[home, away], &selection);
            if let Some(game_week) = calendar::game_week_index(slot_date, engine.context.games_start)
            {
                engine.budget.record(division_id, slot_dow, game_week);
            }
        }
        Err(mut histogram) => {
            histogram.sample(format!("{home} vs {away}"));
            log::warn!("could not schedule {home} vs {away} in division {division_id}");
            engine.warnings.push(histogram.into_warning(
                division_id,
                EventType::Game,
                format!("could not schedule game {home} vs {away}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn team(id: &str) -> Team {
        Team {
            id: id.into(),
            division_id: "aaa".into(),
            name: id.to_uppercase(),
        }
    }

    #[test]
    fn matchups_cover_target_and_alternate_home_away() {
        let teams_owned = [team("t1"), team("t2")];
        let teams: Vec<&Team> = teams_owned.iter().collect();
        let mut rng = SmallRng::seed_from_u64(7);

        // Two teams, four games each → four matchups, homes alternating.
        let matchups = build_matchups(&teams, 4, &mut rng);
        assert_eq!(matchups.len(), 4);
        let t1_home = matchups.iter().filter(|(h, _)| h.as_str() == "t1").count();
        assert_eq!(t1_home, 2);
    }

    #[test]
    fn matchups_truncate_to_season_total() {
        let teams_owned = [team("t1"), team("t2"), team("t3"), team("t4")];
        let teams: Vec<&Team> = teams_owned.iter().collect();
        let mut rng = SmallRng::seed_from_u64(7);

        // 4 teams × 5 games each / 2 = 10 games.
        let matchups = build_matchups(&teams, 5, &mut rng);
        assert_eq!(matchups.len(), 10);

        // No pair exceeds the rounds implied by the target.
        let mut per_pair: HashMap<(String, String), u32> = HashMap::new();
        for (home, away) in &matchups {
            let key = if home < away {
                (home.clone(), away.clone())
            } else {
                (away.clone(), home.clone())
            };
            *per_pair.entry(key).or_insert(0) += 1;
        }
        assert!(per_pair.values().all(|&count| count <= 2));
    }

    #[test]
    fn matchup_order_is_seed_stable() {
        let teams_owned = [team("t1"), team("t2"), team("t3"), team("t4")];
        let teams: Vec<&Team> = teams_owned.iter().collect();

        let a = build_matchups(&teams, 3, &mut SmallRng::seed_from_u64(42));
        let b = build_matchups(&teams, 3, &mut SmallRng::seed_from_u64(42));
        let c = build_matchups(&teams, 3, &mut SmallRng::seed_from_u64(43));

        assert_eq!(a, b);
        assert_ne!(a, c); // different seed, different order (overwhelmingly)
    }
}
