//! Practice placement: week by week per team, topping each week up to the
//! division's quota. Divisions with Sunday pairing enabled first try to
//! land a back-to-back field practice + cage session before falling
//! through to independent placement.

use std::collections::{HashMap, HashSet};

use crate::calendar::{self, WeekDefinition};
use crate::constraints::{Candidate, ADJACENT_GAP_MINUTES};
use crate::errors::SkipReason;
use crate::model::{DivisionConfig, EventType, ResourceLike};
use crate::slots::{ResourceSlot, SlotKey};

use super::{select_best, Engine, PlacementRequest, Selection};

pub(crate) fn schedule(engine: &mut Engine<'_>) -> bool {
    let bundle = engine.bundle;
    let season = &bundle.season;
    let weeks = season.weeks();

    let mut availability: HashMap<String, HashSet<SlotKey>> = HashMap::new();
    for team in &bundle.teams {
        let keys = engine
            .slots
            .iter()
            .filter(|slot| slot.practice_eligible(season))
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
        let Some(config) = bundle.config_for(&division.id) else {
            continue;
        };
        if config.practices_per_week == 0 {
            continue;
        }

        for team in bundle.teams_in(&division.id) {
            for week in &weeks {
                if engine.cancelled() {
                    return false;
                }

                let tally = engine
                    .context
                    .team_state(&team.id)
                    .map(|s| s.week_tally(week.week_number))
                    .unwrap_or_default();
                let needed = config.practices_per_week.saturating_sub(tally.practices);
                let mut cages_open = config.cage_sessions_per_week.saturating_sub(tally.cages);

                for _ in 0..needed {
                    if config.sunday_paired_practice
                        && cages_open > 0
                        && try_sunday_pair(engine, &division.id, config, &team.id, week)
                    {
                        cages_open -= 1;
                        continue;
                    }
                    if !place_practice(engine, &division.id, config, &team.id, week) {
                        break;
                    }
                }
            }
        }
    }

    engine.context.team_slot_availability = None;
    true
}

fn place_practice(
    engine: &mut Engine<'_>,
    division_id: &str,
    config: &DivisionConfig,
    team_id: &str,
    week: &WeekDefinition,
) -> bool {
    let selection = {
        let bundle = engine.bundle;
        let season = &bundle.season;
        let slot_filter =
            |slot: &ResourceSlot| slot.practice_eligible(season) && week.contains(slot.date);
        let candidate_check = |_: &ResourceSlot, _: &Candidate<'_>| -> Option<SkipReason> { None };

        let request = PlacementRequest {
            division_id,
            event_type: EventType::Practice,
            teams: vec![team_id],
            duration_minutes: (config.practice_duration_hours * 60.0).round() as u32,
            min_day_gap: config.min_consecutive_day_gap,
            slot_filter: &slot_filter,
            candidate_check: &candidate_check,
        };
        select_best(
            &engine.slots,
            bundle,
            &engine.context,
            &engine.weights,
            &request,
        )
    };

    match selection {
        Ok(selection) => {
            engine.commit(division_id, EventType::Practice, &[team_id], &selection);
            true
        }
        Err(mut histogram) => {
            histogram.sample(format!("{team_id} week {}", week.week_number));
            log::warn!(
                "could not schedule practice for {team_id} in week {}",
                week.week_number
            );
            engine.warnings.push(histogram.into_warning(
                division_id,
                EventType::Practice,
                format!(
                    "could not schedule practice for {team_id} in week {}",
                    week.week_number
                ),
            ));
            false
        }
    }
}

/// Attempt a back-to-back practice + cage pair on this week's Sunday.
/// Tries practice-first, then cage-first; commits only complete pairs.
fn try_sunday_pair(
    engine: &mut Engine<'_>,
    division_id: &str,
    config: &DivisionConfig,
    team_id: &str,
    week: &WeekDefinition,
) -> bool {
    let sunday = calendar::enumerate_dates(week.start, week.end)
        .into_iter()
        .find(|d| calendar::day_of_week(*d) == 0);
    let Some(sunday) = sunday else {
        return false;
    };

    for leader in [EventType::Practice, EventType::Cage] {
        let follower = if leader == EventType::Practice {
            EventType::Cage
        } else {
            EventType::Practice
        };

        let Some(lead) = pair_select(engine, division_id, config, team_id, sunday, leader, None)
        else {
            continue;
        };
        let Some(tail) = pair_select(
            engine,
            division_id,
            config,
            team_id,
            sunday,
            follower,
            Some((lead.start_time, lead.end_time)),
        ) else {
            continue;
        };

        engine.commit(division_id, leader, &[team_id], &lead);
        engine.commit(division_id, follower, &[team_id], &tail);
        return true;
    }
    false
}

/// Selection restricted to one date, optionally forced adjacent to an
/// already chosen partner window.
fn pair_select(
    engine: &Engine<'_>,
    division_id: &str,
    config: &DivisionConfig,
    team_id: &str,
    date: chrono::NaiveDate,
    event_type: EventType,
    partner: Option<(chrono::NaiveTime, chrono::NaiveTime)>,
) -> Option<Selection> {
    let bundle = engine.bundle;
    let season = &bundle.season;

    let slot_filter = |slot: &ResourceSlot| {
        slot.date == date
            && match event_type {
                EventType::Practice => slot.practice_eligible(season),
                EventType::Cage => slot.cage_eligible(season),
                EventType::Game => false,
            }
    };

    let candidate_check = |_: &ResourceSlot, candidate: &Candidate<'_>| -> Option<SkipReason> {
        let Some((partner_start, partner_end)) = partner else {
            return None;
        };
        if calendar::times_overlap(
            candidate.start_time,
            candidate.end_time,
            partner_start,
            partner_end,
        ) {
            return Some(SkipReason::TeamConflict);
        }
        let gap = calendar::minutes_between(
            candidate.start_time,
            candidate.end_time,
            partner_start,
            partner_end,
        );
        (gap > ADJACENT_GAP_MINUTES).then_some(SkipReason::SameDayConflict)
    };

    let duration_hours = match event_type {
        EventType::Practice => config.practice_duration_hours,
        EventType::Cage => config.cage_session_duration_hours,
        EventType::Game => return None,
    };

    let request = PlacementRequest {
        division_id,
        event_type,
        teams: vec![team_id],
        duration_minutes: (duration_hours * 60.0).round() as u32,
        min_day_gap: config.min_consecutive_day_gap,
        slot_filter: &slot_filter,
        candidate_check: &candidate_check,
    };
    select_best(
        &engine.slots,
        bundle,
        &engine.context,
        &engine.weights,
        &request,
    )
    .ok()
}
