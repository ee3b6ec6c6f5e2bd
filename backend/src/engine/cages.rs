//! Cage-session placement. Runs last: game dates are final by now, so the
//! game-day cage priority rule can split each game day at the cutoff,
//! with playing teams warming up early and everyone else taking the
//! evening.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::constraints::{self, Candidate};
use crate::errors::SkipReason;
use crate::model::{DivisionConfig, EventKind, EventType, ResourceLike};
use crate::slots::{ResourceSlot, SlotKey};

use super::{select_best, Engine, PlacementRequest};

pub(crate) fn schedule(engine: &mut Engine<'_>) -> bool {
    let bundle = engine.bundle;
    let season = &bundle.season;
    let weeks = season.weeks();

    // Who plays when. Games are all placed already, so build this once.
    let mut playing_by_date: HashMap<NaiveDate, HashSet<String>> = HashMap::new();
    for event in &engine.context.events {
        if let EventKind::Game {
            home_team_id,
            away_team_id,
            ..
        } = &event.kind
        {
            let todays = playing_by_date.entry(event.date).or_default();
            todays.insert(home_team_id.clone());
            todays.insert(away_team_id.clone());
        }
    }

    let mut availability: HashMap<String, HashSet<SlotKey>> = HashMap::new();
    for team in &bundle.teams {
        let keys = engine
            .slots
            .iter()
            .filter(|slot| slot.cage_eligible(season))
            .filter(|slot| {
                bundle
                    .cage(&slot.resource_id)
                    .is_some_and(|c| c.allows_division(&team.division_id))
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
        if config.cage_sessions_per_week == 0 {
            continue;
        }

        for team in bundle.teams_in(&division.id) {
            for week in &weeks {
                if engine.cancelled() {
                    return false;
                }

                let have = engine
                    .context
                    .team_state(&team.id)
                    .map(|s| s.week_tally(week.week_number).cages)
                    .unwrap_or(0);
                let needed = config.cage_sessions_per_week.saturating_sub(have);

                for _ in 0..needed {
                    if !place_cage(
                        engine,
                        &division.id,
                        config,
                        &team.id,
                        week.week_number,
                        &|slot| week.contains(slot.date),
                        &playing_by_date,
                    ) {
                        break;
                    }
                }
            }
        }
    }

    engine.context.team_slot_availability = None;
    true
}

fn place_cage(
    engine: &mut Engine<'_>,
    division_id: &str,
    config: &DivisionConfig,
    team_id: &str,
    week_number: u32,
    in_week: &dyn Fn(&ResourceSlot) -> bool,
    playing_by_date: &HashMap<NaiveDate, HashSet<String>>,
) -> bool {
    let selection = {
        let bundle = engine.bundle;
        let season = &bundle.season;

        let slot_filter = |slot: &ResourceSlot| slot.cage_eligible(season) && in_week(slot);

        let candidate_check = |slot: &ResourceSlot, candidate: &Candidate<'_>| -> Option<SkipReason> {
            let todays_players = playing_by_date.get(&slot.date)?;
            constraints::game_day_cage_priority(
                todays_players.contains(team_id),
                candidate.start_time,
            )
        };

        let request = PlacementRequest {
            division_id,
            event_type: EventType::Cage,
            teams: vec![team_id],
            duration_minutes: (config.cage_session_duration_hours * 60.0).round() as u32,
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
            engine.commit(division_id, EventType::Cage, &[team_id], &selection);
            true
        }
        Err(mut histogram) => {
            histogram.sample(format!("{team_id} week {week_number}"));
            log::warn!("could not schedule cage session for {team_id} in week {week_number}");
            engine.warnings.push(histogram.into_warning(
                division_id,
                EventType::Cage,
                format!("could not schedule cage session for {team_id} in week {week_number}"),
            ));
            false
        }
    }
}
