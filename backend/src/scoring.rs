//! Mutable per-run scheduling state and the weight table feeding the
//! candidate scorer. One `ScoringContext` is owned by exactly one
//! placement run; the engine is the only writer (the scorer and the
//! constraint predicates read).

pub mod score;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::calendar::{self, WeekDefinition};
use crate::constraints::EventIndex;
use crate::model::{EventKind, EventType, InputBundle, ScheduledEventDraft};
use crate::slots::SlotKey;

/// Hours of bookable time a resource is assumed to offer per day unless
/// the caller says otherwise.
pub const DEFAULT_DAILY_CAPACITY_HOURS: f64 = 8.0;

/// Two days or fewer between games counts as short rest.
pub const SHORT_REST_DAYS: i64 = 2;

/// Weight table. Signs are contractual (penalties negative); magnitudes
/// express relative importance and may be overridden through the bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
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

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            day_spread: 3.0,
            week_balance: 5.0,
            resource_utilization: 2.0,
            time_quality: 4.0,
            day_gap: 6.0,
            time_adjacency: 3.0,
            game_day_preference: 8.0,
            earliest_time: 1.0,
            field_preference: 4.0,
            home_away_balance: 6.0,
            matchup_home_away_balance: 4.0,
            short_rest_balance: -7.0,
            weekend_morning_practice: -3.0,
            same_day_event: -10.0,
            scarcity: -5.0,
            same_day_cage_field_gap: -6.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeekTally {
    pub games: u32,
    pub practices: u32,
    pub cages: u32,
}

impl WeekTally {
    pub fn count_for(&self, event_type: EventType) -> u32 {
        match event_type {
            EventType::Game => self.games,
            EventType::Practice => self.practices,
            EventType::Cage => self.cages,
        }
    }

    fn bump(&mut self, event_type: EventType) {
        match event_type {
            EventType::Game => self.games += 1,
            EventType::Practice => self.practices += 1,
            EventType::Cage => self.cages += 1,
        }
    }
}

/// Running counters for one team, updated after every successful place().
#[derive(Clone, Debug, Default)]
pub struct TeamSchedulingState {
    pub home_games: u32,
    pub away_games: u32,
    /// Opponent id → home-minus-away delta from this team's perspective.
    pub matchup_home_away: HashMap<String, i32>,
    /// Dates already carrying a field event (game or practice).
    pub field_dates: HashSet<NaiveDate>,
    /// Dates already carrying a cage session.
    pub cage_dates: HashSet<NaiveDate>,
    pub day_of_week_usage: [u32; 7],
    pub week_counts: HashMap<u32, WeekTally>,
    pub game_dates: Vec<NaiveDate>,
    /// Games landing within [`SHORT_REST_DAYS`] of another of this
    /// team's games.
    pub short_rest_games: u32,
    /// Every date the team is booked on, any event type.
    pub all_dates: BTreeSet<NaiveDate>,
}

impl TeamSchedulingState {
    pub fn total_events(&self) -> u32 {
        self.day_of_week_usage.iter().sum()
    }

    pub fn total_games(&self) -> u32 {
        self.home_games + self.away_games
    }

    pub fn home_away_delta(&self) -> i32 {
        self.home_games as i32 - self.away_games as i32
    }

    /// Days to the closest booked date, `None` when the team is idle.
    pub fn nearest_day_gap(&self, date: NaiveDate) -> Option<i64> {
        self.all_dates
            .iter()
            .map(|d| calendar::day_gap(*d, date))
            .min()
    }

    pub fn week_tally(&self, week: u32) -> WeekTally {
        self.week_counts.get(&week).copied().unwrap_or_default()
    }

    fn recompute_short_rest(&mut self) {
        let mut dates = self.game_dates.clone();
        dates.sort_unstable();
        self.short_rest_games = dates
            .iter()
            .filter(|date| {
                dates.iter().any(|other| {
                    let gap = calendar::day_gap(**date, *other);
                    gap != 0 && gap <= SHORT_REST_DAYS
                })
            })
            .count() as u32;
    }
}

/// All state one placement run reads and mutates. Built once from the
/// bundle, consumed linearly by the engine.
#[derive(Clone, Debug)]
pub struct ScoringContext {
    pub team_states: HashMap<String, TeamSchedulingState>,
    /// resource id → date → hours booked.
    pub resource_usage: HashMap<String, HashMap<NaiveDate, f64>>,
    pub resource_capacity: HashMap<String, f64>,
    pub week_definitions: Vec<WeekDefinition>,
    pub games_start: NaiveDate,
    /// Division id → its team ids, used for division-level averages.
    pub division_teams: HashMap<String, Vec<String>>,
    pub events: Vec<ScheduledEventDraft>,
    pub index: EventIndex,
    /// Remaining candidate slot keys per team; drives the scarcity factor
    /// when the active phase precomputes it.
    pub team_slot_availability: Option<HashMap<String, HashSet<SlotKey>>>,
}

impl ScoringContext {
    pub fn new(bundle: &InputBundle) -> Self {
        let mut team_states = HashMap::new();
        let mut division_teams: HashMap<String, Vec<String>> = HashMap::new();
        for team in &bundle.teams {
            team_states.insert(team.id.clone(), TeamSchedulingState::default());
            division_teams
                .entry(team.division_id.clone())
                .or_default()
                .push(team.id.clone());
        }

        Self {
            team_states,
            resource_usage: HashMap::new(),
            resource_capacity: HashMap::new(),
            week_definitions: bundle.season.weeks(),
            games_start: bundle.season.games_start(),
            division_teams,
            events: Vec::new(),
            index: EventIndex::default(),
            team_slot_availability: None,
        }
    }

    /// Season week number holding `date`.
    pub fn week_of(&self, date: NaiveDate) -> Option<u32> {
        self.week_definitions
            .iter()
            .find(|w| w.contains(date))
            .map(|w| w.week_number)
    }

    pub fn capacity_of(&self, resource_id: &str) -> f64 {
        self.resource_capacity
            .get(resource_id)
            .copied()
            .unwrap_or(DEFAULT_DAILY_CAPACITY_HOURS)
    }

    pub fn hours_booked(&self, resource_id: &str, date: NaiveDate) -> f64 {
        self.resource_usage
            .get(resource_id)
            .and_then(|dates| dates.get(&date))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn team_state(&self, team_id: &str) -> Option<&TeamSchedulingState> {
        self.team_states.get(team_id)
    }

    /// Mean short-rest count across a division's teams.
    pub fn division_short_rest_average(&self, division_id: &str) -> f64 {
        let Some(team_ids) = self.division_teams.get(division_id) else {
            return 0.0;
        };
        if team_ids.is_empty() {
            return 0.0;
        }
        let total: u32 = team_ids
            .iter()
            .filter_map(|id| self.team_states.get(id))
            .map(|s| s.short_rest_games)
            .sum();
        total as f64 / team_ids.len() as f64
    }

    /// Commit a placed event: canonical list, both indices, resource
    /// usage and every participating team's counters.
    pub fn record(&mut self, event: ScheduledEventDraft) {
        let hours = calendar::duration_hours(event.start_time, event.end_time);
        *self
            .resource_usage
            .entry(event.resource_id().to_string())
            .or_default()
            .entry(event.date)
            .or_insert(0.0) += hours;

        let week = self.week_of(event.date);
        let event_type = event.event_type();
        let day_of_week = calendar::day_of_week(event.date) as usize;

        let participants: Vec<String> = event.team_ids().map(str::to_string).collect();
        for team_id in &participants {
            let Some(state) = self.team_states.get_mut(team_id) else {
                continue;
            };
            state.all_dates.insert(event.date);
            state.day_of_week_usage[day_of_week] += 1;
            if let Some(week) = week {
                state.week_counts.entry(week).or_default().bump(event_type);
            }
            match event_type {
                EventType::Game | EventType::Practice => {
                    state.field_dates.insert(event.date);
                }
                EventType::Cage => {
                    state.cage_dates.insert(event.date);
                }
            }
        }

        if let EventKind::Game {
            home_team_id,
            away_team_id,
            ..
        } = &event.kind
        {
            if let Some(home) = self.team_states.get_mut(home_team_id) {
                home.home_games += 1;
                *home
                    .matchup_home_away
                    .entry(away_team_id.clone())
                    .or_insert(0) += 1;
                home.game_dates.push(event.date);
                home.recompute_short_rest();
            }
            if let Some(away) = self.team_states.get_mut(away_team_id) {
                away.away_games += 1;
                *away
                    .matchup_home_away
                    .entry(home_team_id.clone())
                    .or_insert(0) -= 1;
                away.game_dates.push(event.date);
                away.recompute_short_rest();
            }
        }

        let position = self.events.len();
        self.index.insert(position, &event);
        self.events.push(event);
    }

    /// Drop a consumed slot from every team's remaining-candidates set.
    pub fn consume_slot_key(&mut self, key: &SlotKey) {
        if let Some(availability) = self.team_slot_availability.as_mut() {
            for remaining in availability.values_mut() {
                remaining.remove(key);
            }
        }
    }
}
