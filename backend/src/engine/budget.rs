//! Required-day budgets. When two or more divisions claim the same field
//! on the same weekday as their required game day, the weekly capacity of
//! that field/day cell is split between them up front so the division
//! scheduled first cannot starve the others.

use std::collections::{HashMap, HashSet};

use crate::calendar;
use crate::model::{GameDayPriority, InputBundle, WeeklyWindowLike};

type Cell = (String, u8, u32);

#[derive(Clone, Debug, Default)]
pub struct RequiredDayBudgetTracker {
    /// (division, day-of-week, game week) → allotted placements.
    budgets: HashMap<Cell, u32>,
    usage: HashMap<Cell, u32>,
    /// (division, day-of-week) pairs that are governed at all.
    governed: HashSet<(String, u8)>,
}

impl RequiredDayBudgetTracker {
    /// Detect competition groups and pre-split their weekly slots.
    pub fn build(bundle: &InputBundle, game_weeks: u32) -> Self {
        let mut tracker = Self::default();

        // (day-of-week, primary field) → competing divisions.
        let mut claims: HashMap<(u8, &str), Vec<&str>> = HashMap::new();
        for config in &bundle.division_configs {
            let Some(primary) = config.primary_field() else {
                continue;
            };
            for day in config.required_days() {
                claims
                    .entry((day, primary))
                    .or_default()
                    .push(&config.division_id);
            }
        }

        for ((day, field_id), divisions) in claims {
            if divisions.len() < 2 {
                continue;
            }

            let weekly_hours: f64 = bundle
                .availability
                .field_availabilities
                .iter()
                .filter(|w| w.resource_id() == field_id && w.day_of_week() == day)
                .map(|w| calendar::duration_hours(w.start_time(), w.end_time()))
                .sum();

            // Slot length is the group's worst case: the longest
            // game-plus-arrival footprint among the competitors.
            let slot_hours = divisions
                .iter()
                .filter_map(|d| bundle.config_for(d))
                .map(|c| c.game_duration_hours + c.game_arrival_hours)
                .fold(0.0, f64::max);
            if slot_hours <= 0.0 {
                continue;
            }
            let slots_per_week = (weekly_hours / slot_hours).floor() as u32;

            let total_weight: u32 = divisions
                .iter()
                .filter_map(|d| bundle.config_for(d))
                .filter_map(|c| c.day_preference(day))
                .map(|p| p.priority.allocation_weight())
                .sum();
            if total_weight == 0 {
                continue;
            }

            for division_id in &divisions {
                let weight = bundle
                    .config_for(division_id)
                    .and_then(|c| c.day_preference(day))
                    .map(|p| p.priority.allocation_weight())
                    .unwrap_or(GameDayPriority::Acceptable.allocation_weight());

                let share = (slots_per_week * weight) as f64 / total_weight as f64;
                let allotted = (share.floor() as u32).max(1);

                tracker
                    .governed
                    .insert((division_id.to_string(), day));
                for week in 1..=game_weeks {
                    tracker
                        .budgets
                        .insert((division_id.to_string(), day, week), allotted);
                }
            }
        }

        tracker
    }

    /// True unless the division sits in a competition group on this day
    /// and has exhausted its weekly allotment.
    pub fn can_use(&self, division_id: &str, day_of_week: u8, week: u32) -> bool {
        if !self
            .governed
            .contains(&(division_id.to_string(), day_of_week))
        {
            return true;
        }
        let cell = (division_id.to_string(), day_of_week, week);
        let budget = self.budgets.get(&cell).copied().unwrap_or(0);
        let used = self.usage.get(&cell).copied().unwrap_or(0);
        used < budget
    }

    pub fn record(&mut self, division_id: &str, day_of_week: u8, week: u32) {
        if !self
            .governed
            .contains(&(division_id.to_string(), day_of_week))
        {
            return;
        }
        *self
            .usage
            .entry((division_id.to_string(), day_of_week, week))
            .or_insert(0) += 1;
    }

    /// Whether the tracker governs the division on this day at all.
    pub fn governs(&self, division_id: &str, day_of_week: u8) -> bool {
        self.governed
            .contains(&(division_id.to_string(), day_of_week))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn config(division_id: &str, games_per_week: u32) -> DivisionConfig {
        DivisionConfig {
            division_id: division_id.into(),
            games_per_week,
            practices_per_week: 0,
            cage_sessions_per_week: 0,
            game_duration_hours: 2.0,
            practice_duration_hours: 0.0,
            cage_session_duration_hours: 0.0,
            game_arrival_hours: 0.0,
            practice_arrival_minutes: 0,
            cage_arrival_minutes: 0,
            max_games_per_season: None,
            game_week_overrides: vec![],
            field_preferences: vec!["field1".into()],
            game_day_preferences: vec![GameDayPreference {
                day_of_week: 6,
                priority: GameDayPriority::Required,
                max_games_per_day: None,
            }],
            min_consecutive_day_gap: None,
            sunday_paired_practice: false,
        }
    }

    fn bundle() -> InputBundle {
        InputBundle {
            season: Season {
                id: "spring".into(),
                start_date: "2026-03-01".parse().unwrap(),
                end_date: "2026-03-07".parse().unwrap(),
                games_start_date: None,
                blackout_dates: vec![],
                status: SeasonStatus::Active,
            },
            divisions: vec![
                Division {
                    id: "a".into(),
                    name: "A".into(),
                    scheduling_order: 1,
                },
                Division {
                    id: "b".into(),
                    name: "B".into(),
                    scheduling_order: 2,
                },
            ],
            teams: vec![],
            division_configs: vec![config("a", 2), config("b", 2)],
            fields: vec![SeasonField {
                id: "field1".into(),
                name: "Main".into(),
                division_compatibility: vec![],
            }],
            cages: vec![],
            availability: AvailabilityBundle {
                field_availabilities: vec![FieldAvailability {
                    season_field_id: "field1".into(),
                    day_of_week: 6,
                    start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                    single_event_only: false,
                }],
                ..Default::default()
            },
            scoring_weights: None,
        }
    }

    #[test]
    fn shared_required_day_splits_evenly() {
        // 8 hours / 2-hour games = 4 slots; two required claims split 2/2.
        let tracker = RequiredDayBudgetTracker::build(&bundle(), 1);

        assert!(tracker.governs("a", 6));
        assert!(tracker.governs("b", 6));
        assert!(tracker.can_use("a", 6, 1));
        assert!(tracker.can_use("b", 6, 1));
        // Any other division or weekday stays ungoverned.
        assert!(tracker.can_use("c", 6, 1));
        assert!(tracker.can_use("a", 3, 1));
    }

    #[test]
    fn usage_exhausts_the_cell() {
        let mut tracker = RequiredDayBudgetTracker::build(&bundle(), 1);

        tracker.record("a", 6, 1);
        assert!(tracker.can_use("a", 6, 1));
        tracker.record("a", 6, 1);
        assert!(!tracker.can_use("a", 6, 1));
        // The other division's cell is untouched.
        assert!(tracker.can_use("b", 6, 1));
    }

    #[test]
    fn lone_claim_is_ungoverned() {
        let mut lone = bundle();
        lone.division_configs.remove(1);
        let tracker = RequiredDayBudgetTracker::build(&lone, 1);
        assert!(!tracker.governs("a", 6));
        assert!(tracker.can_use("a", 6, 1));
    }

    #[test]
    fn every_competitor_keeps_at_least_one_slot() {
        // Shrink the window so floor-rounding would otherwise zero a share.
        let mut tight = bundle();
        tight.availability.field_availabilities[0].end_time =
            chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let tracker = RequiredDayBudgetTracker::build(&tight, 1);

        // 2 hours / 2-hour games = 1 slot split two ways → min 1 each.
        assert!(tracker.can_use("a", 6, 1));
        assert!(tracker.can_use("b", 6, 1));
    }
}
