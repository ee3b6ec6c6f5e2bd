//! Schedule evaluation: ten quantitative reports over any event list
//! (freshly generated or previously saved) and a 0-100 overall score.
//! The evaluator only reads; it never mutates scheduler state and never
//! aborts. Findings are reported, not thrown.

pub mod compare;
pub(crate) mod metrics;

pub use compare::{compare, ComparisonReport, MetricChange, MetricComparison};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::calendar::{self, WeekDefinition};
use crate::model::{EventType, InputBundle, ScheduledEventDraft, Team};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDetail {
    pub subject: String,
    pub value: f64,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl MetricDetail {
    pub fn new(subject: impl Into<String>, value: f64, note: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            value,
            note: note.into(),
            severity: None,
        }
    }

    pub fn error(subject: impl Into<String>, value: f64, note: impl Into<String>) -> Self {
        Self {
            severity: Some(Severity::Error),
            ..Self::new(subject, value, note)
        }
    }

    pub fn warning(subject: impl Into<String>, value: f64, note: impl Into<String>) -> Self {
        Self {
            severity: Some(Severity::Warning),
            ..Self::new(subject, value, note)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub passed: bool,
    pub summary: String,
    #[serde(default)]
    pub details: Vec<MetricDetail>,
}

impl MetricReport {
    pub fn pass(summary: impl Into<String>) -> Self {
        Self {
            passed: true,
            summary: summary.into(),
            details: Vec::new(),
        }
    }

    pub fn from_details(
        mut details: Vec<MetricDetail>,
        pass_summary: impl Into<String>,
        fail_summary: impl Into<String>,
    ) -> Self {
        sort_details(&mut details);
        Self {
            passed: details.is_empty(),
            summary: if details.is_empty() {
                pass_summary.into()
            } else {
                fail_summary.into()
            },
            details,
        }
    }
}

/// Reports must not inherit hash-map iteration order; evaluation is a
/// pure function of its inputs.
pub(crate) fn sort_details(details: &mut [MetricDetail]) {
    details.sort_by(|a, b| a.subject.cmp(&b.subject).then_with(|| a.note.cmp(&b.note)));
}

/// The ten quality reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub weekly_requirements: MetricReport,
    pub home_away_balance: MetricReport,
    pub constraint_violations: MetricReport,
    pub game_day_preferences: MetricReport,
    pub game_spacing: MetricReport,
    pub practice_spacing: MetricReport,
    pub matchup_balance: MetricReport,
    pub matchup_spacing: MetricReport,
    pub game_slot_efficiency: MetricReport,
    pub weekly_games_distribution: MetricReport,
}

impl MetricSet {
    pub fn named(&self) -> [(&'static str, &MetricReport); 10] {
        [
            ("weeklyRequirements", &self.weekly_requirements),
            ("homeAwayBalance", &self.home_away_balance),
            ("constraintViolations", &self.constraint_violations),
            ("gameDayPreferences", &self.game_day_preferences),
            ("gameSpacing", &self.game_spacing),
            ("practiceSpacing", &self.practice_spacing),
            ("matchupBalance", &self.matchup_balance),
            ("matchupSpacing", &self.matchup_spacing),
            ("gameSlotEfficiency", &self.game_slot_efficiency),
            ("weeklyGamesDistribution", &self.weekly_games_distribution),
        ]
    }

    pub fn passed_count(&self) -> u32 {
        self.named().iter().filter(|(_, m)| m.passed).count() as u32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub metrics: MetricSet,
    /// `round(100 · passed / 10)`.
    pub overall_score: u32,
    pub timestamp: DateTime<Utc>,
}

/// Evaluate an event list against its bundle. Metric outcomes are a pure
/// function of `(bundle, events)`; only the timestamp varies.
pub fn evaluate(bundle: &InputBundle, events: &[ScheduledEventDraft]) -> EvaluationReport {
    let data = EvalData::new(bundle, events);

    let metrics = MetricSet {
        weekly_requirements: metrics::weekly_requirements(&data),
        home_away_balance: metrics::home_away_balance(&data),
        constraint_violations: metrics::constraint_violations(&data),
        game_day_preferences: metrics::game_day_preferences(&data),
        game_spacing: metrics::game_spacing(&data),
        practice_spacing: metrics::practice_spacing(&data),
        matchup_balance: metrics::matchup_balance(&data),
        matchup_spacing: metrics::matchup_spacing(&data),
        game_slot_efficiency: metrics::game_slot_efficiency(&data),
        weekly_games_distribution: metrics::weekly_games_distribution(&data),
    };

    let overall_score = metrics.passed_count() * 10;
    EvaluationReport {
        metrics,
        overall_score,
        timestamp: Utc::now(),
    }
}

/// Event aggregates shared by the metric computations.
pub(crate) struct EvalData<'a> {
    pub bundle: &'a InputBundle,
    pub events: &'a [ScheduledEventDraft],
    pub weeks: Vec<WeekDefinition>,
    pub game_weeks: u32,
    pub teams_by_division: HashMap<&'a str, Vec<&'a Team>>,
    /// Team id → every event it participates in.
    pub team_events: HashMap<&'a str, Vec<&'a ScheduledEventDraft>>,
}

impl<'a> EvalData<'a> {
    pub fn new(bundle: &'a InputBundle, events: &'a [ScheduledEventDraft]) -> Self {
        let mut teams_by_division: HashMap<&str, Vec<&Team>> = HashMap::new();
        let mut team_events: HashMap<&str, Vec<&ScheduledEventDraft>> = HashMap::new();
        for team in &bundle.teams {
            teams_by_division
                .entry(team.division_id.as_str())
                .or_default()
                .push(team);
            team_events.entry(team.id.as_str()).or_default();
        }
        for event in events {
            for team_id in event.team_ids() {
                if let Some(list) = team_events.get_mut(team_id) {
                    list.push(event);
                }
            }
        }

        Self {
            bundle,
            events,
            weeks: bundle.season.weeks(),
            game_weeks: bundle.season.game_week_count(),
            teams_by_division,
            team_events,
        }
    }

    pub fn events_of(&self, team_id: &str, event_type: EventType) -> Vec<&'a ScheduledEventDraft> {
        self.team_events
            .get(team_id)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|e| e.event_type() == event_type)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn sorted_dates_of(&self, team_id: &str, event_type: EventType) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .events_of(team_id, event_type)
            .iter()
            .map(|e| e.date)
            .collect();
        dates.sort_unstable();
        dates
    }

    /// Games landing within two days of another of the team's games.
    pub fn short_rest_count(&self, team_id: &str) -> u32 {
        let dates = self.sorted_dates_of(team_id, EventType::Game);
        dates
            .iter()
            .filter(|date| {
                dates.iter().any(|other| {
                    let gap = calendar::day_gap(**date, *other);
                    gap != 0 && gap <= crate::scoring::SHORT_REST_DAYS
                })
            })
            .count() as u32
    }

    pub fn division_games(&self, division_id: &str) -> Vec<&'a ScheduledEventDraft> {
        self.events
            .iter()
            .filter(|e| e.division_id == division_id && e.event_type() == EventType::Game)
            .collect()
    }
}
