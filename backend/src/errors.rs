use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::EventType;

/// Fatal precondition failures. Any of these empties the result; none of
/// them panics or crosses the boundary as an exception.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationError {
    #[error("no teams were supplied")]
    NoTeams,
    #[error("no fields were supplied")]
    NoFields,
    #[error("cage sessions are required but no cages were supplied")]
    NoCages,
    #[error("division {division_id} has no configuration")]
    #[serde(rename_all = "camelCase")]
    MissingDivisionConfig { division_id: String },
}

/// Why a specific candidate was rejected during placement. Aggregated into
/// per-warning histograms so a caller can see what starved a matchup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ResourceConflict,
    TeamConflict,
    SameDayConflict,
    MinDayGap,
    DivisionIncompatible,
    BeforeGamesStart,
    Blackout,
    OutsideWindow,
    SingleEventSlotTaken,
    WeeklyQuotaReached,
    RequiredDayBudgetExhausted,
    MaxGamesPerDayReached,
    HomeTeamHasEventOnDate,
    AwayTeamHasEventOnDate,
    TeamHasEventOnDate,
    GameDayPlayingAfterCutoff,
    GameDayNotPlayingBeforeCutoff,
    NoAvailableTimeSlot,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::ResourceConflict => "resource_conflict",
            Self::TeamConflict => "team_conflict",
            Self::SameDayConflict => "same_day_conflict",
            Self::MinDayGap => "min_day_gap",
            Self::DivisionIncompatible => "division_incompatible",
            Self::BeforeGamesStart => "before_games_start",
            Self::Blackout => "blackout",
            Self::OutsideWindow => "outside_window",
            Self::SingleEventSlotTaken => "single_event_slot_taken",
            Self::WeeklyQuotaReached => "weekly_quota_reached",
            Self::RequiredDayBudgetExhausted => "required_day_budget_exhausted",
            Self::MaxGamesPerDayReached => "max_games_per_day_reached",
            Self::HomeTeamHasEventOnDate => "home_team_has_event_on_date",
            Self::AwayTeamHasEventOnDate => "away_team_has_event_on_date",
            Self::TeamHasEventOnDate => "team_has_event_on_date",
            Self::GameDayPlayingAfterCutoff => "game_day_playing_after_cutoff",
            Self::GameDayNotPlayingBeforeCutoff => "game_day_not_playing_before_cutoff",
            Self::NoAvailableTimeSlot => "no_available_time_slot",
        };
        write!(f, "{tag}")
    }
}

pub const MAX_WARNING_SAMPLES: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCount {
    pub reason: SkipReason,
    pub count: u32,
}

/// A recoverable placement failure. The engine records one of these and
/// keeps going; the caller decides whether the shortfall matters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWarning {
    pub division_id: String,
    pub event_type: EventType,
    pub message: String,
    pub reasons: Vec<ReasonCount>,
    pub samples: Vec<String>,
}

/// Tally of skip reasons observed while hunting for one placement.
#[derive(Clone, Debug, Default)]
pub struct ReasonHistogram {
    counts: std::collections::HashMap<SkipReason, u32>,
    samples: Vec<String>,
}

impl ReasonHistogram {
    pub fn record(&mut self, reason: SkipReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    pub fn sample(&mut self, detail: String) {
        if self.samples.len() < MAX_WARNING_SAMPLES {
            self.samples.push(detail);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn into_warning(
        self,
        division_id: impl Into<String>,
        event_type: EventType,
        message: impl Into<String>,
    ) -> ScheduleWarning {
        let mut reasons: Vec<ReasonCount> = self
            .counts
            .into_iter()
            .map(|(reason, count)| ReasonCount { reason, count })
            .collect();
        // Dominant starvation cause first; reason tag breaks ties for
        // stable output.
        reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

        ScheduleWarning {
            division_id: division_id.into(),
            event_type,
            message: message.into(),
            reasons,
            samples: self.samples,
        }
    }
}
