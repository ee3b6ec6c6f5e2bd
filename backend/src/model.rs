//! Entities exchanged with the kernel's collaborators. Field names at the
//! serde boundary are camelCase and stable; newer config fields default
//! to off/empty so older callers keep working.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::scoring::ScoringWeights;

/// `HH:MM` wall-clock times at the boundary (chrono's default wants
/// seconds as well).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub games_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub blackout_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub status: SeasonStatus,
}

impl Season {
    /// First date on which games are admissible.
    pub fn games_start(&self) -> NaiveDate {
        self.games_start_date.unwrap_or(self.start_date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_blackout(&self, date: NaiveDate) -> bool {
        self.blackout_dates.contains(&date)
    }

    /// Monday-anchored weeks of the season, clipped at both ends.
    pub fn weeks(&self) -> Vec<calendar::WeekDefinition> {
        calendar::season_weeks(self.start_date, self.end_date)
    }

    /// Number of game weeks between `games_start` and the season end.
    pub fn game_week_count(&self) -> u32 {
        calendar::game_week_index(self.end_date, self.games_start()).unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    pub id: String,
    pub name: String,
    /// Lower value schedules first.
    pub scheduling_order: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub division_id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Game,
    Practice,
    Cage,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Game => write!(f, "game"),
            Self::Practice => write!(f, "practice"),
            Self::Cage => write!(f, "cage"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Field,
    Cage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameDayPriority {
    Required,
    Preferred,
    Acceptable,
    Avoid,
}

impl GameDayPriority {
    /// Budget allocation weight for competition groups.
    pub fn allocation_weight(&self) -> u32 {
        match self {
            Self::Required => 3,
            Self::Preferred => 2,
            Self::Acceptable => 1,
            Self::Avoid => 0,
        }
    }

    /// Raw scoring contribution of placing a game on a day of this priority.
    pub fn day_score(&self) -> f64 {
        match self {
            Self::Required => 1.0,
            Self::Preferred => 0.8,
            Self::Acceptable => 0.5,
            Self::Avoid => 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDayPreference {
    pub day_of_week: u8,
    pub priority: GameDayPriority,
    #[serde(default)]
    pub max_games_per_day: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameWeekOverride {
    /// 1-indexed from the first game week.
    pub week: u32,
    pub games: u32,
}

/// Weekly obligations of one division for one season. Superset schema:
/// callers that predate cage sessions, overrides or Sunday pairing simply
/// omit those fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionConfig {
    pub division_id: String,
    pub games_per_week: u32,
    #[serde(default)]
    pub practices_per_week: u32,
    #[serde(default)]
    pub cage_sessions_per_week: u32,
    pub game_duration_hours: f64,
    #[serde(default)]
    pub practice_duration_hours: f64,
    #[serde(default)]
    pub cage_session_duration_hours: f64,
    /// Hours teams arrive before a game; occupies field capacity when
    /// sizing competition-group budgets.
    #[serde(default)]
    pub game_arrival_hours: f64,
    #[serde(default)]
    pub practice_arrival_minutes: u32,
    #[serde(default)]
    pub cage_arrival_minutes: u32,
    #[serde(default)]
    pub max_games_per_season: Option<u32>,
    #[serde(default)]
    pub game_week_overrides: Vec<GameWeekOverride>,
    /// Preferred fields, most preferred first.
    #[serde(default)]
    pub field_preferences: Vec<String>,
    #[serde(default)]
    pub game_day_preferences: Vec<GameDayPreference>,
    #[serde(default)]
    pub min_consecutive_day_gap: Option<u32>,
    #[serde(default)]
    pub sunday_paired_practice: bool,
}

impl DivisionConfig {
    /// Games expected in the given 1-indexed game week, before the
    /// season cap is applied.
    pub fn games_per_week_for(&self, week: u32) -> u32 {
        self.game_week_overrides
            .iter()
            .find(|o| o.week == week)
            .map(|o| o.games)
            .unwrap_or(self.games_per_week)
    }

    /// Per-week game targets across `weeks` game weeks, with
    /// `max_games_per_season` applied as a running cap.
    pub fn weekly_game_targets(&self, weeks: u32) -> Vec<u32> {
        let mut remaining = self.max_games_per_season.unwrap_or(u32::MAX);
        (1..=weeks)
            .map(|week| {
                let quota = self.games_per_week_for(week).min(remaining);
                remaining -= quota;
                quota
            })
            .collect()
    }

    /// Total games each team should play over the whole season.
    pub fn target_games_per_team(&self, weeks: u32) -> u32 {
        self.weekly_game_targets(weeks).iter().sum()
    }

    pub fn day_preference(&self, day_of_week: u8) -> Option<&GameDayPreference> {
        self.game_day_preferences
            .iter()
            .find(|p| p.day_of_week == day_of_week)
    }

    /// The division's top-preferred field together with its `required`
    /// game days, if both exist. Competition groups form around these.
    pub fn primary_field(&self) -> Option<&str> {
        self.field_preferences.first().map(String::as_str)
    }

    pub fn required_days(&self) -> impl Iterator<Item = u8> + '_ {
        self.game_day_preferences
            .iter()
            .filter(|p| p.priority == GameDayPriority::Required)
            .map(|p| p.day_of_week)
    }
}

/// A physical resource bound to a season. An empty compatibility list means
/// every division may use it.
pub trait ResourceLike {
    fn resource_id(&self) -> &str;
    fn kind(&self) -> ResourceKind;
    fn division_compatibility(&self) -> &[String];

    fn allows_division(&self, division_id: &str) -> bool {
        let compat = self.division_compatibility();
        compat.is_empty() || compat.iter().any(|d| d == division_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonField {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub division_compatibility: Vec<String>,
}

impl ResourceLike for SeasonField {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Field
    }

    fn division_compatibility(&self) -> &[String] {
        &self.division_compatibility
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonCage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub division_compatibility: Vec<String>,
}

impl ResourceLike for SeasonCage {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Cage
    }

    fn division_compatibility(&self) -> &[String] {
        &self.division_compatibility
    }
}

/// Recurring weekly availability window for a season resource.
pub trait WeeklyWindowLike {
    fn resource_id(&self) -> &str;
    fn day_of_week(&self) -> u8;
    fn start_time(&self) -> NaiveTime;
    fn end_time(&self) -> NaiveTime;
    fn single_event_only(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAvailability {
    pub season_field_id: String,
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub single_event_only: bool,
}

impl WeeklyWindowLike for FieldAvailability {
    fn resource_id(&self) -> &str {
        &self.season_field_id
    }

    fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    fn single_event_only(&self) -> bool {
        self.single_event_only
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CageAvailability {
    pub season_cage_id: String,
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub single_event_only: bool,
}

impl WeeklyWindowLike for CageAvailability {
    fn resource_id(&self) -> &str {
        &self.season_cage_id
    }

    fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    fn single_event_only(&self) -> bool {
        self.single_event_only
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideType {
    /// Without times, blacks out the whole date; with times, the sub-window.
    Blackout,
    /// Introduces an extra window on that date.
    Added,
}

pub trait DateOverrideLike {
    fn resource_id(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn override_type(&self) -> OverrideType;
    fn start_time(&self) -> Option<NaiveTime>;
    fn end_time(&self) -> Option<NaiveTime>;
    fn single_event_only(&self) -> Option<bool>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDateOverride {
    pub season_field_id: String,
    pub date: NaiveDate,
    pub override_type: OverrideType,
    #[serde(default, with = "optional_hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "optional_hhmm")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub single_event_only: Option<bool>,
}

impl DateOverrideLike for FieldDateOverride {
    fn resource_id(&self) -> &str {
        &self.season_field_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn override_type(&self) -> OverrideType {
        self.override_type
    }

    fn start_time(&self) -> Option<NaiveTime> {
        self.start_time
    }

    fn end_time(&self) -> Option<NaiveTime> {
        self.end_time
    }

    fn single_event_only(&self) -> Option<bool> {
        self.single_event_only
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CageDateOverride {
    pub season_cage_id: String,
    pub date: NaiveDate,
    pub override_type: OverrideType,
    #[serde(default, with = "optional_hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "optional_hhmm")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub single_event_only: Option<bool>,
}

impl DateOverrideLike for CageDateOverride {
    fn resource_id(&self) -> &str {
        &self.season_cage_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn override_type(&self) -> OverrideType {
        self.override_type
    }

    fn start_time(&self) -> Option<NaiveTime> {
        self.start_time
    }

    fn end_time(&self) -> Option<NaiveTime> {
        self.end_time
    }

    fn single_event_only(&self) -> Option<bool> {
        self.single_event_only
    }
}

mod optional_hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => super::hhmm::serialize(t, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
}

/// What an event is and who participates. Each variant carries only the
/// fields valid for its kind, so downstream matches never juggle optional
/// `fieldId`/`cageId`/team columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum EventKind {
    #[serde(rename_all = "camelCase")]
    Game {
        field_id: String,
        home_team_id: String,
        away_team_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Practice { field_id: String, team_id: String },
    #[serde(rename_all = "camelCase")]
    Cage { cage_id: String, team_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEventDraft {
    pub division_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ScheduledEventDraft {
    pub fn event_type(&self) -> EventType {
        match self.kind {
            EventKind::Game { .. } => EventType::Game,
            EventKind::Practice { .. } => EventType::Practice,
            EventKind::Cage { .. } => EventType::Cage,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self.kind {
            EventKind::Cage { .. } => ResourceKind::Cage,
            _ => ResourceKind::Field,
        }
    }

    pub fn resource_id(&self) -> &str {
        match &self.kind {
            EventKind::Game { field_id, .. } | EventKind::Practice { field_id, .. } => field_id,
            EventKind::Cage { cage_id, .. } => cage_id,
        }
    }

    /// Participating team ids; two for games, one otherwise.
    pub fn team_ids(&self) -> impl Iterator<Item = &str> {
        let (first, second) = match &self.kind {
            EventKind::Game {
                home_team_id,
                away_team_id,
                ..
            } => (home_team_id.as_str(), Some(away_team_id.as_str())),
            EventKind::Practice { team_id, .. } | EventKind::Cage { team_id, .. } => {
                (team_id.as_str(), None)
            }
        };
        std::iter::once(first).chain(second)
    }

    pub fn involves_team(&self, team_id: &str) -> bool {
        self.team_ids().any(|t| t == team_id)
    }

    /// Games and practices occupy fields; cages don't.
    pub fn is_field_event(&self) -> bool {
        self.resource_kind() == ResourceKind::Field
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.date == other.date
            && calendar::times_overlap(
                self.start_time,
                self.end_time,
                other.start_time,
                other.end_time,
            )
    }
}

/// Recurring availabilities and date overrides, bundled. Optional for the
/// evaluator; the slot builder consumes it in full.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityBundle {
    #[serde(default)]
    pub field_availabilities: Vec<FieldAvailability>,
    #[serde(default)]
    pub cage_availabilities: Vec<CageAvailability>,
    #[serde(default)]
    pub field_overrides: Vec<FieldDateOverride>,
    #[serde(default)]
    pub cage_overrides: Vec<CageDateOverride>,
}

impl AvailabilityBundle {
    pub fn is_empty(&self) -> bool {
        self.field_availabilities.is_empty()
            && self.cage_availabilities.is_empty()
            && self.field_overrides.is_empty()
            && self.cage_overrides.is_empty()
    }
}

/// Everything one scheduling run needs, assembled by the caller. The kernel
/// never mutates the bundle; each invocation owns its private state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBundle {
    pub season: Season,
    pub divisions: Vec<Division>,
    pub teams: Vec<Team>,
    pub division_configs: Vec<DivisionConfig>,
    #[serde(default)]
    pub fields: Vec<SeasonField>,
    #[serde(default)]
    pub cages: Vec<SeasonCage>,
    #[serde(default)]
    pub availability: AvailabilityBundle,
    #[serde(default)]
    pub scoring_weights: Option<ScoringWeights>,
}

impl InputBundle {
    pub fn config_for(&self, division_id: &str) -> Option<&DivisionConfig> {
        self.division_configs
            .iter()
            .find(|c| c.division_id == division_id)
    }

    pub fn teams_in(&self, division_id: &str) -> Vec<&Team> {
        self.teams
            .iter()
            .filter(|t| t.division_id == division_id)
            .collect()
    }

    /// Divisions that actually have teams, lowest `scheduling_order` first.
    pub fn divisions_by_priority(&self) -> Vec<&Division> {
        let mut divisions: Vec<&Division> = self
            .divisions
            .iter()
            .filter(|d| self.teams.iter().any(|t| t.division_id == d.id))
            .collect();
        divisions.sort_by(|a, b| {
            a.scheduling_order
                .cmp(&b.scheduling_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        divisions
    }

    pub fn field(&self, id: &str) -> Option<&SeasonField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn cage(&self, id: &str) -> Option<&SeasonCage> {
        self.cages.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_overrides_and_season_cap() {
        let config = DivisionConfig {
            division_id: "majors".into(),
            games_per_week: 2,
            practices_per_week: 0,
            cage_sessions_per_week: 0,
            game_duration_hours: 2.0,
            practice_duration_hours: 0.0,
            cage_session_duration_hours: 0.0,
            game_arrival_hours: 0.0,
            practice_arrival_minutes: 0,
            cage_arrival_minutes: 0,
            max_games_per_season: Some(7),
            game_week_overrides: vec![GameWeekOverride { week: 2, games: 1 }],
            field_preferences: vec![],
            game_day_preferences: vec![],
            min_consecutive_day_gap: None,
            sunday_paired_practice: false,
        };

        assert_eq!(config.games_per_week_for(1), 2);
        assert_eq!(config.games_per_week_for(2), 1);
        // 2 + 1 + 2 + 2 = 7 hits the cap; week 5 contributes nothing.
        assert_eq!(config.weekly_game_targets(5), vec![2, 1, 2, 2, 0]);
        assert_eq!(config.target_games_per_team(5), 7);
    }

    #[test]
    fn event_draft_round_trips_with_boundary_names() {
        let event = ScheduledEventDraft {
            division_id: "majors".into(),
            date: "2026-03-07".parse().unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            kind: EventKind::Game {
                field_id: "field1".into(),
                home_team_id: "t1".into(),
                away_team_id: "t2".into(),
            },
            status: EventStatus::Scheduled,
            notes: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "game");
        assert_eq!(json["fieldId"], "field1");
        assert_eq!(json["homeTeamId"], "t1");
        assert_eq!(json["startTime"], "09:00");

        let back: ScheduledEventDraft = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn empty_compatibility_admits_all() {
        let field = SeasonField {
            id: "f1".into(),
            name: "Main Diamond".into(),
            division_compatibility: vec![],
        };
        assert!(field.allows_division("aaa"));

        let restricted = SeasonField {
            id: "f2".into(),
            name: "Small Diamond".into(),
            division_compatibility: vec!["tball".into()],
        };
        assert!(restricted.allows_division("tball"));
        assert!(!restricted.allows_division("aaa"));
    }

    #[test]
    fn team_ids_per_kind() {
        let practice = ScheduledEventDraft {
            division_id: "d".into(),
            date: "2026-03-02".parse().unwrap(),
            start_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            kind: EventKind::Practice {
                field_id: "f1".into(),
                team_id: "t9".into(),
            },
            status: EventStatus::default(),
            notes: None,
        };
        assert_eq!(practice.team_ids().collect::<Vec<_>>(), vec!["t9"]);
        assert!(practice.is_field_event());
        assert_eq!(practice.event_type(), EventType::Practice);
    }
}
