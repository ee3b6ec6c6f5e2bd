//! Predicate-level admissibility tests consulted by the placement engine.
//! Each predicate returns `None` on pass or the `SkipReason` that killed
//! the candidate. Lookups go through the incremental per-date indices, so
//! a check costs O(k) in the events already on that date/key.

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

use crate::calendar;
use crate::errors::SkipReason;
use crate::model::{EventType, ResourceKind, ResourceLike, ScheduledEventDraft, Season};
use crate::slots::ResourceSlot;

/// Max minutes between a practice and a cage session on the same date for
/// the pair to count as one shared day-slot.
pub const ADJACENT_GAP_MINUTES: u32 = 15;

/// A prospective event before it is committed.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub event_type: EventType,
    pub resource: ResourceKind,
    pub resource_id: &'a str,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// `(date × resource) → events` and `(date × team) → events` maps,
/// maintained incrementally as events are placed. Values are positions in
/// the canonical event list.
#[derive(Clone, Debug, Default)]
pub struct EventIndex {
    by_resource: HashMap<String, HashMap<NaiveDate, Vec<usize>>>,
    by_team: HashMap<String, HashMap<NaiveDate, Vec<usize>>>,
}

impl EventIndex {
    pub fn insert(&mut self, position: usize, event: &ScheduledEventDraft) {
        self.by_resource
            .entry(event.resource_id().to_string())
            .or_default()
            .entry(event.date)
            .or_default()
            .push(position);
        for team_id in event.team_ids() {
            self.by_team
                .entry(team_id.to_string())
                .or_default()
                .entry(event.date)
                .or_default()
                .push(position);
        }
    }

    pub fn build(events: &[ScheduledEventDraft]) -> Self {
        let mut index = Self::default();
        for (position, event) in events.iter().enumerate() {
            index.insert(position, event);
        }
        index
    }

    pub fn resource_events(&self, resource_id: &str, date: NaiveDate) -> &[usize] {
        self.by_resource
            .get(resource_id)
            .and_then(|dates| dates.get(&date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn team_events(&self, team_id: &str, date: NaiveDate) -> &[usize] {
        self.by_team
            .get(team_id)
            .and_then(|dates| dates.get(&date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Same resource, same date, overlapping time range.
pub fn resource_conflict(
    events: &[ScheduledEventDraft],
    index: &EventIndex,
    candidate: &Candidate<'_>,
) -> Option<SkipReason> {
    for &position in index.resource_events(candidate.resource_id, candidate.date) {
        let existing = &events[position];
        if existing.resource_kind() == candidate.resource
            && calendar::times_overlap(
                existing.start_time,
                existing.end_time,
                candidate.start_time,
                candidate.end_time,
            )
        {
            return Some(SkipReason::ResourceConflict);
        }
    }
    None
}

/// A `single_event_only` window admits one event per date, full stop.
pub fn single_event_slot_free(
    events: &[ScheduledEventDraft],
    index: &EventIndex,
    slot: &ResourceSlot,
) -> Option<SkipReason> {
    if !slot.single_event_only {
        return None;
    }
    let occupied = index
        .resource_events(&slot.resource_id, slot.date)
        .iter()
        .any(|&position| {
            let existing = &events[position];
            existing.resource_kind() == slot.resource
                && existing.start_time >= slot.start_time
                && existing.end_time <= slot.end_time
        });
    occupied.then_some(SkipReason::SingleEventSlotTaken)
}

/// The team already appears in a time-overlapping event on that date.
pub fn team_conflict(
    events: &[ScheduledEventDraft],
    index: &EventIndex,
    team_id: &str,
    candidate: &Candidate<'_>,
) -> Option<SkipReason> {
    for &position in index.team_events(team_id, candidate.date) {
        let existing = &events[position];
        if calendar::times_overlap(
            existing.start_time,
            existing.end_time,
            candidate.start_time,
            candidate.end_time,
        ) {
            return Some(SkipReason::TeamConflict);
        }
    }
    None
}

/// Same-day combination rules: one field event per date, never game+cage,
/// never two cage sessions, and practice+cage only when adjacent.
pub fn same_day_forbidden(
    events: &[ScheduledEventDraft],
    index: &EventIndex,
    team_id: &str,
    candidate: &Candidate<'_>,
) -> Option<SkipReason> {
    for &position in index.team_events(team_id, candidate.date) {
        let existing = &events[position];
        let pair = (candidate.event_type, existing.event_type());

        let forbidden = match pair {
            // Two field events on one date.
            (EventType::Game | EventType::Practice, EventType::Game | EventType::Practice) => true,
            // Game and cage never share a date, either order.
            (EventType::Game, EventType::Cage) | (EventType::Cage, EventType::Game) => true,
            (EventType::Cage, EventType::Cage) => true,
            // Practice + cage is tolerated only back-to-back.
            (EventType::Practice, EventType::Cage) | (EventType::Cage, EventType::Practice) => {
                calendar::minutes_between(
                    candidate.start_time,
                    candidate.end_time,
                    existing.start_time,
                    existing.end_time,
                ) > ADJACENT_GAP_MINUTES
            }
        };

        if forbidden {
            return Some(SkipReason::SameDayConflict);
        }
    }
    None
}

/// Any other event for the team strictly fewer than `min_days` away (and
/// not same-day, which the same-day rules govern).
pub fn min_day_gap<'a>(
    team_dates: impl Iterator<Item = &'a NaiveDate>,
    candidate_date: NaiveDate,
    min_days: u32,
) -> Option<SkipReason> {
    for date in team_dates {
        let gap = calendar::day_gap(*date, candidate_date);
        if gap != 0 && gap < min_days as i64 {
            return Some(SkipReason::MinDayGap);
        }
    }
    None
}

pub fn division_compatible(
    resource: &impl ResourceLike,
    division_id: &str,
) -> Option<SkipReason> {
    if resource.allows_division(division_id) {
        None
    } else {
        Some(SkipReason::DivisionIncompatible)
    }
}

pub fn event_type_admissible(
    date: NaiveDate,
    event_type: EventType,
    season: &Season,
) -> Option<SkipReason> {
    if event_type == EventType::Game && date < season.games_start() {
        return Some(SkipReason::BeforeGamesStart);
    }
    if !season.contains(date) || season.is_blackout(date) {
        return Some(SkipReason::Blackout);
    }
    None
}

/// On dates hosting games, cage access splits at this time: playing teams
/// before it, everyone else at or after it.
pub const CAGE_PRIORITY_CUTOFF: (u32, u32) = (16, 45);

/// Game-day cage priority. Only meaningful on a date where some team in
/// the league has a game; the caller establishes that and whether this
/// team is one of the ones playing.
pub fn game_day_cage_priority(
    team_plays_today: bool,
    start_time: NaiveTime,
) -> Option<SkipReason> {
    let cutoff = NaiveTime::from_hms_opt(CAGE_PRIORITY_CUTOFF.0, CAGE_PRIORITY_CUTOFF.1, 0)
        .expect("static cutoff is a valid time");
    if team_plays_today {
        (start_time >= cutoff).then_some(SkipReason::GameDayPlayingAfterCutoff)
    } else {
        (start_time < cutoff).then_some(SkipReason::GameDayNotPlayingBeforeCutoff)
    }
}

/// The candidate `[start, end)` must sit fully inside the slot's window.
pub fn fits_window(candidate: &Candidate<'_>, slot: &ResourceSlot) -> Option<SkipReason> {
    let inside = slot.start_time <= candidate.start_time
        && candidate.end_time <= slot.end_time
        && candidate.start_time < candidate.end_time;
    if inside {
        None
    } else {
        Some(SkipReason::OutsideWindow)
    }
}
