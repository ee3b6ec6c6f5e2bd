//! Materializes concrete bookable slots out of recurring weekly windows,
//! date overrides and blackouts. Placement and evaluation only ever see
//! the finished `(resource, date, window)` triples produced here.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::model::{
    AvailabilityBundle, DateOverrideLike, OverrideType, ResourceKind, ResourceLike, Season,
    WeeklyWindowLike,
};

/// Identity of a bookable slot, usable as a set/map key (scarcity factor,
/// budget bookkeeping).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSlot {
    pub resource: ResourceKind,
    pub resource_id: String,
    pub date: NaiveDate,
    pub day_of_week: u8,
    #[serde(with = "crate::model::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::model::hhmm")]
    pub end_time: NaiveTime,
    pub single_event_only: bool,
}

impl ResourceSlot {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            kind: self.resource,
            resource_id: self.resource_id.clone(),
            date: self.date,
            start_time: self.start_time,
        }
    }

    pub fn window_hours(&self) -> f64 {
        calendar::duration_hours(self.start_time, self.end_time)
    }

    /// Field slots on or after the games start date, off season blackouts.
    pub fn game_eligible(&self, season: &Season) -> bool {
        self.resource == ResourceKind::Field
            && self.date >= season.games_start()
            && !season.is_blackout(self.date)
    }

    /// Field slots anywhere in the season, off season blackouts.
    pub fn practice_eligible(&self, season: &Season) -> bool {
        self.resource == ResourceKind::Field
            && season.contains(self.date)
            && !season.is_blackout(self.date)
    }

    pub fn cage_eligible(&self, season: &Season) -> bool {
        self.resource == ResourceKind::Cage
            && season.contains(self.date)
            && !season.is_blackout(self.date)
    }
}

/// Build the whole slot universe for a season. Order is stable: resources
/// in bundle order, dates ascending, windows by start time.
pub fn build_slots(
    season: &Season,
    fields: &[impl ResourceLike],
    cages: &[impl ResourceLike],
    availability: &AvailabilityBundle,
) -> Vec<ResourceSlot> {
    let mut slots = Vec::new();

    for field in fields {
        let windows: Vec<_> = availability
            .field_availabilities
            .iter()
            .filter(|w| w.resource_id() == field.resource_id())
            .collect();
        let overrides: Vec<_> = availability
            .field_overrides
            .iter()
            .filter(|o| o.resource_id() == field.resource_id())
            .collect();
        slots_for_resource(season, field, &windows, &overrides, &mut slots);
    }

    for cage in cages {
        let windows: Vec<_> = availability
            .cage_availabilities
            .iter()
            .filter(|w| w.resource_id() == cage.resource_id())
            .collect();
        let overrides: Vec<_> = availability
            .cage_overrides
            .iter()
            .filter(|o| o.resource_id() == cage.resource_id())
            .collect();
        slots_for_resource(season, cage, &windows, &overrides, &mut slots);
    }

    slots
}

fn slots_for_resource<W, O>(
    season: &Season,
    resource: &impl ResourceLike,
    windows: &[&W],
    overrides: &[&O],
    out: &mut Vec<ResourceSlot>,
) where
    W: WeeklyWindowLike,
    O: DateOverrideLike,
{
    for date in calendar::enumerate_dates(season.start_date, season.end_date) {
        let day_of_week = calendar::day_of_week(date);
        let todays_overrides: Vec<&&O> = overrides.iter().filter(|o| o.date() == date).collect();

        // A blackout with no times wipes the whole date.
        let full_blackout = todays_overrides.iter().any(|o| {
            o.override_type() == OverrideType::Blackout
                && o.start_time().is_none()
                && o.end_time().is_none()
        });
        if full_blackout {
            continue;
        }

        let mut day_windows: Vec<(NaiveTime, NaiveTime, bool)> = windows
            .iter()
            .filter(|w| w.day_of_week() == day_of_week)
            .map(|w| (w.start_time(), w.end_time(), w.single_event_only()))
            .collect();

        // Carve time-scoped blackouts out of the regular windows; a window
        // may split into the pieces on either side of the blackout.
        for blackout in todays_overrides
            .iter()
            .filter(|o| o.override_type() == OverrideType::Blackout)
        {
            let (Some(blackout_start), Some(blackout_end)) =
                (blackout.start_time(), blackout.end_time())
            else {
                continue;
            };

            day_windows = day_windows
                .into_iter()
                .flat_map(|(start, end, single)| {
                    if !calendar::times_overlap(start, end, blackout_start, blackout_end) {
                        return vec![(start, end, single)];
                    }
                    let mut pieces = Vec::new();
                    if start < blackout_start {
                        pieces.push((start, blackout_start, single));
                    }
                    if blackout_end < end {
                        pieces.push((blackout_end, end, single));
                    }
                    pieces
                })
                .collect();
        }

        for added in todays_overrides
            .iter()
            .filter(|o| o.override_type() == OverrideType::Added)
        {
            let (Some(start), Some(end)) = (added.start_time(), added.end_time()) else {
                log::warn!(
                    "ignoring added override for {} on {date}: missing times",
                    resource.resource_id()
                );
                continue;
            };
            day_windows.push((start, end, added.single_event_only().unwrap_or(false)));
        }

        day_windows.retain(|(start, end, _)| start < end);
        day_windows.sort_by_key(|(start, end, _)| (*start, *end));

        for (start_time, end_time, single_event_only) in day_windows {
            out.push(ResourceSlot {
                resource: resource.kind(),
                resource_id: resource.resource_id().to_string(),
                date,
                day_of_week,
                start_time,
                end_time,
                single_event_only,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldAvailability, FieldDateOverride, SeasonField, SeasonStatus};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn season() -> Season {
        Season {
            id: "spring".into(),
            start_date: d("2026-04-01"),
            end_date: d("2026-04-07"),
            games_start_date: Some(d("2026-04-04")),
            blackout_dates: vec![],
            status: SeasonStatus::Active,
        }
    }

    fn one_field() -> Vec<SeasonField> {
        vec![SeasonField {
            id: "field1".into(),
            name: "Main Diamond".into(),
            division_compatibility: vec![],
        }]
    }

    fn saturday_window() -> FieldAvailability {
        FieldAvailability {
            season_field_id: "field1".into(),
            day_of_week: 6,
            start_time: t("09:00"),
            end_time: t("17:00"),
            single_event_only: false,
        }
    }

    #[test]
    fn weekly_window_materializes_on_matching_days() {
        let availability = AvailabilityBundle {
            field_availabilities: vec![saturday_window()],
            ..Default::default()
        };
        let slots = build_slots(&season(), &one_field(), &Vec::<SeasonField>::new(), &availability);

        // 2026-04-04 is the only Saturday in range.
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].date, d("2026-04-04"));
        assert_eq!(slots[0].day_of_week, 6);
        assert!(slots[0].game_eligible(&season()));
    }

    #[test]
    fn dateless_blackout_wipes_the_date() {
        let availability = AvailabilityBundle {
            field_availabilities: vec![saturday_window()],
            field_overrides: vec![FieldDateOverride {
                season_field_id: "field1".into(),
                date: d("2026-04-04"),
                override_type: OverrideType::Blackout,
                start_time: None,
                end_time: None,
                single_event_only: None,
            }],
            ..Default::default()
        };
        let slots = build_slots(&season(), &one_field(), &Vec::<SeasonField>::new(), &availability);
        assert!(slots.is_empty());
    }

    #[test]
    fn timed_blackout_splits_the_window() {
        let availability = AvailabilityBundle {
            field_availabilities: vec![saturday_window()],
            field_overrides: vec![FieldDateOverride {
                season_field_id: "field1".into(),
                date: d("2026-04-04"),
                override_type: OverrideType::Blackout,
                start_time: Some(t("11:00")),
                end_time: Some(t("13:00")),
                single_event_only: None,
            }],
            ..Default::default()
        };
        let slots = build_slots(&season(), &one_field(), &Vec::<SeasonField>::new(), &availability);

        assert_eq!(slots.len(), 2);
        assert_eq!((slots[0].start_time, slots[0].end_time), (t("09:00"), t("11:00")));
        assert_eq!((slots[1].start_time, slots[1].end_time), (t("13:00"), t("17:00")));
    }

    #[test]
    fn blackout_covering_window_start_leaves_tail_only() {
        let availability = AvailabilityBundle {
            field_availabilities: vec![saturday_window()],
            field_overrides: vec![FieldDateOverride {
                season_field_id: "field1".into(),
                date: d("2026-04-04"),
                override_type: OverrideType::Blackout,
                start_time: Some(t("08:00")),
                end_time: Some(t("12:00")),
                single_event_only: None,
            }],
            ..Default::default()
        };
        let slots = build_slots(&season(), &one_field(), &Vec::<SeasonField>::new(), &availability);

        assert_eq!(slots.len(), 1);
        assert_eq!((slots[0].start_time, slots[0].end_time), (t("12:00"), t("17:00")));
    }

    #[test]
    fn added_override_contributes_a_window() {
        let availability = AvailabilityBundle {
            field_availabilities: vec![],
            field_overrides: vec![FieldDateOverride {
                season_field_id: "field1".into(),
                date: d("2026-04-02"),
                override_type: OverrideType::Added,
                start_time: Some(t("15:00")),
                end_time: Some(t("18:00")),
                single_event_only: Some(true),
            }],
            ..Default::default()
        };
        let slots = build_slots(&season(), &one_field(), &Vec::<SeasonField>::new(), &availability);

        assert_eq!(slots.len(), 1);
        assert!(slots[0].single_event_only);
        // Before games start: practice-eligible but not game-eligible.
        assert!(!slots[0].game_eligible(&season()));
        assert!(slots[0].practice_eligible(&season()));
    }

    #[test]
    fn season_blackout_dates_gate_eligibility() {
        let mut blacked = season();
        blacked.blackout_dates.push(d("2026-04-04"));

        let availability = AvailabilityBundle {
            field_availabilities: vec![saturday_window()],
            ..Default::default()
        };
        let slots = build_slots(&blacked, &one_field(), &Vec::<SeasonField>::new(), &availability);

        assert_eq!(slots.len(), 1);
        assert!(!slots[0].game_eligible(&blacked));
        assert!(!slots[0].practice_eligible(&blacked));
    }
}
