//! The placement engine. Schedules games, then practices, then cage
//! sessions; games claim the prime slots because they carry the tightest
//! constraints. Every placement walks the slot universe, collects the
//! admissible `(slot, start)` candidates, scores them and commits the
//! winner. Failures are warnings, never aborts.

pub mod budget;
pub(crate) mod cages;
pub(crate) mod games;
pub(crate) mod practices;

use chrono::NaiveTime;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::constraints::{self, Candidate};
use crate::errors::{GenerationError, ReasonHistogram, ScheduleWarning, SkipReason};
use crate::model::{
    EventKind, EventStatus, EventType, InputBundle, ResourceKind, ScheduledEventDraft,
};
use crate::scoring::score::score_candidate;
use crate::scoring::{ScoringContext, ScoringWeights};
use crate::slots::{build_slots, ResourceSlot};

use budget::RequiredDayBudgetTracker;

/// Start times are tried on the half hour within each window.
pub const START_INCREMENT_MINUTES: u32 = 30;

/// Cooperative cancellation handle. Consulted at matchup, week and phase
/// boundaries; a cancelled run returns whatever was placed so far.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Complete,
    Cancelled,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub total_events: usize,
    pub by_type: HashMap<EventType, usize>,
    pub by_division: HashMap<String, usize>,
    /// Mean number of events each team participates in.
    pub avg_per_team: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub events: Vec<ScheduledEventDraft>,
    pub warnings: Vec<ScheduleWarning>,
    pub errors: Vec<GenerationError>,
    pub stats: GenerationStats,
    pub status: GenerationStatus,
}

/// Run the full placement pipeline over an owned copy of the bundle's
/// state. Deterministic for a fixed `rng_seed`.
pub fn generate(
    bundle: &InputBundle,
    rng_seed: Option<u64>,
    cancel: Option<CancelToken>,
) -> GenerationResult {
    let errors = validate(bundle);
    if !errors.is_empty() {
        return GenerationResult {
            events: Vec::new(),
            warnings: Vec::new(),
            errors,
            stats: GenerationStats::default(),
            status: GenerationStatus::Complete,
        };
    }

    let rng = match rng_seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    let mut engine = Engine {
        bundle,
        weights: bundle.scoring_weights.clone().unwrap_or_default(),
        context: ScoringContext::new(bundle),
        slots: build_slots(
            &bundle.season,
            &bundle.fields,
            &bundle.cages,
            &bundle.availability,
        ),
        budget: RequiredDayBudgetTracker::build(bundle, bundle.season.game_week_count()),
        warnings: Vec::new(),
        rng,
        cancel,
    };

    log::info!(
        "placement run: {} teams, {} slots, {} game weeks",
        bundle.teams.len(),
        engine.slots.len(),
        bundle.season.game_week_count()
    );

    let mut status = GenerationStatus::Complete;
    let phases: [(&str, fn(&mut Engine<'_>) -> bool); 3] = [
        ("games", games::schedule),
        ("practices", practices::schedule),
        ("cages", cages::schedule),
    ];
    for (name, phase) in phases {
        log::info!("phase: {name}");
        if !phase(&mut engine) {
            log::warn!("run cancelled during {name} phase");
            status = GenerationStatus::Cancelled;
            break;
        }
    }

    let stats = compute_stats(bundle, &engine.context.events);
    GenerationResult {
        events: engine.context.events,
        warnings: engine.warnings,
        errors: Vec::new(),
        stats,
        status,
    }
}

fn validate(bundle: &InputBundle) -> Vec<GenerationError> {
    let mut errors = Vec::new();

    if bundle.teams.is_empty() {
        errors.push(GenerationError::NoTeams);
    }

    let mut needs_cage = false;
    for division in bundle.divisions_by_priority() {
        match bundle.config_for(&division.id) {
            Some(config) => needs_cage |= config.cage_sessions_per_week > 0,
            None => errors.push(GenerationError::MissingDivisionConfig {
                division_id: division.id.clone(),
            }),
        }
    }

    if bundle.fields.is_empty() {
        errors.push(GenerationError::NoFields);
    }
    if needs_cage && bundle.cages.is_empty() {
        errors.push(GenerationError::NoCages);
    }

    errors
}

fn compute_stats(bundle: &InputBundle, events: &[ScheduledEventDraft]) -> GenerationStats {
    let mut by_type = HashMap::new();
    let mut by_division = HashMap::new();
    let mut participations = 0usize;

    for event in events {
        *by_type.entry(event.event_type()).or_insert(0) += 1;
        *by_division.entry(event.division_id.clone()).or_insert(0) += 1;
        participations += event.team_ids().count();
    }

    GenerationStats {
        total_events: events.len(),
        by_type,
        by_division,
        avg_per_team: if bundle.teams.is_empty() {
            0.0
        } else {
            participations as f64 / bundle.teams.len() as f64
        },
    }
}

pub(crate) struct Engine<'a> {
    pub bundle: &'a InputBundle,
    pub weights: ScoringWeights,
    pub context: ScoringContext,
    pub slots: Vec<ResourceSlot>,
    pub budget: RequiredDayBudgetTracker,
    pub warnings: Vec<ScheduleWarning>,
    pub rng: SmallRng,
    cancel: Option<CancelToken>,
}

impl Engine<'_> {
    pub fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Commit a selection: build the draft event and fold it into the
    /// run's state.
    pub fn commit(
        &mut self,
        division_id: &str,
        event_type: EventType,
        teams: &[&str],
        selection: &Selection,
    ) -> ScheduledEventDraft {
        let slot = &self.slots[selection.slot_index];
        let kind = match event_type {
            EventType::Game => EventKind::Game {
                field_id: slot.resource_id.clone(),
                home_team_id: teams[0].to_string(),
                away_team_id: teams[1].to_string(),
            },
            EventType::Practice => EventKind::Practice {
                field_id: slot.resource_id.clone(),
                team_id: teams[0].to_string(),
            },
            EventType::Cage => EventKind::Cage {
                cage_id: slot.resource_id.clone(),
                team_id: teams[0].to_string(),
            },
        };
        let event = ScheduledEventDraft {
            division_id: division_id.to_string(),
            date: slot.date,
            start_time: selection.start_time,
            end_time: selection.end_time,
            kind,
            status: EventStatus::Scheduled,
            notes: None,
        };

        let key = slot.key();
        self.context.record(event.clone());
        self.context.consume_slot_key(&key);
        event
    }
}

/// What to place and under which phase-specific rules.
pub(crate) struct PlacementRequest<'r> {
    pub division_id: &'r str,
    pub event_type: EventType,
    /// Participants; home team first for games.
    pub teams: Vec<&'r str>,
    pub duration_minutes: u32,
    pub min_day_gap: Option<u32>,
    /// Coarse slot eligibility (phase, week window, resource kind).
    pub slot_filter: &'r dyn Fn(&ResourceSlot) -> bool,
    /// Phase-specific per-candidate rule (budget gates, cage cutoff,
    /// weekly quotas). `None` passes.
    pub candidate_check: &'r dyn Fn(&ResourceSlot, &Candidate<'_>) -> Option<SkipReason>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Selection {
    pub slot_index: usize,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub score: f64,
}

/// Enumerate admissible candidates across the slot universe and keep the
/// best-scoring one. Pure with respect to the run state: committing is
/// the caller's move.
pub(crate) fn select_best(
    slots: &[ResourceSlot],
    bundle: &InputBundle,
    context: &ScoringContext,
    weights: &ScoringWeights,
    request: &PlacementRequest<'_>,
) -> Result<Selection, ReasonHistogram> {
    let mut histogram = ReasonHistogram::default();
    let mut best: Option<Selection> = None;

    let Some(config) = bundle.config_for(request.division_id) else {
        histogram.record(SkipReason::NoAvailableTimeSlot);
        return Err(histogram);
    };
    if request.duration_minutes == 0 {
        histogram.record(SkipReason::NoAvailableTimeSlot);
        return Err(histogram);
    }

    for (slot_index, slot) in slots.iter().enumerate() {
        if !(request.slot_filter)(slot) {
            continue;
        }

        let compatibility = match slot.resource {
            ResourceKind::Field => bundle
                .field(&slot.resource_id)
                .map(|f| constraints::division_compatible(f, request.division_id)),
            ResourceKind::Cage => bundle
                .cage(&slot.resource_id)
                .map(|c| constraints::division_compatible(c, request.division_id)),
        };
        match compatibility {
            Some(None) => {}
            Some(Some(reason)) => {
                histogram.record(reason);
                continue;
            }
            // Slot for a resource the bundle no longer lists.
            None => continue,
        }

        if let Some(reason) =
            constraints::event_type_admissible(slot.date, request.event_type, &bundle.season)
        {
            histogram.record(reason);
            continue;
        }

        if let Some(reason) =
            constraints::single_event_slot_free(&context.events, &context.index, slot)
        {
            histogram.record(reason);
            continue;
        }

        let slot_key = slot.key();
        let mut start = slot.start_time;
        loop {
            let Some(end) = crate::calendar::add_minutes(start, request.duration_minutes) else {
                break;
            };
            if end > slot.end_time {
                break;
            }

            let candidate = Candidate {
                event_type: request.event_type,
                resource: slot.resource,
                resource_id: &slot.resource_id,
                date: slot.date,
                start_time: start,
                end_time: end,
            };

            if let Some(reason) = admissible(context, request, slot, &candidate) {
                histogram.record(reason);
            } else {
                let scored = score_candidate(
                    &candidate,
                    &request.teams,
                    config,
                    context,
                    weights,
                    Some(&slot_key),
                );
                let better = best.map_or(true, |b| scored.total > b.score);
                if better {
                    best = Some(Selection {
                        slot_index,
                        start_time: start,
                        end_time: end,
                        score: scored.total,
                    });
                }
            }

            match crate::calendar::add_minutes(start, START_INCREMENT_MINUTES) {
                Some(next) => start = next,
                None => break,
            }
        }
    }

    best.ok_or_else(|| {
        if histogram.is_empty() {
            histogram.record(SkipReason::NoAvailableTimeSlot);
        }
        histogram
    })
}

fn admissible(
    context: &ScoringContext,
    request: &PlacementRequest<'_>,
    slot: &ResourceSlot,
    candidate: &Candidate<'_>,
) -> Option<SkipReason> {
    if let Some(reason) = constraints::resource_conflict(&context.events, &context.index, candidate)
    {
        return Some(reason);
    }

    for team_id in &request.teams {
        if let Some(reason) =
            constraints::team_conflict(&context.events, &context.index, team_id, candidate)
        {
            return Some(reason);
        }
        if let Some(reason) =
            constraints::same_day_forbidden(&context.events, &context.index, team_id, candidate)
        {
            return Some(reason);
        }
        if let Some(min_days) = request.min_day_gap {
            if let Some(state) = context.team_state(team_id) {
                if let Some(reason) =
                    constraints::min_day_gap(state.all_dates.iter(), candidate.date, min_days)
                {
                    return Some(reason);
                }
            }
        }
    }

    (request.candidate_check)(slot, candidate)
}
