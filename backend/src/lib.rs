//! Scheduling kernel for a Little-League season: materializes bookable
//! slots from availability and overrides, places round-robin games, team
//! practices and cage sessions under hard constraints with weighted
//! scoring, and evaluates any finished schedule against ten quality
//! metrics.
//!
//! The kernel is single-threaded and owns its run state exclusively;
//! callers hand in an [`model::InputBundle`] and get values back. No
//! panics and no exceptions cross this boundary, and placement is
//! deterministic for a fixed RNG seed.

pub mod calendar;
pub mod constraints;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod model;
pub mod scoring;
pub mod slots;

pub use engine::{generate, CancelToken, GenerationResult, GenerationStats, GenerationStatus};
pub use errors::{GenerationError, ReasonCount, ScheduleWarning, SkipReason};
pub use evaluator::{
    compare, evaluate, ComparisonReport, EvaluationReport, MetricChange, MetricComparison,
    MetricDetail, MetricReport, MetricSet, Severity,
};
pub use model::{
    AvailabilityBundle, CageAvailability, CageDateOverride, Division, DivisionConfig, EventKind,
    EventStatus, EventType, FieldAvailability, FieldDateOverride, GameDayPreference,
    GameDayPriority, GameWeekOverride, InputBundle, OverrideType, ResourceKind, ScheduledEventDraft,
    Season, SeasonCage, SeasonField, Team,
};
pub use scoring::ScoringWeights;
pub use slots::{build_slots, ResourceSlot};
