//! Pairwise schedule comparison: run the evaluator over two event lists
//! and label each metric improved, regressed or unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{InputBundle, ScheduledEventDraft};

use super::evaluate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricChange {
    Improved,
    Regressed,
    Unchanged,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricComparison {
    pub change: MetricChange,
    pub passed_before: bool,
    pub passed_after: bool,
    pub before: String,
    pub after: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub metrics: BTreeMap<String, MetricComparison>,
    pub improved: u32,
    pub regressed: u32,
    pub unchanged: u32,
    pub score_before: u32,
    pub score_after: u32,
    pub score_delta: i32,
}

/// Compare two schedules over the same bundle. A metric only changes
/// label when its pass/fail outcome flips.
pub fn compare(
    bundle: &InputBundle,
    before_events: &[ScheduledEventDraft],
    after_events: &[ScheduledEventDraft],
) -> ComparisonReport {
    let before = evaluate(bundle, before_events);
    let after = evaluate(bundle, after_events);

    let mut metrics = BTreeMap::new();
    let mut improved = 0;
    let mut regressed = 0;
    let mut unchanged = 0;

    for ((name, before_metric), (_, after_metric)) in
        before.metrics.named().iter().zip(after.metrics.named().iter())
    {
        let change = match (before_metric.passed, after_metric.passed) {
            (false, true) => {
                improved += 1;
                MetricChange::Improved
            }
            (true, false) => {
                regressed += 1;
                MetricChange::Regressed
            }
            _ => {
                unchanged += 1;
                MetricChange::Unchanged
            }
        };
        metrics.insert(
            (*name).to_string(),
            MetricComparison {
                change,
                passed_before: before_metric.passed,
                passed_after: after_metric.passed,
                before: before_metric.summary.clone(),
                after: after_metric.summary.clone(),
            },
        );
    }

    ComparisonReport {
        metrics,
        improved,
        regressed,
        unchanged,
        score_before: before.overall_score,
        score_after: after.overall_score,
        score_delta: after.overall_score as i32 - before.overall_score as i32,
    }
}
