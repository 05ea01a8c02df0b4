use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::models::rate::{ComparisonRow, Currency, RateObservation};

/// Join every bank observation to the best rate with the same timestamp and currency.
///
/// Bank observations without a best-rate partner are dropped; that happens
/// whenever best-rate extraction failed for a run. Output keeps the order of
/// the bank observations in `observations`. An empty result means there is
/// nothing to report.
pub fn compare(observations: &[RateObservation]) -> Vec<ComparisonRow> {
    let (best, bank): (Vec<&RateObservation>, Vec<&RateObservation>) =
        observations.iter().partition(|o| o.is_best());

    let mut best_by_key: HashMap<(NaiveDateTime, Currency), &RateObservation> =
        HashMap::with_capacity(best.len());
    for observation in &best {
        // First in history order anchors the join
        best_by_key
            .entry((observation.timestamp, observation.currency))
            .or_insert(*observation);
    }

    let rows: Vec<ComparisonRow> = bank
        .iter()
        .filter_map(|observation| {
            best_by_key
                .get(&(observation.timestamp, observation.currency))
                .map(|best| ComparisonRow::new(observation, best))
        })
        .collect();

    tracing::info!(
        best = best.len(),
        bank = bank.len(),
        matched = rows.len(),
        unmatched = bank.len() - rows.len(),
        "Compared bank rates against best rates"
    );

    rows
}
