//! Stock imputation.
//!
//! Stock is only meaningful inside one breeding batch, so every decision is
//! taken per batch. After the baseline rule anchors rows at the initial age to
//! the registered starting population, each batch that still has a missing
//! stock gets one `BatchFill` which is then applied to *all* of its rows.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::model::WeightConsumptionRecord;

/// Stock decision for a batch that still had missing values after the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFill {
    /// No row carries a stock: every row gets the registered starting population.
    InitialQuantity(i64),
    /// Snapshot of the latest recorded stock, written over every row of the batch.
    LatestSnapshot(i64),
    /// No usable stock source; the batch is excluded.
    Unresolvable,
}

impl BatchFill {
    pub fn stock(&self) -> Option<i64> {
        match self {
            BatchFill::InitialQuantity(v) | BatchFill::LatestSnapshot(v) => Some(*v),
            BatchFill::Unresolvable => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Imputation {
    /// Surviving rows, every one with a stock, in input order.
    pub records: Vec<WeightConsumptionRecord>,
    /// Decisions for the batches that needed one, in first-appearance order.
    pub fills: Vec<(i64, BatchFill)>,
}

impl Imputation {
    pub fn dropped_batches(&self) -> Vec<i64> {
        self.fills
            .iter()
            .filter(|(_, fill)| *fill == BatchFill::Unresolvable)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Rows measured at the batch's initial age take the initial total quantity.
pub fn apply_baseline(records: &mut [WeightConsumptionRecord]) {
    for record in records.iter_mut() {
        if record.initial_age == Some(record.animals_age) {
            record.stock = record.initial_total_quantity;
        }
    }
}

/// Decide the stock fill for one batch from its rows.
///
/// Clean rows (with a stock) win over the initial quantity; among them the one
/// with the latest date wins, ties going to the later row.
pub fn decide_fill(batch: &[&WeightConsumptionRecord]) -> BatchFill {
    let initial_stock = batch
        .first()
        .and_then(|r| r.initial_total_quantity)
        .filter(|q| *q != 0);

    let latest = batch
        .iter()
        .filter(|r| r.stock.is_some())
        .fold(None::<&WeightConsumptionRecord>, |best, r| match best {
            Some(b) if b.date > r.date => Some(b),
            _ => Some(r),
        });

    match (latest.and_then(|r| r.stock), initial_stock) {
        (Some(stock), _) => BatchFill::LatestSnapshot(stock),
        (None, Some(quantity)) => BatchFill::InitialQuantity(quantity),
        (None, None) => BatchFill::Unresolvable,
    }
}

/// Guarantee a stock on every kept row; unresolvable batches are dropped.
pub fn impute_stock(mut records: Vec<WeightConsumptionRecord>) -> Imputation {
    apply_baseline(&mut records);

    let mut seen = HashSet::new();
    let pending: Vec<i64> = records
        .iter()
        .filter(|r| r.stock.is_none())
        .map(|r| r.id_breeding)
        .filter(|id| seen.insert(*id))
        .collect();

    let fills: Vec<(i64, BatchFill)> = pending
        .iter()
        .map(|&id_breeding| {
            let batch: Vec<&WeightConsumptionRecord> = records
                .iter()
                .filter(|r| r.id_breeding == id_breeding)
                .collect();
            let fill = decide_fill(&batch);
            match fill {
                BatchFill::Unresolvable => warn!(
                    id_breeding,
                    rows = batch.len(),
                    "No stock values for batch. Impossible to replace or impute; dropping it"
                ),
                _ => debug!(id_breeding, ?fill, "Imputed batch stock"),
            }
            (id_breeding, fill)
        })
        .collect();

    let by_batch: HashMap<i64, BatchFill> = fills.iter().copied().collect();
    records.retain_mut(|r| match by_batch.get(&r.id_breeding) {
        None => true,
        Some(BatchFill::Unresolvable) => false,
        Some(fill) => {
            r.stock = fill.stock();
            true
        }
    });

    Imputation { records, fills }
}
