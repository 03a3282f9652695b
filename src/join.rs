use std::collections::HashMap;

use tracing::debug;

use crate::model::{BreedingInitParam, StandardReferenceRow};
use crate::ratio::RatioRow;
use crate::reference::StandardReference;

/// A ratio row enriched with its standard reference, found through the
/// batch's sex and stage.
///
/// A missing batch or standard row leaves `standard` empty; a miss is never
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow<'a> {
    pub row: RatioRow,
    pub standard: Option<&'a StandardReferenceRow>,
}

impl JoinedRow<'_> {
    pub fn accumulated_standard_conversion(&self) -> Option<f64> {
        self.standard
            .and_then(|s| s.animal_accumulated_standard_conversion)
    }
}

/// Left join on `id_breeding`, then on `(animals_age, sex, id_stage)`.
///
/// Batch metadata is one row per batch; on duplicates the first wins.
pub fn join_reference<'a>(
    rows: Vec<RatioRow>,
    init_params: &'a [BreedingInitParam],
    reference: &'a StandardReference,
) -> Vec<JoinedRow<'a>> {
    let mut batches: HashMap<i64, &BreedingInitParam> = HashMap::new();
    for param in init_params {
        batches.entry(param.id_breeding).or_insert(param);
    }

    let mut unmatched_batches = 0usize;
    let mut unmatched_standard = 0usize;

    let joined: Vec<JoinedRow<'a>> = rows
        .into_iter()
        .map(|row| {
            let batch = batches.get(&row.record.id_breeding).copied();
            let standard = batch
                .and_then(|b| reference.get(row.record.animals_age, &b.sex, b.id_stage));

            unmatched_batches += usize::from(batch.is_none());
            unmatched_standard += usize::from(standard.is_none());

            JoinedRow { row, standard }
        })
        .collect();

    debug!(
        rows = joined.len(),
        unmatched_batches, unmatched_standard, "Joined batch metadata and standard reference"
    );

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeightConsumptionRecord;
    use chrono::NaiveDate;

    fn param(id: i64, sex: &str, stage: i64) -> BreedingInitParam {
        BreedingInitParam {
            entity_id: Some(100 + id),
            parent_entity_id: Some(1),
            breeding_code: Some(format!("B{id}")),
            genetic_line: Some("ROSS - 2020".to_string()),
            sex: sex.to_string(),
            id_breeding: id,
            id_stage: stage,
        }
    }

    fn ratio_row(id: i64, age: i64) -> RatioRow {
        RatioRow {
            record: WeightConsumptionRecord {
                measured_weight: Some(1.0),
                animals_age: age,
                date: NaiveDate::from_ymd_opt(2024, 2, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                entity_accumulated_consumption: None,
                animal_accumulated_consumption: None,
                stock: Some(10),
                initial_weight_avg: None,
                initial_age: None,
                initial_total_quantity: None,
                id_breeding: id,
            },
            weight_delta: None,
            animal_accumulated_conversion: None,
            entity_accumulated_conversion: None,
        }
    }

    fn standard(age: i64, sex: &str, stage: i64, value: f64) -> StandardReferenceRow {
        StandardReferenceRow {
            animals_age: age,
            sex: sex.to_string(),
            id_stage: stage,
            animal_accumulated_standard_conversion: Some(value),
            animal_daily_standard_conversion: Some(value / 2.0),
        }
    }

    #[test]
    fn standard_row_broadcasts_to_matching_rows() {
        let params = vec![param(1, "M", 1), param(2, "M", 1)];
        let reference = StandardReference::new(vec![standard(7, "M", 1, 0.85)]);

        let joined = join_reference(vec![ratio_row(1, 7), ratio_row(2, 7)], &params, &reference);

        assert_eq!(joined.len(), 2);
        assert!(joined
            .iter()
            .all(|j| j.accumulated_standard_conversion() == Some(0.85)));
    }

    #[test]
    fn composite_key_must_match_on_every_part() {
        let params = vec![param(1, "H", 1), param(2, "M", 2)];
        let reference = StandardReference::new(vec![standard(7, "M", 1, 0.85)]);

        let joined = join_reference(
            vec![ratio_row(1, 7), ratio_row(2, 7), ratio_row(2, 8)],
            &params,
            &reference,
        );

        assert_eq!(joined.len(), 3);
        assert!(joined.iter().all(|j| j.standard.is_none()));
    }

    #[test]
    fn missing_batch_keeps_row_with_null_metadata() {
        let reference = StandardReference::new(vec![standard(7, "M", 1, 0.85)]);

        let joined = join_reference(vec![ratio_row(9, 7)], &[], &reference);

        assert_eq!(joined.len(), 1);
        assert!(joined[0].standard.is_none());
        assert_eq!(joined[0].accumulated_standard_conversion(), None);
    }

    #[test]
    fn duplicate_batch_metadata_does_not_multiply_rows() {
        let params = vec![param(1, "M", 1), param(1, "H", 1)];
        let reference = StandardReference::new(vec![standard(7, "M", 1, 0.85)]);

        let joined = join_reference(vec![ratio_row(1, 7)], &params, &reference);

        assert_eq!(joined.len(), 1);
        // the first row (sex M) decides the standard lookup
        assert_eq!(joined[0].accumulated_standard_conversion(), Some(0.85));
    }
}
