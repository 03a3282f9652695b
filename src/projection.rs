use crate::join::JoinedRow;
use crate::model::ConversionRecord;

/// Shape joined rows into the persisted payload, keeping upstream order.
pub fn project(rows: Vec<JoinedRow<'_>>, formula_version: &str) -> Vec<ConversionRecord> {
    rows.into_iter()
        .map(|joined| {
            let accumulated_standard_conversion = joined.accumulated_standard_conversion();
            let row = joined.row;
            ConversionRecord {
                id_breeding: row.record.id_breeding,
                animals_age: row.record.animals_age,
                date: row.record.date.date(),
                animal_accumulated_conversion: row.animal_accumulated_conversion,
                accumulated_standard_conversion,
                entity_accumulated_conversion: row.entity_accumulated_conversion,
                calculation_formula_version: formula_version.to_string(),
            }
        })
        .collect()
}
