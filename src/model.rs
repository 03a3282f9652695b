use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;

use crate::error::ConversionError;
use crate::schema::conversion;

/// One active breeding batch, as produced by extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct BreedingInitParam {
    /// Identifier of the entity (shed) housing the batch.
    pub entity_id: Option<i64>,
    pub parent_entity_id: Option<i64>,
    pub breeding_code: Option<String>,
    pub genetic_line: Option<String>,
    pub sex: String,
    pub id_breeding: i64,
    pub id_stage: i64,
}

/// One weight / consumption measurement of a batch at a given date and age.
///
/// `stock` is the only field the pipeline rewrites.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightConsumptionRecord {
    pub measured_weight: Option<f64>,
    pub animals_age: i64,
    pub date: NaiveDateTime,
    pub entity_accumulated_consumption: Option<f64>,
    pub animal_accumulated_consumption: Option<f64>,
    pub stock: Option<i64>,
    pub initial_weight_avg: Option<f64>,
    pub initial_age: Option<i64>,
    pub initial_total_quantity: Option<i64>,
    pub id_breeding: i64,
}

/// Expected conversion for a genetic line at one (age, sex, stage).
#[derive(Debug, Clone, PartialEq)]
pub struct StandardReferenceRow {
    pub animals_age: i64,
    pub sex: String,
    pub id_stage: i64,
    pub animal_accumulated_standard_conversion: Option<f64>,
    pub animal_daily_standard_conversion: Option<f64>,
}

/// Output row, unique on (id_breeding, date, animals_age) once persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRecord {
    pub id_breeding: i64,
    pub animals_age: i64,
    pub date: NaiveDate,
    pub animal_accumulated_conversion: Option<f64>,
    pub accumulated_standard_conversion: Option<f64>,
    pub entity_accumulated_conversion: Option<f64>,
    pub calculation_formula_version: String,
}

impl ConversionRecord {
    /// Persistence key.
    pub fn key(&self) -> (i64, NaiveDate, i64) {
        (self.id_breeding, self.date, self.animals_age)
    }
}

/// Build a DataFrame from conversion records, `date` typed as a calendar date.
pub fn conversions_to_frame(records: &[ConversionRecord]) -> Result<DataFrame, ConversionError> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();

    let ids: Vec<i64> = records.iter().map(|r| r.id_breeding).collect();
    let ages: Vec<i64> = records.iter().map(|r| r.animals_age).collect();
    let days: Vec<i32> = records
        .iter()
        .map(|r| r.date.signed_duration_since(epoch).num_days() as i32)
        .collect();
    let animal: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.animal_accumulated_conversion)
        .collect();
    let standard: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.accumulated_standard_conversion)
        .collect();
    let entity: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.entity_accumulated_conversion)
        .collect();
    let versions: Vec<String> = records
        .iter()
        .map(|r| r.calculation_formula_version.clone())
        .collect();

    let dates = Series::new(conversion::DATE.into(), days).cast(&DataType::Date)?;

    let columns: Vec<Column> = vec![
        Column::new(conversion::ID_BREEDING.into(), ids),
        Column::new(conversion::ANIMALS_AGE.into(), ages),
        dates.into(),
        Column::new(conversion::ANIMAL_ACCUMULATED_CONVERSION.into(), animal),
        Column::new(conversion::ACCUMULATED_STANDARD_CONVERSION.into(), standard),
        Column::new(conversion::ENTITY_ACCUMULATED_CONVERSION.into(), entity),
        Column::new(conversion::CALCULATION_FORMULA_VERSION.into(), versions),
    ];

    Ok(DataFrame::new(columns)?)
}
