//! Row normalizer: raw extraction frames into typed records.
//!
//! Raw frames may carry any dtype (CSV frames are all strings). Every field is
//! read through its string rendering, trimmed, and parsed into the declared
//! type; empty strings count as null. A value that cannot be coerced, or a
//! null in a key field, fails the whole run with `SchemaMismatch`.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::ConversionError;
use crate::model::{BreedingInitParam, StandardReferenceRow, WeightConsumptionRecord};
use crate::schema::{init_param, standard, weight_consumption};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

// -2^63 and 2^63: every integral f64 in [lower, upper) converts exactly.
const I64_LOWER: f64 = i64::MIN as f64;
const I64_UPPER: f64 = -(i64::MIN as f64);

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, ConversionError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

/// Normalize raw breeding initial-parameter rows.
pub fn init_params(raw: &DataFrame) -> Result<Vec<BreedingInitParam>, ConversionError> {
    let table = RawTable::new(raw, init_param::TABLE);

    let entity_ids = table.ints(init_param::ENTITY_ID)?;
    let parent_ids = table.ints(init_param::PARENT_ENTITY_ID)?;
    let codes = table.texts(init_param::BREEDING_CODE)?;
    let lines = table.texts(init_param::GENETIC_LINE)?;
    let sexes = table.required(init_param::SEX, table.texts(init_param::SEX)?)?;
    let breedings =
        table.required(init_param::ID_BREEDING, table.ints(init_param::ID_BREEDING)?)?;
    let stages = table.required(init_param::ID_STAGE, table.ints(init_param::ID_STAGE)?)?;

    let rows = (0..raw.height())
        .map(|i| BreedingInitParam {
            entity_id: entity_ids[i],
            parent_entity_id: parent_ids[i],
            breeding_code: codes[i].clone(),
            genetic_line: lines[i].clone(),
            sex: sexes[i].clone(),
            id_breeding: breedings[i],
            id_stage: stages[i],
        })
        .collect();

    Ok(rows)
}

/// Normalize raw weight / consumption measurement rows.
pub fn weight_consumptions(
    raw: &DataFrame,
) -> Result<Vec<WeightConsumptionRecord>, ConversionError> {
    use weight_consumption as wc;
    let table = RawTable::new(raw, wc::TABLE);

    let measured_weight = table.floats(wc::MEASURED_WEIGHT)?;
    let animals_age = table.required(wc::ANIMALS_AGE, table.ints(wc::ANIMALS_AGE)?)?;
    let date = table.required(wc::DATE, table.datetimes(wc::DATE)?)?;
    let entity_consumption = table.floats(wc::ENTITY_ACCUMULATED_CONSUMPTION)?;
    let animal_consumption = table.floats(wc::ANIMAL_ACCUMULATED_CONSUMPTION)?;
    let stock = table.ints(wc::STOCK)?;
    let initial_weight_avg = table.floats(wc::INITIAL_WEIGHT_AVG)?;
    let initial_age = table.ints(wc::INITIAL_AGE)?;
    let initial_total_quantity = table.ints(wc::INITIAL_TOTAL_QUANTITY)?;
    let id_breeding = table.required(wc::ID_BREEDING, table.ints(wc::ID_BREEDING)?)?;

    let rows = (0..raw.height())
        .map(|i| WeightConsumptionRecord {
            measured_weight: measured_weight[i],
            animals_age: animals_age[i],
            date: date[i],
            entity_accumulated_consumption: entity_consumption[i],
            animal_accumulated_consumption: animal_consumption[i],
            stock: stock[i],
            initial_weight_avg: initial_weight_avg[i],
            initial_age: initial_age[i],
            initial_total_quantity: initial_total_quantity[i],
            id_breeding: id_breeding[i],
        })
        .collect();

    Ok(rows)
}

/// Normalize a standard-reference frame already in canonical column names.
pub fn standard_reference(raw: &DataFrame) -> Result<Vec<StandardReferenceRow>, ConversionError> {
    let table = RawTable::new(raw, standard::TABLE);

    let ages = table.required(standard::ANIMALS_AGE, table.ints(standard::ANIMALS_AGE)?)?;
    let sexes = table.required(standard::SEX, table.texts(standard::SEX)?)?;
    let stages = table.required(standard::ID_STAGE, table.ints(standard::ID_STAGE)?)?;
    let accumulated = table.floats(standard::ANIMAL_ACCUMULATED_STANDARD_CONVERSION)?;
    let daily = table.floats(standard::ANIMAL_DAILY_STANDARD_CONVERSION)?;

    let rows = ages
        .into_iter()
        .zip(sexes)
        .zip(stages)
        .zip(accumulated.into_iter().zip(daily))
        .map(|(((animals_age, sex), id_stage), (accumulated, daily))| StandardReferenceRow {
            animals_age,
            sex,
            id_stage,
            animal_accumulated_standard_conversion: accumulated,
            animal_daily_standard_conversion: daily,
        })
        .collect();

    Ok(rows)
}

// ── Field coercion ──────────────────────────────────────────────────────────

struct RawTable<'a> {
    df: &'a DataFrame,
    name: &'static str,
}

impl<'a> RawTable<'a> {
    fn new(df: &'a DataFrame, name: &'static str) -> Self {
        Self { df, name }
    }

    /// String rendering of a column, trimmed, with empty strings as null.
    fn texts(&self, column: &str) -> Result<Vec<Option<String>>, ConversionError> {
        let values = self
            .df
            .column(column)
            .map_err(|_| ConversionError::MissingColumn {
                table: self.name,
                column: column.to_string(),
            })?
            .cast(&DataType::String)?;

        let texts = values
            .str()?
            .into_iter()
            .map(|v| {
                v.map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .collect();
        Ok(texts)
    }

    fn floats(&self, column: &str) -> Result<Vec<Option<f64>>, ConversionError> {
        self.parsed(column, "finite float", |text| {
            text.parse::<f64>().ok().filter(|v| v.is_finite())
        })
    }

    /// Integral floats such as "1000.0" are accepted when they fit in an i64.
    fn ints(&self, column: &str) -> Result<Vec<Option<i64>>, ConversionError> {
        self.parsed(column, "integer", |text| {
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|v| v.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(v))
                    .map(|v| v as i64)
            })
        })
    }

    fn datetimes(&self, column: &str) -> Result<Vec<Option<NaiveDateTime>>, ConversionError> {
        self.parsed(column, "date or timestamp", parse_datetime)
    }

    fn parsed<T>(
        &self,
        column: &str,
        expected: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<Option<T>>, ConversionError> {
        self.texts(column)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                None => Ok(None),
                Some(text) => parse(&text)
                    .map(Some)
                    .ok_or_else(|| ConversionError::mismatch(self.name, column, row, &text, expected)),
            })
            .collect()
    }

    /// Reject nulls in a key field.
    fn required<T>(&self, column: &str, values: Vec<Option<T>>) -> Result<Vec<T>, ConversionError> {
        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    ConversionError::mismatch(self.name, column, row, "null", "non-null value")
                })
            })
            .collect()
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_measurements() -> DataFrame {
        df!(
            "measured_weight" => [Some("0.04"), Some("2.0")],
            "animals_age" => ["0", "10"],
            "date" => ["2024-01-01", "2024-01-11 08:30:00"],
            "entity_accumulated_consumption" => [Some("0"), Some("480000")],
            "animal_accumulated_consumption" => [Some("0"), Some("500")],
            "stock" => [None, Some("990.0")],
            "initial_weight_avg" => ["0.04", "0.04"],
            "initial_age" => ["0", "0"],
            "initial_total_quantity" => ["1000", "1000"],
            "id_breeding" => [" 1 ", "1"]
        )
        .unwrap()
    }

    #[test]
    fn measurements_are_typed() {
        let rows = weight_consumptions(&raw_measurements()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stock, None);
        assert_eq!(rows[1].stock, Some(990));
        assert_eq!(rows[0].id_breeding, 1);
        assert_eq!(rows[1].animals_age, 10);
        assert_eq!(
            rows[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 11)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap()
        );
        assert_eq!(rows[1].animal_accumulated_consumption, Some(500.0));
    }

    #[test]
    fn non_numeric_value_is_schema_mismatch() {
        let mut raw = raw_measurements();
        raw.replace(
            "measured_weight",
            Series::new("measured_weight".into(), ["0.04", "heavy"]),
        )
        .unwrap();

        match weight_consumptions(&raw) {
            Err(ConversionError::SchemaMismatch {
                column, row, value, ..
            }) => {
                assert_eq!(column, "measured_weight");
                assert_eq!(row, 1);
                assert_eq!(value, "heavy");
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn fractional_stock_is_schema_mismatch() {
        let mut raw = raw_measurements();
        raw.replace("stock", Series::new("stock".into(), ["10.5", "990"]))
            .unwrap();

        assert!(matches!(
            weight_consumptions(&raw),
            Err(ConversionError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn out_of_range_integral_stock_is_schema_mismatch() {
        for text in ["1e20", "9223372036854775808.0", "-1e19"] {
            let mut raw = raw_measurements();
            raw.replace("stock", Series::new("stock".into(), [text, "990"]))
                .unwrap();

            match weight_consumptions(&raw) {
                Err(ConversionError::SchemaMismatch {
                    column, row, value, ..
                }) => {
                    assert_eq!(column, "stock");
                    assert_eq!(row, 0);
                    assert_eq!(value, text);
                }
                other => panic!("expected SchemaMismatch for {text}, got {other:?}"),
            }
        }

        let mut raw = raw_measurements();
        raw.replace("stock", Series::new("stock".into(), ["-9.223372036854775808e18", "1e3"]))
            .unwrap();
        let rows = weight_consumptions(&raw).unwrap();
        assert_eq!(rows[0].stock, Some(i64::MIN));
        assert_eq!(rows[1].stock, Some(1000));
    }

    #[test]
    fn unparseable_date_is_schema_mismatch() {
        let mut raw = raw_measurements();
        raw.replace("date", Series::new("date".into(), ["2024-01-01", "11/01/2024"]))
            .unwrap();

        assert!(matches!(
            weight_consumptions(&raw),
            Err(ConversionError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn null_key_field_is_schema_mismatch() {
        let mut raw = raw_measurements();
        raw.replace(
            "id_breeding",
            Series::new("id_breeding".into(), [Some("1"), None]),
        )
        .unwrap();

        assert!(matches!(
            weight_consumptions(&raw),
            Err(ConversionError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let raw = raw_measurements().drop("stock").unwrap();

        match weight_consumptions(&raw) {
            Err(ConversionError::MissingColumn { column, .. }) => assert_eq!(column, "stock"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn typed_frames_are_accepted() {
        let raw = df!(
            "entity_id" => [Some(10i64)],
            "parent_entity_id" => [None::<i64>],
            "breeding_code" => ["L-01"],
            "genetic_line" => ["ROSS - 2020"],
            "sex" => ["M"],
            "id_breeding" => [1i64],
            "id_stage" => [1i64]
        )
        .unwrap();

        let rows = init_params(&raw).unwrap();
        assert_eq!(
            rows,
            vec![BreedingInitParam {
                entity_id: Some(10),
                parent_entity_id: None,
                breeding_code: Some("L-01".to_string()),
                genetic_line: Some("ROSS - 2020".to_string()),
                sex: "M".to_string(),
                id_breeding: 1,
                id_stage: 1,
            }]
        );
    }

    #[test]
    fn empty_frame_gives_empty_table() {
        let raw = raw_measurements().head(Some(0));
        assert!(weight_consumptions(&raw).unwrap().is_empty());
    }

    #[test]
    fn timestamps_in_several_layouts_parse() {
        assert!(parse_datetime("2024-05-01T10:00:00").is_some());
        assert!(parse_datetime("2024-05-01 10:00:00.250").is_some());
        assert!(parse_datetime("2024-05-01T10:00:00+02:00").is_some());
        assert!(parse_datetime("01-05-2024").is_none());
    }
}
