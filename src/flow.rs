//! Extract → transform → load over collaborator traits.
//!
//! Sources hand over raw frames, the pipeline computes, sinks persist. The
//! same `run_flow` serves the CLI and any scheduled caller.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::error::ConversionError;
use crate::model::{conversions_to_frame, BreedingInitParam, ConversionRecord};
use crate::normalize;
use crate::pipeline::{ConversionPipeline, ConversionReport};
use crate::reference::ReferenceProvider;
use crate::schema::weight_consumption;

/// Extraction collaborator: hands over raw rows, fully materialized.
pub trait ConversionSource {
    fn initial_parameters(&self) -> Result<DataFrame, ConversionError>;
    fn weight_consumptions(&self, id_breedings: &[i64]) -> Result<DataFrame, ConversionError>;
}

/// Persistence collaborator. Returns the number of records written.
pub trait ConversionSink {
    fn persist(&mut self, records: &[ConversionRecord]) -> Result<usize, ConversionError>;
}

/// Distinct batch identifiers, ascending.
pub fn derive_breeding_identifiers(init_params: &[BreedingInitParam]) -> Vec<i64> {
    init_params
        .iter()
        .map(|p| p.id_breeding)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Run one full extract → transform → load cycle.
pub fn run_flow(
    source: &dyn ConversionSource,
    reference: &dyn ReferenceProvider,
    sink: &mut dyn ConversionSink,
    config: &PipelineConfig,
) -> Result<ConversionReport, ConversionError> {
    let _span = info_span!("conversion_flow", formula_version = %config.formula_version).entered();
    let started = Instant::now();
    info!("Starting conversion flow");

    let raw_init = timed("extract_initial_parameters", || source.initial_parameters())?;
    let init_params = normalize::init_params(&raw_init)?;
    let id_breedings = derive_breeding_identifiers(&init_params);

    let raw_measurements = timed("extract_weight_consumptions", || {
        source.weight_consumptions(&id_breedings)
    })?;
    let measurements = normalize::weight_consumptions(&raw_measurements)?;
    let reference = timed("extract_standard_reference", || reference.load())?;

    let pipeline = ConversionPipeline::new(config.clone());
    let report = timed("transform_conversion_records", || {
        Ok(pipeline.run(&init_params, &measurements, &reference))
    })?;
    let persisted = timed("load_conversion_results", || sink.persist(&report.records))?;

    info!(
        batches = id_breedings.len(),
        records = report.records.len(),
        persisted,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Completed conversion flow"
    );
    Ok(report)
}

fn timed<T>(
    stage: &'static str,
    f: impl FnOnce() -> Result<T, ConversionError>,
) -> Result<T, ConversionError> {
    let started = Instant::now();
    let result = f();
    info!(
        stage,
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stage finished"
    );
    result
}

// ── CSV source ──────────────────────────────────────────────────────────────

/// Raw rows from two CSV exports.
pub struct CsvSource {
    init_params_path: PathBuf,
    measurements_path: PathBuf,
}

impl CsvSource {
    pub fn new(init_params_path: impl Into<PathBuf>, measurements_path: impl Into<PathBuf>) -> Self {
        Self {
            init_params_path: init_params_path.into(),
            measurements_path: measurements_path.into(),
        }
    }
}

impl ConversionSource for CsvSource {
    fn initial_parameters(&self) -> Result<DataFrame, ConversionError> {
        normalize::read_csv_as_strings(&self.init_params_path)
    }

    /// Rows of the requested batches. Rows whose id does not parse are kept
    /// so the normalizer reports them.
    fn weight_consumptions(&self, id_breedings: &[i64]) -> Result<DataFrame, ConversionError> {
        let df = normalize::read_csv_as_strings(&self.measurements_path)?;
        let wanted: BTreeSet<i64> = id_breedings.iter().copied().collect();

        let ids = df
            .column(weight_consumption::ID_BREEDING)
            .map_err(|_| ConversionError::MissingColumn {
                table: weight_consumption::TABLE,
                column: weight_consumption::ID_BREEDING.to_string(),
            })?
            .str()?;

        let mask: BooleanChunked = ids
            .into_iter()
            .map(|v| match v.map(str::trim) {
                Some(text) => text
                    .parse::<i64>()
                    .map_or(true, |id| wanted.contains(&id)),
                None => true,
            })
            .collect();

        Ok(df.filter(&mask)?)
    }
}

// ── Sinks ───────────────────────────────────────────────────────────────────

/// Upsert store keyed on (id_breeding, date, animals_age).
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: BTreeMap<(i64, NaiveDate, i64), ConversionRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored records in key order.
    pub fn records(&self) -> Vec<ConversionRecord> {
        self.rows.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ConversionSink for MemorySink {
    fn persist(&mut self, records: &[ConversionRecord]) -> Result<usize, ConversionError> {
        if records.is_empty() {
            info!("No conversion data to persist. Skipping upsert.");
            return Ok(0);
        }
        for record in records {
            self.rows.insert(record.key(), record.clone());
        }
        Ok(records.len())
    }
}

/// Writes the records to a CSV or Parquet file, chosen by extension.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConversionSink for FileSink {
    fn persist(&mut self, records: &[ConversionRecord]) -> Result<usize, ConversionError> {
        if records.is_empty() {
            info!(path = %self.path.display(), "No conversion data to persist. Skipping write.");
            return Ok(0);
        }

        let mut df = conversions_to_frame(records)?;
        let mut file = File::create(&self.path)?;
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => {
                ParquetWriter::new(&mut file).finish(&mut df)?;
            }
            _ => {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .finish(&mut df)?;
            }
        }

        info!(path = %self.path.display(), rows = df.height(), "Wrote conversion records");
        Ok(df.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, age: i64, value: f64) -> ConversionRecord {
        ConversionRecord {
            id_breeding: id,
            animals_age: age,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(age),
            animal_accumulated_conversion: Some(value),
            accumulated_standard_conversion: None,
            entity_accumulated_conversion: Some(value),
            calculation_formula_version: "0.1.0".to_string(),
        }
    }

    fn param(id: i64) -> BreedingInitParam {
        BreedingInitParam {
            entity_id: None,
            parent_entity_id: None,
            breeding_code: None,
            genetic_line: None,
            sex: "M".to_string(),
            id_breeding: id,
            id_stage: 1,
        }
    }

    #[test]
    fn breeding_identifiers_are_distinct_and_sorted() {
        let params = vec![param(5), param(2), param(5), param(9)];
        assert_eq!(derive_breeding_identifiers(&params), vec![2, 5, 9]);
        assert!(derive_breeding_identifiers(&[]).is_empty());
    }

    #[test]
    fn memory_sink_upserts_on_key() {
        let mut sink = MemorySink::new();
        sink.persist(&[record(1, 1, 1.0), record(1, 2, 2.0)]).unwrap();
        sink.persist(&[record(1, 2, 2.5)]).unwrap();

        let stored = sink.records();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].animal_accumulated_conversion, Some(2.5));
    }

    #[test]
    fn empty_persist_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        assert_eq!(MemorySink::new().persist(&[]).unwrap(), 0);
        assert_eq!(FileSink::new(&path).persist(&[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn file_sink_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let written = FileSink::new(&path)
            .persist(&[record(3, 4, 1.25)])
            .unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some(
                "id_breeding,animals_age,date,animal_accumulated_conversion,\
                 accumulated_standard_conversion,entity_accumulated_conversion,\
                 calculation_formula_version"
            )
        );
        assert_eq!(lines.next(), Some("3,4,2024-01-05,1.25,,1.25,0.1.0"));
    }

    #[test]
    fn csv_source_filters_requested_batches() {
        let dir = tempfile::tempdir().unwrap();
        let measurements = dir.path().join("measurements.csv");
        std::fs::write(
            &measurements,
            "id_breeding,animals_age\n1,0\n2,0\n3,0\n",
        )
        .unwrap();

        let source = CsvSource::new(dir.path().join("unused.csv"), &measurements);
        let df = source.weight_consumptions(&[1, 3]).unwrap();

        let ids: Vec<Option<&str>> = df
            .column("id_breeding")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some("1"), Some("3")]);
    }
}
