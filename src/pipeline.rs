//! The conversion pipeline: stock imputation → ratios → reference join →
//! projection, over one snapshot of already-extracted rows.

use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::ConversionError;
use crate::imputation::impute_stock;
use crate::join::join_reference;
use crate::model::{BreedingInitParam, ConversionRecord, WeightConsumptionRecord};
use crate::normalize;
use crate::projection::project;
use crate::ratio::compute_ratios;
use crate::reference::{ReferenceProvider, StandardReference};

/// Output of one pipeline run with its diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub records: Vec<ConversionRecord>,
    /// Batches excluded because no stock could be imputed.
    pub dropped_batches: Vec<i64>,
    /// Rows excluded by `NanPolicy::ExcludeRow`.
    pub excluded_rows: usize,
    /// One of the input tables was empty.
    pub no_data: bool,
}

pub struct ConversionPipeline {
    config: PipelineConfig,
}

impl ConversionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        init_params: &[BreedingInitParam],
        measurements: &[WeightConsumptionRecord],
        reference: &StandardReference,
    ) -> ConversionReport {
        if measurements.is_empty() {
            warn!("No conversion data found for the breeding list. Returning empty result.");
            return ConversionReport::no_data();
        }
        if init_params.is_empty() {
            warn!("No initial parameters found. Returning empty result.");
            return ConversionReport::no_data();
        }

        let imputation = impute_stock(measurements.to_vec());
        let dropped_batches = imputation.dropped_batches();

        let ratios = compute_ratios(imputation.records, self.config.nan_policy);
        let joined = join_reference(ratios.rows, init_params, reference);
        let records = project(joined, &self.config.formula_version);

        info!(
            input_rows = measurements.len(),
            output_rows = records.len(),
            dropped_batches = dropped_batches.len(),
            excluded_rows = ratios.excluded,
            formula_version = %self.config.formula_version,
            "Computed conversion records"
        );

        ConversionReport {
            records,
            dropped_batches,
            excluded_rows: ratios.excluded,
            no_data: false,
        }
    }

    /// Normalize raw extraction frames, load the reference and run.
    ///
    /// Fails only on structural input defects.
    pub fn run_raw(
        &self,
        raw_init_params: &DataFrame,
        raw_measurements: &DataFrame,
        reference: &dyn ReferenceProvider,
    ) -> Result<ConversionReport, ConversionError> {
        let init_params = normalize::init_params(raw_init_params)?;
        let measurements = normalize::weight_consumptions(raw_measurements)?;
        let reference = reference.load()?;
        Ok(self.run(&init_params, &measurements, &reference))
    }
}

impl ConversionReport {
    fn no_data() -> Self {
        Self {
            no_data: true,
            ..Self::default()
        }
    }
}

/// Compute conversion records for a snapshot of typed inputs.
pub fn compute_conversions(
    init_params: &[BreedingInitParam],
    measurements: &[WeightConsumptionRecord],
    reference: &StandardReference,
    config: &PipelineConfig,
) -> Vec<ConversionRecord> {
    ConversionPipeline::new(config.clone())
        .run(init_params, measurements, reference)
        .records
}
