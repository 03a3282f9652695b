use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::{PipelineConfig, DEFAULT_FORMULA_VERSION};
use crate::model::conversions_to_frame;
use crate::normalize;
use crate::pipeline::ConversionPipeline;
use crate::ratio::NanPolicy;
use crate::reference::StandardReference;

/// Compute conversion records from extraction frames.
///
/// `standard` must use the canonical reference columns: animals_age, sex,
/// id_stage, animal_accumulated_standard_conversion,
/// animal_daily_standard_conversion.
#[pyfunction]
#[pyo3(signature = (init_params, measurements, standard, formula_version=None, nan_policy="clamp_to_zero"))]
fn compute_conversions(
    init_params: PyDataFrame,
    measurements: PyDataFrame,
    standard: PyDataFrame,
    formula_version: Option<String>,
    nan_policy: &str,
) -> PyResult<PyDataFrame> {
    let nan_policy: NanPolicy = nan_policy.parse()?;
    let config = PipelineConfig::new(
        formula_version.unwrap_or_else(|| DEFAULT_FORMULA_VERSION.to_string()),
    )
    .with_nan_policy(nan_policy);

    let reference = StandardReference::new(normalize::standard_reference(&standard.0)?);
    let report =
        ConversionPipeline::new(config).run_raw(&init_params.0, &measurements.0, &reference)?;

    Ok(PyDataFrame(conversions_to_frame(&report.records)?))
}

#[pymodule]
fn feed_conversion(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compute_conversions, m)?)?;
    m.add("DEFAULT_FORMULA_VERSION", DEFAULT_FORMULA_VERSION)?;
    Ok(())
}
