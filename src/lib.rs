//! Feed-conversion ratios for livestock breeding batches.
//!
//! Typed extraction rows go through stock imputation, guarded ratio
//! computation, a join against the genetic standard, and a projection into
//! records ready for upsert.

pub mod config;
pub mod error;
pub mod flow;
pub mod imputation;
pub mod join;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod projection;
pub mod ratio;
pub mod reference;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use config::{PipelineConfig, RunConfig, DEFAULT_FORMULA_VERSION};
pub use error::ConversionError;
pub use flow::{
    derive_breeding_identifiers, run_flow, ConversionSink, ConversionSource, CsvSource, FileSink,
    MemorySink,
};
pub use model::{
    conversions_to_frame, BreedingInitParam, ConversionRecord, StandardReferenceRow,
    WeightConsumptionRecord,
};
pub use pipeline::{compute_conversions, ConversionPipeline, ConversionReport};
pub use ratio::NanPolicy;
pub use reference::{CsvCatalogue, ReferenceProvider, StandardReference};
