//! Accumulated conversion ratios with division guards.
//!
//! Negative and infinite ratios become `0`. A not-a-number ratio (zero over
//! zero) is resolved by the run's `NanPolicy`. A null operand yields a null
//! ratio. Nothing here fails.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConversionError;
use crate::model::WeightConsumptionRecord;

const DECIMALS: i32 = 6;

/// What to do with a ratio that is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanPolicy {
    /// Report the ratio as `0`, like negative and infinite ratios.
    #[default]
    ClampToZero,
    /// Drop the measurement row from the output.
    ExcludeRow,
}

impl FromStr for NanPolicy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clamp_to_zero" => Ok(NanPolicy::ClampToZero),
            "exclude_row" => Ok(NanPolicy::ExcludeRow),
            _ => Err(ConversionError::Config(format!(
                "Invalid nan_policy: '{s}'. Must be 'clamp_to_zero' or 'exclude_row'"
            ))),
        }
    }
}

impl fmt::Display for NanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NanPolicy::ClampToZero => f.write_str("clamp_to_zero"),
            NanPolicy::ExcludeRow => f.write_str("exclude_row"),
        }
    }
}

/// Guarded result of one accumulated ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    /// An operand was null.
    Missing,
    /// Zero over zero.
    Undefined,
    /// Finite and non-negative.
    Value(f64),
}

impl Ratio {
    /// Divide, round to six decimals and clamp negative or infinite results.
    pub fn accumulated(numerator: Option<f64>, denominator: Option<f64>) -> Self {
        let (Some(n), Some(d)) = (numerator, denominator) else {
            return Ratio::Missing;
        };
        let value = round(n / d);
        if value.is_nan() {
            Ratio::Undefined
        } else if value.is_infinite() || value <= 0.0 {
            Ratio::Value(0.0)
        } else {
            Ratio::Value(value)
        }
    }

    fn resolve(self, policy: NanPolicy) -> Option<Option<f64>> {
        match (self, policy) {
            (Ratio::Missing, _) => Some(None),
            (Ratio::Value(v), _) => Some(Some(v)),
            (Ratio::Undefined, NanPolicy::ClampToZero) => Some(Some(0.0)),
            (Ratio::Undefined, NanPolicy::ExcludeRow) => None,
        }
    }
}

/// A measurement row with its derived ratios.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioRow {
    pub record: WeightConsumptionRecord,
    /// Population weight gained since the batch started.
    pub weight_delta: Option<f64>,
    pub animal_accumulated_conversion: Option<f64>,
    pub entity_accumulated_conversion: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Ratios {
    pub rows: Vec<RatioRow>,
    /// Rows dropped under `NanPolicy::ExcludeRow`.
    pub excluded: usize,
}

fn round(value: f64) -> f64 {
    let factor = 10f64.powi(DECIMALS);
    (value * factor).round() / factor
}

fn product(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? * b?)
}

/// `measured_weight * stock - initial_weight_avg * initial_total_quantity`
pub fn weight_delta(record: &WeightConsumptionRecord) -> Option<f64> {
    let current = product(record.measured_weight, record.stock.map(|s| s as f64))?;
    let initial = product(
        record.initial_weight_avg,
        record.initial_total_quantity.map(|q| q as f64),
    )?;
    Some(current - initial)
}

pub fn compute_ratios(records: Vec<WeightConsumptionRecord>, policy: NanPolicy) -> Ratios {
    let mut ratios = Ratios::default();

    for record in records {
        let weight_delta = weight_delta(&record);
        let weight_gain = record
            .measured_weight
            .zip(record.initial_weight_avg)
            .map(|(measured, initial)| measured - initial);

        let animal = Ratio::accumulated(record.animal_accumulated_consumption, weight_gain);
        let entity = Ratio::accumulated(record.entity_accumulated_consumption, weight_delta);

        match (animal.resolve(policy), entity.resolve(policy)) {
            (Some(animal), Some(entity)) => ratios.rows.push(RatioRow {
                record,
                weight_delta,
                animal_accumulated_conversion: animal,
                entity_accumulated_conversion: entity,
            }),
            _ => {
                debug!(
                    id_breeding = record.id_breeding,
                    animals_age = record.animals_age,
                    "Excluding row with undefined conversion ratio"
                );
                ratios.excluded += 1;
            }
        }
    }

    ratios
}
