use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{info, warn};

use crate::config::ReferenceConfig;
use crate::error::ConversionError;
use crate::model::StandardReferenceRow;
use crate::normalize;
use crate::schema::standard;

/// Supplies the standard-reference table for one genetic line.
pub trait ReferenceProvider {
    fn load(&self) -> Result<StandardReference, ConversionError>;
}

/// Standard conversions indexed by (age, sex, stage).
///
/// Keys are unique: on duplicates the first row wins, so a join never
/// multiplies measurement rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardReference {
    rows: Vec<StandardReferenceRow>,
    index: HashMap<(i64, String, i64), usize>,
}

impl StandardReference {
    pub fn new(rows: Vec<StandardReferenceRow>) -> Self {
        let mut reference = Self::default();
        for row in rows {
            let key = (row.animals_age, row.sex.clone(), row.id_stage);
            if reference.index.contains_key(&key) {
                warn!(
                    animals_age = row.animals_age,
                    sex = %row.sex,
                    id_stage = row.id_stage,
                    "Duplicate standard reference key; keeping the first row"
                );
                continue;
            }
            reference.index.insert(key, reference.rows.len());
            reference.rows.push(row);
        }
        reference
    }

    pub fn get(&self, animals_age: i64, sex: &str, id_stage: i64) -> Option<&StandardReferenceRow> {
        self.index
            .get(&(animals_age, sex.to_string(), id_stage))
            .map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReferenceProvider for StandardReference {
    fn load(&self) -> Result<StandardReference, ConversionError> {
        Ok(self.clone())
    }
}

/// Genetic catalogue stored as one CSV file per production stage.
pub struct CsvCatalogue {
    base_path: PathBuf,
    config: ReferenceConfig,
}

impl CsvCatalogue {
    /// Source paths are resolved relative to `base_path`.
    pub fn new(base_path: impl Into<PathBuf>, config: ReferenceConfig) -> Self {
        Self {
            base_path: base_path.into(),
            config,
        }
    }

    /// Rows of one catalogue file for the configured genetic line, in
    /// canonical column names with the source's stage stamped on.
    fn load_source(&self, path: &Path, id_stage: i64) -> Result<DataFrame, ConversionError> {
        let columns = &self.config.columns;
        let raw = normalize::read_csv_as_strings(&self.base_path.join(path))?;

        for name in [
            &columns.age,
            &columns.sex,
            &columns.genetic_line,
            &columns.accumulated,
            &columns.daily,
        ] {
            if raw.column(name).is_err() {
                return Err(ConversionError::MissingColumn {
                    table: "genetic_catalogue",
                    column: name.clone(),
                });
            }
        }

        let df = raw
            .lazy()
            .filter(col(columns.genetic_line.as_str()).eq(lit(self.config.genetic_line.as_str())))
            .select([
                col(columns.age.as_str()).alias(standard::ANIMALS_AGE),
                col(columns.sex.as_str()).alias(standard::SEX),
                col(columns.accumulated.as_str())
                    .alias(standard::ANIMAL_ACCUMULATED_STANDARD_CONVERSION),
                col(columns.daily.as_str()).alias(standard::ANIMAL_DAILY_STANDARD_CONVERSION),
            ])
            .with_columns([lit(id_stage).alias(standard::ID_STAGE)])
            .collect()?;

        Ok(df)
    }
}

impl ReferenceProvider for CsvCatalogue {
    fn load(&self) -> Result<StandardReference, ConversionError> {
        let mut rows = Vec::new();
        for source in &self.config.sources {
            let df = self.load_source(&source.path, source.id_stage)?;
            let before = rows.len();
            rows.extend(normalize::standard_reference(&df)?);
            info!(
                path = %source.path.display(),
                id_stage = source.id_stage,
                rows = rows.len() - before,
                "Loaded standard reference source"
            );
        }

        if rows.is_empty() {
            warn!(
                genetic_line = %self.config.genetic_line,
                "Standard reference is empty; standard conversions will be null"
            );
        }

        Ok(StandardReference::new(rows))
    }
}
