use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Schema mismatch in {table}.{column} at row {row}: '{value}' is not a valid {expected}")]
    SchemaMismatch {
        table: &'static str,
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Missing column: {table}.{column}")]
    MissingColumn { table: &'static str, column: String },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConversionError {
    pub(crate) fn mismatch(
        table: &'static str,
        column: &str,
        row: usize,
        value: &str,
        expected: &'static str,
    ) -> Self {
        ConversionError::SchemaMismatch {
            table,
            column: column.to_string(),
            row,
            value: value.to_string(),
            expected,
        }
    }
}

#[cfg(feature = "python")]
impl From<ConversionError> for pyo3::PyErr {
    fn from(err: ConversionError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}
