use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Column '{0}' not found in the uploaded file")]
    ColumnNotFound(String),

    #[error("Column '{0}' has no value in the first row")]
    MissingMarkerValue(String),

    #[error("Row {row} has {found} fields but the header has {expected}")]
    RowTooLong {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for environment variable {name}: {value}")]
    Env { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, PreprocessError>;
