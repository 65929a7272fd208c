use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid income: {0}")]
    InvalidIncome(String),

    #[error("unknown loan plan: {0}")]
    UnknownPlan(String),

    #[error("unknown pay period: {0}")]
    UnknownPeriod(String),

    #[error("no rate table for tax year: {0}")]
    UnknownTaxYear(String),

    #[error("projection of {requested} years exceeds the {write_off_years}-year write-off period")]
    HorizonExceeded { requested: u32, write_off_years: u32 },
}

pub type Result<T> = std::result::Result<T, CalcError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
