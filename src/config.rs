use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::{DEFAULT_TAX_YEAR, TaxYear, default_min_saving};
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub defaults: CalcDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalcDefaults {
    pub tax_year: TaxYear,
    pub min_recommended_saving: Decimal,
}

impl Default for CalcDefaults {
    fn default() -> Self {
        Self {
            tax_year: DEFAULT_TAX_YEAR,
            min_recommended_saving: default_min_saving(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path_ref = path.as_ref();
    tracing::debug!("loading configuration from {:?}", path_ref);
    let contents = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.display().to_string(),
        source,
    })?;
    parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path_ref.display().to_string(),
        source,
    })
}

fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AppConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").expect("empty config is valid");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.defaults.tax_year, DEFAULT_TAX_YEAR);
        assert_eq!(config.defaults.min_recommended_saving, dec!(10));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 3000

            [defaults]
            tax_year = "2024/25"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.defaults.tax_year, TaxYear::new(2024));
        assert_eq!(config.defaults.min_recommended_saving, dec!(10));
    }

    #[test]
    fn minimum_saving_accepts_numbers() {
        let config = parse_config("[defaults]\nmin_recommended_saving = 25.5\n")
            .expect("valid config");
        assert_eq!(config.defaults.min_recommended_saving, dec!(25.5));
    }

    #[test]
    fn malformed_tax_year_is_a_parse_error() {
        assert!(parse_config("[defaults]\ntax_year = \"2024-25\"\n").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config("/nonexistent/loancalc.toml").expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/loancalc.toml"));
    }

    #[test]
    fn no_path_means_defaults() {
        let config = load_or_default(None).expect("defaults");
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
