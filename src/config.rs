use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix for environment overrides, e.g. `HOUSE_PRICE__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "HOUSE_PRICE";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub preprocessing: PreprocessingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub artifact_dir: PathBuf,
    pub random_forest_file: String,
    pub xgboost_file: String,
    pub linear_regression_file: String,
    pub scaler_file: String,
    pub feature_names_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub target_column: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("models"),
            random_forest_file: "random_forest_model.json".to_string(),
            xgboost_file: "xgboost_model.json".to_string(),
            linear_regression_file: "linear_regression_model.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            feature_names_file: "feature_names.json".to_string(),
        }
    }
}

impl ModelsConfig {
    pub fn artifact_path(&self, file: &str) -> PathBuf {
        self.artifact_dir.join(file)
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/data.csv"),
            output_path: PathBuf::from("data/clean_data.csv"),
            target_column: "price".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Layers built-in defaults, the optional TOML file at `path`, then environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("does-not-exist.toml").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.preprocessing.target_column, "price");
        assert_eq!(config.models.artifact_dir, PathBuf::from("models"));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 9100\n\n[models]\nartifact_dir = \"/srv/models\"").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.models.artifact_path("scaler.json"),
            PathBuf::from("/srv/models/scaler.json")
        );
    }
}
