use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::metrics::BucketConfig;

/// Environment variable naming the config file; defaults to `./config.yaml`.
pub const CONFIG_PATH_ENV: &str = "STORAGE_METRICS_CONFIG";

/// Prefix of environment variables overriding config values,
/// e.g. `STORAGE_METRICS_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "STORAGE_METRICS_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    /// Address the metrics exporter listens on.
    pub bind_address: String,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub buckets: BucketConfig,
}

/// Builds the figment used by [`load_config`]: the YAML file, then env overrides.
pub fn config_figment() -> Figment {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "./config.yaml".to_string());
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
}

/// Extracts a versioned configuration from `figment`.
pub fn extract_config(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from the YAML file and environment, exiting the process on failure.
pub fn load_config() -> ConfigV1 {
    match extract_config(config_figment()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// The JSON schema of the versioned configuration, pretty-printed.
pub fn schema_json() -> Result<String, serde_json::Error> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    println!("{}", schema_json()?);
    Ok(())
}
