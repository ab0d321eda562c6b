//! Configuration management for the MBG nutrition monitor
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with MBG_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::nutrition::{EvaluationRules, FiberPolicy};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Food detection ML service
    pub ml: MlConfig,

    /// S3-compatible object storage (MinIO)
    pub storage: StorageConfig,

    /// Evaluation policy
    pub nutrition: NutritionConfig,

    /// First admin account
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MlConfig {
    /// Base URL of the detection service
    pub api_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Endpoint used when the caller does not pick one
    pub default_endpoint: String,

    /// Confidence threshold used when the caller does not pick one
    pub default_conf_threshold: f64,

    /// Foods kept per tray photo
    pub max_detected_foods: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Host (and optional port) of the object store
    pub endpoint: String,

    pub use_ssl: bool,

    pub bucket: String,

    pub region: String,

    pub access_key: String,

    pub secret_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NutritionConfig {
    /// `threshold_relative` or `fixed_floor`
    pub fiber_policy: String,

    /// Floor used by the `fixed_floor` policy, in grams
    pub fiber_floor_grams: f64,

    /// Whether fiber takes part in the overall verdict
    pub fiber_in_overall: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    pub admin_name: String,

    /// Empty disables bootstrapping
    pub admin_email: String,

    pub admin_password: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("MBG_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("ml.api_url", "http://localhost:5000")?
            .set_default("ml.timeout_secs", 60)?
            .set_default("ml.default_endpoint", "pipeline")?
            .set_default("ml.default_conf_threshold", 0.6)?
            .set_default("ml.max_detected_foods", 5)?
            .set_default("storage.endpoint", "localhost:9000")?
            .set_default("storage.use_ssl", false)?
            .set_default("storage.bucket", "mbkm-public-assets")?
            .set_default("storage.region", "us-east-1")?
            .set_default("storage.access_key", "")?
            .set_default("storage.secret_key", "")?
            .set_default("storage.timeout_secs", 30)?
            .set_default("nutrition.fiber_policy", "threshold_relative")?
            .set_default("nutrition.fiber_floor_grams", 3.0)?
            .set_default("nutrition.fiber_in_overall", false)?
            .set_default("bootstrap.admin_name", "Administrator")?
            .set_default("bootstrap.admin_email", "")?
            .set_default("bootstrap.admin_password", "")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MBG_ prefix)
            .add_source(
                Environment::with_prefix("MBG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl NutritionConfig {
    /// Build evaluation rules, rejecting unknown policy names
    pub fn rules(&self) -> Result<EvaluationRules, ConfigError> {
        let fiber_policy = FiberPolicy::from_config(&self.fiber_policy, self.fiber_floor_grams)
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(EvaluationRules {
            fiber_policy,
            fiber_in_overall: self.fiber_in_overall,
        })
    }
}

impl StorageConfig {
    pub fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrition_rules_from_config() {
        let config = NutritionConfig {
            fiber_policy: "fixed_floor".to_string(),
            fiber_floor_grams: 3.0,
            fiber_in_overall: true,
        };
        let rules = config.rules().unwrap();
        assert_eq!(rules.fiber_policy, FiberPolicy::FixedFloor { grams: 3.0 });
        assert!(rules.fiber_in_overall);
    }

    #[test]
    fn test_unknown_fiber_policy_is_rejected() {
        let config = NutritionConfig {
            fiber_policy: "lenient".to_string(),
            fiber_floor_grams: 3.0,
            fiber_in_overall: false,
        };
        assert!(config.rules().is_err());
    }
}
