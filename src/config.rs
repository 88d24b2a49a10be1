//! Configuration management for cloud-importer
//!
//! Settings come from environment variables with defaults, loaded through
//! `ImporterConfig::default()` and checked with [`ImporterConfig::validate`].
//!
//! # Environment Variables
//!
//! ## Azure
//! - `ARM_SUBSCRIPTION_ID`: subscription owning every resource - required for any ARM call
//! - `ARM_LOCATION_NAME`: location for new resources - default: "westeurope"
//! - `AZURE_ACCESS_TOKEN`: pre-acquired bearer token; the Azure CLI is used otherwise
//!
//! ## cloud-importer
//! - `CLOUD_IMPORTER_ARM_ENDPOINT`: ARM base URL - default: "https://management.azure.com"
//! - `CLOUD_IMPORTER_REQUEST_TIMEOUT`: HTTP timeout in seconds - default: "60"
//! - `CLOUD_IMPORTER_POLL_INTERVAL`: seconds between operation polls - default: "10"
//! - `CLOUD_IMPORTER_WORK_DIR`: scratch directory for extracted bundles - default: temp dir + "cloud-importer"
//! - `CLOUD_IMPORTER_BUNDLE_EXTRACT_CMD`: bundle extraction command template
//! - `CLOUD_IMPORTER_LOG_LEVEL`: logging level - default: "info"
//! - `CLOUD_IMPORTER_LOG_JSON`: JSON log output (true|false) - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use cloud_importer::ImporterConfig;
//!
//! let config = ImporterConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::azure::arm::ArmSettings;
use crate::azure::credentials::{EnvironmentCredentialResolver, ENV_AZURE_SUBSCRIPTION_ID};
use crate::importer::bundle::{BundleExtraction, DEFAULT_EXTRACT_TEMPLATE};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const ENV_AZURE_LOCATION: &str = "ARM_LOCATION_NAME";

const DEFAULT_LOCATION: &str = "westeurope";
const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Azure subscription id
    pub subscription_id: Option<String>,

    /// Location for resource groups; other resources inherit it
    pub location: String,

    /// Azure Resource Manager base URL
    pub arm_endpoint: String,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Long-running operation poll interval in seconds
    pub poll_interval_secs: u64,

    /// Scratch directory for bundle extraction
    pub work_dir: PathBuf,

    /// Bundle extraction command template
    pub bundle_extract_cmd: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        let subscription_id = env::var(ENV_AZURE_SUBSCRIPTION_ID)
            .ok()
            .filter(|s| !s.trim().is_empty());

        let location = env::var(ENV_AZURE_LOCATION)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let arm_endpoint = env::var("CLOUD_IMPORTER_ARM_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ARM_ENDPOINT.to_string());

        let request_timeout_secs = env::var("CLOUD_IMPORTER_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let poll_interval_secs = env::var("CLOUD_IMPORTER_POLL_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let work_dir = env::var("CLOUD_IMPORTER_WORK_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("cloud-importer"));

        let bundle_extract_cmd = env::var("CLOUD_IMPORTER_BUNDLE_EXTRACT_CMD")
            .unwrap_or_else(|_| DEFAULT_EXTRACT_TEMPLATE.to_string());

        let log_level = env::var("CLOUD_IMPORTER_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env::var("CLOUD_IMPORTER_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            subscription_id,
            location,
            arm_endpoint,
            request_timeout_secs,
            poll_interval_secs,
            work_dir,
            bundle_extract_cmd,
            log_level,
            log_json,
        }
    }
}

impl ImporterConfig {
    /// Validates the configuration
    ///
    /// The subscription id is not checked here; credential resolution
    /// reports it when an ARM call actually needs it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.location.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Location must not be empty".to_string(),
            ));
        }

        let endpoint = Url::parse(&self.arm_endpoint).map_err(|e| ConfigError::ParseError {
            field: "CLOUD_IMPORTER_ARM_ENDPOINT".to_string(),
            error: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationFailed(format!(
                "ARM endpoint must be http or https, got {}",
                endpoint.scheme()
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 || self.poll_interval_secs > 300 {
            return Err(ConfigError::ValidationFailed(
                "Poll interval must be between 1 and 300 seconds".to_string(),
            ));
        }

        if !self.bundle_extract_cmd.contains("{bundle_uri}") {
            return Err(ConfigError::ValidationFailed(
                "Bundle extraction command must reference {bundle_uri}".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn arm_settings(&self) -> ArmSettings {
        ArmSettings::from(self)
    }

    pub fn credential_resolver(&self) -> EnvironmentCredentialResolver {
        EnvironmentCredentialResolver::new(self.subscription_id.clone())
    }

    /// Extraction settings for one run, in its own directory under `work_dir`
    pub fn bundle_extraction(&self) -> BundleExtraction {
        BundleExtraction::for_run(self.bundle_extract_cmd.clone(), &self.work_dir)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(
            "subscription_id".to_string(),
            self.subscription_id
                .clone()
                .unwrap_or_else(|| "(unset)".to_string()),
        );
        map.insert("location".to_string(), self.location.clone());
        map.insert("arm_endpoint".to_string(), self.arm_endpoint.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "poll_interval_secs".to_string(),
            self.poll_interval_secs.to_string(),
        );
        map.insert("work_dir".to_string(), self.work_dir.display().to_string());
        map.insert(
            "bundle_extract_cmd".to_string(),
            self.bundle_extract_cmd.clone(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("log_json".to_string(), self.log_json.to_string());

        map
    }
}

impl fmt::Display for ImporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cloud-importer Configuration:")?;
        writeln!(
            f,
            "  Subscription: {}",
            self.subscription_id.as_deref().unwrap_or("(unset)")
        )?;
        writeln!(f, "  Location: {}", self.location)?;
        writeln!(f, "  ARM Endpoint: {}", self.arm_endpoint)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Poll Interval: {}s", self.poll_interval_secs)?;
        writeln!(f, "  Work Dir: {}", self.work_dir.display())?;
        writeln!(f, "  Bundle Extract: {}", self.bundle_extract_cmd)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn valid_config() -> ImporterConfig {
        ImporterConfig {
            subscription_id: Some("sub".to_string()),
            location: "westeurope".to_string(),
            arm_endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            request_timeout_secs: 60,
            poll_interval_secs: 10,
            work_dir: PathBuf::from("/tmp/cloud-importer"),
            bundle_extract_cmd: DEFAULT_EXTRACT_TEMPLATE.to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset(ENV_AZURE_SUBSCRIPTION_ID),
            EnvGuard::unset(ENV_AZURE_LOCATION),
            EnvGuard::unset("CLOUD_IMPORTER_ARM_ENDPOINT"),
            EnvGuard::unset("CLOUD_IMPORTER_REQUEST_TIMEOUT"),
            EnvGuard::unset("CLOUD_IMPORTER_POLL_INTERVAL"),
            EnvGuard::unset("CLOUD_IMPORTER_LOG_LEVEL"),
            EnvGuard::unset("CLOUD_IMPORTER_BUNDLE_EXTRACT_CMD"),
        ];

        let config = ImporterConfig::default();

        assert_eq!(config.subscription_id, None);
        assert_eq!(config.location, DEFAULT_LOCATION);
        assert_eq!(config.arm_endpoint, DEFAULT_ARM_ENDPOINT);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.bundle_extract_cmd, DEFAULT_EXTRACT_TEMPLATE);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set(ENV_AZURE_SUBSCRIPTION_ID, "1111-2222"),
            EnvGuard::set(ENV_AZURE_LOCATION, "eastus2"),
            EnvGuard::set("CLOUD_IMPORTER_ARM_ENDPOINT", "http://localhost:8080"),
            EnvGuard::set("CLOUD_IMPORTER_REQUEST_TIMEOUT", "120"),
            EnvGuard::set("CLOUD_IMPORTER_POLL_INTERVAL", "3"),
            EnvGuard::set("CLOUD_IMPORTER_WORK_DIR", "/var/tmp/ci"),
            EnvGuard::set("CLOUD_IMPORTER_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("CLOUD_IMPORTER_LOG_JSON", "true"),
        ];

        let config = ImporterConfig::default();

        assert_eq!(config.subscription_id.as_deref(), Some("1111-2222"));
        assert_eq!(config.location, "eastus2");
        assert_eq!(config.arm_endpoint, "http://localhost:8080");
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/ci"));
        assert_eq!(config.log_level, "debug");
        assert!(config.log_json);

        let settings = config.arm_settings();
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.poll_interval, Duration::from_secs(3));
    }

    #[test]
    #[serial]
    fn test_blank_subscription_is_unset() {
        let _guard = EnvGuard::set(ENV_AZURE_SUBSCRIPTION_ID, "  ");
        assert_eq!(ImporterConfig::default().subscription_id, None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = valid_config();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.poll_interval_secs = 301;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.arm_endpoint = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ParseError { .. })));

        let mut config = valid_config();
        config.arm_endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.bundle_extract_cmd = "extract-everything".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bundle_extraction_uses_work_dir() {
        let config = valid_config();
        let extraction = config.bundle_extraction();
        let dir = extraction.output_dir();

        assert_eq!(dir.parent(), Some(config.work_dir.as_path()));
        assert!(dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("bundle-")));
        assert_eq!(extraction.extracted_vhd(), dir.join("disk.vhd"));
        assert_ne!(config.bundle_extraction().output_dir(), dir);
    }

    #[test]
    fn test_config_display() {
        let config = valid_config();
        let display = format!("{}", config);
        assert!(display.contains("cloud-importer Configuration:"));
        assert!(display.contains("Location: westeurope"));

        let map = config.to_display_map();
        assert_eq!(map.get("subscription_id").map(String::as_str), Some("sub"));
        assert_eq!(map.get("poll_interval_secs").map(String::as_str), Some("10"));
    }
}
