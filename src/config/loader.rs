//! Configuration Loader
//!
//! Environment-aware loading: a base TOML file, an optional
//! `prober-config.<env>.toml` overlay next to it, then `PROBER__SECTION__KEY`
//! environment overrides, merged by the `config` crate.

use super::error::{ConfigResult, ConfigurationError};
use super::ProberConfig;
use crate::constants::{config_files, env_vars};
use crate::error::Result;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ProberConfig,
    environment: String,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load `config/prober-config.toml` (if present) with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        let default_path = Self::default_config_path();
        let path = default_path.exists().then_some(default_path);
        Self::load_with_env(path.as_deref(), &Self::detect_environment(), None)
    }

    /// Load an explicit file; a missing file is an error here
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Arc<ConfigManager>> {
        Self::load_with_env(Some(path.as_ref()), &Self::detect_environment(), None)
    }

    /// Load with an explicit environment name and, optionally, an explicit set of
    /// override variables used instead of the process environment. Tests use this
    /// to avoid touching global state.
    pub fn load_with_env(
        path: Option<&Path>,
        environment: &str,
        overrides: Option<config::Map<String, String>>,
    ) -> Result<Arc<ConfigManager>> {
        let config = Self::build(path, environment, overrides)?;

        config.validate()?;

        debug!(
            "Configuration loaded: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = %environment,
            config_path = ?path,
            targets = config.targets.len(),
            retry_delay_ms = config.scheduler.retry_delay_ms,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_path: path.map(Path::to_path_buf),
        }))
    }

    fn build(
        path: Option<&Path>,
        environment: &str,
        overrides: Option<config::Map<String, String>>,
    ) -> ConfigResult<ProberConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigurationError::config_file_not_found(vec![
                    path.to_path_buf()
                ]));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));

            let overlay = Self::overlay_path(path, environment);
            debug!(
                "Looking for environment overlay at {}",
                overlay.display()
            );
            builder = builder.add_source(
                File::from(overlay.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(env_vars::OVERRIDE_PREFIX)
                .prefix_separator(env_vars::OVERRIDE_SEPARATOR)
                .separator(env_vars::OVERRIDE_SEPARATOR)
                .try_parsing(true)
                .source(overrides),
        );

        let file_label = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string());

        let merged = builder
            .build()
            .map_err(|e| ConfigurationError::invalid_toml(file_label.clone(), e))?;

        merged
            .try_deserialize::<ProberConfig>()
            .map_err(|e| ConfigurationError::validation_error(format!("{file_label}: {e}")))
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// `PROBER_ENV`, then `APP_ENV`, then `development`
    pub fn detect_environment() -> String {
        env::var(env_vars::ENVIRONMENT)
            .or_else(|_| env::var(env_vars::APP_ENVIRONMENT))
            .unwrap_or_else(|_| env_vars::DEFAULT_ENVIRONMENT.to_string())
            .to_lowercase()
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from(config_files::DEFAULT_CONFIG_DIR).join(format!(
            "{}.{}",
            config_files::BASE_CONFIG_NAME,
            config_files::CONFIG_EXTENSION
        ))
    }

    /// `dir/prober-config.toml` -> `dir/prober-config.<env>.toml`
    fn overlay_path(base: &Path, environment: &str) -> PathBuf {
        let stem = base
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(config_files::BASE_CONFIG_NAME);
        base.with_file_name(format!(
            "{stem}.{environment}.{}",
            config_files::CONFIG_EXTENSION
        ))
    }
}
