//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services, so that
//! request handling never reads process-wide environment variables.

use crate::constants::DEFAULT_REST_ADDR;
use crate::directory::{WardDirectory, YamlWardDirectory};
use crate::error::{ConfigError, ConfigResult};
use crate::lifecycle::LifecycleService;
use crate::store::{FileRequestStore, MemoryRequestStore, RequestStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    rest_addr: String,
    data_dir: Option<PathBuf>,
    directory_file: Option<PathBuf>,
    api_key: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Arguments
    ///
    /// * `rest_addr` - listen address; blank falls back to [`DEFAULT_REST_ADDR`].
    /// * `data_dir` - directory for the file-backed store; `None` selects the in-memory store.
    /// * `directory_file` - YAML ward directory, rewritten on every edit; `None` yields an
    ///   empty directory whose edits live in memory only.
    /// * `api_key` - shared key every API caller must present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInput`] if:
    /// - `api_key` is blank,
    /// - `data_dir` is given but is not an existing directory,
    /// - `directory_file` is given but is not an existing file.
    pub fn new(
        rest_addr: Option<String>,
        data_dir: Option<PathBuf>,
        directory_file: Option<PathBuf>,
        api_key: String,
    ) -> ConfigResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidInput("API_KEY cannot be empty".into()));
        }

        if let Some(dir) = &data_dir {
            if !dir.is_dir() {
                return Err(ConfigError::InvalidInput(format!(
                    "data directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        if let Some(file) = &directory_file {
            if !file.is_file() {
                return Err(ConfigError::InvalidInput(format!(
                    "ward directory file does not exist: {}",
                    file.display()
                )));
            }
        }

        let rest_addr = rest_addr
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| DEFAULT_REST_ADDR.into());

        Ok(Self {
            rest_addr,
            data_dir,
            directory_file,
            api_key,
        })
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn directory_file(&self) -> Option<&Path> {
        self.directory_file.as_deref()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Opens the configured request store.
    pub fn open_store(&self) -> ConfigResult<Arc<dyn RequestStore>> {
        match &self.data_dir {
            Some(dir) => {
                tracing::info!("using file request store under {}", dir.display());
                Ok(Arc::new(FileRequestStore::open(dir)?))
            }
            None => {
                tracing::warn!("no data directory configured; requests are kept in memory only");
                Ok(Arc::new(MemoryRequestStore::new()))
            }
        }
    }

    /// Loads the configured ward directory.
    pub fn load_directory(&self) -> ConfigResult<Arc<dyn WardDirectory>> {
        match &self.directory_file {
            Some(file) => {
                let directory = YamlWardDirectory::load(file)?;
                tracing::info!(
                    wards = directory.wards().len(),
                    "loaded ward directory from {}",
                    file.display()
                );
                Ok(Arc::new(directory))
            }
            None => {
                tracing::warn!(
                    "no ward directory file configured; the directory starts empty and edits \
                     are kept in memory only"
                );
                Ok(Arc::new(YamlWardDirectory::empty()))
            }
        }
    }

    /// Builds the lifecycle service over the configured store and directory.
    pub fn lifecycle_service(&self) -> ConfigResult<LifecycleService> {
        Ok(LifecycleService::new(
            self.open_store()?,
            self.load_directory()?,
        ))
    }
}

/// Interprets an optional environment value as a path; blank means unset.
pub fn optional_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::SAMPLE;
    use tempfile::TempDir;

    #[test]
    fn rejects_blank_api_key() {
        assert!(matches!(
            CoreConfig::new(None, None, None, "  ".into()),
            Err(ConfigError::InvalidInput(_))
        ));
    }

    #[test]
    fn defaults_rest_addr() {
        let cfg = CoreConfig::new(Some(" ".into()), None, None, "k".into()).unwrap();
        assert_eq!(cfg.rest_addr(), DEFAULT_REST_ADDR);
    }

    #[test]
    fn rejects_missing_data_dir_and_directory_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(CoreConfig::new(None, Some(missing.clone()), None, "k".into()).is_err());
        assert!(CoreConfig::new(None, None, Some(missing), "k".into()).is_err());
    }

    #[test]
    fn builds_file_backed_service_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let directory_file = temp_dir.path().join("wards.yaml");
        std::fs::write(&directory_file, SAMPLE).unwrap();

        let cfg = CoreConfig::new(
            None,
            Some(temp_dir.path().to_path_buf()),
            Some(directory_file),
            "k".into(),
        )
        .unwrap();
        let svc = cfg.lifecycle_service().unwrap();
        assert_eq!(svc.directory().wards().len(), 2);
        assert!(temp_dir.path().join(crate::constants::REQUESTS_DIR_NAME).is_dir());
    }

    #[test]
    fn blank_env_path_is_unset() {
        assert_eq!(optional_path_from_env_value(None), None);
        assert_eq!(optional_path_from_env_value(Some("  ".into())), None);
        assert_eq!(
            optional_path_from_env_value(Some("/srv/wardlab".into())),
            Some(PathBuf::from("/srv/wardlab"))
        );
    }
}
