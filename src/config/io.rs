use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str;
use directories_next::ProjectDirs;
use fd_lock::RwLock;
use log::debug;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::config::types::Config;
use crate::error::ConfigError;

// BLEPRINT_CONFIG overrides the standard location, which is useful for tests
// and for running several printer setups side by side.
fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::var_os("BLEPRINT_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    ProjectDirs::from("", "", "bleprint")
        .map(|dirs| dirs.config_dir().join("bleprint.json"))
        .ok_or(ConfigError::NoConfigPath)
}

/// Owns the config file handle. Reads are lock-free; writes take an exclusive
/// file lock so two concurrent invocations cannot interleave their output.
pub struct ConfigStore {
    file: std::fs::File,
    lock: RwLock<std::fs::File>,
}

impl ConfigStore {
    pub fn open() -> Result<Self, ConfigError> {
        let path = get_config_path()?;
        debug!("Using config file {}", path.to_string_lossy());

        let directory = path.parent().ok_or(ConfigError::NoConfigPath)?;
        std::fs::create_dir_all(directory)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .append(false)
            .create(true)
            .open(path)?;
        let lock = RwLock::new(file.try_clone()?);

        Ok(ConfigStore { file, lock })
    }

    pub async fn load(&self) -> Result<Config, ConfigError> {
        let mut file = File::from_std(self.file.try_clone()?);
        file.rewind().await?;

        let mut content = vec![];
        file.read_to_end(&mut content).await?;

        // A freshly created config file is empty
        if content.is_empty() {
            return Ok(Config::default());
        }

        let content = str::from_utf8(&content)?;
        Ok(serde_json::from_str(content)?)
    }

    pub async fn save(&mut self, config: &Config) -> Result<(), ConfigError> {
        let guard = self
            .lock
            .try_write()
            .map_err(|source| ConfigError::CanNotLock { source })?;

        let mut file = File::from_std(guard.try_clone()?);
        let content = serde_json::to_string_pretty(config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // One test covers the whole lifecycle: BLEPRINT_CONFIG is process-wide
    // state, so splitting this up would let parallel tests race on it.
    #[tokio::test]
    async fn empty_file_defaults_then_roundtrips() {
        let path = env::temp_dir().join(format!("bleprint-config-test-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        env::set_var("BLEPRINT_CONFIG", &path);

        let mut store = ConfigStore::open().unwrap();
        assert_eq!(store.load().await.unwrap(), Config::default());

        let config = Config {
            scan_window: 3_000,
            segment_delay: 10,
            last_printer: Some("printer-1".to_string()),
        };
        store.save(&config).await.unwrap();
        assert_eq!(store.load().await.unwrap(), config);

        // A shorter config must fully replace the longer previous content
        let shorter = Config::default();
        store.save(&shorter).await.unwrap();
        assert_eq!(store.load().await.unwrap(), shorter);

        let _ = std::fs::remove_file(&path);
    }
}
