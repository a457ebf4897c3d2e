//! Secure on-disk configuration storage
//!
//! The secret bundle is written as JSON with owner-only permissions so API
//! keys never end up world-readable. A missing file is not an error; it just
//! means the gateway has not been configured yet.

use std::path::{Path, PathBuf};

use crate::{Config, Error, Result};

/// Return the default config file path:
/// `~/.config/interview-gateway/config.json`
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".interview-gateway/config.json"),
        |d| d.config_dir().join("interview-gateway").join("config.json"),
    )
}

/// Load the configuration file
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<Option<Config>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Config(format!(
                "failed to read config file {}: {e}",
                path.display()
            )))
        }
    };

    let config: Config = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))?;

    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

/// Save the configuration file with owner-only permissions
///
/// # Errors
///
/// Returns error if the directory cannot be created or the file written.
pub fn save(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %path.display(), "saved config file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceConfig;

    fn sample() -> Config {
        Config {
            gemini_api_key: "gemini-key".to_string(),
            database_url: "/tmp/test.db".to_string(),
            eleven_labs_api_key: "eleven-key".to_string(),
            voice: VoiceConfig::default(),
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        save(&path, &sample()).unwrap();
        let loaded = load(&path).unwrap().expect("config should exist");
        assert_eq!(loaded.gemini_api_key, "gemini-key");
        assert_eq!(loaded.database_url, "/tmp/test.db");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save(&path, &sample()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load(&path).is_err());
    }
}
