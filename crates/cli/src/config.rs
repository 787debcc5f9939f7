//! CLI configuration utilities

use anyhow::Result;
use medport_core::ClientConfig;
use std::path::PathBuf;

/// Values given on the command line, which win over file and environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Load the client configuration and apply command-line overrides
pub fn resolve(overrides: &Overrides) -> Result<ClientConfig> {
    let config = match &overrides.config_file {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };
    Ok(apply(config, overrides))
}

fn apply(mut config: ClientConfig, overrides: &Overrides) -> ClientConfig {
    if let Some(data_dir) = &overrides.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(base_url) = &overrides.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout) = overrides.timeout_secs {
        config.timeout_secs = timeout;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("medport.toml");
        std::fs::write(
            &path,
            "base_url = \"https://file.example.org/api\"\ntimeout_secs = 12\n",
        )
        .unwrap();

        let config = resolve(&Overrides {
            config_file: Some(path),
            data_dir: Some(dir.path().to_path_buf()),
            base_url: None,
            timeout_secs: Some(3),
        })
        .unwrap();

        assert_eq!(config.base_url, "https://file.example.org/api");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.data_dir, dir.path());
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = ClientConfig::default();
        assert_eq!(apply(config.clone(), &Overrides::default()), config);
    }
}
