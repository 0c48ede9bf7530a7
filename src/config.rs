use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub catalogs: Vec<CatalogConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_sweep_on_start")]
    pub sweep_on_start: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_on_start: default_sweep_on_start(),
            user_agent: default_user_agent(),
        }
    }
}

impl HarvestConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_sweep_interval_secs() -> u64 {
    86_400
}
fn default_sweep_on_start() -> bool {
    true
}
fn default_user_agent() -> String {
    format!("api-catalog-harvester/{}", env!("CARGO_PKG_VERSION"))
}

/// A catalog seeded into the store at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub owner_id: String,
    pub harvest_source_uri: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.harvest.fetch_timeout_secs == 0 {
        anyhow::bail!("harvest.fetch_timeout_secs must be > 0");
    }
    if config.harvest.connect_timeout_secs == 0 {
        anyhow::bail!("harvest.connect_timeout_secs must be > 0");
    }
    if config.harvest.sweep_interval_secs == 0 {
        anyhow::bail!("harvest.sweep_interval_secs must be > 0");
    }

    let mut seen = std::collections::HashSet::new();
    for catalog in &config.catalogs {
        if catalog.owner_id.trim().is_empty() {
            anyhow::bail!("catalogs.owner_id must not be empty");
        }
        if !seen.insert(catalog.owner_id.as_str()) {
            anyhow::bail!("Duplicate catalog for owner '{}'", catalog.owner_id);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_apply() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.harvest.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.harvest.sweep_interval(), Duration::from_secs(86_400));
        assert!(config.harvest.sweep_on_start);
        assert!(config.catalogs.is_empty());
    }

    #[test]
    fn test_catalogs_and_overrides() {
        let file = write_config(
            r#"
            [harvest]
            fetch_timeout_secs = 5
            sweep_on_start = false

            [[catalogs]]
            owner_id = "910244132"
            harvest_source_uri = "https://example.org/catalog.ttl"
            "#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.harvest.fetch_timeout_secs, 5);
        assert_eq!(config.harvest.connect_timeout_secs, 10);
        assert!(!config.harvest.sweep_on_start);
        assert_eq!(config.catalogs.len(), 1);
        assert_eq!(config.catalogs[0].owner_id, "910244132");
    }

    #[test]
    fn test_validation_errors() {
        let zero = write_config("[harvest]\nfetch_timeout_secs = 0\n");
        assert!(load_config(zero.path()).is_err());

        let dup = write_config(
            r#"
            [[catalogs]]
            owner_id = "a"
            harvest_source_uri = "http://a/1.ttl"
            [[catalogs]]
            owner_id = "a"
            harvest_source_uri = "http://a/2.ttl"
            "#,
        );
        let err = load_config(dup.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate catalog"));

        assert!(load_config(Path::new("/no/such/config.toml")).is_err());
    }
}
