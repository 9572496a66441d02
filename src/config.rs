use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::export::{ExportConfig, DEFAULT_BATCH_SIZE};
use crate::meta::MetaConfig;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_database: Option<String>,
    /// Export batch size unless the export section sets its own
    pub batch_size: usize,
    pub meta: MetaConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: "password".to_string(),
            neo4j_database: None,
            batch_size: DEFAULT_BATCH_SIZE,
            meta: MetaConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config_path`, or `config.json` when it exists. Without either
    /// the defaults apply.
    pub fn load_from_path(config_path: Option<&str>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e)
        })?;
        let is_toml = path_ref
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config: Config = if is_toml {
            toml::from_str(&content).map_err(|e| {
                anyhow::anyhow!("Failed to parse config file '{}': {}", path_ref.display(), e)
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                anyhow::anyhow!("Failed to parse config file '{}': {}", path_ref.display(), e)
            })?
        };

        config.validate()?;
        tracing::debug!(path = %path_ref.display(), "configuration loaded");

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.neo4j_uri.is_empty() {
            return Err(anyhow::anyhow!("Neo4j URI cannot be empty"));
        }

        if self.neo4j_user.is_empty() {
            return Err(anyhow::anyhow!("Neo4j user cannot be empty"));
        }

        if self.neo4j_password.is_empty() {
            return Err(anyhow::anyhow!("Neo4j password cannot be empty"));
        }

        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("Batch size must be greater than 0"));
        }

        self.meta.validate()?;
        self.export.validate()?;

        Ok(())
    }

    /// Export options from the file, with the top-level batch size applied
    /// when the export section keeps the default.
    pub fn export_defaults(&self) -> ExportConfig {
        let mut export = self.export.clone();
        if export.batch_size == DEFAULT_BATCH_SIZE {
            export.batch_size = self.batch_size;
        }
        export
    }
}
