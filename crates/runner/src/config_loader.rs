use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use artifacts_bot_core::agent::WorkerConfig;
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const CONFIG_FILE: &str = "artifacts.toml";
pub const CONFIG_DIR_ENV: &str = "ARTIFACTS_BOT_CONFIG_DIR";
pub const TOKEN_ENV: &str = "ARTIFACTS_TOKEN";

/// Locates and parses TOML config files.
///
/// Search order:
/// 1) `ARTIFACTS_BOT_CONFIG_DIR/<relative_path>`
/// 2) `./<relative_path>`
/// 3) `<repo_root>/config/<relative_path>`
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn parse_from_path<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse_from_string(&text)
            .with_context(|| format!("Invalid config at {}", path.display()))
    }

    pub fn parse_from_string<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
        toml::from_str(text).context("Failed to parse TOML")
    }

    /// First existing candidate in search order, if any.
    pub fn locate(relative_path: &str) -> anyhow::Result<Option<PathBuf>> {
        let rel = Path::new(relative_path);

        if let Some(root) = env::var_os(CONFIG_DIR_ENV) {
            let candidate = PathBuf::from(root).join(rel);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }

        if let Ok(cwd) = env::current_dir() {
            let candidate = cwd.join(rel);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }

        // This crate lives at <repo_root>/crates/runner.
        let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .nth(2)
            .ok_or_else(|| anyhow::anyhow!("CARGO_MANIFEST_DIR has insufficient ancestors"))?
            .join("config")
            .join(rel);
        Ok(candidate.is_file().then_some(candidate))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Usually left empty in the file and supplied through `ARTIFACTS_TOKEN`.
    pub token: String,
    /// Page size for catalog and bank listings (the server caps it at 100).
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.artifactsmmo.com".to_string(),
            token: String::new(),
            page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub api: ApiConfig,
    pub worker: WorkerConfig,
}

impl RunnerConfig {
    /// Reads `artifacts.toml` if one can be found, otherwise starts from defaults. The token
    /// from the environment wins over the file.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match ConfigLoader::locate(CONFIG_FILE)? {
            Some(path) => {
                tracing::info!(path = %path.display(), "config.loaded");
                ConfigLoader::parse_from_path::<RunnerConfig>(&path)?
            }
            None => {
                tracing::info!(file = CONFIG_FILE, "config.defaults");
                RunnerConfig::default()
            }
        };
        if let Some(token) = env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()) {
            cfg.api.token = token;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.api.token.trim().is_empty(),
            "missing API token: set {TOKEN_ENV} or [api].token"
        );
        anyhow::ensure!(
            (1..=100).contains(&self.api.page_size),
            "[api].page_size must be within 1..=100"
        );
        anyhow::ensure!(
            self.worker.viability.history_window > 0,
            "[worker.viability].history_window must be positive"
        );
        Ok(())
    }
}
