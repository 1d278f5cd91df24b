use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tars_providers::ProviderConfig;

pub const BASE_URL_ENV: &str = "TARS_LLM_BASE_URL";
pub const MODEL_ENV: &str = "TARS_LLM_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    /// Used for the rest of a run once the primary provider fails.
    #[serde(default)]
    pub fallback: Option<ProviderConfig>,
    #[serde(default = "default_workers_dir")]
    pub workers_dir: PathBuf,
    /// Root directory for file actions and working directory for commands.
    #[serde(default = "default_sandbox_dir")]
    pub sandbox_dir: PathBuf,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Progress goes to the log.
    #[default]
    Log,
    /// Progress is passed as the last argument to an external program.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

fn default_workers_dir() -> PathBuf {
    PathBuf::from("workers")
}

fn default_sandbox_dir() -> PathBuf {
    PathBuf::from("sandbox")
}

impl AppConfig {
    /// Load `tars.yaml`, apply environment overrides and validate.
    ///
    /// Relative directories are resolved against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.workers_dir = resolve(base, &config.workers_dir);
        config.sandbox_dir = resolve(base, &config.sandbox_dir);

        config.apply_overrides(std::env::var(BASE_URL_ENV).ok(), std::env::var(MODEL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Replace the primary provider's endpoint and model when set.
    pub fn apply_overrides(&mut self, base_url: Option<String>, model: Option<String>) {
        if let Some(base_url) = base_url.filter(|v| !v.trim().is_empty()) {
            self.provider.base_url = base_url;
        }
        if let Some(model) = model.filter(|v| !v.trim().is_empty()) {
            self.provider.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (label, provider) in std::iter::once(("provider", &self.provider))
            .chain(self.fallback.iter().map(|f| ("fallback", f)))
        {
            if provider.base_url.trim().is_empty() {
                bail!("{}.base_url cannot be empty", label);
            }
            if provider.model.trim().is_empty() {
                bail!("{}.model cannot be empty", label);
            }
        }
        if let NotifierConfig::Command { program, .. } = &self.notifier {
            if program.trim().is_empty() {
                bail!("notifier.program cannot be empty");
            }
        }
        Ok(())
    }

    pub fn worker_path(&self, name: &str) -> PathBuf {
        self.workers_dir.join(format!("{}.yaml", name))
    }
}

fn resolve(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}
