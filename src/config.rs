//! Assistant configuration
//!
//! Defaults reproduce the stock behaviour. An optional JSON file named by
//! `SYMPTOM_CONFIG` overlays them, then individual env vars override that.

use crate::dialogue::DEFAULT_YES_NO_CUES;
use crate::sources::{FetchSettings, KeywordGroup, Source, SourceCatalog};
use crate::system_prompt::BASE_PROMPT;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything the assistant core needs to know at startup
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub catalog: SourceCatalog,
    pub routing: Vec<KeywordGroup>,
    pub fetch: FetchSettings,
    pub temperature: f32,
    pub yes_no_cues: Vec<String>,
    /// Upper bound on a whole completion call, on top of the client's own timeout
    pub completion_timeout: Duration,
    /// Base rules of the system preamble; the source list is appended
    pub system_prompt: String,
    pub model: String,
    /// Sessions untouched for this long are dropped
    pub session_idle_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            catalog: SourceCatalog::default(),
            routing: KeywordGroup::defaults(),
            fetch: FetchSettings::default(),
            temperature: DEFAULT_TEMPERATURE,
            yes_no_cues: DEFAULT_YES_NO_CUES.iter().map(ToString::to_string).collect(),
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            system_prompt: BASE_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }
}

/// On-disk overlay; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    sources: Option<Vec<Source>>,
    routing: Option<Vec<KeywordGroup>>,
    fetch_max_chars: Option<usize>,
    fetch_timeout_secs: Option<f64>,
    user_agent: Option<String>,
    temperature: Option<f32>,
    yes_no_cues: Option<Vec<String>>,
    completion_timeout_secs: Option<f64>,
    system_prompt: Option<String>,
    model: Option<String>,
    session_idle_timeout_secs: Option<f64>,
}

impl AssistantConfig {
    /// Load from `SYMPTOM_CONFIG` and the process environment
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var("SYMPTOM_CONFIG").ok();
        Self::load_from(path.as_deref().map(Path::new), |key| std::env::var(key).ok())
    }

    /// Load from an optional file plus an env lookup function
    pub fn load_from(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let file: ConfigFile = serde_json::from_str(&raw)?;
            config.apply_file(file)?;
            tracing::info!(path = %path.display(), "Loaded config file");
        }

        if let Some(v) = env("SYMPTOM_TEMPERATURE") {
            config.temperature = parse_env("SYMPTOM_TEMPERATURE", &v)?;
        }
        if let Some(v) = env("SYMPTOM_FETCH_TIMEOUT_SECS") {
            config.fetch.timeout = secs("SYMPTOM_FETCH_TIMEOUT_SECS", parse_env("SYMPTOM_FETCH_TIMEOUT_SECS", &v)?)?;
        }
        if let Some(v) = env("SYMPTOM_COMPLETION_TIMEOUT_SECS") {
            config.completion_timeout = secs(
                "SYMPTOM_COMPLETION_TIMEOUT_SECS",
                parse_env("SYMPTOM_COMPLETION_TIMEOUT_SECS", &v)?,
            )?;
        }
        if let Some(v) = env("SYMPTOM_SESSION_IDLE_SECS") {
            config.session_idle_timeout = secs(
                "SYMPTOM_SESSION_IDLE_SECS",
                parse_env("SYMPTOM_SESSION_IDLE_SECS", &v)?,
            )?;
        }
        if let Some(v) = env("SYMPTOM_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> ConfigResult<()> {
        if let Some(sources) = file.sources {
            self.catalog = SourceCatalog::new(sources)
                .ok_or_else(|| ConfigError::Invalid("source catalog is empty".to_string()))?;
        }
        if let Some(routing) = file.routing {
            // Normalise keyword case the same way the constructor does
            self.routing = routing
                .into_iter()
                .map(|g| KeywordGroup::new(g.keywords, g.source))
                .collect();
        }
        if let Some(max_chars) = file.fetch_max_chars {
            self.fetch.max_chars = max_chars;
        }
        if let Some(timeout) = file.fetch_timeout_secs {
            self.fetch.timeout = secs("fetch_timeout_secs", timeout)?;
        }
        if let Some(user_agent) = file.user_agent {
            self.fetch.user_agent = user_agent;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(cues) = file.yes_no_cues {
            self.yes_no_cues = cues;
        }
        if let Some(timeout) = file.completion_timeout_secs {
            self.completion_timeout = secs("completion_timeout_secs", timeout)?;
        }
        if let Some(prompt) = file.system_prompt {
            self.system_prompt = prompt;
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(idle) = file.session_idle_timeout_secs {
            self.session_idle_timeout = secs("session_idle_timeout_secs", idle)?;
        }
        Ok(())
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if self.fetch.max_chars == 0 {
            return Err(ConfigError::Invalid("fetch_max_chars must be positive".to_string()));
        }
        if self.fetch.timeout.is_zero()
            || self.completion_timeout.is_zero()
            || self.session_idle_timeout.is_zero()
        {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        if let Some(group) = self
            .routing
            .iter()
            .find(|g| g.keywords.iter().all(String::is_empty))
        {
            return Err(ConfigError::Invalid(format!(
                "routing group for {} has no keywords",
                group.source
            )));
        }
        for group in &self.routing {
            if self.catalog.url_for(&group.source).is_none() {
                tracing::warn!(source = %group.source, "Routing group names a source missing from the catalog; it will use the default");
            }
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}={value} is not a valid value")))
}

fn secs(key: &str, value: f64) -> ConfigResult<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| ConfigError::Invalid(format!("{key}={value} is not a valid duration")))
}
