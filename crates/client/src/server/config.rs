use anyhow::Context;
use directories::BaseDirs;
use llm_core::log::{self, LogLevel, Logger};
use serde::Deserialize;
use std::{env, fmt, fs, path::Path, path::PathBuf, sync::Arc};

pub const DEFAULT_HOST: &str = "http://localhost:9292";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub log_level: Option<i64>,
    pub proxy: Option<String>,
}

/// Connection and logging settings, read by [`LlmClient`](super::LlmClient) on every call.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub logger: Option<Arc<dyn Logger>>,
    pub log_level: LogLevel,
    pub proxy: Option<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("logger", &self.logger.as_ref().map(|_| "<logger>"))
            .field("log_level", &self.log_level)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            logger: None,
            log_level: LogLevel::default(),
            proxy: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Defaults, then `<config dir>/llm-client/config.toml` (keys `host`, `log_level`,
    /// `proxy`), then `LLM_CLIENT_HOST`, `LLM_CLIENT_LOG` and the proxy variables.
    /// A severity of 4 or more silences all output.
    pub fn from_env_and_file() -> anyhow::Result<Self> {
        let file = match Self::config_path() {
            Some(path) if path.exists() => Some(Self::read_file(&path)?),
            _ => None,
        };
        Ok(Self::resolve(file, |k| env::var(k).ok()))
    }

    pub fn read_file(path: &Path) -> anyhow::Result<ServerFileConfig> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file: {}", path.display()))?;
        let cfg = toml::from_str::<ServerFileConfig>(&text)
            .with_context(|| format!("parse config file: {}", path.display()))?;
        tracing::debug!(target: "llm_client", path = %path.display(), "loaded config file");
        Ok(cfg)
    }

    fn resolve(file: Option<ServerFileConfig>, var: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(file) = file {
            if let Some(h) = file.host {
                cfg.host = h;
            }
            if let Some(l) = file.log_level.and_then(LogLevel::from_severity) {
                cfg.log_level = l;
            }
            cfg.proxy = file.proxy;
        }

        if let Some(h) = var("LLM_CLIENT_HOST") {
            cfg.host = h;
        }
        if let Some(l) = var("LLM_CLIENT_LOG").as_deref().and_then(LogLevel::parse_severity) {
            cfg.log_level = l;
        }
        if let Some(p) = var("HTTPS_PROXY").or_else(|| var("HTTP_PROXY")) {
            cfg.proxy = Some(p);
        }
        cfg
    }

    fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".llm-client").join("config.toml")
        } else {
            base.config_dir().join("llm-client").join("config.toml")
        };
        Some(p)
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str, fields: &[(&str, Option<String>)]) {
        log::emit(self.logger.as_deref(), self.log_level, level, message, fields);
    }
}
