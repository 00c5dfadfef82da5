use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default CDP endpoint of the agent-managed browser.
pub const DEFAULT_CDP_URL: &str = "http://127.0.0.1:18800";

/// Default address of the warm OCR server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8089";

/// Environment variable naming a YAML settings file.
pub const CONFIG_ENV: &str = "EOKA_OCR_CONFIG";

/// Runtime settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the warm OCR server.
    pub server_url: String,

    /// CDP endpoint of the running browser.
    pub cdp_url: String,

    /// OCR model location.
    pub models: ModelSettings,

    /// Bind address for `eoka-ocr-server`.
    pub server: ServerSettings,

    /// Client-side timeouts.
    pub timeouts: Timeouts,

    /// Viewport used when launching a fresh browser for a URL.
    pub viewport: Viewport,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            cdp_url: DEFAULT_CDP_URL.into(),
            models: ModelSettings::default(),
            server: ServerSettings::default(),
            timeouts: Timeouts::default(),
            viewport: Viewport::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, else from `$EOKA_OCR_CONFIG`, else defaults,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |_| {})
    }

    /// Like [`Settings::load`], with command-line overrides applied last.
    /// Validation runs once, after every override.
    pub fn load_with<F>(path: Option<&Path>, overrides: F) -> Result<Self>
    where
        F: FnOnce(&mut Self),
    {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut settings = match path {
            Some(p) => {
                let content = std::fs::read_to_string(&p)?;
                Self::parse_yaml(&content)?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a YAML string. Not validated; overrides may
    /// still replace any value.
    pub fn parse_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `OCR_SERVER_URL`, `EOKA_OCR_CDP_URL`, `EOKA_OCR_MODELS` and
    /// `EOKA_OCR_LANG` from the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OCR_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("EOKA_OCR_CDP_URL") {
            self.cdp_url = v;
        }
        if let Some(v) = lookup("EOKA_OCR_MODELS") {
            self.models.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("EOKA_OCR_LANG") {
            self.models.language = v;
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("server_url must not be empty".into()));
        }
        if self.cdp_url.trim().is_empty() {
            return Err(Error::Config("cdp_url must not be empty".into()));
        }
        if self.models.dir.as_os_str().is_empty() {
            return Err(Error::Config("models.dir must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".into()));
        }
        if self.timeouts.health_ms == 0 || self.timeouts.request_ms == 0 {
            return Err(Error::Config("timeouts must be non-zero".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::Config("viewport must be non-zero".into()));
        }
        Ok(())
    }
}

/// Where the PaddleOCR model files live and which language to recognize.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub language: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            language: "chinese".into(),
        }
    }
}

/// Bind address of the warm server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8089,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client-side timeouts in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Health probe timeout.
    pub health_ms: u64,
    /// OCR request timeout.
    pub request_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            health_ms: 1000,
            request_ms: 30_000,
        }
    }
}

impl Timeouts {
    pub fn health(&self) -> Duration {
        Duration::from_millis(self.health_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

/// Viewport dimensions.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
