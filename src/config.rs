use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RippleConfig {
    pub api_port: u16,
    pub paths: RipplePaths,
    pub media: MediaConfig,
    pub events: EventsConfig,
}

impl RippleConfig {
    pub fn from_env() -> Result<Self> {
        let paths = RipplePaths::discover()?;
        let api_port = env::var("RIPPLE_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let media = MediaConfig::from_env();
        let events = EventsConfig::from_env();
        Ok(Self {
            api_port,
            paths,
            media,
            events,
        })
    }

    pub fn new(api_port: u16, paths: RipplePaths) -> Self {
        Self {
            api_port,
            paths,
            media: MediaConfig::default(),
            events: EventsConfig::default(),
        }
    }

    pub fn with_media(api_port: u16, paths: RipplePaths, media: MediaConfig) -> Self {
        Self {
            api_port,
            paths,
            media,
            events: EventsConfig::default(),
        }
    }
}

/// Connection details for the external image service. Uploads go to
/// `upload_url` as multipart posts authenticated with `api_key`; transformed
/// variants are plain URL rewrites, so no endpoint is needed for them.
#[derive(Debug, Clone, Default)]
pub struct MediaConfig {
    pub upload_url: Option<String>,
    pub api_key: Option<String>,
}

impl MediaConfig {
    pub fn from_env() -> Self {
        let upload_url = env::var("RIPPLE_MEDIA_UPLOAD_URL").ok().and_then(non_empty);
        let api_key = env::var("RIPPLE_MEDIA_KEY").ok().and_then(non_empty);
        Self {
            upload_url,
            api_key,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventsConfig {
    /// Optional webhook that receives every emitted event as `{name, data}`.
    /// Unset means events are only logged.
    pub sink_url: Option<String>,
}

impl EventsConfig {
    pub fn from_env() -> Self {
        let sink_url = env::var("RIPPLE_EVENT_SINK_URL").ok().and_then(non_empty);
        Self { sink_url }
    }
}

fn non_empty(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RipplePaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl RipplePaths {
    pub fn discover() -> Result<Self> {
        if let Ok(base) = env::var("RIPPLE_DATA_DIR") {
            return Self::from_base_dir(base);
        }
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("ripple.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.logs_dir)?;
        Ok(())
    }
}
