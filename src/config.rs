use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fs::operations::write_atomically;

pub const CONFIG_FILE: &str = "config.json";

/// Preferences kept in `config.json` inside the application directory. Missing fields take
/// their default, so older files keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Length of the window reports cover when no range is given.
    pub report_days: u32,
    /// PNG or JPEG drawn under exported PDFs when `--background` isn't passed.
    pub background_image: Option<PathBuf>,
    /// TrueType font for chart images. System fonts are tried when unset.
    pub chart_font: Option<PathBuf>,
    pub notification_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            report_days: 7,
            background_image: None,
            chart_font: None,
            notification_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }

    /// Reads the configuration from `dir`, writing the defaults on first run. A file that
    /// can't be read or parsed is left untouched and the defaults are used instead.
    pub fn load_or_create(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => {
                    debug!("Loaded config {config:?}");
                    Ok(config.sanitized())
                }
                Err(e) => {
                    warn!("Ignoring malformed config {path:?}: {e}");
                    Ok(Self::default())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Self::default();
                config.save(&path)?;
                info!("Created default config at {path:?}");
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to read config {path:?}: {e}");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_atomically(path, content.as_bytes())?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.report_days == 0 {
            warn!("report_days must be positive, using the default");
            self.report_days = Self::default().report_days;
        }
        self
    }
}
