//! Console configuration.
//!
//! Loaded from `<config_dir>/instrument-console/config.toml` unless a path
//! is given explicitly. Every key is optional:
//!
//! ```toml
//! timeout_ms = 5000
//! history_file = "/home/lab/.instrument_console_history"
//! history_limit = 1000
//!
//! [discovery]
//! scan = true
//! resources = ["TCPIP0::192.168.1.50::inst0::INSTR", "TCPIP0::192.168.1.51::5025::SOCKET"]
//! probe = false
//!
//! [serial]
//! baud_rate = 9600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const APP_DIR: &str = "instrument-console";
const HISTORY_FILE: &str = ".instrument_console_history";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bound on every connect, write and read, in milliseconds.
    pub timeout_ms: u64,
    /// Where entered command lines are kept. Defaults to a file in the
    /// home directory.
    pub history_file: Option<PathBuf>,
    /// Number of history entries kept.
    pub history_limit: usize,
    pub discovery: Discovery,
    pub serial: Serial,
}

/// What `devicelist` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Discovery {
    /// Ask the local buses (serial ports, VISA) what is attached.
    pub scan: bool,
    /// Network resources to list as well; LXI instruments are not found by
    /// scanning.
    pub resources: Vec<String>,
    /// Only list configured resources that accept a connection.
    pub probe: bool,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            scan: true,
            resources: Vec::new(),
            probe: false,
        }
    }
}

/// Line settings for `ASRL` resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Serial {
    pub baud_rate: u32,
}

impl Default for Serial {
    fn default() -> Self {
        Self { baud_rate: 9600 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            history_file: None,
            history_limit: 1000,
            discovery: Discovery::default(),
            serial: Serial::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::parse(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(text).map_err(|e| e.to_string())?;
        if config.timeout_ms == 0 {
            return Err("timeout_ms must be greater than zero".into());
        }
        if config.serial.baud_rate == 0 {
            return Err("serial.baud_rate must be greater than zero".into());
        }
        Ok(config)
    }

    /// An explicit path must exist; the default location may be absent, in
    /// which case the defaults apply.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured history file, or the default one in the home
    /// directory. `None` when no home directory is known.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(HISTORY_FILE)))
    }
}
