mod detector;
mod prompt;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigurationError;

pub use detector::{Detector, Role};
pub use prompt::{Prompt, TerminalPrompt};

pub const SECTION: &str = "vimdebug";
pub const DEFAULT_PORT: u16 = 6666;
pub const DEFAULT_SERVER_NAME: &str = "VIM";

const KEY_CLIENT: &str = "vim_client_script";
const KEY_SERVER: &str = "vim_server_script";
const KEY_LEGACY_SCRIPT: &str = "script";
const KEY_SERVER_NAME: &str = "server_name";
const KEY_PORT: &str = "port";

#[cfg(target_os = "macos")]
const PLATFORM_SCRIPT: &str = "mvim";
#[cfg(windows)]
const PLATFORM_SCRIPT: &str = "vim.exe";
#[cfg(not(any(target_os = "macos", windows)))]
const PLATFORM_SCRIPT: &str = "gvim";

/// Editor scripts, server name and port the bridge talks through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(rename = "vim_client_script")]
    pub client_script: String,
    #[serde(rename = "vim_server_script")]
    pub server_script: String,
    pub server_name: String,
    pub port: u16,
}

impl Configuration {
    pub fn new(
        client_script: impl Into<String>,
        server_script: impl Into<String>,
        server_name: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            client_script: client_script.into(),
            server_script: server_script.into(),
            server_name: server_name.into(),
            port,
        }
    }

    /// Defaults, honoring `VIMDEBUG_VIMSCRIPT` and `VIMDEBUG_SERVERNAME`.
    pub fn defaults() -> Self {
        let client = default_client_script();
        Self {
            server_script: default_server_script_for(&client),
            client_script: client,
            server_name: std::env::var("VIMDEBUG_SERVERNAME")
                .unwrap_or_else(|_| DEFAULT_SERVER_NAME.to_string()),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<vim-debugger Config : Script {}; Server name {}, Port {}>",
            self.client_script, self.server_name, self.port
        )
    }
}

pub fn default_client_script() -> String {
    std::env::var("VIMDEBUG_VIMSCRIPT").unwrap_or_else(|_| PLATFORM_SCRIPT.to_string())
}

fn default_server_script_for(client: &str) -> String {
    if cfg!(windows) {
        "gvim.exe".to_string()
    } else {
        client.to_string()
    }
}

/// Server script used when the configuration does not say otherwise.
pub fn default_server_script() -> String {
    default_server_script_for(&default_client_script())
}

/// Reads and writes the persisted configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$VIMDEBUG_RC`, else `~/.vimdebugrc`.
    pub fn default_location() -> Result<Self, ConfigurationError> {
        if let Some(path) = std::env::var_os("VIMDEBUG_RC") {
            return Ok(Self::new(path));
        }
        let home = dirs::home_dir().ok_or(ConfigurationError::NoHomeDirectory)?;
        Ok(Self::new(home.join(".vimdebugrc")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the configuration, writing defaults first if the file is absent.
    pub fn load(&self) -> Result<Configuration, ConfigurationError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "writing default configuration");
            self.save(&Configuration::defaults())?;
        }
        let text = fs::read_to_string(&self.path).map_err(|source| ConfigurationError::Io {
            file: self.path.clone(),
            source,
        })?;
        let root: Value =
            serde_json::from_str(&text).map_err(|source| ConfigurationError::Parse {
                file: self.path.clone(),
                source,
            })?;
        let section = root
            .get(SECTION)
            .and_then(Value::as_object)
            .ok_or_else(|| ConfigurationError::MissingSection {
                section: SECTION.to_string(),
                file: self.path.clone(),
            })?;
        self.parse_section(section)
    }

    fn parse_section(&self, section: &Map<String, Value>) -> Result<Configuration, ConfigurationError> {
        // `script` takes precedence over `vim_client_script`.
        let client_script = match self.string(section, KEY_LEGACY_SCRIPT)? {
            Some(script) => script,
            None => self.required(section, KEY_CLIENT, KEY_CLIENT)?,
        };
        let server_name = self.required(section, KEY_SERVER_NAME, KEY_SERVER_NAME)?;
        let port = self.port(section)?;
        let server_script = match self.string(section, KEY_SERVER)? {
            Some(script) => script,
            None => self.required(section, KEY_LEGACY_SCRIPT, KEY_SERVER)?,
        };
        Ok(Configuration {
            client_script,
            server_script,
            server_name,
            port,
        })
    }

    fn string(
        &self,
        section: &Map<String, Value>,
        key: &str,
    ) -> Result<Option<String>, ConfigurationError> {
        let Some(value) = section.get(key) else {
            return Ok(None);
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        if text.is_empty() {
            return Err(ConfigurationError::EmptyValue {
                key: key.to_string(),
                file: self.path.clone(),
            });
        }
        Ok(Some(text))
    }

    /// `reported` is the key named in the error when `key` is absent.
    fn required(
        &self,
        section: &Map<String, Value>,
        key: &str,
        reported: &str,
    ) -> Result<String, ConfigurationError> {
        self.string(section, key)?
            .ok_or_else(|| ConfigurationError::MissingKey {
                key: reported.to_string(),
                section: SECTION.to_string(),
                file: self.path.clone(),
            })
    }

    fn port(&self, section: &Map<String, Value>) -> Result<u16, ConfigurationError> {
        let invalid = |value: &Value| ConfigurationError::InvalidPort {
            value: value.to_string(),
            file: self.path.clone(),
        };
        let value = section
            .get(KEY_PORT)
            .ok_or_else(|| ConfigurationError::MissingKey {
                key: KEY_PORT.to_string(),
                section: SECTION.to_string(),
                file: self.path.clone(),
            })?;
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .ok_or_else(|| invalid(value)),
            Value::String(s) => s.trim().parse().map_err(|_| invalid(value)),
            _ => Err(invalid(value)),
        }
    }

    pub fn save(&self, config: &Configuration) -> Result<(), ConfigurationError> {
        let mut root = Map::new();
        let section = serde_json::to_value(config).map_err(|source| ConfigurationError::Parse {
            file: self.path.clone(),
            source,
        })?;
        root.insert(SECTION.to_string(), section);
        let text = serde_json::to_string_pretty(&Value::Object(root)).map_err(|source| {
            ConfigurationError::Parse {
                file: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text + "\n").map_err(|source| ConfigurationError::Io {
            file: self.path.clone(),
            source,
        })
    }
}
