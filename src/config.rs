//! Driver configuration.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! auto_commit = false
//! lookahead = "immediate"
//! float_decode = "exact"
//!
//! [connect]
//! host = "db.internal"
//! port = 33000
//! database = "demodb"
//!
//! [connect.properties]
//! login_timeout = "5000"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DbdError, Result};

/// When an error from the cursor lookahead after a decoded row is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookaheadPolicy {
    /// Return the decoded row; report the error on the next fetch.
    #[default]
    Deferred,
    /// Drop the decoded row and report the error right away.
    Immediate,
}

/// How FLOAT and DOUBLE columns are stored in a decoded row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatDecode {
    /// Keep the double as read.
    #[default]
    Exact,
    /// Truncate into an unsigned integer slot, as older releases of the driver did.
    TruncateUnsigned,
}

/// Where to connect. Rendered into the native connection URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Extra URL properties (`?key=value&...`).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    33000
}

fn default_database() -> String {
    "demodb".to_string()
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: String::new(),
            password: String::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl ConnectOptions {
    /// Native connection URL, `cci:CUBRID:<host>:<port>:<db>:::[?props]`.
    ///
    /// Credentials are passed to the native connect call separately and never embedded.
    pub fn url(&self) -> String {
        let mut url = format!("cci:CUBRID:{}:{}:{}:::", self.host, self.port, self.database);
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            url.push('?');
            url.push_str(&props.join("&"));
        }
        url
    }
}

/// Adapter behavior switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// AutoCommit applied right after login.
    #[serde(default = "default_auto_commit")]
    pub auto_commit: bool,

    /// Surface native failures from `set_auto_commit` instead of logging them.
    #[serde(default)]
    pub strict_autocommit: bool,

    #[serde(default)]
    pub lookahead: LookaheadPolicy,

    #[serde(default)]
    pub float_decode: FloatDecode,

    /// Catalog for the liveness probe; the native library's own when unset.
    #[serde(default)]
    pub ping_catalog: Option<String>,

    #[serde(default)]
    pub connect: ConnectOptions,
}

fn default_auto_commit() -> bool {
    true
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            auto_commit: default_auto_commit(),
            strict_autocommit: false,
            lookahead: LookaheadPolicy::default(),
            float_decode: FloatDecode::default(),
            ping_catalog: None,
            connect: ConnectOptions::default(),
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DbdError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn with_auto_commit(mut self, enabled: bool) -> Self {
        self.auto_commit = enabled;
        self
    }

    pub fn with_strict_autocommit(mut self, strict: bool) -> Self {
        self.strict_autocommit = strict;
        self
    }

    pub fn with_lookahead(mut self, policy: LookaheadPolicy) -> Self {
        self.lookahead = policy;
        self
    }

    pub fn with_float_decode(mut self, mode: FloatDecode) -> Self {
        self.float_decode = mode;
        self
    }

    pub fn with_ping_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.ping_catalog = Some(catalog.into());
        self
    }

    pub fn with_connect(mut self, connect: ConnectOptions) -> Self {
        self.connect = connect;
        self
    }
}
