use std::sync::Arc;

use tracing::debug;

use crate::config::DriverConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::traits::NativeClient;

/// Main entry point.
/// Owns the process-wide native library state and opens connections through it.
pub struct Driver {
    native: Arc<dyn NativeClient>,
    config: Arc<DriverConfig>,
}

impl Driver {
    /// Initialize the native library with the default configuration.
    pub fn initialize(native: Arc<dyn NativeClient>) -> Self {
        Self::with_config(native, DriverConfig::default())
    }

    /// Initialize the native library.
    /// Call once per process, before any connection is opened.
    pub fn with_config(native: Arc<dyn NativeClient>, config: DriverConfig) -> Self {
        native.init();
        debug!("native library initialized");
        Self {
            native,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Log in to `target`, a native connection URL such as
    /// `cci:CUBRID:localhost:33000:demodb:::`.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use cubrid_dbd::drivers::InMemoryTestNative;
    /// use cubrid_dbd::Driver;
    ///
    /// let driver = Driver::initialize(Arc::new(InMemoryTestNative::new()));
    /// let mut conn = driver
    ///     .connect("cci:CUBRID:localhost:33000:demodb:::", "dba", "")
    ///     .unwrap();
    /// assert!(conn.ping());
    /// ```
    pub fn connect(&self, target: &str, user: &str, password: &str) -> Result<Connection> {
        Connection::login(
            Arc::clone(&self.native),
            Arc::clone(&self.config),
            target,
            user,
            password,
        )
    }

    /// Log in using the `[connect]` section of the configuration.
    pub fn connect_with_options(&self) -> Result<Connection> {
        let options = &self.config.connect;
        self.connect(&options.url(), &options.user, &options.password)
    }

    /// Release the native library. Connections still open are not closed.
    pub fn shutdown(self) {
        self.native.end();
        debug!("native library released");
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("config", &self.config).finish()
    }
}
