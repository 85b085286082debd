use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::error::{ErrorDetail, Result};
use crate::handle::HandleState;
use crate::statement::{Statement, StatementOptions};
use crate::translate::native_error;
use crate::traits::{CursorOrigin, DataTarget, NativeClient, NativeData, NativeResult, TranType};

/// A logged-in connection owning one native connection handle.
///
/// Not safe for concurrent use; every state-changing call takes `&mut self`.
/// Statements prepared from a connection must be destroyed before it is disconnected.
pub struct Connection {
    native: Arc<dyn NativeClient>,
    config: Arc<DriverConfig>,
    state: HandleState,
    handle: i32,
    auto_commit: bool,
}

impl Connection {
    /// Log in and verify the session with a commit of the empty transaction.
    ///
    /// On failure no native connection is left open.
    pub(crate) fn login(
        native: Arc<dyn NativeClient>,
        config: Arc<DriverConfig>,
        target: &str,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        let handle = native
            .connect_with_url(target, user, password)
            .map_err(|failure| native_error(native.as_ref(), &failure))?;

        if let Err(failure) = native.end_tran(handle, TranType::Commit) {
            let error = native_error(native.as_ref(), &failure);
            if let Err(close) = native.disconnect(handle) {
                warn!(handle, code = close.code, "failed to release connection after login error");
            }
            return Err(error);
        }

        let mut state = HandleState::new();
        state.set_active(true);
        debug!(handle, "connected");

        let auto_commit = config.auto_commit;
        let mut conn = Self {
            native,
            config,
            state,
            handle,
            auto_commit: false,
        };
        conn.set_auto_commit(auto_commit)?;
        Ok(conn)
    }

    /// Native connection handle; 0 once disconnected.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    pub fn state(&self) -> &HandleState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Code and message of the last failure on this connection.
    pub fn last_error(&self) -> Option<&ErrorDetail> {
        self.state.last_error()
    }

    /// Cached AutoCommit attribute. No native round-trip.
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Switch native autocommit mode.
    ///
    /// Native failures are logged and ignored unless `strict_autocommit` is configured.
    pub fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        if let Err(failure) = self.native.set_autocommit(self.handle, enabled) {
            if self.config.strict_autocommit {
                return self.check(Err(failure));
            }
            warn!(
                handle = self.handle,
                code = failure.code,
                enabled,
                "native autocommit switch failed, keeping requested mode"
            );
        }
        self.auto_commit = enabled;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.end_tran(TranType::Commit)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.end_tran(TranType::Rollback)
    }

    fn end_tran(&mut self, tran: TranType) -> Result<()> {
        let result = self.native.end_tran(self.handle, tran);
        self.check(result)
    }

    /// Liveness probe. Every failure yields `false` and is recorded as the last error.
    pub fn ping(&mut self) -> bool {
        match self.probe() {
            Ok(alive) => alive,
            Err(error) => {
                warn!(handle = self.handle, error = %error, "ping failed");
                self.state.fail(error);
                false
            }
        }
    }

    fn probe(&self) -> Result<bool> {
        let catalog = self
            .config
            .ping_catalog
            .as_deref()
            .unwrap_or_else(|| self.native.root_catalog());
        let sql = format!("SELECT 1+1 FROM {catalog}");

        let req = self
            .native
            .prepare(self.handle, &sql)
            .map_err(|failure| native_error(self.native.as_ref(), &failure))?;
        let outcome = self
            .probe_rows(req)
            .map_err(|failure| native_error(self.native.as_ref(), &failure));
        if let Err(failure) = self.native.close_req_handle(req) {
            debug!(req, code = failure.code, "ping request close failed");
        }
        outcome
    }

    fn probe_rows(&self, req: i32) -> NativeResult<bool> {
        self.native.execute(req)?;
        loop {
            match self.native.cursor(req, 1, CursorOrigin::Current) {
                Err(failure) if failure.is_no_more_data() => return Ok(false),
                other => other?,
            }
            self.native.fetch(req)?;
            let cell = self.native.get_data(req, 1, DataTarget::Int)?;
            if !cell.is_null() && cell.data == NativeData::Int(2) {
                return Ok(true);
            }
        }
    }

    /// Identity value generated by the last insert; `None` when there is none.
    pub fn last_insert_id(&mut self) -> Result<Option<String>> {
        let result = self.native.last_insert_id(self.handle);
        self.check(result)
    }

    /// Close the native connection. A no-op on an inactive connection.
    ///
    /// The connection is marked inactive before the native call, so it stays inactive
    /// even when the native disconnect reports an error.
    pub fn disconnect(&mut self) -> Result<bool> {
        if !self.state.is_active() {
            return Ok(true);
        }
        self.state.set_active(false);
        let handle = std::mem::take(&mut self.handle);
        debug!(handle, "disconnecting");

        let result = self.native.disconnect(handle);
        self.check(result)?;
        Ok(true)
    }

    /// Prepare a statement on this connection.
    pub fn prepare(&mut self, sql: &str) -> Result<Statement> {
        let options = StatementOptions {
            lookahead: self.config.lookahead,
            float_decode: self.config.float_decode,
        };
        Statement::prepare(Arc::clone(&self.native), self.handle, sql, options)
            .map_err(|error| self.state.fail(error))
    }

    /// Translate a native failure and record it on this handle.
    fn check<T>(&mut self, result: NativeResult<T>) -> Result<T> {
        result.map_err(|failure| self.state.fail(native_error(self.native.as_ref(), &failure)))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.state.is_active() {
            if let Err(error) = self.disconnect() {
                warn!(error = %error, "disconnect on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("auto_commit", &self.auto_commit)
            .finish()
    }
}
