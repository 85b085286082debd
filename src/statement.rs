//! Prepared statement lifecycle: prepare, bind, execute, fetch, finish, destroy.
//!
//! A SELECT keeps the native cursor one row ahead of what has been returned: execute
//! moves it onto the first row, and every fetch decodes the row under the cursor and
//! then advances it. End of data is detected when the cursor is found off the result set
//! at the start of a fetch, so it is reported by the fetch after the last row, never by
//! execute.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{FloatDecode, LookaheadPolicy};
use crate::decode::decode_row;
use crate::error::{DbdError, ErrorDetail, Result};
use crate::handle::HandleState;
use crate::translate::native_error;
use crate::traits::{CursorOrigin, NativeClient, NativeResult};
use crate::types::{ColumnDescriptor, CommandKind, Fetched, QueryResult, Row, SqlValue};

/// Per-statement behavior taken from the driver configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StatementOptions {
    pub lookahead: LookaheadPolicy,
    pub float_decode: FloatDecode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Nothing to fetch: not executed, not a query, or destroyed.
    Idle,
    /// The native cursor sits on the next row to return, or just past the end.
    Positioned,
    /// End of data has been reported.
    Exhausted,
}

/// A prepared statement owning one native request handle.
///
/// Holds a copy of its connection's native handle but does not own the connection.
pub struct Statement {
    native: Arc<dyn NativeClient>,
    options: StatementOptions,
    state: HandleState,
    handle: i32,
    conn: i32,
    sql: String,
    col_count: i32,
    command: CommandKind,
    affected_rows: i64,
    columns: Vec<ColumnDescriptor>,
    names: Arc<[String]>,
    cursor: CursorState,
    /// Lookahead failure waiting to be reported by the next fetch.
    pending: Option<DbdError>,
}

impl Statement {
    pub(crate) fn prepare(
        native: Arc<dyn NativeClient>,
        conn: i32,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Self> {
        let handle = native
            .prepare(conn, sql)
            .map_err(|failure| native_error(native.as_ref(), &failure))?;

        let params = match native.bind_count(handle) {
            Ok(n) => n,
            Err(failure) => {
                let error = native_error(native.as_ref(), &failure);
                if let Err(close) = native.close_req_handle(handle) {
                    warn!(handle, code = close.code, "failed to close request after prepare error");
                }
                return Err(error);
            }
        };

        let mut state = HandleState::new();
        state.set_num_params(params);
        debug!(conn, handle, params, "prepared");

        Ok(Self {
            native,
            options,
            state,
            handle,
            conn,
            sql: sql.to_string(),
            col_count: -1,
            command: CommandKind::Unknown,
            affected_rows: -1,
            columns: Vec::new(),
            names: Arc::from(Vec::new()),
            cursor: CursorState::Idle,
            pending: None,
        })
    }

    /// Bind a value to the 1-based placeholder `index`.
    ///
    /// The value is always sent as character data, whatever its SQL type; the server
    /// converts it. An index outside `1..=parameter_count()` is rejected without a
    /// native call.
    pub fn bind(&mut self, index: i64, value: impl Into<SqlValue>) -> Result<()> {
        let count = self.state.num_params();
        let position = match usize::try_from(index) {
            Ok(position) if (1..=count).contains(&position) => position,
            _ => {
                return Err(self
                    .state
                    .fail(DbdError::BindIndexOutOfRange { index, count }))
            }
        };

        let text = value.into().to_bind_text();
        let result = self.native.bind_param(self.handle, position, text.as_deref());
        self.check(result)
    }

    /// Execute and return the affected row count, or -1 for queries and other
    /// statements without a meaningful count.
    pub fn execute(&mut self) -> Result<i64> {
        // A failed execute must not leave the previous result fetchable.
        self.reset_results();
        self.state.set_active(false);

        let result = self.native.execute(self.handle);
        let row_count = self.check(result)?;

        let info = self.native.result_info(self.handle);
        let command = CommandKind::from_native(info.statement_type);
        let columns: Vec<ColumnDescriptor> = info
            .columns
            .unwrap_or_default()
            .into_iter()
            .map(ColumnDescriptor::from)
            .collect();

        if command.is_select() && columns.is_empty() {
            return Err(self.state.fail(DbdError::CannotGetColumnInfo));
        }

        self.command = command;
        self.affected_rows = if command.reports_affected_rows() {
            row_count
        } else {
            -1
        };

        if !command.is_select() {
            self.col_count = 0;
            self.columns = Vec::new();
            self.names = Arc::from(Vec::new());
            self.state.set_num_fields(0);
            debug!(handle = self.handle, ?command, rows = self.affected_rows, "executed");
            return Ok(self.affected_rows);
        }

        self.col_count = columns.len() as i32;
        self.names = columns.iter().map(|c| c.name().to_string()).collect();
        self.columns = columns;
        self.state.set_num_fields(self.columns.len());

        // Step onto the first row; an empty result is reported by the first fetch.
        match self.native.cursor(self.handle, 1, CursorOrigin::Current) {
            Err(failure) if failure.is_no_more_data() => {}
            other => self.check(other)?,
        }

        self.cursor = CursorState::Positioned;
        self.state.set_active(true);
        debug!(handle = self.handle, columns = self.col_count, "query executed");
        Ok(self.affected_rows)
    }

    /// Bind `params` to placeholders 1..=n, then execute.
    pub fn execute_with<I, V>(&mut self, params: I) -> Result<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        for (i, value) in params.into_iter().enumerate() {
            self.bind(i as i64 + 1, value)?;
        }
        self.execute()
    }

    /// Return the next row, or [`Fetched::EndOfData`] once the result is exhausted.
    ///
    /// With [`LookaheadPolicy::Deferred`] a row can be returned although advancing the
    /// cursor past it failed; that failure is then the result of the following call.
    pub fn fetch_next(&mut self) -> Result<Fetched> {
        if !self.command.is_select() {
            return Err(self.state.fail(DbdError::NotAQuery));
        }
        if let Some(error) = self.pending.take() {
            self.state.set_active(false);
            return Err(self.state.fail(error));
        }
        if self.cursor == CursorState::Exhausted {
            return Ok(Fetched::EndOfData);
        }

        match self.native.cursor(self.handle, 0, CursorOrigin::Current) {
            Err(failure) if failure.is_no_more_data() => {
                self.cursor = CursorState::Exhausted;
                self.state.set_active(false);
                return Ok(Fetched::EndOfData);
            }
            other => self.check(other)?,
        }

        let result = self.native.fetch(self.handle);
        self.check(result)?;

        let values = decode_row(
            self.native.as_ref(),
            self.handle,
            &self.columns,
            self.options.float_decode,
        )
        .map_err(|error| self.state.fail(error))?;
        let row = Row::new(Arc::clone(&self.names), values);

        match self.native.cursor(self.handle, 1, CursorOrigin::Current) {
            Err(failure) if failure.is_no_more_data() => {}
            Err(failure) => {
                let error = native_error(self.native.as_ref(), &failure);
                match self.options.lookahead {
                    LookaheadPolicy::Deferred => {
                        debug!(handle = self.handle, code = failure.code, "deferring lookahead error");
                        self.pending = Some(error);
                    }
                    LookaheadPolicy::Immediate => return Err(self.state.fail(error)),
                }
            }
            Ok(()) => {}
        }

        Ok(Fetched::Row(row))
    }

    /// Drain every remaining row.
    pub fn fetch_all(&mut self) -> Result<QueryResult> {
        let mut rows = Vec::new();
        while let Fetched::Row(row) = self.fetch_next()? {
            rows.push(row);
        }
        Ok(QueryResult::new(self.columns.clone(), rows))
    }

    /// Iterate over the remaining rows. Stops after the first error.
    pub fn rows_iter(&mut self) -> RowIter<'_> {
        RowIter {
            stmt: self,
            done: false,
        }
    }

    /// Stop yielding rows. The native handle stays open for re-execution.
    pub fn finish(&mut self) {
        self.state.set_active(false);
    }

    /// Close the native handle and reset the statement. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.handle != 0 {
            if let Err(failure) = self.native.close_req_handle(self.handle) {
                warn!(handle = self.handle, code = failure.code, "closing request failed");
            }
            debug!(handle = self.handle, "destroyed");
            self.handle = 0;
            self.reset_results();
        }
        self.state.set_active(false);
    }

    /// Back to the sentinels of a statement that has not been executed.
    fn reset_results(&mut self) {
        self.col_count = -1;
        self.command = CommandKind::Unknown;
        self.affected_rows = -1;
        self.columns = Vec::new();
        self.names = Arc::from(Vec::new());
        self.state.set_num_fields(0);
        self.cursor = CursorState::Idle;
        self.pending = None;
    }

    /// Native request handle; 0 once destroyed.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// Native handle of the owning connection.
    pub fn connection_handle(&self) -> i32 {
        self.conn
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn state(&self) -> &HandleState {
        &self.state
    }

    /// Executed query with rows possibly left to fetch.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Code and message of the last failure on this statement.
    pub fn last_error(&self) -> Option<&ErrorDetail> {
        self.state.last_error()
    }

    pub fn parameter_count(&self) -> usize {
        self.state.num_params()
    }

    /// Result column count; -1 until executed.
    pub fn column_count(&self) -> i32 {
        self.col_count
    }

    pub fn command_kind(&self) -> CommandKind {
        self.command
    }

    /// Affected rows of the last execute; -1 for queries.
    pub fn rows(&self) -> i64 {
        self.affected_rows
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn types(&self) -> Vec<i32> {
        self.columns.iter().map(|c| c.type_tag()).collect()
    }

    pub fn scales(&self) -> Vec<i32> {
        self.columns.iter().map(|c| c.scale()).collect()
    }

    pub fn precisions(&self) -> Vec<i32> {
        self.columns.iter().map(|c| c.precision()).collect()
    }

    /// See [`ColumnDescriptor::nullable`].
    pub fn nullable(&self) -> Vec<i32> {
        self.columns.iter().map(|c| c.nullable()).collect()
    }

    /// Translate a native failure and record it on this handle.
    fn check<T>(&mut self, result: NativeResult<T>) -> Result<T> {
        result.map_err(|failure| self.state.fail(native_error(self.native.as_ref(), &failure)))
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("handle", &self.handle)
            .field("conn", &self.conn)
            .field("sql", &self.sql)
            .field("command", &self.command)
            .field("col_count", &self.col_count)
            .field("affected_rows", &self.affected_rows)
            .field("state", &self.state)
            .finish()
    }
}

/// Row iterator returned by [`Statement::rows_iter`].
pub struct RowIter<'s> {
    stmt: &'s mut Statement,
    done: bool,
}

impl Iterator for RowIter<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stmt.fetch_next() {
            Ok(Fetched::Row(row)) => Some(Ok(row)),
            Ok(Fetched::EndOfData) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}
