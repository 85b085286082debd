use std::fmt;

/// Status code returned by the native library when a cursor move lands outside the
/// result set.
pub const CCI_ER_NO_MORE_DATA: i32 = -5;
/// Generic DBMS-side failure; the structured detail carries the server's own code.
pub const CCI_ER_DBMS: i32 = -1;
/// Unknown or closed connection handle.
pub const CCI_ER_CON_HANDLE: i32 = -2;
/// Unknown or closed request (statement) handle.
pub const CCI_ER_REQ_HANDLE: i32 = -8;
/// Parameter index rejected by the native bind call.
pub const CCI_ER_BIND_INDEX: i32 = -9;
/// Value could not be converted to the requested accessor type.
pub const CCI_ER_TYPE_CONVERSION: i32 = -10;
/// Connection could not be established.
pub const CCI_ER_CONNECT: i32 = -11;
/// The connection URL could not be parsed.
pub const CCI_ER_INVALID_URL: i32 = -12;

/// Structured error detail the native library fills in alongside a negative status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeErrorDetail {
    pub err_code: i32,
    pub err_msg: String,
}

impl NativeErrorDetail {
    pub fn new(err_code: i32, err_msg: impl Into<String>) -> Self {
        Self {
            err_code,
            err_msg: err_msg.into(),
        }
    }
}

/// A negative status from a native call, with whatever detail the library provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFailure {
    pub code: i32,
    pub detail: Option<NativeErrorDetail>,
}

impl NativeFailure {
    /// A bare status code with no structured detail.
    pub fn code(code: i32) -> Self {
        Self { code, detail: None }
    }

    pub fn with_detail(code: i32, detail: NativeErrorDetail) -> Self {
        Self {
            code,
            detail: Some(detail),
        }
    }

    pub fn is_no_more_data(&self) -> bool {
        self.code == CCI_ER_NO_MORE_DATA
    }
}

impl fmt::Display for NativeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "native status {} ({})", self.code, detail.err_msg),
            None => write!(f, "native status {}", self.code),
        }
    }
}

/// Result of a native call. `Err` carries the negative status code.
pub type NativeResult<T> = std::result::Result<T, NativeFailure>;

/// Transaction end mode for [`NativeClient::end_tran`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranType {
    Commit,
    Rollback,
}

/// Origin for [`NativeClient::cursor`] moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOrigin {
    First,
    Current,
    Last,
}

/// Which typed accessor a column value is read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTarget {
    Int,
    Double,
    Str,
}

/// A value produced by a typed accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeData {
    Int(i32),
    Double(f64),
    Str(String),
}

/// One column read: the value plus the out-of-band indicator. A negative indicator
/// means SQL NULL and the value must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeCell {
    pub data: NativeData,
    pub indicator: i32,
}

impl NativeCell {
    pub fn value(data: NativeData) -> Self {
        Self { data, indicator: 0 }
    }

    pub fn null(target: DataTarget) -> Self {
        let data = match target {
            DataTarget::Int => NativeData::Int(0),
            DataTarget::Double => NativeData::Double(0.0),
            DataTarget::Str => NativeData::Str(String::new()),
        };
        Self { data, indicator: -1 }
    }

    pub fn is_null(&self) -> bool {
        self.indicator < 0
    }
}

/// Column description as reported by the native result-info call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeColumnInfo {
    pub name: String,
    pub type_tag: i32,
    pub scale: i32,
    pub precision: i32,
}

/// What the native library knows about an executed statement's result.
///
/// `columns` is `None` when the library could not produce column info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeResultInfo {
    pub statement_type: i32,
    pub columns: Option<Vec<NativeColumnInfo>>,
}

/// The native client library, seen as an opaque service.
///
/// Handles are plain integers owned by the library. Every fallible call returns a
/// [`NativeResult`]; the negative status code and optional detail are routed through the
/// error translator by the adapter. Calls block until the library returns.
///
/// Implementations must be shareable across handles, but the adapter never issues two
/// calls on the same handle concurrently.
pub trait NativeClient: Send + Sync {
    /// One-time process-scoped library startup.
    fn init(&self) {}

    /// One-time process-scoped library shutdown.
    fn end(&self) {}

    /// Catalog queried by the liveness probe (`SELECT 1+1 FROM <catalog>`).
    fn root_catalog(&self) -> &str {
        "db_root"
    }

    /// Open a connection; returns the connection handle.
    fn connect_with_url(&self, url: &str, user: &str, password: &str) -> NativeResult<i32>;

    fn end_tran(&self, conn: i32, tran: TranType) -> NativeResult<()>;

    fn disconnect(&self, conn: i32) -> NativeResult<()>;

    fn set_autocommit(&self, conn: i32, enabled: bool) -> NativeResult<()>;

    /// Identity value generated by the last insert, if any.
    fn last_insert_id(&self, conn: i32) -> NativeResult<Option<String>>;

    /// Prepare a statement; returns the request handle.
    fn prepare(&self, conn: i32, sql: &str) -> NativeResult<i32>;

    /// Number of `?` placeholders in a prepared statement.
    fn bind_count(&self, req: i32) -> NativeResult<usize>;

    /// Bind a parameter (1-based) as character data; `None` binds SQL NULL.
    fn bind_param(&self, req: i32, index: usize, value: Option<&str>) -> NativeResult<()>;

    /// Execute; returns the affected row count for DML, the row count for queries.
    fn execute(&self, req: i32) -> NativeResult<i64>;

    fn result_info(&self, req: i32) -> NativeResultInfo;

    /// Move the cursor by `offset` relative to `origin`.
    fn cursor(&self, req: i32, offset: i32, origin: CursorOrigin) -> NativeResult<()>;

    /// Materialize the row at the current cursor position.
    fn fetch(&self, req: i32) -> NativeResult<()>;

    /// Read column `index` (1-based) of the fetched row through `target`'s accessor.
    fn get_data(&self, req: i32, index: usize, target: DataTarget) -> NativeResult<NativeCell>;

    fn close_req_handle(&self, req: i32) -> NativeResult<()>;

    /// Render a human-readable message; `None` when the library cannot render one.
    fn error_message(&self, code: i32, detail: &NativeErrorDetail) -> Option<String>;
}
