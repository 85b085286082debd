use thiserror::Error;

use crate::translate::client_message;

/// Driver-reserved code: a SELECT executed without usable column metadata.
pub const CUBRID_ER_CANNOT_GET_COLUMN_INFO: i32 = -2001;
/// Driver-reserved code: a column value could not be read back as its declared type.
pub const CUBRID_ER_CANNOT_FETCH_DATA: i32 = -2002;
/// Driver-reserved code: rows were requested from a statement that produces none.
pub const CUBRID_ER_NOT_A_QUERY: i32 = -2003;
/// Driver-reserved code: bind index outside `1..=parameter_count`.
pub const CUBRID_ER_BIND_INDEX: i32 = -2004;
/// Driver-reserved code: configuration could not be loaded.
pub const CUBRID_ER_CONFIG: i32 = -2005;

/// Normalized `(code, message)` pair written onto the failing handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: i32,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error type for adapter operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbdError {
    #[error("{message}")]
    NativeCallFailed { code: i32, message: String },

    #[error("{}", client_message(CUBRID_ER_BIND_INDEX))]
    BindIndexOutOfRange { index: i64, count: usize },

    #[error("{}", client_message(CUBRID_ER_CANNOT_GET_COLUMN_INFO))]
    CannotGetColumnInfo,

    #[error("{}", client_message(CUBRID_ER_CANNOT_FETCH_DATA))]
    CannotFetchData { column: usize },

    #[error("{}", client_message(CUBRID_ER_NOT_A_QUERY))]
    NotAQuery,

    #[error("Unknown Error")]
    UnknownNativeError { code: i32 },

    #[error("{}: {}", client_message(CUBRID_ER_CONFIG), .0)]
    Config(String),
}

impl DbdError {
    /// The code and message a caller reads back from the failing handle.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail::new(self.code(), self.to_string())
    }

    /// Native status code, or the driver-reserved code for adapter-side failures.
    pub fn code(&self) -> i32 {
        match self {
            DbdError::NativeCallFailed { code, .. } => *code,
            DbdError::UnknownNativeError { code } => *code,
            DbdError::BindIndexOutOfRange { .. } => CUBRID_ER_BIND_INDEX,
            DbdError::CannotGetColumnInfo => CUBRID_ER_CANNOT_GET_COLUMN_INFO,
            DbdError::CannotFetchData { .. } => CUBRID_ER_CANNOT_FETCH_DATA,
            DbdError::NotAQuery => CUBRID_ER_NOT_A_QUERY,
            DbdError::Config(_) => CUBRID_ER_CONFIG,
        }
    }
}

impl From<toml::de::Error> for DbdError {
    fn from(err: toml::de::Error) -> Self {
        DbdError::Config(err.message().to_string())
    }
}

impl From<toml::ser::Error> for DbdError {
    fn from(err: toml::ser::Error) -> Self {
        DbdError::Config(err.to_string())
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, DbdError>;
