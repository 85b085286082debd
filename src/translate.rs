//! Maps native status codes onto the `(code, message)` pair callers see.

use tracing::debug;

use crate::error::{
    DbdError, ErrorDetail, CUBRID_ER_BIND_INDEX, CUBRID_ER_CANNOT_FETCH_DATA,
    CUBRID_ER_CANNOT_GET_COLUMN_INFO, CUBRID_ER_CONFIG, CUBRID_ER_NOT_A_QUERY,
};
use crate::traits::{NativeClient, NativeErrorDetail, NativeFailure};

/// Codes at or below this value belong to the driver, not the native library.
pub const DRIVER_CODE_THRESHOLD: i32 = -2001;

/// Message used whenever no better text can be produced.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

static CLIENT_MESSAGES: &[(i32, &str)] = &[
    (CUBRID_ER_CANNOT_GET_COLUMN_INFO, "Cannot get column info"),
    (CUBRID_ER_CANNOT_FETCH_DATA, "Cannot fetch data"),
    (CUBRID_ER_NOT_A_QUERY, "Statement is not a query"),
    (CUBRID_ER_BIND_INDEX, "Bind index out of range"),
    (CUBRID_ER_CONFIG, "Invalid configuration"),
];

pub fn is_driver_code(code: i32) -> bool {
    code <= DRIVER_CODE_THRESHOLD
}

/// Format a driver-reserved code with the fixed client template.
///
/// The output is parsed by callers, so the layout `ERROR: CLIENT, <code>, <text>` must
/// not change.
pub fn client_message(code: i32) -> String {
    let text = CLIENT_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, text)| *text)
        .unwrap_or(UNKNOWN_ERROR);
    format!("ERROR: CLIENT, {code}, {text}")
}

/// Translate a native status into a normalized error detail.
///
/// Driver-reserved codes never reach the native renderer. Other codes are rendered by the
/// native library from `detail`; without detail, or when rendering fails, the message is
/// [`UNKNOWN_ERROR`].
pub fn translate(
    native: &dyn NativeClient,
    code: i32,
    detail: Option<&NativeErrorDetail>,
) -> ErrorDetail {
    let message = render(native, code, detail).unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    ErrorDetail::new(code, message)
}

fn render(native: &dyn NativeClient, code: i32, detail: Option<&NativeErrorDetail>) -> Option<String> {
    if is_driver_code(code) {
        return Some(client_message(code));
    }
    detail.and_then(|detail| native.error_message(code, detail))
}

/// Turn a failed native call into the adapter error.
pub(crate) fn native_error(native: &dyn NativeClient, failure: &NativeFailure) -> DbdError {
    debug!(code = failure.code, "--> handle_error");
    let error = match render(native, failure.code, failure.detail.as_ref()) {
        Some(message) => DbdError::NativeCallFailed {
            code: failure.code,
            message,
        },
        None => DbdError::UnknownNativeError { code: failure.code },
    };
    debug!(message = %error, "<-- handle_error");
    error
}
