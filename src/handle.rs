use crate::error::{DbdError, ErrorDetail};

/// The host-visible part of a connection or statement handle.
///
/// Host frameworks read these fields without knowing anything about the native library;
/// the adapter-private part (native handles, metadata) lives beside it in
/// [`Connection`](crate::Connection) and [`Statement`](crate::Statement).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleState {
    active: bool,
    last_error: Option<ErrorDetail>,
    num_params: usize,
    num_fields: usize,
}

impl HandleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected (connection) or yielding rows (statement).
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Code and message of the most recent failure on this handle.
    pub fn last_error(&self) -> Option<&ErrorDetail> {
        self.last_error.as_ref()
    }

    /// Record a failure and hand it back for propagation.
    pub(crate) fn fail(&mut self, error: DbdError) -> DbdError {
        self.last_error = Some(error.detail());
        error
    }

    pub fn num_params(&self) -> usize {
        self.num_params
    }

    pub(crate) fn set_num_params(&mut self, n: usize) {
        self.num_params = n;
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub(crate) fn set_num_fields(&mut self, n: usize) {
        self.num_fields = n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_records_detail() {
        let mut state = HandleState::new();
        assert!(state.last_error().is_none());

        let err = state.fail(DbdError::NotAQuery);
        assert_eq!(err, DbdError::NotAQuery);
        let detail = state.last_error().unwrap();
        assert_eq!(detail.code, -2003);
        assert_eq!(detail.message, "ERROR: CLIENT, -2003, Statement is not a query");
    }
}
