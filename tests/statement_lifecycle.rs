use std::sync::Arc;

use cubrid_dbd::drivers::{InMemoryTestNative, InMemoryTestResponseBuilder, NativeOp, TestCell};
use cubrid_dbd::traits::{NativeClient, NativeFailure};
use cubrid_dbd::types::{
    CCI_U_TYPE_BIGINT, CCI_U_TYPE_DOUBLE, CCI_U_TYPE_INT, CCI_U_TYPE_NUMERIC, CCI_U_TYPE_STRING,
};
use cubrid_dbd::{
    CommandKind, Connection, DbdError, Driver, DriverConfig, Fetched, FloatDecode,
    LookaheadPolicy, SqlValue,
};

const URL: &str = "cci:CUBRID:localhost:33000:demodb:::";

fn connect(native: &Arc<InMemoryTestNative>, config: DriverConfig) -> Connection {
    let driver = Driver::with_config(Arc::clone(native) as Arc<dyn NativeClient>, config);
    driver.connect(URL, "dba", "").unwrap()
}

fn athletes() -> InMemoryTestNative {
    InMemoryTestNative::new().with_response(
        "SELECT code, name, score FROM athlete",
        InMemoryTestResponseBuilder::select()
            .column("code", CCI_U_TYPE_INT)
            .column_full("name", CCI_U_TYPE_STRING, 0, 40)
            .column("score", CCI_U_TYPE_DOUBLE)
            .row([TestCell::from(10999), "Nam".into(), 9.5.into()])
            .row([TestCell::from(11000), TestCell::Null, TestCell::Null])
            .build(),
    )
}

#[test]
fn test_select_root_probe_then_end_of_data() {
    let native = Arc::new(InMemoryTestNative::new());
    let mut conn = connect(&native, DriverConfig::default());

    let mut stmt = conn.prepare("SELECT 1+1 FROM db_root").unwrap();
    stmt.execute().unwrap();

    let row = stmt.fetch_next().unwrap().into_row().unwrap();
    assert_eq!(row.values(), &[SqlValue::Int32(2)]);
    assert_eq!(stmt.fetch_next().unwrap(), Fetched::EndOfData);
}

#[test]
fn test_insert_then_fetch_is_not_a_query() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "INSERT INTO t VALUES (?)",
        InMemoryTestResponseBuilder::insert(1).build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());

    let mut stmt = conn.prepare("INSERT INTO t VALUES (?)").unwrap();
    assert_eq!(stmt.parameter_count(), 1);
    stmt.bind(1, "x").unwrap();
    assert_eq!(native.bound_params(stmt.handle()), vec![Some("x".to_string())]);

    let affected = stmt.execute().unwrap();
    assert!(affected >= 0);
    assert_eq!(stmt.rows(), 1);
    assert_eq!(stmt.command_kind(), CommandKind::Insert);
    assert_eq!(stmt.column_count(), 0);

    native.clear_recorded_calls();
    let err = stmt.fetch_next().unwrap_err();
    assert_eq!(err, DbdError::NotAQuery);
    assert_eq!(err.to_string(), "ERROR: CLIENT, -2003, Statement is not a query");
    native.assert_not_called(NativeOp::Cursor);
    native.assert_not_called(NativeOp::Fetch);
    assert_eq!(stmt.last_error().unwrap().code, -2003);
}

#[test]
fn test_bind_index_out_of_range_makes_no_native_call() {
    let native = Arc::new(InMemoryTestNative::new());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("INSERT INTO t VALUES (?)").unwrap();

    native.clear_recorded_calls();
    for index in [0, -1, 2, i64::MAX] {
        let err = stmt.bind(index, "x").unwrap_err();
        assert_eq!(err, DbdError::BindIndexOutOfRange { index, count: 1 });
    }
    native.assert_not_called(NativeOp::BindParam);
    assert_eq!(
        stmt.last_error().unwrap().message,
        "ERROR: CLIENT, -2004, Bind index out of range"
    );
}

#[test]
fn test_bind_values_are_sent_as_text() {
    let native = Arc::new(InMemoryTestNative::new());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("INSERT INTO t VALUES (?, ?, ?, ?)").unwrap();

    stmt.execute_with([
        SqlValue::from(42),
        SqlValue::from(true),
        SqlValue::from(1.5),
        SqlValue::Null,
    ])
    .unwrap();
    assert_eq!(
        native.bound_params(stmt.handle()),
        vec![
            Some("42".to_string()),
            Some("1".to_string()),
            Some("1.5".to_string()),
            None
        ]
    );
}

#[test]
fn test_select_without_column_info_fails_at_execute() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT * FROM broken",
        InMemoryTestResponseBuilder::select().without_column_info().build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT * FROM broken").unwrap();

    let err = stmt.execute().unwrap_err();
    assert_eq!(err, DbdError::CannotGetColumnInfo);
    assert_eq!(err.code(), -2001);
    assert!(!stmt.is_active());
    assert_eq!(stmt.fetch_next().unwrap_err(), DbdError::NotAQuery);
}

#[test]
fn test_fetch_after_failed_reexecute_returns_no_stale_rows() {
    let native = Arc::new(athletes().with_failure_after(
        NativeOp::Execute,
        1,
        NativeFailure::code(-4),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();
    assert!(stmt.fetch_next().unwrap().into_row().is_some());

    assert!(stmt.execute().is_err());
    assert!(stmt.names().is_empty());
    assert_eq!(stmt.fetch_next().unwrap_err(), DbdError::NotAQuery);

    // The handle is still usable once execute succeeds again.
    stmt.execute().unwrap();
    assert_eq!(stmt.fetch_all().unwrap().len(), 2);
}

#[test]
fn test_select_with_empty_column_info_fails_at_execute() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT nothing",
        InMemoryTestResponseBuilder::select().build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT nothing").unwrap();
    assert_eq!(stmt.execute().unwrap_err(), DbdError::CannotGetColumnInfo);
}

#[test]
fn test_metadata_after_execute() {
    let native = Arc::new(athletes());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    assert_eq!(stmt.column_count(), -1);

    assert_eq!(stmt.execute().unwrap(), -1);
    assert_eq!(stmt.column_count(), 3);
    assert_eq!(stmt.state().num_fields(), 3);
    assert_eq!(stmt.names(), vec!["code", "name", "score"]);
    assert_eq!(stmt.types(), vec![CCI_U_TYPE_INT, CCI_U_TYPE_STRING, CCI_U_TYPE_DOUBLE]);
    assert_eq!(stmt.precisions(), vec![0, 40, 0]);
    assert_eq!(stmt.nullable(), stmt.precisions());
    assert_eq!(stmt.scales(), vec![0, 0, 0]);
    assert!(stmt.is_active());
}

#[test]
fn test_null_indicator_yields_null_for_every_family() {
    let native = Arc::new(athletes());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();

    let result = stmt.fetch_all().unwrap();
    assert_eq!(result.len(), 2);
    let rows = result.rows();
    assert_eq!(
        rows[0].values(),
        &[
            SqlValue::Int32(10999),
            SqlValue::Text("Nam".into()),
            SqlValue::Double(9.5)
        ]
    );
    assert_eq!(
        rows[1].values(),
        &[SqlValue::Int32(11000), SqlValue::Null, SqlValue::Null]
    );
    assert_eq!(rows[1].get_named("NAME"), Some(&SqlValue::Null));
}

#[test]
fn test_bigint_and_numeric_decode_as_text() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT big, amount FROM ledger",
        InMemoryTestResponseBuilder::select()
            .column("big", CCI_U_TYPE_BIGINT)
            .column_full("amount", CCI_U_TYPE_NUMERIC, 2, 10)
            .row(["9223372036854775807", "12.50"])
            .build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT big, amount FROM ledger").unwrap();
    stmt.execute().unwrap();

    let row = stmt.fetch_next().unwrap().into_row().unwrap();
    assert_eq!(row.get(1).and_then(SqlValue::as_str), Some("9223372036854775807"));
    assert_eq!(row.get(2).and_then(SqlValue::as_str), Some("12.50"));
}

#[test]
fn test_end_of_data_is_sticky_and_clears_active() {
    let native = Arc::new(athletes());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();

    assert!(stmt.fetch_next().unwrap().into_row().is_some());
    assert!(stmt.fetch_next().unwrap().into_row().is_some());

    native.clear_recorded_calls();
    assert!(stmt.fetch_next().unwrap().is_end());
    // No partial decode on the end-of-data call.
    native.assert_not_called(NativeOp::Fetch);
    native.assert_not_called(NativeOp::GetData);
    assert!(!stmt.is_active());

    native.clear_recorded_calls();
    assert!(stmt.fetch_next().unwrap().is_end());
    native.assert_not_called(NativeOp::Cursor);
}

#[test]
fn test_empty_result_ends_on_first_fetch() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT code FROM athlete WHERE 1=0",
        InMemoryTestResponseBuilder::select()
            .column("code", CCI_U_TYPE_INT)
            .build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code FROM athlete WHERE 1=0").unwrap();
    stmt.execute().unwrap();
    assert!(stmt.fetch_next().unwrap().is_end());
}

#[test]
fn test_decode_failure_aborts_row() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT code FROM bad",
        InMemoryTestResponseBuilder::select()
            .column("code", CCI_U_TYPE_INT)
            .row(["not a number"])
            .build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code FROM bad").unwrap();
    stmt.execute().unwrap();

    let err = stmt.fetch_next().unwrap_err();
    assert_eq!(err, DbdError::UnknownNativeError { code: -10 });
    assert_eq!(err.to_string(), "Unknown Error");
    assert_eq!(stmt.last_error().unwrap().code, -10);
}

#[test]
fn test_unexpected_accessor_shape_is_cannot_fetch() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT code FROM odd",
        InMemoryTestResponseBuilder::select()
            .column("code", CCI_U_TYPE_INT)
            .row(["text where an int belongs"])
            .raw_accessors()
            .build(),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code FROM odd").unwrap();
    stmt.execute().unwrap();

    let err = stmt.fetch_next().unwrap_err();
    assert_eq!(err, DbdError::CannotFetchData { column: 1 });
    assert_eq!(err.to_string(), "ERROR: CLIENT, -2002, Cannot fetch data");
}

#[test]
fn test_float_truncate_mode() {
    let native = Arc::new(InMemoryTestNative::new().with_response(
        "SELECT score FROM athlete",
        InMemoryTestResponseBuilder::select()
            .column("score", CCI_U_TYPE_DOUBLE)
            .row([9.7])
            .row([-1.5])
            .build(),
    ));
    let config = DriverConfig::default().with_float_decode(FloatDecode::TruncateUnsigned);
    let mut conn = connect(&native, config);
    let mut stmt = conn.prepare("SELECT score FROM athlete").unwrap();
    stmt.execute().unwrap();

    let values: Vec<SqlValue> = stmt
        .rows_iter()
        .map(|row| row.unwrap().into_values().remove(0))
        .collect();
    assert_eq!(values, vec![SqlValue::Int64(9), SqlValue::Int64(0)]);
}

#[test]
fn test_lookahead_error_deferred_by_default() {
    // Cursor calls: execute, fetch check, lookahead.
    let native = Arc::new(athletes().with_failure_after(
        NativeOp::Cursor,
        2,
        NativeFailure::code(-4),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();

    let row = stmt.fetch_next().unwrap().into_row().unwrap();
    assert_eq!(row.get(1), Some(&SqlValue::Int32(10999)));

    let err = stmt.fetch_next().unwrap_err();
    assert_eq!(err.code(), -4);
    assert!(!stmt.is_active());
}

#[test]
fn test_lookahead_error_immediate() {
    let native = Arc::new(athletes().with_failure_after(
        NativeOp::Cursor,
        2,
        NativeFailure::code(-4),
    ));
    let config = DriverConfig::default().with_lookahead(LookaheadPolicy::Immediate);
    let mut conn = connect(&native, config);
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();

    assert_eq!(stmt.fetch_next().unwrap_err().code(), -4);
}

#[test]
fn test_destroy_twice_is_noop() {
    let native = Arc::new(athletes());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();
    stmt.fetch_next().unwrap();

    stmt.destroy();
    let calls = native.recorded_calls().len();
    stmt.destroy();
    assert_eq!(native.recorded_calls().len(), calls);
    assert_eq!(native.call_count(NativeOp::CloseReq), 1);
    assert_eq!(stmt.handle(), 0);
    assert!(stmt.columns().is_empty());
    assert!(!stmt.is_active());
}

#[test]
fn test_finish_keeps_handle_for_reexecute() {
    let native = Arc::new(athletes());
    let mut conn = connect(&native, DriverConfig::default());
    let mut stmt = conn.prepare("SELECT code, name, score FROM athlete").unwrap();
    stmt.execute().unwrap();
    stmt.finish();
    assert!(!stmt.is_active());
    native.assert_not_called(NativeOp::CloseReq);

    stmt.execute().unwrap();
    assert_eq!(stmt.fetch_all().unwrap().len(), 2);
}

#[test]
fn test_prepare_failure_is_recorded_on_connection() {
    let native = Arc::new(InMemoryTestNative::new().with_failure(
        NativeOp::Prepare,
        NativeFailure::code(-1),
    ));
    let mut conn = connect(&native, DriverConfig::default());
    let err = conn.prepare("SELEC oops").unwrap_err();
    assert_eq!(err.code(), -1);
    assert_eq!(conn.last_error().unwrap().message, "Unknown Error");
}
