use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Runtime;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, warn};

use crate::traits::{
    CursorOrigin, DataTarget, NativeCell, NativeClient, NativeColumnInfo, NativeData,
    NativeErrorDetail, NativeFailure, NativeResult, NativeResultInfo, TranType, CCI_ER_BIND_INDEX,
    CCI_ER_CONNECT, CCI_ER_CON_HANDLE, CCI_ER_DBMS, CCI_ER_INVALID_URL, CCI_ER_NO_MORE_DATA,
    CCI_ER_REQ_HANDLE, CCI_ER_TYPE_CONVERSION,
};
use crate::types::{
    CCI_U_TYPE_BIGINT, CCI_U_TYPE_CHAR, CCI_U_TYPE_DATE, CCI_U_TYPE_DOUBLE, CCI_U_TYPE_FLOAT,
    CCI_U_TYPE_INT, CCI_U_TYPE_NUMERIC, CCI_U_TYPE_SHORT, CCI_U_TYPE_STRING, CCI_U_TYPE_TIME,
    CCI_U_TYPE_TIMESTAMP, CCI_U_TYPE_UNKNOWN, CUBRID_STMT_CALL, CUBRID_STMT_DELETE,
    CUBRID_STMT_INSERT, CUBRID_STMT_SELECT, CUBRID_STMT_UPDATE,
};

/// Statement type reported for anything that is not a query or DML.
const STMT_OTHER: i32 = 0;

const URL_PREFIX: &str = "cci:CUBRID:";

const LASTVAL_SAVEPOINT: &str = "SAVEPOINT cubrid_dbd_lastval";

struct PgConnection {
    client: Client,
    autocommit: bool,
    in_transaction: bool,
}

struct PgRequest {
    conn: i32,
    statement: tokio_postgres::Statement,
    statement_type: i32,
    binds: Vec<Option<String>>,
    executed: bool,
    rows: Vec<Row>,
    /// 0 is before the first row, `rows.len() + 1` after the last.
    position: i64,
    fetched: Option<usize>,
}

#[derive(Default)]
struct State {
    next_handle: i32,
    connections: HashMap<i32, Arc<Mutex<PgConnection>>>,
    requests: HashMap<i32, PgRequest>,
}

/// Native client library backed by a PostgreSQL server through tokio-postgres.
///
/// Every call blocks on an owned runtime, so it must not be used from inside an async
/// context. Queries are buffered in full at execute; the cursor then walks the buffer.
///
/// The handle maps sit behind one short-lived lock; each session has its own lock, held
/// for the duration of a server round-trip, so a slow query only blocks its own
/// connection.
///
/// Columns of types without a text decoding here (NUMERIC, DATE, TIMESTAMP and the
/// like) are described with their native type tag but must be cast to text in SQL to
/// be read.
pub struct TokioPostgresNative {
    runtime: Runtime,
    state: Mutex<State>,
}

impl TokioPostgresNative {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            runtime: Runtime::new()?,
            state: Mutex::new(State {
                next_handle: 1,
                ..State::default()
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Session behind a connection handle. The state lock is released on return.
    fn session(&self, conn: i32) -> NativeResult<Arc<Mutex<PgConnection>>> {
        self.lock()
            .connections
            .get(&conn)
            .cloned()
            .ok_or(NativeFailure::code(CCI_ER_CON_HANDLE))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves plain data behind; keep using it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Statement that closes the `lastval()` savepoint. A failed lookup has aborted the
/// transaction, so it is rolled back to the savepoint first.
fn lastval_release(failed: bool) -> &'static str {
    if failed {
        "ROLLBACK TO SAVEPOINT cubrid_dbd_lastval; RELEASE SAVEPOINT cubrid_dbd_lastval"
    } else {
        "RELEASE SAVEPOINT cubrid_dbd_lastval"
    }
}

/// Split `cci:CUBRID:<host>:<port>:<db>:::[?props]` into a tokio-postgres config.
fn parse_url(url: &str, user: &str, password: &str) -> NativeResult<tokio_postgres::Config> {
    let invalid = || NativeFailure::code(CCI_ER_INVALID_URL);
    let rest = url.strip_prefix(URL_PREFIX).ok_or_else(invalid)?;
    let (location, properties) = match rest.split_once('?') {
        Some((location, properties)) => (location, Some(properties)),
        None => (rest, None),
    };

    let mut parts = location.split(':');
    let host = parts.next().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
    let port: u16 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let database = parts.next().filter(|d| !d.is_empty()).ok_or_else(invalid)?;

    let mut config = tokio_postgres::Config::new();
    config.host(host).port(port).dbname(database).user(user);
    if !password.is_empty() {
        config.password(password);
    }

    for property in properties.into_iter().flat_map(|p| p.split('&')) {
        match property.split_once('=') {
            Some(("login_timeout", ms)) => {
                let ms: u64 = ms.parse().map_err(|_| invalid())?;
                config.connect_timeout(std::time::Duration::from_millis(ms));
            }
            Some(("application_name", name)) => {
                config.application_name(name);
            }
            _ => debug!(property, "ignoring connection property"),
        }
    }
    Ok(config)
}

fn dbms_failure(error: &tokio_postgres::Error) -> NativeFailure {
    let message = match error.as_db_error() {
        Some(db) => format!("{} (SQLSTATE {})", db.message(), db.code().code()),
        None => error.to_string(),
    };
    NativeFailure::with_detail(CCI_ER_DBMS, NativeErrorDetail::new(CCI_ER_DBMS, message))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted,
}

/// Rewrite `?` placeholders into PostgreSQL's `$1, $2, ...`, leaving quoted text,
/// dollar-quoted bodies and comments untouched.
pub(crate) fn rewrite_placeholders(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut state = Scan::Normal;
    let mut dollar_tag = "";
    let mut copied = 0;
    let mut n = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            Scan::Normal => match b {
                b'?' => {
                    n += 1;
                    out.push_str(&sql[copied..i]);
                    out.push_str(&format!("${n}"));
                    copied = i + 1;
                }
                b'\'' => state = Scan::SingleQuoted,
                b'"' => state = Scan::DoubleQuoted,
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    state = Scan::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = Scan::BlockComment(1);
                    i += 1;
                }
                b'$' => {
                    if let Some(end) = dollar_tag_end(bytes, i) {
                        dollar_tag = &sql[i..=end];
                        state = Scan::DollarQuoted;
                        i = end;
                    }
                }
                _ => {}
            },
            Scan::SingleQuoted if b == b'\'' => state = Scan::Normal,
            Scan::DoubleQuoted if b == b'"' => state = Scan::Normal,
            Scan::LineComment if b == b'\n' => state = Scan::Normal,
            Scan::BlockComment(depth) => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        Scan::Normal
                    } else {
                        Scan::BlockComment(depth - 1)
                    };
                    i += 1;
                } else if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
                    state = Scan::BlockComment(depth + 1);
                    i += 1;
                }
            }
            Scan::DollarQuoted if bytes[i..].starts_with(dollar_tag.as_bytes()) => {
                i += dollar_tag.len() - 1;
                state = Scan::Normal;
            }
            _ => {}
        }
        i += 1;
    }

    out.push_str(&sql[copied..]);
    out
}

/// Index of the closing `$` of a dollar-quote tag opening at `start`.
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphabetic() || b == b'_' || (idx > start + 1 && b.is_ascii_digit())) {
            return None;
        }
        idx += 1;
    }
    (idx < bytes.len()).then_some(idx)
}

/// Native statement type from the leading keyword; row-returning statements count as
/// queries.
fn statement_type(sql: &str, returns_rows: bool) -> i32 {
    let keyword = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    match keyword.as_str() {
        "INSERT" => CUBRID_STMT_INSERT,
        "UPDATE" => CUBRID_STMT_UPDATE,
        "DELETE" => CUBRID_STMT_DELETE,
        "CALL" => CUBRID_STMT_CALL,
        _ if returns_rows => CUBRID_STMT_SELECT,
        _ => STMT_OTHER,
    }
}

/// Native type tag for a PostgreSQL column type.
pub(crate) fn type_tag(ty: &Type) -> i32 {
    match *ty {
        Type::INT2 | Type::BOOL => CCI_U_TYPE_SHORT,
        Type::INT4 => CCI_U_TYPE_INT,
        Type::INT8 => CCI_U_TYPE_BIGINT,
        Type::FLOAT4 => CCI_U_TYPE_FLOAT,
        Type::FLOAT8 => CCI_U_TYPE_DOUBLE,
        Type::NUMERIC => CCI_U_TYPE_NUMERIC,
        Type::DATE => CCI_U_TYPE_DATE,
        Type::TIME => CCI_U_TYPE_TIME,
        Type::TIMESTAMP | Type::TIMESTAMPTZ => CCI_U_TYPE_TIMESTAMP,
        Type::BPCHAR | Type::CHAR => CCI_U_TYPE_CHAR,
        Type::TEXT | Type::VARCHAR | Type::NAME | Type::UNKNOWN => CCI_U_TYPE_STRING,
        _ => CCI_U_TYPE_UNKNOWN,
    }
}

type BoxedParam = Box<dyn ToSql + Sync + Send>;

fn conversion_failure(message: String) -> NativeFailure {
    NativeFailure::with_detail(
        CCI_ER_TYPE_CONVERSION,
        NativeErrorDetail::new(CCI_ER_TYPE_CONVERSION, message),
    )
}

fn parsed<T>(text: Option<&str>, ty: &Type) -> NativeResult<BoxedParam>
where
    T: std::str::FromStr + ToSql + Sync + Send + 'static,
{
    let value = text
        .map(|t| t.trim().parse::<T>())
        .transpose()
        .map_err(|_| conversion_failure(format!("cannot bind {:?} as {}", text, ty.name())))?;
    Ok(Box::new(value))
}

/// Coerce a text bind into the parameter type the server declared.
fn coerce_param(text: Option<&str>, ty: &Type) -> NativeResult<BoxedParam> {
    match *ty {
        Type::INT2 => parsed::<i16>(text, ty),
        Type::INT4 => parsed::<i32>(text, ty),
        Type::INT8 => parsed::<i64>(text, ty),
        Type::FLOAT4 => parsed::<f32>(text, ty),
        Type::FLOAT8 => parsed::<f64>(text, ty),
        Type::BOOL => {
            let value = text
                .map(|t| match t.trim() {
                    "1" | "t" | "true" | "TRUE" => Ok(true),
                    "0" | "f" | "false" | "FALSE" => Ok(false),
                    _ => Err(conversion_failure(format!("cannot bind {t:?} as bool"))),
                })
                .transpose()?;
            Ok(Box::new(value))
        }
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            Ok(Box::new(text.map(str::to_string)))
        }
        _ => Err(conversion_failure(format!(
            "parameter type {} is not bindable from text",
            ty.name()
        ))),
    }
}

enum PgValue {
    Int(i64),
    Float(f64),
    Text(String),
}

fn read_value(row: &Row, idx: usize) -> NativeResult<Option<PgValue>> {
    let ty = row
        .columns()
        .get(idx)
        .map(|c| c.type_().clone())
        .ok_or(NativeFailure::code(CCI_ER_NO_MORE_DATA))?;
    let failed = |e: tokio_postgres::Error| conversion_failure(e.to_string());

    let value = match ty {
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(failed)?.map(|v| PgValue::Int(v.into())),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(failed)?.map(|v| PgValue::Int(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(failed)?.map(PgValue::Int),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(failed)?
            .map(|v| PgValue::Int(i64::from(v))),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(failed)?.map(|v| PgValue::Float(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(failed)?.map(PgValue::Float),
        _ => row.try_get::<_, Option<String>>(idx).map_err(failed)?.map(PgValue::Text),
    };
    Ok(value)
}

fn convert(value: PgValue, target: DataTarget) -> NativeResult<NativeData> {
    let overflow = || NativeFailure::code(CCI_ER_TYPE_CONVERSION);
    let data = match (value, target) {
        (PgValue::Int(v), DataTarget::Int) => NativeData::Int(i32::try_from(v).map_err(|_| overflow())?),
        (PgValue::Int(v), DataTarget::Double) => NativeData::Double(v as f64),
        (PgValue::Int(v), DataTarget::Str) => NativeData::Str(v.to_string()),
        (PgValue::Float(v), DataTarget::Int) => NativeData::Int(v as i32),
        (PgValue::Float(v), DataTarget::Double) => NativeData::Double(v),
        (PgValue::Float(v), DataTarget::Str) => NativeData::Str(v.to_string()),
        (PgValue::Text(s), DataTarget::Int) => NativeData::Int(s.trim().parse().map_err(|_| overflow())?),
        (PgValue::Text(s), DataTarget::Double) => NativeData::Double(s.trim().parse().map_err(|_| overflow())?),
        (PgValue::Text(s), DataTarget::Str) => NativeData::Str(s),
    };
    Ok(data)
}

impl NativeClient for TokioPostgresNative {
    fn connect_with_url(&self, url: &str, user: &str, password: &str) -> NativeResult<i32> {
        let config = parse_url(url, user, password)?;
        let client = self.runtime.block_on(async {
            let (client, connection) = config.connect(NoTls).await?;

            // Spawn the connection handler
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    warn!(error = %e, "PostgreSQL connection error");
                }
            });
            Ok::<_, tokio_postgres::Error>(client)
        });
        let client = client.map_err(|e| {
            let failure = dbms_failure(&e);
            if e.as_db_error().is_some() {
                failure
            } else {
                NativeFailure::with_detail(
                    CCI_ER_CONNECT,
                    NativeErrorDetail::new(CCI_ER_CONNECT, e.to_string()),
                )
            }
        })?;

        let mut state = self.lock();
        let handle = state.next_handle;
        state.next_handle += 1;
        state.connections.insert(
            handle,
            Arc::new(Mutex::new(PgConnection {
                client,
                autocommit: true,
                in_transaction: false,
            })),
        );
        debug!(handle, "postgres session opened");
        Ok(handle)
    }

    fn end_tran(&self, conn: i32, tran: TranType) -> NativeResult<()> {
        let session = self.session(conn)?;
        let mut connection = lock(&session);
        if !connection.in_transaction {
            return Ok(());
        }
        let sql = match tran {
            TranType::Commit => "COMMIT",
            TranType::Rollback => "ROLLBACK",
        };
        connection.in_transaction = false;
        self.runtime
            .block_on(connection.client.batch_execute(sql))
            .map_err(|e| dbms_failure(&e))
    }

    fn disconnect(&self, conn: i32) -> NativeResult<()> {
        let mut state = self.lock();
        if state.connections.remove(&conn).is_none() {
            return Err(NativeFailure::code(CCI_ER_CON_HANDLE));
        }
        state.requests.retain(|_, r| r.conn != conn);
        debug!(handle = conn, "postgres session closed");
        Ok(())
    }

    fn set_autocommit(&self, conn: i32, enabled: bool) -> NativeResult<()> {
        let session = self.session(conn)?;
        let mut connection = lock(&session);
        if enabled && connection.in_transaction {
            connection.in_transaction = false;
            self.runtime
                .block_on(connection.client.batch_execute("COMMIT"))
                .map_err(|e| dbms_failure(&e))?;
        }
        connection.autocommit = enabled;
        Ok(())
    }

    fn last_insert_id(&self, conn: i32) -> NativeResult<Option<String>> {
        let session = self.session(conn)?;
        let connection = lock(&session);
        let client = &connection.client;

        // Inside a transaction the lookup error would abort it; fence it off.
        let fenced = connection.in_transaction;
        if fenced {
            self.runtime
                .block_on(client.batch_execute(LASTVAL_SAVEPOINT))
                .map_err(|e| dbms_failure(&e))?;
        }
        let outcome = self
            .runtime
            .block_on(client.query_one("SELECT lastval()::text", &[]));
        if fenced {
            self.runtime
                .block_on(client.batch_execute(lastval_release(outcome.is_err())))
                .map_err(|e| dbms_failure(&e))?;
        }

        match outcome {
            Ok(row) => row.try_get(0).map_err(|e| dbms_failure(&e)),
            Err(e) if e.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) => Ok(None),
            Err(e) => Err(dbms_failure(&e)),
        }
    }

    fn prepare(&self, conn: i32, sql: &str) -> NativeResult<i32> {
        let session = self.session(conn)?;
        let statement = {
            let connection = lock(&session);
            self.runtime
                .block_on(connection.client.prepare(&rewrite_placeholders(sql)))
                .map_err(|e| dbms_failure(&e))?
        };

        let statement_type = statement_type(sql, !statement.columns().is_empty());
        let binds = vec![None; statement.params().len()];
        let mut state = self.lock();
        if !state.connections.contains_key(&conn) {
            return Err(NativeFailure::code(CCI_ER_CON_HANDLE));
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        state.requests.insert(
            handle,
            PgRequest {
                conn,
                statement,
                statement_type,
                binds,
                executed: false,
                rows: Vec::new(),
                position: 0,
                fetched: None,
            },
        );
        Ok(handle)
    }

    fn bind_count(&self, req: i32) -> NativeResult<usize> {
        let state = self.lock();
        state
            .requests
            .get(&req)
            .map(|r| r.binds.len())
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))
    }

    fn bind_param(&self, req: i32, index: usize, value: Option<&str>) -> NativeResult<()> {
        let mut state = self.lock();
        let request = state
            .requests
            .get_mut(&req)
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))?;
        let slot = index
            .checked_sub(1)
            .and_then(|i| request.binds.get_mut(i))
            .ok_or(NativeFailure::code(CCI_ER_BIND_INDEX))?;
        *slot = value.map(str::to_string);
        Ok(())
    }

    fn execute(&self, req: i32) -> NativeResult<i64> {
        let (conn, statement, statement_type, binds) = {
            let mut state = self.lock();
            let request = state
                .requests
                .get_mut(&req)
                .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))?;
            request.executed = false;
            request.rows.clear();
            request.position = 0;
            request.fetched = None;
            (
                request.conn,
                request.statement.clone(),
                request.statement_type,
                request.binds.clone(),
            )
        };

        let params: Vec<BoxedParam> = binds
            .iter()
            .zip(statement.params())
            .map(|(text, ty)| coerce_param(text.as_deref(), ty))
            .collect::<NativeResult<_>>()?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let session = self.session(conn)?;
        let (count, rows) = {
            let mut connection = lock(&session);
            if !connection.autocommit && !connection.in_transaction {
                self.runtime
                    .block_on(connection.client.batch_execute("BEGIN"))
                    .map_err(|e| dbms_failure(&e))?;
                connection.in_transaction = true;
            }

            let client = &connection.client;
            if statement_type == CUBRID_STMT_SELECT {
                let rows = self
                    .runtime
                    .block_on(client.query(&statement, &param_refs))
                    .map_err(|e| dbms_failure(&e))?;
                (rows.len() as i64, rows)
            } else {
                let affected = self
                    .runtime
                    .block_on(client.execute(&statement, &param_refs))
                    .map_err(|e| dbms_failure(&e))?;
                (affected as i64, Vec::new())
            }
        };

        let mut state = self.lock();
        let request = state
            .requests
            .get_mut(&req)
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))?;
        request.rows = rows;
        request.executed = true;
        Ok(count)
    }

    fn result_info(&self, req: i32) -> NativeResultInfo {
        let state = self.lock();
        match state.requests.get(&req) {
            Some(request) => NativeResultInfo {
                statement_type: request.statement_type,
                columns: Some(
                    request
                        .statement
                        .columns()
                        .iter()
                        .map(|c| NativeColumnInfo {
                            name: c.name().to_string(),
                            type_tag: type_tag(c.type_()),
                            scale: 0,
                            precision: 0,
                        })
                        .collect(),
                ),
            },
            None => NativeResultInfo {
                statement_type: STMT_OTHER,
                columns: None,
            },
        }
    }

    fn cursor(&self, req: i32, offset: i32, origin: CursorOrigin) -> NativeResult<()> {
        let mut state = self.lock();
        let request = state
            .requests
            .get_mut(&req)
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))?;
        if !request.executed {
            return Err(NativeFailure::code(CCI_ER_NO_MORE_DATA));
        }
        let len = request.rows.len() as i64;
        let target = match origin {
            CursorOrigin::First => i64::from(offset),
            CursorOrigin::Current => request.position + i64::from(offset),
            CursorOrigin::Last => len - i64::from(offset) + 1,
        };
        request.position = target.clamp(0, len + 1);
        if (1..=len).contains(&target) {
            Ok(())
        } else {
            Err(NativeFailure::code(CCI_ER_NO_MORE_DATA))
        }
    }

    fn fetch(&self, req: i32) -> NativeResult<()> {
        let mut state = self.lock();
        let request = state
            .requests
            .get_mut(&req)
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))?;
        if !(1..=request.rows.len() as i64).contains(&request.position) {
            return Err(NativeFailure::code(CCI_ER_NO_MORE_DATA));
        }
        request.fetched = Some((request.position - 1) as usize);
        Ok(())
    }

    fn get_data(&self, req: i32, index: usize, target: DataTarget) -> NativeResult<NativeCell> {
        let state = self.lock();
        let request = state
            .requests
            .get(&req)
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))?;
        let row = request
            .fetched
            .and_then(|i| request.rows.get(i))
            .ok_or(NativeFailure::code(CCI_ER_NO_MORE_DATA))?;
        let idx = index
            .checked_sub(1)
            .ok_or(NativeFailure::code(CCI_ER_NO_MORE_DATA))?;
        match read_value(row, idx)? {
            Some(value) => Ok(NativeCell::value(convert(value, target)?)),
            None => Ok(NativeCell::null(target)),
        }
    }

    fn close_req_handle(&self, req: i32) -> NativeResult<()> {
        let mut state = self.lock();
        state
            .requests
            .remove(&req)
            .map(|_| ())
            .ok_or(NativeFailure::code(CCI_ER_REQ_HANDLE))
    }

    fn error_message(&self, code: i32, detail: &NativeErrorDetail) -> Option<String> {
        let source = if code == CCI_ER_DBMS { "DBMS" } else { "CCI" };
        Some(format!("ERROR: {}, {}, {}", source, detail.err_code, detail.err_msg))
    }

    fn root_catalog(&self) -> &str {
        "pg_catalog.pg_database"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_placeholders() {
        assert_eq!(
            rewrite_placeholders("INSERT INTO t VALUES (?, ?)"),
            "INSERT INTO t VALUES ($1, $2)"
        );
        assert_eq!(
            rewrite_placeholders("SELECT '?', \"a?\", ? -- why?\nFROM t /* ? /* ? */ */ WHERE x = ?"),
            "SELECT '?', \"a?\", $1 -- why?\nFROM t /* ? /* ? */ */ WHERE x = $2"
        );
        assert_eq!(
            rewrite_placeholders("SELECT $tag$ ? $tag$, ?, $1"),
            "SELECT $tag$ ? $tag$, $1, $1"
        );
        assert_eq!(rewrite_placeholders("SELECT 'é?', ?"), "SELECT 'é?', $1");
    }

    #[test]
    fn test_type_tag_mapping() {
        assert_eq!(type_tag(&Type::INT4), CCI_U_TYPE_INT);
        assert_eq!(type_tag(&Type::INT2), CCI_U_TYPE_SHORT);
        assert_eq!(type_tag(&Type::INT8), CCI_U_TYPE_BIGINT);
        assert_eq!(type_tag(&Type::FLOAT8), CCI_U_TYPE_DOUBLE);
        assert_eq!(type_tag(&Type::VARCHAR), CCI_U_TYPE_STRING);
        assert_eq!(type_tag(&Type::BPCHAR), CCI_U_TYPE_CHAR);
        assert_eq!(type_tag(&Type::JSONB), CCI_U_TYPE_UNKNOWN);
    }

    #[test]
    fn test_statement_type() {
        assert_eq!(statement_type("  insert into t values (1)", false), CUBRID_STMT_INSERT);
        assert_eq!(statement_type("SELECT 1", true), CUBRID_STMT_SELECT);
        assert_eq!(statement_type("(SELECT 1)", true), CUBRID_STMT_SELECT);
        assert_eq!(statement_type("CREATE TABLE t (a int)", false), STMT_OTHER);
    }

    #[test]
    fn test_parse_url() {
        let config = parse_url(
            "cci:CUBRID:db.internal:5432:shop:::?login_timeout=250",
            "dba",
            "",
        )
        .unwrap();
        assert_eq!(config.get_dbname(), Some("shop"));
        assert_eq!(config.get_ports(), &[5432]);
        assert_eq!(config.get_user(), Some("dba"));
        assert_eq!(
            config.get_connect_timeout(),
            Some(&std::time::Duration::from_millis(250))
        );

        let err = parse_url("postgres://localhost/db", "", "").unwrap_err();
        assert_eq!(err.code, CCI_ER_INVALID_URL);
        let err = parse_url("cci:CUBRID:host:notaport:db:::", "", "").unwrap_err();
        assert_eq!(err.code, CCI_ER_INVALID_URL);
    }

    #[test]
    fn test_coerce_param_rejects_bad_text() {
        let err = coerce_param(Some("abc"), &Type::INT4).err().unwrap();
        assert_eq!(err.code, CCI_ER_TYPE_CONVERSION);
        assert!(coerce_param(None, &Type::INT4).is_ok());
        assert!(coerce_param(Some(" 42 "), &Type::INT8).is_ok());
        assert!(coerce_param(Some("1"), &Type::BOOL).is_ok());
    }

    #[test]
    fn test_lastval_release_restores_after_failed_lookup() {
        assert_eq!(lastval_release(false), "RELEASE SAVEPOINT cubrid_dbd_lastval");
        let restore = lastval_release(true);
        assert!(restore.starts_with("ROLLBACK TO SAVEPOINT cubrid_dbd_lastval;"));
        assert!(restore.ends_with("RELEASE SAVEPOINT cubrid_dbd_lastval"));
        assert!(LASTVAL_SAVEPOINT.ends_with("cubrid_dbd_lastval"));
    }

    #[test]
    fn test_unknown_handles_fail_without_server() {
        let native = TokioPostgresNative::new().unwrap();
        assert_eq!(native.end_tran(7, TranType::Commit).unwrap_err().code, CCI_ER_CON_HANDLE);
        assert_eq!(native.set_autocommit(7, false).unwrap_err().code, CCI_ER_CON_HANDLE);
        assert_eq!(native.last_insert_id(7).unwrap_err().code, CCI_ER_CON_HANDLE);
        assert_eq!(native.prepare(7, "SELECT 1").unwrap_err().code, CCI_ER_CON_HANDLE);
        assert_eq!(native.execute(3).unwrap_err().code, CCI_ER_REQ_HANDLE);
        assert_eq!(native.disconnect(7).unwrap_err().code, CCI_ER_CON_HANDLE);
    }
}
