//! cubrid-dbd - A database driver adapter over the CUBRID native client library
//!
//! The native library is reached through the [`NativeClient`] trait. Connections and
//! statements wrap its integer handles, translate its status codes into [`DbdError`]
//! values and decode result rows into [`SqlValue`]s.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use cubrid_dbd::drivers::{InMemoryTestNative, InMemoryTestResponseBuilder};
//! use cubrid_dbd::types::CCI_U_TYPE_STRING;
//! use cubrid_dbd::{Driver, Fetched, SqlValue};
//!
//! let native = Arc::new(InMemoryTestNative::new().with_response(
//!     "SELECT name FROM athlete WHERE code = ?",
//!     InMemoryTestResponseBuilder::select()
//!         .column("name", CCI_U_TYPE_STRING)
//!         .row(["Nam Hyun-Hee"])
//!         .build(),
//! ));
//! let driver = Driver::initialize(native);
//!
//! let mut conn = driver.connect("cci:CUBRID:localhost:33000:demodb:::", "dba", "")?;
//! let mut stmt = conn.prepare("SELECT name FROM athlete WHERE code = ?")?;
//! stmt.bind(1, 10999)?;
//! stmt.execute()?;
//!
//! while let Fetched::Row(row) = stmt.fetch_next()? {
//!     assert_eq!(row.get_named("name"), Some(&SqlValue::Text("Nam Hyun-Hee".into())));
//! }
//! stmt.destroy();
//! conn.disconnect()?;
//! # Ok::<(), cubrid_dbd::DbdError>(())
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod traits;
pub mod translate;
pub mod types;

mod connection;
mod decode;
mod driver;
mod handle;
mod statement;

// Re-export main types for convenient access
pub use config::{ConnectOptions, DriverConfig, FloatDecode, LookaheadPolicy};
pub use connection::Connection;
pub use driver::Driver;
pub use error::{DbdError, ErrorDetail, Result};
pub use handle::HandleState;
pub use statement::{RowIter, Statement};
pub use traits::NativeClient;
pub use types::{ColumnDescriptor, CommandKind, Fetched, QueryResult, Row, SqlValue};
