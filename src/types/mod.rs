mod column;
mod row;
mod sql_value;

pub use column::*;
pub use row::{Fetched, QueryResult, Row};
pub use sql_value::SqlValue;
