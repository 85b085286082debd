//! Per-column decoding of the row under the native cursor.

use crate::config::FloatDecode;
use crate::error::{DbdError, Result};
use crate::translate::native_error;
use crate::traits::{DataTarget, NativeClient, NativeData};
use crate::types::{ColumnDescriptor, DecodeFamily, SqlValue};

/// Decode every column of the fetched row, in order.
///
/// The first failing column aborts the row; nothing decoded so far is returned.
pub(crate) fn decode_row(
    native: &dyn NativeClient,
    req: i32,
    columns: &[ColumnDescriptor],
    float_decode: FloatDecode,
) -> Result<Vec<SqlValue>> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| decode_column(native, req, i + 1, col, float_decode))
        .collect()
}

fn decode_column(
    native: &dyn NativeClient,
    req: i32,
    index: usize,
    column: &ColumnDescriptor,
    float_decode: FloatDecode,
) -> Result<SqlValue> {
    let family = column.decode_family();
    let target = match family {
        DecodeFamily::Integer => DataTarget::Int,
        DecodeFamily::Float => DataTarget::Double,
        DecodeFamily::Text => DataTarget::Str,
    };

    let cell = native
        .get_data(req, index, target)
        .map_err(|failure| native_error(native, &failure))?;

    // NULL wins over whatever the accessor left in the value slot.
    if cell.is_null() {
        return Ok(SqlValue::Null);
    }

    match (family, cell.data) {
        (DecodeFamily::Integer, NativeData::Int(n)) => Ok(SqlValue::Int32(n)),
        (DecodeFamily::Float, NativeData::Double(d)) => Ok(match float_decode {
            FloatDecode::Exact => SqlValue::Double(d),
            FloatDecode::TruncateUnsigned => SqlValue::Int64(truncate_unsigned(d)),
        }),
        (DecodeFamily::Text, NativeData::Str(s)) => Ok(SqlValue::Text(s)),
        _ => Err(DbdError::CannotFetchData { column: index }),
    }
}

/// Double to unsigned integer, saturating; negative and NaN become 0.
fn truncate_unsigned(d: f64) -> i64 {
    i64::try_from(d as u64).unwrap_or(i64::MAX)
}
