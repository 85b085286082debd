/// Represents a column or parameter value in a driver-agnostic way.
/// Decoded rows hold these; binds are converted to text before reaching the native layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Bool(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Character form handed to the native bind call. `None` is SQL NULL.
    pub fn to_bind_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Int32(i) => Some(i.to_string()),
            SqlValue::Int64(i) => Some(i.to_string()),
            SqlValue::Double(d) => Some(d.to_string()),
            SqlValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int32(i) => Some(i64::from(*i)),
            SqlValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Double(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_text() {
        assert_eq!(SqlValue::from("x").to_bind_text().as_deref(), Some("x"));
        assert_eq!(SqlValue::from(42).to_bind_text().as_deref(), Some("42"));
        assert_eq!(SqlValue::from(-7_i64).to_bind_text().as_deref(), Some("-7"));
        assert_eq!(SqlValue::from(1.5).to_bind_text().as_deref(), Some("1.5"));
        assert_eq!(SqlValue::from(true).to_bind_text().as_deref(), Some("1"));
        assert_eq!(SqlValue::from(None::<i32>).to_bind_text(), None);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(SqlValue::Int32(2).as_i64(), Some(2));
        assert_eq!(SqlValue::Text("a".into()).as_str(), Some("a"));
        assert_eq!(SqlValue::Text("a".into()).as_i64(), None);
        assert!(SqlValue::Null.is_null());
    }
}
