use crate::traits::NativeColumnInfo;

pub const CCI_U_TYPE_UNKNOWN: i32 = 0;
pub const CCI_U_TYPE_CHAR: i32 = 1;
pub const CCI_U_TYPE_STRING: i32 = 2;
pub const CCI_U_TYPE_NCHAR: i32 = 3;
pub const CCI_U_TYPE_VARNCHAR: i32 = 4;
pub const CCI_U_TYPE_BIT: i32 = 5;
pub const CCI_U_TYPE_VARBIT: i32 = 6;
pub const CCI_U_TYPE_NUMERIC: i32 = 7;
pub const CCI_U_TYPE_INT: i32 = 8;
pub const CCI_U_TYPE_SHORT: i32 = 9;
pub const CCI_U_TYPE_MONETARY: i32 = 10;
pub const CCI_U_TYPE_FLOAT: i32 = 11;
pub const CCI_U_TYPE_DOUBLE: i32 = 12;
pub const CCI_U_TYPE_DATE: i32 = 13;
pub const CCI_U_TYPE_TIME: i32 = 14;
pub const CCI_U_TYPE_TIMESTAMP: i32 = 15;
pub const CCI_U_TYPE_BIGINT: i32 = 21;
pub const CCI_U_TYPE_DATETIME: i32 = 22;

pub const CUBRID_STMT_INSERT: i32 = 20;
pub const CUBRID_STMT_SELECT: i32 = 21;
pub const CUBRID_STMT_UPDATE: i32 = 22;
pub const CUBRID_STMT_DELETE: i32 = 23;
pub const CUBRID_STMT_CALL: i32 = 24;

/// How a column is read back from the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFamily {
    /// Narrow and standard integers, read through the integer accessor.
    Integer,
    /// Single and double precision, read through the double accessor.
    Float,
    /// Everything else, read as text.
    Text,
}

impl DecodeFamily {
    pub fn for_type_tag(type_tag: i32) -> Self {
        match type_tag {
            CCI_U_TYPE_INT | CCI_U_TYPE_SHORT => DecodeFamily::Integer,
            CCI_U_TYPE_FLOAT | CCI_U_TYPE_DOUBLE => DecodeFamily::Float,
            _ => DecodeFamily::Text,
        }
    }
}

/// Classification of a prepared statement, as reported after execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Not executed yet, or destroyed.
    Unknown,
    Select,
    Insert,
    Update,
    Delete,
    Call,
    Other(i32),
}

impl CommandKind {
    pub fn from_native(statement_type: i32) -> Self {
        match statement_type {
            CUBRID_STMT_SELECT => CommandKind::Select,
            CUBRID_STMT_INSERT => CommandKind::Insert,
            CUBRID_STMT_UPDATE => CommandKind::Update,
            CUBRID_STMT_DELETE => CommandKind::Delete,
            CUBRID_STMT_CALL => CommandKind::Call,
            other => CommandKind::Other(other),
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, CommandKind::Select)
    }

    /// Whether the native execute return value is a meaningful affected-row count.
    pub fn reports_affected_rows(&self) -> bool {
        matches!(
            self,
            CommandKind::Insert | CommandKind::Update | CommandKind::Delete | CommandKind::Call
        )
    }
}

/// Metadata for one result column. Immutable once read from the native library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    type_tag: i32,
    scale: i32,
    precision: i32,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_tag: i32, scale: i32, precision: i32) -> Self {
        Self {
            name: name.into(),
            type_tag,
            scale,
            precision,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> i32 {
        self.type_tag
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    /// Nullability as the driver has always reported it: the precision field.
    ///
    /// The native not-null flag is not consulted.
    pub fn nullable(&self) -> i32 {
        self.precision
    }

    pub fn decode_family(&self) -> DecodeFamily {
        DecodeFamily::for_type_tag(self.type_tag)
    }
}

impl From<NativeColumnInfo> for ColumnDescriptor {
    fn from(info: NativeColumnInfo) -> Self {
        Self::new(info.name, info.type_tag, info.scale, info.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_family() {
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_INT), DecodeFamily::Integer);
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_SHORT), DecodeFamily::Integer);
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_FLOAT), DecodeFamily::Float);
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_DOUBLE), DecodeFamily::Float);
        // BIGINT and NUMERIC go through the string accessor.
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_BIGINT), DecodeFamily::Text);
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_NUMERIC), DecodeFamily::Text);
        assert_eq!(DecodeFamily::for_type_tag(CCI_U_TYPE_UNKNOWN), DecodeFamily::Text);
    }

    #[test]
    fn test_command_kind() {
        assert_eq!(CommandKind::from_native(21), CommandKind::Select);
        assert_eq!(CommandKind::from_native(24), CommandKind::Call);
        assert_eq!(CommandKind::from_native(4), CommandKind::Other(4));
        assert!(CommandKind::Delete.reports_affected_rows());
        assert!(!CommandKind::Select.reports_affected_rows());
        assert!(!CommandKind::Other(4).reports_affected_rows());
    }

    #[test]
    fn test_nullable_mirrors_precision() {
        let col = ColumnDescriptor::new("id", CCI_U_TYPE_INT, 0, 10);
        assert_eq!(col.nullable(), col.precision());
    }
}
