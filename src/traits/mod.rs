mod native;

pub use native::{
    CursorOrigin, DataTarget, NativeCell, NativeClient, NativeColumnInfo, NativeData,
    NativeErrorDetail, NativeFailure, NativeResult, NativeResultInfo, TranType,
    CCI_ER_BIND_INDEX, CCI_ER_CONNECT, CCI_ER_CON_HANDLE, CCI_ER_DBMS, CCI_ER_INVALID_URL,
    CCI_ER_NO_MORE_DATA, CCI_ER_REQ_HANDLE, CCI_ER_TYPE_CONVERSION,
};
