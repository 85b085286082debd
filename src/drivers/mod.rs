mod tokio_postgres;

pub use self::in_memory_test::{
    InMemoryTestNative, InMemoryTestResponse, InMemoryTestResponseBuilder, NativeOp, RecordedCall,
    TestCell,
};
pub use self::tokio_postgres::TokioPostgresNative;
