//! Asynchronous query execution: lifecycle, polling, result assembly.

pub mod assembler;
pub mod error;
pub mod lifecycle;
pub mod poller;
pub mod request;
pub mod result;

pub use error::QueryError;
pub use lifecycle::{QueryHandle, QueryLifecycle, TerminalKind, TerminalStatus, WaitOutcome};
pub use poller::PollSettings;
pub use request::QueryRequest;
pub use result::{CellValue, ColumnDescriptor, ColumnType, QueryResult};
