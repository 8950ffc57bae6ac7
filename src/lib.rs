//! `driver-results` is the result-consumption layer of a SQL client driver.
//!
//! It owns everything one statement execution produces, from the moment
//! the command is sent until every sub-result has been read or discarded:
//! - [`ExecutionResults`] records update counts, errors and row sets in
//!   server order and walks the caller through them
//! - [`CommandOutcome`] aggregates single, batch and multi-statement stats
//! - [`ExecutionResults::generated_keys`] projects auto-increment ids
//!
//! The wire protocol and row decoding are plugged in through the
//! [`Protocol`] and [`RowSet`] traits.

mod error;
mod keys;
mod options;
mod outcome;
mod pending;
mod protocol;
mod results;
mod types;
mod value;

pub use error::{DriverError, ExceptionFactory};
pub use options::{CloseBehavior, Concurrency, ExecutionOptions, GeneratedKeysMode, ScrollType};
pub use outcome::{
    BatchOutcome, CommandOutcome, MultipleOutcome, OutcomeKind, SingleOutcome, StatEntry,
    EXECUTE_FAILED, RESULT_SET_VALUE, SUCCESS_NO_INFO,
};
pub use pending::PendingResults;
pub use protocol::{
    lock_protocol, Protocol, ProtocolHandle, RowSet, ServerPrepareResult, StatementHandle,
};
pub use results::ExecutionResults;
pub use types::{Col, GeneratedKeys};
pub use value::Value;

pub type Result<T> = std::result::Result<T, DriverError>;
