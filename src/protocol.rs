//! Seams to the wire protocol and to row-set implementations.
//!
//! Neither the byte-level protocol nor the row decoding lives in this
//! crate. [`Protocol`] and [`RowSet`] describe what the result state
//! machine needs from them.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{DriverError, ExceptionFactory, ExecutionResults, Result};

/// One server-produced result set.
pub trait RowSet: Send {
    /// Discards the rows still on the wire and releases the row set.
    fn close(&mut self) -> Result<()>;

    /// Marks the row set aborted without touching the wire.
    ///
    /// Called while the connection is being torn down, so it must not
    /// fail even if the socket is already gone.
    fn abort(&mut self);

    /// Reads every remaining row into memory.
    fn fetch_remaining(&mut self) -> Result<()>;

    fn is_fully_loaded(&self) -> bool;

    /// True for the output-parameter row set of a stored procedure call.
    fn is_callable_result(&self) -> bool {
        false
    }
}

/// The wire protocol collaborator.
///
/// Implementations report each sub-result they decode back into the
/// [`ExecutionResults`] passed in, through
/// [`ExecutionResults::record_success`], [`ExecutionResults::record_error`]
/// or [`ExecutionResults::record_result_set`].
pub trait Protocol: Send {
    /// Whether the server announced further sub-results for the running command.
    fn has_more_results(&self) -> bool;

    /// Skips past the current sub-result to the next one on the wire.
    fn move_to_next_result(
        &mut self,
        results: &mut ExecutionResults,
        prepared: Option<&ServerPrepareResult>,
    ) -> Result<()>;

    /// Reads the next sub-result and records it into `results`.
    fn read_result(
        &mut self,
        results: &mut ExecutionResults,
        prepared: Option<&ServerPrepareResult>,
    ) -> Result<()>;

    /// Drops the protocol's reservation for an in-progress streaming result.
    fn remove_active_streaming_result(&mut self);
}

/// Connection-wide protocol handle.
///
/// The mutex is the connection's lock, not a per-result lock: every
/// [`ExecutionResults`] created on the same connection shares it, so
/// sub-result transitions of different statements serialize against
/// each other.
///
/// `std::sync::Mutex` is not reentrant. Dropping an [`ExecutionResults`]
/// that still owns its statement takes this lock to drain the wire, so a
/// thread already holding the guard must call
/// [`ExecutionResults::materialize_all`] and [`ExecutionResults::close`]
/// itself before letting the results go.
pub type ProtocolHandle = Arc<Mutex<dyn Protocol>>;

/// Acquires the connection lock.
pub fn lock_protocol(
    protocol: &ProtocolHandle,
) -> Result<MutexGuard<'_, dyn Protocol + 'static>> {
    protocol
        .lock()
        .map_err(|_| DriverError::ConnectionClosed("connection lock poisoned".to_owned()))
}

/// Metadata of a server-side prepared statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerPrepareResult {
    pub statement_id: u32,
}

/// The statement that owns an execution.
#[derive(Clone)]
pub struct StatementHandle {
    protocol: ProtocolHandle,
    max_field_size: u32,
    prepared: Option<Arc<ServerPrepareResult>>,
    exceptions: ExceptionFactory,
}

impl fmt::Debug for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementHandle")
            .field("protocol", &"<Protocol>")
            .field("max_field_size", &self.max_field_size)
            .field("prepared", &self.prepared)
            .field("exceptions", &self.exceptions)
            .finish()
    }
}

impl StatementHandle {
    /// Creates a client-side (text protocol) statement.
    pub fn new(protocol: ProtocolHandle) -> Self {
        Self {
            protocol,
            max_field_size: 0,
            prepared: None,
            exceptions: ExceptionFactory::default(),
        }
    }

    /// Marks the statement as server-side prepared.
    pub fn with_prepared(mut self, prepared: ServerPrepareResult) -> Self {
        self.prepared = Some(Arc::new(prepared));
        self
    }

    pub fn with_max_field_size(mut self, max_field_size: u32) -> Self {
        self.max_field_size = max_field_size;
        self
    }

    pub fn with_exceptions(mut self, exceptions: ExceptionFactory) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn protocol(&self) -> &ProtocolHandle {
        &self.protocol
    }

    pub fn max_field_size(&self) -> u32 {
        self.max_field_size
    }

    pub fn prepared(&self) -> Option<&Arc<ServerPrepareResult>> {
        self.prepared.as_ref()
    }

    pub fn exceptions(&self) -> &ExceptionFactory {
        &self.exceptions
    }
}
