//! Result state of one statement execution.
//!
//! [`ExecutionResults`] receives every sub-result the server produces for
//! one command (update counts, errors and row sets, in server order),
//! hands row sets to the caller one at a time, and makes sure nothing the
//! server sent is left unread on the connection when it goes away.

use std::sync::Arc;

use crate::{
    keys,
    outcome::{CommandOutcome, StatEntry, RESULT_SET_VALUE},
    pending::PendingResults,
    protocol::{lock_protocol, Protocol, ProtocolHandle, RowSet, ServerPrepareResult},
    CloseBehavior, Concurrency, DriverError, ExceptionFactory, ExecutionOptions, GeneratedKeys,
    GeneratedKeysMode, Result, ScrollType, StatementHandle, Value,
};

pub struct ExecutionResults {
    statement: Option<StatementHandle>,
    prepared: Option<Arc<ServerPrepareResult>>,
    exceptions: ExceptionFactory,
    fetch_size: u32,
    batch: bool,
    expected_size: usize,
    binary_format: bool,
    scroll_type: ScrollType,
    concurrency: Concurrency,
    generated_keys: GeneratedKeysMode,
    auto_increment: i64,
    max_field_size: u32,
    sql: String,
    parameters: Vec<Value>,
    have_result_in_wire: bool,
    rewritten: bool,
    current: Option<Box<dyn RowSet>>,
    pending: PendingResults,
    callable: Option<Box<dyn RowSet>>,
    outcome: Option<CommandOutcome>,
}

impl std::fmt::Debug for ExecutionResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionResults")
            .field("sql", &self.sql)
            .field("fetch_size", &self.fetch_size)
            .field("batch", &self.batch)
            .field("have_result_in_wire", &self.have_result_in_wire)
            .field("current", &self.current.is_some())
            .field("pending", &self.pending)
            .field("callable", &self.callable.is_some())
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl ExecutionResults {
    /// Starts tracking the results of `sql` executed by `statement`.
    pub fn new(
        statement: &StatementHandle,
        sql: impl Into<String>,
        parameters: impl Into<Vec<Value>>,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            prepared: statement.prepared().cloned(),
            exceptions: statement.exceptions().clone(),
            max_field_size: statement.max_field_size(),
            statement: Some(statement.clone()),
            fetch_size: options.fetch_size,
            batch: options.batch,
            expected_size: options.expected_size,
            binary_format: options.binary_format,
            scroll_type: options.scroll_type,
            concurrency: options.concurrency,
            generated_keys: options.generated_keys,
            auto_increment: options.auto_increment,
            sql: sql.into(),
            parameters: parameters.into(),
            have_result_in_wire: false,
            rewritten: false,
            current: None,
            pending: PendingResults::new(),
            callable: None,
            outcome: None,
        }
    }

    /// Records an OK packet.
    pub fn record_success(
        &mut self,
        update_count: i64,
        insert_id: i64,
        more_available: bool,
        protocol: &mut dyn Protocol,
    ) {
        self.track_wire(more_available, protocol);
        self.record(
            StatEntry::Success {
                update_count,
                insert_id,
            },
            more_available,
        );
    }

    /// Records an error packet.
    pub fn record_error(&mut self, more_available: bool, protocol: &mut dyn Protocol) {
        self.track_wire(more_available, protocol);
        self.record(StatEntry::Failed, more_available);
    }

    /// Records a produced row set.
    ///
    /// The output-parameter row set of a procedure call is kept aside and
    /// does not count as a sub-result.
    pub fn record_result_set(
        &mut self,
        row_set: Box<dyn RowSet>,
        more_available: bool,
        protocol: &mut dyn Protocol,
    ) {
        self.track_wire(more_available, protocol);
        if row_set.is_callable_result() {
            self.callable = Some(row_set);
            return;
        }
        self.pending.push(row_set);
        self.record(StatEntry::ResultSet, more_available);
    }

    fn track_wire(&mut self, more_available: bool, protocol: &mut dyn Protocol) {
        if self.have_result_in_wire && !more_available && self.fetch_size == 0 {
            #[cfg(feature = "tracing")]
            tracing::debug!(sql = %self.sql, "last sub-result read, releasing streaming reservation");
            protocol.remove_active_streaming_result();
        }
        self.have_result_in_wire = more_available;
    }

    fn record(&mut self, entry: StatEntry, more_available: bool) {
        match self.outcome.as_mut() {
            Some(outcome) => outcome.add(entry),
            None => {
                let outcome = CommandOutcome::create(
                    self.batch,
                    more_available,
                    self.expected_size,
                    self.auto_increment,
                    entry,
                );
                #[cfg(feature = "tracing")]
                tracing::debug!(kind = ?outcome.kind(), "command outcome created");
                self.outcome = Some(outcome);
            }
        }
    }

    /// Marks the command as finished and exposes its first row set.
    ///
    /// Returns false when nothing was recorded.
    pub fn finish_command(&mut self) -> bool {
        let Some(outcome) = self.outcome.as_mut() else {
            self.current = None;
            return false;
        };
        self.current = if !self.pending.is_empty() && !outcome.is_current_update_count() {
            self.pending.pop()
        } else {
            None
        };
        outcome.set_rewrite(self.rewritten);
        true
    }

    /// Moves to the next sub-result, reading it from the wire if needed.
    ///
    /// Holds the connection lock for the whole transition. Returns true
    /// when the new current sub-result is a row set. Calling it again
    /// after the last sub-result returns false and changes nothing.
    ///
    /// A row set still owned here is dropped after the transition; take it
    /// with [`ExecutionResults::release_current`] first to keep it.
    pub fn advance_to_next(
        &mut self,
        behavior: CloseBehavior,
        protocol: &ProtocolHandle,
    ) -> Result<bool> {
        let mut guard = lock_protocol(protocol)?;
        let protocol: &mut dyn Protocol = &mut *guard;

        if self.fetch_size != 0 {
            if let Some(current) = self.current.as_mut() {
                let finished = match behavior {
                    CloseBehavior::CloseCurrent => current.close(),
                    CloseBehavior::KeepCurrent | CloseBehavior::CloseAll => {
                        current.fetch_remaining()
                    }
                };
                finished.map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
            }
        }

        if self.have_result_in_wire {
            let prepared = self.prepared.clone();
            protocol
                .move_to_next_result(self, prepared.as_deref())
                .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
            protocol
                .read_result(self, prepared.as_deref())
                .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
        }

        let Some(outcome) = self.outcome.as_mut() else {
            self.current = None;
            return Ok(false);
        };

        if outcome.more_results() && !self.batch {
            let on_row_set = !outcome.is_current_update_count();
            if behavior == CloseBehavior::CloseCurrent {
                if let Some(current) = self.current.as_mut() {
                    current
                        .close()
                        .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
                }
            }
            self.current = if on_row_set { self.pending.pop() } else { None };
            #[cfg(feature = "tracing")]
            tracing::debug!(row_set = self.current.is_some(), "moved to next sub-result");
            return Ok(self.current.is_some());
        }

        let update_count = outcome.update_count();
        if let Some(mut current) = self.current.take() {
            if behavior == CloseBehavior::CloseCurrent {
                current
                    .close()
                    .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
            }
        }
        if update_count == RESULT_SET_VALUE && self.have_result_in_wire {
            self.have_result_in_wire = false;
            protocol.remove_active_streaming_result();
        }
        Ok(false)
    }

    /// Reads or discards everything this execution still has on the wire.
    ///
    /// With `skip`, streamed rows and unread sub-results are thrown away;
    /// otherwise they are buffered so the caller can read them later. The
    /// caller must hold the connection lock.
    ///
    /// When skipping, a failure to close the streaming row set does not stop
    /// the wire from being drained; it is returned once draining is done.
    pub fn materialize_all(&mut self, skip: bool, protocol: &mut dyn Protocol) -> Result<()> {
        let mut close_failure = None;
        if self.fetch_size != 0 {
            self.fetch_size = 0;
            let streaming = match self.current.as_deref_mut() {
                Some(current) => Some(current),
                None => self.pending.front_mut(),
            };
            if let Some(row_set) = streaming {
                if skip {
                    if let Err(err) = row_set.close() {
                        close_failure = Some(self.exceptions.create(err, Some(&self.sql)));
                    }
                } else {
                    row_set
                        .fetch_remaining()
                        .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
                }
            }
        }

        if self.have_result_in_wire {
            let prepared = self.prepared.clone();
            while protocol.has_more_results() {
                #[cfg(feature = "tracing")]
                tracing::debug!(skip, "draining sub-result");
                protocol
                    .move_to_next_result(self, prepared.as_deref())
                    .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
                if !skip {
                    protocol
                        .read_result(self, prepared.as_deref())
                        .map_err(|err| self.exceptions.create(err, Some(&self.sql)))?;
                }
            }
            self.have_result_in_wire = false;
        }
        close_failure.map_or(Ok(()), Err)
    }

    /// Aborts the streaming row set while the connection is being killed.
    ///
    /// Never touches the wire. A watchdog calling this from another thread
    /// still needs exclusive access to `self`.
    pub fn cancel(&mut self) {
        if self.fetch_size == 0 {
            return;
        }
        self.fetch_size = 0;
        let streaming = match self.current.as_deref_mut() {
            Some(current) => Some(current),
            None => self.pending.front_mut(),
        };
        if let Some(row_set) = streaming {
            row_set.abort();
        }
    }

    /// Whether nothing of this execution is left to stream.
    pub fn is_fully_loaded(&self, protocol: &dyn Protocol) -> bool {
        match self.current.as_deref() {
            Some(current) if self.fetch_size != 0 => {
                current.is_fully_loaded() && self.pending.is_empty() && !protocol.has_more_results()
            }
            _ => true,
        }
    }

    /// Auto-generated ids of the current sub-result (or every batched statement).
    pub fn generated_keys(&self) -> Result<GeneratedKeys> {
        keys::project(
            self.outcome.as_ref(),
            self.generated_keys,
            self.batch,
            &self.sql,
        )
    }

    /// Detaches the owning statement without touching the wire.
    pub fn close(&mut self) {
        self.statement = None;
        self.fetch_size = 0;
    }

    pub fn statement(&self) -> Option<&StatementHandle> {
        self.statement.as_ref()
    }

    pub fn prepared(&self) -> Option<&ServerPrepareResult> {
        self.prepared.as_deref()
    }

    pub fn fetch_size(&self) -> u32 {
        self.fetch_size
    }

    /// Marks the execution as no longer streaming.
    pub fn remove_fetch_size(&mut self) {
        self.fetch_size = 0;
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn expected_size(&self) -> usize {
        self.expected_size
    }

    pub fn is_binary_format(&self) -> bool {
        self.binary_format
    }

    pub fn scroll_type(&self) -> ScrollType {
        self.scroll_type
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub fn max_field_size(&self) -> u32 {
        self.max_field_size
    }

    pub fn generated_keys_mode(&self) -> GeneratedKeysMode {
        self.generated_keys
    }

    pub fn auto_increment(&self) -> i64 {
        self.auto_increment
    }

    /// Sets the id step for outcomes created from now on.
    pub fn set_auto_increment(&mut self, auto_increment: i64) {
        self.auto_increment = auto_increment;
    }

    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    pub fn set_rewritten(&mut self, rewritten: bool) {
        self.rewritten = rewritten;
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Whether the server still has output for this execution on the wire.
    pub fn has_result_in_wire(&self) -> bool {
        self.have_result_in_wire
    }

    pub fn current(&self) -> Option<&dyn RowSet> {
        self.current.as_deref()
    }

    pub fn current_mut(&mut self) -> Option<&mut (dyn RowSet + 'static)> {
        self.current.as_deref_mut()
    }

    /// Hands the current row set over to the caller.
    pub fn release_current(&mut self) -> Option<Box<dyn RowSet>> {
        self.current.take()
    }

    pub fn callable(&self) -> Option<&dyn RowSet> {
        self.callable.as_deref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn outcome(&self) -> Option<&CommandOutcome> {
        self.outcome.as_ref()
    }

    pub fn current_stat_number(&self) -> usize {
        self.outcome
            .as_ref()
            .map_or(0, CommandOutcome::current_stat_number)
    }

    pub fn update_counts(&self) -> Vec<i64> {
        self.outcome
            .as_ref()
            .map_or_else(Vec::new, CommandOutcome::update_counts)
    }
}

impl Drop for ExecutionResults {
    /// Drains whatever is still on the wire so the connection stays usable.
    ///
    /// Errors are logged, never raised. Must not run on a thread that
    /// already holds the connection lock.
    fn drop(&mut self) {
        let Some(statement) = self.statement.take() else {
            return;
        };
        let protocol = Arc::clone(statement.protocol());
        let mut guard = match lock_protocol(&protocol) {
            Ok(guard) => guard,
            Err(err) => {
                report_drain_failure(&err, &self.sql);
                return;
            }
        };
        if let Err(err) = self.materialize_all(true, &mut *guard) {
            report_drain_failure(&err, &self.sql);
            // The fetch size is already cleared, so a second pass only walks the wire.
            if let Err(err) = self.materialize_all(true, &mut *guard) {
                report_drain_failure(&err, &self.sql);
            }
        }
    }
}

fn report_drain_failure(err: &DriverError, sql: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(error = %err, sql, "failed to drain results on drop");
    #[cfg(not(feature = "tracing"))]
    let _ = (err, sql);
}
