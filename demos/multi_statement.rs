use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use driver_results::{
    lock_protocol, CloseBehavior, ExecutionOptions, ExecutionResults, Protocol, ProtocolHandle,
    RowSet, ServerPrepareResult, StatementHandle,
};

/// Rows already decoded into memory.
struct Buffered {
    name: &'static str,
    rows: usize,
}

impl RowSet for Buffered {
    fn close(&mut self) -> driver_results::Result<()> {
        println!("  closing {} ({} rows)", self.name, self.rows);
        Ok(())
    }

    fn abort(&mut self) {}

    fn fetch_remaining(&mut self) -> driver_results::Result<()> {
        Ok(())
    }

    fn is_fully_loaded(&self) -> bool {
        true
    }
}

enum Reply {
    Updated(i64, i64),
    Rows(&'static str, usize),
}

/// Replays canned server replies instead of reading a socket.
struct Replay(VecDeque<Reply>);

impl Protocol for Replay {
    fn has_more_results(&self) -> bool {
        !self.0.is_empty()
    }

    fn move_to_next_result(
        &mut self,
        _results: &mut ExecutionResults,
        _prepared: Option<&ServerPrepareResult>,
    ) -> driver_results::Result<()> {
        Ok(())
    }

    fn read_result(
        &mut self,
        results: &mut ExecutionResults,
        _prepared: Option<&ServerPrepareResult>,
    ) -> driver_results::Result<()> {
        let Some(reply) = self.0.pop_front() else {
            return Err(driver_results::DriverError::protocol("nothing left to read"));
        };
        let more = !self.0.is_empty();
        match reply {
            Reply::Updated(count, id) => results.record_success(count, id, more, self),
            Reply::Rows(name, rows) => {
                results.record_result_set(Box::new(Buffered { name, rows }), more, self)
            }
        }
        Ok(())
    }

    fn remove_active_streaming_result(&mut self) {}
}

fn main() -> anyhow::Result<()> {
    let protocol: ProtocolHandle = Arc::new(Mutex::new(Replay(VecDeque::from([
        Reply::Rows("users", 3),
        Reply::Updated(2, 41),
        Reply::Rows("orders", 5),
    ]))));
    let statement = StatementHandle::new(Arc::clone(&protocol));
    let sql = "SELECT * FROM users; INSERT INTO log VALUES (1),(2); SELECT * FROM orders";
    let mut results = ExecutionResults::new(
        &statement,
        sql,
        Vec::new(),
        ExecutionOptions::default().with_generated_keys(),
    );

    {
        let mut wire = lock_protocol(&protocol)?;
        while wire.has_more_results() {
            wire.read_result(&mut results, None)?;
        }
    }
    results.finish_command();

    loop {
        match results.outcome().map(|outcome| outcome.update_count()) {
            Some(-1) => println!("row set"),
            Some(count) => println!(
                "update count {count}, generated keys {:?}",
                results.generated_keys()?.ids()
            ),
            None => break,
        }
        let has_rows = results.advance_to_next(CloseBehavior::CloseCurrent, &protocol)?;
        if !has_rows && results.outcome().map(|outcome| outcome.update_count()) == Some(-1) {
            break;
        }
    }

    Ok(())
}
