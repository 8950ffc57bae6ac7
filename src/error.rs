/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Failure reported by the protocol layer or a row set while touching the wire.
    #[error("protocol error: {message}")]
    Protocol {
        /// Error message text from the server or the protocol layer.
        message: String,
        /// Optional five-character SQLSTATE.
        sql_state: Option<String>,
        /// Optional server error code.
        code: Option<u16>,
    },
    /// The API was used in a way the current execution does not allow.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
    /// The connection (or its lock) is no longer usable.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
    /// A lower-level error re-raised with driver context.
    #[error("{message}")]
    Wrapped {
        /// Fully formatted message including connection context.
        message: String,
        /// SQLSTATE carried over from the wrapped error.
        sql_state: Option<String>,
        #[source]
        source: Box<DriverError>,
    },
}

impl DriverError {
    /// Builds a protocol error without SQLSTATE or code.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            sql_state: None,
            code: None,
        }
    }

    /// Returns the SQLSTATE attached to this error, looking through wrappers.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Protocol { sql_state, .. } | Self::Wrapped { sql_state, .. } => {
                sql_state.as_deref()
            }
            Self::InvalidUsage(_) => Some("HY000"),
            Self::ConnectionClosed(_) => Some("08000"),
        }
    }
}

/// Re-raises lower-level errors with connection context.
///
/// Every error leaving a sub-result transition goes through here, so a
/// caller always sees which connection failed and, when
/// `dump_queries` is set, which SQL text was running.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionFactory {
    /// Server-side connection thread id.
    pub thread_id: u64,
    /// Append the SQL text to wrapped error messages.
    pub dump_queries: bool,
}

impl ExceptionFactory {
    pub fn new(thread_id: u64) -> Self {
        Self {
            thread_id,
            dump_queries: false,
        }
    }

    pub fn with_dump_queries(mut self, dump_queries: bool) -> Self {
        self.dump_queries = dump_queries;
        self
    }

    /// Wraps `source` with the connection thread id and optionally `sql`.
    pub fn create(&self, source: DriverError, sql: Option<&str>) -> DriverError {
        if let DriverError::Wrapped { .. } = source {
            return source;
        }
        let mut message = format!("(conn={}) {source}", self.thread_id);
        if self.dump_queries {
            if let Some(sql) = sql {
                message.push_str("\nQuery is: ");
                message.push_str(sql);
            }
        }
        let sql_state = source.sql_state().map(str::to_owned);
        DriverError::Wrapped {
            message,
            sql_state,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::{DriverError, ExceptionFactory};

    #[test]
    fn wrap_prefixes_thread_id() {
        let factory = ExceptionFactory::new(42);
        let err = factory.create(DriverError::protocol("socket reset"), Some("SELECT 1"));
        assert_eq!(err.to_string(), "(conn=42) protocol error: socket reset");
        assert!(err.source().is_some());
    }

    #[test]
    fn wrap_appends_query_when_dumping() {
        let factory = ExceptionFactory::new(7).with_dump_queries(true);
        let err = factory.create(
            DriverError::Protocol {
                message: "lock wait timeout".to_owned(),
                sql_state: Some("HY000".to_owned()),
                code: Some(1205),
            },
            Some("UPDATE t SET a = 1"),
        );
        assert!(err.to_string().ends_with("\nQuery is: UPDATE t SET a = 1"));
        assert_eq!(err.sql_state(), Some("HY000"));
    }

    #[test]
    fn wrap_is_not_nested() {
        let factory = ExceptionFactory::new(1);
        let once = factory.create(DriverError::protocol("eof"), None);
        let twice = factory.create(once, None);
        assert_eq!(twice.to_string(), "(conn=1) protocol error: eof");
    }
}
