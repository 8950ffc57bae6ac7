use serde::Deserialize;

use crate::{DriverError, Result};

/// Cursor scrolling requested for produced row sets.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ScrollType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

/// Whether produced row sets may be updated through the cursor.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Whether auto-generated keys were requested for this execution.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedKeysMode {
    #[default]
    NoGeneratedKeys,
    ReturnGeneratedKeys,
}

/// What happens to the current row set when moving to the next sub-result.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CloseBehavior {
    /// Discard the remaining rows of the current row set.
    #[default]
    CloseCurrent,
    /// Buffer the remaining rows so the row set stays readable.
    KeepCurrent,
    /// Same wire handling as [`CloseBehavior::KeepCurrent`]; closing of
    /// previously released row sets is the statement layer's job.
    CloseAll,
}

/// Configures one statement execution.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Rows per streamed fetch; `0` buffers every sub-result fully.
    pub fetch_size: u32,
    /// Whether the execution is a batch sharing one outcome.
    pub batch: bool,
    /// Expected number of sub-results, used to pre-size outcome storage.
    pub expected_size: usize,
    /// Use the binary (prepared) row encoding.
    pub binary_format: bool,
    pub scroll_type: ScrollType,
    pub concurrency: Concurrency,
    pub generated_keys: GeneratedKeysMode,
    /// Server `auto_increment_increment`, the step between generated ids.
    pub auto_increment: i64,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            fetch_size: 0,
            batch: false,
            expected_size: 1,
            binary_format: false,
            scroll_type: ScrollType::default(),
            concurrency: Concurrency::default(),
            generated_keys: GeneratedKeysMode::default(),
            auto_increment: 1,
        }
    }
}

impl ExecutionOptions {
    /// Parses options from a JSON property map. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json).map_err(|err| {
            DriverError::InvalidUsage(format!("invalid execution options: {err}"))
        })?;
        if options.auto_increment <= 0 {
            return Err(DriverError::InvalidUsage(format!(
                "auto_increment must be positive, got {}",
                options.auto_increment
            )));
        }
        Ok(options)
    }

    pub fn batch(mut self, expected_size: usize) -> Self {
        self.batch = true;
        self.expected_size = expected_size;
        self
    }

    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    pub fn with_generated_keys(mut self) -> Self {
        self.generated_keys = GeneratedKeysMode::ReturnGeneratedKeys;
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: i64) -> Self {
        self.auto_increment = auto_increment;
        self
    }
}
