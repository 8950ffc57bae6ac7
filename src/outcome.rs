//! Per-execution accounting of update counts, insert ids and errors.
//!
//! The shape of a [`CommandOutcome`] is chosen once, by the first event
//! of an execution, and never changes afterwards.

use crate::{
    keys::{keys_for_entries, keys_for_statement},
    GeneratedKeys,
};

/// Update count reported for a sub-result that produced rows.
pub const RESULT_SET_VALUE: i64 = -1;
/// Update count reported when the server did not give a per-statement count.
pub const SUCCESS_NO_INFO: i64 = -2;
/// Update count reported for a failed statement.
pub const EXECUTE_FAILED: i64 = -3;

/// One recorded sub-result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatEntry {
    Success { update_count: i64, insert_id: i64 },
    Failed,
    ResultSet,
}

impl StatEntry {
    pub fn update_count(&self) -> i64 {
        match self {
            Self::Success { update_count, .. } => *update_count,
            Self::Failed => EXECUTE_FAILED,
            Self::ResultSet => RESULT_SET_VALUE,
        }
    }

    pub fn insert_id(&self) -> i64 {
        match self {
            Self::Success { insert_id, .. } => *insert_id,
            _ => 0,
        }
    }

    /// False only for entries that stand for a produced row set.
    pub fn is_update_count(&self) -> bool {
        !matches!(self, Self::ResultSet)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Single,
    Batch,
    Multiple,
}

/// Exactly one sub-result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleOutcome {
    entry: StatEntry,
    auto_increment: i64,
}

impl SingleOutcome {
    pub fn entry(&self) -> StatEntry {
        self.entry
    }
}

/// One entry per batched statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    entries: Vec<StatEntry>,
    expected_size: usize,
    auto_increment: i64,
    has_error: bool,
    rewritten: bool,
}

impl BatchOutcome {
    pub fn new(expected_size: usize, auto_increment: i64) -> Self {
        Self {
            entries: Vec::with_capacity(expected_size),
            expected_size,
            auto_increment,
            has_error: false,
            rewritten: false,
        }
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }
}

/// Open-ended sequence of sub-results from multi-statement text, with a
/// cursor on the sub-result currently exposed to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipleOutcome {
    entries: Vec<StatEntry>,
    expected_size: usize,
    auto_increment: i64,
    cursor: usize,
    rewritten: bool,
}

impl MultipleOutcome {
    pub fn new(expected_size: usize, auto_increment: i64) -> Self {
        Self {
            entries: Vec::with_capacity(expected_size),
            expected_size,
            auto_increment,
            cursor: 0,
            rewritten: false,
        }
    }

    /// Index of the sub-result currently exposed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn current(&self) -> Option<&StatEntry> {
        self.entries.get(self.cursor)
    }
}

/// Aggregated outcome of one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Single(SingleOutcome),
    Batch(BatchOutcome),
    Multiple(MultipleOutcome),
}

impl CommandOutcome {
    /// Creates the outcome for the first event of an execution.
    ///
    /// A single outcome is built from `first` directly; the other shapes
    /// start empty and record `first` as their first entry.
    pub(crate) fn create(
        batch: bool,
        more_available: bool,
        expected_size: usize,
        auto_increment: i64,
        first: StatEntry,
    ) -> Self {
        let mut outcome = if batch {
            Self::Batch(BatchOutcome::new(expected_size, auto_increment))
        } else if more_available {
            Self::Multiple(MultipleOutcome::new(expected_size, auto_increment))
        } else {
            return Self::Single(SingleOutcome {
                entry: first,
                auto_increment,
            });
        };
        outcome.add(first);
        outcome
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Single(_) => OutcomeKind::Single,
            Self::Batch(_) => OutcomeKind::Batch,
            Self::Multiple(_) => OutcomeKind::Multiple,
        }
    }

    pub(crate) fn add(&mut self, entry: StatEntry) {
        match self {
            Self::Single(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(?entry, "ignoring extra sub-result on a single outcome");
            }
            Self::Batch(batch) => {
                batch.has_error |= entry == StatEntry::Failed;
                batch.entries.push(entry);
            }
            Self::Multiple(multiple) => multiple.entries.push(entry),
        }
    }

    pub fn add_success_stat(&mut self, update_count: i64, insert_id: i64) {
        self.add(StatEntry::Success {
            update_count,
            insert_id,
        });
    }

    pub fn add_error_stat(&mut self) {
        self.add(StatEntry::Failed);
    }

    pub fn add_result_set_stat(&mut self) {
        self.add(StatEntry::ResultSet);
    }

    /// Every recorded entry, in server order.
    pub fn entries(&self) -> &[StatEntry] {
        match self {
            Self::Single(single) => std::slice::from_ref(&single.entry),
            Self::Batch(batch) => &batch.entries,
            Self::Multiple(multiple) => &multiple.entries,
        }
    }

    pub fn current_stat_number(&self) -> usize {
        self.entries().len()
    }

    /// Whether the entry exposed to the caller is an update count rather
    /// than a row set.
    pub fn is_current_update_count(&self) -> bool {
        match self {
            Self::Single(single) => single.entry.is_update_count(),
            Self::Batch(_) => false,
            Self::Multiple(multiple) => multiple
                .current()
                .is_some_and(StatEntry::is_update_count),
        }
    }

    /// Moves to the next sub-result and reports whether one exists.
    ///
    /// Only multi-statement outcomes ever have more results. The cursor
    /// stops one past the last entry, so repeated calls at the end are
    /// no-ops.
    pub fn more_results(&mut self) -> bool {
        match self {
            Self::Single(_) | Self::Batch(_) => false,
            Self::Multiple(multiple) => {
                let more = multiple.cursor + 1 < multiple.entries.len();
                if multiple.cursor < multiple.entries.len() {
                    multiple.cursor += 1;
                }
                more
            }
        }
    }

    /// Update count of the entry exposed to the caller.
    pub fn update_count(&self) -> i64 {
        match self {
            Self::Single(single) => single.entry.update_count(),
            Self::Batch(batch) => batch
                .entries
                .first()
                .map_or(RESULT_SET_VALUE, StatEntry::update_count),
            Self::Multiple(multiple) => multiple
                .current()
                .map_or(RESULT_SET_VALUE, StatEntry::update_count),
        }
    }

    /// Per-statement update counts as reported to a batch caller.
    pub fn update_counts(&self) -> Vec<i64> {
        match self {
            Self::Single(single) => vec![single.entry.update_count()],
            Self::Batch(batch) => padded_counts(
                &batch.entries,
                batch.expected_size,
                batch.rewritten,
                batch.has_error,
            ),
            Self::Multiple(multiple) => padded_counts(
                &multiple.entries,
                multiple.expected_size,
                multiple.rewritten,
                multiple.entries.contains(&StatEntry::Failed),
            ),
        }
    }

    /// Records whether the statements were rewritten into one multi-value statement.
    pub fn set_rewrite(&mut self, rewritten: bool) {
        match self {
            Self::Single(_) => {}
            Self::Batch(batch) => batch.rewritten = rewritten,
            Self::Multiple(multiple) => multiple.rewritten = rewritten,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Batch(batch) => batch.rewritten,
            Self::Multiple(multiple) => multiple.rewritten,
        }
    }

    /// Generated keys of the sub-result exposed to the caller.
    ///
    /// `sql` is used to decide whether a multi-row update count came from
    /// a multi-value insert.
    pub fn generated_keys(&self, sql: Option<&str>) -> GeneratedKeys {
        match self {
            Self::Single(single) => keys_for_statement(&single.entry, single.auto_increment, sql),
            Self::Batch(batch) => keys_for_entries(&batch.entries, batch.auto_increment),
            Self::Multiple(multiple) => match multiple.current() {
                Some(entry) => keys_for_statement(entry, multiple.auto_increment, sql),
                None => GeneratedKeys::empty(),
            },
        }
    }

    /// Generated keys of every recorded statement.
    pub fn batch_generated_keys(&self) -> GeneratedKeys {
        match self {
            Self::Single(single) => keys_for_statement(&single.entry, single.auto_increment, None),
            Self::Batch(batch) => keys_for_entries(&batch.entries, batch.auto_increment),
            Self::Multiple(multiple) => {
                keys_for_entries(&multiple.entries, multiple.auto_increment)
            }
        }
    }
}

fn padded_counts(
    entries: &[StatEntry],
    expected_size: usize,
    rewritten: bool,
    has_error: bool,
) -> Vec<i64> {
    if rewritten {
        let value = if has_error {
            EXECUTE_FAILED
        } else {
            SUCCESS_NO_INFO
        };
        return vec![value; expected_size];
    }
    let mut counts: Vec<i64> = entries.iter().map(StatEntry::update_count).collect();
    if counts.len() < expected_size {
        counts.resize(expected_size, EXECUTE_FAILED);
    }
    counts
}
