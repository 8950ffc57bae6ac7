use crate::{
    outcome::{CommandOutcome, StatEntry},
    DriverError, GeneratedKeys, GeneratedKeysMode, Result,
};

/// Builds the generated-keys row set for an execution.
///
/// Batches list the ids of every statement. Other executions list the
/// ids of the sub-result currently exposed, using `sql` to tell a
/// multi-value insert from an `ON DUPLICATE KEY UPDATE` whose update
/// count does not match the number of new rows.
pub(crate) fn project(
    outcome: Option<&CommandOutcome>,
    mode: GeneratedKeysMode,
    batch: bool,
    sql: &str,
) -> Result<GeneratedKeys> {
    if mode != GeneratedKeysMode::ReturnGeneratedKeys {
        return Err(DriverError::InvalidUsage(
            "cannot return generated keys: query was not executed with ReturnGeneratedKeys"
                .to_owned(),
        ));
    }
    Ok(match outcome {
        Some(outcome) if batch => outcome.batch_generated_keys(),
        Some(outcome) => outcome.generated_keys(Some(sql)),
        None => GeneratedKeys::empty(),
    })
}

pub(crate) fn keys_for_statement(
    entry: &StatEntry,
    auto_increment: i64,
    sql: Option<&str>,
) -> GeneratedKeys {
    match *entry {
        StatEntry::Success {
            update_count,
            insert_id,
        } if insert_id > 0 => {
            if update_count > 1 && sql.is_some_and(|sql| !is_duplicate_key_update(sql)) {
                GeneratedKeys::from_ids(id_sequence(insert_id, update_count, auto_increment))
            } else {
                GeneratedKeys::from_ids([insert_id])
            }
        }
        _ => GeneratedKeys::empty(),
    }
}

pub(crate) fn keys_for_entries(entries: &[StatEntry], auto_increment: i64) -> GeneratedKeys {
    let ids = entries.iter().flat_map(|entry| match *entry {
        StatEntry::Success {
            update_count,
            insert_id,
        } if insert_id > 0 => id_sequence(insert_id, update_count, auto_increment),
        _ => Vec::new(),
    });
    GeneratedKeys::from_ids(ids)
}

fn id_sequence(first: i64, count: i64, auto_increment: i64) -> Vec<i64> {
    (0..count.max(0))
        .map(|step| first.saturating_add(step.saturating_mul(auto_increment)))
        .collect()
}

/// Detects `INSERT ... ON DUPLICATE KEY UPDATE` statements.
pub(crate) fn is_duplicate_key_update(sql: &str) -> bool {
    const CLAUSE: [&str; 4] = ["ON", "DUPLICATE", "KEY", "UPDATE"];
    let words: Vec<&str> = sql
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .collect();
    words.windows(CLAUSE.len()).any(|window| {
        window
            .iter()
            .zip(CLAUSE)
            .all(|(word, expected)| word.eq_ignore_ascii_case(expected))
    })
}
