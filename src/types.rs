use crate::{protocol::RowSet, Result, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Col {
    pub name: String,
    pub decltype: Option<String>,
}

/// Row set of auto-generated ids, materialized in memory.
///
/// It has a single `insert_id` column and is always fully loaded, so
/// the [`RowSet`] lifecycle calls are no-ops.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedKeys {
    pub cols: Vec<Col>,
    pub rows: Vec<Vec<Value>>,
}

impl GeneratedKeys {
    pub(crate) const COLUMN: &'static str = "insert_id";

    pub fn empty() -> Self {
        Self::from_ids(Vec::new())
    }

    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            cols: vec![Col {
                name: Self::COLUMN.to_owned(),
                decltype: Some("BIGINT".to_owned()),
            }],
            rows: ids.into_iter().map(|id| vec![Value::Integer(id)]).collect(),
        }
    }

    /// Returns the generated ids in row order.
    pub fn ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_i64))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSet for GeneratedKeys {
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn abort(&mut self) {}

    fn fetch_remaining(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_fully_loaded(&self) -> bool {
        true
    }
}
