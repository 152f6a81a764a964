use crate::model::QueryRow;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query result in the `{data: [{data: [row, ...]}]}` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NrqlResponse {
    #[serde(default)]
    pub data: Vec<ResultSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub data: Vec<QueryRow>,
}

impl NrqlResponse {
    pub fn from_rows(rows: Vec<QueryRow>) -> Self {
        Self {
            data: vec![ResultSet { data: rows }],
        }
    }

    /// Rows of the first result set.
    ///
    /// Any other shape yields no rows; entries that do not decode as a row
    /// are dropped.
    pub fn rows_from_value(value: &Value) -> Vec<QueryRow> {
        let Some(entries) = value
            .get("data")
            .and_then(Value::as_array)
            .and_then(|sets| sets.first())
            .and_then(|set| set.get("data"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| match QueryRow::deserialize(entry) {
                Ok(row) => Some(row),
                Err(err) => {
                    debug!("dropping undecodable row {entry}: {err}");
                    None
                }
            })
            .collect()
    }
}
