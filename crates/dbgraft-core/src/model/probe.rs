//! Row probe: the table/column/pattern used by the row-matching query

use serde::{Deserialize, Serialize};

/// Parameters of `find_rows_matching`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowProbe {
    pub table: String,
    pub column: String,
    /// LIKE pattern, bound as a statement parameter
    pub pattern: String,
}

impl Default for RowProbe {
    fn default() -> Self {
        Self {
            table: "countries".to_string(),
            column: "name".to_string(),
            pattern: "%land%".to_string(),
        }
    }
}

impl RowProbe {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            pattern: pattern.into(),
        }
    }
}
