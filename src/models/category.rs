use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

pub const UNCATEGORIZED_ID: &str = "uncategorized";
const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// A budgeting category, optionally mapped to its id in the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub ledger_id: Option<String>
}

impl Category {
    pub fn new(id: &str, name: &str, ledger_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ledger_id: ledger_id.map(str::to_string)
        }
    }

    /// Label applied when categorization produces no suggestion.
    pub fn uncategorized() -> Self {
        Self::new(UNCATEGORIZED_ID, UNCATEGORIZED_NAME, None)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.id == UNCATEGORIZED_ID
    }
}
