// 🧭 Dimension Entity - a named classification axis ("standard", "payment method")

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::names::Named;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
}

impl Dimension {
    pub(crate) const COLUMNS: &'static str = "id, name, description, owner_id";

    pub fn new(name: String, description: Option<String>, owner_id: String) -> Self {
        Dimension {
            id: super::new_id(),
            name,
            description,
            owner_id,
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Dimension {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
        })
    }
}

impl Named for Dimension {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
