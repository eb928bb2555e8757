// 🏪 Recipient Entity - person or organisation on the other side of a payment
//
// Deduplicated per owner by normalized name, so "ACME " and "ACME" are one
// recipient and imports reuse the existing row.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::names::Named;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub owner_id: String,
}

impl Recipient {
    pub(crate) const COLUMNS: &'static str = "id, name, address, owner_id";

    pub fn new(name: String, address: Option<String>, owner_id: String) -> Self {
        Recipient {
            id: super::new_id(),
            name,
            address,
            owner_id,
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Recipient {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            owner_id: row.get(3)?,
        })
    }
}

impl Named for Recipient {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the address
    pub address: Option<Option<String>>,
}
