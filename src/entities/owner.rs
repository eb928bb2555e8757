// 👤 Owner Entity - the tenant every other record is scoped to
//
// Provisioning seeds each owner with a "standard" dimension and an
// "UNCLASSIFIED" root tag. OwnerDefaults resolves those two by name at the
// start of any operation that needs them, so nothing is cached globally.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::constants::{STANDARD_DIMENSION_NAME, UNCLASSIFIED_TAG_NAME};
use crate::error::Result;
use crate::names::normalize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Owner {
    pub(crate) const COLUMNS: &'static str = "id, username, created_at";

    pub fn new(username: String) -> Self {
        Owner {
            id: super::new_id(),
            username,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Owner {
            id: row.get(0)?,
            username: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

// ============================================================================
// OWNER DEFAULTS
// ============================================================================

/// Per-owner configuration record: the standard dimension and fallback tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerDefaults {
    pub standard_dimension_id: Option<String>,
    /// UNCLASSIFIED node inside the standard dimension
    pub unclassified_tag_id: Option<String>,
}

impl OwnerDefaults {
    pub fn resolve(conn: &Connection, owner_id: &str) -> Result<Self> {
        let standard_dimension_id = {
            let mut stmt = conn.prepare(
                "SELECT id, name FROM dimensions WHERE owner_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![owner_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .find(|(_, name)| normalize(name) == STANDARD_DIMENSION_NAME)
                .map(|(id, _)| id)
        };

        let unclassified_tag_id = match &standard_dimension_id {
            Some(dimension_id) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name FROM tag_nodes
                     WHERE owner_id = ?1 AND dimension_id = ?2 ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map(params![owner_id, dimension_id], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.into_iter()
                    .find(|(_, name)| normalize(name) == UNCLASSIFIED_TAG_NAME)
                    .map(|(id, _)| id)
            }
            None => None,
        };

        Ok(OwnerDefaults {
            standard_dimension_id,
            unclassified_tag_id,
        })
    }
}

/// Look up an owner row by id
pub(crate) fn load_owner(conn: &Connection, owner_id: &str) -> Result<Option<Owner>> {
    let sql = format!("SELECT {} FROM owners WHERE id = ?1", Owner::COLUMNS);
    Ok(conn
        .query_row(&sql, params![owner_id], Owner::from_row)
        .optional()?)
}
