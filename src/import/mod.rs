// 📥 Import Reconciler - bulk text import in three phases
//
// 1. parse: validate every row, no writes
// 2. reconcile: dedupe recipients and tags by normalized name
// 3. materialize: one payment item per row, tagged via the TagAssigner
//
// The caller runs this inside one unit of work, so any failure in phase 2 or
// 3 rolls back everything written before it.

pub mod parser;
pub mod reconcile;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::entities::{NewPaymentItem, OwnerDefaults};
use crate::error::Result;
use crate::payments;

pub use parser::{parse_batch, ImportRow};

/// Counts reported back for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created_transactions: usize,
    pub created_recipients: usize,
    pub updated_recipients: usize,
    pub created_tags: usize,
}

pub fn import_batch(
    conn: &Connection,
    owner_id: &str,
    text: &str,
    defaults: &OwnerDefaults,
) -> Result<ImportReport> {
    let rows = parse_batch(text)?;
    let resolved = reconcile::reconcile(conn, owner_id, &rows, defaults)?;

    let mut created_transactions = 0;
    for row in &rows {
        let mut new = NewPaymentItem::new(row.amount, row.date).periodic(row.periodic);
        new.description = row.description.clone();
        new.recipient_id = row
            .recipient_name
            .as_ref()
            .and_then(|name| resolved.recipient_ids.get(name))
            .cloned();
        // No tag name: empty set, which falls back to UNCLASSIFIED
        new.tag_ids = Some(
            row.tag_name
                .as_ref()
                .and_then(|name| resolved.tag_ids.get(name))
                .cloned()
                .into_iter()
                .collect(),
        );

        payments::create_payment_item(conn, owner_id, &new, defaults)?;
        created_transactions += 1;
    }

    Ok(ImportReport {
        created_transactions,
        created_recipients: resolved.created_recipients,
        updated_recipients: resolved.updated_recipients,
        created_tags: resolved.created_tags,
    })
}
