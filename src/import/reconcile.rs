// 🔗 Import Reconciliation - phase 2: resolve names to existing entities
//
// Recipients and tags referenced by the batch are matched against the
// owner's existing entities by normalized name, then created or updated.
// Transactions are never deduplicated, only the entities they point at.

use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

use crate::constants::STANDARD_DIMENSION_NAME;
use crate::entities::{NewTagNode, OwnerDefaults, Recipient};
use crate::error::{Error, Result};
use crate::names::find_by_normalized_name;
use crate::recipients;
use crate::taxonomy;

use super::parser::ImportRow;

/// Name → id lookups for the materialize step, plus the entity counters
#[derive(Debug, Default)]
pub struct Resolved {
    pub recipient_ids: HashMap<String, String>,
    pub tag_ids: HashMap<String, String>,
    pub created_recipients: usize,
    pub updated_recipients: usize,
    pub created_tags: usize,
}

pub fn reconcile(
    conn: &Connection,
    owner_id: &str,
    rows: &[ImportRow],
    defaults: &OwnerDefaults,
) -> Result<Resolved> {
    let mut resolved = Resolved::default();
    reconcile_recipients(conn, owner_id, rows, &mut resolved)?;
    reconcile_tags(conn, owner_id, rows, defaults, &mut resolved)?;

    log::debug!(
        "reconciled import: {} recipient(s) created, {} updated, {} tag(s) created",
        resolved.created_recipients,
        resolved.updated_recipients,
        resolved.created_tags
    );
    Ok(resolved)
}

/// Recipient name → address, in first-seen order.
///
/// A later row's address replaces an earlier one; a row without an address
/// keeps whatever was seen before.
fn collect_recipients(rows: &[ImportRow]) -> Vec<(String, Option<String>)> {
    let mut order: Vec<(String, Option<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(name) = &row.recipient_name else {
            continue;
        };
        match index.get(name) {
            Some(&i) => {
                if row.recipient_address.is_some() {
                    order[i].1 = row.recipient_address.clone();
                }
            }
            None => {
                index.insert(name.clone(), order.len());
                order.push((name.clone(), row.recipient_address.clone()));
            }
        }
    }

    order
}

fn reconcile_recipients(
    conn: &Connection,
    owner_id: &str,
    rows: &[ImportRow],
    resolved: &mut Resolved,
) -> Result<()> {
    let existing = recipients::list_recipients(conn, owner_id)?;

    for (name, address) in collect_recipients(rows) {
        let id = match find_by_normalized_name(&existing, &name) {
            Some(current) => {
                if address.is_some() && address != current.address {
                    recipients::set_address(conn, &current.id, address.as_deref())?;
                    resolved.updated_recipients += 1;
                }
                current.id.clone()
            }
            None => {
                let created = recipients::insert_recipient(
                    conn,
                    Recipient::new(name.clone(), address, owner_id.to_string()),
                )?;
                resolved.created_recipients += 1;
                created.id
            }
        };
        resolved.recipient_ids.insert(name, id);
    }

    Ok(())
}

fn reconcile_tags(
    conn: &Connection,
    owner_id: &str,
    rows: &[ImportRow],
    defaults: &OwnerDefaults,
    resolved: &mut Resolved,
) -> Result<()> {
    let mut seen = HashSet::new();
    let names: Vec<&String> = rows
        .iter()
        .filter_map(|row| row.tag_name.as_ref())
        .filter(|name| seen.insert(name.as_str()))
        .collect();

    if names.is_empty() {
        return Ok(());
    }

    // Matching spans every dimension the owner has
    let existing = taxonomy::list_tag_nodes(conn, owner_id)?;

    for name in names {
        let id = match find_by_normalized_name(&existing, name) {
            Some(tag) => tag.id.clone(),
            None => {
                let dimension_id = defaults
                    .standard_dimension_id
                    .clone()
                    .ok_or_else(|| Error::not_found("dimension", STANDARD_DIMENSION_NAME))?;
                let created = taxonomy::create_tag_node(
                    conn,
                    owner_id,
                    &NewTagNode {
                        name: name.clone(),
                        dimension_id,
                        parent_id: None,
                        icon_ref: None,
                    },
                )?;
                resolved.created_tags += 1;
                created.id
            }
        };
        resolved.tag_ids.insert(name.clone(), id);
    }

    Ok(())
}
