// 🔖 Tag Assigner - validates and applies a payment item's tag set
//
// Rules:
// - every requested tag exists and belongs to the owner
// - at most one tag per dimension
// - an explicit empty list resets the set to the owner's UNCLASSIFIED tag
// - standard_tag_id is recomputed after every change to the set
//
// Validation completes before the first write, so a rejected request leaves
// the existing links and shortcut exactly as they were.

use rusqlite::{params, Connection};
use std::collections::HashSet;

use crate::entities::{OwnerDefaults, TagNode};
use crate::error::{Error, Result};
use crate::taxonomy;

/// Resolve each id and enforce one-tag-per-dimension, preserving request order
pub fn validate_tag_set(conn: &Connection, owner_id: &str, tag_ids: &[String]) -> Result<Vec<TagNode>> {
    let mut seen_dimensions = HashSet::new();
    let mut tags = Vec::with_capacity(tag_ids.len());

    for tag_id in tag_ids {
        let tag = taxonomy::get_tag_node(conn, owner_id, tag_id)?;
        if !seen_dimensions.insert(tag.dimension_id.clone()) {
            return Err(Error::Conflict(format!(
                "only one tag per dimension allowed (dimension {} repeated by tag {})",
                tag.dimension_id, tag.id
            )));
        }
        tags.push(tag);
    }

    Ok(tags)
}

/// The member of the set that lives in the standard dimension, if any
pub fn standard_shortcut(tags: &[TagNode], standard_dimension_id: Option<&str>) -> Option<String> {
    let standard = standard_dimension_id?;
    tags.iter()
        .find(|tag| tag.dimension_id == standard)
        .map(|tag| tag.id.clone())
}

/// Apply `requested` to a payment item and return its standard shortcut.
///
/// `None` means the field was omitted: the set is left untouched and the
/// stored shortcut is returned.
pub fn assign_tags(
    conn: &Connection,
    owner_id: &str,
    payment_item_id: &str,
    requested: Option<&[String]>,
    defaults: &OwnerDefaults,
) -> Result<Option<String>> {
    let Some(requested) = requested else {
        return current_shortcut(conn, payment_item_id);
    };

    let tags = if requested.is_empty() {
        match &defaults.unclassified_tag_id {
            Some(fallback) => vec![taxonomy::get_tag_node(conn, owner_id, fallback)?],
            None => Vec::new(),
        }
    } else {
        validate_tag_set(conn, owner_id, requested)?
    };

    replace_links(conn, payment_item_id, &tags)?;

    let shortcut = standard_shortcut(&tags, defaults.standard_dimension_id.as_deref());
    conn.execute(
        "UPDATE payment_items SET standard_tag_id = ?1 WHERE id = ?2",
        params![shortcut, payment_item_id],
    )?;

    log::debug!(
        "payment item {} tagged with {} tag(s), standard = {:?}",
        payment_item_id,
        tags.len(),
        shortcut
    );
    Ok(shortcut)
}

/// Tag ids linked to a payment item, in link order
pub fn load_tag_ids(conn: &Connection, payment_item_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT tag_id FROM payment_item_tags WHERE payment_item_id = ?1 ORDER BY rowid",
    )?;
    let ids = stmt
        .query_map(params![payment_item_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

fn replace_links(conn: &Connection, payment_item_id: &str, tags: &[TagNode]) -> Result<()> {
    conn.execute(
        "DELETE FROM payment_item_tags WHERE payment_item_id = ?1",
        params![payment_item_id],
    )?;

    let mut insert = conn.prepare_cached(
        "INSERT INTO payment_item_tags (payment_item_id, tag_id) VALUES (?1, ?2)",
    )?;
    for tag in tags {
        insert.execute(params![payment_item_id, tag.id])?;
    }
    Ok(())
}

fn current_shortcut(conn: &Connection, payment_item_id: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT standard_tag_id FROM payment_items WHERE id = ?1",
        params![payment_item_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::not_found("payment item", payment_item_id))
}
