// 🌳 Taxonomy Store - dimensions and the tag forest inside them
//
// Integrity rules enforced here:
// - a tag's dimension exists and belongs to the caller
// - a tag's parent exists, belongs to the caller and shares the tag's dimension
// - re-parenting never makes a node its own ancestor
//
// Name uniqueness is NOT checked here; callers run the NameReconciler first.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

use crate::constants::{MAX_CATEGORY_NAME_LENGTH, MAX_DESCRIPTION_LENGTH};
use crate::descendants;
use crate::entities::{Dimension, NewTagNode, TagNode, TagNodeUpdate, TagTree};
use crate::error::{Error, Result};
use crate::names::{validated_name, validated_optional_text};

// ============================================================================
// DIMENSIONS
// ============================================================================

pub fn create_dimension(
    conn: &Connection,
    owner_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Dimension> {
    let name = validated_name(name, "name", MAX_CATEGORY_NAME_LENGTH)?;
    let description = validated_optional_text(description, "description", MAX_DESCRIPTION_LENGTH)?;

    let dimension = Dimension::new(name, description, owner_id.to_string());
    conn.execute(
        "INSERT INTO dimensions (id, name, description, owner_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            dimension.id,
            dimension.name,
            dimension.description,
            dimension.owner_id
        ],
    )?;

    Ok(dimension)
}

/// Owner-checked fetch: `NotFound` if absent, `Forbidden` if someone else's
pub fn get_dimension(conn: &Connection, owner_id: &str, id: &str) -> Result<Dimension> {
    let sql = format!("SELECT {} FROM dimensions WHERE id = ?1", Dimension::COLUMNS);
    let dimension = conn
        .query_row(&sql, params![id], Dimension::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("dimension", id))?;

    if dimension.owner_id != owner_id {
        return Err(Error::forbidden("dimension", id));
    }
    Ok(dimension)
}

pub fn list_dimensions(conn: &Connection, owner_id: &str) -> Result<Vec<Dimension>> {
    let sql = format!(
        "SELECT {} FROM dimensions WHERE owner_id = ?1 ORDER BY rowid",
        Dimension::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let dimensions = stmt
        .query_map(params![owner_id], Dimension::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(dimensions)
}

// ============================================================================
// TAG NODES
// ============================================================================

pub fn create_tag_node(conn: &Connection, owner_id: &str, new: &NewTagNode) -> Result<TagNode> {
    let name = validated_name(&new.name, "name", MAX_CATEGORY_NAME_LENGTH)?;
    let dimension = get_dimension(conn, owner_id, &new.dimension_id)?;

    if let Some(parent_id) = &new.parent_id {
        require_parent(conn, owner_id, &dimension.id, parent_id)?;
    }

    let mut tag = TagNode::new(name, dimension.id, new.parent_id.clone(), owner_id.to_string());
    tag.icon_ref = new
        .icon_ref
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    conn.execute(
        "INSERT INTO tag_nodes (id, name, dimension_id, parent_id, icon_ref, owner_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tag.id,
            tag.name,
            tag.dimension_id,
            tag.parent_id,
            tag.icon_ref,
            tag.owner_id
        ],
    )?;

    Ok(tag)
}

/// Raw fetch without the owner check
pub(crate) fn find_tag_node(conn: &Connection, id: &str) -> Result<Option<TagNode>> {
    let sql = format!("SELECT {} FROM tag_nodes WHERE id = ?1", TagNode::COLUMNS);
    Ok(conn.query_row(&sql, params![id], TagNode::from_row).optional()?)
}

/// Owner-checked fetch: `NotFound` if absent, `Forbidden` if someone else's
pub fn get_tag_node(conn: &Connection, owner_id: &str, id: &str) -> Result<TagNode> {
    let tag = find_tag_node(conn, id)?.ok_or_else(|| Error::not_found("tag", id))?;
    if tag.owner_id != owner_id {
        return Err(Error::forbidden("tag", id));
    }
    Ok(tag)
}

pub fn list_tag_nodes_by_dimension(
    conn: &Connection,
    owner_id: &str,
    dimension_id: &str,
) -> Result<Vec<TagNode>> {
    // Resolve first so an unknown or foreign dimension is reported, not masked as empty
    get_dimension(conn, owner_id, dimension_id)?;

    let sql = format!(
        "SELECT {} FROM tag_nodes WHERE owner_id = ?1 AND dimension_id = ?2 ORDER BY rowid",
        TagNode::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map(params![owner_id, dimension_id], TagNode::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

/// Every tag node of the owner, across dimensions
pub fn list_tag_nodes(conn: &Connection, owner_id: &str) -> Result<Vec<TagNode>> {
    let sql = format!(
        "SELECT {} FROM tag_nodes WHERE owner_id = ?1 ORDER BY rowid",
        TagNode::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map(params![owner_id], TagNode::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

/// Direct children of a node, in creation order
pub fn get_children(conn: &Connection, owner_id: &str, parent_id: &str) -> Result<Vec<TagNode>> {
    let sql = format!(
        "SELECT {} FROM tag_nodes WHERE owner_id = ?1 AND parent_id = ?2 ORDER BY rowid",
        TagNode::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let children = stmt
        .query_map(params![owner_id, parent_id], TagNode::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(children)
}

/// Apply a partial update. The node's dimension never changes.
pub fn update_tag_node(
    conn: &Connection,
    owner_id: &str,
    id: &str,
    update: &TagNodeUpdate,
) -> Result<TagNode> {
    let mut tag = get_tag_node(conn, owner_id, id)?;

    if let Some(name) = &update.name {
        tag.name = validated_name(name, "name", MAX_CATEGORY_NAME_LENGTH)?;
    }

    if let Some(parent) = &update.parent_id {
        if let Some(parent_id) = parent {
            require_parent(conn, owner_id, &tag.dimension_id, parent_id)?;

            let subtree = descendants::expand(conn, owner_id, &BTreeSet::from([tag.id.clone()]))?;
            if subtree.contains(parent_id) {
                return Err(Error::validation(
                    "parent_id",
                    format!("{} is {} or one of its descendants", parent_id, tag.id),
                ));
            }
        }
        tag.parent_id = parent.clone();
    }

    if let Some(icon_ref) = &update.icon_ref {
        tag.icon_ref = icon_ref
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    conn.execute(
        "UPDATE tag_nodes SET name = ?1, parent_id = ?2, icon_ref = ?3 WHERE id = ?4",
        params![tag.name, tag.parent_id, tag.icon_ref, tag.id],
    )?;

    Ok(tag)
}

/// Names from the root down to the node itself
///
/// Example: "Fast Food" → ["Food & Dining", "Restaurants", "Fast Food"]
pub fn tag_path(conn: &Connection, owner_id: &str, id: &str) -> Result<Vec<String>> {
    let mut current = get_tag_node(conn, owner_id, id)?;
    let mut seen = BTreeSet::from([current.id.clone()]);
    let mut path = vec![current.name.clone()];

    while let Some(parent_id) = current.parent_id.clone() {
        // Guard against a malformed chain written outside this module
        if !seen.insert(parent_id.clone()) {
            return Err(Error::Corrupt(format!("tag {} has a cyclic parent chain", id)));
        }
        current = get_tag_node(conn, owner_id, &parent_id)?;
        path.push(current.name.clone());
    }

    path.reverse();
    Ok(path)
}

/// The node with its children nested recursively, siblings in creation order.
/// Each node appears once even if the stored links are malformed.
pub fn tag_tree(conn: &Connection, owner_id: &str, id: &str) -> Result<TagTree> {
    let root = get_tag_node(conn, owner_id, id)?;
    let mut seen = BTreeSet::from([root.id.clone()]);
    build_subtree(conn, owner_id, root, &mut seen)
}

fn build_subtree(
    conn: &Connection,
    owner_id: &str,
    node: TagNode,
    seen: &mut BTreeSet<String>,
) -> Result<TagTree> {
    let mut children = Vec::new();
    for child in get_children(conn, owner_id, &node.id)? {
        if seen.insert(child.id.clone()) {
            children.push(build_subtree(conn, owner_id, child, seen)?);
        }
    }
    Ok(TagTree { node, children })
}

/// A parent must exist, belong to the owner and share the dimension
fn require_parent(conn: &Connection, owner_id: &str, dimension_id: &str, parent_id: &str) -> Result<TagNode> {
    match find_tag_node(conn, parent_id)? {
        Some(parent) if parent.owner_id == owner_id && parent.dimension_id == dimension_id => {
            Ok(parent)
        }
        _ => Err(Error::not_found("parent tag", parent_id)),
    }
}
