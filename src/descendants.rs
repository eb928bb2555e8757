// 🔽 Descendant Expander - breadth-first closure over the tag forest
//
// expand({})  == {}
// expand({x}) ⊇ {x} plus everything reachable by following child links.
// A node is enqueued only the first time it is seen, so a malformed parent
// chain cannot make the traversal loop.

use rusqlite::{params, Connection};
use std::collections::{BTreeSet, VecDeque};

use crate::entities::TagNode;
use crate::error::Result;
use crate::taxonomy;

/// Child ids of one node, scoped to the owner
fn child_ids(conn: &Connection, owner_id: &str, parent_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM tag_nodes WHERE owner_id = ?1 AND parent_id = ?2 ORDER BY rowid",
    )?;
    let ids = stmt
        .query_map(params![owner_id, parent_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn expand(conn: &Connection, owner_id: &str, root_ids: &BTreeSet<String>) -> Result<BTreeSet<String>> {
    let mut result = root_ids.clone();
    let mut frontier: VecDeque<String> = root_ids.iter().cloned().collect();

    while let Some(current) = frontier.pop_front() {
        for child in child_ids(conn, owner_id, &current)? {
            if result.insert(child.clone()) {
                frontier.push_back(child);
            }
        }
    }

    log::debug!(
        "expanded {} tag id(s) to {} including descendants",
        root_ids.len(),
        result.len()
    );
    Ok(result)
}

/// Every node below `tag_id` in breadth-first order, excluding the node itself
pub fn list_descendants(conn: &Connection, owner_id: &str, tag_id: &str) -> Result<Vec<TagNode>> {
    let root = taxonomy::get_tag_node(conn, owner_id, tag_id)?;

    let mut seen = BTreeSet::from([root.id.clone()]);
    let mut frontier = VecDeque::from([root.id]);
    let mut descendants = Vec::new();

    while let Some(current) = frontier.pop_front() {
        for child in taxonomy::get_children(conn, owner_id, &current)? {
            if seen.insert(child.id.clone()) {
                frontier.push_back(child.id.clone());
                descendants.push(child);
            }
        }
    }

    Ok(descendants)
}
