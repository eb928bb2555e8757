// 🏷️ Tag Node Entity - one label inside a dimension's hierarchy
//
// Nodes form a forest per owner. A node's parent is looked up by id in the
// store, never held by reference, and must live in the same dimension.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::names::Named;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNode {
    pub id: String,
    pub name: String,
    pub dimension_id: String,
    /// None for roots
    pub parent_id: Option<String>,
    /// Opaque reference to an icon held by the attachment store
    pub icon_ref: Option<String>,
    pub owner_id: String,
}

impl TagNode {
    pub(crate) const COLUMNS: &'static str = "id, name, dimension_id, parent_id, icon_ref, owner_id";

    pub fn new(
        name: String,
        dimension_id: String,
        parent_id: Option<String>,
        owner_id: String,
    ) -> Self {
        TagNode {
            id: super::new_id(),
            name,
            dimension_id,
            parent_id,
            icon_ref: None,
            owner_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TagNode {
            id: row.get(0)?,
            name: row.get(1)?,
            dimension_id: row.get(2)?,
            parent_id: row.get(3)?,
            icon_ref: row.get(4)?,
            owner_id: row.get(5)?,
        })
    }
}

impl Named for TagNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Input for creating a tag node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTagNode {
    pub name: String,
    pub dimension_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub icon_ref: Option<String>,
}

/// Partial update of a tag node. Outer `None` leaves a field untouched;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagNodeUpdate {
    pub name: Option<String>,
    pub parent_id: Option<Option<String>>,
    pub icon_ref: Option<Option<String>>,
}

/// A node with its whole subtree nested below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTree {
    #[serde(flatten)]
    pub node: TagNode,
    pub children: Vec<TagTree>,
}

impl TagTree {
    /// Number of nodes in the subtree, the root included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TagTree::size).sum::<usize>()
    }
}
