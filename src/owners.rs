// 👤 Owner provisioning
//
// A fresh owner gets the "standard" dimension and an UNCLASSIFIED root tag
// inside it, so tag resets and imports have somewhere to land.

use rusqlite::{params, Connection, OptionalExtension};

use crate::constants::{
    STANDARD_DIMENSION_DESCRIPTION, STANDARD_DIMENSION_NAME, UNCLASSIFIED_TAG_NAME,
};
use crate::entities::owner::load_owner;
use crate::entities::{NewTagNode, Owner, OwnerDefaults};
use crate::error::{Error, Result};
use crate::names::validated_name;
use crate::taxonomy;

const MAX_USERNAME_LENGTH: usize = 255;

pub fn provision_owner(conn: &Connection, username: &str) -> Result<(Owner, OwnerDefaults)> {
    let username = validated_name(username, "username", MAX_USERNAME_LENGTH)?;

    if find_owner(conn, &username)?.is_some() {
        return Err(Error::Conflict(format!("owner \"{}\" already exists", username)));
    }

    let owner = Owner::new(username);
    conn.execute(
        "INSERT INTO owners (id, username, created_at) VALUES (?1, ?2, ?3)",
        params![owner.id, owner.username, owner.created_at],
    )?;

    let standard = taxonomy::create_dimension(
        conn,
        &owner.id,
        STANDARD_DIMENSION_NAME,
        Some(STANDARD_DIMENSION_DESCRIPTION),
    )?;
    let unclassified = taxonomy::create_tag_node(
        conn,
        &owner.id,
        &NewTagNode {
            name: UNCLASSIFIED_TAG_NAME.to_string(),
            dimension_id: standard.id.clone(),
            parent_id: None,
            icon_ref: None,
        },
    )?;

    let defaults = OwnerDefaults {
        standard_dimension_id: Some(standard.id),
        unclassified_tag_id: Some(unclassified.id),
    };
    Ok((owner, defaults))
}

pub fn find_owner(conn: &Connection, username: &str) -> Result<Option<Owner>> {
    let sql = format!("SELECT {} FROM owners WHERE username = ?1", Owner::COLUMNS);
    Ok(conn
        .query_row(&sql, params![username], Owner::from_row)
        .optional()?)
}

/// `NotFound` unless the owner id exists
pub fn require_owner(conn: &Connection, owner_id: &str) -> Result<Owner> {
    load_owner(conn, owner_id)?.ok_or_else(|| Error::not_found("owner", owner_id))
}
