// 🏪 Recipient Store - owner-scoped recipients, deduplicated by normalized name

use rusqlite::{params, Connection, OptionalExtension};

use crate::constants::{MAX_RECIPIENT_ADDRESS_LENGTH, MAX_RECIPIENT_NAME_LENGTH};
use crate::entities::{Recipient, RecipientUpdate};
use crate::error::{Error, Result};
use crate::names::{ensure_name_available, validated_name, validated_optional_text};

pub fn list_recipients(conn: &Connection, owner_id: &str) -> Result<Vec<Recipient>> {
    let sql = format!(
        "SELECT {} FROM recipients WHERE owner_id = ?1 ORDER BY rowid",
        Recipient::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let recipients = stmt
        .query_map(params![owner_id], Recipient::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(recipients)
}

/// Owner-checked fetch: `NotFound` if absent, `Forbidden` if someone else's
pub fn get_recipient(conn: &Connection, owner_id: &str, id: &str) -> Result<Recipient> {
    let sql = format!("SELECT {} FROM recipients WHERE id = ?1", Recipient::COLUMNS);
    let recipient = conn
        .query_row(&sql, params![id], Recipient::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("recipient", id))?;

    if recipient.owner_id != owner_id {
        return Err(Error::forbidden("recipient", id));
    }
    Ok(recipient)
}

pub fn create_recipient(
    conn: &Connection,
    owner_id: &str,
    name: &str,
    address: Option<&str>,
) -> Result<Recipient> {
    let name = validated_name(name, "name", MAX_RECIPIENT_NAME_LENGTH)?;
    let address = validated_optional_text(address, "address", MAX_RECIPIENT_ADDRESS_LENGTH)?;

    let existing = list_recipients(conn, owner_id)?;
    ensure_name_available(&existing, &name, None, "recipient")?;

    insert_recipient(conn, Recipient::new(name, address, owner_id.to_string()))
}

pub fn update_recipient(
    conn: &Connection,
    owner_id: &str,
    id: &str,
    update: &RecipientUpdate,
) -> Result<Recipient> {
    let mut recipient = get_recipient(conn, owner_id, id)?;

    if let Some(name) = &update.name {
        let name = validated_name(name, "name", MAX_RECIPIENT_NAME_LENGTH)?;
        let existing = list_recipients(conn, owner_id)?;
        ensure_name_available(&existing, &name, Some(id), "recipient")?;
        recipient.name = name;
    }

    if let Some(address) = &update.address {
        recipient.address =
            validated_optional_text(address.as_deref(), "address", MAX_RECIPIENT_ADDRESS_LENGTH)?;
    }

    conn.execute(
        "UPDATE recipients SET name = ?1, address = ?2 WHERE id = ?3",
        params![recipient.name, recipient.address, recipient.id],
    )?;

    Ok(recipient)
}

/// Payment items pointing at the recipient keep existing with no recipient
pub fn delete_recipient(conn: &Connection, owner_id: &str, id: &str) -> Result<()> {
    get_recipient(conn, owner_id, id)?;
    conn.execute("DELETE FROM recipients WHERE id = ?1", params![id])?;
    Ok(())
}

/// Insert an already-validated recipient (used by the importer after reconciliation)
pub(crate) fn insert_recipient(conn: &Connection, recipient: Recipient) -> Result<Recipient> {
    conn.execute(
        "INSERT INTO recipients (id, name, address, owner_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            recipient.id,
            recipient.name,
            recipient.address,
            recipient.owner_id
        ],
    )?;
    Ok(recipient)
}

pub(crate) fn set_address(conn: &Connection, id: &str, address: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE recipients SET address = ?1 WHERE id = ?2",
        params![address, id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        for owner in ["alice", "bob"] {
            conn.execute(
                "INSERT INTO owners (id, username, created_at) VALUES (?1, ?1, '2024-01-01T00:00:00Z')",
                params![owner],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn test_create_normalizes_and_dedupes() {
        let conn = setup();
        let acme = create_recipient(&conn, "alice", "  ACME   Corp ", Some("123 Main St")).unwrap();
        assert_eq!(acme.name, "ACME Corp");
        assert_eq!(acme.address.as_deref(), Some("123 Main St"));

        let dup = create_recipient(&conn, "alice", "ACME\tCorp", None);
        assert!(matches!(dup, Err(Error::Conflict(_))));

        // Other owners have their own namespace; case differs too
        assert!(create_recipient(&conn, "bob", "ACME Corp", None).is_ok());
        assert!(create_recipient(&conn, "alice", "acme corp", None).is_ok());
    }

    #[test]
    fn test_update_excludes_self_from_dedup() {
        let conn = setup();
        let acme = create_recipient(&conn, "alice", "ACME", None).unwrap();
        create_recipient(&conn, "alice", "Globex", None).unwrap();

        let same_name = RecipientUpdate {
            name: Some(" ACME ".to_string()),
            address: Some(Some("1 Road".to_string())),
        };
        let updated = update_recipient(&conn, "alice", &acme.id, &same_name).unwrap();
        assert_eq!(updated.address.as_deref(), Some("1 Road"));

        let clash = RecipientUpdate {
            name: Some("Globex".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_recipient(&conn, "alice", &acme.id, &clash),
            Err(Error::Conflict(_))
        ));

        let clear = RecipientUpdate {
            address: Some(None),
            ..Default::default()
        };
        let cleared = update_recipient(&conn, "alice", &acme.id, &clear).unwrap();
        assert!(cleared.address.is_none());
        assert_eq!(get_recipient(&conn, "alice", &acme.id).unwrap(), cleared);
    }

    #[test]
    fn test_owner_checks_and_delete() {
        let conn = setup();
        let acme = create_recipient(&conn, "alice", "ACME", None).unwrap();

        assert!(matches!(
            get_recipient(&conn, "bob", &acme.id),
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            delete_recipient(&conn, "bob", &acme.id),
            Err(Error::Forbidden { .. })
        ));

        delete_recipient(&conn, "alice", &acme.id).unwrap();
        assert!(matches!(
            get_recipient(&conn, "alice", &acme.id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_length_caps() {
        let conn = setup();
        let long_name = "n".repeat(MAX_RECIPIENT_NAME_LENGTH + 1);
        assert!(matches!(
            create_recipient(&conn, "alice", &long_name, None),
            Err(Error::Validation(_))
        ));

        let long_address = "a".repeat(MAX_RECIPIENT_ADDRESS_LENGTH + 1);
        assert!(matches!(
            create_recipient(&conn, "alice", "ACME", Some(&long_address)),
            Err(Error::Validation(_))
        ));
    }
}
