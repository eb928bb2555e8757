use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// What an audit event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Owner,
    Dimension,
    Tag,
    Recipient,
    PaymentItem,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Owner => "owner",
            EntityKind::Dimension => "dimension",
            EntityKind::Tag => "tag",
            EntityKind::Recipient => "recipient",
            EntityKind::PaymentItem => "payment_item",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "owner" => Some(EntityKind::Owner),
            "dimension" => Some(EntityKind::Dimension),
            "tag" => Some(EntityKind::Tag),
            "recipient" => Some(EntityKind::Recipient),
            "payment_item" => Some(EntityKind::PaymentItem),
            _ => None,
        }
    }
}

/// One audit-trail entry. Every committed mutation appends one, scoped to
/// the owner it ran for.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEvent {
    pub event_id: String,
    pub owner_id: String,
    pub entity: EntityKind,
    pub entity_id: String,
    /// e.g. `tag_created`, `batch_imported`
    pub action: String,
    pub data: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        owner_id: &str,
        entity: EntityKind,
        entity_id: &str,
        action: &str,
        data: serde_json::Value,
    ) -> Self {
        AuditEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            entity,
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            data,
            recorded_at: Utc::now(),
        }
    }
}

/// Open (or create) the database described by `config` and make sure the schema exists
pub fn open_database(config: &Config) -> Result<Connection> {
    let conn = Connection::open(&config.database_path)?;

    if config.wal {
        // journal_mode answers with the mode actually in effect
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("journal_mode = {}", mode);
    }

    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Referential integrity is off by default in SQLite
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS owners (
            id TEXT PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dimensions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            owner_id TEXT NOT NULL REFERENCES owners(id)
        );

        CREATE TABLE IF NOT EXISTS tag_nodes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            dimension_id TEXT NOT NULL REFERENCES dimensions(id),
            parent_id TEXT REFERENCES tag_nodes(id),
            icon_ref TEXT,
            owner_id TEXT NOT NULL REFERENCES owners(id)
        );

        CREATE TABLE IF NOT EXISTS recipients (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT,
            owner_id TEXT NOT NULL REFERENCES owners(id)
        );

        CREATE TABLE IF NOT EXISTS payment_items (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES owners(id),
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            periodic INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            recipient_id TEXT REFERENCES recipients(id) ON DELETE SET NULL,
            standard_tag_id TEXT REFERENCES tag_nodes(id),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS payment_item_tags (
            payment_item_id TEXT NOT NULL REFERENCES payment_items(id) ON DELETE CASCADE,
            tag_id TEXT NOT NULL REFERENCES tag_nodes(id),
            PRIMARY KEY (payment_item_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            owner_id TEXT NOT NULL REFERENCES owners(id),
            entity_kind TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            action TEXT NOT NULL,
            data TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_dimensions_owner ON dimensions(owner_id);
        CREATE INDEX IF NOT EXISTS idx_tag_nodes_owner ON tag_nodes(owner_id);
        CREATE INDEX IF NOT EXISTS idx_tag_nodes_parent ON tag_nodes(parent_id);
        CREATE INDEX IF NOT EXISTS idx_tag_nodes_dimension ON tag_nodes(dimension_id);
        CREATE INDEX IF NOT EXISTS idx_recipients_owner ON recipients(owner_id);
        CREATE INDEX IF NOT EXISTS idx_payment_items_owner ON payment_items(owner_id);
        CREATE INDEX IF NOT EXISTS idx_payment_item_tags_tag ON payment_item_tags(tag_id);
        CREATE INDEX IF NOT EXISTS idx_events_owner ON events(owner_id, entity_kind, entity_id);",
    )?;

    Ok(())
}

/// Append one event to the audit trail
pub fn append_event(conn: &Connection, event: &AuditEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO events (event_id, owner_id, entity_kind, entity_id, action, data, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.owner_id,
            event.entity.as_str(),
            event.entity_id,
            event.action,
            serde_json::to_string(&event.data)?,
            event.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

const EVENT_COLUMNS: &str = "event_id, owner_id, entity_kind, entity_id, action, data, recorded_at";

/// Events an owner recorded against one entity, oldest first
pub fn events_for_entity(
    conn: &Connection,
    owner_id: &str,
    entity: EntityKind,
    entity_id: &str,
) -> Result<Vec<AuditEvent>> {
    let sql = format!(
        "SELECT {} FROM events
         WHERE owner_id = ?1 AND entity_kind = ?2 AND entity_id = ?3
         ORDER BY id ASC",
        EVENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params![owner_id, entity.as_str(), entity_id], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// The owner's whole audit trail, oldest first
pub fn events_for_owner(conn: &Connection, owner_id: &str) -> Result<Vec<AuditEvent>> {
    let sql = format!("SELECT {} FROM events WHERE owner_id = ?1 ORDER BY id ASC", EVENT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params![owner_id], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEvent> {
    let kind: String = row.get(2)?;
    let entity = EntityKind::parse(&kind).ok_or_else(|| {
        conversion_error(2, Error::Corrupt(format!("unknown entity kind \"{}\"", kind)))
    })?;
    let data: String = row.get(5)?;
    let recorded_at: String = row.get(6)?;

    Ok(AuditEvent {
        event_id: row.get(0)?,
        owner_id: row.get(1)?,
        entity,
        entity_id: row.get(3)?,
        action: row.get(4)?,
        data: serde_json::from_str(&data).map_err(|e| conversion_error(5, e))?,
        recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
            .map_err(|e| conversion_error(6, e))?
            .with_timezone(&Utc),
    })
}

/// Map a text column that failed to decode into a rusqlite conversion error
pub(crate) fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
