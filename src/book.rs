// 📒 Book - the public face of the engine
//
// Every mutating call runs in exactly one SQLite transaction: the component
// functions do their reads and writes against it, an audit event is appended,
// and the transaction commits. Any error drops the transaction, which rolls
// back everything the call wrote.
//
// Reads go straight to the connection.

use rusqlite::{Connection, Transaction};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::constants::MAX_CATEGORY_NAME_LENGTH;
use crate::db::{self, AuditEvent, EntityKind};
use crate::descendants;
use crate::entities::{
    Dimension, NewPaymentItem, NewTagNode, Owner, OwnerDefaults, PaymentFilter, PaymentItem,
    PaymentItemUpdate, Recipient, RecipientUpdate, TagNode, TagNodeUpdate, TagTree,
};
use crate::error::{Error, Result};
use crate::import::{self, ImportReport};
use crate::names::{ensure_name_available, validated_name};
use crate::{owners, payments, recipients, taxonomy};

pub struct Book {
    conn: Connection,
}

impl Book {
    pub fn open(config: &Config) -> Result<Self> {
        let conn = db::open_database(config)?;
        log::info!("opened book at {}", config.database_path.display());
        Ok(Book { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::setup_database(&conn)?;
        Ok(Book { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `work` inside one transaction; commit on `Ok`, roll back on `Err`
    fn unit_of_work<T, F>(&mut self, operation: &str, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        match work(&tx) {
            Ok(value) => {
                tx.commit()?;
                log::info!("{} committed", operation);
                Ok(value)
            }
            Err(err) => {
                log::warn!("{} rejected: {}", operation, err);
                Err(err)
            }
        }
    }

    // ========================================================================
    // OWNERS
    // ========================================================================

    pub fn provision_owner(&mut self, username: &str) -> Result<Owner> {
        self.unit_of_work("provision_owner", |tx| {
            let (owner, defaults) = owners::provision_owner(tx, username)?;
            record(
                tx,
                &owner.id,
                EntityKind::Owner,
                &owner.id,
                "owner_provisioned",
                json!({
                    "username": owner.username,
                    "standard_dimension_id": defaults.standard_dimension_id,
                    "unclassified_tag_id": defaults.unclassified_tag_id,
                }),
            )?;
            Ok(owner)
        })
    }

    pub fn find_owner(&self, username: &str) -> Result<Owner> {
        owners::find_owner(&self.conn, username)?.ok_or_else(|| Error::not_found("owner", username))
    }

    pub fn owner_defaults(&self, owner_id: &str) -> Result<OwnerDefaults> {
        owners::require_owner(&self.conn, owner_id)?;
        OwnerDefaults::resolve(&self.conn, owner_id)
    }

    // ========================================================================
    // DIMENSIONS
    // ========================================================================

    pub fn create_dimension(
        &mut self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Dimension> {
        self.unit_of_work("create_dimension", |tx| {
            owners::require_owner(tx, owner_id)?;
            let name = validated_name(name, "name", MAX_CATEGORY_NAME_LENGTH)?;
            let existing = taxonomy::list_dimensions(tx, owner_id)?;
            ensure_name_available(&existing, &name, None, "dimension")?;

            let dimension = taxonomy::create_dimension(tx, owner_id, &name, description)?;
            record(tx, owner_id, EntityKind::Dimension, &dimension.id, "dimension_created", json!(dimension))?;
            Ok(dimension)
        })
    }

    pub fn get_dimension(&self, owner_id: &str, id: &str) -> Result<Dimension> {
        taxonomy::get_dimension(&self.conn, owner_id, id)
    }

    pub fn list_dimensions(&self, owner_id: &str) -> Result<Vec<Dimension>> {
        taxonomy::list_dimensions(&self.conn, owner_id)
    }

    // ========================================================================
    // TAG NODES
    // ========================================================================

    /// Tag names are unique per owner across all dimensions
    pub fn create_tag_node(&mut self, owner_id: &str, new: &NewTagNode) -> Result<TagNode> {
        self.unit_of_work("create_tag_node", |tx| {
            owners::require_owner(tx, owner_id)?;
            let name = validated_name(&new.name, "name", MAX_CATEGORY_NAME_LENGTH)?;
            let existing = taxonomy::list_tag_nodes(tx, owner_id)?;
            ensure_name_available(&existing, &name, None, "tag")?;

            let tag = taxonomy::create_tag_node(tx, owner_id, new)?;
            record(tx, owner_id, EntityKind::Tag, &tag.id, "tag_created", json!(tag))?;
            Ok(tag)
        })
    }

    pub fn update_tag_node(&mut self, owner_id: &str, id: &str, update: &TagNodeUpdate) -> Result<TagNode> {
        self.unit_of_work("update_tag_node", |tx| {
            if let Some(name) = &update.name {
                let name = validated_name(name, "name", MAX_CATEGORY_NAME_LENGTH)?;
                let existing = taxonomy::list_tag_nodes(tx, owner_id)?;
                ensure_name_available(&existing, &name, Some(id), "tag")?;
            }

            let tag = taxonomy::update_tag_node(tx, owner_id, id, update)?;
            record(tx, owner_id, EntityKind::Tag, &tag.id, "tag_updated", json!(tag))?;
            Ok(tag)
        })
    }

    pub fn get_tag_node(&self, owner_id: &str, id: &str) -> Result<TagNode> {
        taxonomy::get_tag_node(&self.conn, owner_id, id)
    }

    pub fn list_tag_nodes(&self, owner_id: &str) -> Result<Vec<TagNode>> {
        taxonomy::list_tag_nodes(&self.conn, owner_id)
    }

    pub fn list_tag_nodes_by_dimension(&self, owner_id: &str, dimension_id: &str) -> Result<Vec<TagNode>> {
        taxonomy::list_tag_nodes_by_dimension(&self.conn, owner_id, dimension_id)
    }

    pub fn list_descendants(&self, owner_id: &str, tag_id: &str) -> Result<Vec<TagNode>> {
        descendants::list_descendants(&self.conn, owner_id, tag_id)
    }

    pub fn tag_tree(&self, owner_id: &str, tag_id: &str) -> Result<TagTree> {
        taxonomy::tag_tree(&self.conn, owner_id, tag_id)
    }

    pub fn tag_path(&self, owner_id: &str, tag_id: &str) -> Result<Vec<String>> {
        taxonomy::tag_path(&self.conn, owner_id, tag_id)
    }

    // ========================================================================
    // RECIPIENTS
    // ========================================================================

    pub fn create_recipient(&mut self, owner_id: &str, name: &str, address: Option<&str>) -> Result<Recipient> {
        self.unit_of_work("create_recipient", |tx| {
            owners::require_owner(tx, owner_id)?;
            let recipient = recipients::create_recipient(tx, owner_id, name, address)?;
            record(tx, owner_id, EntityKind::Recipient, &recipient.id, "recipient_created", json!(recipient))?;
            Ok(recipient)
        })
    }

    pub fn update_recipient(&mut self, owner_id: &str, id: &str, update: &RecipientUpdate) -> Result<Recipient> {
        self.unit_of_work("update_recipient", |tx| {
            let recipient = recipients::update_recipient(tx, owner_id, id, update)?;
            record(tx, owner_id, EntityKind::Recipient, &recipient.id, "recipient_updated", json!(recipient))?;
            Ok(recipient)
        })
    }

    pub fn get_recipient(&self, owner_id: &str, id: &str) -> Result<Recipient> {
        recipients::get_recipient(&self.conn, owner_id, id)
    }

    pub fn list_recipients(&self, owner_id: &str) -> Result<Vec<Recipient>> {
        recipients::list_recipients(&self.conn, owner_id)
    }

    pub fn delete_recipient(&mut self, owner_id: &str, id: &str) -> Result<()> {
        self.unit_of_work("delete_recipient", |tx| {
            recipients::delete_recipient(tx, owner_id, id)?;
            record(tx, owner_id, EntityKind::Recipient, id, "recipient_deleted", json!({}))
        })
    }

    // ========================================================================
    // PAYMENT ITEMS
    // ========================================================================

    pub fn create_payment_item(&mut self, owner_id: &str, new: &NewPaymentItem) -> Result<PaymentItem> {
        self.unit_of_work("create_payment_item", |tx| {
            owners::require_owner(tx, owner_id)?;
            let defaults = OwnerDefaults::resolve(tx, owner_id)?;
            let item = payments::create_payment_item(tx, owner_id, new, &defaults)?;
            record(tx, owner_id, EntityKind::PaymentItem, &item.id, "payment_item_created", json!(item))?;
            Ok(item)
        })
    }

    pub fn update_payment_item(
        &mut self,
        owner_id: &str,
        id: &str,
        update: &PaymentItemUpdate,
    ) -> Result<PaymentItem> {
        self.unit_of_work("update_payment_item", |tx| {
            let defaults = OwnerDefaults::resolve(tx, owner_id)?;
            let item = payments::update_payment_item(tx, owner_id, id, update, &defaults)?;
            record(tx, owner_id, EntityKind::PaymentItem, &item.id, "payment_item_updated", json!(item))?;
            Ok(item)
        })
    }

    pub fn get_payment_item(&self, owner_id: &str, id: &str) -> Result<PaymentItem> {
        payments::get_payment_item(&self.conn, owner_id, id)
    }

    pub fn delete_payment_item(&mut self, owner_id: &str, id: &str) -> Result<()> {
        self.unit_of_work("delete_payment_item", |tx| {
            payments::delete_payment_item(tx, owner_id, id)?;
            record(tx, owner_id, EntityKind::PaymentItem, id, "payment_item_deleted", json!({}))
        })
    }

    pub fn list_payment_items(&self, owner_id: &str, filter: &PaymentFilter) -> Result<Vec<PaymentItem>> {
        payments::list_payment_items(&self.conn, owner_id, filter)
    }

    // ========================================================================
    // IMPORT
    // ========================================================================

    /// All-or-nothing bulk import of `;`-separated text
    pub fn import_batch(&mut self, owner_id: &str, text: &str) -> Result<ImportReport> {
        self.unit_of_work("import_batch", |tx| {
            owners::require_owner(tx, owner_id)?;
            let defaults = OwnerDefaults::resolve(tx, owner_id)?;
            let report = import::import_batch(tx, owner_id, text, &defaults)?;

            let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
            record(
                tx,
                owner_id,
                EntityKind::Owner,
                owner_id,
                "batch_imported",
                json!({ "sha256": digest, "report": report }),
            )?;

            log::info!(
                "imported {} transaction(s): {} recipient(s) created, {} updated, {} tag(s) created",
                report.created_transactions,
                report.created_recipients,
                report.updated_recipients,
                report.created_tags
            );
            Ok(report)
        })
    }

    // ========================================================================
    // AUDIT TRAIL
    // ========================================================================

    pub fn events_for(&self, owner_id: &str, entity: EntityKind, entity_id: &str) -> Result<Vec<AuditEvent>> {
        db::events_for_entity(&self.conn, owner_id, entity, entity_id)
    }

    pub fn owner_events(&self, owner_id: &str) -> Result<Vec<AuditEvent>> {
        db::events_for_owner(&self.conn, owner_id)
    }
}

fn record(
    conn: &Connection,
    owner_id: &str,
    entity: EntityKind,
    entity_id: &str,
    action: &str,
    data: serde_json::Value,
) -> Result<()> {
    db::append_event(conn, &AuditEvent::new(owner_id, entity, entity_id, action, data))
}
