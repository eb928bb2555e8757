// 💸 Payment Ledger - create, update, delete and filter payment items
//
// Tag sets go through the TagAssigner on every create and every tag change,
// so standard_tag_id cannot drift from the linked tags.

use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::collections::BTreeSet;

use crate::constants::MAX_DESCRIPTION_LENGTH;
use crate::descendants;
use crate::entities::{NewPaymentItem, OwnerDefaults, PaymentFilter, PaymentItem, PaymentItemUpdate};
use crate::error::{Error, Result};
use crate::names::validated_optional_text;
use crate::recipients;
use crate::tagging;

pub fn create_payment_item(
    conn: &Connection,
    owner_id: &str,
    new: &NewPaymentItem,
    defaults: &OwnerDefaults,
) -> Result<PaymentItem> {
    let description =
        validated_optional_text(new.description.as_deref(), "description", MAX_DESCRIPTION_LENGTH)?;

    if let Some(recipient_id) = &new.recipient_id {
        recipients::get_recipient(conn, owner_id, recipient_id)?;
    }

    // Omitted and empty both mean "fallback" on create
    let requested: &[String] = new.tag_ids.as_deref().unwrap_or(&[]);
    if !requested.is_empty() {
        tagging::validate_tag_set(conn, owner_id, requested)?;
    }

    let id = crate::entities::new_id();
    conn.execute(
        "INSERT INTO payment_items (
            id, owner_id, amount, date, periodic, description, recipient_id, standard_tag_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8)",
        params![
            id,
            owner_id,
            new.amount.to_string(),
            new.date,
            new.periodic,
            description,
            new.recipient_id,
            chrono::Utc::now(),
        ],
    )?;

    tagging::assign_tags(conn, owner_id, &id, Some(requested), defaults)?;

    get_payment_item(conn, owner_id, &id)
}

pub fn update_payment_item(
    conn: &Connection,
    owner_id: &str,
    id: &str,
    update: &PaymentItemUpdate,
    defaults: &OwnerDefaults,
) -> Result<PaymentItem> {
    let mut item = get_payment_item(conn, owner_id, id)?;

    if let Some(amount) = update.amount {
        item.amount = amount;
    }
    if let Some(date) = update.date {
        item.date = date;
    }
    if let Some(periodic) = update.periodic {
        item.periodic = periodic;
    }
    if let Some(description) = &update.description {
        item.description = validated_optional_text(
            description.as_deref(),
            "description",
            MAX_DESCRIPTION_LENGTH,
        )?;
    }
    if let Some(recipient_id) = &update.recipient_id {
        if let Some(recipient_id) = recipient_id {
            recipients::get_recipient(conn, owner_id, recipient_id)?;
        }
        item.recipient_id = recipient_id.clone();
    }

    if let Some(requested) = update.tag_ids.as_deref().filter(|ids| !ids.is_empty()) {
        tagging::validate_tag_set(conn, owner_id, requested)?;
    }

    conn.execute(
        "UPDATE payment_items
         SET amount = ?1, date = ?2, periodic = ?3, description = ?4, recipient_id = ?5
         WHERE id = ?6",
        params![
            item.amount.to_string(),
            item.date,
            item.periodic,
            item.description,
            item.recipient_id,
            item.id,
        ],
    )?;

    tagging::assign_tags(conn, owner_id, id, update.tag_ids.as_deref(), defaults)?;

    get_payment_item(conn, owner_id, id)
}

/// Owner-checked fetch including the tag set
pub fn get_payment_item(conn: &Connection, owner_id: &str, id: &str) -> Result<PaymentItem> {
    let sql = format!("SELECT {} FROM payment_items WHERE id = ?1", PaymentItem::COLUMNS);
    let mut item = conn
        .query_row(&sql, params![id], PaymentItem::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("payment item", id))?;

    if item.owner_id != owner_id {
        return Err(Error::forbidden("payment item", id));
    }

    item.tag_ids = tagging::load_tag_ids(conn, &item.id)?;
    Ok(item)
}

/// Tag links go with the item (ON DELETE CASCADE)
pub fn delete_payment_item(conn: &Connection, owner_id: &str, id: &str) -> Result<()> {
    get_payment_item(conn, owner_id, id)?;
    conn.execute("DELETE FROM payment_items WHERE id = ?1", params![id])?;
    Ok(())
}

/// List the owner's payment items, newest date first.
///
/// A tag filter matches items carrying any of the given tags or any of
/// their descendants.
pub fn list_payment_items(conn: &Connection, owner_id: &str, filter: &PaymentFilter) -> Result<Vec<PaymentItem>> {
    if filter.expense_only && filter.income_only {
        return Err(Error::validation(
            "filter",
            "choose only one of expense_only or income_only",
        ));
    }

    let mut sql = format!("SELECT {} FROM payment_items WHERE owner_id = ?", PaymentItem::COLUMNS);
    let mut values: Vec<Value> = vec![Value::Text(owner_id.to_string())];

    if filter.expense_only {
        sql.push_str(" AND CAST(amount AS REAL) < 0");
    }
    if filter.income_only {
        sql.push_str(" AND CAST(amount AS REAL) > 0");
    }

    if !filter.tag_ids.is_empty() {
        let roots: BTreeSet<String> = filter.tag_ids.iter().cloned().collect();
        let expanded = descendants::expand(conn, owner_id, &roots)?;

        let placeholders = vec!["?"; expanded.len()].join(", ");
        sql.push_str(&format!(
            " AND id IN (SELECT DISTINCT payment_item_id FROM payment_item_tags WHERE tag_id IN ({}))",
            placeholders
        ));
        values.extend(expanded.into_iter().map(Value::Text));
    }

    sql.push_str(" ORDER BY date DESC, rowid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut items = stmt
        .query_map(params_from_iter(values), PaymentItem::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for item in &mut items {
        item.tag_ids = tagging::load_tag_ids(conn, &item.id)?;
    }

    log::debug!("{} payment item(s) match {:?}", items.len(), filter);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::entities::NewTagNode;
    use crate::taxonomy;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Fixture {
        conn: Connection,
        defaults: OwnerDefaults,
        unclassified: String,
        food: String,
        groceries: String,
        rent: String,
        cash: String,
    }

    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        for owner in ["alice", "bob"] {
            conn.execute(
                "INSERT INTO owners (id, username, created_at) VALUES (?1, ?1, '2024-01-01T00:00:00Z')",
                params![owner],
            )
            .unwrap();
        }
        let standard = taxonomy::create_dimension(&conn, "alice", "standard", None).unwrap();
        let method = taxonomy::create_dimension(&conn, "alice", "payment method", None).unwrap();
        let add = |name: &str, dim: &str, parent: Option<&str>| {
            taxonomy::create_tag_node(
                &conn,
                "alice",
                &NewTagNode {
                    name: name.to_string(),
                    dimension_id: dim.to_string(),
                    parent_id: parent.map(str::to_string),
                    icon_ref: None,
                },
            )
            .unwrap()
            .id
        };

        let unclassified = add("UNCLASSIFIED", &standard.id, None);
        let food = add("Food", &standard.id, None);
        let groceries = add("Groceries", &standard.id, Some(&food));
        let rent = add("Rent", &standard.id, None);
        let cash = add("Cash", &method.id, None);
        let defaults = OwnerDefaults::resolve(&conn, "alice").unwrap();

        Fixture {
            conn,
            defaults,
            unclassified,
            food,
            groceries,
            rent,
            cash,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_create_with_empty_tags_uses_unclassified() {
        let f = fixture();
        let new = NewPaymentItem::new(dec!(-20), date(1)).with_tags(vec![]);
        let item = create_payment_item(&f.conn, "alice", &new, &f.defaults).unwrap();

        assert_eq!(item.tag_ids, vec![f.unclassified.clone()]);
        assert_eq!(item.standard_tag_id, Some(f.unclassified.clone()));

        // Omitted behaves the same on create
        let item = create_payment_item(&f.conn, "alice", &NewPaymentItem::new(dec!(5), date(2)), &f.defaults).unwrap();
        assert_eq!(item.standard_tag_id, Some(f.unclassified.clone()));
    }

    #[test]
    fn test_create_roundtrips_fields() {
        let f = fixture();
        let new = NewPaymentItem::new(dec!(-45.99), date(3))
            .with_description("  Weekly shop ")
            .with_tags(vec![f.groceries.clone(), f.cash.clone()])
            .periodic(true);
        let item = create_payment_item(&f.conn, "alice", &new, &f.defaults).unwrap();

        assert_eq!(item.amount, dec!(-45.99));
        assert_eq!(item.date, date(3));
        assert!(item.periodic);
        assert_eq!(item.description.as_deref(), Some("Weekly shop"));
        assert_eq!(item.tag_ids, vec![f.groceries.clone(), f.cash.clone()]);
        assert_eq!(item.standard_tag_id, Some(f.groceries.clone()));
        assert_eq!(get_payment_item(&f.conn, "alice", &item.id).unwrap(), item);
    }

    #[test]
    fn test_create_conflict_writes_nothing() {
        let f = fixture();
        let new = NewPaymentItem::new(dec!(-1), date(1)).with_tags(vec![f.food.clone(), f.rent.clone()]);
        assert!(matches!(
            create_payment_item(&f.conn, "alice", &new, &f.defaults),
            Err(Error::Conflict(_))
        ));

        let count: i64 = f
            .conn
            .query_row("SELECT COUNT(*) FROM payment_items", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_create_rejects_foreign_recipient() {
        let f = fixture();
        let bobs = recipients::create_recipient(&f.conn, "bob", "ACME", None).unwrap();

        let new = NewPaymentItem::new(dec!(-1), date(1)).with_recipient(bobs.id.clone());
        assert!(matches!(
            create_payment_item(&f.conn, "alice", &new, &f.defaults),
            Err(Error::Forbidden { .. })
        ));

        let new = NewPaymentItem::new(dec!(-1), date(1)).with_recipient("ghost");
        assert!(matches!(
            create_payment_item(&f.conn, "alice", &new, &f.defaults),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_tag_semantics() {
        let f = fixture();
        let new = NewPaymentItem::new(dec!(-10), date(1)).with_tags(vec![f.food.clone(), f.cash.clone()]);
        let item = create_payment_item(&f.conn, "alice", &new, &f.defaults).unwrap();

        // Omitted: untouched
        let amount_only = PaymentItemUpdate {
            amount: Some(dec!(-12)),
            ..Default::default()
        };
        let updated = update_payment_item(&f.conn, "alice", &item.id, &amount_only, &f.defaults).unwrap();
        assert_eq!(updated.amount, dec!(-12));
        assert_eq!(updated.tag_ids, item.tag_ids);
        assert_eq!(updated.standard_tag_id, Some(f.food.clone()));

        // Replace: shortcut follows the standard member
        let replace = PaymentItemUpdate {
            tag_ids: Some(vec![f.cash.clone()]),
            ..Default::default()
        };
        let updated = update_payment_item(&f.conn, "alice", &item.id, &replace, &f.defaults).unwrap();
        assert_eq!(updated.tag_ids, vec![f.cash.clone()]);
        assert_eq!(updated.standard_tag_id, None);

        // Empty: reset to fallback
        let reset = PaymentItemUpdate {
            tag_ids: Some(vec![]),
            ..Default::default()
        };
        let updated = update_payment_item(&f.conn, "alice", &item.id, &reset, &f.defaults).unwrap();
        assert_eq!(updated.tag_ids, vec![f.unclassified.clone()]);
        assert_eq!(updated.standard_tag_id, Some(f.unclassified.clone()));
    }

    #[test]
    fn test_update_conflict_keeps_previous_state() {
        let f = fixture();
        let new = NewPaymentItem::new(dec!(-10), date(1)).with_tags(vec![f.food.clone()]);
        let item = create_payment_item(&f.conn, "alice", &new, &f.defaults).unwrap();

        let bad = PaymentItemUpdate {
            amount: Some(dec!(999)),
            tag_ids: Some(vec![f.rent.clone(), f.groceries.clone()]),
            ..Default::default()
        };
        assert!(matches!(
            update_payment_item(&f.conn, "alice", &item.id, &bad, &f.defaults),
            Err(Error::Conflict(_))
        ));

        let unchanged = get_payment_item(&f.conn, "alice", &item.id).unwrap();
        assert_eq!(unchanged, item);
    }

    #[test]
    fn test_update_clears_recipient_and_description() {
        let f = fixture();
        let acme = recipients::create_recipient(&f.conn, "alice", "ACME", None).unwrap();
        let new = NewPaymentItem::new(dec!(-10), date(1))
            .with_recipient(acme.id.clone())
            .with_description("x");
        let item = create_payment_item(&f.conn, "alice", &new, &f.defaults).unwrap();
        assert_eq!(item.recipient_id, Some(acme.id.clone()));

        let clear = PaymentItemUpdate {
            recipient_id: Some(None),
            description: Some(None),
            ..Default::default()
        };
        let updated = update_payment_item(&f.conn, "alice", &item.id, &clear, &f.defaults).unwrap();
        assert!(updated.recipient_id.is_none());
        assert!(updated.description.is_none());
    }

    #[test]
    fn test_deleting_recipient_detaches_items() {
        let f = fixture();
        let acme = recipients::create_recipient(&f.conn, "alice", "ACME", None).unwrap();
        let new = NewPaymentItem::new(dec!(-10), date(1)).with_recipient(acme.id.clone());
        let item = create_payment_item(&f.conn, "alice", &new, &f.defaults).unwrap();

        recipients::delete_recipient(&f.conn, "alice", &acme.id).unwrap();
        assert!(get_payment_item(&f.conn, "alice", &item.id).unwrap().recipient_id.is_none());
    }

    #[test]
    fn test_delete_checks_owner() {
        let f = fixture();
        let item = create_payment_item(&f.conn, "alice", &NewPaymentItem::new(dec!(1), date(1)), &f.defaults).unwrap();

        assert!(matches!(
            delete_payment_item(&f.conn, "bob", &item.id),
            Err(Error::Forbidden { .. })
        ));
        delete_payment_item(&f.conn, "alice", &item.id).unwrap();
        assert!(matches!(
            get_payment_item(&f.conn, "alice", &item.id),
            Err(Error::NotFound { .. })
        ));
        assert!(tagging::load_tag_ids(&f.conn, &item.id).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters() {
        let f = fixture();
        let mk = |amount, day, tags: Vec<String>| {
            create_payment_item(
                &f.conn,
                "alice",
                &NewPaymentItem::new(amount, date(day)).with_tags(tags),
                &f.defaults,
            )
            .unwrap()
            .id
        };

        let groceries = mk(dec!(-30), 1, vec![f.groceries.clone()]);
        let food = mk(dec!(-12), 2, vec![f.food.clone(), f.cash.clone()]);
        let rent = mk(dec!(-800), 3, vec![f.rent.clone()]);
        let refund = mk(dec!(15), 4, vec![f.groceries.clone()]);

        let ids = |filter: PaymentFilter| -> Vec<String> {
            list_payment_items(&f.conn, "alice", &filter)
                .unwrap()
                .into_iter()
                .map(|p| p.id)
                .collect()
        };

        // Newest first
        assert_eq!(ids(PaymentFilter::default()), vec![refund.clone(), rent.clone(), food.clone(), groceries.clone()]);

        // Parent includes descendants, excludes siblings
        let by_food = ids(PaymentFilter {
            tag_ids: vec![f.food.clone()],
            ..Default::default()
        });
        assert_eq!(by_food, vec![refund.clone(), food.clone(), groceries.clone()]);

        // OR across filter tags
        let by_two = ids(PaymentFilter {
            tag_ids: vec![f.rent.clone(), f.cash.clone()],
            ..Default::default()
        });
        assert_eq!(by_two, vec![rent.clone(), food.clone()]);

        let income = ids(PaymentFilter {
            income_only: true,
            ..Default::default()
        });
        assert_eq!(income, vec![refund.clone()]);

        let expenses_in_food = ids(PaymentFilter {
            tag_ids: vec![f.food.clone()],
            expense_only: true,
            ..Default::default()
        });
        assert_eq!(expenses_in_food, vec![food, groceries]);

        // Other owners see nothing
        assert!(list_payment_items(&f.conn, "bob", &PaymentFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_list_rejects_both_sign_filters() {
        let f = fixture();
        let filter = PaymentFilter {
            expense_only: true,
            income_only: true,
            ..Default::default()
        };
        assert!(matches!(
            list_payment_items(&f.conn, "alice", &filter),
            Err(Error::Validation(_))
        ));
    }
}
