// End-to-end runs through the Book facade against an on-disk database

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use financebook::{
    Book, Config, EntityKind, Error, NewPaymentItem, NewTagNode, PaymentFilter, PaymentItemUpdate,
    TagNodeUpdate,
};

const HEADER: &str = "amount;date;description;recipient_name;recipient_address;tag_name;periodic";

fn open(dir: &TempDir) -> Book {
    let config = Config::default().with_database_path(dir.path().join("book.db"));
    Book::open(&config).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let owner_id = {
        let mut book = open(&dir);
        let owner = book.provision_owner("alice").unwrap();
        book.create_recipient(&owner.id, "ACME", Some("123 Main St")).unwrap();
        owner.id
    };

    let book = open(&dir);
    assert_eq!(book.find_owner("alice").unwrap().id, owner_id);
    let recipients = book.list_recipients(&owner_id).unwrap();
    assert_eq!(recipients.len(), 1);
    assert_eq!(recipients[0].address.as_deref(), Some("123 Main St"));
}

#[test]
fn test_hierarchy_filter_and_retagging() {
    let dir = TempDir::new().unwrap();
    let mut book = open(&dir);
    let alice = book.provision_owner("alice").unwrap();
    let defaults = book.owner_defaults(&alice.id).unwrap();
    let standard = defaults.standard_dimension_id.clone().unwrap();

    let add = |book: &mut Book, name: &str, dimension: &str, parent: Option<&str>| {
        book.create_tag_node(
            &alice.id,
            &NewTagNode {
                name: name.to_string(),
                dimension_id: dimension.to_string(),
                parent_id: parent.map(str::to_string),
                icon_ref: None,
            },
        )
        .unwrap()
    };

    let food = add(&mut book, "Food", &standard, None);
    let restaurants = add(&mut book, "Restaurants", &standard, Some(&food.id));
    let fast_food = add(&mut book, "Fast Food", &standard, Some(&restaurants.id));
    let transport = add(&mut book, "Transport", &standard, None);
    let method = book.create_dimension(&alice.id, "payment method", None).unwrap();
    let card = add(&mut book, "Card", &method.id, None);

    assert_eq!(
        book.tag_path(&alice.id, &fast_food.id).unwrap(),
        vec!["Food", "Restaurants", "Fast Food"]
    );
    let food_tree = book.tag_tree(&alice.id, &food.id).unwrap();
    assert_eq!(food_tree.size(), 3);
    assert_eq!(food_tree.children[0].node.id, restaurants.id);
    assert_eq!(food_tree.children[0].children[0].node.id, fast_food.id);

    let burger = book
        .create_payment_item(
            &alice.id,
            &NewPaymentItem::new(dec!(-9.50), date(2024, 3, 2))
                .with_tags(vec![fast_food.id.clone(), card.id.clone()]),
        )
        .unwrap();
    let bus = book
        .create_payment_item(
            &alice.id,
            &NewPaymentItem::new(dec!(-2.80), date(2024, 3, 1)).with_tags(vec![transport.id.clone()]),
        )
        .unwrap();
    assert_eq!(burger.standard_tag_id, Some(fast_food.id.clone()));

    let by_food: Vec<String> = book
        .list_payment_items(
            &alice.id,
            &PaymentFilter {
                tag_ids: vec![food.id.clone()],
                ..Default::default()
            },
        )
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(by_food, vec![burger.id.clone()]);

    // Moving Restaurants under Transport moves its payments with it
    book.update_tag_node(
        &alice.id,
        &restaurants.id,
        &TagNodeUpdate {
            parent_id: Some(Some(transport.id.clone())),
            ..Default::default()
        },
    )
    .unwrap();
    let by_transport = book
        .list_payment_items(
            &alice.id,
            &PaymentFilter {
                tag_ids: vec![transport.id.clone()],
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(by_transport.len(), 2);
    assert_eq!(book.tag_tree(&alice.id, &transport.id).unwrap().size(), 3);
    assert_eq!(book.tag_tree(&alice.id, &food.id).unwrap().size(), 1);

    // Cycles are refused
    let cycle = book.update_tag_node(
        &alice.id,
        &transport.id,
        &TagNodeUpdate {
            parent_id: Some(Some(fast_food.id.clone())),
            ..Default::default()
        },
    );
    assert!(matches!(cycle, Err(Error::Validation(_))));

    // Explicit reset lands on UNCLASSIFIED
    let reset = book
        .update_payment_item(
            &alice.id,
            &bus.id,
            &PaymentItemUpdate {
                tag_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(reset.standard_tag_id, defaults.unclassified_tag_id);
}

#[test]
fn test_import_then_reimport() {
    let dir = TempDir::new().unwrap();
    let mut book = open(&dir);
    let alice = book.provision_owner("alice").unwrap();
    let text = format!("{}\n100;2024-01-01;Groceries;ACME;123 Main St;Food;false\n", HEADER);

    let first = book.import_batch(&alice.id, &text).unwrap();
    assert_eq!(
        (first.created_transactions, first.created_recipients, first.updated_recipients, first.created_tags),
        (1, 1, 0, 1)
    );

    let second = book.import_batch(&alice.id, &text).unwrap();
    assert_eq!(
        (second.created_transactions, second.created_recipients, second.updated_recipients, second.created_tags),
        (1, 0, 0, 0)
    );

    let items = book.list_payment_items(&alice.id, &PaymentFilter::default()).unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|p| p.amount == dec!(100)));
}

#[test]
fn test_failed_import_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let mut book = open(&dir);
    let alice = book.provision_owner("alice").unwrap();
    let text = format!(
        "{}\n-5;2024-01-01;;ACME;;Food;false\n-6;2024-02-30;;Globex;;Rent;false\n",
        HEADER
    );

    match book.import_batch(&alice.id, &text) {
        Err(Error::Validation(err)) => {
            assert_eq!(err.row, Some(3));
            assert_eq!(err.field, "date");
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    assert!(book.list_recipients(&alice.id).unwrap().is_empty());
    assert_eq!(book.list_tag_nodes(&alice.id).unwrap().len(), 1);
    assert!(book
        .events_for(&alice.id, EntityKind::Owner, &alice.id)
        .unwrap()
        .iter()
        .all(|e| e.action != "batch_imported"));
}

#[test]
fn test_owners_are_isolated() {
    let dir = TempDir::new().unwrap();
    let mut book = open(&dir);
    let alice = book.provision_owner("alice").unwrap();
    let bob = book.provision_owner("bob").unwrap();

    let acme = book.create_recipient(&alice.id, "ACME", None).unwrap();
    let bobs_tag = book.list_tag_nodes(&bob.id).unwrap().remove(0);

    assert!(matches!(
        book.get_recipient(&bob.id, &acme.id),
        Err(Error::Forbidden { .. })
    ));
    assert!(matches!(
        book.create_payment_item(
            &alice.id,
            &NewPaymentItem::new(dec!(1), date(2024, 1, 1)).with_tags(vec![bobs_tag.id.clone()]),
        ),
        Err(Error::Forbidden { .. })
    ));
    assert!(matches!(
        book.list_descendants(&alice.id, &bobs_tag.id),
        Err(Error::Forbidden { .. })
    ));
}
