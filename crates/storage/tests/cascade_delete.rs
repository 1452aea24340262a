#![forbid(unsafe_code)]

use std::path::PathBuf;
use tb_storage::{
    CardCreateRequest, ChecklistItemConvertRequest, ChecklistItemCreateRequest, SqliteStore,
    StoreError,
};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("tb_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn seed_board(store: &mut SqliteStore) -> (String, String) {
    let board_id = store.board_create("Cascade board").expect("create board");
    let backlog = store
        .task_create(&board_id, "Backlog")
        .expect("create backlog task");
    store
        .task_create(&board_id, "Done")
        .expect("create done task");
    (board_id, backlog)
}

fn seed_card(store: &mut SqliteStore, task_id: &str, name: &str) -> String {
    store
        .card_create(CardCreateRequest {
            task_id: task_id.to_string(),
            name: name.to_string(),
            description: None,
            priority: "medium".to_string(),
            release_tag: None,
            assigned_user_ids: Vec::new(),
            label_ids: Vec::new(),
            team_ids: Vec::new(),
            actor: Some("fixture".to_string()),
        })
        .expect("create card")
        .id
}

fn seed_item(store: &mut SqliteStore, card_id: &str, title: &str) -> String {
    store
        .checklist_item_create(ChecklistItemCreateRequest {
            card_id: card_id.to_string(),
            title: title.to_string(),
            due_date_ms: None,
            assigned_user_ids: Vec::new(),
            actor: Some("fixture".to_string()),
        })
        .expect("create item")
        .id
}

fn convert(store: &mut SqliteStore, item_id: &str, task_id: &str, parent_card_id: &str) -> String {
    store
        .checklist_item_convert(ChecklistItemConvertRequest {
            item_id: item_id.to_string(),
            target_task_id: task_id.to_string(),
            parent_card_id: parent_card_id.to_string(),
            parent_url: format!("https://boards.example/card/{parent_card_id}"),
            actor: Some("fixture".to_string()),
        })
        .expect("convert item")
        .card_id
}

#[test]
fn deleting_converted_item_removes_descendant_subtree() {
    let mut store = SqliteStore::open(temp_dir("subtree")).expect("open store");
    let (_, backlog) = seed_board(&mut store);

    // A owns I1 -> B; B owns I2 -> C.
    let card_a = seed_card(&mut store, &backlog, "Card A");
    let item_1 = seed_item(&mut store, &card_a, "Item one");
    let card_b = convert(&mut store, &item_1, &backlog, &card_a);
    let item_2 = seed_item(&mut store, &card_b, "Item two");
    let card_c = convert(&mut store, &item_2, &backlog, &card_b);
    // Give the leaf card an audit trail of its own so the cascade has
    // activity rows to erase on every doomed card, not just B.
    let item_3 = seed_item(&mut store, &card_c, "Item three");

    assert!(!store.activities(&card_b).expect("b activities").is_empty());
    assert!(!store.activities(&card_c).expect("c activities").is_empty());

    store
        .checklist_item_delete(&item_1, Some("jane"))
        .expect("delete item");

    assert!(store.card(&card_b).expect("load b").is_none());
    assert!(store.card(&card_c).expect("load c").is_none());
    assert!(store.checklist_item(&item_3).expect("load i3").is_none());
    assert!(store.checklist_item(&item_2).expect("load i2").is_none());
    assert!(store.checklist_item(&item_1).expect("load i1").is_none());

    assert!(store.dependencies_touching(&card_b).expect("b edges").is_empty());
    assert!(store.dependencies_touching(&card_c).expect("c edges").is_empty());
    assert!(store.dependencies_touching(&card_a).expect("a edges").is_empty());

    assert!(store.activities(&card_b).expect("b activities").is_empty());
    assert!(store.activities(&card_c).expect("c activities").is_empty());

    // The owner survives with its audit trail, including the deletion record
    // written before the item row went away.
    assert!(store.card(&card_a).expect("load a").is_some());
    let trail = store.activities(&card_a).expect("a activities");
    assert!(
        trail
            .iter()
            .any(|row| row.event_type == "CHECKLIST_ITEM_DELETED"),
        "owner keeps the deletion record"
    );
}

#[test]
fn delete_all_runs_single_combined_cascade() {
    let mut store = SqliteStore::open(temp_dir("delete_all")).expect("open store");
    let (_, backlog) = seed_board(&mut store);

    let card_a = seed_card(&mut store, &backlog, "Card A");
    let item_1 = seed_item(&mut store, &card_a, "Plain item");
    let item_2 = seed_item(&mut store, &card_a, "Converted one");
    let item_3 = seed_item(&mut store, &card_a, "Converted two");
    let card_b = convert(&mut store, &item_2, &backlog, &card_a);
    let card_c = convert(&mut store, &item_3, &backlog, &card_a);

    let deleted = store
        .checklist_delete_all(&card_a, Some("jane"))
        .expect("delete all");
    assert_eq!(deleted, 3);

    for item_id in [&item_1, &item_2, &item_3] {
        assert!(store.checklist_item(item_id).expect("load item").is_none());
    }
    assert!(store.card(&card_b).expect("load b").is_none());
    assert!(store.card(&card_c).expect("load c").is_none());
    assert!(store.dependencies_touching(&card_a).expect("a edges").is_empty());

    let summaries: Vec<_> = store
        .activities(&card_a)
        .expect("a activities")
        .into_iter()
        .filter(|row| row.event_type == "CHECKLIST_DELETE_ALL")
        .collect();
    assert_eq!(summaries.len(), 1, "exactly one summary record");
}

#[test]
fn delete_all_without_conversions_skips_cascade() {
    let mut store = SqliteStore::open(temp_dir("delete_all_plain")).expect("open store");
    let (_, backlog) = seed_board(&mut store);

    let card_a = seed_card(&mut store, &backlog, "Card A");
    seed_item(&mut store, &card_a, "One");
    seed_item(&mut store, &card_a, "Two");

    // Empty root set: the cascade engine must be a no-op, not an error.
    let deleted = store
        .checklist_delete_all(&card_a, None)
        .expect("delete all");
    assert_eq!(deleted, 2);
    assert!(store.checklist_items(&card_a).expect("items").is_empty());
    assert!(store.card(&card_a).expect("load a").is_some());
}

#[test]
fn delete_all_on_missing_card_is_not_found() {
    let mut store = SqliteStore::open(temp_dir("delete_all_missing")).expect("open store");
    let err = store
        .checklist_delete_all("CARD-000404", None)
        .expect_err("missing card must fail");
    assert!(matches!(err, StoreError::NotFound("card")));
}

#[test]
fn cascade_leaves_unrelated_rows_untouched() {
    let mut store = SqliteStore::open(temp_dir("unrelated")).expect("open store");
    let (_, backlog) = seed_board(&mut store);

    let card_a = seed_card(&mut store, &backlog, "Card A");
    let item_a = seed_item(&mut store, &card_a, "Doomed");
    let card_b = convert(&mut store, &item_a, &backlog, &card_a);

    let other = seed_card(&mut store, &backlog, "Bystander");
    let other_item = seed_item(&mut store, &other, "Keep me");
    let other_converted = convert(&mut store, &other_item, &backlog, &other);

    store
        .checklist_item_delete(&item_a, None)
        .expect("delete item");

    assert!(store.card(&card_b).expect("load b").is_none());
    assert!(store.card(&other).expect("load other").is_some());
    assert!(
        store
            .card(&other_converted)
            .expect("load other converted")
            .is_some()
    );
    let kept = store
        .checklist_item(&other_item)
        .expect("load other item")
        .expect("other item survives");
    assert_eq!(kept.converted_card_id.as_deref(), Some(other_converted.as_str()));
    assert_eq!(
        store.dependencies_touching(&other).expect("other edges").len(),
        1
    );
    assert!(!store.activities(&other).expect("other activities").is_empty());
}
