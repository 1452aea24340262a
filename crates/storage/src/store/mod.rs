#![forbid(unsafe_code)]

mod activity;
mod boards;
mod cards;
mod cascade;
mod checklist;
mod descendants;
mod error;
mod requests;
mod types;

pub use error::StoreError;
pub use requests::*;
pub use types::*;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE: &str = "taskboard.db";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

// Relational integrity across the derivation graph is enforced by the engine
// inside each transaction, not by foreign-key clauses; cascade deletion owns
// the cross-table cleanup ordering.
fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS counters (
          name TEXT PRIMARY KEY,
          value INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS boards (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
          id TEXT PRIMARY KEY,
          board_id TEXT NOT NULL,
          category TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
          id TEXT PRIMARY KEY,
          task_id TEXT NOT NULL,
          name TEXT NOT NULL,
          description TEXT,
          priority TEXT NOT NULL,
          is_completed INTEGER NOT NULL DEFAULT 0,
          progress INTEGER NOT NULL DEFAULT 0,
          release_tag TEXT,
          previous_task_id TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS checklist_items (
          id TEXT PRIMARY KEY,
          card_id TEXT NOT NULL,
          title TEXT NOT NULL,
          is_complete INTEGER NOT NULL DEFAULT 0,
          due_date_ms INTEGER,
          converted_card_id TEXT,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS checklist_item_assignees (
          item_id TEXT NOT NULL,
          user_id TEXT NOT NULL,
          PRIMARY KEY (item_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS card_assignees (
          card_id TEXT NOT NULL,
          user_id TEXT NOT NULL,
          PRIMARY KEY (card_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS card_labels (
          card_id TEXT NOT NULL,
          label_id TEXT NOT NULL,
          PRIMARY KEY (card_id, label_id)
        );

        CREATE TABLE IF NOT EXISTS card_teams (
          card_id TEXT NOT NULL,
          team_id TEXT NOT NULL,
          PRIMARY KEY (card_id, team_id)
        );

        CREATE TABLE IF NOT EXISTS card_dependencies (
          blocker_id TEXT NOT NULL,
          blocked_id TEXT NOT NULL,
          PRIMARY KEY (blocker_id, blocked_id)
        );

        CREATE TABLE IF NOT EXISTS activities (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          card_id TEXT NOT NULL,
          event_type TEXT NOT NULL,
          details TEXT NOT NULL,
          payload_json TEXT NOT NULL,
          triggered_by TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_board_category
          ON tasks(board_id, category);
        CREATE INDEX IF NOT EXISTS idx_cards_task
          ON cards(task_id);
        CREATE INDEX IF NOT EXISTS idx_checklist_items_card
          ON checklist_items(card_id);
        CREATE INDEX IF NOT EXISTS idx_checklist_items_converted
          ON checklist_items(converted_card_id);
        CREATE INDEX IF NOT EXISTS idx_dependencies_blocked
          ON card_dependencies(blocked_id);
        CREATE INDEX IF NOT EXISTS idx_activities_card
          ON activities(card_id, seq);
        "#,
    )?;
    Ok(())
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE name=?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value=excluded.value
        "#,
        params![name, next],
    )?;
    Ok(next)
}

fn card_exists_tx(tx: &Transaction<'_>, card_id: &str) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM cards WHERE id=?1",
            params![card_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

fn ensure_card_exists_tx(tx: &Transaction<'_>, card_id: &str) -> Result<(), StoreError> {
    if card_exists_tx(tx, card_id)? {
        Ok(())
    } else {
        Err(StoreError::NotFound("card"))
    }
}

fn ensure_task_exists_tx(tx: &Transaction<'_>, task_id: &str) -> Result<(), StoreError> {
    let exists = tx
        .query_row(
            "SELECT 1 FROM tasks WHERE id=?1",
            params![task_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if exists { Ok(()) } else { Err(StoreError::NotFound("task")) }
}

fn ensure_user_exists_tx(tx: &Transaction<'_>, user_id: &str) -> Result<(), StoreError> {
    let exists = tx
        .query_row(
            "SELECT 1 FROM users WHERE id=?1",
            params![user_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if exists { Ok(()) } else { Err(StoreError::NotFound("user")) }
}
