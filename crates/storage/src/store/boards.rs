#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, next_counter_tx, now_ms};
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    pub fn board_create(&mut self, name: &str) -> Result<String, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("board name must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let seq = next_counter_tx(&tx, "board_seq")?;
        let id = tb_core::ids::board_id(seq);
        tx.execute(
            "INSERT INTO boards(id, name, created_at_ms) VALUES (?1, ?2, ?3)",
            params![id, name, now_ms],
        )?;
        tx.commit()?;
        Ok(id)
    }

    pub fn task_create(&mut self, board_id: &str, category: &str) -> Result<String, StoreError> {
        if category.trim().is_empty() {
            return Err(StoreError::InvalidInput("category must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let board_exists = tx
            .query_row(
                "SELECT 1 FROM boards WHERE id=?1",
                params![board_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !board_exists {
            return Err(StoreError::NotFound("board"));
        }

        let seq = next_counter_tx(&tx, "task_seq")?;
        let id = tb_core::ids::task_id(seq);
        tx.execute(
            "INSERT INTO tasks(id, board_id, category, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![id, board_id, category, now_ms],
        )?;
        tx.commit()?;
        Ok(id)
    }

    pub fn user_create(&mut self, name: &str) -> Result<String, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("user name must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let seq = next_counter_tx(&tx, "user_seq")?;
        let id = tb_core::ids::user_id(seq);
        tx.execute(
            "INSERT INTO users(id, name, created_at_ms) VALUES (?1, ?2, ?3)",
            params![id, name, now_ms],
        )?;
        tx.commit()?;
        Ok(id)
    }
}
