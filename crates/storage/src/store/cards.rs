#![forbid(unsafe_code)]

use super::activity::log_activity_tx;
use super::{
    CardCreateRequest, CardRow, DependencyRow, SqliteStore, StoreError, ensure_card_exists_tx,
    ensure_task_exists_tx, ensure_user_exists_tx, next_counter_tx, now_ms,
};
use rusqlite::{OptionalExtension, params};
use tb_core::model::ActivityEvent;

impl SqliteStore {
    pub fn card_create(&mut self, request: CardCreateRequest) -> Result<CardRow, StoreError> {
        let CardCreateRequest {
            task_id,
            name,
            description,
            priority,
            release_tag,
            assigned_user_ids,
            label_ids,
            team_ids,
            actor,
        } = request;

        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("card name must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_task_exists_tx(&tx, &task_id)?;
        for user_id in &assigned_user_ids {
            ensure_user_exists_tx(&tx, user_id)?;
        }

        let seq = next_counter_tx(&tx, "card_seq")?;
        let id = tb_core::ids::card_id(seq);
        tx.execute(
            r#"
            INSERT INTO cards(id, task_id, name, description, priority, is_completed, progress,
                              release_tag, previous_task_id, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, NULL, ?7, ?7)
            "#,
            params![id, task_id, name, description, priority, release_tag, now_ms],
        )?;

        for user_id in &assigned_user_ids {
            tx.execute(
                "INSERT OR IGNORE INTO card_assignees(card_id, user_id) VALUES (?1, ?2)",
                params![id, user_id],
            )?;
        }
        for label_id in &label_ids {
            tx.execute(
                "INSERT OR IGNORE INTO card_labels(card_id, label_id) VALUES (?1, ?2)",
                params![id, label_id],
            )?;
        }
        for team_id in &team_ids {
            tx.execute(
                "INSERT OR IGNORE INTO card_teams(card_id, team_id) VALUES (?1, ?2)",
                params![id, team_id],
            )?;
        }

        log_activity_tx(
            &tx,
            &id,
            ActivityEvent::CardCreated,
            &name,
            actor.as_deref(),
            now_ms,
        )?;

        tx.commit()?;
        Ok(CardRow {
            id,
            task_id,
            name,
            description,
            priority,
            is_completed: false,
            progress: 0,
            release_tag,
            previous_task_id: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    /// Renames a card directly. Deliberately does not touch any checklist
    /// item whose `converted_card_id` points here: the title sync of
    /// `checklist_item_update` is one-way, item to card.
    pub fn card_rename(
        &mut self,
        card_id: &str,
        name: &str,
        actor: Option<&str>,
    ) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("card name must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_card_exists_tx(&tx, card_id)?;
        tx.execute(
            "UPDATE cards SET name=?2, updated_at_ms=?3 WHERE id=?1",
            params![card_id, name, now_ms],
        )?;
        log_activity_tx(&tx, card_id, ActivityEvent::CardRenamed, name, actor, now_ms)?;
        tx.commit()?;
        Ok(())
    }

    pub fn dependency_add(&mut self, blocker_id: &str, blocked_id: &str) -> Result<(), StoreError> {
        if blocker_id == blocked_id {
            return Err(StoreError::InvalidInput("card cannot block itself"));
        }

        let tx = self.conn.transaction()?;
        ensure_card_exists_tx(&tx, blocker_id)?;
        ensure_card_exists_tx(&tx, blocked_id)?;
        tx.execute(
            "INSERT OR IGNORE INTO card_dependencies(blocker_id, blocked_id) VALUES (?1, ?2)",
            params![blocker_id, blocked_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn card(&self, card_id: &str) -> Result<Option<CardRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, task_id, name, description, priority, is_completed, progress,
                       release_tag, previous_task_id, created_at_ms, updated_at_ms
                FROM cards
                WHERE id = ?1
                "#,
                params![card_id],
                |row| {
                    Ok(CardRow {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                        priority: row.get(4)?,
                        is_completed: row.get::<_, i64>(5)? != 0,
                        progress: row.get(6)?,
                        release_tag: row.get(7)?,
                        previous_task_id: row.get(8)?,
                        created_at_ms: row.get(9)?,
                        updated_at_ms: row.get(10)?,
                    })
                },
            )
            .optional()?)
    }

    /// Every dependency edge where the card is on either side.
    pub fn dependencies_touching(&self, card_id: &str) -> Result<Vec<DependencyRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT blocker_id, blocked_id
            FROM card_dependencies
            WHERE blocker_id = ?1 OR blocked_id = ?1
            ORDER BY blocker_id ASC, blocked_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![card_id], |row| {
            Ok(DependencyRow {
                blocker_id: row.get(0)?,
                blocked_id: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn card_assignee_ids(&self, card_id: &str) -> Result<Vec<String>, StoreError> {
        self.attachment_ids("card_assignees", "user_id", card_id)
    }

    pub fn card_label_ids(&self, card_id: &str) -> Result<Vec<String>, StoreError> {
        self.attachment_ids("card_labels", "label_id", card_id)
    }

    pub fn card_team_ids(&self, card_id: &str) -> Result<Vec<String>, StoreError> {
        self.attachment_ids("card_teams", "team_id", card_id)
    }

    fn attachment_ids(
        &self,
        table: &str,
        column: &str,
        card_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM {table} WHERE card_id=?1 ORDER BY {column} ASC"
        ))?;
        let rows = stmt.query_map(params![card_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
