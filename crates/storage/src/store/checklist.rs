#![forbid(unsafe_code)]

use super::activity::log_activity_tx;
use super::cascade::cascade_delete_tx;
use super::descendants::resolve_descendants_tx;
use super::{
    ChecklistItemConvertRequest, ChecklistItemCreateRequest, ChecklistItemRow, ChecklistItemView,
    ConvertedCard, ConvertedCardStatus, SqliteStore, StoreError, ensure_card_exists_tx,
    ensure_task_exists_tx, ensure_user_exists_tx, next_counter_tx, now_ms,
};
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::BTreeSet;
use tb_core::model::{ActivityEvent, DONE_CATEGORY, PROGRESS_COMPLETE};

impl SqliteStore {
    pub fn checklist_item_create(
        &mut self,
        request: ChecklistItemCreateRequest,
    ) -> Result<ChecklistItemRow, StoreError> {
        let ChecklistItemCreateRequest {
            card_id,
            title,
            due_date_ms,
            assigned_user_ids,
            actor,
        } = request;

        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("item title must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_card_exists_tx(&tx, &card_id)?;
        for user_id in &assigned_user_ids {
            ensure_user_exists_tx(&tx, user_id)?;
        }

        let seq = next_counter_tx(&tx, "item_seq")?;
        let id = tb_core::ids::item_id(seq);
        tx.execute(
            r#"
            INSERT INTO checklist_items(id, card_id, title, is_complete, due_date_ms,
                                        converted_card_id, created_at_ms)
            VALUES (?1, ?2, ?3, 0, ?4, NULL, ?5)
            "#,
            params![id, card_id, title, due_date_ms, now_ms],
        )?;
        for user_id in &assigned_user_ids {
            tx.execute(
                "INSERT OR IGNORE INTO checklist_item_assignees(item_id, user_id) VALUES (?1, ?2)",
                params![id, user_id],
            )?;
        }

        log_activity_tx(
            &tx,
            &card_id,
            ActivityEvent::ChecklistItemAdded,
            &title,
            actor.as_deref(),
            now_ms,
        )?;

        tx.commit()?;
        Ok(ChecklistItemRow {
            id,
            card_id,
            title,
            is_complete: false,
            due_date_ms,
            converted_card_id: None,
            created_at_ms: now_ms,
        })
    }

    /// Renames a checklist item. When the item has spawned a card, the card's
    /// name follows the new title in the same transaction. The sync is
    /// one-way: renaming the card never renames the item.
    pub fn checklist_item_update(
        &mut self,
        item_id: &str,
        title: &str,
        actor: Option<&str>,
    ) -> Result<ChecklistItemRow, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("item title must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let Some(item) = checklist_item_tx(&tx, item_id)? else {
            return Err(StoreError::NotFound("checklist item"));
        };

        tx.execute(
            "UPDATE checklist_items SET title=?2 WHERE id=?1",
            params![item_id, title],
        )?;

        if let Some(converted_card_id) = item.converted_card_id.as_deref() {
            tx.execute(
                "UPDATE cards SET name=?2, updated_at_ms=?3 WHERE id=?1",
                params![converted_card_id, title, now_ms],
            )?;
        }

        log_activity_tx(
            &tx,
            &item.card_id,
            ActivityEvent::ChecklistItemUpdated,
            title,
            actor,
            now_ms,
        )?;

        tx.commit()?;
        Ok(ChecklistItemRow {
            title: title.to_string(),
            ..item
        })
    }

    /// Deletes one checklist item. A converted item takes its whole spawned
    /// subtree with it: the converted card, every card transitively produced
    /// from that card's checklist items, and all rows referencing any of
    /// them. The audit record lands on the item's owning card before the
    /// item row goes away.
    pub fn checklist_item_delete(
        &mut self,
        item_id: &str,
        actor: Option<&str>,
    ) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let Some(item) = checklist_item_tx(&tx, item_id)? else {
            return Err(StoreError::NotFound("checklist item"));
        };

        if let Some(converted_card_id) = item.converted_card_id.as_deref() {
            let mut doomed = BTreeSet::new();
            doomed.insert(converted_card_id.to_string());
            for descendant in resolve_descendants_tx(&tx, converted_card_id)? {
                doomed.insert(descendant);
            }
            cascade_delete_tx(&tx, &doomed)?;
        }

        log_activity_tx(
            &tx,
            &item.card_id,
            ActivityEvent::ChecklistItemDeleted,
            &item.title,
            actor,
            now_ms,
        )?;

        tx.execute(
            "DELETE FROM checklist_item_assignees WHERE item_id=?1",
            params![item_id],
        )?;
        tx.execute("DELETE FROM checklist_items WHERE id=?1", params![item_id])?;

        tx.commit()?;
        Ok(())
    }

    /// Deletes every checklist item of a card. Descendant sets of all
    /// converted items are unioned first so the cascade runs once over a
    /// consistent snapshot. One summary activity row is written.
    pub fn checklist_delete_all(
        &mut self,
        card_id: &str,
        actor: Option<&str>,
    ) -> Result<usize, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let card_name: Option<String> = tx
            .query_row(
                "SELECT name FROM cards WHERE id=?1",
                params![card_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(card_name) = card_name else {
            return Err(StoreError::NotFound("card"));
        };

        let converted_roots = {
            let mut stmt = tx.prepare(
                r#"
                SELECT converted_card_id
                FROM checklist_items
                WHERE card_id = ?1 AND converted_card_id IS NOT NULL
                ORDER BY id ASC
                "#,
            )?;
            let rows = stmt.query_map(params![card_id], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut doomed = BTreeSet::new();
        for root in &converted_roots {
            if doomed.insert(root.clone()) {
                for descendant in resolve_descendants_tx(&tx, root)? {
                    doomed.insert(descendant);
                }
            }
        }
        cascade_delete_tx(&tx, &doomed)?;

        tx.execute(
            r#"
            DELETE FROM checklist_item_assignees
            WHERE item_id IN (SELECT id FROM checklist_items WHERE card_id = ?1)
            "#,
            params![card_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM checklist_items WHERE card_id=?1",
            params![card_id],
        )?;

        log_activity_tx(
            &tx,
            card_id,
            ActivityEvent::ChecklistDeleteAll,
            &card_name,
            actor,
            now_ms,
        )?;

        tx.commit()?;
        Ok(deleted)
    }

    /// Promotes a checklist item into a standalone card in the target
    /// category. The new card inherits priority, labels, assignees and teams
    /// from the item's owning card, carries a structured description linking
    /// back to `parent_url`, and blocks `parent_card_id`. The item records
    /// the spawned card and has its completion flag cleared.
    pub fn checklist_item_convert(
        &mut self,
        request: ChecklistItemConvertRequest,
    ) -> Result<ConvertedCard, StoreError> {
        let ChecklistItemConvertRequest {
            item_id,
            target_task_id,
            parent_card_id,
            parent_url,
            actor,
        } = request;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let source = tx
            .query_row(
                r#"
                SELECT i.card_id, i.title, c.name, c.priority
                FROM checklist_items i
                JOIN cards c ON c.id = i.card_id
                WHERE i.id = ?1
                "#,
                params![item_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((owner_card_id, item_title, owner_name, owner_priority)) = source else {
            return Err(StoreError::NotFound("checklist item"));
        };

        ensure_task_exists_tx(&tx, &target_task_id)?;
        ensure_card_exists_tx(&tx, &parent_card_id)?;

        let description = tb_core::description::converted_card_description(&owner_name, &parent_url);
        let seq = next_counter_tx(&tx, "card_seq")?;
        let new_card_id = tb_core::ids::card_id(seq);
        tx.execute(
            r#"
            INSERT INTO cards(id, task_id, name, description, priority, is_completed, progress,
                              release_tag, previous_task_id, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, NULL, NULL, ?6, ?6)
            "#,
            params![
                new_card_id,
                target_task_id,
                item_title,
                description,
                owner_priority,
                now_ms
            ],
        )?;

        for (table, column) in [
            ("card_assignees", "user_id"),
            ("card_labels", "label_id"),
            ("card_teams", "team_id"),
        ] {
            tx.execute(
                &format!(
                    "INSERT INTO {table}(card_id, {column}) \
                     SELECT ?1, {column} FROM {table} WHERE card_id = ?2"
                ),
                params![new_card_id, owner_card_id],
            )?;
        }

        tx.execute(
            "INSERT INTO card_dependencies(blocker_id, blocked_id) VALUES (?1, ?2)",
            params![new_card_id, parent_card_id],
        )?;

        tx.execute(
            "UPDATE checklist_items SET converted_card_id=?2, is_complete=0 WHERE id=?1",
            params![item_id, new_card_id],
        )?;

        log_activity_tx(
            &tx,
            &owner_card_id,
            ActivityEvent::ChecklistItemConvertedToCard,
            &item_title,
            actor.as_deref(),
            now_ms,
        )?;

        tx.commit()?;
        Ok(ConvertedCard {
            card_id: new_card_id,
            title: item_title,
        })
    }

    /// Flips the completion flag of an item, keeping a spawned card in
    /// lock-step. Completing moves the card into the board's Done category
    /// with full progress and remembers where it came from; un-completing
    /// restores the recorded category and resets progress. The transition is
    /// rejected while the spawned card still has blockers or checklist items
    /// of its own.
    pub fn checklist_item_toggle(
        &mut self,
        item_id: &str,
    ) -> Result<ChecklistItemRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let Some(item) = checklist_item_tx(&tx, item_id)? else {
            return Err(StoreError::NotFound("checklist item"));
        };

        if let Some(converted_card_id) = item.converted_card_id.as_deref() {
            let blockers: i64 = tx.query_row(
                "SELECT COUNT(*) FROM card_dependencies WHERE blocked_id=?1",
                params![converted_card_id],
                |row| row.get(0),
            )?;
            let checklist_items: i64 = tx.query_row(
                "SELECT COUNT(*) FROM checklist_items WHERE card_id=?1",
                params![converted_card_id],
                |row| row.get(0),
            )?;
            if blockers > 0 || checklist_items > 0 {
                return Err(StoreError::DependencyRestriction {
                    blockers: blockers as usize,
                    checklist_items: checklist_items as usize,
                });
            }
        }

        let next_complete = !item.is_complete;
        tx.execute(
            "UPDATE checklist_items SET is_complete=?2 WHERE id=?1",
            params![item_id, next_complete],
        )?;

        if let Some(converted_card_id) = item.converted_card_id.as_deref() {
            let state = tx
                .query_row(
                    "SELECT task_id, previous_task_id FROM cards WHERE id=?1",
                    params![converted_card_id],
                    |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                    },
                )
                .optional()?;
            let Some((current_task_id, previous_task_id)) = state else {
                return Err(StoreError::NotFound("card"));
            };

            if next_complete {
                let done_task_id = done_task_for_owner_tx(&tx, &item.card_id)?;
                tx.execute(
                    r#"
                    UPDATE cards
                    SET is_completed=1, progress=?2, previous_task_id=?3, task_id=?4, updated_at_ms=?5
                    WHERE id=?1
                    "#,
                    params![
                        converted_card_id,
                        PROGRESS_COMPLETE,
                        current_task_id,
                        done_task_id,
                        now_ms
                    ],
                )?;
            } else {
                let restored_task_id = previous_task_id.unwrap_or(current_task_id);
                tx.execute(
                    r#"
                    UPDATE cards
                    SET is_completed=0, progress=0, previous_task_id=NULL, task_id=?2, updated_at_ms=?3
                    WHERE id=?1
                    "#,
                    params![converted_card_id, restored_task_id, now_ms],
                )?;
            }
        }

        tx.commit()?;
        Ok(ChecklistItemRow {
            is_complete: next_complete,
            ..item
        })
    }

    pub fn checklist_item(&self, item_id: &str) -> Result<Option<ChecklistItemRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, card_id, title, is_complete, due_date_ms, converted_card_id, created_at_ms
                FROM checklist_items
                WHERE id = ?1
                "#,
                params![item_id],
                map_item_row,
            )
            .optional()?)
    }

    /// Read-only projection of a card's checklist with assignees and the
    /// minimal status of spawned cards.
    pub fn checklist_items(&self, card_id: &str) -> Result<Vec<ChecklistItemView>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT i.id, i.title, i.is_complete, i.due_date_ms,
                   c.id, c.is_completed, c.progress
            FROM checklist_items i
            LEFT JOIN cards c ON c.id = i.converted_card_id
            WHERE i.card_id = ?1
            ORDER BY i.created_at_ms ASC, i.id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![card_id], |row| {
            let converted_card = match row.get::<_, Option<String>>(4)? {
                Some(id) => Some(ConvertedCardStatus {
                    id,
                    is_completed: row.get::<_, i64>(5)? != 0,
                    progress: row.get(6)?,
                }),
                None => None,
            };
            Ok(ChecklistItemView {
                id: row.get(0)?,
                title: row.get(1)?,
                is_complete: row.get::<_, i64>(2)? != 0,
                due_date_ms: row.get(3)?,
                assigned_user_ids: Vec::new(),
                converted_card,
            })
        })?;
        let mut items = rows.collect::<Result<Vec<_>, _>>()?;

        let mut assignees = self.conn.prepare(
            "SELECT user_id FROM checklist_item_assignees WHERE item_id=?1 ORDER BY user_id ASC",
        )?;
        for item in &mut items {
            let rows = assignees.query_map(params![item.id], |row| row.get::<_, String>(0))?;
            item.assigned_user_ids = rows.collect::<Result<Vec<_>, _>>()?;
        }

        Ok(items)
    }
}

fn checklist_item_tx(
    tx: &Transaction<'_>,
    item_id: &str,
) -> Result<Option<ChecklistItemRow>, StoreError> {
    Ok(tx
        .query_row(
            r#"
            SELECT id, card_id, title, is_complete, due_date_ms, converted_card_id, created_at_ms
            FROM checklist_items
            WHERE id = ?1
            "#,
            params![item_id],
            map_item_row,
        )
        .optional()?)
}

fn map_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChecklistItemRow> {
    Ok(ChecklistItemRow {
        id: row.get(0)?,
        card_id: row.get(1)?,
        title: row.get(2)?,
        is_complete: row.get::<_, i64>(3)? != 0,
        due_date_ms: row.get(4)?,
        converted_card_id: row.get(5)?,
        created_at_ms: row.get(6)?,
    })
}

/// Finds the Done task on the board of the given card (the item's owner).
fn done_task_for_owner_tx(tx: &Transaction<'_>, owner_card_id: &str) -> Result<String, StoreError> {
    let board_id: Option<String> = tx
        .query_row(
            r#"
            SELECT t.board_id
            FROM cards c
            JOIN tasks t ON t.id = c.task_id
            WHERE c.id = ?1
            "#,
            params![owner_card_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(board_id) = board_id else {
        return Err(StoreError::NotFound("task"));
    };

    let done_task: Option<String> = tx
        .query_row(
            r#"
            SELECT id FROM tasks
            WHERE board_id = ?1 AND category = ?2
            ORDER BY created_at_ms ASC, id ASC
            LIMIT 1
            "#,
            params![board_id, DONE_CATEGORY],
            |row| row.get(0),
        )
        .optional()?;

    done_task.ok_or(StoreError::NotFound("done task"))
}
