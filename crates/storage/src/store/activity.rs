#![forbid(unsafe_code)]

use super::{ActivityRow, SqliteStore, StoreError, card_exists_tx};
use rusqlite::{Transaction, params};
use tb_core::activity::{UNKNOWN_ACTOR, render_message};
use tb_core::model::ActivityEvent;

/// Appends an audit record inside the caller's transaction. A missing card
/// aborts the transaction instead of logging against a dangling id.
pub(super) fn log_activity_tx(
    tx: &Transaction<'_>,
    card_id: &str,
    event: ActivityEvent,
    details: &str,
    actor: Option<&str>,
    now_ms: i64,
) -> Result<(), StoreError> {
    if !card_exists_tx(tx, card_id)? {
        return Err(StoreError::NotFound("card"));
    }

    let triggered_by = actor.unwrap_or(UNKNOWN_ACTOR);
    let message = render_message(event, triggered_by, details);
    let payload_json = serde_json::json!({ "details": details }).to_string();

    tx.execute(
        r#"
        INSERT INTO activities(card_id, event_type, details, payload_json, triggered_by, created_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            card_id,
            event.as_str(),
            message,
            payload_json,
            triggered_by,
            now_ms
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    pub fn activities(&self, card_id: &str) -> Result<Vec<ActivityRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, card_id, event_type, details, payload_json, triggered_by, created_at_ms
            FROM activities
            WHERE card_id = ?1
            ORDER BY seq ASC
            "#,
        )?;
        let rows = stmt.query_map(params![card_id], |row| {
            Ok(ActivityRow {
                seq: row.get(0)?,
                card_id: row.get(1)?,
                event_type: row.get(2)?,
                details: row.get(3)?,
                payload_json: row.get(4)?,
                triggered_by: row.get(5)?,
                created_at_ms: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
