#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Transaction, params};
use std::collections::BTreeSet;

/// Walks the converted-card derivation graph below `card_id` and returns
/// every descendant card id, in discovery order, excluding the root.
///
/// The traversal is an explicit worklist over transaction-scoped queries:
/// one fetch per card for the non-null `converted_card_id` values of its
/// checklist items. The visited set keeps the walk terminating even if the
/// forest invariant has been violated and the data contains a cycle.
pub(super) fn resolve_descendants_tx(
    tx: &Transaction<'_>,
    card_id: &str,
) -> Result<Vec<String>, StoreError> {
    let mut out = Vec::new();
    let mut visited = BTreeSet::new();
    visited.insert(card_id.to_string());

    let mut stmt = tx.prepare(
        r#"
        SELECT converted_card_id
        FROM checklist_items
        WHERE card_id = ?1 AND converted_card_id IS NOT NULL
        ORDER BY id ASC
        "#,
    )?;

    let mut stack = vec![card_id.to_string()];
    while let Some(current) = stack.pop() {
        let rows = stmt.query_map(params![current], |row| row.get::<_, String>(0))?;
        for child in rows {
            let child = child?;
            if visited.insert(child.clone()) {
                out.push(child.clone());
                stack.push(child);
            }
        }
    }

    Ok(out)
}
