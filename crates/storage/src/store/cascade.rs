#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Transaction, params_from_iter};
use std::collections::BTreeSet;

/// Removes the given cards and every row that references them: audit
/// records first, then dependency edges (both directions), checklist items
/// with their assignee rows, card attachments, and finally the cards.
///
/// Only rows touching the computed set are deleted; the caller is
/// responsible for having resolved the full descendant closure. An empty
/// set is a no-op.
pub(super) fn cascade_delete_tx(
    tx: &Transaction<'_>,
    card_ids: &BTreeSet<String>,
) -> Result<(), StoreError> {
    if card_ids.is_empty() {
        return Ok(());
    }

    let marks = placeholders(card_ids.len());

    // Activities reference cards by id and must go before the cards do.
    tx.execute(
        &format!("DELETE FROM activities WHERE card_id IN ({marks})"),
        params_from_iter(card_ids.iter()),
    )?;

    tx.execute(
        &format!(
            "DELETE FROM card_dependencies WHERE blocker_id IN ({marks}) OR blocked_id IN ({marks})"
        ),
        params_from_iter(card_ids.iter().chain(card_ids.iter())),
    )?;

    tx.execute(
        &format!(
            "DELETE FROM checklist_item_assignees \
             WHERE item_id IN (SELECT id FROM checklist_items WHERE card_id IN ({marks}))"
        ),
        params_from_iter(card_ids.iter()),
    )?;

    tx.execute(
        &format!("DELETE FROM checklist_items WHERE card_id IN ({marks})"),
        params_from_iter(card_ids.iter()),
    )?;

    for table in ["card_assignees", "card_labels", "card_teams"] {
        tx.execute(
            &format!("DELETE FROM {table} WHERE card_id IN ({marks})"),
            params_from_iter(card_ids.iter()),
        )?;
    }

    tx.execute(
        &format!("DELETE FROM cards WHERE id IN ({marks})"),
        params_from_iter(card_ids.iter()),
    )?;

    Ok(())
}

fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 2);
    for index in 0..count {
        if index > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}
