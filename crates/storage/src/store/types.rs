#![forbid(unsafe_code)]

#[derive(Clone, Debug)]
pub struct CardRow {
    pub id: String,
    pub task_id: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: String,
    pub is_completed: bool,
    pub progress: i64,
    pub release_tag: Option<String>,
    pub previous_task_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ChecklistItemRow {
    pub id: String,
    pub card_id: String,
    pub title: String,
    pub is_complete: bool,
    pub due_date_ms: Option<i64>,
    pub converted_card_id: Option<String>,
    pub created_at_ms: i64,
}

/// Read-only projection returned by `checklist_items`: the item plus its
/// assignees and the minimal status of the card it spawned, if any.
#[derive(Clone, Debug)]
pub struct ChecklistItemView {
    pub id: String,
    pub title: String,
    pub is_complete: bool,
    pub due_date_ms: Option<i64>,
    pub assigned_user_ids: Vec<String>,
    pub converted_card: Option<ConvertedCardStatus>,
}

#[derive(Clone, Debug)]
pub struct ConvertedCardStatus {
    pub id: String,
    pub is_completed: bool,
    pub progress: i64,
}

/// Result of converting a checklist item into a card.
#[derive(Clone, Debug)]
pub struct ConvertedCard {
    pub card_id: String,
    pub title: String,
}

#[derive(Clone, Debug)]
pub struct ActivityRow {
    pub seq: i64,
    pub card_id: String,
    pub event_type: String,
    pub details: String,
    pub payload_json: String,
    pub triggered_by: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyRow {
    pub blocker_id: String,
    pub blocked_id: String,
}
