#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardCreateRequest {
    pub task_id: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: String,
    pub release_tag: Option<String>,
    pub assigned_user_ids: Vec<String>,
    pub label_ids: Vec<String>,
    pub team_ids: Vec<String>,
    pub actor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecklistItemCreateRequest {
    pub card_id: String,
    pub title: String,
    pub due_date_ms: Option<i64>,
    pub assigned_user_ids: Vec<String>,
    pub actor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecklistItemConvertRequest {
    pub item_id: String,
    /// Task (category) the new card is created in.
    pub target_task_id: String,
    /// Card the new card will block; the caller passes the owning card's id
    /// here so the conversion chain stays anchored to the board.
    pub parent_card_id: String,
    /// URL of the parent card, embedded in the new card's description.
    pub parent_url: String,
    pub actor: Option<String>,
}
