#![forbid(unsafe_code)]

pub mod ids {
    //! Rendered identifiers for generated rows. The store hands out
    //! monotonically increasing sequence numbers; these helpers turn them
    //! into the stable textual ids used across tables.

    pub fn board_id(seq: i64) -> String {
        format!("BOARD-{seq:06}")
    }

    pub fn task_id(seq: i64) -> String {
        format!("TASK-{seq:06}")
    }

    pub fn card_id(seq: i64) -> String {
        format!("CARD-{seq:06}")
    }

    pub fn item_id(seq: i64) -> String {
        format!("ITEM-{seq:06}")
    }

    pub fn user_id(seq: i64) -> String {
        format!("USER-{seq:06}")
    }
}

pub mod model {
    /// Category name every board reserves as its completion bucket.
    pub const DONE_CATEGORY: &str = "Done";

    /// Progress value assigned to a converted card when its generating
    /// checklist item is toggled complete.
    pub const PROGRESS_COMPLETE: i64 = 100;

    /// Event kinds recorded in the activity log. Stored as their `as_str`
    /// tag; the rendered message is produced by [`crate::activity`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum ActivityEvent {
        CardCreated,
        CardRenamed,
        ChecklistItemAdded,
        ChecklistItemUpdated,
        ChecklistItemDeleted,
        ChecklistItemConvertedToCard,
        ChecklistDeleteAll,
    }

    impl ActivityEvent {
        pub fn as_str(self) -> &'static str {
            match self {
                ActivityEvent::CardCreated => "CARD_CREATED",
                ActivityEvent::CardRenamed => "CARD_RENAMED",
                ActivityEvent::ChecklistItemAdded => "CHECKLIST_ITEM_ADDED",
                ActivityEvent::ChecklistItemUpdated => "CHECKLIST_ITEM_UPDATED",
                ActivityEvent::ChecklistItemDeleted => "CHECKLIST_ITEM_DELETED",
                ActivityEvent::ChecklistItemConvertedToCard => {
                    "CHECKLIST_ITEM_CONVERTED_TO_CARD"
                }
                ActivityEvent::ChecklistDeleteAll => "CHECKLIST_DELETE_ALL",
            }
        }
    }
}

pub mod activity {
    //! Human-readable rendering of activity log entries. The rendered string
    //! is persisted alongside the event tag, so the phrasing here is part of
    //! the stored format.

    use crate::model::ActivityEvent;

    pub const UNKNOWN_ACTOR: &str = "Unknown User";

    const DISPLAY_MAX_CHARS: usize = 30;

    pub fn render_message(event: ActivityEvent, author: &str, details: &str) -> String {
        let author = strong(&truncate(&capitalize_words(author)));
        let details = strong(&truncate(details));

        match event {
            ActivityEvent::CardCreated => {
                format!("A new card {details} was created by {author}.")
            }
            ActivityEvent::CardRenamed => {
                format!("The card {details} was renamed by {author}.")
            }
            ActivityEvent::ChecklistItemAdded => {
                format!("{author} added checklist item {details} to the card.")
            }
            ActivityEvent::ChecklistItemUpdated => {
                format!("{author} updated checklist item {details}.")
            }
            ActivityEvent::ChecklistItemDeleted => {
                format!("{author} deleted checklist item {details} from the card.")
            }
            ActivityEvent::ChecklistItemConvertedToCard => {
                format!("{author} converted checklist item {details} to a card.")
            }
            ActivityEvent::ChecklistDeleteAll => {
                format!("{author} deleted all checklist items from the card {details}.")
            }
        }
    }

    fn capitalize_words(value: &str) -> String {
        value
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn truncate(value: &str) -> String {
        if value.chars().count() <= DISPLAY_MAX_CHARS {
            return value.to_string();
        }
        let head: String = value.chars().take(DISPLAY_MAX_CHARS).collect();
        format!("{head}...")
    }

    fn strong(value: &str) -> String {
        format!("<strong>{value}</strong>")
    }
}

pub mod description {
    //! Structured description payload for a card created by converting a
    //! checklist item. The payload is a rich-text document whose single
    //! block links back to the parent card's URL; the entity range covers
    //! the parent card's name at the end of the block text.

    use serde_json::json;

    const PREFIX: &str = "Converted from checklist item in card: ";

    pub fn converted_card_description(parent_card_name: &str, parent_url: &str) -> String {
        let payload = json!({
            "blocks": [
                {
                    "key": "converted",
                    "text": format!("{PREFIX}{parent_card_name}"),
                    "type": "unstyled",
                    "depth": 0,
                    "inlineStyleRanges": [],
                    "entityRanges": [
                        {
                            "offset": PREFIX.len(),
                            "length": parent_card_name.chars().count(),
                            "key": 0,
                        }
                    ],
                    "data": {},
                }
            ],
            "entityMap": {
                "0": {
                    "type": "LINK",
                    "mutability": "MUTABLE",
                    "data": { "url": parent_url },
                }
            },
        });
        payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::activity::render_message;
    use super::description::converted_card_description;
    use super::model::ActivityEvent;

    #[test]
    fn render_capitalizes_and_wraps_author() {
        let message = render_message(ActivityEvent::ChecklistItemAdded, "jane doe", "Ship it");
        assert_eq!(
            message,
            "<strong>Jane Doe</strong> added checklist item <strong>Ship it</strong> to the card."
        );
    }

    #[test]
    fn render_truncates_long_details() {
        let details = "a".repeat(48);
        let message = render_message(ActivityEvent::ChecklistItemDeleted, "bob", &details);
        let expected = format!("<strong>{}...</strong>", "a".repeat(30));
        assert!(message.contains(&expected), "message was: {message}");
    }

    #[test]
    fn render_covers_every_checklist_event() {
        for event in [
            ActivityEvent::ChecklistItemAdded,
            ActivityEvent::ChecklistItemUpdated,
            ActivityEvent::ChecklistItemDeleted,
            ActivityEvent::ChecklistItemConvertedToCard,
            ActivityEvent::ChecklistDeleteAll,
        ] {
            let message = render_message(event, "carol", "Detail");
            assert!(
                message.contains("<strong>Carol</strong>"),
                "{} produced: {message}",
                event.as_str()
            );
        }
    }

    #[test]
    fn description_links_parent_card() {
        let raw =
            converted_card_description("Release 1.4", "https://boards.example/card/CARD-000007");
        let payload: serde_json::Value = serde_json::from_str(&raw).expect("valid json");

        let block = &payload["blocks"][0];
        assert_eq!(
            block["text"],
            "Converted from checklist item in card: Release 1.4"
        );
        assert_eq!(block["entityRanges"][0]["offset"], 39);
        assert_eq!(block["entityRanges"][0]["length"], 11);
        assert_eq!(
            payload["entityMap"]["0"]["data"]["url"],
            "https://boards.example/card/CARD-000007"
        );
    }
}
