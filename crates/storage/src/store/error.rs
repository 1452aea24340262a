#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    NotFound(&'static str),
    DependencyRestriction {
        blockers: usize,
        checklist_items: usize,
    },
}

impl StoreError {
    /// True when the error is the completion-guard rejection rather than a
    /// storage failure. Callers branch on this to render the specific
    /// "has dependencies/checklist items" message.
    pub fn is_dependency_restriction(&self) -> bool {
        matches!(self, Self::DependencyRestriction { .. })
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::DependencyRestriction {
                blockers,
                checklist_items,
            } => {
                let reason = if *blockers > 0 {
                    "dependencies"
                } else {
                    "checklist items"
                };
                write!(
                    f,
                    "converted card has {reason} (blockers={blockers}, checklist_items={checklist_items})"
                )
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
