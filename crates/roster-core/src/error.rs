use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("could not reach {system}: {reason}")]
    SystemUnreachable { system: String, reason: String },

    #[error("{system} rejected the request: {reason}")]
    Rejected { system: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("skipping {record}: {reason}")]
    PartialData { record: String, reason: String },

    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RosterError {
    pub fn unreachable(system: &str, reason: impl ToString) -> Self {
        RosterError::SystemUnreachable {
            system: system.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn rejected(system: &str, reason: impl ToString) -> Self {
        RosterError::Rejected {
            system: system.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn partial(record: impl ToString, reason: impl ToString) -> Self {
        RosterError::PartialData {
            record: record.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Fatal errors abort the run; the rest are logged per record.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RosterError::PartialData { .. } | RosterError::Rejected { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
