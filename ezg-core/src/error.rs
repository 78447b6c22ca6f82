use thiserror::Error;

use crate::domain::{Role, Slot};

#[derive(Error, Debug)]
pub enum EzgError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("{slot} rejected: {reason}")]
    Rejected { slot: Slot, reason: String },

    #[error("{0} is required before submitting")]
    MissingInput(Slot),

    #[error("network error: {0}")]
    Transport(String),

    #[error(
        "server returned HTTP {status}{}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Status { status: u16, message: Option<String> },

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid archive: {0}")]
    Archive(String),

    #[error(
        "archive does not contain the expected meshes; found entries: [{}]",
        .entries.join(", ")
    )]
    Unresolved { entries: Vec<String> },

    #[error("failed to load {role} mesh: {reason}")]
    MeshDecode { role: Role, reason: String },

    #[error("a submission is already in flight")]
    Busy,

    #[error("cannot submit while the wizard is {0}")]
    InvalidTransition(&'static str),

    #[error("config error: {0}")]
    Config(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, EzgError>;
