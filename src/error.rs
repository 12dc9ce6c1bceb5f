use std::io;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Every failure a command can produce, from bad token text up to storage.
///
/// Lex and parse errors mean the command is malformed. The remaining variants
/// are raised against the current state of the store and are reported to the
/// client without touching it.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("lex error: {0}")]
    Lex(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no database selected, run USE first")]
    NoDatabaseSelected,

    #[error("unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("database '{0}' already exists")]
    DatabaseExists(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("attribute '{0}' already exists")]
    AttributeExists(String),

    #[error("the id column is managed by the database and cannot be changed")]
    IdentityColumn,

    #[error("expected {expected} values but got {found}")]
    ValueCount { expected: usize, found: usize },

    #[error("storage error: {0}")]
    Io(#[from] io::Error),

    #[error("storage error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DbError {
    /// Returns `true` for errors that come from the persistence layer rather
    /// than from the command itself.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serde(_))
    }
}
