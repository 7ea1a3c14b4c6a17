//! Domain errors surfaced to chat users.
//!
//! Plumbing code returns `anyhow::Result`; the per-message path narrows
//! failures into [`RelayError`] so the handler can turn each one into a
//! reply without ever stopping the bot.

use thiserror::Error;

/// Why a command line could not be turned into a transaction record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("nothing to record: send `title amount kind category [date]`")]
    EmptyInput,

    #[error("too few fields: expected `title amount kind category [date]`")]
    TooFewFields,

    #[error("invalid amount '{0}': use digits, e.g. 4500 or 4,500")]
    InvalidAmount(String),

    #[error("invalid kind '{0}'")]
    InvalidKind(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Column metadata could not be fetched or was unusable.
    #[error("schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The remote store rejected the page or could not be reached.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;
