// Error taxonomy for the ranking core.
//
// Collaborator failures (`StoreError`, `CatalogError`) are converted into
// `RankingError` at the editor boundary so callers only ever see one kind.

use thiserror::Error;

use crate::model::PlayerId;

/// Failure reported by a ranking store or aggregation backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("{0}")]
    Other(String),
}

/// Failure reported by the player catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

/// Every way an editor or catalog operation can fail.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("{0} is already in your top 10")]
    DuplicatePlayer(PlayerId),

    #[error("index out of range: from {from}, to {to}, list length {len}")]
    IndexOutOfRange { from: usize, to: usize, len: usize },

    #[error("sign in to save your rankings")]
    NotAuthenticated,

    #[error("your top 10 is full")]
    ListFull,

    #[error("no player is waiting for a slot")]
    NoPendingCandidate,

    #[error("slot {0} does not exist (slots are 1-10)")]
    PositionOutOfRange(usize),

    #[error("pick all 10 players before saving ({len} selected)")]
    IncompleteList { len: usize },

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("ranking store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The delete step succeeded and the insert step failed. The persisted
    /// ranking is now empty; the in-memory list is untouched.
    #[error("saved rankings were cleared but the new list was not written: {0}")]
    PartialSave(#[source] StoreError),

    #[error("player catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),
}

impl RankingError {
    /// Errors the user caused and can fix locally, as opposed to I/O failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RankingError::DuplicatePlayer(_)
                | RankingError::ListFull
                | RankingError::IncompleteList { .. }
                | RankingError::NotAuthenticated
                | RankingError::SaveInProgress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_save_message_mentions_cleared_state() {
        let err = RankingError::PartialSave(StoreError::Other("timeout".into()));
        let msg = err.to_string();
        assert!(msg.contains("cleared"), "{msg}");
        assert!(msg.contains("timeout"), "{msg}");
    }

    #[test]
    fn store_failures_are_not_user_errors() {
        assert!(!RankingError::StoreUnavailable(StoreError::Other("x".into())).is_user_error());
        assert!(RankingError::DuplicatePlayer(PlayerId::new("p")).is_user_error());
    }
}
