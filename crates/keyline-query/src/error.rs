use std::fmt;

use keyline_merge::MergeError;
use keyline_store::StoreError;

/// The operation stage an error is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Read,
    Create,
    Update,
    Delete,
    Patch,
    List,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Read => "failed to get data",
            Stage::Create => "failed to create",
            Stage::Update => "failed to update",
            Stage::Delete => "failed to delete",
            Stage::Patch => "failed to apply patch",
            Stage::List => "failed to list",
        };
        f.write_str(label)
    }
}

/// Errors returned by query operations.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// No record is stored under the key.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// Create found a record already stored under the key.
    #[error("already exists: {key}")]
    AlreadyExists { key: String },

    /// The record key cannot address a record in this collection.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Stored or merged bytes do not decode into the model type.
    #[error("failed to bind {key} to {type_name}: {source}")]
    Decode {
        key: String,
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The caller's value could not be encoded.
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// The merge-patch document is malformed.
    #[error("failed to apply patch to {key}: {source}")]
    Patch {
        key: String,
        #[source]
        source: MergeError,
    },

    /// The store call failed, timed out, or was cancelled.
    #[error("{stage}: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    /// A failure of an inner step, labelled with the outer stage.
    #[error("{stage}: {source}")]
    Wrapped {
        stage: Stage,
        #[source]
        source: Box<QueryError>,
    },
}

impl QueryError {
    pub(crate) fn store(stage: Stage, source: StoreError) -> Self {
        Self::Store { stage, source }
    }

    pub(crate) fn wrap(self, stage: Stage) -> Self {
        Self::Wrapped {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`QueryError::Wrapped`].
    pub fn root_cause(&self) -> &QueryError {
        match self {
            QueryError::Wrapped { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), QueryError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.root_cause(), QueryError::AlreadyExists { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self.root_cause(), QueryError::Decode { .. })
    }

    /// The underlying store error, if this failure came from the store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self.root_cause() {
            QueryError::Store { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The stage label of the outermost error, if it carries one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            QueryError::Store { stage, .. } | QueryError::Wrapped { stage, .. } => Some(*stage),
            QueryError::Patch { .. } => Some(Stage::Patch),
            _ => None,
        }
    }
}

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_not_found_is_still_not_found() {
        let err = QueryError::NotFound { key: "k".into() }.wrap(Stage::Read);
        assert!(err.is_not_found());
        assert_eq!(err.stage(), Some(Stage::Read));
        assert_eq!(err.to_string(), "failed to get data: not found: k");
    }

    #[test]
    fn store_errors_carry_stage_label() {
        let err = QueryError::store(Stage::Create, StoreError::DeadlineExceeded);
        assert_eq!(err.to_string(), "failed to create: deadline exceeded");
        assert!(matches!(err.store_error(), Some(StoreError::DeadlineExceeded)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn root_cause_unwinds_nesting() {
        let err = QueryError::AlreadyExists { key: "k".into() }
            .wrap(Stage::Create)
            .wrap(Stage::Update);
        assert!(err.is_already_exists());
        assert_eq!(err.stage(), Some(Stage::Update));
    }
}
