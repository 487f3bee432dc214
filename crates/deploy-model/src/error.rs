//! Errors intrinsic to the data model itself — malformed identifiers,
//! inconsistent option combinations, unparsable JSON payloads.
//!
//! Errors that require filesystem or process state (`LockUnavailable`,
//! `BackupReadFailed`, ...) live in `deploy-core::error::DeploymentError`
//! (§7); this enum only ever wraps pure validation/parse failures.

use crate::ids::IdError;
use crate::options::OptionsError;

/// A model-level error.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An [`crate::ids::Id`] failed validation.
    #[error(transparent)]
    InvalidId(#[from] IdError),
    /// A [`crate::options::DeploymentOptions`] combination was inconsistent.
    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),
    /// A JSON payload could not be parsed into the expected shape.
    #[error("failed to parse JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_id_error_with_display() {
        let err: ModelError = "bad".parse::<crate::ids::Id>().unwrap_err().into();
        assert!(err.to_string().contains("invalid id"));
    }
}
