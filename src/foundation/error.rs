/// Convenience result type used across Trellis.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Content problems (a broken binding, malformed stored values, reference cycles) are absorbed by
/// the passes and reported through [`crate::ResolveLog`]. Only the variants below ever reach a
/// caller.
#[derive(thiserror::Error, Debug)]
pub enum TrellisError {
    /// Invalid user-provided page or store data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A collection source could not serve a request.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// An engine invariant was broken (for example a stored tree containing a fragment).
    #[error("contract violation: {0}")]
    Contract(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrellisError {
    /// Build a [`TrellisError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TrellisError::Fetch`] value.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Build a [`TrellisError::Contract`] value.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Build a [`TrellisError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
