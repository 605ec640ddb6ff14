//! Error types for the reactive runtime.

use thiserror::Error;

/// Errors surfaced by the reactive primitives.
///
/// Panics raised inside effect or derive bodies are not represented here:
/// they unwind straight through the write that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A computed value was assigned to.
    #[error("computed values are read-only and cannot be assigned")]
    ReadOnly,

    /// A non-record value was passed where a structured subject is required.
    ///
    /// Scalars belong in a ref cell instead.
    #[error("cannot make a {found} value reactive; use a ref cell for scalars")]
    NotStructured {
        /// Kind name of the rejected value.
        found: &'static str,
    },

    /// A computed value read itself while it was being derived.
    #[error("computed value was read while deriving itself")]
    Cycle,

    /// A runtime configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_readable_messages() {
        assert_eq!(
            ReactiveError::ReadOnly.to_string(),
            "computed values are read-only and cannot be assigned"
        );
        assert_eq!(
            ReactiveError::NotStructured { found: "int" }.to_string(),
            "cannot make a int value reactive; use a ref cell for scalars"
        );
    }
}
