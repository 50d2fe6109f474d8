//! Command error types
//!
//! Errors raised while registering commands, coercing parameter tokens and
//! reading coerced parameters inside handlers. Coercion errors never leave
//! [`CommandGroup::dispatch`](crate::CommandGroup::dispatch); they only decide
//! whether a candidate is skipped.

use crate::coercion::ParamKind;
use thiserror::Error;

/// Errors from command registration, coercion and parameter access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Command names must be non-empty and free of spaces.
    #[error("invalid command name {name:?}")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// A declared parameter kind has no parser in the group's registry.
    #[error("command {command:?} declares parameter kind {kind} with no registered parser")]
    UnregisteredKind {
        /// Command being registered
        command: String,
        /// Kind without a parser
        kind: ParamKind,
    },

    /// Parameter names and kinds were declared with different lengths.
    #[error("command {command:?} declares {kinds} parameter kinds but {names} names")]
    ParamNameCount {
        /// Command being registered
        command: String,
        /// Number of declared kinds
        kinds: usize,
        /// Number of declared names
        names: usize,
    },

    /// The entry was built without a handler.
    #[error("command {command:?} has no handler")]
    MissingHandler {
        /// Command being registered
        command: String,
    },

    /// Attaching the group would make it reachable from itself.
    #[error("attaching group would create a cycle{}", segment.as_ref().map(|s| format!(" at segment {s:?}")).unwrap_or_default())]
    Cycle {
        /// Child segment for child attachments, `None` for merges
        segment: Option<String>,
    },

    /// `parse` was asked for a kind the registry does not know.
    #[error("no parser registered for {0}")]
    UnknownKind(ParamKind),

    /// The token is not a valid value of the kind.
    #[error("invalid {kind} token {token:?}: {reason}")]
    InvalidToken {
        /// Expected kind
        kind: ParamKind,
        /// Offending token
        token: String,
        /// Parser message
        reason: String,
    },

    /// Actor token did not resolve to a live actor.
    #[error("no actor matches {0:?}")]
    ActorNotFound(String),

    /// A handler read a parameter with the wrong accessor or index.
    #[error("parameter {index} is not {expected}")]
    ParamMismatch {
        /// Parameter position, actor excluded
        index: usize,
        /// What the accessor expected
        expected: &'static str,
    },
}

impl CommandError {
    /// Create an invalid token error.
    pub fn invalid_token(
        kind: ParamKind,
        token: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidToken {
            kind,
            token: token.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a parameter mismatch error.
    pub fn param_mismatch(index: usize, expected: &'static str) -> Self {
        Self::ParamMismatch { index, expected }
    }

    /// Whether this error comes from coercing a token.
    ///
    /// Coercion errors skip a candidate during dispatch; every other variant
    /// is a programming or registration error.
    #[must_use]
    pub fn is_coercion(&self) -> bool {
        matches!(
            self,
            Self::UnknownKind(_) | Self::InvalidToken { .. } | Self::ActorNotFound(_)
        )
    }
}

/// Standard result type for herald operations
pub type Result<T> = std::result::Result<T, CommandError>;
