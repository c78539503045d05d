//! Core Error Types
//!
//! This module defines the error taxonomy shared by the registry, the
//! profiler and the recommendation engine.
//!
//! # Error Categories
//!
//! - `Validation` - malformed or missing required input (room name, username)
//! - `Auth` - an action attempted by an unauthenticated session
//! - `NotFound` - a referenced room or vector is absent
//! - `NoContent` - there are no active rooms to recommend from
//! - `InsufficientData` - a user has no signal to personalize on
//! - `TransientStore` - a content-store call failed or timed out
//!
//! # Propagation Policy
//!
//! Registry and dispatcher errors are per-operation and reported to the
//! invoking caller only. Recommendation sub-algorithm failures degrade to
//! empty candidate lists instead of propagating. `TransientStore` during a
//! background refresh is logged and retried on the next cycle.
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across thread
//! boundaries.
use thiserror::Error;

/// Errors produced by the chat core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed or missing required input
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Action attempted by an unauthenticated session
    #[error("Authentication required: {message}")]
    Auth {
        /// Human-readable error message
        message: String,
    },

    /// Referenced room or vector is absent
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing entity
        what: String,
    },

    /// No active rooms to recommend from
    #[error("No active rooms available for recommendations")]
    NoContent,

    /// User has no interests or joined rooms to personalize on
    #[error("Not enough data for user '{username}' to personalize recommendations")]
    InsufficientData {
        /// The user the request was for
        username: String,
    },

    /// Content-store call failed or timed out
    #[error("Content store error: {message}")]
    TransientStore {
        /// Human-readable error message
        message: String,
    },
}

impl CoreError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a new insufficient-data error
    pub fn insufficient_data(username: impl Into<String>) -> Self {
        Self::InsufficientData {
            username: username.into(),
        }
    }

    /// Create a new transient store error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientStore {
            message: message.into(),
        }
    }

    /// Whether the error represents an expected empty state rather than a
    /// genuine failure
    ///
    /// Callers should render these as a descriptive empty result, not as an
    /// error surfaced to the end user.
    pub fn is_empty_state(&self) -> bool {
        matches!(self, Self::NoContent | Self::InsufficientData { .. })
    }
}
