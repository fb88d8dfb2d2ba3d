//! Error handling for the framework
//!
//! Two kinds of failure exist. Configuration errors signal programmer misuse
//! (a route without a callback, starting history twice, an abstract method
//! that was never implemented) and are never retried. Invalid-state errors
//! report an operation on a component that is not in a state to perform it.
//!
//! A fragment that matches no route is not an error: dispatch returns `false`.

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Programmer misuse detected while configuring routes, history or controllers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A route was registered without a callback
    #[error("route '{pattern}' was registered without a callback")]
    MissingCallback { pattern: String },

    /// `start()` was called while history was already running
    #[error("history has already been started")]
    AlreadyStarted,

    /// A route was registered while history was running
    #[error("route '{pattern}' cannot be registered while history is started")]
    RegistrationWhileStarted { pattern: String },

    /// A method that implementors must provide was left at its default
    #[error("the {method}() method of '{owner}' has not been implemented")]
    NotImplemented {
        owner: String,
        method: &'static str,
    },

    /// A route pattern could not be compiled
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors returned by the framework
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Fatal configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A region was asked to dispose a view while holding none
    #[error("region '{region}' has no current view to dispose")]
    NoCurrentView { region: String },

    /// A controller was asked to show a view before it was given one
    #[error("controller '{controller}' has no view to show")]
    NoView { controller: String },
}

impl Error {
    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is an invalid-state error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::NoCurrentView { .. } | Error::NoView { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================
