// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for SiteWizard
//!
//! This module defines the error types raised by the wizard core and its
//! collaborators. The `thiserror` crate is used to keep every variant's
//! message next to its definition.
//!
//! Two families exist:
//!
//! - [`RequestError`] is what a [`RequestClient`](crate::core::traits::RequestClient)
//!   returns when a call to the backend fails.
//! - [`WizardError`] is what the wizard operations return. It wraps request
//!   failures and adds validation, configuration and IO failures.
//!
//! Storage failures never appear here: persistence adapters swallow them.

use std::path::PathBuf;
use thiserror::Error;

/// A unified result type for the SiteWizard library.
pub type Result<T> = std::result::Result<T, WizardError>;

/// Fallback message used when a failing response carries no `error` field.
pub const GENERIC_FAILURE: &str = "An error occurred";

/// Failure raised by a request client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request never produced a response (network down, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a failing HTTP status.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code of the response.
        status: u16,
        /// Explanation taken from the envelope's `error` field.
        message: String,
    },

    /// The response could not be read as a JSON envelope.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// Returns the text shown to the user for this failure.
    ///
    /// For [`RequestError::Server`] this is exactly the server-provided
    /// message, without any prefix.
    pub fn user_message(&self) -> String {
        match self {
            RequestError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The main error type for the wizard, encompassing all potential error cases.
#[derive(Error, Debug)]
pub enum WizardError {
    /// A step boundary was crossed without its requirements.
    ///
    /// Validation failures never reach the network layer.
    #[error("Validation error: {message}")]
    Validation {
        /// Message shown to the user.
        message: String,
        /// Content fields that failed validation, if any.
        fields: Vec<String>,
    },

    /// A call to the backend failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The backend answered successfully but refused the operation.
    #[error("Rejected by server: {message}")]
    Rejected {
        /// Message shown to the user.
        message: String,
    },

    /// Error related to configuration loading or validation.
    #[error("Configuration error: {message}.")]
    Config {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the configuration file that caused the error.
        path: Option<PathBuf>,
    },

    /// IO error encountered during file operations.
    #[error("File IO error at `{path:?}`: {source}")]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for WizardError {
    fn from(source: std::io::Error) -> Self {
        WizardError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl WizardError {
    /// Creates a `Validation` error for the given message and fields.
    pub fn validation<S: Into<String>>(
        message: S,
        fields: Vec<String>,
    ) -> Self {
        WizardError::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Creates a `Rejected` error with the server's explanation.
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        WizardError::Rejected {
            message: message.into(),
        }
    }

    /// Creates a `Config` error with a specific message.
    ///
    /// # Parameters
    /// - `message`: A description of the configuration error.
    /// - `path`: Optional path of the configuration file causing the error.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        WizardError::Config {
            message: message.into(),
            path,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        WizardError::IOError { path, source }
    }

    /// Creates a general internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        WizardError::Internal(message.into())
    }

    /// Returns the text a notification surface should display.
    pub fn user_message(&self) -> String {
        match self {
            WizardError::Validation { message, .. }
            | WizardError::Rejected { message } => message.clone(),
            WizardError::Request(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// Returns `true` for failures caused by the user's input.
    pub fn is_validation(&self) -> bool {
        matches!(self, WizardError::Validation { .. })
    }
}
