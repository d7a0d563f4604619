//! Error types for command argument declaration and execution
//!
//! 参数校验、声明阶段、校验器注册以及钩子执行的错误类型

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while vetting an argument bag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("Argument '{0}' not present in command args")]
    MissingRequired(String),

    #[error("Argument '{0}' may not be None")]
    NotNone(String),

    #[error("Expected '{name}' to be of type '{expected}' but was '{actual}'")]
    UnexpectedType {
        name: String,
        expected: String,
        actual: String,
    },
}

impl ArgError {
    /// Name of the argument the failure refers to
    pub fn arg_name(&self) -> &str {
        match self {
            ArgError::MissingRequired(name) | ArgError::NotNone(name) => name,
            ArgError::UnexpectedType { name, .. } => name,
        }
    }
}

/// Errors surfaced by command definition and `run`
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ArgError),

    /// A declaration method was called outside the declaration phase
    #[error("Validators may only be declared during argument declaration")]
    NotDeclaring,

    #[error("{0}")]
    InvalidValidator(String),

    #[error("Unknown validator kind: {0}")]
    UnknownKind(String),

    #[error("Validator kind '{0}' is already registered")]
    KindAlreadyRegistered(String),

    #[error("Validator kind name cannot be empty or contain only whitespace")]
    InvalidKindName,

    #[error("Invalid command arguments: {0}")]
    InvalidArgs(String),

    /// Raised by a user `validate`/`execute`/`declare_args` hook
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}

/// Coarse classification of command errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorType {
    MissingRequired,
    NotNone,
    UnexpectedType,
    NotDeclaring,
    InvalidValidator,
    UnknownKind,
    RegistrationFailed,
    InvalidArgs,
    HookFailed,
}

impl CommandError {
    pub fn missing_required(name: &str) -> Self {
        ArgError::MissingRequired(name.to_string()).into()
    }

    pub fn not_none(name: &str) -> Self {
        ArgError::NotNone(name.to_string()).into()
    }

    pub fn unexpected_type(name: &str, expected: &str, actual: &str) -> Self {
        ArgError::UnexpectedType {
            name: name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into()
    }

    pub fn invalid_validator(reason: &str) -> Self {
        CommandError::InvalidValidator(reason.to_string())
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            CommandError::Validation(ArgError::MissingRequired(_)) => ErrorType::MissingRequired,
            CommandError::Validation(ArgError::NotNone(_)) => ErrorType::NotNone,
            CommandError::Validation(ArgError::UnexpectedType { .. }) => ErrorType::UnexpectedType,
            CommandError::NotDeclaring => ErrorType::NotDeclaring,
            CommandError::InvalidValidator(_) => ErrorType::InvalidValidator,
            CommandError::UnknownKind(_) => ErrorType::UnknownKind,
            CommandError::KindAlreadyRegistered(_) | CommandError::InvalidKindName => {
                ErrorType::RegistrationFailed
            }
            CommandError::InvalidArgs(_) => ErrorType::InvalidArgs,
            CommandError::Hook(_) => ErrorType::HookFailed,
        }
    }

    /// The argument validation failure, if this is one
    pub fn as_validation(&self) -> Option<&ArgError> {
        match self {
            CommandError::Validation(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.as_validation().is_some()
    }
}
