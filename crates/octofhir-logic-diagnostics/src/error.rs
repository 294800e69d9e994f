//! Logic error types

use thiserror::Error;

/// Errors that can occur while building, translating or evaluating criteria
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogicError {
    /// Malformed textual query, surfaced from an external parser
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Root token has no rule bound to it
    #[error("unregistered token: {token}")]
    UnresolvedToken { token: String },

    /// No data source registered under the given name
    #[error("unregistered data source: {name}")]
    UnresolvedSource { name: String },

    /// Operator illegal for the operand's type, or legal for the type but
    /// meaningless for the targeted fact source
    #[error("operator {operator} cannot be applied to {left} with operand {operand}")]
    UnsupportedOperator {
        operator: String,
        left: String,
        operand: String,
    },

    /// Root token is neither a structural field nor a resolvable category
    // `r#source` opts out of thiserror's source-field inference: this field is
    // a data-source name, not an underlying error.
    #[error("unknown token '{token}' for data source '{source}'")]
    UnknownToken { token: String, r#source: String },

    /// Expression tree is structurally invalid for translation
    #[error("malformed expression: {message}")]
    Malformed { message: String },

    /// Cache backend failure; non-fatal, callers degrade to a miss
    #[error("cache backend error: {message}")]
    CacheBackend { message: String },

    /// General evaluation failure with an optional underlying cause
    #[error("evaluation failed: {message}")]
    Evaluation {
        message: String,
        #[source]
        cause: Option<Box<LogicError>>,
    },
}

impl LogicError {
    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an unresolved token error
    pub fn unresolved_token(token: impl Into<String>) -> Self {
        Self::UnresolvedToken {
            token: token.into(),
        }
    }

    /// Create an unresolved data source error
    pub fn unresolved_source(name: impl Into<String>) -> Self {
        Self::UnresolvedSource { name: name.into() }
    }

    /// Create an unsupported operator error
    pub fn unsupported_operator(
        operator: impl ToString,
        left: impl ToString,
        operand: impl ToString,
    ) -> Self {
        Self::UnsupportedOperator {
            operator: operator.to_string(),
            left: left.to_string(),
            operand: operand.to_string(),
        }
    }

    /// Create an unknown token error
    pub fn unknown_token(token: impl Into<String>, source: impl Into<String>) -> Self {
        Self::UnknownToken {
            token: token.into(),
            source: source.into(),
        }
    }

    /// Create a malformed expression error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a cache backend error
    pub fn cache_backend(message: impl Into<String>) -> Self {
        Self::CacheBackend {
            message: message.into(),
        }
    }

    /// Create a general evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a general evaluation error wrapping an underlying cause
    pub fn evaluation_caused(message: impl Into<String>, cause: LogicError) -> Self {
        Self::Evaluation {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Whether this error came from a cache backend and may be tolerated
    /// by treating the lookup as a miss
    pub const fn is_cache_backend(&self) -> bool {
        matches!(self, Self::CacheBackend { .. })
    }
}
