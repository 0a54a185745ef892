//! Unified error type for the RAO crates.
//!
//! Configuration problems (inconsistent usage limits, a CNEC that is neither
//! optimized nor monitored, dangling references in the CRAC) are reported
//! eagerly as [`RaoError::Config`] or [`RaoError::Validation`] at the point
//! where the offending object is built. Evaluators never return errors: an
//! undefined flow or margin travels as `NaN` instead.
//!
//! # Example
//!
//! ```
//! use rao_core::{Crac, CoreResult, InstantKind};
//!
//! fn minimal_crac() -> CoreResult<Crac> {
//!     let mut crac = Crac::new("crac");
//!     crac.add_instant("preventive", InstantKind::Preventive)?;
//!     crac.add_instant("outage", InstantKind::Outage)?;
//!     Ok(crac)
//! }
//!
//! assert!(minimal_crac().is_ok());
//! ```

use thiserror::Error;

/// Error type for all catalog, configuration and recording operations.
#[derive(Error, Debug)]
pub enum RaoError {
    /// I/O errors (reading parameter files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid configuration, rejected at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog or recorder consistency errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lookup of an unknown identifier
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Two states whose ordering is undefined
    #[error("Cannot compare states: {0}")]
    Comparison(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl RaoError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        RaoError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Convenience type alias for results carrying a [`RaoError`].
pub type CoreResult<T> = Result<T, RaoError>;

impl From<anyhow::Error> for RaoError {
    fn from(err: anyhow::Error) -> Self {
        RaoError::Other(format!("{err:#}"))
    }
}

impl From<String> for RaoError {
    fn from(s: String) -> Self {
        RaoError::Other(s)
    }
}

impl From<&str> for RaoError {
    fn from(s: &str) -> Self {
        RaoError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for RaoError {
    fn from(err: serde_json::Error) -> Self {
        RaoError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for RaoError {
    fn from(err: serde_yaml::Error) -> Self {
        RaoError::Parse(err.to_string())
    }
}
