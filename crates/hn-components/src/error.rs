//! Error types for component operations.

use hn_core::error::HnError;
use thiserror::Error;

/// Errors that can occur while building or evaluating element models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid curve {curve}: {reason}")]
    InvalidCurve { curve: String, reason: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<ComponentError> for HnError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::NonPhysical { what } => HnError::InvalidArg { what },
            ComponentError::InvalidArg { what } => HnError::InvalidArg { what },
            ComponentError::InvalidCurve { .. } => HnError::Invariant {
                what: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::InvalidCurve {
            curve: "C1".into(),
            reason: "no points",
        };
        assert!(err.to_string().contains("C1"));
    }

    #[test]
    fn error_conversion() {
        let err: HnError = ComponentError::NonPhysical { what: "diameter" }.into();
        assert!(matches!(err, HnError::InvalidArg { .. }));
    }
}
