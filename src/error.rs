use std::fmt;

/// Result type for RLPack operations
pub type Result<T> = std::result::Result<T, RlPackError>;

/// Main error type for the RLPack agent runtime
#[derive(Debug, Clone, PartialEq)]
pub enum RlPackError {
    /// A transition passed to `train` has a bad shape, action or value
    InvalidTransition {
        reason: String,
    },

    /// A state passed to `policy` does not match the configured shape
    ShapeMismatch {
        expected: String,
        actual: String,
    },

    /// The replay buffer holds fewer transitions than requested
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// Invalid model or agent arguments
    Configuration {
        name: String,
        reason: String,
    },

    /// Non-finite values detected in targets, losses or gradients
    NumericalInstability(String),

    /// IO errors (checkpoint files)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for RlPackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlPackError::InvalidTransition { reason } => {
                write!(f, "Invalid transition: {}", reason)
            }
            RlPackError::ShapeMismatch { expected, actual } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, actual)
            }
            RlPackError::InsufficientData { requested, available } => {
                write!(
                    f,
                    "Insufficient data: requested {} transitions, buffer holds {}",
                    requested, available
                )
            }
            RlPackError::Configuration { name, reason } => {
                write!(f, "Invalid configuration '{}': {}", name, reason)
            }
            RlPackError::NumericalInstability(msg) => write!(f, "Numerical instability: {}", msg),
            RlPackError::IoError(msg) => write!(f, "IO error: {}", msg),
            RlPackError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for RlPackError {}

impl From<std::io::Error> for RlPackError {
    fn from(err: std::io::Error) -> Self {
        RlPackError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for RlPackError {
    fn from(err: bincode::Error) -> Self {
        RlPackError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for RlPackError {
    fn from(err: serde_json::Error) -> Self {
        RlPackError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl RlPackError {
    pub fn invalid_transition<S: Into<String>>(reason: S) -> Self {
        RlPackError::InvalidTransition {
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        RlPackError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn configuration<S: Into<String>>(name: S, reason: S) -> Self {
        RlPackError::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        RlPackError::NumericalInstability(msg.into())
    }

    /// Whether this error is the soft warm-up condition of the replay buffer
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, RlPackError::InsufficientData { .. })
    }
}
