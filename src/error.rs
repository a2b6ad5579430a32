use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    /// The console could not be reached (connection refused, timeout, DNS).
    #[error("Ristretto transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Ristretto returned HTTP {status} for {path}")]
    Status {
        path: String,
        status: reqwest::StatusCode,
    },

    #[error("Unexpected payload from {path}: {reason}")]
    UnexpectedPayload { path: String, reason: String },

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    InstanceLock(#[from] crate::instance_lock::InstanceLockError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl BridgeError {
    /// True when the failure means the device is offline rather than misbehaving.
    ///
    /// Body decode errors surface from reqwest too, but the server did answer,
    /// so they count as application failures.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            BridgeError::Transport(e) => !e.is_decode() && !e.is_status(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_failures_are_not_transport() {
        let err = BridgeError::Status {
            path: "/title/current".to_string(),
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert!(!err.is_transport_failure());

        let err = BridgeError::UnexpectedPayload {
            path: "/gamepad/battery".to_string(),
            reason: "not a number".to_string(),
        };
        assert!(!err.is_transport_failure());
        assert_eq!(
            err.to_string(),
            "Unexpected payload from /gamepad/battery: not a number"
        );
    }
}
