use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid memo store url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("memo store unreachable: {0}")]
    Transport(String),
    #[error("memo store returned {status}: {message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("malformed memo store response: {0}")]
    Decode(String),
    #[error("load {ticket} superseded by load {applied}")]
    Superseded { ticket: u64, applied: u64 },
}

impl SyncError {
    pub fn from_response_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiError>(body) {
            Ok(api) => Self::Status {
                status,
                code: if api.code == ErrorCode::Internal {
                    ErrorCode::from_status(status)
                } else {
                    api.code
                },
                message: api.message,
            },
            Err(_) => Self::Status {
                status,
                code: ErrorCode::from_status(status),
                message: if body.trim().is_empty() {
                    "no response body".to_string()
                } else {
                    body.trim().to_string()
                },
            },
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else if let Some(status) = value.status() {
            Self::Status {
                status: status.as_u16(),
                code: ErrorCode::from_status(status.as_u16()),
                message: value.to_string(),
            }
        } else {
            Self::Transport(value.to_string())
        }
    }
}
