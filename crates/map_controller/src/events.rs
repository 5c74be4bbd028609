//! Sync requests issued by the session, their outcomes, and user-facing alerts.

use std::sync::Arc;

use shared::{
    domain::{Coordinates, Memo, MemoId},
    error::ErrorCode,
    protocol::CreateMemoDraft,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncRequest {
    Load { limit: u32 },
    Create(CreateMemoDraft),
    UpdateLocation { memo_id: MemoId, position: Coordinates },
    Delete { memo_id: MemoId },
}

impl SyncRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Create(_) => "create",
            Self::UpdateLocation { .. } => "update_location",
            Self::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl SyncFailure {
    pub fn new(message: impl Into<String>, code: Option<ErrorCode>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Loaded {
        memos: Arc<[Memo]>,
        total_items: usize,
    },
    LoadFailed(SyncFailure),
    Created(Memo),
    CreateFailed(SyncFailure),
    LocationUpdated {
        memo_id: MemoId,
    },
    UpdateFailed {
        memo_id: MemoId,
        failure: SyncFailure,
    },
    Deleted {
        memo_id: MemoId,
    },
    DeleteFailed {
        memo_id: MemoId,
        failure: SyncFailure,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCategory {
    Auth,
    Transport,
    NotFound,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertContext {
    Load,
    Create,
    UpdateLocation,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionAlert {
    category: AlertCategory,
    context: AlertContext,
    message: String,
}

impl SessionAlert {
    pub fn from_failure(context: AlertContext, failure: &SyncFailure) -> Self {
        let category = match failure.code {
            Some(ErrorCode::Unauthorized | ErrorCode::Forbidden) => AlertCategory::Auth,
            Some(ErrorCode::NotFound) => AlertCategory::NotFound,
            Some(ErrorCode::Validation) => AlertCategory::Validation,
            _ => classify_message(&failure.message),
        };
        Self {
            category,
            context,
            message: failure.message.clone(),
        }
    }

    pub fn category(&self) -> AlertCategory {
        self.category
    }

    pub fn context(&self) -> AlertContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == AlertCategory::Auth
    }

    pub fn headline(&self) -> &'static str {
        match self.context {
            AlertContext::Load => "Failed to load memos",
            AlertContext::Create => "Failed to create memo. Please try again.",
            AlertContext::UpdateLocation => "Failed to update memo location. Please try again.",
            AlertContext::Delete => "Failed to delete memo. Please try again.",
        }
    }
}

fn classify_message(message: &str) -> AlertCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("token")
    {
        AlertCategory::Auth
    } else if lower.contains("404") || lower.contains("not found") {
        AlertCategory::NotFound
    } else if lower.contains("invalid")
        || lower.contains("missing")
        || lower.contains("malformed")
        || lower.contains("422")
    {
        AlertCategory::Validation
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("unreachable")
        || lower.contains("dns")
    {
        AlertCategory::Transport
    } else {
        AlertCategory::Unknown
    }
}
