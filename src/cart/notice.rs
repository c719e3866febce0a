use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Transient, user-facing message produced by a cart or checkout action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Result of a cart operation that did not fail outright.
///
/// `changed` is false when a guard rejected the operation or it was a no-op;
/// the cart and its snapshot are untouched in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartUpdate {
    pub changed: bool,
    pub notice: Option<Notice>,
}

impl CartUpdate {
    pub(crate) fn applied(notice: Option<Notice>) -> Self {
        Self {
            changed: true,
            notice,
        }
    }

    pub(crate) fn rejected(notice: Notice) -> Self {
        Self {
            changed: false,
            notice: Some(notice),
        }
    }

    pub(crate) fn unchanged() -> Self {
        Self {
            changed: false,
            notice: None,
        }
    }
}

/// Published to subscribers after each operation that changed the cart or
/// produced a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    pub key: String,
    pub notice: Option<Notice>,
    pub cart_total: i64,
    pub cart_count: i64,
}
