// ==========================================
// 成衣厂核价与生产流程系统 - API层错误类型
// ==========================================
// 职责: 统一编排层错误,调用方可按 kind() 区分处理
// 分类: 校验 / 非法流转 / 不存在 / 权限 / 后端
// ==========================================

use crate::backend::context::PermissionDenied;
use crate::backend::contract::FieldViolation;
use crate::backend::gateway::BackendError;
use crate::domain::types::Role;
use crate::engine::workflow::TransitionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    // ==========================================
    // 请求错误 (变更前即拒绝)
    // ==========================================
    #[error("字段校验失败 ({field}): {message}")]
    Validation { field: String, message: String },

    #[error("{entity} 当前状态 {from} 不允许执行 {action}")]
    InvalidTransition {
        entity: String,
        from: String,
        action: String,
    },

    #[error("{entity} 不存在: {id}")]
    NotFound { entity: String, id: String },

    #[error("角色 {role} 无权执行 {action}")]
    PermissionDenied { role: Role, action: String },

    // ==========================================
    // 后端错误 (存储/传输/认证, 不重试)
    // ==========================================
    #[error("后端错误: {0}")]
    Backend(String),
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorKind {
    Validation,
    InvalidTransition,
    NotFound,
    PermissionDenied,
    Backend,
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Validation { .. } => ApiErrorKind::Validation,
            ApiError::InvalidTransition { .. } => ApiErrorKind::InvalidTransition,
            ApiError::NotFound { .. } => ApiErrorKind::NotFound,
            ApiError::PermissionDenied { .. } => ApiErrorKind::PermissionDenied,
            ApiError::Backend(_) => ApiErrorKind::Backend,
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ==========================================
// 转换
// ==========================================

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::InvalidTransition {
            entity: err.entity.to_string(),
            from: err.from,
            action: err.action,
        }
    }
}

impl From<FieldViolation> for ApiError {
    fn from(v: FieldViolation) -> Self {
        ApiError::Validation {
            field: v.field,
            message: v.message,
        }
    }
}

impl From<PermissionDenied> for ApiError {
    fn from(e: PermissionDenied) -> Self {
        ApiError::PermissionDenied {
            role: e.role,
            action: e.action,
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Validation { field, message } => ApiError::Validation { field, message },
            BackendError::InvalidTransition(e) => e.into(),
            BackendError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            BackendError::PermissionDenied { role, action } => {
                ApiError::PermissionDenied { role, action }
            }
            other @ (BackendError::Unauthenticated
            | BackendError::Storage(_)
            | BackendError::Export(_)) => ApiError::Backend(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
