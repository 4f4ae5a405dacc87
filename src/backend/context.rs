// ==========================================
// 成衣厂核价与生产流程系统 - 请求上下文
// ==========================================
// 职责: 操作人/角色/凭证随每次后端调用显式传递
// 红线: 不读取任何全局令牌存储
// ==========================================

use crate::domain::menu::Capability;
use crate::domain::types::Role;
use std::fmt;
use std::sync::Arc;

// ==========================================
// CredentialProvider - 凭证提供者
// ==========================================
/// 访问令牌来源 (会话存储/刷新逻辑由外部实现)
pub trait CredentialProvider: Send + Sync {
    /// 当前访问令牌; None 表示未登录
    fn access_token(&self) -> Option<String>;
}

/// 固定令牌 (测试与本地工具)
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// 无令牌 (模拟未登录)
    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentials {
    fn access_token(&self) -> Option<String> {
        self.token.clone().filter(|t| !t.trim().is_empty())
    }
}

// ==========================================
// RequestContext - 请求上下文
// ==========================================
#[derive(Clone)]
pub struct RequestContext {
    pub actor: String,
    pub role: Role,
    credentials: Arc<dyn CredentialProvider>,
}

impl RequestContext {
    pub fn new(
        actor: impl Into<String>,
        role: Role,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            actor: actor.into(),
            role,
            credentials,
        }
    }

    /// 使用固定令牌构造
    pub fn with_token(actor: impl Into<String>, role: Role, token: impl Into<String>) -> Self {
        Self::new(actor, role, Arc::new(StaticCredentials::new(token)))
    }

    pub fn access_token(&self) -> Option<String> {
        self.credentials.access_token()
    }

    /// 角色是否具备任一能力
    ///
    /// # 返回
    /// - Err(PermissionDenied): 角色不具备所需能力
    pub fn require_any(
        &self,
        action: &str,
        capabilities: &[Capability],
    ) -> Result<(), PermissionDenied> {
        if self.role.can_any(capabilities) {
            Ok(())
        } else {
            Err(PermissionDenied {
                role: self.role,
                action: action.to_string(),
            })
        }
    }

    pub fn require(&self, action: &str, capability: Capability) -> Result<(), PermissionDenied> {
        self.require_any(action, &[capability])
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 不输出令牌
        f.debug_struct("RequestContext")
            .field("actor", &self.actor)
            .field("role", &self.role)
            .field("authenticated", &self.access_token().is_some())
            .finish()
    }
}

/// 权限不足
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("角色 {role} 无权执行 {action}")]
pub struct PermissionDenied {
    pub role: Role,
    pub action: String,
}
