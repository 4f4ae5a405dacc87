// ==========================================
// 成衣厂核价与生产流程系统 - 后端网关 Trait
// ==========================================
// 职责: 定义编排层所依赖的后端接口（不包含实现）
// 红线: 每个方法显式接收 RequestContext; 后端对每次请求重新校验
// 实现者: SqliteStyleBackend (参考实现) / 远程 HTTP 客户端
// ==========================================

use crate::backend::context::{PermissionDenied, RequestContext};
use crate::backend::contract::{
    AddBomLineRequest, AddRoutingStepRequest, AdjustStockRequest, CreateMaterialRequest,
    CreateStyleRequest, CreateWorkOrderRequest, ExportRequest, FieldViolation,
    RecordOutputRequest, ReorderRoutingRequest, SaveCostEstimationRequest, UpdateBomLineRequest,
    UpdateRoutingStepRequest, UpdateStyleRequest,
};
use crate::domain::action_log::ActionLog;
use crate::domain::material::Material;
use crate::domain::style::Style;
use crate::domain::types::{Role, StyleStatus};
use crate::domain::work_order::WorkOrder;
use crate::engine::workflow::{StyleEvent, TransitionError, WorkOrderEvent};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use thiserror::Error;

// ==========================================
// BackendError - 后端错误
// ==========================================
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("未认证: 缺少访问令牌")]
    Unauthenticated,

    #[error("角色 {role} 无权执行 {action}")]
    PermissionDenied { role: Role, action: String },

    #[error("{entity} 不存在: {id}")]
    NotFound { entity: String, id: String },

    #[error("字段校验失败 ({field}): {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("导出失败: {0}")]
    Export(String),
}

impl BackendError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        BackendError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<FieldViolation> for BackendError {
    fn from(v: FieldViolation) -> Self {
        BackendError::Validation {
            field: v.field,
            message: v.message,
        }
    }
}

impl From<PermissionDenied> for BackendError {
    fn from(e: PermissionDenied) -> Self {
        BackendError::PermissionDenied {
            role: e.role,
            action: e.action,
        }
    }
}

impl From<RepositoryError> for BackendError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => BackendError::NotFound { entity, id },
            RepositoryError::UniqueConstraintViolation(msg) => BackendError::Validation {
                field: "code".to_string(),
                message: format!("编码已存在: {}", msg),
            },
            RepositoryError::FieldValueError { field, message } => {
                BackendError::Validation { field, message }
            }
            other => BackendError::Storage(other.to_string()),
        }
    }
}

impl From<csv::Error> for BackendError {
    fn from(err: csv::Error) -> Self {
        BackendError::Export(err.to_string())
    }
}

/// Result 类型别名
pub type BackendResult<T> = Result<T, BackendError>;

// ==========================================
// StyleBackend Trait
// ==========================================
// 返回值均为后端确认后的最新实体; 编排层只用确认结果更新视图
#[async_trait]
pub trait StyleBackend: Send + Sync {
    // ===== 款式 =====

    async fn create_style(&self, ctx: &RequestContext, req: CreateStyleRequest)
        -> BackendResult<Style>;

    async fn get_style(&self, ctx: &RequestContext, style_id: &str) -> BackendResult<Style>;

    async fn list_styles(
        &self,
        ctx: &RequestContext,
        status: Option<StyleStatus>,
    ) -> BackendResult<Vec<Style>>;

    async fn update_style(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: UpdateStyleRequest,
    ) -> BackendResult<Style>;

    /// 删除款式 (仅草稿)
    async fn delete_style(&self, ctx: &RequestContext, style_id: &str) -> BackendResult<()>;

    // ===== BOM (仅草稿) =====

    async fn add_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: AddBomLineRequest,
    ) -> BackendResult<Style>;

    async fn update_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        line_id: &str,
        req: UpdateBomLineRequest,
    ) -> BackendResult<Style>;

    async fn delete_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        line_id: &str,
    ) -> BackendResult<Style>;

    // ===== 工序 (仅草稿) =====

    async fn add_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: AddRoutingStepRequest,
    ) -> BackendResult<Style>;

    async fn update_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        step_id: &str,
        req: UpdateRoutingStepRequest,
    ) -> BackendResult<Style>;

    async fn delete_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        step_id: &str,
    ) -> BackendResult<Style>;

    async fn reorder_routing(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: ReorderRoutingRequest,
    ) -> BackendResult<Style>;

    // ===== 状态流转 =====

    /// 款式事件 (送核价/退回/估价提交/要求调整/批准/开产/完成/取消)
    ///
    /// 生产单创建不走此入口,见 create_work_order
    async fn transition_style(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        event: StyleEvent,
    ) -> BackendResult<Style>;

    // ===== 财务估价 =====

    /// 保存估价草稿 (仅已送核价状态)
    async fn save_cost_estimation(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: SaveCostEstimationRequest,
    ) -> BackendResult<Style>;

    // ===== 生产单 =====

    async fn create_work_order(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: CreateWorkOrderRequest,
    ) -> BackendResult<WorkOrder>;

    async fn get_work_order(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
    ) -> BackendResult<WorkOrder>;

    async fn list_work_orders(
        &self,
        ctx: &RequestContext,
        style_id: Option<&str>,
    ) -> BackendResult<Vec<WorkOrder>>;

    /// 生产单事件 (开工/完工/取消)
    async fn transition_work_order(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
        event: WorkOrderEvent,
    ) -> BackendResult<WorkOrder>;

    async fn record_output(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
        req: RecordOutputRequest,
    ) -> BackendResult<WorkOrder>;

    // ===== 导出 =====

    /// 导出款式资料 (CSV 字节流)
    async fn export_styles(&self, ctx: &RequestContext, req: ExportRequest)
        -> BackendResult<Vec<u8>>;

    // ===== 物料 =====

    async fn list_materials(&self, ctx: &RequestContext) -> BackendResult<Vec<Material>>;

    async fn get_material(&self, ctx: &RequestContext, material_id: &str)
        -> BackendResult<Material>;

    async fn create_material(
        &self,
        ctx: &RequestContext,
        req: CreateMaterialRequest,
    ) -> BackendResult<Material>;

    async fn adjust_stock(
        &self,
        ctx: &RequestContext,
        material_id: &str,
        req: AdjustStockRequest,
    ) -> BackendResult<Material>;

    async fn list_low_stock(
        &self,
        ctx: &RequestContext,
        threshold: f64,
    ) -> BackendResult<Vec<Material>>;

    // ===== 审计 =====

    async fn list_actions(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        entity_id: &str,
    ) -> BackendResult<Vec<ActionLog>>;
}
