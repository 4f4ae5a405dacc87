// ==========================================
// 成衣厂核价与生产流程系统 - 款式 API
// ==========================================
// 职责: 款式维护、BOM/工序编辑、款式状态流转
// 红线: 状态校验先于载荷校验
// ==========================================

use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::{authorize, confirm_style_event, rejected};
use crate::backend::context::RequestContext;
use crate::backend::contract::{
    AddBomLineRequest, AddRoutingStepRequest, CreateStyleRequest, ReorderRoutingRequest,
    UpdateBomLineRequest, UpdateRoutingStepRequest, UpdateStyleRequest,
};
use crate::backend::gateway::StyleBackend;
use crate::domain::menu::Capability;
use crate::domain::style::Style;
use crate::domain::types::StyleStatus;
use crate::engine::workflow::{StyleEvent, StyleWorkflow};

// ==========================================
// StyleApi - 款式 API
// ==========================================

/// 款式API
///
/// 职责：
/// 1. 款式创建/查询/修改/删除
/// 2. BOM 与工序编辑 (仅草稿)
/// 3. 款式事件 (送核价/开产/完成/取消)
pub struct StyleApi {
    backend: Arc<dyn StyleBackend>,
}

impl StyleApi {
    pub fn new(backend: Arc<dyn StyleBackend>) -> Self {
        Self { backend }
    }

    async fn snapshot(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        Ok(self.backend.get_style(ctx, style_id).await?)
    }

    /// 草稿行编辑前置: 授权 → 快照 → 状态校验
    async fn editable_snapshot(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        action: &str,
    ) -> ApiResult<Style> {
        authorize(ctx, action, &[Capability::EditStyle])?;
        let style = self.snapshot(ctx, style_id).await?;
        StyleWorkflow::ensure_lines_editable(style.status)
            .map_err(|e| rejected(action, e.into()))?;
        Ok(style)
    }

    // ==========================================
    // 款式维护
    // ==========================================

    /// 创建款式
    ///
    /// # 返回
    /// - Ok(Style): 后端确认的草稿款式
    /// - Err(ApiError::Validation): 款号不合规
    pub async fn create_style(
        &self,
        ctx: &RequestContext,
        req: CreateStyleRequest,
    ) -> ApiResult<Style> {
        authorize(ctx, "createStyle", &[Capability::EditStyle])?;
        let req = req.normalized();
        req.validate().map_err(|v| rejected("createStyle", v.into()))?;

        let style = self.backend.create_style(ctx, req).await?;
        info!(
            style_id = %style.id,
            "{}",
            crate::i18n::t_with_args("message.style_created", &[("code", &style.code)])
        );
        Ok(style)
    }

    pub async fn get_style(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        self.snapshot(ctx, style_id).await
    }

    pub async fn list_styles(
        &self,
        ctx: &RequestContext,
        status: Option<StyleStatus>,
    ) -> ApiResult<Vec<Style>> {
        Ok(self.backend.list_styles(ctx, status).await?)
    }

    pub async fn update_style(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: UpdateStyleRequest,
    ) -> ApiResult<Style> {
        authorize(ctx, "editStyle", &[Capability::EditStyle])?;
        let style = self.snapshot(ctx, style_id).await?;
        StyleWorkflow::ensure_info_editable(style.status)
            .map_err(|e| rejected("editStyle", e.into()))?;
        req.validate().map_err(|v| rejected("editStyle", v.into()))?;

        Ok(self.backend.update_style(ctx, style_id, req).await?)
    }

    /// 删除款式 (仅草稿)
    pub async fn delete_style(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<()> {
        authorize(ctx, "deleteStyle", &[Capability::EditStyle])?;
        let style = self.snapshot(ctx, style_id).await?;
        StyleWorkflow::ensure_deletable(style.status)
            .map_err(|e| rejected("deleteStyle", e.into()))?;

        self.backend.delete_style(ctx, style_id).await?;
        info!(style_id, code = %style.code, "款式已删除");
        Ok(())
    }

    // ==========================================
    // BOM
    // ==========================================

    pub async fn add_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: AddBomLineRequest,
    ) -> ApiResult<Style> {
        self.editable_snapshot(ctx, style_id, "addBomLine").await?;
        req.validate().map_err(|v| rejected("addBomLine", v.into()))?;
        Ok(self.backend.add_bom_line(ctx, style_id, req).await?)
    }

    pub async fn update_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        line_id: &str,
        req: UpdateBomLineRequest,
    ) -> ApiResult<Style> {
        let style = self
            .editable_snapshot(ctx, style_id, "updateBomLine")
            .await?;
        if style.find_bom_line(line_id).is_none() {
            return Err(ApiError::NotFound {
                entity: "BomLine".to_string(),
                id: line_id.to_string(),
            });
        }
        req.validate()
            .map_err(|v| rejected("updateBomLine", v.into()))?;
        Ok(self
            .backend
            .update_bom_line(ctx, style_id, line_id, req)
            .await?)
    }

    pub async fn delete_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        line_id: &str,
    ) -> ApiResult<Style> {
        let style = self
            .editable_snapshot(ctx, style_id, "deleteBomLine")
            .await?;
        if style.find_bom_line(line_id).is_none() {
            return Err(ApiError::NotFound {
                entity: "BomLine".to_string(),
                id: line_id.to_string(),
            });
        }
        Ok(self.backend.delete_bom_line(ctx, style_id, line_id).await?)
    }

    // ==========================================
    // 工序
    // ==========================================

    pub async fn add_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: AddRoutingStepRequest,
    ) -> ApiResult<Style> {
        self.editable_snapshot(ctx, style_id, "addRoutingStep")
            .await?;
        req.validate()
            .map_err(|v| rejected("addRoutingStep", v.into()))?;
        Ok(self.backend.add_routing_step(ctx, style_id, req).await?)
    }

    pub async fn update_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        step_id: &str,
        req: UpdateRoutingStepRequest,
    ) -> ApiResult<Style> {
        let style = self
            .editable_snapshot(ctx, style_id, "updateRoutingStep")
            .await?;
        if style.find_routing_step(step_id).is_none() {
            return Err(ApiError::NotFound {
                entity: "RoutingStep".to_string(),
                id: step_id.to_string(),
            });
        }
        req.validate()
            .map_err(|v| rejected("updateRoutingStep", v.into()))?;
        Ok(self
            .backend
            .update_routing_step(ctx, style_id, step_id, req)
            .await?)
    }

    pub async fn delete_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        step_id: &str,
    ) -> ApiResult<Style> {
        let style = self
            .editable_snapshot(ctx, style_id, "deleteRoutingStep")
            .await?;
        if style.find_routing_step(step_id).is_none() {
            return Err(ApiError::NotFound {
                entity: "RoutingStep".to_string(),
                id: step_id.to_string(),
            });
        }
        Ok(self
            .backend
            .delete_routing_step(ctx, style_id, step_id)
            .await?)
    }

    /// 工序重排 (须为现有工序ID的一个排列)
    pub async fn reorder_routing(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: ReorderRoutingRequest,
    ) -> ApiResult<Style> {
        let style = self
            .editable_snapshot(ctx, style_id, "reorderRouting")
            .await?;
        req.validate_against(&style.routing_step_ids())
            .map_err(|v| rejected("reorderRouting", v.into()))?;
        Ok(self.backend.reorder_routing(ctx, style_id, req).await?)
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 触发款式事件
    ///
    /// 先用本地快照过一遍状态机,非法事件不发往后端
    pub async fn transition(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        event: StyleEvent,
    ) -> ApiResult<Style> {
        confirm_style_event(self.backend.as_ref(), ctx, style_id, event).await
    }

    /// 送核价
    pub async fn submit_for_costing(
        &self,
        ctx: &RequestContext,
        style_id: &str,
    ) -> ApiResult<Style> {
        self.transition(ctx, style_id, StyleEvent::SubmitForCosting)
            .await
    }

    /// 款式开产
    pub async fn start_production(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        self.transition(ctx, style_id, StyleEvent::StartProduction)
            .await
    }

    /// 款式完成
    pub async fn complete(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        self.transition(ctx, style_id, StyleEvent::Complete).await
    }

    pub async fn cancel(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        self.transition(ctx, style_id, StyleEvent::Cancel).await
    }

    /// 当前角色在款式当前状态下可执行的事件
    pub async fn available_events(
        &self,
        ctx: &RequestContext,
        style_id: &str,
    ) -> ApiResult<Vec<StyleEvent>> {
        let style = self.snapshot(ctx, style_id).await?;
        Ok(StyleWorkflow::available_events(style.status)
            .into_iter()
            .filter(|e| ctx.role.can_any(e.required_capabilities()))
            .collect())
    }
}
