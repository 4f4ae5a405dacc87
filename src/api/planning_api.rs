// ==========================================
// 成衣厂核价与生产流程系统 - 计划/车间 API
// ==========================================
// 职责: 生产单下达、开工、报工、完工、取消
// 红线: 仅 COST_APPROVED / READY_FOR_PLANNING 款式可下达生产单
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::{authorize, rejected};
use crate::backend::context::RequestContext;
use crate::backend::contract::{CreateWorkOrderRequest, RecordOutputRequest};
use crate::backend::gateway::StyleBackend;
use crate::domain::work_order::WorkOrder;
use crate::engine::workflow::{StyleEvent, StyleWorkflow, WorkOrderEvent, WorkOrderWorkflow};

// ==========================================
// WorkOrderProgress - 生产进度视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderProgress {
    pub work_order: WorkOrder,
    pub progress_percent: u32,
    pub remaining_quantity: i64,
    pub status_label: String,
}

impl From<WorkOrder> for WorkOrderProgress {
    fn from(work_order: WorkOrder) -> Self {
        Self {
            progress_percent: work_order.progress_percent(),
            remaining_quantity: work_order.remaining_quantity(),
            status_label: work_order.status.label(),
            work_order,
        }
    }
}

// ==========================================
// PlanningApi
// ==========================================

/// 计划/车间API
pub struct PlanningApi {
    backend: Arc<dyn StyleBackend>,
}

impl PlanningApi {
    pub fn new(backend: Arc<dyn StyleBackend>) -> Self {
        Self { backend }
    }

    /// 下达生产单
    ///
    /// # 返回
    /// - Ok(WorkOrder): READY_FOR_PLANNING 状态的新生产单 (款式同步推进)
    /// - Err(InvalidTransition): 款式尚未批准价格
    pub async fn create_work_order(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: CreateWorkOrderRequest,
    ) -> ApiResult<WorkOrder> {
        let event = StyleEvent::CreateWorkOrder;
        let action = event.as_str();
        authorize(ctx, action, event.required_capabilities())?;
        let style = self.backend.get_style(ctx, style_id).await?;
        StyleWorkflow::next_status(style.status, event).map_err(|e| rejected(action, e.into()))?;
        req.validate().map_err(|v| rejected(action, v.into()))?;

        let work_order = self.backend.create_work_order(ctx, style_id, req).await?;
        info!(
            work_order_id = %work_order.id,
            style_code = %style.code,
            quantity = work_order.quantity,
            "生产单已确认"
        );
        Ok(work_order)
    }

    pub async fn get_work_order(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
    ) -> ApiResult<WorkOrder> {
        Ok(self.backend.get_work_order(ctx, work_order_id).await?)
    }

    pub async fn list_work_orders(
        &self,
        ctx: &RequestContext,
        style_id: Option<&str>,
    ) -> ApiResult<Vec<WorkOrder>> {
        Ok(self.backend.list_work_orders(ctx, style_id).await?)
    }

    /// 生产进度 (车间看板)
    pub async fn progress(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
    ) -> ApiResult<WorkOrderProgress> {
        Ok(self.get_work_order(ctx, work_order_id).await?.into())
    }

    // ==========================================
    // 生产单事件
    // ==========================================

    async fn transition(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
        event: WorkOrderEvent,
    ) -> ApiResult<WorkOrder> {
        let action = event.as_str();
        authorize(ctx, action, event.required_capabilities())?;
        let work_order = self.get_work_order(ctx, work_order_id).await?;
        WorkOrderWorkflow::next_status(work_order.status, event)
            .map_err(|e| rejected(action, e.into()))?;

        let confirmed = self
            .backend
            .transition_work_order(ctx, work_order_id, event)
            .await?;
        info!(
            work_order_id,
            event = action,
            from = %work_order.status,
            to = %confirmed.status,
            "生产单状态已确认"
        );
        Ok(confirmed)
    }

    /// 开工
    pub async fn start_production(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
    ) -> ApiResult<WorkOrder> {
        self.transition(ctx, work_order_id, WorkOrderEvent::StartProduction)
            .await
    }

    /// 完工
    pub async fn complete(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
    ) -> ApiResult<WorkOrder> {
        self.transition(ctx, work_order_id, WorkOrderEvent::Complete)
            .await
    }

    pub async fn cancel(&self, ctx: &RequestContext, work_order_id: &str) -> ApiResult<WorkOrder> {
        self.transition(ctx, work_order_id, WorkOrderEvent::Cancel)
            .await
    }

    /// 报工 (产量/次品增量)
    pub async fn record_output(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
        req: RecordOutputRequest,
    ) -> ApiResult<WorkOrderProgress> {
        let event = if req.output_delta.unwrap_or(0) > 0 {
            WorkOrderEvent::RecordOutput
        } else {
            WorkOrderEvent::RecordDefects
        };
        let action = event.as_str();
        authorize(ctx, action, event.required_capabilities())?;
        let work_order = self.get_work_order(ctx, work_order_id).await?;
        WorkOrderWorkflow::next_status(work_order.status, event)
            .map_err(|e| rejected(action, e.into()))?;
        req.validate().map_err(|v| rejected(action, v.into()))?;

        let confirmed = self
            .backend
            .record_output(ctx, work_order_id, req)
            .await?;
        let progress = WorkOrderProgress::from(confirmed);
        info!(
            work_order_id,
            actual_output = progress.work_order.actual_output,
            defect_count = progress.work_order.defect_count,
            progress = progress.progress_percent,
            "报工已确认"
        );
        Ok(progress)
    }
}
