// ==========================================
// 成衣厂核价与生产流程系统 - API 层
// ==========================================
// 职责: 编排层,唯一发起后端调用的地方
// 流程: 授权 → 读取快照 → 状态机校验 → 载荷校验 → 等待后端确认 → 记录日志
// 红线: 视图只用后端确认后的返回值更新
// ==========================================

pub mod costing_api;
pub mod error;
pub mod export_api;
pub mod material_api;
pub mod menu_api;
pub mod planning_api;
pub mod style_api;
pub mod validator;

// 重导出核心类型
pub use costing_api::{CostingApi, PricePreview};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use export_api::ExportApi;
pub use material_api::{LowStockReport, MaterialApi};
pub use menu_api::{menu_for, MenuItem};
pub use planning_api::{PlanningApi, WorkOrderProgress};
pub use style_api::StyleApi;
pub use validator::CostingInputValidator;

use crate::backend::context::RequestContext;
use crate::backend::gateway::StyleBackend;
use crate::domain::menu::Capability;
use crate::domain::style::Style;
use crate::engine::workflow::{StyleEvent, StyleWorkflow};
use tracing::{info, warn};

/// 本地能力预检 (后端仍会复核)
pub(crate) fn authorize(
    ctx: &RequestContext,
    action: &str,
    capabilities: &[Capability],
) -> ApiResult<()> {
    ctx.require_any(action, capabilities)
        .map_err(|e| rejected(action, e.into()))
}

/// 记录被拒绝的请求并原样返回错误
pub(crate) fn rejected(action: &str, err: ApiError) -> ApiError {
    warn!(action, kind = ?err.kind(), error = %err, "请求被拒绝");
    err
}

/// 款式事件: 授权 → 快照 → 状态机校验 → 后端确认
///
/// 生产单创建不走此入口 (需要生产单载荷)
pub(crate) async fn confirm_style_event(
    backend: &dyn StyleBackend,
    ctx: &RequestContext,
    style_id: &str,
    event: StyleEvent,
) -> ApiResult<Style> {
    let action = event.as_str();
    authorize(ctx, action, event.required_capabilities())?;
    let style = backend.get_style(ctx, style_id).await?;
    StyleWorkflow::next_status(style.status, event).map_err(|e| rejected(action, e.into()))?;
    if event == StyleEvent::CreateWorkOrder {
        return Err(rejected(
            action,
            ApiError::validation("event", "下达生产单请使用计划接口"),
        ));
    }

    let confirmed = backend.transition_style(ctx, style_id, event).await?;
    info!(
        style_id,
        event = action,
        from = %style.status,
        to = %confirmed.status,
        "款式状态已确认"
    );
    Ok(confirmed)
}
