// ==========================================
// 成衣厂核价与生产流程系统 - SQLite 后端实现
// ==========================================
// 职责: StyleBackend 的本地参考实现
// 红线: 每个请求重新校验 令牌 → 能力 → 状态 → 载荷
// 红线: BOM/工序变更后立即重算建议价
// 红线: 每次写入都记录 action_log
// ==========================================

use crate::backend::context::RequestContext;
use crate::backend::contract::{
    AddBomLineRequest, AddRoutingStepRequest, AdjustStockRequest, CreateMaterialRequest,
    CreateStyleRequest, CreateWorkOrderRequest, ExportRequest, RecordOutputRequest,
    ReorderRoutingRequest, SaveCostEstimationRequest, UpdateBomLineRequest,
    UpdateRoutingStepRequest, UpdateStyleRequest,
};
use crate::backend::export;
use crate::backend::gateway::{BackendError, BackendResult, StyleBackend};
use crate::config::CostingConfigReader;
use crate::domain::action_log::{entity_types, ActionLog};
use crate::domain::material::Material;
use crate::domain::menu::Capability;
use crate::domain::style::{BomLine, CostEstimation, RoutingStep, Style};
use crate::domain::types::{StyleStatus, WorkOrderStatus};
use crate::domain::work_order::WorkOrder;
use crate::engine::costing::{CostOverrides, CostingEngine};
use crate::engine::workflow::{
    StyleEvent, StyleWorkflow, TransitionError, WorkOrderEvent, WorkOrderWorkflow,
};
use crate::repository::{
    ActionLogRepository, MaterialRepository, RepositoryError, StyleRepository,
    WorkOrderRepository,
};
use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

// ==========================================
// SqliteStyleBackend
// ==========================================
pub struct SqliteStyleBackend {
    style_repo: StyleRepository,
    material_repo: MaterialRepository,
    work_order_repo: WorkOrderRepository,
    action_log_repo: ActionLogRepository,
    config: Arc<dyn CostingConfigReader>,
}

impl SqliteStyleBackend {
    /// 创建后端实例
    ///
    /// # 参数
    /// - conn: 共享数据库连接 (schema 已初始化)
    /// - config: 核价参数来源 (加价率每次重算时读取)
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn CostingConfigReader>) -> Self {
        Self {
            style_repo: StyleRepository::new(conn.clone()),
            material_repo: MaterialRepository::new(conn.clone()),
            work_order_repo: WorkOrderRepository::new(conn.clone()),
            action_log_repo: ActionLogRepository::new(conn),
            config,
        }
    }

    // ==========================================
    // 认证与授权
    // ==========================================

    fn authenticate(&self, ctx: &RequestContext) -> BackendResult<()> {
        match ctx.access_token() {
            Some(_) => Ok(()),
            None => {
                warn!(actor = %ctx.actor, "缺少访问令牌, 拒绝请求");
                Err(BackendError::Unauthenticated)
            }
        }
    }

    fn authorize(
        &self,
        ctx: &RequestContext,
        action: &str,
        capabilities: &[Capability],
    ) -> BackendResult<()> {
        self.authenticate(ctx)?;
        ctx.require_any(action, capabilities).map_err(|e| {
            warn!(actor = %ctx.actor, role = %ctx.role, action, "权限不足");
            BackendError::from(e)
        })
    }

    // ==========================================
    // 读取辅助
    // ==========================================

    fn load_style(&self, style_id: &str) -> BackendResult<Style> {
        self.style_repo
            .find_by_id(style_id)?
            .ok_or_else(|| BackendError::not_found(entity_types::STYLE, style_id))
    }

    fn load_work_order(&self, work_order_id: &str) -> BackendResult<WorkOrder> {
        self.work_order_repo
            .find_by_id(work_order_id)?
            .ok_or_else(|| BackendError::not_found(entity_types::WORK_ORDER, work_order_id))
    }

    fn load_material(&self, material_id: &str) -> BackendResult<Material> {
        self.material_repo
            .find_by_id(material_id)?
            .ok_or_else(|| BackendError::not_found(entity_types::MATERIAL, material_id))
    }

    async fn costing_engine(&self) -> BackendResult<CostingEngine> {
        let markup = self
            .config
            .get_proposed_markup_pct()
            .await
            .map_err(|e| BackendError::Storage(format!("读取加价率失败: {}", e)))?;
        Ok(CostingEngine::with_markup_pct(markup))
    }

    /// 建议价重算器 (加价率与物料目录在写入前读取)
    ///
    /// 由仓储在行编辑事务内以最新 BOM/工序调用
    async fn repricer(&self) -> BackendResult<impl Fn(&[BomLine], &[RoutingStep]) -> f64> {
        let engine = self.costing_engine().await?;
        let materials = self.material_repo.list_all()?;
        Ok(move |bom: &[BomLine], routing: &[RoutingStep]| {
            engine.proposed_price(bom, routing, &materials)
        })
    }

    /// 行编辑后重新加载款式
    fn reload_repriced(&self, style_id: &str, old_price: f64) -> BackendResult<Style> {
        let style = self.load_style(style_id)?;
        if (style.proposed_price - old_price).abs() > f64::EPSILON {
            info!(
                style_id,
                old_price,
                new_price = style.proposed_price,
                "建议价已重算"
            );
        }
        Ok(style)
    }

    fn record(&self, log: ActionLog) -> BackendResult<()> {
        self.action_log_repo.insert(&log)?;
        Ok(())
    }

    // ==========================================
    // 并发冲突映射
    // ==========================================

    /// 款式 compare-and-set 未命中时,按最新状态构造非法流转错误
    fn style_conflict(&self, style_id: &str, action: &str, err: RepositoryError) -> BackendError {
        match err {
            RepositoryError::StatusConflict { .. } => match self.style_repo.find_by_id(style_id) {
                Ok(Some(current)) => {
                    warn!(style_id, action, current = %current.status, "款式状态已被并发修改");
                    TransitionError::for_style(current.status, action).into()
                }
                Ok(None) => BackendError::not_found(entity_types::STYLE, style_id),
                Err(e) => e.into(),
            },
            other => other.into(),
        }
    }

    fn work_order_conflict(
        &self,
        work_order_id: &str,
        action: &str,
        err: RepositoryError,
    ) -> BackendError {
        match err {
            RepositoryError::StatusConflict { .. } => {
                match self.work_order_repo.find_by_id(work_order_id) {
                    Ok(Some(current)) => {
                        warn!(
                            work_order_id,
                            action,
                            current = %current.status,
                            "生产单状态已被并发修改"
                        );
                        TransitionError::for_work_order(current.status, action).into()
                    }
                    Ok(None) => BackendError::not_found(entity_types::WORK_ORDER, work_order_id),
                    Err(e) => e.into(),
                }
            }
            other => other.into(),
        }
    }

    /// 草稿款式行编辑前置: 授权 → 加载 → 状态校验
    fn load_editable_style(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        action: &str,
    ) -> BackendResult<Style> {
        self.authorize(ctx, action, &[Capability::EditStyle])?;
        let style = self.load_style(style_id)?;
        StyleWorkflow::ensure_lines_editable(style.status)?;
        Ok(style)
    }

    /// 覆盖值的键必须指向款式现有的 BOM 行/工序
    fn check_override_keys(
        style: &Style,
        unit_costs: &HashMap<String, f64>,
        labor_rates: &HashMap<String, f64>,
    ) -> BackendResult<()> {
        if let Some(key) = unit_costs.keys().find(|k| style.find_bom_line(k).is_none()) {
            return Err(BackendError::Validation {
                field: format!("unitCostOverrides.{}", key),
                message: "BOM 行不存在".to_string(),
            });
        }
        if let Some(key) = labor_rates
            .keys()
            .find(|k| style.find_routing_step(k).is_none())
        {
            return Err(BackendError::Validation {
                field: format!("laborRateOverrides.{}", key),
                message: "工序不存在".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StyleBackend for SqliteStyleBackend {
    // ==========================================
    // 款式
    // ==========================================

    #[instrument(skip(self, ctx, req), fields(actor = %ctx.actor, code = %req.code))]
    async fn create_style(
        &self,
        ctx: &RequestContext,
        req: CreateStyleRequest,
    ) -> BackendResult<Style> {
        self.authorize(ctx, "createStyle", &[Capability::EditStyle])?;
        let req = req.normalized();
        req.validate()?;
        if self.style_repo.exists_code(&req.code)? {
            return Err(BackendError::Validation {
                field: "code".to_string(),
                message: format!("款号已存在: {}", req.code),
            });
        }

        let now = chrono::Local::now().naive_local();
        let style = Style {
            id: uuid::Uuid::new_v4().to_string(),
            code: req.code,
            name: req.name.trim().to_string(),
            description: req.description,
            quantity: req.quantity,
            initial_price: req.initial_price,
            season: req.season,
            buyer: req.buyer,
            status: StyleStatus::Draft,
            proposed_price: 0.0,
            bom: Vec::new(),
            routing: Vec::new(),
            cost_estimation: None,
            created_at: now,
            updated_at: now,
        };
        self.style_repo.insert(&style)?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            &style.id,
            "createStyle",
            &ctx.actor,
            Some(json!({ "code": style.code, "name": style.name })),
        ))?;

        info!(style_id = %style.id, "款式已创建");
        self.load_style(&style.id)
    }

    async fn get_style(&self, ctx: &RequestContext, style_id: &str) -> BackendResult<Style> {
        self.authenticate(ctx)?;
        self.load_style(style_id)
    }

    async fn list_styles(
        &self,
        ctx: &RequestContext,
        status: Option<StyleStatus>,
    ) -> BackendResult<Vec<Style>> {
        self.authenticate(ctx)?;
        Ok(self.style_repo.list(status)?)
    }

    async fn update_style(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: UpdateStyleRequest,
    ) -> BackendResult<Style> {
        self.authorize(ctx, "editStyle", &[Capability::EditStyle])?;
        let mut style = self.load_style(style_id)?;
        StyleWorkflow::ensure_info_editable(style.status)?;
        req.validate()?;

        if let Some(name) = &req.name {
            style.name = name.trim().to_string();
        }
        if req.description.is_some() {
            style.description = req.description.clone();
        }
        if req.quantity.is_some() {
            style.quantity = req.quantity;
        }
        if req.initial_price.is_some() {
            style.initial_price = req.initial_price;
        }
        if req.season.is_some() {
            style.season = req.season.clone();
        }
        if req.buyer.is_some() {
            style.buyer = req.buyer.clone();
        }

        self.style_repo
            .update_info(&style, style.status)
            .map_err(|e| self.style_conflict(style_id, "editStyle", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "editStyle",
            &ctx.actor,
            Some(serde_json::to_value(&req).map_err(RepositoryError::from)?),
        ))?;
        self.load_style(style_id)
    }

    async fn delete_style(&self, ctx: &RequestContext, style_id: &str) -> BackendResult<()> {
        self.authorize(ctx, "deleteStyle", &[Capability::EditStyle])?;
        let style = self.load_style(style_id)?;
        StyleWorkflow::ensure_deletable(style.status)?;

        self.style_repo
            .delete(style_id, style.status)
            .map_err(|e| self.style_conflict(style_id, "delete", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "deleteStyle",
            &ctx.actor,
            Some(json!({ "code": style.code })),
        ))?;

        info!(style_id, code = %style.code, "款式已删除");
        Ok(())
    }

    // ==========================================
    // BOM
    // ==========================================

    async fn add_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: AddBomLineRequest,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "addBomLine")?;
        req.validate()?;
        if self.material_repo.find_by_id(&req.material_id)?.is_none() {
            return Err(BackendError::Validation {
                field: "materialId".to_string(),
                message: format!("物料不存在: {}", req.material_id),
            });
        }

        let line = BomLine {
            id: uuid::Uuid::new_v4().to_string(),
            material_id: req.material_id,
            quantity: req.quantity,
            waste_rate: req.waste_rate,
            item_type: req.item_type,
            variant: req.variant,
            seq_no: 0,
        };
        let reprice = self.repricer().await?;
        let saved = self
            .style_repo
            .insert_bom_line(style_id, style.status, &line, reprice)
            .map_err(|e| self.style_conflict(style_id, "addBomLine", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "addBomLine",
            &ctx.actor,
            Some(json!({
                "lineId": saved.id,
                "materialId": saved.material_id,
                "quantity": saved.quantity,
                "wasteRate": saved.waste_rate,
            })),
        ))?;

        self.reload_repriced(style_id, style.proposed_price)
    }

    async fn update_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        line_id: &str,
        req: UpdateBomLineRequest,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "updateBomLine")?;
        req.validate()?;
        let mut line = style
            .find_bom_line(line_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("BomLine", line_id))?;

        if let Some(quantity) = req.quantity {
            line.quantity = quantity;
        }
        if let Some(waste_rate) = req.waste_rate {
            line.waste_rate = waste_rate;
        }
        if req.item_type.is_some() {
            line.item_type = req.item_type;
        }
        if req.variant.is_some() {
            line.variant = req.variant.clone();
        }

        let reprice = self.repricer().await?;
        self.style_repo
            .update_bom_line(style_id, style.status, &line, reprice)
            .map_err(|e| self.style_conflict(style_id, "updateBomLine", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "updateBomLine",
            &ctx.actor,
            Some(json!({
                "lineId": line_id,
                "quantity": line.quantity,
                "wasteRate": line.waste_rate,
            })),
        ))?;

        self.reload_repriced(style_id, style.proposed_price)
    }

    async fn delete_bom_line(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        line_id: &str,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "deleteBomLine")?;
        let reprice = self.repricer().await?;
        self.style_repo
            .delete_bom_line(style_id, style.status, line_id, reprice)
            .map_err(|e| self.style_conflict(style_id, "deleteBomLine", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "deleteBomLine",
            &ctx.actor,
            Some(json!({ "lineId": line_id })),
        ))?;

        self.reload_repriced(style_id, style.proposed_price)
    }

    // ==========================================
    // 工序
    // ==========================================

    async fn add_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: AddRoutingStepRequest,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "addRoutingStep")?;
        req.validate()?;

        let step = RoutingStep {
            id: uuid::Uuid::new_v4().to_string(),
            operation: req.operation.trim().to_string(),
            minutes: req.minutes,
            labor_rate: req.labor_rate,
            description: req.description,
            seq_no: 0,
        };
        let reprice = self.repricer().await?;
        let saved = self
            .style_repo
            .insert_routing_step(style_id, style.status, &step, reprice)
            .map_err(|e| self.style_conflict(style_id, "addRoutingStep", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "addRoutingStep",
            &ctx.actor,
            Some(json!({
                "stepId": saved.id,
                "operation": saved.operation,
                "minutes": saved.minutes,
                "laborRate": saved.labor_rate,
            })),
        ))?;

        self.reload_repriced(style_id, style.proposed_price)
    }

    async fn update_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        step_id: &str,
        req: UpdateRoutingStepRequest,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "updateRoutingStep")?;
        req.validate()?;
        let mut step = style
            .find_routing_step(step_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("RoutingStep", step_id))?;

        if let Some(operation) = &req.operation {
            step.operation = operation.trim().to_string();
        }
        if let Some(minutes) = req.minutes {
            step.minutes = minutes;
        }
        if let Some(labor_rate) = req.labor_rate {
            step.labor_rate = labor_rate;
        }
        if req.description.is_some() {
            step.description = req.description.clone();
        }

        let reprice = self.repricer().await?;
        self.style_repo
            .update_routing_step(style_id, style.status, &step, reprice)
            .map_err(|e| self.style_conflict(style_id, "updateRoutingStep", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "updateRoutingStep",
            &ctx.actor,
            Some(json!({
                "stepId": step_id,
                "minutes": step.minutes,
                "laborRate": step.labor_rate,
            })),
        ))?;

        self.reload_repriced(style_id, style.proposed_price)
    }

    async fn delete_routing_step(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        step_id: &str,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "deleteRoutingStep")?;
        let reprice = self.repricer().await?;
        self.style_repo
            .delete_routing_step(style_id, style.status, step_id, reprice)
            .map_err(|e| self.style_conflict(style_id, "deleteRoutingStep", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "deleteRoutingStep",
            &ctx.actor,
            Some(json!({ "stepId": step_id })),
        ))?;

        self.reload_repriced(style_id, style.proposed_price)
    }

    async fn reorder_routing(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: ReorderRoutingRequest,
    ) -> BackendResult<Style> {
        let style = self.load_editable_style(ctx, style_id, "reorderRouting")?;
        req.validate_against(&style.routing_step_ids())?;

        self.style_repo
            .reorder_routing(style_id, style.status, &req.step_ids)
            .map_err(|e| self.style_conflict(style_id, "reorderRouting", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "reorderRouting",
            &ctx.actor,
            Some(json!({ "stepIds": req.step_ids })),
        ))?;
        self.load_style(style_id)
    }

    // ==========================================
    // 款式状态流转
    // ==========================================

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor, role = %ctx.role))]
    async fn transition_style(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        event: StyleEvent,
    ) -> BackendResult<Style> {
        self.authorize(ctx, event.as_str(), event.required_capabilities())?;
        let style = self.load_style(style_id)?;
        let next = StyleWorkflow::next_status(style.status, event)?;

        match event {
            StyleEvent::CreateWorkOrder => {
                return Err(BackendError::Validation {
                    field: "event".to_string(),
                    message: "下达生产单需提供生产单信息".to_string(),
                });
            }
            StyleEvent::EstimateCost => {
                let priced = style
                    .cost_estimation
                    .as_ref()
                    .map(|e| e.final_price > 0.0)
                    .unwrap_or(false);
                if !priced {
                    return Err(BackendError::Validation {
                        field: "finalPrice".to_string(),
                        message: "提交估价前须保存有效报价".to_string(),
                    });
                }
            }
            _ => {}
        }

        self.style_repo
            .update_status(style_id, style.status, next)
            .map_err(|e| self.style_conflict(style_id, event.as_str(), e))?;
        self.record(
            ActionLog::new(entity_types::STYLE, style_id, event.as_str(), &ctx.actor, None)
                .with_transition(style.status.to_db_str(), next.to_db_str()),
        )?;

        info!(style_id, from = %style.status, to = %next, "款式状态流转");
        self.load_style(style_id)
    }

    // ==========================================
    // 财务估价
    // ==========================================

    #[instrument(skip(self, ctx, req), fields(actor = %ctx.actor))]
    async fn save_cost_estimation(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: SaveCostEstimationRequest,
    ) -> BackendResult<Style> {
        self.authorize(ctx, "saveCostEstimation", &[Capability::EstimateCost])?;
        let style = self.load_style(style_id)?;
        StyleWorkflow::ensure_estimation_editable(style.status)?;
        req.validate()?;

        let existing = style.cost_estimation.as_ref();
        let overrides_changed =
            req.unit_cost_overrides.is_some() || req.labor_rate_overrides.is_some();
        let overrides = CostOverrides {
            unit_costs: req
                .unit_cost_overrides
                .clone()
                .or_else(|| existing.map(|e| e.unit_cost_overrides.clone()))
                .unwrap_or_default(),
            labor_rates: req
                .labor_rate_overrides
                .clone()
                .or_else(|| existing.map(|e| e.labor_rate_overrides.clone()))
                .unwrap_or_default(),
        };
        Self::check_override_keys(&style, &overrides.unit_costs, &overrides.labor_rates)?;

        let engine = self.costing_engine().await?;
        let default_margin = self
            .config
            .get_default_profit_margin_pct()
            .await
            .map_err(|e| BackendError::Storage(format!("读取默认利润率失败: {}", e)))?;
        let materials = self.material_repo.list_all()?;

        // 未提供的成本沿用已存估价; 首次保存或调整覆盖值时按 BOM/工序重算
        let stored_costs = existing
            .filter(|_| !overrides_changed)
            .map(|e| (e.estimated_material_cost, e.estimated_labor_cost));
        let material_cost = req
            .estimated_material_cost
            .or(stored_costs.map(|(material, _)| material))
            .unwrap_or_else(|| engine.material_cost_with(&style.bom, &materials, &overrides));
        let labor_cost = req
            .estimated_labor_cost
            .or(stored_costs.map(|(_, labor)| labor))
            .unwrap_or_else(|| engine.labor_cost_with(&style.routing, &overrides));
        let profit_margin = req
            .profit_margin
            .or_else(|| existing.map(|e| e.profit_margin))
            .unwrap_or(default_margin);

        // 直接报价: 正数采用, 0 清除, 未提供沿用
        let direct_final_price = match req.final_price {
            Some(price) if price > 0.0 => Some(price),
            Some(_) => None,
            None => existing.and_then(|e| e.direct_final_price),
        };
        let final_price =
            engine.final_price(material_cost, labor_cost, profit_margin, direct_final_price);

        let now = chrono::Local::now().naive_local();
        let estimation = CostEstimation {
            estimated_material_cost: material_cost,
            estimated_labor_cost: labor_cost,
            profit_margin,
            final_price,
            direct_final_price,
            notes: req.notes.clone().or_else(|| existing.and_then(|e| e.notes.clone())),
            unit_cost_overrides: overrides.unit_costs,
            labor_rate_overrides: overrides.labor_rates,
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        };
        self.style_repo
            .upsert_estimation(style_id, style.status, &estimation)
            .map_err(|e| self.style_conflict(style_id, "saveCostEstimation", e))?;
        self.record(ActionLog::new(
            entity_types::STYLE,
            style_id,
            "saveCostEstimation",
            &ctx.actor,
            Some(json!({
                "materialCost": material_cost,
                "laborCost": labor_cost,
                "profitMargin": profit_margin,
                "finalPrice": final_price,
            })),
        ))?;

        info!(style_id, final_price, "估价已保存");
        self.load_style(style_id)
    }

    // ==========================================
    // 生产单
    // ==========================================

    #[instrument(skip(self, ctx, req), fields(actor = %ctx.actor))]
    async fn create_work_order(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: CreateWorkOrderRequest,
    ) -> BackendResult<WorkOrder> {
        let event = StyleEvent::CreateWorkOrder;
        self.authorize(ctx, event.as_str(), event.required_capabilities())?;
        let style = self.load_style(style_id)?;
        let next = StyleWorkflow::next_status(style.status, event)?;
        req.validate()?;

        let now = chrono::Local::now().naive_local();
        let work_order = WorkOrder {
            id: WorkOrder::generate_id(),
            style_id: style_id.to_string(),
            quantity: req.quantity,
            line_no: req.line_no.trim().to_string(),
            start_date: req.start_date,
            end_date: req.end_date,
            assigned_team: req.assigned_team,
            status: WorkOrderStatus::ReadyForPlanning,
            actual_output: 0,
            defect_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.work_order_repo
            .insert_with_style_status(&work_order, style.status, next)
            .map_err(|e| self.style_conflict(style_id, event.as_str(), e))?;

        self.record(
            ActionLog::new(
                entity_types::STYLE,
                style_id,
                event.as_str(),
                &ctx.actor,
                Some(json!({ "workOrderId": work_order.id })),
            )
            .with_transition(style.status.to_db_str(), next.to_db_str()),
        )?;
        self.record(ActionLog::new(
            entity_types::WORK_ORDER,
            &work_order.id,
            "createWorkOrder",
            &ctx.actor,
            Some(json!({
                "styleId": style_id,
                "quantity": work_order.quantity,
                "lineNo": work_order.line_no,
            })),
        ))?;

        info!(
            work_order_id = %work_order.id,
            style_id,
            quantity = work_order.quantity,
            "生产单已下达"
        );
        self.load_work_order(&work_order.id)
    }

    async fn get_work_order(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
    ) -> BackendResult<WorkOrder> {
        self.authenticate(ctx)?;
        self.load_work_order(work_order_id)
    }

    async fn list_work_orders(
        &self,
        ctx: &RequestContext,
        style_id: Option<&str>,
    ) -> BackendResult<Vec<WorkOrder>> {
        self.authenticate(ctx)?;
        match style_id {
            Some(id) => Ok(self.work_order_repo.list_by_style(id)?),
            None => Ok(self.work_order_repo.list(None)?),
        }
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor, role = %ctx.role))]
    async fn transition_work_order(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
        event: WorkOrderEvent,
    ) -> BackendResult<WorkOrder> {
        self.authorize(ctx, event.as_str(), event.required_capabilities())?;
        let work_order = self.load_work_order(work_order_id)?;
        let next = WorkOrderWorkflow::next_status(work_order.status, event)?;

        if matches!(
            event,
            WorkOrderEvent::RecordOutput | WorkOrderEvent::RecordDefects
        ) {
            return Err(BackendError::Validation {
                field: "event".to_string(),
                message: "报工需提供产量/次品数量".to_string(),
            });
        }

        let updated = self
            .work_order_repo
            .update_status(work_order_id, work_order.status, next)
            .map_err(|e| self.work_order_conflict(work_order_id, event.as_str(), e))?;
        self.record(
            ActionLog::new(
                entity_types::WORK_ORDER,
                work_order_id,
                event.as_str(),
                &ctx.actor,
                None,
            )
            .with_transition(work_order.status.to_db_str(), next.to_db_str()),
        )?;

        info!(work_order_id, from = %work_order.status, to = %next, "生产单状态流转");
        Ok(updated)
    }

    async fn record_output(
        &self,
        ctx: &RequestContext,
        work_order_id: &str,
        req: RecordOutputRequest,
    ) -> BackendResult<WorkOrder> {
        let event = if req.output_delta.unwrap_or(0) > 0 {
            WorkOrderEvent::RecordOutput
        } else {
            WorkOrderEvent::RecordDefects
        };
        self.authorize(ctx, event.as_str(), event.required_capabilities())?;
        let work_order = self.load_work_order(work_order_id)?;
        WorkOrderWorkflow::next_status(work_order.status, event)?;
        req.validate()?;

        let output_delta = req.output_delta.unwrap_or(0);
        let defect_delta = req.defect_delta.unwrap_or(0);
        let updated = self
            .work_order_repo
            .add_counters(work_order_id, work_order.status, output_delta, defect_delta)
            .map_err(|e| self.work_order_conflict(work_order_id, event.as_str(), e))?;
        self.record(ActionLog::new(
            entity_types::WORK_ORDER,
            work_order_id,
            event.as_str(),
            &ctx.actor,
            Some(json!({ "outputDelta": output_delta, "defectDelta": defect_delta })),
        ))?;

        if updated.actual_output > updated.quantity {
            warn!(
                work_order_id,
                actual_output = updated.actual_output,
                quantity = updated.quantity,
                "实际产量超过计划数量"
            );
        }
        Ok(updated)
    }

    // ==========================================
    // 导出
    // ==========================================

    #[instrument(skip(self, ctx, req), fields(actor = %ctx.actor))]
    async fn export_styles(
        &self,
        ctx: &RequestContext,
        req: ExportRequest,
    ) -> BackendResult<Vec<u8>> {
        self.authorize(ctx, "exportStyles", &[Capability::ExportData])?;
        req.validate()?;

        let engine = self.costing_engine().await?;
        let styles = self.style_repo.list(None)?;
        let materials = self.material_repo.list_all()?;
        let selected = export::select_styles(&styles, &req);
        let bytes = export::write_csv(&selected, &materials, &req, &engine)?;

        info!(styles = selected.len(), bytes = bytes.len(), "款式资料已导出");
        Ok(bytes)
    }

    // ==========================================
    // 物料
    // ==========================================

    async fn list_materials(&self, ctx: &RequestContext) -> BackendResult<Vec<Material>> {
        self.authenticate(ctx)?;
        Ok(self.material_repo.list_all()?)
    }

    async fn get_material(
        &self,
        ctx: &RequestContext,
        material_id: &str,
    ) -> BackendResult<Material> {
        self.authenticate(ctx)?;
        self.load_material(material_id)
    }

    async fn create_material(
        &self,
        ctx: &RequestContext,
        req: CreateMaterialRequest,
    ) -> BackendResult<Material> {
        self.authorize(ctx, "createMaterial", &[Capability::ManageMaterials])?;
        req.validate()?;
        let code = req.code.trim().to_string();
        if self.material_repo.exists_code(&code)? {
            return Err(BackendError::Validation {
                field: "code".to_string(),
                message: format!("物料编码已存在: {}", code),
            });
        }

        let now = chrono::Local::now().naive_local();
        let material = Material {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name: req.name.trim().to_string(),
            material_type: req.material_type.trim().to_string(),
            unit: req.unit.trim().to_string(),
            cost_per_unit: req.cost_per_unit,
            supplier: req.supplier,
            stock: req.stock,
            min_stock: req.min_stock,
            created_at: now,
            updated_at: now,
        };
        self.material_repo.insert(&material)?;
        self.record(ActionLog::new(
            entity_types::MATERIAL,
            &material.id,
            "createMaterial",
            &ctx.actor,
            Some(json!({ "code": material.code, "stock": material.stock })),
        ))?;

        info!(material_id = %material.id, code = %material.code, "物料已创建");
        self.load_material(&material.id)
    }

    async fn adjust_stock(
        &self,
        ctx: &RequestContext,
        material_id: &str,
        req: AdjustStockRequest,
    ) -> BackendResult<Material> {
        self.authorize(ctx, "adjustStock", &[Capability::ManageMaterials])?;
        req.validate()?;

        let updated = self.material_repo.adjust_stock(material_id, req.delta)?;
        self.record(ActionLog::new(
            entity_types::MATERIAL,
            material_id,
            "adjustStock",
            &ctx.actor,
            Some(json!({ "delta": req.delta, "reason": req.reason, "stock": updated.stock })),
        ))?;

        info!(material_id, delta = req.delta, stock = updated.stock, "库存已调整");
        Ok(updated)
    }

    async fn list_low_stock(
        &self,
        ctx: &RequestContext,
        threshold: f64,
    ) -> BackendResult<Vec<Material>> {
        self.authenticate(ctx)?;
        Ok(self.material_repo.list_low_stock(threshold)?)
    }

    // ==========================================
    // 审计
    // ==========================================

    async fn list_actions(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        entity_id: &str,
    ) -> BackendResult<Vec<ActionLog>> {
        self.authenticate(ctx)?;
        Ok(self.action_log_repo.find_by_entity(entity_type, entity_id)?)
    }
}
