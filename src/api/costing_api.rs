// ==========================================
// 成衣厂核价与生产流程系统 - 核价 API
// ==========================================
// 职责: 编辑中价格预览、核价明细、利润分析、财务估价与审批
// 红线: 预览不落库; 引擎输入先经 CostingInputValidator
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::CostingInputValidator;
use crate::api::{authorize, confirm_style_event, rejected};
use crate::backend::context::RequestContext;
use crate::backend::contract::SaveCostEstimationRequest;
use crate::backend::gateway::StyleBackend;
use crate::config::CostingConfigReader;
use crate::domain::material::Material;
use crate::domain::menu::Capability;
use crate::domain::style::{BomLine, RoutingStep, Style};
use crate::engine::costing::{CostBreakdown, CostOverrides, CostingEngine, PriceAnalysis};
use crate::engine::workflow::{StyleEvent, StyleWorkflow};

// ==========================================
// PricePreview - 建议价预览
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePreview {
    pub material_cost: f64,
    pub labor_cost: f64,
    pub total_cost: f64,
    pub markup_pct: f64,
    pub proposed_price: f64,
}

// ==========================================
// CostingApi - 核价 API
// ==========================================

/// 核价API
///
/// 职责：
/// 1. 技术部编辑 BOM/工序时的建议价实时预览
/// 2. 财务核价明细与报价利润分析
/// 3. 估价保存/提交、退回、要求调整、批准
pub struct CostingApi {
    backend: Arc<dyn StyleBackend>,
    config: Arc<dyn CostingConfigReader>,
}

impl CostingApi {
    pub fn new(backend: Arc<dyn StyleBackend>, config: Arc<dyn CostingConfigReader>) -> Self {
        Self { backend, config }
    }

    async fn engine(&self) -> ApiResult<CostingEngine> {
        let markup = self
            .config
            .get_proposed_markup_pct()
            .await
            .map_err(|e| ApiError::Backend(format!("读取加价率失败: {}", e)))?;
        Ok(CostingEngine::with_markup_pct(markup))
    }

    async fn materials(&self, ctx: &RequestContext) -> ApiResult<Vec<Material>> {
        Ok(self.backend.list_materials(ctx).await?)
    }

    async fn style(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        Ok(self.backend.get_style(ctx, style_id).await?)
    }

    // ==========================================
    // 预览 (不落库)
    // ==========================================

    /// 建议价预览
    ///
    /// # 参数
    /// - bom / routing: 编辑中的行 (可未保存)
    ///
    /// # 返回
    /// - Ok(PricePreview): 物料/人工成本与建议价
    /// - Err(ApiError::Validation): 行数据非有限或越界
    pub async fn preview_proposed_price(
        &self,
        ctx: &RequestContext,
        bom: &[BomLine],
        routing: &[RoutingStep],
    ) -> ApiResult<PricePreview> {
        CostingInputValidator::validate_bom(bom)?;
        CostingInputValidator::validate_routing(routing)?;

        let (engine, materials) = futures::try_join!(self.engine(), self.materials(ctx))?;
        let material_cost = engine.material_cost(bom, &materials);
        let labor_cost = engine.labor_cost(routing);
        let proposed_price = engine.proposed_price(bom, routing, &materials);

        debug!(material_cost, labor_cost, proposed_price, "建议价预览");
        Ok(PricePreview {
            material_cost,
            labor_cost,
            total_cost: material_cost + labor_cost,
            markup_pct: engine.markup_pct(),
            proposed_price,
        })
    }

    /// 最终报价预览 (估价表单实时计算)
    pub fn preview_final_price(
        &self,
        material_cost: f64,
        labor_cost: f64,
        profit_margin_pct: f64,
        direct_override: Option<f64>,
    ) -> ApiResult<f64> {
        CostingInputValidator::validate_price("estimatedMaterialCost", material_cost)?;
        CostingInputValidator::validate_price("estimatedLaborCost", labor_cost)?;
        CostingInputValidator::validate_margin(profit_margin_pct)?;
        if let Some(price) = direct_override {
            CostingInputValidator::validate_price("finalPrice", price)?;
        }

        let engine = CostingEngine::new();
        Ok(engine.final_price(material_cost, labor_cost, profit_margin_pct, direct_override))
    }

    /// 核价明细 (按行/工序分解)
    pub async fn breakdown(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        overrides: &CostOverrides,
    ) -> ApiResult<CostBreakdown> {
        CostingInputValidator::validate_overrides(overrides)?;
        let (engine, style, materials) = futures::try_join!(
            self.engine(),
            self.style(ctx, style_id),
            self.materials(ctx)
        )?;
        Ok(engine.breakdown(&style, &materials, overrides))
    }

    /// 报价利润分析
    ///
    /// 已有估价时以估价成本为准,否则按当前 BOM/工序计算
    pub async fn analyze_price(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        price: f64,
    ) -> ApiResult<PriceAnalysis> {
        CostingInputValidator::validate_price("price", price)?;
        let (engine, style, materials) = futures::try_join!(
            self.engine(),
            self.style(ctx, style_id),
            self.materials(ctx)
        )?;

        let (material_cost, labor_cost) = match &style.cost_estimation {
            Some(e) => (e.estimated_material_cost, e.estimated_labor_cost),
            None => (
                engine.material_cost(&style.bom, &materials),
                engine.labor_cost(&style.routing),
            ),
        };
        Ok(engine.analyze_price(price, material_cost, labor_cost))
    }

    // ==========================================
    // 财务估价
    // ==========================================

    /// 保存估价 (仅已送核价状态)
    pub async fn save_estimation(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: SaveCostEstimationRequest,
    ) -> ApiResult<Style> {
        let action = "saveCostEstimation";
        authorize(ctx, action, &[Capability::EstimateCost])?;
        let style = self.style(ctx, style_id).await?;
        StyleWorkflow::ensure_estimation_editable(style.status)
            .map_err(|e| rejected(action, e.into()))?;
        req.validate().map_err(|v| rejected(action, v.into()))?;

        let saved = self
            .backend
            .save_cost_estimation(ctx, style_id, req)
            .await?;
        if let Some(estimation) = &saved.cost_estimation {
            info!(style_id, final_price = estimation.final_price, "估价已确认");
        }
        Ok(saved)
    }

    /// 保存并提交估价 (→ COST_ESTIMATED)
    pub async fn submit_estimation(
        &self,
        ctx: &RequestContext,
        style_id: &str,
        req: SaveCostEstimationRequest,
    ) -> ApiResult<Style> {
        self.save_estimation(ctx, style_id, req).await?;
        confirm_style_event(self.backend.as_ref(), ctx, style_id, StyleEvent::EstimateCost).await
    }

    /// 退回技术部 (→ DRAFT)
    pub async fn reject_to_draft(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        confirm_style_event(self.backend.as_ref(), ctx, style_id, StyleEvent::RejectToDraft).await
    }

    /// 要求重新估价 (→ SENT_TO_ACCOUNTING)
    pub async fn request_adjustment(
        &self,
        ctx: &RequestContext,
        style_id: &str,
    ) -> ApiResult<Style> {
        confirm_style_event(
            self.backend.as_ref(),
            ctx,
            style_id,
            StyleEvent::RequestAdjustment,
        )
        .await
    }

    /// 批准价格 (→ COST_APPROVED)
    pub async fn approve_cost(&self, ctx: &RequestContext, style_id: &str) -> ApiResult<Style> {
        confirm_style_event(self.backend.as_ref(), ctx, style_id, StyleEvent::ApproveCost).await
    }
}
