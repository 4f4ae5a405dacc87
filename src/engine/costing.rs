// ==========================================
// 成衣厂核价与生产流程系统 - 核价引擎
// ==========================================
// 职责: 由 BOM + 工序 + 物料目录计算物料成本、人工成本、建议价、最终价
// 红线: 纯函数,无副作用; 缺失物料按 0 计 (容忍查找,绝不报错)
// 红线: 只在最终价格一步向上取整,中间求和不取整
// 输入合法性 (非有限数/负数) 由调用方在 api::validator 拦截
// ==========================================

use crate::domain::material::Material;
use crate::domain::style::{BomLine, RoutingStep, Style};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

/// 浮点误差吸附阈值
const INTEGER_SNAP_EPSILON: f64 = 1e-9;

// ==========================================
// CostOverrides - 财务调整值
// ==========================================
/// 财务在估价时对单价/工价的覆盖
///
/// 键为 BOM 行ID / 工序ID; 缺少覆盖值的行回落到目录单价/工序工价
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostOverrides {
    #[serde(default)]
    pub unit_costs: HashMap<String, f64>,
    #[serde(default)]
    pub labor_rates: HashMap<String, f64>,
}

impl CostOverrides {
    pub fn is_empty(&self) -> bool {
        self.unit_costs.is_empty() && self.labor_rates.is_empty()
    }
}

// ==========================================
// 明细输出
// ==========================================

/// BOM 行成本明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomLineCost {
    pub line_id: String,
    pub material_id: String,
    pub material_name: Option<String>, // 目录中找不到时为 None
    pub effective_quantity: f64,
    pub unit_cost: f64,
    pub amount: f64,
    pub overridden: bool,
}

/// 工序成本明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingStepCost {
    pub step_id: String,
    pub operation: String,
    pub minutes: f64,
    pub labor_rate: f64,
    pub amount: f64,
    pub overridden: bool,
}

/// 核价明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub lines: Vec<BomLineCost>,
    pub steps: Vec<RoutingStepCost>,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub total_cost: f64,
    pub proposed_price: f64,
}

/// 报价利润分析
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAnalysis {
    pub total_cost: f64,
    pub profit: f64,
    pub margin_pct: f64, // 相对成本的利润率; 成本为 0 时为 0
}

// ==========================================
// CostingEngine - 核价引擎
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct CostingEngine {
    markup_pct: f64, // 建议价加成 %
}

impl Default for CostingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CostingEngine {
    /// 技术部建议价的固定加成 (30%)
    pub const DEFAULT_MARKUP_PCT: f64 = 30.0;

    /// 创建默认核价引擎 (加成 30%)
    pub fn new() -> Self {
        Self {
            markup_pct: Self::DEFAULT_MARKUP_PCT,
        }
    }

    /// 使用配置的加成创建核价引擎
    pub fn with_markup_pct(markup_pct: f64) -> Self {
        Self { markup_pct }
    }

    pub fn markup_pct(&self) -> f64 {
        self.markup_pct
    }

    // ==========================================
    // 物料成本
    // ==========================================

    /// 物料成本 (目录单价)
    ///
    /// Σ quantity * (1 + waste_rate/100) * cost_per_unit; 目录中不存在的物料贡献 0
    pub fn material_cost(&self, bom: &[BomLine], materials: &[Material]) -> f64 {
        self.material_cost_with(bom, materials, &CostOverrides::default())
    }

    /// 物料成本 (优先使用覆盖单价)
    pub fn material_cost_with(
        &self,
        bom: &[BomLine],
        materials: &[Material],
        overrides: &CostOverrides,
    ) -> f64 {
        let catalog = index_catalog(materials);
        bom.iter()
            .map(|line| line_cost(line, &catalog, overrides).amount)
            .sum()
    }

    // ==========================================
    // 人工成本
    // ==========================================

    /// 人工成本 = Σ minutes * labor_rate / 60
    pub fn labor_cost(&self, routing: &[RoutingStep]) -> f64 {
        self.labor_cost_with(routing, &CostOverrides::default())
    }

    /// 人工成本 (优先使用覆盖工价)
    pub fn labor_cost_with(&self, routing: &[RoutingStep], overrides: &CostOverrides) -> f64 {
        routing
            .iter()
            .map(|step| step_cost(step, overrides).amount)
            .sum()
    }

    // ==========================================
    // 价格
    // ==========================================

    /// 技术部建议价 = ceil((物料成本 + 人工成本) * (1 + 加成/100))
    #[instrument(
        skip(self, bom, routing, materials),
        fields(bom = bom.len(), routing = routing.len())
    )]
    pub fn proposed_price(
        &self,
        bom: &[BomLine],
        routing: &[RoutingStep],
        materials: &[Material],
    ) -> f64 {
        let total = self.material_cost(bom, materials) + self.labor_cost(routing);
        ceil_currency(total * (1.0 + self.markup_pct / 100.0))
    }

    /// 最终报价
    ///
    /// # 规则
    /// - 直接报价为正的有限数: 原样采用
    /// - 否则: ceil((物料成本 + 人工成本) * (1 + 利润率/100))
    pub fn final_price(
        &self,
        material_cost: f64,
        labor_cost: f64,
        profit_margin_pct: f64,
        direct_override: Option<f64>,
    ) -> f64 {
        if let Some(price) = direct_override {
            if price.is_finite() && price > 0.0 {
                return price;
            }
        }
        ceil_currency((material_cost + labor_cost) * (1.0 + profit_margin_pct / 100.0))
    }

    /// 核价明细 (估价界面 "分解" 视图)
    #[instrument(skip_all, fields(style = %style.code))]
    pub fn breakdown(
        &self,
        style: &Style,
        materials: &[Material],
        overrides: &CostOverrides,
    ) -> CostBreakdown {
        let catalog = index_catalog(materials);

        let lines: Vec<BomLineCost> = style
            .bom
            .iter()
            .map(|line| line_cost(line, &catalog, overrides))
            .collect();
        let steps: Vec<RoutingStepCost> = style
            .routing
            .iter()
            .map(|step| step_cost(step, overrides))
            .collect();

        let material_cost: f64 = lines.iter().map(|l| l.amount).sum();
        let labor_cost: f64 = steps.iter().map(|s| s.amount).sum();
        let total_cost = material_cost + labor_cost;

        CostBreakdown {
            lines,
            steps,
            material_cost,
            labor_cost,
            total_cost,
            proposed_price: ceil_currency(total_cost * (1.0 + self.markup_pct / 100.0)),
        }
    }

    /// 报价利润分析
    pub fn analyze_price(&self, price: f64, material_cost: f64, labor_cost: f64) -> PriceAnalysis {
        let total_cost = material_cost + labor_cost;
        let profit = price - total_cost;
        let margin_pct = if total_cost > 0.0 {
            profit / total_cost * 100.0
        } else {
            0.0
        };
        PriceAnalysis {
            total_cost,
            profit,
            margin_pct,
        }
    }
}

// ==========================================
// 内部辅助
// ==========================================

fn index_catalog(materials: &[Material]) -> HashMap<&str, &Material> {
    materials.iter().map(|m| (m.id.as_str(), m)).collect()
}

fn line_cost(
    line: &BomLine,
    catalog: &HashMap<&str, &Material>,
    overrides: &CostOverrides,
) -> BomLineCost {
    let material = catalog.get(line.material_id.as_str());
    let override_cost = overrides.unit_costs.get(&line.id).copied();
    let unit_cost = override_cost
        .or_else(|| material.map(|m| m.cost_per_unit))
        .unwrap_or(0.0);
    let effective_quantity = line.effective_quantity();

    BomLineCost {
        line_id: line.id.clone(),
        material_id: line.material_id.clone(),
        material_name: material.map(|m| m.name.clone()),
        effective_quantity,
        unit_cost,
        amount: effective_quantity * unit_cost,
        overridden: override_cost.is_some(),
    }
}

fn step_cost(step: &RoutingStep, overrides: &CostOverrides) -> RoutingStepCost {
    let override_rate = overrides.labor_rates.get(&step.id).copied();
    let labor_rate = override_rate.unwrap_or(step.labor_rate);

    RoutingStepCost {
        step_id: step.id.clone(),
        operation: step.operation.clone(),
        minutes: step.minutes,
        labor_rate,
        amount: step.cost_at(labor_rate),
        overridden: override_rate.is_some(),
    }
}

/// 货币向上取整到整数单位
///
/// 与整数相差不足 1e-9 的值先吸附到该整数,避免二进制浮点误差多进一位
pub fn ceil_currency(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < INTEGER_SNAP_EPSILON {
        nearest
    } else {
        value.ceil()
    }
}
