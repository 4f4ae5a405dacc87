// ==========================================
// 成衣厂核价与生产流程系统 - 款式领域模型
// ==========================================
// 聚合根: Style
// 子实体: BomLine / RoutingStep / CostEstimation (不能脱离款式存在)
// 红线: BOM/工序只在 DRAFT 状态可改 (由 engine::workflow 校验)
// ==========================================

use crate::domain::types::{BomItemType, StyleStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// BomLine - BOM 行
// ==========================================
// 对齐: bom_line 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    pub id: String,          // 行ID
    pub material_id: String, // 物料ID (引用物料目录)
    pub quantity: f64,       // 单件用量 (> 0)
    pub waste_rate: f64,     // 损耗率 % (>= 0)

    #[serde(rename = "type")]
    pub item_type: Option<BomItemType>, // 物料类别
    pub variant: Option<BomVariant>,    // 尺码/颜色变体
    pub seq_no: i32,                    // 排序号
}

/// BOM 变体 (尺码/颜色)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BomVariant {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl BomLine {
    /// 实际耗用量 = quantity * (1 + waste_rate / 100)
    pub fn effective_quantity(&self) -> f64 {
        self.quantity * (1.0 + self.waste_rate / 100.0)
    }
}

// ==========================================
// RoutingStep - 工序
// ==========================================
// 对齐: routing_step 表
// 顺序影响生产报表,不影响成本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingStep {
    pub id: String,                  // 工序ID
    pub operation: String,           // 工序名称
    pub minutes: f64,                // 标准工时(分钟, > 0)
    pub labor_rate: f64,             // 工价(每小时, > 0)
    pub description: Option<String>, // 说明
    pub seq_no: i32,                 // 顺序号
}

impl RoutingStep {
    /// 按指定工价计算工序成本 = minutes * rate / 60
    pub fn cost_at(&self, labor_rate: f64) -> f64 {
        self.minutes * labor_rate / 60.0
    }
}

// ==========================================
// CostEstimation - 财务估价
// ==========================================
// 对齐: cost_estimation 表
// 覆盖值(unit_cost_overrides / labor_rate_overrides)只作用于估价,
// 不修改技术部的 BOM/工序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimation {
    pub estimated_material_cost: f64, // 估算物料成本
    pub estimated_labor_cost: f64,    // 估算人工成本
    pub profit_margin: f64,           // 利润率 %
    pub final_price: f64,             // 最终报价
    #[serde(default)]
    pub direct_final_price: Option<f64>, // 财务直接报价 (为空时按利润率计算)
    pub notes: Option<String>,           // 备注

    #[serde(default)]
    pub unit_cost_overrides: HashMap<String, f64>, // BOM行ID → 调整后单价
    #[serde(default)]
    pub labor_rate_overrides: HashMap<String, f64>, // 工序ID → 调整后工价

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// Style - 款式 (聚合根)
// ==========================================
// 对齐: style 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ===== 主键 =====
    pub id: String,
    pub code: String, // 款号 (全局唯一)

    // ===== 基础信息 =====
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<i64>,      // 目标数量
    pub initial_price: Option<f64>, // 初始参考价
    pub season: Option<String>,
    pub buyer: Option<String>,

    // ===== 状态与价格 =====
    pub status: StyleStatus,
    pub proposed_price: f64, // 技术部建议价 (由核价引擎计算后存储)

    // ===== 子实体 =====
    pub bom: Vec<BomLine>,
    pub routing: Vec<RoutingStep>,
    pub cost_estimation: Option<CostEstimation>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Style {
    /// 按ID查找 BOM 行
    pub fn find_bom_line(&self, line_id: &str) -> Option<&BomLine> {
        self.bom.iter().find(|line| line.id == line_id)
    }

    /// 按ID查找工序
    pub fn find_routing_step(&self, step_id: &str) -> Option<&RoutingStep> {
        self.routing.iter().find(|step| step.id == step_id)
    }

    /// 工序ID列表 (当前顺序)
    pub fn routing_step_ids(&self) -> Vec<String> {
        self.routing.iter().map(|step| step.id.clone()).collect()
    }
}
