// ==========================================
// 成衣厂核价与生产流程系统 - 后端请求契约
// ==========================================
// 序列化格式: camelCase (与前端/后端 JSON 一致)
// 职责: 请求载荷定义 + 载荷自身的字段校验
// 红线: 校验只看载荷本身; 唯一性/引用存在性由后端检查
// ==========================================

use crate::domain::style::BomVariant;
use crate::domain::types::{BomItemType, StyleStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// FieldViolation - 字段校验失败
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub type ContractResult = Result<(), FieldViolation>;

// ==========================================
// 字段规则
// ==========================================

/// 款号规则: 非空、大写、仅含 A-Z 0-9 和 '-'
pub fn validate_style_code(code: &str) -> ContractResult {
    if code.is_empty() {
        return Err(FieldViolation::new("code", "款号不能为空"));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(FieldViolation::new(
            "code",
            "款号只能包含大写字母、数字和连字符",
        ));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> ContractResult {
    if value.trim().is_empty() {
        Err(FieldViolation::new(field, "不能为空"))
    } else {
        Ok(())
    }
}

/// 有限且 > 0
pub fn require_positive(field: &str, value: f64) -> ContractResult {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FieldViolation::new(field, format!("必须大于 0 (实际 {})", value)))
    }
}

/// 有限且 >= 0
pub fn require_non_negative(field: &str, value: f64) -> ContractResult {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FieldViolation::new(field, format!("不能为负数 (实际 {})", value)))
    }
}

fn validate_override_map(field: &str, overrides: &HashMap<String, f64>) -> ContractResult {
    for (key, value) in overrides {
        require_non_negative(&format!("{}.{}", field, key), *value)?;
    }
    Ok(())
}

// ==========================================
// 款式
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStyleRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub initial_price: Option<f64>,
    pub season: Option<String>,
    pub buyer: Option<String>,
}

impl CreateStyleRequest {
    /// 规范化: 款号去空格并转大写
    pub fn normalized(mut self) -> Self {
        self.code = self.code.trim().to_uppercase();
        self.name = self.name.trim().to_string();
        self
    }

    pub fn validate(&self) -> ContractResult {
        validate_style_code(&self.code)?;
        require_non_empty("name", &self.name)?;
        if let Some(quantity) = self.quantity {
            if quantity <= 0 {
                return Err(FieldViolation::new("quantity", "目标数量必须为正整数"));
            }
        }
        if let Some(price) = self.initial_price {
            require_non_negative("initialPrice", price)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStyleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub initial_price: Option<f64>,
    pub season: Option<String>,
    pub buyer: Option<String>,
}

impl UpdateStyleRequest {
    pub fn validate(&self) -> ContractResult {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(quantity) = self.quantity {
            if quantity <= 0 {
                return Err(FieldViolation::new("quantity", "目标数量必须为正整数"));
            }
        }
        if let Some(price) = self.initial_price {
            require_non_negative("initialPrice", price)?;
        }
        Ok(())
    }
}

// ==========================================
// BOM
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBomLineRequest {
    pub material_id: String,
    pub quantity: f64,
    #[serde(default)]
    pub waste_rate: f64,
    #[serde(rename = "type")]
    pub item_type: Option<BomItemType>,
    pub variant: Option<BomVariant>,
}

impl AddBomLineRequest {
    pub fn validate(&self) -> ContractResult {
        require_non_empty("materialId", &self.material_id)?;
        require_positive("quantity", self.quantity)?;
        require_non_negative("wasteRate", self.waste_rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBomLineRequest {
    pub quantity: Option<f64>,
    pub waste_rate: Option<f64>,
    #[serde(rename = "type")]
    pub item_type: Option<BomItemType>,
    pub variant: Option<BomVariant>,
}

impl UpdateBomLineRequest {
    pub fn validate(&self) -> ContractResult {
        if let Some(quantity) = self.quantity {
            require_positive("quantity", quantity)?;
        }
        if let Some(waste_rate) = self.waste_rate {
            require_non_negative("wasteRate", waste_rate)?;
        }
        Ok(())
    }
}

// ==========================================
// 工序
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRoutingStepRequest {
    pub operation: String,
    pub minutes: f64,
    pub labor_rate: f64,
    pub description: Option<String>,
}

impl AddRoutingStepRequest {
    pub fn validate(&self) -> ContractResult {
        require_non_empty("operation", &self.operation)?;
        require_positive("minutes", self.minutes)?;
        require_positive("laborRate", self.labor_rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoutingStepRequest {
    pub operation: Option<String>,
    pub minutes: Option<f64>,
    pub labor_rate: Option<f64>,
    pub description: Option<String>,
}

impl UpdateRoutingStepRequest {
    pub fn validate(&self) -> ContractResult {
        if let Some(operation) = &self.operation {
            require_non_empty("operation", operation)?;
        }
        if let Some(minutes) = self.minutes {
            require_positive("minutes", minutes)?;
        }
        if let Some(rate) = self.labor_rate {
            require_positive("laborRate", rate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRoutingRequest {
    pub step_ids: Vec<String>,
}

impl ReorderRoutingRequest {
    /// 必须是当前工序ID的一个排列 (无重复、无缺失、无多余)
    pub fn validate_against(&self, current_ids: &[String]) -> ContractResult {
        let mut requested = self.step_ids.clone();
        let mut current = current_ids.to_vec();
        requested.sort();
        current.sort();
        if requested != current {
            return Err(FieldViolation::new(
                "stepIds",
                "工序列表必须与当前工序一一对应",
            ));
        }
        Ok(())
    }
}

// ==========================================
// 财务估价
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCostEstimationRequest {
    pub estimated_material_cost: Option<f64>,
    pub estimated_labor_cost: Option<f64>,
    pub profit_margin: Option<f64>,
    pub final_price: Option<f64>,
    pub notes: Option<String>,
    pub unit_cost_overrides: Option<HashMap<String, f64>>,
    pub labor_rate_overrides: Option<HashMap<String, f64>>,
}

impl SaveCostEstimationRequest {
    pub fn validate(&self) -> ContractResult {
        if let Some(v) = self.estimated_material_cost {
            require_non_negative("estimatedMaterialCost", v)?;
        }
        if let Some(v) = self.estimated_labor_cost {
            require_non_negative("estimatedLaborCost", v)?;
        }
        if let Some(v) = self.profit_margin {
            if !v.is_finite() {
                return Err(FieldViolation::new("profitMargin", "必须是有效数字"));
            }
        }
        if let Some(v) = self.final_price {
            require_non_negative("finalPrice", v)?;
        }
        if let Some(map) = &self.unit_cost_overrides {
            validate_override_map("unitCostOverrides", map)?;
        }
        if let Some(map) = &self.labor_rate_overrides {
            validate_override_map("laborRateOverrides", map)?;
        }
        Ok(())
    }
}

// ==========================================
// 生产单
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    pub quantity: i64,
    pub line_no: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assigned_team: Option<String>,
}

impl CreateWorkOrderRequest {
    pub fn validate(&self) -> ContractResult {
        if self.quantity <= 0 {
            return Err(FieldViolation::new("quantity", "生产数量必须为正整数"));
        }
        require_non_empty("lineNo", &self.line_no)?;
        if self.start_date > self.end_date {
            return Err(FieldViolation::new("endDate", "完工日期不能早于开工日期"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutputRequest {
    pub output_delta: Option<i64>,
    pub defect_delta: Option<i64>,
}

impl RecordOutputRequest {
    pub fn validate(&self) -> ContractResult {
        let output = self.output_delta.unwrap_or(0);
        let defects = self.defect_delta.unwrap_or(0);
        if output < 0 {
            return Err(FieldViolation::new("outputDelta", "产量增量不能为负数"));
        }
        if defects < 0 {
            return Err(FieldViolation::new("defectDelta", "次品增量不能为负数"));
        }
        if output == 0 && defects == 0 {
            return Err(FieldViolation::new("outputDelta", "产量或次品至少填写一项"));
        }
        Ok(())
    }
}

// ==========================================
// 导出
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub export_all: bool,
    #[serde(default)]
    pub status: Vec<StyleStatus>,
    #[serde(default)]
    pub style_ids: Vec<String>,
    #[serde(default, rename = "includeBOM")]
    pub include_bom: bool,
    #[serde(default)]
    pub include_routing: bool,
    #[serde(default)]
    pub include_cost_estimation: bool,
}

impl ExportRequest {
    pub fn validate(&self) -> ContractResult {
        if !self.export_all && self.status.is_empty() && self.style_ids.is_empty() {
            return Err(FieldViolation::new(
                "styleIds",
                "请选择导出范围 (全部/状态/款式)",
            ));
        }
        Ok(())
    }
}

// ==========================================
// 物料
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    pub code: String,
    pub name: String,
    pub material_type: String,
    pub unit: String,
    pub cost_per_unit: f64,
    pub supplier: Option<String>,
    #[serde(default)]
    pub stock: f64,
    pub min_stock: Option<f64>,
}

impl CreateMaterialRequest {
    pub fn validate(&self) -> ContractResult {
        require_non_empty("code", &self.code)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("materialType", &self.material_type)?;
        require_non_empty("unit", &self.unit)?;
        require_non_negative("costPerUnit", self.cost_per_unit)?;
        require_non_negative("stock", self.stock)?;
        if let Some(min) = self.min_stock {
            require_non_negative("minStock", min)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub delta: f64,
    pub reason: Option<String>,
}

impl AdjustStockRequest {
    pub fn validate(&self) -> ContractResult {
        if !self.delta.is_finite() || self.delta == 0.0 {
            return Err(FieldViolation::new("delta", "调整数量必须是非零数字"));
        }
        Ok(())
    }
}
