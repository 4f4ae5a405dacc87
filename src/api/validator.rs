// ==========================================
// 成衣厂核价与生产流程系统 - 核价输入校验器
// ==========================================
// 职责: 调用核价引擎前拒绝非有限/负数输入
// 红线: 引擎本身不做输入防御,所有预览入口必须先经过此校验
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::backend::contract::FieldViolation;
use crate::domain::style::{BomLine, RoutingStep};
use crate::engine::costing::CostOverrides;
use tracing::warn;

// ==========================================
// CostingInputValidator - 核价输入校验器
// ==========================================

/// 核价输入校验器
///
/// 逐项收集违规,返回第一条; 违规总数写入日志
pub struct CostingInputValidator;

impl CostingInputValidator {
    /// 校验 BOM 行
    ///
    /// # 规则
    /// - quantity: 有限且 > 0
    /// - waste_rate: 有限且 >= 0
    pub fn validate_bom(bom: &[BomLine]) -> ApiResult<()> {
        let mut violations = Vec::new();
        for (idx, line) in bom.iter().enumerate() {
            if !(line.quantity.is_finite() && line.quantity > 0.0) {
                violations.push(FieldViolation::new(
                    &format!("bom[{}].quantity", idx),
                    format!("用量必须大于 0 (实际 {})", line.quantity),
                ));
            }
            if !(line.waste_rate.is_finite() && line.waste_rate >= 0.0) {
                violations.push(FieldViolation::new(
                    &format!("bom[{}].wasteRate", idx),
                    format!("损耗率不能为负数 (实际 {})", line.waste_rate),
                ));
            }
        }
        first_violation("bom", violations)
    }

    /// 校验工序
    ///
    /// # 规则
    /// - minutes / labor_rate: 有限且 > 0
    pub fn validate_routing(routing: &[RoutingStep]) -> ApiResult<()> {
        let mut violations = Vec::new();
        for (idx, step) in routing.iter().enumerate() {
            if !(step.minutes.is_finite() && step.minutes > 0.0) {
                violations.push(FieldViolation::new(
                    &format!("routing[{}].minutes", idx),
                    format!("工时必须大于 0 (实际 {})", step.minutes),
                ));
            }
            if !(step.labor_rate.is_finite() && step.labor_rate > 0.0) {
                violations.push(FieldViolation::new(
                    &format!("routing[{}].laborRate", idx),
                    format!("工价必须大于 0 (实际 {})", step.labor_rate),
                ));
            }
        }
        first_violation("routing", violations)
    }

    /// 校验覆盖单价/工价 (有限且 >= 0)
    pub fn validate_overrides(overrides: &CostOverrides) -> ApiResult<()> {
        let mut violations = Vec::new();
        let entries = overrides
            .unit_costs
            .iter()
            .map(|(k, v)| ("unitCostOverrides", k, v))
            .chain(
                overrides
                    .labor_rates
                    .iter()
                    .map(|(k, v)| ("laborRateOverrides", k, v)),
            );
        for (field, key, value) in entries {
            if !(value.is_finite() && *value >= 0.0) {
                violations.push(FieldViolation::new(
                    &format!("{}.{}", field, key),
                    format!("覆盖值不能为负数 (实际 {})", value),
                ));
            }
        }
        first_violation("overrides", violations)
    }

    /// 校验利润率 (有限即可, 允许负利润率)
    pub fn validate_margin(margin_pct: f64) -> ApiResult<()> {
        if margin_pct.is_finite() {
            Ok(())
        } else {
            Err(ApiError::validation("profitMargin", "必须是有效数字"))
        }
    }

    /// 校验报价 (有限且 >= 0)
    pub fn validate_price(field: &str, price: f64) -> ApiResult<()> {
        if price.is_finite() && price >= 0.0 {
            Ok(())
        } else {
            Err(ApiError::validation(
                field,
                format!("不能为负数 (实际 {})", price),
            ))
        }
    }
}

fn first_violation(scope: &str, violations: Vec<FieldViolation>) -> ApiResult<()> {
    if violations.len() > 1 {
        warn!(scope, count = violations.len(), "核价输入存在多项违规");
    }
    match violations.into_iter().next() {
        Some(v) => Err(v.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn line(quantity: f64, waste_rate: f64) -> BomLine {
        BomLine {
            id: "B1".to_string(),
            material_id: "M1".to_string(),
            quantity,
            waste_rate,
            item_type: None,
            variant: None,
            seq_no: 1,
        }
    }

    fn step(minutes: f64, labor_rate: f64) -> RoutingStep {
        RoutingStep {
            id: "R1".to_string(),
            operation: "Sewing".to_string(),
            minutes,
            labor_rate,
            description: None,
            seq_no: 1,
        }
    }

    #[test]
    fn test_bom_rules() {
        assert!(CostingInputValidator::validate_bom(&[line(2.0, 0.0), line(1.0, 5.0)]).is_ok());

        let err = CostingInputValidator::validate_bom(&[line(2.0, 0.0), line(0.0, -1.0)])
            .unwrap_err();
        assert_eq!(err, ApiError::validation("bom[1].quantity", "用量必须大于 0 (实际 0)"));

        assert!(CostingInputValidator::validate_bom(&[line(f64::NAN, 0.0)]).is_err());
    }

    #[test]
    fn test_routing_rules() {
        assert!(CostingInputValidator::validate_routing(&[step(12.0, 30000.0)]).is_ok());
        let err = CostingInputValidator::validate_routing(&[step(12.0, f64::INFINITY)])
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { ref field, .. } if field == "routing[0].laborRate"
        ));
    }

    #[test]
    fn test_override_rules() {
        let overrides = CostOverrides {
            unit_costs: HashMap::from([("B1".to_string(), 0.0)]),
            labor_rates: HashMap::from([("R1".to_string(), -5.0)]),
        };
        let err = CostingInputValidator::validate_overrides(&overrides).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { ref field, .. } if field == "laborRateOverrides.R1"
        ));
    }

    #[test]
    fn test_margin_and_price() {
        assert!(CostingInputValidator::validate_margin(-10.0).is_ok());
        assert!(CostingInputValidator::validate_margin(f64::NAN).is_err());
        assert!(CostingInputValidator::validate_price("price", 0.0).is_ok());
        assert!(CostingInputValidator::validate_price("price", -1.0).is_err());
    }
}
