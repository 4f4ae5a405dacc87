// ==========================================
// 成衣厂核价与生产流程系统 - 款式资料导出
// ==========================================
// 职责: 按导出请求筛选款式并生成 CSV
// 格式: 每行一条记录,record_type 区分 STYLE / BOM / ROUTING / COST
// ==========================================

use crate::backend::contract::ExportRequest;
use crate::domain::material::Material;
use crate::domain::style::Style;
use crate::engine::costing::{CostOverrides, CostingEngine};
use serde::Serialize;

/// 导出记录类型
pub mod record_types {
    pub const STYLE: &str = "STYLE";
    pub const BOM: &str = "BOM";
    pub const ROUTING: &str = "ROUTING";
    pub const COST: &str = "COST";
}

// ==========================================
// ExportRow - CSV 行
// ==========================================
// 不适用的列留空
#[derive(Debug, Default, Serialize)]
struct ExportRow<'a> {
    record_type: &'a str,
    style_code: &'a str,
    name: Option<&'a str>,
    status: Option<&'a str>,
    seq_no: Option<i32>,
    quantity: Option<f64>,
    waste_rate: Option<f64>,
    unit_cost: Option<f64>,
    minutes: Option<f64>,
    labor_rate: Option<f64>,
    amount: Option<f64>,
    material_cost: Option<f64>,
    labor_cost: Option<f64>,
    margin_pct: Option<f64>,
    price: Option<f64>,
    notes: Option<&'a str>,
}

/// 筛选导出款式
///
/// # 规则
/// - export_all: 全部款式
/// - 否则: 状态命中 status 列表 或 ID 命中 style_ids 列表
pub fn select_styles<'a>(styles: &'a [Style], req: &ExportRequest) -> Vec<&'a Style> {
    styles
        .iter()
        .filter(|style| {
            req.export_all
                || req.status.contains(&style.status)
                || req.style_ids.iter().any(|id| id == &style.id)
        })
        .collect()
}

/// 写出 CSV
pub fn write_csv(
    styles: &[&Style],
    materials: &[Material],
    req: &ExportRequest,
    engine: &CostingEngine,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for style in styles {
        writer.serialize(ExportRow {
            record_type: record_types::STYLE,
            style_code: &style.code,
            name: Some(&style.name),
            status: Some(style.status.to_db_str()),
            quantity: style.quantity.map(|q| q as f64),
            price: Some(style.proposed_price),
            notes: style.description.as_deref(),
            ..Default::default()
        })?;

        let breakdown = engine.breakdown(style, materials, &CostOverrides::default());

        if req.include_bom {
            for (line, cost) in style.bom.iter().zip(breakdown.lines.iter()) {
                writer.serialize(ExportRow {
                    record_type: record_types::BOM,
                    style_code: &style.code,
                    name: Some(cost.material_name.as_deref().unwrap_or(&line.material_id)),
                    seq_no: Some(line.seq_no),
                    quantity: Some(line.quantity),
                    waste_rate: Some(line.waste_rate),
                    unit_cost: Some(cost.unit_cost),
                    amount: Some(cost.amount),
                    ..Default::default()
                })?;
            }
        }

        if req.include_routing {
            for (step, cost) in style.routing.iter().zip(breakdown.steps.iter()) {
                writer.serialize(ExportRow {
                    record_type: record_types::ROUTING,
                    style_code: &style.code,
                    name: Some(&step.operation),
                    seq_no: Some(step.seq_no),
                    minutes: Some(step.minutes),
                    labor_rate: Some(step.labor_rate),
                    amount: Some(cost.amount),
                    notes: step.description.as_deref(),
                    ..Default::default()
                })?;
            }
        }

        if req.include_cost_estimation {
            write_cost_row(&mut writer, style)?;
        }
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

fn write_cost_row(writer: &mut csv::Writer<Vec<u8>>, style: &Style) -> Result<(), csv::Error> {
    if let Some(estimation) = &style.cost_estimation {
        writer.serialize(ExportRow {
            record_type: record_types::COST,
            style_code: &style.code,
            material_cost: Some(estimation.estimated_material_cost),
            labor_cost: Some(estimation.estimated_labor_cost),
            margin_pct: Some(estimation.profit_margin),
            price: Some(estimation.final_price),
            notes: estimation.notes.as_deref(),
            ..Default::default()
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::style::{BomLine, CostEstimation, RoutingStep};
    use crate::domain::types::StyleStatus;
    use std::collections::HashMap;

    fn style(id: &str, code: &str, status: StyleStatus) -> Style {
        let now = chrono::Local::now().naive_local();
        Style {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("款式 {}", code),
            description: None,
            quantity: Some(100),
            initial_price: None,
            season: None,
            buyer: None,
            status,
            proposed_price: 1300.0,
            bom: vec![BomLine {
                id: "B1".to_string(),
                material_id: "M1".to_string(),
                quantity: 2.0,
                waste_rate: 0.0,
                item_type: None,
                variant: None,
                seq_no: 1,
            }],
            routing: vec![RoutingStep {
                id: "R1".to_string(),
                operation: "Sewing".to_string(),
                minutes: 60.0,
                labor_rate: 600.0,
                description: None,
                seq_no: 1,
            }],
            cost_estimation: Some(CostEstimation {
                estimated_material_cost: 400.0,
                estimated_labor_cost: 600.0,
                profit_margin: 30.0,
                final_price: 1300.0,
                direct_final_price: None,
                notes: None,
                unit_cost_overrides: HashMap::new(),
                labor_rate_overrides: HashMap::new(),
                created_at: now,
                updated_at: now,
            }),
            created_at: now,
            updated_at: now,
        }
    }

    fn material() -> Material {
        let now = chrono::Local::now().naive_local();
        Material {
            id: "M1".to_string(),
            code: "FAB-001".to_string(),
            name: "Cotton".to_string(),
            material_type: "FABRIC".to_string(),
            unit: "m".to_string(),
            cost_per_unit: 200.0,
            supplier: None,
            stock: 10.0,
            min_stock: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_select_by_status_or_id() {
        let styles = vec![
            style("S1", "A", StyleStatus::Draft),
            style("S2", "B", StyleStatus::CostApproved),
            style("S3", "C", StyleStatus::Done),
        ];
        let req = ExportRequest {
            status: vec![StyleStatus::CostApproved],
            style_ids: vec!["S3".to_string()],
            ..Default::default()
        };
        let selected: Vec<&str> = select_styles(&styles, &req)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(selected, vec!["S2", "S3"]);

        let all = ExportRequest {
            export_all: true,
            ..Default::default()
        };
        assert_eq!(select_styles(&styles, &all).len(), 3);
    }

    #[test]
    fn test_csv_sections_follow_flags() {
        let styles = vec![style("S1", "POLO-001", StyleStatus::CostApproved)];
        let selected: Vec<&Style> = styles.iter().collect();
        let engine = CostingEngine::new();

        let req = ExportRequest {
            export_all: true,
            include_bom: true,
            ..Default::default()
        };
        let bytes = write_csv(&selected, &[material()], &req, &engine).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("record_type,style_code"));
        assert!(lines[1].starts_with("STYLE,POLO-001"));
        assert!(lines[2].starts_with("BOM,POLO-001,Cotton"));
        assert!(lines[2].contains(",400"));
        assert_eq!(lines.len(), 3);

        let req = ExportRequest {
            export_all: true,
            include_routing: true,
            include_cost_estimation: true,
            ..Default::default()
        };
        let text =
            String::from_utf8(write_csv(&selected, &[material()], &req, &engine).unwrap()).unwrap();
        assert!(text.contains("ROUTING,POLO-001,Sewing"));
        assert!(text.contains("COST,POLO-001"));
        assert!(!text.contains("BOM,"));
    }
}
