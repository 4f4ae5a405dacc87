// ==========================================
// 演示数据库重置与灌数工具
// ==========================================
// 用法: seed_demo_db [db_path]
// 行为: 备份并删除旧库 → 建表 → 写入物料与示例款式
// ==========================================

use anyhow::{anyhow, Result};
use chrono::Local;
use std::fs;
use std::path::Path;

use garment_workflow::app::{get_default_db_path, AppState};
use garment_workflow::backend::{
    AddBomLineRequest, AddRoutingStepRequest, CreateMaterialRequest, CreateStyleRequest,
    RequestContext,
};
use garment_workflow::domain::types::{BomItemType, Role};

struct SeedMaterial {
    code: &'static str,
    name: &'static str,
    material_type: &'static str,
    unit: &'static str,
    cost_per_unit: f64,
    stock: f64,
    min_stock: Option<f64>,
}

const MATERIALS: [SeedMaterial; 4] = [
    SeedMaterial {
        code: "M1",
        name: "Cotton 100%",
        material_type: "FABRIC",
        unit: "m",
        cost_per_unit: 45000.0,
        stock: 1500.0,
        min_stock: Some(300.0),
    },
    SeedMaterial {
        code: "M2",
        name: "Button 4-hole",
        material_type: "TRIM",
        unit: "pcs",
        cost_per_unit: 200.0,
        stock: 5000.0,
        min_stock: None,
    },
    SeedMaterial {
        code: "M3",
        name: "Sewing thread",
        material_type: "TRIM",
        unit: "roll",
        cost_per_unit: 12000.0,
        stock: 40.0,
        min_stock: Some(50.0),
    },
    SeedMaterial {
        code: "M4",
        name: "Zipper YKK",
        material_type: "TRIM",
        unit: "pcs",
        cost_per_unit: 5500.0,
        stock: 800.0,
        min_stock: None,
    },
];

#[tokio::main]
async fn main() -> Result<()> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone()).map_err(|e| anyhow!(e))?;
    let admin = RequestContext::with_token("seed", Role::Admin, "seed-token");

    let mut material_ids = Vec::with_capacity(MATERIALS.len());
    for m in &MATERIALS {
        let material = state
            .material_api
            .create_material(
                &admin,
                CreateMaterialRequest {
                    code: m.code.to_string(),
                    name: m.name.to_string(),
                    material_type: m.material_type.to_string(),
                    unit: m.unit.to_string(),
                    cost_per_unit: m.cost_per_unit,
                    supplier: None,
                    stock: m.stock,
                    min_stock: m.min_stock,
                },
            )
            .await?;
        material_ids.push(material.id);
    }

    let style = state
        .style_api
        .create_style(
            &admin,
            CreateStyleRequest {
                code: "POLO-001".to_string(),
                name: "Polo basic".to_string(),
                description: Some("Cotton pique polo".to_string()),
                quantity: Some(500),
                initial_price: Some(180000.0),
                season: Some("SS27".to_string()),
                buyer: None,
            },
        )
        .await?;

    // 面料 1.2m + 纽扣 3 粒
    let bom = [
        (0usize, 1.2, 0.05, BomItemType::FabricMain),
        (1usize, 3.0, 0.0, BomItemType::AccessoryTrim),
    ];
    for (idx, quantity, waste_rate, item_type) in bom {
        state
            .style_api
            .add_bom_line(
                &admin,
                &style.id,
                AddBomLineRequest {
                    material_id: material_ids[idx].clone(),
                    quantity,
                    waste_rate,
                    item_type: Some(item_type),
                    variant: None,
                },
            )
            .await?;
    }

    let routing = [
        ("Cutting", 5.0, 30000.0),
        ("Sewing", 25.0, 36000.0),
        ("Finishing", 6.0, 30000.0),
    ];
    let style_id = style.id.clone();
    let mut last = style;
    for (operation, minutes, labor_rate) in routing {
        last = state
            .style_api
            .add_routing_step(
                &admin,
                &style_id,
                AddRoutingStepRequest {
                    operation: operation.to_string(),
                    minutes,
                    labor_rate,
                    description: None,
                },
            )
            .await?;
    }

    let styles = state.style_api.list_styles(&admin, None).await?;
    let materials = state.material_api.list_materials(&admin).await?;
    eprintln!("Seeded {}", db_path);
    eprintln!("  materials: {}", materials.len());
    eprintln!("  styles:    {}", styles.len());
    eprintln!("  {} proposed price: {:.0}", last.code, last.proposed_price);

    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<()> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}
