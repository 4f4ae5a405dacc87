// ==========================================
// MaterialApi 集成测试
// ==========================================
// 测试范围:
// 1. 新建物料: 编码唯一、仓库权限
// 2. 库存调整: 不得为负
// 3. 低库存提醒: 安全库存优先, 否则按配置阈值
// ==========================================

mod helpers;
mod test_helpers;

use garment_workflow::api::ApiErrorKind;
use garment_workflow::backend::{AdjustStockRequest, CreateMaterialRequest};
use garment_workflow::config::config_keys;
use garment_workflow::domain::types::Role;
use helpers::api_test_helper::*;

#[tokio::test]
async fn test_create_material_编码唯一() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let created = env.create_material("FAB-001", 45000.0, 1500.0, None).await;
    assert_eq!(created.code, "FAB-001");

    let err = env
        .material_api
        .create_material(
            &env.ctx(Role::Warehouse),
            CreateMaterialRequest {
                code: "FAB-001".to_string(),
                name: "Duplicate".to_string(),
                material_type: "FABRIC".to_string(),
                unit: "m".to_string(),
                cost_per_unit: 1.0,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Validation);
}

#[tokio::test]
async fn test_create_material_权限() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .material_api
        .create_material(
            &env.ctx(Role::Tech),
            CreateMaterialRequest {
                code: "TRIM-001".to_string(),
                name: "Button".to_string(),
                material_type: "TRIM".to_string(),
                unit: "pcs".to_string(),
                cost_per_unit: 200.0,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::PermissionDenied);

    // 所有角色都可查询
    let listed = env
        .material_api
        .list_materials(&env.ctx(Role::Hr))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_adjust_stock_出入库() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let warehouse = env.ctx(Role::Warehouse);
    let fabric = env.create_material("FAB-002", 45000.0, 1500.0, None).await;

    let after_issue = env
        .material_api
        .adjust_stock(
            &warehouse,
            &fabric.id,
            AdjustStockRequest {
                delta: -1200.0,
                reason: Some("cutting POLO-001".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(after_issue.stock, 300.0);

    let err = env
        .material_api
        .adjust_stock(
            &warehouse,
            &fabric.id,
            AdjustStockRequest {
                delta: -301.0,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Validation);

    let err = env
        .material_api
        .adjust_stock(
            &warehouse,
            &fabric.id,
            AdjustStockRequest {
                delta: 0.0,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Validation);

    let reloaded = env
        .material_api
        .get_material(&warehouse, &fabric.id)
        .await
        .unwrap();
    assert_eq!(reloaded.stock, 300.0);
}

#[tokio::test]
async fn test_low_stock_report() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_material("FAB-010", 45000.0, 1500.0, None).await;
    env.create_material("TRIM-010", 200.0, 120.0, None).await;
    // 安全库存优先于全局阈值
    env.create_material("TRIM-011", 12000.0, 800.0, Some(1000.0)).await;
    env.create_material("TRIM-012", 5500.0, 100.0, Some(50.0)).await;

    let report = env
        .material_api
        .low_stock_report(&env.ctx(Role::Warehouse))
        .await
        .unwrap();
    assert_eq!(report.threshold, 500.0);
    let codes: Vec<&str> = report.materials.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(codes, vec!["TRIM-010", "TRIM-011"]);
    assert!(report.message.contains('2'));
}

#[tokio::test]
async fn test_low_stock_report_配置阈值() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_material("FAB-020", 45000.0, 1500.0, None).await;
    env.config_manager
        .set_config_value(config_keys::LOW_STOCK_THRESHOLD, "2000")
        .unwrap();

    let report = env
        .material_api
        .low_stock_report(&env.ctx(Role::Planner))
        .await
        .unwrap();
    assert_eq!(report.threshold, 2000.0);
    assert_eq!(report.materials.len(), 1);

    env.config_manager
        .set_config_value(config_keys::LOW_STOCK_THRESHOLD, "100")
        .unwrap();
    let report = env
        .material_api
        .low_stock_report(&env.ctx(Role::Planner))
        .await
        .unwrap();
    assert!(report.materials.is_empty());
    assert!(report.message.is_empty());
}
