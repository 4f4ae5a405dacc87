// ==========================================
// CostingApi 集成测试
// ==========================================
// 测试范围:
// 1. 预览: 建议价 (30% 加成) 与最终报价
// 2. 核价明细与覆盖单价
// 3. 报价利润分析
// 4. 估价保存/提交/退回/调整/批准
// ==========================================

mod helpers;
mod test_helpers;

use std::collections::HashMap;

use garment_workflow::api::ApiErrorKind;
use garment_workflow::backend::SaveCostEstimationRequest;
use garment_workflow::config::config_keys;
use garment_workflow::domain::types::{Role, StyleStatus};
use garment_workflow::domain::{BomLine, RoutingStep};
use garment_workflow::engine::costing::CostOverrides;
use helpers::api_test_helper::*;

fn draft_line(id: &str, material_id: &str, quantity: f64, waste_rate: f64) -> BomLine {
    BomLine {
        id: id.to_string(),
        material_id: material_id.to_string(),
        quantity,
        waste_rate,
        item_type: None,
        variant: None,
        seq_no: 1,
    }
}

fn draft_step(id: &str, minutes: f64, labor_rate: f64) -> RoutingStep {
    RoutingStep {
        id: id.to_string(),
        operation: "Sewing".to_string(),
        minutes,
        labor_rate,
        description: None,
        seq_no: 1,
    }
}

// ==========================================
// 预览
// ==========================================

#[tokio::test]
async fn test_preview_proposed_price_加成30() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let fabric = env.create_material("FAB-01", 45000.0, 1500.0, None).await;

    let preview = env
        .costing_api
        .preview_proposed_price(
            &env.ctx(Role::Tech),
            &[draft_line("tmp-1", &fabric.id, 1.2, 0.0)],
            &[draft_step("tmp-s1", 10.0, 6000.0)],
        )
        .await
        .unwrap();

    assert!((preview.material_cost - 54000.0).abs() < 1e-6);
    assert_eq!(preview.labor_cost, 1000.0);
    assert_eq!(preview.markup_pct, 30.0);
    assert_eq!(preview.proposed_price, 71500.0);
}

#[tokio::test]
async fn test_preview_proposed_price_未知物料按零计() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let preview = env
        .costing_api
        .preview_proposed_price(
            &env.ctx(Role::Tech),
            &[draft_line("tmp-1", "GHOST", 3.0, 0.0)],
            &[draft_step("tmp-s1", 30.0, 2000.0)],
        )
        .await
        .unwrap();

    assert_eq!(preview.material_cost, 0.0);
    assert_eq!(preview.labor_cost, 1000.0);
    assert_eq!(preview.proposed_price, 1300.0);
}

#[tokio::test]
async fn test_preview_proposed_price_配置加成() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_manager
        .set_config_value(config_keys::PROPOSED_MARKUP_PCT, "50")
        .unwrap();

    let preview = env
        .costing_api
        .preview_proposed_price(&env.ctx(Role::Tech), &[], &[draft_step("s1", 60.0, 1000.0)])
        .await
        .unwrap();
    assert_eq!(preview.proposed_price, 1500.0);
}

#[tokio::test]
async fn test_preview_proposed_price_非法输入() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .costing_api
        .preview_proposed_price(
            &env.ctx(Role::Tech),
            &[draft_line("tmp-1", "M1", f64::NAN, 0.0)],
            &[],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Validation);
}

#[test]
fn test_preview_final_price() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    assert_eq!(
        env.costing_api
            .preview_final_price(100000.0, 50000.0, 30.0, None)
            .unwrap(),
        195000.0
    );
    // 直接报价优先
    assert_eq!(
        env.costing_api
            .preview_final_price(100000.0, 50000.0, 30.0, Some(180000.0))
            .unwrap(),
        180000.0
    );
    // 报价为 0 视为未填写
    assert_eq!(
        env.costing_api
            .preview_final_price(100000.0, 50000.0, 30.0, Some(0.0))
            .unwrap(),
        195000.0
    );
    let err = env
        .costing_api
        .preview_final_price(-1.0, 50000.0, 30.0, None)
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Validation);
}

// ==========================================
// 核价明细 / 利润分析
// ==========================================

#[tokio::test]
async fn test_breakdown_覆盖单价() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-010").await;
    let line_id = style.bom[0].id.clone();
    let step_id = style.routing[0].id.clone();

    let plain = env
        .costing_api
        .breakdown(&env.ctx(Role::Accountant), &style.id, &CostOverrides::default())
        .await
        .unwrap();
    assert_eq!(plain.proposed_price, 71500.0);
    assert!(!plain.lines[0].overridden);

    let overrides = CostOverrides {
        unit_costs: HashMap::from([(line_id, 40000.0)]),
        labor_rates: HashMap::from([(step_id, 12000.0)]),
    };
    let adjusted = env
        .costing_api
        .breakdown(&env.ctx(Role::Accountant), &style.id, &overrides)
        .await
        .unwrap();
    assert!(adjusted.lines[0].overridden);
    assert!((adjusted.material_cost - 48000.0).abs() < 1e-6);
    assert_eq!(adjusted.labor_cost, 2000.0);
    assert_eq!(adjusted.proposed_price, 65000.0);

    // 覆盖不改动款式本身
    let reloaded = env
        .style_api
        .get_style(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap();
    assert_eq!(reloaded.proposed_price, 71500.0);
}

#[tokio::test]
async fn test_analyze_price_利润率() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-011").await;

    let analysis = env
        .costing_api
        .analyze_price(&env.ctx(Role::Accountant), &style.id, 66000.0)
        .await
        .unwrap();
    assert!((analysis.total_cost - 55000.0).abs() < 1e-6);
    assert!((analysis.profit - 11000.0).abs() < 1e-6);
    assert!((analysis.margin_pct - 20.0).abs() < 1e-6);

    let err = env
        .costing_api
        .analyze_price(&env.ctx(Role::Accountant), &style.id, -5.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Validation);
}

// ==========================================
// 估价流程
// ==========================================

#[tokio::test]
async fn test_submit_estimation_流转到已估价() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-012").await;
    let accountant = env.ctx(Role::Accountant);
    env.style_api
        .submit_for_costing(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap();

    let estimated = env
        .costing_api
        .submit_estimation(
            &accountant,
            &style.id,
            SaveCostEstimationRequest {
                profit_margin: Some(30.0),
                notes: Some("standard margin".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(estimated.status, StyleStatus::CostEstimated);
    let estimation = estimated.cost_estimation.unwrap();
    assert_eq!(estimation.final_price, 71500.0);
    assert_eq!(estimation.profit_margin, 30.0);
    assert_eq!(estimation.notes.as_deref(), Some("standard margin"));
}

#[tokio::test]
async fn test_save_estimation_草稿状态拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-013").await;

    let err = env
        .costing_api
        .save_estimation(
            &env.ctx(Role::Accountant),
            &style.id,
            SaveCostEstimationRequest {
                profit_margin: Some(30.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_save_estimation_部分更新保留已存值() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-015").await;
    let accountant = env.ctx(Role::Accountant);
    env.style_api
        .submit_for_costing(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap();

    env.costing_api
        .save_estimation(
            &accountant,
            &style.id,
            SaveCostEstimationRequest {
                profit_margin: Some(25.0),
                final_price: Some(80000.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // 仅改备注
    let saved = env
        .costing_api
        .save_estimation(
            &accountant,
            &style.id,
            SaveCostEstimationRequest {
                notes: Some("rev 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let estimation = saved.cost_estimation.unwrap();
    assert_eq!(estimation.final_price, 80000.0);
    assert_eq!(estimation.profit_margin, 25.0);
    assert_eq!(estimation.estimated_material_cost, 54000.0);
    assert_eq!(estimation.notes.as_deref(), Some("rev 2"));

    // 空请求提交不改价
    let estimated = env
        .costing_api
        .submit_estimation(&accountant, &style.id, SaveCostEstimationRequest::default())
        .await
        .unwrap();
    assert_eq!(estimated.status, StyleStatus::CostEstimated);
    assert_eq!(estimated.cost_estimation.unwrap().final_price, 80000.0);

    // 退回调整后清除直接报价: (54000 + 1000) * 1.25
    env.costing_api
        .request_adjustment(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap();
    let saved = env
        .costing_api
        .save_estimation(
            &accountant,
            &style.id,
            SaveCostEstimationRequest {
                final_price: Some(0.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let estimation = saved.cost_estimation.unwrap();
    assert_eq!(estimation.final_price, 68750.0);
    assert_eq!(estimation.notes.as_deref(), Some("rev 2"));
}

#[tokio::test]
async fn test_request_adjustment_回到核价() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-014").await;
    env.style_api
        .submit_for_costing(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap();
    env.costing_api
        .submit_estimation(
            &env.ctx(Role::Accountant),
            &style.id,
            SaveCostEstimationRequest {
                final_price: Some(70000.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // 技术部可要求重新估价
    let back = env
        .costing_api
        .request_adjustment(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap();
    assert_eq!(back.status, StyleStatus::SentToAccounting);
    assert_eq!(back.cost_estimation.unwrap().final_price, 70000.0);

    let draft = env
        .costing_api
        .reject_to_draft(&env.ctx(Role::Accountant), &style.id)
        .await
        .unwrap();
    assert_eq!(draft.status, StyleStatus::Draft);
}

#[tokio::test]
async fn test_approve_cost_权限与状态() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (style, _) = env.costed_style("POLO-015").await;

    // 技术部无核价权限
    let err = env
        .costing_api
        .approve_cost(&env.ctx(Role::Tech), &style.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::PermissionDenied);

    // 草稿不能直接批准
    let err = env
        .costing_api
        .approve_cost(&env.ctx(Role::Accountant), &style.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::InvalidTransition);

    let approved = env.approved_style("POLO-016").await;
    assert_eq!(approved.status, StyleStatus::CostApproved);
}
