use super::StyleRepository;
use crate::domain::style::{BomLine, BomVariant, CostEstimation, RoutingStep, Style};
use crate::domain::types::{BomItemType, StyleStatus};
use crate::repository::error::RepositoryError;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()))
}

fn make_style(id: &str, code: &str) -> Style {
    let now = chrono::Local::now().naive_local();
    Style {
        id: id.to_string(),
        code: code.to_string(),
        name: "Polo Shirt".to_string(),
        description: Some("Basic polo".to_string()),
        quantity: Some(1000),
        initial_price: Some(80000.0),
        season: Some("SS25".to_string()),
        buyer: None,
        status: StyleStatus::Draft,
        proposed_price: 0.0,
        bom: Vec::new(),
        routing: Vec::new(),
        cost_estimation: None,
        created_at: now,
        updated_at: now,
    }
}

fn make_line(id: &str, material_id: &str) -> BomLine {
    BomLine {
        id: id.to_string(),
        material_id: material_id.to_string(),
        quantity: 1.2,
        waste_rate: 5.0,
        item_type: Some(BomItemType::FabricMain),
        variant: Some(BomVariant {
            size: Some("M".to_string()),
            color: None,
        }),
        seq_no: 0,
    }
}

/// 以行数作为建议价,便于断言回写
fn count_price(bom: &[BomLine], routing: &[RoutingStep]) -> f64 {
    (bom.len() + routing.len()) as f64
}

fn make_step(id: &str, operation: &str) -> RoutingStep {
    RoutingStep {
        id: id.to_string(),
        operation: operation.to_string(),
        minutes: 5.0,
        labor_rate: 1500.0,
        description: None,
        seq_no: 0,
    }
}

#[test]
fn test_insert_and_find_with_children() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    repo.insert_bom_line("S1", StyleStatus::Draft, &make_line("B1", "M1"), count_price)
        .unwrap();
    let second = repo
        .insert_bom_line("S1", StyleStatus::Draft, &make_line("B2", "M2"), count_price)
        .unwrap();
    assert_eq!(second.seq_no, 2);
    repo.insert_routing_step("S1", StyleStatus::Draft, &make_step("R1", "Cutting"), count_price)
        .unwrap();

    let style = repo.find_by_id("S1").unwrap().unwrap();
    assert_eq!(style.code, "POLO-001");
    assert_eq!(style.status, StyleStatus::Draft);
    assert_eq!(style.proposed_price, 3.0);
    assert_eq!(style.bom.len(), 2);
    assert_eq!(style.bom[0].item_type, Some(BomItemType::FabricMain));
    assert_eq!(
        style.bom[0].variant.as_ref().and_then(|v| v.size.clone()),
        Some("M".to_string())
    );
    assert_eq!(style.routing.len(), 1);
    assert!(style.cost_estimation.is_none());

    assert!(repo.find_by_id("S404").unwrap().is_none());
}

#[test]
fn test_duplicate_code_rejected() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    assert!(repo.exists_code("POLO-001").unwrap());

    let err = repo.insert(&make_style("S2", "POLO-001")).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
}

#[test]
fn test_status_compare_and_set() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();

    repo.update_status("S1", StyleStatus::Draft, StyleStatus::SentToAccounting)
        .unwrap();

    // 重复提交: 期望状态已不成立
    let err = repo
        .update_status("S1", StyleStatus::Draft, StyleStatus::SentToAccounting)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));

    let err = repo
        .update_status("S404", StyleStatus::Draft, StyleStatus::SentToAccounting)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_reorder_routing() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    for (id, op) in [("R1", "Cutting"), ("R2", "Sewing"), ("R3", "Packing")] {
        repo.insert_routing_step("S1", StyleStatus::Draft, &make_step(id, op), count_price)
            .unwrap();
    }

    let order = vec!["R3".to_string(), "R1".to_string(), "R2".to_string()];
    repo.reorder_routing("S1", StyleStatus::Draft, &order).unwrap();

    let style = repo.find_by_id("S1").unwrap().unwrap();
    assert_eq!(style.routing_step_ids(), order);
}

#[test]
fn test_reorder_routing_unknown_step_rolls_back() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    repo.insert_routing_step("S1", StyleStatus::Draft, &make_step("R1", "Cutting"), count_price)
        .unwrap();
    repo.insert_routing_step("S1", StyleStatus::Draft, &make_step("R2", "Sewing"), count_price)
        .unwrap();

    let err = repo
        .reorder_routing(
            "S1",
            StyleStatus::Draft,
            &["R2".to_string(), "R9".to_string()],
        )
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));

    let style = repo.find_by_id("S1").unwrap().unwrap();
    assert_eq!(style.routing_step_ids(), vec!["R1".to_string(), "R2".to_string()]);
}

#[test]
fn test_estimation_upsert_guarded_by_status() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    repo.update_status("S1", StyleStatus::Draft, StyleStatus::SentToAccounting)
        .unwrap();

    let now = chrono::Local::now().naive_local();
    let mut overrides = HashMap::new();
    overrides.insert("B1".to_string(), 42000.0);
    let estimation = CostEstimation {
        estimated_material_cost: 57306.0,
        estimated_labor_cost: 625.0,
        profit_margin: 30.0,
        final_price: 90000.0,
        direct_final_price: Some(90000.0),
        notes: Some("ok".to_string()),
        unit_cost_overrides: overrides,
        labor_rate_overrides: HashMap::new(),
        created_at: now,
        updated_at: now,
    };

    repo.upsert_estimation("S1", StyleStatus::SentToAccounting, &estimation)
        .unwrap();
    let stored = repo.find_by_id("S1").unwrap().unwrap().cost_estimation.unwrap();
    assert_eq!(stored.final_price, 90000.0);
    assert_eq!(stored.direct_final_price, Some(90000.0));
    assert_eq!(stored.unit_cost_overrides.get("B1"), Some(&42000.0));

    // 已提交估价后,按旧状态写入被拒绝且不落库
    repo.update_status(
        "S1",
        StyleStatus::SentToAccounting,
        StyleStatus::CostEstimated,
    )
    .unwrap();
    let mut changed = estimation.clone();
    changed.final_price = 1.0;
    let err = repo
        .upsert_estimation("S1", StyleStatus::SentToAccounting, &changed)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));
    let stored = repo.find_by_id("S1").unwrap().unwrap().cost_estimation.unwrap();
    assert_eq!(stored.final_price, 90000.0);
}

#[test]
fn test_line_edits_rejected_after_status_change() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    repo.insert_bom_line("S1", StyleStatus::Draft, &make_line("B1", "M1"), count_price)
        .unwrap();
    repo.update_status("S1", StyleStatus::Draft, StyleStatus::SentToAccounting)
        .unwrap();

    // 调用方读到的仍是草稿,但款式已送核价
    let err = repo
        .insert_bom_line("S1", StyleStatus::Draft, &make_line("B2", "M2"), count_price)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));
    let err = repo
        .delete_bom_line("S1", StyleStatus::Draft, "B1", count_price)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));
    let err = repo
        .insert_routing_step("S1", StyleStatus::Draft, &make_step("R1", "Cutting"), count_price)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));

    let mut renamed = make_style("S1", "POLO-001");
    renamed.name = "Renamed".to_string();
    let err = repo.update_info(&renamed, StyleStatus::Draft).unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));

    let style = repo.find_by_id("S1").unwrap().unwrap();
    assert_eq!(style.bom.len(), 1);
    assert!(style.routing.is_empty());
    assert_eq!(style.proposed_price, 1.0);
    assert_eq!(style.name, "Polo Shirt");

    let err = repo
        .insert_bom_line("S404", StyleStatus::Draft, &make_line("B3", "M1"), count_price)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_delete_cascades_children() {
    let conn = setup_test_db();
    let repo = StyleRepository::new(conn.clone());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    repo.insert_bom_line("S1", StyleStatus::Draft, &make_line("B1", "M1"), count_price)
        .unwrap();

    // 非草稿不可删
    let err = repo.delete("S1", StyleStatus::SentToAccounting).unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));

    repo.delete("S1", StyleStatus::Draft).unwrap();
    assert!(repo.find_by_id("S1").unwrap().is_none());

    let remaining: i64 = conn
        .lock()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM bom_line", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn test_list_with_status_filter() {
    let repo = StyleRepository::new(setup_test_db());
    repo.insert(&make_style("S1", "POLO-001")).unwrap();
    repo.insert(&make_style("S2", "POLO-002")).unwrap();
    repo.update_status("S2", StyleStatus::Draft, StyleStatus::SentToAccounting)
        .unwrap();

    assert_eq!(repo.list(None).unwrap().len(), 2);
    let drafts = repo.list(Some(StyleStatus::Draft)).unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, "S1");
}
