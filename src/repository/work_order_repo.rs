// ==========================================
// 成衣厂核价与生产流程系统 - 生产单数据仓储
// ==========================================
// 对齐: work_order 表
// 红线: 生产单创建与款式状态推进在同一事务内完成
// ==========================================

use crate::domain::types::{StyleStatus, WorkOrderStatus};
use crate::domain::work_order::WorkOrder;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, invalid_enum, parse_date, parse_datetime, DATE_FORMAT};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, style_id, quantity, line_no, start_date, end_date, assigned_team,
           status, actual_output, defect_count, created_at, updated_at
    FROM work_order
"#;

// ==========================================
// WorkOrderRepository - 生产单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建生产单并推进款式状态
    ///
    /// # 参数
    /// - `style_expected`: 款式当前应处状态 (COST_APPROVED / READY_FOR_PLANNING)
    /// - `style_next`: 款式目标状态
    ///
    /// # 返回
    /// - Err(StatusConflict): 款式状态已变化,生产单不落库
    pub fn insert_with_style_status(
        &self,
        work_order: &WorkOrder,
        style_expected: StyleStatus,
        style_next: StyleStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let rows = tx.execute(
            "UPDATE style SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
            params![
                work_order.style_id,
                style_expected.to_db_str(),
                style_next.to_db_str(),
                format_datetime(&work_order.created_at),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::StatusConflict {
                entity: "Style".to_string(),
                id: work_order.style_id.clone(),
                expected: style_expected.to_db_str().to_string(),
            });
        }

        tx.execute(
            r#"
            INSERT INTO work_order (
                id, style_id, quantity, line_no, start_date, end_date, assigned_team,
                status, actual_output, defect_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                work_order.id,
                work_order.style_id,
                work_order.quantity,
                work_order.line_no,
                work_order.start_date.format(DATE_FORMAT).to_string(),
                work_order.end_date.format(DATE_FORMAT).to_string(),
                work_order.assigned_team,
                work_order.status.to_db_str(),
                work_order.actual_output,
                work_order.defect_count,
                format_datetime(&work_order.created_at),
                format_datetime(&work_order.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// 状态 compare-and-set
    pub fn update_status(
        &self,
        id: &str,
        expected: WorkOrderStatus,
        next: WorkOrderStatus,
    ) -> RepositoryResult<WorkOrder> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE work_order SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
            params![
                id,
                expected.to_db_str(),
                next.to_db_str(),
                format_datetime(&chrono::Local::now().naive_local()),
            ],
        )?;
        reload_after_cas(&conn, id, expected, rows)
    }

    /// 累加产量/次品 (仅限期望状态)
    pub fn add_counters(
        &self,
        id: &str,
        expected: WorkOrderStatus,
        output_delta: i64,
        defect_delta: i64,
    ) -> RepositoryResult<WorkOrder> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE work_order
            SET actual_output = actual_output + ?3,
                defect_count = defect_count + ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
            params![
                id,
                expected.to_db_str(),
                output_delta,
                defect_delta,
                format_datetime(&chrono::Local::now().naive_local()),
            ],
        )?;
        reload_after_cas(&conn, id, expected, rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;
        find_one(&conn, id)
    }

    /// 款式下的生产单
    pub fn list_by_style(&self, style_id: &str) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE style_id = ?1 ORDER BY start_date ASC, id ASC",
            SELECT_COLUMNS
        ))?;
        let orders = stmt
            .query_map(params![style_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(orders)
    }

    /// 全部生产单 (可按状态过滤)
    pub fn list(&self, status: Option<WorkOrderStatus>) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;
        let status_filter = status.map(|s| s.to_db_str());
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR status = ?1) ORDER BY start_date ASC, id ASC",
            SELECT_COLUMNS
        ))?;
        let orders = stmt
            .query_map(params![status_filter], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(orders)
    }
}

fn find_one(conn: &Connection, id: &str) -> RepositoryResult<Option<WorkOrder>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
    match stmt.query_row(params![id], map_row) {
        Ok(order) => Ok(Some(order)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 条件更新后重新加载; 未命中时区分不存在与状态冲突
fn reload_after_cas(
    conn: &Connection,
    id: &str,
    expected: WorkOrderStatus,
    rows: usize,
) -> RepositoryResult<WorkOrder> {
    let order = find_one(conn, id)?.ok_or_else(|| RepositoryError::NotFound {
        entity: "WorkOrder".to_string(),
        id: id.to_string(),
    })?;
    if rows == 0 {
        return Err(RepositoryError::StatusConflict {
            entity: "WorkOrder".to_string(),
            id: id.to_string(),
            expected: expected.to_db_str().to_string(),
        });
    }
    Ok(order)
}

fn map_row(row: &Row) -> SqliteResult<WorkOrder> {
    let start_date: String = row.get(4)?;
    let end_date: String = row.get(5)?;
    let status_str: String = row.get(7)?;
    let status =
        WorkOrderStatus::from_str(&status_str).ok_or_else(|| invalid_enum(7, &status_str))?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(WorkOrder {
        id: row.get(0)?,
        style_id: row.get(1)?,
        quantity: row.get(2)?,
        line_no: row.get(3)?,
        start_date: parse_date(4, &start_date)?,
        end_date: parse_date(5, &end_date)?,
        assigned_team: row.get(6)?,
        status,
        actual_output: row.get(8)?,
        defect_count: row.get(9)?,
        created_at: parse_datetime(10, &created_at)?,
        updated_at: parse_datetime(11, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::style::Style;
    use crate::repository::StyleRepository;
    use chrono::NaiveDate;

    fn setup() -> (StyleRepository, WorkOrderRepository) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        let style_repo = StyleRepository::new(conn.clone());
        let now = chrono::Local::now().naive_local();
        style_repo
            .insert(&Style {
                id: "S1".to_string(),
                code: "POLO-001".to_string(),
                name: "Polo".to_string(),
                description: None,
                quantity: Some(1000),
                initial_price: None,
                season: None,
                buyer: None,
                status: StyleStatus::CostApproved,
                proposed_price: 0.0,
                bom: Vec::new(),
                routing: Vec::new(),
                cost_estimation: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        (style_repo, WorkOrderRepository::new(conn))
    }

    fn make_order(id: &str) -> WorkOrder {
        let now = chrono::Local::now().naive_local();
        WorkOrder {
            id: id.to_string(),
            style_id: "S1".to_string(),
            quantity: 1000,
            line_no: "LINE-01".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            assigned_team: Some("A组".to_string()),
            status: WorkOrderStatus::ReadyForPlanning,
            actual_output: 0,
            defect_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_advances_style() {
        let (style_repo, repo) = setup();
        repo.insert_with_style_status(
            &make_order("WO-1"),
            StyleStatus::CostApproved,
            StyleStatus::ReadyForPlanning,
        )
        .unwrap();

        let style = style_repo.find_by_id("S1").unwrap().unwrap();
        assert_eq!(style.status, StyleStatus::ReadyForPlanning);
        let order = repo.find_by_id("WO-1").unwrap().unwrap();
        assert_eq!(order.line_no, "LINE-01");
        assert_eq!(order.start_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn test_insert_with_stale_style_status_rolls_back() {
        let (_style_repo, repo) = setup();
        let err = repo
            .insert_with_style_status(
                &make_order("WO-1"),
                StyleStatus::ReadyForPlanning,
                StyleStatus::ReadyForPlanning,
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::StatusConflict { .. }));
        assert!(repo.find_by_id("WO-1").unwrap().is_none());
    }

    #[test]
    fn test_counters_and_status() {
        let (_style_repo, repo) = setup();
        repo.insert_with_style_status(
            &make_order("WO-1"),
            StyleStatus::CostApproved,
            StyleStatus::ReadyForPlanning,
        )
        .unwrap();

        // 未开工不能报产量
        let err = repo
            .add_counters("WO-1", WorkOrderStatus::InProduction, 10, 0)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::StatusConflict { .. }));

        repo.update_status(
            "WO-1",
            WorkOrderStatus::ReadyForPlanning,
            WorkOrderStatus::InProduction,
        )
        .unwrap();
        let order = repo
            .add_counters("WO-1", WorkOrderStatus::InProduction, 600, 3)
            .unwrap();
        assert_eq!(order.actual_output, 600);
        assert_eq!(order.defect_count, 3);
        assert_eq!(order.progress_percent(), 60);

        assert_eq!(repo.list_by_style("S1").unwrap().len(), 1);
        assert_eq!(repo.list(Some(WorkOrderStatus::Done)).unwrap().len(), 0);
        assert_eq!(repo.list(None).unwrap().len(), 1);
    }
}
