use super::core::{ensure_status, StyleRepository};
use crate::domain::style::CostEstimation;
use crate::domain::types::StyleStatus;
use crate::repository::error::RepositoryResult;
use crate::repository::{format_datetime, parse_datetime};
use rusqlite::{params, Connection};
use std::collections::HashMap;

impl StyleRepository {
    // ==========================================
    // 财务估价
    // ==========================================

    /// 写入或覆盖估价 (每个款式至多一条)
    ///
    /// 状态校验与写入同一事务; 款式已不处于 expected 状态时返回 StatusConflict
    pub fn upsert_estimation(
        &self,
        style_id: &str,
        expected: StyleStatus,
        estimation: &CostEstimation,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        ensure_status(&tx, style_id, expected)?;
        write_estimation(&tx, style_id, estimation)?;
        tx.commit()?;
        Ok(())
    }
}

fn write_estimation(
    conn: &Connection,
    style_id: &str,
    estimation: &CostEstimation,
) -> RepositoryResult<()> {
    let unit_cost_json = serde_json::to_string(&estimation.unit_cost_overrides)?;
    let labor_rate_json = serde_json::to_string(&estimation.labor_rate_overrides)?;

    conn.execute(
        r#"
        INSERT INTO cost_estimation (
            style_id, estimated_material_cost, estimated_labor_cost, profit_margin,
            final_price, direct_final_price, notes, unit_cost_overrides_json,
            labor_rate_overrides_json, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(style_id) DO UPDATE SET
            estimated_material_cost = excluded.estimated_material_cost,
            estimated_labor_cost = excluded.estimated_labor_cost,
            profit_margin = excluded.profit_margin,
            final_price = excluded.final_price,
            direct_final_price = excluded.direct_final_price,
            notes = excluded.notes,
            unit_cost_overrides_json = excluded.unit_cost_overrides_json,
            labor_rate_overrides_json = excluded.labor_rate_overrides_json,
            updated_at = excluded.updated_at
        "#,
        params![
            style_id,
            estimation.estimated_material_cost,
            estimation.estimated_labor_cost,
            estimation.profit_margin,
            estimation.final_price,
            estimation.direct_final_price,
            estimation.notes,
            unit_cost_json,
            labor_rate_json,
            format_datetime(&estimation.created_at),
            format_datetime(&estimation.updated_at),
        ],
    )?;
    Ok(())
}

pub(super) fn load_estimation(
    conn: &Connection,
    style_id: &str,
) -> RepositoryResult<Option<CostEstimation>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT estimated_material_cost, estimated_labor_cost, profit_margin, final_price,
               direct_final_price, notes, unit_cost_overrides_json,
               labor_rate_overrides_json, created_at, updated_at
        FROM cost_estimation
        WHERE style_id = ?1
        "#,
    )?;

    let result = stmt.query_row(params![style_id], |row| {
        let unit_json: Option<String> = row.get(6)?;
        let labor_json: Option<String> = row.get(7)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;

        Ok(CostEstimation {
            estimated_material_cost: row.get(0)?,
            estimated_labor_cost: row.get(1)?,
            profit_margin: row.get(2)?,
            final_price: row.get(3)?,
            direct_final_price: row.get(4)?,
            notes: row.get(5)?,
            unit_cost_overrides: parse_override_map(unit_json),
            labor_rate_overrides: parse_override_map(labor_json),
            created_at: parse_datetime(8, &created_at)?,
            updated_at: parse_datetime(9, &updated_at)?,
        })
    });

    match result {
        Ok(estimation) => Ok(Some(estimation)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_override_map(raw: Option<String>) -> HashMap<String, f64> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}
