use super::core::{ensure_status, write_proposed_price, StyleRepository};
use crate::domain::style::{BomLine, BomVariant, RoutingStep};
use crate::domain::types::{BomItemType, StyleStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_enum;
use rusqlite::{params, Connection, Result as SqliteResult, Row};

/// 建议价重算: 入参为事务内最新的 BOM 与工序
type Repricer<'a> = &'a dyn Fn(&[BomLine], &[RoutingStep]) -> f64;

impl StyleRepository {
    // ==========================================
    // BOM 行
    // ==========================================

    /// 追加 BOM 行 (seq_no 自动取末位),并回写建议价
    ///
    /// # 返回
    /// - Err(StatusConflict): 款式已不处于 expected 状态,不写入
    pub fn insert_bom_line(
        &self,
        style_id: &str,
        expected: StyleStatus,
        line: &BomLine,
        reprice: impl Fn(&[BomLine], &[RoutingStep]) -> f64,
    ) -> RepositoryResult<BomLine> {
        self.edit_lines(style_id, expected, Some(&reprice), |conn| {
            let seq_no: i32 = conn.query_row(
                "SELECT COALESCE(MAX(seq_no), 0) + 1 FROM bom_line WHERE style_id = ?1",
                params![style_id],
                |row| row.get(0),
            )?;
            let variant = line.variant.clone().unwrap_or_default();

            conn.execute(
                r#"
                INSERT INTO bom_line (
                    id, style_id, material_id, quantity, waste_rate, item_type,
                    variant_size, variant_color, seq_no
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    line.id,
                    style_id,
                    line.material_id,
                    line.quantity,
                    line.waste_rate,
                    line.item_type.map(|t| t.to_db_str()),
                    variant.size,
                    variant.color,
                    seq_no,
                ],
            )?;

            Ok(BomLine {
                seq_no,
                ..line.clone()
            })
        })
    }

    /// 更新 BOM 行 (物料引用不可改),并回写建议价
    pub fn update_bom_line(
        &self,
        style_id: &str,
        expected: StyleStatus,
        line: &BomLine,
        reprice: impl Fn(&[BomLine], &[RoutingStep]) -> f64,
    ) -> RepositoryResult<()> {
        self.edit_lines(style_id, expected, Some(&reprice), |conn| {
            let variant = line.variant.clone().unwrap_or_default();
            let rows = conn.execute(
                r#"
                UPDATE bom_line
                SET quantity = ?3, waste_rate = ?4, item_type = ?5,
                    variant_size = ?6, variant_color = ?7
                WHERE id = ?1 AND style_id = ?2
                "#,
                params![
                    line.id,
                    style_id,
                    line.quantity,
                    line.waste_rate,
                    line.item_type.map(|t| t.to_db_str()),
                    variant.size,
                    variant.color,
                ],
            )?;
            ensure_child_found(rows, "BomLine", &line.id)
        })
    }

    /// 删除 BOM 行,并回写建议价
    pub fn delete_bom_line(
        &self,
        style_id: &str,
        expected: StyleStatus,
        line_id: &str,
        reprice: impl Fn(&[BomLine], &[RoutingStep]) -> f64,
    ) -> RepositoryResult<()> {
        self.edit_lines(style_id, expected, Some(&reprice), |conn| {
            let rows = conn.execute(
                "DELETE FROM bom_line WHERE id = ?1 AND style_id = ?2",
                params![line_id, style_id],
            )?;
            ensure_child_found(rows, "BomLine", line_id)
        })
    }

    // ==========================================
    // 工序
    // ==========================================

    /// 追加工序 (seq_no 自动取末位),并回写建议价
    pub fn insert_routing_step(
        &self,
        style_id: &str,
        expected: StyleStatus,
        step: &RoutingStep,
        reprice: impl Fn(&[BomLine], &[RoutingStep]) -> f64,
    ) -> RepositoryResult<RoutingStep> {
        self.edit_lines(style_id, expected, Some(&reprice), |conn| {
            let seq_no: i32 = conn.query_row(
                "SELECT COALESCE(MAX(seq_no), 0) + 1 FROM routing_step WHERE style_id = ?1",
                params![style_id],
                |row| row.get(0),
            )?;

            conn.execute(
                r#"
                INSERT INTO routing_step (
                    id, style_id, operation, minutes, labor_rate, description, seq_no
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    step.id,
                    style_id,
                    step.operation,
                    step.minutes,
                    step.labor_rate,
                    step.description,
                    seq_no,
                ],
            )?;

            Ok(RoutingStep {
                seq_no,
                ..step.clone()
            })
        })
    }

    /// 更新工序,并回写建议价
    pub fn update_routing_step(
        &self,
        style_id: &str,
        expected: StyleStatus,
        step: &RoutingStep,
        reprice: impl Fn(&[BomLine], &[RoutingStep]) -> f64,
    ) -> RepositoryResult<()> {
        self.edit_lines(style_id, expected, Some(&reprice), |conn| {
            let rows = conn.execute(
                r#"
                UPDATE routing_step
                SET operation = ?3, minutes = ?4, labor_rate = ?5, description = ?6
                WHERE id = ?1 AND style_id = ?2
                "#,
                params![
                    step.id,
                    style_id,
                    step.operation,
                    step.minutes,
                    step.labor_rate,
                    step.description,
                ],
            )?;
            ensure_child_found(rows, "RoutingStep", &step.id)
        })
    }

    /// 删除工序,并回写建议价
    pub fn delete_routing_step(
        &self,
        style_id: &str,
        expected: StyleStatus,
        step_id: &str,
        reprice: impl Fn(&[BomLine], &[RoutingStep]) -> f64,
    ) -> RepositoryResult<()> {
        self.edit_lines(style_id, expected, Some(&reprice), |conn| {
            let rows = conn.execute(
                "DELETE FROM routing_step WHERE id = ?1 AND style_id = ?2",
                params![step_id, style_id],
            )?;
            ensure_child_found(rows, "RoutingStep", step_id)
        })
    }

    /// 工序重排 (按给定顺序重写 seq_no,不影响建议价)
    ///
    /// 调用方负责保证 step_ids 是当前工序ID的一个排列
    pub fn reorder_routing(
        &self,
        style_id: &str,
        expected: StyleStatus,
        step_ids: &[String],
    ) -> RepositoryResult<()> {
        self.edit_lines(style_id, expected, None, |conn| {
            for (idx, step_id) in step_ids.iter().enumerate() {
                let rows = conn.execute(
                    "UPDATE routing_step SET seq_no = ?3 WHERE id = ?1 AND style_id = ?2",
                    params![step_id, style_id, (idx + 1) as i32],
                )?;
                ensure_child_found(rows, "RoutingStep", step_id)?;
            }
            Ok(())
        })
    }

    /// 行编辑事务: 状态校验 → 写入 → 重算建议价
    ///
    /// 任一步失败时事务在 drop 时回滚
    fn edit_lines<T>(
        &self,
        style_id: &str,
        expected: StyleStatus,
        reprice: Option<Repricer<'_>>,
        write: impl FnOnce(&Connection) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        ensure_status(&tx, style_id, expected)?;

        let tx_conn: &Connection = &tx;
        let out = write(tx_conn)?;
        if let Some(reprice) = reprice {
            let price = reprice(
                &load_bom(tx_conn, style_id)?,
                &load_routing(tx_conn, style_id)?,
            );
            write_proposed_price(tx_conn, style_id, price)?;
        }

        tx.commit()?;
        Ok(out)
    }
}

// ==========================================
// 加载 (调用方已持有连接)
// ==========================================

pub(super) fn load_bom(conn: &Connection, style_id: &str) -> RepositoryResult<Vec<BomLine>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, material_id, quantity, waste_rate, item_type,
               variant_size, variant_color, seq_no
        FROM bom_line
        WHERE style_id = ?1
        ORDER BY seq_no ASC
        "#,
    )?;
    let lines = stmt
        .query_map(params![style_id], map_bom_row)?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(lines)
}

pub(super) fn load_routing(
    conn: &Connection,
    style_id: &str,
) -> RepositoryResult<Vec<RoutingStep>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, operation, minutes, labor_rate, description, seq_no
        FROM routing_step
        WHERE style_id = ?1
        ORDER BY seq_no ASC
        "#,
    )?;
    let steps = stmt
        .query_map(params![style_id], |row| {
            Ok(RoutingStep {
                id: row.get(0)?,
                operation: row.get(1)?,
                minutes: row.get(2)?,
                labor_rate: row.get(3)?,
                description: row.get(4)?,
                seq_no: row.get(5)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(steps)
}

fn map_bom_row(row: &Row) -> SqliteResult<BomLine> {
    let item_type = match row.get::<_, Option<String>>(4)? {
        Some(raw) => Some(BomItemType::from_str(&raw).ok_or_else(|| invalid_enum(4, &raw))?),
        None => None,
    };
    let size: Option<String> = row.get(5)?;
    let color: Option<String> = row.get(6)?;
    let variant = if size.is_some() || color.is_some() {
        Some(BomVariant { size, color })
    } else {
        None
    };

    Ok(BomLine {
        id: row.get(0)?,
        material_id: row.get(1)?,
        quantity: row.get(2)?,
        waste_rate: row.get(3)?,
        item_type,
        variant,
        seq_no: row.get(7)?,
    })
}

fn ensure_child_found(rows: usize, entity: &str, id: &str) -> RepositoryResult<()> {
    if rows == 0 {
        Err(RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}
