use super::estimation::load_estimation;
use super::lines::{load_bom, load_routing};
use crate::domain::style::Style;
use crate::domain::types::StyleStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, invalid_enum, parse_datetime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, code, name, description, quantity, initial_price, season, buyer,
           status, proposed_price, created_at, updated_at
    FROM style
"#;

// ==========================================
// StyleRepository - 款式仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct StyleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StyleRepository {
    /// 创建新的款式仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入款式主记录 (子表由 lines/estimation 单独写入)
    pub fn insert(&self, style: &Style) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO style (
                id, code, name, description, quantity, initial_price, season, buyer,
                status, proposed_price, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                style.id,
                style.code,
                style.name,
                style.description,
                style.quantity,
                style.initial_price,
                style.season,
                style.buyer,
                style.status.to_db_str(),
                style.proposed_price,
                format_datetime(&style.created_at),
                format_datetime(&style.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 更新款式基础信息 (不含状态)
    ///
    /// 仅当款式仍处于 expected 状态时写入,否则 StatusConflict
    pub fn update_info(&self, style: &Style, expected: StyleStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE style
            SET name = ?2, description = ?3, quantity = ?4, initial_price = ?5,
                season = ?6, buyer = ?7, updated_at = ?8
            WHERE id = ?1 AND status = ?9
            "#,
            params![
                style.id,
                style.name,
                style.description,
                style.quantity,
                style.initial_price,
                style.season,
                style.buyer,
                format_datetime(&chrono::Local::now().naive_local()),
                expected.to_db_str(),
            ],
        )?;
        if rows == 0 {
            return Err(status_miss(&conn, &style.id, expected));
        }
        Ok(())
    }

    /// 状态 compare-and-set
    ///
    /// # 返回
    /// - Ok(()): 当前状态等于 expected,已更新为 next
    /// - Err(StatusConflict): 状态已被其他请求改变 (重复提交)
    /// - Err(NotFound): 款式不存在
    pub fn update_status(
        &self,
        id: &str,
        expected: StyleStatus,
        next: StyleStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        compare_and_set_status(&conn, id, expected, next)
    }

    /// 删除款式 (仅限期望状态,子表级联)
    pub fn delete(&self, id: &str, expected: StyleStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM style WHERE id = ?1 AND status = ?2",
            params![id, expected.to_db_str()],
        )?;
        if rows == 0 {
            return Err(status_miss(&conn, id, expected));
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID加载完整款式 (含 BOM/工序/估价)
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Style>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
        let header = match stmt.query_row(params![id], map_header) {
            Ok(style) => style,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(hydrate(&conn, header)?))
    }

    /// 款号是否已存在
    pub fn exists_code(&self, code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM style WHERE code = ?1",
            params![code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 款式列表 (可按状态过滤,按创建时间倒序)
    pub fn list(&self, status: Option<StyleStatus>) -> RepositoryResult<Vec<Style>> {
        let conn = self.get_conn()?;
        let headers = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status = ?1 ORDER BY created_at DESC, code ASC",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![status.to_db_str()], map_header)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY created_at DESC, code ASC",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], map_header)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        headers
            .into_iter()
            .map(|header| hydrate(&conn, header))
            .collect()
    }
}

// ==========================================
// 内部辅助 (调用方已持有连接)
// ==========================================

fn compare_and_set_status(
    conn: &Connection,
    id: &str,
    expected: StyleStatus,
    next: StyleStatus,
) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE style SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        params![
            id,
            expected.to_db_str(),
            next.to_db_str(),
            format_datetime(&chrono::Local::now().naive_local()),
        ],
    )?;
    if rows == 0 {
        return Err(status_miss(conn, id, expected));
    }
    Ok(())
}

/// 写入前状态校验 (调用方已开启事务)
pub(super) fn ensure_status(
    conn: &Connection,
    id: &str,
    expected: StyleStatus,
) -> RepositoryResult<()> {
    let current: Option<String> = conn
        .query_row("SELECT status FROM style WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    match current {
        Some(status) if status == expected.to_db_str() => Ok(()),
        Some(_) => Err(RepositoryError::StatusConflict {
            entity: "Style".to_string(),
            id: id.to_string(),
            expected: expected.to_db_str().to_string(),
        }),
        None => Err(RepositoryError::NotFound {
            entity: "Style".to_string(),
            id: id.to_string(),
        }),
    }
}

/// 回写建议价
pub(super) fn write_proposed_price(
    conn: &Connection,
    id: &str,
    proposed_price: f64,
) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE style SET proposed_price = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            id,
            proposed_price,
            format_datetime(&chrono::Local::now().naive_local())
        ],
    )?;
    ensure_found(rows, id)
}

/// 条件更新未命中: 区分不存在与状态冲突
fn status_miss(conn: &Connection, id: &str, expected: StyleStatus) -> RepositoryError {
    let exists: Result<i64, _> = conn.query_row(
        "SELECT COUNT(*) FROM style WHERE id = ?1",
        params![id],
        |row| row.get(0),
    );
    match exists {
        Ok(0) => RepositoryError::NotFound {
            entity: "Style".to_string(),
            id: id.to_string(),
        },
        Ok(_) => RepositoryError::StatusConflict {
            entity: "Style".to_string(),
            id: id.to_string(),
            expected: expected.to_db_str().to_string(),
        },
        Err(e) => e.into(),
    }
}

fn ensure_found(rows: usize, id: &str) -> RepositoryResult<()> {
    if rows == 0 {
        Err(RepositoryError::NotFound {
            entity: "Style".to_string(),
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

fn hydrate(conn: &Connection, mut style: Style) -> RepositoryResult<Style> {
    style.bom = load_bom(conn, &style.id)?;
    style.routing = load_routing(conn, &style.id)?;
    style.cost_estimation = load_estimation(conn, &style.id)?;
    Ok(style)
}

fn map_header(row: &Row) -> SqliteResult<Style> {
    let status_str: String = row.get(8)?;
    let status = StyleStatus::from_str(&status_str).ok_or_else(|| invalid_enum(8, &status_str))?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Style {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        quantity: row.get(4)?,
        initial_price: row.get(5)?,
        season: row.get(6)?,
        buyer: row.get(7)?,
        status,
        proposed_price: row.get(9)?,
        bom: Vec::new(),
        routing: Vec::new(),
        cost_estimation: None,
        created_at: parse_datetime(10, &created_at)?,
        updated_at: parse_datetime(11, &updated_at)?,
    })
}
