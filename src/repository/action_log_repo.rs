// ==========================================
// 成衣厂核价与生产流程系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有写入必须记录
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, entity_type, entity_id, action_type, from_status, to_status,
           actor, payload_json, action_ts
    FROM action_log
"#;

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, entity_type, entity_id, action_type, from_status, to_status,
                actor, payload_json, action_ts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.action_id,
                log.entity_type,
                log.entity_id,
                log.action_type,
                log.from_status,
                log.to_status,
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                format_datetime(&log.action_ts),
            ],
        )?;

        Ok(log.action_id.clone())
    }

    /// 查询实体的操作历史 (时间正序)
    pub fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY action_ts ASC, rowid ASC",
            SELECT_COLUMNS
        ))?;
        let logs = stmt
            .query_map(params![entity_type, entity_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_row(row: &Row) -> SqliteResult<ActionLog> {
    let payload_json_str: Option<String> = row.get(7)?;
    let action_ts_str: String = row.get(8)?;

    Ok(ActionLog {
        action_id: row.get(0)?,
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        action_type: row.get(3)?,
        from_status: row.get(4)?,
        to_status: row.get(5)?,
        actor: row.get(6)?,
        payload_json: payload_json_str.and_then(|s| serde_json::from_str(&s).ok()),
        action_ts: parse_datetime(8, &action_ts_str)?,
    })
}
