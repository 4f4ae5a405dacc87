// ==========================================
// 成衣厂核价与生产流程系统 - SQLite 连接与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键/busy_timeout)
// - 幂等建表: 新库与已有库都可重复执行 init_schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 都需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库 (单元测试/临时计算)
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema (幂等)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 配置 =====
CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- ===== 物料目录 =====
CREATE TABLE IF NOT EXISTS material (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    material_type TEXT NOT NULL,
    unit TEXT NOT NULL,
    cost_per_unit REAL NOT NULL CHECK (cost_per_unit >= 0),
    supplier TEXT,
    stock REAL NOT NULL DEFAULT 0 CHECK (stock >= 0),
    min_stock REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ===== 款式 =====
CREATE TABLE IF NOT EXISTS style (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    quantity INTEGER,
    initial_price REAL,
    season TEXT,
    buyer TEXT,
    status TEXT NOT NULL DEFAULT 'DRAFT',
    proposed_price REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_style_status ON style(status);

CREATE TABLE IF NOT EXISTS bom_line (
    id TEXT PRIMARY KEY,
    style_id TEXT NOT NULL REFERENCES style(id) ON DELETE CASCADE,
    material_id TEXT NOT NULL,
    quantity REAL NOT NULL,
    waste_rate REAL NOT NULL DEFAULT 0,
    item_type TEXT,
    variant_size TEXT,
    variant_color TEXT,
    seq_no INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bom_line_style ON bom_line(style_id, seq_no);

CREATE TABLE IF NOT EXISTS routing_step (
    id TEXT PRIMARY KEY,
    style_id TEXT NOT NULL REFERENCES style(id) ON DELETE CASCADE,
    operation TEXT NOT NULL,
    minutes REAL NOT NULL,
    labor_rate REAL NOT NULL,
    description TEXT,
    seq_no INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_routing_step_style ON routing_step(style_id, seq_no);

CREATE TABLE IF NOT EXISTS cost_estimation (
    style_id TEXT PRIMARY KEY REFERENCES style(id) ON DELETE CASCADE,
    estimated_material_cost REAL NOT NULL,
    estimated_labor_cost REAL NOT NULL,
    profit_margin REAL NOT NULL,
    final_price REAL NOT NULL,
    direct_final_price REAL,
    notes TEXT,
    unit_cost_overrides_json TEXT,
    labor_rate_overrides_json TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ===== 生产单 =====
CREATE TABLE IF NOT EXISTS work_order (
    id TEXT PRIMARY KEY,
    style_id TEXT NOT NULL REFERENCES style(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    line_no TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    assigned_team TEXT,
    status TEXT NOT NULL DEFAULT 'READY_FOR_PLANNING',
    actual_output INTEGER NOT NULL DEFAULT 0,
    defect_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_work_order_style ON work_order(style_id);

-- ===== 操作日志 =====
CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    from_status TEXT,
    to_status TEXT,
    actor TEXT NOT NULL,
    payload_json TEXT,
    action_ts TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_action_log_entity ON action_log(entity_type, entity_id);
"#;
