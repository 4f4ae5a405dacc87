// ==========================================
// 成衣厂核价与生产流程系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::costing_config_trait::CostingConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取非负数值配置; 缺失或格式错误时回落默认值
    fn get_non_negative_f64(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 写入 global scope 配置 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 界面语言 (默认 zh-CN)
    pub fn get_ui_locale(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::UI_LOCALE, crate::i18n::DEFAULT_LOCALE)
    }
}

// ==========================================
// CostingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl CostingConfigReader for ConfigManager {
    async fn get_proposed_markup_pct(&self) -> Result<f64, Box<dyn Error>> {
        self.get_non_negative_f64(config_keys::PROPOSED_MARKUP_PCT, 30.0)
    }

    async fn get_default_profit_margin_pct(&self) -> Result<f64, Box<dyn Error>> {
        self.get_non_negative_f64(config_keys::DEFAULT_PROFIT_MARGIN_PCT, 0.0)
    }

    async fn get_low_stock_threshold(&self) -> Result<f64, Box<dyn Error>> {
        self.get_non_negative_f64(config_keys::LOW_STOCK_THRESHOLD, 500.0)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 核价
    pub const PROPOSED_MARKUP_PCT: &str = "costing/proposed_markup_pct";
    pub const DEFAULT_PROFIT_MARGIN_PCT: &str = "costing/default_profit_margin_pct";

    // 仓库
    pub const LOW_STOCK_THRESHOLD: &str = "warehouse/low_stock_threshold";

    // 界面
    pub const UI_LOCALE: &str = "ui/locale";
}
