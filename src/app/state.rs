// ==========================================
// 成衣厂核价与生产流程系统 - 应用状态
// ==========================================
// 职责: 装配数据库连接、配置、后端与各 API 实例
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{CostingApi, ExportApi, MaterialApi, PlanningApi, StyleApi};
use crate::backend::{SqliteStyleBackend, StyleBackend};
use crate::config::{ConfigManager, CostingConfigReader};

/// 应用状态
///
/// 所有 API 共享同一个后端实例与配置
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 款式API
    pub style_api: Arc<StyleApi>,

    /// 核价API
    pub costing_api: Arc<CostingApi>,

    /// 计划/车间API
    pub planning_api: Arc<PlanningApi>,

    /// 物料API
    pub material_api: Arc<MaterialApi>,

    /// 导出API
    pub export_api: Arc<ExportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 后端 (测试与工具可直接调用)
    pub backend: Arc<dyn StyleBackend>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径 (不存在时自动创建并建表)
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)))?;
        state.db_path = db_path;
        Ok(state)
    }

    /// 基于已有连接装配 (schema 须已初始化)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let config: Arc<dyn CostingConfigReader> = config_manager.clone();
        let backend: Arc<dyn StyleBackend> =
            Arc::new(SqliteStyleBackend::new(conn, config.clone()));

        Ok(Self {
            db_path: String::from(":memory:"),
            style_api: Arc::new(StyleApi::new(backend.clone())),
            costing_api: Arc::new(CostingApi::new(backend.clone(), config.clone())),
            planning_api: Arc::new(PlanningApi::new(backend.clone())),
            material_api: Arc::new(MaterialApi::new(backend.clone(), config)),
            export_api: Arc::new(ExportApi::new(backend.clone())),
            config_manager,
            backend,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 GARMENT_WORKFLOW_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("GARMENT_WORKFLOW_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./garment_workflow.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        let dir = data_dir.join("garment-workflow-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("garment-workflow");

        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("garment_workflow.db");
        }
    }

    path.to_string_lossy().to_string()
}
