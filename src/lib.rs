// ==========================================
// 成衣厂核价与生产流程系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 款式核价计算 + 款式/生产单状态机
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 核价与状态流转
pub mod engine;

// 后端契约与 SQLite 参考实现
pub mod backend;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 编排
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BomItemType, Role, StyleStatus, WorkOrderStatus};

// 领域实体
pub use domain::{ActionLog, BomLine, CostEstimation, Material, RoutingStep, Style, WorkOrder};

// 引擎
pub use engine::{CostingEngine, StyleEvent, StyleWorkflow, WorkOrderEvent, WorkOrderWorkflow};

// 后端
pub use backend::{RequestContext, SqliteStyleBackend, StyleBackend};

// API
pub use api::{ApiError, ApiResult, CostingApi, MaterialApi, PlanningApi, StyleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "成衣厂核价与生产流程系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
