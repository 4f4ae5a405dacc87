// ==========================================
// 成衣厂核价与生产流程系统 - 配置层
// ==========================================
// 职责: 系统配置管理 (核价加成/默认利润率/低库存阈值/界面语言)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod costing_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use costing_config_trait::CostingConfigReader;
