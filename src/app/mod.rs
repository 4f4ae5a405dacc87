// ==========================================
// 成衣厂核价与生产流程系统 - 应用层
// ==========================================
// 职责: 装配应用状态,供入口程序与工具使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
