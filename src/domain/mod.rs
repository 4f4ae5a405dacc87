// ==========================================
// 成衣厂核价与生产流程系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、角色权限表
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod material;
pub mod menu;
pub mod style;
pub mod types;
pub mod work_order;

// 重导出核心类型
pub use action_log::{entity_types, ActionLog};
pub use material::Material;
pub use menu::{menu_sections, Capability, MenuSection};
pub use style::{BomLine, BomVariant, CostEstimation, RoutingStep, Style};
pub use types::{BomItemType, Role, StyleStatus, WorkOrderStatus};
pub use work_order::{progress_percent, WorkOrder};
