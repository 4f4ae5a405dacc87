// ==========================================
// 成衣厂核价与生产流程系统 - 引擎层
// ==========================================
// 职责: 核价计算 + 状态流转规则
// 红线: Engine 不拼 SQL, 不调用后端, 纯函数
// ==========================================

pub mod costing;
pub mod workflow;

// 重导出核心引擎
pub use costing::{
    ceil_currency, BomLineCost, CostBreakdown, CostOverrides, CostingEngine, PriceAnalysis,
    RoutingStepCost,
};
pub use workflow::{
    StyleEvent, StyleWorkflow, TransitionError, WorkOrderEvent, WorkOrderWorkflow,
};
