// ==========================================
// 成衣厂核价与生产流程系统 - 后端层
// ==========================================
// 职责: 后端契约、请求上下文、SQLite 参考实现
// ==========================================

pub mod context;
pub mod contract;
pub mod export;
pub mod gateway;
pub mod sqlite_backend;

pub use context::{CredentialProvider, PermissionDenied, RequestContext, StaticCredentials};
pub use contract::{
    AddBomLineRequest, AddRoutingStepRequest, AdjustStockRequest, CreateMaterialRequest,
    CreateStyleRequest, CreateWorkOrderRequest, ExportRequest, FieldViolation,
    RecordOutputRequest, ReorderRoutingRequest, SaveCostEstimationRequest, UpdateBomLineRequest,
    UpdateRoutingStepRequest, UpdateStyleRequest,
};
pub use gateway::{BackendError, BackendResult, StyleBackend};
pub use sqlite_backend::SqliteStyleBackend;
