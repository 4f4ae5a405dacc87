// ==========================================
// 成衣厂核价与生产流程系统 - 导出 API
// ==========================================
// 职责: 款式资料导出 (CSV 由后端生成, 编排层不解析内容)
// ==========================================

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::{authorize, rejected};
use crate::backend::context::RequestContext;
use crate::backend::contract::ExportRequest;
use crate::backend::gateway::StyleBackend;
use crate::domain::menu::Capability;

/// 导出API
pub struct ExportApi {
    backend: Arc<dyn StyleBackend>,
}

impl ExportApi {
    pub fn new(backend: Arc<dyn StyleBackend>) -> Self {
        Self { backend }
    }

    /// 导出款式资料
    ///
    /// # 返回
    /// - Ok(Vec<u8>): CSV 字节流
    /// - Err(ApiError::Validation): 未选择导出范围
    pub async fn export_styles(
        &self,
        ctx: &RequestContext,
        req: ExportRequest,
    ) -> ApiResult<Vec<u8>> {
        let action = "exportStyles";
        authorize(ctx, action, &[Capability::ExportData])?;
        req.validate().map_err(|v| rejected(action, v.into()))?;

        Ok(self.backend.export_styles(ctx, req).await?)
    }

    /// 导出并写入文件
    ///
    /// # 返回
    /// - Ok(usize): 写入字节数
    pub async fn export_to_file(
        &self,
        ctx: &RequestContext,
        req: ExportRequest,
        path: &Path,
    ) -> ApiResult<usize> {
        let bytes = self.export_styles(ctx, req).await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| ApiError::Backend(format!("写入导出文件失败: {}", e)))?;

        info!(path = %path.display(), bytes = bytes.len(), "导出文件已写入");
        Ok(bytes.len())
    }
}
