// ==========================================
// 成衣厂核价与生产流程系统 - 物料 API
// ==========================================
// 职责: 物料目录查询、新建物料、库存调整、低库存提醒
// 红线: 库存不得调整为负数 (后端原子校验)
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::{authorize, rejected};
use crate::backend::context::RequestContext;
use crate::backend::contract::{AdjustStockRequest, CreateMaterialRequest};
use crate::backend::gateway::StyleBackend;
use crate::config::CostingConfigReader;
use crate::domain::material::Material;
use crate::domain::menu::Capability;

// ==========================================
// LowStockReport - 低库存提醒
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockReport {
    pub threshold: f64,
    pub materials: Vec<Material>,
    pub message: String, // 本地化提示
}

// ==========================================
// MaterialApi - 物料 API
// ==========================================

/// 物料API
///
/// 职责：
/// 1. 物料查询 (所有角色)
/// 2. 新建物料与库存调整 (仓库)
/// 3. 低库存提醒 (阈值来自配置)
pub struct MaterialApi {
    backend: Arc<dyn StyleBackend>,
    config: Arc<dyn CostingConfigReader>,
}

impl MaterialApi {
    pub fn new(backend: Arc<dyn StyleBackend>, config: Arc<dyn CostingConfigReader>) -> Self {
        Self { backend, config }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub async fn list_materials(&self, ctx: &RequestContext) -> ApiResult<Vec<Material>> {
        Ok(self.backend.list_materials(ctx).await?)
    }

    pub async fn get_material(
        &self,
        ctx: &RequestContext,
        material_id: &str,
    ) -> ApiResult<Material> {
        Ok(self.backend.get_material(ctx, material_id).await?)
    }

    /// 低库存提醒
    ///
    /// # 返回
    /// - materials: 按库存升序
    /// - message: 如 "3 materials are running low"; 无低库存时为空串
    pub async fn low_stock_report(&self, ctx: &RequestContext) -> ApiResult<LowStockReport> {
        let threshold = self
            .config
            .get_low_stock_threshold()
            .await
            .map_err(|e| ApiError::Backend(format!("读取低库存阈值失败: {}", e)))?;
        let materials = self.backend.list_low_stock(ctx, threshold).await?;

        let message = if materials.is_empty() {
            String::new()
        } else {
            warn!(count = materials.len(), threshold, "存在低库存物料");
            crate::i18n::t_with_args(
                "message.low_stock",
                &[("count", &materials.len().to_string())],
            )
        };
        Ok(LowStockReport {
            threshold,
            materials,
            message,
        })
    }

    // ==========================================
    // 写入接口
    // ==========================================

    pub async fn create_material(
        &self,
        ctx: &RequestContext,
        req: CreateMaterialRequest,
    ) -> ApiResult<Material> {
        let action = "createMaterial";
        authorize(ctx, action, &[Capability::ManageMaterials])?;
        req.validate().map_err(|v| rejected(action, v.into()))?;

        let material = self.backend.create_material(ctx, req).await?;
        info!(material_id = %material.id, code = %material.code, "物料已确认");
        Ok(material)
    }

    /// 库存调整 (正数入库,负数出库)
    pub async fn adjust_stock(
        &self,
        ctx: &RequestContext,
        material_id: &str,
        req: AdjustStockRequest,
    ) -> ApiResult<Material> {
        let action = "adjustStock";
        authorize(ctx, action, &[Capability::ManageMaterials])?;
        req.validate().map_err(|v| rejected(action, v.into()))?;

        let current = self.get_material(ctx, material_id).await?;
        if current.stock + req.delta < 0.0 {
            return Err(rejected(
                action,
                ApiError::validation(
                    "stock",
                    format!("库存不足: 当前 {}, 调整 {}", current.stock, req.delta),
                ),
            ));
        }

        Ok(self.backend.adjust_stock(ctx, material_id, req).await?)
    }
}
