// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用环境与数据准备函数
// 依赖: 测试文件需同时声明 `mod test_helpers;`
// ==========================================

#![allow(dead_code)]

use std::sync::Arc;
use tempfile::NamedTempFile;

use garment_workflow::api::{CostingApi, ExportApi, MaterialApi, PlanningApi, StyleApi};
use garment_workflow::app::AppState;
use garment_workflow::backend::{
    AddBomLineRequest, AddRoutingStepRequest, CreateMaterialRequest, CreateStyleRequest,
    RequestContext, SaveCostEstimationRequest,
};
use garment_workflow::config::ConfigManager;
use garment_workflow::domain::types::Role;
use garment_workflow::domain::{Material, Style};

use crate::test_helpers;

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 包含所有API实例和必要的依赖
pub struct ApiTestEnv {
    pub db_path: String,
    pub style_api: Arc<StyleApi>,
    pub costing_api: Arc<CostingApi>,
    pub planning_api: Arc<PlanningApi>,
    pub material_api: Arc<MaterialApi>,
    pub export_api: Arc<ExportApi>,
    pub config_manager: Arc<ConfigManager>,
    pub state: AppState,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境
    ///
    /// # 说明
    /// - 使用临时数据库文件
    /// - 经 AppState 装配后端与全部 API
    pub fn new() -> Result<Self, String> {
        garment_workflow::logging::init_test();

        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            db_path,
            style_api: state.style_api.clone(),
            costing_api: state.costing_api.clone(),
            planning_api: state.planning_api.clone(),
            material_api: state.material_api.clone(),
            export_api: state.export_api.clone(),
            config_manager: state.config_manager.clone(),
            state,
            _temp_file: temp_file,
        })
    }

    pub fn ctx(&self, role: Role) -> RequestContext {
        test_helpers::role_ctx(role)
    }

    // ==========================================
    // 数据准备
    // ==========================================

    /// 新建物料 (仓库角色)
    pub async fn create_material(
        &self,
        code: &str,
        cost_per_unit: f64,
        stock: f64,
        min_stock: Option<f64>,
    ) -> Material {
        self.material_api
            .create_material(
                &self.ctx(Role::Warehouse),
                CreateMaterialRequest {
                    code: code.to_string(),
                    name: format!("{} material", code),
                    material_type: "FABRIC".to_string(),
                    unit: "m".to_string(),
                    cost_per_unit,
                    supplier: None,
                    stock,
                    min_stock,
                },
            )
            .await
            .expect("创建物料失败")
    }

    /// 草稿款式
    pub async fn draft_style(&self, code: &str) -> Style {
        self.style_api
            .create_style(
                &self.ctx(Role::Tech),
                CreateStyleRequest {
                    code: code.to_string(),
                    name: format!("{} polo", code),
                    quantity: Some(1000),
                    ..Default::default()
                },
            )
            .await
            .expect("创建款式失败")
    }

    /// 已录入 BOM 与工序的草稿款式
    ///
    /// 面料 1.2m * 45000 = 54000; 工序 10min * 6000/h = 1000; 建议价 71500
    pub async fn costed_style(&self, code: &str) -> (Style, Material) {
        let tech = self.ctx(Role::Tech);
        let fabric = self
            .create_material(&format!("{}-FAB", code), 45000.0, 1500.0, None)
            .await;
        let style = self.draft_style(code).await;

        self.style_api
            .add_bom_line(
                &tech,
                &style.id,
                AddBomLineRequest {
                    material_id: fabric.id.clone(),
                    quantity: 1.2,
                    waste_rate: 0.0,
                    item_type: None,
                    variant: None,
                },
            )
            .await
            .expect("添加 BOM 行失败");
        let style = self
            .style_api
            .add_routing_step(
                &tech,
                &style.id,
                AddRoutingStepRequest {
                    operation: "Sewing".to_string(),
                    minutes: 10.0,
                    labor_rate: 6000.0,
                    description: None,
                },
            )
            .await
            .expect("添加工序失败");

        (style, fabric)
    }

    /// 已批准价格的款式 (利润率 30% → 最终报价 71500)
    pub async fn approved_style(&self, code: &str) -> Style {
        let (style, _) = self.costed_style(code).await;
        let accountant = self.ctx(Role::Accountant);

        self.style_api
            .submit_for_costing(&self.ctx(Role::Tech), &style.id)
            .await
            .expect("送核价失败");
        self.costing_api
            .submit_estimation(
                &accountant,
                &style.id,
                SaveCostEstimationRequest {
                    profit_margin: Some(30.0),
                    ..Default::default()
                },
            )
            .await
            .expect("提交估价失败");
        self.costing_api
            .approve_cost(&accountant, &style.id)
            .await
            .expect("批准价格失败")
    }
}
