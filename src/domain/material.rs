// ==========================================
// 成衣厂核价与生产流程系统 - 物料领域模型
// ==========================================
// 职责: 物料目录(核价时的只读参考数据)
// 所有权: 仓库/采购流程维护,核价计算中不可变
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Material - 物料
// ==========================================
// 对齐: material 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    // ===== 主键 =====
    pub id: String,   // 物料ID
    pub code: String, // 物料编码 (唯一)

    // ===== 基础信息 =====
    pub name: String,             // 名称
    pub material_type: String,    // 类别 (面料/辅料/...)
    pub unit: String,             // 计量单位
    pub cost_per_unit: f64,       // 单位成本
    pub supplier: Option<String>, // 供应商

    // ===== 库存 =====
    pub stock: f64,             // 在库数量
    pub min_stock: Option<f64>, // 安全库存 (可选)

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Material {
    /// 是否低库存
    ///
    /// # 规则
    /// - 设置了安全库存: stock < min_stock
    /// - 未设置: stock < threshold (全局配置, 默认 500)
    pub fn is_low_stock(&self, threshold: f64) -> bool {
        match self.min_stock {
            Some(min) => self.stock < min,
            None => self.stock < threshold,
        }
    }
}
