// ==========================================
// 成衣厂核价与生产流程系统 - 核价配置读取 Trait
// ==========================================
// 职责: 定义核价/仓库模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// CostingConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait CostingConfigReader: Send + Sync {
    /// 技术部建议价加成百分比
    ///
    /// # 默认值
    /// - 30
    async fn get_proposed_markup_pct(&self) -> Result<f64, Box<dyn Error>>;

    /// 财务估价默认利润率百分比
    ///
    /// # 默认值
    /// - 0
    async fn get_default_profit_margin_pct(&self) -> Result<f64, Box<dyn Error>>;

    /// 低库存阈值 (未设置安全库存的物料)
    ///
    /// # 默认值
    /// - 500
    async fn get_low_stock_threshold(&self) -> Result<f64, Box<dyn Error>>;
}
