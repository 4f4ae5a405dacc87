// ==========================================
// 成衣厂核价与生产流程系统 - 领域类型定义
// ==========================================
// 红线: 款式状态与生产单状态是两套独立枚举,不得混用
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 款式状态 (Style Status)
// ==========================================
// 主线: DRAFT → SENT_TO_ACCOUNTING → COST_ESTIMATED → COST_APPROVED
//       → READY_FOR_PLANNING → IN_PRODUCTION → DONE
// CANCELLED 为吸收态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StyleStatus {
    Draft,            // 草稿(技术部编辑中)
    SentToAccounting, // 已送核价
    CostEstimated,    // 已估价
    CostApproved,     // 价格已批准
    ReadyForPlanning, // 待排产
    InProduction,     // 生产中
    Done,             // 已完成
    Cancelled,        // 已取消
}

impl fmt::Display for StyleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl StyleStatus {
    /// 全部状态(按主线顺序)
    pub const ALL: [StyleStatus; 8] = [
        StyleStatus::Draft,
        StyleStatus::SentToAccounting,
        StyleStatus::CostEstimated,
        StyleStatus::CostApproved,
        StyleStatus::ReadyForPlanning,
        StyleStatus::InProduction,
        StyleStatus::Done,
        StyleStatus::Cancelled,
    ];

    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(StyleStatus::Draft),
            "SENT_TO_ACCOUNTING" => Some(StyleStatus::SentToAccounting),
            "COST_ESTIMATED" => Some(StyleStatus::CostEstimated),
            "COST_APPROVED" => Some(StyleStatus::CostApproved),
            "READY_FOR_PLANNING" => Some(StyleStatus::ReadyForPlanning),
            "IN_PRODUCTION" => Some(StyleStatus::InProduction),
            "DONE" => Some(StyleStatus::Done),
            "CANCELLED" => Some(StyleStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StyleStatus::Draft => "DRAFT",
            StyleStatus::SentToAccounting => "SENT_TO_ACCOUNTING",
            StyleStatus::CostEstimated => "COST_ESTIMATED",
            StyleStatus::CostApproved => "COST_APPROVED",
            StyleStatus::ReadyForPlanning => "READY_FOR_PLANNING",
            StyleStatus::InProduction => "IN_PRODUCTION",
            StyleStatus::Done => "DONE",
            StyleStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否为终态 (DONE / CANCELLED)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StyleStatus::Done | StyleStatus::Cancelled)
    }

    /// 本地化显示名称
    pub fn label(&self) -> String {
        crate::i18n::t(&format!("status.{}", self.to_db_str()))
    }
}

// ==========================================
// 生产单状态 (Work Order Status)
// ==========================================
// 款式状态的子集,映射关系:
//   READY_FOR_PLANNING ↔ StyleStatus::ReadyForPlanning
//   IN_PRODUCTION      ↔ StyleStatus::InProduction
//   DONE               ↔ StyleStatus::Done
//   CANCELLED          ↔ StyleStatus::Cancelled
// 其余款式状态(草稿/核价相关)不得出现在生产单上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    ReadyForPlanning, // 已下达,待开工
    InProduction,     // 生产中
    Done,             // 已完工
    Cancelled,        // 已取消
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl WorkOrderStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        StyleStatus::from_str(s).and_then(Self::from_style_status)
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        self.as_style_status().to_db_str()
    }

    /// 映射到款式状态(总是成功)
    pub fn as_style_status(&self) -> StyleStatus {
        match self {
            WorkOrderStatus::ReadyForPlanning => StyleStatus::ReadyForPlanning,
            WorkOrderStatus::InProduction => StyleStatus::InProduction,
            WorkOrderStatus::Done => StyleStatus::Done,
            WorkOrderStatus::Cancelled => StyleStatus::Cancelled,
        }
    }

    /// 从款式状态映射(草稿/核价阶段状态返回 None)
    pub fn from_style_status(status: StyleStatus) -> Option<Self> {
        match status {
            StyleStatus::ReadyForPlanning => Some(WorkOrderStatus::ReadyForPlanning),
            StyleStatus::InProduction => Some(WorkOrderStatus::InProduction),
            StyleStatus::Done => Some(WorkOrderStatus::Done),
            StyleStatus::Cancelled => Some(WorkOrderStatus::Cancelled),
            StyleStatus::Draft
            | StyleStatus::SentToAccounting
            | StyleStatus::CostEstimated
            | StyleStatus::CostApproved => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Done | WorkOrderStatus::Cancelled)
    }

    /// 本地化显示名称
    pub fn label(&self) -> String {
        self.as_style_status().label()
    }
}

// ==========================================
// BOM 物料类别 (BOM Item Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BomItemType {
    FabricMain,       // 主面料
    FabricLining,     // 里料
    AccessoryTrim,    // 辅料
    AccessoryPacking, // 包装材料
    Other,            // 其他
}

impl fmt::Display for BomItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BomItemType {
    /// 从字符串解析物料类别
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FABRIC_MAIN" => Some(BomItemType::FabricMain),
            "FABRIC_LINING" => Some(BomItemType::FabricLining),
            "ACCESSORY_TRIM" => Some(BomItemType::AccessoryTrim),
            "ACCESSORY_PACKING" => Some(BomItemType::AccessoryPacking),
            "OTHER" => Some(BomItemType::Other),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BomItemType::FabricMain => "FABRIC_MAIN",
            BomItemType::FabricLining => "FABRIC_LINING",
            BomItemType::AccessoryTrim => "ACCESSORY_TRIM",
            BomItemType::AccessoryPacking => "ACCESSORY_PACKING",
            BomItemType::Other => "OTHER",
        }
    }
}

// ==========================================
// 用户角色 (User Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Tech,           // 技术部
    Accountant,     // 财务核价
    Planner,        // 计划部
    Warehouse,      // 仓库
    Hr,             // 人事
    FactoryManager, // 车间主管
    Admin,          // 系统管理员
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Tech,
        Role::Accountant,
        Role::Planner,
        Role::Warehouse,
        Role::Hr,
        Role::FactoryManager,
        Role::Admin,
    ];

    /// 从字符串解析角色
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TECH" => Some(Role::Tech),
            "ACCOUNTANT" => Some(Role::Accountant),
            "PLANNER" => Some(Role::Planner),
            "WAREHOUSE" => Some(Role::Warehouse),
            "HR" => Some(Role::Hr),
            "FACTORY_MANAGER" => Some(Role::FactoryManager),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// 转换为存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::Tech => "TECH",
            Role::Accountant => "ACCOUNTANT",
            Role::Planner => "PLANNER",
            Role::Warehouse => "WAREHOUSE",
            Role::Hr => "HR",
            Role::FactoryManager => "FACTORY_MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    /// 本地化显示名称
    pub fn label(&self) -> String {
        crate::i18n::t(&format!("role.{}", self.to_db_str()))
    }
}
