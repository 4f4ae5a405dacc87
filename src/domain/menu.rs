// ==========================================
// 成衣厂核价与生产流程系统 - 角色权限与菜单配置
// ==========================================
// 职责: 角色 → 能力 / 角色 → 菜单分区
// 约束: 全部使用穷举 match,新增角色时编译期强制补齐
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Capability - 操作能力
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    EditStyle,             // 款式/BOM/工序编辑, 送核价
    EstimateCost,          // 估价、退回、批准
    RequestCostAdjustment, // 要求重新估价
    PlanProduction,        // 下达生产单
    ReportOutput,          // 车间报工
    ManageMaterials,       // 物料目录与库存
    ManageUsers,           // 用户管理
    ExportData,            // 导出
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::EditStyle => "EDIT_STYLE",
            Capability::EstimateCost => "ESTIMATE_COST",
            Capability::RequestCostAdjustment => "REQUEST_COST_ADJUSTMENT",
            Capability::PlanProduction => "PLAN_PRODUCTION",
            Capability::ReportOutput => "REPORT_OUTPUT",
            Capability::ManageMaterials => "MANAGE_MATERIALS",
            Capability::ManageUsers => "MANAGE_USERS",
            Capability::ExportData => "EXPORT_DATA",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Role {
    /// 角色能力表
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Tech => &[
                Capability::EditStyle,
                Capability::RequestCostAdjustment,
                Capability::ExportData,
            ],
            Role::Accountant => &[
                Capability::EstimateCost,
                Capability::RequestCostAdjustment,
                Capability::ExportData,
            ],
            Role::Planner => &[Capability::PlanProduction, Capability::ExportData],
            Role::FactoryManager => &[Capability::ReportOutput],
            Role::Warehouse => &[Capability::ManageMaterials],
            Role::Hr => &[],
            Role::Admin => &[
                Capability::EditStyle,
                Capability::EstimateCost,
                Capability::RequestCostAdjustment,
                Capability::PlanProduction,
                Capability::ReportOutput,
                Capability::ManageMaterials,
                Capability::ManageUsers,
                Capability::ExportData,
            ],
        }
    }

    /// 是否具备某项能力
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// 是否具备任一能力
    pub fn can_any(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().any(|c| self.can(*c))
    }
}

// ==========================================
// MenuSection - 菜单分区
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSection {
    Profile,    // 个人资料 (所有角色)
    Dashboard,  // 总览
    Users,      // 用户管理
    Tech,       // 技术 (款式/BOM)
    Accounting, // 财务 (核价)
    Planning,   // 计划 (生产单)
    Warehouse,  // 仓库
    Production, // 车间
}

impl MenuSection {
    pub fn id(&self) -> &'static str {
        match self {
            MenuSection::Profile => "profile",
            MenuSection::Dashboard => "dashboard",
            MenuSection::Users => "users",
            MenuSection::Tech => "tech",
            MenuSection::Accounting => "accounting",
            MenuSection::Planning => "planning",
            MenuSection::Warehouse => "warehouse",
            MenuSection::Production => "production",
        }
    }

    /// 本地化菜单名称
    pub fn label(&self) -> String {
        crate::i18n::t(&format!("menu.{}", self.id()))
    }
}

/// 角色可见菜单
///
/// 管理员看到全部分区; 其他角色为 "个人资料 + 本部门分区";
/// 没有专属分区的角色 (人事) 回落到总览
pub fn menu_sections(role: Role) -> Vec<MenuSection> {
    let own: &[MenuSection] = match role {
        Role::Admin => &[
            MenuSection::Dashboard,
            MenuSection::Users,
            MenuSection::Tech,
            MenuSection::Accounting,
            MenuSection::Planning,
            MenuSection::Warehouse,
            MenuSection::Production,
        ],
        Role::Tech => &[MenuSection::Tech],
        Role::Accountant => &[MenuSection::Accounting],
        Role::Planner => &[MenuSection::Planning],
        Role::Warehouse => &[MenuSection::Warehouse],
        Role::FactoryManager => &[MenuSection::Production],
        Role::Hr => &[MenuSection::Dashboard],
    };

    let mut sections = Vec::with_capacity(own.len() + 1);
    sections.push(MenuSection::Profile);
    sections.extend_from_slice(own);
    sections
}
