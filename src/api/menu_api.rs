// ==========================================
// 成衣厂核价与生产流程系统 - 菜单 API
// ==========================================
// 职责: 按角色返回本地化的菜单分区
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::menu::{menu_sections, MenuSection};
use crate::domain::types::Role;

/// 菜单项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub section: MenuSection,
    pub id: String,
    pub label: String,
}

/// 角色可见菜单 (标签按当前语言)
pub fn menu_for(role: Role) -> Vec<MenuItem> {
    menu_sections(role)
        .into_iter()
        .map(|section| MenuItem {
            section,
            id: section.id().to_string(),
            label: section.label(),
        })
        .collect()
}
