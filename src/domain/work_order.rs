// ==========================================
// 成衣厂核价与生产流程系统 - 生产单领域模型
// ==========================================
// 所有权: 计划部创建; 车间更新产量/次品计数
// 引用: style_id (非所属关系)
// ==========================================

use crate::domain::types::WorkOrderStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// WorkOrder - 生产单
// ==========================================
// 对齐: work_order 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: String,       // 生产单号 (WO-XXXXXXXX)
    pub style_id: String, // 来源款式

    // ===== 计划 =====
    pub quantity: i64,                 // 目标数量
    pub line_no: String,               // 产线
    pub start_date: NaiveDate,         // 计划开工
    pub end_date: NaiveDate,           // 计划完工
    pub assigned_team: Option<String>, // 班组

    // ===== 状态与进度 =====
    pub status: WorkOrderStatus,
    pub actual_output: i64, // 实际产量
    pub defect_count: i64,  // 次品数

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl WorkOrder {
    /// 生成生产单号
    pub fn generate_id() -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        format!("WO-{}", raw[..8].to_uppercase())
    }

    /// 进度百分比
    ///
    /// min(100, floor(actual_output / quantity * 100)),超产时显示封顶 100;
    /// 目标数量为 0 时返回 0
    pub fn progress_percent(&self) -> u32 {
        progress_percent(self.actual_output, self.quantity)
    }

    /// 剩余数量 (不小于 0)
    pub fn remaining_quantity(&self) -> i64 {
        (self.quantity - self.actual_output).max(0)
    }
}

/// 进度百分比计算 (整数运算, 向下取整并封顶 100)
pub fn progress_percent(actual_output: i64, quantity: i64) -> u32 {
    if quantity <= 0 || actual_output <= 0 {
        return 0;
    }
    let pct = actual_output.saturating_mul(100) / quantity;
    pct.min(100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_clamped_when_overshoot() {
        // 超产 150% 显示为 100
        assert_eq!(progress_percent(1500, 1000), 100);
    }

    #[test]
    fn test_progress_floor() {
        assert_eq!(progress_percent(999, 1000), 99);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(0, 1000), 0);
    }

    #[test]
    fn test_progress_zero_quantity() {
        assert_eq!(progress_percent(10, 0), 0);
    }

    #[test]
    fn test_generate_id_format() {
        let id = WorkOrder::generate_id();
        assert!(id.starts_with("WO-"));
        assert_eq!(id.len(), 11);
    }
}
