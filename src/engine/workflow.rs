// ==========================================
// 成衣厂核价与生产流程系统 - 状态流转引擎
// ==========================================
// 职责: 款式/生产单状态机,定义合法事件与目标状态
// 红线: 非法来源状态一律报错,绝不强制纠正
// 红线: 状态校验先于载荷校验 (非草稿款式的行编辑直接拒绝)
// ==========================================
// 款式主线:
//   DRAFT → SENT_TO_ACCOUNTING → COST_ESTIMATED → COST_APPROVED
//   → READY_FOR_PLANNING → IN_PRODUCTION → DONE
// 回退: SENT_TO_ACCOUNTING → DRAFT (退回)
//       COST_ESTIMATED → SENT_TO_ACCOUNTING (要求调整)
// CANCELLED: 任意非终态可达,吸收态
// ==========================================

use crate::domain::action_log::entity_types;
use crate::domain::menu::Capability;
use crate::domain::types::{StyleStatus, WorkOrderStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 非终态款式状态 (取消事件的合法来源)
const STYLE_NON_TERMINAL: &[StyleStatus] = &[
    StyleStatus::Draft,
    StyleStatus::SentToAccounting,
    StyleStatus::CostEstimated,
    StyleStatus::CostApproved,
    StyleStatus::ReadyForPlanning,
    StyleStatus::InProduction,
];

// ==========================================
// TransitionError - 非法流转
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{entity} 当前状态 {from} 不允许执行 {action}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: String,
    pub action: String,
}

impl TransitionError {
    pub fn for_style(from: StyleStatus, action: &str) -> Self {
        Self {
            entity: entity_types::STYLE,
            from: from.to_db_str().to_string(),
            action: action.to_string(),
        }
    }

    pub fn for_work_order(from: WorkOrderStatus, action: &str) -> Self {
        Self {
            entity: entity_types::WORK_ORDER,
            from: from.to_db_str().to_string(),
            action: action.to_string(),
        }
    }
}

// ==========================================
// StyleEvent - 款式事件
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleEvent {
    SubmitForCosting,  // 技术部送核价
    RejectToDraft,     // 财务退回
    EstimateCost,      // 财务提交估价
    RequestAdjustment, // 要求重新估价
    ApproveCost,       // 批准价格
    CreateWorkOrder,   // 下达生产单
    StartProduction,   // 款式开产
    Complete,          // 款式完成
    Cancel,            // 取消
}

impl StyleEvent {
    pub const ALL: [StyleEvent; 9] = [
        StyleEvent::SubmitForCosting,
        StyleEvent::RejectToDraft,
        StyleEvent::EstimateCost,
        StyleEvent::RequestAdjustment,
        StyleEvent::ApproveCost,
        StyleEvent::CreateWorkOrder,
        StyleEvent::StartProduction,
        StyleEvent::Complete,
        StyleEvent::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleEvent::SubmitForCosting => "submitForCosting",
            StyleEvent::RejectToDraft => "rejectToDraft",
            StyleEvent::EstimateCost => "estimateCost",
            StyleEvent::RequestAdjustment => "requestAdjustment",
            StyleEvent::ApproveCost => "approveCost",
            StyleEvent::CreateWorkOrder => "createWorkOrder",
            StyleEvent::StartProduction => "startProduction",
            StyleEvent::Complete => "complete",
            StyleEvent::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s.trim())
    }

    /// 触发事件所需能力 (满足任一即可)
    pub fn required_capabilities(&self) -> &'static [Capability] {
        match self {
            StyleEvent::SubmitForCosting => &[Capability::EditStyle],
            StyleEvent::RejectToDraft | StyleEvent::EstimateCost | StyleEvent::ApproveCost => {
                &[Capability::EstimateCost]
            }
            StyleEvent::RequestAdjustment => &[Capability::RequestCostAdjustment],
            StyleEvent::CreateWorkOrder
            | StyleEvent::StartProduction
            | StyleEvent::Complete => &[Capability::PlanProduction],
            StyleEvent::Cancel => &[Capability::EditStyle, Capability::PlanProduction],
        }
    }
}

impl fmt::Display for StyleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// WorkOrderEvent - 生产单事件
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkOrderEvent {
    StartProduction, // 开工
    RecordOutput,    // 报产量
    RecordDefects,   // 报次品
    Complete,        // 完工
    Cancel,          // 取消
}

impl WorkOrderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderEvent::StartProduction => "startProduction",
            WorkOrderEvent::RecordOutput => "recordOutput",
            WorkOrderEvent::RecordDefects => "recordDefects",
            WorkOrderEvent::Complete => "complete",
            WorkOrderEvent::Cancel => "cancel",
        }
    }

    /// 触发事件所需能力 (满足任一即可)
    pub fn required_capabilities(&self) -> &'static [Capability] {
        match self {
            WorkOrderEvent::StartProduction | WorkOrderEvent::Complete => {
                &[Capability::PlanProduction, Capability::ReportOutput]
            }
            WorkOrderEvent::RecordOutput | WorkOrderEvent::RecordDefects => {
                &[Capability::ReportOutput]
            }
            WorkOrderEvent::Cancel => &[Capability::PlanProduction],
        }
    }
}

impl fmt::Display for WorkOrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// StyleWorkflow - 款式状态机
// ==========================================
pub struct StyleWorkflow;

impl StyleWorkflow {
    /// 事件的合法来源状态
    pub fn allowed_sources(event: StyleEvent) -> &'static [StyleStatus] {
        match event {
            StyleEvent::SubmitForCosting => &[StyleStatus::Draft],
            StyleEvent::RejectToDraft => &[StyleStatus::SentToAccounting],
            StyleEvent::EstimateCost => &[StyleStatus::SentToAccounting],
            StyleEvent::RequestAdjustment => &[StyleStatus::CostEstimated],
            StyleEvent::ApproveCost => &[StyleStatus::CostEstimated],
            StyleEvent::CreateWorkOrder => {
                &[StyleStatus::CostApproved, StyleStatus::ReadyForPlanning]
            }
            StyleEvent::StartProduction => &[StyleStatus::ReadyForPlanning],
            StyleEvent::Complete => &[StyleStatus::InProduction],
            StyleEvent::Cancel => STYLE_NON_TERMINAL,
        }
    }

    fn target(event: StyleEvent) -> StyleStatus {
        match event {
            StyleEvent::SubmitForCosting => StyleStatus::SentToAccounting,
            StyleEvent::RejectToDraft => StyleStatus::Draft,
            StyleEvent::EstimateCost => StyleStatus::CostEstimated,
            StyleEvent::RequestAdjustment => StyleStatus::SentToAccounting,
            StyleEvent::ApproveCost => StyleStatus::CostApproved,
            StyleEvent::CreateWorkOrder => StyleStatus::ReadyForPlanning,
            StyleEvent::StartProduction => StyleStatus::InProduction,
            StyleEvent::Complete => StyleStatus::Done,
            StyleEvent::Cancel => StyleStatus::Cancelled,
        }
    }

    /// 计算事件后的目标状态
    ///
    /// # 返回
    /// - Ok(目标状态): 来源合法
    /// - Err(TransitionError): 来源不在允许列表
    pub fn next_status(
        current: StyleStatus,
        event: StyleEvent,
    ) -> Result<StyleStatus, TransitionError> {
        if Self::allowed_sources(event).contains(&current) {
            Ok(Self::target(event))
        } else {
            Err(TransitionError::for_style(current, event.as_str()))
        }
    }

    /// 当前状态下可执行的事件 (用于界面按钮)
    pub fn available_events(current: StyleStatus) -> Vec<StyleEvent> {
        StyleEvent::ALL
            .into_iter()
            .filter(|e| Self::allowed_sources(*e).contains(&current))
            .collect()
    }

    /// BOM/工序只能在草稿状态修改
    pub fn ensure_lines_editable(current: StyleStatus) -> Result<(), TransitionError> {
        match current {
            StyleStatus::Draft => Ok(()),
            other => Err(TransitionError::for_style(other, "editLines")),
        }
    }

    /// 款式基础信息只能在草稿状态修改
    pub fn ensure_info_editable(current: StyleStatus) -> Result<(), TransitionError> {
        match current {
            StyleStatus::Draft => Ok(()),
            other => Err(TransitionError::for_style(other, "editStyle")),
        }
    }

    /// 款式只能在草稿状态删除
    pub fn ensure_deletable(current: StyleStatus) -> Result<(), TransitionError> {
        match current {
            StyleStatus::Draft => Ok(()),
            other => Err(TransitionError::for_style(other, "delete")),
        }
    }

    /// 估价只能在已送核价状态编辑
    pub fn ensure_estimation_editable(current: StyleStatus) -> Result<(), TransitionError> {
        match current {
            StyleStatus::SentToAccounting => Ok(()),
            other => Err(TransitionError::for_style(other, "editEstimation")),
        }
    }
}

// ==========================================
// WorkOrderWorkflow - 生产单状态机
// ==========================================
pub struct WorkOrderWorkflow;

impl WorkOrderWorkflow {
    pub fn allowed_sources(event: WorkOrderEvent) -> &'static [WorkOrderStatus] {
        match event {
            WorkOrderEvent::StartProduction => &[WorkOrderStatus::ReadyForPlanning],
            WorkOrderEvent::RecordOutput
            | WorkOrderEvent::RecordDefects
            | WorkOrderEvent::Complete => &[WorkOrderStatus::InProduction],
            WorkOrderEvent::Cancel => &[
                WorkOrderStatus::ReadyForPlanning,
                WorkOrderStatus::InProduction,
            ],
        }
    }

    /// 计算事件后的生产单状态 (报产量/报次品不改变状态)
    pub fn next_status(
        current: WorkOrderStatus,
        event: WorkOrderEvent,
    ) -> Result<WorkOrderStatus, TransitionError> {
        if !Self::allowed_sources(event).contains(&current) {
            return Err(TransitionError::for_work_order(current, event.as_str()));
        }
        Ok(match event {
            WorkOrderEvent::StartProduction
            | WorkOrderEvent::RecordOutput
            | WorkOrderEvent::RecordDefects => WorkOrderStatus::InProduction,
            WorkOrderEvent::Complete => WorkOrderStatus::Done,
            WorkOrderEvent::Cancel => WorkOrderStatus::Cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_line() {
        let mut status = StyleStatus::Draft;
        for (event, expected) in [
            (StyleEvent::SubmitForCosting, StyleStatus::SentToAccounting),
            (StyleEvent::EstimateCost, StyleStatus::CostEstimated),
            (StyleEvent::ApproveCost, StyleStatus::CostApproved),
            (StyleEvent::CreateWorkOrder, StyleStatus::ReadyForPlanning),
            (StyleEvent::StartProduction, StyleStatus::InProduction),
            (StyleEvent::Complete, StyleStatus::Done),
        ] {
            status = StyleWorkflow::next_status(status, event).unwrap();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_submit_only_once_per_cycle() {
        let sent =
            StyleWorkflow::next_status(StyleStatus::Draft, StyleEvent::SubmitForCosting).unwrap();
        let err = StyleWorkflow::next_status(sent, StyleEvent::SubmitForCosting).unwrap_err();
        assert_eq!(err.from, "SENT_TO_ACCOUNTING");
        assert_eq!(err.action, "submitForCosting");

        // 退回后可再次提交
        let back = StyleWorkflow::next_status(sent, StyleEvent::RejectToDraft).unwrap();
        assert!(StyleWorkflow::next_status(back, StyleEvent::SubmitForCosting).is_ok());
    }

    #[test]
    fn test_approve_from_draft_rejected() {
        let err =
            StyleWorkflow::next_status(StyleStatus::Draft, StyleEvent::ApproveCost).unwrap_err();
        assert_eq!(err.entity, entity_types::STYLE);
        assert_eq!(err.from, "DRAFT");
    }

    #[test]
    fn test_adjustment_returns_to_accounting() {
        assert_eq!(
            StyleWorkflow::next_status(StyleStatus::CostEstimated, StyleEvent::RequestAdjustment)
                .unwrap(),
            StyleStatus::SentToAccounting
        );
    }

    #[test]
    fn test_work_order_creation_sources() {
        for status in StyleStatus::ALL {
            let result = StyleWorkflow::next_status(status, StyleEvent::CreateWorkOrder);
            let allowed = matches!(
                status,
                StyleStatus::CostApproved | StyleStatus::ReadyForPlanning
            );
            assert_eq!(result.is_ok(), allowed, "status {}", status);
        }
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in StyleStatus::ALL {
            let result = StyleWorkflow::next_status(status, StyleEvent::Cancel);
            if status.is_terminal() {
                assert!(result.is_err());
            } else {
                assert_eq!(result.unwrap(), StyleStatus::Cancelled);
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_events() {
        assert!(StyleWorkflow::available_events(StyleStatus::Done).is_empty());
        assert!(StyleWorkflow::available_events(StyleStatus::Cancelled).is_empty());
        assert_eq!(
            StyleWorkflow::available_events(StyleStatus::Draft),
            vec![StyleEvent::SubmitForCosting, StyleEvent::Cancel]
        );
    }

    #[test]
    fn test_line_edit_guard() {
        assert!(StyleWorkflow::ensure_lines_editable(StyleStatus::Draft).is_ok());
        let err = StyleWorkflow::ensure_lines_editable(StyleStatus::SentToAccounting).unwrap_err();
        assert_eq!(err.action, "editLines");
        assert!(StyleWorkflow::ensure_deletable(StyleStatus::CostApproved).is_err());
        assert!(StyleWorkflow::ensure_estimation_editable(StyleStatus::SentToAccounting).is_ok());
        assert!(StyleWorkflow::ensure_estimation_editable(StyleStatus::CostEstimated).is_err());
    }

    #[test]
    fn test_work_order_lifecycle() {
        use WorkOrderEvent::*;
        let started =
            WorkOrderWorkflow::next_status(WorkOrderStatus::ReadyForPlanning, StartProduction)
                .unwrap();
        assert_eq!(started, WorkOrderStatus::InProduction);
        assert_eq!(
            WorkOrderWorkflow::next_status(started, RecordOutput).unwrap(),
            WorkOrderStatus::InProduction
        );
        assert!(
            WorkOrderWorkflow::next_status(WorkOrderStatus::ReadyForPlanning, RecordOutput)
                .is_err()
        );
        assert_eq!(
            WorkOrderWorkflow::next_status(started, Complete).unwrap(),
            WorkOrderStatus::Done
        );
        let err = WorkOrderWorkflow::next_status(WorkOrderStatus::Done, Cancel).unwrap_err();
        assert_eq!(err.entity, entity_types::WORK_ORDER);
    }

    #[test]
    fn test_event_capabilities() {
        use crate::domain::types::Role;
        assert!(Role::Tech.can_any(StyleEvent::SubmitForCosting.required_capabilities()));
        assert!(!Role::Tech.can_any(StyleEvent::ApproveCost.required_capabilities()));
        assert!(Role::Tech.can_any(StyleEvent::RequestAdjustment.required_capabilities()));
        assert!(Role::Planner.can_any(StyleEvent::Cancel.required_capabilities()));
        assert!(!Role::Accountant.can_any(StyleEvent::Cancel.required_capabilities()));
        assert!(Role::FactoryManager
            .can_any(WorkOrderEvent::StartProduction.required_capabilities()));
        assert!(!Role::FactoryManager.can_any(WorkOrderEvent::Cancel.required_capabilities()));
        assert!(!Role::Planner.can_any(WorkOrderEvent::RecordOutput.required_capabilities()));
    }

    #[test]
    fn test_event_name_parse() {
        assert_eq!(
            StyleEvent::from_str("approveCost"),
            Some(StyleEvent::ApproveCost)
        );
        assert_eq!(StyleEvent::from_str("approve"), None);
    }
}
