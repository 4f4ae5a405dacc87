// ==========================================
// 成衣厂核价与生产流程系统 - 操作日志领域模型
// ==========================================
// 红线: 后端接受的每一次写入/状态流转都必须记录
// 用途: 审计追踪
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,           // 日志ID
    pub entity_type: String,         // 实体类型 (STYLE / WORK_ORDER / MATERIAL)
    pub entity_id: String,           // 实体ID
    pub action_type: String,         // 操作类型 (存储为字符串)
    pub from_status: Option<String>, // 流转前状态
    pub to_status: Option<String>,   // 流转后状态
    pub actor: String,               // 操作人
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub action_ts: NaiveDateTime,    // 操作时间戳
}

impl ActionLog {
    /// 创建一条新日志 (自动生成ID与时间戳)
    pub fn new(
        entity_type: &str,
        entity_id: &str,
        action_type: &str,
        actor: &str,
        payload_json: Option<JsonValue>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action_type: action_type.to_string(),
            from_status: None,
            to_status: None,
            actor: actor.to_string(),
            payload_json,
            action_ts: chrono::Local::now().naive_local(),
        }
    }

    /// 附加状态流转信息
    pub fn with_transition(mut self, from: &str, to: &str) -> Self {
        self.from_status = Some(from.to_string());
        self.to_status = Some(to.to_string());
        self
    }
}

/// 实体类型常量
pub mod entity_types {
    pub const STYLE: &str = "STYLE";
    pub const WORK_ORDER: &str = "WORK_ORDER";
    pub const MATERIAL: &str = "MATERIAL";
}
