// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、请求上下文构造等功能
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use tempfile::NamedTempFile;

use garment_workflow::backend::RequestContext;
use garment_workflow::db::{init_schema, open_sqlite_connection};
use garment_workflow::domain::types::Role;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是有效 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 按角色构造已登录的请求上下文 (actor = 角色名小写)
pub fn role_ctx(role: Role) -> RequestContext {
    RequestContext::with_token(
        role.to_db_str().to_lowercase(),
        role,
        format!("token-{}", role.to_db_str()),
    )
}
