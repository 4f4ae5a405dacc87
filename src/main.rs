// ==========================================
// 成衣厂核价与生产流程系统 - 命令行入口
// ==========================================
// 职责: 打开数据库, 装配应用状态, 输出款式与库存概况
// 用法: garment-workflow [db_path]
// ==========================================

use anyhow::{anyhow, Context, Result};
use garment_workflow::app::{get_default_db_path, AppState};
use garment_workflow::backend::RequestContext;
use garment_workflow::domain::types::{Role, StyleStatus};

#[tokio::main]
async fn main() -> Result<()> {
    garment_workflow::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", garment_workflow::APP_NAME);
    tracing::info!("系统版本: {}", garment_workflow::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let locale = state
        .config_manager
        .get_ui_locale()
        .map_err(|e| anyhow!("读取界面语言失败: {}", e))?;
    garment_workflow::i18n::set_locale(&locale);

    let ctx = RequestContext::with_token("system", Role::Admin, "local-cli");

    let styles = state
        .style_api
        .list_styles(&ctx, None)
        .await
        .context("读取款式列表失败")?;
    println!("款式总数: {}", styles.len());
    for status in StyleStatus::ALL {
        let count = styles.iter().filter(|s| s.status == status).count();
        if count > 0 {
            println!("  {:<12} {}", status.label(), count);
        }
    }

    let report = state
        .material_api
        .low_stock_report(&ctx)
        .await
        .context("读取低库存物料失败")?;
    if !report.message.is_empty() {
        println!("{}", report.message);
        for material in &report.materials {
            println!("  {} {} {}{}", material.code, material.name, material.stock, material.unit);
        }
    }

    Ok(())
}
