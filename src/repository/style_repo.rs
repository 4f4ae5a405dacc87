// ==========================================
// 成衣厂核价与生产流程系统 - 款式数据仓储
// ==========================================
// 对齐: style / bom_line / routing_step / cost_estimation 表
// 一致性单元: 款式 + BOM + 工序 + 估价 (子表级联删除)
// ==========================================

mod core;
mod estimation;
mod lines;

#[cfg(test)]
mod tests;

pub use self::core::StyleRepository;
