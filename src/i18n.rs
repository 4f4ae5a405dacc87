// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）、英文、越南文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["zh-CN", "en", "vi"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// 不支持的语言回落到默认语言
///
/// # 返回
/// - 实际生效的语言代码
pub fn set_locale(locale: &str) -> &'static str {
    let effective = SUPPORTED_LOCALES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(locale.trim()))
        .unwrap_or(DEFAULT_LOCALE);
    rust_i18n::set_locale(effective);
    effective
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use garment_workflow::i18n::t;
/// let msg = t("status.DRAFT");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use garment_workflow::i18n::t_with_args;
/// let msg = t_with_args("message.low_stock", &[("count", "3")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Role, StyleStatus};
    use crate::domain::MenuSection;
    use std::sync::Mutex;

    // locale 为全局状态，测试默认并行执行，这里串行化
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert_eq!(set_locale("en"), "en");
        assert_eq!(current_locale(), "en");

        // 未支持的语言回落默认
        assert_eq!(set_locale("fr"), DEFAULT_LOCALE);
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_status_labels() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(StyleStatus::SentToAccounting.label(), "已送核价");

        set_locale("en");
        assert_eq!(StyleStatus::SentToAccounting.label(), "Sent to accounting");

        set_locale("vi");
        assert_eq!(StyleStatus::Draft.label(), "Nháp");

        set_locale(DEFAULT_LOCALE);
    }

    #[test]
    fn test_role_and_menu_labels() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(Role::FactoryManager.label(), "Factory manager");
        assert_eq!(MenuSection::Accounting.label(), "Accounting");
        set_locale(DEFAULT_LOCALE);
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        let msg = t_with_args("message.low_stock", &[("count", "3")]);
        assert!(msg.contains('3'));

        set_locale("en");
        let msg = t_with_args("message.low_stock", &[("count", "3")]);
        assert!(msg.contains("3 materials"));

        set_locale(DEFAULT_LOCALE);
    }
}
