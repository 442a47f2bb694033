//! Keyword rules that pick a display icon for a summary.
//!
//! Rules are evaluated in order and the first rule with any keyword
//! contained in the summary wins, so put the most urgent categories first:
//! - verification codes / OTP → 🔐
//! - alerts and anomalies → 🚨
//! - money (amounts, bills, payments) → 💰
//! - shipping → 📦
//! - deadlines and meetings → 📅
//!
//! Matching is plain, case-sensitive substring containment. No LLM involved.

use tracing::debug;

/// Icon used when no rule matches.
pub const DEFAULT_ICON: &str = "📧";

/// A single icon rule.
#[derive(Debug, Clone)]
pub struct ClassifyRule {
    /// Icon shown in front of the notification headline.
    pub icon: String,
    /// Any one of these, contained in the summary, triggers the rule.
    pub keywords: Vec<String>,
    /// Short category name for logs.
    pub label: String,
}

impl ClassifyRule {
    pub fn new(icon: &str, label: &str, keywords: &[&str]) -> Self {
        Self {
            icon: icon.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            label: label.into(),
        }
    }

    fn matched_keyword(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| !k.is_empty() && text.contains(k.as_str()))
            .map(String::as_str)
    }
}

/// Ordered first-match classifier.
pub struct Classifier {
    rules: Vec<ClassifyRule>,
    default_icon: String,
}

impl Classifier {
    /// Classifier with the built-in categories.
    pub fn default_rules() -> Self {
        let rules = vec![
            ClassifyRule::new(
                "🔐",
                "verification code",
                &["验证码", "校验码", "动态码", "OTP", "verification code"],
            ),
            ClassifyRule::new("🚨", "alert", &["报警", "告警", "警报", "异常", "alert"]),
            ClassifyRule::new(
                "💰",
                "money",
                &["金额", "账单", "付款", "支付", "扣款", "转账", "发票"],
            ),
            ClassifyRule::new("📦", "shipping", &["快递", "物流", "发货", "包裹"]),
            ClassifyRule::new("📅", "schedule", &["截止", "会议", "日程", "deadline"]),
        ];

        Self {
            rules,
            default_icon: DEFAULT_ICON.into(),
        }
    }

    /// Classifier with no rules (always the default icon).
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            default_icon: DEFAULT_ICON.into(),
        }
    }

    /// Append a rule after the existing ones.
    pub fn add_rule(&mut self, rule: ClassifyRule) {
        self.rules.push(rule);
    }

    /// Icon for `summary`.
    pub fn classify(&self, summary: &str) -> &str {
        for rule in &self.rules {
            if let Some(keyword) = rule.matched_keyword(summary) {
                debug!(
                    category = %rule.label,
                    keyword = %keyword,
                    "Summary classified"
                );
                return &rule.icon;
            }
        }
        &self.default_icon
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::default_rules()
    }
}
