//! Deterministic answers used when no model can be reached.
//!
//! Rules are tried in table order against the lower-cased utterance and the
//! first match wins, so an utterance mentioning both a refund and a password
//! gets the refund answer.

use once_cell::sync::Lazy;
use regex::Regex;

/// Answer returned when no rule matches.
pub const CLARIFICATION_REPLY: &str =
    "I'm here to help. Could you provide a bit more detail about your question?";

/// One pattern → canned answer pair.
pub struct FallbackRule {
    /// Short rule name for logs.
    pub name: &'static str,
    pattern: Regex,
    /// Answer returned on match.
    pub reply: &'static str,
}

impl FallbackRule {
    fn new(name: &'static str, pattern: &str, reply: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule {name}: {e}")),
            reply,
        }
    }

    /// Returns true when the rule matches an already lower-cased utterance.
    pub fn matches(&self, lowered: &str) -> bool {
        self.pattern.is_match(lowered)
    }
}

/// Ordered rule table; order is part of the observable behavior.
pub static RULES: Lazy<Vec<FallbackRule>> = Lazy::new(|| {
    vec![
        FallbackRule::new(
            "refund",
            r"refund|money back",
            "We offer a 30-day money-back guarantee. Share your order ID to start a refund.",
        ),
        FallbackRule::new(
            "password",
            r"password|reset|change",
            "To change your password: Settings → Security → Change Password.",
        ),
        FallbackRule::new(
            "invoice",
            r"invoice|receipt",
            "View and download invoices from Billing → Invoices in your dashboard.",
        ),
        FallbackRule::new(
            "cancel_subscription",
            r"cancel.*subscription",
            "Cancel anytime from Billing → Subscription. Access continues until period end.",
        ),
    ]
});

/// Returns the first matching rule, if any.
pub fn matching_rule(utterance: &str) -> Option<&'static FallbackRule> {
    let lowered = utterance.to_lowercase();
    RULES.iter().find(|rule| rule.matches(&lowered))
}

/// Canned answer for `utterance`. Pure and deterministic.
pub fn fallback_reply(utterance: &str) -> &'static str {
    matching_rule(utterance)
        .map(|rule| rule.reply)
        .unwrap_or(CLARIFICATION_REPLY)
}
