//! File name classification.

use std::sync::OnceLock;

use regex::Regex;

use crate::QuarantineError;

/// Built-in rule: a keyword prefix, or a 32-character hex run anywhere.
pub const SUSPICIOUS_NAME_PATTERN: &str =
    r"^(corrupted|dangerous|risk|attack|malware|malicious)|[0-9a-fA-F]{32}";

/// A compiled suspicious-name rule.
#[derive(Debug, Clone)]
pub struct SuspicionRule {
    regex: Regex,
}

impl SuspicionRule {
    /// Compile a custom rule.
    pub fn new(pattern: &str) -> Result<Self, QuarantineError> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|e| invalid(pattern, &e))
    }

    /// The built-in rule, compiled once per process.
    ///
    /// A compile failure is cached too, so every caller sees the same error
    /// instead of a silent "not suspicious".
    pub fn builtin() -> Result<&'static Self, QuarantineError> {
        static BUILTIN: OnceLock<Result<SuspicionRule, regex::Error>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| Regex::new(SUSPICIOUS_NAME_PATTERN).map(|regex| Self { regex }))
            .as_ref()
            .map_err(|e| invalid(SUSPICIOUS_NAME_PATTERN, e))
    }

    /// Check a base name against the rule.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

fn invalid(pattern: &str, err: &regex::Error) -> QuarantineError {
    QuarantineError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    }
}

/// Classify `name` with the built-in rule.
pub fn is_suspicious(name: &str) -> Result<bool, QuarantineError> {
    Ok(SuspicionRule::builtin()?.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_prefixes() {
        for name in [
            "corrupted.db",
            "dangerous",
            "risk_assessment.pdf",
            "attack_vector.bin",
            "malware_report",
            "malicious.sh",
        ] {
            assert!(is_suspicious(name).unwrap(), "{name}");
        }
    }

    #[test]
    fn test_keywords_are_case_sensitive_prefixes() {
        assert!(!is_suspicious("Malware_report").unwrap());
        assert!(!is_suspicious("my_malware").unwrap());
        assert!(!is_suspicious("budget_2024.xlsx").unwrap());
    }

    #[test]
    fn test_hex_run() {
        assert!(is_suspicious("d41d8cd98f00b204e9800998ecf8427e").unwrap());
        assert!(is_suspicious("payload-D41D8CD98F00B204E9800998ECF8427E.exe").unwrap());
        // 31 hex digits is not enough.
        assert!(!is_suspicious("d41d8cd98f00b204e9800998ecf8427").unwrap());
    }

    #[test]
    fn test_invalid_custom_rule() {
        let err = SuspicionRule::new("(unclosed").unwrap_err();
        assert!(matches!(err, QuarantineError::InvalidPattern { .. }));
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = SuspicionRule::builtin().unwrap();
        let b = SuspicionRule::builtin().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.as_str(), SUSPICIOUS_NAME_PATTERN);
    }
}
