use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::RuleError;

/// How a value at a given location is compared.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchingRule {
    /// Same category as the example; arrays may carry length bounds.
    Type {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Actual value is a string fully matching the pattern.
    Regex(CompiledRegex),
    /// Exact equality with the example, numbers compared by value.
    Equality,
}

impl MatchingRule {
    pub fn any_type() -> Self {
        MatchingRule::Type {
            min: None,
            max: None,
        }
    }

    pub fn min_type(min: usize) -> Self {
        MatchingRule::Type {
            min: Some(min),
            max: None,
        }
    }

    pub fn max_type(max: usize) -> Self {
        MatchingRule::Type {
            min: None,
            max: Some(max),
        }
    }

    pub fn regex(pattern: &str) -> Result<Self, RuleError> {
        CompiledRegex::new(pattern).map(MatchingRule::Regex)
    }

    /// Kind name as written in contract artifacts.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchingRule::Type { .. } => "type",
            MatchingRule::Regex(_) => "regex",
            MatchingRule::Equality => "equality",
        }
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchingRule::Type { min, max } => {
                f.write_str("type")?;
                if let Some(min) = min {
                    write!(f, " min={min}")?;
                }
                if let Some(max) = max {
                    write!(f, " max={max}")?;
                }
                Ok(())
            }
            MatchingRule::Regex(regex) => write!(f, "regex /{}/", regex.as_str()),
            MatchingRule::Equality => f.write_str("equality"),
        }
    }
}

/// Regex compiled once at rule construction, anchored for full-string matching.
///
/// Equality compares the source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    source: String,
    anchored: Arc<Regex>,
}

impl CompiledRegex {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            RuleError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            anchored: Arc::new(anchored),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledRegex").field(&self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_is_full_match() {
        let rule = CompiledRegex::new(r"\d+").unwrap();
        assert!(rule.is_full_match("123"));
        assert!(!rule.is_full_match("123abc"));
        assert!(!rule.is_full_match("x123"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let rule = CompiledRegex::new("GET|POST").unwrap();
        assert!(rule.is_full_match("POST"));
        assert!(!rule.is_full_match("GETX"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = MatchingRule::regex("(unclosed").unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(MatchingRule::any_type().to_string(), "type");
        assert_eq!(MatchingRule::min_type(2).to_string(), "type min=2");
        assert_eq!(MatchingRule::regex("a+").unwrap().to_string(), "regex /a+/");
        assert_eq!(MatchingRule::Equality.kind(), "equality");
    }
}
