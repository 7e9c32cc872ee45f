//! strftime-style formats translated to regular expressions.

use std::fmt::Write;

use chrono::Utc;

use crate::error::RuleError;

/// Regex accepting every string `format` can produce.
pub fn format_to_regex(format: &str) -> Result<String, RuleError> {
    let invalid = || RuleError::InvalidFormat(format.to_string());
    let mut regex = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            regex.push_str(&regex::escape(&c.to_string()));
            continue;
        }
        let spec = match chars.next() {
            Some('.') => match chars.next() {
                // chrono omits the fraction entirely when it is zero
                Some('f') => r"(?:\.\d+)?",
                Some('3') if chars.next() == Some('f') => r"\.\d{3}",
                Some('6') if chars.next() == Some('f') => r"\.\d{6}",
                Some('9') if chars.next() == Some('f') => r"\.\d{9}",
                _ => return Err(invalid()),
            },
            Some(':') => match chars.next() {
                Some('z') => r"[+-]\d{2}:\d{2}",
                _ => return Err(invalid()),
            },
            Some('Y') => r"\d{4}",
            Some('C' | 'y' | 'm' | 'd' | 'H' | 'I' | 'M' | 'S' | 'U' | 'W' | 'V') => r"\d{2}",
            Some('e' | 'k' | 'l') => r"[ \d]\d",
            Some('j') => r"\d{3}",
            Some('u' | 'w') => r"\d",
            Some('f' | 's') => r"\d+",
            Some('b' | 'h' | 'a') => r"[A-Z][a-z]{2}",
            Some('B' | 'A') => r"[A-Z][a-z]+",
            Some('p') => "(?:AM|PM)",
            Some('P') => "(?:am|pm)",
            Some('z') => r"[+-]\d{4}",
            Some('Z') => r"[A-Za-z0-9+\-:]+",
            Some('F') => r"\d{4}-\d{2}-\d{2}",
            Some('D') => r"\d{2}/\d{2}/\d{2}",
            Some('T') => r"\d{2}:\d{2}:\d{2}",
            Some('R') => r"\d{2}:\d{2}",
            Some('%') => "%",
            _ => return Err(invalid()),
        };
        regex.push_str(spec);
    }

    Ok(regex)
}

/// Current UTC time rendered with `format`.
pub fn example_for(format: &str) -> Result<String, RuleError> {
    let mut example = String::new();
    write!(example, "{}", Utc::now().format(format))
        .map_err(|_| RuleError::InvalidFormat(format.to_string()))?;
    Ok(example)
}
