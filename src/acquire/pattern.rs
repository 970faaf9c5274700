use regex::Regex;

use crate::utils::error::AcquireError;

/// Matches candidate lines against the configured pattern and extracts the
/// single capture group.
pub struct PatternExtractor {
    pattern: Regex,
}

impl PatternExtractor {
    pub fn new(pattern: &str) -> Result<Self, AcquireError> {
        let compiled = Regex::new(pattern)
            .map_err(|e| AcquireError::Config(format!("Invalid pattern '{}': {}", pattern, e)))?;

        // captures_len counts the implicit whole-match group as well
        if compiled.captures_len() != 2 {
            return Err(AcquireError::Config(format!(
                "Pattern '{}' must contain exactly one capture group, found {}",
                pattern,
                compiled.captures_len() - 1
            )));
        }

        Ok(Self { pattern: compiled })
    }

    /// A non-match is not an error; the caller keeps polling.
    pub fn extract(&self, line: &str) -> Option<String> {
        self.pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_line_yields_capture() {
        let extractor = PatternExtractor::new(r"^R(\d{4})$").unwrap();
        assert_eq!(extractor.extract("R0523"), Some("0523".to_string()));
    }

    #[test]
    fn non_matching_line_yields_nothing() {
        let extractor = PatternExtractor::new(r"^R(\d{4})$").unwrap();
        assert_eq!(extractor.extract("X0523"), None);
        assert_eq!(extractor.extract("R052"), None);
        assert_eq!(extractor.extract(""), None);
    }

    #[test]
    fn pattern_without_capture_group_is_rejected() {
        let result = PatternExtractor::new(r"^R\d{4}$");
        assert!(matches!(result, Err(AcquireError::Config(_))));
    }

    #[test]
    fn pattern_with_two_capture_groups_is_rejected() {
        let result = PatternExtractor::new(r"^(R)(\d{4})$");
        assert!(matches!(result, Err(AcquireError::Config(_))));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let result = PatternExtractor::new(r"^R(\d{4}$");
        assert!(matches!(result, Err(AcquireError::Config(_))));
    }
}
