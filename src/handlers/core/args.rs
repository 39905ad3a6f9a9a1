//! Regex-backed command argument patterns.
//!
//! A pattern is an ordered list of capture slots, each required or
//! optional. Binding yields one entry per slot; an optional slot that
//! matched nothing is an explicit `None`, never an empty string, so
//! handlers can tell "no argument" from "empty argument".

use regex::Regex;

/// A compiled argument pattern. Anchored at the start of the argument
/// text; trailing unmatched text is ignored, as with the line-oriented
/// clients this serves.
#[derive(Debug, Clone)]
pub struct ArgPattern {
    re: Regex,
}

impl ArgPattern {
    /// Compile a pattern. Patterns are registered once at startup, so an
    /// invalid one is a programming error.
    pub fn new(pattern: &str) -> Self {
        let re = Regex::new(&format!("^(?:{pattern})")).expect("invalid argument pattern");
        Self { re }
    }

    /// Bind argument text against the pattern.
    pub fn bind(&self, rest: &str) -> Option<Args> {
        let caps = self.re.captures(rest)?;
        Some(Args(
            (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
        ))
    }
}

/// Captured arguments of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Args(Vec<Option<String>>);

impl Args {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The capture at `index`, flattening absent optional slots.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|s| s.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_capture() {
        let pattern = ArgPattern::new(r"([0-2])");
        let args = pattern.bind("1").expect("matches");
        assert_eq!(args.get(0), Some("1"));
        assert!(pattern.bind("5").is_none());
    }

    #[test]
    fn test_optional_capture_is_none_not_empty() {
        let pattern = ArgPattern::new(r"(\S+)(?:\s+(.*))?");
        let args = pattern.bind("target").expect("matches");
        assert_eq!(args.get(0), Some("target"));
        assert_eq!(args.get(1), None);
        assert_eq!(args.len(), 2);

        let args = pattern.bind("target ").expect("matches");
        assert_eq!(args.get(1), Some(""));
    }

    #[test]
    fn test_catch_all_matches_empty() {
        let pattern = ArgPattern::new(r"(.*)");
        let args = pattern.bind("").expect("matches");
        assert_eq!(args.get(0), Some(""));
    }

    #[test]
    fn test_fully_optional_pattern_yields_none_on_mismatch() {
        let pattern = ArgPattern::new(r"([A-Za-z][A-Za-z0-9]*)?");
        let args = pattern.bind("9bad").expect("optional group always matches");
        assert_eq!(args.get(0), None);
        let args = pattern.bind("Good").expect("matches");
        assert_eq!(args.get(0), Some("Good"));
    }
}
