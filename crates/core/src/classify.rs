#![forbid(unsafe_code)]

use regex::{Regex, RegexBuilder};

pub const DEFAULT_BOUNDARY_PATTERNS: &[&str] = &[
    r"(^|\s)git\s+commit\b",
    r"(^|\s)git\s+push\b",
    r"(^|\s)(beads|bd)\s+(done|finish|close)\b",
];

pub const DEFAULT_WRITE_PATTERNS: &[&str] = &[
    r"\bcat\s+.*>",
    r"\becho\s+.*>",
    r"\btee\s",
    r"\bsed\s+-i",
    r"\bawk\s+.*-i\s*inplace",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    /// Commands that finalize work (commit, push, closing a task).
    CompletionBoundary,
    /// Commands that look like they write files.
    Write,
}

impl CommandCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompletionBoundary => "completion_boundary",
            Self::Write => "write",
        }
    }
}

#[derive(Clone, Debug)]
struct Rule {
    pattern: Regex,
    category: CommandCategory,
}

/// Shell command classifier driven by an explicit `pattern -> category` table.
#[derive(Clone, Debug, Default)]
pub struct CommandClassifier {
    rules: Vec<Rule>,
}

impl CommandClassifier {
    /// Patterns are case-insensitive. Patterns that fail to compile are dropped (they never match).
    pub fn from_table<'a, I>(table: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, CommandCategory)>,
    {
        let mut rules = Vec::new();
        for (raw, category) in table {
            match RegexBuilder::new(raw).case_insensitive(true).build() {
                Ok(pattern) => rules.push(Rule { pattern, category }),
                Err(err) => {
                    tracing::warn!(
                        pattern = raw,
                        category = category.as_str(),
                        error = %err,
                        "dropping invalid command pattern"
                    );
                }
            }
        }
        Self { rules }
    }

    pub fn from_patterns<B, W>(boundary: &[B], write: &[W]) -> Self
    where
        B: AsRef<str>,
        W: AsRef<str>,
    {
        let table = boundary
            .iter()
            .map(|p| (p.as_ref(), CommandCategory::CompletionBoundary))
            .chain(write.iter().map(|p| (p.as_ref(), CommandCategory::Write)));
        Self::from_table(table)
    }

    pub fn matches(&self, command: &str, category: CommandCategory) -> bool {
        self.rules
            .iter()
            .filter(|rule| rule.category == category)
            .any(|rule| rule.pattern.is_match(command))
    }

    pub fn is_completion_boundary(&self, command: &str) -> bool {
        self.matches(command, CommandCategory::CompletionBoundary)
    }

    pub fn is_write(&self, command: &str) -> bool {
        self.matches(command, CommandCategory::Write)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> CommandClassifier {
        CommandClassifier::from_patterns(DEFAULT_BOUNDARY_PATTERNS, DEFAULT_WRITE_PATTERNS)
    }

    #[test]
    fn default_boundary_commands() {
        let c = defaults();
        assert!(c.is_completion_boundary("git commit -m 'wip'"));
        assert!(c.is_completion_boundary("cargo fmt && git push origin main"));
        assert!(c.is_completion_boundary("GIT COMMIT --amend"));
        assert!(c.is_completion_boundary("bd close bd-12"));
        assert!(c.is_completion_boundary("beads done 7"));
        assert!(!c.is_completion_boundary("git status"));
        assert!(!c.is_completion_boundary("legit commit"));
    }

    #[test]
    fn default_write_commands() {
        let c = defaults();
        assert!(c.is_write("cat <<EOF > src/lib.rs"));
        assert!(c.is_write("echo hi > out.txt"));
        assert!(c.is_write("ls | tee log.txt"));
        assert!(c.is_write("sed -i 's/a/b/' file"));
        assert!(c.is_write("awk -i inplace '{print}' f"));
        assert!(!c.is_write("cat README.md"));
        assert!(!c.is_write("sed 's/a/b/' file"));
    }

    #[test]
    fn categories_do_not_leak() {
        let c = defaults();
        assert!(!c.is_write("git commit -m x"));
        assert!(!c.is_completion_boundary("echo hi > out.txt"));
    }

    #[test]
    fn invalid_patterns_are_dropped() {
        let c = CommandClassifier::from_table([
            ("(unclosed", CommandCategory::Write),
            (r"\bmake\b", CommandCategory::CompletionBoundary),
        ]);
        assert_eq!(c.rule_count(), 1);
        assert!(!c.is_write("(unclosed"));
        assert!(c.is_completion_boundary("make release"));
    }

    #[test]
    fn empty_table_matches_nothing() {
        let c = CommandClassifier::default();
        assert!(!c.is_completion_boundary("git commit"));
        assert!(!c.is_write("echo x > y"));
    }
}
