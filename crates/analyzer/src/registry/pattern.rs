use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid file pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A case-insensitive glob (`*`, `?`) matched against a file's base name.
pub struct FilePattern {
    glob: String,
    matcher: RegexMatcher,
}

impl FilePattern {
    pub fn new(glob: &str) -> Result<Self, RegistryError> {
        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(true)
            .multi_line(false)
            .build(&glob_to_regex(glob))
            .map_err(|e| RegistryError::InvalidPattern {
                pattern: glob.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            glob: glob.to_string(),
            matcher,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    #[inline]
    pub fn is_match(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name.as_bytes()).unwrap_or(false)
    }
}

impl std::fmt::Debug for FilePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FilePattern").field(&self.glob).finish()
    }
}

/// All patterns of one registration; matches when any pattern does.
#[derive(Debug, Default)]
pub struct FilePatternSet {
    patterns: Vec<FilePattern>,
}

impl FilePatternSet {
    pub fn new(globs: &[&str]) -> Result<Self, RegistryError> {
        let patterns = globs
            .iter()
            .map(|g| FilePattern::new(g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Match the base name of `path` (either separator style).
    pub fn matches(&self, path: &str) -> bool {
        let name = base_name(path);
        self.patterns.iter().any(|p| p.is_match(name))
    }

    pub fn globs(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(FilePattern::glob)
    }
}

pub fn base_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

fn glob_to_regex(glob: &str) -> String {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    for c in glob.chars() {
        match c {
            '*' => re.push_str(r"[^/\\]*"),
            '?' => re.push_str(r"[^/\\]"),
            c if r"\.+()|[]{}^$#&-~".contains(c) => {
                re.push('\\');
                re.push(c);
            }
            c => re.push(c),
        }
    }
    re.push('$');
    re
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let p = FilePattern::new("maa.log").expect("valid pattern");
        assert!(p.is_match("maa.log"));
        assert!(p.is_match("MAA.LOG"));
        assert!(!p.is_match("maaxlog"));
        assert!(!p.is_match("maa.log.1"));
    }

    #[test]
    fn test_wildcards() {
        let p = FilePattern::new("go-service*.log").expect("valid pattern");
        assert!(p.is_match("go-service.log"));
        assert!(p.is_match("go-service-2025-06-14.log"));
        assert!(!p.is_match("go-service.txt"));

        let q = FilePattern::new("maa.?.log").expect("valid pattern");
        assert!(q.is_match("maa.1.log"));
        assert!(!q.is_match("maa.12.log"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = FilePattern::new("agent(1)+[x].log").expect("valid pattern");
        assert!(p.is_match("agent(1)+[x].log"));
        assert!(!p.is_match("agent1x.log"));
    }

    #[test]
    fn test_set_matches_base_name() {
        let set = FilePatternSet::new(&["maa.log", "maa.bak.log"]).expect("valid patterns");
        assert!(set.matches("debug/maa.log"));
        assert!(set.matches(r"C:\MaaEnd\debug\maa.bak.log"));
        assert!(!set.matches("maa.log/agent.log"));
        assert_eq!(set.globs().collect::<Vec<_>>(), vec!["maa.log", "maa.bak.log"]);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a/b/c.log"), "c.log");
        assert_eq!(base_name(r"a\b.log"), "b.log");
        assert_eq!(base_name("plain.log"), "plain.log");
    }
}
