//! Symlink exclusion patterns
//!
//! A pattern is a glob matched against both the absolute target path and
//! the home-relative form an agent layout uses (`~/.codex/AGENTS.md`). A
//! pattern without wildcards is an exact match. Any matching pattern
//! excludes the target; there is no precedence between patterns.

use std::path::Path;

use agentlink_agents::SymlinkDescriptor;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{CoreError, CoreResult};

/// Compiled exclusion patterns
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    set: GlobSet,
}

impl ExclusionSet {
    /// Compile patterns, expanding a leading `~` against `home`
    pub fn new(patterns: &[String], home: &Path) -> CoreResult<Self> {
        let home = home.to_string_lossy();
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let normalized = pattern.trim_end_matches('/');
            for variant in [
                normalized.to_string(),
                shellexpand::tilde_with_context(normalized, || Some(home.as_ref())).to_string(),
            ] {
                let glob = GlobBuilder::new(&variant)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| CoreError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.kind().to_string(),
                    })?;
                builder.add(glob);
            }
        }

        let set = builder.build().map_err(|e| CoreError::InvalidPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self { set })
    }

    /// Whether a path matches any pattern
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }

    /// Whether a descriptor's target is excluded
    #[must_use]
    pub fn excludes(&self, descriptor: &SymlinkDescriptor) -> bool {
        self.matches(&descriptor.target) || self.matches(Path::new(&descriptor.target_display))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn set(patterns: &[&str]) -> ExclusionSet {
        let patterns: Vec<String> = patterns.iter().map(ToString::to_string).collect();
        ExclusionSet::new(&patterns, Path::new("/home/dev")).unwrap()
    }

    #[test]
    fn test_exact_match_with_tilde() {
        let exclusions = set(&["~/.codex/AGENTS.md"]);
        assert!(exclusions.matches(Path::new("/home/dev/.codex/AGENTS.md")));
        assert!(exclusions.matches(Path::new("~/.codex/AGENTS.md")));
        assert!(!exclusions.matches(Path::new("/home/dev/.codex/config.toml")));
    }

    #[test]
    fn test_glob_does_not_cross_separators() {
        let exclusions = set(&["~/.claude/*"]);
        assert!(exclusions.matches(Path::new("/home/dev/.claude/settings.json")));
        assert!(!exclusions.matches(Path::new("/home/dev/.claude/commands/a.md")));

        let deep = set(&["~/.claude/**"]);
        assert!(deep.matches(Path::new("/home/dev/.claude/commands/a.md")));
    }

    #[test]
    fn test_any_match_excludes() {
        let exclusions = set(&["~/.gemini/GEMINI.md", "~/.gemini/*"]);
        assert!(exclusions.matches(Path::new("/home/dev/.gemini/GEMINI.md")));
        assert!(exclusions.matches(Path::new("/home/dev/.gemini/settings.json")));
    }

    #[test]
    fn test_descriptor_matching() {
        let exclusions = set(&["~/AGENTS.md"]);
        let desc = SymlinkDescriptor::plain(
            Path::new("/home/dev"),
            "~/AGENTS.md",
            PathBuf::from("/repo/config/AGENTS.md"),
        );
        assert!(exclusions.excludes(&desc));
        assert!(!set(&[]).excludes(&desc));
    }

    #[test]
    fn test_invalid_pattern() {
        let patterns = vec!["~/[oops".to_string()];
        assert!(ExclusionSet::new(&patterns, Path::new("/home/dev")).is_err());
    }
}
