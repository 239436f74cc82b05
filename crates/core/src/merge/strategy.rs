//! The closed set of merge tools under evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `git merge` strategy with a fixed argument template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    Ort,
    OrtIgnorespace,
    RecursiveHistogram,
    RecursiveIgnorespace,
    RecursiveMinimal,
    RecursiveMyers,
    RecursivePatience,
    Resolve,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 8] = [
        Self::Ort,
        Self::OrtIgnorespace,
        Self::RecursiveHistogram,
        Self::RecursiveIgnorespace,
        Self::RecursiveMinimal,
        Self::RecursiveMyers,
        Self::RecursivePatience,
        Self::Resolve,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ort => "ort",
            Self::OrtIgnorespace => "ort-ignorespace",
            Self::RecursiveHistogram => "recursive-histogram",
            Self::RecursiveIgnorespace => "recursive-ignorespace",
            Self::RecursiveMinimal => "recursive-minimal",
            Self::RecursiveMyers => "recursive-myers",
            Self::RecursivePatience => "recursive-patience",
            Self::Resolve => "resolve",
        }
    }

    /// Tag that prefixes this strategy's diagnostics.
    pub fn component(self) -> &'static str {
        match self {
            Self::Ort => "gitmerge_ort",
            Self::OrtIgnorespace => "gitmerge_ort_ignorespace",
            Self::RecursiveHistogram => "gitmerge_recursive_histogram",
            Self::RecursiveIgnorespace => "gitmerge_recursive_ignorespace",
            Self::RecursiveMinimal => "gitmerge_recursive_minimal",
            Self::RecursiveMyers => "gitmerge_recursive_myers",
            Self::RecursivePatience => "gitmerge_recursive_patience",
            Self::Resolve => "gitmerge_resolve",
        }
    }

    /// Arguments inserted between `git merge --no-edit` and the branch.
    pub fn args(self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Ort => &["-s", "ort"],
            Self::OrtIgnorespace => &["-s", "ort", "-Xignore-space-change"],
            Self::RecursiveHistogram => &["-s", "recursive", "-Xdiff-algorithm=histogram"],
            Self::RecursiveIgnorespace => &["-s", "recursive", "-Xignore-space-change"],
            Self::RecursiveMinimal => &["-s", "recursive", "-Xdiff-algorithm=minimal"],
            Self::RecursiveMyers => &["-s", "recursive", "-Xdiff-algorithm=myers"],
            Self::RecursivePatience => &["-s", "recursive", "-Xdiff-algorithm=patience"],
            Self::Resolve => &["-s", "resolve"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a tool name matches nothing in [`MergeTool::all`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown merge tool '{0}'")]
pub struct UnknownToolError(pub String);

impl FromStr for MergeStrategy {
    type Err = UnknownToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s || strategy.component() == s)
            .ok_or_else(|| UnknownToolError(s.to_string()))
    }
}

/// Any tool the harness can run against a branch pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeTool {
    Strategy(MergeStrategy),
    /// `git merge` driven by the line-level hires merge driver.
    Hires,
}

impl MergeTool {
    pub fn all() -> Vec<MergeTool> {
        MergeStrategy::ALL
            .into_iter()
            .map(MergeTool::Strategy)
            .chain(std::iter::once(MergeTool::Hires))
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Strategy(s) => s.name(),
            Self::Hires => "hires",
        }
    }

    pub fn component(self) -> &'static str {
        match self {
            Self::Strategy(s) => s.component(),
            Self::Hires => "git_hires_merge",
        }
    }
}

impl fmt::Display for MergeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MergeTool {
    type Err = UnknownToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hires" | "git_hires_merge" | "git-hires-merge" => Ok(Self::Hires),
            other => other.parse().map(Self::Strategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignorespace_templates() {
        assert_eq!(
            MergeStrategy::RecursiveIgnorespace.args(),
            vec!["-s", "recursive", "-Xignore-space-change"]
        );
        assert_eq!(
            MergeStrategy::OrtIgnorespace.args(),
            vec!["-s", "ort", "-Xignore-space-change"]
        );
    }

    #[test]
    fn test_every_strategy_selects_a_git_strategy() {
        for strategy in MergeStrategy::ALL {
            let args = strategy.args();
            assert_eq!(args[0], "-s", "{strategy} must start with -s");
            assert!(strategy.component().starts_with("gitmerge_"));
        }
    }

    #[test]
    fn test_parse_names_and_components() {
        assert_eq!("ort".parse::<MergeTool>(), Ok(MergeTool::Strategy(MergeStrategy::Ort)));
        assert_eq!(
            "gitmerge_recursive_patience".parse::<MergeTool>(),
            Ok(MergeTool::Strategy(MergeStrategy::RecursivePatience))
        );
        assert_eq!("hires".parse::<MergeTool>(), Ok(MergeTool::Hires));
        assert_eq!(
            "octopus".parse::<MergeTool>(),
            Err(UnknownToolError("octopus".into()))
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for tool in MergeTool::all() {
            assert_eq!(tool.to_string().parse::<MergeTool>(), Ok(tool));
        }
    }

    #[test]
    fn test_tags_are_unique() {
        let tools = MergeTool::all();
        assert_eq!(tools.len(), 9);
        let mut tags: Vec<_> = tools.iter().map(|t| t.component()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), tools.len());
    }
}
