//! Equivalence keys and grouping of per-system signals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How two systems' outputs are judged equivalent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputComparison {
    /// Same number of lines, content ignored
    #[default]
    LineCount,
    /// Byte-for-byte equality
    Exact,
    /// Equality after folding CRLF, trimming trailing whitespace, and dropping trailing blank lines
    Normalized,
}

impl OutputComparison {
    /// Key under which `text` is grouped; equal keys mean equivalent outputs.
    pub fn key(&self, text: &str) -> String {
        match self {
            Self::LineCount => text.lines().count().to_string(),
            Self::Exact => text.to_string(),
            Self::Normalized => normalize(text),
        }
    }
}

fn normalize(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Systems that produced equivalent values for one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceGroup {
    /// Grouping key (line count, or the content itself)
    pub key: String,
    /// Member systems, in iteration order of the observations
    pub systems: Vec<String>,
}

/// Partition of systems into equivalence groups for one signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVerdict {
    pub groups: Vec<EquivalenceGroup>,
    pub diverged: bool,
}

impl SignalVerdict {
    /// Group `observations` by `key`; groups appear in order of first member.
    pub fn from_observations<F>(observations: &BTreeMap<String, String>, key: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        let mut groups: Vec<EquivalenceGroup> = Vec::new();
        for (system, value) in observations {
            let k = key(value);
            match groups.iter_mut().find(|group| group.key == k) {
                Some(group) => group.systems.push(system.clone()),
                None => groups.push(EquivalenceGroup {
                    key: k,
                    systems: vec![system.clone()],
                }),
            }
        }
        let diverged = groups.len() > 1;
        Self { groups, diverged }
    }

    /// Member lists only, for logging.
    pub fn partition(&self) -> Vec<Vec<String>> {
        self.groups.iter().map(|g| g.systems.clone()).collect()
    }
}
