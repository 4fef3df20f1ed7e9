//! Per-syscall trace records written by test executables.
//!
//! Each record is one line `<line>: <ret> <errno>`; commas are accepted as
//! separators as well, so `<line>,<ret>,<errno>` parses identically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One traced syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Index of the operation in the test program
    pub line: i64,
    /// Return code of the syscall
    pub ret: i64,
    /// errno after the call (0 on success)
    pub errno: i64,
}

impl TraceRecord {
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line
            .split(|c: char| c == ':' || c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .map(str::parse::<i64>);
        let record = Self {
            line: fields.next()?.ok()?,
            ret: fields.next()?.ok()?,
            errno: fields.next()?.ok()?,
        };
        fields.next().is_none().then_some(record)
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op {} returned {} (errno {})", self.line, self.ret, self.errno)
    }
}

/// Where two traces first disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMismatch {
    /// Zero-based index of the first differing record
    pub index: usize,
    /// Raw line from the reference trace, if it has one at `index`
    pub expected: Option<String>,
    /// Raw line from the compared trace, if it has one at `index`
    pub actual: Option<String>,
}

impl fmt::Display for TraceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |raw: &Option<String>| match raw {
            Some(raw) => TraceRecord::parse(raw)
                .map(|r| r.to_string())
                .unwrap_or_else(|| raw.clone()),
            None => "<end of trace>".to_string(),
        };
        write!(
            f,
            "record {}: {} vs {}",
            self.index,
            describe(&self.expected),
            describe(&self.actual)
        )
    }
}

/// Locate the first record at which `actual` departs from `expected`.
pub fn first_mismatch(expected: &str, actual: &str) -> Option<TraceMismatch> {
    let mut left = expected.lines();
    let mut right = actual.lines();
    let mut index = 0;
    loop {
        match (left.next(), right.next()) {
            (None, None) => return None,
            (l, r) if l != r => {
                return Some(TraceMismatch {
                    index,
                    expected: l.map(str::to_string),
                    actual: r.map(str::to_string),
                })
            }
            _ => index += 1,
        }
    }
}
