//! Stat selection by user-supplied patterns.
//!
//! A pattern is one of:
//! - `*` - selects every stat,
//! - `SECTION.ident.*` - selects every stat under the dotted prefix
//!   `SECTION.ident.` (the prefix is segment-bounded: `MGT.*` does not select
//!   `MGTX.uptime`, nor `MGT` itself),
//! - anything else - selects the stat with exactly that name.
//!
//! A stat is selected when any pattern matches. Compilation never fails: a
//! mistyped pattern simply selects nothing.

/// A single compiled pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    All,
    /// Required prefix, including the trailing `.`.
    Prefix(String),
    Exact(String),
}

impl Pattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            return Pattern::All;
        }
        match pattern.strip_suffix(".*") {
            Some(stem) => Pattern::Prefix(format!("{}.", stem)),
            None => Pattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::All => true,
            Pattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Pattern::Exact(exact) => name == exact,
        }
    }
}

/// Compiled set of patterns, OR-ed together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatFilter {
    patterns: Vec<Pattern>,
    match_all: bool,
}

impl StatFilter {
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<Pattern> = patterns
            .into_iter()
            .map(|p| Pattern::parse(p.as_ref()))
            .collect();
        let match_all = patterns.contains(&Pattern::All);
        Self {
            patterns,
            match_all,
        }
    }

    /// Filter selecting every stat.
    pub fn all() -> Self {
        Self::compile(["*"])
    }

    pub fn matches(&self, name: &str) -> bool {
        self.match_all || self.patterns.iter().any(|p| p.matches(name))
    }

    /// Returns `true` when no stat name can ever be selected.
    ///
    /// Names are never empty, so a list holding only empty patterns counts
    /// as empty too.
    pub fn is_empty(&self) -> bool {
        self.patterns
            .iter()
            .all(|p| matches!(p, Pattern::Exact(e) if e.is_empty()))
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}
