use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::{Serialize, Serializer};

const DEFAULT_TAGS_LAST: i64 = 10;
const DEFAULT_BRANCHES_LAST: i64 = 10;
const DEFAULT_BRANCHES_IN: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_BRANCH_IMAGES_LAST: i64 = 2;
const DEFAULT_BRANCH_IMAGES_IN: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_PROTECTED_IMAGES_LAST: i64 = 10;
const PROTECTED_BRANCHES: &str = "/^(master|staging|production)$/";

/// `last: -1` keeps every reference regardless of count
pub const UNBOUNDED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    And,
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
        }
    }
}

/// Count and/or time bound combined with an operator.
///
/// Used both for selecting references and, downstream, for bounding the
/// images kept per reference. An empty limit means "keep everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Limit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<i64>,
    #[serde(
        rename = "in",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_duration"
    )]
    pub within: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
}

impl Limit {
    /// Build a limit, defaulting the operator to AND when both bounds are set
    pub fn new(last: Option<i64>, within: Option<Duration>, operator: Option<Operator>) -> Self {
        let operator = match operator {
            Some(op) => Some(op),
            None if last.is_some() && within.is_some() => Some(Operator::And),
            None => None,
        };
        Self {
            last,
            within,
            operator,
        }
    }

    pub fn last(n: i64) -> Self {
        Self::new(Some(n), None, None)
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none() && self.within.is_none()
    }

    pub fn effective_operator(&self) -> Operator {
        self.operator.unwrap_or(Operator::And)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(last) = self.last {
            parts.push(format!("last {}", last));
        }
        if let Some(within) = self.within {
            parts.push(format!("in {}", humantime::format_duration(within)));
        }
        let sep = format!(" {} ", self.effective_operator());
        write!(f, "{}", parts.join(&sep))
    }
}

fn serialize_duration<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_str(&humantime::format_duration(*d).to_string()),
        None => s.serialize_none(),
    }
}

/// Reference name pattern: `/regex/`, or an exact literal otherwise
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn parse(value: &str) -> Result<Self, regex::Error> {
        let expr = match value.strip_prefix('/').and_then(|v| v.strip_suffix('/')) {
            Some(inner) => inner.to_string(),
            None => format!("^{}$", regex::escape(value)),
        };
        Ok(Self {
            source: value.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Branch(Pattern),
    Tag(Pattern),
}

impl Selector {
    pub fn pattern(&self) -> &Pattern {
        match self {
            Selector::Branch(p) | Selector::Tag(p) => p,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Branch(p) => write!(f, "branch: {}", p),
            Selector::Tag(p) => write!(f, "tag: {}", p),
        }
    }
}

/// One keep rule: which references to retain and how many images per reference
#[derive(Debug, Clone, PartialEq)]
pub struct KeepPolicy {
    pub selector: Selector,
    pub references_limit: Option<Limit>,
    pub images_per_reference: Limit,
}

impl KeepPolicy {
    /// Policies applied when the project declares none.
    ///
    /// Order matters: protected branches come last so their image
    /// sub-policy overrides the general branch policy.
    pub fn defaults() -> Vec<KeepPolicy> {
        vec![
            KeepPolicy {
                selector: Selector::Tag(any_name()),
                references_limit: Some(Limit::last(DEFAULT_TAGS_LAST)),
                images_per_reference: Limit::default(),
            },
            KeepPolicy {
                selector: Selector::Branch(any_name()),
                references_limit: Some(Limit::new(
                    Some(DEFAULT_BRANCHES_LAST),
                    Some(DEFAULT_BRANCHES_IN),
                    Some(Operator::And),
                )),
                images_per_reference: Limit::new(
                    Some(DEFAULT_BRANCH_IMAGES_LAST),
                    Some(DEFAULT_BRANCH_IMAGES_IN),
                    Some(Operator::And),
                ),
            },
            KeepPolicy {
                selector: Selector::Branch(
                    Pattern::parse(PROTECTED_BRANCHES).expect("protected branches pattern is valid"),
                ),
                references_limit: None,
                images_per_reference: Limit::last(DEFAULT_PROTECTED_IMAGES_LAST),
            },
        ]
    }
}

fn any_name() -> Pattern {
    Pattern::parse("/.*/").expect("match-all pattern is valid")
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "references.{}", self.selector)?;
        if let Some(limit) = self.references_limit.as_ref().filter(|l| !l.is_empty()) {
            write!(f, " ({})", limit)?;
        }
        if !self.images_per_reference.is_empty() {
            write!(f, ", imagesPerReference: {}", self.images_per_reference)?;
        }
        Ok(())
    }
}
