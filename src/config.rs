use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::AppError;
use crate::policy::{KeepPolicy, Limit, Operator, Pattern, Selector, UNBOUNDED};

pub const DEFAULT_CONFIG_NAME: &str = "werf.yaml";

/// Top-level document carrying `configVersion`; unrelated keys are ignored
#[derive(Debug, Deserialize)]
struct RawMeta {
    cleanup: Option<RawCleanup>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawCleanup {
    #[serde(default)]
    keep_policies: Vec<RawKeepPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawKeepPolicy {
    references: Option<RawReferences>,
    images_per_reference: Option<RawImagesLimit>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReferences {
    branch: Option<String>,
    tag: Option<String>,
    limit: Option<RawReferencesLimit>,
}

/// `references.limit`; the time bound is also accepted as `createdIn`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReferencesLimit {
    last: Option<i64>,
    #[serde(rename = "in", alias = "createdIn")]
    within: Option<String>,
    operator: Option<String>,
}

/// `imagesPerReference`; the time bound is also accepted as `publishedIn`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawImagesLimit {
    last: Option<i64>,
    #[serde(rename = "in", alias = "publishedIn")]
    within: Option<String>,
    operator: Option<String>,
}

/// Load keep policies for the project in `dir`.
///
/// A missing default config means "no policies"; a missing explicit one is an error.
pub fn load_keep_policies(dir: &Path, explicit: Option<&Path>) -> Result<Vec<KeepPolicy>, AppError> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(AppError::ConfigNotFound {
                path: path.to_path_buf(),
            })
        }
        Some(path) => path.to_path_buf(),
        None => {
            let path = dir.join(DEFAULT_CONFIG_NAME);
            if !path.exists() {
                tracing::warn!(path = %path.display(), "config not found, using default keep policies");
                return Ok(Vec::new());
            }
            path
        }
    };

    tracing::debug!(path = %path.display(), "loading keep policies");
    let content = std::fs::read_to_string(&path)?;
    parse_keep_policies(&content)
}

/// Parse the keep policies out of a multi-document YAML config
pub fn parse_keep_policies(content: &str) -> Result<Vec<KeepPolicy>, AppError> {
    let mut meta: Option<(usize, Value)> = None;

    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let doc = index + 1;
        let value = Value::deserialize(document).map_err(|e| AppError::config(doc, e.to_string()))?;

        if value.get("configVersion").is_none() {
            continue;
        }
        if meta.is_some() {
            return Err(AppError::config(doc, "duplicate meta config section definition"));
        }
        meta = Some((doc, value));
    }

    let Some((doc, value)) = meta else {
        return Ok(Vec::new());
    };

    let raw: RawMeta =
        serde_yaml::from_value(value).map_err(|e| AppError::config(doc, e.to_string()))?;

    raw.cleanup
        .map(|c| c.keep_policies)
        .unwrap_or_default()
        .into_iter()
        .map(|policy| policy.to_keep_policy(doc))
        .collect()
}

impl RawKeepPolicy {
    fn to_keep_policy(&self, doc: usize) -> Result<KeepPolicy, AppError> {
        let references = self
            .references
            .as_ref()
            .ok_or_else(|| AppError::config(doc, "cleanup keep policy must have references section!"))?;

        let selector = references.to_selector(doc)?;
        let references_limit = references
            .limit
            .as_ref()
            .map(|l| l.to_limit(doc))
            .transpose()?;
        let images_per_reference = self
            .images_per_reference
            .as_ref()
            .map(|l| l.to_limit(doc))
            .transpose()?
            .unwrap_or_default();

        Ok(KeepPolicy {
            selector,
            references_limit,
            images_per_reference,
        })
    }
}

impl RawReferences {
    fn to_selector(&self, doc: usize) -> Result<Selector, AppError> {
        match (&self.branch, &self.tag) {
            (Some(branch), None) => Ok(Selector::Branch(parse_pattern(doc, "branch", branch)?)),
            (None, Some(tag)) => Ok(Selector::Tag(parse_pattern(doc, "tag", tag)?)),
            (None, None) => Err(AppError::config(
                doc,
                "tag `tag: string|REGEX` or branch `branch: string|REGEX` required for cleanup keep policy!",
            )),
            (Some(_), Some(_)) => Err(AppError::config(
                doc,
                "specify only tag `tag: string|REGEX` or branch `branch: string|REGEX` for cleanup keep policy!",
            )),
        }
    }
}

fn parse_pattern(doc: usize, field: &str, value: &str) -> Result<Pattern, AppError> {
    if value.is_empty() {
        return Err(AppError::config(
            doc,
            format!("empty value for `{}: string|REGEX`!", field),
        ));
    }
    Pattern::parse(value).map_err(|e| {
        AppError::config(
            doc,
            format!("invalid value '{}' for `{}: string|REGEX`: {}", value, field, e),
        )
    })
}

impl RawReferencesLimit {
    fn to_limit(&self, doc: usize) -> Result<Limit, AppError> {
        parse_limit(doc, self.last, self.within.as_deref(), self.operator.as_deref())
    }
}

impl RawImagesLimit {
    fn to_limit(&self, doc: usize) -> Result<Limit, AppError> {
        parse_limit(doc, self.last, self.within.as_deref(), self.operator.as_deref())
    }
}

fn parse_limit(
    doc: usize,
    last: Option<i64>,
    within: Option<&str>,
    operator: Option<&str>,
) -> Result<Limit, AppError> {
    if let Some(last) = last {
        if last < UNBOUNDED {
            return Err(AppError::config(
                doc,
                format!("invalid value {} for `last`: expected -1 or a non-negative count!", last),
            ));
        }
    }

    let within = within
        .map(|s| {
            humantime::parse_duration(s).map_err(|e| {
                AppError::config(doc, format!("invalid duration '{}' for `in`: {}", s, e))
            })
        })
        .transpose()?;

    let operator = match operator {
        None => None,
        Some("And") => Some(Operator::And),
        Some("Or") => Some(Operator::Or),
        Some(other) => {
            return Err(AppError::config(
                doc,
                format!("unsupported value '{}' for `operator: Or|And`!", other),
            ))
        }
    };

    Ok(Limit::new(last, within, operator))
}
